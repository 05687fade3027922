use std::fmt;

/// A wrapper that keeps ticket material out of logs and debug output.
///
/// Service tickets, proxy-granting tickets, PGT IOUs and proxy tickets are
/// bearer credentials: anyone holding one can impersonate the user towards a
/// service. `Secret<T>` makes sure they never reach a `tracing` event, a panic
/// message or a `{:?}` dump by accident. The wrapped value can only be read
/// through [`expose_secret`](Self::expose_secret).
///
/// # Security Properties
///
/// - Does NOT implement `Deref`, `AsRef`, `Borrow`, `Clone`, or `Copy`
/// - Debug and Display output is always `[REDACTED]`
/// - No type information is leaked in formatted output
///
/// # Examples
///
/// ```
/// use cas_client::Secret;
///
/// let pgt = Secret::new("PGT-1-abcdef".to_string());
///
/// assert_eq!(format!("{:?}", pgt), "[REDACTED]");
/// assert_eq!(format!("{}", pgt), "[REDACTED]");
/// assert_eq!(pgt.expose_secret(), "PGT-1-abcdef");
/// ```
// Do NOT derive Clone, Copy, or Default: tickets must not be duplicated carelessly.
pub struct Secret<T> {
    // Must remain private; a public field defeats redaction.
    inner: T,
}

impl<T> Secret<T> {
    /// Wraps a ticket or other credential in a `Secret`.
    pub fn new(value: T) -> Self {
        Self { inner: value }
    }

    /// Explicitly exposes the secret value.
    ///
    /// The verbose name is deliberate: call sites that read ticket material
    /// should stand out in review. Never log the returned value.
    pub fn expose_secret(&self) -> &T {
        &self.inner
    }

    /// Consumes the wrapper and returns the secret value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_redacts_debug() {
        let ticket = Secret::new("ST-1-hunter2".to_string());
        let debug_output = format!("{:?}", ticket);

        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("ST-1"));
        assert!(!debug_output.contains("String")); // No type leak
    }

    #[test]
    fn secret_redacts_display() {
        let pgt = Secret::new("PGT-22-xyz");
        let display_output = format!("{}", pgt);

        assert_eq!(display_output, "[REDACTED]");
        assert!(!display_output.contains("PGT-"));
    }

    #[test]
    fn secret_redacts_inside_containers() {
        let ticket = Some(Secret::new("PT-9".to_string()));
        assert_eq!(format!("{:?}", ticket), "Some([REDACTED])");
    }

    #[test]
    fn secret_exposes_when_explicit() {
        let secret = Secret::new("PGTIOU-7".to_string());
        assert_eq!(secret.expose_secret(), "PGTIOU-7");
        assert_eq!(secret.into_inner(), "PGTIOU-7");
    }
}
