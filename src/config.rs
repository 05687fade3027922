//! Transport configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Default maximum number of redirects followed per request.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Default cap on the size of a response body.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Settings for the HTTP transport owned by a session.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cas_client::TransportConfig;
///
/// let config = TransportConfig::default()
///     .with_ca_path("/etc/ssl/certs")
///     .with_timeout(Duration::from_secs(10));
///
/// assert!(config.verify_tls);
/// assert_eq!(config.max_redirects, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Verify the server certificate and host name
    pub verify_tls: bool,
    /// CA certificates to trust instead of the built-in roots: either a
    /// directory of PEM files or a single PEM bundle file
    pub ca_path: Option<PathBuf>,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Maximum number of redirects followed per request
    pub max_redirects: usize,
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Timeout for a whole request, body included
    pub timeout: Duration,
    /// Responses larger than this are aborted as transport failures
    pub max_response_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            verify_tls: true,
            ca_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(60),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl TransportConfig {
    /// Enables or disables server certificate verification.
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Trusts the CA certificates found at `path` (directory or bundle file).
    pub fn with_ca_path(mut self, path: impl AsRef<Path>) -> Self {
        self.ca_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the `User-Agent` header value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the maximum number of redirects followed per request.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the overall request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum accepted response body size.
    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }
}
