use std::collections::TryReserveError;
use std::fmt;

use crate::code::ResultCode;

/// Errors raised by constructors, URL builders and internal plumbing.
///
/// Validation calls never return `CasError` directly: every variant maps onto
/// exactly one [`ResultCode`] at the session boundary (see [`CasError::result_code`]).
#[derive(Debug)]
pub enum CasError {
    /// A buffer could not be grown to hold a URL or response data
    OutOfMemory,
    /// A required parameter was missing or empty
    InvalidParameters(String),
    /// Transport configuration was rejected (unreadable CA path, bad certificate, ...)
    Configuration(String),
    /// The library was used before `initialize()` or after `shutdown()`
    NotInitialized,
    /// The transport failed to complete a request
    Transport(TransportError),
}

impl CasError {
    /// Returns the result code this error is reported as.
    ///
    /// # Examples
    ///
    /// ```
    /// use cas_client::{CasError, ResultCode};
    ///
    /// assert_eq!(CasError::OutOfMemory.result_code(), ResultCode::OutOfMemory);
    /// ```
    pub fn result_code(&self) -> ResultCode {
        match self {
            CasError::OutOfMemory => ResultCode::OutOfMemory,
            CasError::InvalidParameters(_) => ResultCode::InvalidParameters,
            CasError::Configuration(_) | CasError::NotInitialized => ResultCode::Fail,
            CasError::Transport(_) => ResultCode::TransportFailure,
        }
    }
}

impl fmt::Display for CasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CasError::OutOfMemory => write!(f, "out of memory"),
            CasError::InvalidParameters(msg) => write!(f, "invalid parameters: {}", msg),
            CasError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            CasError::NotInitialized => write!(f, "cas-client is not initialized"),
            CasError::Transport(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CasError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for CasError {
    fn from(err: TransportError) -> Self {
        CasError::Transport(err)
    }
}

impl From<TryReserveError> for CasError {
    fn from(_: TryReserveError) -> Self {
        CasError::OutOfMemory
    }
}

/// Error returned by a [`Transport`](crate::Transport) when a request fails.
///
/// The message is the transport's own description of the failure and is what
/// a session exposes as its `message` after a transport failure.
///
/// # Examples
///
/// ```
/// use cas_client::{TransportError, TransportErrorKind};
///
/// let error = TransportError::new(TransportErrorKind::Timeout, "operation timed out");
/// assert_eq!(error.kind(), TransportErrorKind::Timeout);
/// assert_eq!(error.message(), "operation timed out");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    /// Creates a new transport error.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error ({}): {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_redirect() {
            TransportErrorKind::Redirect
        } else {
            TransportErrorKind::Request
        };
        // The request URL carries the ticket.
        TransportError::new(kind, err.without_url().to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        let kind = err.kind();
        let message = match err.into_inner() {
            Some(inner) => match inner.downcast::<reqwest::Error>() {
                Ok(err) => (*err).without_url().to_string(),
                Err(inner) => inner.to_string(),
            },
            None => kind.to_string(),
        };
        TransportError::new(TransportErrorKind::Io, message)
    }
}

/// Kind of transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection could not be established (DNS, refused, TLS handshake)
    Connect,
    /// Connect or read timeout expired
    Timeout,
    /// Redirect limit exceeded or redirect rejected
    Redirect,
    /// URL scheme other than http/https
    UnsupportedScheme,
    /// Response body exceeded the configured limit
    BodyTooLarge,
    /// Reading the response body failed
    Io,
    /// The body consumer stopped the transfer
    Aborted,
    /// Any other request failure
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Timeout => write!(f, "timeout"),
            Self::Redirect => write!(f, "redirect"),
            Self::UnsupportedScheme => write!(f, "unsupported scheme"),
            Self::BodyTooLarge => write!(f, "body too large"),
            Self::Io => write!(f, "I/O"),
            Self::Aborted => write!(f, "aborted"),
            Self::Request => write!(f, "request"),
        }
    }
}
