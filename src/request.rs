//! Parameters of validation and proxy calls.

use std::fmt;
use std::str::FromStr;

use crate::error::CasError;
use crate::secret::Secret;

/// CAS protocol version used for ticket validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Plain-text `validate` endpoint
    Cas1,
    /// XML `serviceValidate` endpoint
    #[default]
    Cas2,
}

impl Protocol {
    /// Returns the protocol name as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Cas1 => "cas1",
            Protocol::Cas2 => "cas2",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = CasError;

    /// Parses `cas1` or `cas2`, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("cas1") {
            Ok(Protocol::Cas1)
        } else if s.eq_ignore_ascii_case("cas2") {
            Ok(Protocol::Cas2)
        } else {
            Err(CasError::InvalidParameters(format!(
                "unknown protocol '{}', expected cas1 or cas2",
                s
            )))
        }
    }
}

/// Proxy callback settings for a CAS2 validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCallback {
    /// Escaped callback URL sent to the server as `pgtUrl`
    pub escaped_callback_url: String,
    /// Base URL queried with `?pgtIou=` to redeem the IOU, if any
    pub retrieve_base_url: Option<String>,
}

/// Parameters of a ticket validation.
///
/// The service URL must already be escaped (see [`crate::url::escape`]); it
/// is concatenated into the request URL as given.
///
/// # Examples
///
/// ```
/// use cas_client::ValidationRequest;
///
/// let request = ValidationRequest::new(
///     "https://cas.example.org/cas/serviceValidate",
///     "https%3A%2F%2Fapp.example.org%2F",
///     "ST-1-abc",
/// )
/// .renew(true)
/// .proxy_callback("https%3A%2F%2Fapp.example.org%2Fpgt", Some("https://app.example.org/pgt"));
///
/// assert!(request.validate().is_ok());
/// assert_eq!(format!("{:?}", request).contains("ST-1-abc"), false);
/// ```
#[derive(Debug)]
pub struct ValidationRequest {
    /// Validation endpoint, e.g. `https://cas/cas/serviceValidate`
    pub base_url: String,
    /// Escaped service URL the ticket was issued for
    pub escaped_service: String,
    /// Service ticket
    pub ticket: Secret<String>,
    /// Ask the server to accept only tickets from a fresh login
    pub renew: bool,
    /// Request a proxy-granting ticket (CAS2 only)
    pub proxy_callback: Option<ProxyCallback>,
}

impl ValidationRequest {
    /// Creates a request without `renew` or proxy callback.
    pub fn new(
        base_url: impl Into<String>,
        escaped_service: impl Into<String>,
        ticket: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            escaped_service: escaped_service.into(),
            ticket: Secret::new(ticket.into()),
            renew: false,
            proxy_callback: None,
        }
    }

    /// Sets the `renew` flag.
    pub fn renew(mut self, renew: bool) -> Self {
        self.renew = renew;
        self
    }

    /// Requests a PGT IOU for `escaped_callback_url` and, if
    /// `retrieve_base_url` is given, redeems it there after validation.
    pub fn proxy_callback(
        mut self,
        escaped_callback_url: impl Into<String>,
        retrieve_base_url: Option<impl Into<String>>,
    ) -> Self {
        self.proxy_callback = Some(ProxyCallback {
            escaped_callback_url: escaped_callback_url.into(),
            retrieve_base_url: retrieve_base_url.map(Into::into),
        });
        self
    }

    /// Checks that the required parameters are present.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::InvalidParameters`] naming the first empty parameter.
    pub fn validate(&self) -> Result<(), CasError> {
        require("base URL", &self.base_url)?;
        require("service", &self.escaped_service)?;
        require("ticket", self.ticket.expose_secret())?;
        if let Some(callback) = &self.proxy_callback {
            require("proxy callback URL", &callback.escaped_callback_url)?;
            if let Some(retrieve) = &callback.retrieve_base_url {
                require("PGT retrieval URL", retrieve)?;
            }
        }
        Ok(())
    }
}

/// Parameters of a proxy ticket request.
///
/// # Examples
///
/// ```
/// use cas_client::ProxyRequest;
///
/// let request = ProxyRequest::new("https://cas/cas/proxy", "imap%3A%2F%2Fmail", "");
/// assert!(request.validate().is_err());
/// ```
#[derive(Debug)]
pub struct ProxyRequest {
    /// Proxy endpoint, e.g. `https://cas/cas/proxy`
    pub base_url: String,
    /// Escaped URL of the service the proxy ticket is for
    pub escaped_target_service: String,
    /// Proxy-granting ticket
    pub pgt: Secret<String>,
}

impl ProxyRequest {
    /// Creates a proxy request.
    pub fn new(
        base_url: impl Into<String>,
        escaped_target_service: impl Into<String>,
        pgt: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            escaped_target_service: escaped_target_service.into(),
            pgt: Secret::new(pgt.into()),
        }
    }

    /// Checks that the required parameters are present.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::InvalidParameters`] naming the first empty parameter.
    pub fn validate(&self) -> Result<(), CasError> {
        require("base URL", &self.base_url)?;
        require("target service", &self.escaped_target_service)?;
        require("proxy-granting ticket", self.pgt.expose_secret())
    }
}

fn require(name: &str, value: &str) -> Result<(), CasError> {
    if value.is_empty() {
        Err(CasError::InvalidParameters(format!("{} is required", name)))
    } else {
        Ok(())
    }
}
