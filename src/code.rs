//! Result codes reported by validation and proxy calls.

use std::fmt;

/// Outcome of a single validation or proxy call.
///
/// Exactly one code is produced per call and it is the authoritative signal of
/// the outcome. On [`ValidationSuccess`](Self::ValidationSuccess) the session
/// holds a principal; on every other code it may hold a message instead.
///
/// # Examples
///
/// ```
/// use cas_client::ResultCode;
///
/// let code = ResultCode::InvalidTicket;
/// assert!(!code.is_success());
/// assert_eq!(code.as_raw(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultCode {
    /// Generic failure, reason unknown. Initial code of every session.
    #[default]
    Fail,
    /// Validation succeeded and a principal was resolved
    ValidationSuccess,
    /// CAS1 validation was performed but the server answered "no"
    Cas1ValidationNo,
    /// CAS2: not all of the required request parameters were present
    InvalidRequest,
    /// CAS2: the ticket was not valid, or did not come from an initial login while `renew` was set
    InvalidTicket,
    /// CAS2: the ticket was valid but issued for a different service
    InvalidService,
    /// CAS2: internal error on the server during validation
    InternalError,
    /// CAS2: the proxy-granting ticket was not valid
    BadPgt,
    /// CAS2: a proxy ticket was obtained
    ProxySuccess,
    /// The server answered with something well formed but unexpected
    InvalidResponse,
    /// The server answered with malformed XML
    InvalidXml,
    /// The transport failed (network, TLS, timeout); the message carries details
    TransportFailure,
    /// A required argument was missing or empty
    InvalidParameters,
    /// A buffer could not be grown
    OutOfMemory,
}

impl ResultCode {
    /// Returns the stable numeric value of this code.
    ///
    /// Values for the original CAS codes are fixed (`-1` for [`Fail`](Self::Fail),
    /// `0` for success, then in declaration order); later additions are appended.
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Fail => -1,
            Self::ValidationSuccess => 0,
            Self::Cas1ValidationNo => 1,
            Self::InvalidRequest => 2,
            Self::InvalidTicket => 3,
            Self::InvalidService => 4,
            Self::InternalError => 5,
            Self::InvalidResponse => 6,
            Self::TransportFailure => 7,
            Self::InvalidXml => 8,
            Self::OutOfMemory => 9,
            Self::InvalidParameters => 10,
            Self::BadPgt => 11,
            Self::ProxySuccess => 12,
        }
    }

    /// Returns `true` for the codes that represent a successful call.
    pub fn is_success(self) -> bool {
        matches!(self, Self::ValidationSuccess | Self::ProxySuccess)
    }

    /// Returns a human-readable description of the code.
    pub fn description(self) -> &'static str {
        match self {
            Self::Fail => "CAS: internal failure",
            Self::ValidationSuccess => "CAS: validation succeeded",
            Self::Cas1ValidationNo => "CAS1: validation failed",
            Self::InvalidRequest => {
                "CAS2: not all of the required request parameters were present"
            }
            Self::InvalidTicket => {
                "CAS2: the ticket provided was not valid, or the ticket did not come from an initial login and \"renew\" was set on validation"
            }
            Self::InvalidService => {
                "CAS2: the ticket provided was valid, but the service specified did not match the service associated with the ticket"
            }
            Self::InternalError => "CAS2: an internal error occurred during ticket validation",
            Self::BadPgt => "CAS2: the proxy-granting ticket provided was not valid",
            Self::ProxySuccess => "CAS2: proxy ticket obtained",
            Self::InvalidResponse => "CAS: server returned invalid response",
            Self::InvalidXml => "CAS: server returned unparseable response",
            Self::TransportFailure => "CAS: transport failure",
            Self::InvalidParameters => "CAS: invalid parameters",
            Self::OutOfMemory => "CAS: out of memory",
        }
    }

    /// Maps the `code` attribute of a CAS2 failure element to a result code.
    ///
    /// Matching is case-insensitive and exact-length. `BAD_PGT` is only
    /// accepted when `proxy` is set (a `proxyFailure` element).
    pub(crate) fn from_failure_attribute(value: &str, proxy: bool) -> Option<Self> {
        const CODES: [(&str, ResultCode); 4] = [
            ("INVALID_REQUEST", ResultCode::InvalidRequest),
            ("INVALID_TICKET", ResultCode::InvalidTicket),
            ("INVALID_SERVICE", ResultCode::InvalidService),
            ("INTERNAL_ERROR", ResultCode::InternalError),
        ];

        if proxy && value.eq_ignore_ascii_case("BAD_PGT") {
            return Some(ResultCode::BadPgt);
        }
        CODES
            .iter()
            .find(|(name, _)| value.eq_ignore_ascii_case(name))
            .map(|(_, code)| *code)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
