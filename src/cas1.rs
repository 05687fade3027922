//! CAS1 `validate` response parsing.
//!
//! CAS1 answers with two lines of plain text: `yes\n<user>\n` when the ticket
//! is valid and `no\n\n` when it is not.

use crate::code::ResultCode;

/// Interpretation of a CAS1 response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cas1Response {
    /// `yes`, with the principal from the second line
    Yes(String),
    /// `no`
    No,
    /// Anything else
    Invalid,
}

impl Cas1Response {
    /// Returns the result code this response is reported as.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Cas1Response::Yes(_) => ResultCode::ValidationSuccess,
            Cas1Response::No => ResultCode::Cas1ValidationNo,
            Cas1Response::Invalid => ResultCode::InvalidResponse,
        }
    }
}

/// Parses a complete CAS1 response body.
///
/// - exactly `no\n\n` is a denial
/// - a body starting with `yes\n` is a success; the principal runs from
///   there to the next `\n` or the end of the body
/// - anything else, including a principal that is not valid UTF-8, is invalid
///
/// # Examples
///
/// ```
/// use cas_client::cas1::{parse_response, Cas1Response};
///
/// assert_eq!(parse_response(b"yes\nalice\n"), Cas1Response::Yes("alice".to_string()));
/// assert_eq!(parse_response(b"no\n\n"), Cas1Response::No);
/// assert_eq!(parse_response(b"maybe\n"), Cas1Response::Invalid);
/// ```
pub fn parse_response(body: &[u8]) -> Cas1Response {
    if body == b"no\n\n" {
        return Cas1Response::No;
    }

    match body.strip_prefix(b"yes\n") {
        Some(rest) => {
            let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
            match std::str::from_utf8(&rest[..end]) {
                Ok(principal) => Cas1Response::Yes(principal.to_string()),
                Err(_) => Cas1Response::Invalid,
            }
        }
        None => Cas1Response::Invalid,
    }
}
