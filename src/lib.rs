//! Client for CAS (Central Authentication Service) ticket validation.
//!
//! This crate validates service tickets against a CAS server and resolves the
//! authenticated principal:
//! - **CAS1**: plain-text `validate` endpoint
//! - **CAS2**: XML `serviceValidate` endpoint, read by a strict streaming
//!   state machine
//! - **Proxy tickets**: PGT IOU redemption after validation, and proxy ticket
//!   requests against the `proxy` endpoint
//!
//! # Core Types
//!
//! - [`Session`]: owns a transport and the results of the latest call
//! - [`ValidationRequest`] / [`ProxyRequest`]: call parameters
//! - [`ResultCode`]: how a call ended
//! - [`Secret<T>`]: wrapper that keeps tickets out of logs and debug output
//! - [`Transport`]: HTTP seam, with [`HttpTransport`] for real servers and
//!   [`ScriptedTransport`] for offline tests
//!
//! # Examples
//!
//! ```no_run
//! use cas_client::{url, ResultCode, Session, TransportConfig, ValidationRequest};
//!
//! cas_client::initialize();
//!
//! let mut session = Session::new(TransportConfig::default())?;
//! let request = ValidationRequest::new(
//!     "https://cas.example.org/cas/serviceValidate",
//!     url::escape("https://app.example.org/"),
//!     "ST-1-abc",
//! );
//!
//! match session.service_validate(&request) {
//!     ResultCode::ValidationSuccess => println!("hello {}", session.principal().unwrap_or("")),
//!     code => eprintln!("({}) {}: {}", code.as_raw(), code, session.message().unwrap_or("")),
//! }
//!
//! cas_client::shutdown();
//! # Ok::<(), cas_client::CasError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cas1;
pub mod cas2;
mod code;
mod config;
mod error;
mod lifecycle;
mod request;
mod secret;
mod session;
mod transport;
pub mod url;
pub mod xml;

pub use code::ResultCode;
pub use config::{
    TransportConfig, DEFAULT_MAX_REDIRECTS, DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_USER_AGENT,
};
pub use error::{CasError, TransportError, TransportErrorKind};
pub use lifecycle::{initialize, is_initialized, shutdown};
pub use request::{Protocol, ProxyCallback, ProxyRequest, ValidationRequest};
pub use secret::Secret;
pub use session::Session;
pub use transport::{HttpTransport, ScriptedResponse, ScriptedTransport, Transport};
