//! Validation sessions.
//!
//! A [`Session`] owns a transport and the results of the latest call. Each
//! validation call resets the result fields it produces before doing any
//! work, so a session never mixes the results of two tickets.

use std::ops::ControlFlow;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::cas1::{self, Cas1Response};
use crate::cas2::{has_ticket_prefix, Cas2Document, Cas2Parser, Outcome};
use crate::code::ResultCode;
use crate::config::TransportConfig;
use crate::error::CasError;
use crate::lifecycle;
use crate::request::{Protocol, ProxyRequest, ValidationRequest};
use crate::secret::Secret;
use crate::transport::{HttpTransport, Transport};
use crate::url::{build_pgt_retrieval_url, build_proxy_url, build_service_validate_url};
use crate::xml::{QuickXmlSource, XmlEventSource};

/// Why a call ended without a protocol outcome.
#[derive(Debug)]
enum Failure {
    /// Local or transport error, reported through [`CasError::result_code`]
    Error(CasError),
    /// Unusable response, with an optional message for the session
    Response(ResultCode, Option<String>),
}

impl Failure {
    fn invalid_response() -> Self {
        Failure::Response(ResultCode::InvalidResponse, None)
    }

    fn into_parts(self) -> (ResultCode, Option<String>) {
        match self {
            Failure::Error(CasError::Transport(err)) => {
                (ResultCode::TransportFailure, Some(err.message().to_string()))
            }
            Failure::Error(err) => (err.result_code(), Some(err.to_string())),
            Failure::Response(code, message) => (code, message),
        }
    }
}

impl From<CasError> for Failure {
    fn from(err: CasError) -> Self {
        Failure::Error(err)
    }
}

/// A CAS validation client.
///
/// Calls are synchronous: a validation performs one request, or two when a
/// proxy-granting ticket is redeemed. A session must not be shared between
/// concurrent calls; use one session per thread.
///
/// After each call, [`code`](Self::code) says how it ended. On
/// [`ResultCode::ValidationSuccess`] the [`principal`](Self::principal) is
/// set; on failures a [`message`](Self::message) may carry details.
///
/// # Examples
///
/// ```
/// use cas_client::{ResultCode, ScriptedTransport, Session, ValidationRequest};
///
/// cas_client::initialize();
///
/// let transport = ScriptedTransport::new().with_body(
///     r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
///          <cas:authenticationSuccess><cas:user>alice</cas:user></cas:authenticationSuccess>
///        </cas:serviceResponse>"#,
/// );
/// let mut session = Session::with_transport(transport).unwrap();
///
/// let request =
///     ValidationRequest::new("https://cas/serviceValidate", "https%3A%2F%2Fapp", "ST-1");
/// assert_eq!(session.service_validate(&request), ResultCode::ValidationSuccess);
/// assert_eq!(session.principal(), Some("alice"));
/// ```
#[derive(Debug)]
pub struct Session<T = HttpTransport> {
    transport: T,
    code: ResultCode,
    principal: Option<String>,
    message: Option<String>,
    pgtiou: Option<Secret<String>>,
    pgt: Option<Secret<String>>,
    proxy_ticket: Option<Secret<String>>,
}

impl Session<HttpTransport> {
    /// Creates a session with an HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::NotInitialized`] outside of
    /// [`initialize`](crate::initialize)/[`shutdown`](crate::shutdown), and
    /// [`CasError::Configuration`] if the transport cannot be built.
    pub fn new(config: TransportConfig) -> Result<Self, CasError> {
        ensure_ready()?;
        Self::with_transport(HttpTransport::new(config)?)
    }

    /// Enables or disables server certificate verification.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::Configuration`] if the transport cannot be rebuilt;
    /// the previous settings stay in effect.
    pub fn set_verify_tls(&mut self, verify: bool) -> Result<(), CasError> {
        let config = self.transport.config().clone().with_verify_tls(verify);
        self.transport.reconfigure(config)
    }

    /// Sets the CA directory or bundle file, or restores the built-in roots with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::Configuration`] if the path cannot be loaded; the
    /// previous settings stay in effect.
    pub fn set_ca_path(&mut self, ca_path: Option<PathBuf>) -> Result<(), CasError> {
        let mut config = self.transport.config().clone();
        config.ca_path = ca_path;
        self.transport.reconfigure(config)
    }
}

impl<T: Transport> Session<T> {
    /// Creates a session using the given transport.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::NotInitialized`] outside of
    /// [`initialize`](crate::initialize)/[`shutdown`](crate::shutdown).
    pub fn with_transport(transport: T) -> Result<Self, CasError> {
        ensure_ready()?;
        Ok(Self {
            transport,
            code: ResultCode::Fail,
            principal: None,
            message: None,
            pgtiou: None,
            pgt: None,
            proxy_ticket: None,
        })
    }

    /// Result code of the latest call; [`ResultCode::Fail`] before the first one.
    pub fn code(&self) -> ResultCode {
        self.code
    }

    /// Principal resolved by the latest successful validation.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Failure details of the latest call, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// PGT IOU received by the latest CAS2 validation.
    pub fn pgtiou(&self) -> Option<&Secret<String>> {
        self.pgtiou.as_ref()
    }

    /// Proxy-granting ticket redeemed after the latest CAS2 validation.
    pub fn pgt(&self) -> Option<&Secret<String>> {
        self.pgt.as_ref()
    }

    /// Proxy ticket obtained by the latest [`proxy`](Self::proxy) call.
    pub fn proxy_ticket(&self) -> Option<&Secret<String>> {
        self.proxy_ticket.as_ref()
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consumes the session and returns its transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Validates a ticket with the given protocol.
    pub fn validate(&mut self, protocol: Protocol, request: &ValidationRequest) -> ResultCode {
        match protocol {
            Protocol::Cas1 => self.cas1_validate(request),
            Protocol::Cas2 => self.service_validate(request),
        }
    }

    /// Validates a ticket against a CAS1 `validate` endpoint.
    ///
    /// Proxy callback settings are ignored: CAS1 has no proxy support.
    pub fn cas1_validate(&mut self, request: &ValidationRequest) -> ResultCode {
        self.reset_validation();
        let result = self.try_cas1_validate(request);
        let code = self.complete("validate", &request.base_url, result);
        if code != ResultCode::ValidationSuccess {
            self.principal = None;
        }
        code
    }

    /// Validates a ticket against a CAS2 `serviceValidate` endpoint.
    ///
    /// With a proxy callback, the server is asked for a PGT IOU. If one is
    /// returned and a retrieval URL is set, the IOU is redeemed there with a
    /// second request. A retrieval that fails or does not yield a `PGT-`
    /// ticket turns the result into [`ResultCode::InvalidResponse`].
    pub fn service_validate(&mut self, request: &ValidationRequest) -> ResultCode {
        self.reset_validation();
        let result = self.try_service_validate(request);
        let code = self.complete("serviceValidate", &request.base_url, result);
        if code != ResultCode::ValidationSuccess {
            self.principal = None;
            self.pgt = None;
        }
        code
    }

    /// Requests a proxy ticket for a target service from a CAS2 `proxy` endpoint.
    ///
    /// Returns [`ResultCode::ProxySuccess`] with the ticket available from
    /// [`proxy_ticket`](Self::proxy_ticket). A ticket without the `PT-` prefix
    /// is dropped, leaving `proxy_ticket` empty. The principal and PGT of the
    /// latest validation are kept.
    pub fn proxy(&mut self, request: &ProxyRequest) -> ResultCode {
        self.proxy_ticket = None;
        self.message = None;
        let result = self.try_proxy(request);
        self.complete("proxy", &request.base_url, result)
    }

    fn reset_validation(&mut self) {
        self.principal = None;
        self.message = None;
        self.pgtiou = None;
        self.pgt = None;
        self.proxy_ticket = None;
    }

    fn complete(
        &mut self,
        operation: &'static str,
        base_url: &str,
        result: Result<ResultCode, Failure>,
    ) -> ResultCode {
        let code = match result {
            Ok(code) => code,
            Err(failure) => {
                let (code, message) = failure.into_parts();
                if code == ResultCode::TransportFailure {
                    let error = message.as_deref().unwrap_or_default();
                    warn!(operation, base_url, error, "transport failure");
                }
                if message.is_some() {
                    self.message = message;
                }
                code
            }
        };
        self.code = code;
        info!(operation, base_url, code = code.as_raw(), result = %code, "CAS call finished");
        code
    }

    fn try_cas1_validate(&mut self, request: &ValidationRequest) -> Result<ResultCode, Failure> {
        ensure_ready()?;
        request.validate()?;
        if request.proxy_callback.is_some() {
            warn!("CAS1 has no proxy support, ignoring proxy callback");
        }

        let url = build_service_validate_url(
            &request.base_url,
            &request.escaped_service,
            request.ticket.expose_secret(),
            request.renew,
            None,
        )?;
        debug!(base_url = %request.base_url, renew = request.renew, "validating ticket with CAS1");

        let body = fetch_body(&mut self.transport, &url)?;
        match cas1::parse_response(&body) {
            Cas1Response::Yes(principal) => {
                self.principal = Some(principal);
                Ok(ResultCode::ValidationSuccess)
            }
            other => Ok(other.result_code()),
        }
    }

    fn try_service_validate(&mut self, request: &ValidationRequest) -> Result<ResultCode, Failure> {
        ensure_ready()?;
        request.validate()?;

        let callback = request.proxy_callback.as_ref();
        let url = build_service_validate_url(
            &request.base_url,
            &request.escaped_service,
            request.ticket.expose_secret(),
            request.renew,
            callback.map(|c| c.escaped_callback_url.as_str()),
        )?;
        debug!(
            base_url = %request.base_url,
            renew = request.renew,
            proxy_callback = callback.is_some(),
            "validating ticket with CAS2"
        );

        let document = fetch_cas2(&mut self.transport, &url)?;
        match document.outcome {
            Outcome::AuthenticationSuccess => {}
            Outcome::AuthenticationFailure(code) => {
                self.message = Some(document.message);
                return Ok(code);
            }
            Outcome::ProxySuccess | Outcome::ProxyFailure(_) => {
                debug!("proxy response received from serviceValidate");
                return Err(Failure::invalid_response());
            }
        }

        self.principal = Some(document.principal);
        self.pgtiou = document.pgtiou;

        let retrieve_base_url = callback.and_then(|c| c.retrieve_base_url.as_deref());
        if let (Some(pgtiou), Some(retrieve_base_url)) = (&self.pgtiou, retrieve_base_url) {
            let pgt = retrieve_pgt(&mut self.transport, retrieve_base_url, pgtiou.expose_secret())?;
            self.pgt = Some(pgt);
        }
        Ok(ResultCode::ValidationSuccess)
    }

    fn try_proxy(&mut self, request: &ProxyRequest) -> Result<ResultCode, Failure> {
        ensure_ready()?;
        request.validate()?;

        let url = build_proxy_url(
            &request.base_url,
            &request.escaped_target_service,
            request.pgt.expose_secret(),
        )?;
        debug!(base_url = %request.base_url, "requesting proxy ticket");

        let document = fetch_cas2(&mut self.transport, &url)?;
        match document.outcome {
            Outcome::ProxySuccess => {
                if document.proxy_ticket.is_none() {
                    debug!("proxySuccess without a PT- ticket");
                }
                self.proxy_ticket = document.proxy_ticket;
                Ok(ResultCode::ProxySuccess)
            }
            Outcome::ProxyFailure(code) => {
                self.message = Some(document.message);
                Ok(code)
            }
            Outcome::AuthenticationSuccess | Outcome::AuthenticationFailure(_) => {
                debug!("authentication response received from proxy endpoint");
                Err(Failure::invalid_response())
            }
        }
    }
}

fn ensure_ready() -> Result<(), CasError> {
    if lifecycle::is_initialized() {
        Ok(())
    } else {
        Err(CasError::NotInitialized)
    }
}

/// Fetches a whole response body.
fn fetch_body<T: Transport + ?Sized>(transport: &mut T, url: &str) -> Result<Vec<u8>, CasError> {
    let mut body = Vec::new();
    let mut out_of_memory = false;

    let result = transport.get(url, &mut |chunk| {
        if body.try_reserve(chunk.len()).is_err() {
            out_of_memory = true;
            return ControlFlow::Break(());
        }
        body.extend_from_slice(chunk);
        ControlFlow::Continue(())
    });

    if out_of_memory {
        return Err(CasError::OutOfMemory);
    }
    result?;
    Ok(body)
}

/// Streams a response through the XML source into the CAS2 parser.
fn fetch_cas2<T: Transport + ?Sized>(
    transport: &mut T,
    url: &str,
) -> Result<Cas2Document, Failure> {
    let mut source = QuickXmlSource::new();
    let mut parser = Cas2Parser::new();
    let mut out_of_memory = false;

    let result = transport.get(url, &mut |chunk| {
        if source.feed(chunk, &mut parser).is_err() || parser.is_out_of_memory() {
            out_of_memory = true;
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });

    if out_of_memory {
        return Err(CasError::OutOfMemory.into());
    }
    result.map_err(CasError::from)?;

    if !source.finish(&mut parser) {
        warn!("malformed XML in CAS2 response");
        return Err(Failure::Response(ResultCode::InvalidXml, None));
    }
    parser.finish().map_err(|err| {
        debug!(%err, "CAS2 response rejected");
        Failure::Response(err.result_code(), None)
    })
}

/// Redeems a PGT IOU at the proxy callback's retrieval endpoint.
fn retrieve_pgt<T: Transport + ?Sized>(
    transport: &mut T,
    retrieve_base_url: &str,
    pgtiou: &str,
) -> Result<Secret<String>, Failure> {
    let url = build_pgt_retrieval_url(retrieve_base_url, pgtiou)?;
    debug!(base_url = %retrieve_base_url, "retrieving proxy-granting ticket");

    let body = match fetch_body(transport, &url) {
        Ok(body) => body,
        Err(CasError::Transport(err)) => {
            warn!(error = %err, "proxy-granting ticket retrieval failed");
            return Err(Failure::Response(
                ResultCode::InvalidResponse,
                Some(err.message().to_string()),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    match String::from_utf8(body) {
        Ok(pgt) if has_ticket_prefix(&pgt, "PGT-") => Ok(Secret::new(pgt)),
        _ => {
            warn!("proxy-granting ticket retrieval returned no PGT");
            Err(Failure::Response(
                ResultCode::InvalidResponse,
                Some("proxy-granting ticket retrieval returned no PGT".to_string()),
            ))
        }
    }
}
