//! HTTP transports.
//!
//! A [`Transport`] performs one GET per call and streams the response body to
//! a caller-supplied sink, chunk by chunk. Two implementations ship with the
//! crate:
//!
//! - [`HttpTransport`]: blocking `reqwest` client with TLS, CA and redirect
//!   settings taken from a [`TransportConfig`]
//! - [`ScriptedTransport`]: in-memory transport that records requested URLs
//!   and replays queued responses, for deterministic offline tests

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Read};
use std::ops::ControlFlow;
use std::path::Path;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::{Certificate, Url};
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::error::{CasError, TransportError, TransportErrorKind};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A blocking HTTP GET client that streams response bodies.
pub trait Transport {
    /// Fetches `url` and passes the response body to `sink` in order, one chunk at a time.
    ///
    /// The sink returns [`ControlFlow::Break`] to stop the transfer early, in
    /// which case the transport returns a [`TransportErrorKind::Aborted`] error.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request cannot be completed.
    fn get(
        &mut self,
        url: &str,
        sink: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(
        &mut self,
        url: &str,
        sink: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> Result<(), TransportError> {
        (**self).get(url, sink)
    }
}

/// Transport backed by a blocking `reqwest` client.
///
/// - follows at most `max_redirects` redirects, only to `http`/`https` URLs
/// - verifies server certificates unless `verify_tls` is off
/// - trusts only the configured CA certificates when `ca_path` is set
/// - does not treat non-2xx statuses as errors: the body is still handed to
///   the sink, so an error page surfaces as an unparseable response
///
/// # Examples
///
/// ```no_run
/// use cas_client::{HttpTransport, TransportConfig};
///
/// let transport = HttpTransport::new(TransportConfig::default().with_ca_path("/etc/ssl/certs"))
///     .expect("valid transport configuration");
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Creates a transport from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::Configuration`] if the CA path cannot be read or
    /// contains no usable certificate, or if the client cannot be built.
    pub fn new(config: TransportConfig) -> Result<Self, CasError> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Replaces the configuration, rebuilding the underlying client.
    ///
    /// On error the previous configuration stays in effect.
    ///
    /// # Errors
    ///
    /// Same conditions as [`HttpTransport::new`].
    pub fn reconfigure(&mut self, config: TransportConfig) -> Result<(), CasError> {
        self.client = build_client(&config)?;
        self.config = config;
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn get(
        &mut self,
        url: &str,
        sink: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> Result<(), TransportError> {
        check_scheme(url)?;

        let mut response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "server answered with non-success status");
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut received = 0usize;
        loop {
            let n = match response.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };

            received = received.saturating_add(n);
            if received > self.config.max_response_bytes {
                return Err(TransportError::new(
                    TransportErrorKind::BodyTooLarge,
                    format!(
                        "response body exceeds {} bytes",
                        self.config.max_response_bytes
                    ),
                ));
            }

            debug!(bytes = n, "received response chunk");
            if sink(&chunk[..n]).is_break() {
                return Err(TransportError::new(
                    TransportErrorKind::Aborted,
                    "transfer aborted by body consumer",
                ));
            }
        }
        Ok(())
    }
}

fn is_http_scheme(scheme: &str) -> bool {
    scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
}

fn check_scheme(url: &str) -> Result<(), TransportError> {
    let parsed = Url::parse(url).map_err(|err| {
        TransportError::new(TransportErrorKind::Request, format!("invalid URL: {}", err))
    })?;
    if is_http_scheme(parsed.scheme()) {
        Ok(())
    } else {
        Err(TransportError::new(
            TransportErrorKind::UnsupportedScheme,
            format!("unsupported URL scheme '{}'", parsed.scheme()),
        ))
    }
}

fn build_client(config: &TransportConfig) -> Result<Client, CasError> {
    let max_redirects = config.max_redirects;
    let redirect = Policy::custom(move |attempt| {
        if !is_http_scheme(attempt.url().scheme()) {
            attempt.error("redirect to unsupported URL scheme")
        } else if attempt.previous().len() > max_redirects {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    });

    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(redirect)
        .connect_timeout(config.connect_timeout)
        .timeout(config.timeout)
        .danger_accept_invalid_certs(!config.verify_tls);

    if let Some(path) = &config.ca_path {
        for certificate in load_ca_certificates(path)? {
            builder = builder.add_root_certificate(certificate);
        }
        builder = builder.tls_built_in_root_certs(false);
    }

    builder
        .build()
        .map_err(|err| CasError::Configuration(format!("cannot build HTTP client: {}", err)))
}

/// Loads CA certificates from a PEM bundle file or a directory of PEM files.
fn load_ca_certificates(path: &Path) -> Result<Vec<Certificate>, CasError> {
    let unreadable = |err: std::io::Error| {
        CasError::Configuration(format!("CA path {}: {}", path.display(), err))
    };

    let metadata = fs::metadata(path).map_err(unreadable)?;
    let mut certificates = Vec::new();

    if metadata.is_dir() {
        for entry in fs::read_dir(path).map_err(unreadable)? {
            let file = entry.map_err(unreadable)?.path();
            if !file.is_file() {
                continue;
            }
            let pem = match fs::read(&file) {
                Ok(pem) => pem,
                Err(err) => {
                    debug!(file = %file.display(), error = %err, "skipping unreadable CA file");
                    continue;
                }
            };
            match Certificate::from_pem_bundle(&pem) {
                Ok(found) => certificates.extend(found),
                Err(err) => {
                    debug!(file = %file.display(), error = %err, "skipping non-PEM CA file")
                }
            }
        }
    } else {
        let pem = fs::read(path).map_err(unreadable)?;
        let found = Certificate::from_pem_bundle(&pem).map_err(|err| {
            CasError::Configuration(format!("CA bundle {}: {}", path.display(), err))
        })?;
        certificates.extend(found);
    }

    if certificates.is_empty() {
        return Err(CasError::Configuration(format!(
            "no CA certificates found at {}",
            path.display()
        )));
    }
    debug!(path = %path.display(), count = certificates.len(), "loaded CA certificates");
    Ok(certificates)
}

/// A response queued on a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedResponse {
    /// Body delivered to the sink as the given chunks, in order
    Body(Vec<Vec<u8>>),
    /// The request fails with this error
    Failure(TransportError),
}

/// In-memory transport for tests and demos.
///
/// Every call to [`get`](Transport::get) records the requested URL and
/// replays the next queued response. When the queue is empty the request
/// fails with a [`TransportErrorKind::Connect`] error.
///
/// # Examples
///
/// ```
/// use std::ops::ControlFlow;
/// use cas_client::{ScriptedTransport, Transport};
///
/// let mut transport = ScriptedTransport::new().with_chunks(["yes\nal", "ice\n"]);
///
/// let mut body = Vec::new();
/// transport
///     .get("https://cas/validate?service=s&ticket=ST-1", &mut |chunk| {
///         body.extend_from_slice(chunk);
///         ControlFlow::Continue(())
///     })
///     .unwrap();
///
/// assert_eq!(body, b"yes\nalice\n");
/// assert_eq!(transport.requests(), ["https://cas/validate?service=s&ticket=ST-1"]);
/// ```
#[derive(Default, Clone)]
pub struct ScriptedTransport {
    responses: VecDeque<ScriptedResponse>,
    requests: Vec<String>,
}

impl ScriptedTransport {
    /// Creates a transport with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response delivered as a single chunk.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.push_body(body);
        self
    }

    /// Queues a response delivered as the given chunks.
    pub fn with_chunks<I, C>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        self.push_chunks(chunks);
        self
    }

    /// Queues a failing request.
    pub fn with_failure(mut self, error: TransportError) -> Self {
        self.push_failure(error);
        self
    }

    /// Queues a response delivered as a single chunk.
    pub fn push_body(&mut self, body: impl Into<Vec<u8>>) {
        self.responses
            .push_back(ScriptedResponse::Body(vec![body.into()]));
    }

    /// Queues a response delivered as the given chunks.
    pub fn push_chunks<I, C>(&mut self, chunks: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        self.responses.push_back(ScriptedResponse::Body(
            chunks.into_iter().map(Into::into).collect(),
        ));
    }

    /// Queues a failing request.
    pub fn push_failure(&mut self, error: TransportError) {
        self.responses.push_back(ScriptedResponse::Failure(error));
    }

    /// Returns the URLs requested so far, in order.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    /// Returns the number of requests made so far.
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// Returns the number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.responses.len()
    }
}

// Recorded URLs carry tickets; only counts are printed.
impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("pending", &self.responses.len())
            .field("requests", &self.requests.len())
            .finish()
    }
}

impl Transport for ScriptedTransport {
    fn get(
        &mut self,
        url: &str,
        sink: &mut dyn FnMut(&[u8]) -> ControlFlow<()>,
    ) -> Result<(), TransportError> {
        self.requests.push(url.to_string());

        match self.responses.pop_front() {
            None => Err(TransportError::new(
                TransportErrorKind::Connect,
                "no scripted response for request",
            )),
            Some(ScriptedResponse::Failure(error)) => Err(error),
            Some(ScriptedResponse::Body(chunks)) => {
                for chunk in &chunks {
                    if sink(chunk).is_break() {
                        return Err(TransportError::new(
                            TransportErrorKind::Aborted,
                            "transfer aborted by body consumer",
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(transport: &mut dyn Transport, url: &str) -> Result<Vec<Vec<u8>>, TransportError> {
        let mut chunks = Vec::new();
        transport.get(url, &mut |chunk| {
            chunks.push(chunk.to_vec());
            ControlFlow::Continue(())
        })?;
        Ok(chunks)
    }

    #[test]
    fn scripted_transport_replays_in_order() {
        let mut transport = ScriptedTransport::new()
            .with_body("first")
            .with_chunks(["sec", "ond"]);

        assert_eq!(collect(&mut transport, "http://a/1").unwrap(), vec![b"first".to_vec()]);
        assert_eq!(
            collect(&mut transport, "http://a/2").unwrap(),
            vec![b"sec".to_vec(), b"ond".to_vec()]
        );
        assert_eq!(transport.requests(), ["http://a/1", "http://a/2"]);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn scripted_transport_fails_when_exhausted() {
        let mut transport = ScriptedTransport::new();
        let err = collect(&mut transport, "http://a/").unwrap_err();

        assert_eq!(err.kind(), TransportErrorKind::Connect);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn scripted_transport_replays_failures() {
        let error = TransportError::new(TransportErrorKind::Timeout, "timed out");
        let mut transport = ScriptedTransport::new().with_failure(error.clone());

        assert_eq!(collect(&mut transport, "http://a/").unwrap_err(), error);
    }

    #[test]
    fn sink_break_aborts_transfer() {
        let mut transport = ScriptedTransport::new().with_chunks(["a", "b", "c"]);
        let mut seen = 0;
        let err = transport
            .get("http://a/", &mut |_| {
                seen += 1;
                ControlFlow::Break(())
            })
            .unwrap_err();

        assert_eq!(err.kind(), TransportErrorKind::Aborted);
        assert_eq!(seen, 1);
    }

    #[test]
    fn debug_output_hides_recorded_urls() {
        let mut transport = ScriptedTransport::new().with_body("x");
        collect(&mut transport, "http://a/?ticket=ST-hidden").unwrap();

        let debug = format!("{:?}", transport);
        assert!(!debug.contains("ST-hidden"));
        assert!(debug.contains("requests: 1"));
    }

    #[test]
    fn boxed_transport_delegates() {
        let mut transport: Box<dyn Transport> = Box::new(ScriptedTransport::new().with_body("x"));
        assert_eq!(collect(&mut transport, "http://a/").unwrap(), vec![b"x".to_vec()]);
    }

    #[test]
    fn scheme_check_accepts_only_http() {
        assert!(check_scheme("http://cas.example.org/validate").is_ok());
        assert!(check_scheme("HTTPS://cas.example.org/validate").is_ok());
        assert_eq!(
            check_scheme("ftp://cas.example.org/").unwrap_err().kind(),
            TransportErrorKind::UnsupportedScheme
        );
        assert_eq!(
            check_scheme("not a url").unwrap_err().kind(),
            TransportErrorKind::Request
        );
    }

    #[test]
    fn http_transport_rejects_missing_ca_path() {
        let config = TransportConfig::default().with_ca_path("/nonexistent/cas-client/ca.pem");
        let err = HttpTransport::new(config).unwrap_err();
        assert!(matches!(err, CasError::Configuration(_)));
    }

    #[test]
    fn http_transport_builds_with_defaults() {
        let transport = HttpTransport::new(TransportConfig::default()).unwrap();
        assert!(transport.config().verify_tls);
    }

    #[test]
    fn http_transport_refuses_unsupported_scheme_without_network() {
        let mut transport = HttpTransport::new(TransportConfig::default()).unwrap();
        let err = collect(&mut transport, "file:///etc/passwd").unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::UnsupportedScheme);
    }
}
