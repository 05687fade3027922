//! Construction of CAS request URLs.
//!
//! The builders concatenate pre-escaped components in the fixed parameter
//! order deployed CAS servers expect. They never escape anything themselves:
//! callers escape the service URL (and any other untrusted component) first,
//! for example with [`escape`].
//!
//! Output is reserved to the exact final length up front; if that
//! reservation fails the builder reports [`CasError::OutOfMemory`] instead of
//! producing a truncated URL.

use std::borrow::Cow;

use crate::error::CasError;

const SERVICE: &str = "?service=";
const TICKET: &str = "&ticket=";
const RENEW: &str = "&renew=true";
const PGT_URL: &str = "&pgtUrl=";
const PGT_IOU: &str = "?pgtIou=";
const TARGET_SERVICE: &str = "?targetService=";
const PGT: &str = "&pgt=";

/// Builds a CAS1 `validate` or CAS2 `serviceValidate` URL.
///
/// Produces `<base>?service=<service>&ticket=<ticket>`, followed by
/// `&renew=true` when `renew` is set and `&pgtUrl=<callback>` when a
/// proxy callback URL is given.
///
/// # Errors
///
/// Returns [`CasError::OutOfMemory`] if the output buffer cannot be reserved.
///
/// # Examples
///
/// ```
/// use cas_client::url::build_service_validate_url;
///
/// let url = build_service_validate_url("http://s/v", "esc", "ST-1", false, None).unwrap();
/// assert_eq!(url, "http://s/v?service=esc&ticket=ST-1");
///
/// let url = build_service_validate_url("http://s/v", "esc", "ST-1", true, Some("cb")).unwrap();
/// assert_eq!(url, "http://s/v?service=esc&ticket=ST-1&renew=true&pgtUrl=cb");
/// ```
pub fn build_service_validate_url(
    base_url: &str,
    escaped_service: &str,
    ticket: &str,
    renew: bool,
    escaped_pgt_callback_url: Option<&str>,
) -> Result<String, CasError> {
    let renew_part = if renew { RENEW } else { "" };
    match escaped_pgt_callback_url {
        Some(callback) => concat_exact(&[
            base_url,
            SERVICE,
            escaped_service,
            TICKET,
            ticket,
            renew_part,
            PGT_URL,
            callback,
        ]),
        None => concat_exact(&[
            base_url,
            SERVICE,
            escaped_service,
            TICKET,
            ticket,
            renew_part,
        ]),
    }
}

/// Builds the URL used to redeem a PGT IOU at the proxy callback's retrieval endpoint.
///
/// # Errors
///
/// Returns [`CasError::OutOfMemory`] if the output buffer cannot be reserved.
///
/// # Examples
///
/// ```
/// use cas_client::url::build_pgt_retrieval_url;
///
/// let url = build_pgt_retrieval_url("https://app/pgt", "PGTIOU-1").unwrap();
/// assert_eq!(url, "https://app/pgt?pgtIou=PGTIOU-1");
/// ```
pub fn build_pgt_retrieval_url(base_url: &str, pgtiou: &str) -> Result<String, CasError> {
    concat_exact(&[base_url, PGT_IOU, pgtiou])
}

/// Builds a CAS2 `proxy` URL requesting a proxy ticket for a target service.
///
/// # Errors
///
/// Returns [`CasError::OutOfMemory`] if the output buffer cannot be reserved.
///
/// # Examples
///
/// ```
/// use cas_client::url::build_proxy_url;
///
/// let url = build_proxy_url("https://cas/proxy", "svc", "PGT-1").unwrap();
/// assert_eq!(url, "https://cas/proxy?targetService=svc&pgt=PGT-1");
/// ```
pub fn build_proxy_url(
    base_url: &str,
    escaped_target_service: &str,
    pgt: &str,
) -> Result<String, CasError> {
    concat_exact(&[base_url, TARGET_SERVICE, escaped_target_service, PGT, pgt])
}

/// Percent-escapes a URL component, e.g. a service URL passed as `service=`.
///
/// # Examples
///
/// ```
/// use cas_client::url::escape;
///
/// assert_eq!(escape("http://localhost/"), "http%3A%2F%2Flocalhost%2F");
/// ```
pub fn escape(component: &str) -> Cow<'_, str> {
    urlencoding::encode(component)
}

fn concat_exact(parts: &[&str]) -> Result<String, CasError> {
    let len = parts
        .iter()
        .try_fold(0usize, |acc, part| acc.checked_add(part.len()))
        .ok_or(CasError::OutOfMemory)?;

    let mut url = String::new();
    url.try_reserve_exact(len)?;
    for part in parts {
        url.push_str(part);
    }
    Ok(url)
}
