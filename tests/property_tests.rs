//! Property tests for cas-client.
//!
//! These tests validate cross-module invariants: URL construction,
//! chunk-boundary independence of response parsing, and isolation of
//! results between calls.

use cas_client::{
    cas1::{parse_response, Cas1Response},
    url::{build_pgt_retrieval_url, build_proxy_url, build_service_validate_url},
    ResultCode, ScriptedTransport, Session, ValidationRequest,
};
use proptest::prelude::*;

// Strategy: characters that need no XML escaping
fn arb_principal() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9._@-]{1,32}").unwrap()
}

// Strategy: URL components as a caller would pass them, already escaped
fn arb_component() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9%._~:/-]{0,40}").unwrap()
}

// Strategy: one scripted server answer
#[derive(Debug, Clone)]
enum Scripted {
    Success(String),
    Failure(String),
    Cas1No,
}

fn arb_scripted() -> impl Strategy<Value = Scripted> {
    prop_oneof![
        arb_principal().prop_map(Scripted::Success),
        prop::string::string_regex("[A-Za-z0-9 .]{1,40}")
            .unwrap()
            .prop_map(Scripted::Failure),
        Just(Scripted::Cas1No),
    ]
}

fn success_body(user: &str) -> String {
    format!(
        "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\n  \
         <cas:authenticationSuccess>\n    <cas:user>{}</cas:user>\n  \
         </cas:authenticationSuccess>\n</cas:serviceResponse>\n",
        user
    )
}

fn failure_body(message: &str) -> String {
    format!(
        "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
         <cas:authenticationFailure code=\"INVALID_SERVICE\">{}</cas:authenticationFailure>\
         </cas:serviceResponse>",
        message
    )
}

fn request() -> ValidationRequest {
    ValidationRequest::new("https://cas/serviceValidate", "svc", "ST-1")
}

/// Splits `body` at the given byte offsets (reduced modulo its length).
fn split_at_offsets(body: &str, offsets: &[usize]) -> Vec<Vec<u8>> {
    let bytes = body.as_bytes();
    let mut cuts: Vec<usize> = offsets.iter().map(|o| o % (bytes.len() + 1)).collect();
    cuts.push(0);
    cuts.push(bytes.len());
    cuts.sort_unstable();
    cuts.dedup();
    cuts.windows(2).map(|w| bytes[w[0]..w[1]].to_vec()).collect()
}

proptest! {
    /// Property: the validate URL is the exact concatenation of its parts
    #[test]
    fn proptest_service_validate_url_is_exact(
        base in arb_component(),
        service in arb_component(),
        ticket in arb_component(),
        renew in any::<bool>(),
        callback in prop::option::of(arb_component()),
    ) {
        let url =
            build_service_validate_url(&base, &service, &ticket, renew, callback.as_deref())
                .unwrap();

        let mut expected = format!("{}?service={}&ticket={}", base, service, ticket);
        if renew {
            expected.push_str("&renew=true");
        }
        if let Some(callback) = &callback {
            expected.push_str("&pgtUrl=");
            expected.push_str(callback);
        }
        prop_assert_eq!(&url, &expected);
        prop_assert_eq!(url.len(), url.capacity());
    }

    /// Property: proxy and PGT retrieval URLs are exact concatenations
    #[test]
    fn proptest_proxy_urls_are_exact(
        base in arb_component(),
        target in arb_component(),
        token in arb_component(),
    ) {
        prop_assert_eq!(
            build_proxy_url(&base, &target, &token).unwrap(),
            format!("{}?targetService={}&pgt={}", base, target, token)
        );
        prop_assert_eq!(
            build_pgt_retrieval_url(&base, &token).unwrap(),
            format!("{}?pgtIou={}", base, token)
        );
    }

    /// Property: chunk boundaries never change the resolved principal
    #[test]
    fn proptest_principal_is_chunk_invariant(
        principal in arb_principal(),
        offsets in prop::collection::vec(any::<usize>(), 0..8),
    ) {
        cas_client::initialize();
        let body = success_body(&principal);
        let transport = ScriptedTransport::new()
            .with_body(body.clone())
            .with_chunks(split_at_offsets(&body, &offsets));
        let mut session = Session::with_transport(transport).unwrap();

        prop_assert_eq!(session.service_validate(&request()), ResultCode::ValidationSuccess);
        let whole = session.principal().map(str::to_string);

        prop_assert_eq!(session.service_validate(&request()), ResultCode::ValidationSuccess);
        prop_assert_eq!(session.principal(), whole.as_deref());
        prop_assert_eq!(session.principal(), Some(principal.as_str()));
    }

    /// Property: any truncation of a valid response is rejected
    #[test]
    fn proptest_truncated_response_never_succeeds(
        principal in arb_principal(),
        cut in any::<usize>(),
    ) {
        cas_client::initialize();
        let body = success_body(&principal);
        let end = body.trim_end().len();
        let truncated = &body[..cut % end];
        let transport = ScriptedTransport::new().with_body(truncated);
        let mut session = Session::with_transport(transport).unwrap();

        let code = session.service_validate(&request());
        prop_assert!(
            code == ResultCode::InvalidXml || code == ResultCode::InvalidResponse,
            "unexpected {:?}", code
        );
        prop_assert_eq!(session.principal(), None);
    }

    /// Property: CAS1 "yes" responses yield the second line as principal
    #[test]
    fn proptest_cas1_principal(principal in "[^\n]{0,40}", trailer in "(\n.*)?") {
        let body = format!("yes\n{}{}", principal, trailer);
        prop_assert_eq!(parse_response(body.as_bytes()), Cas1Response::Yes(principal));
    }

    /// Property: a session only ever exposes results of the latest call
    #[test]
    fn proptest_results_never_leak_between_calls(
        script in prop::collection::vec(arb_scripted(), 1..6),
    ) {
        cas_client::initialize();
        let mut transport = ScriptedTransport::new();
        for step in &script {
            match step {
                Scripted::Success(user) => transport.push_body(success_body(user)),
                Scripted::Failure(message) => transport.push_body(failure_body(message)),
                Scripted::Cas1No => transport.push_body("no\n\n"),
            }
        }
        let mut session = Session::with_transport(transport).unwrap();

        for step in &script {
            match step {
                Scripted::Success(user) => {
                    let code = session.service_validate(&request());
                    prop_assert_eq!(code, ResultCode::ValidationSuccess);
                    prop_assert_eq!(session.principal(), Some(user.as_str()));
                    prop_assert_eq!(session.message(), None);
                }
                Scripted::Failure(message) => {
                    let code = session.service_validate(&request());
                    prop_assert_eq!(code, ResultCode::InvalidService);
                    prop_assert_eq!(session.principal(), None);
                    prop_assert_eq!(session.message(), Some(message.as_str()));
                }
                Scripted::Cas1No => {
                    let code = session.cas1_validate(&request());
                    prop_assert_eq!(code, ResultCode::Cas1ValidationNo);
                    prop_assert_eq!(session.principal(), None);
                    prop_assert_eq!(session.message(), None);
                }
            }
        }
    }

    /// Property: tickets never appear in debug output
    #[test]
    fn proptest_tickets_are_redacted(ticket in "ST-[A-Za-z0-9]{8,20}") {
        let request = ValidationRequest::new("https://cas/serviceValidate", "svc", ticket.clone());
        let debug = format!("{:?}", request);
        prop_assert!(!debug.contains(&ticket));
    }
}
