//! States and transition function of the CAS2 response automaton.
//!
//! [`transition`] is pure: it maps a state and one [`XmlEvent`] to the next
//! state plus an [`Effect`] describing what the caller should record. It does
//! no I/O and owns no buffers, so it can be driven by a synthetic event stream.

use crate::code::ResultCode;
use crate::xml::{XmlAttribute, XmlEvent};

/// Namespace URI of CAS protocol elements.
pub const CAS_NAMESPACE: &str = "http://www.yale.edu/tp/cas";

/// Which failure element opened a [`ParseState::ReadFailureMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureBlock {
    /// `authenticationFailure`
    Authentication,
    /// `proxyFailure`
    Proxy,
}

/// State of the CAS2 response automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    /// Waiting for the start of the document
    #[default]
    NeedStartDoc,
    /// Waiting for `<serviceResponse>`
    NeedOpenServiceResponse,
    /// Waiting for a success or failure element
    NeedOpenOutcome,
    /// Inside `<authenticationSuccess>`, waiting for `<user>`
    NeedOpenUser,
    /// Reading the principal
    ReadUser,
    /// After `</user>`: `<proxyGrantingTicket>` or `</authenticationSuccess>`
    NeedOpenPgtOrCloseSuccess,
    /// Reading the PGT IOU
    ReadPgt,
    /// After `</proxyGrantingTicket>`, waiting for `</authenticationSuccess>`
    NeedCloseSuccess,
    /// Inside `<proxySuccess>`, waiting for `<proxyTicket>`
    NeedOpenProxyTicket,
    /// Reading the proxy ticket
    ReadProxyTicket,
    /// After `</proxyTicket>`, waiting for `</proxySuccess>`
    NeedCloseProxySuccess,
    /// Reading the text of a failure element
    ReadFailureMessage(FailureBlock),
    /// Waiting for `</serviceResponse>`
    NeedCloseServiceResponse,
    /// Waiting for the end of the document
    NeedEndDoc,
    /// A complete, well-formed response was read
    Complete,
    /// An unexpected event was seen; every later event is ignored
    Fail,
}

impl ParseState {
    /// Returns `true` for `Complete` and `Fail`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ParseState::Complete | ParseState::Fail)
    }
}

/// Protocol outcome announced by the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `<authenticationSuccess>`
    AuthenticationSuccess,
    /// `<authenticationFailure code="...">`
    AuthenticationFailure(ResultCode),
    /// `<proxySuccess>`
    ProxySuccess,
    /// `<proxyFailure code="...">`
    ProxyFailure(ResultCode),
}

impl Outcome {
    /// Returns the result code this outcome is reported as.
    pub fn result_code(self) -> ResultCode {
        match self {
            Outcome::AuthenticationSuccess => ResultCode::ValidationSuccess,
            Outcome::ProxySuccess => ResultCode::ProxySuccess,
            Outcome::AuthenticationFailure(code) | Outcome::ProxyFailure(code) => code,
        }
    }
}

/// Text field a character event is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The authenticated user
    Principal,
    /// The PGT IOU
    PgtIou,
    /// The proxy ticket
    ProxyTicket,
    /// The failure message
    Message,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect<'e> {
    /// Nothing to record
    None,
    /// Record the announced outcome
    SetOutcome(Outcome),
    /// Append text to a field
    Append(Field, &'e str),
    /// The proxy ticket element closed; keep its text only if it is a `PT-` ticket
    FinishProxyTicket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CasElement {
    ServiceResponse,
    AuthenticationSuccess,
    AuthenticationFailure,
    ProxySuccess,
    ProxyFailure,
    User,
    ProxyGrantingTicket,
    ProxyTicket,
}

enum Element {
    Cas(CasElement),
    UnknownCas,
    Foreign,
}

const ELEMENTS: [(&str, CasElement); 8] = [
    ("serviceResponse", CasElement::ServiceResponse),
    ("authenticationSuccess", CasElement::AuthenticationSuccess),
    ("authenticationFailure", CasElement::AuthenticationFailure),
    ("proxySuccess", CasElement::ProxySuccess),
    ("proxyFailure", CasElement::ProxyFailure),
    ("user", CasElement::User),
    ("proxyGrantingTicket", CasElement::ProxyGrantingTicket),
    ("proxyTicket", CasElement::ProxyTicket),
];

fn classify(namespace: Option<&str>, local_name: &str) -> Element {
    match namespace {
        Some(uri) if uri.eq_ignore_ascii_case(CAS_NAMESPACE) => ELEMENTS
            .iter()
            .find(|(name, _)| local_name.eq_ignore_ascii_case(name))
            .map_or(Element::UnknownCas, |(_, element)| Element::Cas(*element)),
        _ => Element::Foreign,
    }
}

fn failure_code(attributes: &[XmlAttribute], block: FailureBlock) -> Option<ResultCode> {
    match attributes {
        [attribute] if attribute.name.eq_ignore_ascii_case("code") => {
            ResultCode::from_failure_attribute(&attribute.value, block == FailureBlock::Proxy)
        }
        _ => None,
    }
}

const FAIL: (ParseState, Effect<'static>) = (ParseState::Fail, Effect::None);

/// Computes the next state for one event.
///
/// Elements outside the CAS namespace cause no transition. A CAS element
/// with an unknown name, an element in the wrong place, or non-whitespace
/// text outside a reading state moves the automaton to [`ParseState::Fail`],
/// which absorbs every later event.
///
/// # Examples
///
/// ```
/// use cas_client::cas2::{transition, Effect, ParseState};
/// use cas_client::xml::XmlEvent;
///
/// let (state, effect) = transition(ParseState::ReadUser, XmlEvent::Characters("alice"));
/// assert_eq!(state, ParseState::ReadUser);
/// assert!(matches!(effect, Effect::Append(_, "alice")));
///
/// let (state, _) = transition(ParseState::NeedOpenOutcome, XmlEvent::Characters("junk"));
/// assert_eq!(state, ParseState::Fail);
/// ```
pub fn transition<'e>(state: ParseState, event: XmlEvent<'e>) -> (ParseState, Effect<'e>) {
    if state == ParseState::Fail {
        return FAIL;
    }

    match event {
        XmlEvent::StartDocument => match state {
            ParseState::NeedStartDoc => (ParseState::NeedOpenServiceResponse, Effect::None),
            _ => FAIL,
        },
        XmlEvent::EndDocument => match state {
            ParseState::NeedEndDoc => (ParseState::Complete, Effect::None),
            _ => FAIL,
        },
        XmlEvent::Characters(text) => characters(state, text),
        XmlEvent::StartElement {
            namespace,
            local_name,
            attributes,
        } => match classify(namespace, local_name) {
            Element::Foreign => (state, Effect::None),
            Element::UnknownCas => FAIL,
            Element::Cas(element) => open(state, element, attributes),
        },
        XmlEvent::EndElement {
            namespace,
            local_name,
        } => match classify(namespace, local_name) {
            Element::Foreign => (state, Effect::None),
            Element::UnknownCas => FAIL,
            Element::Cas(element) => close(state, element),
        },
    }
}

fn characters(state: ParseState, text: &str) -> (ParseState, Effect<'_>) {
    let field = match state {
        ParseState::ReadUser => Field::Principal,
        ParseState::ReadPgt => Field::PgtIou,
        ParseState::ReadProxyTicket => Field::ProxyTicket,
        ParseState::ReadFailureMessage(_) => Field::Message,
        _ if text.bytes().all(|b| b.is_ascii_whitespace()) => return (state, Effect::None),
        _ => return FAIL,
    };
    (state, Effect::Append(field, text))
}

fn open<'e>(
    state: ParseState,
    element: CasElement,
    attributes: &[XmlAttribute],
) -> (ParseState, Effect<'e>) {
    use CasElement as E;
    use ParseState as S;

    match (state, element) {
        (S::NeedOpenServiceResponse, E::ServiceResponse) => (S::NeedOpenOutcome, Effect::None),
        (S::NeedOpenOutcome, E::AuthenticationSuccess) => (
            S::NeedOpenUser,
            Effect::SetOutcome(Outcome::AuthenticationSuccess),
        ),
        (S::NeedOpenOutcome, E::ProxySuccess) => (
            S::NeedOpenProxyTicket,
            Effect::SetOutcome(Outcome::ProxySuccess),
        ),
        (S::NeedOpenOutcome, E::AuthenticationFailure) => {
            match failure_code(attributes, FailureBlock::Authentication) {
                Some(code) => (
                    S::ReadFailureMessage(FailureBlock::Authentication),
                    Effect::SetOutcome(Outcome::AuthenticationFailure(code)),
                ),
                None => FAIL,
            }
        }
        (S::NeedOpenOutcome, E::ProxyFailure) => {
            match failure_code(attributes, FailureBlock::Proxy) {
                Some(code) => (
                    S::ReadFailureMessage(FailureBlock::Proxy),
                    Effect::SetOutcome(Outcome::ProxyFailure(code)),
                ),
                None => FAIL,
            }
        }
        (S::NeedOpenUser, E::User) => (S::ReadUser, Effect::None),
        (S::NeedOpenPgtOrCloseSuccess, E::ProxyGrantingTicket) => (S::ReadPgt, Effect::None),
        (S::NeedOpenProxyTicket, E::ProxyTicket) => (S::ReadProxyTicket, Effect::None),
        _ => FAIL,
    }
}

fn close<'e>(state: ParseState, element: CasElement) -> (ParseState, Effect<'e>) {
    use CasElement as E;
    use ParseState as S;

    match (state, element) {
        (S::ReadUser, E::User) => (S::NeedOpenPgtOrCloseSuccess, Effect::None),
        (S::NeedOpenPgtOrCloseSuccess | S::NeedCloseSuccess, E::AuthenticationSuccess) => {
            (S::NeedCloseServiceResponse, Effect::None)
        }
        (S::ReadPgt, E::ProxyGrantingTicket) => (S::NeedCloseSuccess, Effect::None),
        (S::ReadProxyTicket, E::ProxyTicket) => {
            (S::NeedCloseProxySuccess, Effect::FinishProxyTicket)
        }
        (S::NeedCloseProxySuccess, E::ProxySuccess) => (S::NeedCloseServiceResponse, Effect::None),
        (S::ReadFailureMessage(FailureBlock::Authentication), E::AuthenticationFailure)
        | (S::ReadFailureMessage(FailureBlock::Proxy), E::ProxyFailure) => {
            (S::NeedCloseServiceResponse, Effect::None)
        }
        (S::NeedCloseServiceResponse, E::ServiceResponse) => (S::NeedEndDoc, Effect::None),
        _ => FAIL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_event<'a>(local_name: &'a str, attributes: &'a [XmlAttribute]) -> XmlEvent<'a> {
        XmlEvent::StartElement {
            namespace: Some(CAS_NAMESPACE),
            local_name,
            attributes,
        }
    }

    fn close_event(local_name: &str) -> XmlEvent<'_> {
        XmlEvent::EndElement {
            namespace: Some(CAS_NAMESPACE),
            local_name,
        }
    }

    #[test]
    fn start_document_only_from_initial_state() {
        assert_eq!(
            transition(ParseState::NeedStartDoc, XmlEvent::StartDocument).0,
            ParseState::NeedOpenServiceResponse
        );
        assert_eq!(
            transition(ParseState::NeedOpenOutcome, XmlEvent::StartDocument).0,
            ParseState::Fail
        );
    }

    #[test]
    fn element_names_match_case_insensitively() {
        let (state, _) = transition(
            ParseState::NeedOpenServiceResponse,
            open_event("SERVICERESPONSE", &[]),
        );
        assert_eq!(state, ParseState::NeedOpenOutcome);
    }

    #[test]
    fn element_names_require_exact_length() {
        let (state, _) = transition(
            ParseState::NeedOpenServiceResponse,
            open_event("serviceResponseX", &[]),
        );
        assert_eq!(state, ParseState::Fail);
    }

    #[test]
    fn namespace_requires_exact_match() {
        let event = XmlEvent::StartElement {
            namespace: Some("http://www.yale.edu/tp/cas-extended"),
            local_name: "serviceResponse",
            attributes: &[],
        };
        // Not the CAS namespace: ignored rather than matched by prefix.
        assert_eq!(
            transition(ParseState::NeedOpenServiceResponse, event).0,
            ParseState::NeedOpenServiceResponse
        );
    }

    #[test]
    fn foreign_elements_cause_no_transition() {
        let event = XmlEvent::StartElement {
            namespace: None,
            local_name: "user",
            attributes: &[],
        };
        assert_eq!(
            transition(ParseState::NeedOpenUser, event),
            (ParseState::NeedOpenUser, Effect::None)
        );
    }

    #[test]
    fn unknown_cas_element_fails() {
        assert_eq!(
            transition(ParseState::NeedOpenPgtOrCloseSuccess, open_event("attributes", &[])).0,
            ParseState::Fail
        );
    }

    #[test]
    fn failure_code_sets_outcome() {
        let attributes = [XmlAttribute::new("code", "INVALID_TICKET")];
        let (state, effect) = transition(
            ParseState::NeedOpenOutcome,
            open_event("authenticationFailure", &attributes),
        );
        assert_eq!(state, ParseState::ReadFailureMessage(FailureBlock::Authentication));
        assert_eq!(
            effect,
            Effect::SetOutcome(Outcome::AuthenticationFailure(ResultCode::InvalidTicket))
        );
    }

    #[test]
    fn failure_requires_exactly_one_code_attribute() {
        let none: [XmlAttribute; 0] = [];
        let two = [
            XmlAttribute::new("code", "INVALID_TICKET"),
            XmlAttribute::new("extra", "1"),
        ];
        let wrong = [XmlAttribute::new("reason", "INVALID_TICKET")];

        for attributes in [&none[..], &two[..], &wrong[..]] {
            let (state, _) = transition(
                ParseState::NeedOpenOutcome,
                open_event("authenticationFailure", attributes),
            );
            assert_eq!(state, ParseState::Fail);
        }
    }

    #[test]
    fn bad_pgt_only_in_proxy_failure() {
        let attributes = [XmlAttribute::new("code", "BAD_PGT")];
        assert_eq!(
            transition(
                ParseState::NeedOpenOutcome,
                open_event("authenticationFailure", &attributes)
            )
            .0,
            ParseState::Fail
        );
        assert_eq!(
            transition(ParseState::NeedOpenOutcome, open_event("proxyFailure", &attributes)).1,
            Effect::SetOutcome(Outcome::ProxyFailure(ResultCode::BadPgt))
        );
    }

    #[test]
    fn failure_close_must_match_opening_block() {
        let state = ParseState::ReadFailureMessage(FailureBlock::Proxy);
        assert_eq!(
            transition(state, close_event("authenticationFailure")).0,
            ParseState::Fail
        );
        assert_eq!(
            transition(state, close_event("proxyFailure")).0,
            ParseState::NeedCloseServiceResponse
        );
    }

    #[test]
    fn whitespace_is_tolerated_outside_reading_states() {
        for state in [
            ParseState::NeedOpenServiceResponse,
            ParseState::NeedOpenOutcome,
            ParseState::NeedCloseServiceResponse,
            ParseState::NeedEndDoc,
        ] {
            assert_eq!(
                transition(state, XmlEvent::Characters(" \n\t ")),
                (state, Effect::None)
            );
        }
    }

    #[test]
    fn non_ascii_whitespace_outside_reading_states_fails() {
        for text in ["\u{a0}", "\u{2003}", " \u{3000} "] {
            assert_eq!(
                transition(ParseState::NeedOpenOutcome, XmlEvent::Characters(text)).0,
                ParseState::Fail
            );
        }
    }

    #[test]
    fn reading_states_append_verbatim() {
        assert_eq!(
            transition(ParseState::ReadPgt, XmlEvent::Characters(" PGTIOU-1 ")).1,
            Effect::Append(Field::PgtIou, " PGTIOU-1 ")
        );
        assert_eq!(
            transition(
                ParseState::ReadFailureMessage(FailureBlock::Authentication),
                XmlEvent::Characters("Ticket ST-1 not recognized")
            )
            .1,
            Effect::Append(Field::Message, "Ticket ST-1 not recognized")
        );
    }

    #[test]
    fn closing_proxy_ticket_finishes_it() {
        assert_eq!(
            transition(ParseState::ReadProxyTicket, close_event("proxyTicket")),
            (ParseState::NeedCloseProxySuccess, Effect::FinishProxyTicket)
        );
    }

    #[test]
    fn fail_absorbs_everything() {
        for event in [
            XmlEvent::StartDocument,
            XmlEvent::Characters("x"),
            open_event("serviceResponse", &[]),
            XmlEvent::EndDocument,
        ] {
            assert_eq!(transition(ParseState::Fail, event), FAIL);
        }
    }

    #[test]
    fn events_after_complete_fail() {
        assert_eq!(
            transition(ParseState::Complete, XmlEvent::EndDocument).0,
            ParseState::Fail
        );
    }

    #[test]
    fn outcome_result_codes() {
        assert_eq!(
            Outcome::AuthenticationSuccess.result_code(),
            ResultCode::ValidationSuccess
        );
        assert_eq!(Outcome::ProxySuccess.result_code(), ResultCode::ProxySuccess);
        assert_eq!(
            Outcome::ProxyFailure(ResultCode::BadPgt).result_code(),
            ResultCode::BadPgt
        );
    }
}
