use std::fmt;

use tracing::{debug, trace};

use crate::cas2::state::{transition, Effect, Field, Outcome, ParseState};
use crate::code::ResultCode;
use crate::secret::Secret;
use crate::xml::{XmlEvent, XmlEventHandler};

/// Fields extracted from a complete CAS2 response.
#[derive(Debug)]
pub struct Cas2Document {
    /// Outcome announced by the response
    pub outcome: Outcome,
    /// Text of `<user>`, empty unless the outcome is an authentication success
    pub principal: String,
    /// Text of the failure element, empty unless the outcome is a failure
    pub message: String,
    /// Text of `<proxyGrantingTicket>`, if present
    pub pgtiou: Option<Secret<String>>,
    /// Text of `<proxyTicket>`, if present and a `PT-` ticket
    pub proxy_ticket: Option<Secret<String>>,
}

/// Why a response did not yield a [`Cas2Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cas2ParseError {
    /// A text field could not be grown
    OutOfMemory,
    /// The automaton ended in this state instead of `Complete`
    Incomplete(ParseState),
}

impl Cas2ParseError {
    /// Returns the result code this error is reported as.
    pub fn result_code(self) -> ResultCode {
        match self {
            Cas2ParseError::OutOfMemory => ResultCode::OutOfMemory,
            Cas2ParseError::Incomplete(_) => ResultCode::InvalidResponse,
        }
    }
}

impl fmt::Display for Cas2ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cas2ParseError::OutOfMemory => write!(f, "out of memory while reading response"),
            Cas2ParseError::Incomplete(state) => {
                write!(f, "unexpected CAS2 response (stopped in state {:?})", state)
            }
        }
    }
}

impl std::error::Error for Cas2ParseError {}

/// Drives the CAS2 automaton from XML events and accumulates its text fields.
///
/// Character data is appended to the field of the current reading state as
/// it arrives, so a text node split over any number of events yields the
/// same value as a single event.
///
/// # Examples
///
/// ```
/// use cas_client::cas2::{Cas2Parser, Outcome, CAS_NAMESPACE};
/// use cas_client::xml::{XmlEvent, XmlEventHandler};
///
/// let open = |name| XmlEvent::StartElement {
///     namespace: Some(CAS_NAMESPACE),
///     local_name: name,
///     attributes: &[],
/// };
/// let close = |name| XmlEvent::EndElement {
///     namespace: Some(CAS_NAMESPACE),
///     local_name: name,
/// };
///
/// let mut parser = Cas2Parser::new();
/// for event in [
///     XmlEvent::StartDocument,
///     open("serviceResponse"),
///     open("authenticationSuccess"),
///     open("user"),
///     XmlEvent::Characters("al"),
///     XmlEvent::Characters("ice"),
///     close("user"),
///     close("authenticationSuccess"),
///     close("serviceResponse"),
///     XmlEvent::EndDocument,
/// ] {
///     parser.handle(event);
/// }
///
/// let document = parser.finish().unwrap();
/// assert_eq!(document.outcome, Outcome::AuthenticationSuccess);
/// assert_eq!(document.principal, "alice");
/// ```
#[derive(Debug, Default)]
pub struct Cas2Parser {
    state: ParseState,
    outcome: Option<Outcome>,
    principal: String,
    message: String,
    pgtiou: String,
    proxy_ticket: String,
    out_of_memory: bool,
}

impl Cas2Parser {
    /// Creates a parser in [`ParseState::NeedStartDoc`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current automaton state.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Returns `true` if a text field could not be grown.
    pub fn is_out_of_memory(&self) -> bool {
        self.out_of_memory
    }

    /// Consumes the parser and returns the extracted fields.
    ///
    /// # Errors
    ///
    /// Returns [`Cas2ParseError::OutOfMemory`] if a field could not be grown,
    /// and [`Cas2ParseError::Incomplete`] unless the automaton reached
    /// [`ParseState::Complete`].
    pub fn finish(self) -> Result<Cas2Document, Cas2ParseError> {
        if self.out_of_memory {
            return Err(Cas2ParseError::OutOfMemory);
        }
        match (self.state, self.outcome) {
            (ParseState::Complete, Some(outcome)) => Ok(Cas2Document {
                outcome,
                principal: self.principal,
                message: self.message,
                pgtiou: non_empty(self.pgtiou),
                proxy_ticket: non_empty(self.proxy_ticket),
            }),
            (state, _) => Err(Cas2ParseError::Incomplete(state)),
        }
    }

    fn apply(&mut self, effect: Effect<'_>) {
        match effect {
            Effect::None => {}
            Effect::SetOutcome(outcome) => self.outcome = Some(outcome),
            Effect::Append(field, text) => {
                let target = match field {
                    Field::Principal => &mut self.principal,
                    Field::Message => &mut self.message,
                    Field::PgtIou => &mut self.pgtiou,
                    Field::ProxyTicket => &mut self.proxy_ticket,
                };
                if target.try_reserve(text.len()).is_err() {
                    debug!(?field, "cannot grow response field");
                    self.out_of_memory = true;
                    self.state = ParseState::Fail;
                    return;
                }
                target.push_str(text);
            }
            Effect::FinishProxyTicket => {
                if !has_ticket_prefix(&self.proxy_ticket, "PT-") {
                    debug!("ignoring proxy ticket without PT- prefix");
                    self.proxy_ticket.clear();
                }
            }
        }
    }
}

impl XmlEventHandler for Cas2Parser {
    fn handle(&mut self, event: XmlEvent<'_>) {
        let (next, effect) = transition(self.state, event);
        if next != self.state {
            trace!(from = ?self.state, to = ?next, "cas2 transition");
            if next == ParseState::Fail {
                debug!(
                    state = ?self.state,
                    event = event_kind(&event),
                    "unexpected event in CAS2 response"
                );
            }
        }
        self.state = next;
        self.apply(effect);
    }
}

/// Returns `true` if `value` starts with `prefix`, ignoring ASCII case.
pub(crate) fn has_ticket_prefix(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn non_empty(value: String) -> Option<Secret<String>> {
    if value.is_empty() {
        None
    } else {
        Some(Secret::new(value))
    }
}

fn event_kind(event: &XmlEvent<'_>) -> &'static str {
    match event {
        XmlEvent::StartDocument => "start-document",
        XmlEvent::StartElement { .. } => "start-element",
        XmlEvent::Characters(_) => "characters",
        XmlEvent::EndElement { .. } => "end-element",
        XmlEvent::EndDocument => "end-document",
    }
}
