//! CAS2 `serviceResponse` parsing.
//!
//! A CAS2 response is an XML document in the [`CAS_NAMESPACE`]:
//!
//! ```text
//! <cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
//!     <cas:authenticationSuccess>
//!         <cas:user>alice</cas:user>
//!         <cas:proxyGrantingTicket>PGTIOU-84678-8a9d...</cas:proxyGrantingTicket>
//!     </cas:authenticationSuccess>
//! </cas:serviceResponse>
//! ```
//!
//! It is read by a strict automaton: [`transition`] defines the legal event in
//! every [`ParseState`], and [`Cas2Parser`] feeds it events from an
//! [`XmlEventSource`](crate::xml::XmlEventSource) while accumulating text.

mod machine;
mod state;

pub(crate) use machine::has_ticket_prefix;
pub use machine::{Cas2Document, Cas2ParseError, Cas2Parser};
pub use state::{transition, Effect, FailureBlock, Field, Outcome, ParseState, CAS_NAMESPACE};
