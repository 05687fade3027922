//! Streaming XML events.
//!
//! The CAS2 parser does not tokenize XML itself. It consumes [`XmlEvent`]s
//! from an [`XmlEventSource`], which is fed the response body chunk by chunk
//! and reports at the end whether the document was well formed.
//!
//! [`QuickXmlSource`] is the source used by sessions. It is backed by
//! `quick-xml` with namespace resolution, so elements carry the namespace URI
//! they are bound to rather than their prefix.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;

use crate::error::CasError;

/// An attribute of an element, namespace declarations excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Local name of the attribute
    pub name: String,
    /// Unescaped attribute value
    pub value: String,
}

impl XmlAttribute {
    /// Creates an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A structural XML event, delivered in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEvent<'a> {
    /// Start of the document; always the first event
    StartDocument,
    /// An element was opened
    StartElement {
        /// Namespace URI the element is bound to, if any
        namespace: Option<&'a str>,
        /// Element name without prefix
        local_name: &'a str,
        /// Attributes in document order
        attributes: &'a [XmlAttribute],
    },
    /// Character data. A text node may be split over several events.
    Characters(&'a str),
    /// An element was closed
    EndElement {
        /// Namespace URI the element is bound to, if any
        namespace: Option<&'a str>,
        /// Element name without prefix
        local_name: &'a str,
    },
    /// End of a well-formed document
    EndDocument,
}

/// Receives events from an [`XmlEventSource`].
pub trait XmlEventHandler {
    /// Handles one event.
    fn handle(&mut self, event: XmlEvent<'_>);
}

/// Incremental XML event producer.
///
/// Events are emitted synchronously from within [`feed`](Self::feed) and
/// [`finish`](Self::finish). Whether the document was malformed is only known
/// once `finish` returns.
pub trait XmlEventSource {
    /// Feeds the next chunk of the document.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::OutOfMemory`] if the chunk cannot be buffered.
    fn feed(&mut self, chunk: &[u8], handler: &mut dyn XmlEventHandler) -> Result<(), CasError>;

    /// Signals end of input. Returns `true` if the document was well formed.
    fn finish(&mut self, handler: &mut dyn XmlEventHandler) -> bool;
}

/// [`XmlEventSource`] backed by `quick-xml`.
///
/// Chunks are buffered as they are fed and the document is tokenized when
/// input ends, so every event is emitted from [`finish`](XmlEventSource::finish).
/// The document is rejected when it:
///
/// - is empty, or has no root element or more than one
/// - leaves an element unclosed, or closes one that is not open
/// - uses an undeclared namespace prefix or an unknown entity
/// - contains text outside the root element, or invalid UTF-8
///
/// # Examples
///
/// ```
/// use cas_client::xml::{QuickXmlSource, XmlEvent, XmlEventHandler, XmlEventSource};
///
/// struct Names(Vec<String>);
///
/// impl XmlEventHandler for Names {
///     fn handle(&mut self, event: XmlEvent<'_>) {
///         if let XmlEvent::StartElement { local_name, .. } = event {
///             self.0.push(local_name.to_string());
///         }
///     }
/// }
///
/// let mut source = QuickXmlSource::new();
/// let mut names = Names(Vec::new());
/// source.feed(b"<a><b/>", &mut names).unwrap();
/// source.feed(b"</a>", &mut names).unwrap();
///
/// assert!(source.finish(&mut names));
/// assert_eq!(names.0, ["a", "b"]);
/// ```
#[derive(Debug, Default)]
pub struct QuickXmlSource {
    buffer: Vec<u8>,
}

impl QuickXmlSource {
    /// Creates a source with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl XmlEventSource for QuickXmlSource {
    fn feed(&mut self, chunk: &[u8], _handler: &mut dyn XmlEventHandler) -> Result<(), CasError> {
        self.buffer.try_reserve(chunk.len())?;
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(&mut self, handler: &mut dyn XmlEventHandler) -> bool {
        let input = std::mem::take(&mut self.buffer);
        match tokenize(&input, handler) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%reason, "rejected malformed XML");
                false
            }
        }
    }
}

fn tokenize(input: &[u8], handler: &mut dyn XmlEventHandler) -> Result<(), String> {
    if input.iter().all(u8::is_ascii_whitespace) {
        return Err("empty document".to_string());
    }

    let mut reader = NsReader::from_reader(input);
    let mut buf = Vec::new();
    let mut attributes = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    handler.handle(XmlEvent::StartDocument);

    loop {
        buf.clear();
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|err| err.to_string())?;

        match &event {
            Event::Start(start) | Event::Empty(start) => {
                if depth == 0 && seen_root {
                    return Err("more than one root element".to_string());
                }
                seen_root = true;

                let namespace = namespace_uri(&resolved)?;
                let local_name = utf8(start.local_name().into_inner())?;
                collect_attributes(start, &mut attributes)?;

                handler.handle(XmlEvent::StartElement {
                    namespace,
                    local_name,
                    attributes: &attributes,
                });
                if matches!(event, Event::Empty(_)) {
                    handler.handle(XmlEvent::EndElement {
                        namespace,
                        local_name,
                    });
                } else {
                    depth += 1;
                }
            }
            Event::End(end) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "closing tag without open element".to_string())?;
                let namespace = namespace_uri(&resolved)?;
                let local_name = utf8(end.local_name().into_inner())?;
                handler.handle(XmlEvent::EndElement {
                    namespace,
                    local_name,
                });
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|err| err.to_string())?;
                emit_text(depth, text, handler)?;
            }
            Event::CData(data) => {
                let text = utf8(data)?;
                emit_text(depth, Cow::Borrowed(text), handler)?;
            }
            Event::Eof => {
                if depth > 0 {
                    return Err(format!("{} element(s) left unclosed", depth));
                }
                if !seen_root {
                    return Err("no root element".to_string());
                }
                handler.handle(XmlEvent::EndDocument);
                return Ok(());
            }
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }
}

fn emit_text(
    depth: usize,
    text: Cow<'_, str>,
    handler: &mut dyn XmlEventHandler,
) -> Result<(), String> {
    if depth == 0 {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err("text outside the root element".to_string());
    }
    if !text.is_empty() {
        handler.handle(XmlEvent::Characters(&text));
    }
    Ok(())
}

fn namespace_uri<'r>(resolved: &ResolveResult<'r>) -> Result<Option<&'r str>, String> {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => utf8(*uri).map(Some),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(prefix)
        )),
    }
}

fn collect_attributes(start: &BytesStart<'_>, out: &mut Vec<XmlAttribute>) -> Result<(), String> {
    out.clear();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| err.to_string())?;
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let name = utf8(attribute.key.local_name().into_inner())?.to_string();
        let value = attribute
            .unescape_value()
            .map_err(|err| err.to_string())?
            .into_owned();
        out.push(XmlAttribute { name, value });
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(bytes).map_err(|err| format!("invalid UTF-8: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl XmlEventHandler for Recorder {
        fn handle(&mut self, event: XmlEvent<'_>) {
            let line = match event {
                XmlEvent::StartDocument => "start-doc".to_string(),
                XmlEvent::StartElement {
                    namespace,
                    local_name,
                    attributes,
                } => {
                    let attrs: Vec<String> = attributes
                        .iter()
                        .map(|a| format!("{}={}", a.name, a.value))
                        .collect();
                    format!(
                        "open {{{}}}{} [{}]",
                        namespace.unwrap_or(""),
                        local_name,
                        attrs.join(",")
                    )
                }
                XmlEvent::Characters(text) => format!("text {:?}", text),
                XmlEvent::EndElement {
                    namespace,
                    local_name,
                } => format!("close {{{}}}{}", namespace.unwrap_or(""), local_name),
                XmlEvent::EndDocument => "end-doc".to_string(),
            };
            self.0.push(line);
        }
    }

    fn parse_chunks(chunks: &[&str]) -> (bool, Vec<String>) {
        let mut source = QuickXmlSource::new();
        let mut recorder = Recorder::default();
        for chunk in chunks {
            source.feed(chunk.as_bytes(), &mut recorder).unwrap();
        }
        let ok = source.finish(&mut recorder);
        (ok, recorder.0)
    }

    #[test]
    fn resolves_prefixed_namespaces() {
        let (ok, events) = parse_chunks(&[
            "<?xml version=\"1.0\"?>\n<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">",
            "<cas:user>alice</cas:user></cas:serviceResponse>",
        ]);

        assert!(ok);
        assert_eq!(
            events,
            vec![
                "start-doc",
                "open {http://www.yale.edu/tp/cas}serviceResponse []",
                "open {http://www.yale.edu/tp/cas}user []",
                "text \"alice\"",
                "close {http://www.yale.edu/tp/cas}user",
                "close {http://www.yale.edu/tp/cas}serviceResponse",
                "end-doc",
            ]
        );
    }

    #[test]
    fn filters_namespace_declarations_from_attributes() {
        let (ok, events) = parse_chunks(&[
            "<cas:f xmlns:cas=\"urn:x\" code=\"INVALID_TICKET\">m</cas:f>",
        ]);
        assert!(ok);
        assert_eq!(events[1], "open {urn:x}f [code=INVALID_TICKET]");
    }

    #[test]
    fn expands_empty_elements() {
        let (ok, events) = parse_chunks(&["<a><b/></a>"]);
        assert!(ok);
        assert_eq!(&events[2..4], ["open {}b []", "close {}b"]);
    }

    #[test]
    fn unescapes_entities_and_cdata() {
        let (ok, events) = parse_chunks(&["<a>x &amp; y<![CDATA[<z>]]></a>"]);
        assert!(ok);
        assert!(events.contains(&"text \"x & y\"".to_string()));
        assert!(events.contains(&"text \"<z>\"".to_string()));
    }

    #[test]
    fn unclosed_root_is_malformed() {
        let (ok, events) = parse_chunks(&["<a><b>text</b>"]);
        assert!(!ok);
        assert!(!events.contains(&"end-doc".to_string()));
    }

    #[test]
    fn mismatched_close_is_malformed() {
        assert!(!parse_chunks(&["<a></b>"]).0);
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(!parse_chunks(&[]).0);
        assert!(!parse_chunks(&["  \n"]).0);
    }

    #[test]
    fn multiple_roots_are_malformed() {
        assert!(!parse_chunks(&["<a/><b/>"]).0);
    }

    #[test]
    fn text_outside_root_is_malformed() {
        assert!(!parse_chunks(&["<a/>trailing"]).0);
        assert!(parse_chunks(&["\n<a/>\n"]).0);
    }

    #[test]
    fn undeclared_prefix_is_malformed() {
        assert!(!parse_chunks(&["<cas:a></cas:a>"]).0);
    }

    #[test]
    fn unknown_entity_is_malformed() {
        assert!(!parse_chunks(&["<a>&bogus;</a>"]).0);
    }

    #[test]
    fn source_is_reusable_after_finish() {
        let mut source = QuickXmlSource::new();
        let mut recorder = Recorder::default();
        source.feed(b"<a>", &mut recorder).unwrap();
        assert!(!source.finish(&mut recorder));

        let mut recorder = Recorder::default();
        source.feed(b"<b/>", &mut recorder).unwrap();
        assert!(source.finish(&mut recorder));
    }
}
