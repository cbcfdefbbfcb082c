//! Tokenizer events over a buffered byte source.

use std::io::BufRead;
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, ScopeError, StructureError};
use crate::types::Tag;

/// Events consumed by the transformer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// An element was opened.
    Open(Tag),
    /// Character data with entities resolved.
    Text(String),
    /// The innermost open element was closed.
    Close,
}

/// Pull-based tokenizer producing [`XmlEvent`]s.
///
/// Self-closing elements are reported as an `Open` followed by a `Close`.
/// Comments, processing instructions, declarations and CDATA are skipped.
/// Closing tags are checked against their opening tags by `quick-xml`.
pub struct EventReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> EventReader<R> {
    /// Create an event reader over a buffered source.
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = true;
        config.check_end_names = true;

        Self {
            reader,
            buf: Vec::with_capacity(4096),
        }
    }

    /// Byte offset of the input consumed so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        offset(self.reader.buffer_position())
    }

    /// Read the next event, or `None` at the end of input.
    ///
    /// # Errors
    /// Returns `ScopeError::Xml` for tokenizer errors (including I/O errors
    /// of the underlying source) and `ScopeError::Parse` for names that are
    /// not valid UTF-8.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        loop {
            self.buf.clear();

            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(source) => {
                    return Err(ScopeError::Xml {
                        position: offset(self.reader.error_position()),
                        source,
                    })
                }
            };
            let position = offset(self.reader.buffer_position());

            match event {
                Event::Start(start) => {
                    return to_tag(&start, position).map(|tag| Some(XmlEvent::Open(tag)));
                }
                Event::End(_) => return Ok(Some(XmlEvent::Close)),
                Event::Text(text) => {
                    let chars = text
                        .unescape()
                        .map_err(|source| ScopeError::Xml { position, source })?;
                    return Ok(Some(XmlEvent::Text(chars.into_owned())));
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

fn to_tag(start: &BytesStart<'_>, position: u64) -> Result<Tag> {
    let qname = start.name();
    let name = utf8(qname.as_ref(), "element name", position)?;
    let mut tag = Tag::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| ScopeError::Xml {
            position,
            source: e.into(),
        })?;
        let key = utf8(attribute.key.as_ref(), "attribute name", position)?;
        let value = attribute
            .unescape_value()
            .map_err(|source| ScopeError::Xml { position, source })?;
        tag.attributes.insert(key.to_string(), value.into_owned());
    }

    Ok(tag)
}

fn utf8<'a>(bytes: &'a [u8], what: &'static str, position: u64) -> Result<&'a str> {
    str::from_utf8(bytes).map_err(|_| ScopeError::Parse {
        position,
        source: StructureError::InvalidUtf8(what),
    })
}

fn offset<T: TryInto<u64>>(position: T) -> u64 {
    position.try_into().unwrap_or(u64::MAX)
}
