//! Streaming record reader.
//!
//! Drives the tokenizer and the transformer together, yielding each record
//! as soon as its closing tag has been read. Memory use is bounded by the
//! nesting depth and the size of the records currently open.
//!
//! # Example
//!
//! ```
//! use scope_jsonld::reader::RecordReader;
//!
//! let xml = r#"<Root><Record Id="r1" IdName="Thing" ParentId=""/></Root>"#;
//! let ids: Vec<_> = RecordReader::new(xml.as_bytes(), None)
//!     .map(|record| record.unwrap().id)
//!     .collect();
//! assert_eq!(ids, vec![Some("r1".to_string())]);
//! ```

use std::io::BufRead;
use std::iter::FusedIterator;

use tokio_util::sync::CancellationToken;

use crate::config::PropertyMap;
use crate::error::{Result, ScopeError, StructureError};
use crate::transform::ScopeTransformer;
use crate::types::Record;
use crate::xml::{EventReader, XmlEvent};

/// Lazy iterator over the records of a Scope export.
///
/// Yields `Ok(record)` in closing-tag order. A malformed document yields a
/// single `Err` and then ends; records still open at that point are
/// discarded. Input after the root element is never read.
///
/// With a cancellation token attached, the token is checked before every
/// tokenizer event and a cancelled reader yields `ScopeError::Cancelled`.
pub struct RecordReader<R: BufRead> {
    events: EventReader<R>,
    transformer: ScopeTransformer,
    cancel: Option<CancellationToken>,
    done: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Create a reader with an optional `ElementId` mapping.
    pub fn new(input: R, properties: Option<PropertyMap>) -> Self {
        Self {
            events: EventReader::new(input),
            transformer: ScopeTransformer::new(properties),
            cancel: None,
            done: false,
        }
    }

    /// Stop reading once `cancel` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Byte offset of the input consumed so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.events.position()
    }

    /// Number of records yielded so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.transformer.emitted()
    }

    fn structure_error(&self, source: StructureError) -> ScopeError {
        ScopeError::Parse {
            position: self.events.position(),
            source,
        }
    }

    fn read_next(&mut self) -> Result<Option<Record>> {
        while !self.transformer.is_finished() {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(ScopeError::Cancelled);
            }

            let Some(event) = self.events.next_event()? else {
                self.transformer
                    .finish()
                    .map_err(|e| self.structure_error(e))?;
                return Ok(None);
            };

            match event {
                XmlEvent::Open(tag) => self
                    .transformer
                    .open_tag(tag)
                    .map_err(|e| self.structure_error(e))?,
                XmlEvent::Text(chars) => self.transformer.text(&chars),
                XmlEvent::Close => {
                    let completed = self
                        .transformer
                        .close_tag()
                        .map_err(|e| self.structure_error(e))?;
                    if completed.is_some() {
                        return Ok(completed);
                    }
                }
            }
        }

        Ok(None)
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                tracing::debug!(records = self.records_read(), "end of record sequence");
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> FusedIterator for RecordReader<R> {}
