//! Streaming JSON-LD envelope.
//!
//! Wraps a record sequence into one document of the shape
//!
//! ```text
//! {
//! "@context":<context>,
//! "@graph": [
//! <record>,
//! <record>
//! ]}
//! ```
//!
//! emitting one chunk per record so nothing but the current record is held.

use std::iter::FusedIterator;

use serde_json::Value;

use crate::error::Result;
use crate::types::Record;

/// Separator written between graph entries.
pub const GRAPH_SEPARATOR: &str = ",\n";

/// Closes the graph array and the document.
pub const DOCUMENT_FOOTER: &str = "\n]}\n";

/// Chunk builder for one JSON-LD document.
///
/// The header is prefixed to the first record chunk, or to the footer when
/// the graph is empty, so a document that fails before its first record has
/// produced no output at all.
#[derive(Debug, Clone)]
pub struct Envelope {
    header: String,
    records: usize,
}

impl Envelope {
    /// Create an envelope around the given context.
    ///
    /// An absent context is written as `null`.
    ///
    /// # Errors
    /// Returns `ScopeError::Json` if the context cannot be serialized.
    pub fn new(context: Option<&Value>) -> Result<Self> {
        let context = serde_json::to_string(&context)?;
        Ok(Self {
            header: format!("{{\n\"@context\":{context},\n\"@graph\": [\n"),
            records: 0,
        })
    }

    /// Serialize one record into its chunk.
    ///
    /// # Errors
    /// Returns `ScopeError::Json` if the record cannot be serialized; the
    /// envelope is unchanged in that case.
    pub fn record_chunk(&mut self, record: &Record) -> Result<String> {
        let json = serde_json::to_string(record)?;

        let prefix = if self.records == 0 {
            self.header.as_str()
        } else {
            GRAPH_SEPARATOR
        };
        let mut chunk = String::with_capacity(prefix.len() + json.len());
        chunk.push_str(prefix);
        chunk.push_str(&json);

        self.records += 1;
        Ok(chunk)
    }

    /// Produce the closing chunk of a completed document.
    #[must_use]
    pub fn finish(self) -> String {
        if self.records == 0 {
            self.header + DOCUMENT_FOOTER
        } else {
            DOCUMENT_FOOTER.to_string()
        }
    }

    /// Number of records serialized so far.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }
}

/// Iterator adapter turning a record sequence into document chunks.
///
/// An upstream error is passed through and ends the iteration; the footer is
/// only produced after the upstream sequence ends cleanly.
pub struct EnvelopeChunks<I> {
    records: I,
    envelope: Option<Envelope>,
}

impl<I> EnvelopeChunks<I>
where
    I: Iterator<Item = Result<Record>>,
{
    /// Wrap a record iterator.
    ///
    /// # Errors
    /// Returns `ScopeError::Json` if the context cannot be serialized.
    pub fn new(records: I, context: Option<&Value>) -> Result<Self> {
        Ok(Self {
            records,
            envelope: Some(Envelope::new(context)?),
        })
    }
}

impl<I> Iterator for EnvelopeChunks<I>
where
    I: Iterator<Item = Result<Record>>,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let envelope = self.envelope.as_mut()?;

        match self.records.next() {
            Some(Ok(record)) => {
                let chunk = envelope.record_chunk(&record);
                if chunk.is_err() {
                    self.envelope = None;
                }
                Some(chunk)
            }
            Some(Err(e)) => {
                self.envelope = None;
                Some(Err(e))
            }
            None => self.envelope.take().map(|envelope| Ok(envelope.finish())),
        }
    }
}

impl<I> FusedIterator for EnvelopeChunks<I> where I: Iterator<Item = Result<Record>> {}
