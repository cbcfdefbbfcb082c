//! Error types for the converter.
//!
//! Uses the dual-error pattern: `ScopeError` for library consumers with
//! detailed error context, and `StructureError` for the transformer, which
//! knows about nesting but not about byte positions.

use thiserror::Error;

/// Main error type for the converter library.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// The XML tokenizer rejected the input.
    #[error("XML parsing failed at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// The input is well-tokenized but not a well-formed document.
    #[error("Malformed document at byte {position}: {source}")]
    Parse {
        position: u64,
        #[source]
        source: StructureError,
    },

    /// Output sink rejected a write.
    #[error("Output sink failed: {0}")]
    Sink(#[source] std::io::Error),

    /// Conversion was cancelled before the document was completed.
    #[error("Conversion cancelled")]
    Cancelled,

    /// Invalid configuration file or value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A pipeline stage panicked or was aborted.
    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ScopeError {
    /// Whether this error was caused by malformed input markup.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Xml { .. } | Self::Parse { .. })
    }
}

/// Nesting violations detected by the transformer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// A closing tag arrived while no element was open.
    #[error("closing tag without matching opening tag")]
    UnmatchedClose,

    /// Input ended while elements were still open.
    #[error("unexpected end of input inside <{element}> ({depth} open elements)")]
    UnexpectedEof { element: String, depth: usize },

    /// Input ended before any element was opened.
    #[error("document has no root element")]
    NoRoot,

    /// An event arrived after the root element was closed.
    #[error("content after the root element")]
    AfterRoot,

    /// Element or attribute name is not valid UTF-8.
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
}

/// Result type alias for converter operations.
pub type Result<T> = std::result::Result<T, ScopeError>;
