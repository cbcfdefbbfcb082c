//! Scope to JSON-LD - Stream Scope XML archive exports into JSON-LD.
//!
//! This crate converts the hierarchical XML export of a Scope archive into a
//! single JSON-LD document, holding neither the input nor the output in
//! memory. Each `Record` element becomes one entry of the `@graph` array,
//! emitted as soon as its closing tag has been read.
//!
//! # Example
//!
//! ```
//! use scope_jsonld::{convert, ConvertOptions, PropertyMap};
//!
//! let xml = r#"<Root>
//!   <Record Id="r1" IdName="Thing" ParentId="">
//!     <DataElement ElementId="1001">
//!       <ElementValue><TextValue>Alice</TextValue></ElementValue>
//!     </DataElement>
//!   </Record>
//! </Root>"#;
//!
//! let options = ConvertOptions::new()
//!     .with_properties(PropertyMap::try_from([("1001", "title")]).unwrap());
//! let mut out = Vec::new();
//! convert(xml.as_bytes(), &mut out, &options).unwrap();
//!
//! let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
//! assert_eq!(doc["@graph"][0]["title"][0], "Alice");
//! ```
//!
//! # Architecture
//!
//! The converter is organized into several modules:
//!
//! - [`config`]: Element names, conversion options and config file loading
//! - [`types`]: Core data types (Tag, Record, Value)
//! - [`error`]: Error types and Result alias
//! - [`xml`]: Adapter over the `quick-xml` tokenizer
//! - [`transform`]: Tag/record stack machine producing records
//! - [`reader`]: Lazy record iterator over a byte source
//! - [`envelope`]: Streaming `@context`/`@graph` document serializer
//! - [`convert`]: Blocking reader-to-writer conversion
//! - [`pipeline`]: Async two-stage pipeline with a bounded channel
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod convert;
pub mod envelope;
pub mod error;
pub mod pipeline;
pub mod reader;
pub mod transform;
pub mod types;
pub mod xml;

// Re-export main functions
pub use convert::{convert, ConversionStats};
pub use pipeline::Pipeline;
pub use reader::RecordReader;

// Re-export commonly used items
pub use config::{ConvertOptions, PipelineConfig, PropertyMap};
pub use envelope::{Envelope, EnvelopeChunks};
pub use error::{Result, ScopeError};
pub use types::{DateRange, Record, Tag, Value};
