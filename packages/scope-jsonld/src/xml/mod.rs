//! Adapter between the `quick-xml` pull reader and the transformer.
//!
//! The tokenizer itself is `quick-xml`; this module only reduces its event
//! vocabulary to open-tag, text and close-tag.

mod events;

pub use events::{EventReader, XmlEvent};
