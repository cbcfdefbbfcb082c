//! Scope transformer: a stack machine turning tokenizer events into records.
//!
//! Tokenizer events arrive one at a time, so nesting state lives in explicit
//! stacks instead of the call stack. The [`TagStack`] mirrors the open XML
//! elements; the transformer keeps a parallel stack of open records and emits
//! each record when its closing tag is processed.

mod engine;
mod property;
mod stack;

pub use engine::ScopeTransformer;
pub use property::PropertyResolver;
pub use stack::TagStack;
