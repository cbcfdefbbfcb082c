//! Stack of currently open elements.

use crate::types::Tag;

/// Open elements, innermost on top.
///
/// The depth always equals the current XML nesting depth.
#[derive(Debug, Clone, Default)]
pub struct TagStack {
    tags: Vec<Tag>,
}

impl TagStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    pub fn pop(&mut self) -> Option<Tag> {
        self.tags.pop()
    }

    /// The innermost open element.
    #[must_use]
    pub fn current(&self) -> Option<&Tag> {
        self.tags.last()
    }

    /// Name of the innermost open element.
    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.current().map(|tag| tag.name.as_str())
    }

    /// Find the nearest open element with the given name, searching outward.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().rev().find(|tag| tag.is(name))
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
