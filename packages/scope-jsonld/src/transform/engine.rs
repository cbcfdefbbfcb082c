//! The transformer state machine.

use super::property::PropertyResolver;
use super::stack::TagStack;
use crate::config::{
    is_reserved_property, PropertyMap, DATA_ELEMENT, ELEMENT_VALUE, FROM_DATE, RECORD, TEXT_VALUE,
    TO_DATE,
};
use crate::error::StructureError;
use crate::types::{DateRange, Record, Tag, Value};

/// Stack machine that consumes tokenizer events and emits completed records.
///
/// Feed it `open_tag`, `text` and `close_tag` in document order. Each
/// `close_tag` of a `Record` element returns that record; it is never
/// touched again afterwards. Closing the root element finishes the machine.
#[derive(Debug, Default)]
pub struct ScopeTransformer {
    tags: TagStack,
    records: Vec<Record>,
    resolver: PropertyResolver,
    started: bool,
    finished: bool,
    emitted: usize,
}

impl ScopeTransformer {
    /// Create a transformer with an optional `ElementId` mapping.
    #[must_use]
    pub fn new(properties: Option<PropertyMap>) -> Self {
        Self {
            resolver: PropertyResolver::new(properties),
            ..Self::default()
        }
    }

    /// Handle an opening tag.
    ///
    /// # Errors
    /// Returns `StructureError::AfterRoot` if the root element was already closed.
    pub fn open_tag(&mut self, tag: Tag) -> Result<(), StructureError> {
        if self.finished {
            return Err(StructureError::AfterRoot);
        }
        self.started = true;

        if tag.is(RECORD) {
            self.records.push(Record::from_tag(&tag));
        }

        let opens_value = tag.is(ELEMENT_VALUE);
        self.tags.push(tag);

        if opens_value {
            self.open_value();
        }

        Ok(())
    }

    /// Handle character data.
    ///
    /// Text is only kept inside `TextValue`, `FromDate` and `ToDate` of a
    /// resolvable `DataElement`; everything else is ignored.
    pub fn text(&mut self, chars: &str) {
        let Some(property) = self.resolver.resolve(&self.tags) else {
            return;
        };
        let Some(slot) = self
            .records
            .last_mut()
            .and_then(|record| record.last_slot_mut(property))
        else {
            return;
        };

        match self.tags.current_name() {
            // Repeated text events overwrite: the last one wins.
            Some(TEXT_VALUE) => *slot = Some(Value::Text(chars.to_string())),
            Some(FROM_DATE) => {
                let value = slot.get_or_insert_with(|| Value::Range(DateRange::default()));
                value.update_range(|range| range.from = Some(chars.to_string()));
            }
            Some(TO_DATE) => {
                let value = slot.get_or_insert_with(|| Value::Range(DateRange::default()));
                value.update_range(|range| range.to = Some(chars.to_string()));
            }
            _ => {}
        }
    }

    /// Handle a closing tag, returning the record it completes, if any.
    ///
    /// # Errors
    /// Returns `StructureError::UnmatchedClose` if no element is open.
    pub fn close_tag(&mut self) -> Result<Option<Record>, StructureError> {
        let Some(current) = self.tags.current() else {
            return Err(StructureError::UnmatchedClose);
        };

        let mut completed = None;
        if current.is(DATA_ELEMENT) {
            if let (Some(property), Some(record)) =
                (self.resolver.resolve(&self.tags), self.records.last_mut())
            {
                record.compact(property);
            }
        } else if current.is(RECORD) {
            completed = self.records.pop();
        }

        self.tags.pop();

        if let Some(record) = &completed {
            self.emitted += 1;
            tracing::trace!(
                id = record.id.as_deref().unwrap_or_default(),
                depth = self.tags.depth(),
                "record completed"
            );
        }

        if self.tags.is_empty() {
            self.finished = true;
        }

        Ok(completed)
    }

    /// Check that the input ended in a consistent state.
    ///
    /// # Errors
    /// Returns `UnexpectedEof` if elements are still open, or `NoRoot` if no
    /// element was ever opened.
    pub fn finish(&self) -> Result<(), StructureError> {
        if let Some(open) = self.tags.current() {
            return Err(StructureError::UnexpectedEof {
                element: open.name.clone(),
                depth: self.tags.depth(),
            });
        }
        if !self.started {
            return Err(StructureError::NoRoot);
        }
        Ok(())
    }

    /// Whether the root element has been closed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Current element nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tags.depth()
    }

    /// Number of `Record` elements currently open.
    #[must_use]
    pub fn open_records(&self) -> usize {
        self.records.len()
    }

    /// Number of records emitted so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn open_value(&mut self) {
        let Some(property) = self.resolver.resolve(&self.tags) else {
            return;
        };
        let Some(record) = self.records.last_mut() else {
            return;
        };

        if is_reserved_property(property) {
            tracing::warn!(
                property,
                record = record.id.as_deref().unwrap_or_default(),
                "dropping value whose element id collides with a fixed record field"
            );
            return;
        }

        record.push_slot(property);
    }
}
