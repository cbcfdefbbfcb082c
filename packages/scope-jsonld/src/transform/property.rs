//! Property name resolution for values inside a `DataElement`.

use super::stack::TagStack;
use crate::config::{PropertyMap, ATTR_ELEMENT_ID, DATA_ELEMENT};

/// Resolves the output property for the current position in the document.
#[derive(Debug, Clone, Default)]
pub struct PropertyResolver {
    properties: Option<PropertyMap>,
}

impl PropertyResolver {
    /// Create a resolver.
    ///
    /// Without a mapping, `ElementId` values are used as property names.
    #[must_use]
    pub fn new(properties: Option<PropertyMap>) -> Self {
        Self { properties }
    }

    /// Resolve the property of the nearest enclosing `DataElement`.
    ///
    /// Returns `None` outside a `DataElement`, when the element has no
    /// `ElementId`, when a mapping is configured and does not contain it, or
    /// when the resolved name is empty.
    #[must_use]
    pub fn resolve<'a>(&'a self, tags: &'a TagStack) -> Option<&'a str> {
        let element_id = tags.find(DATA_ELEMENT)?.attribute(ATTR_ELEMENT_ID)?;

        let property = match &self.properties {
            Some(map) => map.get(element_id),
            None => Some(element_id),
        };
        property.filter(|name| !name.is_empty())
    }
}
