//! Core data types: tokenizer tags and output records.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::config::{ATTR_ID, ATTR_ID_NAME, ATTR_PARENT_ID};

/// An open XML element as delivered by the tokenizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    /// Element name.
    pub name: String,

    /// Attribute values by attribute name.
    pub attributes: HashMap<String, String>,
}

impl Tag {
    /// Create a tag without attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Check the element name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}

/// A date range accumulated from `FromDate` and `ToDate` children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// A single property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Text from a `TextValue` element.
    Text(String),

    /// A `{from, to}` object.
    Range(DateRange),
}

impl Value {
    /// Whether the value carries no content.
    ///
    /// Only empty text counts as empty; a range is kept even if both ends are unset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Range(_) => false,
        }
    }

    /// Update this value as a range, replacing non-range content with an empty range.
    pub fn update_range(&mut self, update: impl FnOnce(&mut DateRange)) {
        let mut range = match std::mem::replace(self, Self::Range(DateRange::default())) {
            Self::Range(range) => range,
            Self::Text(_) => DateRange::default(),
        };
        update(&mut range);
        *self = Self::Range(range);
    }
}

/// A value slot: `None` until a text child fills it.
pub type Slot = Option<Value>;

/// One output entity, built from a `Record` element.
///
/// Fixed fields come from the element attributes; dynamic properties keep
/// the order in which they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// `@id`, from the `Id` attribute.
    pub id: Option<String>,

    /// `name`, from the `IdName` attribute.
    pub name: Option<String>,

    /// `parent`, from the `ParentId` attribute.
    pub parent: Option<String>,

    properties: Vec<(String, Vec<Slot>)>,
}

impl Record {
    /// Seed a record from the attributes of a `Record` tag.
    #[must_use]
    pub fn from_tag(tag: &Tag) -> Self {
        Self {
            id: tag.attribute(ATTR_ID).map(String::from),
            name: tag.attribute(ATTR_ID_NAME).map(String::from),
            parent: tag.attribute(ATTR_PARENT_ID).map(String::from),
            properties: Vec::new(),
        }
    }

    /// Get the value slots of a property.
    #[must_use]
    pub fn values(&self, property: &str) -> Option<&[Slot]> {
        self.properties
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, values)| values.as_slice())
    }

    /// Iterate over property names in insertion order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    /// Append an empty slot to a property, creating the property if needed.
    pub fn push_slot(&mut self, property: &str) {
        match self.values_mut(property) {
            Some(values) => values.push(None),
            None => self.properties.push((property.to_string(), vec![None])),
        }
    }

    /// Get the most recently appended slot of a property.
    pub fn last_slot_mut(&mut self, property: &str) -> Option<&mut Slot> {
        self.values_mut(property)?.last_mut()
    }

    /// Drop empty slots of a property, removing the property if none remain.
    pub fn compact(&mut self, property: &str) {
        let Some(index) = self.properties.iter().position(|(name, _)| name == property) else {
            return;
        };

        let values = &mut self.properties[index].1;
        values.retain(|slot| slot.as_ref().is_some_and(|value| !value.is_empty()));

        if values.is_empty() {
            self.properties.remove(index);
        }
    }

    fn values_mut(&mut self, property: &str) -> Option<&mut Vec<Slot>> {
        self.properties
            .iter_mut()
            .find(|(name, _)| name == property)
            .map(|(_, values)| values)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.id {
            map.serialize_entry("@id", id)?;
        }
        if let Some(name) = &self.name {
            map.serialize_entry("name", name)?;
        }
        if let Some(parent) = &self.parent {
            map.serialize_entry("parent", parent)?;
        }
        for (property, values) in &self.properties {
            map.serialize_entry(property, values)?;
        }
        map.end()
    }
}
