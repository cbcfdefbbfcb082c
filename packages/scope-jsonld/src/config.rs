//! Configuration constants, conversion options and config file loading.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{Result, ScopeError};

/// Element that becomes one output record.
pub const RECORD: &str = "Record";

/// Element naming a field through its `ElementId` attribute.
pub const DATA_ELEMENT: &str = "DataElement";

/// Single value container inside a `DataElement`.
pub const ELEMENT_VALUE: &str = "ElementValue";

/// Plain text value.
pub const TEXT_VALUE: &str = "TextValue";

/// Start of a date range value.
pub const FROM_DATE: &str = "FromDate";

/// End of a date range value.
pub const TO_DATE: &str = "ToDate";

/// Record attribute copied to `@id`.
pub const ATTR_ID: &str = "Id";

/// Record attribute copied to `name`.
pub const ATTR_ID_NAME: &str = "IdName";

/// Record attribute copied to `parent`.
pub const ATTR_PARENT_ID: &str = "ParentId";

/// `DataElement` attribute used to resolve the property name.
pub const ATTR_ELEMENT_ID: &str = "ElementId";

/// Output keys owned by the record itself.
///
/// Mapped properties may not use these names.
pub const RESERVED_PROPERTIES: [&str; 3] = ["@id", "name", "parent"];

/// Default number of records buffered between the transform and serializer stages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Environment variable overriding [`DEFAULT_CHANNEL_CAPACITY`].
pub const CHANNEL_CAPACITY_ENV: &str = "SCOPE_CHANNEL_CAPACITY";

/// Check whether a property name collides with a fixed record field.
///
/// # Examples
/// ```
/// use scope_jsonld::config::is_reserved_property;
///
/// assert!(is_reserved_property("@id"));
/// assert!(!is_reserved_property("title"));
/// ```
#[must_use]
pub fn is_reserved_property(name: &str) -> bool {
    RESERVED_PROPERTIES.contains(&name)
}

/// Mapping from `ElementId` values to output property names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: HashMap<String, String>,
}

impl PropertyMap {
    /// Build a mapping, rejecting targets that collide with fixed record fields.
    ///
    /// # Errors
    /// Returns `ScopeError::Config` naming the first offending element id.
    pub fn new(entries: HashMap<String, String>) -> Result<Self> {
        let mut reserved: Vec<(&String, &String)> = entries
            .iter()
            .filter(|(_, property)| is_reserved_property(property))
            .collect();
        reserved.sort();

        if let Some((element_id, property)) = reserved.first() {
            return Err(ScopeError::Config(format!(
                "element id '{element_id}' maps to reserved property '{property}'"
            )));
        }

        Ok(Self { entries })
    }

    /// Look up the property name for an element id.
    #[must_use]
    pub fn get(&self, element_id: &str) -> Option<&str> {
        self.entries.get(element_id).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<HashMap<String, String>> for PropertyMap {
    type Error = ScopeError;

    fn try_from(entries: HashMap<String, String>) -> Result<Self> {
        Self::new(entries)
    }
}

impl<const N: usize> TryFrom<[(&str, &str); N]> for PropertyMap {
    type Error = ScopeError;

    fn try_from(pairs: [(&str, &str); N]) -> Result<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Options consumed by the transformer and the envelope serializer.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// JSON-LD context, injected verbatim as `@context`.
    pub context: Option<Value>,

    /// Element id mapping; without it element ids are used as property names.
    pub properties: Option<PropertyMap>,
}

impl ConvertOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JSON-LD context.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the property mapping.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// Settings for the streaming pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Records buffered between the transform and serializer stages.
    pub channel_capacity: usize,
}

impl PipelineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Read settings from the environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns `ScopeError::Config` if `SCOPE_CHANNEL_CAPACITY` is set but
    /// not a positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_capacity_var(std::env::var(CHANNEL_CAPACITY_ENV).ok().as_deref())
    }

    fn from_capacity_var(value: Option<&str>) -> Result<Self> {
        let Some(raw) = value else {
            return Ok(Self::new());
        };

        let channel_capacity = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|capacity| *capacity > 0)
            .ok_or_else(|| {
                ScopeError::Config(format!(
                    "{CHANNEL_CAPACITY_ENV} must be a positive integer, got '{raw}'"
                ))
            })?;

        Ok(Self { channel_capacity })
    }

    /// Override the channel capacity. Zero is raised to one.
    #[must_use]
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity.max(1);
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a JSON-LD context file.
///
/// Any JSON value is accepted and passed through unmodified.
///
/// # Errors
/// Returns `ScopeError::Config` if the file cannot be read or is not JSON.
pub fn load_context(path: &Path) -> Result<Value> {
    let raw = read_config_file(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| ScopeError::Config(format!("{}: invalid JSON: {e}", path.display())))
}

/// Load an `ElementId` to property mapping file.
///
/// The file must contain a JSON object with string values.
///
/// # Errors
/// Returns `ScopeError::Config` if the file cannot be read, has the wrong
/// shape, or maps to a reserved property name.
pub fn load_properties(path: &Path) -> Result<PropertyMap> {
    let raw = read_config_file(path)?;
    let entries: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
        ScopeError::Config(format!(
            "{}: expected an object of strings: {e}",
            path.display()
        ))
    })?;

    PropertyMap::new(entries).map_err(|e| match e {
        ScopeError::Config(msg) => ScopeError::Config(format!("{}: {msg}", path.display())),
        other => other,
    })
}

fn read_config_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| ScopeError::Config(format!("cannot read {}: {e}", path.display())))
}
