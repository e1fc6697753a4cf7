#![forbid(unsafe_code)]

//! Model classes: per-type defaults and computed fields.
//!
//! A class is matched to a resource when its name equals the resource `type`
//! ignoring ASCII case. Defaults become local fields that resource fields of
//! the same name override; computed fields are read-only and derived from the
//! model on every read.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use jsync_core::{Result, SyncError};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::model::ResourceModel;

/// Read-only field derived from the model.
pub type ComputedField = Rc<dyn Fn(&ResourceModel) -> Value>;

/// Serializable part of a [`ModelClass`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelClassConfig {
    /// Class name, matched case-insensitively against resource `type`.
    pub name: String,
    /// Default field values.
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

/// Per-type model behavior.
#[derive(Clone)]
pub struct ModelClass {
    name: String,
    defaults: Map<String, Value>,
    computed: BTreeMap<String, ComputedField>,
}

impl ModelClass {
    /// Class for resources of type `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: Map::new(),
            computed: BTreeMap::new(),
        }
    }

    /// Build from deserialized configuration.
    #[must_use]
    pub fn from_config(config: ModelClassConfig) -> Self {
        Self {
            name: config.name,
            defaults: config.defaults,
            computed: BTreeMap::new(),
        }
    }

    /// Parse `{"name": .., "defaults": {..}}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: ModelClassConfig = serde_json::from_str(text)?;
        if config.name.is_empty() {
            return Err(SyncError::InvalidDocument("model class name is empty".into()));
        }
        Ok(Self::from_config(config))
    }

    /// Add a default field.
    #[must_use]
    pub fn default_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    /// Add a computed field.
    #[must_use]
    pub fn computed(mut self, key: impl Into<String>, field: impl Fn(&ResourceModel) -> Value + 'static) -> Self {
        self.computed.insert(key.into(), Rc::new(field));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    /// Names of the computed fields.
    pub fn computed_names(&self) -> impl Iterator<Item = &str> {
        self.computed.keys().map(String::as_str)
    }

    pub(crate) fn computed_field(&self, key: &str) -> Option<ComputedField> {
        self.computed.get(key).cloned()
    }

    /// Whether this class applies to resources of `resource_type`.
    #[must_use]
    pub fn matches(&self, resource_type: &str) -> bool {
        self.name.eq_ignore_ascii_case(resource_type)
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .finish()
    }
}
