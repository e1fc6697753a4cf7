#![forbid(unsafe_code)]

//! Per-type definitions for tracked models: defaults, computed fields and a
//! relationship map (relationship key → related resource type).

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use jsync_core::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::model::TrackedModel;

/// Read-only field derived from the model.
pub type TrackedComputed = Rc<dyn Fn(&TrackedModel) -> Value>;

/// Serializable part of a [`ModelDefinition`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionConfig {
    /// Relationship key → related resource type.
    #[serde(default)]
    pub relationships: BTreeMap<String, String>,
    /// Values for fields the resource does not supply.
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

/// Behavior applied to tracked models of one resource type.
#[derive(Clone, Default)]
pub struct ModelDefinition {
    relationships: BTreeMap<String, String>,
    defaults: Map<String, Value>,
    computed: BTreeMap<String, TrackedComputed>,
}

impl ModelDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_config(config: DefinitionConfig) -> Self {
        Self {
            relationships: config.relationships,
            defaults: config.defaults,
            computed: BTreeMap::new(),
        }
    }

    /// Parse `{"relationships": {..}, "defaults": {..}}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: DefinitionConfig = serde_json::from_str(text)?;
        Ok(Self::from_config(config))
    }

    #[must_use]
    pub fn relationship(mut self, key: impl Into<String>, resource_type: impl Into<String>) -> Self {
        self.relationships.insert(key.into(), resource_type.into());
        self
    }

    #[must_use]
    pub fn default_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn computed(mut self, key: impl Into<String>, field: impl Fn(&TrackedModel) -> Value + 'static) -> Self {
        self.computed.insert(key.into(), Rc::new(field));
        self
    }

    #[must_use]
    pub fn relationships(&self) -> &BTreeMap<String, String> {
        &self.relationships
    }

    #[must_use]
    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    /// Names of the computed fields.
    pub fn computed_names(&self) -> impl Iterator<Item = &str> {
        self.computed.keys().map(String::as_str)
    }

    pub(crate) fn computed_field(&self, key: &str) -> Option<TrackedComputed> {
        self.computed.get(key).cloned()
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("relationships", &self.relationships)
            .field("defaults", &self.defaults)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .finish()
    }
}
