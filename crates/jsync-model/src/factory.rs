#![forbid(unsafe_code)]

//! Builds [`ResourceModel`]s from resource interceptors and unwinds them back
//! into raw documents.
//!
//! The factory is a cheap handle: clones share the registered classes and
//! handlers, and models built by it see handlers registered later.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use jsync_core::{Interceptor, Result, SyncError, UpdateHandler, ViewFactory};
use serde_json::{Map, Value, json};

use crate::class::ModelClass;
use crate::model::{ModelState, ResourceModel};
use crate::naming::{camel_case, is_field_name, is_relationship_name};
use crate::relationship::RelationshipHandler;

/// Root keys copied verbatim by [`ResourceModelFactory::to_raw`].
const IDENTITY_KEYS: [&str; 3] = ["id", "type", "links"];

#[derive(Default)]
pub(crate) struct Shared {
    classes: RefCell<Vec<Rc<ModelClass>>>,
    relationship_handler: RefCell<RelationshipHandler>,
    update_handler: RefCell<UpdateHandler>,
}

impl Shared {
    pub(crate) fn relationship_handler(&self) -> RelationshipHandler {
        self.relationship_handler.borrow().clone()
    }

    pub(crate) fn update_handler(&self) -> UpdateHandler {
        self.update_handler.borrow().clone()
    }

    fn find_class(&self, resource_type: &str) -> Option<Rc<ModelClass>> {
        self.classes
            .borrow()
            .iter()
            .find(|class| class.matches(resource_type))
            .cloned()
    }
}

/// Factory for plain resource models.
#[derive(Clone, Default)]
pub struct ResourceModelFactory {
    shared: Rc<Shared>,
}

impl ResourceModelFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model class. A class with the same name (ignoring case)
    /// is replaced.
    pub fn register(&self, class: ModelClass) {
        let mut classes = self.shared.classes.borrow_mut();
        classes.retain(|existing| !existing.matches(class.name()));
        tracing::debug!(target: "jsync::model", class = class.name(), "registered model class");
        classes.push(Rc::new(class));
    }

    /// Handler invoked by relationship callables. Defaults to returning the
    /// `{data, links}` pair.
    pub fn register_relationship_handler(&self, handler: RelationshipHandler) {
        *self.shared.relationship_handler.borrow_mut() = handler;
    }

    /// Handler told about every accepted field write.
    pub fn register_update_handler(&self, handler: UpdateHandler) {
        *self.shared.update_handler.borrow_mut() = handler;
    }

    /// Build a model over the resource `interceptor` addresses, or rebuild
    /// `existing` in place from the current document.
    ///
    /// Rebuilding drops every local field of `existing` and reapplies the
    /// class defaults, keeping the model's identity.
    pub fn to_model(&self, interceptor: &Interceptor, existing: Option<ResourceModel>) -> Result<ResourceModel> {
        let root = interceptor.root();
        if root.resource().is_none() {
            return Err(SyncError::ResourceDropped);
        }
        let class = root
            .value("type")
            .and_then(|value| value.as_str().and_then(|t| self.shared.find_class(t)));

        Ok(match existing {
            Some(model) => {
                let state = ModelState::build(root, class, model.shared());
                model.replace_state(state);
                tracing::debug!(target: "jsync::model", id = ?model.id(), "merged resource model");
                model
            }
            None => {
                let state = ModelState::build(root, class, &self.shared);
                ResourceModel::from_state(Rc::clone(&self.shared), state)
            }
        })
    }

    /// Unwind `model` into a raw document.
    ///
    /// Attributes are the keys currently under the resource's `attributes`
    /// (or every data field when `serialize_model_fields` is set, or when
    /// the resource has no attributes), camelCased. Relationships come back
    /// as `{data, links}`; `id`, `type` and `links` are copied when set.
    #[must_use]
    pub fn to_raw(&self, model: &ResourceModel, serialize_model_fields: bool) -> Value {
        let attribute_keys = model.attributes().keys();
        let source = if serialize_model_fields || attribute_keys.is_empty() {
            model.data_keys()
        } else {
            attribute_keys
        };

        let mut attributes = Map::new();
        for key in source {
            if !is_field_name(&key) || IDENTITY_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some(value) = model.get(&key) {
                attributes.insert(camel_case(&key), value);
            }
        }

        let mut relationships = Map::new();
        for relationship in model.relationships() {
            relationships.insert(
                camel_case(relationship.name()),
                relationship.reference().to_value(),
            );
        }
        for key in model.data_keys() {
            if is_relationship_name(&key) {
                if let Some(data) = model.get(&key) {
                    relationships.insert(camel_case(&key), json!({ "data": data }));
                }
            }
        }

        let mut raw = Map::new();
        raw.insert("attributes".into(), Value::Object(attributes));
        raw.insert("relationships".into(), Value::Object(relationships));
        for key in IDENTITY_KEYS {
            if let Some(value) = model.get(key).filter(is_truthy) {
                raw.insert(key.into(), value);
            }
        }
        Value::Object(raw)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

impl ViewFactory<ResourceModel> for ResourceModelFactory {
    fn build(&self, interceptor: &Interceptor, existing: Option<ResourceModel>) -> Result<ResourceModel> {
        self.to_model(interceptor, existing)
    }
}

impl fmt::Debug for ResourceModelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classes: Vec<String> = self
            .shared
            .classes
            .borrow()
            .iter()
            .map(|class| class.name().to_owned())
            .collect();
        f.debug_struct("ResourceModelFactory")
            .field("classes", &classes)
            .finish_non_exhaustive()
    }
}
