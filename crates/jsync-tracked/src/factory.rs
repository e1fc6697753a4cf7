#![forbid(unsafe_code)]

//! Builds [`TrackedModel`]s from resource interceptors.
//!
//! Like the plain factory this is a shared handle: clones see the same
//! definitions, parser and update handler.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use jsync_core::{Interceptor, Result, SyncError, UpdateHandler, ViewFactory};
use serde_json::{Map, Value};

use crate::definition::ModelDefinition;
use crate::model::{TrackedModel, TrackedState};
use crate::parser::{Parser, flatten_resource};

#[derive(Default)]
pub(crate) struct Shared {
    definitions: RefCell<BTreeMap<String, Rc<ModelDefinition>>>,
    parser: RefCell<Option<Parser>>,
    update_handler: RefCell<UpdateHandler>,
}

impl Shared {
    pub(crate) fn update_handler(&self) -> UpdateHandler {
        self.update_handler.borrow().clone()
    }

    fn parse(&self, root: &Interceptor) -> Result<Map<String, Value>> {
        let parser = self.parser.borrow().clone();
        match parser {
            Some(parser) => parser(root),
            None => flatten_resource(root),
        }
    }
}

/// Factory for change-tracking models.
#[derive(Clone, Default)]
pub struct TrackedModelFactory {
    shared: Rc<Shared>,
}

impl TrackedModelFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default JSON:API flattening.
    #[must_use]
    pub fn with_parser(self, parser: impl Fn(&Interceptor) -> Result<Map<String, Value>> + 'static) -> Self {
        *self.shared.parser.borrow_mut() = Some(Rc::new(parser));
        self
    }

    /// Definition applied to models whose resource `type` is `resource_type`.
    pub fn register(&self, resource_type: impl Into<String>, definition: ModelDefinition) {
        let resource_type = resource_type.into();
        tracing::debug!(target: "jsync::tracked", resource_type = resource_type.as_str(), "registered model definition");
        self.shared
            .definitions
            .borrow_mut()
            .insert(resource_type, Rc::new(definition));
    }

    pub fn register_update_handler(&self, handler: UpdateHandler) {
        *self.shared.update_handler.borrow_mut() = handler;
    }

    /// Build a model over the resource `interceptor` addresses, or merge the
    /// current document into `existing`.
    ///
    /// Merging keeps identity, local fields and the definition of `existing`,
    /// fires change events for every differing field and never reaches the
    /// update handler.
    pub fn to_model(&self, interceptor: &Interceptor, existing: Option<TrackedModel>) -> Result<TrackedModel> {
        let root = interceptor.root();
        if root.resource().is_none() {
            return Err(SyncError::ResourceDropped);
        }
        let fields = self.shared.parse(&root)?;

        Ok(match existing {
            Some(model) => {
                let diff = model.merge(&root, fields);
                tracing::debug!(target: "jsync::tracked", id = ?model.id(), changed = diff.len(), "merged tracked model");
                model
            }
            None => {
                let definition = root
                    .value("type")
                    .and_then(|value| value.as_str().and_then(|t| self.shared.definitions.borrow().get(t).cloned()));
                TrackedModel::from_state(Rc::clone(&self.shared), TrackedState::build(&root, fields, definition))
            }
        })
    }
}

impl ViewFactory<TrackedModel> for TrackedModelFactory {
    fn build(&self, interceptor: &Interceptor, existing: Option<TrackedModel>) -> Result<TrackedModel> {
        self.to_model(interceptor, existing)
    }
}

impl fmt::Debug for TrackedModelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedModelFactory")
            .field("definitions", &self.shared.definitions.borrow().keys().collect::<Vec<_>>())
            .field("custom_parser", &self.shared.parser.borrow().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsync_core::RawResource;
    use serde_json::json;

    fn raw_car() -> RawResource {
        RawResource::new(json!({
            "id": "1",
            "type": "car",
            "attributes": { "color": "grey", "doors": 5 },
            "relationships": { "wheels": { "data": [] } }
        }))
    }

    #[test]
    fn default_parser_flattens() {
        let raw = raw_car();
        let model = TrackedModelFactory::new().to_model(&Interceptor::new(&raw), None).unwrap();
        assert_eq!(model.get("_type"), Some(json!("car")));
        assert_eq!(model.get("relationships"), Some(json!({ "wheels": { "data": [] } })));
        assert_eq!(model.previous("color"), Some(json!("grey")));
        assert!(!model.has_changed(None));
    }

    #[test]
    fn custom_parser_selects_fields() {
        let factory = TrackedModelFactory::new().with_parser(|root| {
            let mut fields = Map::new();
            if let Some(color) = root.attributes().value("color") {
                fields.insert("color".into(), color);
            }
            Ok(fields)
        });
        let raw = raw_car();
        let model = factory.to_model(&Interceptor::new(&raw), None).unwrap();
        assert_eq!(model.keys(), vec!["color".to_owned()]);
        assert!(format!("{factory:?}").contains("custom_parser: true"));
    }

    #[test]
    fn parser_errors_propagate() {
        let factory = TrackedModelFactory::new().with_parser(|_| Err(SyncError::Factory("nope".into())));
        let raw = raw_car();
        assert_eq!(
            factory.to_model(&Interceptor::new(&raw), None).unwrap_err(),
            SyncError::Factory("nope".into())
        );
    }

    #[test]
    fn definitions_match_resource_type() {
        let factory = TrackedModelFactory::new();
        factory.register("car", ModelDefinition::new().relationship("wheels", "wheel"));
        let raw = raw_car();
        let model = factory.to_model(&Interceptor::new(&raw), None).unwrap();
        assert_eq!(model.relationship_types().get("wheels").map(String::as_str), Some("wheel"));

        let other = RawResource::new(json!({ "type": "boat", "attributes": {} }));
        let boat = factory.to_model(&Interceptor::new(&other), None).unwrap();
        assert!(boat.relationship_types().is_empty());
    }

    #[test]
    fn merge_keeps_the_original_definition() {
        let factory = TrackedModelFactory::new();
        factory.register("car", ModelDefinition::new().default_field("wheels", json!(4)));
        let raw = raw_car();
        let model = factory.to_model(&Interceptor::new(&raw), None).unwrap();

        factory.register("car", ModelDefinition::new().default_field("wheels", json!(3)));
        factory.to_model(&Interceptor::new(&raw), Some(model.clone())).unwrap();
        assert_eq!(model.get("wheels"), Some(json!(4)));
        assert!(!model.has_changed(None));
    }

    #[test]
    fn dropped_resource_is_an_error() {
        let raw = raw_car();
        let interceptor = Interceptor::new(&raw);
        drop(raw);
        assert_eq!(
            TrackedModelFactory::new().to_model(&interceptor, None).unwrap_err(),
            SyncError::ResourceDropped
        );
    }
}
