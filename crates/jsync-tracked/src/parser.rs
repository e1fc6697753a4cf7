#![forbid(unsafe_code)]

//! Flattening of a JSON:API resource into tracked-model fields.
//!
//! The default parser produces `id` (stringified), `_type`, `_self`
//! (`links.self`), every attribute, and `relationships` verbatim.

use std::rc::Rc;

use jsync_core::{ATTRIBUTES, Interceptor, Result, SyncError};
use serde_json::{Map, Value};

/// Turns a resource root interceptor into the model's initial fields.
pub type Parser = Rc<dyn Fn(&Interceptor) -> Result<Map<String, Value>>>;

/// Default JSON:API flattening.
pub fn flatten_resource(root: &Interceptor) -> Result<Map<String, Value>> {
    if !root.is_attached() {
        return Err(match root.resource() {
            None => SyncError::ResourceDropped,
            Some(_) => SyncError::InvalidDocument("resource root is not an object".into()),
        });
    }

    let mut fields = Map::new();
    match root.value("id") {
        Some(Value::String(id)) => {
            fields.insert("id".into(), Value::String(id));
        }
        Some(Value::Number(id)) => {
            fields.insert("id".into(), Value::String(id.to_string()));
        }
        _ => {}
    }
    if let Some(resource_type) = root.value("type") {
        fields.insert("_type".into(), resource_type);
    }
    if let Some(link) = root.child("links").and_then(|links| links.value("self")) {
        fields.insert("_self".into(), link);
    }
    if let Some(Value::Object(attributes)) = root.value(ATTRIBUTES) {
        fields.extend(attributes);
    }
    if let Some(relationships) = root.value("relationships") {
        fields.insert("relationships".into(), relationships);
    }
    Ok(fields)
}
