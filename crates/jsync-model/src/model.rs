#![forbid(unsafe_code)]

//! The plain resource model: a dynamic field table over a resource.
//!
//! A [`ResourceModel`] is built by enumerating the keys of the raw document
//! once. Root keys (`id`, `type`, `links`, ..) and attribute keys become
//! fields that read and write through the resource's interceptor; class
//! defaults become local fields; class computed fields are derived on read;
//! each relationship becomes a [`Relationship`] callable.
//!
//! # Invariants
//!
//! 1. Reads of root and attribute fields always reflect the raw document.
//! 2. A write reaches the raw document only when the key is still present
//!    there and the value differs structurally; the update handler then fires
//!    exactly once, before the write.
//! 3. Keys unknown at construction are kept on the model and never written
//!    to the raw document.
//! 4. Computed fields and relationships cannot be assigned.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Resource dropped | Last raw handle released | Reads `None`, writes `ResourceDropped` |
//! | Hook error | Sync of another view failed | Write skipped, error returned |

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use jsync_core::{ATTRIBUTES, FieldUpdate, Interceptor, Proxied, Result};
use serde_json::{Map, Value};

use crate::class::{ComputedField, ModelClass};
use crate::factory::Shared;
use crate::naming::pascal_case;
use crate::relationship::{RELATIONSHIPS, Relationship};

/// Where a field's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Top-level key of the raw document.
    Root,
    /// Key under the raw document's `attributes`.
    Attribute,
    /// Stored on the model only.
    Local,
    /// Derived by the model class on every read.
    Computed,
}

/// What [`ResourceModel::set`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOutcome {
    /// Written through to the raw document.
    Written,
    /// Equal to the current value, or the key has left the raw document.
    Unchanged,
    /// Stored on the model only.
    Local,
    /// Computed field or relationship; ignored.
    ReadOnly,
}

pub(crate) struct ModelState {
    root: Interceptor,
    fields: BTreeMap<String, FieldKind>,
    locals: Map<String, Value>,
    relationships: BTreeMap<String, Relationship>,
    class: Option<Rc<ModelClass>>,
}

impl ModelState {
    pub(crate) fn build(root: Interceptor, class: Option<Rc<ModelClass>>, shared: &Rc<Shared>) -> Self {
        let mut fields = BTreeMap::new();
        if let Some(class) = &class {
            for key in class.defaults().keys() {
                fields.insert(key.clone(), FieldKind::Local);
            }
            for key in class.computed_names() {
                fields.insert(key.to_owned(), FieldKind::Computed);
            }
        }
        for key in root.keys() {
            if key != ATTRIBUTES && key != RELATIONSHIPS {
                fields.insert(key, FieldKind::Root);
            }
        }
        for key in root.attributes().keys() {
            fields.insert(key, FieldKind::Attribute);
        }

        let mut locals = Map::new();
        if let Some(class) = &class {
            for (key, value) in class.defaults() {
                if fields.get(key) == Some(&FieldKind::Local) {
                    locals.insert(key.clone(), value.clone());
                }
            }
        }

        let relationships = root
            .child(RELATIONSHIPS)
            .map(|node| node.keys())
            .unwrap_or_default()
            .into_iter()
            .map(|key| {
                let name = pascal_case(&key);
                let relationship = Relationship::new(key, name.clone(), root.clone(), Rc::clone(shared));
                (name, relationship)
            })
            .collect();

        Self {
            root,
            fields,
            locals,
            relationships,
            class,
        }
    }
}

struct ModelInner {
    shared: Rc<Shared>,
    state: RefCell<ModelState>,
}

enum ReadTarget {
    Node(Interceptor),
    Local(Value),
    Computed(ComputedField),
}

enum WriteTarget {
    Node(Interceptor),
    Local,
    ReadOnly,
}

/// Plain dynamic-field view of a raw resource.
///
/// Cloning shares the model; compare handles with [`ResourceModel::ptr_eq`].
#[derive(Clone)]
pub struct ResourceModel {
    inner: Rc<ModelInner>,
}

impl ResourceModel {
    pub(crate) fn from_state(shared: Rc<Shared>, state: ModelState) -> Self {
        Self {
            inner: Rc::new(ModelInner {
                shared,
                state: RefCell::new(state),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Rc<Shared> {
        &self.inner.shared
    }

    pub(crate) fn replace_state(&self, state: ModelState) {
        let previous = self.inner.state.replace(state);
        drop(previous);
    }

    /// Resource `id` (numbers are stringified).
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.root().value("id")? {
            Value::String(id) => Some(id),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Resource `type`.
    #[must_use]
    pub fn resource_type(&self) -> Option<String> {
        self.root()
            .value("type")
            .and_then(|value| value.as_str().map(str::to_owned))
    }

    /// Name of the model class applied at construction.
    #[must_use]
    pub fn model_class(&self) -> Option<String> {
        let state = self.inner.state.borrow();
        state.class.as_ref().map(|class| class.name().to_owned())
    }

    /// Root interceptor of the underlying resource.
    #[must_use]
    pub fn root(&self) -> Interceptor {
        self.inner.state.borrow().root.clone()
    }

    /// Interceptor over the resource's `attributes`.
    #[must_use]
    pub fn attributes(&self) -> Interceptor {
        self.inner.state.borrow().root.attributes()
    }

    /// How `key` is stored, if it is a field.
    #[must_use]
    pub fn field_kind(&self, key: &str) -> Option<FieldKind> {
        self.inner.state.borrow().fields.get(key).copied()
    }

    /// Data field names (everything but computed fields and relationships).
    #[must_use]
    pub fn data_keys(&self) -> Vec<String> {
        let state = self.inner.state.borrow();
        state
            .fields
            .iter()
            .filter(|(_, kind)| **kind != FieldKind::Computed)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Enumerable keys: data fields followed by relationship names.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.data_keys();
        keys.extend(self.inner.state.borrow().relationships.keys().cloned());
        keys
    }

    fn read_target(&self, key: &str) -> Option<ReadTarget> {
        let state = self.inner.state.borrow();
        Some(match state.fields.get(key)? {
            FieldKind::Root => ReadTarget::Node(state.root.clone()),
            FieldKind::Attribute => ReadTarget::Node(state.root.attributes()),
            FieldKind::Local => ReadTarget::Local(state.locals.get(key)?.clone()),
            FieldKind::Computed => ReadTarget::Computed(state.class.as_ref()?.computed_field(key)?),
        })
    }

    /// Current value of a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.read_target(key)? {
            ReadTarget::Node(node) => node.value(key),
            ReadTarget::Local(value) => Some(value),
            ReadTarget::Computed(field) => Some(field(self)),
        }
    }

    /// Live access to a field: nested objects and arrays come back as
    /// interceptors, so writes through them reach the raw document.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<Proxied> {
        match self.read_target(key)? {
            ReadTarget::Node(node) => node.get(key),
            ReadTarget::Local(value) => Some(Proxied::Value(value)),
            ReadTarget::Computed(field) => Some(Proxied::Value(field(self))),
        }
    }

    /// Assign a field.
    pub fn set(&self, key: &str, value: Value) -> Result<SetOutcome> {
        let target = {
            let state = self.inner.state.borrow();
            match state.fields.get(key).copied() {
                Some(FieldKind::Root) => WriteTarget::Node(state.root.clone()),
                Some(FieldKind::Attribute) => WriteTarget::Node(state.root.attributes()),
                Some(FieldKind::Computed) => WriteTarget::ReadOnly,
                Some(FieldKind::Local) => WriteTarget::Local,
                None if state.relationships.contains_key(key) => WriteTarget::ReadOnly,
                None => WriteTarget::Local,
            }
        };

        match target {
            WriteTarget::ReadOnly => {
                tracing::trace!(target: "jsync::model", key, "ignored write to read-only field");
                Ok(SetOutcome::ReadOnly)
            }
            WriteTarget::Local => {
                let mut state = self.inner.state.borrow_mut();
                state.fields.insert(key.to_owned(), FieldKind::Local);
                state.locals.insert(key.to_owned(), value);
                Ok(SetOutcome::Local)
            }
            WriteTarget::Node(node) => {
                match node.value(key) {
                    Some(current) if current != value => {}
                    _ => return Ok(SetOutcome::Unchanged),
                }
                let update = FieldUpdate {
                    resource_type: self.resource_type(),
                    id: self.id(),
                    key: key.to_owned(),
                    value: value.clone(),
                };
                self.inner.shared.update_handler().notify(&update);
                node.set(key, value)?;
                Ok(SetOutcome::Written)
            }
        }
    }

    /// Relationship exposed under `name` (PascalCase).
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<Relationship> {
        self.inner.state.borrow().relationships.get(name).cloned()
    }

    /// All relationships, ordered by name.
    #[must_use]
    pub fn relationships(&self) -> Vec<Relationship> {
        self.inner
            .state
            .borrow()
            .relationships
            .values()
            .cloned()
            .collect()
    }

    /// Plain JSON rendering: data fields plus each relationship as
    /// `{data, links}` under its PascalCase name.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for key in self.data_keys() {
            if let Some(value) = self.get(&key) {
                out.insert(key, value);
            }
        }
        for relationship in self.relationships() {
            out.insert(
                relationship.name().to_owned(),
                relationship.reference().to_value(),
            );
        }
        Value::Object(out)
    }

    /// Whether both handles are the same model.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ResourceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceModel")
            .field("type", &self.resource_type())
            .field("id", &self.id())
            .field("keys", &self.keys())
            .finish()
    }
}
