#![forbid(unsafe_code)]

//! The change-tracking model.
//!
//! A [`TrackedModel`] is built from the fields a [`Parser`](crate::Parser)
//! extracts from a resource. Fields that are also keys of the resource's
//! `attributes` are *bound*: they read live from the raw document and writes
//! go through the resource interceptor. Every other field is kept on the
//! model.
//!
//! Each set records the value in `changed`, snapshots the prior values into
//! `previous` and fires `"change:<key>"` followed by `"change"`.
//!
//! # Invariants
//!
//! 1. A bound field reads the raw document's current value.
//! 2. `changed` holds exactly the fields altered by the most recent set (or
//!    merge); a set of an equal value leaves it empty.
//! 3. A caller write fires the update handler once, before the document is
//!    written. Writes applied on behalf of another view never do.
//! 4. Merging a rebuilt resource keeps the model's identity and its
//!    definition.
//! 5. A merge diffs against the values recorded by the last set or merge,
//!    not against the document, which has usually been replaced already.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Resource dropped | Last raw handle released | Bound reads `None`, bound writes `ResourceDropped` |
//! | Attribute removed | Key deleted from the document after build | Write kept on the model |

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use jsync_core::{ChangeTracking, FieldUpdate, Interceptor, Proxied, Result};
use serde_json::{Map, Value};

use crate::definition::{ModelDefinition, TrackedComputed};
use crate::events::{CHANGE, ChangeEvent, Listeners, Subscription, change_event};
use crate::factory::Shared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Caller,
    Sync,
}

pub(crate) struct TrackedState {
    attributes: Interceptor,
    bound: BTreeSet<String>,
    locals: Map<String, Value>,
    changed: Map<String, Value>,
    previous: Map<String, Value>,
    recorded: Map<String, Value>,
    definition: Option<Rc<ModelDefinition>>,
}

impl TrackedState {
    pub(crate) fn build(
        root: &Interceptor,
        fields: Map<String, Value>,
        definition: Option<Rc<ModelDefinition>>,
    ) -> Self {
        let attributes = root.attributes();
        let attribute_keys: BTreeSet<String> = attributes.keys().into_iter().collect();

        let mut bound = BTreeSet::new();
        let mut locals = Map::new();
        for (key, value) in fields {
            if attribute_keys.contains(&key) {
                bound.insert(key);
            } else {
                locals.insert(key, value);
            }
        }
        if let Some(definition) = &definition {
            for (key, value) in definition.defaults() {
                if !bound.contains(key) && !locals.contains_key(key) {
                    locals.insert(key.clone(), value.clone());
                }
            }
        }

        Self {
            attributes,
            bound,
            locals,
            changed: Map::new(),
            previous: Map::new(),
            recorded: Map::new(),
            definition,
        }
    }

    fn values(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for key in &self.bound {
            if let Some(value) = self.attributes.value(key.as_str()) {
                out.insert(key.clone(), value);
            }
        }
        out.extend(self.locals.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }
}

struct TrackedInner {
    shared: Rc<Shared>,
    state: RefCell<TrackedState>,
    listeners: Listeners,
}

enum ReadTarget {
    Bound(Interceptor),
    Local(Value),
    Computed(TrackedComputed),
}

/// Change-tracking view of a raw resource.
///
/// Cloning shares the model; compare handles with [`TrackedModel::ptr_eq`].
#[derive(Clone)]
pub struct TrackedModel {
    inner: Rc<TrackedInner>,
}

impl TrackedModel {
    pub(crate) fn from_state(shared: Rc<Shared>, mut state: TrackedState) -> Self {
        state.previous = state.values();
        state.recorded = state.previous.clone();
        Self {
            inner: Rc::new(TrackedInner {
                shared,
                state: RefCell::new(state),
                listeners: Listeners::default(),
            }),
        }
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

    /// Root interceptor of the underlying resource.
    #[must_use]
    pub fn root(&self) -> Interceptor {
        self.inner.state.borrow().attributes.root()
    }

    /// Relationship key → related type, from the model's definition.
    #[must_use]
    pub fn relationship_types(&self) -> BTreeMap<String, String> {
        let state = self.inner.state.borrow();
        state
            .definition
            .as_ref()
            .map(|definition| definition.relationships().clone())
            .unwrap_or_default()
    }

    /// Whether `key` reads and writes through the raw document.
    #[must_use]
    pub fn is_bound(&self, key: &str) -> bool {
        self.inner.state.borrow().bound.contains(key)
    }

    /// Field names: bound, local and computed.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let state = self.inner.state.borrow();
        let mut keys: BTreeSet<String> = state.bound.iter().cloned().collect();
        keys.extend(state.locals.keys().cloned());
        if let Some(definition) = &state.definition {
            keys.extend(definition.computed_names().map(str::to_owned));
        }
        keys.into_iter().collect()
    }

    fn read_target(&self, key: &str) -> Option<ReadTarget> {
        let state = self.inner.state.borrow();
        if state.bound.contains(key) {
            return Some(ReadTarget::Bound(state.attributes.clone()));
        }
        if let Some(value) = state.locals.get(key) {
            return Some(ReadTarget::Local(value.clone()));
        }
        let field = state.definition.as_ref()?.computed_field(key)?;
        Some(ReadTarget::Computed(field))
    }

    /// Current value of a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.read_target(key)? {
            ReadTarget::Bound(attributes) => attributes.value(key),
            ReadTarget::Local(value) => Some(value),
            ReadTarget::Computed(field) => Some(field(self)),
        }
    }

    /// Live access to a field; nested values of bound fields come back as
    /// interceptors.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<Proxied> {
        match self.read_target(key)? {
            ReadTarget::Bound(attributes) => attributes.get(key),
            ReadTarget::Local(value) => Some(Proxied::Value(value)),
            ReadTarget::Computed(field) => Some(Proxied::Value(field(self))),
        }
    }

    /// Every data field (computed fields excluded).
    #[must_use]
    pub fn values(&self) -> Map<String, Value> {
        self.inner.state.borrow().values()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(self.values())
    }

    /// Assign a field. Returns whether the value changed.
    pub fn set(&self, key: &str, value: Value) -> Result<bool> {
        self.apply(key, value, Origin::Caller)
    }

    /// Fields altered by the most recent set or merge.
    #[must_use]
    pub fn changed(&self) -> Map<String, Value> {
        self.inner.state.borrow().changed.clone()
    }

    /// Whether the most recent set or merge altered `key` (or anything, for
    /// `None`).
    #[must_use]
    pub fn has_changed(&self, key: Option<&str>) -> bool {
        let state = self.inner.state.borrow();
        match key {
            Some(key) => state.changed.contains_key(key),
            None => !state.changed.is_empty(),
        }
    }

    /// Value of `key` before the most recent set or merge.
    #[must_use]
    pub fn previous(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow().previous.get(key).cloned()
    }

    #[must_use]
    pub fn previous_attributes(&self) -> Map<String, Value> {
        self.inner.state.borrow().previous.clone()
    }

    /// Listen for `"change"` or `"change:<key>"`.
    pub fn on(&self, event: &str, handler: impl Fn(&ChangeEvent<'_>) + 'static) -> Subscription {
        self.inner.listeners.subscribe(event, handler)
    }

    /// Connected listeners across all events.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.live_count()
    }

    /// Whether both handles are the same model.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn apply(&self, key: &str, value: Value, origin: Origin) -> Result<bool> {
        let (current, target) = {
            let state = self.inner.state.borrow();
            let snapshot = state.values();
            let current = snapshot.get(key).cloned();
            let target = (state.bound.contains(key) && current.is_some()).then(|| state.attributes.clone());
            drop(state);
            let mut state = self.inner.state.borrow_mut();
            state.recorded = snapshot.clone();
            state.previous = snapshot;
            state.changed.clear();
            (current, target)
        };
        if current.as_ref() == Some(&value) {
            return Ok(false);
        }
        self.inner
            .state
            .borrow_mut()
            .changed
            .insert(key.to_owned(), value.clone());

        match target {
            Some(attributes) => {
                if origin == Origin::Caller {
                    let update = FieldUpdate {
                        resource_type: self.resource_type(),
                        id: self.id(),
                        key: key.to_owned(),
                        value: value.clone(),
                    };
                    self.inner.shared.update_handler().notify(&update);
                }
                attributes.set(key, value.clone())?;
            }
            None => {
                let mut state = self.inner.state.borrow_mut();
                state.bound.remove(key);
                state.locals.insert(key.to_owned(), value.clone());
            }
        }
        self.inner
            .state
            .borrow_mut()
            .recorded
            .insert(key.to_owned(), value.clone());

        tracing::trace!(target: "jsync::tracked", key, ?origin, "field changed");
        self.emit_change(key, &value);
        self.emit_batch();
        Ok(true)
    }

    /// Rebuild from a freshly parsed resource in place, keeping local fields
    /// and the definition. Returns the fields that differ.
    pub(crate) fn merge(&self, root: &Interceptor, fields: Map<String, Value>) -> Map<String, Value> {
        let before = self.inner.state.borrow().recorded.clone();
        {
            let mut state = self.inner.state.borrow_mut();
            let locals = std::mem::take(&mut state.locals);
            let mut next = TrackedState::build(root, fields, state.definition.clone());
            for (key, value) in locals {
                if !next.bound.contains(&key) && !next.locals.contains_key(&key) {
                    next.locals.insert(key, value);
                }
            }
            *state = next;
        }
        let after = self.values();

        let mut diff = Map::new();
        for (key, value) in &after {
            if before.get(key) != Some(value) {
                diff.insert(key.clone(), value.clone());
            }
        }
        for key in before.keys() {
            if !after.contains_key(key) {
                diff.insert(key.clone(), Value::Null);
            }
        }

        {
            let mut state = self.inner.state.borrow_mut();
            state.previous = before;
            state.recorded = after;
            state.changed = diff.clone();
        }
        for (key, value) in &diff {
            self.emit_change(key, value);
        }
        if !diff.is_empty() {
            self.emit_batch();
        }
        diff
    }

    fn emit_change(&self, key: &str, value: &Value) {
        let event = ChangeEvent {
            model: self,
            key: Some(key),
            value: Some(value),
        };
        self.inner.listeners.emit(&change_event(key), &event);
    }

    fn emit_batch(&self) {
        let event = ChangeEvent {
            model: self,
            key: None,
            value: None,
        };
        self.inner.listeners.emit(CHANGE, &event);
    }
}

impl ChangeTracking for TrackedModel {
    fn needs_sync(&self, key: &str, value: &Value) -> bool {
        let state = self.inner.state.borrow();
        state.bound.contains(key) && state.changed.get(key) != Some(value)
    }

    fn sync(&self, key: &str, value: &Value) -> Result<()> {
        self.apply(key, value.clone(), Origin::Sync).map(drop)
    }
}

impl fmt::Debug for TrackedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedModel")
            .field("type", &self.resource_type())
            .field("id", &self.id())
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}
