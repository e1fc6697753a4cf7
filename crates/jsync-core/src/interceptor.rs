#![forbid(unsafe_code)]

//! Recursive mutation interceptor over a raw resource document.
//!
//! An [`Interceptor`] addresses a subtree of a [`RawResource`] by path. Reading
//! a key that holds an object or array yields a fresh child interceptor one
//! segment deeper; reading anything else yields the value itself. Writes go
//! straight into the shared document after an optional [`WriteHook`] has seen
//! them.
//!
//! # Invariants
//!
//! 1. Wrapping is structural, never a copy: every interceptor over the same
//!    document sees every write immediately.
//! 2. Children are re-derived from the live document on every access and are
//!    never memoized, so a subtree replaced by reassignment is never served
//!    stale.
//! 3. The hook runs before the write and with no document borrow held, so it
//!    may read or write through any interceptor (re-entrancy is allowed).
//! 4. An interceptor holds only a weak document reference; it never keeps the
//!    resource alive.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Resource dropped | Caller released the last handle | Reads `None`, writes `ResourceDropped` |
//! | Path vanished | Ancestor reassigned to a primitive | Reads `None`, writes `NotAContainer` |
//! | Hook error | Sync target refused the write | Write skipped, error returned |

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::resource::{RawResource, WeakResource};

/// Key under which a JSON:API resource keeps its attributes.
pub const ATTRIBUTES: &str = "attributes";

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// One step of an interceptor path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Object member.
    Key(String),
    /// Array element.
    Index(usize),
}

impl Segment {
    /// The member name, for key segments.
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    /// Member name used when the segment addresses an object.
    #[must_use]
    pub fn member_name(&self) -> String {
        match self {
            Self::Key(key) => key.clone(),
            Self::Index(index) => index.to_string(),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<&String> for Segment {
    fn from(key: &String) -> Self {
        Self::Key(key.clone())
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

fn render_path(path: &[Segment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}

fn step<'v>(value: &'v Value, segment: &Segment) -> Option<&'v Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Object(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        (Value::Array(items), Segment::Key(key)) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'v>(value: &'v mut Value, segment: &Segment) -> Option<&'v mut Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
        (Value::Object(map), Segment::Index(index)) => map.get_mut(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) => items.get_mut(*index),
        (Value::Array(items), Segment::Key(key)) => {
            key.parse::<usize>().ok().and_then(|i| items.get_mut(i))
        }
        _ => None,
    }
}

fn resolve<'v>(root: &'v Value, path: &[Segment]) -> Option<&'v Value> {
    path.iter().try_fold(root, step)
}

fn resolve_mut<'v>(root: &'v mut Value, path: &[Segment]) -> Option<&'v mut Value> {
    path.iter().try_fold(root, step_mut)
}

// ---------------------------------------------------------------------------
// Write hook
// ---------------------------------------------------------------------------

/// A write about to be applied through an interceptor.
#[derive(Debug, Clone, Copy)]
pub struct WriteEvent<'a> {
    /// Path of the interceptor performing the write.
    pub path: &'a [Segment],
    /// Key being written under `path`.
    pub key: &'a Segment,
    /// Incoming value.
    pub value: &'a Value,
}

impl WriteEvent<'_> {
    /// The attribute name when this write targets a top-level attribute
    /// (`attributes.<key>`).
    #[must_use]
    pub fn attribute_key(&self) -> Option<&str> {
        match self.path {
            [Segment::Key(head)] if head == ATTRIBUTES => self.key.as_key(),
            _ => None,
        }
    }
}

/// Observer invoked before every interceptor write.
pub type WriteHook = Rc<dyn Fn(&WriteEvent<'_>) -> Result<()>>;

// ---------------------------------------------------------------------------
// Interceptor
// ---------------------------------------------------------------------------

/// Result of reading a key through an interceptor.
#[derive(Clone)]
pub enum Proxied {
    /// The key holds an object or array; reads and writes continue through
    /// this child interceptor.
    Node(Interceptor),
    /// The key holds a primitive (or `null`).
    Value(Value),
}

impl Proxied {
    /// The child interceptor, for structured values.
    #[must_use]
    pub fn as_node(&self) -> Option<&Interceptor> {
        match self {
            Self::Node(node) => Some(node),
            Self::Value(_) => None,
        }
    }

    /// Whether this read produced a child interceptor.
    #[must_use]
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }

    /// Materialize the value (snapshotting child interceptors).
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Node(node) => node.snapshot(),
            Self::Value(value) => Some(value),
        }
    }
}

impl fmt::Debug for Proxied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Live, path-addressed view over part of a raw resource document.
#[derive(Clone)]
pub struct Interceptor {
    doc: WeakResource,
    path: Vec<Segment>,
    hook: Option<WriteHook>,
}

impl Interceptor {
    /// Interceptor over the whole document, without a write hook.
    #[must_use]
    pub fn new(resource: &RawResource) -> Self {
        Self {
            doc: resource.downgrade(),
            path: Vec::new(),
            hook: None,
        }
    }

    /// Attach a write hook. Children inherit it.
    #[must_use]
    pub fn with_hook(mut self, hook: WriteHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Path from the document root.
    #[must_use]
    pub fn path(&self) -> &[Segment] {
        &self.path
    }

    /// The document this interceptor addresses, if still alive.
    #[must_use]
    pub fn resource(&self) -> Option<RawResource> {
        self.doc.upgrade()
    }

    /// Whether the document is alive and the path resolves to a container.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.read(|v| v.is_object() || v.is_array()).unwrap_or(false)
    }

    /// Whether both interceptors address the same subtree of the same document.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.path == other.path
            && match other.doc.upgrade() {
                Some(resource) => self.doc.points_to(&resource),
                None => false,
            }
    }

    /// Interceptor over the document root, sharing this one's hook.
    #[must_use]
    pub fn root(&self) -> Self {
        Self {
            doc: self.doc.clone(),
            path: Vec::new(),
            hook: self.hook.clone(),
        }
    }

    /// Interceptor over `attributes` of the document root.
    #[must_use]
    pub fn attributes(&self) -> Self {
        self.root().descend(Segment::from(ATTRIBUTES))
    }

    fn descend(&self, segment: Segment) -> Self {
        let mut path = self.path.clone();
        path.push(segment);
        Self {
            doc: self.doc.clone(),
            path,
            hook: self.hook.clone(),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let resource = self.doc.upgrade()?;
        resource.with(|root| resolve(root, &self.path).map(f))
    }

    /// Read `key`: a fresh child interceptor for objects and arrays, the
    /// value itself otherwise. `None` when the key is absent.
    #[must_use]
    pub fn get(&self, key: impl Into<Segment>) -> Option<Proxied> {
        let key = key.into();
        let primitive = self
            .read(|target| {
                step(target, &key).map(|child| match child {
                    Value::Object(_) | Value::Array(_) => None,
                    other => Some(other.clone()),
                })
            })
            .flatten()?;
        Some(match primitive {
            Some(value) => Proxied::Value(value),
            None => Proxied::Node(self.descend(key)),
        })
    }

    /// Child interceptor for `key`, if it holds an object or array.
    #[must_use]
    pub fn child(&self, key: impl Into<Segment>) -> Option<Self> {
        match self.get(key)? {
            Proxied::Node(node) => Some(node),
            Proxied::Value(_) => None,
        }
    }

    /// Snapshot of the value under `key`.
    #[must_use]
    pub fn value(&self, key: impl Into<Segment>) -> Option<Value> {
        let key = key.into();
        self.read(|target| step(target, &key).cloned()).flatten()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: impl Into<Segment>) -> bool {
        let key = key.into();
        self.read(|target| step(target, &key).is_some())
            .unwrap_or(false)
    }

    /// Own keys: member names for objects, stringified indices for arrays.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.read(|target| match target {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        })
        .unwrap_or_default()
    }

    /// Number of members or elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(|target| match target {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        })
        .unwrap_or(0)
    }

    /// Whether the target has no members or elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep copy of the target subtree.
    #[must_use]
    pub fn snapshot(&self) -> Option<Value> {
        self.read(Value::clone)
    }

    /// Write `value` under `key`.
    ///
    /// The write hook sees the write first; then objects insert or replace the
    /// member, arrays replace an element or append at `len`.
    pub fn set(&self, key: impl Into<Segment>, value: Value) -> Result<()> {
        let key = key.into();
        if let Some(hook) = &self.hook {
            hook(&WriteEvent {
                path: &self.path,
                key: &key,
                value: &value,
            })?;
        }

        tracing::trace!(
            target: "jsync::interceptor",
            path = %render_path(&self.path),
            key = %key,
            "write"
        );

        let resource = self.doc.upgrade().ok_or(SyncError::ResourceDropped)?;
        resource.with_mut(|root| {
            let target = resolve_mut(root, &self.path).ok_or_else(|| self.not_a_container())?;
            match (target, key) {
                (Value::Object(map), key) => {
                    map.insert(key.member_name(), value);
                    Ok(())
                }
                (Value::Array(items), Segment::Index(index)) => write_index(items, index, value, &self.path),
                (Value::Array(items), Segment::Key(key)) => match key.parse::<usize>() {
                    Ok(index) => write_index(items, index, value, &self.path),
                    Err(_) => Err(self.not_a_container()),
                },
                _ => Err(self.not_a_container()),
            }
        })
    }

    /// Append to the target array.
    pub fn push(&self, value: Value) -> Result<()> {
        let len = self
            .read(|target| target.as_array().map(Vec::len))
            .flatten()
            .ok_or_else(|| self.not_a_container())?;
        self.set(len, value)
    }

    /// Remove `key` from the target, returning the previous value.
    ///
    /// Removals are not reported to the write hook.
    pub fn remove(&self, key: impl Into<Segment>) -> Result<Option<Value>> {
        let key = key.into();
        let resource = self.doc.upgrade().ok_or(SyncError::ResourceDropped)?;
        resource.with_mut(|root| {
            let target = resolve_mut(root, &self.path).ok_or_else(|| self.not_a_container())?;
            Ok(match (target, &key) {
                (Value::Object(map), key) => map.remove(&key.member_name()),
                (Value::Array(items), Segment::Index(index)) if *index < items.len() => {
                    Some(items.remove(*index))
                }
                (Value::Array(_), _) => None,
                _ => return Err(self.not_a_container()),
            })
        })
    }

    fn not_a_container(&self) -> SyncError {
        if self.doc.is_alive() {
            SyncError::NotAContainer {
                path: render_path(&self.path),
            }
        } else {
            SyncError::ResourceDropped
        }
    }
}

fn write_index(items: &mut Vec<Value>, index: usize, value: Value, path: &[Segment]) -> Result<()> {
    match index.cmp(&items.len()) {
        std::cmp::Ordering::Less => {
            items[index] = value;
            Ok(())
        }
        std::cmp::Ordering::Equal => {
            items.push(value);
            Ok(())
        }
        std::cmp::Ordering::Greater => Err(SyncError::IndexOutOfBounds {
            path: render_path(path),
            index,
            len: items.len(),
        }),
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("path", &render_path(&self.path))
            .field("attached", &self.is_attached())
            .field("hooked", &self.hook.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
