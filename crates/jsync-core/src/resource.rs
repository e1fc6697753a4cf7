#![forbid(unsafe_code)]

//! Shared handle over a raw JSON:API resource document.
//!
//! A [`RawResource`] is the single source of truth that every interceptor and
//! bound view reads through. Cloning the handle shares the document; identity
//! is the heap allocation, never the `id`/`type` pair.
//!
//! # Invariants
//!
//! 1. Two handles are the same resource iff [`RawResource::ptr_eq`] holds.
//! 2. The jsync core only ever holds [`WeakResource`]s, so the document is
//!    freed as soon as the caller drops its last `RawResource`.
//! 3. [`RawResource::with_mut`] and [`RawResource::assign`] bypass every
//!    interceptor; views observe the new values on their next read, but
//!    change-tracking bookkeeping only catches up through a forced full update.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::error::Result;

/// Strong, caller-owned handle to a raw resource document.
#[derive(Clone)]
pub struct RawResource {
    doc: Rc<RefCell<Value>>,
}

impl RawResource {
    /// Wrap a document value.
    #[must_use]
    pub fn new(doc: Value) -> Self {
        Self {
            doc: Rc::new(RefCell::new(doc)),
        }
    }

    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    /// The resource `id`, if it is a string or number.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.with(|doc| match doc.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    /// The resource `type`.
    #[must_use]
    pub fn resource_type(&self) -> Option<String> {
        self.with(|doc| doc.get("type").and_then(Value::as_str).map(str::to_owned))
    }

    /// The `links.self` URL.
    #[must_use]
    pub fn self_link(&self) -> Option<String> {
        self.with(|doc| {
            doc.pointer("/links/self")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
    }

    /// Deep copy of the current document.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.doc.borrow().clone()
    }

    /// Read the document in place.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.doc.borrow())
    }

    /// Mutate the document directly, bypassing every interceptor.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.doc.borrow_mut())
    }

    /// Shallow-merge the top-level keys of `update` into the document.
    ///
    /// This is the bulk replacement a server re-sync performs; follow it with
    /// a forced full update so existing views rebuild their field maps.
    /// A non-object document is replaced outright.
    pub fn assign(&self, update: Value) {
        let mut doc = self.doc.borrow_mut();
        match (&mut *doc, update) {
            (Value::Object(current), Value::Object(incoming)) => {
                for (key, value) in incoming {
                    current.insert(key, value);
                }
            }
            (slot, update) => *slot = update,
        }
    }

    /// Whether both handles point at the same document.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.doc, &other.doc)
    }

    /// Non-owning handle to the same document.
    #[must_use]
    pub fn downgrade(&self) -> WeakResource {
        WeakResource {
            doc: Rc::downgrade(&self.doc),
        }
    }

    /// Address-based identity used as the cache key.
    #[must_use]
    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.doc) as *const () as usize
    }
}

impl fmt::Debug for RawResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResource")
            .field("type", &self.resource_type())
            .field("id", &self.id())
            .finish()
    }
}

impl From<Value> for RawResource {
    fn from(doc: Value) -> Self {
        Self::new(doc)
    }
}

/// Non-owning handle to a [`RawResource`].
#[derive(Clone, Default)]
pub struct WeakResource {
    doc: Weak<RefCell<Value>>,
}

impl WeakResource {
    /// Recover a strong handle if the document is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<RawResource> {
        self.doc.upgrade().map(|doc| RawResource { doc })
    }

    /// Whether any strong handle still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.doc.strong_count() > 0
    }

    /// Whether this weak handle points at `resource`.
    #[must_use]
    pub fn points_to(&self, resource: &RawResource) -> bool {
        std::ptr::eq(self.doc.as_ptr(), Rc::as_ptr(&resource.doc))
    }
}

impl fmt::Debug for WeakResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakResource")
            .field("alive", &self.is_alive())
            .finish()
    }
}
