#![forbid(unsafe_code)]

//! Relationship callables.
//!
//! A model never fetches related resources itself. Each relationship is a
//! [`Relationship`] handle; resolving it hands the live `{data, links}` pair
//! to a [`RelationshipHandler`] and returns whatever that handler produces,
//! which may be a pending future the caller awaits.
//!
//! # Invariants
//!
//! 1. The handler runs only when [`Relationship::resolve`] (or a variant) is
//!    called, never at model construction.
//! 2. `data` and `links` are read from the raw document at resolve time.
//! 3. An override handler passed through [`RelationshipOptions`] replaces the
//!    factory handler for that call and is not handed the options.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use jsync_core::Interceptor;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::factory::Shared;

/// Key under which a JSON:API resource keeps its relationships.
pub const RELATIONSHIPS: &str = "relationships";

/// The `{data, links}` pair of one relationship.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationshipRef {
    /// Resource identifier object(s), or `null`.
    #[serde(default)]
    pub data: Value,
    /// Relationship links, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

impl RelationshipRef {
    /// Read a relationship object (`{"data": .., "links": ..}`).
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            data: value.get("data").cloned().unwrap_or(Value::Null),
            links: value.get("links").cloned(),
        }
    }

    /// Render as `{"data": .., "links": ..}`, omitting absent links.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match &self.links {
            Some(links) => json!({ "data": self.data, "links": links }),
            None => json!({ "data": self.data }),
        }
    }
}

/// Boxed future produced by an asynchronous relationship handler.
pub type PendingValue = Pin<Box<dyn Future<Output = Value>>>;

/// What resolving a relationship produced.
pub enum Resolution {
    /// Available immediately.
    Ready(Value),
    /// Produced later; the model never polls it.
    Pending(PendingValue),
}

impl Resolution {
    /// Wrap a future.
    pub fn pending(future: impl Future<Output = Value> + 'static) -> Self {
        Self::Pending(Box::pin(future))
    }

    /// Whether the value is already available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The value, if available without awaiting.
    #[must_use]
    pub fn ready(self) -> Option<Value> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    /// Await the value.
    pub async fn value(self) -> Value {
        match self {
            Self::Ready(value) => value,
            Self::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Pending(_) => f.debug_tuple("Pending").finish_non_exhaustive(),
        }
    }
}

/// Resolves a relationship: `(relationship, options) -> Resolution`.
#[derive(Clone)]
pub struct RelationshipHandler(Rc<dyn Fn(&RelationshipRef, Option<&Value>) -> Resolution>);

impl RelationshipHandler {
    /// Wrap a callback.
    pub fn new(handler: impl Fn(&RelationshipRef, Option<&Value>) -> Resolution + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// Handler returning the `{data, links}` pair itself.
    #[must_use]
    pub fn passthrough() -> Self {
        Self::new(|relationship, _| Resolution::Ready(relationship.to_value()))
    }

    /// Invoke the handler.
    pub fn call(&self, relationship: &RelationshipRef, options: Option<&Value>) -> Resolution {
        (self.0)(relationship, options)
    }
}

impl Default for RelationshipHandler {
    fn default() -> Self {
        Self::passthrough()
    }
}

impl fmt::Debug for RelationshipHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipHandler").finish_non_exhaustive()
    }
}

/// Per-call options for [`Relationship::resolve_with`].
#[derive(Debug, Clone, Default)]
pub struct RelationshipOptions {
    /// Replaces the factory handler for this call.
    pub handler: Option<RelationshipHandler>,
    /// Forwarded to the factory handler.
    pub params: Option<Value>,
}

impl RelationshipOptions {
    /// Options that only override the handler.
    #[must_use]
    pub fn with_handler(handler: RelationshipHandler) -> Self {
        Self {
            handler: Some(handler),
            params: None,
        }
    }

    /// Options that only carry parameters for the factory handler.
    #[must_use]
    pub fn with_params(params: Value) -> Self {
        Self {
            handler: None,
            params: Some(params),
        }
    }
}

/// Zero-argument callable standing for one relationship of a model.
#[derive(Clone)]
pub struct Relationship {
    key: String,
    name: String,
    root: Interceptor,
    shared: Rc<Shared>,
}

impl Relationship {
    pub(crate) fn new(key: String, name: String, root: Interceptor, shared: Rc<Shared>) -> Self {
        Self {
            key,
            name,
            root,
            shared,
        }
    }

    /// Key under `relationships` in the raw document.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// PascalCase name the model exposes it under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current `{data, links}` pair.
    #[must_use]
    pub fn reference(&self) -> RelationshipRef {
        self.root
            .child(RELATIONSHIPS)
            .and_then(|relationships| relationships.value(self.key.as_str()))
            .map(|value| RelationshipRef::from_value(&value))
            .unwrap_or_default()
    }

    /// Resolve through the factory's relationship handler.
    #[must_use]
    pub fn resolve(&self) -> Resolution {
        self.resolve_with(RelationshipOptions::default())
    }

    /// Resolve with per-call options.
    #[must_use]
    pub fn resolve_with(&self, options: RelationshipOptions) -> Resolution {
        let reference = self.reference();
        tracing::trace!(target: "jsync::model", relationship = %self.name, "resolving relationship");
        match options.handler {
            Some(handler) => handler.call(&reference, None),
            None => {
                let handler = self.shared.relationship_handler();
                handler.call(&reference, options.params.as_ref())
            }
        }
    }
}

impl fmt::Debug for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relationship")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish()
    }
}
