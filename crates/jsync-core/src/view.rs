#![forbid(unsafe_code)]

//! Seams between the coordinator and the view implementations it caches.
//!
//! Views are built by external factories; the coordinator only needs to know
//! how to call them ([`ViewFactory`]) and, for the change-tracking kind, how to
//! keep its bookkeeping in sync when a write arrives from elsewhere
//! ([`ChangeTracking`]).

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;

use crate::cache::Slot;
use crate::error::Result;
use crate::interceptor::Interceptor;

/// Which bound view a caller is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// The change-tracking UI model.
    Tracked,
    /// The plain dynamic-field model.
    Plain,
}

impl ViewKind {
    /// Cache slot holding views of this kind.
    #[must_use]
    pub const fn slot(self) -> Slot {
        match self {
            Self::Tracked => Slot::Tracked,
            Self::Plain => Slot::Plain,
        }
    }
}

/// A bound view of either kind.
#[derive(Debug, Clone)]
pub enum View<U, P> {
    /// Change-tracking view.
    Tracked(U),
    /// Plain view.
    Plain(P),
}

impl<U, P> View<U, P> {
    /// Kind of this view.
    #[must_use]
    pub fn kind(&self) -> ViewKind {
        match self {
            Self::Tracked(_) => ViewKind::Tracked,
            Self::Plain(_) => ViewKind::Plain,
        }
    }

    /// The tracked view, if this is one.
    #[must_use]
    pub fn into_tracked(self) -> Option<U> {
        match self {
            Self::Tracked(view) => Some(view),
            Self::Plain(_) => None,
        }
    }

    /// The plain view, if this is one.
    #[must_use]
    pub fn into_plain(self) -> Option<P> {
        match self {
            Self::Tracked(_) => None,
            Self::Plain(view) => Some(view),
        }
    }
}

/// Builds a view bound to a resource's root interceptor.
///
/// With `existing == Some(view)` the factory must merge the current document
/// into that instance in place and return it, preserving its identity.
pub trait ViewFactory<V> {
    /// Build a new view or merge into `existing`.
    fn build(&self, interceptor: &Interceptor, existing: Option<V>) -> Result<V>;
}

impl<V, F> ViewFactory<V> for F
where
    F: Fn(&Interceptor, Option<V>) -> Result<V>,
{
    fn build(&self, interceptor: &Interceptor, existing: Option<V>) -> Result<V> {
        self(interceptor, existing)
    }
}

/// A view with its own change bookkeeping that must be told about writes it
/// did not originate.
pub trait ChangeTracking {
    /// Whether the view tracks `key` and its recorded value differs from
    /// `value`. This check is what stops sync cycles.
    fn needs_sync(&self, key: &str, value: &Value) -> bool;

    /// Record `value` for `key` through the view's own write path, without
    /// reporting it to the update handler.
    fn sync(&self, key: &str, value: &Value) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Update handler
// ---------------------------------------------------------------------------

/// One accepted field write, as reported to an [`UpdateHandler`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldUpdate {
    /// Resource `type`.
    pub resource_type: Option<String>,
    /// Resource `id`.
    pub id: Option<String>,
    /// Field written.
    pub key: String,
    /// New value.
    pub value: Value,
}

/// Audit callback fired synchronously, once per accepted view write, before
/// the value is committed. Defaults to a no-op.
#[derive(Clone)]
pub struct UpdateHandler(Rc<dyn Fn(&FieldUpdate)>);

impl UpdateHandler {
    /// Wrap a callback.
    pub fn new(handler: impl Fn(&FieldUpdate) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// A handler that ignores every update.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Report an update.
    pub fn notify(&self, update: &FieldUpdate) {
        (self.0)(update);
    }
}

impl Default for UpdateHandler {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for UpdateHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateHandler").finish_non_exhaustive()
    }
}
