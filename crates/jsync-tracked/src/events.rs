#![forbid(unsafe_code)]

//! Change notification for tracked models.
//!
//! Listeners are registered per event name (`"change"` or `"change:<key>"`)
//! and held weakly; the returned [`Subscription`] owns the callback, so
//! dropping it disconnects the listener. Dead entries are pruned lazily on
//! the next emit.
//!
//! # Invariants
//!
//! 1. Listeners of one event run in registration order.
//! 2. No borrow of the listener table is held while a listener runs, so a
//!    listener may subscribe, drop subscriptions or write to the model.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::model::TrackedModel;

/// Event fired once after every batch of field changes.
pub const CHANGE: &str = "change";

/// Name of the per-field event for `key`.
#[must_use]
pub fn change_event(key: &str) -> String {
    format!("{CHANGE}:{key}")
}

/// Payload handed to listeners.
#[derive(Debug, Clone, Copy)]
pub struct ChangeEvent<'a> {
    /// Model that changed.
    pub model: &'a TrackedModel,
    /// Field that changed; `None` for the batch-level `"change"` event.
    pub key: Option<&'a str>,
    /// New value; `None` for the batch-level `"change"` event.
    pub value: Option<&'a Value>,
}

type Listener = dyn Fn(&ChangeEvent<'_>);

/// Keeps a listener connected until dropped.
#[must_use = "dropping a Subscription disconnects the listener"]
pub struct Subscription {
    _callback: Rc<Listener>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[derive(Default)]
pub(crate) struct Listeners {
    entries: RefCell<Vec<(String, Weak<Listener>)>>,
}

impl Listeners {
    pub(crate) fn subscribe(&self, event: &str, handler: impl Fn(&ChangeEvent<'_>) + 'static) -> Subscription {
        let callback: Rc<Listener> = Rc::new(handler);
        self.entries
            .borrow_mut()
            .push((event.to_owned(), Rc::downgrade(&callback)));
        Subscription {
            _callback: callback,
        }
    }

    /// Run every live listener of `event`. Returns how many ran.
    pub(crate) fn emit(&self, event: &str, payload: &ChangeEvent<'_>) -> usize {
        let live: Vec<Rc<Listener>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|(_, listener)| listener.strong_count() > 0);
            entries
                .iter()
                .filter(|(name, _)| name == event)
                .filter_map(|(_, listener)| listener.upgrade())
                .collect()
        };
        for listener in &live {
            listener(payload);
        }
        live.len()
    }

    /// Number of connected listeners across all events.
    pub(crate) fn live_count(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(_, listener)| listener.strong_count() > 0)
            .count()
    }
}
