#![forbid(unsafe_code)]

//! Keyed weak cache associating a raw resource with up to three values.
//!
//! Every [`RawResource`] may own one cache entry: a fixed triple of optional
//! values addressed by [`Slot`]. The reactivity coordinator keeps the
//! interceptor in [`Slot::Interceptor`] and the two bound views in
//! [`Slot::Tracked`] and [`Slot::Plain`].
//!
//! # Invariants
//!
//! 1. Lookup is by resource identity (heap allocation), never by content:
//!    structurally identical resources get independent entries.
//! 2. An entry holds only a [`WeakResource`] back-reference, so it never keeps
//!    its owner alive.
//! 3. An entry whose owner has died is a miss. Dead entries are swept by
//!    [`WeakCache::collect_garbage`], and by an insert of a new entry once the
//!    map has doubled since the last sweep, so inserts stay amortized O(1).
//! 4. There is no way to enumerate, count or delete live entries.
//!
//! # Failure Modes
//!
//! None: `get` on an unknown owner or an empty slot returns `None`.

use std::cell::{Cell, RefCell};
use std::fmt;

use ahash::AHashMap;

use crate::resource::{RawResource, WeakResource};

/// Entry count below which inserts never sweep.
const SWEEP_FLOOR: usize = 16;

/// Position inside a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The mutation interceptor for the resource.
    Interceptor,
    /// The change-tracking view.
    Tracked,
    /// The plain model view.
    Plain,
}

impl Slot {
    /// All slots in index order.
    pub const ALL: [Slot; 3] = [Slot::Interceptor, Slot::Tracked, Slot::Plain];

    /// Index of the slot within an entry.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Interceptor => 0,
            Self::Tracked => 1,
            Self::Plain => 2,
        }
    }

    /// Slot at `index`, if any.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Interceptor),
            1 => Some(Self::Tracked),
            2 => Some(Self::Plain),
            _ => None,
        }
    }
}

struct Entry<V> {
    owner: WeakResource,
    slots: [Option<V>; 3],
}

impl<V> Entry<V> {
    fn empty(owner: WeakResource) -> Self {
        Self {
            owner,
            slots: [None, None, None],
        }
    }
}

/// Identity-keyed cache of per-resource slot triples.
///
/// Values are returned by clone, so `V` is expected to be a cheap handle
/// (`Rc`-backed views, interceptors).
pub struct WeakCache<V> {
    entries: RefCell<AHashMap<usize, Entry<V>>>,
    sweep_at: Cell<usize>,
}

impl<V: Clone> WeakCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(AHashMap::new()),
            sweep_at: Cell::new(SWEEP_FLOOR),
        }
    }

    /// Value stored in `slot` for `owner`, if any.
    #[must_use]
    pub fn get(&self, owner: &RawResource, slot: Slot) -> Option<V> {
        let entries = self.entries.borrow();
        let entry = entries.get(&owner.identity())?;
        if !entry.owner.points_to(owner) {
            return None;
        }
        entry.slots[slot.index()].clone()
    }

    /// Store `value` in `slot` for `owner`.
    ///
    /// Creates an empty entry when `owner` has none. With `slot == None` the
    /// value is discarded and only the entry is created.
    pub fn set(&self, owner: &RawResource, value: V, slot: Option<Slot>) {
        let key = owner.identity();
        let mut swept = Vec::new();
        {
            let mut entries = self.entries.borrow_mut();
            let fresh = entries
                .get(&key)
                .is_none_or(|entry| !entry.owner.points_to(owner));
            if fresh {
                if entries.len() >= self.sweep_at.get() {
                    swept = take_dead(&mut entries);
                    self.rearm(entries.len());
                }
                entries.insert(key, Entry::empty(owner.downgrade()));
            }
            if let (Some(slot), Some(entry)) = (slot, entries.get_mut(&key)) {
                entry.slots[slot.index()] = Some(value);
            }
        }
        if !swept.is_empty() {
            tracing::trace!(target: "jsync::cache", swept = swept.len(), "swept dead cache entries");
        }
    }

    /// Drop every entry whose owner has been released.
    ///
    /// Returns the number of entries reclaimed.
    pub fn collect_garbage(&self) -> usize {
        // Dead values are dropped after the borrow ends; their destructors may
        // re-enter the cache.
        let dead = {
            let mut entries = self.entries.borrow_mut();
            let dead = take_dead(&mut entries);
            self.rearm(entries.len());
            dead
        };
        let reclaimed = dead.len();
        drop(dead);
        if reclaimed > 0 {
            tracing::debug!(target: "jsync::cache", reclaimed, "collected dead cache entries");
        }
        reclaimed
    }

    fn rearm(&self, live: usize) {
        self.sweep_at.set((live * 2).max(SWEEP_FLOOR));
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.entries.borrow().len()
    }
}

fn take_dead<V>(entries: &mut AHashMap<usize, Entry<V>>) -> Vec<Entry<V>> {
    let keys: Vec<usize> = entries
        .iter()
        .filter(|(_, entry)| !entry.owner.is_alive())
        .map(|(key, _)| *key)
        .collect();
    keys.into_iter()
        .filter_map(|key| entries.remove(&key))
        .collect()
}

impl<V: Clone> Default for WeakCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for WeakCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCache").finish_non_exhaustive()
    }
}
