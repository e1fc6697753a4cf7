#![forbid(unsafe_code)]

//! Reactivity coordinator: one interceptor and at most one view of each kind
//! per raw resource.
//!
//! # Design
//!
//! The coordinator owns a [`WeakCache`] whose entries hold, per resource, the
//! root [`Interceptor`] (slot 0), the change-tracking view (slot 1) and the
//! plain view (slot 2). Views are produced by injected [`ViewFactory`]s that
//! receive the interceptor.
//!
//! The interceptor carries a write hook. Whenever a top-level attribute is
//! written through any interceptor of the resource, the hook looks up the
//! tracked view and, if its recorded value differs, replays the write through
//! the view's own sync path so its change bookkeeping and listeners stay
//! current. The plain view needs no push: it reads through on every access.
//!
//! # Invariants
//!
//! 1. Absent a forced update, repeated requests for the same kind and the same
//!    resource return the identical view handle.
//! 2. A forced update merges into the existing views (plain first, then
//!    tracked) and re-caches the same handles.
//! 3. No slot is written until its factory has returned `Ok`.
//! 4. Nothing cached holds a strong reference to the resource: dropping the
//!    caller's last handle frees the document immediately, and the cached
//!    views on the next sweep.
//!
//! # Failure Modes
//!
//! - **Factory error**: returned unmodified; the cache keeps its prior state.
//! - **Sync error inside the hook**: aborts the interceptor write that
//!   triggered it and propagates to the writer.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::cache::{Slot, WeakCache};
use crate::error::Result;
use crate::interceptor::{Interceptor, WriteHook};
use crate::resource::{RawResource, WeakResource};
use crate::view::{ChangeTracking, View, ViewFactory, ViewKind};

/// Value stored in a cache slot.
#[derive(Clone)]
enum Cached<U, P> {
    Interceptor(Interceptor),
    Tracked(U),
    Plain(P),
}

type Cache<U, P> = WeakCache<Cached<U, P>>;

/// Hands out identity-stable, mutually synchronized views of raw resources.
pub struct ReactivityCoordinator<U, P> {
    cache: Rc<Cache<U, P>>,
    tracked_factory: Box<dyn ViewFactory<U>>,
    plain_factory: Box<dyn ViewFactory<P>>,
}

impl<U, P> ReactivityCoordinator<U, P>
where
    U: ChangeTracking + Clone + 'static,
    P: Clone + 'static,
{
    /// Create a coordinator from the two view factories.
    pub fn new(
        tracked_factory: impl ViewFactory<U> + 'static,
        plain_factory: impl ViewFactory<P> + 'static,
    ) -> Self {
        Self {
            cache: Rc::new(WeakCache::new()),
            tracked_factory: Box::new(tracked_factory),
            plain_factory: Box::new(plain_factory),
        }
    }

    /// The root interceptor for `raw`, created and cached on first use.
    pub fn interceptor(&self, raw: &RawResource) -> Interceptor {
        if let Some(Cached::Interceptor(interceptor)) = self.cache.get(raw, Slot::Interceptor) {
            return interceptor;
        }
        let hook = sync_hook::<U, P>(Rc::downgrade(&self.cache), raw.downgrade());
        let interceptor = Interceptor::new(raw).with_hook(hook);
        self.cache.set(
            raw,
            Cached::Interceptor(interceptor.clone()),
            Some(Slot::Interceptor),
        );
        tracing::debug!(
            target: "jsync::coordinator",
            resource_type = ?raw.resource_type(),
            id = ?raw.id(),
            "created interceptor"
        );
        interceptor
    }

    /// The view of `kind` for `raw`.
    ///
    /// With `force_full_update`, every view already cached for `raw` is first
    /// rebuilt in place from the current document. Use it after the document
    /// was replaced in bulk (for example by [`RawResource::assign`]).
    pub fn request_view(
        &self,
        kind: ViewKind,
        raw: &RawResource,
        force_full_update: bool,
    ) -> Result<View<U, P>> {
        Ok(match kind {
            ViewKind::Tracked => View::Tracked(self.tracked(raw, force_full_update)?),
            ViewKind::Plain => View::Plain(self.plain(raw, force_full_update)?),
        })
    }

    /// The change-tracking view for `raw`.
    pub fn tracked(&self, raw: &RawResource, force_full_update: bool) -> Result<U> {
        let interceptor = self.prepare(raw, force_full_update)?;
        if let Some(Cached::Tracked(view)) = self.cache.get(raw, Slot::Tracked) {
            tracing::trace!(target: "jsync::coordinator", kind = ?ViewKind::Tracked, "view cache hit");
            return Ok(view);
        }
        let view = self.tracked_factory.build(&interceptor, None)?;
        self.cache
            .set(raw, Cached::Tracked(view.clone()), Some(Slot::Tracked));
        log_built(ViewKind::Tracked, raw);
        Ok(view)
    }

    /// The plain view for `raw`.
    pub fn plain(&self, raw: &RawResource, force_full_update: bool) -> Result<P> {
        let interceptor = self.prepare(raw, force_full_update)?;
        if let Some(Cached::Plain(view)) = self.cache.get(raw, Slot::Plain) {
            tracing::trace!(target: "jsync::coordinator", kind = ?ViewKind::Plain, "view cache hit");
            return Ok(view);
        }
        let view = self.plain_factory.build(&interceptor, None)?;
        self.cache
            .set(raw, Cached::Plain(view.clone()), Some(Slot::Plain));
        log_built(ViewKind::Plain, raw);
        Ok(view)
    }

    /// Release cache entries of resources that no longer exist.
    pub fn collect_garbage(&self) -> usize {
        self.cache.collect_garbage()
    }

    fn prepare(&self, raw: &RawResource, force_full_update: bool) -> Result<Interceptor> {
        let interceptor = self.interceptor(raw);
        if force_full_update {
            self.full_resync(raw, &interceptor)?;
        }
        Ok(interceptor)
    }

    fn full_resync(&self, raw: &RawResource, interceptor: &Interceptor) -> Result<()> {
        let plain = match self.cache.get(raw, Slot::Plain) {
            Some(Cached::Plain(view)) => Some(view),
            _ => None,
        };
        let tracked = match self.cache.get(raw, Slot::Tracked) {
            Some(Cached::Tracked(view)) => Some(view),
            _ => None,
        };
        if plain.is_none() && tracked.is_none() {
            return Ok(());
        }

        tracing::debug!(
            target: "jsync::coordinator",
            plain = plain.is_some(),
            tracked = tracked.is_some(),
            resource_type = ?raw.resource_type(),
            id = ?raw.id(),
            "full resync"
        );

        if let Some(existing) = plain {
            let merged = self.plain_factory.build(interceptor, Some(existing))?;
            self.cache.set(raw, Cached::Plain(merged), Some(Slot::Plain));
        }
        if let Some(existing) = tracked {
            let merged = self.tracked_factory.build(interceptor, Some(existing))?;
            self.cache.set(raw, Cached::Tracked(merged), Some(Slot::Tracked));
        }
        Ok(())
    }
}

fn log_built(kind: ViewKind, raw: &RawResource) {
    tracing::debug!(
        target: "jsync::coordinator",
        ?kind,
        resource_type = ?raw.resource_type(),
        id = ?raw.id(),
        "built view"
    );
}

/// Hook keeping the tracked view of `owner` in step with attribute writes made
/// through any other path.
fn sync_hook<U, P>(cache: Weak<Cache<U, P>>, owner: WeakResource) -> WriteHook
where
    U: ChangeTracking + Clone + 'static,
    P: Clone + 'static,
{
    Rc::new(move |event| {
        let Some(key) = event.attribute_key() else {
            return Ok(());
        };
        let (Some(cache), Some(raw)) = (cache.upgrade(), owner.upgrade()) else {
            return Ok(());
        };
        let Some(Cached::Tracked(view)) = cache.get(&raw, Slot::Tracked) else {
            return Ok(());
        };
        if view.needs_sync(key, event.value) {
            tracing::trace!(target: "jsync::coordinator", key, "syncing tracked view");
            view.sync(key, event.value)?;
        }
        Ok(())
    })
}

impl<U, P> fmt::Debug for ReactivityCoordinator<U, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactivityCoordinator").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
