#![forbid(unsafe_code)]

//! The ready-made coordinator over [`TrackedModel`] and [`ResourceModel`].

use std::fmt;

use jsync_core::{
    Interceptor, RawResource, ReactivityCoordinator, Result, UpdateHandler, View, ViewKind,
};
use jsync_model::{ModelClass, RelationshipHandler, ResourceModel, ResourceModelFactory};
use jsync_tracked::{ModelDefinition, TrackedModel, TrackedModelFactory};

/// Tracked and plain resource models, kept in step per raw resource.
///
/// Registration methods may be called at any time; views built earlier see
/// handlers registered later.
pub struct ReactivityAdapter {
    coordinator: ReactivityCoordinator<TrackedModel, ResourceModel>,
    tracked: TrackedModelFactory,
    plain: ResourceModelFactory,
}

impl ReactivityAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_factories(TrackedModelFactory::new(), ResourceModelFactory::new())
    }

    /// Use preconfigured factories (for example one with a custom parser).
    #[must_use]
    pub fn with_factories(tracked: TrackedModelFactory, plain: ResourceModelFactory) -> Self {
        Self {
            coordinator: ReactivityCoordinator::new(tracked.clone(), plain.clone()),
            tracked,
            plain,
        }
    }

    /// The change-tracking model of `raw`.
    pub fn tracked_model(&self, raw: &RawResource, force_full_update: bool) -> Result<TrackedModel> {
        self.coordinator.tracked(raw, force_full_update)
    }

    /// The plain model of `raw`.
    pub fn resource_model(&self, raw: &RawResource, force_full_update: bool) -> Result<ResourceModel> {
        self.coordinator.plain(raw, force_full_update)
    }

    pub fn request_view(
        &self,
        kind: ViewKind,
        raw: &RawResource,
        force_full_update: bool,
    ) -> Result<View<TrackedModel, ResourceModel>> {
        self.coordinator.request_view(kind, raw, force_full_update)
    }

    /// The hooked root interceptor shared by both models of `raw`.
    pub fn interceptor(&self, raw: &RawResource) -> Interceptor {
        self.coordinator.interceptor(raw)
    }

    /// Release cached views of dropped resources. Returns how many entries
    /// were freed.
    pub fn collect_garbage(&self) -> usize {
        self.coordinator.collect_garbage()
    }

    /// Handler told about every accepted write through either model.
    pub fn register_update_handler(&self, handler: UpdateHandler) {
        self.tracked.register_update_handler(handler.clone());
        self.plain.register_update_handler(handler);
    }

    pub fn register_relationship_handler(&self, handler: RelationshipHandler) {
        self.plain.register_relationship_handler(handler);
    }

    pub fn register_model_class(&self, class: ModelClass) {
        self.plain.register(class);
    }

    pub fn register_definition(&self, resource_type: impl Into<String>, definition: ModelDefinition) {
        self.tracked.register(resource_type, definition);
    }

    #[must_use]
    pub fn tracked_factory(&self) -> &TrackedModelFactory {
        &self.tracked
    }

    #[must_use]
    pub fn resource_factory(&self) -> &ResourceModelFactory {
        &self.plain
    }
}

impl Default for ReactivityAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReactivityAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactivityAdapter")
            .field("tracked", &self.tracked)
            .field("plain", &self.plain)
            .finish_non_exhaustive()
    }
}
