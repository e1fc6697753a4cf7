#![forbid(unsafe_code)]

//! jsync: keep a change-tracking view and a plain view of the same JSON:API
//! resource in step with the raw document and with each other.
//!
//! ```
//! use jsync::prelude::*;
//! use serde_json::json;
//!
//! let adapter = ReactivityAdapter::new();
//! let raw = RawResource::new(json!({ "type": "cat", "attributes": { "name": "Garfield" } }));
//!
//! let tracked = adapter.tracked_model(&raw, false)?;
//! tracked.set("name", json!("HelloKitty"))?;
//!
//! let plain = adapter.resource_model(&raw, false)?;
//! assert_eq!(plain.get("name"), Some(json!("HelloKitty")));
//! # Ok::<(), jsync::SyncError>(())
//! ```

pub mod adapter;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod prelude;

pub use adapter::ReactivityAdapter;
pub use jsync_core::{
    ChangeTracking, FieldUpdate, Interceptor, Proxied, RawResource, ReactivityCoordinator, Result,
    Segment, Slot, SyncError, UpdateHandler, View, ViewFactory, ViewKind, WeakCache,
    WeakResource,
};
pub use jsync_model::{
    FieldKind, ModelClass, ModelClassConfig, Relationship, RelationshipHandler,
    RelationshipOptions, RelationshipRef, Resolution, ResourceModel, ResourceModelFactory,
    SetOutcome,
};
pub use jsync_tracked::{
    ChangeEvent, DefinitionConfig, ModelDefinition, Subscription, TrackedModel,
    TrackedModelFactory,
};
