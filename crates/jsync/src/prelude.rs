//! Common imports for jsync users.

pub use crate::adapter::ReactivityAdapter;
pub use jsync_core::{Interceptor, Proxied, RawResource, Result, SyncError, UpdateHandler, ViewKind};
pub use jsync_model::{ModelClass, RelationshipHandler, Resolution, ResourceModel, SetOutcome};
pub use jsync_tracked::{ChangeEvent, ModelDefinition, Subscription, TrackedModel};
