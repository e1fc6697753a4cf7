#![forbid(unsafe_code)]

//! Change-tracking resource models for jsync.
//!
//! [`TrackedModelFactory`] parses a resource into a [`TrackedModel`] whose
//! attribute fields stay bound to the raw document. Every set records
//! `changed`/`previous` bookkeeping and fires `"change:<key>"` and
//! `"change"` events to listeners held by [`Subscription`]s. The model
//! implements [`jsync_core::ChangeTracking`], so the reactivity coordinator
//! can keep it in step with writes made through other views.

pub mod definition;
pub mod events;
pub mod factory;
pub mod model;
pub mod parser;

pub use definition::{DefinitionConfig, ModelDefinition, TrackedComputed};
pub use events::{CHANGE, ChangeEvent, Subscription, change_event};
pub use factory::TrackedModelFactory;
pub use model::TrackedModel;
pub use parser::{Parser, flatten_resource};
