#![forbid(unsafe_code)]

//! Plain resource models for jsync.
//!
//! [`ResourceModelFactory`] turns a resource interceptor into a
//! [`ResourceModel`]: a field table whose root and attribute fields read and
//! write through to the raw document, with per-type [`ModelClass`] defaults
//! and computed fields, and relationships exposed as lazily resolved
//! [`Relationship`] callables.

pub mod class;
pub mod factory;
pub mod model;
pub mod naming;
pub mod relationship;

pub use class::{ComputedField, ModelClass, ModelClassConfig};
pub use factory::ResourceModelFactory;
pub use model::{FieldKind, ResourceModel, SetOutcome};
pub use naming::{camel_case, pascal_case};
pub use relationship::{
    PendingValue, RELATIONSHIPS, Relationship, RelationshipHandler, RelationshipOptions,
    RelationshipRef, Resolution,
};
