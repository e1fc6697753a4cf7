#![forbid(unsafe_code)]

//! Core of jsync: keep a raw JSON:API resource and its live views in step.
//!
//! - [`RawResource`]: caller-owned, shared handle over the raw document.
//! - [`WeakCache`]: identity-keyed cache of per-resource slot triples that
//!   never keeps a resource alive.
//! - [`Interceptor`]: recursive, path-addressed wrapper whose writes land in
//!   the raw document and are observed by a [`WriteHook`].
//! - [`ReactivityCoordinator`]: hands out at most one view of each
//!   [`ViewKind`] per resource and keeps the change-tracking one in sync.
//!
//! View implementations live in sibling crates and plug in through
//! [`ViewFactory`] and [`ChangeTracking`].
//!
//! # Example
//!
//! ```
//! use jsync_core::{Interceptor, RawResource, ReactivityCoordinator, Result};
//! use serde_json::{Value, json};
//!
//! #[derive(Clone)]
//! struct Plain(Interceptor);
//!
//! #[derive(Clone)]
//! struct Untracked;
//!
//! impl jsync_core::ChangeTracking for Untracked {
//!     fn needs_sync(&self, _: &str, _: &Value) -> bool {
//!         false
//!     }
//!     fn sync(&self, _: &str, _: &Value) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let coordinator = ReactivityCoordinator::new(
//!     |_: &Interceptor, _: Option<Untracked>| -> Result<Untracked> { Ok(Untracked) },
//!     |node: &Interceptor, existing: Option<Plain>| -> Result<Plain> {
//!         Ok(existing.unwrap_or_else(|| Plain(node.attributes())))
//!     },
//! );
//!
//! let raw = RawResource::new(json!({ "id": "1", "type": "cat", "attributes": { "name": "Garfield" } }));
//! let view = coordinator.plain(&raw, false)?;
//! view.0.set("name", json!("Nermal"))?;
//! assert_eq!(raw.snapshot()["attributes"]["name"], "Nermal");
//! # Ok::<(), jsync_core::SyncError>(())
//! ```

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod interceptor;
pub mod resource;
pub mod view;

pub use cache::{Slot, WeakCache};
pub use coordinator::ReactivityCoordinator;
pub use error::{Result, SyncError};
pub use interceptor::{ATTRIBUTES, Interceptor, Proxied, Segment, WriteEvent, WriteHook};
pub use resource::{RawResource, WeakResource};
pub use view::{ChangeTracking, FieldUpdate, UpdateHandler, View, ViewFactory, ViewKind};
