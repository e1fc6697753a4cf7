#![forbid(unsafe_code)]

//! Error type shared by every jsync crate.
//!
//! The reactivity core has almost no failure surface: cache misses are `None`
//! and writes of unknown view keys are kept locally. The variants below cover
//! the cases a path-addressed interceptor can hit that a by-reference wrapper
//! cannot, plus failures raised by injected factories.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `ResourceDropped` | Last `RawResource` handle released | Reads return `None`, writes fail |
//! | `NotAContainer` | Path now resolves to a primitive or nothing | Write is rejected |
//! | `IndexOutOfBounds` | Array write past `len` | Write is rejected |
//! | `InvalidDocument` | Malformed JSON input | Construction fails |
//! | `Factory` | View factory could not build or merge | Propagated unmodified, cache untouched |

use thiserror::Error;

/// Errors from jsync operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The raw resource behind an interceptor or view no longer exists.
    #[error("raw resource has been dropped")]
    ResourceDropped,

    /// The interceptor path does not resolve to an object or array.
    #[error("path `{path}` does not resolve to an object or array")]
    NotAContainer { path: String },

    /// Array write beyond the append position.
    #[error("index {index} out of bounds at `{path}` (len {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },

    /// Input could not be parsed as a resource document or configuration.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A view factory refused to build or merge a view.
    #[error("view factory failed: {0}")]
    Factory(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}

/// Result alias used across jsync.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            SyncError::ResourceDropped.to_string(),
            "raw resource has been dropped"
        );
        let err = SyncError::IndexOutOfBounds {
            path: "attributes.seats".into(),
            index: 9,
            len: 4,
        };
        assert_eq!(
            err.to_string(),
            "index 9 out of bounds at `attributes.seats` (len 4)"
        );
    }

    #[test]
    fn json_errors_become_invalid_document() {
        let err: SyncError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SyncError::InvalidDocument(_)));
    }
}
