//! Property-based invariant tests for the facade's view cache.
//!
//! 1. Repeated requests without a forced update return the same handles.
//! 2. After any sequence of writes through either view, both views and the
//!    raw document agree on every attribute.

use jsync::prelude::*;
use proptest::prelude::*;
use serde_json::{Value, json};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Write {
    Tracked(usize, i32),
    Plain(usize, i32),
    Raw(usize, i32),
}

const KEYS: [&str; 3] = ["name", "age", "color"];

fn write_strategy() -> impl Strategy<Value = Write> {
    prop_oneof![
        (0..KEYS.len(), any::<i32>()).prop_map(|(k, v)| Write::Tracked(k, v)),
        (0..KEYS.len(), any::<i32>()).prop_map(|(k, v)| Write::Plain(k, v)),
        (0..KEYS.len(), any::<i32>()).prop_map(|(k, v)| Write::Raw(k, v)),
    ]
}

fn resource() -> RawResource {
    RawResource::new(json!({
        "id": "1",
        "type": "thing",
        "attributes": { "name": 0, "age": 0, "color": 0 }
    }))
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Identity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn repeated_requests_are_identity_stable(kinds in proptest::collection::vec(any::<bool>(), 1..12)) {
        let adapter = ReactivityAdapter::new();
        let raw = resource();
        let tracked = adapter.tracked_model(&raw, false).unwrap();
        let plain = adapter.resource_model(&raw, false).unwrap();
        for tracked_kind in kinds {
            if tracked_kind {
                prop_assert!(adapter.tracked_model(&raw, false).unwrap().ptr_eq(&tracked));
            } else {
                prop_assert!(adapter.resource_model(&raw, false).unwrap().ptr_eq(&plain));
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Agreement
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn views_agree_after_writes(writes in proptest::collection::vec(write_strategy(), 1..24)) {
        let adapter = ReactivityAdapter::new();
        let raw = resource();
        let tracked = adapter.tracked_model(&raw, false).unwrap();
        let plain = adapter.resource_model(&raw, false).unwrap();
        let attributes = adapter.interceptor(&raw).attributes();

        for write in writes {
            let (key, value) = match write {
                Write::Tracked(k, v) => {
                    tracked.set(KEYS[k], json!(v)).unwrap();
                    (KEYS[k], v)
                }
                Write::Plain(k, v) => {
                    plain.set(KEYS[k], json!(v)).unwrap();
                    (KEYS[k], v)
                }
                Write::Raw(k, v) => {
                    attributes.set(KEYS[k], json!(v)).unwrap();
                    (KEYS[k], v)
                }
            };
            prop_assert_eq!(tracked.get(key), Some(json!(value)));
        }

        let doc: Value = raw.snapshot()["attributes"].clone();
        for key in KEYS {
            let tracked_value = tracked.get(key);
            let plain_value = plain.get(key);
            prop_assert_eq!(tracked_value.as_ref(), doc.get(key));
            prop_assert_eq!(plain_value.as_ref(), doc.get(key));
        }
    }
}
