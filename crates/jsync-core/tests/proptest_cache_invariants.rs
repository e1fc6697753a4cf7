//! Property-based invariant tests for the weak cache, the interceptor and the
//! coordinator.
//!
//! 1. Cache `get` is `None` for every slot not explicitly set.
//! 2. A slot-less `set` never makes a value observable.
//! 3. Interceptor writes land in the raw document and are visible through
//!    every other interceptor over the same document.
//! 4. Repeated view requests return the identical handle.
//! 5. Dropping the resource frees the document whatever was cached for it.

use std::rc::Rc;

use jsync_core::{Interceptor, RawResource, ReactivityCoordinator, Result, Slot, WeakCache};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

// ── Helpers ─────────────────────────────────────────────────────────────

fn slot_strategy() -> impl Strategy<Value = Slot> {
    prop_oneof![Just(Slot::Interceptor), Just(Slot::Tracked), Just(Slot::Plain)]
}

fn primitive_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

fn resource() -> RawResource {
    RawResource::new(json!({ "id": "1", "type": "cat", "attributes": { "nested": {} } }))
}

#[derive(Clone)]
struct Quiet;

impl jsync_core::ChangeTracking for Quiet {
    fn needs_sync(&self, _: &str, _: &Value) -> bool {
        false
    }

    fn sync(&self, _: &str, _: &Value) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
struct Plain(Rc<Interceptor>);

fn coordinator() -> ReactivityCoordinator<Quiet, Plain> {
    ReactivityCoordinator::new(
        |_: &Interceptor, _: Option<Quiet>| -> Result<Quiet> { Ok(Quiet) },
        |node: &Interceptor, existing: Option<Plain>| -> Result<Plain> {
            Ok(existing.unwrap_or_else(|| Plain(Rc::new(node.attributes()))))
        },
    )
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Cache misses
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unset_slots_are_none(stored in proptest::option::of(slot_strategy()), value in any::<u32>()) {
        let cache = WeakCache::new();
        let raw = resource();
        cache.set(&raw, value, stored);
        for slot in Slot::ALL {
            let expected = (Some(slot) == stored).then_some(value);
            prop_assert_eq!(cache.get(&raw, slot), expected);
        }
    }

    #[test]
    fn other_owners_never_see_a_value(slot in slot_strategy(), value in any::<u32>()) {
        let cache = WeakCache::new();
        let owner = resource();
        let stranger = resource();
        cache.set(&owner, value, Some(slot));
        for probe in Slot::ALL {
            prop_assert_eq!(cache.get(&stranger, probe), None);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Interceptor writes are shared
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn writes_reach_the_document(
        writes in proptest::collection::vec((key_strategy(), primitive_strategy()), 1..24)
    ) {
        let raw = resource();
        let writer = Interceptor::new(&raw).attributes().child("nested").unwrap();
        let reader = Interceptor::new(&raw).attributes();

        let mut expected = Map::new();
        for (key, value) in writes {
            writer.set(key.as_str(), value.clone()).unwrap();
            expected.insert(key, value);
        }

        prop_assert_eq!(raw.snapshot()["attributes"]["nested"].clone(), Value::Object(expected.clone()));
        prop_assert_eq!(reader.value("nested"), Some(Value::Object(expected)));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4-5. Coordinator identity and lifetime
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn views_are_identity_stable(requests in 1usize..8) {
        let coordinator = coordinator();
        let raw = resource();
        let first = coordinator.plain(&raw, false).unwrap();
        for _ in 0..requests {
            let again = coordinator.plain(&raw, false).unwrap();
            prop_assert!(Rc::ptr_eq(&first.0, &again.0));
        }
    }

    #[test]
    fn dropping_resources_frees_documents(count in 1usize..16) {
        let coordinator = coordinator();
        let mut probes = Vec::new();
        for _ in 0..count {
            let raw = resource();
            coordinator.plain(&raw, false).unwrap();
            coordinator.tracked(&raw, false).unwrap();
            probes.push(raw.downgrade());
        }
        for probe in &probes {
            prop_assert!(!probe.is_alive());
        }
        coordinator.collect_garbage();
        prop_assert_eq!(coordinator.collect_garbage(), 0);
    }
}
