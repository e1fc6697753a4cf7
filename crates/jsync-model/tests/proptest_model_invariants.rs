//! Property-based invariant tests for plain resource models.
//!
//! 1. Writing a structurally equal value never reaches the update handler.
//! 2. Every accepted write reaches the update handler exactly once and lands
//!    in the raw document.
//! 3. Unwinding a model built over a camelCased resource reproduces it.

use std::cell::Cell;
use std::rc::Rc;

use jsync_core::{Interceptor, RawResource, UpdateHandler};
use jsync_model::{ResourceModelFactory, SetOutcome};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

// ── Helpers ─────────────────────────────────────────────────────────────

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z ]{0,6}".prop_map(Value::String),
    ]
}

fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_strategy().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,3}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn attributes_strategy() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("[a-z]{1,4}([A-Z][a-z]{1,3})?", value_strategy(), 1..6)
        .prop_filter("identity keys live at the root", |map| {
            !map.contains_key("id") && !map.contains_key("type")
        })
        .prop_map(|map| map.into_iter().collect())
}

fn resource(attributes: Map<String, Value>) -> RawResource {
    RawResource::new(json!({
        "id": "7",
        "type": "thing",
        "attributes": attributes,
        "links": { "self": "/thing/7/" },
        "relationships": {}
    }))
}

fn counting_factory() -> (ResourceModelFactory, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let factory = ResourceModelFactory::new();
    factory.register_update_handler(UpdateHandler::new(move |_| counter.set(counter.get() + 1)));
    (factory, calls)
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Update handler accounting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn equal_writes_are_silent(attributes in attributes_strategy()) {
        let (factory, calls) = counting_factory();
        let raw = resource(attributes.clone());
        let model = factory.to_model(&Interceptor::new(&raw), None).unwrap();
        for (key, value) in attributes {
            prop_assert_eq!(model.set(&key, value).unwrap(), SetOutcome::Unchanged);
        }
        prop_assert_eq!(calls.get(), 0);
    }

    #[test]
    fn accepted_writes_fire_once(attributes in attributes_strategy(), next in value_strategy()) {
        let (factory, calls) = counting_factory();
        let raw = resource(attributes.clone());
        let model = factory.to_model(&Interceptor::new(&raw), None).unwrap();

        let mut expected = 0;
        for (key, current) in attributes {
            let outcome = model.set(&key, next.clone()).unwrap();
            if current == next {
                prop_assert_eq!(outcome, SetOutcome::Unchanged);
            } else {
                expected += 1;
                prop_assert_eq!(outcome, SetOutcome::Written);
            }
            prop_assert_eq!(raw.snapshot()["attributes"][key.as_str()].clone(), next.clone());
        }
        prop_assert_eq!(calls.get(), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Unwinding
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unwinding_reproduces_the_resource(attributes in attributes_strategy()) {
        let factory = ResourceModelFactory::new();
        let raw = resource(attributes);
        let model = factory.to_model(&Interceptor::new(&raw), None).unwrap();
        prop_assert_eq!(factory.to_raw(&model, false), raw.snapshot());
    }
}
