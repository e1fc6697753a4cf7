//! End-to-end synchronization scenarios through the facade.
//!
//! Each test drives both models of one raw resource and checks what the
//! other model, the raw document and the update handler observe.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use jsync::prelude::*;
use jsync::{ChangeTracking, FieldUpdate, RelationshipRef};
use serde_json::json;

// ── Helpers ─────────────────────────────────────────────────────────────

fn counting_adapter() -> (ReactivityAdapter, Rc<RefCell<Vec<FieldUpdate>>>) {
    let adapter = ReactivityAdapter::new();
    let updates = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&updates);
    adapter.register_update_handler(UpdateHandler::new(move |update| {
        sink.borrow_mut().push(update.clone());
    }));
    (adapter, updates)
}

fn garfield() -> RawResource {
    RawResource::new(json!({ "attributes": { "name": "Garfield" } }))
}

// ═════════════════════════════════════════════════════════════════════════
// Cross-view synchronization
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn garfield_hellokitty_sylvester() {
    let (adapter, updates) = counting_adapter();
    let raw = garfield();

    let tracked = adapter.tracked_model(&raw, false).unwrap();
    assert_eq!(tracked.get("name"), Some(json!("Garfield")));

    assert!(tracked.set("name", json!("HelloKitty")).unwrap());
    assert_eq!(raw.snapshot()["attributes"]["name"], json!("HelloKitty"));

    let plain = adapter.resource_model(&raw, false).unwrap();
    assert_eq!(plain.get("name"), Some(json!("HelloKitty")));

    assert_eq!(plain.set("name", json!("Sylvester")).unwrap(), SetOutcome::Written);
    assert_eq!(tracked.get("name"), Some(json!("Sylvester")));
    assert_eq!(tracked.changed().get("name"), Some(&json!("Sylvester")));
    assert_eq!(tracked.previous("name"), Some(json!("HelloKitty")));
    assert_eq!(raw.snapshot()["attributes"]["name"], json!("Sylvester"));

    let keys: Vec<_> = updates.borrow().iter().map(|u| u.value.clone()).collect();
    assert_eq!(keys, vec![json!("HelloKitty"), json!("Sylvester")]);
}

#[test]
fn plain_write_fires_tracked_listener_once() {
    let adapter = ReactivityAdapter::new();
    let raw = garfield();
    let tracked = adapter.tracked_model(&raw, false).unwrap();
    let plain = adapter.resource_model(&raw, false).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _sub = tracked.on("change:name", move |event| {
        sink.borrow_mut().push(event.value.cloned());
    });

    plain.set("name", json!("Tom")).unwrap();
    assert_eq!(*seen.borrow(), vec![Some(json!("Tom"))]);
}

#[test]
fn raw_interceptor_writes_reach_both_views() {
    let (adapter, updates) = counting_adapter();
    let raw = RawResource::new(json!({
        "type": "cat",
        "attributes": { "name": "Garfield", "owner": { "name": "Jon" } }
    }));
    let tracked = adapter.tracked_model(&raw, false).unwrap();
    let plain = adapter.resource_model(&raw, false).unwrap();

    let attributes = adapter.interceptor(&raw).attributes();
    attributes.set("name", json!("Nermal")).unwrap();
    assert_eq!(tracked.changed().get("name"), Some(&json!("Nermal")));
    assert_eq!(plain.get("name"), Some(json!("Nermal")));

    attributes.child("owner").unwrap().set("name", json!("Liz")).unwrap();
    assert!(!tracked.has_changed(Some("owner")));
    assert_eq!(tracked.get("owner"), Some(json!({ "name": "Liz" })));
    assert_eq!(plain.get("owner"), Some(json!({ "name": "Liz" })));

    assert!(updates.borrow().is_empty());
}

#[test]
fn nested_writes_through_a_view_reach_the_document() {
    let adapter = ReactivityAdapter::new();
    let raw = RawResource::new(json!({ "attributes": { "toys": ["ball"] } }));
    let plain = adapter.resource_model(&raw, false).unwrap();
    let toys = plain.field("toys").unwrap();
    toys.as_node().unwrap().push(json!("yarn")).unwrap();

    let tracked = adapter.tracked_model(&raw, false).unwrap();
    assert_eq!(tracked.get("toys"), Some(json!(["ball", "yarn"])));
}

// ═════════════════════════════════════════════════════════════════════════
// Update handler accounting
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn equal_writes_stay_silent() {
    let (adapter, updates) = counting_adapter();
    let raw = garfield();
    let tracked = adapter.tracked_model(&raw, false).unwrap();
    let plain = adapter.resource_model(&raw, false).unwrap();

    assert!(!tracked.set("name", json!("Garfield")).unwrap());
    assert_eq!(plain.set("name", json!("Garfield")).unwrap(), SetOutcome::Unchanged);
    assert!(updates.borrow().is_empty());
}

#[test]
fn accepted_writes_report_once_each() {
    let (adapter, updates) = counting_adapter();
    let raw = RawResource::new(json!({ "id": 9, "type": "cat", "attributes": { "name": "Garfield" } }));
    let tracked = adapter.tracked_model(&raw, false).unwrap();
    let plain = adapter.resource_model(&raw, false).unwrap();

    plain.set("name", json!("Tom")).unwrap();
    tracked.set("name", json!("Felix")).unwrap();
    plain.set("mood", json!("hungry")).unwrap();

    let updates = updates.borrow();
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().all(|u| u.id.as_deref() == Some("9") && u.key == "name"));
    assert!(!tracked.needs_sync("name", &json!("Felix")));
}

// ═════════════════════════════════════════════════════════════════════════
// Forced full update
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn force_full_update_keeps_identity() {
    let (adapter, updates) = counting_adapter();
    let raw = RawResource::new(json!({ "type": "cat", "attributes": { "name": "Garfield" } }));
    let original = adapter.tracked_model(&raw, false).unwrap();
    let plain = adapter.resource_model(&raw, false).unwrap();

    raw.assign(json!({
        "attributes": { "name": "KittyCat", "someObject": { "likes": ["lasagna"], "naps": 3 } }
    }));
    let updated = adapter.tracked_model(&raw, true).unwrap();

    assert!(updated.ptr_eq(&original));
    assert_eq!(updated.get("name"), Some(json!("KittyCat")));
    assert_eq!(updated.get("someObject"), Some(json!({ "likes": ["lasagna"], "naps": 3 })));
    assert!(updated.is_bound("someObject"));
    assert!(updated.has_changed(Some("someObject")));
    assert_eq!(updated.changed().get("name"), Some(&json!("KittyCat")));
    assert_eq!(updated.previous("name"), Some(json!("Garfield")));

    assert!(adapter.resource_model(&raw, false).unwrap().ptr_eq(&plain));
    assert_eq!(plain.get("someObject"), Some(json!({ "likes": ["lasagna"], "naps": 3 })));
    assert!(updates.borrow().is_empty());
}

#[test]
fn bulk_replace_is_reported_by_forced_update() {
    let (adapter, updates) = counting_adapter();
    let raw = garfield();
    let tracked = adapter.tracked_model(&raw, false).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _sub = tracked.on("change:name", move |event| {
        sink.borrow_mut().push(event.value.cloned());
    });

    raw.assign(json!({ "attributes": { "name": "KittyCat" } }));
    assert_eq!(tracked.get("name"), Some(json!("KittyCat")));
    assert!(seen.borrow().is_empty());

    adapter.tracked_model(&raw, true).unwrap();
    let changed = tracked.changed();
    assert_eq!(changed.get("name"), Some(&json!("KittyCat")));
    assert_eq!(changed.len(), 1);
    assert_eq!(tracked.previous("name"), Some(json!("Garfield")));
    assert_eq!(*seen.borrow(), vec![Some(json!("KittyCat"))]);
    assert!(updates.borrow().is_empty());

    adapter.tracked_model(&raw, true).unwrap();
    assert!(!tracked.has_changed(None));
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn force_full_update_builds_a_missing_view() {
    let adapter = ReactivityAdapter::new();
    let raw = garfield();
    let tracked = adapter.tracked_model(&raw, false).unwrap();
    let plain = adapter.resource_model(&raw, true).unwrap();
    assert_eq!(plain.get("name"), Some(json!("Garfield")));
    assert!(adapter.tracked_model(&raw, false).unwrap().ptr_eq(&tracked));
}

// ═════════════════════════════════════════════════════════════════════════
// Lifetime
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn dropped_resources_are_collected() {
    let adapter = ReactivityAdapter::new();
    let kept = garfield();
    let kept_view = adapter.tracked_model(&kept, false).unwrap();

    let dropped = garfield();
    let orphan = adapter.resource_model(&dropped, false).unwrap();
    drop(dropped);

    assert_eq!(orphan.get("name"), None);
    assert_eq!(adapter.collect_garbage(), 1);
    assert_eq!(adapter.collect_garbage(), 0);
    assert!(adapter.tracked_model(&kept, false).unwrap().ptr_eq(&kept_view));
}

// ═════════════════════════════════════════════════════════════════════════
// Configuration
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn relationships_resolve_through_the_registered_handler() {
    let adapter = ReactivityAdapter::new();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    adapter.register_relationship_handler(RelationshipHandler::new(move |reference: &RelationshipRef, _| {
        counter.set(counter.get() + 1);
        let data = reference.data.clone();
        Resolution::pending(async move { json!({ "loaded": data }) })
    }));

    let raw = RawResource::new(json!({
        "type": "car",
        "attributes": {},
        "relationships": { "mainDriver": { "data": { "id": "2", "type": "driver" } } }
    }));
    let car = adapter.resource_model(&raw, false).unwrap();
    assert_eq!(calls.get(), 0);

    let resolution = car.relationship("MainDriver").unwrap().resolve();
    assert!(!resolution.is_ready());
    let value = pollster::block_on(resolution.value());
    assert_eq!(value, json!({ "loaded": { "id": "2", "type": "driver" } }));
    assert_eq!(calls.get(), 1);
}

#[test]
fn classes_and_definitions_apply_per_type() {
    let adapter = ReactivityAdapter::new();
    adapter.register_model_class(ModelClass::new("Cat").default_field("lives", json!(9)));
    adapter.register_definition(
        "cat",
        ModelDefinition::new().computed("shout", |model| {
            json!(model.get("name").and_then(|v| v.as_str().map(str::to_uppercase)))
        }),
    );

    let raw = RawResource::new(json!({ "type": "cat", "attributes": { "name": "tom" } }));
    let plain = adapter.resource_model(&raw, false).unwrap();
    let tracked = adapter.tracked_model(&raw, false).unwrap();
    assert_eq!(plain.get("lives"), Some(json!(9)));
    assert_eq!(plain.model_class().as_deref(), Some("Cat"));
    assert_eq!(tracked.get("shout"), Some(json!("TOM")));

    plain.set("name", json!("jerry")).unwrap();
    assert_eq!(tracked.get("shout"), Some(json!("JERRY")));
}
