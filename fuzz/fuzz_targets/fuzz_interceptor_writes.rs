#![no_main]

use arbitrary::Arbitrary;
use jsync::prelude::*;
use jsync::FieldKind;
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};

const KEYS: [&str; 4] = ["name", "age", "tags", "owner"];

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i32),
    Text(u8),
    List(Vec<u8>),
    Object(u8, i16),
}

impl FuzzValue {
    fn to_json(&self) -> Value {
        match self {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => json!(b),
            FuzzValue::Int(n) => json!(n),
            FuzzValue::Text(c) => json!(format!("t{}", c % 8)),
            FuzzValue::List(items) => json!(items.iter().take(8).collect::<Vec<_>>()),
            FuzzValue::Object(k, v) => json!({ KEYS[*k as usize % KEYS.len()]: v }),
        }
    }
}

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Tracked { key: u8, value: FuzzValue },
    Plain { key: u8, value: FuzzValue },
    Raw { key: u8, value: FuzzValue },
    Nested { key: u8, index: u8, value: FuzzValue },
    Push { key: u8, value: FuzzValue },
    Remove { key: u8 },
    Assign { key: u8, value: FuzzValue },
    Force,
}

fn key(k: &u8) -> &'static str {
    KEYS[*k as usize % KEYS.len()]
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    let adapter = ReactivityAdapter::new();
    let raw = RawResource::new(json!({
        "id": "1",
        "type": "thing",
        "attributes": { "name": "a", "age": 1, "tags": [], "owner": {} }
    }));
    let (Ok(tracked), Ok(plain)) = (adapter.tracked_model(&raw, false), adapter.resource_model(&raw, false)) else {
        return;
    };
    let attributes = adapter.interceptor(&raw).attributes();

    for op in ops.iter().take(256) {
        let _ = match op {
            FuzzOp::Tracked { key: k, value } => tracked.set(key(k), value.to_json()).map(drop),
            FuzzOp::Plain { key: k, value } => plain.set(key(k), value.to_json()).map(drop),
            FuzzOp::Raw { key: k, value } => attributes.set(key(k), value.to_json()),
            FuzzOp::Nested { key: k, index, value } => match attributes.child(key(k)) {
                Some(node) => node.set(*index as usize % 4, value.to_json()),
                None => Ok(()),
            },
            FuzzOp::Push { key: k, value } => match attributes.child(key(k)) {
                Some(node) => node.push(value.to_json()),
                None => Ok(()),
            },
            FuzzOp::Remove { key: k } => attributes.remove(key(k)).map(drop),
            FuzzOp::Assign { key: k, value } => {
                let mut next = raw.snapshot()["attributes"].clone();
                if let Some(map) = next.as_object_mut() {
                    map.insert(key(k).to_owned(), value.to_json());
                }
                raw.assign(json!({ "attributes": next }));
                Ok(())
            }
            FuzzOp::Force => adapter.tracked_model(&raw, true).map(drop),
        };

        let doc = raw.snapshot();
        for k in KEYS {
            if tracked.is_bound(k) {
                assert_eq!(tracked.get(k).as_ref(), doc["attributes"].get(k));
            }
            if plain.field_kind(k) == Some(FieldKind::Attribute) {
                assert_eq!(plain.get(k).as_ref(), doc["attributes"].get(k));
            }
        }
    }
});
