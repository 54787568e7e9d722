#![allow(missing_docs)]

//! Sequences, mappings, and sets: both wire forms, plus the
//! zip-after-patch rehash.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use jsonweave::{Jsonweave, Obj, RecordDef, Registry, TypeSpec, Value};

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(
            RecordDef::new("Key")
                .field("name", TypeSpec::Str)
                .field("rank", TypeSpec::Int),
        )
        .expect("register Key");
    registry
        .register(
            RecordDef::new("Node")
                .field("name", TypeSpec::Str)
                .field("next", TypeSpec::record("Node")),
        )
        .expect("register Node");
    registry
}

fn key(registry: &Registry, name: &str, rank: i32) -> Value {
    let k = registry.new_record("Key").expect("new Key");
    k.borrow_mut().set("name", Value::from(name));
    k.borrow_mut().set("rank", Value::Int(rank));
    Value::Obj(k)
}

// --- LISTS ---

#[test]
fn list_round_trip() -> jsonweave::Result<()> {
    let registry = registry();
    let list = Value::obj(Obj::List(vec![
        Value::Long(1),
        Value::from("two"),
        Value::Bool(true),
        Value::Null,
    ]));

    let json = Jsonweave::encode(&registry, &list)?;
    assert_eq!(json, r#"{"@type":"list","@items":[1,"two",true,null]}"#);

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("list").borrow();
    let elems = obj.as_list().expect("list");
    assert_eq!(elems.len(), 4);
    assert_eq!(elems[0], Value::Long(1));
    assert_eq!(elems[1], Value::from("two"));
    assert_eq!(elems[2], Value::Bool(true));
    assert_eq!(elems[3], Value::Null);
    Ok(())
}

#[test]
fn nested_lists() -> jsonweave::Result<()> {
    let registry = registry();
    let inner = Value::obj(Obj::List(vec![Value::Long(9)]));
    let outer = Value::obj(Obj::List(vec![inner, Value::Long(1)]));

    let json = Jsonweave::encode(&registry, &outer)?;
    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("list").borrow();
    let elems = obj.as_list().expect("list");
    let inner_obj = elems[0].as_obj().expect("inner list").borrow();
    assert_eq!(inner_obj.as_list().map(Vec::len), Some(1));
    Ok(())
}

// --- STRING-KEYED MAPPINGS ---

/// The writer inlines string-keyed mappings as plain JSON objects.
#[test]
fn string_keyed_map_inlines() -> jsonweave::Result<()> {
    let registry = registry();
    let mut entries = IndexMap::new();
    entries.insert(Value::from("alpha"), Value::Long(1));
    entries.insert(Value::from("beta"), Value::from("x"));
    let map = Value::obj(Obj::Map(entries));

    let json = Jsonweave::encode(&registry, &map)?;
    assert_eq!(json, r#"{"@type":"map","alpha":1,"beta":"x"}"#);
    assert!(!json.contains("@keys"));

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("map").borrow();
    let m = obj.as_map().expect("map");
    assert_eq!(m.get(&Value::from("alpha")), Some(&Value::Long(1)));
    assert_eq!(m.get(&Value::from("beta")), Some(&Value::from("x")));
    Ok(())
}

/// A plain JSON object with no meta-keys decodes as a string-keyed map.
#[test]
fn plain_object_reads_as_map() -> jsonweave::Result<()> {
    let registry = registry();
    let back = Jsonweave::decode(&registry, r#"{"name":"JS","count":2}"#)?;
    let obj = back.as_obj().expect("map").borrow();
    let m = obj.as_map().expect("map");
    assert_eq!(m.get(&Value::from("name")), Some(&Value::from("JS")));
    assert_eq!(m.get(&Value::from("count")), Some(&Value::Long(2)));
    Ok(())
}

/// Keys that look like meta-keys force the @keys/@items form.
#[test]
fn meta_lookalike_keys_use_keys_form() -> jsonweave::Result<()> {
    let registry = registry();
    let mut entries = IndexMap::new();
    entries.insert(Value::from("@type"), Value::Long(1));
    let map = Value::obj(Obj::Map(entries));

    let json = Jsonweave::encode(&registry, &map)?;
    assert!(json.contains("@keys"), "{json}");

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("map").borrow();
    let m = obj.as_map().expect("map");
    assert_eq!(m.get(&Value::from("@type")), Some(&Value::Long(1)));
    Ok(())
}

// --- NON-STRING-KEYED MAPPINGS ---

/// Record-keyed mapping: @keys/@items on the wire, and every decoded
/// key found by lookup afterwards (the containers are filled only after
/// reference patching).
#[test]
fn record_keyed_map_rehash() -> jsonweave::Result<()> {
    let registry = registry();
    let mut entries = IndexMap::new();
    entries.insert(key(&registry, "first", 1), Value::Long(100));
    entries.insert(key(&registry, "second", 2), Value::Long(200));
    let map = Value::obj(Obj::Map(entries));

    let json = Jsonweave::encode(&registry, &map)?;
    assert!(json.contains("@keys"), "{json}");
    assert!(json.contains("@items"), "{json}");

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("map").borrow();
    let m = obj.as_map().expect("map");
    assert_eq!(m.len(), 2);

    // Every key must find its value through hash lookup.
    let pairs: Vec<(Value, Value)> = m.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    for (k, v) in pairs {
        assert_eq!(m.get(&k), Some(&v));
        let kr = k.as_obj().expect("record key").borrow();
        let rank = kr.get("rank").expect("rank");
        let expected = match kr.get("name").and_then(|n| n.as_str().map(str::to_string)) {
            Some(name) if name == "first" => (Value::Int(1), Value::Long(100)),
            Some(name) if name == "second" => (Value::Int(2), Value::Long(200)),
            other => panic!("unexpected key {other:?}"),
        };
        assert_eq!(rank, expected.0);
        assert_eq!(v, expected.1);
    }
    Ok(())
}

/// Integer keys also travel through @keys/@items and look up by value.
#[test]
fn long_keyed_map() -> jsonweave::Result<()> {
    let registry = registry();
    let mut entries = IndexMap::new();
    entries.insert(Value::Long(1), Value::from("one"));
    entries.insert(Value::Long(2), Value::from("two"));
    let map = Value::obj(Obj::Map(entries));

    let json = Jsonweave::encode(&registry, &map)?;
    assert!(json.contains("@keys"), "{json}");

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("map").borrow();
    let m = obj.as_map().expect("map");
    assert_eq!(m.get(&Value::Long(1)), Some(&Value::from("one")));
    assert_eq!(m.get(&Value::Long(2)), Some(&Value::from("two")));
    Ok(())
}

/// The reader accepts the @keys form even when every key is a string.
#[test]
fn keys_form_with_string_keys_accepted() -> jsonweave::Result<()> {
    let registry = registry();
    let json = r#"{"@type":"map","@keys":["a","b"],"@items":[1,2]}"#;
    let back = Jsonweave::decode(&registry, json)?;
    let obj = back.as_obj().expect("map").borrow();
    let m = obj.as_map().expect("map");
    assert_eq!(m.get(&Value::from("a")), Some(&Value::Long(1)));
    assert_eq!(m.get(&Value::from("b")), Some(&Value::Long(2)));
    Ok(())
}

#[test]
fn mismatched_keys_items_is_semantic_error() {
    let registry = registry();
    let json = r#"{"@type":"map","@keys":["a"],"@items":[1,2]}"#;
    match Jsonweave::decode(&registry, json) {
        Err(jsonweave::JsonError::Semantic(msg)) => assert!(msg.contains("@keys"), "{msg}"),
        other => panic!("expected a semantic error, got {other:?}"),
    }
}

/// A forward reference sitting in a map value is patched before the
/// caller sees the map.
#[test]
fn forward_reference_in_map_value() -> jsonweave::Result<()> {
    let registry = registry();
    let json = r#"{"@type":"map","a":{"@ref":7},"b":{"@id":7,"@type":"Node","name":"n","next":null}}"#;

    let back = Jsonweave::decode(&registry, json)?;
    let obj = back.as_obj().expect("map").borrow();
    let m = obj.as_map().expect("map");
    let (Some(Value::Obj(a)), Some(Value::Obj(b))) =
        (m.get(&Value::from("a")), m.get(&Value::from("b")))
    else {
        panic!("expected records in both slots");
    };
    assert!(Rc::ptr_eq(a, b));
    Ok(())
}

// --- SETS ---

#[test]
fn set_round_trip() -> jsonweave::Result<()> {
    let registry = registry();
    let mut elems = IndexSet::new();
    elems.insert(Value::from("x"));
    elems.insert(Value::Long(2));
    let set = Value::obj(Obj::Set(elems));

    let json = Jsonweave::encode(&registry, &set)?;
    assert_eq!(json, r#"{"@type":"set","@items":["x",2]}"#);

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("set").borrow();
    let s = obj.as_set().expect("set");
    assert!(s.contains(&Value::from("x")));
    assert!(s.contains(&Value::Long(2)));
    assert_eq!(s.len(), 2);
    Ok(())
}

/// Record elements in a set are inserted only after patching, so
/// membership holds in their final state.
#[test]
fn record_set_membership() -> jsonweave::Result<()> {
    let registry = registry();
    let mut elems = IndexSet::new();
    elems.insert(key(&registry, "only", 1));
    let set = Value::obj(Obj::Set(elems));

    let json = Jsonweave::encode(&registry, &set)?;
    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("set").borrow();
    let s = obj.as_set().expect("set");
    assert_eq!(s.len(), 1);
    let member = s.iter().next().expect("one member").clone();
    assert!(s.contains(&member));
    Ok(())
}

/// A shared mapping carries @id and collapses to @ref on re-entry.
#[test]
fn shared_map_identity() -> jsonweave::Result<()> {
    let registry = registry();
    let mut entries = IndexMap::new();
    entries.insert(Value::from("n"), Value::Long(1));
    let shared = Value::obj(Obj::Map(entries));
    let outer = Value::obj(Obj::List(vec![shared.clone(), shared.clone()]));

    let json = Jsonweave::encode(&registry, &outer)?;
    assert_eq!(json.matches("@id").count(), 1, "{json}");
    assert_eq!(json.matches("@ref").count(), 1, "{json}");

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("list").borrow();
    let elems = obj.as_list().expect("list");
    let (Value::Obj(first), Value::Obj(second)) = (&elems[0], &elems[1]) else {
        panic!("expected maps");
    };
    assert!(Rc::ptr_eq(first, second));
    Ok(())
}
