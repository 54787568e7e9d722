#![allow(missing_docs)]

//! Identity, cycles, and reference patching.

use std::rc::Rc;

use jsonweave::{Array, Jsonweave, RecordDef, Registry, TypeSpec, Value};

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register(
            RecordDef::new("Node")
                .field("name", TypeSpec::Str)
                .field("next", TypeSpec::record("Node")),
        )
        .expect("register Node");
    registry
        .register(
            RecordDef::new("Pair")
                .field("a", TypeSpec::Str)
                .field("b", TypeSpec::Str),
        )
        .expect("register Pair");
    registry
        .register(
            RecordDef::new("Fork")
                .field("left", TypeSpec::record("Node"))
                .field("right", TypeSpec::record("Node")),
        )
        .expect("register Fork");
    registry
}

fn node(registry: &Registry, name: &str) -> jsonweave::ObjRef {
    let n = registry.new_record("Node").expect("new Node");
    n.borrow_mut().set("name", Value::from(name));
    n
}

fn next_of(v: &Value) -> Value {
    v.as_obj()
        .expect("a record")
        .borrow()
        .get("next")
        .expect("next field")
}

// --- CYCLES ---

/// A three-node ring: only the re-entered node carries @id, the back
/// edge is a @ref, and the ring closes after decoding.
#[test]
fn three_cycle() -> jsonweave::Result<()> {
    let registry = registry();
    let a = node(&registry, "a");
    let b = node(&registry, "b");
    let c = node(&registry, "c");
    a.borrow_mut().set("next", Value::Obj(Rc::clone(&b)));
    b.borrow_mut().set("next", Value::Obj(Rc::clone(&c)));
    c.borrow_mut().set("next", Value::Obj(Rc::clone(&a)));

    let json = Jsonweave::encode(&registry, &Value::Obj(a))?;
    assert_eq!(json.matches("@id").count(), 1, "only the shared node: {json}");
    assert!(json.contains("\"@id\":1"));
    assert!(json.contains("{\"@ref\":1}"));

    let back = Jsonweave::decode(&registry, &json)?;
    let around = next_of(&next_of(&next_of(&back)));
    let (Value::Obj(start), Value::Obj(again)) = (&back, &around) else {
        panic!("expected records");
    };
    assert!(Rc::ptr_eq(start, again), "the ring must close on itself");
    Ok(())
}

/// A node pointing at itself.
#[test]
fn self_cycle() -> jsonweave::Result<()> {
    let registry = registry();
    let a = node(&registry, "loop");
    a.borrow_mut().set("next", Value::Obj(Rc::clone(&a)));

    let json = Jsonweave::encode(&registry, &Value::Obj(a))?;
    assert!(json.contains("{\"@ref\":1}"));

    let back = Jsonweave::decode(&registry, &json)?;
    let (Value::Obj(start), step) = (&back, next_of(&back)) else {
        panic!("expected a record");
    };
    let Value::Obj(next) = &step else {
        panic!("expected a record");
    };
    assert!(Rc::ptr_eq(start, next));
    Ok(())
}

// --- SHARED LEAVES ---

/// Two fields aliasing one string: @id on the first definition, @ref on
/// the second, and one shared allocation after decoding.
#[test]
fn shared_aliased_string() -> jsonweave::Result<()> {
    let registry = registry();
    let hi: Rc<str> = Rc::from("hi");
    let pair = registry.new_record("Pair")?;
    pair.borrow_mut().set("a", Value::Str(Rc::clone(&hi)));
    pair.borrow_mut().set("b", Value::Str(Rc::clone(&hi)));

    let json = Jsonweave::encode(&registry, &Value::Obj(pair))?;
    assert_eq!(json.matches("@id").count(), 1, "{json}");
    assert_eq!(json.matches("@ref").count(), 1, "{json}");

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("record").borrow();
    let (Some(Value::Str(a)), Some(Value::Str(b))) = (obj.get("a"), obj.get("b")) else {
        panic!("expected two strings");
    };
    assert_eq!(&*a, "hi");
    assert!(Rc::ptr_eq(&a, &b), "aliasing must survive the round trip");
    Ok(())
}

/// Two equal but distinct strings stay distinct: no @id, no sharing.
#[test]
fn distinct_equal_strings_stay_distinct() -> jsonweave::Result<()> {
    let registry = registry();
    let pair = registry.new_record("Pair")?;
    pair.borrow_mut().set("a", Value::from("hi"));
    pair.borrow_mut().set("b", Value::from("hi"));

    let json = Jsonweave::encode(&registry, &Value::Obj(pair))?;
    assert_eq!(json, r#"{"@type":"Pair","a":"hi","b":"hi"}"#);
    Ok(())
}

// --- SHARED SUBGRAPHS ---

/// Diamond: one node reachable through two paths gets exactly one @id.
#[test]
fn diamond_sharing() -> jsonweave::Result<()> {
    let registry = registry();
    let shared = node(&registry, "shared");
    let fork = registry.new_record("Fork")?;
    fork.borrow_mut().set("left", Value::Obj(Rc::clone(&shared)));
    fork.borrow_mut().set("right", Value::Obj(Rc::clone(&shared)));

    let json = Jsonweave::encode(&registry, &Value::Obj(fork))?;
    assert_eq!(json.matches("@id").count(), 1, "{json}");

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("record").borrow();
    let (Some(Value::Obj(left)), Some(Value::Obj(right))) =
        (obj.get("left"), obj.get("right"))
    else {
        panic!("expected two records");
    };
    assert!(Rc::ptr_eq(&left, &right));
    Ok(())
}

/// Two distinct-but-equal nodes remain two nodes.
#[test]
fn distinct_equal_nodes_stay_distinct() -> jsonweave::Result<()> {
    let registry = registry();
    let fork = registry.new_record("Fork")?;
    fork.borrow_mut()
        .set("left", Value::Obj(node(&registry, "twin")));
    fork.borrow_mut()
        .set("right", Value::Obj(node(&registry, "twin")));

    let json = Jsonweave::encode(&registry, &Value::Obj(fork))?;
    assert!(!json.contains("@id"), "{json}");

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("record").borrow();
    let (Some(Value::Obj(left)), Some(Value::Obj(right))) =
        (obj.get("left"), obj.get("right"))
    else {
        panic!("expected two records");
    };
    assert!(!Rc::ptr_eq(&left, &right));
    Ok(())
}

// --- FORWARD REFERENCES ---

/// An array element may reference an @id defined later in the stream;
/// the patch pass connects it.
#[test]
fn forward_reference_in_array() -> jsonweave::Result<()> {
    let registry = registry();
    let json = r#"{"@items":[{"@ref":5},{"@id":5,"@type":"Node","name":"later","next":null}]}"#;

    let back = Jsonweave::decode(&registry, json)?;
    let obj = back.as_obj().expect("array").borrow();
    let Some(Array::Of(_, elems)) = obj.as_array() else {
        panic!("expected an object array");
    };
    let (Value::Obj(first), Value::Obj(second)) = (&elems[0], &elems[1]) else {
        panic!("expected records, got {elems:?}");
    };
    assert!(Rc::ptr_eq(first, second));
    assert_eq!(first.borrow().get("name"), Some(Value::from("later")));
    Ok(())
}

/// A field may forward-reference too.
#[test]
fn forward_reference_in_field() -> jsonweave::Result<()> {
    let registry = registry();
    let json = r#"{"@items":[{"@type":"Node","name":"early","next":{"@ref":9}},{"@id":9,"@type":"Node","name":"target","next":null}]}"#;

    let back = Jsonweave::decode(&registry, json)?;
    let obj = back.as_obj().expect("array").borrow();
    let Some(Array::Of(_, elems)) = obj.as_array() else {
        panic!("expected an object array");
    };
    let next = next_of(&elems[0]);
    let (Value::Obj(linked), Value::Obj(target)) = (&next, &elems[1]) else {
        panic!("expected records");
    };
    assert!(Rc::ptr_eq(linked, target));
    Ok(())
}

/// A @ref that matches no @id is fatal after the patch pass.
#[test]
fn dangling_reference_is_fatal() {
    let registry = registry();
    let json = r#"{"@items":[{"@ref":99}]}"#;
    match Jsonweave::decode(&registry, json) {
        Err(jsonweave::JsonError::Reference(msg)) => {
            assert!(msg.contains("1 unresolved"), "{msg}");
            assert!(msg.contains("99"), "{msg}");
        }
        other => panic!("expected a reference error, got {other:?}"),
    }
}

/// Encoding is repeatable: same graph, same bytes, same ids.
#[test]
fn deterministic_output() -> jsonweave::Result<()> {
    let registry = registry();
    let a = node(&registry, "a");
    let b = node(&registry, "b");
    a.borrow_mut().set("next", Value::Obj(Rc::clone(&b)));
    b.borrow_mut().set("next", Value::Obj(Rc::clone(&a)));

    let root = Value::Obj(a);
    let one = Jsonweave::encode(&registry, &root)?;
    let two = Jsonweave::encode(&registry, &root)?;
    assert_eq!(one, two);
    Ok(())
}
