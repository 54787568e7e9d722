#![allow(missing_docs)]

//! Leaf, array, and boundary round trips.

use std::rc::Rc;

use jsonweave::{Array, Jsonweave, Obj, RecordDef, Registry, TypeSpec, Value};

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
            RecordDef::new("Blob").field("data", TypeSpec::array(TypeSpec::Byte)),
        )
        .expect("register Blob");
    registry
        .register(
            RecordDef::new("Meta")
                .field("when", TypeSpec::Date)
                .field("kind", TypeSpec::Class),
        )
        .expect("register Meta");
    registry
        .register(RecordDef::new("Empty"))
        .expect("register Empty");
    registry
}

fn round_trip(registry: &Registry, value: &Value) -> jsonweave::Result<Value> {
    let json = Jsonweave::encode(registry, value)?;
    Jsonweave::decode(registry, &json)
}

// --- LEAVES ---

/// Extreme values of every integer width survive encode/decode.
#[test]
fn integer_extremes() -> jsonweave::Result<()> {
    let registry = registry();
    for n in [i64::MIN, i64::MAX, 0, -1, 42] {
        assert_eq!(round_trip(&registry, &Value::Long(n))?, Value::Long(n));
    }
    for n in [i8::MIN, i8::MAX, 0, -1] {
        assert_eq!(round_trip(&registry, &Value::Byte(n))?, Value::Byte(n));
    }
    for n in [i16::MIN, i16::MAX] {
        assert_eq!(round_trip(&registry, &Value::Short(n))?, Value::Short(n));
    }
    for n in [i32::MIN, i32::MAX] {
        assert_eq!(round_trip(&registry, &Value::Int(n))?, Value::Int(n));
    }
    Ok(())
}

/// A non-inferable leaf at top level travels in the boxed form.
#[test]
fn boxed_leaf_shape() -> jsonweave::Result<()> {
    let registry = registry();
    let json = Jsonweave::encode(&registry, &Value::Int(7))?;
    assert_eq!(json, r#"{"@type":"int","value":7}"#);
    assert_eq!(Jsonweave::decode(&registry, &json)?, Value::Int(7));
    Ok(())
}

#[test]
fn doubles_keep_their_classification() -> jsonweave::Result<()> {
    let registry = registry();
    // 2.0 must come back a double, not an integer.
    for d in [2.0, -0.5, 3.14, 1e300, 5e-324, f64::MIN, f64::MAX, 0.0] {
        assert_eq!(round_trip(&registry, &Value::Double(d))?, Value::Double(d));
    }
    for f in [2.0f32, 3.14f32, f32::MAX, f32::MIN_POSITIVE] {
        assert_eq!(round_trip(&registry, &Value::Float(f))?, Value::Float(f));
    }
    Ok(())
}

#[test]
fn booleans_null_and_strings() -> jsonweave::Result<()> {
    let registry = registry();
    assert_eq!(round_trip(&registry, &Value::Bool(true))?, Value::Bool(true));
    assert_eq!(
        round_trip(&registry, &Value::Bool(false))?,
        Value::Bool(false)
    );
    assert_eq!(round_trip(&registry, &Value::Null)?, Value::Null);
    assert_eq!(
        round_trip(&registry, &Value::from("hello"))?,
        Value::from("hello")
    );
    // The empty string is not the same thing as null.
    assert_eq!(round_trip(&registry, &Value::from(""))?, Value::from(""));
    Ok(())
}

#[test]
fn chars_and_dates_and_classes() -> jsonweave::Result<()> {
    let registry = registry();
    for c in ['a', '"', '\\', '\n', 'é', '\u{1F600}'] {
        assert_eq!(round_trip(&registry, &Value::Char(c))?, Value::Char(c));
    }
    let when = Value::Date(jsonweave::Date::from_millis(1_234_567_890_123));
    assert_eq!(round_trip(&registry, &when)?, when);

    let kind = Value::Class(Rc::from("Node"));
    assert_eq!(round_trip(&registry, &kind)?, kind);
    Ok(())
}

/// Dates and classes in declared slots travel bare.
#[test]
fn inferable_leaves_stay_bare() -> jsonweave::Result<()> {
    let registry = registry();
    let meta = registry.new_record("Meta")?;
    meta.borrow_mut()
        .set("when", Value::Date(jsonweave::Date::from_millis(99)));
    meta.borrow_mut().set("kind", Value::Class(Rc::from("Node")));

    let json = Jsonweave::encode(&registry, &Value::Obj(meta))?;
    assert_eq!(json, r#"{"@type":"Meta","when":99,"kind":"Node"}"#);

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("record").borrow().get("when");
    assert_eq!(obj, Some(Value::Date(jsonweave::Date::from_millis(99))));
    Ok(())
}

// --- ARRAYS ---

/// A byte array in a declared slot is a bare JSON array, element for
/// element.
#[test]
fn byte_array_literal_form() -> jsonweave::Result<()> {
    let registry = registry();
    let blob = registry.new_record("Blob")?;
    blob.borrow_mut().set(
        "data",
        Value::obj(Obj::Array(Array::Bytes(vec![127, -1, 0, -128, 16]))),
    );

    let json = Jsonweave::encode(&registry, &Value::Obj(blob))?;
    assert_eq!(json, r#"{"@type":"Blob","data":[127,-1,0,-128,16]}"#);

    let back = Jsonweave::decode(&registry, &json)?;
    let data = back
        .as_obj()
        .expect("record")
        .borrow()
        .get("data")
        .expect("data field");
    let obj = data.as_obj().expect("array").borrow();
    match obj.as_array() {
        Some(Array::Bytes(v)) => assert_eq!(v, &vec![127, -1, 0, -128, 16]),
        other => panic!("expected a byte array, got {other:?}"),
    }
    Ok(())
}

/// 128 KiB of pseudo-random bytes, every byte equal after the trip.
#[test]
fn byte_array_bulk_fidelity() -> jsonweave::Result<()> {
    let registry = registry();
    let mut state: u32 = 0x1234_5678;
    let bytes: Vec<i8> = (0..128 * 1024)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8 as i8
        })
        .collect();

    let blob = registry.new_record("Blob")?;
    blob.borrow_mut()
        .set("data", Value::obj(Obj::Array(Array::Bytes(bytes.clone()))));

    let back = round_trip(&registry, &Value::Obj(blob))?;
    let data = back
        .as_obj()
        .expect("record")
        .borrow()
        .get("data")
        .expect("data field");
    let obj = data.as_obj().expect("array").borrow();
    match obj.as_array() {
        Some(Array::Bytes(v)) => assert_eq!(v, &bytes),
        other => panic!("expected a byte array, got {other:?}"),
    }
    Ok(())
}

/// Char arrays travel as one embedded string.
#[test]
fn char_array_as_string() -> jsonweave::Result<()> {
    let registry = registry();
    let chars = vec!['a', '"', '\\', '\n', 'é', '→'];
    let value = Value::obj(Obj::Array(Array::Chars(chars.clone())));

    let json = Jsonweave::encode(&registry, &value)?;
    assert_eq!(json, "{\"@type\":\"char[]\",\"@items\":[\"a\\\"\\\\\\né→\"]}");

    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("array").borrow();
    match obj.as_array() {
        Some(Array::Chars(v)) => assert_eq!(v, &chars),
        other => panic!("expected a char array, got {other:?}"),
    }
    Ok(())
}

#[test]
fn typed_arrays_round_trip() -> jsonweave::Result<()> {
    let registry = registry();
    let cases = [
        Array::Shorts(vec![i16::MIN, -1, 0, i16::MAX]),
        Array::Ints(vec![i32::MIN, 0, i32::MAX]),
        Array::Longs(vec![i64::MIN, 0, i64::MAX]),
        Array::Doubles(vec![0.5, -2.0, 1e100]),
        Array::Floats(vec![1.5, -0.25]),
        Array::Bools(vec![true, false, true]),
    ];
    for array in cases {
        let json = Jsonweave::encode(&registry, &Value::obj(Obj::Array(array)))?;
        let back = Jsonweave::decode(&registry, &json)?;
        let again = Jsonweave::encode(&registry, &back)?;
        assert_eq!(json, again, "stable re-encoding for {json}");
    }
    Ok(())
}

/// A heterogeneous untyped array decodes each element to its natural
/// JSON-carried type.
#[test]
fn heterogeneous_untyped_array() -> jsonweave::Result<()> {
    let registry = registry();
    let json = r#"["string",17,null,true,false,[],3.14,-9223372036854775808,9223372036854775807]"#;
    let back = Jsonweave::decode(&registry, json)?;

    let obj = back.as_obj().expect("array").borrow();
    let Some(Array::Of(TypeSpec::Any, elems)) = obj.as_array() else {
        panic!("expected an untyped array");
    };
    assert_eq!(elems[0], Value::from("string"));
    assert_eq!(elems[1], Value::Long(17));
    assert_eq!(elems[2], Value::Null);
    assert_eq!(elems[3], Value::Bool(true));
    assert_eq!(elems[4], Value::Bool(false));
    let nested = elems[5].as_obj().expect("nested array").borrow();
    assert_eq!(nested.as_array().map(Array::len), Some(0));
    assert_eq!(elems[6], Value::Double(3.14));
    assert_eq!(elems[7], Value::Long(i64::MIN));
    assert_eq!(elems[8], Value::Long(i64::MAX));
    Ok(())
}

// --- BOUNDARIES ---

#[test]
fn empties_round_trip() -> jsonweave::Result<()> {
    let registry = registry();

    // Untyped empty array stays a bare [].
    let json = Jsonweave::encode(
        &registry,
        &Value::obj(Obj::Array(Array::Of(TypeSpec::Any, Vec::new()))),
    )?;
    assert_eq!(json, "[]");

    // Typed empty array keeps its type.
    let json = Jsonweave::encode(&registry, &Value::obj(Obj::Array(Array::Ints(Vec::new()))))?;
    assert_eq!(json, r#"{"@type":"int[]","@items":[]}"#);
    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("array").borrow();
    assert_eq!(obj.as_array().map(Array::len), Some(0));

    // Empty record.
    let empty = registry.new_record("Empty")?;
    let json = Jsonweave::encode(&registry, &Value::Obj(empty))?;
    assert_eq!(json, r#"{"@type":"Empty"}"#);
    let back = Jsonweave::decode(&registry, &json)?;
    let obj = back.as_obj().expect("record").borrow();
    assert_eq!(
        obj.as_record().map(|r| r.type_name().to_string()),
        Some("Empty".to_string())
    );
    Ok(())
}

/// Every code point 0..1000 survives escaping and UTF-8.
#[test]
fn low_code_points_round_trip() -> jsonweave::Result<()> {
    let registry = registry();
    let s: String = (0u32..1000).filter_map(char::from_u32).collect();
    let back = round_trip(&registry, &Value::str(&s))?;
    assert_eq!(back.as_str(), Some(s.as_str()));
    Ok(())
}

/// Null at the top level is `{}` on the wire.
#[test]
fn top_level_null_shape() -> jsonweave::Result<()> {
    let registry = registry();
    let json = Jsonweave::encode(&registry, &Value::Null)?;
    assert_eq!(json, "{}");
    assert_eq!(Jsonweave::decode(&registry, "{}")?, Value::Null);
    Ok(())
}
