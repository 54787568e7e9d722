//! The decoder: instantiate, coerce, patch.
//!
//! The reader runs in two passes. The parser has already materialized
//! the intermediate tree and the `@id` reference table; the build pass
//! walks that tree with an explicit work stack, deciding for each object
//! node which concrete target to create (`@type` wins, then the
//! expected type from the enclosing slot), attaching the target to the
//! node, and filling it element by element or field by field through
//! the primitive coercion matrix. A `@ref` whose definition has already
//! been built resolves on the spot; one that points forward is queued as
//! an unresolved-reference record (holder + field-or-index + id).
//!
//! After the build pass a single patch pass drains the queue. A
//! dangling id (one that matches no `@id` in the input) is logged and
//! skipped, and the survivors are then surfaced as one aggregate
//! reference error. Finally, mappings and sets parsed through
//! `@keys`/`@items` are zipped into their containers; deferring the
//! inserts until after patching is what guarantees every key hashes in
//! its final state.
//!
//! Inputs the reader accepts beyond what the writer produces: bare
//! `[...]` arrays in `Any`-typed slots, plain JSON objects as
//! string-keyed maps (degenerate JS-style usage), and bare scalars at
//! the top level.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use tracing::warn;

use crate::error::{JsonError, Result};
use crate::intern;
use crate::parse::{self, RefTable};
use crate::registry::{Registry, TypeSpec};
use crate::tree::{JsonArrayRef, JsonObj, JsonObjRef, JsonValue};
use crate::value::{Array, Date, Obj, ObjRef, Value};

/// Where an unresolved reference must be written once its target exists.
enum Slot {
    /// A record field or string map key.
    Field(Rc<str>),
    /// An array or list element.
    Index(usize),
}

struct UnresolvedRef {
    holder: ObjRef,
    slot: Slot,
    ref_id: i64,
}

struct PendingMap {
    map: ObjRef,
    keys: JsonObjRef,
    items: JsonObjRef,
}

struct PendingSet {
    set: ObjRef,
    items: JsonObjRef,
}

/// Streaming graph decoder.
///
/// All internal tables live for exactly one [`read`](Self::read) call; a
/// reader instance may be reused but not shared.
pub struct GraphReader<'r> {
    registry: &'r Registry,
    refs: RefTable,
    stack: Vec<JsonObjRef>,
    unresolved: Vec<UnresolvedRef>,
    pending_maps: Vec<PendingMap>,
    pending_sets: Vec<PendingSet>,
}

impl<'r> GraphReader<'r> {
    /// Creates a reader resolving type tags against the given registry.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            refs: RefTable::default(),
            stack: Vec::new(),
            unresolved: Vec::new(),
            pending_maps: Vec::new(),
            pending_sets: Vec::new(),
        }
    }

    /// Decodes one complete document into a graph.
    pub fn read(&mut self, input: &str) -> Result<Value> {
        self.reset();
        let parsed = parse::parse(input)?;
        self.refs = parsed.refs;
        let result = self.build(parsed.root);
        self.reset();
        result
    }

    fn reset(&mut self) {
        self.refs = RefTable::default();
        self.stack.clear();
        self.unresolved.clear();
        self.pending_maps.clear();
        self.pending_sets.clear();
    }

    fn build(&mut self, root: JsonValue) -> Result<Value> {
        let root_value = match root {
            JsonValue::Null => return Ok(Value::Null),
            JsonValue::Bool(b) => return Ok(Value::Bool(b)),
            JsonValue::Long(n) => return Ok(Value::Long(n)),
            JsonValue::Double(d) => return Ok(Value::Double(d)),
            JsonValue::Str(s) => return Ok(Value::Str(s)),

            JsonValue::Array(items) => {
                // An untyped top-level array becomes an anything-goes
                // array, exactly as if it had arrived as {"@items":[..]}.
                let wrapper = wrap_items(items);
                let value = self.instantiate(&TypeSpec::Any, &wrapper)?;
                self.stack.push(wrapper);
                value
            }

            JsonValue::Object(obj) => {
                if obj.borrow().is_empty() {
                    return Ok(Value::Null); // {} is null at top level
                }
                if obj.borrow().ref_id().is_some() {
                    return Err(JsonError::Semantic(
                        "top-level value cannot be a reference".into(),
                    ));
                }
                let value = self.instantiate(&TypeSpec::Any, &obj)?;
                if value.as_obj().is_some() {
                    self.stack.push(obj);
                }
                value
            }
        };

        self.run()?;
        self.patch()?;
        self.rehash()?;
        Ok(root_value)
    }

    // --- BUILD PASS ---

    fn run(&mut self) -> Result<()> {
        enum Kind {
            Record,
            Array,
            List,
            Map,
            Set,
        }

        while let Some(jobj) = self.stack.pop() {
            let target = match jobj.borrow().target() {
                Some(Value::Obj(o)) => Rc::clone(o),
                _ => continue, // leaf targets have nothing to traverse
            };

            let kind = match &*target.borrow() {
                Obj::Record(_) => Kind::Record,
                Obj::Array(_) => Kind::Array,
                Obj::List(_) => Kind::List,
                Obj::Map(_) => Kind::Map,
                Obj::Set(_) => Kind::Set,
            };

            match kind {
                Kind::Record => self.traverse_record(&jobj, &target)?,
                Kind::Array => self.traverse_array(&jobj, &target)?,
                Kind::List => self.traverse_list(&jobj, &target)?,
                Kind::Map => self.traverse_map(&jobj, &target)?,
                // Set elements arrive through a scheduled @items
                // sequence and are inserted after patching.
                Kind::Set => {}
            }
        }
        Ok(())
    }

    fn traverse_record(&mut self, jobj: &JsonObjRef, target: &ObjRef) -> Result<()> {
        let type_name = match target.borrow().as_record() {
            Some(r) => Rc::clone(r.type_name()),
            None => return Ok(()),
        };

        let registry = self.registry;
        if let Some(hook) = registry.read_hook(&type_name) {
            let jo = jobj.borrow();
            let mut guard = target.borrow_mut();
            if let Some(record) = guard.as_record_mut() {
                hook(record, &jo)?;
            }
            return Ok(());
        }

        let descriptor = registry.descriptor(&type_name)?;
        for (key, node) in jobj.borrow().entries() {
            if intern::is_meta_key(key) {
                continue;
            }
            // Fields the type does not declare are silently ignored;
            // that is what keeps old readers compatible with new data.
            let Some(declared) = descriptor.field_type(key) else {
                continue;
            };
            let declared = declared.clone();
            let value = self.assign(node, &declared, target, Slot::Field(Rc::clone(key)))?;
            if let Some(record) = target.borrow_mut().as_record_mut() {
                record.set(Rc::clone(key), value);
            }
        }
        Ok(())
    }

    fn traverse_array(&mut self, jobj: &JsonObjRef, target: &ObjRef) -> Result<()> {
        let Some(items) = jobj.borrow().items() else {
            return Ok(());
        };
        let nodes = items.borrow();

        // Primitive stores get one tight coercion loop each, mirroring
        // the writer's specialized encoders. The Of store goes through
        // the full element dispatch.
        let component = match &*target.borrow() {
            Obj::Array(a) => a.component(),
            _ => return Ok(()),
        };

        match component {
            TypeSpec::Byte
            | TypeSpec::Short
            | TypeSpec::Int
            | TypeSpec::Long
            | TypeSpec::Float
            | TypeSpec::Double
            | TypeSpec::Bool => self.fill_scalars(target, &nodes, &component),
            TypeSpec::Char => Ok(()), // built whole from the embedded string
            _ => {
                for (i, node) in nodes.iter().enumerate() {
                    let value = self.assign(node, &component, target, Slot::Index(i))?;
                    if let Obj::Array(Array::Of(_, elems)) = &mut *target.borrow_mut() {
                        if let Some(slot) = elems.get_mut(i) {
                            *slot = value;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// One coercion loop per primitive store; the coerced value lands
    /// back in the typed vector at the same index.
    fn fill_scalars(&self, target: &ObjRef, nodes: &[JsonValue], spec: &TypeSpec) -> Result<()> {
        for (i, node) in nodes.iter().enumerate() {
            let coerced = self.coerce(node, spec)?;
            store_primitive(target, i, coerced);
        }
        Ok(())
    }

    fn traverse_list(&mut self, jobj: &JsonObjRef, target: &ObjRef) -> Result<()> {
        let Some(items) = jobj.borrow().items() else {
            return Ok(());
        };
        let nodes = items.borrow();
        for (i, node) in nodes.iter().enumerate() {
            let value = self.assign(node, &TypeSpec::Any, target, Slot::Index(i))?;
            if let Obj::List(elems) = &mut *target.borrow_mut() {
                elems.push(value);
            }
        }
        Ok(())
    }

    fn traverse_map(&mut self, jobj: &JsonObjRef, target: &ObjRef) -> Result<()> {
        if jobj.borrow().keys().is_some() {
            return Ok(()); // @keys/@items form, zipped after patching
        }
        for (key, node) in jobj.borrow().entries() {
            if intern::is_meta_key(key) {
                continue;
            }
            let value = self.assign(node, &TypeSpec::Any, target, Slot::Field(Rc::clone(key)))?;
            if let Obj::Map(map) = &mut *target.borrow_mut() {
                map.insert(Value::Str(Rc::clone(key)), value);
            }
        }
        Ok(())
    }

    /// The shared element/field dispatch, parametrized by the declared
    /// type of the receiving slot.
    fn assign(
        &mut self,
        node: &JsonValue,
        declared: &TypeSpec,
        holder: &ObjRef,
        slot: Slot,
    ) -> Result<Value> {
        match node {
            JsonValue::Null => Ok(Value::Null),

            JsonValue::Array(items) => {
                // char arrays travel as a single embedded string.
                if let TypeSpec::Array(component) = declared {
                    if **component == TypeSpec::Char {
                        return self.chars_from_items(items);
                    }
                }
                let wrapper = wrap_items(Rc::clone(items));
                let value = self.instantiate(declared, &wrapper)?;
                if value.as_obj().is_some() {
                    self.stack.push(wrapper);
                }
                Ok(value)
            }

            JsonValue::Object(jo) => {
                let (is_empty, ref_id) = {
                    let b = jo.borrow();
                    (b.is_empty(), b.ref_id())
                };

                if let Some(id) = ref_id {
                    if let Some(defined) = self.refs.get(&id) {
                        if let Some(built) = defined.borrow().target() {
                            return Ok(built.clone());
                        }
                    }
                    self.unresolved.push(UnresolvedRef {
                        holder: Rc::clone(holder),
                        slot,
                        ref_id: id,
                    });
                    return Ok(Value::Null); // patched later
                }

                if is_empty {
                    return self.fresh_instance(declared);
                }

                let value = self.instantiate(declared, jo)?;
                if value.as_obj().is_some() {
                    self.stack.push(Rc::clone(jo));
                }
                Ok(value)
            }

            scalar => self.coerce(scalar, declared),
        }
    }

    // --- INSTANTIATION ---

    /// Decides the concrete target for an object node: an explicit
    /// `@type` always wins; otherwise the expected type from the
    /// enclosing slot, with `@items` and `value` as tie-breakers.
    fn instantiate(&mut self, expected: &TypeSpec, jo: &JsonObjRef) -> Result<Value> {
        let tagged = match jo.borrow().type_tag() {
            Some(tag) => Some(self.registry.spec_for_tag(&tag)?),
            None => None,
        };

        let value = match tagged {
            Some(TypeSpec::Array(component)) => self.make_array(&component, jo)?,
            Some(TypeSpec::List) => Value::obj(Obj::List(Vec::new())),
            Some(TypeSpec::Map) => self.make_map(jo)?,
            Some(TypeSpec::Set) => self.make_set(jo)?,
            Some(TypeSpec::Record(name)) => Value::Obj(self.registry.new_record(&name)?),
            Some(leaf) if leaf.is_leaf() => {
                let node = jo.borrow().value_slot().cloned().unwrap_or(JsonValue::Null);
                self.coerce(&node, &leaf)?
            }
            // An explicit "object" tag carries no information.
            Some(TypeSpec::Any) | None => self.from_expected(expected, jo)?,
            Some(other) => {
                return Err(JsonError::Semantic(format!(
                    "cannot instantiate from tag '{other}'"
                )));
            }
        };

        jo.borrow_mut().target = Some(value.clone());
        Ok(value)
    }

    fn from_expected(&mut self, expected: &TypeSpec, jo: &JsonObjRef) -> Result<Value> {
        let (has_items, value_node) = {
            let b = jo.borrow();
            (b.items().is_some(), b.value_slot().cloned())
        };

        match expected {
            TypeSpec::Array(component) => self.make_array(component, jo),
            TypeSpec::List => Ok(Value::obj(Obj::List(Vec::new()))),
            TypeSpec::Map => self.make_map(jo),
            TypeSpec::Set => self.make_set(jo),
            TypeSpec::Record(name) => Ok(Value::Obj(self.registry.new_record(name)?)),
            TypeSpec::Any => {
                if has_items {
                    // A sequence of unknown elements.
                    self.make_array(&TypeSpec::Any, jo)
                } else if let Some(node) = value_node {
                    self.coerce(&node, &TypeSpec::Any)
                } else {
                    // Degenerate JS-style object: a string-keyed map.
                    Ok(Value::obj(Obj::Map(IndexMap::new())))
                }
            }
            leaf => match value_node {
                Some(node) => self.coerce(&node, leaf),
                None => Err(JsonError::Semantic(format!(
                    "cannot build a '{leaf}' from an object with no 'value'"
                ))),
            },
        }
    }

    fn fresh_instance(&mut self, declared: &TypeSpec) -> Result<Value> {
        match declared {
            TypeSpec::Record(name) => Ok(Value::Obj(self.registry.new_record(name)?)),
            TypeSpec::List => Ok(Value::obj(Obj::List(Vec::new()))),
            TypeSpec::Map | TypeSpec::Any => Ok(Value::obj(Obj::Map(IndexMap::new()))),
            TypeSpec::Set => Ok(Value::obj(Obj::Set(IndexSet::new()))),
            TypeSpec::Array(_) => Err(JsonError::Semantic(
                "array specified with no @items".into(),
            )),
            leaf => Ok(leaf.zero_value()),
        }
    }

    fn make_array(&mut self, component: &TypeSpec, jo: &JsonObjRef) -> Result<Value> {
        let Some(items) = jo.borrow().items() else {
            return Err(JsonError::Semantic(
                "'@items' not specified for a JSON array, no way to determine length".into(),
            ));
        };
        if *component == TypeSpec::Char {
            return self.chars_from_items(&items);
        }

        let len = items.borrow().len();
        let array = match component {
            TypeSpec::Byte => Array::Bytes(vec![0; len]),
            TypeSpec::Short => Array::Shorts(vec![0; len]),
            TypeSpec::Int => Array::Ints(vec![0; len]),
            TypeSpec::Long => Array::Longs(vec![0; len]),
            TypeSpec::Float => Array::Floats(vec![0.0; len]),
            TypeSpec::Double => Array::Doubles(vec![0.0; len]),
            TypeSpec::Bool => Array::Bools(vec![false; len]),
            other => Array::Of(other.clone(), vec![Value::Null; len]),
        };
        Ok(Value::obj(Obj::Array(array)))
    }

    fn chars_from_items(&self, items: &JsonArrayRef) -> Result<Value> {
        let nodes = items.borrow();
        let chars: Vec<char> = match nodes.as_slice() {
            [] => Vec::new(),
            // The writer embeds the whole array as one string.
            [JsonValue::Str(s)] => s.chars().collect(),
            many => {
                let mut out = Vec::with_capacity(many.len());
                for node in many {
                    match self.coerce(node, &TypeSpec::Char)? {
                        Value::Char(c) => out.push(c),
                        _ => {
                            return Err(JsonError::Semantic(
                                "char array element is not a character".into(),
                            ));
                        }
                    }
                }
                out
            }
        };
        Ok(Value::obj(Obj::Array(Array::Chars(chars))))
    }

    /// Mappings defer all inserts: `@keys` and `@items` build as plain
    /// sequences first (so forward references patch by index), and the
    /// zip into the hash container happens after patching.
    fn make_map(&mut self, jo: &JsonObjRef) -> Result<Value> {
        let map_ref: ObjRef = Rc::new(RefCell::new(Obj::Map(IndexMap::new())));
        let (keys, items) = {
            let b = jo.borrow();
            (b.keys(), b.items())
        };

        match (keys, items) {
            (Some(keys), Some(items)) => {
                let keys_obj = wrap_items(keys);
                let items_obj = wrap_items(items);
                self.instantiate(&TypeSpec::array(TypeSpec::Any), &keys_obj)?;
                self.instantiate(&TypeSpec::array(TypeSpec::Any), &items_obj)?;
                self.stack.push(Rc::clone(&keys_obj));
                self.stack.push(Rc::clone(&items_obj));
                self.pending_maps.push(PendingMap {
                    map: Rc::clone(&map_ref),
                    keys: keys_obj,
                    items: items_obj,
                });
            }
            (None, None) => {} // inline string-keyed entries, filled by traversal
            _ => {
                return Err(JsonError::Semantic(
                    "mapping requires both @keys and @items".into(),
                ));
            }
        }
        Ok(Value::Obj(map_ref))
    }

    fn make_set(&mut self, jo: &JsonObjRef) -> Result<Value> {
        let set_ref: ObjRef = Rc::new(RefCell::new(Obj::Set(IndexSet::new())));
        if let Some(items) = jo.borrow().items() {
            let items_obj = wrap_items(items);
            self.instantiate(&TypeSpec::array(TypeSpec::Any), &items_obj)?;
            self.stack.push(Rc::clone(&items_obj));
            self.pending_sets.push(PendingSet {
                set: Rc::clone(&set_ref),
                items: items_obj,
            });
        }
        Ok(Value::Obj(set_ref))
    }

    // --- COERCION ---

    /// The primitive coercion matrix.
    fn coerce(&self, node: &JsonValue, target: &TypeSpec) -> Result<Value> {
        // Empty string (and absent value) coerce non-string leaves to
        // their zero: 0 for primitives, null for reference-like leaves.
        if !matches!(target, TypeSpec::Str | TypeSpec::Any) {
            match node {
                JsonValue::Null => return Ok(target.zero_value()),
                JsonValue::Str(s) if s.is_empty() => return Ok(target.zero_value()),
                _ => {}
            }
        }

        match (target, node) {
            (TypeSpec::Any, JsonValue::Null) => Ok(Value::Null),
            (TypeSpec::Any, JsonValue::Bool(b)) => Ok(Value::Bool(*b)),
            (TypeSpec::Any, JsonValue::Long(n)) => Ok(Value::Long(*n)),
            (TypeSpec::Any, JsonValue::Double(d)) => Ok(Value::Double(*d)),
            (TypeSpec::Any, JsonValue::Str(s)) => Ok(Value::Str(Rc::clone(s))),

            (TypeSpec::Bool, JsonValue::Bool(b)) => Ok(Value::Bool(*b)),

            (TypeSpec::Byte, JsonValue::Long(n)) => Ok(Value::Byte(*n as i8)),
            (TypeSpec::Short, JsonValue::Long(n)) => Ok(Value::Short(*n as i16)),
            (TypeSpec::Int, JsonValue::Long(n)) => Ok(Value::Int(*n as i32)),
            (TypeSpec::Long, JsonValue::Long(n)) => Ok(Value::Long(*n)),

            (TypeSpec::Float, JsonValue::Long(n)) => Ok(Value::Float(*n as f32)),
            (TypeSpec::Float, JsonValue::Double(d)) => Ok(Value::Float(*d as f32)),
            (TypeSpec::Double, JsonValue::Long(n)) => Ok(Value::Double(*n as f64)),
            (TypeSpec::Double, JsonValue::Double(d)) => Ok(Value::Double(*d)),

            (TypeSpec::Char, JsonValue::Str(s)) => {
                Ok(Value::Char(s.chars().next().unwrap_or('\0')))
            }

            (TypeSpec::Str, JsonValue::Str(s)) => Ok(Value::Str(Rc::clone(s))),
            (TypeSpec::Str, JsonValue::Null) => Ok(Value::Null),

            (TypeSpec::Date, JsonValue::Long(n)) => Ok(Value::Date(Date::from_millis(*n))),

            (TypeSpec::Class, JsonValue::Str(s)) => {
                // Resolve by name so an unknown type fails here, not at
                // first use.
                self.registry.spec_for_tag(s)?;
                Ok(Value::Class(Rc::clone(s)))
            }

            (t, n) => Err(JsonError::Semantic(format!(
                "cannot coerce {} into '{t}'",
                node_kind(n)
            ))),
        }
    }

    // --- PATCHING ---

    /// Drains the unresolved-reference list: resolvable entries are
    /// written into their slots, dangling ids are logged and skipped,
    /// and any survivor makes the whole read fail.
    fn patch(&mut self) -> Result<()> {
        let unresolved = std::mem::take(&mut self.unresolved);
        let mut dangling: Vec<String> = Vec::new();

        for entry in unresolved {
            let built = self
                .refs
                .get(&entry.ref_id)
                .and_then(|jo| jo.borrow().target().cloned());

            match built {
                Some(value) => apply_patch(&entry.holder, &entry.slot, value),
                None => {
                    warn!(
                        ref_id = entry.ref_id,
                        "reference does not match any object id in input; dropped"
                    );
                    dangling.push(match &entry.slot {
                        Slot::Field(name) => {
                            format!("@ref {} (field '{name}')", entry.ref_id)
                        }
                        Slot::Index(i) => format!("@ref {} (index {i})", entry.ref_id),
                    });
                }
            }
        }

        if dangling.is_empty() {
            Ok(())
        } else {
            Err(JsonError::Reference(format!(
                "{} unresolved references: {}",
                dangling.len(),
                dangling.join(", ")
            )))
        }
    }

    /// Zips deferred `@keys`/`@items` pairs into their mappings and
    /// deferred `@items` into their sets, re-inserting every entry now
    /// that patching has given keys their final state.
    fn rehash(&mut self) -> Result<()> {
        for pending in std::mem::take(&mut self.pending_maps) {
            let keys = built_elements(&pending.keys)?;
            let items = built_elements(&pending.items)?;
            if keys.len() != items.len() {
                return Err(JsonError::Semantic(format!(
                    "@keys length {} does not match @items length {}",
                    keys.len(),
                    items.len()
                )));
            }
            if let Obj::Map(map) = &mut *pending.map.borrow_mut() {
                for (k, v) in keys.into_iter().zip(items) {
                    map.insert(k, v);
                }
            }
        }

        for pending in std::mem::take(&mut self.pending_sets) {
            let items = built_elements(&pending.items)?;
            if let Obj::Set(set) = &mut *pending.set.borrow_mut() {
                for v in items {
                    set.insert(v);
                }
            }
        }
        Ok(())
    }
}

/// Wraps a parsed array in a synthetic object node carrying it under
/// `@items`, the shape the instantiation rules expect.
fn wrap_items(items: JsonArrayRef) -> JsonObjRef {
    let wrapper = JsonObj::new_ref();
    wrapper
        .borrow_mut()
        .insert(intern::intern(intern::META_ITEMS), JsonValue::Array(items));
    wrapper
}

fn apply_patch(holder: &ObjRef, slot: &Slot, value: Value) {
    match (&mut *holder.borrow_mut(), slot) {
        (Obj::Record(record), Slot::Field(name)) => record.set(Rc::clone(name), value),
        (Obj::Map(map), Slot::Field(name)) => {
            map.insert(Value::Str(Rc::clone(name)), value);
        }
        (Obj::Array(Array::Of(_, elems)), Slot::Index(i)) => {
            if let Some(slot) = elems.get_mut(*i) {
                *slot = value;
            }
        }
        (Obj::List(elems), Slot::Index(i)) => {
            if let Some(slot) = elems.get_mut(*i) {
                *slot = value;
            }
        }
        _ => {}
    }
}

/// The element vector a synthetic `@items` object was built into.
fn built_elements(jo: &JsonObjRef) -> Result<Vec<Value>> {
    let b = jo.borrow();
    match b.target() {
        Some(Value::Obj(o)) => match &*o.borrow() {
            Obj::Array(Array::Of(_, elems)) => Ok(elems.clone()),
            _ => Err(JsonError::Semantic(
                "container sequence did not build as an array".into(),
            )),
        },
        _ => Err(JsonError::Semantic(
            "container sequence was never built".into(),
        )),
    }
}

fn store_primitive(target: &ObjRef, index: usize, value: Value) {
    if let Obj::Array(array) = &mut *target.borrow_mut() {
        match (array, value) {
            (Array::Bytes(v), Value::Byte(n)) => set_at(v, index, n),
            (Array::Shorts(v), Value::Short(n)) => set_at(v, index, n),
            (Array::Ints(v), Value::Int(n)) => set_at(v, index, n),
            (Array::Longs(v), Value::Long(n)) => set_at(v, index, n),
            (Array::Floats(v), Value::Float(n)) => set_at(v, index, n),
            (Array::Doubles(v), Value::Double(n)) => set_at(v, index, n),
            (Array::Bools(v), Value::Bool(n)) => set_at(v, index, n),
            _ => {}
        }
    }
}

fn set_at<T>(v: &mut [T], index: usize, value: T) {
    if let Some(slot) = v.get_mut(index) {
        *slot = value;
    }
}

fn node_kind(node: &JsonValue) -> &'static str {
    match node {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Long(_) => "an integer",
        JsonValue::Double(_) => "a floating point number",
        JsonValue::Str(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
