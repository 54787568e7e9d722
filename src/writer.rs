//! The encoder: two passes over the graph.
//!
//! Pass one walks the graph iteratively and records, in an identity map
//! keyed by `Rc` pointer address, every node it meets; a node met twice
//! goes into the *referenced* set and will carry `@id` in the output.
//! Pass two emits JSON, reusing the (cleared) visited map as the
//! "already defined in output" set: the first emission of a shared node
//! defines it with `@id`, every later emission collapses to
//! `{"@ref":n}`. Ids are assigned in first-encounter order starting at
//! 1, so output is deterministic for a deterministic graph.
//!
//! The single most important rule for compact output is *type
//! inference*: `@type` is suppressed whenever the enclosing slot's
//! declared type equals the value's runtime type, and for
//! booleans, longs, doubles and strings under an `Any` slot (the JSON
//! literal already carries the type). `Of(Any)` arrays, the
//! "anything goes" arrays, never write `@type` at all.
//!
//! Leaves are never reference-tracked, with one exception: strings carry
//! `Rc` identity, and an aliased string is emitted as
//! `{"@id":n,"value":"..."}` / `{"@ref":n}` so the aliasing survives the
//! round trip.
//!
//! Per top-level write the writer moves Idle → Tracing → Emitting →
//! Flushed and back to Idle; all tables are cleared on completion. A
//! writer instance is not reentrant and not safe for concurrent use.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::io;
use std::rc::Rc;

use tracing::trace;
use twox_hash::XxHash64;

use crate::error::Result;
use crate::registry::{Registry, TypeSpec};
use crate::value::{Array, Obj, ObjRef, Value};

/// Identity map keyed by `Rc` pointer address.
type IdentityMap = HashMap<usize, u64, BuildHasherDefault<XxHash64>>;

/// The pointer key of an identity-bearing value, `None` for inline
/// leaves (which cannot alias).
fn identity_key(value: &Value) -> Option<usize> {
    match value {
        Value::Obj(o) => Some(Rc::as_ptr(o) as *const u8 as usize),
        Value::Str(s) => Some(Rc::as_ptr(s) as *const u8 as usize),
        _ => None,
    }
}

/// Streaming graph encoder over any byte sink.
///
/// ```
/// use jsonweave::{GraphWriter, Registry, Value};
///
/// let registry = Registry::new();
/// let mut writer = GraphWriter::new(&registry, Vec::new());
/// writer.write(&Value::Long(17))?;
/// assert_eq!(writer.into_inner(), b"17");
/// # Ok::<(), jsonweave::JsonError>(())
/// ```
pub struct GraphWriter<'r, W: io::Write> {
    registry: &'r Registry,
    out: W,
    /// Trace phase: node -> id. Emit phase (cleared in between): the
    /// defined-in-output set.
    visited: IdentityMap,
    referenced: IdentityMap,
    next_id: u64,
}

impl<'r, W: io::Write> GraphWriter<'r, W> {
    /// Creates a writer over the given sink.
    pub fn new(registry: &'r Registry, sink: W) -> Self {
        Self {
            registry,
            out: sink,
            visited: IdentityMap::default(),
            referenced: IdentityMap::default(),
            next_id: 1,
        }
    }

    /// Encodes one complete graph to the sink and flushes it.
    pub fn write(&mut self, root: &Value) -> Result<()> {
        self.trace_references(root);
        trace!(nodes = self.next_id - 1, "reference trace complete");
        self.visited.clear();

        if root.is_null() {
            self.out.write_all(b"{}")?;
        } else {
            self.emit_value(root, &TypeSpec::Any)?;
        }
        self.out.flush()?;

        self.visited.clear();
        self.referenced.clear();
        self.next_id = 1;
        Ok(())
    }

    /// Consumes the writer, returning the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    // --- TRACE PASS ---

    fn trace_references(&mut self, root: &Value) {
        let mut stack: Vec<Value> = vec![root.clone()];

        while let Some(value) = stack.pop() {
            let Some(key) = identity_key(&value) else {
                continue; // null or an inline leaf
            };

            if let Some(&id) = self.visited.get(&key) {
                // Met twice: this node will need @id/@ref.
                self.referenced.insert(key, id);
                continue;
            }
            self.visited.insert(key, self.next_id);
            self.next_id += 1;

            let Value::Obj(obj) = &value else {
                continue; // strings have identity but no outgoing edges
            };
            match &*obj.borrow() {
                Obj::Record(r) => {
                    for (_, v) in r.fields() {
                        push_tracked(&mut stack, v);
                    }
                }
                Obj::Array(Array::Of(_, elems)) => {
                    for v in elems {
                        push_tracked(&mut stack, v);
                    }
                }
                // Primitive element stores cannot reference graph nodes.
                Obj::Array(_) => {}
                Obj::List(elems) => {
                    for v in elems {
                        push_tracked(&mut stack, v);
                    }
                }
                Obj::Map(m) => {
                    for (k, v) in m {
                        push_tracked(&mut stack, k);
                        push_tracked(&mut stack, v);
                    }
                }
                Obj::Set(s) => {
                    for v in s {
                        push_tracked(&mut stack, v);
                    }
                }
            }
        }
    }

    // --- EMIT PASS ---

    /// Emits one value in the context of the enclosing slot's declared
    /// type.
    fn emit_value(&mut self, value: &Value, declared: &TypeSpec) -> Result<()> {
        match value {
            Value::Null => Ok(self.out.write_all(b"null")?),

            Value::Bool(b) => {
                let lit: &[u8] = if *b { b"true" } else { b"false" };
                if matches!(declared, TypeSpec::Bool | TypeSpec::Any) {
                    Ok(self.out.write_all(lit)?)
                } else {
                    self.emit_boxed("boolean", |w| Ok(w.write_all(lit)?))
                }
            }

            Value::Byte(n) => self.emit_integer(i64::from(*n), TypeSpec::Byte, declared),
            Value::Short(n) => self.emit_integer(i64::from(*n), TypeSpec::Short, declared),
            Value::Int(n) => self.emit_integer(i64::from(*n), TypeSpec::Int, declared),

            Value::Long(n) => {
                if matches!(declared, TypeSpec::Long | TypeSpec::Any) {
                    Ok(write!(self.out, "{n}")?)
                } else {
                    let n = *n;
                    self.emit_boxed("long", |w| Ok(write!(w, "{n}")?))
                }
            }

            Value::Float(f) => {
                let f = *f;
                if *declared == TypeSpec::Float {
                    write_float(&mut self.out, f)
                } else {
                    self.emit_boxed("float", |w| write_float(w, f))
                }
            }

            Value::Double(d) => {
                let d = *d;
                if matches!(declared, TypeSpec::Double | TypeSpec::Any) {
                    write_double(&mut self.out, d)
                } else {
                    self.emit_boxed("double", |w| write_double(w, d))
                }
            }

            Value::Char(c) => {
                let c = *c;
                if *declared == TypeSpec::Char {
                    write_json_string(&mut self.out, &c.to_string())
                } else {
                    self.emit_boxed("char", |w| write_json_string(w, &c.to_string()))
                }
            }

            Value::Str(s) => self.emit_str(s, declared),

            Value::Date(d) => {
                let millis = d.millis();
                if *declared == TypeSpec::Date {
                    Ok(write!(self.out, "{millis}")?)
                } else {
                    self.emit_boxed("date", |w| Ok(write!(w, "{millis}")?))
                }
            }

            Value::Class(name) => {
                if *declared == TypeSpec::Class {
                    write_json_string(&mut self.out, name)
                } else {
                    let name = Rc::clone(name);
                    self.emit_boxed("class", |w| write_json_string(w, &name))
                }
            }

            Value::Obj(obj) => {
                let force = value.type_spec() != *declared;
                self.emit_obj(obj, force)
            }
        }
    }

    /// `{"@type":tag,"value":<payload>}` for a leaf whose type the
    /// context cannot infer.
    fn emit_boxed(
        &mut self,
        tag: &str,
        payload: impl FnOnce(&mut W) -> Result<()>,
    ) -> Result<()> {
        write!(self.out, "{{\"@type\":\"{tag}\",\"value\":")?;
        payload(&mut self.out)?;
        Ok(self.out.write_all(b"}")?)
    }

    fn emit_integer(&mut self, n: i64, actual: TypeSpec, declared: &TypeSpec) -> Result<()> {
        if *declared == actual {
            Ok(write!(self.out, "{n}")?)
        } else {
            let tag = actual.tag();
            self.emit_boxed(&tag, |w| Ok(write!(w, "{n}")?))
        }
    }

    /// Strings are emitted bare unless aliased; a shared string defines
    /// itself once with `@id` and collapses to `@ref` afterwards.
    fn emit_str(&mut self, s: &Rc<str>, declared: &TypeSpec) -> Result<()> {
        let key = Rc::as_ptr(s) as *const u8 as usize;
        let Some(&id) = self.referenced.get(&key) else {
            return write_json_string(&mut self.out, s);
        };

        if self.visited.contains_key(&key) {
            return Ok(write!(self.out, "{{\"@ref\":{id}}}")?);
        }
        self.visited.insert(key, id);

        write!(self.out, "{{\"@id\":{id},")?;
        if *declared != TypeSpec::Str {
            self.out.write_all(b"\"@type\":\"string\",")?;
        }
        self.out.write_all(b"\"value\":")?;
        write_json_string(&mut self.out, s)?;
        Ok(self.out.write_all(b"}")?)
    }

    /// Emits a heap object, or `{"@ref":n}` when it is already defined
    /// in the output.
    fn emit_obj(&mut self, obj: &ObjRef, force: bool) -> Result<()> {
        let key = Rc::as_ptr(obj) as *const u8 as usize;
        if self.visited.contains_key(&key) {
            let id = self.referenced.get(&key).copied().unwrap_or(0);
            return Ok(write!(self.out, "{{\"@ref\":{id}}}")?);
        }
        self.visited.insert(key, 0);
        let referenced = self.referenced.get(&key).copied();

        match &*obj.borrow() {
            Obj::Record(r) => self.emit_record(r, force, referenced),
            Obj::Array(a) => self.emit_array(a, force, referenced),
            Obj::List(elems) => self.emit_items_container("list", elems.iter(), force, referenced),
            Obj::Set(elems) => self.emit_items_container("set", elems.iter(), force, referenced),
            Obj::Map(m) => self.emit_map(m, force, referenced),
        }
    }

    fn emit_record(
        &mut self,
        record: &crate::value::Record,
        force: bool,
        referenced: Option<u64>,
    ) -> Result<()> {
        let registry = self.registry;
        let hook = registry.write_hook(record.type_name());
        // A custom write hook forces @type so the reader knows to
        // dispatch to the matching read hook.
        let show_type = force || hook.is_some();

        self.out.write_all(b"{")?;
        let mut first = true;
        if let Some(id) = referenced {
            write!(self.out, "\"@id\":{id}")?;
            first = false;
        }
        if show_type {
            if !first {
                self.out.write_all(b",")?;
            }
            write!(self.out, "\"@type\":\"{}\"", record.type_name())?;
            first = false;
        }

        match hook {
            Some(hook) => {
                self.out.write_all(b",")?;
                hook(record, &mut self.out)?;
            }
            None => {
                let descriptor = registry.descriptor(record.type_name())?;
                for (field, declared) in descriptor.fields() {
                    if first {
                        first = false;
                    } else {
                        self.out.write_all(b",")?;
                    }
                    write_json_string(&mut self.out, field)?;
                    self.out.write_all(b":")?;
                    match record.get(field) {
                        Some(v) => self.emit_value(v, declared)?,
                        None => self.out.write_all(b"null")?,
                    }
                }
            }
        }

        Ok(self.out.write_all(b"}")?)
    }

    fn emit_array(&mut self, array: &Array, force: bool, referenced: Option<u64>) -> Result<()> {
        // The anything-goes array is never typed; everything else is
        // typed whenever the context cannot infer it.
        let type_written = force && !matches!(array, Array::Of(TypeSpec::Any, _));
        let wrapped = type_written || referenced.is_some();

        if wrapped {
            self.out.write_all(b"{")?;
            if let Some(id) = referenced {
                write!(self.out, "\"@id\":{id},")?;
            }
            if type_written {
                write!(self.out, "\"@type\":\"{}[]\",", array.component().tag())?;
            }
            self.out.write_all(b"\"@items\":[")?;
        } else {
            self.out.write_all(b"[")?;
        }

        // One tight loop per primitive store; reflective dispatch per
        // element is reserved for the Of store.
        match array {
            Array::Bytes(v) => self.emit_int_elements(v.iter().map(|n| i64::from(*n)))?,
            Array::Shorts(v) => self.emit_int_elements(v.iter().map(|n| i64::from(*n)))?,
            Array::Ints(v) => self.emit_int_elements(v.iter().map(|n| i64::from(*n)))?,
            Array::Longs(v) => self.emit_int_elements(v.iter().copied())?,
            Array::Floats(v) => {
                for (i, f) in v.iter().enumerate() {
                    if i > 0 {
                        self.out.write_all(b",")?;
                    }
                    write_float(&mut self.out, *f)?;
                }
            }
            Array::Doubles(v) => {
                for (i, d) in v.iter().enumerate() {
                    if i > 0 {
                        self.out.write_all(b",")?;
                    }
                    write_double(&mut self.out, *d)?;
                }
            }
            Array::Bools(v) => {
                for (i, b) in v.iter().enumerate() {
                    if i > 0 {
                        self.out.write_all(b",")?;
                    }
                    self.out.write_all(if *b { b"true" } else { b"false" })?;
                }
            }
            // A char array is one JSON string, for compactness and speed.
            Array::Chars(v) => {
                if !v.is_empty() {
                    let s: String = v.iter().collect();
                    write_json_string(&mut self.out, &s)?;
                }
            }
            Array::Of(component, elems) => {
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.write_all(b",")?;
                    }
                    self.emit_value(elem, component)?;
                }
            }
        }

        self.out.write_all(b"]")?;
        if wrapped {
            self.out.write_all(b"}")?;
        }
        Ok(())
    }

    fn emit_int_elements(&mut self, elems: impl Iterator<Item = i64>) -> Result<()> {
        for (i, n) in elems.enumerate() {
            if i > 0 {
                self.out.write_all(b",")?;
            }
            write!(self.out, "{n}")?;
        }
        Ok(())
    }

    fn emit_items_container<'v>(
        &mut self,
        tag: &str,
        elems: impl Iterator<Item = &'v Value>,
        force: bool,
        referenced: Option<u64>,
    ) -> Result<()> {
        self.out.write_all(b"{")?;
        if let Some(id) = referenced {
            write!(self.out, "\"@id\":{id},")?;
        }
        if force {
            write!(self.out, "\"@type\":\"{tag}\",")?;
        }
        self.out.write_all(b"\"@items\":[")?;
        for (i, elem) in elems.enumerate() {
            if i > 0 {
                self.out.write_all(b",")?;
            }
            self.emit_value(elem, &TypeSpec::Any)?;
        }
        Ok(self.out.write_all(b"]}")?)
    }

    fn emit_map(
        &mut self,
        map: &indexmap::IndexMap<Value, Value>,
        force: bool,
        referenced: Option<u64>,
    ) -> Result<()> {
        // Inline form requires every key to be a plain string: no
        // meta-key lookalikes, and not the single ambiguous key "value".
        let inline = map
            .keys()
            .all(|k| matches!(k, Value::Str(s) if !s.starts_with('@')))
            && !(map.len() == 1 && map.keys().next().and_then(Value::as_str) == Some("value"));

        self.out.write_all(b"{")?;
        let mut first = true;
        if let Some(id) = referenced {
            write!(self.out, "\"@id\":{id}")?;
            first = false;
        }
        if force {
            if !first {
                self.out.write_all(b",")?;
            }
            self.out.write_all(b"\"@type\":\"map\"")?;
            first = false;
        }

        if inline {
            for (k, v) in map {
                // The inline check proved every key is a string.
                let Some(key) = k.as_str() else { continue };
                if first {
                    first = false;
                } else {
                    self.out.write_all(b",")?;
                }
                write_json_string(&mut self.out, key)?;
                self.out.write_all(b":")?;
                self.emit_value(v, &TypeSpec::Any)?;
            }
        } else {
            if !first {
                self.out.write_all(b",")?;
            }
            self.out.write_all(b"\"@keys\":[")?;
            for (i, k) in map.keys().enumerate() {
                if i > 0 {
                    self.out.write_all(b",")?;
                }
                self.emit_value(k, &TypeSpec::Any)?;
            }
            self.out.write_all(b"],\"@items\":[")?;
            for (i, v) in map.values().enumerate() {
                if i > 0 {
                    self.out.write_all(b",")?;
                }
                self.emit_value(v, &TypeSpec::Any)?;
            }
            self.out.write_all(b"]")?;
        }

        Ok(self.out.write_all(b"}")?)
    }
}

fn push_tracked(stack: &mut Vec<Value>, value: &Value) {
    if identity_key(value).is_some() {
        stack.push(value.clone());
    }
}

/// Doubles always carry a `.` or exponent so the reader's number
/// classifier brings them back as doubles. Magnitudes outside the
/// plain-decimal comfort zone use exponent notation; decimal expansion
/// of e.g. 1e300 would overflow the reader's fixed number buffer.
/// Non-finite values have no JSON form and emit `null`.
fn write_double(out: &mut impl io::Write, d: f64) -> Result<()> {
    if !d.is_finite() {
        return Ok(out.write_all(b"null")?);
    }
    let s = if d != 0.0 && (d.abs() >= 1e15 || d.abs() < 1e-5) {
        format!("{d:e}")
    } else {
        let mut s = d.to_string();
        if !s.contains(['.', 'e', 'E']) {
            s.push_str(".0");
        }
        s
    };
    Ok(out.write_all(s.as_bytes())?)
}

/// Floats go through their shortest 32-bit representation, with the same
/// classifier guard as doubles.
fn write_float(out: &mut impl io::Write, f: f32) -> Result<()> {
    if !f.is_finite() {
        return Ok(out.write_all(b"null")?);
    }
    let s = if f != 0.0 && (f.abs() >= 1e15 || f.abs() < 1e-5) {
        format!("{f:e}")
    } else {
        let mut s = f.to_string();
        if !s.contains(['.', 'e', 'E']) {
            s.push_str(".0");
        }
        s
    };
    Ok(out.write_all(s.as_bytes())?)
}

/// Writes `s` as a JSON string: control characters become `\b \t \n \f
/// \r` or `\u00XX`, backslash and quote are escaped, everything else is
/// emitted verbatim (the sink is UTF-8).
pub(crate) fn write_json_string(out: &mut impl io::Write, s: &str) -> Result<()> {
    out.write_all(b"\"")?;
    let mut utf8 = [0u8; 4];
    for c in s.chars() {
        match c {
            '\u{8}' => out.write_all(b"\\b")?,
            '\t' => out.write_all(b"\\t")?,
            '\n' => out.write_all(b"\\n")?,
            '\u{c}' => out.write_all(b"\\f")?,
            '\r' => out.write_all(b"\\r")?,
            '\\' => out.write_all(b"\\\\")?,
            '"' => out.write_all(b"\\\"")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_all(c.encode_utf8(&mut utf8).as_bytes())?,
        }
    }
    Ok(out.write_all(b"\"")?)
}
