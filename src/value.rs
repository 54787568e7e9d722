//! The runtime object-graph model.
//!
//! A graph handed to the writer (or produced by the reader) is a
//! [`Value`]: either a leaf scalar carried inline, or a handle to a
//! shared heap object ([`ObjRef`] = `Rc<RefCell<Obj>>`). Identity, the
//! thing `@id`/`@ref` preserve, is `Rc` pointer identity; two handles
//! alias the same node exactly when they point at the same allocation.
//! Strings are `Rc<str>` and carry identity the same way, so an aliased
//! string survives a round trip as one shared allocation.
//!
//! Heap objects come in five kinds:
//!
//! - [`Obj::Record`]: a registered type with named fields
//! - [`Obj::Array`]: a fixed array with a typed element store
//! - [`Obj::List`]: a generic growable sequence
//! - [`Obj::Map`]: a mapping with arbitrary keys
//! - [`Obj::Set`]: a hash set
//!
//! [`Array`] keeps primitive elements in dedicated vectors
//! (`Vec<i8>`, `Vec<i64>`, ...) rather than boxing each element in a
//! `Value`; the writer's per-primitive tight loops and the byte-fidelity
//! guarantees fall straight out of that layout.
//!
//! Map and set keys are `Value`s. Key equality is value equality for
//! leaves (floats compare by bit pattern) and pointer identity for heap
//! objects; two distinct-but-equal records are two distinct keys.
//!
//! Note on cycles: a decoded cyclic graph is a cycle of `Rc`s. The codec
//! holds no references after a call returns; dropping or breaking the
//! cycle is the caller's concern.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::registry::TypeSpec;

/// A shared, mutable heap object in a graph.
pub type ObjRef = Rc<RefCell<Obj>>;

/// An instant in time as milliseconds since the Unix epoch.
///
/// Dates are leaves: copied by value, never reference-tracked.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Date(i64);

impl Date {
    /// Creates a date from epoch milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the epoch milliseconds.
    pub fn millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Date({}ms)", self.0)
    }
}

/// A node of the runtime graph: a leaf scalar or a heap-object handle.
#[derive(Clone, Debug)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An 8-bit signed integer.
    Byte(i8),
    /// A 16-bit signed integer.
    Short(i16),
    /// A 32-bit signed integer.
    Int(i32),
    /// A 64-bit signed integer.
    Long(i64),
    /// A 32-bit float.
    Float(f32),
    /// A 64-bit float.
    Double(f64),
    /// A single character.
    Char(char),
    /// A shared string. Aliased strings keep their identity across a
    /// round trip.
    Str(Rc<str>),
    /// An epoch-millisecond instant.
    Date(Date),
    /// A type-identity value: the canonical name of a type.
    Class(Rc<str>),
    /// A handle to a shared heap object (record, array, list, map, set).
    Obj(ObjRef),
}

impl Value {
    /// Wraps a heap object in a fresh handle.
    pub fn obj(obj: Obj) -> Self {
        Self::Obj(Rc::new(RefCell::new(obj)))
    }

    /// Creates a string value (no interning; parser output is interned
    /// separately).
    pub fn str(s: impl AsRef<str>) -> Self {
        Self::Str(Rc::from(s.as_ref()))
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for every variant except `Obj`. Leaves are atomic and are
    /// never walked for outgoing references.
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Self::Obj(_))
    }

    /// The heap handle, if this value is one.
    pub fn as_obj(&self) -> Option<&ObjRef> {
        match self {
            Self::Obj(o) => Some(o),
            _ => None,
        }
    }

    /// The string payload, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload widened to 64 bits, for any integer variant.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Byte(n) => Some(i64::from(*n)),
            Self::Short(n) => Some(i64::from(*n)),
            Self::Int(n) => Some(i64::from(*n)),
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// The float payload widened to 64 bits, for either float variant.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(f64::from(*n)),
            Self::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean payload, if this value is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The runtime type of this value, as a [`TypeSpec`].
    ///
    /// `Null` reports [`TypeSpec::Any`]; it has no type of its own.
    pub fn type_spec(&self) -> TypeSpec {
        match self {
            Self::Null => TypeSpec::Any,
            Self::Bool(_) => TypeSpec::Bool,
            Self::Byte(_) => TypeSpec::Byte,
            Self::Short(_) => TypeSpec::Short,
            Self::Int(_) => TypeSpec::Int,
            Self::Long(_) => TypeSpec::Long,
            Self::Float(_) => TypeSpec::Float,
            Self::Double(_) => TypeSpec::Double,
            Self::Char(_) => TypeSpec::Char,
            Self::Str(_) => TypeSpec::Str,
            Self::Date(_) => TypeSpec::Date,
            Self::Class(_) => TypeSpec::Class,
            Self::Obj(o) => o.borrow().type_spec(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::str(v)
    }
}

/// Key semantics: leaves by value (floats by bit pattern), heap objects
/// by pointer identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a == b,
            (Self::Obj(a), Self::Obj(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Byte(n) => n.hash(state),
            Self::Short(n) => n.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Long(n) => n.hash(state),
            Self::Float(n) => n.to_bits().hash(state),
            Self::Double(n) => n.to_bits().hash(state),
            Self::Char(c) => c.hash(state),
            Self::Str(s) => s.hash(state),
            Self::Date(d) => d.hash(state),
            Self::Class(c) => c.hash(state),
            Self::Obj(o) => (Rc::as_ptr(o) as usize).hash(state),
        }
    }
}

// --- HEAP OBJECTS ---

/// A heap object: the referent of an [`ObjRef`].
#[derive(Debug)]
pub enum Obj {
    /// An instance of a registered record type.
    Record(Record),
    /// A fixed array with a typed element store.
    Array(Array),
    /// A generic growable sequence.
    List(Vec<Value>),
    /// A mapping with arbitrary keys, insertion-ordered.
    Map(IndexMap<Value, Value>),
    /// A hash set, insertion-ordered.
    Set(IndexSet<Value>),
}

impl Obj {
    /// The runtime type of this object as a [`TypeSpec`].
    pub fn type_spec(&self) -> TypeSpec {
        match self {
            Self::Record(r) => TypeSpec::Record(Rc::clone(&r.type_name)),
            Self::Array(a) => TypeSpec::Array(Box::new(a.component())),
            Self::List(_) => TypeSpec::List,
            Self::Map(_) => TypeSpec::Map,
            Self::Set(_) => TypeSpec::Set,
        }
    }

    /// Record view.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Mutable record view.
    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Array view.
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// List view.
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Map view.
    pub fn as_map(&self) -> Option<&IndexMap<Value, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Set view.
    pub fn as_set(&self) -> Option<&IndexSet<Value>> {
        match self {
            Self::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Convenience: reads a record field, cloning the handle.
    ///
    /// Returns `None` when this object is not a record or the field is
    /// absent.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.as_record().and_then(|r| r.get(field).cloned())
    }

    /// Convenience: writes a record field.
    ///
    /// No-op returning `false` when this object is not a record.
    pub fn set(&mut self, field: &str, value: Value) -> bool {
        match self.as_record_mut() {
            Some(r) => {
                r.set(field, value);
                true
            }
            None => false,
        }
    }
}

/// An instance of a registered record type: a type name plus ordered
/// named fields.
#[derive(Debug)]
pub struct Record {
    type_name: Rc<str>,
    fields: IndexMap<Rc<str>, Value>,
}

impl Record {
    /// Creates an empty record of the named type.
    ///
    /// Prefer [`Registry::new_record`](crate::Registry::new_record),
    /// which zero-fills the declared fields.
    pub fn new(type_name: Rc<str>) -> Self {
        Self {
            type_name,
            fields: IndexMap::new(),
        }
    }

    /// The record's type name.
    pub fn type_name(&self) -> &Rc<str> {
        &self.type_name
    }

    /// Reads a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Writes a field. An existing field keeps its position.
    pub fn set(&mut self, field: impl AsRef<str>, value: Value) {
        match self.fields.get_mut(field.as_ref()) {
            Some(slot) => *slot = value,
            None => {
                self.fields.insert(Rc::from(field.as_ref()), value);
            }
        }
    }

    /// Iterates fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.fields.iter()
    }

    /// Number of fields present on the instance.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are present.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A fixed array with a typed element store.
///
/// Primitive components get dedicated vectors; everything else
/// (strings, dates, records, nested arrays, `Any`) lives in
/// [`Array::Of`] alongside its component type.
#[derive(Debug)]
pub enum Array {
    /// `byte[]`
    Bytes(Vec<i8>),
    /// `short[]`
    Shorts(Vec<i16>),
    /// `int[]`
    Ints(Vec<i32>),
    /// `long[]`
    Longs(Vec<i64>),
    /// `float[]`
    Floats(Vec<f32>),
    /// `double[]`
    Doubles(Vec<f64>),
    /// `boolean[]`
    Bools(Vec<bool>),
    /// `char[]`, written to the wire as a single string.
    Chars(Vec<char>),
    /// An array of reference-typed (or `Any`) elements, with its
    /// component type.
    Of(TypeSpec, Vec<Value>),
}

impl Array {
    /// The component type of this array.
    pub fn component(&self) -> TypeSpec {
        match self {
            Self::Bytes(_) => TypeSpec::Byte,
            Self::Shorts(_) => TypeSpec::Short,
            Self::Ints(_) => TypeSpec::Int,
            Self::Longs(_) => TypeSpec::Long,
            Self::Floats(_) => TypeSpec::Float,
            Self::Doubles(_) => TypeSpec::Double,
            Self::Bools(_) => TypeSpec::Bool,
            Self::Chars(_) => TypeSpec::Char,
            Self::Of(spec, _) => spec.clone(),
        }
    }

    /// Element count.
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(v) => v.len(),
            Self::Shorts(v) => v.len(),
            Self::Ints(v) => v.len(),
            Self::Longs(v) => v.len(),
            Self::Floats(v) => v.len(),
            Self::Doubles(v) => v.len(),
            Self::Bools(v) => v.len(),
            Self::Chars(v) => v.len(),
            Self::Of(_, v) => v.len(),
        }
    }

    /// True when the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when elements live in a primitive store; such arrays can
    /// never reference other graph nodes and are pruned from the
    /// reference trace.
    pub fn is_primitive_store(&self) -> bool {
        !matches!(self, Self::Of(..))
    }
}
