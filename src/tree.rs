//! The intermediate tree: parsed JSON before instantiation.
//!
//! The parser materializes the whole document into this model and the
//! reader's build pass walks it, attaching the materialized entity to
//! each object node's `target` slot as it goes. Callers who ask for the
//! untyped form get this tree directly.
//!
//! Object entries are insertion-ordered; keys beginning with `@` are the
//! reserved meta-keys and are never treated as user fields.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::intern;
use crate::value::Value;

/// A shared handle to an intermediate object node.
pub type JsonObjRef = Rc<RefCell<JsonObj>>;

/// A shared handle to an intermediate array node.
pub type JsonArrayRef = Rc<RefCell<Vec<JsonValue>>>;

/// One node of the intermediate tree.
#[derive(Clone, Debug)]
pub enum JsonValue {
    /// JSON `null`.
    Null,
    /// JSON `true`/`false`.
    Bool(bool),
    /// A JSON number with no fraction or exponent.
    Long(i64),
    /// A JSON number with a fraction or exponent.
    Double(f64),
    /// A JSON string, interned when it matches a cached literal.
    Str(Rc<str>),
    /// A JSON array.
    Array(JsonArrayRef),
    /// A JSON object.
    Object(JsonObjRef),
}

impl JsonValue {
    /// Wraps a vector of nodes in a fresh array handle.
    pub fn array(items: Vec<JsonValue>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }

    /// True for `JsonValue::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string payload, if this node is a string.
    pub fn as_str(&self) -> Option<&Rc<str>> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this node is an integer.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// The object handle, if this node is an object.
    pub fn as_object(&self) -> Option<&JsonObjRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The array handle, if this node is an array.
    pub fn as_array(&self) -> Option<&JsonArrayRef> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }
}

/// An intermediate object node: ordered field entries plus the `target`
/// slot the build pass fills with the materialized entity.
#[derive(Debug, Default)]
pub struct JsonObj {
    entries: IndexMap<Rc<str>, JsonValue>,
    pub(crate) target: Option<Value>,
}

impl JsonObj {
    /// Creates an empty object node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object node wrapped in a shared handle.
    pub fn new_ref() -> JsonObjRef {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Inserts an entry, replacing any previous value under the key.
    pub fn insert(&mut self, key: Rc<str>, value: JsonValue) {
        self.entries.insert(key, value);
    }

    /// Reads an entry.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.entries.get(key)
    }

    /// Iterates entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&Rc<str>, &JsonValue)> {
        self.entries.iter()
    }

    /// Number of entries, meta-keys included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True for the `{}` sentinel.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `@type` tag, when present as a string.
    pub fn type_tag(&self) -> Option<Rc<str>> {
        match self.get(intern::META_TYPE) {
            Some(JsonValue::Str(s)) => Some(Rc::clone(s)),
            _ => None,
        }
    }

    /// The `@ref` id, when present as an integer.
    pub fn ref_id(&self) -> Option<i64> {
        self.get(intern::META_REF).and_then(JsonValue::as_long)
    }

    /// The `@items` sequence, when present as an array.
    pub fn items(&self) -> Option<JsonArrayRef> {
        match self.get(intern::META_ITEMS) {
            Some(JsonValue::Array(a)) => Some(Rc::clone(a)),
            _ => None,
        }
    }

    /// The `@keys` sequence, when present as an array.
    pub fn keys(&self) -> Option<JsonArrayRef> {
        match self.get(intern::META_KEYS) {
            Some(JsonValue::Array(a)) => Some(Rc::clone(a)),
            _ => None,
        }
    }

    /// The `value` payload of a boxed leaf, when present.
    pub fn value_slot(&self) -> Option<&JsonValue> {
        self.get(intern::META_VALUE)
    }

    /// The materialized entity attached by the build pass, if any.
    pub fn target(&self) -> Option<&Value> {
        self.target.as_ref()
    }
}
