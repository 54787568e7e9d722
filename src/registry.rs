//! Type registration and the per-type descriptor cache.
//!
//! Rust has no runtime reflection, so every record type that
//! participates in a graph is described once, up front: its name, an
//! optional parent type, and its fields in declaration order, each with
//! a declared [`TypeSpec`]. The [`Registry`] owns those definitions and
//! memoizes the *flattened* view of each type (own fields first, then
//! ancestors walked upward), which is the ordering every writer and
//! reader pass observes. Field order is part of the wire contract:
//! identity ids are assigned in traversal order, and traversal order
//! follows field order.
//!
//! A field name shadowed by an ancestor keeps the position of its first
//! appearance and resolves to the ancestor's declaration (ordered-map
//! insert semantics).
//!
//! A definition may also carry a custom write hook and read hook, which
//! replace the per-field walk for that type, and a factory used in place
//! of default zero-filled construction.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{JsonError, Result};
use crate::tree::JsonObj;
use crate::value::{Obj, ObjRef, Record, Value};

/// Custom emission hook: writes the JSON field fragment for a record in
/// place of the per-field walk. The `@type` key has already been
/// written when the hook runs.
pub type WriteHook = Box<dyn Fn(&Record, &mut dyn io::Write) -> Result<()>>;

/// Custom build hook: populates a record from the intermediate field
/// map in place of the per-field walk.
pub type ReadHook = Box<dyn Fn(&mut Record, &JsonObj) -> Result<()>>;

/// Custom constructor, used in place of zero-filled construction.
pub type Factory = Box<dyn Fn() -> Result<ObjRef>>;

/// The declared type of a field, array component, or expected value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSpec {
    /// No declared type; nothing can be inferred from this slot.
    Any,
    /// `boolean`
    Bool,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `char`
    Char,
    /// `string`
    Str,
    /// `date` (epoch milliseconds)
    Date,
    /// `class` (type-identity value)
    Class,
    /// The builtin generic sequence container.
    List,
    /// The builtin generic mapping container.
    Map,
    /// The builtin hash-set container.
    Set,
    /// A fixed array of the given component type.
    Array(Box<TypeSpec>),
    /// A registered record type, by name.
    Record(Rc<str>),
}

impl TypeSpec {
    /// Shorthand for `TypeSpec::Record`.
    pub fn record(name: impl AsRef<str>) -> Self {
        Self::Record(Rc::from(name.as_ref()))
    }

    /// Shorthand for `TypeSpec::Array`.
    pub fn array(component: TypeSpec) -> Self {
        Self::Array(Box::new(component))
    }

    /// True for the leaf types: values treated as atomic scalars.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Byte
                | Self::Short
                | Self::Int
                | Self::Long
                | Self::Float
                | Self::Double
                | Self::Char
                | Self::Str
                | Self::Date
                | Self::Class
        )
    }

    /// The wire tag for this type: short names for leaves and builtin
    /// containers, the registered name for records, `object` for `Any`,
    /// and `<component>[]` for arrays.
    pub fn tag(&self) -> String {
        match self {
            Self::Any => "object".to_string(),
            Self::Bool => "boolean".to_string(),
            Self::Byte => "byte".to_string(),
            Self::Short => "short".to_string(),
            Self::Int => "int".to_string(),
            Self::Long => "long".to_string(),
            Self::Float => "float".to_string(),
            Self::Double => "double".to_string(),
            Self::Char => "char".to_string(),
            Self::Str => "string".to_string(),
            Self::Date => "date".to_string(),
            Self::Class => "class".to_string(),
            Self::List => "list".to_string(),
            Self::Map => "map".to_string(),
            Self::Set => "set".to_string(),
            Self::Array(c) => {
                let mut tag = c.tag();
                tag.push_str("[]");
                tag
            }
            Self::Record(name) => name.to_string(),
        }
    }

    /// Resolves a tag that does not require the registry: leaves,
    /// builtin containers, `object`, and arrays thereof.
    fn builtin_for_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "object" => Self::Any,
            "boolean" => Self::Bool,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "char" => Self::Char,
            "string" => Self::Str,
            "date" => Self::Date,
            "class" => Self::Class,
            "list" => Self::List,
            "map" => Self::Map,
            "set" => Self::Set,
            _ => return None,
        })
    }

    /// The zero value used when constructing instances and when coercing
    /// an empty string into a non-string leaf slot: 0 for numeric
    /// primitives, `false` for booleans, `'\0'` for chars, `Null` for
    /// everything reference-like.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Byte => Value::Byte(0),
            Self::Short => Value::Short(0),
            Self::Int => Value::Int(0),
            Self::Long => Value::Long(0),
            Self::Float => Value::Float(0.0),
            Self::Double => Value::Double(0.0),
            Self::Char => Value::Char('\0'),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

// --- RECORD DEFINITIONS ---

/// The registered description of one record type.
///
/// Built with a fluent API and handed to [`Registry::register`]:
///
/// ```
/// use jsonweave::{RecordDef, Registry, TypeSpec};
///
/// let mut registry = Registry::new();
/// registry.register(
///     RecordDef::new("Person")
///         .field("name", TypeSpec::Str)
///         .field("age", TypeSpec::Int),
/// )?;
/// registry.register(
///     RecordDef::new("Employee")
///         .extends("Person")
///         .field("company", TypeSpec::Str),
/// )?;
/// # Ok::<(), jsonweave::JsonError>(())
/// ```
pub struct RecordDef {
    name: Rc<str>,
    parent: Option<String>,
    fields: Vec<(Rc<str>, TypeSpec)>,
    write_hook: Option<WriteHook>,
    read_hook: Option<ReadHook>,
    factory: Option<Factory>,
}

impl RecordDef {
    /// Starts a definition for the named type.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Rc::from(name.as_ref()),
            parent: None,
            fields: Vec::new(),
            write_hook: None,
            read_hook: None,
            factory: None,
        }
    }

    /// Declares the parent type; its fields follow this type's own in
    /// the flattened descriptor.
    pub fn extends(mut self, parent: impl AsRef<str>) -> Self {
        self.parent = Some(parent.as_ref().to_string());
        self
    }

    /// Appends a field in declaration order.
    pub fn field(mut self, name: impl AsRef<str>, declared: TypeSpec) -> Self {
        self.fields.push((Rc::from(name.as_ref()), declared));
        self
    }

    /// Installs a custom write hook. Types with a write hook always emit
    /// `@type`, so the reader knows to dispatch to the read hook.
    pub fn write_hook(
        mut self,
        hook: impl Fn(&Record, &mut dyn io::Write) -> Result<()> + 'static,
    ) -> Self {
        self.write_hook = Some(Box::new(hook));
        self
    }

    /// Installs a custom read hook.
    pub fn read_hook(
        mut self,
        hook: impl Fn(&mut Record, &JsonObj) -> Result<()> + 'static,
    ) -> Self {
        self.read_hook = Some(Box::new(hook));
        self
    }

    /// Installs a factory used instead of zero-filled construction.
    pub fn factory(mut self, factory: impl Fn() -> Result<ObjRef> + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }
}

impl fmt::Debug for RecordDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDef")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("fields", &self.fields)
            .field("write_hook", &self.write_hook.is_some())
            .field("read_hook", &self.read_hook.is_some())
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

/// The flattened, memoized view of a record type: own fields first, then
/// ancestors walked upward, one entry per simple name.
#[derive(Debug)]
pub struct ClassDescriptor {
    name: Rc<str>,
    fields: IndexMap<Rc<str>, TypeSpec>,
}

impl ClassDescriptor {
    /// The type name.
    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    /// Fields in emission order.
    pub fn fields(&self) -> impl Iterator<Item = (&Rc<str>, &TypeSpec)> {
        self.fields.iter()
    }

    /// The declared type of a field, walking the (already flattened)
    /// ancestor chain.
    pub fn field_type(&self, field: &str) -> Option<&TypeSpec> {
        self.fields.get(field)
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the type declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// --- REGISTRY ---

/// The set of record types known to a reader/writer pair, plus the
/// memoized flattened descriptors.
///
/// The memo is populated lazily behind interior mutability and only ever
/// appended to; the registry itself is single-threaded, like everything
/// else in the crate.
pub struct Registry {
    defs: HashMap<Rc<str>, RecordDef>,
    memo: RefCell<HashMap<Rc<str>, Rc<ClassDescriptor>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            defs: HashMap::new(),
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Registers a record type.
    ///
    /// Names must be non-empty, must not collide with builtin tags, must
    /// not start with `@`, and must not end with `[]` (reserved for
    /// array tags). Re-registering a name is an error.
    pub fn register(&mut self, def: RecordDef) -> Result<()> {
        let name = Rc::clone(&def.name);
        if name.is_empty() {
            return Err(JsonError::Semantic("record type name is empty".into()));
        }
        if TypeSpec::builtin_for_tag(&name).is_some() {
            return Err(JsonError::Semantic(format!(
                "record type name '{name}' collides with a builtin tag"
            )));
        }
        if name.starts_with('@') || name.ends_with("[]") {
            return Err(JsonError::Semantic(format!(
                "record type name '{name}' uses reserved syntax"
            )));
        }
        if self.defs.contains_key(&*name) {
            return Err(JsonError::Semantic(format!(
                "record type '{name}' is already registered"
            )));
        }
        self.defs.insert(name, def);
        Ok(())
    }

    /// True when the name is a registered record type.
    pub fn is_registered(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// Resolves a wire tag to a [`TypeSpec`]: builtin tags, `T[]` array
    /// tags (recursively), or a registered record name.
    pub fn spec_for_tag(&self, tag: &str) -> Result<TypeSpec> {
        if tag.is_empty() {
            return Err(JsonError::Semantic("empty type tag".into()));
        }
        if let Some(component) = tag.strip_suffix("[]") {
            return Ok(TypeSpec::array(self.spec_for_tag(component)?));
        }
        if let Some(builtin) = TypeSpec::builtin_for_tag(tag) {
            return Ok(builtin);
        }
        match self.defs.get(tag) {
            Some(def) => Ok(TypeSpec::Record(Rc::clone(&def.name))),
            None => Err(JsonError::Semantic(format!(
                "type tag '{tag}' is not registered"
            ))),
        }
    }

    /// The flattened descriptor for a registered type, computed once and
    /// memoized.
    pub fn descriptor(&self, name: &str) -> Result<Rc<ClassDescriptor>> {
        if let Some(hit) = self.memo.borrow().get(name) {
            return Ok(Rc::clone(hit));
        }

        let descriptor = Rc::new(self.flatten(name)?);
        self.memo
            .borrow_mut()
            .insert(Rc::clone(&descriptor.name), Rc::clone(&descriptor));
        Ok(descriptor)
    }

    fn flatten(&self, name: &str) -> Result<ClassDescriptor> {
        let root = self
            .defs
            .get(name)
            .ok_or_else(|| JsonError::Semantic(format!("record type '{name}' is not registered")))?;

        let mut fields: IndexMap<Rc<str>, TypeSpec> = IndexMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = Some(root);

        while let Some(def) = current {
            if !seen.insert(&*def.name) {
                return Err(JsonError::Semantic(format!(
                    "inheritance cycle through record type '{}'",
                    def.name
                )));
            }
            for (field, declared) in &def.fields {
                // A shadowed name keeps its first position; the ancestor
                // declaration wins.
                fields.insert(Rc::clone(field), declared.clone());
            }
            current = match &def.parent {
                Some(parent) => Some(self.defs.get(parent.as_str()).ok_or_else(|| {
                    JsonError::Semantic(format!(
                        "record type '{}' extends unregistered type '{parent}'",
                        def.name
                    ))
                })?),
                None => None,
            };
        }

        Ok(ClassDescriptor {
            name: Rc::clone(&root.name),
            fields,
        })
    }

    /// Constructs an instance of the named type: the registered factory
    /// when present, otherwise a record whose declared fields hold their
    /// zero values.
    pub fn new_record(&self, name: &str) -> Result<ObjRef> {
        let def = self.defs.get(name).ok_or_else(|| {
            JsonError::Instantiation(format!("record type '{name}' is not registered"))
        })?;

        if let Some(factory) = &def.factory {
            return factory().map_err(|e| {
                JsonError::Instantiation(format!("factory for '{name}' failed: {e}"))
            });
        }

        let descriptor = self.descriptor(name)?;
        let mut record = Record::new(Rc::clone(&descriptor.name));
        for (field, declared) in descriptor.fields() {
            record.set(Rc::clone(field), declared.zero_value());
        }
        Ok(Rc::new(RefCell::new(Obj::Record(record))))
    }

    pub(crate) fn write_hook(&self, name: &str) -> Option<&WriteHook> {
        self.defs.get(name).and_then(|d| d.write_hook.as_ref())
    }

    pub(crate) fn read_hook(&self, name: &str) -> Option<&ReadHook> {
        self.defs.get(name).and_then(|d| d.read_hook.as_ref())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.defs.len())
            .finish()
    }
}
