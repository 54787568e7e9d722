//! High-level entry points.
//!
//! [`Jsonweave`] bundles the common call patterns: string in/out, any
//! `io::Write` sink, whole files, and the untyped intermediate form.
//! Everything here is a thin layer over [`GraphWriter`] and
//! [`GraphReader`].

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::constants::DEFAULT_BUFFER_SIZE;
use crate::error::{JsonError, Result};
use crate::parse;
use crate::reader::GraphReader;
use crate::registry::Registry;
use crate::tree::JsonValue;
use crate::value::Value;
use crate::writer::GraphWriter;

/// The facade: one-call encode/decode in all the usual shapes.
///
/// ```
/// use jsonweave::{Jsonweave, RecordDef, Registry, TypeSpec, Value};
///
/// let mut registry = Registry::new();
/// registry.register(
///     RecordDef::new("Point")
///         .field("x", TypeSpec::Int)
///         .field("y", TypeSpec::Int),
/// )?;
///
/// let point = registry.new_record("Point")?;
/// point.borrow_mut().set("x", Value::Int(3));
/// point.borrow_mut().set("y", Value::Int(4));
///
/// let json = Jsonweave::encode(&registry, &Value::Obj(point))?;
/// assert_eq!(json, r#"{"@type":"Point","x":3,"y":4}"#);
///
/// let back = Jsonweave::decode(&registry, &json)?;
/// let obj = back.as_obj().expect("a record");
/// assert_eq!(obj.borrow().get("y"), Some(Value::Int(4)));
/// # Ok::<(), jsonweave::JsonError>(())
/// ```
#[derive(Debug, Default)]
pub struct Jsonweave;

impl Jsonweave {
    /// Encodes a graph to a JSON string.
    pub fn encode(registry: &Registry, graph: &Value) -> Result<String> {
        let mut buf = Vec::with_capacity(DEFAULT_BUFFER_SIZE);
        GraphWriter::new(registry, &mut buf).write(graph)?;
        String::from_utf8(buf)
            .map_err(|e| JsonError::from(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Encodes a graph to any byte sink, buffered, as UTF-8.
    pub fn encode_to<W: Write>(registry: &Registry, graph: &Value, sink: W) -> Result<()> {
        let buffered = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, sink);
        GraphWriter::new(registry, buffered).write(graph)
    }

    /// Decodes a JSON string into a graph.
    pub fn decode(registry: &Registry, json: &str) -> Result<Value> {
        GraphReader::new(registry).read(json)
    }

    /// Decodes UTF-8 bytes into a graph.
    pub fn decode_bytes(registry: &Registry, bytes: &[u8]) -> Result<Value> {
        Self::decode(registry, from_utf8(bytes)?)
    }

    /// Parses a document into the intermediate tree without
    /// instantiating any target types. Records come back as ordered
    /// field maps, arrays as sequences, and every `@`-key is an ordinary
    /// entry.
    pub fn decode_untyped(json: &str) -> Result<JsonValue> {
        parse::parse(json).map(|parsed| parsed.root)
    }

    /// Encodes a graph into a file.
    pub fn save<P: AsRef<Path>>(registry: &Registry, graph: &Value, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = GraphWriter::new(registry, BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));
        writer.write(graph)?;
        writer.into_inner().flush()?;
        Ok(())
    }

    /// Decodes a graph from a file.
    ///
    /// With the default `mmap` feature the file is memory-mapped and
    /// parsed in place; without it, the bytes are read onto the heap
    /// first.
    #[cfg(feature = "mmap")]
    pub fn load<P: AsRef<Path>>(registry: &Registry, path: P) -> Result<Value> {
        let file = File::open(path)?;
        // Safety contract of mmap: the file must not be mutated while
        // mapped. Documents are treated as immutable during a load.
        #[allow(unsafe_code)]
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Self::decode(registry, from_utf8(&map)?)
    }

    /// Decodes a graph from a file.
    #[cfg(not(feature = "mmap"))]
    pub fn load<P: AsRef<Path>>(registry: &Registry, path: P) -> Result<Value> {
        let bytes = std::fs::read(path)?;
        Self::decode_bytes(registry, &bytes)
    }
}

fn from_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| {
        JsonError::lexical(
            "input is not valid UTF-8",
            e.valid_up_to() as u64 + 1,
        )
    })
}
