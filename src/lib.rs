//! # jsonweave
//!
//! A graph-aware JSON codec: serialize arbitrary in-memory object
//! graphs, including cyclic references, shared (aliased) subgraphs, and
//! heterogeneous arrays, to compact standard JSON, and rebuild them
//! losslessly. No
//! marker traits, no schemas, no derive requirements on participating
//! types.
//!
//! ## Overview
//!
//! Plain JSON loses three things about an object graph: concrete runtime
//! types, object identity, and the difference between a fixed array and
//! a record. jsonweave records exactly that missing information with a
//! small meta-key vocabulary and nothing more:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `@type`  | concrete type tag (short names for leaves, registered names otherwise) |
//! | `@id`    | integer identity, present only on nodes referenced more than once |
//! | `@ref`   | reference to a previously or later defined `@id` |
//! | `@items` | positional elements of arrays, sequences, and mappings |
//! | `@keys`  | positional keys, paired with `@items`, for non-string-keyed mappings |
//! | `value`  | scalar payload of a boxed leaf, e.g. `{"@type":"int","value":7}` |
//!
//! Everything inferable from context is left out: a field whose declared
//! type matches its value's runtime type gets no `@type`, an unshared
//! node gets no `@id`, and a plain `[1,2,3]` stays a plain `[1,2,3]`.
//!
//! ## Architecture
//!
//! Four components, leaves first:
//!
//! - **[`registry`]**: since Rust has no runtime reflection, record
//!   types are described once through a registration API. The
//!   [`Registry`] memoizes each type's flattened field list (own fields
//!   first, then ancestors); that ordering is part of the wire contract.
//! - **[`parse`] / [`tree`]**: a streaming JSON parser with one
//!   character of pushback that builds the intermediate tree directly
//!   and records every `@id` it passes. Deeply nested arrays are parsed
//!   with an explicit work stack, never host recursion.
//! - **[`writer`]**: two passes, an identity trace that discovers
//!   multiply-referenced nodes and assigns ids, then emission with
//!   `@id` only on shared nodes and `@ref` for back and forward edges.
//! - **[`reader`]**: instantiates targets from the intermediate tree,
//!   coerces primitives through a fixed matrix, queues forward
//!   references, and patches them in a single post-pass.
//!
//! ## Example
//!
//! ```
//! use jsonweave::{Jsonweave, RecordDef, Registry, TypeSpec, Value};
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     RecordDef::new("Node")
//!         .field("name", TypeSpec::Str)
//!         .field("next", TypeSpec::record("Node")),
//! )?;
//!
//! // A two-node cycle: a -> b -> a.
//! let a = registry.new_record("Node")?;
//! let b = registry.new_record("Node")?;
//! a.borrow_mut().set("name", Value::from("a"));
//! a.borrow_mut().set("next", Value::Obj(b.clone()));
//! b.borrow_mut().set("name", Value::from("b"));
//! b.borrow_mut().set("next", Value::Obj(a.clone()));
//!
//! let json = Jsonweave::encode(&registry, &Value::Obj(a))?;
//! assert!(json.contains("\"@id\":1"));
//! assert!(json.contains("{\"@ref\":1}"));
//!
//! // The cycle survives the round trip.
//! let decoded = Jsonweave::decode(&registry, &json)?;
//! # let _ = decoded;
//! # Ok::<(), jsonweave::JsonError>(())
//! ```
//!
//! ## Scope and guarantees
//!
//! - Output is standard JSON, UTF-8 on both sides.
//! - Reader and writer are deterministic: ids are assigned in
//!   traversal order, and field order is a function of the type alone.
//! - Single-threaded by design: graphs are `Rc`-based, instances are
//!   not `Sync`, and every table is per-call. The only process-wide
//!   state, the literal intern cache and the registry's descriptor
//!   memo, is immutable after population.
//! - A decoded cyclic graph is a cycle of `Rc`s; breaking or leaking it
//!   is the caller's decision, the codec keeps no references.
//! - No pretty-printing, no schema layer, no streaming pull API: the
//!   reader always materializes the full intermediate tree first.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod error;
pub mod reader;
pub mod registry;
pub mod tree;
pub mod value;
pub mod writer;

// --- INTERNAL IMPLEMENTATION MODULES ---
#[doc(hidden)]
pub mod parse;

mod intern;

// --- RE-EXPORTS ---

pub use api::Jsonweave;
pub use error::{JsonError, Result};
pub use reader::GraphReader;
pub use registry::{ClassDescriptor, RecordDef, Registry, TypeSpec};
pub use tree::{JsonObj, JsonValue};
pub use value::{Array, Date, Obj, ObjRef, Record, Value};
pub use writer::GraphWriter;

/// Constants used throughout the library.
pub mod constants {
    /// Default buffer size for I/O operations.
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

    /// Fixed capacity of the number scanner; longer numbers are a
    /// lexical error.
    pub const MAX_NUMBER_LENGTH: usize = 256;
}
