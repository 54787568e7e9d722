//! Canonical instances for strings the wire format repeats endlessly.
//!
//! The literal table holds the meta-keys, the boolean/null tokens and
//! their common case variants, the yes/no/on/off family, the empty
//! string, and the single-digit numerals. Every string produced by the
//! parser is checked against this table; a hit returns the one canonical
//! `Rc<str>` for that literal, so a document containing ten thousand
//! `"true"` values allocates exactly one.
//!
//! The table is built on first use and never mutated afterwards. It is
//! thread-local because the canonical handles are `Rc` and the codec is
//! single-threaded per call; two threads each get their own (identical)
//! table.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Meta-key naming the concrete type of an object.
pub const META_TYPE: &str = "@type";
/// Meta-key carrying the integer identity of a shared object.
pub const META_ID: &str = "@id";
/// Meta-key referencing a previously or later defined `@id`.
pub const META_REF: &str = "@ref";
/// Meta-key holding the positional element sequence of a container.
pub const META_ITEMS: &str = "@items";
/// Meta-key holding the positional key sequence of a mapping.
pub const META_KEYS: &str = "@keys";
/// Key carrying the scalar payload of a boxed leaf.
pub const META_VALUE: &str = "value";

const LITERALS: &[&str] = &[
    "",
    "true", "false", "TRUE", "FALSE", "True", "False",
    "null",
    "yes", "no", "YES", "NO", "Yes", "No",
    "on", "off", "ON", "OFF", "On", "Off",
    META_TYPE, META_ID, META_REF, META_ITEMS, META_KEYS, META_VALUE,
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9",
];

thread_local! {
    static TABLE: OnceCell<HashMap<&'static str, Rc<str>>> = const { OnceCell::new() };
}

/// Returns an `Rc<str>` for `s`, reusing the canonical instance when `s`
/// is one of the cached literals.
pub(crate) fn intern(s: &str) -> Rc<str> {
    TABLE.with(|cell| {
        let table = cell.get_or_init(|| {
            LITERALS.iter().map(|&lit| (lit, Rc::from(lit))).collect()
        });
        match table.get(s) {
            Some(canon) => Rc::clone(canon),
            None => Rc::from(s),
        }
    })
}

/// True when `key` belongs to the reserved `@`-prefixed vocabulary.
#[inline]
pub(crate) fn is_meta_key(key: &str) -> bool {
    key.starts_with('@')
}
