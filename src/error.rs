//! Centralized error handling for jsonweave.
//!
//! Every failure in the codec surfaces as a single public type,
//! [`JsonError`], so callers match on one enum regardless of whether the
//! problem was found by the tokenizer, the graph builder, or the file
//! layer underneath.
//!
//! ## Design Philosophy
//!
//! 1. **No Panics:** All error conditions are represented as `Result`
//!    values. The crate enforces this through `#![deny(clippy::panic)]`
//!    and `#![deny(clippy::unwrap_used)]`.
//!
//! 2. **Positions where they exist:** Lexical and structural errors carry
//!    the 1-based byte position of the offending character, because those
//!    are the errors a human fixes by looking at the input.
//!
//! 3. **Cloneable Errors:** [`JsonError`] is `Clone`; I/O causes are
//!    wrapped in `Arc` so cloning stays cheap.
//!
//! ## Error Categories
//!
//! - **Lexical** ([`JsonError::Lexical`]): bad character, unterminated
//!   string, number too long; the token stream itself is broken.
//! - **Structural** ([`JsonError::Structural`]): tokens are fine but the
//!   JSON shape is not (missing `:`, object not closed).
//! - **Semantic** ([`JsonError::Semantic`]): well-formed JSON that cannot
//!   be interpreted: unknown type tag, `@items` missing on an array,
//!   a scalar that does not fit its declared slot.
//! - **Instantiation** ([`JsonError::Instantiation`]): a target type
//!   could not be constructed.
//! - **Reference** ([`JsonError::Reference`]): `@ref` ids left dangling
//!   after the patch pass.
//! - **Io** ([`JsonError::Io`]): the byte source or sink failed.

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for jsonweave operations.
pub type Result<T> = std::result::Result<T, JsonError>;

/// The master error enum covering all failure domains in jsonweave.
///
/// Lexical and structural failures abort the read immediately. A
/// dangling forward reference is logged and skipped during patching, and
/// the surviving set is then surfaced as one aggregate
/// [`JsonError::Reference`]. Partial results are never returned.
#[derive(Debug, Clone)]
pub enum JsonError {
    /// The tokenizer hit an unusable character sequence.
    Lexical {
        /// Human-readable description of what the tokenizer expected.
        message: String,
        /// 1-based byte position of the offending character.
        pos: u64,
    },

    /// The token stream was readable but violated JSON structure.
    Structural {
        /// Human-readable description of the structural violation.
        message: String,
        /// 1-based byte position of the offending character.
        pos: u64,
    },

    /// Well-formed input that cannot be mapped onto the target model.
    ///
    /// Covers unresolvable type tags, `@items` missing where an array is
    /// required, mismatched `@keys`/`@items` lengths, and scalar values
    /// that do not coerce to their declared slot.
    Semantic(String),

    /// A target type could not be constructed.
    Instantiation(String),

    /// One or more `@ref` ids never resolved to a defined `@id`.
    Reference(String),

    /// Low-level I/O failure from the underlying byte source or sink.
    ///
    /// The `io::Error` is wrapped in an `Arc` to keep the error `Clone`.
    Io(Arc<io::Error>),
}

impl JsonError {
    pub(crate) fn lexical(message: impl Into<String>, pos: u64) -> Self {
        Self::Lexical {
            message: message.into(),
            pos,
        }
    }

    pub(crate) fn structural(message: impl Into<String>, pos: u64) -> Self {
        Self::Structural {
            message: message.into(),
            pos,
        }
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical { message, pos } => {
                write!(f, "Lexical Error at byte {pos}: {message}")
            }
            Self::Structural { message, pos } => {
                write!(f, "Structural Error at byte {pos}: {message}")
            }
            Self::Semantic(s) => write!(f, "Semantic Error: {s}"),
            Self::Instantiation(s) => write!(f, "Instantiation Error: {s}"),
            Self::Reference(s) => write!(f, "Reference Error: {s}"),
            Self::Io(e) => write!(f, "I/O Error: {e}"),
        }
    }
}

impl std::error::Error for JsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for JsonError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
