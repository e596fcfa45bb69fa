//! Centralized error handling for relcode.
//!
//! All failure conditions are propagated through the `Result` type; the library
//! never panics on malformed runtime input. Errors are `Clone` so they can be
//! stored or shared across threads (I/O errors are wrapped in an `Arc`).
//!
//! ## Error Categories
//!
//! - **I/O Errors** ([`RelcodeError::Io`]): file access for saved archives
//! - **Type Errors** ([`RelcodeError::Type`]): a runtime value does not match the
//!   codec it was handed to (wrong variant, array length mismatch, non-hashable key)
//! - **Decode Errors** ([`RelcodeError::Decode`]): a buffer value outside the codec's
//!   domain (unknown discriminant, invalid UTF-8, invalid char scalar)
//! - **Internal Errors** ([`RelcodeError::Internal`]): logic errors such as a resolver
//!   produced by one codec being consumed by another (should not occur; report as bugs)
//!
//! There is no recovery policy: every operation either fully succeeds or fails
//! atomically with respect to the caller's observable state. On failure the caller
//! owns disposal of whatever was already flushed to the writer.

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for relcode operations.
pub type Result<T> = std::result::Result<T, RelcodeError>;

/// The master error enum covering all failure domains in relcode.
///
/// ## Cloneability
///
/// This type is `Clone` to support error sharing across threads and storage for
/// later analysis. I/O errors are wrapped in `Arc` to make cloning efficient.
#[derive(Debug, Clone)]
pub enum RelcodeError {
    /// Low-level I/O failure while saving or memory-mapping an archive file.
    ///
    /// The underlying `io::Error` is wrapped in an `Arc` to keep the error `Clone`.
    Io(Arc<io::Error>),

    /// A runtime value does not match the codec it was passed to.
    ///
    /// Typical causes: resolving a `Value::Str` through a vector codec, an enum
    /// value naming a variant the codec does not declare, a fixed-array value whose
    /// length differs from the codec's `N`, or using a non-hashable type as a hash
    /// map key. Detected synchronously during `archive`/`resolve`; the caller must
    /// discard whatever was already written.
    Type(String),

    /// A buffer contains a value outside the codec's defined domain.
    ///
    /// Typical causes: an enum discriminant with no corresponding variant, an
    /// externally-tagged union tag with no registered variant, invalid UTF-8 in a
    /// string slot, or an invalid Unicode scalar in a char slot. The engine never
    /// silently substitutes a default.
    Decode(String),

    /// Logic error in the codec engine itself.
    ///
    /// This should not occur in production. The usual cause is a `Resolver` being
    /// handed to a codec other than the one whose `archive` produced it.
    Internal(String),
}

impl fmt::Display for RelcodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Type(s) => write!(f, "Type Error: {s}"),
            Self::Decode(s) => write!(f, "Decode Error: {s}"),
            Self::Internal(s) => write!(f, "Internal Logic Error: {s}"),
        }
    }
}

impl std::error::Error for RelcodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for RelcodeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
