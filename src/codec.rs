//! The core codec protocol: two-phase archive/resolve encoding, eager decode,
//! lazy access, and the recursion wrapper for self-referential type graphs.
//!
//! A codec is an immutable, reusable descriptor for one type. Composing codecs
//! (e.g. a vector of a struct of strings) produces a new codec that owns no
//! mutable state and may be shared freely across threads and reused across any
//! number of encode/decode calls.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use crate::buffer::{Reader, Writer};
use crate::error::{RelcodeError, Result};
use crate::hash::FxHasher64;
use crate::lazy::Lazy;
use crate::value::Value;

/// A shared, type-erased codec handle.
pub type CodecRef = Arc<dyn Codec>;

/// Opaque per-encode token produced by `archive` and consumed by the matching
/// `resolve` call.
///
/// It carries the positions of already-written dependent data (an out-of-line
/// string's bytes, a vector's element block, a hash table's control array...).
/// A resolver is scoped to a single encode call and must be fed back to the
/// codec instance that produced it.
#[derive(Debug, Clone)]
pub enum Resolver {
    /// No dependencies were written.
    None,
    /// A single dependency position (box target, vector data start, control
    /// array, tree root...).
    Pos(usize),
    /// An out-of-line byte run: position and length.
    OutOfLine {
        /// Absolute position of the first dependency byte.
        pos: usize,
        /// Length of the dependency run in bytes.
        len: usize,
    },
    /// One resolver per child, in declaration order.
    Fields(Vec<Resolver>),
    /// Resolver for a present optional payload, or `None` for absent.
    Option(Option<Box<Resolver>>),
}

impl Resolver {
    pub(crate) fn into_fields(self, what: &str) -> Result<Vec<Resolver>> {
        match self {
            Self::Fields(fields) => Ok(fields),
            _ => Err(RelcodeError::Internal(format!(
                "{what} received a foreign resolver"
            ))),
        }
    }

    pub(crate) fn into_pos(self, what: &str) -> Result<usize> {
        match self {
            Self::Pos(pos) => Ok(pos),
            _ => Err(RelcodeError::Internal(format!(
                "{what} received a foreign resolver"
            ))),
        }
    }
}

/// The five-operation contract every wire type implements.
///
/// `size` and `align` are pure functions of the codec's construction arguments
/// and never change. `archive` writes everything the value *depends on* but not
/// the value's own fixed-size representation; `resolve` writes that
/// representation at the writer's current (already aligned) position, using the
/// resolver to compute relative pointers back to the archived dependencies.
pub trait Codec: fmt::Debug + Send + Sync {
    /// Fixed byte size of this type's representation.
    fn size(&self) -> usize;

    /// Byte alignment of this type's representation (>= 1).
    fn align(&self) -> usize;

    /// Phase one: writes the value's dependencies and returns their positions.
    ///
    /// For types with no dependencies (all primitives) this is a no-op
    /// returning [`Resolver::None`].
    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver>;

    /// Phase two: writes the value's own `size()` bytes at the writer's current
    /// position (which the caller has aligned to `align()`) and returns that
    /// position.
    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize>;

    /// Convenience: archive, align, resolve. Returns the value's position.
    fn encode(&self, writer: &mut Writer, value: &Value) -> Result<usize> {
        let resolver = self.archive(writer, value)?;
        writer.align(self.align());
        self.resolve(writer, value, resolver)
    }

    /// Eagerly materializes the full value at `offset`.
    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value>;

    /// Returns a read-through view deferring nested decoding until accessed.
    ///
    /// Codecs with nothing to defer (primitives, strings, hash and tree maps
    /// where iteration already visits every entry) degenerate to `decode`.
    fn access<'a>(&self, reader: Reader<'a>, offset: usize) -> Result<Lazy<'a>> {
        Ok(Lazy::Eager(self.decode(reader, offset)?))
    }

    /// Feeds a key value into the split hash used by the hash-table engine.
    ///
    /// Only primitive and string codecs are hashable; everything else rejects
    /// use as a hash map key.
    fn hash_key(&self, value: &Value, hasher: &mut FxHasher64) -> Result<()> {
        let _ = (value, hasher);
        Err(RelcodeError::Type(format!(
            "{self:?} cannot be used as a hash key"
        )))
    }
}

// --- ROOT ENTRY POINTS ---

/// Encodes `value` as an archive: dependencies first, the root value last, so
/// the root ends at the highest buffer offset.
pub fn encode_to_vec(codec: &dyn Codec, value: &Value) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    codec.encode(&mut writer, value)?;
    Ok(writer.finish())
}

/// Decodes the root value of an archive: it starts at
/// `buffer_length - codec.size()` and ends at the final byte.
pub fn decode_root(codec: &dyn Codec, bytes: &[u8]) -> Result<Value> {
    let reader = Reader::new(bytes);
    codec.decode(reader, reader.root_pos(codec.size()))
}

/// Builds a lazy view over the root value of an archive.
pub fn access_root<'a>(codec: &dyn Codec, bytes: &'a [u8]) -> Result<Lazy<'a>> {
    let reader = Reader::new(bytes);
    codec.access(reader, reader.root_pos(codec.size()))
}

// --- RECURSION WRAPPER ---

type Supplier = Box<dyn Fn() -> CodecRef + Send + Sync>;

/// A codec whose inner codec is produced on first use and memoized.
///
/// This is the sole mechanism for self-referential type graphs: eager
/// composition of a struct containing a vector of itself would not terminate.
/// Create one with [`LazyCodec::new`] (supplier-driven) or
/// [`LazyCodec::declare`] + [`LazyCodec::define`] (forward declaration).
///
/// # Panics
///
/// Using a declared-but-never-defined codec is a construction-time programming
/// error and panics with a descriptive message.
pub struct LazyCodec {
    name: String,
    supplier: Mutex<Option<Supplier>>,
    inner: OnceLock<CodecRef>,
}

impl fmt::Debug for LazyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCodec")
            .field("name", &self.name)
            .field("resolved", &self.inner.get().is_some())
            .finish()
    }
}

impl LazyCodec {
    /// Wraps a zero-argument supplier; the supplied codec is built on first use.
    pub fn new(name: impl Into<String>, supplier: impl Fn() -> CodecRef + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            supplier: Mutex::new(Some(Box::new(supplier))),
            inner: OnceLock::new(),
        })
    }

    /// Forward-declares a codec to be defined later with [`LazyCodec::define`].
    pub fn declare(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            supplier: Mutex::new(None),
            inner: OnceLock::new(),
        })
    }

    /// Supplies the inner codec for a forward declaration.
    ///
    /// Returns an `Internal` error if the codec was already defined or already
    /// forced through its supplier.
    pub fn define(&self, codec: CodecRef) -> Result<()> {
        self.inner.set(codec).map_err(|_| {
            RelcodeError::Internal(format!("lazy codec '{}' defined twice", self.name))
        })
    }

    fn inner(&self) -> &CodecRef {
        self.inner.get_or_init(|| {
            let supplier = self
                .supplier
                .lock()
                .ok()
                .and_then(|mut slot| slot.take());
            match supplier {
                Some(build) => build(),
                None => panic!(
                    "lazy codec '{}' used before being defined; call define() first",
                    self.name
                ),
            }
        })
    }
}

impl Codec for LazyCodec {
    fn size(&self) -> usize {
        self.inner().size()
    }

    fn align(&self) -> usize {
        self.inner().align()
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        self.inner().archive(writer, value)
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        self.inner().resolve(writer, value, resolver)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        self.inner().decode(reader, offset)
    }

    fn access<'a>(&self, reader: Reader<'a>, offset: usize) -> Result<Lazy<'a>> {
        self.inner().access(reader, offset)
    }

    fn hash_key(&self, value: &Value, hasher: &mut FxHasher64) -> Result<()> {
        self.inner().hash_key(value, hasher)
    }
}
