//! # Relcode
//!
//! A zero-copy binary codec engine with alignment-exact layouts, relative
//! pointers, and lazy field access over memory-mapped archives.
//!
//! ## Overview
//!
//! Relcode encodes values into a flat archive buffer in which every composite
//! follows C-style aligned layout and every indirection is a signed 32-bit
//! *relative* pointer: the target is at `field_position + stored_delta`. The
//! buffer is therefore position-independent — it can be written to disk,
//! memory-mapped back, and read in place without any fix-up pass.
//!
//! ### Key Features
//!
//! *   **Bottom-up archives:** Dependencies are written before the values that
//!     reference them, so the root value always occupies the final bytes of
//!     the buffer and is found without a header or index.
//! *   **Alignment-exact layout:** Field offsets, sizes, and padding are
//!     computed exactly as a C compiler would place them, making every read a
//!     direct offset computation.
//! *   **Lazy Access:** [`Lazy`] views decode individual struct fields,
//!     vector elements, and tuple slots on demand, caching each slot after
//!     its first materialization.
//! *   **Swiss-table maps:** Hash maps and sets use a control-byte table with
//!     16-slot probe windows; the insertion-ordered variants add an entry
//!     array so iteration preserves insertion order.
//! *   **Bulk-loaded B-trees:** Ordered maps and sets are packed bottom-up
//!     into fixed-size nodes with relative child pointers.
//! *   **Runtime schemas:** [`TypeDescriptor`] values (serde-serializable, so
//!     a code generator can emit them as JSON) compile into codecs through a
//!     [`SchemaRegistry`], including mutually recursive type graphs.
//!
//! ## Architecture
//!
//! ### The two-phase encode protocol
//!
//! Every codec implements `archive` then `resolve`. `archive` writes
//! everything the value *points to* (string bytes, vector elements, table
//! buckets, tree nodes) and returns a [`Resolver`] token recording where that
//! data landed. `resolve` then writes the value's own fixed-size
//! representation, turning the recorded positions into relative pointers.
//! Composites fan both phases out over their children, which is what produces
//! the characteristic children-first buffer:
//!
//! ```text
//! [string bytes] [vector elements] ... [nested structs] [root value]
//! ```
//!
//! ### Reading
//!
//! Decoding is the mirror image: the root starts at
//! `buffer_length - root_size`, and every nested value is reached by offset
//! arithmetic plus relative-pointer hops. The eager path materializes a full
//! [`Value`] tree; the lazy path hands out [`Lazy`] views that defer nested
//! decoding until a field or element is actually requested.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relcode::{Relcode, RelcodeReader, SchemaRegistry, TypeDescriptor, Value};
//!
//! let registry = SchemaRegistry::new();
//! let codec = registry.build(&TypeDescriptor::Struct {
//!     name: "point".into(),
//!     fields: vec![
//!         FieldDescriptor { name: "x".into(), ty: TypeDescriptor::F64 },
//!         FieldDescriptor { name: "y".into(), ty: TypeDescriptor::F64 },
//!     ],
//! })?;
//!
//! let value = Value::Struct(vec![
//!     ("x".into(), Value::F64(42.5)),
//!     ("y".into(), Value::F64(-17.25)),
//! ]);
//! Relcode::save("point.bin", codec.as_ref(), &value)?;
//!
//! let reader = RelcodeReader::open("point.bin")?;
//! let lazy = reader.access_root(codec.as_ref())?;
//! assert_eq!(lazy.field("x")?, Value::F64(42.5));
//! ```
//!
//! ### Safety and Error Handling
//!
//! * **Encapsulated Unsafe:** `unsafe` appears only in the [`api`] module, to
//!   memory-map archive files.
//! * **No Panics:** Library code propagates [`RelcodeError`] instead of
//!   panicking, with one documented exception: using a forward-declared codec
//!   that was never defined is a construction-time programming error.
//! * **Trusted buffers:** Decoding assumes the archive was produced by this
//!   engine (or a layout-compatible one); truncated or corrupted buffers are
//!   a caller error, detected only where cheap (header count mismatches).

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod aggregate;
pub mod api;
pub mod btree;
pub mod codec;
pub mod container;
pub mod error;
pub mod lazy;
pub mod primitive;
pub mod schema;
pub mod string;
pub mod swiss;
pub mod value;

// --- INTERNAL IMPLEMENTATION MODULES ---
#[doc(hidden)]
pub mod buffer;
#[doc(hidden)]
pub mod hash;
#[doc(hidden)]
pub mod layout;

// --- RE-EXPORTS ---

pub use api::{Relcode, RelcodeReader};
pub use codec::{access_root, decode_root, encode_to_vec, Codec, CodecRef, LazyCodec, Resolver};
pub use error::{RelcodeError, Result};
pub use lazy::Lazy;
pub use schema::{FieldDescriptor, SchemaRegistry, TypeDescriptor, VariantDescriptor};
pub use value::Value;
