//! Runtime schema descriptors and the registry that turns them into codecs.
//!
//! Descriptors are plain data (serde-serializable, so a code generator or a
//! sidecar JSON file can produce them) describing a type shape; the registry
//! compiles a descriptor tree into the corresponding [`CodecRef`] composition.
//! Named references plus the declare/define pair support mutually recursive
//! type graphs.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::{EnumCodec, EnumVariant, StructCodec};
use crate::btree::{BTreeMapCodec, BTreeSetCodec};
use crate::codec::{CodecRef, LazyCodec};
use crate::container::{ArrayCodec, BoxCodec, OptionCodec, TupleCodec, VectorCodec, WeakCodec};
use crate::error::{RelcodeError, Result};
use crate::primitive::{primitive, PrimitiveKind};
use crate::string::StringCodec;
use crate::swiss::{HashMapCodec, HashSetCodec, IndexMapCodec, IndexSetCodec};

/// A named struct field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: TypeDescriptor,
}

/// A declared enum variant, with an optional payload type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    /// Variant name.
    pub name: String,
    /// Payload type, absent for unit variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<TypeDescriptor>,
}

/// A serializable description of a wire type.
///
/// The JSON form is externally tagged on `kind`, e.g.
/// `{"kind": "vector", "element": {"kind": "u32"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDescriptor {
    /// Zero-size unit.
    Unit,
    /// Single-byte boolean.
    Bool,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// 4-byte Unicode scalar.
    Char,
    /// Inline-or-out-of-line UTF-8 string.
    String,
    /// Growable sequence.
    Vector {
        /// Element type.
        element: Box<TypeDescriptor>,
    },
    /// Optional value.
    Option {
        /// Payload type.
        payload: Box<TypeDescriptor>,
    },
    /// Owned out-of-line indirection.
    Boxed {
        /// Target type.
        target: Box<TypeDescriptor>,
    },
    /// Nullable out-of-line indirection.
    Weak {
        /// Target type.
        target: Box<TypeDescriptor>,
    },
    /// Fixed-length inline array.
    Array {
        /// Element type.
        element: Box<TypeDescriptor>,
        /// Element count.
        len: usize,
    },
    /// Heterogeneous positional fields.
    Tuple {
        /// Field types in order.
        fields: Vec<TypeDescriptor>,
    },
    /// Named-field struct.
    Struct {
        /// Struct name.
        name: String,
        /// Fields in declaration order.
        fields: Vec<FieldDescriptor>,
    },
    /// Tagged enum with auto-sized discriminant.
    Enum {
        /// Enum name.
        name: String,
        /// Variants in declaration order.
        variants: Vec<VariantDescriptor>,
    },
    /// Swiss-table hash map.
    HashMap {
        /// Key type (must be hashable).
        key: Box<TypeDescriptor>,
        /// Value type.
        value: Box<TypeDescriptor>,
    },
    /// Swiss-table hash set.
    HashSet {
        /// Element type (must be hashable).
        element: Box<TypeDescriptor>,
    },
    /// Insertion-ordered hash map.
    IndexMap {
        /// Key type (must be hashable).
        key: Box<TypeDescriptor>,
        /// Value type.
        value: Box<TypeDescriptor>,
    },
    /// Insertion-ordered hash set.
    IndexSet {
        /// Element type (must be hashable).
        element: Box<TypeDescriptor>,
    },
    /// Bulk-loaded ordered map.
    BTreeMap {
        /// Key type.
        key: Box<TypeDescriptor>,
        /// Value type.
        value: Box<TypeDescriptor>,
        /// Branching factor override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branching: Option<usize>,
    },
    /// Bulk-loaded ordered set.
    BTreeSet {
        /// Element type.
        element: Box<TypeDescriptor>,
        /// Branching factor override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branching: Option<usize>,
    },
    /// Reference to a registered or declared type by name.
    Named {
        /// Registry name.
        name: String,
    },
}

/// Compiles [`TypeDescriptor`] trees into codecs and resolves named
/// references.
///
/// Recursive type graphs use [`SchemaRegistry::declare`] to obtain a forward
/// handle, then [`SchemaRegistry::define`] once the descriptor is available.
/// Encoding through a declared-but-undefined handle panics; see
/// [`LazyCodec`].
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    codecs: HashMap<String, CodecRef>,
    pending: HashMap<String, Arc<LazyCodec>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-built codec (typically a hand-written custom codec)
    /// under a name, making it reachable from `Named` descriptors.
    pub fn register(&mut self, name: impl Into<String>, codec: CodecRef) {
        self.codecs.insert(name.into(), codec);
    }

    /// Forward-declares a named type and returns its handle.
    ///
    /// The handle is usable inside later descriptors immediately; it must be
    /// completed with [`SchemaRegistry::define`] before any encode or decode
    /// touches it.
    pub fn declare(&mut self, name: impl Into<String>) -> CodecRef {
        let name = name.into();
        let lazy = LazyCodec::declare(name.clone());
        self.pending.insert(name.clone(), lazy.clone());
        let handle: CodecRef = lazy;
        self.codecs.insert(name, handle.clone());
        handle
    }

    /// Compiles `descriptor` and binds it to `name`.
    ///
    /// If `name` was forward-declared, this completes the declaration and all
    /// handles already handed out become usable.
    pub fn define(&mut self, name: &str, descriptor: &TypeDescriptor) -> Result<CodecRef> {
        let codec = self.build(descriptor)?;
        match self.pending.remove(name) {
            Some(lazy) => {
                lazy.define(codec)?;
                Ok(self.codecs[name].clone())
            }
            None => {
                self.codecs.insert(name.to_owned(), codec.clone());
                Ok(codec)
            }
        }
    }

    /// Looks up a previously registered, declared or defined codec.
    pub fn get(&self, name: &str) -> Option<CodecRef> {
        self.codecs.get(name).cloned()
    }

    /// Compiles a descriptor tree into a codec without binding a name.
    ///
    /// `Named` references resolve against this registry; an unknown name is a
    /// `Type` error.
    pub fn build(&self, descriptor: &TypeDescriptor) -> Result<CodecRef> {
        use TypeDescriptor as T;
        Ok(match descriptor {
            T::Unit => primitive(PrimitiveKind::Unit),
            T::Bool => primitive(PrimitiveKind::Bool),
            T::I8 => primitive(PrimitiveKind::I8),
            T::I16 => primitive(PrimitiveKind::I16),
            T::I32 => primitive(PrimitiveKind::I32),
            T::I64 => primitive(PrimitiveKind::I64),
            T::U8 => primitive(PrimitiveKind::U8),
            T::U16 => primitive(PrimitiveKind::U16),
            T::U32 => primitive(PrimitiveKind::U32),
            T::U64 => primitive(PrimitiveKind::U64),
            T::F32 => primitive(PrimitiveKind::F32),
            T::F64 => primitive(PrimitiveKind::F64),
            T::Char => primitive(PrimitiveKind::Char),
            T::String => Arc::new(StringCodec::new()),
            T::Vector { element } => Arc::new(VectorCodec::new(self.build(element)?)),
            T::Option { payload } => Arc::new(OptionCodec::new(self.build(payload)?)),
            T::Boxed { target } => Arc::new(BoxCodec::new(self.build(target)?)),
            T::Weak { target } => Arc::new(WeakCodec::new(self.build(target)?)),
            T::Array { element, len } => Arc::new(ArrayCodec::new(self.build(element)?, *len)),
            T::Tuple { fields } => {
                let fields = fields
                    .iter()
                    .map(|f| self.build(f))
                    .collect::<Result<Vec<_>>>()?;
                Arc::new(TupleCodec::new(fields))
            }
            T::Struct { name, fields } => {
                let fields = fields
                    .iter()
                    .map(|f| Ok((f.name.clone(), self.build(&f.ty)?)))
                    .collect::<Result<Vec<_>>>()?;
                Arc::new(StructCodec::new(name.clone(), fields))
            }
            T::Enum { name, variants } => {
                let variants = variants
                    .iter()
                    .map(|v| {
                        Ok(match &v.payload {
                            Some(payload) => {
                                EnumVariant::with_payload(v.name.clone(), self.build(payload)?)
                            }
                            None => EnumVariant::unit(v.name.clone()),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Arc::new(EnumCodec::new(name.clone(), variants))
            }
            T::HashMap { key, value } => {
                Arc::new(HashMapCodec::new(self.build(key)?, self.build(value)?))
            }
            T::HashSet { element } => Arc::new(HashSetCodec::new(self.build(element)?)),
            T::IndexMap { key, value } => {
                Arc::new(IndexMapCodec::new(self.build(key)?, self.build(value)?))
            }
            T::IndexSet { element } => Arc::new(IndexSetCodec::new(self.build(element)?)),
            T::BTreeMap {
                key,
                value,
                branching,
            } => {
                let key = self.build(key)?;
                let value = self.build(value)?;
                Arc::new(match branching {
                    Some(b) => BTreeMapCodec::with_branching(key, value, *b),
                    None => BTreeMapCodec::new(key, value),
                })
            }
            T::BTreeSet { element, branching } => {
                let element = self.build(element)?;
                Arc::new(match branching {
                    Some(b) => BTreeSetCodec::with_branching(element, *b),
                    None => BTreeSetCodec::new(element),
                })
            }
            T::Named { name } => self.codecs.get(name).cloned().ok_or_else(|| {
                RelcodeError::Type(format!("unknown type name '{name}' in descriptor"))
            })?,
        })
    }
}
