//! The dynamic value model.
//!
//! Codecs are built at runtime from schema descriptors, so the values they
//! encode and decode are dynamic as well. [`Value`] is the closed set of shapes
//! the format can express. It is `Serialize` so decoded archives can be dumped
//! as JSON and compared against fixtures.

use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::error::{RelcodeError, Result};

/// A dynamically-typed value accepted and produced by codecs.
///
/// Container variants hold their logical contents only; all layout concerns
/// (padding, pointers, discriminant widths) live in the codecs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The zero-size unit type. Also the payload of unit enum variants and the
    /// value type of set collections.
    Unit,
    /// A boolean.
    Bool(bool),
    /// Signed 8-bit integer.
    I8(i8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// A Unicode scalar value (4 bytes on the wire).
    Char(char),
    /// A UTF-8 string.
    Str(String),
    /// Homogeneous sequence: vectors, fixed arrays and set members.
    List(Vec<Value>),
    /// Heterogeneous positional sequence.
    Tuple(Vec<Value>),
    /// Named fields in declaration order.
    Struct(Vec<(String, Value)>),
    /// An optional (or weak-pointer) value.
    Option(Option<Box<Value>>),
    /// An enum or union variant, identified by name. Unit variants carry
    /// `Value::Unit` as their payload.
    Variant(String, Box<Value>),
    /// Key/value entries. Iteration order is the insertion order supplied by
    /// the caller; ordered-map codecs require it to already be key-sorted.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Short name of the value's shape, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Char(_) => "char",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Struct(_) => "struct",
            Self::Option(_) => "option",
            Self::Variant(..) => "variant",
            Self::Map(_) => "map",
        }
    }

    /// Looks up a struct field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The elements of a list, tuple or struct (values only), if any.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Borrows the string contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the map entries.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub(crate) fn expect_list(&self, what: &str) -> Result<&[Value]> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(RelcodeError::Type(format!(
                "{what} expects a list value, got {}",
                other.kind()
            ))),
        }
    }

    pub(crate) fn expect_map(&self, what: &str) -> Result<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Ok(entries),
            other => Err(RelcodeError::Type(format!(
                "{what} expects a map value, got {}",
                other.kind()
            ))),
        }
    }
}

// JSON shape convention for fixture dumps: structs become objects, variants
// become `{tag, value}` objects, maps become arrays of pairs (JSON objects
// would silently stringify non-string keys).
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Unit => serializer.serialize_unit(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::I8(v) => serializer.serialize_i8(*v),
            Self::I16(v) => serializer.serialize_i16(*v),
            Self::I32(v) => serializer.serialize_i32(*v),
            Self::I64(v) => serializer.serialize_i64(*v),
            Self::U8(v) => serializer.serialize_u8(*v),
            Self::U16(v) => serializer.serialize_u16(*v),
            Self::U32(v) => serializer.serialize_u32(*v),
            Self::U64(v) => serializer.serialize_u64(*v),
            Self::F32(v) => serializer.serialize_f32(*v),
            Self::F64(v) => serializer.serialize_f64(*v),
            Self::Char(v) => serializer.serialize_char(*v),
            Self::Str(v) => serializer.serialize_str(v),
            Self::List(items) | Self::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Struct(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            Self::Option(opt) => match opt {
                Some(inner) => serializer.serialize_some(inner.as_ref()),
                None => serializer.serialize_none(),
            },
            Self::Variant(tag, payload) => {
                let mut s = serializer.serialize_struct("Variant", 2)?;
                s.serialize_field("tag", tag)?;
                s.serialize_field("value", payload.as_ref())?;
                s.end()
            }
            Self::Map(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for pair in entries {
                    seq.serialize_element(pair)?;
                }
                seq.end()
            }
        }
    }
}

// --- CONVERSIONS ---

macro_rules! impl_from_primitive {
    ($($variant:ident: $t:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive!(
    Bool: bool,
    I8: i8,
    I16: i16,
    I32: i32,
    I64: i64,
    U8: u8,
    U16: u16,
    U32: u32,
    U64: u64,
    F32: f32,
    F64: f64,
    Char: char,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}
