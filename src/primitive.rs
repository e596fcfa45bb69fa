//! Fixed-width primitive codecs.
//!
//! Size and alignment equal the natural width (char is a 4-byte Unicode scalar
//! value). `archive` is a no-op for all of them; integer-like kinds are
//! hashable and feed the hash engine one word of their width.

use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::codec::{Codec, CodecRef, Resolver};
use crate::error::{RelcodeError, Result};
use crate::hash::FxHasher64;
use crate::value::Value;

/// The fixed-width primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PrimitiveKind {
    /// Zero-size unit type.
    Unit,
    /// 1-byte boolean (0 or 1 on the wire).
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
    /// 4-byte Unicode scalar value.
    Char,
}

impl PrimitiveKind {
    fn width(self) -> usize {
        match self {
            Self::Unit => 0,
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 | Self::Char => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }
}

/// Codec for a single fixed-width primitive.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveCodec {
    kind: PrimitiveKind,
}

impl PrimitiveCodec {
    /// Creates the codec for `kind`.
    pub fn new(kind: PrimitiveKind) -> Self {
        Self { kind }
    }

    /// The primitive kind this codec encodes.
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    fn mismatch(&self, value: &Value) -> RelcodeError {
        RelcodeError::Type(format!(
            "primitive codec {:?} cannot encode a {} value",
            self.kind,
            value.kind()
        ))
    }
}

impl Codec for PrimitiveCodec {
    fn size(&self) -> usize {
        self.kind.width()
    }

    fn align(&self) -> usize {
        self.kind.width().max(1)
    }

    fn archive(&self, _writer: &mut Writer, _value: &Value) -> Result<Resolver> {
        Ok(Resolver::None)
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, _resolver: Resolver) -> Result<usize> {
        let pos = writer.pos();
        match (self.kind, value) {
            (PrimitiveKind::Unit, Value::Unit) => {}
            (PrimitiveKind::Bool, Value::Bool(v)) => writer.write_bool(*v),
            (PrimitiveKind::I8, Value::I8(v)) => writer.write_i8(*v),
            (PrimitiveKind::I16, Value::I16(v)) => writer.write_i16(*v),
            (PrimitiveKind::I32, Value::I32(v)) => writer.write_i32(*v),
            (PrimitiveKind::I64, Value::I64(v)) => writer.write_i64(*v),
            (PrimitiveKind::U8, Value::U8(v)) => writer.write_u8(*v),
            (PrimitiveKind::U16, Value::U16(v)) => writer.write_u16(*v),
            (PrimitiveKind::U32, Value::U32(v)) => writer.write_u32(*v),
            (PrimitiveKind::U64, Value::U64(v)) => writer.write_u64(*v),
            (PrimitiveKind::F32, Value::F32(v)) => writer.write_f32(*v),
            (PrimitiveKind::F64, Value::F64(v)) => writer.write_f64(*v),
            (PrimitiveKind::Char, Value::Char(v)) => writer.write_u32(*v as u32),
            _ => return Err(self.mismatch(value)),
        }
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        Ok(match self.kind {
            PrimitiveKind::Unit => Value::Unit,
            PrimitiveKind::Bool => match reader.read_u8(offset) {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(RelcodeError::Decode(format!(
                        "invalid bool byte {other:#04x}"
                    )))
                }
            },
            PrimitiveKind::I8 => Value::I8(reader.read_i8(offset)),
            PrimitiveKind::I16 => Value::I16(reader.read_i16(offset)),
            PrimitiveKind::I32 => Value::I32(reader.read_i32(offset)),
            PrimitiveKind::I64 => Value::I64(reader.read_i64(offset)),
            PrimitiveKind::U8 => Value::U8(reader.read_u8(offset)),
            PrimitiveKind::U16 => Value::U16(reader.read_u16(offset)),
            PrimitiveKind::U32 => Value::U32(reader.read_u32(offset)),
            PrimitiveKind::U64 => Value::U64(reader.read_u64(offset)),
            PrimitiveKind::F32 => Value::F32(reader.read_f32(offset)),
            PrimitiveKind::F64 => Value::F64(reader.read_f64(offset)),
            PrimitiveKind::Char => {
                let scalar = reader.read_u32(offset);
                match char::from_u32(scalar) {
                    Some(c) => Value::Char(c),
                    None => {
                        return Err(RelcodeError::Decode(format!(
                            "invalid char scalar {scalar:#x}"
                        )))
                    }
                }
            }
        })
    }

    fn hash_key(&self, value: &Value, hasher: &mut FxHasher64) -> Result<()> {
        match (self.kind, value) {
            (PrimitiveKind::Bool, Value::Bool(v)) => hasher.write_u8(u8::from(*v)),
            (PrimitiveKind::I8, Value::I8(v)) => hasher.write_u8(*v as u8),
            (PrimitiveKind::I16, Value::I16(v)) => hasher.write_u16(*v as u16),
            (PrimitiveKind::I32, Value::I32(v)) => hasher.write_u32(*v as u32),
            (PrimitiveKind::I64, Value::I64(v)) => hasher.write_u64(*v as u64),
            (PrimitiveKind::U8, Value::U8(v)) => hasher.write_u8(*v),
            (PrimitiveKind::U16, Value::U16(v)) => hasher.write_u16(*v),
            (PrimitiveKind::U32, Value::U32(v)) => hasher.write_u32(*v),
            (PrimitiveKind::U64, Value::U64(v)) => hasher.write_u64(*v),
            (PrimitiveKind::Char, Value::Char(v)) => hasher.write_u32(*v as u32),
            (PrimitiveKind::F32 | PrimitiveKind::F64 | PrimitiveKind::Unit, _) => {
                return Err(RelcodeError::Type(format!(
                    "{:?} cannot be used as a hash key",
                    self.kind
                )))
            }
            _ => return Err(self.mismatch(value)),
        }
        Ok(())
    }
}

/// Shorthand constructor for a shared primitive codec.
pub fn primitive(kind: PrimitiveKind) -> CodecRef {
    Arc::new(PrimitiveCodec::new(kind))
}
