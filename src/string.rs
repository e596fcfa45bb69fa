//! The hybrid inline/out-of-line string codec.
//!
//! A string occupies a fixed 8-byte slot (align 4). Strings of up to 8 UTF-8
//! bytes are stored directly in the slot, padded with 0xFF; longer strings
//! store a marker-tagged length plus a relative pointer to out-of-line bytes.
//!
//! The two forms are distinguishable without a flag bit because a valid UTF-8
//! lead byte never falls in the continuation range 0x80..=0xBF: an out-of-line
//! slot's first byte always carries the `10` marker in its top two bits.

use crate::buffer::{Reader, Writer};
use crate::codec::{Codec, Resolver};
use crate::error::{RelcodeError, Result};
use crate::hash::FxHasher64;
use crate::value::Value;

/// Maximum number of UTF-8 bytes stored inline.
const INLINE_CAPACITY: usize = 8;

/// Padding byte for inline slots; also the string hash terminator.
const PADDING: u8 = 0xFF;

/// Codec for UTF-8 strings (size 8, align 4).
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl StringCodec {
    /// Creates the string codec.
    pub fn new() -> Self {
        Self
    }

    fn expect_str<'v>(&self, value: &'v Value) -> Result<&'v str> {
        value.as_str().ok_or_else(|| {
            RelcodeError::Type(format!(
                "string codec cannot encode a {} value",
                value.kind()
            ))
        })
    }
}

impl Codec for StringCodec {
    fn size(&self) -> usize {
        8
    }

    fn align(&self) -> usize {
        4
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let s = self.expect_str(value)?;
        if s.len() <= INLINE_CAPACITY {
            return Ok(Resolver::None);
        }
        // Out-of-line bytes are a raw unaligned run.
        let pos = writer.pos();
        writer.write_bytes(s.as_bytes());
        Ok(Resolver::OutOfLine { pos, len: s.len() })
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let s = self.expect_str(value)?;
        let start = writer.pos();
        match resolver {
            Resolver::None => {
                writer.write_bytes(s.as_bytes());
                for _ in s.len()..INLINE_CAPACITY {
                    writer.write_bytes(&[PADDING]);
                }
            }
            Resolver::OutOfLine { pos, len } => {
                // Marker field: low 6 bits of the length, the `10` tag in the
                // top bits of byte 0, and the remaining length bits above.
                let marker = (len & 0x3F) as u32 | 0x80 | (((len & !0x3F) as u32) << 2);
                writer.write_u32(marker);
                writer.write_rel_ptr32(pos);
            }
            _ => {
                return Err(RelcodeError::Internal(
                    "string codec received a foreign resolver".into(),
                ))
            }
        }
        Ok(start)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let first = reader.read_u8(offset);
        let bytes = if (first & 0xC0) != 0x80 {
            // Inline: length is the index of the first padding byte, max 8.
            let slot = reader.read_slice(offset, INLINE_CAPACITY);
            let len = slot
                .iter()
                .position(|&b| b == PADDING)
                .unwrap_or(INLINE_CAPACITY);
            &slot[..len]
        } else {
            let marker = reader.read_u32(offset);
            let len = ((marker & 0x3F) | ((marker >> 8) << 6)) as usize;
            let target = reader.read_rel_ptr32(offset + 4);
            reader.read_slice(target, len)
        };
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(Value::Str(s.to_string())),
            Err(e) => Err(RelcodeError::Decode(format!("invalid UTF-8 string: {e}"))),
        }
    }

    fn hash_key(&self, value: &Value, hasher: &mut FxHasher64) -> Result<()> {
        let s = self.expect_str(value)?;
        hasher.write(s.as_bytes());
        hasher.write_u8(PADDING);
        Ok(())
    }
}
