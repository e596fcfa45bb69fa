//! Aggregate codecs: named-field structs, tagged enums, and the two untagged
//! union flavors.
//!
//! All of them follow C-style sequential layout: each member at
//! `align_up(cumulative, member_align)`, total size padded to the aggregate's
//! own alignment. Enum discriminants take the smallest of 1/2/4 bytes that can
//! index the variant count; variant indices are assigned in declaration order
//! starting at 0.

use std::fmt;
use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::codec::{Codec, CodecRef, Resolver};
use crate::error::{RelcodeError, Result};
use crate::layout::{align_up, seq_layout};
use crate::lazy::{FieldShape, Lazy, LazyStruct};
use crate::value::Value;

// --- STRUCT ---

/// Codec for a struct with named fields in declaration order.
#[derive(Debug, Clone)]
pub struct StructCodec {
    name: String,
    shape: Arc<[FieldShape]>,
    size: usize,
    align: usize,
}

impl StructCodec {
    /// Creates a struct codec from `(field name, field codec)` pairs.
    pub fn new(name: impl Into<String>, fields: Vec<(String, CodecRef)>) -> Self {
        let layout = seq_layout(
            &fields
                .iter()
                .map(|(_, c)| (c.size(), c.align()))
                .collect::<Vec<_>>(),
        );
        let shape: Vec<FieldShape> = fields
            .into_iter()
            .zip(layout.offsets)
            .map(|((name, codec), offset)| FieldShape {
                name,
                offset,
                codec,
            })
            .collect();
        Self {
            name: name.into(),
            shape: shape.into(),
            size: layout.size,
            align: layout.align,
        }
    }

    /// The struct's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The computed field shapes (name, offset, codec), in declaration order.
    pub fn fields(&self) -> &[FieldShape] {
        &self.shape
    }

    fn expect_struct<'v>(&self, value: &'v Value) -> Result<&'v [(String, Value)]> {
        match value {
            Value::Struct(fields) if fields.len() == self.shape.len() => Ok(fields),
            Value::Struct(fields) => Err(RelcodeError::Type(format!(
                "struct '{}' expects {} fields, got {}",
                self.name,
                self.shape.len(),
                fields.len()
            ))),
            other => Err(RelcodeError::Type(format!(
                "struct '{}' cannot encode a {} value",
                self.name,
                other.kind()
            ))),
        }
    }
}

impl Codec for StructCodec {
    fn size(&self) -> usize {
        self.size
    }

    fn align(&self) -> usize {
        self.align
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let fields = self.expect_struct(value)?;
        let mut resolvers = Vec::with_capacity(fields.len());
        for ((_, field_value), shape) in fields.iter().zip(self.shape.iter()) {
            resolvers.push(shape.codec.archive(writer, field_value)?);
        }
        Ok(Resolver::Fields(resolvers))
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let fields = self.expect_struct(value)?;
        let resolvers = resolver.into_fields("struct codec")?;
        let pos = writer.pos();
        for ((_, field_value), (shape, r)) in
            fields.iter().zip(self.shape.iter().zip(resolvers))
        {
            writer.pad_to(pos + shape.offset);
            shape.codec.resolve(writer, field_value, r)?;
        }
        writer.pad_to(pos + self.size);
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let mut fields = Vec::with_capacity(self.shape.len());
        for shape in self.shape.iter() {
            let value = shape.codec.decode(reader, offset + shape.offset)?;
            fields.push((shape.name.clone(), value));
        }
        Ok(Value::Struct(fields))
    }

    fn access<'a>(&self, reader: Reader<'a>, offset: usize) -> Result<Lazy<'a>> {
        Ok(Lazy::Struct(LazyStruct::new(
            reader,
            offset,
            self.shape.clone(),
        )))
    }
}

// --- TAGGED ENUM ---

/// One declared variant of a tagged enum.
#[derive(Debug, Clone)]
pub struct EnumVariant {
    /// Variant name.
    pub name: String,
    /// Payload codec, or `None` for a unit variant.
    pub payload: Option<CodecRef>,
}

impl EnumVariant {
    /// A variant with no payload.
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    /// A variant carrying a payload.
    pub fn with_payload(name: impl Into<String>, payload: CodecRef) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
        }
    }
}

/// Codec for a discriminated (tagged) union.
///
/// Layout: discriminant (1, 2 or 4 bytes, whichever is smallest for the
/// variant count), padding to the maximum payload alignment, then the largest
/// variant's bytes. Unit variants have size 0 and do not influence the payload
/// area.
#[derive(Debug, Clone)]
pub struct EnumCodec {
    name: String,
    variants: Vec<EnumVariant>,
    disc_size: usize,
    payload_offset: usize,
    size: usize,
    align: usize,
}

impl EnumCodec {
    /// Creates an enum codec from its declared variants.
    pub fn new(name: impl Into<String>, variants: Vec<EnumVariant>) -> Self {
        let disc_size = discriminant_width(variants.len());
        let payload_align = variants
            .iter()
            .filter_map(|v| v.payload.as_ref())
            .map(|c| c.align())
            .max()
            .unwrap_or(1);
        let payload_size = variants
            .iter()
            .filter_map(|v| v.payload.as_ref())
            .map(|c| c.size())
            .max()
            .unwrap_or(0);
        let align = disc_size.max(payload_align);
        let payload_offset = align_up(disc_size, payload_align);
        let size = align_up(payload_offset + payload_size, align);
        Self {
            name: name.into(),
            variants,
            disc_size,
            payload_offset,
            size,
            align,
        }
    }

    /// The byte offset of the payload area.
    pub fn payload_offset(&self) -> usize {
        self.payload_offset
    }

    /// The discriminant width in bytes (1, 2 or 4).
    pub fn discriminant_size(&self) -> usize {
        self.disc_size
    }

    fn expect_variant<'v>(&self, value: &'v Value) -> Result<(usize, &'v Value)> {
        match value {
            Value::Variant(tag, payload) => {
                let index = self
                    .variants
                    .iter()
                    .position(|v| &v.name == tag)
                    .ok_or_else(|| {
                        RelcodeError::Type(format!(
                            "enum '{}' has no variant named '{tag}'",
                            self.name
                        ))
                    })?;
                Ok((index, payload))
            }
            other => Err(RelcodeError::Type(format!(
                "enum '{}' cannot encode a {} value",
                self.name,
                other.kind()
            ))),
        }
    }

    fn write_discriminant(&self, writer: &mut Writer, index: usize) {
        match self.disc_size {
            1 => writer.write_u8(index as u8),
            2 => writer.write_u16(index as u16),
            _ => writer.write_u32(index as u32),
        }
    }

    fn read_discriminant(&self, reader: Reader<'_>, offset: usize) -> usize {
        match self.disc_size {
            1 => usize::from(reader.read_u8(offset)),
            2 => usize::from(reader.read_u16(offset)),
            _ => reader.read_u32(offset) as usize,
        }
    }

    fn variant_at(&self, index: usize) -> Result<&EnumVariant> {
        self.variants.get(index).ok_or_else(|| {
            RelcodeError::Decode(format!(
                "enum '{}': discriminant {index} out of range ({} variants)",
                self.name,
                self.variants.len()
            ))
        })
    }
}

/// Smallest of {1, 2, 4} bytes able to index `count` variants.
fn discriminant_width(count: usize) -> usize {
    if count <= 1 << 8 {
        1
    } else if count <= 1 << 16 {
        2
    } else {
        4
    }
}

impl Codec for EnumCodec {
    fn size(&self) -> usize {
        self.size
    }

    fn align(&self) -> usize {
        self.align
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let (index, payload) = self.expect_variant(value)?;
        match &self.variants[index].payload {
            Some(codec) => Ok(Resolver::Option(Some(Box::new(
                codec.archive(writer, payload)?,
            )))),
            None => Ok(Resolver::Option(None)),
        }
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let (index, payload) = self.expect_variant(value)?;
        let payload_resolver = match resolver {
            Resolver::Option(r) => r,
            _ => {
                return Err(RelcodeError::Internal(
                    "enum codec received a foreign resolver".into(),
                ))
            }
        };
        let pos = writer.pos();
        self.write_discriminant(writer, index);
        if let (Some(codec), Some(r)) = (&self.variants[index].payload, payload_resolver) {
            writer.pad_to(pos + self.payload_offset);
            codec.resolve(writer, payload, *r)?;
        }
        writer.pad_to(pos + self.size);
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let index = self.read_discriminant(reader, offset);
        let variant = self.variant_at(index)?;
        let payload = match &variant.payload {
            Some(codec) => codec.decode(reader, offset + self.payload_offset)?,
            None => Value::Unit,
        };
        Ok(Value::Variant(variant.name.clone(), Box::new(payload)))
    }

    fn access<'a>(&self, reader: Reader<'a>, offset: usize) -> Result<Lazy<'a>> {
        let index = self.read_discriminant(reader, offset);
        let variant = self.variant_at(index)?;
        let payload = match &variant.payload {
            Some(codec) => codec.access(reader, offset + self.payload_offset)?,
            None => Lazy::Eager(Value::Unit),
        };
        Ok(Lazy::Variant(variant.name.clone(), Box::new(payload)))
    }
}

// --- UNTAGGED UNION, FUNCTION-DISCRIMINATED ---

/// The caller-supplied discriminator for an untagged union: inspects the
/// buffer and names the active variant.
pub type Discriminator = dyn Fn(Reader<'_>, usize) -> Result<String> + Send + Sync;

/// Codec for an untagged union whose active variant is determined by a
/// caller-supplied discriminator function.
///
/// Size and alignment are the maxima over the variants; `resolve` writes only
/// the active variant's bytes, padded to the union's total size.
pub struct UnionCodec {
    name: String,
    variants: Vec<(String, CodecRef)>,
    discriminator: Box<Discriminator>,
    size: usize,
    align: usize,
}

impl fmt::Debug for UnionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionCodec")
            .field("name", &self.name)
            .field("variants", &self.variants)
            .finish()
    }
}

impl UnionCodec {
    /// Creates a union codec from `(name, codec)` variants and a discriminator.
    pub fn new(
        name: impl Into<String>,
        variants: Vec<(String, CodecRef)>,
        discriminator: impl Fn(Reader<'_>, usize) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        let align = variants.iter().map(|(_, c)| c.align()).max().unwrap_or(1);
        let raw_size = variants.iter().map(|(_, c)| c.size()).max().unwrap_or(0);
        Self {
            name: name.into(),
            variants,
            discriminator: Box::new(discriminator),
            size: align_up(raw_size, align),
            align,
        }
    }

    fn variant<'s>(&'s self, tag: &str, domain: &str) -> Result<&'s CodecRef> {
        self.variants
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, c)| c)
            .ok_or_else(|| match domain {
                "decode" => RelcodeError::Decode(format!(
                    "union '{}': discriminator named unknown variant '{tag}'",
                    self.name
                )),
                _ => RelcodeError::Type(format!(
                    "union '{}' has no variant named '{tag}'",
                    self.name
                )),
            })
    }

    fn expect_variant<'v>(&self, value: &'v Value) -> Result<(&'v str, &'v Value)> {
        match value {
            Value::Variant(tag, payload) => Ok((tag, payload)),
            other => Err(RelcodeError::Type(format!(
                "union '{}' cannot encode a {} value",
                self.name,
                other.kind()
            ))),
        }
    }
}

impl Codec for UnionCodec {
    fn size(&self) -> usize {
        self.size
    }

    fn align(&self) -> usize {
        self.align
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let (tag, payload) = self.expect_variant(value)?;
        let codec = self.variant(tag, "encode")?;
        codec.archive(writer, payload)
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let (tag, payload) = self.expect_variant(value)?;
        let codec = self.variant(tag, "encode")?;
        let pos = writer.pos();
        codec.resolve(writer, payload, resolver)?;
        writer.pad_to(pos + self.size);
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let tag = (self.discriminator)(reader, offset)?;
        let codec = self.variant(&tag, "decode")?;
        let payload = codec.decode(reader, offset)?;
        Ok(Value::Variant(tag, Box::new(payload)))
    }
}

// --- UNTAGGED UNION, EXTERNALLY TAGGED ---

/// One variant of an externally-tagged union: a name, the tag value that
/// selects it, and its payload codec.
#[derive(Debug, Clone)]
pub struct TaggedVariant {
    /// Variant name.
    pub name: String,
    /// The tag-codec value that selects this variant on the wire.
    pub tag: Value,
    /// Payload codec.
    pub payload: CodecRef,
}

/// Codec for a union whose discriminant is a separate, explicitly-typed field
/// preceding the payload.
///
/// The tag codec is caller-specified and not constrained to the 1/2/4-byte
/// auto-sizing of [`EnumCodec`]; padding between tag and payload follows the
/// payload's alignment.
#[derive(Debug)]
pub struct TaggedUnionCodec {
    name: String,
    tag_codec: CodecRef,
    variants: Vec<TaggedVariant>,
    payload_offset: usize,
    size: usize,
    align: usize,
}

impl TaggedUnionCodec {
    /// Creates an externally-tagged union codec.
    pub fn new(name: impl Into<String>, tag_codec: CodecRef, variants: Vec<TaggedVariant>) -> Self {
        let payload_align = variants.iter().map(|v| v.payload.align()).max().unwrap_or(1);
        let payload_size = variants.iter().map(|v| v.payload.size()).max().unwrap_or(0);
        let align = tag_codec.align().max(payload_align);
        let payload_offset = align_up(tag_codec.size(), payload_align);
        let size = align_up(payload_offset + payload_size, align);
        Self {
            name: name.into(),
            tag_codec,
            variants,
            payload_offset,
            size,
            align,
        }
    }

    fn expect_variant<'s, 'v>(
        &'s self,
        value: &'v Value,
    ) -> Result<(&'s TaggedVariant, &'v Value)> {
        match value {
            Value::Variant(tag, payload) => {
                let variant = self
                    .variants
                    .iter()
                    .find(|v| &v.name == tag)
                    .ok_or_else(|| {
                        RelcodeError::Type(format!(
                            "tagged union '{}' has no variant named '{tag}'",
                            self.name
                        ))
                    })?;
                Ok((variant, payload))
            }
            other => Err(RelcodeError::Type(format!(
                "tagged union '{}' cannot encode a {} value",
                self.name,
                other.kind()
            ))),
        }
    }
}

impl Codec for TaggedUnionCodec {
    fn size(&self) -> usize {
        self.size
    }

    fn align(&self) -> usize {
        self.align
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let (variant, payload) = self.expect_variant(value)?;
        let tag_resolver = self.tag_codec.archive(writer, &variant.tag)?;
        let payload_resolver = variant.payload.archive(writer, payload)?;
        Ok(Resolver::Fields(vec![tag_resolver, payload_resolver]))
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let (variant, payload) = self.expect_variant(value)?;
        let mut resolvers = resolver.into_fields("tagged union codec")?;
        if resolvers.len() != 2 {
            return Err(RelcodeError::Internal(
                "tagged union codec received a foreign resolver".into(),
            ));
        }
        let payload_resolver = resolvers.pop().unwrap_or(Resolver::None);
        let tag_resolver = resolvers.pop().unwrap_or(Resolver::None);

        let pos = writer.pos();
        self.tag_codec.resolve(writer, &variant.tag, tag_resolver)?;
        writer.pad_to(pos + self.payload_offset);
        variant.payload.resolve(writer, payload, payload_resolver)?;
        writer.pad_to(pos + self.size);
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let tag = self.tag_codec.decode(reader, offset)?;
        let variant = self
            .variants
            .iter()
            .find(|v| v.tag == tag)
            .ok_or_else(|| {
                RelcodeError::Decode(format!(
                    "tagged union '{}': no variant registered for tag {tag:?}",
                    self.name
                ))
            })?;
        let payload = variant.payload.decode(reader, offset + self.payload_offset)?;
        Ok(Value::Variant(variant.name.clone(), Box::new(payload)))
    }
}
