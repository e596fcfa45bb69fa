//! Container codecs: vector, option, owned/weak pointers, fixed array, tuple.
//!
//! Vectors and pointers write their contents as dependencies during `archive`
//! and reference them with 32-bit relative pointers during `resolve`; delta 0
//! is the null sentinel for empty vectors and absent weak pointers. Options,
//! arrays and tuples are purely inline.

use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::codec::{Codec, CodecRef, Resolver};
use crate::error::{RelcodeError, Result};
use crate::layout::{align_up, seq_layout, stride};
use crate::lazy::{Lazy, LazySeq, LazyTuple};
use crate::value::Value;

// --- VECTOR ---

/// Codec for a variable-length homogeneous sequence.
///
/// Wire layout: `{ relptr: i32, len: u32 }` (size 8, align 4). Elements are
/// written contiguously at the element stride during `archive`.
#[derive(Debug, Clone)]
pub struct VectorCodec {
    elem: CodecRef,
}

impl VectorCodec {
    /// Creates a vector codec over `elem`.
    pub fn new(elem: CodecRef) -> Self {
        Self { elem }
    }
}

impl Codec for VectorCodec {
    fn size(&self) -> usize {
        8
    }

    fn align(&self) -> usize {
        4
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let items = value.expect_list("vector codec")?;
        if items.is_empty() {
            return Ok(Resolver::None);
        }

        // 1. Archive every element's dependencies.
        let mut resolvers = Vec::with_capacity(items.len());
        for item in items {
            resolvers.push(self.elem.archive(writer, item)?);
        }

        // 2. Resolve the elements contiguously at the element stride.
        let elem_stride = stride(self.elem.size(), self.elem.align());
        writer.align(self.elem.align());
        let start = writer.pos();
        for (i, (item, resolver)) in items.iter().zip(resolvers).enumerate() {
            writer.pad_to(start + i * elem_stride);
            self.elem.resolve(writer, item, resolver)?;
        }
        Ok(Resolver::Pos(start))
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let items = value.expect_list("vector codec")?;
        let pos = writer.pos();
        match resolver {
            Resolver::None => writer.write_null_rel_ptr32(),
            Resolver::Pos(start) => writer.write_rel_ptr32(start),
            _ => {
                return Err(RelcodeError::Internal(
                    "vector codec received a foreign resolver".into(),
                ))
            }
        }
        writer.write_u32(items.len() as u32);
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let len = reader.read_u32(offset + 4) as usize;
        if len == 0 {
            return Ok(Value::List(Vec::new()));
        }
        let start = reader.read_rel_ptr32(offset);
        let elem_stride = stride(self.elem.size(), self.elem.align());
        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            items.push(self.elem.decode(reader, start + i * elem_stride)?);
        }
        Ok(Value::List(items))
    }

    fn access<'a>(&self, reader: Reader<'a>, offset: usize) -> Result<Lazy<'a>> {
        let len = reader.read_u32(offset + 4) as usize;
        let start = if len == 0 {
            0
        } else {
            reader.read_rel_ptr32(offset)
        };
        let elem_stride = stride(self.elem.size(), self.elem.align());
        Ok(Lazy::Seq(LazySeq::new(
            reader,
            start,
            elem_stride,
            len,
            self.elem.clone(),
        )))
    }
}

// --- OPTION ---

/// Codec for an optional value: 1-byte discriminant, padding to the payload's
/// alignment, then the payload (zero-filled when absent).
#[derive(Debug, Clone)]
pub struct OptionCodec {
    payload: CodecRef,
    payload_offset: usize,
}

impl OptionCodec {
    /// Creates an option codec over `payload`.
    pub fn new(payload: CodecRef) -> Self {
        let payload_offset = align_up(1, payload.align());
        Self {
            payload,
            payload_offset,
        }
    }

    fn expect_option<'v>(&self, value: &'v Value) -> Result<Option<&'v Value>> {
        match value {
            Value::Option(opt) => Ok(opt.as_deref()),
            other => Err(RelcodeError::Type(format!(
                "option codec expects an option value, got {}",
                other.kind()
            ))),
        }
    }
}

impl Codec for OptionCodec {
    fn size(&self) -> usize {
        self.payload_offset + self.payload.size()
    }

    fn align(&self) -> usize {
        self.payload.align().max(1)
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        match self.expect_option(value)? {
            Some(inner) => Ok(Resolver::Option(Some(Box::new(
                self.payload.archive(writer, inner)?,
            )))),
            None => Ok(Resolver::Option(None)),
        }
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let inner = self.expect_option(value)?;
        let pos = writer.pos();
        let payload_resolver = match resolver {
            Resolver::Option(r) => r,
            _ => {
                return Err(RelcodeError::Internal(
                    "option codec received a foreign resolver".into(),
                ))
            }
        };
        match (inner, payload_resolver) {
            (Some(inner), Some(r)) => {
                writer.write_u8(1);
                writer.pad_to(pos + self.payload_offset);
                self.payload.resolve(writer, inner, *r)?;
            }
            (None, None) => {
                writer.write_u8(0);
                writer.pad_to(pos + self.size());
            }
            _ => {
                return Err(RelcodeError::Internal(
                    "option resolver does not match the value".into(),
                ))
            }
        }
        writer.pad_to(pos + self.size());
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        match reader.read_u8(offset) {
            0 => Ok(Value::Option(None)),
            1 => {
                let inner = self.payload.decode(reader, offset + self.payload_offset)?;
                Ok(Value::Option(Some(Box::new(inner))))
            }
            other => Err(RelcodeError::Decode(format!(
                "invalid option discriminant {other:#04x}"
            ))),
        }
    }
}

// --- OWNED AND WEAK POINTERS ---

/// Codec for an owned pointer: a bare relative pointer (size 4, align 4) to a
/// target written as a dependency.
///
/// Shared-pointer wrappers reuse this layout verbatim; reference-count
/// semantics are erased on the wire.
#[derive(Debug, Clone)]
pub struct BoxCodec {
    target: CodecRef,
}

impl BoxCodec {
    /// Creates a box codec over `target`.
    pub fn new(target: CodecRef) -> Self {
        Self { target }
    }
}

impl Codec for BoxCodec {
    fn size(&self) -> usize {
        4
    }

    fn align(&self) -> usize {
        4
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let pos = self.target.encode(writer, value)?;
        Ok(Resolver::Pos(pos))
    }

    fn resolve(&self, writer: &mut Writer, _value: &Value, resolver: Resolver) -> Result<usize> {
        let target = resolver.into_pos("box codec")?;
        let pos = writer.pos();
        writer.write_rel_ptr32(target);
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let target = reader.read_rel_ptr32(offset);
        self.target.decode(reader, target)
    }

    fn access<'a>(&self, reader: Reader<'a>, offset: usize) -> Result<Lazy<'a>> {
        let target = reader.read_rel_ptr32(offset);
        self.target.access(reader, target)
    }
}

/// Codec for a nullable pointer: the box layout with delta 0 as "absent".
///
/// A present weak pointer is indistinguishable from a box on the wire except
/// for the null check before resolution.
#[derive(Debug, Clone)]
pub struct WeakCodec {
    target: CodecRef,
}

impl WeakCodec {
    /// Creates a weak-pointer codec over `target`.
    pub fn new(target: CodecRef) -> Self {
        Self { target }
    }

    fn expect_option<'v>(&self, value: &'v Value) -> Result<Option<&'v Value>> {
        match value {
            Value::Option(opt) => Ok(opt.as_deref()),
            other => Err(RelcodeError::Type(format!(
                "weak codec expects an option value, got {}",
                other.kind()
            ))),
        }
    }
}

impl Codec for WeakCodec {
    fn size(&self) -> usize {
        4
    }

    fn align(&self) -> usize {
        4
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        match self.expect_option(value)? {
            Some(inner) => {
                let pos = self.target.encode(writer, inner)?;
                Ok(Resolver::Pos(pos))
            }
            None => Ok(Resolver::None),
        }
    }

    fn resolve(&self, writer: &mut Writer, _value: &Value, resolver: Resolver) -> Result<usize> {
        let pos = writer.pos();
        match resolver {
            Resolver::None => writer.write_null_rel_ptr32(),
            Resolver::Pos(target) => writer.write_rel_ptr32(target),
            _ => {
                return Err(RelcodeError::Internal(
                    "weak codec received a foreign resolver".into(),
                ))
            }
        }
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        if reader.read_i32(offset) == 0 {
            return Ok(Value::Option(None));
        }
        let target = reader.read_rel_ptr32(offset);
        let inner = self.target.decode(reader, target)?;
        Ok(Value::Option(Some(Box::new(inner))))
    }
}

// --- FIXED ARRAY ---

/// Codec for `N` elements at a fixed stride: no length field, no pointer.
///
/// A runtime value whose length differs from `N` is a `Type` error.
#[derive(Debug, Clone)]
pub struct ArrayCodec {
    elem: CodecRef,
    len: usize,
}

impl ArrayCodec {
    /// Creates an array codec for exactly `len` elements of `elem`.
    pub fn new(elem: CodecRef, len: usize) -> Self {
        Self { elem, len }
    }

    fn check_len(&self, items: &[Value]) -> Result<()> {
        if items.len() != self.len {
            return Err(RelcodeError::Type(format!(
                "array codec expects exactly {} elements, got {}",
                self.len,
                items.len()
            )));
        }
        Ok(())
    }

    fn elem_stride(&self) -> usize {
        stride(self.elem.size(), self.elem.align())
    }
}

impl Codec for ArrayCodec {
    fn size(&self) -> usize {
        self.elem_stride() * self.len
    }

    fn align(&self) -> usize {
        self.elem.align()
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let items = value.expect_list("array codec")?;
        self.check_len(items)?;
        let mut resolvers = Vec::with_capacity(items.len());
        for item in items {
            resolvers.push(self.elem.archive(writer, item)?);
        }
        Ok(Resolver::Fields(resolvers))
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let items = value.expect_list("array codec")?;
        self.check_len(items)?;
        let resolvers = resolver.into_fields("array codec")?;
        let pos = writer.pos();
        let elem_stride = self.elem_stride();
        for (i, (item, r)) in items.iter().zip(resolvers).enumerate() {
            writer.pad_to(pos + i * elem_stride);
            self.elem.resolve(writer, item, r)?;
        }
        writer.pad_to(pos + self.size());
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let elem_stride = self.elem_stride();
        let mut items = Vec::with_capacity(self.len);
        for i in 0..self.len {
            items.push(self.elem.decode(reader, offset + i * elem_stride)?);
        }
        Ok(Value::List(items))
    }

    fn access<'a>(&self, reader: Reader<'a>, offset: usize) -> Result<Lazy<'a>> {
        Ok(Lazy::Seq(LazySeq::new(
            reader,
            offset,
            self.elem_stride(),
            self.len,
            self.elem.clone(),
        )))
    }
}

// --- TUPLE ---

/// Codec for a heterogeneous positional sequence with C-style sequential
/// layout, identical to a struct with positional fields.
#[derive(Debug, Clone)]
pub struct TupleCodec {
    fields: Arc<[CodecRef]>,
    offsets: Vec<usize>,
    size: usize,
    align: usize,
}

impl TupleCodec {
    /// Creates a tuple codec over the given field codecs, in order.
    pub fn new(fields: Vec<CodecRef>) -> Self {
        let layout = seq_layout(
            &fields
                .iter()
                .map(|c| (c.size(), c.align()))
                .collect::<Vec<_>>(),
        );
        Self {
            fields: fields.into(),
            offsets: layout.offsets,
            size: layout.size,
            align: layout.align,
        }
    }

    /// Byte offset of positional field `i`.
    pub fn field_offset(&self, i: usize) -> usize {
        self.offsets[i]
    }

    fn expect_tuple<'v>(&self, value: &'v Value) -> Result<&'v [Value]> {
        match value {
            Value::Tuple(items) if items.len() == self.fields.len() => Ok(items),
            Value::Tuple(items) => Err(RelcodeError::Type(format!(
                "tuple codec expects {} fields, got {}",
                self.fields.len(),
                items.len()
            ))),
            other => Err(RelcodeError::Type(format!(
                "tuple codec expects a tuple value, got {}",
                other.kind()
            ))),
        }
    }
}

impl Codec for TupleCodec {
    fn size(&self) -> usize {
        self.size
    }

    fn align(&self) -> usize {
        self.align
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let items = self.expect_tuple(value)?;
        let mut resolvers = Vec::with_capacity(items.len());
        for (item, codec) in items.iter().zip(self.fields.iter()) {
            resolvers.push(codec.archive(writer, item)?);
        }
        Ok(Resolver::Fields(resolvers))
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let items = self.expect_tuple(value)?;
        let resolvers = resolver.into_fields("tuple codec")?;
        let pos = writer.pos();
        for ((item, codec), (offset, r)) in items
            .iter()
            .zip(self.fields.iter())
            .zip(self.offsets.iter().zip(resolvers))
        {
            writer.pad_to(pos + offset);
            codec.resolve(writer, item, r)?;
        }
        writer.pad_to(pos + self.size);
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let mut items = Vec::with_capacity(self.fields.len());
        for (codec, field_offset) in self.fields.iter().zip(&self.offsets) {
            items.push(codec.decode(reader, offset + field_offset)?);
        }
        Ok(Value::Tuple(items))
    }

    fn access<'a>(&self, reader: Reader<'a>, offset: usize) -> Result<Lazy<'a>> {
        let fields = self
            .offsets
            .iter()
            .zip(self.fields.iter())
            .map(|(o, c)| (*o, c.clone()))
            .collect();
        Ok(Lazy::Tuple(LazyTuple::new(reader, offset, fields)))
    }
}
