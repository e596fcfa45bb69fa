//! Read-through lazy views over encoded bytes.
//!
//! These views expose the same field/element surface as the eagerly-decoded
//! value but compute each slot only on first read and cache it thereafter;
//! `load()` forces the remaining slots and yields the plain [`Value`].
//!
//! Views hold a private memoization cache and are deliberately single-threaded
//! (`RefCell`): codecs themselves stay shareable, the views they hand out do
//! not. A racing first-read would only repeat deterministic decode work, but
//! Rust's aliasing rules make us say so in the type system instead.

use std::cell::RefCell;
use std::sync::Arc;

use crate::buffer::Reader;
use crate::codec::CodecRef;
use crate::error::{RelcodeError, Result};
use crate::value::Value;

/// A lazily-decoded value, as returned by [`Codec::access`](crate::codec::Codec::access).
///
/// Codecs with nothing to defer return the `Eager` form directly.
#[derive(Debug)]
pub enum Lazy<'a> {
    /// Already fully decoded.
    Eager(Value),
    /// A named-field struct view.
    Struct(LazyStruct<'a>),
    /// A uniform sequence view (vector or fixed array).
    Seq(LazySeq<'a>),
    /// A positional tuple view.
    Tuple(LazyTuple<'a>),
    /// An enum variant whose discriminant was decoded eagerly but whose
    /// payload is still deferred.
    Variant(String, Box<Lazy<'a>>),
}

impl Lazy<'_> {
    /// Forces the full decode, observationally equivalent to `Codec::decode`.
    pub fn load(&self) -> Result<Value> {
        match self {
            Self::Eager(value) => Ok(value.clone()),
            Self::Struct(view) => view.load(),
            Self::Seq(view) => view.load(),
            Self::Tuple(view) => view.load(),
            Self::Variant(tag, payload) => Ok(Value::Variant(
                tag.clone(),
                Box::new(payload.load()?),
            )),
        }
    }

    /// Reads one struct field by name. Errors unless this is a struct view.
    pub fn field(&self, name: &str) -> Result<Value> {
        match self {
            Self::Struct(view) => view.get(name),
            Self::Eager(Value::Struct(fields)) => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| RelcodeError::Type(format!("no field named '{name}'"))),
            _ => Err(RelcodeError::Type("not a struct view".into())),
        }
    }

    /// Reads one element by index. Errors unless this is a sequence or tuple.
    pub fn index(&self, index: usize) -> Result<Value> {
        match self {
            Self::Seq(view) => view.get(index),
            Self::Tuple(view) => view.get(index),
            Self::Eager(value) => value
                .elements()
                .and_then(|items| items.get(index))
                .cloned()
                .ok_or_else(|| RelcodeError::Type(format!("no element at index {index}"))),
            _ => Err(RelcodeError::Type("not an indexable view".into())),
        }
    }
}

// --- SLOT CACHE ---

/// Per-slot memoization shared by the concrete views.
#[derive(Debug)]
struct SlotCache {
    slots: RefCell<Vec<Option<Value>>>,
}

impl SlotCache {
    fn new(len: usize) -> Self {
        Self {
            slots: RefCell::new(vec![None; len]),
        }
    }

    fn get_or_decode(&self, index: usize, decode: impl FnOnce() -> Result<Value>) -> Result<Value> {
        if let Some(cached) = &self.slots.borrow()[index] {
            return Ok(cached.clone());
        }
        let value = decode()?;
        self.slots.borrow_mut()[index] = Some(value.clone());
        Ok(value)
    }
}

// --- STRUCT VIEW ---

/// Field shape shared between a struct codec and its lazy views.
#[derive(Debug)]
pub struct FieldShape {
    /// Field name.
    pub name: String,
    /// Byte offset from the struct base.
    pub offset: usize,
    /// The field's codec.
    pub codec: CodecRef,
}

/// A read-through view over an encoded struct.
#[derive(Debug)]
pub struct LazyStruct<'a> {
    reader: Reader<'a>,
    base: usize,
    shape: Arc<[FieldShape]>,
    cache: SlotCache,
}

impl<'a> LazyStruct<'a> {
    pub(crate) fn new(reader: Reader<'a>, base: usize, shape: Arc<[FieldShape]>) -> Self {
        let cache = SlotCache::new(shape.len());
        Self {
            reader,
            base,
            shape,
            cache,
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.shape.len()
    }

    /// True if the struct has no fields.
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Field names in declaration order. Does not force any decoding.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.shape.iter().map(|f| f.name.as_str())
    }

    /// Decodes (or returns the cached) field by positional index.
    pub fn get_at(&self, index: usize) -> Result<Value> {
        let field = self.shape.get(index).ok_or_else(|| {
            RelcodeError::Type(format!("struct has no field at index {index}"))
        })?;
        self.cache.get_or_decode(index, || {
            field.codec.decode(self.reader, self.base + field.offset)
        })
    }

    /// Decodes (or returns the cached) field by name.
    pub fn get(&self, name: &str) -> Result<Value> {
        let index = self
            .shape
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| RelcodeError::Type(format!("no field named '{name}'")))?;
        self.get_at(index)
    }

    /// A nested lazy view of one field, bypassing this view's cache.
    pub fn view(&self, name: &str) -> Result<Lazy<'a>> {
        let field = self
            .shape
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| RelcodeError::Type(format!("no field named '{name}'")))?;
        field.codec.access(self.reader, self.base + field.offset)
    }

    /// Iterates the decoded field values in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Value>> + '_ {
        (0..self.shape.len()).map(move |i| self.get_at(i))
    }

    /// Forces every field and yields the full struct value.
    pub fn load(&self) -> Result<Value> {
        let mut fields = Vec::with_capacity(self.shape.len());
        for (i, shape) in self.shape.iter().enumerate() {
            fields.push((shape.name.clone(), self.get_at(i)?));
        }
        Ok(Value::Struct(fields))
    }
}

// --- SEQUENCE VIEW ---

/// A read-through view over a uniform sequence (vector or fixed array).
#[derive(Debug)]
pub struct LazySeq<'a> {
    reader: Reader<'a>,
    start: usize,
    stride: usize,
    len: usize,
    elem: CodecRef,
    cache: SlotCache,
}

impl<'a> LazySeq<'a> {
    pub(crate) fn new(
        reader: Reader<'a>,
        start: usize,
        stride: usize,
        len: usize,
        elem: CodecRef,
    ) -> Self {
        Self {
            reader,
            start,
            stride,
            len,
            elem,
            cache: SlotCache::new(len),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Decodes (or returns the cached) element at `index`.
    pub fn get(&self, index: usize) -> Result<Value> {
        if index >= self.len {
            return Err(RelcodeError::Type(format!(
                "index {index} out of bounds (len {})",
                self.len
            )));
        }
        self.cache.get_or_decode(index, || {
            self.elem.decode(self.reader, self.start + index * self.stride)
        })
    }

    /// A nested lazy view of one element, bypassing this view's cache.
    pub fn view(&self, index: usize) -> Result<Lazy<'a>> {
        if index >= self.len {
            return Err(RelcodeError::Type(format!(
                "index {index} out of bounds (len {})",
                self.len
            )));
        }
        self.elem.access(self.reader, self.start + index * self.stride)
    }

    /// Iterates decoded elements in order, lazily.
    pub fn iter(&self) -> impl Iterator<Item = Result<Value>> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Forces every element and yields the full list value.
    pub fn load(&self) -> Result<Value> {
        self.iter().collect::<Result<Vec<_>>>().map(Value::List)
    }
}

// --- TUPLE VIEW ---

/// A read-through view over a positional tuple.
#[derive(Debug)]
pub struct LazyTuple<'a> {
    reader: Reader<'a>,
    base: usize,
    fields: Vec<(usize, CodecRef)>,
    cache: SlotCache,
}

impl<'a> LazyTuple<'a> {
    pub(crate) fn new(reader: Reader<'a>, base: usize, fields: Vec<(usize, CodecRef)>) -> Self {
        let cache = SlotCache::new(fields.len());
        Self {
            reader,
            base,
            fields,
            cache,
        }
    }

    /// Number of positional fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the tuple has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decodes (or returns the cached) field at `index`.
    pub fn get(&self, index: usize) -> Result<Value> {
        let (offset, codec) = self.fields.get(index).cloned().ok_or_else(|| {
            RelcodeError::Type(format!("tuple has no field at index {index}"))
        })?;
        self.cache
            .get_or_decode(index, || codec.decode(self.reader, self.base + offset))
    }

    /// Iterates decoded fields in order, lazily.
    pub fn iter(&self) -> impl Iterator<Item = Result<Value>> + '_ {
        (0..self.fields.len()).map(move |i| self.get(i))
    }

    /// Forces every field and yields the full tuple value.
    pub fn load(&self) -> Result<Value> {
        self.iter().collect::<Result<Vec<_>>>().map(Value::Tuple)
    }
}
