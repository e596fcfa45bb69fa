//! Swiss-table hash collections: hash map/set and their insertion-ordered
//! (index) variants.
//!
//! The on-wire table is a control byte array with SIMD-style 16-slot probe
//! windows and the entry payload at *negative* offsets from the control array:
//! slot `i`'s entry lives at `control_pos - (i + 1) * entry_stride`. Because
//! the archive buffer is append-only, entries are written in descending slot
//! order so they land below the control bytes. The control array carries a
//! 15-byte mirror of its first bytes after the end, letting every 16-slot
//! window load run without wraparound arithmetic.
//!
//! Plain tables store entries directly in the buckets, so iteration order is
//! slot order. The index variants add an insertion-ordered entry array and
//! store `u32` indices into it in the buckets, preserving insertion order on
//! iteration while keeping hashed lookup structure on the wire.

use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::codec::{Codec, CodecRef, Resolver};
use crate::error::{RelcodeError, Result};
use crate::hash::{h2, FxHasher64, EMPTY};
use crate::layout::{align_up, seq_layout};
use crate::primitive::{primitive, PrimitiveKind};
use crate::value::Value;

/// Load-factor capacity for `len` entries: `ceil(len * 8 / 7)`, and at least
/// one slot more than `len` so a probe always terminates on an empty slot.
fn table_capacity(len: usize) -> usize {
    if len == 0 {
        0
    } else {
        ((len * 8 + 6) / 7).max(len + 1)
    }
}

/// Control array length rounded up to whole 16-slot probe windows.
fn probe_capacity(capacity: usize) -> usize {
    align_up(capacity, 16)
}

/// Mirrored tail length after the control array.
const CONTROL_MIRROR: usize = 15;

/// Probe window width in slots.
const GROUP_WIDTH: usize = 16;

/// Occupied control bytes carry the 7-bit secondary hash, so anything with the
/// high bit set is a sentinel.
fn is_occupied(control: u8) -> bool {
    control < 0x80
}

/// Assigns each entry to a slot via triangular-stride probing.
///
/// Returns the control bytes (one per slot, no mirror) and the entry index
/// occupying each slot.
fn assign_slots(
    key_codec: &dyn Codec,
    keys: &[&Value],
    capacity: usize,
    probe_cap: usize,
) -> Result<(Vec<u8>, Vec<Option<usize>>)> {
    let mut control = vec![EMPTY; probe_cap];
    let mut slots: Vec<Option<usize>> = vec![None; probe_cap];
    let mask = probe_cap.next_power_of_two() - 1;

    for (index, key) in keys.iter().enumerate() {
        let mut hasher = FxHasher64::new();
        key_codec.hash_key(key, &mut hasher)?;
        let hash = hasher.finish();
        let tag = h2(hash);

        let mut pos = (hash % capacity as u64) as usize;
        let mut stride = 0usize;
        'probe: loop {
            for j in 0..GROUP_WIDTH {
                let slot = (pos + j) % probe_cap;
                if !is_occupied(control[slot]) {
                    control[slot] = tag;
                    slots[slot] = Some(index);
                    break 'probe;
                }
            }
            // Triangular probing over the power-of-two envelope visits every
            // window; capacity > len guarantees an empty slot exists.
            stride += GROUP_WIDTH;
            pos = (pos + stride) & mask;
        }
    }

    Ok((control, slots))
}

/// Writes the control array followed by its 15-byte wraparound mirror and
/// returns the control position.
fn write_control(writer: &mut Writer, control: &[u8]) -> usize {
    let control_pos = writer.pos();
    writer.write_bytes(control);
    writer.write_bytes(&control[..CONTROL_MIRROR]);
    control_pos
}

// --- HASH MAP ---

/// Codec for a hash map with entries stored directly in the table buckets.
///
/// Representation (size 12, align 4): relative pointer to the control array,
/// entry count, slot capacity. Iteration order is slot order, so re-encoding a
/// decoded map reproduces the *set* of entries, not necessarily their byte
/// layout.
#[derive(Debug, Clone)]
pub struct HashMapCodec {
    key: CodecRef,
    value: CodecRef,
    value_offset: usize,
    entry_stride: usize,
    entry_align: usize,
}

impl HashMapCodec {
    /// Creates a hash map codec. The key codec must be hashable (primitive
    /// integer-like or string); this is checked on first encode.
    pub fn new(key: CodecRef, value: CodecRef) -> Self {
        let layout = seq_layout(&[(key.size(), key.align()), (value.size(), value.align())]);
        Self {
            key,
            value,
            value_offset: layout.offsets[1],
            entry_stride: layout.size,
            entry_align: layout.align,
        }
    }

    /// Writes the bucket entries in descending slot order, then the control
    /// array. Returns the control position.
    fn write_table(
        &self,
        writer: &mut Writer,
        entries: &[(Value, Value)],
        resolvers: Vec<(Resolver, Resolver)>,
        control: &[u8],
        slots: &[Option<usize>],
    ) -> Result<usize> {
        let mut resolvers: Vec<Option<(Resolver, Resolver)>> =
            resolvers.into_iter().map(Some).collect();

        writer.align(self.entry_align);
        let region_start = writer.pos();
        for slot in (0..slots.len()).rev() {
            let entry_pos = region_start + (slots.len() - 1 - slot) * self.entry_stride;
            if let Some(index) = slots[slot] {
                let (key, value) = &entries[index];
                let (kr, vr) = resolvers[index].take().ok_or_else(|| {
                    RelcodeError::Internal("hash table slot resolved twice".into())
                })?;
                writer.pad_to(entry_pos);
                self.key.resolve(writer, key, kr)?;
                writer.pad_to(entry_pos + self.value_offset);
                self.value.resolve(writer, value, vr)?;
            }
            writer.pad_to(entry_pos + self.entry_stride);
        }
        Ok(write_control(writer, control))
    }
}

impl Codec for HashMapCodec {
    fn size(&self) -> usize {
        12
    }

    fn align(&self) -> usize {
        4
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let entries = value.expect_map("hash map codec")?;
        if entries.is_empty() {
            return Ok(Resolver::None);
        }

        // 1. Dependencies of every key and value go out first.
        let mut resolvers = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            resolvers.push((self.key.archive(writer, k)?, self.value.archive(writer, v)?));
        }

        // 2. Slot assignment, then the table itself.
        let capacity = table_capacity(entries.len());
        let probe_cap = probe_capacity(capacity);
        let keys: Vec<&Value> = entries.iter().map(|(k, _)| k).collect();
        let (control, slots) = assign_slots(self.key.as_ref(), &keys, capacity, probe_cap)?;
        let control_pos = self.write_table(writer, entries, resolvers, &control, &slots)?;
        Ok(Resolver::Pos(control_pos))
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let entries = value.expect_map("hash map codec")?;
        let pos = writer.pos();
        match resolver {
            Resolver::None => {
                writer.write_null_rel_ptr32();
                writer.write_u32(0);
                writer.write_u32(0);
            }
            Resolver::Pos(control_pos) => {
                writer.write_rel_ptr32(control_pos);
                writer.write_u32(entries.len() as u32);
                writer.write_u32(table_capacity(entries.len()) as u32);
            }
            _ => {
                return Err(RelcodeError::Internal(
                    "hash map codec received a foreign resolver".into(),
                ))
            }
        }
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let len = reader.read_u32(offset + 4) as usize;
        if len == 0 {
            return Ok(Value::Map(Vec::new()));
        }
        let control_pos = reader.read_rel_ptr32(offset);
        let capacity = reader.read_u32(offset + 8) as usize;
        let probe_cap = probe_capacity(capacity);

        let mut entries = Vec::with_capacity(len);
        for slot in 0..probe_cap {
            if entries.len() == len {
                break;
            }
            if is_occupied(reader.read_u8(control_pos + slot)) {
                let entry_pos = control_pos - (slot + 1) * self.entry_stride;
                let key = self.key.decode(reader, entry_pos)?;
                let value = self.value.decode(reader, entry_pos + self.value_offset)?;
                entries.push((key, value));
            }
        }
        if entries.len() != len {
            return Err(RelcodeError::Decode(format!(
                "hash map control array holds {} occupied slots, header says {len}",
                entries.len()
            )));
        }
        Ok(Value::Map(entries))
    }
}

// --- INDEX MAP ---

/// Codec for an insertion-ordered hash map.
///
/// Entries live in a contiguous array in insertion order; the table buckets
/// store `u32` indices into that array. Representation (size 16, align 4):
/// relative pointer to the control array, entry count, slot capacity, relative
/// pointer to the entry array. Iteration and re-encoding preserve insertion
/// order.
#[derive(Debug, Clone)]
pub struct IndexMapCodec {
    key: CodecRef,
    value: CodecRef,
    value_offset: usize,
    entry_stride: usize,
    entry_align: usize,
}

impl IndexMapCodec {
    /// Creates an insertion-ordered hash map codec.
    pub fn new(key: CodecRef, value: CodecRef) -> Self {
        let layout = seq_layout(&[(key.size(), key.align()), (value.size(), value.align())]);
        Self {
            key,
            value,
            value_offset: layout.offsets[1],
            entry_stride: layout.size,
            entry_align: layout.align,
        }
    }
}

impl Codec for IndexMapCodec {
    fn size(&self) -> usize {
        16
    }

    fn align(&self) -> usize {
        4
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let entries = value.expect_map("index map codec")?;
        if entries.is_empty() {
            return Ok(Resolver::None);
        }

        // 1. Dependencies first.
        let mut resolvers = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            resolvers.push((self.key.archive(writer, k)?, self.value.archive(writer, v)?));
        }

        // 2. The entry array, in insertion order.
        writer.align(self.entry_align);
        let entries_pos = writer.pos();
        for ((key, value), (kr, vr)) in entries.iter().zip(resolvers) {
            let entry_pos = writer.pos();
            self.key.resolve(writer, key, kr)?;
            writer.pad_to(entry_pos + self.value_offset);
            self.value.resolve(writer, value, vr)?;
            writer.pad_to(entry_pos + self.entry_stride);
        }

        // 3. Buckets hold u32 entry indices, descending slot order.
        let capacity = table_capacity(entries.len());
        let probe_cap = probe_capacity(capacity);
        let keys: Vec<&Value> = entries.iter().map(|(k, _)| k).collect();
        let (control, slots) = assign_slots(self.key.as_ref(), &keys, capacity, probe_cap)?;

        writer.align(4);
        for slot in (0..probe_cap).rev() {
            writer.write_u32(slots[slot].unwrap_or(0) as u32);
        }
        let control_pos = write_control(writer, &control);
        Ok(Resolver::Fields(vec![
            Resolver::Pos(control_pos),
            Resolver::Pos(entries_pos),
        ]))
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let entries = value.expect_map("index map codec")?;
        let pos = writer.pos();
        match resolver {
            Resolver::None => {
                writer.write_null_rel_ptr32();
                writer.write_u32(0);
                writer.write_u32(0);
                writer.write_null_rel_ptr32();
            }
            Resolver::Fields(parts) => {
                let [control, array]: [Resolver; 2] = parts.try_into().map_err(|_| {
                    RelcodeError::Internal("index map codec received a foreign resolver".into())
                })?;
                writer.write_rel_ptr32(control.into_pos("index map codec")?);
                writer.write_u32(entries.len() as u32);
                writer.write_u32(table_capacity(entries.len()) as u32);
                writer.write_rel_ptr32(array.into_pos("index map codec")?);
            }
            _ => {
                return Err(RelcodeError::Internal(
                    "index map codec received a foreign resolver".into(),
                ))
            }
        }
        Ok(pos)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        let len = reader.read_u32(offset + 4) as usize;
        if len == 0 {
            return Ok(Value::Map(Vec::new()));
        }
        let entries_pos = reader.read_rel_ptr32(offset + 12);

        let mut entries = Vec::with_capacity(len);
        for i in 0..len {
            let entry_pos = entries_pos + i * self.entry_stride;
            let key = self.key.decode(reader, entry_pos)?;
            let value = self.value.decode(reader, entry_pos + self.value_offset)?;
            entries.push((key, value));
        }
        Ok(Value::Map(entries))
    }
}

// --- SETS ---

fn list_as_map(value: &Value, what: &str) -> Result<Value> {
    let items = value.expect_list(what)?;
    Ok(Value::Map(
        items.iter().map(|k| (k.clone(), Value::Unit)).collect(),
    ))
}

fn map_as_list(value: Value) -> Value {
    match value {
        Value::Map(entries) => Value::List(entries.into_iter().map(|(k, _)| k).collect()),
        other => other,
    }
}

/// Codec for a hash set: a [`HashMapCodec`] with zero-size unit values, taking
/// and producing list values.
#[derive(Debug, Clone)]
pub struct HashSetCodec {
    inner: HashMapCodec,
}

impl HashSetCodec {
    /// Creates a hash set codec over hashable elements.
    pub fn new(elem: CodecRef) -> Self {
        Self {
            inner: HashMapCodec::new(elem, primitive(PrimitiveKind::Unit)),
        }
    }
}

impl Codec for HashSetCodec {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn align(&self) -> usize {
        self.inner.align()
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        self.inner
            .archive(writer, &list_as_map(value, "hash set codec")?)
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        self.inner
            .resolve(writer, &list_as_map(value, "hash set codec")?, resolver)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        Ok(map_as_list(self.inner.decode(reader, offset)?))
    }
}

/// Codec for an insertion-ordered set: an [`IndexMapCodec`] with unit values.
#[derive(Debug, Clone)]
pub struct IndexSetCodec {
    inner: IndexMapCodec,
}

impl IndexSetCodec {
    /// Creates an insertion-ordered set codec over hashable elements.
    pub fn new(elem: CodecRef) -> Self {
        Self {
            inner: IndexMapCodec::new(elem, primitive(PrimitiveKind::Unit)),
        }
    }
}

impl Codec for IndexSetCodec {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn align(&self) -> usize {
        self.inner.align()
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        self.inner
            .archive(writer, &list_as_map(value, "index set codec")?)
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        self.inner
            .resolve(writer, &list_as_map(value, "index set codec")?, resolver)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        Ok(map_as_list(self.inner.decode(reader, offset)?))
    }
}

/// Convenience constructor for a shared hash map codec.
pub fn hash_map(key: CodecRef, value: CodecRef) -> CodecRef {
    Arc::new(HashMapCodec::new(key, value))
}

/// Convenience constructor for a shared insertion-ordered map codec.
pub fn index_map(key: CodecRef, value: CodecRef) -> CodecRef {
    Arc::new(IndexMapCodec::new(key, value))
}
