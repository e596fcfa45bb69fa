//! Ordered collections as bulk-loaded B-trees.
//!
//! Nodes are fixed-size blocks sized by the branching factor `E` (5 unless
//! overridden). A leaf is a tag byte (0), `E` key slots, `E` value slots and an
//! occupancy count. An inner node is a tag byte (1), `E` separator key/value
//! slots, `E` lesser-child relative pointers and one greater-child pointer; it
//! has no count, a null lesser pointer marks the end of its separators. Unused
//! slots are zero-filled.
//!
//! The tree is bulk-loaded bottom-up from the entry sequence: runs of up to
//! `E` consecutive entries become leaves, the entry after each full run is
//! promoted as a separator, and each upper level groups up to `E + 1` children
//! the same way until one node remains. Entries are stored in the order
//! supplied; in-order traversal reproduces that order exactly.

use std::sync::Arc;

use crate::buffer::{Reader, Writer};
use crate::codec::{Codec, CodecRef, Resolver};
use crate::error::{RelcodeError, Result};
use crate::layout::{seq_layout, stride};
use crate::primitive::{primitive, PrimitiveKind};
use crate::value::Value;

/// Default branching factor: entries per leaf, separators per inner node.
pub const DEFAULT_BRANCHING: usize = 5;

const TAG_LEAF: u8 = 0;
const TAG_INNER: u8 = 1;

/// Codec for an ordered map stored as a bulk-loaded B-tree.
///
/// Representation (size 8, align 4): relative pointer to the root node (null
/// when empty) and the entry count.
#[derive(Debug, Clone)]
pub struct BTreeMapCodec {
    key: CodecRef,
    value: CodecRef,
    branching: usize,
    key_stride: usize,
    value_stride: usize,
    keys_off: usize,
    values_off: usize,
    count_off: usize,
    leaf_size: usize,
    ptrs_off: usize,
    inner_size: usize,
    node_align: usize,
}

impl BTreeMapCodec {
    /// Creates a B-tree map codec with the default branching factor.
    pub fn new(key: CodecRef, value: CodecRef) -> Self {
        Self::with_branching(key, value, DEFAULT_BRANCHING)
    }

    /// Creates a B-tree map codec with an explicit branching factor (>= 2).
    pub fn with_branching(key: CodecRef, value: CodecRef, branching: usize) -> Self {
        debug_assert!(branching >= 2);
        let key_stride = stride(key.size(), key.align());
        let value_stride = stride(value.size(), value.align());

        let leaf = seq_layout(&[
            (1, 1),
            (branching * key_stride, key.align()),
            (branching * value_stride, value.align()),
            (4, 4),
        ]);
        let inner = seq_layout(&[
            (1, 1),
            (branching * key_stride, key.align()),
            (branching * value_stride, value.align()),
            ((branching + 1) * 4, 4),
        ]);
        // Both node kinds share the tag/keys/values prefix, so those offsets
        // coincide.
        Self {
            key,
            value,
            branching,
            key_stride,
            value_stride,
            keys_off: leaf.offsets[1],
            values_off: leaf.offsets[2],
            count_off: leaf.offsets[3],
            leaf_size: leaf.size,
            ptrs_off: inner.offsets[3],
            inner_size: inner.size,
            node_align: leaf.align.max(inner.align),
        }
    }

    fn key_slot(&self, node: usize, i: usize) -> usize {
        node + self.keys_off + i * self.key_stride
    }

    fn value_slot(&self, node: usize, i: usize) -> usize {
        node + self.values_off + i * self.value_stride
    }

    /// Writes the key and value regions of the node at `pos` for the entries
    /// at `indices`. The writer is append-only, so each region must fill in
    /// slot order: all keys first, then all values.
    fn write_entry_slots(
        &self,
        writer: &mut Writer,
        pos: usize,
        entries: &[(Value, Value)],
        resolvers: &mut [Option<(Resolver, Resolver)>],
        indices: &[usize],
    ) -> Result<()> {
        let mut value_resolvers = Vec::with_capacity(indices.len());
        for (slot, &i) in indices.iter().enumerate() {
            let (kr, vr) = take_resolver(resolvers, i)?;
            value_resolvers.push(vr);
            writer.pad_to(self.key_slot(pos, slot));
            self.key.resolve(writer, &entries[i].0, kr)?;
        }
        for (slot, (&i, vr)) in indices.iter().zip(value_resolvers).enumerate() {
            writer.pad_to(self.value_slot(pos, slot));
            self.value.resolve(writer, &entries[i].1, vr)?;
        }
        Ok(())
    }

    /// Writes one leaf holding the entries at `indices`.
    fn write_leaf(
        &self,
        writer: &mut Writer,
        entries: &[(Value, Value)],
        resolvers: &mut [Option<(Resolver, Resolver)>],
        indices: &[usize],
    ) -> Result<usize> {
        writer.align(self.node_align);
        let pos = writer.pos();
        writer.write_u8(TAG_LEAF);
        self.write_entry_slots(writer, pos, entries, resolvers, indices)?;
        writer.pad_to(pos + self.count_off);
        writer.write_u32(indices.len() as u32);
        writer.pad_to(pos + self.leaf_size);
        Ok(pos)
    }

    /// Writes one inner node over `children` with `seps` separator entries
    /// between them (`seps.len() == children.len() - 1`).
    fn write_inner(
        &self,
        writer: &mut Writer,
        entries: &[(Value, Value)],
        resolvers: &mut [Option<(Resolver, Resolver)>],
        children: &[usize],
        seps: &[usize],
    ) -> Result<usize> {
        writer.align(self.node_align);
        let pos = writer.pos();
        writer.write_u8(TAG_INNER);
        self.write_entry_slots(writer, pos, entries, resolvers, seps)?;
        writer.pad_to(pos + self.ptrs_off);
        for slot in 0..self.branching {
            match children.get(slot) {
                // The last child is the greater pointer, not a lesser slot.
                Some(&child) if slot + 1 < children.len() => writer.write_rel_ptr32(child),
                _ => writer.write_null_rel_ptr32(),
            }
        }
        match children.last() {
            Some(&greater) => writer.write_rel_ptr32(greater),
            None => writer.write_null_rel_ptr32(),
        }
        writer.pad_to(pos + self.inner_size);
        Ok(pos)
    }

    /// Bulk-loads the whole tree and returns the root node position.
    fn write_tree(
        &self,
        writer: &mut Writer,
        entries: &[(Value, Value)],
        mut resolvers: Vec<Option<(Resolver, Resolver)>>,
    ) -> Result<usize> {
        // Level 0: leaves of up to `branching` consecutive entries, the entry
        // after each full leaf promoted one level up.
        let mut children = Vec::new();
        let mut seps = Vec::new();
        let mut i = 0;
        loop {
            let take = self.branching.min(entries.len() - i);
            let indices: Vec<usize> = (i..i + take).collect();
            children.push(self.write_leaf(writer, entries, &mut resolvers, &indices)?);
            i += take;
            if i < entries.len() {
                seps.push(i);
                i += 1;
            } else {
                break;
            }
        }

        // Upper levels: group up to `branching + 1` children per inner node,
        // promoting the separator on each group boundary.
        while children.len() > 1 {
            let mut next_children = Vec::new();
            let mut next_seps = Vec::new();
            let mut c = 0;
            loop {
                let take = (self.branching + 1).min(children.len() - c);
                next_children.push(self.write_inner(
                    writer,
                    entries,
                    &mut resolvers,
                    &children[c..c + take],
                    &seps[c..c + take - 1],
                )?);
                c += take;
                if c < children.len() {
                    next_seps.push(seps[c - 1]);
                } else {
                    break;
                }
            }
            children = next_children;
            seps = next_seps;
        }
        Ok(children[0])
    }
}

fn take_resolver(
    resolvers: &mut [Option<(Resolver, Resolver)>],
    i: usize,
) -> Result<(Resolver, Resolver)> {
    resolvers[i]
        .take()
        .ok_or_else(|| RelcodeError::Internal("tree entry resolved twice".into()))
}

/// In-order traversal frame: visit a node, or resume an inner node at a
/// separator index (optionally emitting that separator first).
enum Frame {
    Visit(usize),
    Resume { pos: usize, index: usize, emit: bool },
}

impl Codec for BTreeMapCodec {
    fn size(&self) -> usize {
        8
    }

    fn align(&self) -> usize {
        4
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let entries = value.expect_map("tree map codec")?;
        if entries.is_empty() {
            return Ok(Resolver::None);
        }
        let mut resolvers = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            resolvers.push(Some((
                self.key.archive(writer, k)?,
                self.value.archive(writer, v)?,
            )));
        }
        let root = self.write_tree(writer, entries, resolvers)?;
        Ok(Resolver::Pos(root))
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let entries = value.expect_map("tree map codec")?;
        let pos = writer.pos();
        match resolver {
            Resolver::None => {
                writer.write_null_rel_ptr32();
                writer.write_u32(0);
            }
            Resolver::Pos(root) => {
                writer.write_rel_ptr32(root);
                writer.write_u32(entries.len() as u32);
            }
            _ => {
                return Err(RelcodeError::Internal(
                    "tree map codec received a foreign resolver".into(),
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
        let root = reader.read_rel_ptr32(offset);

        let mut entries = Vec::with_capacity(len);
        let mut stack = vec![Frame::Visit(root)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit(pos) => match reader.read_u8(pos) {
                    TAG_LEAF => {
                        let count = reader.read_u32(pos + self.count_off) as usize;
                        for slot in 0..count {
                            let k = self.key.decode(reader, self.key_slot(pos, slot))?;
                            let v = self.value.decode(reader, self.value_slot(pos, slot))?;
                            entries.push((k, v));
                        }
                    }
                    TAG_INNER => stack.push(Frame::Resume {
                        pos,
                        index: 0,
                        emit: false,
                    }),
                    tag => {
                        return Err(RelcodeError::Decode(format!(
                            "tree node at {pos} has unknown tag {tag}"
                        )))
                    }
                },
                Frame::Resume { pos, index, emit } => {
                    if emit {
                        let k = self.key.decode(reader, self.key_slot(pos, index))?;
                        let v = self.value.decode(reader, self.value_slot(pos, index))?;
                        entries.push((k, v));
                        stack.push(Frame::Resume {
                            pos,
                            index: index + 1,
                            emit: false,
                        });
                        continue;
                    }
                    let lesser_at = pos + self.ptrs_off + index * 4;
                    if index < self.branching && reader.read_i32(lesser_at) != 0 {
                        // Descend left, then come back to emit this separator.
                        stack.push(Frame::Resume {
                            pos,
                            index,
                            emit: true,
                        });
                        stack.push(Frame::Visit(reader.read_rel_ptr32(lesser_at)));
                    } else {
                        let greater_at = pos + self.ptrs_off + self.branching * 4;
                        stack.push(Frame::Visit(reader.read_rel_ptr32(greater_at)));
                    }
                }
            }
        }

        if entries.len() != len {
            return Err(RelcodeError::Decode(format!(
                "tree traversal yielded {} entries, header says {len}",
                entries.len()
            )));
        }
        Ok(Value::Map(entries))
    }
}

/// Codec for an ordered set: a [`BTreeMapCodec`] with zero-size unit values,
/// taking and producing list values.
#[derive(Debug, Clone)]
pub struct BTreeSetCodec {
    inner: BTreeMapCodec,
}

impl BTreeSetCodec {
    /// Creates a B-tree set codec with the default branching factor.
    pub fn new(elem: CodecRef) -> Self {
        Self {
            inner: BTreeMapCodec::new(elem, primitive(PrimitiveKind::Unit)),
        }
    }

    /// Creates a B-tree set codec with an explicit branching factor (>= 2).
    pub fn with_branching(elem: CodecRef, branching: usize) -> Self {
        Self {
            inner: BTreeMapCodec::with_branching(
                elem,
                primitive(PrimitiveKind::Unit),
                branching,
            ),
        }
    }
}

impl Codec for BTreeSetCodec {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn align(&self) -> usize {
        self.inner.align()
    }

    fn archive(&self, writer: &mut Writer, value: &Value) -> Result<Resolver> {
        let items = value.expect_list("tree set codec")?;
        let entries = Value::Map(items.iter().map(|k| (k.clone(), Value::Unit)).collect());
        self.inner.archive(writer, &entries)
    }

    fn resolve(&self, writer: &mut Writer, value: &Value, resolver: Resolver) -> Result<usize> {
        let items = value.expect_list("tree set codec")?;
        let entries = Value::Map(items.iter().map(|k| (k.clone(), Value::Unit)).collect());
        self.inner.resolve(writer, &entries, resolver)
    }

    fn decode(&self, reader: Reader<'_>, offset: usize) -> Result<Value> {
        match self.inner.decode(reader, offset)? {
            Value::Map(entries) => Ok(Value::List(
                entries.into_iter().map(|(k, _)| k).collect(),
            )),
            other => Ok(other),
        }
    }
}

/// Convenience constructor for a shared B-tree map codec.
pub fn btree_map(key: CodecRef, value: CodecRef) -> CodecRef {
    Arc::new(BTreeMapCodec::new(key, value))
}
