//! Low-level buffer I/O: the growable archive writer and the read-only view.
//!
//! All multi-byte quantities are little-endian. The [`Writer`] owns a growable
//! byte arena scoped to one encode operation; the [`Reader`] is a non-owning
//! view over an existing archive. Neither layer validates bounds beyond what the
//! codecs computed: out-of-range reads are a caller error.

use crate::layout::align_up;

// --- WRITE SIDE ---

/// A growable little-endian byte arena with a write cursor.
///
/// The buffer is append-only during an encode: data already written is never
/// mutated except through [`Writer::write_rel_ptr32_at`] patches of previously
/// reserved slots. Capacity grows by doubling; `finish()` yields only the
/// written prefix.
///
/// A `Writer` is mutable, single-writer state. Create one per encode operation
/// or call [`Writer::reset`] between encodes.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

macro_rules! impl_write_primitive {
    ($($name:ident: $t:ty),* $(,)?) => {
        $(
            /// Aligns to the type's width, then writes little-endian.
            ///
            /// The format's natural alignment equals the type width, which is
            /// not `align_of` on every target (`u64` is 4-aligned on 32-bit x86).
            pub fn $name(&mut self, value: $t) {
                self.align(std::mem::size_of::<$t>());
                self.write_bytes(&value.to_le_bytes());
            }
        )*
    };
}

impl Writer {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates a writer with pre-reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// The current write cursor (== number of bytes written so far).
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    /// Appends raw bytes without any alignment.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        // Doubling growth: a single large reserve amortizes reallocation-and-copy.
        if self.buf.len() + bytes.len() > self.buf.capacity() {
            let needed = self.buf.len() + bytes.len();
            let doubled = self.buf.capacity().max(64) * 2;
            self.buf.reserve(doubled.max(needed) - self.buf.len());
        }
        self.buf.extend_from_slice(bytes);
    }

    impl_write_primitive!(
        write_u8: u8,
        write_i8: i8,
        write_u16: u16,
        write_i16: i16,
        write_u32: u32,
        write_i32: i32,
        write_u64: u64,
        write_i64: i64,
        write_f32: f32,
        write_f64: f64,
    );

    /// Writes a bool as a single byte (0 or 1).
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Pads with zero bytes to the next multiple of `n`.
    pub fn align(&mut self, n: usize) {
        self.pad_to(align_up(self.buf.len(), n.max(1)));
    }

    /// Pads with zero bytes up to an absolute position. No-op if already past it.
    pub fn pad_to(&mut self, target: usize) {
        while self.buf.len() < target {
            self.buf.push(0);
        }
    }

    /// Aligns to 4, reserves a 4-byte slot for a relative pointer and returns
    /// its position. The slot is zero-filled until patched.
    pub fn reserve_rel_ptr32(&mut self) -> usize {
        self.align(4);
        let pos = self.buf.len();
        self.write_bytes(&[0u8; 4]);
        pos
    }

    /// Patches the 4-byte slot at `from` with the signed delta `to - from`.
    /// Does not move the cursor.
    pub fn write_rel_ptr32_at(&mut self, from: usize, to: usize) {
        let delta = (to as i64 - from as i64) as i32;
        self.buf[from..from + 4].copy_from_slice(&delta.to_le_bytes());
    }

    /// Aligns to 4 and writes a relative pointer to `to` at the cursor.
    pub fn write_rel_ptr32(&mut self, to: usize) {
        self.align(4);
        let pos = self.buf.len();
        let delta = (to as i64 - pos as i64) as i32;
        self.write_bytes(&delta.to_le_bytes());
    }

    /// Aligns to 4 and writes the null relative pointer (delta 0).
    pub fn write_null_rel_ptr32(&mut self) {
        self.align(4);
        self.write_bytes(&0i32.to_le_bytes());
    }

    /// Consumes the writer and returns exactly the bytes written so far.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Clears the buffer for reuse, keeping the allocated capacity.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

// --- READ SIDE ---

macro_rules! impl_read_primitive {
    ($($name:ident: $t:ty),* $(,)?) => {
        $(
            /// Reads a little-endian value at `offset`. The caller is responsible
            /// for alignment via codec-computed offsets.
            pub fn $name(&self, offset: usize) -> $t {
                let width = std::mem::size_of::<$t>();
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(&self.bytes[offset..offset + width]);
                <$t>::from_le_bytes(raw)
            }
        )*
    };
}

/// A non-owning, read-only little-endian view over an archive buffer.
///
/// `Reader` is `Copy` and may be shared freely for concurrent decodes as long
/// as the underlying buffer is not mutated. This layer performs no integrity
/// validation; feeding it a truncated buffer is a fatal caller error.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Wraps an immutable byte range.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The start offset of the root value: `buffer_length - root_size`.
    pub fn root_pos(&self, root_size: usize) -> usize {
        self.bytes.len() - root_size
    }

    impl_read_primitive!(
        read_u8: u8,
        read_i8: i8,
        read_u16: u16,
        read_i16: i16,
        read_u32: u32,
        read_i32: i32,
        read_u64: u64,
        read_i64: i64,
        read_f32: f32,
        read_f64: f64,
    );

    /// Returns `len` raw bytes starting at `offset`.
    pub fn read_slice(&self, offset: usize, len: usize) -> &'a [u8] {
        &self.bytes[offset..offset + len]
    }

    /// Resolves a 16-bit relative pointer stored at `offset`.
    pub fn read_rel_ptr16(&self, offset: usize) -> usize {
        (offset as i64 + i64::from(self.read_i16(offset))) as usize
    }

    /// Resolves a 32-bit relative pointer stored at `offset`:
    /// target = `offset + stored signed delta`.
    pub fn read_rel_ptr32(&self, offset: usize) -> usize {
        (offset as i64 + i64::from(self.read_i32(offset))) as usize
    }

    /// Resolves a 64-bit relative pointer stored at `offset`.
    pub fn read_rel_ptr64(&self, offset: usize) -> usize {
        (offset as i64 + self.read_i64(offset)) as usize
    }
}
