//! The split hash backing the Swiss-table engine.
//!
//! The format mandates this exact 64-bit multiply-rotate-xor hash: control-byte
//! placement is part of the wire layout, so a third-party hasher cannot stand in
//! for it. Input is consumed as 8-byte little-endian words with 4/2/1-byte tail
//! chunks; string keys additionally hash a trailing 0xFF terminator byte.

/// Multiplicative seed constant.
const SEED: u64 = 0x517cc1b727220a95;

/// Left-rotation applied to the state before each word is mixed in.
const ROTATE: u32 = 5;

/// Streaming word hasher with a 64-bit state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FxHasher64 {
    state: u64,
}

impl FxHasher64 {
    /// Creates a hasher with the zero initial state.
    pub fn new() -> Self {
        Self::default()
    }

    fn mix(&mut self, word: u64) {
        self.state = (self.state.rotate_left(ROTATE) ^ word).wrapping_mul(SEED);
    }

    /// Hashes a byte slice: 8-byte LE words, then a 4-, 2- and 1-byte tail.
    pub fn write(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while rest.len() >= 8 {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&rest[..8]);
            self.mix(u64::from_le_bytes(raw));
            rest = &rest[8..];
        }
        if rest.len() >= 4 {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&rest[..4]);
            self.mix(u64::from(u32::from_le_bytes(raw)));
            rest = &rest[4..];
        }
        if rest.len() >= 2 {
            let mut raw = [0u8; 2];
            raw.copy_from_slice(&rest[..2]);
            self.mix(u64::from(u16::from_le_bytes(raw)));
            rest = &rest[2..];
        }
        if let Some(&byte) = rest.first() {
            self.mix(u64::from(byte));
        }
    }

    /// Hashes a single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.mix(u64::from(v));
    }

    /// Hashes a 16-bit word.
    pub fn write_u16(&mut self, v: u16) {
        self.mix(u64::from(v));
    }

    /// Hashes a 32-bit word.
    pub fn write_u32(&mut self, v: u32) {
        self.mix(u64::from(v));
    }

    /// Hashes a 64-bit word.
    pub fn write_u64(&mut self, v: u64) {
        self.mix(v);
    }

    /// The current hash value.
    pub fn finish(&self) -> u64 {
        self.state
    }
}

/// Extracts a slot-control byte from a hash: the top 7 bits.
///
/// Values below 0x80 mean "occupied"; 0xFF is the empty sentinel.
pub fn h2(hash: u64) -> u8 {
    ((hash >> 57) & 0x7F) as u8
}

/// The control byte marking an empty slot.
pub const EMPTY: u8 = 0xFF;
