//! High-level entry points: one-call encode/decode over byte buffers and
//! memory-mapped access to archives on disk.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;

use crate::codec::{access_root, decode_root, encode_to_vec, Codec};
use crate::error::{RelcodeError, Result};
use crate::lazy::Lazy;
use crate::value::Value;

/// The main entry point for producing archives.
#[derive(Debug)]
pub struct Relcode;

impl Relcode {
    /// Encodes `value` with `codec` into a fresh archive buffer.
    ///
    /// The root value occupies the final `codec.size()` bytes of the result;
    /// everything it references sits at lower offsets.
    pub fn encode(codec: &dyn Codec, value: &Value) -> Result<Vec<u8>> {
        encode_to_vec(codec, value)
    }

    /// Eagerly decodes the root value of an archive buffer.
    pub fn decode(codec: &dyn Codec, bytes: &[u8]) -> Result<Value> {
        check_root_fits(codec, bytes.len())?;
        decode_root(codec, bytes)
    }

    /// Builds a lazy view over the root value of an archive buffer.
    pub fn access<'a>(codec: &dyn Codec, bytes: &'a [u8]) -> Result<Lazy<'a>> {
        check_root_fits(codec, bytes.len())?;
        access_root(codec, bytes)
    }

    /// Encodes `value` and writes the archive to `path`.
    pub fn save<P: AsRef<Path>>(path: P, codec: &dyn Codec, value: &Value) -> Result<()> {
        let bytes = encode_to_vec(codec, value)?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(())
    }
}

fn check_root_fits(codec: &dyn Codec, len: usize) -> Result<()> {
    if len < codec.size() {
        return Err(RelcodeError::Decode(format!(
            "archive is {len} bytes, root value needs {}",
            codec.size()
        )));
    }
    Ok(())
}

/// A memory-mapped archive file.
///
/// The handle borrows nothing from the codec; one reader may serve any number
/// of decode or access calls, with different codecs if the file holds a root
/// whose layout they agree on.
#[derive(Debug)]
pub struct RelcodeReader {
    mmap: Mmap,
}

impl RelcodeReader {
    /// Opens and memory-maps an archive file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;

        // Safety: the map is read-only and we assume no other process mutates
        // the file while it is open.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self { mmap })
    }

    /// The raw mapped bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Total file length in bytes.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// True if the file is empty.
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Eagerly decodes the root value.
    pub fn decode_root(&self, codec: &dyn Codec) -> Result<Value> {
        Relcode::decode(codec, &self.mmap)
    }

    /// Builds a lazy view over the root value, borrowing from the map.
    pub fn access_root(&self, codec: &dyn Codec) -> Result<Lazy<'_>> {
        Relcode::access(codec, &self.mmap)
    }
}
