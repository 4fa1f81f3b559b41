//! Fixed-length bit vector backing one filter shard.
//!
//! Bits are packed into 64-bit words, least significant bit first:
//!
//! ```text
//! Word 0: [bit 0][bit 1]...[bit 63]
//! Word 1: [bit 64][bit 65]...[bit 127]
//! ```
//!
//! Exported as bytes, word `w` contributes its little-endian bytes, so byte `j`
//! holds bits `8j..8j+8` with bit `8j` in the least significant position. This is
//! the packed layout of the persisted shard payload.
//!
//! # Thread Safety
//!
//! `set` takes `&mut self`. Shared `&BitVec` references only read, so a built
//! filter can serve concurrent lookups; writers must be serialized by the caller.
//!
//! # Examples
//!
//! ```
//! use pwnedbloom::core::bitvec::BitVec;
//!
//! let mut bv = BitVec::new(100).unwrap();
//! bv.set(42);
//! assert!(bv.get(42));
//! assert!(!bv.get(43));
//! assert_eq!(bv.count_ones(), 1);
//! ```

use crate::error::{PwnedBloomError, Result};

/// Fixed-length bit array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitVec {
    /// Storage words, 64 bits each.
    blocks: Box<[u64]>,

    /// Total number of bits in the vector.
    len: usize,
}

impl BitVec {
    /// Create a bit vector of `num_bits` zero bits.
    ///
    /// # Errors
    ///
    /// Returns [`PwnedBloomError::InvalidParameters`] if `num_bits` is 0.
    pub fn new(num_bits: usize) -> Result<Self> {
        if num_bits == 0 {
            return Err(PwnedBloomError::invalid_parameters(
                "BitVec size must be greater than 0",
            ));
        }

        Ok(Self {
            blocks: vec![0u64; num_bits.div_ceil(64)].into_boxed_slice(),
            len: num_bits,
        })
    }

    /// Number of bits.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always `false` for a constructed vector; provided for API completeness.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set the bit at `index` to 1. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`, like slice indexing.
    #[inline]
    pub fn set(&mut self, index: usize) {
        assert!(
            index < self.len,
            "BitVec index out of bounds: index={} len={}",
            index,
            self.len
        );
        self.blocks[index / 64] |= 1u64 << (index % 64);
    }

    /// Read the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(
            index < self.len,
            "BitVec index out of bounds: index={} len={}",
            index,
            self.len
        );
        self.blocks[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Number of bits set to 1.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.blocks.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Fraction of bits set to 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fill_ratio(&self) -> f64 {
        self.count_ones() as f64 / self.len as f64
    }

    /// Heap plus inline bytes held by this vector.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.blocks.len() * std::mem::size_of::<u64>() + std::mem::size_of::<Self>()
    }

    /// Packed byte length: `⌈len / 8⌉`.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.len.div_ceil(8)
    }

    /// Export the bits as `⌈len / 8⌉` packed bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        self.write_bytes(&mut out);
        out
    }

    /// Append the packed bytes to `out`.
    pub fn write_bytes(&self, out: &mut Vec<u8>) {
        let byte_len = self.byte_len();
        let full_words = byte_len / 8;
        for word in &self.blocks[..full_words] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        let tail = byte_len % 8;
        if tail > 0 {
            out.extend_from_slice(&self.blocks[full_words].to_le_bytes()[..tail]);
        }
    }

    /// Rebuild a vector of `len` bits from packed bytes.
    ///
    /// Padding bits past `len` in the final byte are cleared.
    ///
    /// # Errors
    ///
    /// Returns [`PwnedBloomError::InvalidParameters`] if `len` is 0 or
    /// `bytes.len() != ⌈len / 8⌉`.
    pub fn from_bytes(bytes: &[u8], len: usize) -> Result<Self> {
        let mut bv = Self::new(len)?;
        if bytes.len() != bv.byte_len() {
            return Err(PwnedBloomError::invalid_parameters(format!(
                "need {} bytes for {} bits, got {}",
                bv.byte_len(),
                len,
                bytes.len()
            )));
        }

        for (block, chunk) in bv.blocks.iter_mut().zip(bytes.chunks(8)) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            *block = u64::from_le_bytes(word);
        }

        let used = len % 64;
        if used != 0 {
            if let Some(last) = bv.blocks.last_mut() {
                *last &= (1u64 << used) - 1;
            }
        }

        Ok(bv)
    }
}
