//! Fixed-width binary model header.
//!
//! The shape of a versioned binary header with a magic/version prelude
//! follows kotadb's `binary_trigram_index.rs` `IndexHeader`; packing fields
//! with explicit `to_le_bytes`/`from_le_bytes` rather than reaching for a
//! serialization crate on the hot path follows akaza's `lm/system_bigram.rs`.
//!
//! Every field is a fixed 32-bit or 64-bit integer, in the file's own byte
//! order.

use crate::error::{LmError, Result};

pub const MAGIC: u32 = 0x534C_4D31; // "SLM1"

#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub format: u32,
    pub big_endian: bool,
    pub max_depth: u32,
    pub log_bigram_segment_size: u32,
    pub n_unigrams: u32,
    pub n_bigrams: u32,
    pub n_trigrams: u32,
    pub n_bigram_probs: u32,
    pub n_trigram_probs: u32,
    pub n_trigram_backoffs: u32,
    pub n_segments: u32,
    pub bigram_offset: u64,
    pub trigram_offset: u64,
}

/// Size in bytes of the fixed header on disk.
pub const HEADER_LEN: usize = 4 * 12 + 8 * 2;

impl Header {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(LmError::Truncated {
                section: "header",
                wanted: HEADER_LEN,
                had: buf.len(),
            });
        }

        // Endianness of the magic itself is unknown yet, so probe both.
        let magic_le = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let magic_be = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        let big_endian = if magic_le == MAGIC {
            false
        } else if magic_be == MAGIC {
            true
        } else {
            return Err(LmError::BadMagic {
                found: magic_le,
                expected: MAGIC,
            });
        };

        let rd = |lo: usize, hi: usize| -> u32 {
            let bytes: [u8; 4] = buf[lo..hi].try_into().unwrap();
            if big_endian {
                u32::from_be_bytes(bytes)
            } else {
                u32::from_le_bytes(bytes)
            }
        };
        let rd64 = |lo: usize, hi: usize| -> u64 {
            let bytes: [u8; 8] = buf[lo..hi].try_into().unwrap();
            if big_endian {
                u64::from_be_bytes(bytes)
            } else {
                u64::from_le_bytes(bytes)
            }
        };

        Ok(Header {
            format: rd(4, 8),
            big_endian,
            max_depth: rd(12, 16),
            log_bigram_segment_size: rd(16, 20),
            n_unigrams: rd(20, 24),
            n_bigrams: rd(24, 28),
            n_trigrams: rd(28, 32),
            n_bigram_probs: rd(32, 36),
            n_trigram_probs: rd(36, 40),
            n_trigram_backoffs: rd(40, 44),
            n_segments: rd(44, 48),
            bigram_offset: rd64(48, 56),
            trigram_offset: rd64(56, 64),
        })
    }

    /// Serializes a header back to bytes — used by tests to build
    /// synthetic model files in memory.
    #[cfg(test)]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        let wr32 = |out: &mut Vec<u8>, v: u32, be: bool| {
            if be {
                out.extend_from_slice(&v.to_be_bytes());
            } else {
                out.extend_from_slice(&v.to_le_bytes());
            }
        };
        let wr64 = |out: &mut Vec<u8>, v: u64, be: bool| {
            if be {
                out.extend_from_slice(&v.to_be_bytes());
            } else {
                out.extend_from_slice(&v.to_le_bytes());
            }
        };
        let be = self.big_endian;
        wr32(&mut out, MAGIC, be);
        wr32(&mut out, self.format, be);
        wr32(&mut out, be as u32, be);
        wr32(&mut out, self.max_depth, be);
        wr32(&mut out, self.log_bigram_segment_size, be);
        wr32(&mut out, self.n_unigrams, be);
        wr32(&mut out, self.n_bigrams, be);
        wr32(&mut out, self.n_trigrams, be);
        wr32(&mut out, self.n_bigram_probs, be);
        wr32(&mut out, self.n_trigram_probs, be);
        wr32(&mut out, self.n_trigram_backoffs, be);
        wr32(&mut out, self.n_segments, be);
        wr64(&mut out, self.bigram_offset, be);
        wr64(&mut out, self.trigram_offset, be);
        out
    }
}
