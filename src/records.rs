//! Packed on-disk record layouts and their decoded in-memory counterparts.
//!
//! The shape of a compact sorted record table follows libchinese-core's
//! `single_gram.rs` (sorted `Vec<(token, freq)>` with binary-search lookup);
//! manual little/big-endian integer packing instead of a generic
//! serialization crate on the per-record hot path follows akaza's
//! `lm/system_bigram.rs`.

use crate::log_math::LogMath;

/// Decoded unigram record. Probabilities are in the host log base, after
/// conversion from the on-disk log10 values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnigramRecord {
    pub log_prob: f32,
    pub log_backoff: f32,
    pub first_bigram_entry: u32,
    pub word_id: u32,
}

/// Bytes per unigram record on disk: log10_prob, log10_backoff (f32 each),
/// first_bigram_entry, word_id (u32 each).
pub const UNIGRAM_RECORD_LEN: usize = 16;

impl UnigramRecord {
    pub fn decode(buf: &[u8], big_endian: bool, log_math: &LogMath) -> Self {
        let f32_at = |lo: usize| -> f32 {
            let bytes: [u8; 4] = buf[lo..lo + 4].try_into().unwrap();
            if big_endian {
                f32::from_be_bytes(bytes)
            } else {
                f32::from_le_bytes(bytes)
            }
        };
        let u32_at = |lo: usize| -> u32 {
            let bytes: [u8; 4] = buf[lo..lo + 4].try_into().unwrap();
            if big_endian {
                u32::from_be_bytes(bytes)
            } else {
                u32::from_le_bytes(bytes)
            }
        };
        UnigramRecord {
            log_prob: log_math.to_host(f32_at(0)),
            log_backoff: log_math.to_host(f32_at(4)),
            first_bigram_entry: u32_at(8),
            word_id: u32_at(12),
        }
    }
}

/// A decoded bigram follower record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigramRecord {
    pub word_id: u16,
    pub probability_id: u16,
    pub backoff_id: u16,
    pub first_trigram_entry: u16,
}

pub const BIGRAM_RECORD_LEN: usize = 8;

impl BigramRecord {
    pub fn decode(buf: &[u8], big_endian: bool) -> Self {
        let u16_at = |lo: usize| -> u16 {
            let bytes: [u8; 2] = buf[lo..lo + 2].try_into().unwrap();
            if big_endian {
                u16::from_be_bytes(bytes)
            } else {
                u16::from_le_bytes(bytes)
            }
        };
        BigramRecord {
            word_id: u16_at(0),
            probability_id: u16_at(2),
            backoff_id: u16_at(4),
            first_trigram_entry: u16_at(6),
        }
    }

    #[cfg(test)]
    pub fn encode(&self, big_endian: bool) -> [u8; BIGRAM_RECORD_LEN] {
        let mut out = [0u8; BIGRAM_RECORD_LEN];
        let wr16 = |out: &mut [u8; BIGRAM_RECORD_LEN], lo: usize, v: u16| {
            let bytes = if big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            };
            out[lo..lo + 2].copy_from_slice(&bytes);
        };
        wr16(&mut out, 0, self.word_id);
        wr16(&mut out, 2, self.probability_id);
        wr16(&mut out, 4, self.backoff_id);
        wr16(&mut out, 6, self.first_trigram_entry);
        out
    }
}

/// A decoded trigram follower record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrigramRecord {
    pub word_id: u16,
    pub probability_id: u16,
}

pub const TRIGRAM_RECORD_LEN: usize = 4;

impl TrigramRecord {
    pub fn decode(buf: &[u8], big_endian: bool) -> Self {
        let u16_at = |lo: usize| -> u16 {
            let bytes: [u8; 2] = buf[lo..lo + 2].try_into().unwrap();
            if big_endian {
                u16::from_be_bytes(bytes)
            } else {
                u16::from_le_bytes(bytes)
            }
        };
        TrigramRecord {
            word_id: u16_at(0),
            probability_id: u16_at(2),
        }
    }

    #[cfg(test)]
    pub fn encode(&self, big_endian: bool) -> [u8; TRIGRAM_RECORD_LEN] {
        let mut out = [0u8; TRIGRAM_RECORD_LEN];
        let wr16 = |out: &mut [u8; TRIGRAM_RECORD_LEN], lo: usize, v: u16| {
            let bytes = if big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            };
            out[lo..lo + 2].copy_from_slice(&bytes);
        };
        wr16(&mut out, 0, self.word_id);
        wr16(&mut out, 2, self.probability_id);
        out
    }
}
