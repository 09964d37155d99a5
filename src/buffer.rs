//! Decoded record slices with ordered lookup by follower word id.
//!
//! The binary-search shape follows libchinese-core's `single_gram.rs`,
//! whose `SingleGram::get_freq`/`search_range` do exactly this over a
//! sorted `Vec<(token, _)>`. `BigramBuffer` and `TrigramBuffer` are plain
//! values over an owned byte span rather than shared references.

use crate::records::{BigramRecord, TrigramRecord, BIGRAM_RECORD_LEN, TRIGRAM_RECORD_LEN};

/// A decoded slice of bigram records for one predecessor word.
///
/// The slice includes one trailing record beyond the predecessor's real
/// followers — either the next predecessor's first follower, or, for the
/// last predecessor in the model, the model's global sentinel. Only its
/// `first_trigram_entry` field is ever read. If the predecessor has `n`
/// followers, this buffer holds `n + 1` records, and `len()` returns `n`,
/// not `n + 1`.
#[derive(Debug, Clone)]
pub struct BigramBuffer {
    records: Vec<BigramRecord>,
    used: bool,
}

impl BigramBuffer {
    /// Builds a buffer from a raw byte slice covering `count + 1` records
    /// (the real followers plus the sentinel).
    pub fn decode(raw: &[u8], big_endian: bool) -> Self {
        debug_assert_eq!(raw.len() % BIGRAM_RECORD_LEN, 0);
        let records: Vec<BigramRecord> = raw
            .chunks_exact(BIGRAM_RECORD_LEN)
            .map(|c| BigramRecord::decode(c, big_endian))
            .collect();
        debug_assert!(
            records.len() < 2 || records[..records.len() - 1]
                .windows(2)
                .all(|w| w[0].word_id < w[1].word_id),
            "bigram followers must be strictly increasing by word id"
        );
        BigramBuffer {
            records,
            used: true,
        }
    }

    /// Number of real follower records (excludes the sentinel).
    pub fn len(&self) -> usize {
        self.records.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the record at index `i`, where `i` may equal `len()` to
    /// reach the trailing record needed by the trigram-offset math.
    pub fn record(&self, i: usize) -> BigramRecord {
        self.records[i]
    }

    /// Binary search for `word_id` among the real followers.
    pub fn find(&self, word_id: u32) -> Option<usize> {
        let word_id = word_id as u16;
        let real = &self.records[..self.len()];
        real.binary_search_by_key(&word_id, |r| r.word_id).ok()
    }

    pub fn mark_used(&mut self) {
        self.used = true;
    }

    pub fn clear_used(&mut self) {
        self.used = false;
    }

    pub fn is_used(&self) -> bool {
        self.used
    }
}

/// A decoded slice of trigram records for one (w1, w2) history.
#[derive(Debug, Clone)]
pub struct TrigramBuffer {
    records: Vec<TrigramRecord>,
}

impl TrigramBuffer {
    pub fn decode(raw: &[u8], big_endian: bool) -> Self {
        debug_assert_eq!(raw.len() % TRIGRAM_RECORD_LEN, 0);
        let records: Vec<TrigramRecord> = raw
            .chunks_exact(TRIGRAM_RECORD_LEN)
            .map(|c| TrigramRecord::decode(c, big_endian))
            .collect();
        debug_assert!(
            records.windows(2).all(|w| w[0].word_id < w[1].word_id),
            "trigram followers must be strictly increasing by word id"
        );
        TrigramBuffer { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, i: usize) -> TrigramRecord {
        self.records[i]
    }

    pub fn find(&self, word_id: u32) -> Option<usize> {
        let word_id = word_id as u16;
        self.records.binary_search_by_key(&word_id, |r| r.word_id).ok()
    }
}
