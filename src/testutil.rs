//! Synthetic binary model builder, used only by `#[cfg(test)]` modules.
//!
//! Follows libchinese-core's `lexicon.rs` test module, which writes to
//! `std::env::temp_dir().join(...)` rather than pulling in a temp-file
//! crate; the same idiom is used here.

#![cfg(test)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn temp_model_path(tag: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("slm_core_test_{tag}_{n}.bin"))
}

pub struct UnigramSpec {
    pub log10_prob: f32,
    pub log10_backoff: f32,
    pub first_bigram_entry: u32,
    pub word_id: u32,
}

pub struct BigramSpec {
    pub word_id: u16,
    pub probability_id: u16,
    pub backoff_id: u16,
    pub first_trigram_entry: u16,
}

pub struct TrigramSpec {
    pub word_id: u16,
    pub probability_id: u16,
}

/// Builds a complete little-endian model file byte-for-byte: header, word
/// list, unigram table, the three de-duplicated tables, segment table, the
/// packed bigram section, then the packed trigram section. Callers that
/// don't need real trigrams can leave `trigram_records` empty.
pub struct ModelBuilder {
    pub words: Vec<&'static str>,
    pub unigrams: Vec<UnigramSpec>,
    pub bigram_prob_table: Vec<f32>,
    pub trigram_prob_table: Vec<f32>,
    pub trigram_backoff_table: Vec<f32>,
    pub log_bigram_segment_size: u32,
    pub trigram_segment_table: Vec<u32>,
    /// Real follower records only (no sentinel), one slice per predecessor
    /// with nonzero followers, in predecessor order. `write` concatenates
    /// every slice into a single flat array and appends one trailing
    /// sentinel record for the whole model — the on-disk bigram section is
    /// one global array, not one sentinel-terminated array per predecessor.
    pub bigram_slices: Vec<Vec<BigramSpec>>,
    /// `first_trigram_entry` carried by the trailing global sentinel
    /// appended after the last real bigram record. Callers must keep this
    /// consistent with `trigram_segment_table` so that the last
    /// predecessor's span is computed correctly.
    pub sentinel_first_trigram_entry: u16,
    /// Flat, contiguous trigram records. Callers are responsible for
    /// keeping `first_trigram_entry`/`trigram_segment_table` consistent
    /// with where each bigram's slice starts in this list.
    pub trigram_records: Vec<TrigramSpec>,
    pub max_depth: u32,
}

impl ModelBuilder {
    pub fn write(&self, path: &std::path::Path) {
        let n_unigrams = self.words.len() as u32;
        let n_bigrams: u32 = self.bigram_slices.iter().map(|s| s.len() as u32).sum();

        let mut words_bytes = Vec::new();
        for w in &self.words {
            words_bytes.extend_from_slice(&(w.len() as u32).to_le_bytes());
            words_bytes.extend_from_slice(w.as_bytes());
        }

        let mut unigram_bytes = Vec::new();
        for u in &self.unigrams {
            unigram_bytes.extend_from_slice(&u.log10_prob.to_le_bytes());
            unigram_bytes.extend_from_slice(&u.log10_backoff.to_le_bytes());
            unigram_bytes.extend_from_slice(&u.first_bigram_entry.to_le_bytes());
            unigram_bytes.extend_from_slice(&u.word_id.to_le_bytes());
        }

        let mut bigram_prob_bytes = Vec::new();
        for p in &self.bigram_prob_table {
            bigram_prob_bytes.extend_from_slice(&p.to_le_bytes());
        }
        let mut trigram_prob_bytes = Vec::new();
        for p in &self.trigram_prob_table {
            trigram_prob_bytes.extend_from_slice(&p.to_le_bytes());
        }
        let mut trigram_backoff_bytes = Vec::new();
        for p in &self.trigram_backoff_table {
            trigram_backoff_bytes.extend_from_slice(&p.to_le_bytes());
        }
        let mut segment_bytes = Vec::new();
        for s in &self.trigram_segment_table {
            segment_bytes.extend_from_slice(&s.to_le_bytes());
        }

        let mut bigram_section = Vec::new();
        for slice in &self.bigram_slices {
            for r in slice {
                bigram_section.extend_from_slice(&r.word_id.to_le_bytes());
                bigram_section.extend_from_slice(&r.probability_id.to_le_bytes());
                bigram_section.extend_from_slice(&r.backoff_id.to_le_bytes());
                bigram_section.extend_from_slice(&r.first_trigram_entry.to_le_bytes());
            }
        }
        bigram_section.extend_from_slice(&0xFFFFu16.to_le_bytes());
        bigram_section.extend_from_slice(&0u16.to_le_bytes());
        bigram_section.extend_from_slice(&0u16.to_le_bytes());
        bigram_section.extend_from_slice(&self.sentinel_first_trigram_entry.to_le_bytes());

        let mut trigram_section = Vec::new();
        for r in &self.trigram_records {
            trigram_section.extend_from_slice(&r.word_id.to_le_bytes());
            trigram_section.extend_from_slice(&r.probability_id.to_le_bytes());
        }

        let header_len = crate::header::HEADER_LEN as u64;
        let bigram_offset =
            header_len + words_bytes.len() as u64 + unigram_bytes.len() as u64
                + bigram_prob_bytes.len() as u64
                + trigram_prob_bytes.len() as u64
                + trigram_backoff_bytes.len() as u64
                + segment_bytes.len() as u64;
        let trigram_offset = bigram_offset + bigram_section.len() as u64;

        let header = crate::header::Header {
            format: 1,
            big_endian: false,
            max_depth: self.max_depth,
            log_bigram_segment_size: self.log_bigram_segment_size,
            n_unigrams,
            n_bigrams,
            n_trigrams: self.trigram_records.len() as u32,
            n_bigram_probs: self.bigram_prob_table.len() as u32,
            n_trigram_probs: self.trigram_prob_table.len() as u32,
            n_trigram_backoffs: self.trigram_backoff_table.len() as u32,
            n_segments: self.trigram_segment_table.len() as u32,
            bigram_offset,
            trigram_offset,
        };

        let mut out = Vec::new();
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&words_bytes);
        out.extend_from_slice(&unigram_bytes);
        out.extend_from_slice(&bigram_prob_bytes);
        out.extend_from_slice(&trigram_prob_bytes);
        out.extend_from_slice(&trigram_backoff_bytes);
        out.extend_from_slice(&segment_bytes);
        out.extend_from_slice(&bigram_section);
        out.extend_from_slice(&trigram_section);

        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(&out).unwrap();
    }
}
