//! Two bounded LRU caches: history -> bigram record, history -> final score.
//!
//! libchinese-core's `engine.rs` wraps `lru::LruCache` in a `RefCell` for a
//! single-threaded candidate cache — the same crate and the same
//! interior-mutability shape is used here for `ProbCache`.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::records::BigramRecord;

/// `history -> bigram record` and `history -> final trigram score` LRUs.
/// Bounded sizes per `Config::trigram_cache_size` / `bigram_cache_size`.
pub struct ProbCache {
    bigram_cache: LruCache<(u32, u32), BigramRecord>,
    trigram_cache: LruCache<(u32, u32, u32), f32>,
}

impl ProbCache {
    pub fn new(bigram_cache_size: usize, trigram_cache_size: usize) -> Self {
        ProbCache {
            bigram_cache: LruCache::new(non_zero(bigram_cache_size)),
            trigram_cache: LruCache::new(non_zero(trigram_cache_size)),
        }
    }

    pub fn get_bigram(&mut self, w1: u32, w2: u32) -> Option<BigramRecord> {
        self.bigram_cache.get(&(w1, w2)).copied()
    }

    pub fn insert_bigram(&mut self, w1: u32, w2: u32, record: BigramRecord) {
        self.bigram_cache.put((w1, w2), record);
    }

    pub fn get_trigram(&mut self, w1: u32, w2: u32, w3: u32) -> Option<f32> {
        self.trigram_cache.get(&(w1, w2, w3)).copied()
    }

    pub fn insert_trigram(&mut self, w1: u32, w2: u32, w3: u32, score: f32) {
        self.trigram_cache.put((w1, w2, w3), score);
    }

    pub fn bigram_len(&self) -> usize {
        self.bigram_cache.len()
    }

    pub fn trigram_len(&self) -> usize {
        self.trigram_cache.len()
    }

    /// Resets both LRUs — used by `stop()` when
    /// `clear_caches_after_utterance` is configured.
    pub fn clear(&mut self) {
        self.bigram_cache.clear();
        self.trigram_cache.clear();
    }
}

fn non_zero(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::new(1).unwrap())
}
