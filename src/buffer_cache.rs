//! On-demand bigram/trigram slice loading with per-utterance lifetimes.
//!
//! The interior-mutability caching idiom used throughout this crate follows
//! libchinese-core's `engine.rs`, which wraps `RefCell<lru::LruCache<...>>`
//! around a model for its IME candidate cache. The epoch-based `used` flag
//! sweep below has no teacher analogue; it exists purely to give bigram
//! slots a per-utterance lifetime without a size-bounded LRU.

use ahash::AHashMap;
use tracing::debug;

use crate::buffer::{BigramBuffer, TrigramBuffer};
use crate::error::Result;
use crate::loader::BinaryLoader;
use crate::records::BIGRAM_RECORD_LEN;
use crate::segment::SegmentIndex;
use crate::word::WordId;

/// Demand-loads `BigramBuffer`s (one slot per predecessor, epoch-evicted)
/// and `TrigramBuffer`s (unbounded per-utterance map).
pub struct BufferCache {
    bigram_slots: Vec<Option<BigramBuffer>>,
    trigram_slots: AHashMap<(u32, u32), TrigramBuffer>,
    segment_index: SegmentIndex,
}

impl BufferCache {
    pub fn new(n_unigrams: usize, segment_index: SegmentIndex) -> Self {
        BufferCache {
            bigram_slots: (0..n_unigrams).map(|_| None).collect(),
            trigram_slots: AHashMap::new(),
            segment_index,
        }
    }

    /// Returns the cached slot for `w1`, marking it used, or loads it from
    /// disk. Returns `None` if `w1` has no followers.
    pub fn get_bigram(&mut self, loader: &mut BinaryLoader, w1: WordId) -> Result<Option<&BigramBuffer>> {
        let idx = w1.index();
        if self.bigram_slots[idx].is_some() {
            self.bigram_slots[idx].as_mut().unwrap().mark_used();
            return Ok(self.bigram_slots[idx].as_ref());
        }

        let count = loader.bigram_follower_count(w1);
        if count == 0 {
            return Ok(None);
        }

        let first = loader.unigrams()[idx].first_bigram_entry;
        let offset = loader.bigram_offset() + (first as u64) * BIGRAM_RECORD_LEN as u64;
        let len = (count as usize + 1) * BIGRAM_RECORD_LEN;
        debug!(predecessor = idx, count, "loading bigram buffer");
        let raw = loader.load_buffer(offset, len)?;
        let buf = BigramBuffer::decode(&raw, loader.big_endian());
        self.bigram_slots[idx] = Some(buf);
        Ok(self.bigram_slots[idx].as_ref())
    }

    /// Locates the trigram slice for a two-word history via the bigram's
    /// sentinel-adjacent pair and the segment index.
    pub fn get_trigram(
        &mut self,
        loader: &mut BinaryLoader,
        w1: WordId,
        w2: WordId,
    ) -> Result<Option<&TrigramBuffer>> {
        let key = (w1.0, w2.0);
        if self.trigram_slots.contains_key(&key) {
            return Ok(self.trigram_slots.get(&key));
        }

        let first_bigram_entry_w1 = loader.unigrams()[w1.index()].first_bigram_entry;
        let which_follower = {
            let buf = match self.get_bigram(loader, w1)? {
                Some(b) => b,
                None => return Ok(None),
            };
            match buf.find(w2.0) {
                Some(i) => i,
                None => return Ok(None),
            }
        };

        let (b, b_next) = {
            let buf = self.bigram_slots[w1.index()].as_ref().unwrap();
            (buf.record(which_follower), buf.record(which_follower + 1))
        };

        let start = self
            .segment_index
            .start_entry(first_bigram_entry_w1 + which_follower as u32, b.first_trigram_entry);
        let next = self.segment_index.start_entry(
            first_bigram_entry_w1 + which_follower as u32 + 1,
            b_next.first_trigram_entry,
        );
        let count = next - start;
        if count == 0 {
            return Ok(None);
        }

        debug!(w1 = w1.0, w2 = w2.0, count, "loading trigram buffer");
        let offset = loader.trigram_offset() + (start as u64) * crate::records::TRIGRAM_RECORD_LEN as u64;
        let raw = loader.load_buffer(offset, count as usize * crate::records::TRIGRAM_RECORD_LEN)?;
        let buf = TrigramBuffer::decode(&raw, loader.big_endian());
        self.trigram_slots.insert(key, buf);
        Ok(self.trigram_slots.get(&key))
    }

    /// Clears `used` flags, dropping slots untouched since the previous
    /// call, and drops the whole trigram map.
    pub fn stop_utterance(&mut self) {
        for slot in self.bigram_slots.iter_mut() {
            if let Some(buf) = slot {
                if buf.is_used() {
                    buf.clear_used();
                } else {
                    *slot = None;
                }
            }
        }
        self.trigram_slots.clear();
    }

    /// Number of live bigram slots, exposed for cache-transparency tests.
    pub fn loaded_bigram_count(&self) -> usize {
        self.bigram_slots.iter().filter(|s| s.is_some()).count()
    }
}
