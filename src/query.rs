//! `P(w)`, `P(w|w')`, `P(w|w'',w')` with Katz back-off.
//!
//! The overall "walk down from highest order, fall back on miss" shape
//! follows libchinese-core's `ngram.rs` `score_sequence`, generalized here
//! to a disk-resident, cached, index-arithmetic-heavy version — the
//! teacher's own n-gram scoring has no disk-residency or segment-index
//! arithmetic at all.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

use ahash::AHashMap;

use crate::buffer_cache::BufferCache;
use crate::config::Config;
use crate::error::{LmError, Result};
use crate::loader::BinaryLoader;
use crate::prob_cache::ProbCache;
use crate::segment::SegmentIndex;
use crate::smear::SmearEngine;
use crate::word::{WordId, WordResolver};

/// Per-instance instrumentation; counters reset with the engine, not
/// process-wide.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counters {
    pub bigram_misses: u64,
    pub trigram_misses: u64,
    pub trigram_hits: u64,
}

/// Implements `P(w)`, `P(w|w')`, `P(w|w'',w')`, backoff lookup, and the
/// `start`/`stop` utterance state machine.
pub struct QueryEngine {
    loader: BinaryLoader,
    buffer_cache: BufferCache,
    prob_cache: ProbCache,
    config: Config,
    word_to_id: AHashMap<String, WordId>,
    counters: Counters,
    query_log: Option<File>,
    max_depth: usize,
}

impl QueryEngine {
    pub fn new(loader: BinaryLoader, config: Config) -> Result<Self> {
        let word_to_id: AHashMap<String, WordId> = loader
            .words()
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), WordId(i as u32)))
            .collect();

        let segment_index = SegmentIndex::new(
            loader.trigram_segment_table().to_vec(),
            loader.log_bigram_segment_size(),
        );
        let buffer_cache = BufferCache::new(loader.words().len(), segment_index);
        let prob_cache = ProbCache::new(config.bigram_cache_size, config.trigram_cache_size);

        let query_log = match &config.query_log_file {
            Some(path) => Some(Self::open_query_log(path)?),
            None => None,
        };

        let max_depth = config.effective_max_depth(loader.max_depth());

        Ok(QueryEngine {
            loader,
            buffer_cache,
            prob_cache,
            config,
            word_to_id,
            counters: Counters::default(),
            query_log,
            max_depth,
        })
    }

    fn open_query_log(path: &PathBuf) -> Result<File> {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LmError::Io {
                section: "query_log_file",
                offset: 0,
                source: e,
            })
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn vocabulary(&self) -> HashSet<String> {
        self.loader.words().iter().cloned().collect()
    }

    pub fn word_id(&self, word: &str) -> Result<WordId> {
        self.word_to_id
            .get(word)
            .copied()
            .ok_or_else(|| LmError::UnknownWord {
                word: word.to_string(),
            })
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn bigram_cache_len(&self) -> usize {
        self.prob_cache.bigram_len()
    }

    pub fn trigram_cache_len(&self) -> usize {
        self.prob_cache.trigram_len()
    }

    /// Optionally emits a marker to the query log.
    pub fn start(&mut self) -> Result<()> {
        if let Some(log) = self.query_log.as_mut() {
            writeln!(log, "<START_UTT>").map_err(|e| LmError::Io {
                section: "query_log_file",
                offset: 0,
                source: e,
            })?;
        }
        Ok(())
    }

    /// Sweeps unused bigram slots, clears the trigram map, and — only if
    /// configured — resets both LRU caches too.
    pub fn stop(&mut self) -> Result<()> {
        self.buffer_cache.stop_utterance();
        if self.config.clear_caches_after_utterance {
            self.prob_cache.clear();
        }
        if let Some(log) = self.query_log.as_mut() {
            writeln!(log, "<END_UTT>").map_err(|e| LmError::Io {
                section: "query_log_file",
                offset: 0,
                source: e,
            })?;
            log.flush().map_err(|e| LmError::Io {
                section: "query_log_file",
                offset: 0,
                source: e,
            })?;
        }
        Ok(())
    }

    fn log_query(&mut self, ws: &[WordId]) -> Result<()> {
        if self.query_log.is_none() {
            return Ok(());
        }
        let words = self.loader.words();
        let line = ws
            .iter()
            .map(|w| words[w.index()].as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let log = self.query_log.as_mut().unwrap();
        writeln!(log, "{line}").map_err(|e| LmError::Io {
            section: "query_log_file",
            offset: 0,
            source: e,
        })
    }

    /// Dispatches on arity, capped by `max_depth`. Greater arities are a
    /// programming error (fatal).
    pub fn probability(&mut self, ws: &[WordId]) -> Result<f32> {
        if ws.is_empty() || ws.len() > 3 {
            return Err(LmError::UnsupportedArity {
                requested: ws.len(),
                max_depth: self.max_depth,
            });
        }
        if ws.len() > self.max_depth {
            return Err(LmError::UnsupportedArity {
                requested: ws.len(),
                max_depth: self.max_depth,
            });
        }

        self.log_query(ws)?;

        match ws.len() {
            1 => self.unigram_probability(ws[0]),
            2 => self.bigram_probability(ws[0], ws[1]),
            3 => self.trigram_probability(ws[0], ws[1], ws[2]),
            _ => unreachable!(),
        }
    }

    fn unigram_probability(&self, w: WordId) -> Result<f32> {
        self.loader
            .unigrams()
            .get(w.index())
            .map(|u| u.log_prob)
            .ok_or_else(|| LmError::UnknownWord {
                word: format!("word id {}", w.0),
            })
    }

    /// Shared by both the bigram-probability path and the trigram backoff
    /// path's inner bigram lookup: LRU lookup, falling back to a
    /// `BufferCache` fetch and ordered search, caching on success. Does not
    /// touch the miss counters — those are specific to *which* caller found
    /// no record.
    fn find_bigram(&mut self, w1: WordId, w2: WordId) -> Result<Option<crate::records::BigramRecord>> {
        if let Some(record) = self.prob_cache.get_bigram(w1.0, w2.0) {
            return Ok(Some(record));
        }
        let found = match self.buffer_cache.get_bigram(&mut self.loader, w1)? {
            Some(buf) => buf.find(w2.0).map(|i| buf.record(i)),
            None => None,
        };
        if let Some(record) = found {
            self.prob_cache.insert_bigram(w1.0, w2.0, record);
        }
        Ok(found)
    }

    fn bigram_probability(&mut self, w1: WordId, w2: WordId) -> Result<f32> {
        if self.loader.bigram_prob_table().is_empty() || w1.index() >= self.loader.unigrams().len()
        {
            return self.unigram_probability(w2);
        }

        match self.find_bigram(w1, w2)? {
            Some(record) => Ok(self.loader.bigram_prob_table()[record.probability_id as usize]),
            None => {
                self.counters.bigram_misses += 1;
                let backoff = self.loader.unigrams()[w1.index()].log_backoff;
                Ok(backoff + self.unigram_probability(w2)?)
            }
        }
    }

    fn trigram_probability(&mut self, w1: WordId, w2: WordId, w3: WordId) -> Result<f32> {
        if self.loader.trigram_prob_table().is_empty() || w1.index() >= self.loader.unigrams().len()
        {
            return self.bigram_probability(w2, w3);
        }

        if let Some(score) = self.prob_cache.get_trigram(w1.0, w2.0, w3.0) {
            return Ok(score);
        }

        let score = match self.buffer_cache.get_trigram(&mut self.loader, w1, w2)? {
            Some(buf) => match buf.find(w3.0) {
                Some(i) => {
                    self.counters.trigram_hits += 1;
                    let record = buf.record(i);
                    self.loader.trigram_prob_table()[record.probability_id as usize]
                }
                None => self.trigram_backoff(w1, w2, w3)?,
            },
            None => self.trigram_backoff(w1, w2, w3)?,
        };

        self.prob_cache.insert_trigram(w1.0, w2.0, w3.0, score);
        Ok(score)
    }

    fn trigram_backoff(&mut self, w1: WordId, w2: WordId, w3: WordId) -> Result<f32> {
        self.counters.trigram_misses += 1;
        match self.find_bigram(w1, w2)? {
            Some(record) => {
                let backoff = self.loader.trigram_backoff_table()[record.backoff_id as usize];
                Ok(backoff + self.bigram_probability(w2, w3)?)
            }
            None => self.bigram_probability(w2, w3),
        }
    }

    /// Returns the *actual* stored backoff of the innermost matching
    /// context, or 0 (log 1) if none — see the Open Question in DESIGN.md
    /// for why this is not an unconditional log-one.
    pub fn backoff(&mut self, ws: &[WordId]) -> Result<f32> {
        match ws.len() {
            0 => Ok(0.0),
            1 => {
                let w = ws[0];
                if w.index() >= self.loader.unigrams().len() {
                    return Err(LmError::UnknownWord {
                        word: format!("word id {}", w.0),
                    });
                }
                Ok(self.loader.unigrams()[w.index()].log_backoff)
            }
            2 => {
                let (w1, w2) = (ws[0], ws[1]);
                match self.find_bigram(w1, w2)? {
                    Some(record) => Ok(self.loader.trigram_backoff_table()[record.backoff_id as usize]),
                    None => Ok(0.0),
                }
            }
            _ => Err(LmError::UnsupportedArity {
                requested: ws.len(),
                max_depth: self.max_depth,
            }),
        }
    }

    /// Builds a fresh `SmearEngine` from this model's loaded tables. Does
    /// not touch `ProbCache` or the query miss counters.
    pub fn build_smear(&mut self) -> Result<SmearEngine> {
        SmearEngine::build(&mut self.loader, &mut self.buffer_cache)
    }
}

impl WordResolver for QueryEngine {
    fn word_id(&self, word: &str) -> Option<WordId> {
        self.word_to_id.get(word).copied()
    }

    fn word_text(&self, id: WordId) -> Option<&str> {
        self.loader.words().get(id.index()).map(|s| s.as_str())
    }
}
