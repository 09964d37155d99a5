//! slm-core
//!
//! A disk-resident trigram language model query engine for the CMU-Cambridge
//! SLM toolkit binary format: unigrams, bigrams, and trigrams with Katz
//! back-off, demand-paged bigram/trigram slices via bounded LRU caches, and
//! a smear scalar computation used by decoders to prune partial histories.
//!
//! Public API:
//! - `LanguageModel` — opens a model file and answers `get_probability`,
//!   `get_backoff`, `get_smear` queries across an utterance's `start`/`stop`
//!   lifecycle.
//! - `Config` — recognized configuration knobs (cache sizes, weights,
//!   query logging).
//! - `WordId` / `WordResolver` — the narrow word-handle seam the engine
//!   needs from an external dictionary.
//! - `LmError` — the typed error enum for malformed models, unknown words,
//!   and I/O failures.

pub mod buffer;
pub mod buffer_cache;
pub mod config;
pub mod error;
pub mod header;
pub mod loader;
pub mod log_math;
pub mod prob_cache;
pub mod query;
pub mod records;
pub mod segment;
pub mod smear;
pub mod word;

#[cfg(test)]
mod testutil;

use std::collections::HashSet;
use std::path::Path;

pub use config::Config;
pub use error::{LmError, Result};
pub use loader::LoadOptions;
pub use query::Counters;
pub use smear::SmearEngine;
pub use word::{WordId, WordResolver};

use loader::BinaryLoader;
use query::QueryEngine;

/// Combines a `QueryEngine` with an optional `SmearEngine`, exposing the
/// public surface a decoder consumes: `allocate`/`deallocate`,
/// `start`/`stop`, `get_probability`/`get_backoff`/`get_smear`,
/// `get_max_depth`/`get_vocabulary`, and the miss/hit counters.
pub struct LanguageModel {
    engine: QueryEngine,
    smear: Option<SmearEngine>,
}

impl LanguageModel {
    /// Opens the binary model, builds the query engine, and — when
    /// `config.full_smear` is set — loads the smear sidecar from
    /// `smear_cache` if present and vocabulary-matched, else builds it from
    /// scratch. All tables live until `deallocate`.
    pub fn allocate<P: AsRef<Path>>(
        path: P,
        load_opts: LoadOptions,
        config: Config,
        smear_cache: Option<&Path>,
    ) -> Result<Self> {
        let loader = BinaryLoader::open(path, load_opts)?;
        let full_smear = config.full_smear;
        let mut engine = QueryEngine::new(loader, config)?;

        let smear = if full_smear {
            Some(Self::load_or_build_smear(&mut engine, smear_cache)?)
        } else {
            None
        };

        Ok(LanguageModel { engine, smear })
    }

    fn load_or_build_smear(
        engine: &mut QueryEngine,
        smear_cache: Option<&Path>,
    ) -> Result<SmearEngine> {
        if let Some(path) = smear_cache {
            if let Ok(restored) = SmearEngine::read_smear_info(path, engine.vocabulary().len()) {
                return Ok(restored);
            }
        }
        engine.build_smear()
    }

    /// Drops all tables and caches. A plain `drop(model)` does the same;
    /// this exists for symmetry with `allocate` at the public API boundary.
    pub fn deallocate(self) {}

    /// Begins an utterance; optionally logs `<START_UTT>`.
    pub fn start(&mut self) -> Result<()> {
        self.engine.start()
    }

    /// Ends an utterance; sweeps unused bigram slots, drops the trigram
    /// map, and optionally clears both LRU caches.
    pub fn stop(&mut self) -> Result<()> {
        self.engine.stop()
    }

    /// Probability of a word sequence, in the host log base.
    pub fn get_probability(&mut self, ws: &[WordId]) -> Result<f32> {
        self.engine.probability(ws)
    }

    /// The actual stored backoff for the innermost matching context, or
    /// 0.0 (log one) if none.
    pub fn get_backoff(&mut self, ws: &[WordId]) -> Result<f32> {
        self.engine.backoff(ws)
    }

    /// 1.0 if the smear engine was never built (`full_smear = false`).
    pub fn get_smear(&self, ws: &[WordId]) -> f32 {
        match &self.smear {
            Some(smear) => smear.smear(ws),
            None => 1.0,
        }
    }

    pub fn get_max_depth(&self) -> usize {
        self.engine.max_depth()
    }

    pub fn get_vocabulary(&self) -> HashSet<String> {
        self.engine.vocabulary()
    }

    pub fn word_id(&self, word: &str) -> Result<WordId> {
        self.engine.word_id(word)
    }

    /// `bigram_misses`, `trigram_misses`, `trigram_hits`: per-instance
    /// instrumentation, not process-wide.
    pub fn counters(&self) -> Counters {
        self.engine.counters()
    }

    /// Writes the current smear tables to the `0xC0CAC01A` sidecar format,
    /// if a smear engine was built.
    pub fn write_smear_cache<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        match &self.smear {
            Some(smear) => smear.write_smear_info(path),
            None => Ok(()),
        }
    }
}

impl WordResolver for LanguageModel {
    fn word_id(&self, word: &str) -> Option<WordId> {
        WordResolver::word_id(&self.engine, word)
    }

    fn word_text(&self, id: WordId) -> Option<&str> {
        WordResolver::word_text(&self.engine, id)
    }
}
