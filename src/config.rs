//! Recognized configuration knobs.
//!
//! Mirrors libchinese-core's `lib.rs` `Config` struct and its
//! `load_toml`/`save_toml`/`from_toml_str` pair — the same serde + `toml`
//! pattern is reused here verbatim.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Capacity of the final-score LRU. Default 100_000.
    pub trigram_cache_size: usize,
    /// Capacity of the bigram-record LRU. Default 50_000.
    pub bigram_cache_size: usize,
    /// If true, both LRUs reset at `stop()`.
    pub clear_caches_after_utterance: bool,
    /// Gates `language_weight`/`word_insertion_probability` blending at load time.
    pub apply_language_weight_and_wip: bool,
    pub language_weight: f32,
    pub word_insertion_probability: f32,
    /// Blended into unigram log-probs at load time.
    pub unigram_weight: f32,
    /// Enables the smear engine.
    pub full_smear: bool,
    /// 0 means "use the file's max_depth"; otherwise clamped to it.
    pub max_depth: usize,
    /// Each queried sequence is appended between `<START_UTT>`/`<END_UTT>` markers.
    pub query_log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            trigram_cache_size: 100_000,
            bigram_cache_size: 50_000,
            clear_caches_after_utterance: false,
            apply_language_weight_and_wip: false,
            language_weight: 1.0,
            word_insertion_probability: 1.0,
            unigram_weight: 1.0,
            full_smear: false,
            max_depth: 0,
            query_log_file: None,
        }
    }
}

impl Config {
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Resolves the effective max depth against the file's own maximum: 0
    /// means "use the file maximum", anything else is clamped to it.
    pub fn effective_max_depth(&self, file_max_depth: usize) -> usize {
        if self.max_depth == 0 {
            file_max_depth
        } else {
            self.max_depth.min(file_max_depth)
        }
    }
}
