//! Opens the on-disk model and exposes random-access byte-range reads.
//!
//! Follows libchinese-core's `lexicon.rs` (`load_from_fst_bincode`,
//! `File::open` + `read_to_end`) and `userdict.rs`
//! (`Database::create`/`open`) for the "open once, keep the handle" idiom;
//! the header-then-sections file layout and magic/version validation before
//! trusting the rest of the file is the same shape kotadb's
//! `binary_trigram_index.rs` uses.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{LmError, Result};
use crate::header::{Header, HEADER_LEN};
use crate::log_math::LogMath;
use crate::records::{UnigramRecord, UNIGRAM_RECORD_LEN};
use crate::word::WordId;

/// Load-time knobs that affect `open` itself, as opposed to the query-time
/// knobs that live in `Config`.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub apply_lw_wip: bool,
    pub language_weight: f32,
    pub word_insertion_probability: f32,
    pub unigram_weight: f32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            apply_lw_wip: false,
            language_weight: 1.0,
            word_insertion_probability: 1.0,
            unigram_weight: 1.0,
        }
    }
}

/// Opens a model file, holds its in-memory tables, and serves on-demand
/// byte-range reads of the bigram/trigram sections.
pub struct BinaryLoader {
    file: File,
    header: Header,
    log_math: LogMath,
    words: Vec<String>,
    unigrams: Vec<UnigramRecord>,
    bigram_prob_table: Vec<f32>,
    trigram_prob_table: Vec<f32>,
    trigram_backoff_table: Vec<f32>,
    trigram_segment_table: Vec<u32>,
}

impl BinaryLoader {
    pub fn open<P: AsRef<Path>>(path: P, opts: LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| LmError::Io {
            section: "open",
            offset: 0,
            source: e,
        })?;

        let mut header_buf = vec![0u8; HEADER_LEN];
        file.read_exact(&mut header_buf).map_err(|e| LmError::Io {
            section: "header",
            offset: 0,
            source: e,
        })?;
        let header = Header::parse(&header_buf)?;
        let log_math = LogMath::natural_log();

        let words = Self::read_words(&mut file, header.n_unigrams as usize, header.big_endian)?;

        let mut unigrams = Self::read_unigrams(
            &mut file,
            header.n_unigrams as usize,
            header.big_endian,
            &log_math,
        )?;
        if opts.unigram_weight != 1.0 {
            let boost = opts.unigram_weight.ln();
            for u in unigrams.iter_mut() {
                u.log_prob += boost;
            }
        }

        let mut bigram_prob_table =
            Self::read_f32_table(&mut file, header.n_bigram_probs as usize, header.big_endian, &log_math, "bigram_prob_table")?;
        let mut trigram_prob_table = Self::read_f32_table(
            &mut file,
            header.n_trigram_probs as usize,
            header.big_endian,
            &log_math,
            "trigram_prob_table",
        )?;
        let trigram_backoff_table = Self::read_f32_table(
            &mut file,
            header.n_trigram_backoffs as usize,
            header.big_endian,
            &log_math,
            "trigram_backoff_table",
        )?;

        if opts.apply_lw_wip {
            let log_wip = opts.word_insertion_probability.ln();
            for u in unigrams.iter_mut() {
                u.log_prob = opts.language_weight * u.log_prob + log_wip;
            }
            for p in bigram_prob_table.iter_mut() {
                *p = opts.language_weight * *p + log_wip;
            }
            for p in trigram_prob_table.iter_mut() {
                *p = opts.language_weight * *p + log_wip;
            }
        }

        let trigram_segment_table = Self::read_u32_table(
            &mut file,
            header.n_segments as usize,
            header.big_endian,
            "trigram_segment_table",
        )?;

        let missing_sentinel_predecessors = unigrams
            .windows(2)
            .filter(|w| w[1].first_bigram_entry < w[0].first_bigram_entry)
            .count();
        if missing_sentinel_predecessors > 0 {
            return Err(LmError::UnexpectedRecordCount {
                section: "unigram first_bigram_entry monotonicity",
                expected: 0,
                found: missing_sentinel_predecessors,
            });
        }

        info!(
            vocab = words.len(),
            bigrams = header.n_bigrams,
            trigrams = header.n_trigrams,
            max_depth = header.max_depth,
            "loaded language model"
        );

        Ok(BinaryLoader {
            file,
            header,
            log_math,
            words,
            unigrams,
            bigram_prob_table,
            trigram_prob_table,
            trigram_backoff_table,
            trigram_segment_table,
        })
    }

    fn read_words(file: &mut File, n: usize, big_endian: bool) -> Result<Vec<String>> {
        let mut words = Vec::with_capacity(n);
        for _ in 0..n {
            let mut len_buf = [0u8; 4];
            file.read_exact(&mut len_buf).map_err(|e| LmError::Io {
                section: "word_list",
                offset: 0,
                source: e,
            })?;
            let len = if big_endian {
                u32::from_be_bytes(len_buf)
            } else {
                u32::from_le_bytes(len_buf)
            } as usize;
            let mut str_buf = vec![0u8; len];
            file.read_exact(&mut str_buf).map_err(|e| LmError::Io {
                section: "word_list",
                offset: 0,
                source: e,
            })?;
            let word = String::from_utf8(str_buf).map_err(|_| LmError::Truncated {
                section: "word_list (invalid utf8)",
                wanted: len,
                had: 0,
            })?;
            words.push(word);
        }
        Ok(words)
    }

    fn read_unigrams(
        file: &mut File,
        n: usize,
        big_endian: bool,
        log_math: &LogMath,
    ) -> Result<Vec<UnigramRecord>> {
        let mut buf = vec![0u8; n * UNIGRAM_RECORD_LEN];
        file.read_exact(&mut buf).map_err(|e| LmError::Io {
            section: "unigram_table",
            offset: 0,
            source: e,
        })?;
        Ok(buf
            .chunks_exact(UNIGRAM_RECORD_LEN)
            .map(|c| UnigramRecord::decode(c, big_endian, log_math))
            .collect())
    }

    fn read_f32_table(
        file: &mut File,
        n: usize,
        big_endian: bool,
        log_math: &LogMath,
        section: &'static str,
    ) -> Result<Vec<f32>> {
        let mut buf = vec![0u8; n * 4];
        file.read_exact(&mut buf)
            .map_err(|e| LmError::Io { section, offset: 0, source: e })?;
        Ok(buf
            .chunks_exact(4)
            .map(|c| {
                let bytes: [u8; 4] = c.try_into().unwrap();
                let log10 = if big_endian {
                    f32::from_be_bytes(bytes)
                } else {
                    f32::from_le_bytes(bytes)
                };
                log_math.to_host(log10)
            })
            .collect())
    }

    fn read_u32_table(
        file: &mut File,
        n: usize,
        big_endian: bool,
        section: &'static str,
    ) -> Result<Vec<u32>> {
        let mut buf = vec![0u8; n * 4];
        file.read_exact(&mut buf)
            .map_err(|e| LmError::Io { section, offset: 0, source: e })?;
        Ok(buf
            .chunks_exact(4)
            .map(|c| {
                let bytes: [u8; 4] = c.try_into().unwrap();
                if big_endian {
                    u32::from_be_bytes(bytes)
                } else {
                    u32::from_le_bytes(bytes)
                }
            })
            .collect())
    }

    /// A single random-access read of `len` bytes at `offset`. Fails with an
    /// I/O error surfaced as fatal; the core does not retry.
    pub fn load_buffer(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset)).map_err(|e| LmError::Io {
            section: "load_buffer(seek)",
            offset,
            source: e,
        })?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf).map_err(|e| LmError::Io {
            section: "load_buffer(read)",
            offset,
            source: e,
        })?;
        Ok(buf)
    }

    pub fn big_endian(&self) -> bool {
        self.header.big_endian
    }

    pub fn bigram_offset(&self) -> u64 {
        self.header.bigram_offset
    }

    pub fn trigram_offset(&self) -> u64 {
        self.header.trigram_offset
    }

    pub fn log_bigram_segment_size(&self) -> u32 {
        self.header.log_bigram_segment_size
    }

    pub fn max_depth(&self) -> usize {
        self.header.max_depth as usize
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn unigrams(&self) -> &[UnigramRecord] {
        &self.unigrams
    }

    pub fn bigram_prob_table(&self) -> &[f32] {
        &self.bigram_prob_table
    }

    pub fn trigram_prob_table(&self) -> &[f32] {
        &self.trigram_prob_table
    }

    pub fn trigram_backoff_table(&self) -> &[f32] {
        &self.trigram_backoff_table
    }

    pub fn trigram_segment_table(&self) -> &[u32] {
        &self.trigram_segment_table
    }

    /// The number of bigram followers stored for predecessor `w1`, derived
    /// from the cumulative `first_bigram_entry` column.
    pub fn bigram_follower_count(&self, w1: WordId) -> u32 {
        let i = w1.index();
        if i + 1 < self.unigrams.len() {
            self.unigrams[i + 1].first_bigram_entry - self.unigrams[i].first_bigram_entry
        } else {
            self.header.n_bigrams - self.unigrams[i].first_bigram_entry
        }
    }

    /// Resolves a word string against the embedded word list, logging a
    /// non-fatal warning the first time it is missing — the caller decides
    /// whether a later query against it is fatal.
    pub fn warn_if_unknown(&self, word: &str) {
        if !self.words.iter().any(|w| w == word) {
            warn!(word, "dictionary word missing from language model at load time");
        }
    }
}
