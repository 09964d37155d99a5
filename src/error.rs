//! Error types for the language model core.
//!
//! Every fatal category gets its own variant so callers can match on kind
//! instead of parsing strings.

use thiserror::Error;

/// Errors surfaced by the language model engine.
///
/// Missed bigrams/trigrams where backoff applies are *not* represented
/// here — those increment a miss counter and are not errors.
#[derive(Debug, Error)]
pub enum LmError {
    #[error("malformed model: bad magic {found:#x}, expected {expected:#x}")]
    BadMagic { found: u32, expected: u32 },

    #[error("malformed model: truncated {section} (wanted {wanted} bytes, had {had})")]
    Truncated {
        section: &'static str,
        wanted: usize,
        had: usize,
    },

    #[error("malformed model: sentinel record missing for predecessor {word_id}")]
    MissingSentinel { word_id: u32 },

    #[error("malformed model: unexpected record count in {section}: expected {expected}, found {found}")]
    UnexpectedRecordCount {
        section: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("word not found in model: {word:?}")]
    UnknownWord { word: String },

    #[error("i/o failure reading {section} at offset {offset}: {source}")]
    Io {
        section: &'static str,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("smear file mismatch: {reason}")]
    SmearMismatch { reason: String },

    #[error("unsupported n-gram arity {requested}: model max_depth is {max_depth}")]
    UnsupportedArity { requested: usize, max_depth: usize },
}

pub type Result<T> = std::result::Result<T, LmError>;
