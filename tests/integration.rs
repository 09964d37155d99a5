//! End-to-end load -> query -> smear round-trip against a hand-packed
//! binary model file, exercised only through `slm_core`'s public API.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use slm_core::loader::LoadOptions;
use slm_core::{Config, LanguageModel, WordResolver};

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_path(tag: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("slm_core_integration_{tag}_{n}.bin"))
}

const MAGIC: u32 = 0x534C_4D31;
const HEADER_LEN: usize = 64;

/// Packs a three-word `{A, B, C}` model directly to bytes, independent of
/// the crate's own `#[cfg(test)]` builder, so this test stands as a
/// black-box check of the documented wire format.
fn write_three_word_model(path: &Path) {
    let words = ["A", "B", "C"];
    let mut words_bytes = Vec::new();
    for w in &words {
        words_bytes.extend_from_slice(&(w.len() as u32).to_le_bytes());
        words_bytes.extend_from_slice(w.as_bytes());
    }

    // (log10_prob, log10_backoff, first_bigram_entry, word_id)
    let unigrams: [(f32, f32, u32, u32); 3] = [
        (-3.0, -0.15, 0, 0),
        (-3.0, 0.0, 1, 1),
        (-1.0, 0.0, 2, 2),
    ];
    let mut unigram_bytes = Vec::new();
    for (log_p, log_bo, first_bg, wid) in unigrams {
        unigram_bytes.extend_from_slice(&log_p.to_le_bytes());
        unigram_bytes.extend_from_slice(&log_bo.to_le_bytes());
        unigram_bytes.extend_from_slice(&first_bg.to_le_bytes());
        unigram_bytes.extend_from_slice(&wid.to_le_bytes());
    }

    let bigram_prob_table = [(0.5f32).log10(), (0.708f32).log10()];
    let mut bigram_prob_bytes = Vec::new();
    for p in bigram_prob_table {
        bigram_prob_bytes.extend_from_slice(&p.to_le_bytes());
    }

    // The model has a (nonempty) trigram probability table, but no bigram's
    // `first_trigram_entry` span covers any real trigram record below, so
    // every trigram lookup resolves to zero followers for its history and
    // falls through to the per-history backoff path (step 5, not step 1's
    // "model has no trigrams at all" shortcut) — this is what exercises the
    // `trigram_misses` counter.
    let trigram_prob_table = [0.0f32];
    let mut trigram_prob_bytes = Vec::new();
    for p in trigram_prob_table {
        trigram_prob_bytes.extend_from_slice(&p.to_le_bytes());
    }
    let trigram_backoff_table = [(-0.1f32 / std::f32::consts::LN_10)];
    let mut trigram_backoff_bytes = Vec::new();
    for p in trigram_backoff_table {
        trigram_backoff_bytes.extend_from_slice(&p.to_le_bytes());
    }
    let log_bigram_segment_size: u32 = 10;
    let trigram_segment_table = [0u32];
    let mut segment_bytes = Vec::new();
    for s in trigram_segment_table {
        segment_bytes.extend_from_slice(&s.to_le_bytes());
    }

    // Bigram section is one flat array of real followers in predecessor
    // order (A -> B, then B -> C), with a single trailing sentinel for the
    // whole model — not one sentinel per predecessor.
    let bigram_records: [(u16, u16, u16, u16); 3] = [
        (1, 0, 0, 0),      // A -> B, prob_id 0, backoff_id 0 (into trigram_backoff_table)
        (2, 1, 0, 0),      // B -> C, prob_id 1
        (0xFFFF, 0, 0, 0), // trailing sentinel
    ];
    let mut bigram_section = Vec::new();
    for (wid, pid, bid, fte) in bigram_records {
        bigram_section.extend_from_slice(&wid.to_le_bytes());
        bigram_section.extend_from_slice(&pid.to_le_bytes());
        bigram_section.extend_from_slice(&bid.to_le_bytes());
        bigram_section.extend_from_slice(&fte.to_le_bytes());
    }

    let bigram_offset = HEADER_LEN as u64
        + words_bytes.len() as u64
        + unigram_bytes.len() as u64
        + bigram_prob_bytes.len() as u64
        + trigram_prob_bytes.len() as u64
        + trigram_backoff_bytes.len() as u64
        + segment_bytes.len() as u64;
    let trigram_offset = bigram_offset + bigram_section.len() as u64;

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(&MAGIC.to_le_bytes());
    header.extend_from_slice(&1u32.to_le_bytes()); // format
    header.extend_from_slice(&0u32.to_le_bytes()); // big_endian flag (unread by parse)
    header.extend_from_slice(&3u32.to_le_bytes()); // max_depth
    header.extend_from_slice(&log_bigram_segment_size.to_le_bytes());
    header.extend_from_slice(&3u32.to_le_bytes()); // n_unigrams
    header.extend_from_slice(&2u32.to_le_bytes()); // n_bigrams
    header.extend_from_slice(&0u32.to_le_bytes()); // n_trigrams
    header.extend_from_slice(&(bigram_prob_table.len() as u32).to_le_bytes());
    header.extend_from_slice(&(trigram_prob_table.len() as u32).to_le_bytes()); // n_trigram_probs
    header.extend_from_slice(&(trigram_backoff_table.len() as u32).to_le_bytes());
    header.extend_from_slice(&(trigram_segment_table.len() as u32).to_le_bytes());
    header.extend_from_slice(&bigram_offset.to_le_bytes());
    header.extend_from_slice(&trigram_offset.to_le_bytes());
    assert_eq!(header.len(), HEADER_LEN);

    let mut out = Vec::new();
    out.extend_from_slice(&header);
    out.extend_from_slice(&words_bytes);
    out.extend_from_slice(&unigram_bytes);
    out.extend_from_slice(&bigram_prob_bytes);
    out.extend_from_slice(&trigram_prob_bytes);
    out.extend_from_slice(&trigram_backoff_bytes);
    out.extend_from_slice(&segment_bytes);
    out.extend_from_slice(&bigram_section);

    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(&out).unwrap();
}

#[test]
fn load_query_and_smear_round_trip() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let path = temp_path("model");
    write_three_word_model(&path);

    let mut config = Config::default();
    config.full_smear = true;

    let mut model = LanguageModel::allocate(&path, LoadOptions::default(), config, None).unwrap();
    std::fs::remove_file(&path).ok();

    let a = model.word_id("A").unwrap();
    let b = model.word_id("B").unwrap();
    let c = model.word_id("C").unwrap();

    model.start().unwrap();
    let p_ab = model.get_probability(&[a, b]).unwrap();
    assert!((p_ab - (0.5f32).ln()).abs() < 1e-4);

    let p_abc = model.get_probability(&[a, b, c]).unwrap();
    // Trigram (A,B,C) absent by construction; falls back through
    // backoff(A,B) + P(C|B).
    assert_eq!(model.counters().trigram_misses, 1);
    assert!(p_abc.is_finite());

    // Smear was built (full_smear = true); empty history is always 1.0,
    // and a known word's unigram smear is some finite float.
    assert_eq!(model.get_smear(&[]), 1.0);
    assert!(model.get_smear(&[a]).is_finite());

    model.stop().unwrap();

    assert_eq!(model.get_max_depth(), 3);
    let vocab = model.get_vocabulary();
    assert_eq!(vocab.len(), 3);
    assert!(vocab.contains("A") && vocab.contains("B") && vocab.contains("C"));

    assert!(WordResolver::word_text(&model, a).is_some());

    model.deallocate();
}

#[test]
fn unknown_word_query_is_fatal() {
    let path = temp_path("model_unknown");
    write_three_word_model(&path);
    let model = LanguageModel::allocate(&path, LoadOptions::default(), Config::default(), None).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(model.word_id("not-a-word").is_err());
}
