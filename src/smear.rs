//! Unigram/bigram smear scalars and their binary sidecar file.
//!
//! The shape of a derived-statistics table built once over the whole model
//! follows libchinese-core's `ngram.rs`; the manual integer/float packing in
//! `read_smear_info`/`write_smear_info` follows akaza's
//! `lm/system_bigram.rs`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use ahash::AHashMap;

use crate::buffer::BigramBuffer;
use crate::buffer_cache::BufferCache;
use crate::error::{LmError, Result};
use crate::loader::BinaryLoader;
use crate::records::BigramRecord;
use crate::word::WordId;

const SMEAR_MAGIC: u32 = 0xC0CA_C01A;

/// Per-unigram and per-bigram scalars summarizing the expected
/// log-probability contribution of extending a history by one word. Built
/// once from a loaded model, or restored from its sidecar file.
pub struct SmearEngine {
    unigram_smear: Vec<f32>,
    bigram_smear_map: AHashMap<(u32, u32), f32>,
}

impl SmearEngine {
    /// The smear scalar for a word sequence: unigram smear for a single
    /// word, the bigram smear map (falling back to unigram smear of the
    /// last word) for longer histories.
    pub fn smear(&self, ws: &[WordId]) -> f32 {
        match ws.len() {
            0 => 1.0,
            1 => self.unigram_smear[ws[0].index()],
            _ => {
                let w1 = ws[ws.len() - 2];
                let w2 = ws[ws.len() - 1];
                match self.bigram_smear_map.get(&(w1.0, w2.0)) {
                    Some(v) => *v,
                    None => self.unigram_smear[w2.index()],
                }
            }
        }
    }

    pub fn unigram_smear(&self, w: WordId) -> f32 {
        self.unigram_smear[w.index()]
    }

    pub fn vocabulary_size(&self) -> usize {
        self.unigram_smear.len()
    }

    /// A dense double-summation over the whole model's bigram/trigram
    /// distributions.
    pub fn build(loader: &mut BinaryLoader, buffer_cache: &mut BufferCache) -> Result<Self> {
        let n = loader.unigrams().len();

        let mut s0 = 0f32;
        let mut r0 = 0f32;
        for u in loader.unigrams() {
            let p = u.log_prob.exp();
            s0 += p * u.log_prob;
            r0 += p * u.log_prob * u.log_prob;
        }

        let mut nums = vec![0f32; n];
        let mut dens = vec![0f32; n];
        let mut avgs = vec![0f32; n];
        let mut unigram_smear = vec![0f32; n];

        for i in 0..n {
            let followers = match Self::load_followers(loader, buffer_cache, i as u32)? {
                Some(f) => f,
                None => continue,
            };

            let log_backoff_i = loader.unigrams()[i].log_backoff;
            let bo_i = log_backoff_i.exp();

            let mut num_i = 0f32;
            let mut den_i = 0f32;
            for rec in &followers {
                let j = rec.word_id as usize;
                let log_p_bg = loader.bigram_prob_table()[rec.probability_id as usize];
                let p_bg = log_p_bg.exp();
                let log_p_j = loader.unigrams()[j].log_prob;
                let log_p_bb = log_backoff_i + log_p_j;
                let p_bb = log_p_bb.exp();
                num_i += (p_bg * log_p_bg - p_bb * log_p_bb) * log_p_j;
                den_i += (p_bg - p_bb) * log_p_j;
            }
            num_i += bo_i * (log_backoff_i * s0 + r0);
            let avg_i = den_i + bo_i * s0;
            den_i += bo_i * r0;

            nums[i] = num_i;
            dens[i] = den_i;
            avgs[i] = avg_i;
            unigram_smear[i] = if den_i != 0.0 { num_i / den_i } else { 0.0 };
        }

        let mut bigram_smear_map = AHashMap::new();
        for i in 0..n {
            let followers = match Self::load_followers(loader, buffer_cache, i as u32)? {
                Some(f) => f,
                None => continue,
            };

            for rec in &followers {
                let k = rec.word_id as usize;
                let trigram_records = buffer_cache
                    .get_trigram(loader, WordId(i as u32), WordId(k as u32))?
                    .map(|buf| (0..buf.len()).map(|idx| buf.record(idx)).collect::<Vec<_>>());

                let value = match trigram_records {
                    None => unigram_smear[k],
                    Some(trigrams) => {
                        let log_bo_ik = loader.trigram_backoff_table()[rec.backoff_id as usize];
                        let bo_ik = log_bo_ik.exp();

                        let mut num = 0f32;
                        let mut den = 0f32;
                        for tri in &trigrams {
                            let m = tri.word_id as usize;
                            let log_p_tg = loader.trigram_prob_table()[tri.probability_id as usize];
                            let p_tg = log_p_tg.exp();
                            let log_p_bg =
                                Self::bigram_probability_raw(loader, buffer_cache, k as u32, m as u32)?;
                            let p_bg = log_p_bg.exp();
                            let log_p_bt = log_bo_ik + log_p_bg;
                            let p_bt = log_p_bt.exp();
                            let log_p_u = loader.unigrams()[m].log_prob;
                            num += (p_tg * log_p_tg - p_bt * log_p_bt) * log_p_u;
                            den += (p_tg - p_bt) * log_p_u * log_p_u;
                        }
                        num += bo_ik * (log_bo_ik * avgs[k] - nums[k]);
                        den += bo_ik * dens[k];
                        if den != 0.0 {
                            num / den
                        } else {
                            0.0
                        }
                    }
                };
                bigram_smear_map.insert((i as u32, k as u32), value);
            }
        }

        Ok(SmearEngine {
            unigram_smear,
            bigram_smear_map,
        })
    }

    fn load_followers(
        loader: &mut BinaryLoader,
        buffer_cache: &mut BufferCache,
        w1: u32,
    ) -> Result<Option<Vec<BigramRecord>>> {
        if loader.bigram_follower_count(WordId(w1)) == 0 {
            return Ok(None);
        }
        let n = loader.unigrams().len();
        let buf: &BigramBuffer = match buffer_cache.get_bigram(loader, WordId(w1))? {
            Some(b) => b,
            None => return Ok(None),
        };
        let records: Vec<BigramRecord> = (0..buf.len())
            .map(|i| buf.record(i))
            .filter(|r| (r.word_id as usize) < n)
            .collect();
        Ok(Some(records))
    }

    /// `P(w2|w1)` without touching `ProbCache` or the miss counters — used
    /// only while building smear tables, where no query-time bookkeeping
    /// should be observable.
    fn bigram_probability_raw(
        loader: &mut BinaryLoader,
        buffer_cache: &mut BufferCache,
        w1: u32,
        w2: u32,
    ) -> Result<f32> {
        if loader.bigram_prob_table().is_empty() {
            return Ok(loader.unigrams()[w2 as usize].log_prob);
        }
        let found = match buffer_cache.get_bigram(loader, WordId(w1))? {
            Some(buf) => buf.find(w2).map(|i| buf.record(i)),
            None => None,
        };
        match found {
            Some(rec) => Ok(loader.bigram_prob_table()[rec.probability_id as usize]),
            None => Ok(loader.unigrams()[w1 as usize].log_backoff + loader.unigrams()[w2 as usize].log_prob),
        }
    }

    /// Reads the `0xC0CAC01A` sidecar format. Mismatched magic or
    /// vocabulary size is a hard error so callers fall back to rebuilding
    /// from the model.
    pub fn read_smear_info<P: AsRef<Path>>(path: P, expected_vocab: usize) -> Result<Self> {
        let mut file = File::open(path.as_ref()).map_err(|e| LmError::Io {
            section: "smear_info(open)",
            offset: 0,
            source: e,
        })?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| LmError::Io {
            section: "smear_info(read)",
            offset: 0,
            source: e,
        })?;

        let mut pos = 0usize;
        let magic = read_u32(&buf, &mut pos)?;
        if magic != SMEAR_MAGIC {
            return Err(LmError::SmearMismatch {
                reason: format!("bad magic {magic:#x}"),
            });
        }
        let n = read_i32(&buf, &mut pos)? as usize;
        if n != expected_vocab {
            return Err(LmError::SmearMismatch {
                reason: format!("vocabulary size {n} does not match model vocabulary {expected_vocab}"),
            });
        }

        let mut unigram_smear = Vec::with_capacity(n);
        for _ in 0..n {
            unigram_smear.push(read_f32(&buf, &mut pos)?);
        }

        let mut bigram_smear_map = AHashMap::new();
        for i in 0..n {
            let count = read_i32(&buf, &mut pos)? as usize;
            for _ in 0..count {
                let word_id = read_i32(&buf, &mut pos)? as u32;
                let smear = read_f32(&buf, &mut pos)?;
                bigram_smear_map.insert((i as u32, word_id), smear);
            }
        }

        Ok(SmearEngine {
            unigram_smear,
            bigram_smear_map,
        })
    }

    /// Writes the `0xC0CAC01A` sidecar format.
    pub fn write_smear_info<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let n = self.unigram_smear.len();
        let mut grouped: Vec<Vec<(u32, f32)>> = vec![Vec::new(); n];
        for (&(i, k), &v) in self.bigram_smear_map.iter() {
            grouped[i as usize].push((k, v));
        }
        for g in grouped.iter_mut() {
            g.sort_by_key(|(k, _)| *k);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&SMEAR_MAGIC.to_le_bytes());
        out.extend_from_slice(&(n as i32).to_le_bytes());
        for v in &self.unigram_smear {
            out.extend_from_slice(&v.to_le_bytes());
        }
        for g in &grouped {
            out.extend_from_slice(&(g.len() as i32).to_le_bytes());
            for (word_id, v) in g {
                out.extend_from_slice(&(*word_id as i32).to_le_bytes());
                out.extend_from_slice(&v.to_le_bytes());
            }
        }

        let mut file = File::create(path.as_ref()).map_err(|e| LmError::Io {
            section: "smear_info(create)",
            offset: 0,
            source: e,
        })?;
        file.write_all(&out).map_err(|e| LmError::Io {
            section: "smear_info(write)",
            offset: 0,
            source: e,
        })?;
        Ok(())
    }
}

fn read_u32(buf: &[u8], pos: &mut usize) -> Result<u32> {
    let bytes: [u8; 4] = buf
        .get(*pos..*pos + 4)
        .ok_or(LmError::Truncated {
            section: "smear_info",
            wanted: *pos + 4,
            had: buf.len(),
        })?
        .try_into()
        .unwrap();
    *pos += 4;
    Ok(u32::from_le_bytes(bytes))
}

fn read_i32(buf: &[u8], pos: &mut usize) -> Result<i32> {
    Ok(read_u32(buf, pos)? as i32)
}

fn read_f32(buf: &[u8], pos: &mut usize) -> Result<f32> {
    Ok(f32::from_bits(read_u32(buf, pos)?))
}
