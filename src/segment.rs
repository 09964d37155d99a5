//! Translates bigram positions into starting trigram entries.
//!
//! None of the teacher's modules do this directly — libpinyin's phrase
//! index has no analogous segment table. This is the one genuinely novel
//! piece of index arithmetic in the whole engine.

/// `trigram_segment_table[pos >> log_bigram_segment_size]` gives the high
/// bits of a bigram's starting trigram entry.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    table: Vec<u32>,
    log_segment_size: u32,
}

impl SegmentIndex {
    pub fn new(table: Vec<u32>, log_segment_size: u32) -> Self {
        SegmentIndex {
            table,
            log_segment_size,
        }
    }

    /// Combines the cumulative segment base for the bigram's absolute
    /// position with the record's 16-bit intra-segment offset.
    ///
    /// `absolute_bigram_pos` is `first_bigram_entry_of_w1 + which_follower`;
    /// `first_trigram_entry` is the low bits carried in the bigram record.
    pub fn start_entry(&self, absolute_bigram_pos: u32, first_trigram_entry: u16) -> u32 {
        let segment = (absolute_bigram_pos >> self.log_segment_size) as usize;
        self.table[segment] + first_trigram_entry as u32
    }
}
