//! Run-length word stream for compressed bitmaps.
//!
//! The stream covers the address space in 64-bit words. It is a sequence of
//! markers, each followed by its literal words:
//!
//! ```text
//! +--------+---------+---------+--------+---------+
//! | MARKER | LITERAL | LITERAL | MARKER | LITERAL | ...
//! +--------+---------+---------+--------+---------+
//! ```
//!
//! A marker word packs the fill bit (bit 63), the literal count (bits 32..63)
//! and the fill length (bits 0..32). It stands for `fill_len` words of all
//! zeros or all ones, followed by `literals` verbatim words. Words past the
//! end of the stream are zero.

use itertools::Itertools;

const FILL_BIT: u64 = 1 << 63;
const LITERAL_SHIFT: u32 = 32;
const MAX_LITERALS: u32 = (1 << 31) - 1;

/// Addresses per word.
pub(crate) const WORD_BITS: u32 = 64;

/// Decoded marker word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Marker {
    pub fill: bool,
    pub fill_len: u32,
    pub literals: u32,
}

impl Marker {
    pub fn encode(self) -> u64 {
        let fill = if self.fill { FILL_BIT } else { 0 };
        fill | (u64::from(self.literals) << LITERAL_SHIFT) | u64::from(self.fill_len)
    }

    pub fn decode(word: u64) -> Self {
        Self {
            fill: word & FILL_BIT != 0,
            fill_len: word as u32,
            literals: ((word >> LITERAL_SHIFT) as u32) & MAX_LITERALS,
        }
    }

    /// Number of bitmap words this marker stands for.
    pub fn span(self) -> u64 {
        u64::from(self.fill_len) + u64::from(self.literals)
    }

    fn is_empty(self) -> bool {
        self.fill_len == 0 && self.literals == 0
    }
}

/// Builds a word stream from words pushed in increasing position order.
pub(crate) struct RunEncoder {
    words: Vec<u64>,
    /// Slot of the marker currently being filled
    marker_at: usize,
    current: Marker,
    /// Position of the next word to be emitted
    next_word: u64,
}

impl RunEncoder {
    pub fn new() -> Self {
        Self {
            words: vec![0],
            marker_at: 0,
            current: Marker::default(),
            next_word: 0,
        }
    }

    /// Encode a sorted, deduplicated address slice.
    pub fn encode_sorted(addrs: &[u32]) -> Box<[u64]> {
        let mut encoder = Self::new();
        let words = addrs.iter().chunk_by(|&&addr| addr / WORD_BITS);
        for (position, group) in &words {
            let bits = group.fold(0u64, |acc, &addr| acc | (1u64 << (addr % WORD_BITS)));
            encoder.push_word(u64::from(position), bits);
        }
        encoder.finish()
    }

    /// Append the word at `position`, zero-filling any gap before it.
    pub fn push_word(&mut self, position: u64, bits: u64) {
        debug_assert!(position >= self.next_word, "words must be pushed in order");
        self.push_fill(false, position - self.next_word);
        match bits {
            0 => self.push_fill(false, 1),
            u64::MAX => self.push_fill(true, 1),
            _ => self.push_literal(bits),
        }
    }

    fn push_fill(&mut self, fill: bool, count: u64) {
        let mut remaining = count;
        while remaining > 0 {
            let extendable = self.current.literals == 0
                && (self.current.fill_len == 0 || self.current.fill == fill)
                && self.current.fill_len < u32::MAX;
            if !extendable {
                self.start_marker();
            }
            self.current.fill = fill;
            let take = remaining.min(u64::from(u32::MAX - self.current.fill_len));
            self.current.fill_len += take as u32;
            remaining -= take;
        }
        self.next_word += count;
    }

    fn push_literal(&mut self, bits: u64) {
        if self.current.literals == MAX_LITERALS {
            self.start_marker();
        }
        self.words.push(bits);
        self.current.literals += 1;
        self.next_word += 1;
    }

    fn start_marker(&mut self) {
        self.words[self.marker_at] = self.current.encode();
        self.marker_at = self.words.len();
        self.words.push(0);
        self.current = Marker::default();
    }

    pub fn finish(mut self) -> Box<[u64]> {
        if self.current.is_empty() {
            self.words.truncate(self.marker_at);
        } else {
            self.words[self.marker_at] = self.current.encode();
        }
        self.words.into_boxed_slice()
    }
}
