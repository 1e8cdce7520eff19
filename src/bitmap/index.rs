//! Random-access index over a compressed word stream.

use super::encoder::{Marker, WORD_BITS};

/// Maps one marker to the first bitmap word it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Checkpoint {
    word: u32,
    offset: u32,
}

/// One checkpoint per marker, sorted by word position.
///
/// Point queries binary search the checkpoints and then read at most one
/// word of the stream, instead of walking the markers from the start.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunIndex {
    checkpoints: Box<[Checkpoint]>,
}

impl RunIndex {
    pub fn build(words: &[u64]) -> Self {
        let mut checkpoints = Vec::new();
        let mut offset = 0usize;
        let mut word = 0u64;

        while offset < words.len() {
            let marker = Marker::decode(words[offset]);
            checkpoints.push(Checkpoint {
                word: word as u32,
                offset: offset as u32,
            });
            word += marker.span();
            offset += 1 + marker.literals as usize;
        }

        Self {
            checkpoints: checkpoints.into_boxed_slice(),
        }
    }

    /// Test the bit for `addr` in the stream this index was built from.
    pub fn contains(&self, words: &[u64], addr: u32) -> bool {
        let target = addr / WORD_BITS;
        let idx = self.checkpoints.partition_point(|cp| cp.word <= target);
        let Some(cp) = idx.checked_sub(1).map(|i| self.checkpoints[i]) else {
            return false;
        };

        let marker = Marker::decode(words[cp.offset as usize]);
        let rel = target - cp.word;
        if rel < marker.fill_len {
            return marker.fill;
        }

        let literal = rel - marker.fill_len;
        if literal >= marker.literals {
            return false;
        }
        let bits = words[cp.offset as usize + 1 + literal as usize];
        (bits >> (addr % WORD_BITS)) & 1 == 1
    }

    /// Number of markers indexed.
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.checkpoints.len() * std::mem::size_of::<Checkpoint>()
    }
}
