//! Compressed bitmaps over the IPv4 address space.
//!
//! A [`CompressedBitmap`] records a set of exact addresses for one large
//! list. Memory grows with the number of runs in the set, not with 2^32.
//! Bitmaps are filled while building, then finalized once, which encodes the
//! set and builds a random-access index for point queries.

mod encoder;
mod index;

use std::fmt;
use std::net::Ipv4Addr;

use crate::{Error, Result};
use encoder::RunEncoder;
use index::RunIndex;

enum State {
    Building { pending: Vec<u32> },
    Finalized(Encoded),
}

struct Encoded {
    /// Owned word stream, released when the bitmap is dropped
    words: Box<[u64]>,
    index: RunIndex,
    len: usize,
}

/// Run-length compressed set of IPv4 addresses.
///
/// Additions are accepted in any order and duplicates are ignored.
/// After [`finalize`](Self::finalize) the bitmap is read-only.
///
/// # Examples
/// ```
/// use ip_index::CompressedBitmap;
/// use std::net::Ipv4Addr;
///
/// let mut bitmap = CompressedBitmap::new();
/// bitmap.add(Ipv4Addr::new(192, 0, 2, 1)).unwrap();
/// bitmap.add(Ipv4Addr::new(192, 0, 2, 1)).unwrap();
/// bitmap.finalize();
///
/// assert_eq!(bitmap.len(), 1);
/// assert!(bitmap.lookup(Ipv4Addr::new(192, 0, 2, 1)));
/// assert!(!bitmap.lookup(Ipv4Addr::new(192, 0, 2, 2)));
/// assert!(bitmap.add(Ipv4Addr::new(192, 0, 2, 3)).is_err());
/// ```
pub struct CompressedBitmap {
    state: State,
}

impl CompressedBitmap {
    /// Create an empty bitmap in the building state.
    pub fn new() -> Self {
        Self {
            state: State::Building {
                pending: Vec::new(),
            },
        }
    }

    /// Add an address.
    ///
    /// Returns [`Error::BitmapFinalized`] without changing anything once the
    /// bitmap has been finalized.
    pub fn add(&mut self, addr: Ipv4Addr) -> Result<()> {
        match &mut self.state {
            State::Building { pending } => {
                pending.push(u32::from(addr));
                Ok(())
            }
            State::Finalized(_) => Err(Error::BitmapFinalized),
        }
    }

    /// Encode the added addresses and build the lookup index.
    ///
    /// Calling this again on a finalized bitmap does nothing.
    pub fn finalize(&mut self) {
        let pending = match &mut self.state {
            State::Building { pending } => std::mem::take(pending),
            State::Finalized(_) => {
                log::debug!("bitmap already finalized, ignoring");
                return;
            }
        };

        let mut addrs = pending;
        addrs.sort_unstable();
        addrs.dedup();

        let words = RunEncoder::encode_sorted(&addrs);
        let index = RunIndex::build(&words);
        self.state = State::Finalized(Encoded {
            words,
            index,
            len: addrs.len(),
        });
    }

    /// Whether [`finalize`](Self::finalize) has been called.
    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Finalized(_))
    }

    /// Test whether `addr` is in the set.
    ///
    /// # Panics
    ///
    /// Panics if the bitmap has not been finalized.
    pub fn lookup(&self, addr: Ipv4Addr) -> bool {
        match &self.state {
            State::Finalized(encoded) => encoded.index.contains(&encoded.words, u32::from(addr)),
            State::Building { .. } => panic!("CompressedBitmap::lookup called before finalize"),
        }
    }

    /// Number of distinct addresses once finalized; number of additions
    /// (duplicates included) while building.
    pub fn len(&self) -> usize {
        match &self.state {
            State::Building { pending } => pending.len(),
            State::Finalized(encoded) => encoded.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of runs (markers) in the encoded stream; zero while building.
    pub fn run_count(&self) -> usize {
        match &self.state {
            State::Building { .. } => 0,
            State::Finalized(encoded) => encoded.index.len(),
        }
    }

    /// Heap size of the encoded stream and its index.
    pub fn size_in_bytes(&self) -> usize {
        match &self.state {
            State::Building { pending } => pending.capacity() * std::mem::size_of::<u32>(),
            State::Finalized(encoded) => {
                encoded.words.len() * std::mem::size_of::<u64>() + encoded.index.size_in_bytes()
            }
        }
    }
}

impl Default for CompressedBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompressedBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompressedBitmap{{ finalized: {}, len: {}, runs: {} }}",
            self.is_finalized(),
            self.len(),
            self.run_count()
        )
    }
}
