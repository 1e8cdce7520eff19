//! Shared ownership of built indexes.
//!
//! - [`IndexHandle`]: cheap to clone; the index is released when the last
//!   handle is dropped
//! - [`IndexSlot`]: holds the current index and swaps in rebuilt ones
//!   atomically, without blocking readers

use arc_swap::ArcSwapOption;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::wire::RawList;
use crate::{Error, HybridIndex, IndexConfig, ListId, Result};

/// Build an index from raw record lists.
///
/// Every list is decoded before anything is indexed, so one malformed list
/// fails the whole build and no index is produced.
pub fn build(lists: &[RawList], config: &IndexConfig) -> Result<IndexHandle> {
    config.validate()?;

    let decoded = lists
        .iter()
        .map(|list| Ok((list.id, list.decode()?)))
        .collect::<Result<Vec<_>>>()?;

    HybridIndex::build(decoded, config).map(IndexHandle::new)
}

/// Reference-counted handle to a built index.
#[derive(Clone, Debug)]
pub struct IndexHandle {
    inner: Arc<HybridIndex>,
}

impl IndexHandle {
    pub fn new(index: HybridIndex) -> Self {
        Self {
            inner: Arc::new(index),
        }
    }

    /// Ids of all lists containing `addr`.
    pub fn lookup(&self, addr: Ipv4Addr) -> Vec<ListId> {
        self.inner.lookup_addr(addr)
    }

    /// The underlying index, for range queries and statistics.
    pub fn index(&self) -> &HybridIndex {
        &self.inner
    }
}

/// Holder of the current index.
///
/// # Example
///
/// ```
/// use ip_index::{build, IndexConfig, IndexSlot, ListId, RawList};
/// use std::net::Ipv4Addr;
///
/// let slot = IndexSlot::new();
/// assert!(slot.lookup(Ipv4Addr::new(10, 0, 0, 1)).is_err());
///
/// let list = RawList::from_nets(ListId::new(1), &["10.0.0.0/8".parse().unwrap()]);
/// slot.publish(build(&[list], &IndexConfig::default()).unwrap());
/// assert_eq!(slot.lookup(Ipv4Addr::new(10, 0, 0, 1)).unwrap(), vec![ListId::new(1)]);
/// ```
pub struct IndexSlot {
    current: ArcSwapOption<HybridIndex>,
    /// Incremented on every publish
    generation: AtomicU64,
}

impl IndexSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the current index, returning the previous one.
    ///
    /// Lookups already running keep using the index they started with.
    pub fn publish(&self, handle: IndexHandle) -> Option<IndexHandle> {
        let previous = self.current.swap(Some(handle.inner));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::info!("Published index generation {}", generation);
        previous.map(|inner| IndexHandle { inner })
    }

    /// Remove the current index.
    pub fn clear(&self) -> Option<IndexHandle> {
        self.current.swap(None).map(|inner| IndexHandle { inner })
    }

    /// Handle to the current index, if any.
    pub fn current(&self) -> Option<IndexHandle> {
        self.current.load_full().map(|inner| IndexHandle { inner })
    }

    pub fn is_initialized(&self) -> bool {
        self.current.load().is_some()
    }

    /// Number of indexes published so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Ids of all lists containing `addr` in the current index.
    pub fn lookup(&self, addr: Ipv4Addr) -> Result<Vec<ListId>> {
        let guard = self.current.load();
        match &*guard {
            Some(index) => Ok(index.lookup_addr(addr)),
            None => Err(Error::NotInitialized),
        }
    }
}

impl Default for IndexSlot {
    fn default() -> Self {
        Self::new()
    }
}
