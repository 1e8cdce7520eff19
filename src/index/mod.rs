//! Hybrid trie + bitmap index.

mod config;

pub use config::{IndexConfig, DEFAULT_LARGE_LIST_THRESHOLD};

use ipnet::Ipv4Net;
use serde::Serialize;
use std::net::Ipv4Addr;

use crate::entry::MAX_PREFIX_LEN;
use crate::{CompressedBitmap, ListId, PrefixEntry, PrefixTrie, Result};

/// HybridIndex answers "which lists contain this address".
///
/// Each list is routed when the index is built:
/// - lists with at least `large_list_threshold` entries get their own
///   [`CompressedBitmap`] for their /32 entries; their shorter prefixes go
///   to the trie
/// - smaller lists go to the trie entirely
///
/// The index is immutable once built and can be queried from any number of
/// threads at once.
pub struct HybridIndex {
    trie: PrefixTrie,
    /// One bitmap per large list, in input order
    bitmaps: Vec<(ListId, CompressedBitmap)>,
    list_count: usize,
}

impl HybridIndex {
    /// Build an index from `(list id, networks)` pairs.
    ///
    /// # Examples
    /// ```
    /// use ip_index::{HybridIndex, IndexConfig, ListId};
    /// use std::net::Ipv4Addr;
    ///
    /// let lists = vec![
    ///     (ListId::new(1), vec!["10.0.0.0/24".parse().unwrap()]),
    ///     (ListId::new(2), vec!["10.0.0.5/32".parse().unwrap()]),
    /// ];
    /// let index = HybridIndex::build(lists, &IndexConfig::default()).unwrap();
    ///
    /// let mut hits = index.lookup_addr(Ipv4Addr::new(10, 0, 0, 5));
    /// hits.sort();
    /// assert_eq!(hits, vec![ListId::new(1), ListId::new(2)]);
    /// ```
    pub fn build<L, N>(lists: L, config: &IndexConfig) -> Result<Self>
    where
        L: IntoIterator<Item = (ListId, N)>,
        N: IntoIterator<Item = Ipv4Net>,
    {
        config.validate()?;

        let mut trie_entries = Vec::new();
        let mut bitmaps = Vec::new();
        let mut list_count = 0;

        for (list, nets) in lists {
            list_count += 1;
            let nets: Vec<Ipv4Net> = nets.into_iter().collect();

            if nets.len() < config.large_list_threshold {
                trie_entries.extend(nets.into_iter().map(|net| PrefixEntry::from_net(net, list)));
                continue;
            }

            let total = nets.len();
            let mut bitmap = CompressedBitmap::new();
            for net in nets {
                if net.prefix_len() == MAX_PREFIX_LEN {
                    bitmap.add(net.addr())?;
                } else {
                    trie_entries.push(PrefixEntry::from_net(net, list));
                }
            }
            // Finalize per list, as soon as the list is complete.
            bitmap.finalize();
            log::debug!(
                "List {} routed to bitmap: {} of {} entries, {} runs",
                list,
                bitmap.len(),
                total,
                bitmap.run_count()
            );
            bitmaps.push((list, bitmap));
        }

        let trie = PrefixTrie::build(trie_entries);
        log::info!(
            "Built index: {} lists, {} trie entries ({} nodes), {} bitmaps",
            list_count,
            trie.len(),
            trie.node_count(),
            bitmaps.len()
        );

        Ok(Self {
            trie,
            bitmaps,
            list_count,
        })
    }

    /// Return the ids of all lists with an entry related to `query`.
    ///
    /// Bitmaps only hold exact addresses, so they are consulted for /32
    /// queries only. Results are not deduplicated.
    pub fn lookup(&self, query: Ipv4Net) -> Vec<ListId> {
        let mut result = self.trie.lookup(query);

        if query.prefix_len() == MAX_PREFIX_LEN {
            let addr = query.addr();
            result.extend(
                self.bitmaps
                    .iter()
                    .filter(|(_, bitmap)| bitmap.lookup(addr))
                    .map(|(list, _)| *list),
            );
        }

        result
    }

    /// Return the ids of all lists containing `addr`.
    pub fn lookup_addr(&self, addr: Ipv4Addr) -> Vec<ListId> {
        self.lookup(Ipv4Net::from(addr))
    }

    /// The trie holding every non-bitmap entry.
    pub fn trie(&self) -> &PrefixTrie {
        &self.trie
    }

    /// Ids of the lists whose exact entries live in a bitmap.
    pub fn bitmap_lists(&self) -> impl Iterator<Item = ListId> + '_ {
        self.bitmaps.iter().map(|(list, _)| *list)
    }

    /// Number of lists the index was built from.
    pub fn list_count(&self) -> usize {
        self.list_count
    }

    /// Collect size statistics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            lists: self.list_count,
            trie_entries: self.trie.len(),
            trie_nodes: self.trie.node_count(),
            trie_bytes: self.trie.size_in_bytes(),
            bitmap_lists: self.bitmaps.len(),
            bitmap_addresses: self.bitmaps.iter().map(|(_, b)| b.len()).sum(),
            bitmap_runs: self.bitmaps.iter().map(|(_, b)| b.run_count()).sum(),
            bitmap_bytes: self.bitmaps.iter().map(|(_, b)| b.size_in_bytes()).sum(),
        }
    }
}

impl std::fmt::Debug for HybridIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridIndex")
            .field("lists", &self.list_count)
            .field("trie_entries", &self.trie.len())
            .field("bitmaps", &self.bitmaps.len())
            .finish()
    }
}

/// Size statistics of a built index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub lists: usize,
    pub trie_entries: usize,
    pub trie_nodes: usize,
    pub trie_bytes: usize,
    pub bitmap_lists: usize,
    pub bitmap_addresses: usize,
    pub bitmap_runs: usize,
    pub bitmap_bytes: usize,
}
