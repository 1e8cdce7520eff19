//! Path-compressed binary prefix trie over IPv4 keys.
//!
//! The trie is bulk built from a complete set of [`PrefixEntry`] values and
//! is read-only afterwards. Every node either carries values or has two
//! children, so a trie over `n` entries has at most `2n - 1` nodes.
//!
//! Nodes are stored in preorder and their values are appended to a shared
//! pool in the same order. The values of any subtree are therefore one
//! contiguous slice of the pool, which makes "everything below this node"
//! a single copy.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

use crate::entry::{prefix_mask, MAX_PREFIX_LEN};
use crate::{ListId, PrefixEntry};

/// Child slot marker for a missing child.
const NO_CHILD: u32 = u32::MAX;

#[derive(Debug, Clone)]
struct Node {
    /// Key with bits past `len` cleared
    key: u32,
    /// Number of significant leading bits
    len: u8,
    children: [u32; 2],
    /// Values stored at exactly this node: `values[start..own_end]`
    start: u32,
    own_end: u32,
    /// End of the values of the whole subtree
    subtree_end: u32,
}

/// Sort key and payload used during construction.
type Item = (u32, u8, ListId);

/// PrefixTrie answers "which lists have an entry related to this block".
///
/// A stored entry `(a2, l2)` matches a query `(a, l)` when the leading
/// `min(l, l2)` bits of both addresses agree. For a /32 query this is plain
/// containment; for a shorter query it also returns every entry inside the
/// queried block.
///
/// # Examples
/// ```
/// use ip_index::{ListId, PrefixEntry, PrefixTrie};
/// use std::net::Ipv4Addr;
///
/// let a = ListId::new(1);
/// let b = ListId::new(2);
/// let trie = PrefixTrie::build([
///     PrefixEntry::new(Ipv4Addr::new(10, 0, 0, 0), 24, a).unwrap(),
///     PrefixEntry::new(Ipv4Addr::new(10, 0, 0, 5), 32, b).unwrap(),
/// ]);
///
/// let mut hits = trie.lookup_addr(Ipv4Addr::new(10, 0, 0, 5));
/// hits.sort();
/// assert_eq!(hits, vec![a, b]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrefixTrie {
    nodes: Vec<Node>,
    values: Vec<ListId>,
}

impl PrefixTrie {
    /// Build a trie from all of its entries at once.
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = PrefixEntry>,
    {
        let mut items: Vec<Item> = entries
            .into_iter()
            .map(|e| (e.key(), e.prefix_len(), e.list()))
            .collect();
        items.sort_unstable_by_key(|&(key, len, _)| (key, len));

        let mut trie = Self {
            nodes: Vec::with_capacity(items.len().saturating_mul(2)),
            values: Vec::with_capacity(items.len()),
        };
        if !items.is_empty() {
            trie.build_node(&items);
        }
        trie.nodes.shrink_to_fit();
        trie
    }

    /// Build the node covering `items` and its subtree, returning its index.
    ///
    /// `items` is sorted by `(key, len)` and non-empty.
    fn build_node(&mut self, items: &[Item]) -> u32 {
        let first = items[0].0;
        let last = items[items.len() - 1].0;
        // Sorted keys: the common prefix of the range is that of its ends.
        let common = (first ^ last).leading_zeros() as u8;
        let shortest = items.iter().map(|&(_, len, _)| len).min().unwrap_or(MAX_PREFIX_LEN);
        let len = common.min(shortest);

        // Entries ending here sort first: smallest key, then shortest length.
        let own = items.iter().take_while(|&&(_, l, _)| l == len).count();

        let id = self.nodes.len() as u32;
        let start = self.values.len() as u32;
        self.values.extend(items[..own].iter().map(|&(_, _, list)| list));
        self.nodes.push(Node {
            key: first & prefix_mask(len),
            len,
            children: [NO_CHILD; 2],
            start,
            own_end: self.values.len() as u32,
            subtree_end: 0,
        });

        let rest = &items[own..];
        if !rest.is_empty() {
            // Remaining entries are longer than `len`, so bit `len` exists.
            let split = rest.partition_point(|&(key, _, _)| bit_at(key, len) == 0);
            let (zeros, ones) = rest.split_at(split);
            if !zeros.is_empty() {
                let child = self.build_node(zeros);
                self.nodes[id as usize].children[0] = child;
            }
            if !ones.is_empty() {
                let child = self.build_node(ones);
                self.nodes[id as usize].children[1] = child;
            }
        }

        self.nodes[id as usize].subtree_end = self.values.len() as u32;
        id
    }

    /// Return the list id of every entry related to `query`.
    ///
    /// One id is returned per matching entry, so an id appears more than
    /// once when several of its entries match. Order is unspecified.
    pub fn lookup(&self, query: Ipv4Net) -> Vec<ListId> {
        let addr = u32::from(query.network());
        let qlen = query.prefix_len();
        let mut out = Vec::new();

        let mut idx = 0usize;
        while let Some(node) = self.nodes.get(idx) {
            let common = qlen.min(node.len);
            if (addr ^ node.key) & prefix_mask(common) != 0 {
                break;
            }

            if qlen <= node.len {
                // The query block covers this whole subtree.
                out.extend_from_slice(&self.values[node.start as usize..node.subtree_end as usize]);
                break;
            }

            out.extend_from_slice(&self.values[node.start as usize..node.own_end as usize]);
            match node.children[bit_at(addr, node.len)] {
                NO_CHILD => break,
                child => idx = child as usize,
            }
        }

        out
    }

    /// Return the list id of every entry containing `addr`.
    pub fn lookup_addr(&self, addr: Ipv4Addr) -> Vec<ListId> {
        self.lookup(Ipv4Net::from(addr))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of trie nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Approximate heap size in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node>()
            + self.values.capacity() * std::mem::size_of::<ListId>()
    }
}

/// Bit `pos` of `key`, counting from the most significant bit.
#[inline]
fn bit_at(key: u32, pos: u8) -> usize {
    ((key >> (MAX_PREFIX_LEN - 1 - pos)) & 1) as usize
}

#[cfg(test)]
mod tests;
