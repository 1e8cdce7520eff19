//! Tests for the prefix trie.

use super::*;
use proptest::prelude::*;

fn entry(addr: [u8; 4], len: u8, list: u64) -> PrefixEntry {
    PrefixEntry::new(Ipv4Addr::from(addr), len, ListId::new(list)).unwrap()
}

fn net(addr: [u8; 4], len: u8) -> Ipv4Net {
    Ipv4Net::new(Ipv4Addr::from(addr), len).unwrap()
}

fn sorted(mut ids: Vec<ListId>) -> Vec<ListId> {
    ids.sort();
    ids
}

fn ids(raw: &[u64]) -> Vec<ListId> {
    sorted(raw.iter().copied().map(ListId::new).collect())
}

/// Reference matcher: scan every entry.
fn brute_force(entries: &[PrefixEntry], query: Ipv4Net) -> Vec<ListId> {
    let addr = u32::from(query.network());
    let hits = entries
        .iter()
        .filter(|e| {
            let common = query.prefix_len().min(e.prefix_len());
            (addr ^ e.key()) & prefix_mask(common) == 0
        })
        .map(|e| e.list())
        .collect();
    sorted(hits)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_empty_trie() {
    let trie = PrefixTrie::build(Vec::new());
    assert!(trie.is_empty());
    assert_eq!(trie.node_count(), 0);
    assert!(trie.lookup_addr(Ipv4Addr::new(1, 2, 3, 4)).is_empty());
    assert!(trie.lookup(net([0, 0, 0, 0], 0)).is_empty());
}

#[test]
fn test_node_count_is_bounded() {
    let entries: Vec<_> = (0..100u8).map(|i| entry([10, i, 0, 1], 32, 1)).collect();
    let trie = PrefixTrie::build(entries);
    assert_eq!(trie.len(), 100);
    assert!(trie.node_count() <= 2 * 100 - 1);
}

#[test]
fn test_host_bits_are_ignored() {
    let trie = PrefixTrie::build([entry([192, 168, 1, 77], 16, 1)]);
    assert_eq!(trie.lookup_addr(Ipv4Addr::new(192, 168, 200, 1)), ids(&[1]));
    assert!(trie.lookup_addr(Ipv4Addr::new(192, 169, 0, 1)).is_empty());
}

#[test]
fn test_same_key_different_lengths() {
    let trie = PrefixTrie::build([
        entry([10, 0, 0, 0], 16, 2),
        entry([10, 0, 0, 0], 8, 1),
        entry([10, 0, 0, 0], 32, 3),
    ]);
    assert_eq!(sorted(trie.lookup_addr(Ipv4Addr::new(10, 0, 0, 0))), ids(&[1, 2, 3]));
    assert_eq!(sorted(trie.lookup_addr(Ipv4Addr::new(10, 0, 9, 9))), ids(&[1, 2]));
    assert_eq!(trie.lookup_addr(Ipv4Addr::new(10, 9, 9, 9)), ids(&[1]));
}

// ============================================================================
// Exact-address queries
// ============================================================================

#[test]
fn test_overlapping_lists() {
    let trie = PrefixTrie::build([entry([10, 0, 0, 0], 24, 1), entry([10, 0, 0, 5], 32, 2)]);

    assert_eq!(sorted(trie.lookup_addr(Ipv4Addr::new(10, 0, 0, 5))), ids(&[1, 2]));
    assert_eq!(trie.lookup_addr(Ipv4Addr::new(10, 0, 0, 6)), ids(&[1]));
    assert!(trie.lookup_addr(Ipv4Addr::new(10, 0, 1, 1)).is_empty());
}

#[test]
fn test_duplicates_are_preserved() {
    let trie = PrefixTrie::build([
        entry([10, 0, 0, 0], 8, 1),
        entry([10, 0, 0, 0], 16, 1),
        entry([10, 0, 0, 0], 8, 1),
    ]);
    assert_eq!(trie.lookup_addr(Ipv4Addr::new(10, 0, 0, 1)), ids(&[1, 1, 1]));
}

#[test]
fn test_default_route() {
    let trie = PrefixTrie::build([entry([0, 0, 0, 0], 0, 9), entry([8, 8, 8, 8], 32, 1)]);
    assert_eq!(trie.lookup_addr(Ipv4Addr::new(203, 0, 113, 1)), ids(&[9]));
    assert_eq!(sorted(trie.lookup_addr(Ipv4Addr::new(8, 8, 8, 8))), ids(&[1, 9]));
}

#[test]
fn test_boundary_addresses() {
    let trie = PrefixTrie::build([
        entry([0, 0, 0, 0], 32, 1),
        entry([255, 255, 255, 255], 32, 2),
        entry([128, 0, 0, 0], 1, 3),
    ]);
    assert_eq!(trie.lookup_addr(Ipv4Addr::new(0, 0, 0, 0)), ids(&[1]));
    assert_eq!(sorted(trie.lookup_addr(Ipv4Addr::new(255, 255, 255, 255))), ids(&[2, 3]));
    assert_eq!(trie.lookup_addr(Ipv4Addr::new(128, 0, 0, 0)), ids(&[3]));
    assert!(trie.lookup_addr(Ipv4Addr::new(127, 255, 255, 255)).is_empty());
}

// ============================================================================
// Range queries
// ============================================================================

#[test]
fn test_zero_length_query_matches_everything() {
    let entries = vec![
        entry([10, 0, 0, 0], 8, 1),
        entry([172, 16, 0, 0], 12, 2),
        entry([192, 168, 1, 1], 32, 3),
    ];
    let trie = PrefixTrie::build(entries);
    assert_eq!(sorted(trie.lookup(net([0, 0, 0, 0], 0))), ids(&[1, 2, 3]));
}

#[test]
fn test_less_specific_query_returns_descendants() {
    let trie = PrefixTrie::build([
        entry([10, 1, 0, 0], 16, 1),
        entry([10, 2, 3, 4], 32, 2),
        entry([11, 0, 0, 0], 8, 3),
    ]);
    assert_eq!(sorted(trie.lookup(net([10, 0, 0, 0], 8))), ids(&[1, 2]));
    assert_eq!(trie.lookup(net([10, 2, 0, 0], 16)), ids(&[2]));
}

#[test]
fn test_more_specific_query_returns_ancestors() {
    let trie = PrefixTrie::build([entry([10, 0, 0, 0], 8, 1), entry([10, 1, 1, 0], 24, 2)]);
    assert_eq!(trie.lookup(net([10, 200, 0, 0], 16)), ids(&[1]));
    assert_eq!(sorted(trie.lookup(net([10, 1, 0, 0], 16))), ids(&[1, 2]));
}

#[test]
fn test_lookup_is_idempotent() {
    let trie = PrefixTrie::build([entry([10, 0, 0, 0], 8, 1), entry([10, 0, 0, 1], 32, 2)]);
    let first = sorted(trie.lookup_addr(Ipv4Addr::new(10, 0, 0, 1)));
    let second = sorted(trie.lookup_addr(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(first, second);
}

// ============================================================================
// Properties
// ============================================================================

fn arb_entry() -> impl Strategy<Value = PrefixEntry> {
    // Few distinct high bytes so entries overlap often.
    (0u32..4, any::<u32>(), 0u8..=32, 0u64..5).prop_map(|(high, low, len, list)| {
        let addr = (high << 30) | (low >> 2);
        PrefixEntry::new(Ipv4Addr::from(addr), len, ListId::new(list)).unwrap()
    })
}

fn arb_query() -> impl Strategy<Value = Ipv4Net> {
    (0u32..4, any::<u32>(), 0u8..=32).prop_map(|(high, low, len)| {
        Ipv4Net::new(Ipv4Addr::from((high << 30) | (low >> 2)), len).unwrap()
    })
}

proptest! {
    #[test]
    fn prop_lookup_matches_brute_force(
        entries in prop::collection::vec(arb_entry(), 0..64),
        queries in prop::collection::vec(arb_query(), 1..32),
    ) {
        let trie = PrefixTrie::build(entries.clone());
        prop_assert_eq!(trie.len(), entries.len());
        prop_assert!(trie.node_count() <= entries.len().max(1) * 2);
        for query in queries {
            prop_assert_eq!(sorted(trie.lookup(query)), brute_force(&entries, query));
        }
    }
}
