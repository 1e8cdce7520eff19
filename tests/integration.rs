//! Integration tests for building and querying ip-index indexes.

use ip_index::{
    build, completion_channel, start_build, Error, HybridIndex, IndexConfig, IndexSlot, ListId,
    Manifest, RawList,
};
use ipnet::Ipv4Net;
use proptest::prelude::*;
use std::fs;
use std::net::Ipv4Addr;

fn net(s: &str) -> Ipv4Net {
    s.parse().unwrap()
}

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn raw(id: ListId, nets: &[&str]) -> RawList {
    let nets: Vec<Ipv4Net> = nets.iter().map(|s| net(s)).collect();
    RawList::from_nets(id, &nets)
}

fn sorted(mut ids: Vec<ListId>) -> Vec<ListId> {
    ids.sort();
    ids
}

const A: ListId = ListId::from_parts(1, 1);
const B: ListId = ListId::from_parts(1, 2);
const C: ListId = ListId::from_parts(2, 1);

#[test]
fn test_overlapping_lists_are_not_deduplicated() {
    let index = build(
        &[raw(A, &["10.0.0.0/24"]), raw(B, &["10.0.0.5/32"])],
        &IndexConfig::default(),
    )
    .unwrap();

    assert_eq!(sorted(index.lookup(ip("10.0.0.5"))), vec![A, B]);
    assert_eq!(index.lookup(ip("10.0.0.6")), vec![A]);
    assert!(index.lookup(ip("10.0.1.1")).is_empty());
}

#[test]
fn test_repeated_lookups_agree() {
    let index = build(
        &[
            raw(A, &["10.0.0.0/8", "10.1.0.0/16"]),
            raw(B, &["10.1.2.3/32", "0.0.0.0/0"]),
        ],
        &IndexConfig::new(2),
    )
    .unwrap();

    let first = sorted(index.lookup(ip("10.1.2.3")));
    let second = sorted(index.lookup(ip("10.1.2.3")));
    assert_eq!(first, second);
    assert_eq!(first, vec![A, A, B, B]);
}

#[test]
fn test_hybrid_routing_large_list() {
    // Every other address, so the bitmap holds literal words rather than fills.
    let mut nets: Vec<Ipv4Net> = (0..2_000_000u32)
        .map(|i| Ipv4Net::from(Ipv4Addr::from(0x0a00_0000 + 2 * i)))
        .collect();
    nets.push(net("172.16.0.0/16"));

    let index = build(&[RawList::from_nets(C, &nets)], &IndexConfig::new(1_000_000)).unwrap();

    let stats = index.index().stats();
    assert_eq!(stats.bitmap_lists, 1);
    assert_eq!(stats.bitmap_addresses, 2_000_000);
    assert_eq!(stats.trie_entries, 1);

    // Trie path
    assert_eq!(index.lookup(ip("172.16.9.9")), vec![C]);
    // Bitmap path
    assert_eq!(index.lookup(ip("10.0.0.0")), vec![C]);
    assert_eq!(index.lookup(Ipv4Addr::from(0x0a00_0000 + 2 * 1_999_999)), vec![C]);
    assert!(index.lookup(ip("10.0.0.1")).is_empty());
    assert!(index.lookup(ip("192.168.0.1")).is_empty());
}

#[test]
fn test_threshold_boundary() {
    let hosts = |count: u32| -> Vec<Ipv4Net> {
        (0..count)
            .map(|i| Ipv4Net::from(Ipv4Addr::from(0xc000_0200 + i)))
            .collect()
    };
    let config = IndexConfig::new(100);

    let below = HybridIndex::build(vec![(A, hosts(99))], &config).unwrap();
    assert_eq!(below.bitmap_lists().count(), 0);
    assert_eq!(below.trie().len(), 99);
    assert_eq!(below.lookup_addr(Ipv4Addr::from(0xc000_0200 + 98)), vec![A]);

    let at = HybridIndex::build(vec![(A, hosts(100))], &config).unwrap();
    assert_eq!(at.bitmap_lists().collect::<Vec<_>>(), vec![A]);
    assert!(at.trie().is_empty());
    assert_eq!(at.lookup_addr(Ipv4Addr::from(0xc000_0200 + 99)), vec![A]);
}

#[test]
fn test_every_large_list_is_finalized() {
    let lists: Vec<RawList> = (0..4u32)
        .map(|n| {
            let nets: Vec<Ipv4Net> = (0..10u32)
                .map(|i| Ipv4Net::from(Ipv4Addr::new(10, n as u8, 0, i as u8)))
                .collect();
            RawList::from_nets(ListId::from_parts(3, n), &nets)
        })
        .collect();

    let index = build(&lists, &IndexConfig::new(10)).unwrap();
    assert_eq!(index.index().bitmap_lists().count(), 4);
    for n in 0..4u32 {
        assert_eq!(
            index.lookup(Ipv4Addr::new(10, n as u8, 0, 9)),
            vec![ListId::from_parts(3, n)]
        );
    }
}

#[test]
fn test_empty_lists() {
    let index = build(&[RawList::new(A, Vec::new())], &IndexConfig::default()).unwrap();
    assert!(index.lookup(ip("0.0.0.0")).is_empty());
    assert!(index.lookup(ip("255.255.255.255")).is_empty());

    let index = build(&[], &IndexConfig::default()).unwrap();
    assert_eq!(index.index().list_count(), 0);
    assert!(index.lookup(ip("10.0.0.1")).is_empty());
}

#[test]
fn test_malformed_list_fails_build() {
    let good = raw(A, &["10.0.0.0/8"]);

    let short = RawList::new(B, vec![10, 0, 0, 1]);
    match build(&[good.clone(), short], &IndexConfig::default()) {
        Err(Error::MalformedRecords { list, len }) => {
            assert_eq!(list, B);
            assert_eq!(len, 4);
        }
        other => panic!("expected MalformedRecords, got {other:?}"),
    }

    let bad_len = RawList::new(B, vec![10, 0, 0, 1, 32, 10, 0, 0, 2, 33]);
    match build(&[good, bad_len], &IndexConfig::default()) {
        Err(Error::InvalidRecord {
            list,
            offset,
            prefix_len,
        }) => {
            assert_eq!(list, B);
            assert_eq!(offset, 5);
            assert_eq!(prefix_len, 33);
        }
        other => panic!("expected InvalidRecord, got {other:?}"),
    }
}

#[test]
fn test_background_build_failure_is_reported() {
    let (tx, mut rx) = completion_channel();
    let bad = RawList::new(B, vec![1, 2, 3, 4, 5, 6, 7]);
    let (ticket, job) = start_build(vec![raw(A, &["10.0.0.0/8"]), bad], IndexConfig::default(), tx)
        .unwrap();

    assert!(matches!(job.wait(), Err(Error::BuildFailed(_))));

    let completion = rx.blocking_recv().unwrap();
    assert_eq!(completion.ticket, ticket);
    assert!(completion.result.is_err());
}

#[test]
fn test_invalid_threshold_fails_build() {
    let result = build(&[raw(A, &["10.0.0.0/8"])], &IndexConfig::new(0));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_background_build_from_async_context() {
    let (tx, mut rx) = completion_channel();
    let (ticket, job) = start_build(
        vec![raw(A, &["10.0.0.0/24"]), raw(B, &["10.0.0.5/32"])],
        IndexConfig::default(),
        tx,
    )
    .unwrap();

    let completion = rx.recv().await.unwrap();
    assert_eq!(completion.ticket, ticket);
    let index = completion.result.unwrap();
    assert_eq!(sorted(index.lookup(ip("10.0.0.5"))), vec![A, B]);

    let status = tokio::task::spawn_blocking(move || job.wait()).await.unwrap();
    assert!(status.is_ok());
}

#[test]
fn test_manifest_to_slot() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("blocklist.txt"),
        "# blocked networks\n10.0.0.0/24\n",
    )
    .unwrap();
    fs::write(dir.path().join("scanners.txt"), "10.0.0.5\n10.0.0.7\n").unwrap();
    let manifest_path = dir.path().join("lists.yaml");
    fs::write(
        &manifest_path,
        r#"
large_list_threshold: 2
lists:
  - namespace: 1
    id: 1
    path: blocklist.txt
  - namespace: 1
    id: 2
    path: scanners.txt
"#,
    )
    .unwrap();

    let manifest = Manifest::load(&manifest_path).unwrap();
    let lists = manifest.load_lists().unwrap();
    let index = build(&lists, &manifest.config()).unwrap();
    assert_eq!(index.index().bitmap_lists().collect::<Vec<_>>(), vec![B]);

    let slot = IndexSlot::new();
    assert!(matches!(slot.lookup(ip("10.0.0.5")), Err(Error::NotInitialized)));

    slot.publish(index);
    assert_eq!(sorted(slot.lookup(ip("10.0.0.5")).unwrap()), vec![A, B]);
    assert_eq!(slot.lookup(ip("10.0.0.6")).unwrap(), vec![A]);
}

/// Entries are drawn from 10.0.0.0/22 so queries over the window hit them.
const WINDOW_BASE: u32 = 0x0a00_0000;
const WINDOW_SIZE: u32 = 1024;

fn arb_list() -> impl Strategy<Value = Vec<(u32, u8)>> {
    prop::collection::vec(
        prop_oneof![
            3 => (0..WINDOW_SIZE, Just(32u8)),
            1 => (0..WINDOW_SIZE, 0u8..=32),
        ],
        0..40,
    )
}

proptest! {
    #[test]
    fn prop_lookup_ignores_routing(
        lists in prop::collection::vec(arb_list(), 1..5),
        threshold in 1usize..40,
    ) {
        let lists: Vec<(ListId, Vec<Ipv4Net>)> = lists
            .into_iter()
            .enumerate()
            .map(|(i, entries)| {
                // Bitmaps hold sets, so a list repeating a host counts once.
                let mut nets: Vec<Ipv4Net> = entries
                    .into_iter()
                    .map(|(offset, len)| {
                        Ipv4Net::new(Ipv4Addr::from(WINDOW_BASE + offset), len).unwrap().trunc()
                    })
                    .collect();
                nets.sort();
                nets.dedup();
                (ListId::new(i as u64), nets)
            })
            .collect();

        let index = HybridIndex::build(lists.clone(), &IndexConfig::new(threshold)).unwrap();

        for offset in 0..WINDOW_SIZE {
            let addr = Ipv4Addr::from(WINDOW_BASE + offset);
            let mut expected: Vec<ListId> = lists
                .iter()
                .flat_map(|(id, nets)| nets.iter().filter(|n| n.contains(&addr)).map(move |_| *id))
                .collect();
            expected.sort();

            let mut actual = index.lookup_addr(addr);
            actual.sort();
            prop_assert_eq!(actual, expected);
        }
    }
}
