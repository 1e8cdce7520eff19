//! ip-index - IPv4 address classification against named CIDR lists.
//!
//! This crate answers "which lists contain this address?" for large sets
//! of address lists that are built once and queried many times.
//!
//! # Features
//!
//! - **Prefix trie**: path-compressed binary trie for CIDR entries of any
//!   length, returning every matching list
//! - **Compressed bitmaps**: lists made mostly of single addresses keep
//!   them in a run-length compressed bitmap with a random-access index
//! - **Build once, read anywhere**: a built index is immutable and can be
//!   queried from many threads without locking
//! - **Background builds**: build on a worker thread and receive the result
//!   through a completion channel
//! - **Hot replacement**: publish rebuilt indexes atomically via [`IndexSlot`]
//!
//! # Quick Start
//!
//! ```
//! use ip_index::{build, IndexConfig, ListId, RawList};
//! use std::net::Ipv4Addr;
//!
//! let blocklist = RawList::from_nets(ListId::from_parts(1, 1), &["10.0.0.0/24".parse().unwrap()]);
//! let scanners = RawList::from_nets(ListId::from_parts(1, 2), &["10.0.0.5/32".parse().unwrap()]);
//!
//! let index = build(&[blocklist, scanners], &IndexConfig::default()).unwrap();
//!
//! let mut hits = index.lookup(Ipv4Addr::new(10, 0, 0, 5));
//! hits.sort();
//! assert_eq!(hits, vec![ListId::from_parts(1, 1), ListId::from_parts(1, 2)]);
//! ```
//!
//! # Background Builds
//!
//! ```ignore
//! use ip_index::{completion_channel, start_build, IndexConfig};
//!
//! let (tx, mut rx) = completion_channel();
//! let (ticket, job) = start_build(lists, IndexConfig::default(), tx)?;
//!
//! // Later, from a blocking context:
//! job.wait()?;
//! let completion = rx.blocking_recv().expect("worker always reports");
//! assert_eq!(completion.ticket, ticket);
//! let index = completion.result?;
//! ```
//!
//! # Routing
//!
//! Lists with at least [`IndexConfig::large_list_threshold`] entries (one
//! million by default) keep their /32 entries in a [`CompressedBitmap`];
//! all other entries live in the [`PrefixTrie`]. Bitmaps only answer exact
//! address queries.

mod entry;
mod error;
mod list_id;

pub mod bitmap;
pub mod handle;
pub mod index;
pub mod source;
pub mod trie;
pub mod wire;
pub mod worker;

// Re-export core types
pub use entry::{PrefixEntry, MAX_PREFIX_LEN};
pub use error::{Error, Result};
pub use list_id::ListId;

pub use bitmap::CompressedBitmap;
pub use index::{HybridIndex, IndexConfig, IndexStats, DEFAULT_LARGE_LIST_THRESHOLD};
pub use trie::PrefixTrie;

// Re-export the boundary API
pub use handle::{build, IndexHandle, IndexSlot};
pub use source::{ListFormat, Manifest};
pub use wire::{RawList, RECORD_SIZE};
pub use worker::{completion_channel, start_build, BuildJob, Completion, Ticket};
