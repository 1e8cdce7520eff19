//! Prefix entries, the unit of input to the index.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

use crate::{Error, ListId, Result};

/// Maximum IPv4 prefix length.
pub const MAX_PREFIX_LEN: u8 = 32;

/// An immutable `(network, list)` pair.
///
/// The address keeps any host bits it was created with; matching only
/// looks at the leading `prefix_len` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrefixEntry {
    net: Ipv4Net,
    list: ListId,
}

impl PrefixEntry {
    /// Create an entry, rejecting prefix lengths above 32.
    pub fn new(addr: Ipv4Addr, prefix_len: u8, list: ListId) -> Result<Self> {
        let net = Ipv4Net::new(addr, prefix_len).map_err(|_| Error::InvalidPrefixLength(prefix_len))?;
        Ok(Self { net, list })
    }

    /// Create an entry from an already validated network.
    pub fn from_net(net: Ipv4Net, list: ListId) -> Self {
        Self { net, list }
    }

    pub fn net(&self) -> Ipv4Net {
        self.net
    }

    pub fn list(&self) -> ListId {
        self.list
    }

    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    /// The address with host bits cleared, as a trie key.
    pub fn key(&self) -> u32 {
        u32::from(self.net.network())
    }

    /// Whether this entry is a single address (/32).
    pub fn is_exact(&self) -> bool {
        self.net.prefix_len() == MAX_PREFIX_LEN
    }
}

/// Mask keeping the top `len` bits of a 32-bit key.
#[inline]
pub(crate) fn prefix_mask(len: u8) -> u32 {
    match len {
        0 => 0,
        l if l >= MAX_PREFIX_LEN => u32::MAX,
        l => u32::MAX << (MAX_PREFIX_LEN - l),
    }
}
