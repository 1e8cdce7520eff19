//! Record wire format for raw address lists.
//!
//! A list is a flat buffer of fixed-size records:
//!
//! ```text
//! +---------------------------+------------+
//! | IPv4 address (4 bytes BE) | prefix len |  x N
//! +---------------------------+------------+
//! ```
//!
//! A prefix length of 32 marks an exact address. A buffer whose length is
//! not a multiple of [`RECORD_SIZE`], or a record with a prefix length
//! above 32, makes the whole list malformed.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

use crate::entry::MAX_PREFIX_LEN;
use crate::{Error, ListId, Result};

/// Size of one record in bytes.
pub const RECORD_SIZE: usize = 5;

/// An undecoded list as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawList {
    pub id: ListId,
    pub data: Vec<u8>,
}

impl RawList {
    pub fn new(id: ListId, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    /// Encode networks into a raw list.
    pub fn from_nets(id: ListId, nets: &[Ipv4Net]) -> Self {
        Self::new(id, encode_records(nets))
    }

    /// Number of whole records in the buffer.
    pub fn record_count(&self) -> usize {
        self.data.len() / RECORD_SIZE
    }

    /// Decode every record of this list.
    pub fn decode(&self) -> Result<Vec<Ipv4Net>> {
        decode_records(self.id, &self.data)
    }
}

/// Decode a record buffer belonging to `list`.
pub fn decode_records(list: ListId, data: &[u8]) -> Result<Vec<Ipv4Net>> {
    if data.len() % RECORD_SIZE != 0 {
        return Err(Error::MalformedRecords {
            list,
            len: data.len(),
        });
    }

    data.chunks_exact(RECORD_SIZE)
        .enumerate()
        .map(|(i, record)| {
            let addr = Ipv4Addr::new(record[0], record[1], record[2], record[3]);
            let prefix_len = record[4];
            if prefix_len > MAX_PREFIX_LEN {
                return Err(Error::InvalidRecord {
                    list,
                    offset: i * RECORD_SIZE,
                    prefix_len,
                });
            }
            Ipv4Net::new(addr, prefix_len).map_err(|_| Error::InvalidPrefixLength(prefix_len))
        })
        .collect()
}

/// Encode networks as records.
pub fn encode_records(nets: &[Ipv4Net]) -> Vec<u8> {
    let mut data = Vec::with_capacity(nets.len() * RECORD_SIZE);
    for net in nets {
        data.extend_from_slice(&net.addr().octets());
        data.push(net.prefix_len());
    }
    data
}
