//! Opaque list identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// ListId identifies one address list.
///
/// The index only compares and returns ids. Callers that group lists by
/// namespace can pack both halves with [`ListId::from_parts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(u64);

impl ListId {
    /// Wrap a raw 64-bit id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Pack a namespace and a namespace-local id as `(namespace << 32) | local`.
    pub const fn from_parts(namespace: u32, local: u32) -> Self {
        Self(((namespace as u64) << 32) | local as u64)
    }

    /// The upper 32 bits.
    pub const fn namespace(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// The lower 32 bits.
    pub const fn local(self) -> u32 {
        self.0 as u32
    }

    /// The raw 64-bit value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace(), self.local())
    }
}

impl std::str::FromStr for ListId {
    type Err = ();

    /// Parse `namespace:local` or a bare raw id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            Some((ns, local)) => {
                let ns = ns.trim().parse::<u32>().map_err(|_| ())?;
                let local = local.trim().parse::<u32>().map_err(|_| ())?;
                Ok(Self::from_parts(ns, local))
            }
            None => s.parse::<u64>().map(Self).map_err(|_| ()),
        }
    }
}
