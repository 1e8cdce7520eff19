//! HybridIndex configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default number of entries at which a list counts as large.
pub const DEFAULT_LARGE_LIST_THRESHOLD: usize = 1_000_000;

/// Configuration for building a [`HybridIndex`](super::HybridIndex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Lists with at least this many entries keep their /32 entries in a
    /// compressed bitmap instead of the trie
    pub large_list_threshold: usize,
}

impl IndexConfig {
    /// Create a new IndexConfig.
    pub fn new(large_list_threshold: usize) -> Self {
        Self {
            large_list_threshold,
        }
    }

    /// Set the large list threshold.
    pub fn with_large_list_threshold(mut self, threshold: usize) -> Self {
        self.large_list_threshold = threshold;
        self
    }

    /// Check that the configuration can be used for a build.
    pub fn validate(&self) -> Result<()> {
        if self.large_list_threshold == 0 {
            return Err(Error::Config(
                "large_list_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LARGE_LIST_THRESHOLD)
    }
}
