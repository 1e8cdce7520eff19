//! Error types for ip-index.

use thiserror::Error;

use crate::ListId;

/// Error type for ip-index operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Prefix length outside `0..=32`
    #[error("invalid prefix length: {0} (must be 0..=32)")]
    InvalidPrefixLength(u8),

    /// Record buffer length is not a multiple of the record size
    #[error("malformed record buffer for list {list}: length {len} is not a multiple of 5")]
    MalformedRecords { list: ListId, len: usize },

    /// A record inside an otherwise well-sized buffer is invalid
    #[error("invalid record in list {list} at byte {offset}: prefix length {prefix_len}")]
    InvalidRecord {
        list: ListId,
        offset: usize,
        prefix_len: u8,
    },

    /// Unparseable line in a text list
    #[error("invalid CIDR on line {line}: {value}")]
    InvalidCidr { line: usize, value: String },

    /// Attempt to add an address to a finalized bitmap
    #[error("bitmap is finalized and no longer accepts additions")]
    BitmapFinalized,

    /// Index slot queried before an index was published
    #[error("index not initialized")]
    NotInitialized,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Background build thread could not be started
    #[error("failed to spawn build worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// Background build panicked
    #[error("index build panicked: {0}")]
    BuildPanicked(String),

    /// Background build finished with an error
    #[error("index build failed: {0}")]
    BuildFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for ip-index operations.
pub type Result<T> = std::result::Result<T, Error>;
