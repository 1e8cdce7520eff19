//! Loading raw lists from files.
//!
//! Two list file formats are supported, either optionally gzip compressed
//! (`.gz` suffix):
//!
//! - **binary**: the record format from [`crate::wire`] (`.bin`, `.rec`)
//! - **text**: one CIDR or bare IPv4 address per line, `#` comments
//!
//! A YAML [`Manifest`] names a set of list files together with the index
//! configuration:
//!
//! ```yaml
//! large_list_threshold: 100000
//! lists:
//!   - namespace: 1
//!     id: 10
//!     path: blocklist.txt
//!   - namespace: 1
//!     id: 11
//!     path: scanners.bin.gz
//!     format: binary
//! ```

use flate2::read::GzDecoder;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::wire::{encode_records, RawList};
use crate::{Error, IndexConfig, ListId, Result};

/// On-disk list format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    Binary,
    Text,
}

impl ListFormat {
    /// Guess the format from the file name, ignoring a `.gz` suffix.
    pub fn detect(path: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);

        if name.ends_with(".bin") || name.ends_with(".rec") {
            ListFormat::Binary
        } else {
            ListFormat::Text
        }
    }
}

/// Parse a text list.
///
/// Bare addresses are read as /32. Any unparseable line is an error.
pub fn parse_text<R: Read>(reader: R) -> Result<Vec<Ipv4Net>> {
    let mut nets = Vec::new();

    for (i, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;

        // Remove comments
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => &line,
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        let net = if line.contains('/') {
            line.parse::<Ipv4Net>().ok()
        } else {
            line.parse::<Ipv4Addr>().ok().map(Ipv4Net::from)
        };

        match net {
            Some(net) => nets.push(net),
            None => {
                return Err(Error::InvalidCidr {
                    line: i + 1,
                    value: line.to_string(),
                })
            }
        }
    }

    Ok(nets)
}

/// Open a file, transparently decompressing `.gz` files.
fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Load one list file.
///
/// Binary files are not decoded here; malformed records are reported when
/// the index is built.
pub fn load_list(id: ListId, path: &Path, format: Option<ListFormat>) -> Result<RawList> {
    let format = format.unwrap_or_else(|| ListFormat::detect(path));
    let mut reader = open(path)?;

    let data = match format {
        ListFormat::Binary => {
            let mut data = Vec::new();
            reader.read_to_end(&mut data)?;
            data
        }
        ListFormat::Text => encode_records(&parse_text(reader)?),
    };

    log::debug!("Loaded list {} from {:?} ({} bytes)", id, path, data.len());
    Ok(RawList::new(id, data))
}

/// One list entry of a [`Manifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSource {
    #[serde(default)]
    pub namespace: u32,
    pub id: u32,
    pub path: PathBuf,
    #[serde(default)]
    pub format: Option<ListFormat>,
}

impl ListSource {
    pub fn list_id(&self) -> ListId {
        ListId::from_parts(self.namespace, self.id)
    }
}

/// A set of list files plus index configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub large_list_threshold: Option<usize>,
    #[serde(default)]
    pub lists: Vec<ListSource>,
    /// Directory relative list paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Manifest {
    /// Parse a manifest whose relative paths are resolved against `base_dir`.
    pub fn from_yaml(yaml: &str, base_dir: impl AsRef<Path>) -> Result<Self> {
        let mut manifest: Manifest = serde_yaml::from_str(yaml)?;
        manifest.base_dir = base_dir.as_ref().to_path_buf();
        Ok(manifest)
    }

    /// Load a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base_dir)
    }

    /// Index configuration, defaulting anything not set in the manifest.
    pub fn config(&self) -> IndexConfig {
        match self.large_list_threshold {
            Some(threshold) => IndexConfig::new(threshold),
            None => IndexConfig::default(),
        }
    }

    /// Resolve a list path against the manifest directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load every list named in the manifest.
    pub fn load_lists(&self) -> Result<Vec<RawList>> {
        self.lists
            .iter()
            .map(|source| load_list(source.list_id(), &self.resolve(&source.path), source.format))
            .collect()
    }
}
