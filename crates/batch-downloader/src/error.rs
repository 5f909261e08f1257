//! Error kinds surfaced by the download pipeline.
//!
//! Only [`LoadError`] aborts a run; everything else is recorded against the
//! row that produced it.

use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The manifest could not be turned into a row-set.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("could not find a valid header row in the first {0} lines")]
    NoHeaderRow(usize),
    #[error("failed to parse CSV: {0}")]
    Parse(#[from] csv::Error),
    #[error("failed to download spreadsheet from {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("could not find required columns; available columns: {available:?}")]
    MissingColumns { available: Vec<String> },
    #[error("no groups found in the manifest")]
    NoGroups,
    #[error("read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A link matched none of the known providers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported host for URL: {url}")]
pub struct UnsupportedHost {
    pub url: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    UnsupportedHost(#[from] UnsupportedHost),
    #[error("{endpoint} returned HTTP {status}")]
    HttpStatus { endpoint: String, status: u16 },
    #[error("transfer from {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: BoxError,
    },
}

impl FetchError {
    pub(crate) fn transport(endpoint: &str, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            source: source.into(),
        }
    }
}

/// Writing the tag header failed; the audio file itself is still on disk.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("{path:?} is a {format} file, not a taggable container")]
    UnsupportedContainer {
        path: PathBuf,
        format: batch_types::ContainerFormat,
    },
    #[error("{path:?} cannot hold an ID3v2 tag")]
    NoTagHeader { path: PathBuf },
    #[error("tag container {path:?}: {source}")]
    Container {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
    #[error("tag writer task failed: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("concurrency must be between 1 and 10, got {0}")]
    Concurrency(String),
    #[error("endpoint template {0:?} has no {{id}} placeholder")]
    EndpointTemplate(String),
}
