//! Manifest-driven batch downloader.
//!
//! Rows from a spreadsheet export are grouped by label; each group is fetched
//! into its own folder on a bounded pool, mp3 results get ID3 tags, and every
//! row lands in exactly one bucket of an [`batch_types::OutcomeTally`].

pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod group;
pub mod manifest;
pub mod normalize;
pub mod orchestrator;
pub mod resolver;
pub mod sanitize;
pub mod tag_writer;
pub mod tally;
pub mod transport;

pub use config::{Concurrency, DownloaderConfig, ProviderEndpoints};
pub use error::{ConfigError, FetchError, LoadError, TagError, UnsupportedHost};
pub use events::EventBus;
pub use fetcher::{AssetFetcher, FetchedAsset};
pub use group::GroupProcessor;
pub use manifest::{Manifest, ManifestSource};
pub use normalize::normalize;
pub use orchestrator::{BatchOrchestrator, available_groups, render_summary};
pub use resolver::{AssetResolver, Provider};
pub use tag_writer::{LoftyTagWriter, TagWriter};
pub use transport::{HttpTransport, Transport};
