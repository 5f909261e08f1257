//! Per-group fan-out: filter rows, fetch and tag them on a bounded pool.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use batch_types::{FetchEvent, NormalizedMetadata, OutcomeTally, Row, RowOutcome, group_key};
use futures_util::{FutureExt, StreamExt, stream};

use crate::config::Concurrency;
use crate::error::TagError;
use crate::events::EventBus;
use crate::fetcher::AssetFetcher;
use crate::normalize::normalize;
use crate::sanitize::sanitize_folder_name;
use crate::tag_writer::TagWriter;

/// Lifecycle of one group run, reported at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Init,
    Filtering,
    Dispatching,
    Draining,
    Done,
}

#[derive(Clone)]
pub struct GroupProcessor {
    fetcher: AssetFetcher,
    tagger: Arc<dyn TagWriter>,
    events: EventBus,
    base_dir: PathBuf,
    concurrency: Concurrency,
}

impl GroupProcessor {
    pub fn new(
        fetcher: AssetFetcher,
        tagger: Arc<dyn TagWriter>,
        events: EventBus,
        base_dir: impl Into<PathBuf>,
        concurrency: Concurrency,
    ) -> Self {
        Self {
            fetcher,
            tagger,
            events,
            base_dir: base_dir.into(),
            concurrency,
        }
    }

    /// Destination folder for `label` under the base download directory.
    pub fn folder_for(&self, label: &str) -> PathBuf {
        self.base_dir.join(sanitize_folder_name(label))
    }

    /// Process every eligible row of `label` and return the group's own tally.
    ///
    /// Never fails: each eligible row ends up in exactly one bucket.
    pub async fn run(&self, rows: &[Row], label: &str) -> OutcomeTally {
        let label = label.trim();
        enter(label, GroupState::Init);
        let folder = self.folder_for(label);
        if let Err(err) = tokio::fs::create_dir_all(&folder).await {
            // Rows still flow through; their fetches fail and land in `failed`.
            tracing::warn!(folder = %folder.display(), error = %err, "create group folder failed");
        }

        enter(label, GroupState::Filtering);
        let key = group_key(label);
        let eligible: Vec<&Row> = rows.iter().filter(|row| row.is_eligible(&key)).collect();
        tracing::info!(group = %label, rows = eligible.len(), "group started");
        self.events.emit(FetchEvent::GroupStarted {
            group: label.to_string(),
            rows: eligible.len(),
        });

        enter(label, GroupState::Dispatching);
        let mut units = stream::iter(eligible)
            .map(|row| self.guarded_unit(row, &folder))
            .buffer_unordered(self.concurrency.get());

        enter(label, GroupState::Draining);
        let mut tally = OutcomeTally::default();
        while let Some(outcome) = units.next().await {
            tally.record(outcome);
        }

        enter(label, GroupState::Done);
        tracing::info!(
            group = %label,
            tagged = tally.tagged.len(),
            fetched_untagged = tally.fetched_untagged.len(),
            failed = tally.failed.len(),
            "group finished"
        );
        self.events.emit(FetchEvent::GroupFinished {
            group: label.to_string(),
            tagged: tally.tagged.len(),
            fetched_untagged: tally.fetched_untagged.len(),
            failed: tally.failed.len(),
        });
        tally
    }

    /// Runs one row; a panic inside the unit is caught and counted as a failure.
    async fn guarded_unit(&self, row: &Row, folder: &Path) -> RowOutcome {
        match AssertUnwindSafe(self.process_row(row, folder))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(&*panic);
                tracing::error!(row = %row.name, reason = %reason, "row worker panicked");
                RowOutcome::Failed {
                    record: failure_record(row.name.trim(), row.link().unwrap_or_default()),
                }
            }
        }
    }

    async fn process_row(&self, row: &Row, folder: &Path) -> RowOutcome {
        let meta = normalize(&row.name, row.availability.as_deref(), row.quality.as_deref());
        let link = row.link().unwrap_or_default();

        let asset = match self.fetcher.fetch(link, folder, &meta.title).await {
            Ok(asset) => asset,
            Err(_) => {
                let title = if meta.title.is_empty() {
                    row.name.trim()
                } else {
                    meta.title.as_str()
                };
                return RowOutcome::Failed {
                    record: failure_record(title, link),
                };
            }
        };

        let path = asset.path;
        if !asset.format.is_taggable() {
            tracing::warn!(path = %path.display(), format = %asset.format, "skipping tag embed");
            self.events.emit(FetchEvent::TagSkipped {
                path: path.display().to_string(),
                format: asset.format,
            });
            return RowOutcome::FetchedUntagged { path };
        }

        match self.embed(path.clone(), meta).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "tags embedded");
                self.events.emit(FetchEvent::Tagged {
                    path: path.display().to_string(),
                });
                RowOutcome::Tagged { path }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "tag embed failed");
                self.events.emit(FetchEvent::TagFailed {
                    path: path.display().to_string(),
                    error: err.to_string(),
                });
                RowOutcome::FetchedUntagged { path }
            }
        }
    }

    async fn embed(&self, path: PathBuf, meta: NormalizedMetadata) -> Result<(), TagError> {
        let tagger = self.tagger.clone();
        tokio::task::spawn_blocking(move || tagger.embed(&path, &meta))
            .await
            .map_err(|err| TagError::Worker(err.to_string()))?
    }
}

fn enter(group: &str, state: GroupState) {
    tracing::debug!(group = %group, state = ?state, "group state");
}

/// `"<title> (url: <link>)"`, the entry stored in the `failed` bucket.
pub fn failure_record(title: &str, link: &str) -> String {
    format!("{title} (url: {link})")
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
