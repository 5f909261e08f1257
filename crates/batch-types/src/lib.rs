use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One manifest entry, already projected onto the resolved column roles.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Row {
    /// Free-text item name (title, artist, annotations).
    pub name: String,
    /// Source link, if the cell was filled in.
    pub link: Option<String>,
    /// Group label (for example an era or release name).
    pub group: Option<String>,
    /// Availability-length marker (`Full`, `Snippet`, ...).
    pub availability: Option<String>,
    /// Quality marker (`Low Quality`, `CD Quality`, ...).
    pub quality: Option<String>,
}

impl Row {
    /// Trimmed source link, `None` when absent or blank.
    pub fn link(&self) -> Option<&str> {
        self.link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }

    /// `true` when the row belongs to the group identified by `key`.
    ///
    /// `key` must already be a [`group_key`].
    pub fn in_group(&self, key: &str) -> bool {
        self.group
            .as_deref()
            .map(|label| group_key(label) == key)
            .unwrap_or(false)
    }

    /// `true` when the row is in `key` and carries a usable link.
    pub fn is_eligible(&self, key: &str) -> bool {
        self.in_group(key) && self.link().is_some()
    }
}

/// Grouping/routing key: trimmed, lower-cased label.
pub fn group_key(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Column names resolved once when the manifest was loaded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnRoles {
    pub group: String,
    pub name: String,
    pub link: String,
    pub length: Option<String>,
    pub quality: Option<String>,
}

/// Display-safe title plus contributor fields extracted from a row name.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedMetadata {
    pub title: String,
    /// Performing artist (left side of `Artist - Title`).
    pub primary_contributor: Option<String>,
    /// Producer taken from a `(prod. X)` annotation.
    pub secondary_contributor: Option<String>,
}

/// Audio container inferred from a response content type.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContainerFormat {
    /// MPEG audio with an ID3v2 tag header; the only format that gets tagged.
    TaggedAudio,
    Wav,
    Mp4Audio,
    Flac,
    Unknown,
}

impl ContainerFormat {
    /// Classify a declared content type.
    ///
    /// Anything not recognised as wav, mp4 or flac is treated as tagged audio.
    pub fn from_content_type(content_type: &str) -> Self {
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("wav") {
            Self::Wav
        } else if lower.contains("m4a") || lower.contains("mp4") {
            Self::Mp4Audio
        } else if lower.contains("flac") {
            Self::Flac
        } else {
            Self::TaggedAudio
        }
    }

    /// Classify a file already on disk by its extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("mp3") => Self::TaggedAudio,
            Some("wav") => Self::Wav,
            Some("m4a") | Some("mp4") => Self::Mp4Audio,
            Some("flac") => Self::Flac,
            _ => Self::Unknown,
        }
    }

    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::TaggedAudio => ".mp3",
            Self::Wav => ".wav",
            Self::Mp4Audio => ".m4a",
            Self::Flac => ".flac",
            Self::Unknown => ".bin",
        }
    }

    pub fn is_taggable(self) -> bool {
        matches!(self, Self::TaggedAudio)
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TaggedAudio => "mp3",
            Self::Wav => "wav",
            Self::Mp4Audio => "m4a",
            Self::Flac => "flac",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Terminal result of processing one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowOutcome {
    /// Fetched and tagged.
    Tagged { path: PathBuf },
    /// Fetched, but the tag header was not written.
    FetchedUntagged { path: PathBuf },
    /// Nothing usable on disk; `record` is `"<title> (url: <link>)"`.
    Failed { record: String },
}

/// Three-bucket outcome record for a group or a whole batch.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeTally {
    pub tagged: Vec<String>,
    pub fetched_untagged: Vec<String>,
    pub failed: Vec<String>,
}

impl OutcomeTally {
    /// Append one row outcome to its bucket.
    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Tagged { path } => self.tagged.push(path.display().to_string()),
            RowOutcome::FetchedUntagged { path } => {
                self.fetched_untagged.push(path.display().to_string())
            }
            RowOutcome::Failed { record } => self.failed.push(record),
        }
    }

    /// Move every entry of `other` into `self`, preserving order.
    pub fn extend(&mut self, other: OutcomeTally) {
        self.tagged.extend(other.tagged);
        self.fetched_untagged.extend(other.fetched_untagged);
        self.failed.extend(other.failed);
    }

    /// Number of rows accounted for across all buckets.
    pub fn total(&self) -> usize {
        self.tagged.len() + self.fetched_untagged.len() + self.failed.len()
    }
}

/// Which groups an operator asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupSelection {
    All,
    One(String),
}

/// Human-readable progress notification emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchEvent {
    GroupStarted { group: String, rows: usize },
    Downloaded { endpoint: String, path: String },
    DownloadFailed { source: String, error: String },
    Tagged { path: String },
    TagFailed { path: String, error: String },
    TagSkipped { path: String, format: ContainerFormat },
    GroupFinished {
        group: String,
        tagged: usize,
        fetched_untagged: usize,
        failed: usize,
    },
}

impl fmt::Display for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupStarted { group, rows } => {
                write!(f, "Found {rows} files to download for group: {group}")
            }
            Self::Downloaded { endpoint, path } => write!(f, "Downloaded: {endpoint} -> {path}"),
            Self::DownloadFailed { source, error } => {
                write!(f, "Failed to download {source}: {error}")
            }
            Self::Tagged { path } => write!(f, "Embedded metadata into {path}"),
            Self::TagFailed { path, error } => {
                write!(f, "[Warning] Tagging failed for {path}: {error}")
            }
            Self::TagSkipped { path, format } => {
                write!(f, "[Warning] Skipping tagging for {format} file: {path}")
            }
            Self::GroupFinished {
                group,
                tagged,
                fetched_untagged,
                failed,
            } => write!(
                f,
                "Finished group {group}: {tagged} tagged, {fetched_untagged} untagged, {failed} failed"
            ),
        }
    }
}
