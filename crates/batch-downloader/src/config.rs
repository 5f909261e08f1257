//! Optional TOML settings for a batch run.
//!
//! Every key has a default; command-line flags override what is loaded here.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";
pub const DEFAULT_COMMENT: &str = "t.me/vqvlt";
pub const DEFAULT_MAX_GROUP_CONCURRENCY: usize = 8;
pub const DEFAULT_PILLOWCASE_ENDPOINT: &str = "https://api.pillowcase.su/api/download/{id}.mp3";
pub const DEFAULT_FROSTE_ENDPOINT: &str = "https://music.froste.lol/song/{id}/download";

/// Raw file contents; accessors apply defaults and validation.
#[derive(Debug, Default, Deserialize)]
pub struct DownloaderConfig {
    /// Root directory; each group gets a sub-folder.
    pub download_dir: Option<String>,
    /// Parallel item fetches inside one group (1-10).
    pub concurrency: Option<u8>,
    /// Upper bound on groups processed at once.
    pub max_group_concurrency: Option<usize>,
    /// Comment frame written into tagged files.
    pub comment: Option<String>,
    /// User-Agent for outgoing requests.
    pub user_agent: Option<String>,
    /// Provider endpoint overrides.
    pub providers: Option<ProviderConfig>,
}

/// Endpoint templates; `{id}` is replaced by the extracted item id.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderConfig {
    pub pillowcase_endpoint: Option<String>,
    pub froste_endpoint: Option<String>,
}

/// Resolved endpoint templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub pillowcase: String,
    pub froste: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            pillowcase: DEFAULT_PILLOWCASE_ENDPOINT.to_string(),
            froste: DEFAULT_FROSTE_ENDPOINT.to_string(),
        }
    }
}

impl DownloaderConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str::<DownloaderConfig>(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(
            self.download_dir
                .as_deref()
                .map(str::trim)
                .filter(|dir| !dir.is_empty())
                .unwrap_or(DEFAULT_DOWNLOAD_DIR),
        )
    }

    /// Configured item concurrency, validated; `None` when unset.
    pub fn concurrency(&self) -> Result<Option<Concurrency>, ConfigError> {
        self.concurrency.map(Concurrency::new).transpose()
    }

    pub fn max_group_concurrency(&self) -> usize {
        self.max_group_concurrency
            .filter(|cap| *cap > 0)
            .unwrap_or(DEFAULT_MAX_GROUP_CONCURRENCY)
    }

    pub fn comment(&self) -> String {
        self.comment
            .clone()
            .unwrap_or_else(|| DEFAULT_COMMENT.to_string())
    }

    pub fn endpoints(&self) -> Result<ProviderEndpoints, ConfigError> {
        let defaults = ProviderEndpoints::default();
        let Some(providers) = self.providers.as_ref() else {
            return Ok(defaults);
        };
        let pillowcase = checked_template(providers.pillowcase_endpoint.as_deref())?
            .unwrap_or(defaults.pillowcase);
        let froste =
            checked_template(providers.froste_endpoint.as_deref())?.unwrap_or(defaults.froste);
        Ok(ProviderEndpoints { pillowcase, froste })
    }
}

fn checked_template(template: Option<&str>) -> Result<Option<String>, ConfigError> {
    let Some(template) = template.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if !template.contains("{id}") {
        return Err(ConfigError::EndpointTemplate(template.to_string()));
    }
    Ok(Some(template.to_string()))
}

/// Parallel item fetches per group, always within 1-10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concurrency(u8);

impl Concurrency {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::Concurrency(value.to_string()))
        }
    }

    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self(4)
    }
}

impl FromStr for Concurrency {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u8>()
            .map_err(|_| ConfigError::Concurrency(s.trim().to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
