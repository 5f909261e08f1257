//! Streams a resolved asset to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use batch_types::{ContainerFormat, FetchEvent};
use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::FetchError;
use crate::events::EventBus;
use crate::resolver::{AssetResolver, ResolvedAsset};
use crate::sanitize::sanitize_file_name;
use crate::transport::Transport;

/// A file written to the group folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub path: PathBuf,
    pub format: ContainerFormat,
}

#[derive(Clone)]
pub struct AssetFetcher {
    resolver: AssetResolver,
    transport: Arc<dyn Transport>,
    events: EventBus,
}

impl AssetFetcher {
    pub fn new(resolver: AssetResolver, transport: Arc<dyn Transport>, events: EventBus) -> Self {
        Self {
            resolver,
            transport,
            events,
        }
    }

    /// Resolve `url`, download it into `dest_dir` and report progress.
    ///
    /// A failed transfer may leave a partial file behind.
    pub async fn fetch(
        &self,
        url: &str,
        dest_dir: &Path,
        title: &str,
    ) -> Result<FetchedAsset, FetchError> {
        let resolved = match self.resolver.resolve(url) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.report_failure(url, &err.to_string());
                return Err(err.into());
            }
        };

        match self.download(&resolved, dest_dir, title).await {
            Ok(asset) => {
                tracing::info!(
                    endpoint = %resolved.endpoint,
                    path = %asset.path.display(),
                    format = %asset.format,
                    "downloaded"
                );
                self.events.emit(FetchEvent::Downloaded {
                    endpoint: resolved.endpoint.clone(),
                    path: asset.path.display().to_string(),
                });
                Ok(asset)
            }
            Err(err) => {
                self.report_failure(&resolved.endpoint, &err.to_string());
                Err(err)
            }
        }
    }

    async fn download(
        &self,
        resolved: &ResolvedAsset,
        dest_dir: &Path,
        title: &str,
    ) -> Result<FetchedAsset, FetchError> {
        let endpoint = resolved.endpoint.as_str();
        let resp = self.transport.get(endpoint).await?;
        if !resp.is_success() {
            return Err(FetchError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: resp.status,
            });
        }

        let format = ContainerFormat::from_content_type(resp.content_type.as_deref().unwrap_or(""));
        let stem = file_stem(title, &resolved.fallback_id);
        let path = dest_dir.join(format!("{stem}{}", format.extension()));

        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| FetchError::transport(endpoint, e))?;
        let mut writer = BufWriter::new(file);
        let mut body = resp.body;
        while let Some(chunk) = body.next().await {
            writer
                .write_all(&chunk?)
                .await
                .map_err(|e| FetchError::transport(endpoint, e))?;
        }
        writer
            .flush()
            .await
            .map_err(|e| FetchError::transport(endpoint, e))?;

        Ok(FetchedAsset { path, format })
    }

    fn report_failure(&self, source: &str, error: &str) {
        tracing::warn!(source = %source, error = %error, "download failed");
        self.events.emit(FetchEvent::DownloadFailed {
            source: source.to_string(),
            error: error.to_string(),
        });
    }
}

/// Sanitized title, or the provider id when the title sanitizes to nothing.
fn file_stem(title: &str, fallback_id: &str) -> String {
    let stem = sanitize_file_name(title);
    if stem.is_empty() {
        fallback_id.to_string()
    } else {
        stem
    }
}
