//! StreamingFetcher: size-bounded download of a resolved media URL.
//!
//! Features:
//! - Early reject on size hint / Content-Length above the cap
//! - Chunked transfer with a running byte count; the cap is checked before
//!   each write so the file on disk never exceeds it
//! - Rejects HTML/JSON bodies served in place of media
//! - Writes to `{uuid}.part`, renames to the hash-derived final name on success
//! - Partial file removed on overflow, transport error, timeout or cancellation

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::core::config::{limits, network, timeouts};
use crate::core::error::AppError;
use crate::core::utils::{format_size, truncate_chars};
use crate::download::error::{cancelled, failure, DownloadFailure, FailureReason};
use crate::download::platform::PlatformKind;
use crate::download::types::{DownloadResult, DownloadedMedia, MediaLocator};
use crate::storage::scratch::ScratchDir;

/// Content types that mean the host answered with a page instead of media.
const NON_MEDIA_CONTENT_TYPES: &[&str] = &["text/html", "text/plain", "application/json", "application/xml"];

pub struct StreamingFetcher {
    client: Client,
    scratch: ScratchDir,
    timeout: Duration,
}

impl StreamingFetcher {
    pub fn new(scratch: ScratchDir, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(network::CHROME_USER_AGENT)
            .connect_timeout(timeouts::connect())
            .build()?;
        Ok(Self::with_client(client, scratch, timeout))
    }

    pub fn with_client(client: Client, scratch: ScratchDir, timeout: Duration) -> Self {
        Self {
            client,
            scratch,
            timeout,
        }
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Streams `locator` into the scratch directory under the name derived
    /// from `source_url`.
    pub async fn fetch(
        &self,
        locator: &MediaLocator,
        source_url: &str,
        platform: PlatformKind,
        size_limit: u64,
        cancel: &CancellationToken,
    ) -> DownloadResult {
        if let Some(hint) = locator.byte_size_hint {
            if hint > size_limit {
                log::warn!(
                    "📦 Size hint {} exceeds limit {}, not fetching",
                    format_size(hint),
                    format_size(size_limit)
                );
                return Err(too_large(hint, size_limit).with_platform(platform));
            }
        }

        self.scratch
            .ensure()
            .await
            .map_err(|e| failure(FailureReason::Transient, format!("scratch dir: {}", e)).with_platform(platform))?;

        let partial = self.scratch.partial();
        let part_path = partial.path().to_path_buf();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(cancelled()),
            res = tokio::time::timeout(self.timeout, self.transfer(locator, part_path, size_limit)) => match res {
                Ok(inner) => inner,
                Err(_) => Err(failure(
                    FailureReason::Timeout,
                    format!("transfer exceeded {}s", self.timeout.as_secs()),
                )),
            },
        };

        let file_size = match outcome {
            Ok(bytes) => bytes,
            Err(f) => {
                partial.discard().await;
                log::warn!("❌ Fetch failed for {}: {}", platform, f);
                return Err(f.with_platform(platform));
            }
        };

        let target = self.scratch.final_path(source_url);
        if let Err(e) = partial.commit(&target).await {
            return Err(failure(FailureReason::Transient, format!("rename failed: {}", e)).with_platform(platform));
        }

        log::info!("✅ Fetched {} into {:?}", format_size(file_size), target);

        Ok(DownloadedMedia {
            local_file_path: target,
            title: display_title(&locator.display_title, platform),
            uploader: truncate_chars(locator.uploader_name.trim(), limits::UPLOADER_MAX_CHARS),
            platform,
            file_size,
        })
    }

    async fn transfer(&self, locator: &MediaLocator, path: PathBuf, size_limit: u64) -> Result<u64, DownloadFailure> {
        let mut req = self.client.get(&locator.direct_media_url);
        for (name, value) in &locator.http_headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req.send().await.map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_failure(status));
        }

        if let Some(len) = response.content_length() {
            if len > size_limit {
                return Err(too_large(len, size_limit));
            }
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if is_non_media(content_type) {
                return Err(failure(
                    FailureReason::Transient,
                    format!("not a media payload ({})", content_type),
                ));
            }
        }

        let mut file = tokio::fs::File::create(&path).await.map_err(io_failure)?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(transport_failure)?;

            let next = written + chunk.len() as u64;
            if next > size_limit {
                return Err(too_large(next, size_limit));
            }

            file.write_all(&chunk).await.map_err(io_failure)?;
            written = next;
        }

        file.flush().await.map_err(io_failure)?;
        file.sync_all().await.map_err(io_failure)?;

        if written == 0 {
            return Err(failure(FailureReason::Transient, "empty response body"));
        }

        Ok(written)
    }
}

/// Bounded title with a per-platform fallback for empty ones.
pub fn display_title(raw: &str, platform: PlatformKind) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        platform.fallback_title().to_string()
    } else {
        truncate_chars(trimmed, limits::TITLE_MAX_CHARS)
    }
}

fn is_non_media(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    NON_MEDIA_CONTENT_TYPES.iter().any(|t| lower.starts_with(t))
}

fn too_large(bytes: u64, limit: u64) -> DownloadFailure {
    failure(
        FailureReason::FileTooLarge,
        format!("{} > {}", format_size(bytes), format_size(limit)),
    )
}

fn status_failure(status: StatusCode) -> DownloadFailure {
    let reason = match status {
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE => FailureReason::PrivateOrUnavailable,
        _ => FailureReason::Transient,
    };
    failure(reason, format!("media host returned {}", status))
}

fn transport_failure(err: reqwest::Error) -> DownloadFailure {
    let reason = if err.is_timeout() {
        FailureReason::Timeout
    } else {
        FailureReason::Transient
    };
    failure(reason, err.to_string())
}

fn io_failure(err: std::io::Error) -> DownloadFailure {
    failure(FailureReason::Transient, format!("write failed: {}", err))
}
