//! Data passed between the engine, the providers and the fetcher.

use std::path::{Path, PathBuf};

use crate::core::utils::extract_url;
use crate::download::error::DownloadFailure;
use crate::download::platform::{classify, PlatformKind};

/// Telegram user id of the requester.
pub type UserId = i64;

/// Opaque reference to a Netscape cookie export on disk.
///
/// Only the path travels through the system. Contents are read by the
/// extractor process itself and never logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHandle(PathBuf);

impl CredentialHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// A single link to resolve. Immutable once built.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub source_url: String,
    pub platform: PlatformKind,
    pub owner: Option<UserId>,
    pub credential: Option<CredentialHandle>,
}

impl DownloadRequest {
    /// Builds a request for `url`, classifying it on the way in.
    pub fn new(url: impl Into<String>, owner: Option<UserId>) -> Self {
        let source_url = url.into();
        let platform = classify(&source_url);
        Self {
            source_url,
            platform,
            owner,
            credential: None,
        }
    }

    /// Picks the first http(s) link out of inbound message text.
    pub fn from_text(text: &str, owner: Option<UserId>) -> Option<Self> {
        extract_url(text).map(|url| Self::new(url, owner))
    }

    pub fn with_credential(mut self, credential: CredentialHandle) -> Self {
        self.credential = Some(credential);
        self
    }
}

/// Log-only record of one provider attempt.
#[derive(Debug, Clone, Copy)]
pub struct ProviderAttempt {
    pub provider_id: &'static str,
    pub ordinal: usize,
}

/// What a provider hands back on success: where the media lives plus
/// minimal display metadata.
#[derive(Debug, Clone, Default)]
pub struct MediaLocator {
    pub direct_media_url: String,
    pub display_title: String,
    pub uploader_name: String,
    pub byte_size_hint: Option<u64>,
    /// Headers the media host expects on the GET (from the extractor).
    pub http_headers: Vec<(String, String)>,
}

impl MediaLocator {
    pub fn new(direct_media_url: impl Into<String>) -> Self {
        Self {
            direct_media_url: direct_media_url.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.display_title = title.into();
        self
    }

    pub fn uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader_name = uploader.into();
        self
    }

    pub fn size_hint(mut self, bytes: Option<u64>) -> Self {
        self.byte_size_hint = bytes;
        self
    }
}

/// A completed download. The caller owns `local_file_path` and must release
/// it through [`crate::storage::scratch::ScratchDir::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMedia {
    pub local_file_path: PathBuf,
    pub title: String,
    pub uploader: String,
    pub platform: PlatformKind,
    pub file_size: u64,
}

/// Outcome of one resolution pass.
pub type DownloadResult = Result<DownloadedMedia, DownloadFailure>;
