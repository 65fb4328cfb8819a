//! ResolutionEngine: drives one request through its platform's provider chain.
//!
//! Order of a pass:
//! 1. Unknown platform → `UnsupportedPlatform`, no provider is called
//! 2. YouTube without any cookie jar → `CredentialsRequired`, no provider is called
//! 3. Providers are tried in registry order, each under its own timeout
//! 4. The first `Located` commits the pass: its locator is fetched and the
//!    fetch outcome is final, later providers are never consulted
//! 5. `NoMatch` (or a provider timeout) moves on to the next provider
//! 6. `Failed` ends the pass with that failure
//! 7. Nothing matched → `AllProvidersExhausted`

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::core::config::Config;
use crate::core::error::AppError;
use crate::download::error::{cancelled, failure, DownloadFailure, FailureReason};
use crate::download::fetch::StreamingFetcher;
use crate::download::platform::PlatformKind;
use crate::download::source::{ProviderOutcome, ProviderRegistry};
use crate::download::types::{CredentialHandle, DownloadRequest, DownloadResult, ProviderAttempt};
use crate::storage::cookies::{CredentialStore, FileCredentialStore};
use crate::storage::scratch::ScratchDir;

pub struct ResolutionEngine {
    registry: Arc<ProviderRegistry>,
    fetcher: StreamingFetcher,
    credentials: Arc<dyn CredentialStore>,
    default_credential: Option<CredentialHandle>,
    max_file_size: u64,
    provider_timeout: Duration,
}

impl ResolutionEngine {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        fetcher: StreamingFetcher,
        credentials: Arc<dyn CredentialStore>,
        max_file_size: u64,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            fetcher,
            credentials,
            default_credential: None,
            max_file_size,
            provider_timeout,
        }
    }

    /// Operator-level cookie jar used for YouTube when the user has none.
    pub fn with_default_credential(mut self, credential: Option<CredentialHandle>) -> Self {
        self.default_credential = credential;
        self
    }

    /// Production wiring: default registry, file-backed credential store and
    /// a fetcher rooted at the configured scratch directory.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let registry = ProviderRegistry::default_registry(config)?;
        for line in registry.describe() {
            log::info!("🔗 Provider chain {}", line);
        }

        let fetcher = StreamingFetcher::new(ScratchDir::new(&config.scratch_dir), config.fetch_timeout)?;
        let credentials = Arc::new(FileCredentialStore::new(&config.cookies_dir));

        Ok(Self::new(
            Arc::new(registry),
            fetcher,
            credentials,
            config.max_file_size,
            config.provider_timeout,
        )
        .with_default_credential(config.default_cookies_file.clone().map(CredentialHandle::new)))
    }

    pub fn scratch(&self) -> &ScratchDir {
        self.fetcher.scratch()
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Runs one resolution pass. Every path ends in exactly one outcome;
    /// no partial file survives a failure.
    pub async fn resolve(&self, request: &DownloadRequest, cancel: &CancellationToken) -> DownloadResult {
        let platform = request.platform;

        if !platform.is_supported() {
            log::info!("🚫 Unsupported link: {}", request.source_url);
            return Err(failure(FailureReason::UnsupportedPlatform, "no platform matched"));
        }

        let request = self.prepare(request).await?;
        let providers = self.registry.providers_for(platform);
        let mut last_diagnostic = String::from("no providers registered");

        for (index, provider) in providers.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(cancelled().with_platform(platform));
            }

            let attempt = ProviderAttempt {
                provider_id: provider.id(),
                ordinal: index + 1,
            };
            log::debug!("➡️  {} attempt #{} via {}", platform, attempt.ordinal, attempt.provider_id);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled().with_platform(platform)),
                res = tokio::time::timeout(self.provider_timeout, provider.attempt(&request)) => match res {
                    Ok(outcome) => outcome,
                    Err(_) => ProviderOutcome::no_match(format!(
                        "timed out after {}s",
                        self.provider_timeout.as_secs()
                    )),
                },
            };

            match outcome {
                ProviderOutcome::Located(locator) => {
                    log::info!(
                        "✅ {} resolved {} on attempt #{}",
                        attempt.provider_id,
                        request.source_url,
                        attempt.ordinal
                    );
                    return self
                        .fetcher
                        .fetch(&locator, &request.source_url, platform, self.max_file_size, cancel)
                        .await;
                }
                ProviderOutcome::NoMatch(diagnostic) => {
                    log::warn!(
                        "↪️  {} attempt #{} ({}) no match: {}",
                        platform,
                        attempt.ordinal,
                        attempt.provider_id,
                        diagnostic
                    );
                    last_diagnostic = format!("{}: {}", attempt.provider_id, diagnostic);
                }
                ProviderOutcome::Failed(err) => {
                    log::warn!("❌ {} stopped the chain: {}", attempt.provider_id, err);
                    return Err(err.with_platform(platform));
                }
            }
        }

        Err(failure(
            FailureReason::AllProvidersExhausted,
            format!("{} provider(s) tried; last {}", providers.len(), last_diagnostic),
        )
        .with_platform(platform))
    }

    /// Attaches the cookie jar a YouTube request needs and strips it from
    /// every other platform.
    async fn prepare(&self, request: &DownloadRequest) -> Result<DownloadRequest, DownloadFailure> {
        let mut prepared = request.clone();

        if request.platform != PlatformKind::YouTube {
            prepared.credential = None;
            return Ok(prepared);
        }

        match self.credential_for(request).await {
            Some(handle) => {
                prepared.credential = Some(handle);
                Ok(prepared)
            }
            None => {
                log::info!("🔑 YouTube link without cookies (user {:?})", request.owner);
                Err(DownloadFailure::new(FailureReason::CredentialsRequired).with_platform(PlatformKind::YouTube))
            }
        }
    }

    /// Request handle, then the owner's stored jar, then the operator default.
    async fn credential_for(&self, request: &DownloadRequest) -> Option<CredentialHandle> {
        if let Some(handle) = &request.credential {
            return Some(handle.clone());
        }

        if let Some(owner) = request.owner {
            if let Some(record) = self.credentials.get(owner).await {
                return Some(record.handle());
            }
        }

        match &self.default_credential {
            Some(handle) if tokio::fs::metadata(handle.path()).await.is_ok() => Some(handle.clone()),
            _ => None,
        }
    }
}
