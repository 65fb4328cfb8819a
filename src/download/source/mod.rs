//! Provider abstraction layer for link resolution.
//!
//! Provides the `MediaProvider` trait for pluggable resolution methods and a
//! `ProviderRegistry` holding an ordered chain per platform. New providers are
//! added by implementing `MediaProvider` and registering them for a platform.
//!
//! Built-in providers:
//! - `TikWmProvider`: TikTok via the TikWM API
//! - `RapidApiProvider`, `EmbedScrapeProvider`, `IgramProvider`, `SaveIgProvider`: Instagram
//! - `YtDlpProvider`: the generic extractor, always last in every chain

pub mod instagram;
pub mod tikwm;
pub mod ytdlp;

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::{network, timeouts, Config};
use crate::core::error::AppError;
use crate::download::error::DownloadFailure;
use crate::download::platform::PlatformKind;
use crate::download::types::{DownloadRequest, MediaLocator};
use crate::download::ytdlp::ExtractorProfile;

/// Result of a single provider attempt.
#[derive(Debug)]
pub enum ProviderOutcome {
    /// Provider found the media; the chain commits to this locator.
    Located(MediaLocator),
    /// Provider could not resolve the link; the next provider is tried.
    NoMatch(String),
    /// Provider got a definite answer that no other provider can change
    /// (private video, rejected cookies). Ends the chain.
    Failed(DownloadFailure),
}

impl ProviderOutcome {
    pub fn no_match(diagnostic: impl Into<String>) -> Self {
        ProviderOutcome::NoMatch(diagnostic.into())
    }
}

/// Static per-provider settings: how the provider presents itself upstream.
#[derive(Debug, Clone)]
pub struct ProviderTuning {
    pub user_agent: &'static str,
    pub headers: Vec<(&'static str, &'static str)>,
    /// Client-impersonation profile, for extractor-backed providers
    pub impersonation: Option<ExtractorProfile>,
    pub accepts_credentials: bool,
}

impl ProviderTuning {
    pub fn http(headers: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            user_agent: network::CHROME_USER_AGENT,
            headers,
            impersonation: None,
            accepts_credentials: false,
        }
    }

    pub fn extractor(profile: ExtractorProfile) -> Self {
        Self {
            user_agent: profile.user_agent,
            headers: Vec::new(),
            accepts_credentials: profile.accepts_credentials,
            impersonation: Some(profile),
        }
    }

    /// Applies the static headers to an outgoing request.
    pub fn apply(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder = builder.header(reqwest::header::USER_AGENT, self.user_agent);
        for (name, value) in &self.headers {
            builder = builder.header(*name, *value);
        }
        builder
    }
}

/// One way of turning a page link into a direct media URL.
///
/// Implementations never panic on bad upstream data and never return a raw
/// upstream payload as a diagnostic.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Stable identifier used in logs (e.g. "tikwm", "ytdlp")
    fn id(&self) -> &'static str;

    fn tuning(&self) -> &ProviderTuning;

    async fn attempt(&self, request: &DownloadRequest) -> ProviderOutcome;
}

/// Ordered provider chains keyed by platform. Read-only once built.
#[derive(Default)]
pub struct ProviderRegistry {
    chains: HashMap<PlatformKind, Vec<Arc<dyn MediaProvider>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to a platform's chain. Providers are tried in
    /// insertion order. Registrations for `Unknown` are ignored.
    pub fn register(&mut self, platform: PlatformKind, provider: Arc<dyn MediaProvider>) -> &mut Self {
        if platform.is_supported() {
            self.chains.entry(platform).or_default().push(provider);
        } else {
            log::warn!("Ignoring provider {} registered for unknown platform", provider.id());
        }
        self
    }

    /// Providers to try for `platform`, in order. Empty for `Unknown`.
    pub fn providers_for(&self, platform: PlatformKind) -> &[Arc<dyn MediaProvider>] {
        self.chains.get(&platform).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Create the default registry from runtime configuration.
    ///
    /// - TikTok: tikwm → ytdlp
    /// - Instagram: rapidapi (when RAPIDAPI_KEY is set) → embed → igram → saveig → ytdlp
    /// - YouTube: ytdlp
    pub fn default_registry(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.provider_timeout)
            .connect_timeout(timeouts::connect())
            .build()?;

        let mut registry = Self::new();

        registry.register(PlatformKind::TikTok, Arc::new(tikwm::TikWmProvider::new(client.clone())));

        if let Some(key) = &config.rapidapi_key {
            registry.register(
                PlatformKind::Instagram,
                Arc::new(instagram::RapidApiProvider::new(client.clone(), key.clone())),
            );
        }
        registry
            .register(
                PlatformKind::Instagram,
                Arc::new(instagram::EmbedScrapeProvider::new(client.clone())),
            )
            .register(PlatformKind::Instagram, Arc::new(instagram::IgramProvider::new(client.clone())))
            .register(PlatformKind::Instagram, Arc::new(instagram::SaveIgProvider::new(client)));

        for platform in [PlatformKind::TikTok, PlatformKind::Instagram, PlatformKind::YouTube] {
            registry.register(
                platform,
                Arc::new(ytdlp::YtDlpProvider::new(
                    platform,
                    config.ytdl_bin.clone(),
                    config.provider_timeout,
                )),
            );
        }

        Ok(registry)
    }

    /// Chain summary for startup logs, e.g. `tiktok: tikwm → ytdlp`.
    pub fn describe(&self) -> Vec<String> {
        [PlatformKind::YouTube, PlatformKind::TikTok, PlatformKind::Instagram]
            .iter()
            .map(|p| {
                let ids: Vec<&str> = self.providers_for(*p).iter().map(|pr| pr.id()).collect();
                format!("{}: {}", p, ids.join(" → "))
            })
            .collect()
    }
}
