//! TikWmProvider: TikTok resolution through the public TikWM API.
//!
//! `POST {endpoint}` with form `url=<link>&hd=1`. A `code == 0` response
//! carries `data.hdplay` / `data.play` (absolute or host-relative), the
//! caption and `author.nickname`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::download::source::{MediaProvider, ProviderOutcome, ProviderTuning};
use crate::download::types::{DownloadRequest, MediaLocator};

pub const TIKWM_ENDPOINT: &str = "https://www.tikwm.com/api/";

#[derive(Debug, Deserialize)]
struct TikWmResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<TikWmData>,
}

#[derive(Debug, Default, Deserialize)]
struct TikWmData {
    #[serde(default)]
    hdplay: Option<String>,
    #[serde(default)]
    play: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    hd_size: Option<u64>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    author: Option<TikWmAuthor>,
}

#[derive(Debug, Default, Deserialize)]
struct TikWmAuthor {
    #[serde(default)]
    nickname: Option<String>,
}

pub struct TikWmProvider {
    client: Client,
    endpoint: String,
    tuning: ProviderTuning,
}

impl TikWmProvider {
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, TIKWM_ENDPOINT)
    }

    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            tuning: ProviderTuning::http(vec![("Accept", "application/json")]),
        }
    }

    /// Picks the HD stream when present, resolving host-relative paths
    /// against the API origin.
    fn locate(&self, data: TikWmData) -> Option<MediaLocator> {
        let (raw, size) = match non_empty(data.hdplay) {
            Some(hd) => (hd, data.hd_size),
            None => (non_empty(data.play)?, data.size),
        };

        let media_url = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw
        } else {
            Url::parse(&self.endpoint).ok()?.join(&raw).ok()?.to_string()
        };

        Some(
            MediaLocator::new(media_url)
                .title(data.title.unwrap_or_default())
                .uploader(data.author.and_then(|a| a.nickname).unwrap_or_default())
                .size_hint(size.filter(|s| *s > 0)),
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl MediaProvider for TikWmProvider {
    fn id(&self) -> &'static str {
        "tikwm"
    }

    fn tuning(&self) -> &ProviderTuning {
        &self.tuning
    }

    async fn attempt(&self, request: &DownloadRequest) -> ProviderOutcome {
        let form = [("url", request.source_url.as_str()), ("hd", "1")];
        let req = self.tuning.apply(self.client.post(&self.endpoint)).form(&form);

        let response = match req.send().await {
            Ok(r) => r,
            Err(e) => return ProviderOutcome::no_match(format!("tikwm request failed: {}", e)),
        };

        if !response.status().is_success() {
            return ProviderOutcome::no_match(format!("tikwm returned {}", response.status()));
        }

        let body: TikWmResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => return ProviderOutcome::no_match(format!("tikwm response not understood: {}", e)),
        };

        if body.code != 0 {
            return ProviderOutcome::no_match(format!(
                "tikwm code {}: {}",
                body.code,
                body.msg.unwrap_or_default()
            ));
        }

        match body.data.and_then(|d| self.locate(d)) {
            Some(locator) => {
                log::info!("🎵 TikWM resolved {}", request.source_url);
                ProviderOutcome::Located(locator)
            }
            None => ProviderOutcome::no_match("tikwm returned no playable url"),
        }
    }
}
