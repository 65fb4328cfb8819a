//! YtDlpProvider: the generic extractor, last in every platform chain.
//!
//! Runs yt-dlp in metadata mode with the platform's extractor profile and
//! turns the selected format into a `MediaLocator`. Stderr is classified so
//! that definite answers (private video, rejected cookies) stop the chain
//! instead of being reported as exhaustion.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::process::Command;

use crate::core::error::AppError;
use crate::core::process::run_with_timeout;
use crate::download::error::failure;
use crate::download::platform::PlatformKind;
use crate::download::source::{MediaProvider, ProviderOutcome, ProviderTuning};
use crate::download::types::{DownloadRequest, MediaLocator};
use crate::download::ytdlp::ExtractorProfile;
use crate::download::ytdlp_errors::{analyze_ytdlp_error, summarize_stderr, terminal_reason};

/// Subset of `--dump-single-json` output we rely on.
#[derive(Debug, Default, Deserialize)]
struct YtDlpInfo {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    filesize: Option<u64>,
    #[serde(default)]
    filesize_approx: Option<u64>,
    #[serde(default)]
    http_headers: HashMap<String, String>,
    #[serde(default)]
    is_live: Option<bool>,
}

/// Extractor-backed provider bound to one platform's profile.
pub struct YtDlpProvider {
    ytdl_bin: String,
    timeout: Duration,
    tuning: ProviderTuning,
}

impl YtDlpProvider {
    pub fn new(platform: PlatformKind, ytdl_bin: String, timeout: Duration) -> Self {
        Self {
            ytdl_bin,
            timeout,
            tuning: ProviderTuning::extractor(ExtractorProfile::for_platform(platform)),
        }
    }

    fn profile(&self) -> Option<&ExtractorProfile> {
        self.tuning.impersonation.as_ref()
    }
}

/// Turns extractor JSON into a locator. `None` when there is nothing to stream.
fn parse_info(stdout: &[u8]) -> Result<Option<MediaLocator>, serde_json::Error> {
    let info: YtDlpInfo = serde_json::from_slice(stdout)?;

    if info.is_live == Some(true) {
        return Ok(None);
    }

    Ok(info.url.filter(|u| !u.is_empty()).map(|url| {
        let mut headers: Vec<(String, String)> = info.http_headers.into_iter().collect();
        headers.sort();
        MediaLocator {
            direct_media_url: url,
            display_title: info.title.unwrap_or_default(),
            uploader_name: info.uploader.or(info.channel).unwrap_or_default(),
            byte_size_hint: info.filesize.or(info.filesize_approx).filter(|s| *s > 0),
            http_headers: headers,
        }
    }))
}

#[async_trait]
impl MediaProvider for YtDlpProvider {
    fn id(&self) -> &'static str {
        "ytdlp"
    }

    fn tuning(&self) -> &ProviderTuning {
        &self.tuning
    }

    async fn attempt(&self, request: &DownloadRequest) -> ProviderOutcome {
        let Some(profile) = self.profile() else {
            return ProviderOutcome::no_match("extractor profile missing");
        };

        let cookies = request.credential.as_ref().map(|c| c.path());
        let args = profile.build_args(&request.source_url, cookies);

        log::info!(
            "🔧 yt-dlp [{}] resolving {} (cookies: {})",
            profile.platform,
            request.source_url,
            if cookies.is_some() && profile.accepts_credentials { "yes" } else { "no" }
        );

        let mut cmd = Command::new(&self.ytdl_bin);
        cmd.args(&args);

        let output = match run_with_timeout(&mut cmd, self.timeout).await {
            Ok(output) => output,
            Err(AppError::Timeout(_)) => return ProviderOutcome::no_match("yt-dlp timed out"),
            Err(e) => return ProviderOutcome::no_match(format!("yt-dlp could not run: {}", e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let error_type = analyze_ytdlp_error(&stderr);
            let summary = summarize_stderr(&stderr);
            log::warn!("❌ yt-dlp failed ({:?}): {}", error_type, summary);

            return match terminal_reason(error_type, profile.platform) {
                Some(reason) => ProviderOutcome::Failed(failure(reason, summary)),
                None => ProviderOutcome::NoMatch(summary),
            };
        }

        match parse_info(&output.stdout) {
            Ok(Some(locator)) => ProviderOutcome::Located(locator),
            Ok(None) => ProviderOutcome::no_match("yt-dlp selected no streamable format"),
            Err(e) => ProviderOutcome::no_match(format!("yt-dlp output not understood: {}", e)),
        }
    }
}
