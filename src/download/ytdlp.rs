//! yt-dlp invocation policy.
//!
//! yt-dlp itself is an external tool. This module owns how we call it:
//! which client to impersonate per platform, retries, format selection and
//! how the cookie jar is attached. The extractor is asked for JSON only
//! (`--dump-single-json`); the bytes are fetched by our own streaming fetcher
//! so the size cap applies uniformly.

use std::path::Path;
use tokio::process::Command;

use crate::core::config::{network, timeouts};
use crate::core::error::AppError;
use crate::core::process::run_with_timeout;
use crate::download::platform::PlatformKind;

/// Single-file selectors only: a merged `a+b` selection has no top-level
/// `url` to stream from.
const FORMAT_720P_MP4: &str = "best[height<=720][ext=mp4]/best[height<=720]/best";

/// Per-platform extractor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorProfile {
    pub platform: PlatformKind,
    pub format: &'static str,
    /// YouTube `player_client` list, tried in order by yt-dlp
    pub player_clients: &'static [&'static str],
    pub retries: u32,
    pub user_agent: &'static str,
    pub accepts_credentials: bool,
}

impl ExtractorProfile {
    pub fn for_platform(platform: PlatformKind) -> Self {
        match platform {
            PlatformKind::YouTube => Self {
                platform,
                format: FORMAT_720P_MP4,
                player_clients: &["tv", "web"],
                retries: 3,
                user_agent: network::CHROME_USER_AGENT,
                accepts_credentials: true,
            },
            _ => Self {
                platform,
                format: FORMAT_720P_MP4,
                player_clients: &[],
                retries: 3,
                user_agent: network::CHROME_USER_AGENT,
                accepts_credentials: false,
            },
        }
    }

    /// Arguments for a metadata-only run against `url`.
    ///
    /// The cookie jar is passed by path. It is ignored for platforms whose
    /// profile does not accept credentials.
    pub fn build_args(&self, url: &str, cookies: Option<&Path>) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--dump-single-json".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--no-check-certificate".into(),
            "--retries".into(),
            self.retries.to_string(),
            "--socket-timeout".into(),
            timeouts::CONNECT_TIMEOUT_SECS.to_string(),
            "-f".into(),
            self.format.into(),
            "--user-agent".into(),
            self.user_agent.into(),
        ];

        if !self.player_clients.is_empty() {
            args.push("--extractor-args".into());
            args.push(format!("youtube:player_client={}", self.player_clients.join(",")));
        }

        if self.accepts_credentials {
            if let Some(path) = cookies {
                args.push("--cookies".into());
                args.push(path.to_string_lossy().into_owned());
            }
        }

        args.push("--".into());
        args.push(url.into());
        args
    }
}

/// Returns the installed yt-dlp version.
pub async fn check_ytdlp_version(ytdl_bin: &str) -> Result<String, AppError> {
    log::info!("Checking yt-dlp version...");

    let mut cmd = Command::new(ytdl_bin);
    cmd.arg("--version");
    let output = run_with_timeout(&mut cmd, timeouts::ytdlp_version()).await?;

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || version.is_empty() {
        return Err(AppError::Download(
            "yt-dlp is not installed or --version produced no output".to_string(),
        ));
    }

    log::info!("yt-dlp version: {}", version);
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_youtube_profile_uses_tv_client_and_cookies() {
        let profile = ExtractorProfile::for_platform(PlatformKind::YouTube);
        let args = profile.build_args("https://youtu.be/abc", Some(Path::new("/data/cookies/42.txt")));

        assert_eq!(value_after(&args, "--extractor-args"), Some("youtube:player_client=tv,web"));
        assert_eq!(value_after(&args, "--cookies"), Some("/data/cookies/42.txt"));
        assert_eq!(value_after(&args, "--retries"), Some("3"));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[test]
    fn test_tiktok_profile_ignores_cookies() {
        let profile = ExtractorProfile::for_platform(PlatformKind::TikTok);
        let args = profile.build_args("https://vm.tiktok.com/x", Some(Path::new("/c.txt")));

        assert!(!args.iter().any(|a| a == "--cookies"));
        assert!(!args.iter().any(|a| a == "--extractor-args"));
        assert_eq!(value_after(&args, "-f"), Some(FORMAT_720P_MP4));
    }

    #[test]
    fn test_formats_are_single_file() {
        for platform in [PlatformKind::YouTube, PlatformKind::TikTok, PlatformKind::Instagram] {
            assert!(!ExtractorProfile::for_platform(platform).format.contains('+'));
        }
    }

    #[test]
    fn test_url_follows_separator() {
        let profile = ExtractorProfile::for_platform(PlatformKind::Instagram);
        let args = profile.build_args("-not-an-option", None);
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[sep + 1], "-not-an-option");
    }
}
