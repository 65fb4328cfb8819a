use std::fmt;

use crate::core::config::limits::DIAGNOSTIC_MAX_CHARS;
use crate::core::utils::truncate_chars;
use crate::download::platform::PlatformKind;

/// Closed set of reasons a resolution can fail.
///
/// Callers branch on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// Link did not match any supported platform
    UnsupportedPlatform,
    /// YouTube link with no usable cookie jar
    CredentialsRequired,
    /// Cookie jar present but rejected by the platform
    CredentialsExpiredOrInvalid,
    /// Content is private, removed or region-blocked
    PrivateOrUnavailable,
    /// Media exceeds the configured maximum
    FileTooLarge,
    /// Every provider for the platform returned no match
    AllProvidersExhausted,
    /// Media transfer exceeded its budget
    Timeout,
    /// Network or host fault that may succeed on retry
    Transient,
}

impl FailureReason {
    /// Returns subcategory for metrics and log tags
    pub fn subcategory(&self) -> &'static str {
        match self {
            FailureReason::UnsupportedPlatform => "unsupported_platform",
            FailureReason::CredentialsRequired => "credentials_required",
            FailureReason::CredentialsExpiredOrInvalid => "credentials_invalid",
            FailureReason::PrivateOrUnavailable => "private_or_unavailable",
            FailureReason::FileTooLarge => "file_too_large",
            FailureReason::AllProvidersExhausted => "all_providers_exhausted",
            FailureReason::Timeout => "timeout",
            FailureReason::Transient => "transient",
        }
    }

    /// Default English text for the user; the messaging layer may localise.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::UnsupportedPlatform => {
                "❌ Unsupported link. Send a YouTube, TikTok or Instagram link."
            }
            FailureReason::CredentialsRequired => {
                "🔑 YouTube needs cookies. Upload your cookies file first."
            }
            FailureReason::CredentialsExpiredOrInvalid => {
                "⚠️ Your cookies have expired or are invalid. Upload a fresh export."
            }
            FailureReason::PrivateOrUnavailable => "🔒 This video is private or no longer available.",
            FailureReason::FileTooLarge => "📦 The video is too large to send.",
            FailureReason::AllProvidersExhausted => "❌ Could not download this video. Try another link.",
            FailureReason::Timeout => "⏱ The download took too long. Try again later.",
            FailureReason::Transient => "❌ Download failed. Try again in a minute.",
        }
    }

    /// Whether repeating the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureReason::Timeout | FailureReason::Transient | FailureReason::AllProvidersExhausted
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcategory())
    }
}

/// Failure outcome of a resolution pass.
///
/// The diagnostic is a short, bounded note for logs; it never carries a
/// response body or credential contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFailure {
    pub reason: FailureReason,
    pub platform: Option<PlatformKind>,
    diagnostic: Option<String>,
}

impl DownloadFailure {
    pub fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            platform: None,
            diagnostic: None,
        }
    }

    pub fn with_platform(mut self, platform: PlatformKind) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl AsRef<str>) -> Self {
        let trimmed = diagnostic.as_ref().trim();
        self.diagnostic = if trimmed.is_empty() {
            None
        } else {
            Some(truncate_chars(trimmed, DIAGNOSTIC_MAX_CHARS))
        };
        self
    }

    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn user_message(&self) -> &'static str {
        self.reason.user_message()
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason == FailureReason::Transient && self.diagnostic() == Some(CANCELLED)
    }
}

/// Diagnostic attached to a pass that was cancelled by its caller.
pub const CANCELLED: &str = "cancelled";

/// Shorthand used by the adapters and the engine.
pub fn failure(reason: FailureReason, diagnostic: impl AsRef<str>) -> DownloadFailure {
    DownloadFailure::new(reason).with_diagnostic(diagnostic)
}

pub fn cancelled() -> DownloadFailure {
    DownloadFailure::new(FailureReason::Transient).with_diagnostic(CANCELLED)
}

impl fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.platform, &self.diagnostic) {
            (Some(p), Some(d)) => write!(f, "{} [{}]: {}", self.reason, p, d),
            (Some(p), None) => write!(f, "{} [{}]", self.reason, p),
            (None, Some(d)) => write!(f, "{}: {}", self.reason, d),
            (None, None) => write!(f, "{}", self.reason),
        }
    }
}

impl std::error::Error for DownloadFailure {}
