//! Platform detection for inbound links.

use std::fmt;

/// Platform a link belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    YouTube,
    TikTok,
    Instagram,
    Unknown,
}

impl PlatformKind {
    /// Stable lowercase tag for logs and file metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::YouTube => "youtube",
            PlatformKind::TikTok => "tiktok",
            PlatformKind::Instagram => "instagram",
            PlatformKind::Unknown => "unknown",
        }
    }

    /// Label shown to users next to a delivered video
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformKind::YouTube => "🔴 YouTube",
            PlatformKind::TikTok => "🎵 TikTok",
            PlatformKind::Instagram => "📸 Instagram",
            PlatformKind::Unknown => "🌐 Unknown",
        }
    }

    /// Title used when a provider reports none
    pub fn fallback_title(&self) -> &'static str {
        match self {
            PlatformKind::YouTube => "YouTube Video",
            PlatformKind::TikTok => "TikTok Video",
            PlatformKind::Instagram => "Instagram Video",
            PlatformKind::Unknown => "Video",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, PlatformKind::Unknown)
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a URL by case-insensitive host markers.
///
/// Total and pure: anything that matches no marker is `Unknown`.
pub fn classify(url: &str) -> PlatformKind {
    let lower = url.to_lowercase();

    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        PlatformKind::YouTube
    } else if lower.contains("tiktok.com") || lower.contains("vm.tiktok") {
        PlatformKind::TikTok
    } else if lower.contains("instagram.com") {
        PlatformKind::Instagram
    } else {
        PlatformKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_youtube() {
        assert_eq!(classify("https://www.youtube.com/watch?v=abc"), PlatformKind::YouTube);
        assert_eq!(classify("https://youtu.be/abc"), PlatformKind::YouTube);
        assert_eq!(classify("HTTPS://M.YOUTUBE.COM/shorts/abc"), PlatformKind::YouTube);
    }

    #[test]
    fn test_classify_tiktok() {
        assert_eq!(classify("https://www.tiktok.com/@user/video/123"), PlatformKind::TikTok);
        assert_eq!(classify("https://vm.tiktok.com/ZMabc/"), PlatformKind::TikTok);
        assert_eq!(classify("https://WWW.TikTok.com/@u/video/1"), PlatformKind::TikTok);
    }

    #[test]
    fn test_classify_instagram() {
        assert_eq!(classify("https://www.instagram.com/reel/Cxyz/"), PlatformKind::Instagram);
        assert_eq!(classify("https://Instagram.com/p/abc"), PlatformKind::Instagram);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify("https://vimeo.com/123"), PlatformKind::Unknown);
        assert_eq!(classify(""), PlatformKind::Unknown);
        assert_eq!(classify("not a url at all"), PlatformKind::Unknown);
        assert!(!PlatformKind::Unknown.is_supported());
    }

    #[test]
    fn test_display_and_titles() {
        assert_eq!(PlatformKind::TikTok.to_string(), "tiktok");
        assert_eq!(PlatformKind::Instagram.fallback_title(), "Instagram Video");
    }
}
