use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Path to the operator-level cookies file for YouTube
/// Read from YTDL_COOKIES_FILE environment variable
/// Used when the requesting user has no cookie jar of their own
pub static YTDL_COOKIES_FILE: Lazy<Option<String>> =
    Lazy::new(|| env::var("YTDL_COOKIES_FILE").ok().filter(|s| !s.trim().is_empty()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: vidfetch.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "vidfetch.log".to_string()));

/// Process-wide configuration, built from the environment on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Size limits
pub mod limits {
    /// Default maximum persisted file size (in megabytes)
    pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

    /// Display title bound (characters)
    pub const TITLE_MAX_CHARS: usize = 200;

    /// Uploader name bound (characters)
    pub const UPLOADER_MAX_CHARS: usize = 100;

    /// Failure diagnostic bound (characters)
    pub const DIAGNOSTIC_MAX_CHARS: usize = 200;

    pub const fn megabytes(mb: u64) -> u64 {
        mb.saturating_mul(1024 * 1024)
    }
}

/// Timeout configuration
pub mod timeouts {
    use super::Duration;

    /// Budget for a single provider attempt (in seconds)
    pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

    /// Budget for the whole media transfer (in seconds)
    pub const FETCH_TIMEOUT_SECS: u64 = 180;

    /// Connect timeout for provider and media HTTP clients (in seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 15;

    /// yt-dlp --version probe
    pub const YTDLP_VERSION_TIMEOUT_SECS: u64 = 10;

    pub fn provider() -> Duration {
        Duration::from_secs(PROVIDER_TIMEOUT_SECS)
    }

    pub fn fetch() -> Duration {
        Duration::from_secs(FETCH_TIMEOUT_SECS)
    }

    pub fn connect() -> Duration {
        Duration::from_secs(CONNECT_TIMEOUT_SECS)
    }

    pub fn ytdlp_version() -> Duration {
        Duration::from_secs(YTDLP_VERSION_TIMEOUT_SECS)
    }
}

/// Worker pool configuration
pub mod pool {
    /// Maximum number of concurrent resolutions
    /// Kept low to avoid YouTube 403 rate limiting
    pub const DEFAULT_WORKER_POOL_SIZE: usize = 2;
}

/// Network identity used by the HTTP adapters
pub mod network {
    /// Desktop Chrome user agent shared by the scrapers and the extractor
    pub const CHROME_USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
}

/// Runtime configuration for the resolution core.
///
/// Built once at startup with [`Config::from_env`] and passed down by reference.
/// Tests construct it directly with [`Config::with_scratch_dir`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared storage for in-flight and completed downloads (SCRATCH_DIR)
    pub scratch_dir: PathBuf,
    /// Hard cap for a persisted file, in bytes (MAX_FILE_SIZE_MB)
    pub max_file_size: u64,
    /// Per-provider attempt budget (PROVIDER_TIMEOUT_SECS)
    pub provider_timeout: Duration,
    /// Whole-transfer budget for the media fetch (FETCH_TIMEOUT_SECS)
    pub fetch_timeout: Duration,
    /// Concurrent resolutions (WORKER_POOL_SIZE)
    pub worker_pool_size: usize,
    /// Directory holding one cookie jar per user (COOKIES_DIR)
    pub cookies_dir: PathBuf,
    /// Operator-level cookies file used when a user has none (YTDL_COOKIES_FILE)
    pub default_cookies_file: Option<PathBuf>,
    /// Enables the RapidAPI Instagram adapter (RAPIDAPI_KEY)
    pub rapidapi_key: Option<String>,
    /// yt-dlp binary (YTDL_BIN)
    pub ytdl_bin: String,
}

impl Config {
    /// Reads every setting from the environment, falling back to defaults
    /// and logging a warning for values that fail to parse.
    pub fn from_env() -> Self {
        let max_mb: u64 = env_parse("MAX_FILE_SIZE_MB", limits::DEFAULT_MAX_FILE_SIZE_MB);
        let pool_size: usize = env_parse("WORKER_POOL_SIZE", pool::DEFAULT_WORKER_POOL_SIZE);

        Self {
            scratch_dir: expand_path(&env::var("SCRATCH_DIR").unwrap_or_else(|_| "/tmp/vidfetch".to_string())),
            max_file_size: limits::megabytes(max_mb),
            provider_timeout: Duration::from_secs(env_parse("PROVIDER_TIMEOUT_SECS", timeouts::PROVIDER_TIMEOUT_SECS)),
            fetch_timeout: Duration::from_secs(env_parse("FETCH_TIMEOUT_SECS", timeouts::FETCH_TIMEOUT_SECS)),
            worker_pool_size: pool_size.max(1),
            cookies_dir: expand_path(&env::var("COOKIES_DIR").unwrap_or_else(|_| "./cookies".to_string())),
            default_cookies_file: YTDL_COOKIES_FILE.as_deref().map(expand_path),
            rapidapi_key: env::var("RAPIDAPI_KEY").ok().filter(|k| !k.trim().is_empty()),
            ytdl_bin: YTDL_BIN.clone(),
        }
    }

    /// Defaults rooted at `scratch_dir`, with no credentials or API keys.
    pub fn with_scratch_dir(scratch_dir: impl Into<PathBuf>) -> Self {
        let scratch_dir = scratch_dir.into();
        Self {
            cookies_dir: scratch_dir.join("cookies"),
            scratch_dir,
            max_file_size: limits::megabytes(limits::DEFAULT_MAX_FILE_SIZE_MB),
            provider_timeout: timeouts::provider(),
            fetch_timeout: timeouts::fetch(),
            worker_pool_size: pool::DEFAULT_WORKER_POOL_SIZE,
            default_cookies_file: None,
            rapidapi_key: None,
            ytdl_bin: "yt-dlp".to_string(),
        }
    }
}

/// Expands `~` in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    if Path::new(raw).is_absolute() {
        PathBuf::from(raw)
    } else {
        PathBuf::from(shellexpand::tilde(raw).to_string())
    }
}

fn env_parse<T: FromStr + std::fmt::Display + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("⚠️  {}={:?} is not valid, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "SCRATCH_DIR",
            "MAX_FILE_SIZE_MB",
            "PROVIDER_TIMEOUT_SECS",
            "FETCH_TIMEOUT_SECS",
            "WORKER_POOL_SIZE",
            "COOKIES_DIR",
            "RAPIDAPI_KEY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/vidfetch"));
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.fetch_timeout, Duration::from_secs(180));
        assert_eq!(config.worker_pool_size, 2);
        assert!(config.rapidapi_key.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("MAX_FILE_SIZE_MB", "20");
        env::set_var("WORKER_POOL_SIZE", "4");
        env::set_var("RAPIDAPI_KEY", "secret");
        env::set_var("SCRATCH_DIR", "/var/tmp/vf");

        let config = Config::from_env();
        assert_eq!(config.max_file_size, 20 * 1024 * 1024);
        assert_eq!(config.worker_pool_size, 4);
        assert_eq!(config.rapidapi_key.as_deref(), Some("secret"));
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/vf"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        env::set_var("MAX_FILE_SIZE_MB", "lots");
        env::set_var("WORKER_POOL_SIZE", "0");
        env::set_var("RAPIDAPI_KEY", "   ");

        let config = Config::from_env();
        assert_eq!(config.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.worker_pool_size, 1);
        assert!(config.rapidapi_key.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_huge_max_file_size_saturates() {
        clear_env();
        env::set_var("MAX_FILE_SIZE_MB", u64::MAX.to_string());

        let config = Config::from_env();
        assert_eq!(config.max_file_size, u64::MAX);
        assert_eq!(limits::megabytes(1), 1024 * 1024);
        clear_env();
    }

    #[test]
    fn test_expand_path_tilde() {
        if let Ok(home) = env::var("HOME") {
            assert_eq!(expand_path("~/cookies"), PathBuf::from(home).join("cookies"));
        }
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
    }
}
