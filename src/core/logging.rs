//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Credential configuration check (paths only, never cookie contents)

use anyhow::Result;
use simplelog::*;
use std::fs::File;
use std::path::Path;

use crate::core::config::Config as AppConfig;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger is already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Where YouTube credentials will come from, as seen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSetup {
    /// Default cookies file configured and present
    DefaultFile,
    /// Default cookies file configured but missing on disk
    DefaultFileMissing,
    /// Only per-user cookie jars can unlock YouTube
    PerUserOnly,
}

/// Classifies the credential setup without touching file contents.
pub fn credential_setup(config: &AppConfig) -> CredentialSetup {
    match &config.default_cookies_file {
        Some(path) if path.exists() => CredentialSetup::DefaultFile,
        Some(_) => CredentialSetup::DefaultFileMissing,
        None => CredentialSetup::PerUserOnly,
    }
}

/// Logs credential and provider configuration at application startup
///
/// Validates and logs:
/// - YTDL_COOKIES_FILE existence and path
/// - COOKIES_DIR for per-user jars
/// - Whether the RapidAPI Instagram adapter is enabled
pub fn log_cookies_configuration(config: &AppConfig) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🍪 Cookies Configuration Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match credential_setup(config) {
        CredentialSetup::DefaultFile => {
            if let Some(path) = &config.default_cookies_file {
                let shown = path.canonicalize().unwrap_or_else(|_| path.clone());
                log::info!("✅ YTDL_COOKIES_FILE: {}", shown.display());
                log::info!("   Used for YouTube when a user has no cookies of their own");
            }
        }
        CredentialSetup::DefaultFileMissing => {
            if let Some(path) = &config.default_cookies_file {
                log::error!("❌ YTDL_COOKIES_FILE: {} (FILE NOT FOUND!)", path.display());
                log::error!("   Current directory: {:?}", std::env::current_dir());
            }
        }
        CredentialSetup::PerUserOnly => {
            log::warn!("⚠️  YTDL_COOKIES_FILE: not set");
            log::warn!("   YouTube links need per-user cookies (vidfetch cookies set <user> <file>)");
        }
    }

    log_dir_status("COOKIES_DIR", &config.cookies_dir);

    if config.rapidapi_key.is_some() {
        log::info!("✅ RAPIDAPI_KEY: set, Instagram RapidAPI adapter enabled");
    } else {
        log::info!("ℹ️  RAPIDAPI_KEY: not set, Instagram starts with the embed scraper");
    }

    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn log_dir_status(name: &str, dir: &Path) {
    if dir.is_dir() {
        log::info!("✅ {}: {}", name, dir.display());
    } else {
        log::warn!("⚠️  {}: {} (will be created on first write)", name, dir.display());
    }
}
