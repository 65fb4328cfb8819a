//! Per-user YouTube cookie jars.
//!
//! One Netscape-format export per user at `{cookies_dir}/{user_id}.txt`.
//! Writes are serialised and atomic (temp file, then rename), so a reader
//! never sees a half-written jar. Contents are never logged; only counts
//! from [`summarize_jar`] are.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::core::error::{AppError, AppResult};
use crate::download::types::{CredentialHandle, UserId};

const NETSCAPE_HEADER: &str = "Netscape HTTP Cookie File";

/// Cookies YouTube needs for an authenticated session.
const REQUIRED_AUTH_COOKIES: &[&str] = &["SID", "HSID", "SSID", "APISID", "SAPISID"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub owner_user_id: UserId,
    pub cookie_jar_path: PathBuf,
    pub last_updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn handle(&self) -> CredentialHandle {
        CredentialHandle::new(&self.cookie_jar_path)
    }
}

/// Storage for per-user credentials. Injected into the engine.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, user: UserId) -> Option<CredentialRecord>;

    /// Validates and atomically replaces the user's jar.
    async fn put(&self, user: UserId, content: &str) -> AppResult<CredentialRecord>;

    /// Removes the user's jar. `Ok(false)` when there was none.
    async fn delete(&self, user: UserId) -> AppResult<bool>;

    /// Same as [`CredentialStore::put`] for a base64-encoded export.
    async fn put_base64(&self, user: UserId, encoded: &str) -> AppResult<CredentialRecord> {
        let content = decode_base64_export(encoded)?;
        self.put(user, &content).await
    }
}

/// Counts extracted from a jar, safe to log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JarSummary {
    pub has_header: bool,
    pub total_cookies: usize,
    pub youtube_cookies: usize,
    pub auth_cookies_missing: Vec<String>,
    pub auth_cookies_expired: Vec<String>,
}

impl JarSummary {
    pub fn looks_authenticated(&self) -> bool {
        self.youtube_cookies > 0 && self.auth_cookies_missing.is_empty() && self.auth_cookies_expired.is_empty()
    }
}

/// Parses a Netscape cookie export into counts.
///
/// Format: `domain TAB flag TAB path TAB secure TAB expires TAB name TAB value`.
pub fn summarize_jar(content: &str) -> JarSummary {
    let now = Utc::now().timestamp();
    let mut summary = JarSummary {
        has_header: content.lines().any(|l| l.contains(NETSCAPE_HEADER)),
        ..Default::default()
    };
    let mut auth_found: Vec<&str> = Vec::new();

    for line in content.lines() {
        // `#HttpOnly_` prefixes a real cookie line, other `#` lines are comments
        let line = line.trim().trim_start_matches("#HttpOnly_");
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 7 {
            continue;
        }
        summary.total_cookies += 1;

        let domain = parts[0];
        if !(domain.contains("youtube.com") || domain.contains("google.com")) {
            continue;
        }
        summary.youtube_cookies += 1;

        let name = parts[5];
        if let Some(required) = REQUIRED_AUTH_COOKIES.iter().find(|r| **r == name) {
            auth_found.push(required);
            let expires: i64 = parts[4].parse().unwrap_or(0);
            // 0 means a session cookie
            if expires != 0 && expires < now && !summary.auth_cookies_expired.iter().any(|n| n == name) {
                summary.auth_cookies_expired.push(name.to_string());
            }
        }
    }

    summary.auth_cookies_missing = REQUIRED_AUTH_COOKIES
        .iter()
        .filter(|r| !auth_found.contains(r))
        .map(|r| r.to_string())
        .collect();

    summary
}

/// Basic validation: must look like a Netscape export with YouTube entries.
pub fn validate_netscape(content: &str) -> AppResult<JarSummary> {
    if !content.contains(NETSCAPE_HEADER) && !content.contains(".youtube.com") {
        return Err(AppError::Validation(
            "Invalid cookies format. Expected Netscape HTTP Cookie File format with youtube.com entries".to_string(),
        ));
    }
    let summary = summarize_jar(content);
    if summary.total_cookies == 0 {
        return Err(AppError::Validation("Cookies file contains no cookie lines".to_string()));
    }
    Ok(summary)
}

pub fn decode_base64_export(encoded: &str) -> AppResult<String> {
    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AppError::Validation(format!("Invalid base64: {}", e)))?;
    String::from_utf8(decoded).map_err(|e| AppError::Validation(format!("Invalid UTF-8 in cookies: {}", e)))
}

/// Cookie jars as files in one directory.
pub struct FileCredentialStore {
    dir: PathBuf,
    // Prevents concurrent writers from interleaving temp/rename pairs
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn jar_path(&self, user: UserId) -> PathBuf {
        self.dir.join(format!("{}.txt", user))
    }

    /// Reads a jar from disk and stores it for `user`.
    pub async fn put_from_file(&self, user: UserId, source: &Path) -> AppResult<CredentialRecord> {
        let content = tokio::fs::read_to_string(source).await?;
        self.put(user, &content).await
    }

    async fn write_atomic(&self, target: &Path, content: &str) -> io::Result<()> {
        let temp_path = self.dir.join(format!(
            ".{}.tmp.{}.{}",
            target.file_name().and_then(|n| n.to_str()).unwrap_or("jar"),
            std::process::id(),
            uuid::Uuid::new_v4().simple()
        ));

        tokio::fs::write(&temp_path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        if let Err(e) = tokio::fs::rename(&temp_path, target).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, user: UserId) -> Option<CredentialRecord> {
        let path = self.jar_path(user);
        let meta = tokio::fs::metadata(&path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        let last_updated_at = meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
        Some(CredentialRecord {
            owner_user_id: user,
            cookie_jar_path: path,
            last_updated_at,
        })
    }

    async fn put(&self, user: UserId, content: &str) -> AppResult<CredentialRecord> {
        let summary = validate_netscape(content)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.jar_path(user);

        {
            let _lock = self.write_lock.lock().await;
            self.write_atomic(&path, content).await?;
        }

        log::info!(
            "✅ Cookies updated atomically for user {}: {} cookies, {} youtube, auth missing: {}",
            user,
            summary.total_cookies,
            summary.youtube_cookies,
            summary.auth_cookies_missing.len()
        );
        if !summary.auth_cookies_expired.is_empty() {
            log::warn!(
                "⚠️  User {} uploaded expired auth cookies: {}",
                user,
                summary.auth_cookies_expired.join(", ")
            );
        }

        Ok(CredentialRecord {
            owner_user_id: user,
            cookie_jar_path: path,
            last_updated_at: Utc::now(),
        })
    }

    async fn delete(&self, user: UserId) -> AppResult<bool> {
        let _lock = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.jar_path(user)).await {
            Ok(()) => {
                log::info!("🗑 Cookies deleted for user {}", user);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const JAR: &str = "# Netscape HTTP Cookie File\n\
        .youtube.com\tTRUE\t/\tTRUE\t0\tSID\ts\n\
        .youtube.com\tTRUE\t/\tTRUE\t0\tHSID\th\n\
        .youtube.com\tTRUE\t/\tTRUE\t0\tSSID\tss\n\
        .youtube.com\tTRUE\t/\tTRUE\t0\tAPISID\ta\n\
        .youtube.com\tTRUE\t/\tTRUE\t0\tSAPISID\tsa\n\
        .example.com\tTRUE\t/\tFALSE\t0\tother\tx\n";

    fn make_store() -> (TempDir, FileCredentialStore) {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = FileCredentialStore::new(dir.path().join("cookies"));
        (dir, store)
    }

    #[test]
    fn test_summarize_jar() {
        let summary = summarize_jar(JAR);
        assert!(summary.has_header);
        assert_eq!(summary.total_cookies, 6);
        assert_eq!(summary.youtube_cookies, 5);
        assert!(summary.looks_authenticated());
    }

    #[test]
    fn test_summarize_jar_expired_and_missing() {
        let jar = "# Netscape HTTP Cookie File\n\
            #HttpOnly_.youtube.com\tTRUE\t/\tTRUE\t1000\tSID\ts\n";
        let summary = summarize_jar(jar);
        assert_eq!(summary.total_cookies, 1);
        assert_eq!(summary.auth_cookies_expired, vec!["SID".to_string()]);
        assert!(summary.auth_cookies_missing.contains(&"HSID".to_string()));
        assert!(!summary.looks_authenticated());
    }

    #[test]
    fn test_validate_netscape_rejects_garbage() {
        assert!(validate_netscape("hello world").is_err());
        assert!(validate_netscape("# Netscape HTTP Cookie File\n").is_err());
        assert!(validate_netscape(JAR).is_ok());
    }

    #[test]
    fn test_decode_base64_export() {
        let encoded = general_purpose::STANDARD.encode(JAR);
        assert_eq!(decode_base64_export(&encoded).unwrap(), JAR);
        assert!(decode_base64_export("not-valid-base64!@#").is_err());
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (_dir, store) = make_store();
        assert!(store.get(42).await.is_none());

        let record = store.put(42, JAR).await.unwrap();
        assert_eq!(record.owner_user_id, 42);
        assert_eq!(record.cookie_jar_path, store.jar_path(42));

        let fetched = store.get(42).await.unwrap();
        assert_eq!(fetched.handle().path(), store.jar_path(42));
        assert_eq!(std::fs::read_to_string(store.jar_path(42)).unwrap(), JAR);

        assert!(store.delete(42).await.unwrap());
        assert!(!store.delete(42).await.unwrap());
        assert!(store.get(42).await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_and_leaves_no_temp_files() {
        let (_dir, store) = make_store();
        store.put(7, JAR).await.unwrap();
        let second = JAR.replace("\ts\n", "\tnew\n");
        store.put(7, &second).await.unwrap();

        assert_eq!(std::fs::read_to_string(store.jar_path(7)).unwrap(), second);
        let names: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["7.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_put_keeps_previous_jar() {
        let (_dir, store) = make_store();
        store.put(9, JAR).await.unwrap();
        assert!(store.put(9, "garbage").await.is_err());
        assert_eq!(std::fs::read_to_string(store.jar_path(9)).unwrap(), JAR);
    }

    #[tokio::test]
    async fn test_put_base64() {
        let (_dir, store) = make_store();
        let encoded = general_purpose::STANDARD.encode(JAR);
        store.put_base64(5, &encoded).await.unwrap();
        assert!(store.get(5).await.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_jar_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, store) = make_store();
        store.put(1, JAR).await.unwrap();
        let mode = std::fs::metadata(store.jar_path(1)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
