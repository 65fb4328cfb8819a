//! Scratch directory for in-flight and completed downloads.
//!
//! Completed files are stored as `{scratch_dir}/{sha256(source_url)[..16]}.{uuid}.mp4`:
//! the hash prefix ties every delivery of one link together, the suffix makes
//! each delivery its own file so releasing one never touches another.
//! In-flight files live next to them as `{uuid}.part` and are renamed into
//! place only after the transfer finishes, so a reader never sees a partial
//! file under a final name.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

const PART_EXTENSION: &str = "part";
const MEDIA_EXTENSION: &str = "mp4";
const KEY_HEX_CHARS: usize = 16;

#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Stable key for a source URL; every delivery of one link shares it.
    pub fn file_key(source_url: &str) -> String {
        let digest = Sha256::digest(source_url.as_bytes());
        let mut key = hex::encode(digest);
        key.truncate(KEY_HEX_CHARS);
        key
    }

    /// Fresh path for one completed delivery of `source_url`.
    pub fn final_path(&self, source_url: &str) -> PathBuf {
        self.root.join(format!(
            "{}.{}.{}",
            Self::file_key(source_url),
            uuid::Uuid::new_v4().simple(),
            MEDIA_EXTENSION
        ))
    }

    /// Whether `path` is a delivery of `source_url` in this directory.
    pub fn belongs_to(&self, path: &Path, source_url: &str) -> bool {
        let key = Self::file_key(source_url);
        path.parent() == Some(self.root.as_path())
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&format!("{}.", key)) && n.ends_with(&format!(".{}", MEDIA_EXTENSION)))
                .unwrap_or(false)
    }

    /// Reserves a unique in-flight path. The returned guard deletes the file
    /// when dropped unless [`PartialFile::commit`] succeeded.
    pub fn partial(&self) -> PartialFile {
        let path = self
            .root
            .join(format!("{}.{}", uuid::Uuid::new_v4().simple(), PART_EXTENSION));
        PartialFile { path, armed: true }
    }

    /// Deletes a delivered file. Missing files are not an error.
    pub async fn release(&self, path: &Path) -> bool {
        match fs::remove_file(path).await {
            Ok(()) => {
                log::debug!("🧹 Released {:?}", path);
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                log::warn!("⚠️  Failed to release {:?}: {}", path, e);
                false
            }
        }
    }

    /// Removes files (complete or partial) older than `max_age`.
    ///
    /// Covers files left behind by a crash or by callers that never released.
    pub async fn sweep_stale(&self, max_age: Duration) -> io::Result<usize> {
        let mut removed = 0;
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let now = SystemTime::now();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
            if ext != PART_EXTENSION && ext != MEDIA_EXTENSION {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();
            if age >= max_age && fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            log::info!("🧹 Swept {} stale file(s) from {:?}", removed, self.root);
        }
        Ok(removed)
    }
}

/// In-flight download file that cleans itself up.
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically moves the finished file to `target`.
    pub async fn commit(mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target).await?;
        self.armed = false;
        Ok(())
    }

    /// Deletes the file now instead of on drop.
    pub async fn discard(mut self) {
        self.armed = false;
        if let Err(e) = fs::remove_file(&self.path).await {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("⚠️  Failed to remove partial file {:?}: {}", self.path, e);
            }
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
