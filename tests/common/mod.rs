//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vidfetch::download::fetch::StreamingFetcher;
use vidfetch::download::source::{MediaProvider, ProviderRegistry};
use vidfetch::download::{PlatformKind, ResolutionEngine};
use vidfetch::storage::cookies::CredentialStore;
use vidfetch::storage::ScratchDir;

pub const MB: usize = 1024 * 1024;

pub const COOKIE_JAR: &str = "# Netscape HTTP Cookie File\n\
    .youtube.com\tTRUE\t/\tTRUE\t0\tSID\tsecret-sid\n\
    .youtube.com\tTRUE\t/\tTRUE\t0\tHSID\tsecret-hsid\n";

/// Temp dir + mock HTTP server shared by one test
pub struct TestEnvironment {
    pub dir: TempDir,
    pub server: MockServer,
}

impl TestEnvironment {
    pub async fn start() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
            server: MockServer::start().await,
        }
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    pub fn scratch(&self) -> ScratchDir {
        ScratchDir::new(self.scratch_root())
    }

    /// File names currently in the scratch dir, sorted. Empty if it does not exist.
    pub fn scratch_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.scratch_root())
            .map(|rd| {
                rd.filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn url(&self, route: &str) -> String {
        format!("{}{}", self.server.uri(), route)
    }

    /// Serves `size` bytes of `video/mp4` at `route` and returns its URL.
    pub async fn serve_media(&self, route: &str, size: usize) -> String {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(media_bytes(size), "video/mp4"))
            .mount(&self.server)
            .await;
        self.url(route)
    }

    /// Same as [`serve_media`](Self::serve_media) but the response starts after `delay`.
    pub async fn serve_slow_media(&self, route: &str, size: usize, delay: Duration) -> String {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(media_bytes(size), "video/mp4")
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
        self.url(route)
    }

    pub fn fetcher(&self, timeout: Duration) -> StreamingFetcher {
        StreamingFetcher::new(self.scratch(), timeout).expect("failed to build fetcher")
    }

    pub fn engine(
        &self,
        registry: ProviderRegistry,
        store: Arc<dyn CredentialStore>,
        max_file_size: u64,
    ) -> ResolutionEngine {
        ResolutionEngine::new(
            Arc::new(registry),
            self.fetcher(Duration::from_secs(10)),
            store,
            max_file_size,
            Duration::from_secs(2),
        )
    }
}

pub fn media_bytes(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Registry with `providers` as the only chain for `platform`
pub fn registry_with<P: MediaProvider + 'static>(platform: PlatformKind, providers: &[Arc<P>]) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(platform, provider.clone());
    }
    registry
}
