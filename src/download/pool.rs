//! Bounded pool running resolution passes on the shared runtime.
//!
//! At most `size` passes run at once; extra requests wait for a permit.
//! Each dispatched pass gets its own cancellation token, a child of the
//! pool's shutdown token, so both a single caller and a shutdown can stop it.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::download::engine::ResolutionEngine;
use crate::download::error::{cancelled, failure, FailureReason};
use crate::download::types::{DownloadRequest, DownloadResult};

pub struct ResolutionPool {
    engine: Arc<ResolutionEngine>,
    permits: Arc<Semaphore>,
    size: usize,
    shutdown: CancellationToken,
}

impl ResolutionPool {
    pub fn new(engine: Arc<ResolutionEngine>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            engine,
            permits: Arc::new(Semaphore::new(size)),
            size,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn engine(&self) -> &Arc<ResolutionEngine> {
        &self.engine
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Free worker slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Queues `request` and returns immediately.
    pub fn dispatch(&self, request: DownloadRequest) -> ResolutionHandle {
        let cancel = self.shutdown.child_token();
        let engine = Arc::clone(&self.engine);
        let permits = Arc::clone(&self.permits);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(cancelled().with_platform(request.platform)),
                permit = permits.acquire() => match permit {
                    Ok(p) => p,
                    Err(e) => {
                        log::error!("Failed to acquire worker permit for {}: {}", request.source_url, e);
                        return Err(failure(FailureReason::Transient, "worker pool closed"));
                    }
                },
            };

            log::info!(
                "Processing {} (permits available: {})",
                request.source_url,
                permits.available_permits()
            );
            engine.resolve(&request, &token).await
        });

        ResolutionHandle {
            cancel: cancel.clone(),
            guard: cancel.drop_guard(),
            task,
        }
    }

    /// Cancels every pass in flight and every pass still waiting for a slot.
    pub fn shutdown(&self) {
        log::info!("🛑 Resolution pool shutting down");
        self.shutdown.cancel();
        self.permits.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Caller's side of one dispatched pass. Dropping it cancels the pass.
pub struct ResolutionHandle {
    cancel: CancellationToken,
    guard: DropGuard,
    task: JoinHandle<DownloadResult>,
}

impl ResolutionHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the outcome. A panicking worker becomes a `Transient` failure.
    pub async fn join(self) -> DownloadResult {
        let Self { guard, task, .. } = self;
        let result = task.await;
        guard.disarm();

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Resolution worker failed: {}", e);
                Err(failure(FailureReason::Transient, "worker panicked"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::fetch::StreamingFetcher;
    use crate::download::source::ProviderRegistry;
    use crate::storage::cookies::FileCredentialStore;
    use crate::storage::scratch::ScratchDir;
    use std::time::Duration;

    fn pool(dir: &tempfile::TempDir, size: usize) -> ResolutionPool {
        let fetcher = StreamingFetcher::new(ScratchDir::new(dir.path()), Duration::from_secs(1)).unwrap();
        let store = Arc::new(FileCredentialStore::new(dir.path().join("cookies")));
        let engine = ResolutionEngine::new(
            Arc::new(ProviderRegistry::new()),
            fetcher,
            store,
            1024,
            Duration::from_secs(1),
        );
        ResolutionPool::new(Arc::new(engine), size)
    }

    #[tokio::test]
    async fn test_dispatch_returns_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(&dir, 2);

        let err = pool
            .dispatch(DownloadRequest::new("https://example.com/v", None))
            .join()
            .await
            .unwrap_err();
        assert_eq!(err.reason, FailureReason::UnsupportedPlatform);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_zero_size_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(pool(&dir, 0).size(), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_permit() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(&dir, 1);
        // Hold the only slot so the dispatched pass has to wait
        let held = Arc::clone(&pool.permits).acquire_owned().await.unwrap();

        let handle = pool.dispatch(DownloadRequest::new("https://vm.tiktok.com/x", None));
        handle.cancel();
        let err = handle.join().await.unwrap_err();
        assert!(err.is_cancelled());
        drop(held);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_waiting_passes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(&dir, 1);
        let held = Arc::clone(&pool.permits).acquire_owned().await.unwrap();

        let handle = pool.dispatch(DownloadRequest::new("https://vm.tiktok.com/x", None));
        pool.shutdown();
        assert!(pool.is_shut_down());
        let err = handle.join().await.unwrap_err();
        assert_eq!(err.reason, FailureReason::Transient);
        drop(held);
    }
}
