//! Mock provider and credential store
//!
//! `MockProvider` counts its calls, records the credential path it was given
//! and tracks how many attempts run at the same time.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

use vidfetch::core::error::AppResult;
use vidfetch::download::error::failure;
use vidfetch::download::source::{MediaProvider, ProviderOutcome, ProviderTuning};
use vidfetch::download::types::{DownloadRequest, MediaLocator, UserId};
use vidfetch::download::FailureReason;
use vidfetch::storage::cookies::{validate_netscape, CredentialRecord, CredentialStore};

/// What a mock provider does when attempted
#[derive(Debug, Clone)]
pub enum MockBehavior {
    NoMatch,
    Locate(MediaLocator),
    Fail(FailureReason),
    /// Sleep, then behave like the inner script
    Slow(Duration, Box<MockBehavior>),
}

pub struct MockProvider {
    id: &'static str,
    behavior: MockBehavior,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    credentials_seen: Mutex<Vec<Option<PathBuf>>>,
    tuning: ProviderTuning,
}

impl MockProvider {
    pub fn new(id: &'static str, behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self {
            id,
            behavior,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            credentials_seen: Mutex::new(Vec::new()),
            tuning: ProviderTuning::http(Vec::new()),
        })
    }

    pub fn no_match(id: &'static str) -> Arc<Self> {
        Self::new(id, MockBehavior::NoMatch)
    }

    pub fn locating(id: &'static str, media_url: impl Into<String>) -> Arc<Self> {
        Self::new(id, MockBehavior::Locate(MediaLocator::new(media_url).title("Mock clip")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn credentials_seen(&self) -> Vec<Option<PathBuf>> {
        self.credentials_seen.lock().unwrap().clone()
    }
}

async fn play(behavior: &MockBehavior) -> ProviderOutcome {
    let mut current = behavior;
    loop {
        match current {
            MockBehavior::NoMatch => return ProviderOutcome::no_match("mock: no match"),
            MockBehavior::Locate(locator) => return ProviderOutcome::Located(locator.clone()),
            MockBehavior::Fail(reason) => return ProviderOutcome::Failed(failure(*reason, "mock: definite failure")),
            MockBehavior::Slow(delay, inner) => {
                tokio::time::sleep(*delay).await;
                current = inner.as_ref();
            }
        }
    }
}

#[async_trait]
impl MediaProvider for MockProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn tuning(&self) -> &ProviderTuning {
        &self.tuning
    }

    async fn attempt(&self, request: &DownloadRequest) -> ProviderOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials_seen
            .lock()
            .unwrap()
            .push(request.credential.as_ref().map(|c| c.path().to_path_buf()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let outcome = play(&self.behavior).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Credential store keeping jars in memory
#[derive(Default)]
pub struct MemoryCredentialStore {
    jars: AsyncMutex<HashMap<UserId, (CredentialRecord, String)>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn content(&self, user: UserId) -> Option<String> {
        self.jars.lock().await.get(&user).map(|(_, c)| c.clone())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, user: UserId) -> Option<CredentialRecord> {
        self.jars.lock().await.get(&user).map(|(r, _)| r.clone())
    }

    async fn put(&self, user: UserId, content: &str) -> AppResult<CredentialRecord> {
        validate_netscape(content)?;
        let record = CredentialRecord {
            owner_user_id: user,
            cookie_jar_path: PathBuf::from(format!("/memory/cookies/{}.txt", user)),
            last_updated_at: Utc::now(),
        };
        self.jars.lock().await.insert(user, (record.clone(), content.to_string()));
        Ok(record)
    }

    async fn delete(&self, user: UserId) -> AppResult<bool> {
        Ok(self.jars.lock().await.remove(&user).is_some())
    }
}
