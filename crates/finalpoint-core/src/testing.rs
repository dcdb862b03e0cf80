//! Test doubles for the platform traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;

use crate::agent::{Agent, AgentServices};
use crate::config::AgentConfig;
use crate::http::{Request, Response};
use crate::platform::{Network, NetworkError, Notification, Notifier, PlatformError, WorkerScope};
use crate::storage::{BucketSummary, CacheStorage, MemoryCacheStorage, StorageError};

pub(crate) const TEST_ORIGIN: &str = "https://finalpoint.app";

/// Canned responses keyed by full URL. Unknown URLs are unreachable.
#[derive(Default)]
pub(crate) struct MockNetwork {
    responses: Mutex<HashMap<String, Response>>,
    calls: AtomicUsize,
}

impl MockNetwork {
    pub fn respond(&self, url: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| NetworkError::Unreachable(request.url.to_string()))
    }
}

/// Memory cache that counts lookups and writes.
#[derive(Default)]
pub(crate) struct TrackingCaches {
    inner: MemoryCacheStorage,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl TrackingCaches {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStorage for TrackingCaches {
    async fn open(&self, name: &str) -> Result<(), StorageError> {
        self.inner.open(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        self.inner.delete(name).await
    }

    async fn match_request(
        &self,
        name: &str,
        key: &str,
    ) -> Result<Option<Response>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.match_request(name, key).await
    }

    async fn put(&self, name: &str, key: &str, response: Response) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(name, key, response).await
    }

    async fn summaries(&self) -> Result<Vec<BucketSummary>, StorageError> {
        self.inner.summaries().await
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
    closed: Mutex<Vec<String>>,
    fail_show: AtomicBool,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn fail_show(&self) {
        self.fail_show.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), PlatformError> {
        if self.fail_show.load(Ordering::SeqCst) {
            return Err(PlatformError::Notification("display blocked".to_string()));
        }
        self.shown.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<(), PlatformError> {
        self.closed.lock().unwrap().push(tag.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingScope {
    skip_waiting: AtomicUsize,
    claims: AtomicUsize,
    fail_claim: AtomicBool,
    opened: Mutex<Vec<Url>>,
}

impl RecordingScope {
    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn fail_claim(&self) {
        self.fail_claim.store(true, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerScope for RecordingScope {
    async fn skip_waiting(&self) -> Result<(), PlatformError> {
        self.skip_waiting.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), PlatformError> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        if self.fail_claim.load(Ordering::SeqCst) {
            return Err(PlatformError::Client("claim rejected".to_string()));
        }
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), PlatformError> {
        self.opened.lock().unwrap().push(url.clone());
        Ok(())
    }
}

/// One set of doubles shared between a test and the agent under test.
pub(crate) struct Harness {
    pub caches: Arc<TrackingCaches>,
    pub network: Arc<MockNetwork>,
    pub notifier: Arc<RecordingNotifier>,
    pub scope: Arc<RecordingScope>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            caches: Arc::new(TrackingCaches::default()),
            network: Arc::new(MockNetwork::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            scope: Arc::new(RecordingScope::default()),
        }
    }

    pub fn services(&self) -> AgentServices {
        AgentServices {
            caches: self.caches.clone(),
            network: self.network.clone(),
            notifier: self.notifier.clone(),
            scope: self.scope.clone(),
        }
    }

    pub fn agent(&self) -> Agent {
        let origin = Url::parse(TEST_ORIGIN).unwrap();
        Agent::new(AgentConfig::new(origin), self.services())
    }
}
