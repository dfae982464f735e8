//! In-memory stand-ins for the network seams

use aspk_ingest::error::{FetchError, LocationError, ServiceError};
use aspk_ingest::services::{AudioFetcher, CaptionService, ChatMessage, LocationOracle};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Serves registered bytes per URL and counts every fetch
///
/// With a latency set, each fetch sleeps while holding an in-flight slot,
/// and the highest number of overlapping fetches is recorded.
#[derive(Default)]
pub struct StubFetcher {
    clips: Mutex<HashMap<String, Vec<u8>>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn serve(&self, url: &str, bytes: Vec<u8>) {
        self.clips.lock().unwrap().insert(url.to_string(), bytes);
    }

    /// Make every fetch of `url` fail with a network error
    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if self.failing.lock().unwrap().contains(url) {
            return Err(FetchError::Network(format!("connection reset fetching {}", url)));
        }
        self.clips
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

/// Fails the first `failures` calls, then answers with `reply`
pub struct StubCaptionService {
    failures: usize,
    reply: String,
    calls: AtomicUsize,
    last_conversation: Mutex<Vec<ChatMessage>>,
}

impl StubCaptionService {
    pub fn failing_then(failures: usize, reply: &str) -> Self {
        Self {
            failures,
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            last_conversation: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::failing_then(0, reply)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_conversation(&self) -> Vec<ChatMessage> {
        self.last_conversation.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptionService for StubCaptionService {
    async fn send(&self, conversation: &[ChatMessage]) -> Result<String, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_conversation.lock().unwrap() = conversation.to_vec();
        if call < self.failures {
            return Err(ServiceError::Status {
                status: 503,
                body: "overloaded".to_string(),
            });
        }
        Ok(self.reply.clone())
    }
}

/// Reports a location whenever the text contains one of `places`
pub struct StubLocationOracle {
    places: Vec<String>,
}

impl StubLocationOracle {
    pub fn new(places: &[&str]) -> Self {
        Self {
            places: places.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[async_trait]
impl LocationOracle for StubLocationOracle {
    async fn mentions_location(&self, text: &str) -> Result<bool, LocationError> {
        Ok(self.places.iter().any(|p| text.contains(p.as_str())))
    }
}
