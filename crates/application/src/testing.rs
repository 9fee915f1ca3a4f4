//! Test doubles shared by the unit tests of this crate.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tether_domain::{BasicRequest, EventParser, Response, StreamEvent, UserRegistry};

use crate::ports::{
    Clock, EventStream, StorageError, StreamOpening, Transport, TransportError, UserStorage,
};

/// Replays queued outcomes and records every request it is handed.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Response, TransportError>>>,
    requests: Mutex<Vec<BasicRequest>>,
    streaming: bool,
    yielding: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            streaming: false,
            yielding: false,
        }
    }

    /// A transport that takes its scripted outcome on entry and then yields,
    /// so concurrent callers interleave their round trips.
    pub fn yielding() -> Self {
        Self {
            yielding: true,
            ..Self::new()
        }
    }

    /// Number of recorded requests whose URL ends with `suffix`.
    pub fn count_to(&self, suffix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.ends_with(suffix))
            .count()
    }

    /// A transport whose `stream` replays the same queue; a 2xx body is
    /// parsed as an SSE payload.
    pub fn streaming() -> Self {
        Self {
            streaming: true,
            ..Self::new()
        }
    }

    pub fn push_response(&self, response: Response) {
        self.script.lock().push_back(Ok(response));
    }

    pub fn push_json(&self, status: u16, body: &serde_json::Value) {
        self.push_response(Response::json(status, body));
    }

    pub fn push_invalid_session(&self) {
        self.push_json(
            401,
            &json!({"error": "invalid session", "error_code": "InvalidSession"}),
        );
    }

    pub fn push_error(&self, error: TransportError) {
        self.script.lock().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<BasicRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next(&self, request: BasicRequest) -> Result<Response, TransportError> {
        self.requests.lock().push(request);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".to_string())))
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn round_trip(&self, request: BasicRequest) -> Result<Response, TransportError> {
        let outcome = self.next(request);
        if self.yielding {
            tokio::task::yield_now().await;
        }
        outcome
    }

    async fn stream(&self, request: BasicRequest) -> Result<StreamOpening, TransportError> {
        if !self.streaming {
            return Err(TransportError::StreamingNotSupported);
        }
        let response = self.next(request)?;
        if !response.status.is_success() {
            return Ok(StreamOpening::Refused(response));
        }
        let events = EventParser::new().feed(&response.body_text());
        Ok(StreamOpening::Open(Box::new(ReplayStream {
            events: events.into(),
            open: true,
        })))
    }
}

struct ReplayStream {
    events: VecDeque<StreamEvent>,
    open: bool,
}

#[async_trait]
impl EventStream for ReplayStream {
    async fn next_event(&mut self) -> Option<Result<StreamEvent, TransportError>> {
        if !self.open {
            return None;
        }
        let event = self.events.pop_front();
        if event.is_none() {
            self.open = false;
        }
        event.map(Ok)
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Registry storage kept in memory, counting saves.
#[derive(Default)]
pub struct MemoryStorage {
    registry: Mutex<UserRegistry>,
    saves: AtomicUsize,
    fail_saves: std::sync::atomic::AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: UserRegistry) -> Self {
        Self {
            registry: Mutex::new(registry),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> UserRegistry {
        self.registry.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStorage for MemoryStorage {
    async fn load(&self) -> Result<UserRegistry, StorageError> {
        Ok(self.registry.lock().clone())
    }

    async fn save(&self, registry: &UserRegistry) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.registry.lock() = registry.clone();
        Ok(())
    }
}

/// A clock pinned to a fixed instant.
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new() -> Self {
        Self(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Login response body for a user.
pub fn login_body(user_id: &str, device_id: &str, access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "user_id": user_id,
        "device_id": device_id,
        "access_token": access,
        "refresh_token": refresh,
    })
}
