//! Scripted transport for exercising the loader and sync service without a
//! server.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;
use crate::response::RawResponse;
use crate::transport::{Endpoint, Transport};

type Scripted = Result<RawResponse, FetchError>;

/// A transport that replays scripted responses per endpoint name.
///
/// Responses queued for an endpoint are returned in order; the last one is
/// repeated once the queue is down to it. Unscripted endpoints answer 404.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<HashMap<&'static str, VecDeque<Scripted>>>,
    requests: Mutex<Vec<Endpoint>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response or failure for `endpoint` (see [`Endpoint::name`]).
    pub fn respond(self, endpoint: &'static str, response: Scripted) -> Self {
        lock(&self.script)
            .entry(endpoint)
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a 200 `application/json` response.
    pub fn json(self, endpoint: &'static str, body: Value) -> Self {
        self.respond(endpoint, Ok(RawResponse::json(body.to_string())))
    }

    /// Queue a bare status with an empty JSON body.
    pub fn status(self, endpoint: &'static str, status: u16) -> Self {
        self.respond(
            endpoint,
            Ok(RawResponse::new(status, Some("application/json"), "{}")),
        )
    }

    /// Queue a transport-level failure.
    pub fn network_error(self, endpoint: &'static str) -> Self {
        self.respond(endpoint, Err(FetchError::Network("connection reset".into())))
    }

    /// Sleep this long before answering every request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Endpoint> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|e| e.name() == endpoint)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, endpoint: &Endpoint) -> Result<RawResponse, FetchError> {
        lock(&self.requests).push(endpoint.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = lock(&self.script);
        match script.get_mut(endpoint.name()) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> Scripted {
    Ok(RawResponse::new(404, Some("application/json"), "{}"))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
