//! Scripted in-memory transport for unit tests.
//!
//! Supports two modes used together: a FIFO script consumed first
//! (exact response sequences for retry and candidate-probing tests) and
//! substring-matched routes (multi-URL flows like paginated metadata).
//! Every call is recorded with its URL and headers.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use hazel_core::error::{HazelError, HazelResult};

use super::{RequestOptions, Transport};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<HazelResult<String>>>,
    routes: Mutex<Vec<(String, HazelResult<String>)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the next response; the script takes priority over routes
    pub fn enqueue(&self, result: HazelResult<String>) {
        self.script.lock().push_back(result);
    }

    pub fn enqueue_json(&self, value: serde_json::Value) {
        self.enqueue(Ok(value.to_string()));
    }

    /// Serve `result` for any URL containing `url_part`
    pub fn route(&self, url_part: &str, result: HazelResult<String>) {
        self.routes.lock().push((url_part.to_string(), result));
    }

    pub fn route_json(&self, url_part: &str, value: serde_json::Value) {
        self.route(url_part, Ok(value.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.url.clone()).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, options: &RequestOptions) -> HazelResult<String> {
        self.calls.lock().push(RecordedCall {
            url: url.to_string(),
            headers: options.headers.clone(),
        });

        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        for (part, result) in self.routes.lock().iter() {
            if url.contains(part.as_str()) {
                return result.clone();
            }
        }
        Err(HazelError::api(404, format!("no scripted response for {url}")))
    }
}
