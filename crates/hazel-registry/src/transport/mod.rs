//! HTTP transport with composable retry and rate-limit middleware.
//!
//! A pipeline is a stack of middleware around a base transport, each
//! implementing the same one-method [`Transport`] trait. Layers are listed
//! outermost-first when building: `.with_retry(..).with_rate_limit(..)`
//! retries around the rate limiter, so every retry attempt waits for its
//! dispatch slot.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hazel_core::error::{HazelError, HazelResult};

#[cfg(test)]
pub(crate) mod mock;

/// Default per-request timeout owned by the base transport
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client identifier sent with every request
pub const USER_AGENT: &str = "hazel/0.1.0";

/// Per-request options carried through the pipeline
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Headers appended to the request, in order
    pub headers: Vec<(String, String)>,
    /// Caller-supplied cancellation, merged with the transport timeout
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new(headers: Vec<(String, String)>, cancel: Option<CancellationToken>) -> Self {
        Self { headers, cancel }
    }
}

/// One-capability transport seam; middleware wrap values of this trait
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a GET and return the raw response body
    async fn get(&self, url: &str, options: &RequestOptions) -> HazelResult<String>;
}

/// Configuration for exponential backoff retry
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before retry `n` is `base_delay * 2^n`
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Retries transient failures: connection errors and 5xx responses.
/// A success or non-retryable error returns immediately; exhausting the
/// attempt budget returns the last error observed.
pub struct RetryMiddleware {
    inner: Arc<dyn Transport>,
    config: RetryConfig,
}

impl RetryMiddleware {
    pub fn new(inner: Arc<dyn Transport>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Transport for RetryMiddleware {
    async fn get(&self, url: &str, options: &RequestOptions) -> HazelResult<String> {
        let mut last_error = None;
        for attempt in 0..self.config.max_attempts.max(1) {
            match self.inner.get(url, options).await {
                Ok(body) => return Ok(body),
                Err(error) => {
                    let retryable = error.is_retryable();
                    last_error = Some(error);
                    if !retryable || attempt + 1 == self.config.max_attempts.max(1) {
                        break;
                    }
                    let delay = self.config.base_delay * 2u32.pow(attempt);
                    debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(last_error.unwrap_or_else(|| HazelError::network("retry loop ended without an error")))
    }
}

/// Enforces a minimum spacing between successive dispatches.
///
/// One shared last-dispatch timestamp serializes every request through
/// this pipeline instance, including the legs of a concurrent
/// multi-source fan-out. An early arrival reserves the next free slot and
/// sleeps for the remainder.
pub struct RateLimitMiddleware {
    inner: Arc<dyn Transport>,
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RateLimitMiddleware {
    pub fn new(inner: Arc<dyn Transport>, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Transport for RateLimitMiddleware {
    async fn get(&self, url: &str, options: &RequestOptions) -> HazelResult<String> {
        let wait = {
            let mut last = self.last_dispatch.lock();
            let now = Instant::now();
            let dispatch_at = match *last {
                Some(previous) => (previous + self.min_interval).max(now),
                None => now,
            };
            *last = Some(dispatch_at);
            dispatch_at.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            debug!(url, wait_ms = wait.as_millis() as u64, "rate limit spacing");
            tokio::time::sleep(wait).await;
        }
        self.inner.get(url, options).await
    }
}

/// Base transport over a pooled reqwest client.
///
/// Owns the request timeout and merges it with the caller's cancellation
/// token; whichever fires first aborts the request, and both listeners
/// are dropped when the call returns on any path.
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new() -> HazelResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> HazelResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .gzip(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HazelError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, options: &RequestOptions) -> HazelResult<String> {
        let mut request = self.client.get(url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| map_send_error(&e, self.timeout))?;
            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse().ok());
                return Err(error_for_status(status, retry_after, url));
            }
            // An empty body is an empty string, never a failure
            response
                .text()
                .await
                .map_err(|e| HazelError::network(format!("Failed to read response body: {e}")))
        };

        let timed = tokio::time::timeout(self.timeout, exchange);
        match options.cancel.as_ref() {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(HazelError::Cancelled),
                outcome = timed => outcome.map_err(|_| timeout_error(self.timeout))?,
            },
            None => timed.await.map_err(|_| timeout_error(self.timeout))?,
        }
    }
}

fn timeout_error(timeout: Duration) -> HazelError {
    HazelError::Timeout {
        elapsed_ms: timeout.as_millis() as u64,
    }
}

fn map_send_error(error: &reqwest::Error, timeout: Duration) -> HazelError {
    if error.is_timeout() {
        timeout_error(timeout)
    } else {
        HazelError::network(format!("Request failed: {error}"))
    }
}

/// Map a non-2xx status to the error taxonomy
fn error_for_status(status: u16, retry_after: Option<u64>, url: &str) -> HazelError {
    match status {
        401 | 403 => HazelError::AuthRequired {
            hint: format!("The feed at {url} rejected the request (status {status})"),
        },
        429 => HazelError::RateLimited { retry_after },
        _ => HazelError::api(status, format!("GET {url} failed")),
    }
}

/// Entry point for the rest of the crate: a composed middleware stack
/// with typed body accessors.
#[derive(Clone)]
pub struct HttpPipeline {
    transport: Arc<dyn Transport>,
}

impl HttpPipeline {
    /// Wrap a transport with no additional middleware
    pub fn bare(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute a GET and return the raw body
    pub async fn get(&self, url: &str, options: &RequestOptions) -> HazelResult<String> {
        self.transport.get(url, options).await
    }

    /// Execute a GET and decode the body as JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> HazelResult<T> {
        let body = self.get(url, options).await?;
        serde_json::from_str(&body)
            .map_err(|e| HazelError::parse(format!("Invalid JSON from {url}: {e}")))
    }

    /// Execute a GET and return the body verbatim as text
    pub async fn get_text(&self, url: &str, options: &RequestOptions) -> HazelResult<String> {
        self.get(url, options).await
    }
}

impl fmt::Debug for HttpPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HttpPipeline")
    }
}

/// Builds a pipeline; the first layer added is the outermost wrapper
pub struct PipelineBuilder {
    base: Arc<dyn Transport>,
    layers: Vec<Layer>,
}

enum Layer {
    Retry(RetryConfig),
    RateLimit(Duration),
}

impl PipelineBuilder {
    pub fn new(base: Arc<dyn Transport>) -> Self {
        Self {
            base,
            layers: Vec::new(),
        }
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.layers.push(Layer::Retry(config));
        self
    }

    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.layers.push(Layer::RateLimit(min_interval));
        self
    }

    pub fn build(self) -> HttpPipeline {
        let mut transport = self.base;
        for layer in self.layers.into_iter().rev() {
            transport = match layer {
                Layer::Retry(config) => Arc::new(RetryMiddleware::new(transport, config)),
                Layer::RateLimit(interval) => Arc::new(RateLimitMiddleware::new(transport, interval)),
            };
        }
        HttpPipeline { transport }
    }
}
