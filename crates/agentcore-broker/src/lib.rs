pub mod circuit_breaker;
pub mod handler;
pub mod idempotency;
pub mod metrics;
pub mod retry;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use agentcore_types::{redact_pii, HttpMethod, SlotMap, ToolAuth, ToolObservation, ToolScope, ToolSpec, ToolStatus, ToolTransport};
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Semaphore;

use circuit_breaker::CircuitBreaker;
use handler::InternalHandler;
use idempotency::IdempotencyCache;
use metrics::{MetricsSink, NullMetricsSink};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_INFLIGHT_PER_TOOL: usize = 10;
const DEFAULT_IDEMPOTENCY_CAPACITY: usize = 10_000;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("no internal handler registered for tool '{0}'")]
    NoHandler(String),
}

pub struct ToolBrokerConfig {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_inflight_per_tool: usize,
    pub circuit_breaker_enabled: bool,
    pub idempotency_capacity: usize,
}

impl Default for ToolBrokerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 200,
            max_inflight_per_tool: DEFAULT_MAX_INFLIGHT_PER_TOOL,
            circuit_breaker_enabled: true,
            idempotency_capacity: DEFAULT_IDEMPOTENCY_CAPACITY,
        }
    }
}

/// Executes planned tool calls with idempotency, retry, circuit breaking,
/// per-tool concurrency limits and PII-safe logging (§4.4). Grounded on
/// `tool_broker.py::ToolBroker`.
pub struct ToolBroker {
    config: ToolBrokerConfig,
    http_client: reqwest::Client,
    circuit_breaker: CircuitBreaker,
    idempotency: IdempotencyCache,
    semaphores: DashMap<String, Arc<Semaphore>>,
    handlers: DashMap<String, Arc<dyn InternalHandler>>,
    metrics: Arc<dyn MetricsSink>,
}

impl ToolBroker {
    pub fn new(config: ToolBrokerConfig) -> Self {
        Self {
            circuit_breaker: CircuitBreaker::new(5, 60, 30, 1),
            idempotency: IdempotencyCache::new(config.idempotency_capacity),
            http_client: reqwest::Client::new(),
            semaphores: DashMap::new(),
            handlers: DashMap::new(),
            metrics: Arc::new(NullMetricsSink),
            config,
        }
    }

    pub fn with_metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub fn register_handler(&self, tool: impl Into<String>, handler: Arc<dyn InternalHandler>) {
        self.handlers.insert(tool.into(), handler);
    }

    fn semaphore_for(&self, tool: &str) -> Arc<Semaphore> {
        self.semaphores
            .entry(tool.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.max_inflight_per_tool)))
            .value()
            .clone()
    }

    pub async fn execute(
        &self,
        tool: &str,
        args: &SlotMap,
        workspace_id: &str,
        conversation_id: &str,
        request_id: &str,
        tool_spec: &ToolSpec,
    ) -> ToolObservation {
        let cache_key = IdempotencyCache::key(workspace_id, conversation_id, request_id, tool);
        if let Some(cached) = self.idempotency.get(&cache_key) {
            let mut observation = cached;
            observation.status = ToolStatus::Duplicate;
            observation.from_cache = true;
            return observation;
        }

        if self.config.circuit_breaker_enabled {
            let (is_open, reason) = self.circuit_breaker.is_open(workspace_id, tool);
            if is_open {
                self.metrics.record(
                    "tool_call_total",
                    1,
                    &[("tool", tool), ("workspace", workspace_id), ("result", "circuit_open")],
                );
                return self.observation(tool, args, ToolStatus::CircuitOpen, None, Some(reason), None, 0, 1, true);
            }
        }

        let permit = self.semaphore_for(tool).acquire_owned().await.expect("tool semaphore is never closed");
        let started = Instant::now();

        let redacted = redact_pii(args);
        tracing::info!(event = "tool_call_start", tool = %tool, workspace_id = %workspace_id, args = ?redacted);

        let mut attempt = 1u32;
        let retry_safe = tool_spec.retry_safe();
        let max_attempts = if retry_safe { self.config.max_retries + 1 } else { 1 };

        let observation = loop {
            let outcome = self.dispatch(tool, args, tool_spec).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                DispatchOutcome::Success(value, status_code) => {
                    if self.config.circuit_breaker_enabled {
                        self.circuit_breaker.record_success(workspace_id, tool);
                    }
                    self.metrics.record(
                        "tool_call_total",
                        1,
                        &[
                            ("tool", tool),
                            ("workspace", workspace_id),
                            ("result", "success"),
                            ("status_code", &status_code.map(|c| c.to_string()).unwrap_or_default()),
                        ],
                    );
                    break self.observation(tool, args, ToolStatus::Success, Some(value), None, status_code, elapsed_ms, attempt, false);
                }
                DispatchOutcome::Timeout => {
                    if self.config.circuit_breaker_enabled {
                        self.circuit_breaker.record_failure(workspace_id, tool);
                    }
                    if attempt < max_attempts {
                        tokio::time::sleep(retry::backoff_duration(attempt, self.config.base_backoff_ms)).await;
                        attempt += 1;
                        continue;
                    }
                    break self.observation(tool, args, ToolStatus::Timeout, None, Some("http_timeout".to_string()), Some(408), elapsed_ms, attempt, false);
                }
                DispatchOutcome::Failure(message, status_code, retry_after) => {
                    if self.config.circuit_breaker_enabled {
                        self.circuit_breaker.record_failure(workspace_id, tool);
                    }
                    let should_retry = attempt < max_attempts
                        && status_code.map(retry::is_retryable_status).unwrap_or(false);
                    if should_retry {
                        let wait = retry_after.unwrap_or_else(|| retry::backoff_duration(attempt, self.config.base_backoff_ms));
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    self.metrics.record(
                        "tool_call_total",
                        1,
                        &[
                            ("tool", tool),
                            ("workspace", workspace_id),
                            ("result", "error"),
                            ("status_code", &status_code.map(|c| c.to_string()).unwrap_or_default()),
                        ],
                    );
                    break self.observation(tool, args, ToolStatus::Failure, None, Some(message), status_code, elapsed_ms, attempt, false);
                }
            }
        };

        drop(permit);

        if observation.is_success() {
            self.idempotency.insert(cache_key, observation.clone(), tool_spec.cache_ttl_seconds());
        }

        observation
    }

    async fn dispatch(&self, tool: &str, args: &SlotMap, tool_spec: &ToolSpec) -> DispatchOutcome {
        match &tool_spec.transport {
            ToolTransport::Internal { handler } => {
                let Some(registered) = self.handlers.get(handler).map(|h| h.value().clone()) else {
                    return DispatchOutcome::Failure(format!("no internal handler registered for '{handler}'"), None, None);
                };
                match registered.call(args).await {
                    Ok(value) => DispatchOutcome::Success(value, None),
                    Err(message) => DispatchOutcome::Failure(message, Some(500), None),
                }
            }
            ToolTransport::Http { url, method, auth, .. } => self.dispatch_http(tool, url, *method, auth, args, tool_spec.timeout_ms).await,
        }
    }

    async fn dispatch_http(&self, _tool: &str, url: &str, method: HttpMethod, auth: &ToolAuth, args: &SlotMap, timeout_ms: u64) -> DispatchOutcome {
        let reqwest_method = match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        let mut request = self
            .http_client
            .request(reqwest_method, url)
            .timeout(Duration::from_millis(timeout_ms))
            .json(args);

        request = match auth {
            ToolAuth::None => request,
            ToolAuth::Bearer { token } => request.bearer_auth(token),
            ToolAuth::ApiKey { header, value } => request.header(header.as_str(), value.as_str()),
        };

        let response = match request.send().await {
            Ok(r) => r,
            Err(err) if err.is_timeout() => return DispatchOutcome::Timeout,
            Err(err) => return DispatchOutcome::Failure(err.to_string(), None, None),
        };

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(retry::parse_retry_after);

        let body_bytes = match response.bytes().await {
            Ok(b) => b,
            Err(err) => return DispatchOutcome::Failure(err.to_string(), Some(status), retry_after),
        };

        if body_bytes.len() > MAX_BODY_BYTES {
            return DispatchOutcome::Failure("response body exceeds max_body_mb guardrail".to_string(), Some(status), None);
        }

        if !(200..300).contains(&status) {
            let message = String::from_utf8_lossy(&body_bytes).to_string();
            return DispatchOutcome::Failure(message, Some(status), retry_after);
        }

        match serde_json::from_slice(&body_bytes) {
            Ok(value) => DispatchOutcome::Success(value, Some(status)),
            Err(err) => DispatchOutcome::Failure(format!("invalid JSON response: {err}"), Some(status), None),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn observation(
        &self,
        tool: &str,
        args: &SlotMap,
        status: ToolStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
        status_code: Option<u16>,
        execution_time_ms: u64,
        attempt: u32,
        circuit_breaker_tripped: bool,
    ) -> ToolObservation {
        ToolObservation {
            tool: tool.to_string(),
            args: args.clone(),
            status,
            result,
            error,
            status_code,
            execution_time_ms,
            attempt,
            from_cache: false,
            circuit_breaker_tripped,
            timestamp: Utc::now(),
        }
    }

    pub async fn close(&self) {
        self.handlers.clear();
    }
}

enum DispatchOutcome {
    Success(serde_json::Value, Option<u16>),
    Failure(String, Option<u16>, Option<Duration>),
    Timeout,
}
