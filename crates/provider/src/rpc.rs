//! Multi-endpoint JSON-RPC dispatcher with failover and response caching.
//!
//! ```ignore
//! let registry = EndpointRegistry::parse(&["https://a.example", "https://b.example"])?;
//! let dispatcher = RpcDispatcher::http(registry, &ClientConfig::default())?;
//! let slot: u64 = dispatcher.call_as("getSlot", json!([]), None).await?;
//! ```

use crate::cache::ResponseCache;
use crate::transport::{HttpTransport, RpcTransport};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use vantage_core::config::{ClientConfig, DispatcherConfig};
use vantage_core::error::{VantageError, VantageResult};
use vantage_core::{CacheTier, Endpoint, EndpointRegistry};

/// Where a successful result should be cached, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub key: String,
    pub tier: CacheTier,
}

impl CachePolicy {
    pub fn new(key: impl Into<String>, tier: CacheTier) -> Self {
        Self {
            key: key.into(),
            tier,
        }
    }
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub attempts: u64,
    /// Attempts that failed and moved on to another endpoint.
    pub failovers: u64,
    /// Calls that ran out of endpoints.
    pub exhausted: u64,
}

#[derive(Default)]
struct Counters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    attempts: AtomicU64,
    failovers: AtomicU64,
    exhausted: AtomicU64,
}

/// Issues logical RPC calls across an endpoint pool.
///
/// Each call walks the ring once, starting at the endpoint that last
/// succeeded for *any* call on this instance. Attempts are sequential and
/// individually time-bounded; a failure always advances to the next
/// endpoint, so a dead endpoint can cost at most one attempt per call.
pub struct RpcDispatcher {
    registry: EndpointRegistry,
    transport: Arc<dyn RpcTransport>,
    cache: ResponseCache<Value>,
    config: DispatcherConfig,
    last_success: AtomicUsize,
    next_id: AtomicU64,
    counters: Counters,
}

impl RpcDispatcher {
    pub fn new(
        registry: EndpointRegistry,
        transport: Arc<dyn RpcTransport>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            cache: ResponseCache::new(config.cache.clone()),
            config: config.dispatcher.clone(),
            last_success: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    /// Dispatcher over the default `reqwest` transport.
    pub fn http(registry: EndpointRegistry, config: &ClientConfig) -> VantageResult<Self> {
        let transport = HttpTransport::new(config.dispatcher.request_timeout)?;
        Ok(Self::new(registry, Arc::new(transport), config))
    }

    /// Performs one logical call.
    ///
    /// # Errors
    ///
    /// `AllEndpointsFailed` after every endpoint was tried once, carrying the
    /// last underlying failure.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        cache: Option<CachePolicy>,
    ) -> VantageResult<Value> {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        if let Some(policy) = &cache {
            if let Some(hit) = self.cache.get(&policy.key) {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(method, key = %policy.key, "cache hit");
                return Ok(hit);
            }
        }

        let total = self.registry.len();
        let start = self.last_success.load(Ordering::Acquire) % total;
        let mut last_error = None;

        for offset in 0..total {
            let index = (start + offset) % total;
            let endpoint = self.registry.get(index);
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let body = json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            });

            self.counters.attempts.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(method, endpoint = %endpoint, attempt = offset + 1, "dispatching");

            match self.attempt(endpoint, &body).await {
                Ok(result) => {
                    self.last_success.store(index, Ordering::Release);
                    if let Some(policy) = cache {
                        self.cache.set(policy.key, result.clone(), policy.tier);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if offset + 1 < total {
                        self.counters.failovers.fetch_add(1, Ordering::Relaxed);
                    }
                    tracing::warn!(method, endpoint = %endpoint, error = %e, "endpoint failed");
                    last_error = Some(e);
                }
            }
        }

        self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
        let last = last_error
            .unwrap_or_else(|| VantageError::Internal("no endpoint attempted".into()));
        tracing::error!(method, attempts = total, error = %last, "all endpoints failed");
        Err(VantageError::AllEndpointsFailed {
            attempts: total,
            last: Box::new(last),
        })
    }

    /// [`call`](Self::call) followed by typed decoding of the result.
    ///
    /// A result that does not decode is a `Decode` error, not an endpoint
    /// failure: the node answered.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        cache: Option<CachePolicy>,
    ) -> VantageResult<T> {
        let value = self.call(method, params, cache).await?;
        serde_json::from_value(value)
            .map_err(|e| VantageError::Decode(format!("{method}: unexpected result shape: {e}")))
    }

    async fn attempt(&self, endpoint: &Endpoint, body: &Value) -> VantageResult<Value> {
        let timeout = self.config.request_timeout;
        let envelope = tokio::time::timeout(timeout, self.transport.send(endpoint, body))
            .await
            .map_err(|_| VantageError::Timeout {
                url: endpoint.url.clone(),
                after_ms: timeout.as_millis() as u64,
            })??;
        unwrap_envelope(envelope)
    }

    /// Index of the endpoint the next call starts from.
    pub fn last_success(&self) -> usize {
        self.last_success.load(Ordering::Acquire)
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ResponseCache<Value> {
        &self.cache
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            attempts: self.counters.attempts.load(Ordering::Relaxed),
            failovers: self.counters.failovers.load(Ordering::Relaxed),
            exhausted: self.counters.exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Splits `{result}` from `{error: {code, message}}`.
fn unwrap_envelope(mut envelope: Value) -> VantageResult<Value> {
    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(VantageError::Rpc { code, message });
    }
    match envelope.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(VantageError::Transport(
            "response carries neither result nor error".into(),
        )),
    }
}
