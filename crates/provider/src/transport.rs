//! The network hop under the dispatcher.
//!
//! `RpcTransport` sends one JSON body to one endpoint and hands back the raw
//! response envelope. Failover, timeouts and envelope interpretation live in
//! the dispatcher, so tests swap in scripted transports here.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;
use vantage_core::error::{VantageError, VantageResult};
use vantage_core::Endpoint;

#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn send(&self, endpoint: &Endpoint, body: &Value) -> VantageResult<Value>;
}

/// `reqwest`-backed transport. Connection pooling is shared across endpoints.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// `timeout` is a backstop; the dispatcher enforces its own per-attempt
    /// bound as well.
    pub fn new(timeout: Duration) -> VantageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VantageError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, endpoint: &Endpoint, body: &Value) -> VantageResult<Value> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| VantageError::InvalidInput(format!("Failed to serialize request: {e}")))?;

        let mut request = self
            .client
            .post(endpoint.url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        for (name, value) in &endpoint.auth_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| VantageError::Transport(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VantageError::Transport(format!(
                "{endpoint} returned HTTP {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| VantageError::Transport(format!("{endpoint}: invalid JSON body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn posts_json_with_endpoint_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("content-type", "application/json")
            .match_header("x-api-key", "secret")
            .match_body(Matcher::PartialJson(json!({"method": "getSlot"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":123}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let endpoint = Endpoint::new(server.url()).with_header("x-api-key", "secret");
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": "getSlot", "params": []});

        let envelope = transport.send(&endpoint, &body).await.unwrap();
        assert_eq!(envelope["result"], json!(123));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_status_is_a_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(429)
            .create_async()
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport
            .send(&Endpoint::new(server.url()), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, VantageError::Transport(ref m) if m.contains("429")), "{err}");
    }
}
