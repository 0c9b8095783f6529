//! How the search surface reaches the backend.

use crate::config::ClientConfig;
use crate::protocol::{GotoRequest, SearchResult};
use crate::{AttachmentSearchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use url::Url;

/// Sends protocol requests for the search surface.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
    async fn goto(&self, request: &GotoRequest) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// JSON-RPC transport against the backend's `/rpc` endpoint.
pub struct RpcTransport {
    http: Client,
    endpoint: Url,
    next_id: AtomicU64,
}

impl RpcTransport {
    /// `base_url` is the backend root, e.g. `http://127.0.0.1:5123`.
    pub fn new(base_url: &str) -> Result<Self> {
        let endpoint = Url::parse(base_url)?.join("rpc")?;
        let http = Client::builder()
            .timeout(ClientConfig::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AttachmentSearchError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                status_code: None,
            })?;
        Ok(Self {
            http,
            endpoint,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("RPC call {} (id {})", method, id);

        let reply: RpcReply = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = reply.error {
            return Err(AttachmentSearchError::Host {
                message: format!("{} failed ({}): {}", method, error.code, error.message),
            });
        }
        Ok(serde_json::from_value(reply.result.unwrap_or(Value::Null))?)
    }
}

#[async_trait]
impl SearchTransport for RpcTransport {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.call("search", json!({ "query": query })).await
    }

    async fn goto(&self, request: &GotoRequest) -> Result<()> {
        let _: Value = self.call("goto", serde_json::to_value(request)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_rpc_path() {
        let transport = RpcTransport::new("http://127.0.0.1:5123").unwrap();
        assert_eq!(transport.endpoint().as_str(), "http://127.0.0.1:5123/rpc");
    }

    #[test]
    fn test_reply_with_error() {
        let reply: RpcReply = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"Missing required parameter: query"}}"#,
        )
        .unwrap();
        assert!(reply.result.is_none());
        assert_eq!(reply.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let transport = RpcTransport::new("http://127.0.0.1:9").unwrap();
        let err = transport.search("x").await.unwrap_err();
        assert!(matches!(err, AttachmentSearchError::Network { .. }));
    }
}
