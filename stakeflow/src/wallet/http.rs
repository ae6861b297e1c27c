use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ProviderError, WalletProvider};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ProviderError>,
}

/// EIP-1193 provider speaking JSON-RPC 2.0 over HTTP to a wallet endpoint
/// (a desktop wallet's local RPC, or a node with unlocked accounts).
#[derive(Debug)]
pub struct HttpWalletProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpWalletProvider {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Get the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl WalletProvider for HttpWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(id, method, "wallet request");

        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::transport(format!("HTTP {status}: {text}")));
        }

        let decoded: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::transport(format!("invalid JSON-RPC response: {e}")))?;

        match decoded.error {
            Some(err) => {
                debug!(id, method, code = err.code, "wallet request failed");
                Err(err)
            }
            None => Ok(decoded.result.unwrap_or(Value::Null)),
        }
    }
}
