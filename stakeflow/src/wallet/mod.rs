//! EIP-1193 wallet provider abstraction.
//!
//! The core talks to the wallet exclusively through [`WalletProvider::request`];
//! transports ([`http::HttpWalletProvider`], test doubles) decide how the call
//! reaches the wallet. Push notifications arrive separately as
//! [`events::WalletEvent`]s.

pub mod events;
pub mod http;
pub mod rpc;
pub mod ws;

use std::future::Future;
use std::sync::Arc;

use alloy_sol_types::{Revert, SolError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED_CODE: i64 = 4001;
/// EIP-3326: the requested chain has not been added to the wallet.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;
/// JSON-RPC internal error, used for transport-level failures.
pub const INTERNAL_ERROR_CODE: i64 = -32603;

/// An error returned by the wallet provider (`{ code, message, data }`).
#[derive(Error, Debug, Clone, PartialEq, Deserialize)]
#[error("{message} (code {code})")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// A failure that never reached the wallet (connection, HTTP status, decoding).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR_CODE, message)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The user declined the prompt (signature, switch, account access).
    pub fn is_user_rejected(&self) -> bool {
        if self.code == USER_REJECTED_CODE {
            return true;
        }
        let msg = self.message.to_ascii_lowercase();
        msg.contains("user rejected") || msg.contains("user denied")
    }

    /// The wallet does not know the chain it was asked to switch to.
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == UNRECOGNIZED_CHAIN_CODE
            || self
                .message
                .to_ascii_lowercase()
                .contains("unrecognized chain")
    }

    /// Verbatim message for display: `data.message` when the wallet nests one.
    pub fn detail(&self) -> String {
        self.data
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.message.clone())
    }

    /// Contract-supplied revert reason, if the wallet forwarded one.
    pub fn revert_reason(&self) -> Option<String> {
        let encoded = self.data.as_ref().and_then(|d| match d {
            Value::String(s) => Some(s.as_str()),
            Value::Object(_) => d.get("data").and_then(Value::as_str),
            _ => None,
        });

        if let Some(reason) = encoded.and_then(decode_revert_data) {
            return Some(reason);
        }

        let lower = self.message.to_ascii_lowercase();
        lower.find("execution reverted:").map(|idx| {
            self.message[idx + "execution reverted:".len()..]
                .trim()
                .to_string()
        })
    }
}

/// Decode ABI `Error(string)` revert data from a hex string.
pub fn decode_revert_data(encoded: &str) -> Option<String> {
    let bytes = crate::utils::decode_hex(encoded).ok()?;
    <Revert as SolError>::abi_decode(&bytes, true)
        .ok()
        .map(|r| r.reason)
        .filter(|r| !r.is_empty())
}

/// An EIP-1193 request channel to a wallet.
pub trait WalletProvider: Send + Sync {
    /// Issue one request and return the raw JSON result.
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = std::result::Result<Value, ProviderError>> + Send;
}

impl<P: WalletProvider> WalletProvider for Arc<P> {
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = std::result::Result<Value, ProviderError>> + Send {
        (**self).request(method, params)
    }
}
