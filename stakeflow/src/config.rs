//! Network, contract and display configuration.

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{FlowError, Result};
use crate::utils::to_quantity;

/// Native currency entry of an `wallet_addEthereumChain` descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// The chain the sale contract lives on, in the shape wallets expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

impl NetworkConfig {
    /// BNB Smart Chain mainnet.
    pub fn bsc_mainnet() -> Self {
        Self {
            chain_id: 56,
            chain_name: "BNB Smart Chain".into(),
            rpc_urls: vec!["https://bsc-dataseed.binance.org/".into()],
            native_currency: NativeCurrency {
                name: "BNB".into(),
                symbol: "BNB".into(),
                decimals: 18,
            },
            block_explorer_urls: vec!["https://bscscan.com".into()],
        }
    }

    /// Chain id as a hex quantity (`0x38`).
    pub fn chain_id_hex(&self) -> String {
        to_quantity(self.chain_id)
    }

    /// Parameter object for `wallet_switchEthereumChain`.
    pub fn switch_params(&self) -> Value {
        json!([{ "chainId": self.chain_id_hex() }])
    }

    /// Parameter object for `wallet_addEthereumChain`.
    pub fn add_params(&self) -> Value {
        json!([{
            "chainId": self.chain_id_hex(),
            "chainName": self.chain_name,
            "rpcUrls": self.rpc_urls,
            "nativeCurrency": self.native_currency,
            "blockExplorerUrls": self.block_explorer_urls,
        }])
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::bsc_mainnet()
    }
}

/// Deployed contract addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAddresses {
    /// Sale/stake contract; also the spender of the settlement token.
    pub sale: Address,
    pub settlement_token: Address,
}

/// Token decimals used only for human-readable amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDecimals {
    pub settlement: u8,
    pub stake: u8,
}

impl Default for TokenDecimals {
    fn default() -> Self {
        Self {
            settlement: 18,
            stake: 18,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

/// Full client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    pub addresses: ContractAddresses,
    #[serde(default)]
    pub decimals: TokenDecimals,
    /// Interval between receipt polls while a transaction is pending.
    #[serde(default = "default_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Give up waiting for inclusion after this long; `None` waits indefinitely.
    #[serde(default)]
    pub confirmation_timeout_ms: Option<u64>,
    /// Base URL for shareable referral links.
    #[serde(default)]
    pub share_base_url: Option<String>,
}

impl FlowConfig {
    /// Config for the given contracts on the default network.
    pub fn new(addresses: ContractAddresses) -> Self {
        Self {
            network: NetworkConfig::default(),
            addresses,
            decimals: TokenDecimals::default(),
            receipt_poll_interval_ms: default_poll_interval_ms(),
            confirmation_timeout_ms: None,
            share_base_url: None,
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FlowError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    /// Reject configs the flow cannot run against.
    pub fn validate(&self) -> Result<()> {
        if self.network.chain_id == 0 {
            return Err(FlowError::Config("network.chainId must be non-zero".into()));
        }
        if self.network.rpc_urls.is_empty() {
            return Err(FlowError::Config("network.rpcUrls must not be empty".into()));
        }
        if self.addresses.sale.is_zero() {
            return Err(FlowError::Config("addresses.sale is not set".into()));
        }
        if self.addresses.settlement_token.is_zero() {
            return Err(FlowError::Config(
                "addresses.settlementToken is not set".into(),
            ));
        }
        if self.receipt_poll_interval_ms == 0 {
            return Err(FlowError::Config(
                "receiptPollIntervalMs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_ms.map(Duration::from_millis)
    }
}
