use std::str::FromStr;

use alloy_primitives::{Address, Bytes, B256};
use serde::Deserialize;

use crate::error::{FlowError, Result};
use crate::utils::parse_quantity;

/// A transaction accepted by the wallet but not yet known to be included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: B256,
    pub from: Address,
    pub to: Address,
    pub input: Bytes,
}

/// Inclusion result of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: B256,
    pub block_number: u64,
    pub success: bool,
}

/// `eth_getTransactionReceipt` result as it comes off the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    /// Post-Byzantium status; `None` for pre-Byzantium receipts.
    pub status: Option<String>,
}

impl TryFrom<RawReceipt> for TxReceipt {
    type Error = FlowError;

    fn try_from(raw: RawReceipt) -> Result<Self> {
        let hash = B256::from_str(&raw.transaction_hash)
            .map_err(|e| FlowError::Validation(format!("invalid transaction hash: {e}")))?;
        let block_number = raw
            .block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .ok_or_else(|| FlowError::Validation("receipt without block number".into()))?;
        let success = match raw.status.as_deref() {
            Some(status) => parse_quantity(status)? == 1,
            None => true,
        };
        Ok(Self {
            hash,
            block_number,
            success,
        })
    }
}
