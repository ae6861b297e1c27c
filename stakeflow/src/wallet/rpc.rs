//! Typed helpers over the raw EIP-1193 request channel.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{ProviderError, WalletProvider};
use crate::config::NetworkConfig;
use crate::error::{FlowError, Result, GENERIC_TX_FAILURE};
use crate::types::{PendingTx, RawReceipt, TxReceipt};
use crate::utils::{checksum, decode_hex, parse_address, parse_quantity, to_quantity};

#[derive(Debug, Serialize)]
struct TransactionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    to: String,
    data: String,
}

impl TransactionRequest {
    fn new(from: Option<Address>, to: Address, data: &[u8]) -> Self {
        Self {
            from: from.as_ref().map(checksum),
            to: checksum(&to),
            data: format!("0x{}", hex::encode(data)),
        }
    }
}

fn expect_str(value: &Value, method: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FlowError::Validation(format!("{method}: expected a string, got {value}")))
}

/// `eth_requestAccounts`: prompt for access and return the authorized accounts.
pub async fn request_accounts<P: WalletProvider>(provider: &P) -> Result<Vec<Address>> {
    let value = provider.request("eth_requestAccounts", json!([])).await?;
    let raw: Vec<String> = serde_json::from_value(value)?;
    raw.iter()
        .map(|a| {
            parse_address(a)
                .ok_or_else(|| FlowError::Validation(format!("wallet returned invalid account {a}")))
        })
        .collect()
}

/// `eth_chainId`.
pub async fn chain_id<P: WalletProvider>(provider: &P) -> Result<u64> {
    let value = provider.request("eth_chainId", json!([])).await?;
    parse_quantity(&expect_str(&value, "eth_chainId")?)
}

/// `wallet_switchEthereumChain` to the configured network.
pub async fn switch_chain<P: WalletProvider>(
    provider: &P,
    network: &NetworkConfig,
) -> std::result::Result<(), ProviderError> {
    provider
        .request("wallet_switchEthereumChain", network.switch_params())
        .await
        .map(|_| ())
}

/// `wallet_addEthereumChain` with the full network descriptor.
pub async fn add_chain<P: WalletProvider>(
    provider: &P,
    network: &NetworkConfig,
) -> std::result::Result<(), ProviderError> {
    provider
        .request("wallet_addEthereumChain", network.add_params())
        .await
        .map(|_| ())
}

/// `eth_call` against `to`, at `block` or `latest`.
pub async fn call<P: WalletProvider>(
    provider: &P,
    from: Option<Address>,
    to: Address,
    data: &[u8],
    block: Option<u64>,
) -> Result<Bytes> {
    let tag = block.map(to_quantity).unwrap_or_else(|| "latest".into());
    let params = json!([TransactionRequest::new(from, to, data), tag]);
    let value = provider.request("eth_call", params).await?;
    let encoded = expect_str(&value, "eth_call")?;
    Ok(Bytes::from(decode_hex(&encoded)?))
}

/// `eth_sendTransaction`: the wallet signs, prompts and broadcasts.
pub async fn send_transaction<P: WalletProvider>(
    provider: &P,
    from: Address,
    to: Address,
    input: Bytes,
) -> Result<PendingTx> {
    let params = json!([TransactionRequest::new(Some(from), to, &input)]);
    let value = provider.request("eth_sendTransaction", params).await?;
    let hash = B256::from_str(&expect_str(&value, "eth_sendTransaction")?)
        .map_err(|e| FlowError::Validation(format!("invalid transaction hash: {e}")))?;
    debug!(%hash, "transaction submitted");
    Ok(PendingTx {
        hash,
        from,
        to,
        input,
    })
}

/// `eth_getTransactionReceipt`; `None` while the transaction is pending.
pub async fn transaction_receipt<P: WalletProvider>(
    provider: &P,
    hash: B256,
) -> Result<Option<TxReceipt>> {
    let value = provider
        .request("eth_getTransactionReceipt", json!([hash.to_string()]))
        .await?;
    if value.is_null() {
        return Ok(None);
    }
    let raw: RawReceipt = serde_json::from_value(value)?;
    TxReceipt::try_from(raw).map(Some)
}

/// Re-run a mined transaction as a call to recover its revert reason.
pub async fn replay_revert_reason<P: WalletProvider>(
    provider: &P,
    tx: &PendingTx,
    block: u64,
) -> Option<String> {
    match call(provider, Some(tx.from), tx.to, &tx.input, Some(block)).await {
        Ok(_) => None,
        Err(FlowError::Provider(e)) => e.revert_reason(),
        Err(e) => {
            debug!(error = %e, "revert replay failed");
            None
        }
    }
}

/// Poll until `tx` is included.
///
/// A reverted transaction yields `FlowError::TransactionFailed` carrying the
/// contract's revert reason when it can be recovered.
pub async fn wait_for_receipt<P: WalletProvider>(
    provider: &P,
    tx: &PendingTx,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> Result<TxReceipt> {
    let deadline = timeout.map(|t| tokio::time::Instant::now() + t);

    loop {
        if let Some(receipt) = transaction_receipt(provider, tx.hash).await? {
            if receipt.success {
                info!(hash = %tx.hash, block = receipt.block_number, "transaction confirmed");
                return Ok(receipt);
            }

            let reason = replay_revert_reason(provider, tx, receipt.block_number).await;
            warn!(hash = %tx.hash, block = receipt.block_number, ?reason, "transaction reverted");
            return Err(FlowError::TransactionFailed(
                reason.unwrap_or_else(|| GENERIC_TX_FAILURE.to_string()),
            ));
        }

        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                return Err(FlowError::ConfirmationTimeout(tx.hash.to_string()));
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
}
