use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;

use super::{ConfirmSettings, SettlementToken, IERC20};
use crate::error::Result;
use crate::types::{PendingTx, TxReceipt};
use crate::wallet::{rpc, WalletProvider};

/// ERC-20 binding that reads through `eth_call` and writes through the wallet.
#[derive(Debug)]
pub struct Erc20Token<P> {
    provider: Arc<P>,
    address: Address,
    settings: ConfirmSettings,
}

impl<P: WalletProvider> Erc20Token<P> {
    pub fn new(provider: Arc<P>, address: Address, settings: ConfirmSettings) -> Self {
        Self {
            provider,
            address,
            settings,
        }
    }
}

impl<P: WalletProvider> SettlementToken for Erc20Token<P> {
    fn address(&self) -> Address {
        self.address
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        let data = IERC20::allowanceCall { owner, spender }.abi_encode();
        let out = rpc::call(self.provider.as_ref(), None, self.address, &data, None).await?;
        let decoded = IERC20::allowanceCall::abi_decode_returns(&out, true)?;
        Ok(decoded._0)
    }

    async fn approve(&self, owner: Address, spender: Address, amount: U256) -> Result<PendingTx> {
        let data = IERC20::approveCall { spender, amount }.abi_encode();
        rpc::send_transaction(self.provider.as_ref(), owner, self.address, Bytes::from(data)).await
    }

    async fn confirm(&self, tx: &PendingTx) -> Result<TxReceipt> {
        rpc::wait_for_receipt(
            self.provider.as_ref(),
            tx,
            self.settings.poll_interval,
            self.settings.timeout,
        )
        .await
    }
}
