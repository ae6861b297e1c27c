use std::sync::Arc;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;

use super::{ConfirmSettings, IAutoStakeSale, SaleContract};
use crate::error::{FlowError, Result};
use crate::types::{PackageTerms, PendingTx, TxReceipt};
use crate::wallet::{rpc, WalletProvider};

/// Binding for the package sale / auto-stake contract.
#[derive(Debug)]
pub struct AutoStakeSale<P> {
    provider: Arc<P>,
    address: Address,
    settings: ConfirmSettings,
}

impl<P: WalletProvider> AutoStakeSale<P> {
    pub fn new(provider: Arc<P>, address: Address, settings: ConfirmSettings) -> Self {
        Self {
            provider,
            address,
            settings,
        }
    }

    async fn view(&self, data: Vec<u8>) -> Result<Bytes> {
        rpc::call(self.provider.as_ref(), None, self.address, &data, None).await
    }
}

impl<P: WalletProvider> SaleContract for AutoStakeSale<P> {
    fn address(&self) -> Address {
        self.address
    }

    async fn package_count(&self) -> Result<u64> {
        let out = self.view(IAutoStakeSale::packageCountCall {}.abi_encode()).await?;
        let count = IAutoStakeSale::packageCountCall::abi_decode_returns(&out, true)?._0;
        u64::try_from(count)
            .map_err(|_| FlowError::Validation(format!("package count out of range: {count}")))
    }

    async fn package(&self, index: u64) -> Result<PackageTerms> {
        let call = IAutoStakeSale::packagesCall {
            index: U256::from(index),
        };
        let out = self.view(call.abi_encode()).await?;
        let decoded = IAutoStakeSale::packagesCall::abi_decode_returns(&out, true)?;
        Ok(PackageTerms {
            required_in: decoded.usdtIn,
            mint_out: decoded.mtecOut,
            active: decoded.active,
        })
    }

    async fn buy_package(&self, from: Address, package_id: u64, referrer: Address) -> Result<PendingTx> {
        let data = IAutoStakeSale::buyPackageCall {
            packageId: U256::from(package_id),
            referrer,
        }
        .abi_encode();
        rpc::send_transaction(self.provider.as_ref(), from, self.address, Bytes::from(data)).await
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
