//! Fixed-ABI bindings for the settlement token and the sale contract.
//!
//! The traits are what the core depends on; [`erc20::Erc20Token`] and
//! [`sale::AutoStakeSale`] implement them over a
//! [`WalletProvider`](crate::wallet::WalletProvider).

pub mod erc20;
pub mod sale;

use std::future::Future;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;

use crate::config::FlowConfig;
use crate::error::Result;
use crate::types::{PackageTerms, PendingTx, TxReceipt};

pub use erc20::Erc20Token;
pub use sale::AutoStakeSale;

sol! {
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    interface IAutoStakeSale {
        function packageCount() external view returns (uint256);
        function packages(uint256 index) external view returns (uint256 usdtIn, uint256 mtecOut, bool active);
        function buyPackage(uint256 packageId, address referrer) external;
    }
}

/// How long and how often to poll for inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmSettings {
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for ConfirmSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timeout: None,
        }
    }
}

impl From<&FlowConfig> for ConfirmSettings {
    fn from(config: &FlowConfig) -> Self {
        Self {
            poll_interval: config.receipt_poll_interval(),
            timeout: config.confirmation_timeout(),
        }
    }
}

/// The ERC-20 token purchases settle in.
pub trait SettlementToken: Send + Sync {
    fn address(&self) -> Address;

    /// Current allowance `owner` has granted `spender`.
    fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256>> + Send;

    /// Submit `approve(spender, amount)` from `owner`.
    fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> impl Future<Output = Result<PendingTx>> + Send;

    /// Wait for inclusion of a submitted transaction.
    fn confirm(&self, tx: &PendingTx) -> impl Future<Output = Result<TxReceipt>> + Send;
}

/// The sale/stake contract.
pub trait SaleContract: Send + Sync {
    fn address(&self) -> Address;

    fn package_count(&self) -> impl Future<Output = Result<u64>> + Send;

    fn package(&self, index: u64) -> impl Future<Output = Result<PackageTerms>> + Send;

    /// Submit `buyPackage(package_id, referrer)` from `from`.
    fn buy_package(
        &self,
        from: Address,
        package_id: u64,
        referrer: Address,
    ) -> impl Future<Output = Result<PendingTx>> + Send;

    fn confirm(&self, tx: &PendingTx) -> impl Future<Output = Result<TxReceipt>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;

    #[test]
    fn test_selectors() {
        // keccak256("allowance(address,address)")[..4]
        assert_eq!(IERC20::allowanceCall::SELECTOR, [0xdd, 0x62, 0xed, 0x3e]);
        // keccak256("approve(address,uint256)")[..4]
        assert_eq!(IERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
    }

    #[test]
    fn test_buy_package_encoding() {
        let referrer = Address::repeat_byte(0xaa);
        let data = IAutoStakeSale::buyPackageCall {
            packageId: U256::from(2u64),
            referrer,
        }
        .abi_encode();

        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(data[4 + 31], 2);
        assert_eq!(&data[4 + 32 + 12..], referrer.as_slice());
    }
}
