use alloy_primitives::U256;
use thiserror::Error;

use crate::wallet::ProviderError;

/// Fallback message when a failed transaction carries no revert reason.
pub const GENERIC_TX_FAILURE: &str = "transaction failed";

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("no wallet provider detected")]
    NoProvider,

    #[error("wallet is still on chain {actual}, expected chain {expected}")]
    WrongNetworkPersists { expected: u64, actual: u64 },

    #[error("could not switch the wallet network, switch to the expected chain manually: {0}")]
    NetworkSwitchFailed(String),

    #[error("no packages available")]
    NoPackagesAvailable,

    #[error("package not found: {0}")]
    PackageNotFound(u64),

    #[error("package {0} is inactive")]
    PackageInactive(u64),

    #[error("allowance {allowance} is below the required {required}, approve first")]
    AllowanceInsufficient { allowance: U256, required: U256 },

    #[error("approval failed: {0}")]
    ApprovalFailed(String),

    #[error("user rejected the request: {0}")]
    UserRejected(String),

    #[error("{0}")]
    TransactionFailed(String),

    #[error("wallet not connected")]
    NotConnected,

    #[error("package catalog belongs to an earlier session, reload required")]
    StaleCatalog,

    #[error("another wallet write is still pending")]
    WriteInFlight,

    #[error("timed out waiting for confirmation of {0}")]
    ConfirmationTimeout(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("ABI error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),
}

impl FlowError {
    /// Failures detected before any chain-mutating call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FlowError::NotConnected
                | FlowError::PackageInactive(_)
                | FlowError::PackageNotFound(_)
                | FlowError::AllowanceInsufficient { .. }
                | FlowError::StaleCatalog
                | FlowError::WriteInFlight
        )
    }

    /// Best human-readable detail, preferring the provider's own message.
    pub fn detail(&self) -> String {
        match self {
            FlowError::Provider(e) => e.detail(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
