pub mod allowance;
pub mod catalog;
pub mod config;
pub mod contracts;
pub mod error;
pub mod flow;
pub mod purchase;
pub mod referral;
pub mod session;
pub mod slot;
pub mod types;
pub mod utils;
pub mod wallet;

// ---- Top-level re-exports for ergonomic usage ----

// Facade
pub use flow::{AllowanceView, FlowSnapshot, StakeFlow};

// Config + errors
pub use config::{ContractAddresses, FlowConfig, NetworkConfig, TokenDecimals};
pub use error::{FlowError, Result};

// Session
pub use session::{ChainSession, Session, SessionChange, SessionStatus};

// Packages
pub use catalog::PackageCatalog;
pub use types::{Package, PackageTerms};

// Allowance + purchase
pub use allowance::{AllowanceGate, AllowanceState, ApprovalOutcome, GateDecision};
pub use purchase::{PurchaseIntent, PurchaseOrchestrator, PurchaseReceipt, PurchaseStage};
pub use slot::WriteSlot;

// Referral
pub use referral::ReferralCandidate;

// Contracts
pub use contracts::{AutoStakeSale, ConfirmSettings, Erc20Token, SaleContract, SettlementToken};

// Transactions
pub use types::{PendingTx, TxReceipt};

// Wallet transport
pub use wallet::events::{WalletEvent, WalletEventKind, WalletEventSubscription};
pub use wallet::http::HttpWalletProvider;
pub use wallet::ws::WalletEventStream;
pub use wallet::{ProviderError, WalletProvider};
