//! In-memory wallet and contract doubles with call counters.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde_json::{json, Value};
use stakeflow::types::{PackageTerms, PendingTx, TxReceipt};
use stakeflow::utils::{checksum, parse_address};
use stakeflow::{FlowError, ProviderError, Result, SaleContract, SettlementToken, WalletProvider};

pub const ALICE: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const BOB: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

pub fn addr(s: &str) -> Address {
    parse_address(s).unwrap()
}

pub fn sale_address() -> Address {
    Address::repeat_byte(0x5a)
}

pub fn token_address() -> Address {
    Address::repeat_byte(0x70)
}

pub fn terms(required_in: u64, mint_out: u64, active: bool) -> PackageTerms {
    PackageTerms {
        required_in: U256::from(required_in),
        mint_out: U256::from(mint_out),
        active,
    }
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// Scripted EIP-1193 wallet.
///
/// Answers account and chain queries from its state; `wallet_*` requests pop
/// a scripted outcome (success when the script is empty). A successful switch
/// or add moves the wallet to `chain_after_switch` when set.
pub struct MockWallet {
    pub accounts: Mutex<Vec<String>>,
    pub chain_id: Mutex<u64>,
    pub chain_after_switch: Mutex<Option<u64>>,
    pub switch_script: Mutex<VecDeque<std::result::Result<(), ProviderError>>>,
    pub add_script: Mutex<VecDeque<std::result::Result<(), ProviderError>>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockWallet {
    pub fn new(accounts: &[&str], chain_id: u64) -> Self {
        Self {
            accounts: Mutex::new(accounts.iter().map(|a| a.to_string()).collect()),
            chain_id: Mutex::new(chain_id),
            chain_after_switch: Mutex::new(None),
            switch_script: Mutex::new(VecDeque::new()),
            add_script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script_switch(&self, outcome: std::result::Result<(), ProviderError>) {
        self.switch_script.lock().unwrap().push_back(outcome);
    }

    pub fn script_add(&self, outcome: std::result::Result<(), ProviderError>) {
        self.add_script.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| *m == method).count()
    }

    fn apply_switch(&self) {
        if let Some(chain) = *self.chain_after_switch.lock().unwrap() {
            *self.chain_id.lock().unwrap() = chain;
        }
    }
}

impl WalletProvider for MockWallet {
    async fn request(&self, method: &str, _params: Value) -> std::result::Result<Value, ProviderError> {
        self.calls.lock().unwrap().push(method.to_string());
        match method {
            "eth_requestAccounts" | "eth_accounts" => Ok(json!(*self.accounts.lock().unwrap())),
            "eth_chainId" => Ok(json!(format!("0x{:x}", *self.chain_id.lock().unwrap()))),
            "wallet_switchEthereumChain" => {
                let outcome = self.switch_script.lock().unwrap().pop_front().unwrap_or(Ok(()));
                outcome.map(|()| {
                    self.apply_switch();
                    Value::Null
                })
            }
            "wallet_addEthereumChain" => {
                let outcome = self.add_script.lock().unwrap().pop_front().unwrap_or(Ok(()));
                outcome.map(|()| {
                    self.apply_switch();
                    Value::Null
                })
            }
            other => Err(ProviderError::new(-32601, format!("method {other} not supported"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

fn pending(from: Address, to: Address, nonce: u8) -> PendingTx {
    PendingTx {
        hash: B256::repeat_byte(nonce),
        from,
        to,
        input: Bytes::new(),
    }
}

fn confirmed(tx: &PendingTx) -> TxReceipt {
    TxReceipt {
        hash: tx.hash,
        block_number: 100,
        success: true,
    }
}

/// Settlement token keeping one allowance value.
pub struct MockToken {
    pub allowance: Mutex<U256>,
    pub approve_error: Mutex<Option<ProviderError>>,
    /// Revert reason to report at confirmation.
    pub confirm_revert: Mutex<Option<String>>,
    requested: Mutex<Option<U256>>,
    pub allowance_calls: AtomicUsize,
    pub approve_calls: AtomicUsize,
    pub approved_amounts: Mutex<Vec<U256>>,
}

impl MockToken {
    pub fn new(allowance: U256) -> Self {
        Self {
            allowance: Mutex::new(allowance),
            approve_error: Mutex::new(None),
            confirm_revert: Mutex::new(None),
            requested: Mutex::new(None),
            allowance_calls: AtomicUsize::new(0),
            approve_calls: AtomicUsize::new(0),
            approved_amounts: Mutex::new(Vec::new()),
        }
    }

    pub fn allowance_calls(&self) -> usize {
        self.allowance_calls.load(Ordering::SeqCst)
    }

    pub fn approve_calls(&self) -> usize {
        self.approve_calls.load(Ordering::SeqCst)
    }
}

impl SettlementToken for MockToken {
    fn address(&self) -> Address {
        token_address()
    }

    async fn allowance(&self, _owner: Address, _spender: Address) -> Result<U256> {
        self.allowance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.allowance.lock().unwrap())
    }

    async fn approve(&self, owner: Address, _spender: Address, amount: U256) -> Result<PendingTx> {
        self.approve_calls.fetch_add(1, Ordering::SeqCst);
        self.approved_amounts.lock().unwrap().push(amount);
        if let Some(e) = self.approve_error.lock().unwrap().clone() {
            return Err(FlowError::Provider(e));
        }
        *self.requested.lock().unwrap() = Some(amount);
        Ok(pending(owner, token_address(), 0xa1))
    }

    async fn confirm(&self, tx: &PendingTx) -> Result<TxReceipt> {
        if let Some(reason) = self.confirm_revert.lock().unwrap().clone() {
            return Err(FlowError::TransactionFailed(reason));
        }
        if let Some(amount) = self.requested.lock().unwrap().take() {
            *self.allowance.lock().unwrap() = amount;
        }
        Ok(confirmed(tx))
    }
}

type ConfirmHook = Box<dyn FnOnce() + Send>;

/// Sale contract over a fixed package list.
pub struct MockSale {
    pub packages: Vec<PackageTerms>,
    pub buy_error: Mutex<Option<ProviderError>>,
    /// Revert reason to report at confirmation.
    pub confirm_revert: Mutex<Option<String>>,
    /// Runs while the purchase is being confirmed.
    pub on_confirm: Mutex<Option<ConfirmHook>>,
    pub count_calls: AtomicUsize,
    pub package_calls: AtomicUsize,
    pub buys: Mutex<Vec<(Address, u64, Address)>>,
}

impl MockSale {
    pub fn new(packages: Vec<PackageTerms>) -> Self {
        Self {
            packages,
            buy_error: Mutex::new(None),
            confirm_revert: Mutex::new(None),
            on_confirm: Mutex::new(None),
            count_calls: AtomicUsize::new(0),
            package_calls: AtomicUsize::new(0),
            buys: Mutex::new(Vec::new()),
        }
    }

    pub fn buys(&self) -> Vec<(Address, u64, Address)> {
        self.buys.lock().unwrap().clone()
    }

    /// Every chain interaction, reads included.
    pub fn total_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
            + self.package_calls.load(Ordering::SeqCst)
            + self.buys.lock().unwrap().len()
    }
}

impl SaleContract for MockSale {
    fn address(&self) -> Address {
        sale_address()
    }

    async fn package_count(&self) -> Result<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.packages.len() as u64)
    }

    async fn package(&self, index: u64) -> Result<PackageTerms> {
        self.package_calls.fetch_add(1, Ordering::SeqCst);
        self.packages
            .get(index as usize)
            .copied()
            .ok_or_else(|| FlowError::TransactionFailed("index out of range".into()))
    }

    async fn buy_package(&self, from: Address, package_id: u64, referrer: Address) -> Result<PendingTx> {
        self.buys.lock().unwrap().push((from, package_id, referrer));
        if let Some(e) = self.buy_error.lock().unwrap().clone() {
            return Err(FlowError::Provider(e));
        }
        Ok(pending(from, sale_address(), 0xb1))
    }

    async fn confirm(&self, tx: &PendingTx) -> Result<TxReceipt> {
        let hook = self.on_confirm.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        if let Some(reason) = self.confirm_revert.lock().unwrap().clone() {
            return Err(FlowError::TransactionFailed(reason));
        }
        Ok(confirmed(tx))
    }
}

pub fn checksummed(address: Address) -> String {
    checksum(&address)
}
