//! Purchase attempts: validate, gate on allowance, submit, confirm.

use alloy_primitives::Address;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::allowance::{AllowanceGate, AllowanceState, GateDecision};
use crate::catalog::PackageCatalog;
use crate::contracts::{SaleContract, SettlementToken};
use crate::error::{FlowError, Result};
use crate::referral::ReferralCandidate;
use crate::session::Session;
use crate::slot::WriteSlot;
use crate::types::{Package, TxReceipt};
use crate::utils::short_address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PurchaseStage {
    Idle,
    Validating,
    AllowanceChecked,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
}

impl PurchaseStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseStage::Succeeded | PurchaseStage::Failed)
    }
}

/// Arguments of one `buyPackage` call. Built fresh for every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurchaseIntent {
    pub package_id: u64,
    pub referrer: Address,
    pub account: Address,
}

/// A confirmed purchase.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub intent: PurchaseIntent,
    pub receipt: TxReceipt,
    /// Allowance after the purchase, for display only.
    pub allowance_after: Option<AllowanceState>,
    /// The wallet session changed while the transaction was in flight.
    pub session_changed: bool,
}

/// Drives purchase attempts against one sale contract.
///
/// Attempts never retry and never approve on their own. Each call to
/// [`purchase`](Self::purchase) starts again at `Validating` with fresh reads.
pub struct PurchaseOrchestrator<'a, S, T> {
    sale: &'a S,
    token: &'a T,
    slot: &'a WriteSlot,
    stage: PurchaseStage,
    stages: Vec<PurchaseStage>,
}

impl<'a, S: SaleContract, T: SettlementToken> PurchaseOrchestrator<'a, S, T> {
    pub fn new(sale: &'a S, token: &'a T, slot: &'a WriteSlot) -> Self {
        Self {
            sale,
            token,
            slot,
            stage: PurchaseStage::Idle,
            stages: vec![PurchaseStage::Idle],
        }
    }

    pub fn stage(&self) -> PurchaseStage {
        self.stage
    }

    /// Stages of the latest attempt, starting at `Idle`.
    pub fn stages(&self) -> &[PurchaseStage] {
        &self.stages
    }

    fn enter(&mut self, stage: PurchaseStage) {
        self.stage = stage;
        self.stages.push(stage);
    }

    /// Run one purchase attempt for `package_id`.
    pub async fn purchase(
        &mut self,
        session: &watch::Receiver<Session>,
        catalog: &PackageCatalog,
        package_id: u64,
        referral: &ReferralCandidate,
    ) -> Result<PurchaseReceipt> {
        self.stage = PurchaseStage::Idle;
        self.stages = vec![PurchaseStage::Idle];

        let result = self.run(session, catalog, package_id, referral).await;
        match &result {
            Ok(done) => {
                self.enter(PurchaseStage::Succeeded);
                info!(
                    package_id = done.intent.package_id,
                    block = done.receipt.block_number,
                    "purchase succeeded"
                );
            }
            Err(e) => {
                let failed_at = self.stage;
                self.enter(PurchaseStage::Failed);
                warn!(package_id, stage = ?failed_at, error = %e, "purchase failed");
            }
        }
        result
    }

    async fn run(
        &mut self,
        session: &watch::Receiver<Session>,
        catalog: &PackageCatalog,
        package_id: u64,
        referral: &ReferralCandidate,
    ) -> Result<PurchaseReceipt> {
        self.enter(PurchaseStage::Validating);
        let snapshot = session.borrow().clone();
        let (intent, package) = validate(&snapshot, catalog, package_id, referral)?;

        let spender = self.sale.address();
        let gate = AllowanceGate::new(self.token, self.slot);
        let allowance = gate.read(intent.account, spender).await?;
        self.enter(PurchaseStage::AllowanceChecked);
        if allowance.decide(package.required_in) == GateDecision::Insufficient {
            return Err(FlowError::AllowanceInsufficient {
                allowance: allowance.amount,
                required: package.required_in,
            });
        }

        let guard = self.slot.try_acquire()?;
        self.enter(PurchaseStage::Submitting);
        info!(
            package_id = intent.package_id,
            referrer = %short_address(&intent.referrer),
            account = %short_address(&intent.account),
            "submitting purchase"
        );
        let pending = self
            .sale
            .buy_package(intent.account, intent.package_id, intent.referrer)
            .await
            .map_err(classify_submit_error)?;

        self.enter(PurchaseStage::Confirming);
        let receipt = self.sale.confirm(&pending).await?;
        drop(guard);

        let current = session.borrow().clone();
        let session_changed =
            current.epoch() != snapshot.epoch() || current.account() != Some(intent.account);
        if session_changed {
            warn!(hash = %receipt.hash, "wallet session changed while the purchase was in flight");
        }

        let allowance_after = match gate.read(intent.account, spender).await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "allowance refresh after purchase failed");
                None
            }
        };

        Ok(PurchaseReceipt {
            intent,
            receipt,
            allowance_after,
            session_changed,
        })
    }
}

/// Checks that need no chain access.
fn validate(
    session: &Session,
    catalog: &PackageCatalog,
    package_id: u64,
    referral: &ReferralCandidate,
) -> Result<(PurchaseIntent, Package)> {
    let account = session.ready_account()?;
    if catalog.epoch() != session.epoch() {
        return Err(FlowError::StaleCatalog);
    }
    let package = *catalog
        .get(package_id)
        .ok_or(FlowError::PackageNotFound(package_id))?;
    if !package.active {
        return Err(FlowError::PackageInactive(package_id));
    }

    let intent = PurchaseIntent {
        package_id: package.id,
        referrer: referral.for_account(account),
        account,
    };
    Ok((intent, package))
}

fn classify_submit_error(err: FlowError) -> FlowError {
    match err {
        FlowError::Provider(e) if e.is_user_rejected() => FlowError::UserRejected(e.detail()),
        FlowError::Provider(e) => {
            FlowError::TransactionFailed(e.revert_reason().unwrap_or_else(|| e.detail()))
        }
        other => other,
    }
}
