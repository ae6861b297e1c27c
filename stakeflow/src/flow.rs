//! [`StakeFlow`] ties the session, catalog, allowance gate, referral and
//! purchase orchestrator together behind the actions a front end exposes:
//! connect, select, approve, buy, share link, and wallet notifications.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::info;

use crate::allowance::{AllowanceGate, AllowanceState, ApprovalOutcome, GateDecision};
use crate::catalog::PackageCatalog;
use crate::config::FlowConfig;
use crate::contracts::{AutoStakeSale, ConfirmSettings, Erc20Token, SaleContract};
use crate::error::{FlowError, Result};
use crate::purchase::{PurchaseOrchestrator, PurchaseReceipt, PurchaseStage};
use crate::referral::{self, ReferralCandidate};
use crate::session::{ChainSession, Session, SessionChange};
use crate::slot::WriteSlot;
use crate::types::Package;
use crate::utils::short_address;
use crate::wallet::events::WalletEvent;
use crate::wallet::WalletProvider;

/// Contract bindings over the session's wallet provider.
pub struct Bindings<P> {
    pub token: Erc20Token<P>,
    pub sale: AutoStakeSale<P>,
}

/// Allowance against the selected package's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowanceView {
    pub state: AllowanceState,
    pub required: U256,
    pub decision: GateDecision,
}

/// Everything a front end needs to render the current state.
#[derive(Debug, Clone)]
pub struct FlowSnapshot {
    pub session: Session,
    pub packages: Vec<Package>,
    pub selected: Option<u64>,
    pub referrer: Address,
}

pub struct StakeFlow<P> {
    config: FlowConfig,
    session: ChainSession<P>,
    bindings: Option<Bindings<P>>,
    catalog: PackageCatalog,
    selected: Option<u64>,
    referral: ReferralCandidate,
    page_url: Option<String>,
    slot: WriteSlot,
    last_stages: Vec<PurchaseStage>,
}

impl<P: WalletProvider> StakeFlow<P> {
    /// `page_url` is the link the user arrived through, if any.
    pub fn new(config: FlowConfig, provider: Option<Arc<P>>, page_url: Option<&str>) -> Result<Self> {
        config.validate()?;

        let settings = ConfirmSettings::from(&config);
        let bindings = provider.as_ref().map(|p| Bindings {
            token: Erc20Token::new(Arc::clone(p), config.addresses.settlement_token, settings),
            sale: AutoStakeSale::new(Arc::clone(p), config.addresses.sale, settings),
        });

        let referral = page_url
            .map(ReferralCandidate::from_link)
            .unwrap_or_else(ReferralCandidate::none);
        if referral.is_present() {
            info!(
                referrer = %short_address(&referral.resolved),
                "referral found in link, applied at purchase"
            );
        }

        Ok(Self {
            session: ChainSession::new(provider, config.network.clone()),
            config,
            bindings,
            catalog: PackageCatalog::empty(),
            selected: None,
            referral,
            page_url: page_url.map(str::to_owned),
            slot: WriteSlot::new(),
            last_stages: Vec::new(),
        })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn session(&self) -> &ChainSession<P> {
        &self.session
    }

    pub fn catalog(&self) -> &PackageCatalog {
        &self.catalog
    }

    pub fn referral(&self) -> &ReferralCandidate {
        &self.referral
    }

    /// Stages of the most recent purchase attempt.
    pub fn last_purchase_stages(&self) -> &[PurchaseStage] {
        &self.last_stages
    }

    fn bindings(&self) -> Result<&Bindings<P>> {
        self.bindings.as_ref().ok_or(FlowError::NoProvider)
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let session = self.session.snapshot();
        let referrer = match session.account() {
            Some(account) => self.referral.for_account(account),
            None => self.referral.resolved,
        };
        FlowSnapshot {
            session,
            packages: self.catalog.packages().to_vec(),
            selected: self.selected,
            referrer,
        }
    }

    /// Connect the wallet, then load the package catalog for the new session.
    ///
    /// An empty catalog is not an error here; see
    /// [`PackageCatalog::ensure_available`].
    pub async fn connect(&mut self) -> Result<FlowSnapshot> {
        self.catalog = PackageCatalog::empty();
        self.selected = None;

        let session = self.session.connect().await?;
        let catalog = PackageCatalog::load(&self.bindings()?.sale, session.epoch()).await?;
        self.selected = catalog.select_default().map(|p| p.id);
        self.catalog = catalog;
        Ok(self.snapshot())
    }

    pub fn selected_package(&self) -> Option<&Package> {
        self.selected.and_then(|id| self.catalog.get(id))
    }

    pub fn select_package(&mut self, id: u64) -> Result<Package> {
        let package = *self.catalog.get(id).ok_or(FlowError::PackageNotFound(id))?;
        self.selected = Some(id);
        Ok(package)
    }

    /// Current allowance compared with the selected package's price.
    pub async fn allowance_view(&self) -> Result<AllowanceView> {
        let account = self.session.snapshot().ready_account()?;
        let package = self.selected_package().ok_or(FlowError::NoPackagesAvailable)?;
        let bindings = self.bindings()?;

        let gate = AllowanceGate::new(&bindings.token, &self.slot);
        let state = gate.read(account, bindings.sale.address()).await?;
        Ok(AllowanceView {
            state,
            required: package.required_in,
            decision: state.decide(package.required_in),
        })
    }

    /// Grant the sale contract a maximal allowance.
    pub async fn approve(&self) -> Result<ApprovalOutcome> {
        let account = self.session.snapshot().ready_account()?;
        let bindings = self.bindings()?;
        AllowanceGate::new(&bindings.token, &self.slot)
            .approve(account, bindings.sale.address())
            .await
    }

    /// Buy `package_id`, or the selected package when `None`.
    pub async fn buy(&mut self, package_id: Option<u64>) -> Result<PurchaseReceipt> {
        let id = package_id
            .or(self.selected)
            .ok_or(FlowError::NoPackagesAvailable)?;
        let bindings = self.bindings.as_ref().ok_or(FlowError::NoProvider)?;
        let session = self.session.subscribe();

        let mut orchestrator = PurchaseOrchestrator::new(&bindings.sale, &bindings.token, &self.slot);
        let result = orchestrator
            .purchase(&session, &self.catalog, id, &self.referral)
            .await;
        self.last_stages = orchestrator.stages().to_vec();
        result
    }

    /// Shareable link crediting the connected account.
    ///
    /// The base is `base_url`, else the configured share URL, else the page
    /// the user arrived through.
    pub fn referral_link(&self, base_url: Option<&str>) -> Result<String> {
        let account = self.session.snapshot().ready_account()?;
        let base = base_url
            .or(self.config.share_base_url.as_deref())
            .or(self.page_url.as_deref())
            .ok_or_else(|| FlowError::Config("no base URL for referral links".into()))?;
        referral::build_link(base, account)
    }

    /// Apply a wallet notification, dropping session-derived state as needed.
    pub fn handle_event(&mut self, event: &WalletEvent) -> SessionChange {
        let change = self.session.handle_event(event);
        if matches!(
            change,
            SessionChange::Disconnected
                | SessionChange::ReloadRequired
                | SessionChange::ReconnectRequired
        ) {
            self.catalog = PackageCatalog::empty();
            self.selected = None;
        }
        change
    }
}
