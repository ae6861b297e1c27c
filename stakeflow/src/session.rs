//! Wallet session: account access and network negotiation.

use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::Address;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::NetworkConfig;
use crate::error::{FlowError, Result};
use crate::utils::{parse_address, parse_quantity, short_address};
use crate::wallet::events::WalletEvent;
use crate::wallet::{rpc, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    WrongNetwork,
    SwitchingNetwork,
    Ready,
    Error,
}

/// Snapshot of the wallet session.
///
/// `account` is only ever set while `status` is [`SessionStatus::Ready`].
/// `epoch` increments on every connect and every reset, so state derived
/// from one session can be told apart from the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    account: Option<Address>,
    chain_id: Option<u64>,
    status: SessionStatus,
    epoch: u64,
    fault: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            account: None,
            chain_id: None,
            status: SessionStatus::Disconnected,
            epoch: 0,
            fault: None,
        }
    }
}

impl Session {
    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Reason for the last `Error` status.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }

    /// The connected account, or `NotConnected` unless the session is ready.
    pub fn ready_account(&self) -> Result<Address> {
        match (self.status, self.account) {
            (SessionStatus::Ready, Some(account)) => Ok(account),
            _ => Err(FlowError::NotConnected),
        }
    }
}

/// What a wallet notification did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    /// Still ready, now acting for a different account.
    AccountSwitched(Address),
    /// Wallet disconnected; session-derived caches must be dropped.
    Disconnected,
    /// Chain changed under us; everything must be rebuilt from a fresh connect.
    ReloadRequired,
    /// Accounts reappeared while the session was down; connect again.
    ReconnectRequired,
}

/// Owns the wallet connection and publishes [`Session`] snapshots.
pub struct ChainSession<P> {
    provider: Option<Arc<P>>,
    network: NetworkConfig,
    state: watch::Sender<Session>,
    history: Mutex<Vec<SessionStatus>>,
}

impl<P: WalletProvider> ChainSession<P> {
    /// `provider` is `None` when no wallet is available at all.
    pub fn new(provider: Option<Arc<P>>, network: NetworkConfig) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            provider,
            network,
            state,
            history: Mutex::new(vec![SessionStatus::Disconnected]),
        }
    }

    pub fn provider(&self) -> Option<&Arc<P>> {
        self.provider.as_ref()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that observes every session update.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn current_account(&self) -> Option<Address> {
        self.state.borrow().account
    }

    pub fn current_chain_id(&self) -> Option<u64> {
        self.state.borrow().chain_id
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    /// Every status the session has passed through, oldest first.
    pub fn history(&self) -> Vec<SessionStatus> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn transition(&self, status: SessionStatus, apply: impl FnOnce(&mut Session)) {
        let mut changed = false;
        self.state.send_modify(|s| {
            changed = s.status != status;
            s.status = status;
            apply(s);
            if status != SessionStatus::Ready {
                s.account = None;
            }
        });
        if changed {
            info!(?status, "session status");
            self.history
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(status);
        }
    }

    /// Request account access and bring the wallet onto the expected chain.
    ///
    /// On success the session is `Ready`. Network negotiation failures leave
    /// it in `Error`; an empty account list leaves it `Disconnected`.
    pub async fn connect(&self) -> Result<Session> {
        let Some(provider) = self.provider.as_ref().map(Arc::clone) else {
            warn!("no wallet provider available");
            return Err(FlowError::NoProvider);
        };

        self.transition(SessionStatus::Connecting, |s| {
            s.chain_id = None;
            s.fault = None;
        });

        match self.negotiate(provider.as_ref()).await {
            Ok((account, chain_id)) => {
                self.transition(SessionStatus::Ready, |s| {
                    s.account = Some(account);
                    s.chain_id = Some(chain_id);
                    s.epoch += 1;
                });
                info!(account = %short_address(&account), chain_id, "wallet connected");
                Ok(self.snapshot())
            }
            Err(FlowError::NotConnected) => {
                self.transition(SessionStatus::Disconnected, |s| s.epoch += 1);
                Err(FlowError::NotConnected)
            }
            Err(e) => {
                warn!(error = %e, "wallet connection failed");
                self.transition(SessionStatus::Error, |s| s.fault = Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn negotiate(&self, provider: &P) -> Result<(Address, u64)> {
        let accounts = rpc::request_accounts(provider).await?;
        let account = *accounts.first().ok_or(FlowError::NotConnected)?;

        let expected = self.network.chain_id;
        let chain_id = rpc::chain_id(provider).await?;
        if chain_id == expected {
            return Ok((account, chain_id));
        }

        warn!(chain_id, expected, "wallet on wrong network");
        self.transition(SessionStatus::WrongNetwork, |s| s.chain_id = Some(chain_id));
        self.transition(SessionStatus::SwitchingNetwork, |_| {});
        self.switch_network(provider).await?;

        let chain_id = rpc::chain_id(provider).await?;
        self.state.send_modify(|s| s.chain_id = Some(chain_id));
        if chain_id != expected {
            return Err(FlowError::WrongNetworkPersists {
                expected,
                actual: chain_id,
            });
        }
        Ok((account, chain_id))
    }

    async fn switch_network(&self, provider: &P) -> Result<()> {
        match rpc::switch_chain(provider, &self.network).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                info!(
                    chain = %self.network.chain_name,
                    chain_id = self.network.chain_id,
                    "chain unknown to wallet, adding it"
                );
                rpc::add_chain(provider, &self.network)
                    .await
                    .map_err(|e| FlowError::NetworkSwitchFailed(e.detail()))
            }
            Err(e) => Err(FlowError::NetworkSwitchFailed(e.detail())),
        }
    }

    /// Drop the session, e.g. on user logout.
    pub fn disconnect(&self) {
        self.transition(SessionStatus::Disconnected, |s| {
            s.chain_id = None;
            s.fault = None;
            s.epoch += 1;
        });
    }

    /// Apply an `accountsChanged` notification.
    pub fn on_accounts_changed(&self, accounts: &[String]) -> SessionChange {
        let Some(first) = accounts.first() else {
            info!("wallet disconnected");
            self.disconnect();
            return SessionChange::Disconnected;
        };

        let Some(account) = parse_address(first) else {
            warn!(account = %first, "ignoring invalid account from wallet");
            return SessionChange::Unchanged;
        };

        let current = self.snapshot();
        if !current.is_ready() {
            info!(account = %short_address(&account), "wallet account available, reconnect required");
            return SessionChange::ReconnectRequired;
        }
        if current.account == Some(account) {
            return SessionChange::Unchanged;
        }

        self.state.send_modify(|s| s.account = Some(account));
        info!(account = %short_address(&account), "wallet account switched");
        SessionChange::AccountSwitched(account)
    }

    /// Apply a `chainChanged` notification: always a hard reset.
    pub fn on_chain_changed(&self, chain_id: &str) -> SessionChange {
        let parsed = parse_quantity(chain_id).ok();
        info!(chain_id, "wallet chain changed, reload required");
        self.transition(SessionStatus::Disconnected, |s| {
            s.chain_id = parsed;
            s.fault = None;
            s.epoch += 1;
        });
        SessionChange::ReloadRequired
    }

    pub fn handle_event(&self, event: &WalletEvent) -> SessionChange {
        match event {
            WalletEvent::AccountsChanged(accounts) => self.on_accounts_changed(accounts),
            WalletEvent::ChainChanged(chain_id) => self.on_chain_changed(chain_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_is_disconnected() {
        let session = Session::default();
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert_eq!(session.account(), None);
        assert!(matches!(session.ready_account(), Err(FlowError::NotConnected)));
    }

    #[test]
    fn test_ready_account() {
        let account = Address::repeat_byte(0xaa);
        let session = Session {
            account: Some(account),
            chain_id: Some(56),
            status: SessionStatus::Ready,
            epoch: 1,
            fault: None,
        };
        assert_eq!(session.ready_account().unwrap(), account);
    }
}
