use serde_json::Value;
use tokio::sync::broadcast;

/// Push notification from the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Authorized accounts changed; empty means the wallet disconnected.
    AccountsChanged(Vec<String>),
    /// Active chain changed (hex chain id).
    ChainChanged(String),
}

/// Which wallet notification a subscription carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletEventKind {
    AccountsChanged,
    ChainChanged,
}

impl WalletEventKind {
    pub const ALL: [WalletEventKind; 2] =
        [WalletEventKind::AccountsChanged, WalletEventKind::ChainChanged];

    /// Name used by `eth_subscribe` and EIP-1193 `on(...)`.
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletEventKind::AccountsChanged => "accountsChanged",
            WalletEventKind::ChainChanged => "chainChanged",
        }
    }

    /// Build the event from a notification payload.
    pub fn parse(&self, payload: &Value) -> Option<WalletEvent> {
        match self {
            WalletEventKind::AccountsChanged => {
                let accounts = payload
                    .as_array()?
                    .iter()
                    .filter_map(|a| a.as_str().map(str::to_string))
                    .collect();
                Some(WalletEvent::AccountsChanged(accounts))
            }
            WalletEventKind::ChainChanged => {
                payload.as_str().map(|c| WalletEvent::ChainChanged(c.to_string()))
            }
        }
    }
}

/// Subscription to wallet notifications.
pub struct WalletEventSubscription {
    rx: broadcast::Receiver<WalletEvent>,
}

impl WalletEventSubscription {
    pub fn new(rx: broadcast::Receiver<WalletEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event. Returns `None` if the channel is closed.
    pub async fn next(&mut self) -> Option<WalletEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("wallet event subscription lagged by {n} messages");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
