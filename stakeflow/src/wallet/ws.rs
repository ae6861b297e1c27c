use std::collections::HashMap;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::events::{WalletEvent, WalletEventKind, WalletEventSubscription};
use crate::error::FlowError;

/// Routes `eth_subscribe` replies and `eth_subscription` notifications.
#[derive(Debug, Default)]
pub struct SubscriptionRouter {
    pending: HashMap<u64, WalletEventKind>,
    active: HashMap<String, WalletEventKind>,
}

impl SubscriptionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe requests for every wallet event kind. Resets prior state.
    pub fn subscribe_requests(&mut self) -> Vec<String> {
        self.pending.clear();
        self.active.clear();

        WalletEventKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let id = i as u64 + 1;
                self.pending.insert(id, *kind);
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "method": "eth_subscribe",
                    "params": [kind.as_str()],
                })
                .to_string()
            })
            .collect()
    }

    /// Handle one text frame; returns the event it carried, if any.
    pub fn route(&mut self, text: &str) -> Option<WalletEvent> {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => {
                error!("failed to parse wallet WebSocket message as JSON: {text}");
                return None;
            }
        };

        if let Some(id) = value.get("id").and_then(Value::as_u64) {
            if let Some(kind) = self.pending.remove(&id) {
                match value.get("result").and_then(Value::as_str) {
                    Some(sub_id) => {
                        debug!(event = kind.as_str(), sub_id, "wallet subscription active");
                        self.active.insert(sub_id.to_string(), kind);
                    }
                    None => warn!(event = kind.as_str(), "wallet refused subscription: {text}"),
                }
            }
            return None;
        }

        if value.get("method").and_then(Value::as_str) == Some("eth_subscription") {
            let params = value.get("params")?;
            let sub_id = params.get("subscription").and_then(Value::as_str)?;
            let kind = self.active.get(sub_id)?;
            return kind.parse(params.get("result")?);
        }

        debug!("unrecognized wallet WebSocket message: {text}");
        None
    }
}

/// WebSocket listener for wallet push notifications.
///
/// Keeps a persistent connection with auto-reconnect and heartbeat, and fans
/// events out through a broadcast channel.
#[derive(Debug)]
pub struct WalletEventStream {
    url: String,
    event_tx: broadcast::Sender<WalletEvent>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl WalletEventStream {
    /// Create a new stream (does not connect yet).
    pub fn new(url: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            url: url.into(),
            event_tx,
            shutdown_tx: None,
        }
    }

    pub fn subscribe(&self) -> WalletEventSubscription {
        WalletEventSubscription::new(self.event_tx.subscribe())
    }

    /// Connect and start forwarding events in the background.
    pub fn connect(&mut self) {
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let url = self.url.clone();
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let mut shutdown_rx = shutdown_rx;
            loop {
                match Self::run_connection(&url, &event_tx, &mut shutdown_rx).await {
                    Ok(()) => {
                        info!("wallet event stream closed gracefully");
                        break;
                    }
                    Err(e) => {
                        warn!("wallet event stream error: {e}, reconnecting in 3s...");
                        tokio::time::sleep(Duration::from_secs(3)).await;
                    }
                }
            }
        });
    }

    async fn run_connection(
        url: &str,
        event_tx: &broadcast::Sender<WalletEvent>,
        shutdown_rx: &mut tokio::sync::oneshot::Receiver<()>,
    ) -> std::result::Result<(), FlowError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| FlowError::WebSocket(format!("connect failed: {e}")))?;

        info!("wallet event stream connected to {url}");

        let (mut write, mut read) = ws_stream.split();

        let mut router = SubscriptionRouter::new();
        for request in router.subscribe_requests() {
            write
                .send(Message::Text(request))
                .await
                .map_err(|e| FlowError::WebSocket(format!("subscribe failed: {e}")))?;
        }

        let mut ping_interval = tokio::time::interval(Duration::from_secs(30));
        let mut pong_timeout: Option<tokio::time::Instant> = None;

        loop {
            tokio::select! {
                _ = &mut *shutdown_rx => {
                    debug!("wallet event stream shutdown requested");
                    let _ = write.close().await;
                    return Ok(());
                }
                _ = ping_interval.tick() => {
                    if let Some(deadline) = pong_timeout {
                        if tokio::time::Instant::now() > deadline {
                            return Err(FlowError::WebSocket("pong timeout".into()));
                        }
                    }
                    let _ = write.send(Message::Ping(vec![])).await;
                    pong_timeout = Some(tokio::time::Instant::now() + Duration::from_secs(10));
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = router.route(&text) {
                                let _ = event_tx.send(event);
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_timeout = None;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            return Err(FlowError::WebSocket("wallet closed connection".into()));
                        }
                        Some(Err(e)) => {
                            return Err(FlowError::WebSocket(format!("read error: {e}")));
                        }
                        None => {
                            return Err(FlowError::WebSocket("stream ended".into()));
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Close the connection.
    pub fn close(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribed_router() -> SubscriptionRouter {
        let mut router = SubscriptionRouter::new();
        let requests = router.subscribe_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].contains("accountsChanged"));
        assert!(requests[1].contains("chainChanged"));

        assert!(router
            .route(r#"{"jsonrpc":"2.0","id":1,"result":"0xacc"}"#)
            .is_none());
        assert!(router
            .route(r#"{"jsonrpc":"2.0","id":2,"result":"0xch"}"#)
            .is_none());
        router
    }

    #[test]
    fn test_routes_accounts_notification() {
        let mut router = subscribed_router();
        let event = router.route(
            r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0xacc","result":[]}}"#,
        );
        assert_eq!(event, Some(WalletEvent::AccountsChanged(vec![])));
    }

    #[test]
    fn test_routes_chain_notification() {
        let mut router = subscribed_router();
        let event = router.route(
            r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0xch","result":"0x1"}}"#,
        );
        assert_eq!(event, Some(WalletEvent::ChainChanged("0x1".into())));
    }

    #[test]
    fn test_ignores_unknown_subscription() {
        let mut router = subscribed_router();
        let event = router.route(
            r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0xother","result":"0x1"}}"#,
        );
        assert!(event.is_none());
    }

    #[test]
    fn test_refused_subscription_is_not_active() {
        let mut router = SubscriptionRouter::new();
        router.subscribe_requests();
        router.route(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"not supported"}}"#);
        let event = router.route(
            r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0xacc","result":[]}}"#,
        );
        assert!(event.is_none());
    }

    #[test]
    fn test_garbage_is_ignored() {
        let mut router = SubscriptionRouter::new();
        assert!(router.route("not json").is_none());
    }
}
