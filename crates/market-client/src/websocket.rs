//! Streaming tick feed over WebSocket. Decoded events fan out through
//! a broadcast channel; the connection reconnects with a delay and
//! re-issues the full subscription set from scratch (no partial resume).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex, Notify};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use dashboard_core::{ConnectionState, DashboardError, MarketTick, StreamEvent, TickStream};

const RECONNECT_DELAY_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    Tick(MarketTick),
    Status { message: String },
}

enum Command {
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
}

pub struct MarketSocket {
    url: String,
    tx: broadcast::Sender<StreamEvent>,
    subscriptions: Arc<Mutex<HashSet<String>>>,
    commands: mpsc::Sender<Command>,
    command_rx: Mutex<Option<mpsc::Receiver<Command>>>,
    shutdown: Arc<Notify>,
}

impl MarketSocket {
    pub fn new(url: impl Into<String>) -> (Self, broadcast::Receiver<StreamEvent>) {
        let (tx, rx) = broadcast::channel(1024);
        let (commands, command_rx) = mpsc::channel(128);
        let socket = Self {
            url: url.into(),
            tx,
            subscriptions: Arc::new(Mutex::new(HashSet::new())),
            commands,
            command_rx: Mutex::new(Some(command_rx)),
            shutdown: Arc::new(Notify::new()),
        };
        (socket, rx)
    }

    pub fn sender(&self) -> broadcast::Sender<StreamEvent> {
        self.tx.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    pub async fn subscribed_codes(&self) -> HashSet<String> {
        self.subscriptions.lock().await.clone()
    }

    /// Connect-and-stream loop. Runs until shutdown; each reconnect
    /// re-subscribes the full current set.
    pub async fn run(&self) {
        let mut command_rx = match self.command_rx.lock().await.take() {
            Some(rx) => rx,
            None => {
                tracing::error!("MarketSocket::run called twice");
                return;
            }
        };

        loop {
            let _ = self.tx.send(StreamEvent::State(ConnectionState::Connecting));
            match self.connect_and_stream(&mut command_rx).await {
                Ok(()) => {
                    let _ = self.tx.send(StreamEvent::State(ConnectionState::Closed));
                    tracing::info!("Market stream closed");
                    return;
                }
                Err(e) => {
                    let _ = self.tx.send(StreamEvent::State(ConnectionState::Degraded));
                    tracing::warn!(
                        "Market stream error: {}, reconnecting in {}s",
                        e,
                        RECONNECT_DELAY_SECS
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(std::time::Duration::from_secs(RECONNECT_DELAY_SECS)) => {},
                        _ = self.shutdown.notified() => {
                            let _ = self.tx.send(StreamEvent::State(ConnectionState::Closed));
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn connect_and_stream(
        &self,
        command_rx: &mut mpsc::Receiver<Command>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (ws_stream, _) = connect_async(&self.url).await?;
        let (mut write, mut read) = ws_stream.split();
        tracing::info!("Connected to market stream at {}", self.url);
        let _ = self.tx.send(StreamEvent::State(ConnectionState::Open));

        // Full re-subscribe on every (re)connect
        let subs = self.subscriptions.lock().await;
        if !subs.is_empty() {
            let codes: Vec<&String> = subs.iter().collect();
            let frame = serde_json::json!({"action": "subscribe", "codes": codes});
            write.send(Message::Text(frame.to_string())).await?;
            tracing::info!("Subscribed to {} codes", subs.len());
        }
        drop(subs);

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_message(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Err("connection closed by peer".into());
                        }
                        Some(Err(e)) => {
                            return Err(Box::new(e));
                        }
                        _ => {}
                    }
                }
                Some(cmd) = command_rx.recv() => {
                    let frame = match cmd {
                        Command::Subscribe(codes) => {
                            serde_json::json!({"action": "subscribe", "codes": codes})
                        }
                        Command::Unsubscribe(codes) => {
                            serde_json::json!({"action": "unsubscribe", "codes": codes})
                        }
                    };
                    write.send(Message::Text(frame.to_string())).await?;
                }
                _ = self.shutdown.notified() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    fn handle_message(&self, text: &str) {
        match serde_json::from_str::<WireMessage>(text) {
            Ok(WireMessage::Tick(tick)) => {
                let _ = self.tx.send(StreamEvent::Tick(tick));
            }
            Ok(WireMessage::Status { message }) => {
                tracing::debug!("Market stream status: {}", message);
            }
            Err(e) => {
                tracing::debug!("Unparseable stream message: {}", e);
            }
        }
    }
}

#[async_trait]
impl TickStream for MarketSocket {
    async fn subscribe(&self, codes: &[String]) -> Result<(), DashboardError> {
        let added: Vec<String> = {
            let mut subs = self.subscriptions.lock().await;
            codes
                .iter()
                .filter(|c| subs.insert((*c).clone()))
                .cloned()
                .collect()
        };
        if !added.is_empty() {
            self.commands
                .send(Command::Subscribe(added))
                .await
                .map_err(|e| DashboardError::Stream(e.to_string()))?;
        }
        Ok(())
    }

    async fn unsubscribe(&self, codes: &[String]) -> Result<(), DashboardError> {
        let removed: Vec<String> = {
            let mut subs = self.subscriptions.lock().await;
            codes
                .iter()
                .filter(|c| subs.remove(c.as_str()))
                .cloned()
                .collect()
        };
        if !removed.is_empty() {
            self.commands
                .send(Command::Unsubscribe(removed))
                .await
                .map_err(|e| DashboardError::Stream(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_messages_decode() {
        let json = r#"{
            "type": "tick",
            "code": "005930",
            "price": 70500.0,
            "change_amount": 500.0,
            "change_percent": 0.71,
            "volume": 125000.0,
            "trading_value": 8.8e9,
            "timestamp": 1700000000000
        }"#;
        match serde_json::from_str::<WireMessage>(json).unwrap() {
            WireMessage::Tick(tick) => {
                assert_eq!(tick.code, "005930");
                assert_eq!(tick.price, 70_500.0);
                assert_eq!(tick.trading_value, Some(8.8e9));
            }
            other => panic!("expected tick, got {:?}", other),
        }
    }

    #[test]
    fn status_messages_decode() {
        let json = r#"{"type": "status", "message": "authenticated"}"#;
        assert!(matches!(
            serde_json::from_str::<WireMessage>(json).unwrap(),
            WireMessage::Status { .. }
        ));
    }

    #[tokio::test]
    async fn subscription_set_tracks_membership() {
        let (socket, _rx) = MarketSocket::new("ws://localhost:9/stream");
        let codes = vec!["005930".to_string(), "000660".to_string()];
        socket.subscribe(&codes).await.unwrap();
        assert_eq!(socket.subscribed_codes().await.len(), 2);

        // Re-subscribing the same codes is a no-op on the set
        socket.subscribe(&codes).await.unwrap();
        assert_eq!(socket.subscribed_codes().await.len(), 2);

        socket.unsubscribe(&codes[..1].to_vec()).await.unwrap();
        let subs = socket.subscribed_codes().await;
        assert_eq!(subs.len(), 1);
        assert!(subs.contains("000660"));
    }
}
