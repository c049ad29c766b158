//! Stream-side state: the subscription set, the last tick per code,
//! and the transport health flag.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};

use dashboard_core::{ConnectionState, DashboardError, MarketTick, TickStream};

pub struct StreamReconciler {
    stream: Arc<dyn TickStream>,
    subscribed: Mutex<HashSet<String>>,
    last_tick: DashMap<String, MarketTick>,
    state: RwLock<ConnectionState>,
}

impl StreamReconciler {
    pub fn new(stream: Arc<dyn TickStream>) -> Self {
        Self {
            stream,
            subscribed: Mutex::new(HashSet::new()),
            last_tick: DashMap::new(),
            state: RwLock::new(ConnectionState::Connecting),
        }
    }

    /// Reconcile the subscription set against the desired one. Only the
    /// delta goes over the wire; an identical set issues no calls.
    /// Each wire call that succeeds is committed to the set before the
    /// next one, so a later failure never causes a re-send of codes
    /// already on the wire.
    pub async fn sync_subscription(
        &self,
        desired: &HashSet<String>,
    ) -> Result<(), DashboardError> {
        let mut current = self.subscribed.lock().await;
        let to_add: Vec<String> = desired.difference(&current).cloned().collect();
        let to_remove: Vec<String> = current.difference(desired).cloned().collect();
        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(());
        }

        if !to_add.is_empty() {
            self.stream.subscribe(&to_add).await?;
            current.extend(to_add.iter().cloned());
        }
        if !to_remove.is_empty() {
            self.stream.unsubscribe(&to_remove).await?;
            for code in &to_remove {
                current.remove(code);
            }
        }
        tracing::debug!(
            "Subscription synced: +{} -{} ({} total)",
            to_add.len(),
            to_remove.len(),
            current.len()
        );
        Ok(())
    }

    /// Remember the latest tick for a code. Last write wins; replays of
    /// the same tick are harmless.
    pub fn apply_tick(&self, tick: MarketTick) {
        self.last_tick.insert(tick.code.clone(), tick);
    }

    pub fn last_tick(&self, code: &str) -> Option<MarketTick> {
        self.last_tick.get(code).map(|t| t.clone())
    }

    /// Track a transport state change. On reconnect the full current
    /// set is re-issued so the server sees it from scratch.
    pub async fn on_transport(&self, state: ConnectionState) -> Result<(), DashboardError> {
        *self.state.write().await = state;
        match state {
            ConnectionState::Open => {
                let codes: Vec<String> = self.subscribed.lock().await.iter().cloned().collect();
                if !codes.is_empty() {
                    tracing::info!("Stream open, re-subscribing {} codes", codes.len());
                    self.stream.subscribe(&codes).await?;
                }
            }
            ConnectionState::Degraded => {
                tracing::warn!("Stream degraded, rows frozen at last values");
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_realtime(&self) -> bool {
        self.state.read().await.is_realtime()
    }
}
