//! Server-authoritative watch-list mirror. Mutations round-trip to the
//! server and, on success only, the full list is re-fetched and swapped
//! in. Failed mutations leave local state untouched.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use dashboard_core::{
    DashboardError, MarketDataApi, MutationOutcome, WatchlistAction, WatchlistEntry,
};

pub struct WatchlistSync {
    api: Arc<dyn MarketDataApi>,
    entries: RwLock<Vec<WatchlistEntry>>,
    // Re-fetch responses landing after a newer request started are
    // discarded (last request wins).
    generation: AtomicU64,
}

impl WatchlistSync {
    pub fn new(api: Arc<dyn MarketDataApi>) -> Self {
        Self {
            api,
            entries: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace local state from a snapshot load
    pub async fn seed(&self, entries: Vec<WatchlistEntry>) {
        *self.entries.write().await = entries;
    }

    pub async fn add(&self, code: &str) -> Result<MutationOutcome, DashboardError> {
        self.mutate(code, WatchlistAction::Add).await
    }

    pub async fn remove(&self, code: &str) -> Result<MutationOutcome, DashboardError> {
        self.mutate(code, WatchlistAction::Remove).await
    }

    async fn mutate(
        &self,
        code: &str,
        action: WatchlistAction,
    ) -> Result<MutationOutcome, DashboardError> {
        let outcome = self.api.mutate_watchlist(code, action).await?;
        if !outcome.success {
            tracing::warn!("Watchlist mutation rejected for {}: {}", code, outcome.message);
            return Ok(outcome);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let fresh = self.api.fetch_watchlist().await?;

        if self.generation.load(Ordering::SeqCst) == generation {
            *self.entries.write().await = fresh;
            tracing::info!("Watchlist replaced after {:?} of {}", action, code);
        } else {
            tracing::debug!("Discarding stale watchlist re-fetch for {}", code);
        }
        Ok(outcome)
    }

    pub async fn contains(&self, code: &str) -> bool {
        self.entries.read().await.iter().any(|e| e.stock_code == code)
    }

    pub async fn entries(&self) -> Vec<WatchlistEntry> {
        self.entries.read().await.clone()
    }

    pub async fn codes(&self) -> HashSet<String> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| e.stock_code.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashboard_core::{InstrumentList, MarketOverview, SentimentCounts};
    use std::sync::Mutex as StdMutex;

    /// Server-side watch-list with a switch to fail mutations
    struct FakeWatchlistApi {
        server: StdMutex<Vec<WatchlistEntry>>,
        fail_mutations: StdMutex<bool>,
    }

    impl FakeWatchlistApi {
        fn new() -> Self {
            Self {
                server: StdMutex::new(Vec::new()),
                fail_mutations: StdMutex::new(false),
            }
        }

        fn entry(code: &str) -> WatchlistEntry {
            WatchlistEntry {
                stock_code: code.to_string(),
                stock_name: format!("{} Corp", code),
                current_price: 10_000.0,
                change_percent: None,
                market: None,
                sector: None,
            }
        }
    }

    #[async_trait]
    impl MarketDataApi for FakeWatchlistApi {
        async fn fetch_instruments(&self) -> Result<InstrumentList, DashboardError> {
            unimplemented!()
        }

        async fn fetch_market_overview(&self) -> Result<MarketOverview, DashboardError> {
            unimplemented!()
        }

        async fn fetch_watchlist(&self) -> Result<Vec<WatchlistEntry>, DashboardError> {
            Ok(self.server.lock().unwrap().clone())
        }

        async fn mutate_watchlist(
            &self,
            code: &str,
            action: WatchlistAction,
        ) -> Result<MutationOutcome, DashboardError> {
            if *self.fail_mutations.lock().unwrap() {
                return Err(DashboardError::Mutation("server rejected".to_string()));
            }
            let mut server = self.server.lock().unwrap();
            match action {
                WatchlistAction::Add => server.push(Self::entry(code)),
                WatchlistAction::Remove => server.retain(|e| e.stock_code != code),
            }
            Ok(MutationOutcome { success: true, message: "ok".to_string() })
        }

        async fn fetch_sentiment(&self, _code: &str) -> Result<SentimentCounts, DashboardError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn successful_add_replaces_local_state() {
        let api = Arc::new(FakeWatchlistApi::new());
        let sync = WatchlistSync::new(api);

        assert!(!sync.contains("005930").await);
        let outcome = sync.add("005930").await.unwrap();
        assert!(outcome.success);
        assert!(sync.contains("005930").await);
        assert_eq!(sync.codes().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_remove_leaves_membership_untouched() {
        let api = Arc::new(FakeWatchlistApi::new());
        let sync = WatchlistSync::new(api.clone());
        sync.add("005930").await.unwrap();

        *api.fail_mutations.lock().unwrap() = true;
        let result = sync.remove("005930").await;
        assert!(matches!(result, Err(DashboardError::Mutation(_))));
        assert!(sync.contains("005930").await);
    }

    /// First re-fetch snapshots the server, then parks until released,
    /// emulating a slow in-flight response.
    struct SlowFirstRefetchApi {
        server: StdMutex<Vec<WatchlistEntry>>,
        fetches: AtomicU64,
        gate: tokio::sync::Semaphore,
    }

    impl SlowFirstRefetchApi {
        fn new() -> Self {
            Self {
                server: StdMutex::new(Vec::new()),
                fetches: AtomicU64::new(0),
                gate: tokio::sync::Semaphore::new(0),
            }
        }
    }

    #[async_trait]
    impl MarketDataApi for SlowFirstRefetchApi {
        async fn fetch_instruments(&self) -> Result<InstrumentList, DashboardError> {
            unimplemented!()
        }

        async fn fetch_market_overview(&self) -> Result<MarketOverview, DashboardError> {
            unimplemented!()
        }

        async fn fetch_watchlist(&self) -> Result<Vec<WatchlistEntry>, DashboardError> {
            let snapshot = self.server.lock().unwrap().clone();
            if self.fetches.fetch_add(1, Ordering::SeqCst) == 0 {
                let _permit = self.gate.acquire().await.unwrap();
            }
            Ok(snapshot)
        }

        async fn mutate_watchlist(
            &self,
            code: &str,
            action: WatchlistAction,
        ) -> Result<MutationOutcome, DashboardError> {
            let mut server = self.server.lock().unwrap();
            match action {
                WatchlistAction::Add => server.push(FakeWatchlistApi::entry(code)),
                WatchlistAction::Remove => server.retain(|e| e.stock_code != code),
            }
            Ok(MutationOutcome { success: true, message: "ok".to_string() })
        }

        async fn fetch_sentiment(&self, _code: &str) -> Result<SentimentCounts, DashboardError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn stale_refetch_response_is_discarded() {
        let api = Arc::new(SlowFirstRefetchApi::new());
        let sync = Arc::new(WatchlistSync::new(api.clone()));

        let slow = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.add("A").await })
        };
        // Let the first mutation run until it parks inside its re-fetch
        tokio::task::yield_now().await;

        sync.add("B").await.unwrap();
        assert!(sync.contains("B").await);

        api.gate.add_permits(1);
        slow.await.unwrap().unwrap();

        // The parked response predates B and must not replace the
        // newer list
        assert!(sync.contains("B").await);
        assert!(sync.contains("A").await);
        assert_eq!(sync.codes().await.len(), 2);
    }

    #[tokio::test]
    async fn failed_mutation_does_not_refetch() {
        let api = Arc::new(FakeWatchlistApi::new());
        let sync = WatchlistSync::new(api.clone());
        sync.seed(vec![FakeWatchlistApi::entry("005930")]).await;

        // Server drops the entry out of band; a rejected mutation must
        // not pull that change in.
        api.server.lock().unwrap().clear();
        *api.fail_mutations.lock().unwrap() = true;
        let _ = sync.remove("000660").await;
        assert!(sync.contains("005930").await);
    }
}
