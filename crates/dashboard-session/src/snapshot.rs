//! Initial snapshot load across the three REST feeds. The instrument
//! list is required; overview and watch-list degrade to partial data.

use std::collections::HashSet;

use dashboard_core::{
    DashboardError, FeedName, InstrumentRecord, MarketDataApi, MarketOverview, WatchlistEntry,
};

/// Everything the session needs from one snapshot pass
#[derive(Debug)]
pub struct SnapshotLoad {
    pub records: Vec<InstrumentRecord>,
    pub overview: Option<MarketOverview>,
    pub watchlist: Vec<WatchlistEntry>,
    pub partial_failures: HashSet<FeedName>,
}

/// Fetch instruments, overview, and watch-list concurrently. Instrument
/// failure is fatal; each optional feed that fails is logged and noted
/// in `partial_failures` while the load still succeeds.
pub async fn load(api: &dyn MarketDataApi) -> Result<SnapshotLoad, DashboardError> {
    let (instruments, overview, watchlist) = tokio::join!(
        api.fetch_instruments(),
        api.fetch_market_overview(),
        api.fetch_watchlist(),
    );

    let list = instruments?;
    tracing::info!("Snapshot loaded {} instruments", list.count);

    let mut partial_failures = HashSet::new();

    let overview = match overview {
        Ok(o) => Some(o),
        Err(e) => {
            tracing::warn!("Market overview unavailable: {}", e);
            partial_failures.insert(FeedName::MarketOverview);
            None
        }
    };

    let watchlist = match watchlist {
        Ok(w) => w,
        Err(e) => {
            tracing::warn!("Watchlist unavailable: {}", e);
            partial_failures.insert(FeedName::Watchlist);
            Vec::new()
        }
    };

    Ok(SnapshotLoad {
        records: list.results,
        overview,
        watchlist,
        partial_failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use dashboard_core::{
        InstrumentList, MutationOutcome, SentimentCounts, WatchlistAction,
    };

    struct FeedFlags {
        instruments_ok: bool,
        overview_ok: bool,
        watchlist_ok: bool,
    }

    #[async_trait]
    impl MarketDataApi for FeedFlags {
        async fn fetch_instruments(&self) -> Result<InstrumentList, DashboardError> {
            if !self.instruments_ok {
                return Err(DashboardError::Api("instruments down".to_string()));
            }
            Ok(InstrumentList {
                count: 1,
                results: vec![InstrumentRecord {
                    code: "005930".to_string(),
                    name: "Samsung Electronics".to_string(),
                    market: "KOSPI".to_string(),
                    sector: "Technology".to_string(),
                    current_price: 70_000.0,
                    market_cap: None,
                    per: None,
                    pbr: None,
                }],
            })
        }

        async fn fetch_market_overview(&self) -> Result<MarketOverview, DashboardError> {
            if !self.overview_ok {
                return Err(DashboardError::Api("overview down".to_string()));
            }
            Ok(MarketOverview { indices: vec![], updated_at: Utc::now() })
        }

        async fn fetch_watchlist(&self) -> Result<Vec<WatchlistEntry>, DashboardError> {
            if !self.watchlist_ok {
                return Err(DashboardError::Api("watchlist down".to_string()));
            }
            Ok(vec![])
        }

        async fn mutate_watchlist(
            &self,
            _code: &str,
            _action: WatchlistAction,
        ) -> Result<MutationOutcome, DashboardError> {
            unimplemented!()
        }

        async fn fetch_sentiment(&self, _code: &str) -> Result<SentimentCounts, DashboardError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn instrument_failure_is_fatal() {
        let api = FeedFlags { instruments_ok: false, overview_ok: true, watchlist_ok: true };
        assert!(load(&api).await.is_err());
    }

    #[tokio::test]
    async fn optional_feed_failures_degrade_the_load() {
        let api = FeedFlags { instruments_ok: true, overview_ok: false, watchlist_ok: false };
        let snapshot = load(&api).await.unwrap();

        assert_eq!(snapshot.records.len(), 1);
        assert!(snapshot.overview.is_none());
        assert!(snapshot.watchlist.is_empty());
        assert!(snapshot.partial_failures.contains(&FeedName::MarketOverview));
        assert!(snapshot.partial_failures.contains(&FeedName::Watchlist));
    }

    #[tokio::test]
    async fn clean_load_reports_no_partial_failures() {
        let api = FeedFlags { instruments_ok: true, overview_ok: true, watchlist_ok: true };
        let snapshot = load(&api).await.unwrap();
        assert!(snapshot.partial_failures.is_empty());
        assert!(snapshot.overview.is_some());
    }
}
