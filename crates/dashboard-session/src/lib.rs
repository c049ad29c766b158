//! MarketDesk Session Core
//!
//! Owns the merged instrument row table and the pieces that feed it:
//! snapshot loader, stream reconciler, sentiment enrichment, watch-list
//! mirror, and the recency log. The visible window is a pure recompute
//! over the table; nothing pushes partial updates into a rendered view.

pub mod recency;
pub mod reconciler;
pub mod snapshot;
pub mod watchlist;

pub use recency::RecencyLog;
pub use reconciler::StreamReconciler;
pub use snapshot::{load, SnapshotLoad};
pub use watchlist::WatchlistSync;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};

use dashboard_core::{
    merge, ConnectionState, DashboardError, FeedName, InstrumentRecord, InstrumentRow,
    MarketDataApi, MarketOverview, MutationOutcome, RecencyEntry, SentimentDetail, StreamEvent,
    TickStream,
};
use screener::{FilterCriteria, FilterSpec, PageView, SimpleFilter, SortDirection, SortKey};
use sentiment_cache::{fetch_batch, SentimentCache};

const DEFAULT_PAGE_SIZE: usize = 20;

/// One recomputed window over the queried row set
#[derive(Debug, Clone)]
pub struct SessionView {
    pub rows: Vec<InstrumentRow>,
    pub page: PageView,
}

struct PageState {
    page: usize,
    page_size: usize,
}

pub struct DashboardSession {
    api: Arc<dyn MarketDataApi>,
    cache: Arc<SentimentCache>,
    reconciler: Arc<StreamReconciler>,
    watchlist: WatchlistSync,
    recency: Mutex<RecencyLog>,
    records: Arc<DashMap<String, InstrumentRecord>>,
    rows: Arc<DashMap<String, InstrumentRow>>,
    overview: RwLock<Option<MarketOverview>>,
    partial_failures: RwLock<HashSet<FeedName>>,
    filter: RwLock<FilterSpec>,
    page: RwLock<PageState>,
}

impl DashboardSession {
    pub fn new(
        api: Arc<dyn MarketDataApi>,
        stream: Arc<dyn TickStream>,
        recency: RecencyLog,
    ) -> Self {
        Self {
            api: Arc::clone(&api),
            cache: Arc::new(SentimentCache::system()),
            reconciler: Arc::new(StreamReconciler::new(stream)),
            watchlist: WatchlistSync::new(api),
            recency: Mutex::new(recency),
            records: Arc::new(DashMap::new()),
            rows: Arc::new(DashMap::new()),
            overview: RwLock::new(None),
            partial_failures: RwLock::new(HashSet::new()),
            filter: RwLock::new(FilterSpec::default()),
            page: RwLock::new(PageState { page: 1, page_size: DEFAULT_PAGE_SIZE }),
        }
    }

    // -----------------------------------------------------------------------
    // Snapshot and enrichment
    // -----------------------------------------------------------------------

    /// Run a full snapshot pass and rebuild the row table. Sentiment is
    /// not awaited here: rows come up with placeholders immediately and
    /// callers schedule [`enrich`] off the render path.
    ///
    /// [`enrich`]: DashboardSession::enrich
    pub async fn refresh(&self) -> Result<(), DashboardError> {
        let snapshot = snapshot::load(self.api.as_ref()).await?;

        self.records.clear();
        for record in &snapshot.records {
            self.records.insert(record.code.clone(), record.clone());
        }

        self.watchlist.seed(snapshot.watchlist).await;
        *self.overview.write().await = snapshot.overview;
        *self.partial_failures.write().await = snapshot.partial_failures;

        let now = Utc::now();
        for record in self.records.iter() {
            let tick = self.reconciler.last_tick(record.key());
            let counts = self.cache.fresh_counts(record.key());
            self.rows.insert(
                record.key().clone(),
                merge::materialize(record.value(), tick.as_ref(), counts.as_ref(), now),
            );
        }
        self.sync_watchlist_rows().await;
        Ok(())
    }

    /// Batch-fetch sentiment for `codes` and fold measured scores into
    /// the row table. Returns how many codes loaded.
    pub async fn enrich(&self, codes: Vec<String>) -> usize {
        let loaded =
            fetch_batch(Arc::clone(&self.api), Arc::clone(&self.cache), codes.clone()).await;

        let now = Utc::now();
        for code in &codes {
            let Some(counts) = self.cache.fresh_counts(code) else {
                continue;
            };
            if let Some(mut row) = self.rows.get_mut(code) {
                row.sentiment = counts.score();
                row.sentiment_placeholder = false;
                row.sentiment_detail = Some(SentimentDetail {
                    positive: counts.positive,
                    negative: counts.negative,
                    neutral: counts.neutral,
                    last_updated: now,
                });
            }
        }
        loaded
    }

    /// Enrich every code loaded by the last snapshot, so off-page rows
    /// carry measured sentiment for full-set filtering and sorting.
    pub async fn enrich_all(&self) -> usize {
        let codes: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        self.enrich(codes).await
    }

    /// Enrich only the codes in the current visible window
    pub async fn enrich_visible(&self) -> usize {
        let codes: Vec<String> = self.view().await.rows.into_iter().map(|r| r.code).collect();
        self.enrich(codes).await
    }

    // -----------------------------------------------------------------------
    // Stream
    // -----------------------------------------------------------------------

    /// Fold one decoded stream event into session state
    pub async fn apply_event(&self, event: StreamEvent) -> Result<(), DashboardError> {
        match event {
            StreamEvent::Tick(tick) => {
                self.reconciler.apply_tick(tick.clone());
                match self.rows.get_mut(&tick.code) {
                    Some(mut row) => merge::apply_tick(&mut row, &tick),
                    None => tracing::debug!("Tick for unknown code {}", tick.code),
                }
                Ok(())
            }
            StreamEvent::State(state) => self.reconciler.on_transport(state).await,
        }
    }

    /// Window codes plus watch-list codes
    pub async fn desired_subscription(&self) -> HashSet<String> {
        let mut desired: HashSet<String> =
            self.view().await.rows.into_iter().map(|r| r.code).collect();
        desired.extend(self.watchlist.codes().await);
        desired
    }

    /// Reconcile the live subscription against the desired set
    pub async fn sync_stream(&self) -> Result<(), DashboardError> {
        let desired = self.desired_subscription().await;
        self.reconciler.sync_subscription(&desired).await
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.reconciler.connection_state().await
    }

    pub async fn is_realtime(&self) -> bool {
        self.reconciler.is_realtime().await
    }

    // -----------------------------------------------------------------------
    // Query state
    // -----------------------------------------------------------------------

    /// Recompute query -> paginate -> window over the current table
    pub async fn view(&self) -> SessionView {
        let all: Vec<InstrumentRow> = self.rows.iter().map(|r| r.value().clone()).collect();
        let queried = {
            let filter = self.filter.read().await;
            screener::run(&all, &filter)
        };
        let state = self.page.read().await;
        let page = screener::paginate(queried.len(), state.page, state.page_size);
        let rows = screener::window(&queried, state.page, state.page_size).to_vec();
        SessionView { rows, page }
    }

    pub async fn set_query(&self, query: impl Into<String>) {
        self.filter.write().await.query = query.into();
        self.reset_page().await;
    }

    pub async fn set_simple_filter(&self, simple: SimpleFilter) {
        self.filter.write().await.simple = simple;
        self.reset_page().await;
    }

    pub async fn set_criteria(&self, criteria: FilterCriteria) {
        self.filter.write().await.criteria = criteria;
        self.reset_page().await;
    }

    pub async fn set_sort(&self, key: SortKey, dir: SortDirection) {
        let mut filter = self.filter.write().await;
        filter.sort_key = key;
        filter.sort_dir = dir;
        drop(filter);
        self.reset_page().await;
    }

    pub async fn set_page_size(&self, page_size: usize) {
        let mut state = self.page.write().await;
        state.page_size = page_size.max(1);
        state.page = 1;
    }

    pub async fn set_page(&self, page: usize) {
        self.page.write().await.page = page.max(1);
    }

    async fn reset_page(&self) {
        self.page.write().await.page = 1;
    }

    // -----------------------------------------------------------------------
    // Watch-list
    // -----------------------------------------------------------------------

    pub async fn add_to_watchlist(&self, code: &str) -> Result<MutationOutcome, DashboardError> {
        let outcome = self.watchlist.add(code).await?;
        self.sync_watchlist_rows().await;
        Ok(outcome)
    }

    pub async fn remove_from_watchlist(
        &self,
        code: &str,
    ) -> Result<MutationOutcome, DashboardError> {
        let outcome = self.watchlist.remove(code).await?;
        self.sync_watchlist_rows().await;
        Ok(outcome)
    }

    pub async fn watchlist_contains(&self, code: &str) -> bool {
        self.watchlist.contains(code).await
    }

    /// Keep rows for off-snapshot watch-list entries in the table, and
    /// drop rows that lost both their snapshot record and their
    /// watch-list membership.
    async fn sync_watchlist_rows(&self) {
        let entries = self.watchlist.entries().await;
        let watch_codes: HashSet<&str> = entries.iter().map(|e| e.stock_code.as_str()).collect();

        for entry in &entries {
            if !self.records.contains_key(&entry.stock_code)
                && !self.rows.contains_key(&entry.stock_code)
            {
                self.rows
                    .insert(entry.stock_code.clone(), merge::synthesize_watchlist_row(entry));
            }
        }
        self.rows.retain(|code, _| {
            self.records.contains_key(code) || watch_codes.contains(code.as_str())
        });
    }

    // -----------------------------------------------------------------------
    // Reads and recency
    // -----------------------------------------------------------------------

    pub fn row(&self, code: &str) -> Option<InstrumentRow> {
        self.rows.get(code).map(|r| r.clone())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub async fn overview(&self) -> Option<MarketOverview> {
        self.overview.read().await.clone()
    }

    pub async fn partial_failures(&self) -> HashSet<FeedName> {
        self.partial_failures.read().await.clone()
    }

    /// Log a visit to an instrument detail view
    pub async fn record_visit(&self, code: &str) -> Result<(), DashboardError> {
        let name = self
            .row(code)
            .map(|r| r.name)
            .ok_or_else(|| DashboardError::InvalidData(format!("unknown code {}", code)))?;
        self.recency.lock().await.record(code, &name)
    }

    pub async fn recent(&self) -> Vec<RecencyEntry> {
        self.recency.lock().await.entries().to_vec()
    }

    pub async fn clear_recent(&self) -> Result<(), DashboardError> {
        self.recency.lock().await.clear()
    }
}
