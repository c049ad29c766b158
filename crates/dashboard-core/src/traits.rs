use async_trait::async_trait;

use crate::{
    DashboardError, InstrumentList, MarketOverview, MutationOutcome, SentimentCounts,
    WatchlistAction, WatchlistEntry,
};

/// REST collaborators consumed by the core. Shapes only; transport is
/// the implementor's concern.
#[async_trait]
pub trait MarketDataApi: Send + Sync {
    /// Full instrument list with fundamentals. Required feed: failure
    /// here is fatal to a snapshot load.
    async fn fetch_instruments(&self) -> Result<InstrumentList, DashboardError>;

    /// Market-wide overview. Optional feed.
    async fn fetch_market_overview(&self) -> Result<MarketOverview, DashboardError>;

    /// The user's server-held watch-list. Optional feed at load time.
    async fn fetch_watchlist(&self) -> Result<Vec<WatchlistEntry>, DashboardError>;

    /// Add or remove one code from the server-held watch-list.
    async fn mutate_watchlist(
        &self,
        code: &str,
        action: WatchlistAction,
    ) -> Result<MutationOutcome, DashboardError>;

    /// Sentiment classification counts for one instrument.
    async fn fetch_sentiment(&self, code: &str) -> Result<SentimentCounts, DashboardError>;
}

/// Streaming subscription surface. Implementors deliver decoded
/// `StreamEvent`s out of band; these calls only adjust membership.
#[async_trait]
pub trait TickStream: Send + Sync {
    async fn subscribe(&self, codes: &[String]) -> Result<(), DashboardError>;
    async fn unsubscribe(&self, codes: &[String]) -> Result<(), DashboardError>;
}
