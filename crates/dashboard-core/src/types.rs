use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw instrument record from the snapshot endpoint.
/// Fundamentals are immutable within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub code: String,
    pub name: String,
    pub market: String,
    pub sector: String,
    pub current_price: f64,
    pub market_cap: Option<f64>,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
}

/// Snapshot list response shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentList {
    pub count: usize,
    pub results: Vec<InstrumentRecord>,
}

/// Raw sentiment classification counts for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: f64,
    pub negative: f64,
    #[serde(default)]
    pub neutral: f64,
}

impl SentimentCounts {
    /// Normalized positive share in [0,1]. All-zero counts read as neutral.
    pub fn score(&self) -> f64 {
        let total = self.positive + self.negative + self.neutral;
        if total == 0.0 {
            0.5
        } else {
            self.positive / total
        }
    }
}

/// Detailed sentiment attached to a row when real enrichment data exists.
/// Absence of this detail marks the row's score as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentDetail {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub last_updated: DateTime<Utc>,
}

/// One streamed update event for a single instrument.
/// All live fields move together, atomically, from a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    pub code: String,
    pub price: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub volume: f64,
    #[serde(default)]
    pub trading_value: Option<f64>,
    /// Epoch milliseconds at the exchange
    pub timestamp: i64,
}

/// The merged, per-instrument display unit.
/// `code` is the sole join key across snapshot, stream, and enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRow {
    pub code: String,
    pub name: String,
    pub market: String,
    pub sector: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: f64,
    pub market_cap: Option<f64>,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    /// Sentiment score in [0,1]
    pub sentiment: f64,
    /// True when `sentiment` is the default shown before enrichment
    /// arrives, never a real measurement
    pub sentiment_placeholder: bool,
    #[serde(default)]
    pub sentiment_detail: Option<SentimentDetail>,
}

/// One index summary line in the market overview widget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSummary {
    pub name: String,
    pub value: f64,
    pub change: f64,
    pub change_percent: f64,
}

/// Optional market-wide overview block; display-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOverview {
    pub indices: Vec<IndexSummary>,
    pub updated_at: DateTime<Utc>,
}

/// Server-shape watch-list item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub stock_code: String,
    pub stock_name: String,
    pub current_price: f64,
    #[serde(default)]
    pub change_percent: Option<f64>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
}

/// Watch-list mutation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchlistAction {
    Add,
    Remove,
}

/// Outcome of a watch-list mutation round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: String,
}

/// Names of the snapshot-phase feeds, for partial failure reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedName {
    Instruments,
    MarketOverview,
    Watchlist,
}

/// Streaming transport health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connecting,
    Open,
    Degraded,
    Closed,
}

impl ConnectionState {
    /// Rows are live only while the transport is open
    pub fn is_realtime(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// Decoded event from the streaming feed
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Tick(MarketTick),
    State(ConnectionState),
}

/// One visited-instrument entry in the recency log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecencyEntry {
    pub code: String,
    pub name: String,
    pub observed_at: DateTime<Utc>,
}
