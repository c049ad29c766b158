use serde::{Deserialize, Serialize};

/// Mutually exclusive quick filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleFilter {
    #[default]
    All,
    /// Positive price change
    Gainers,
    /// Negative price change
    Losers,
    /// Sentiment score above 0.6
    HighSentiment,
}

/// Sentiment classification bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBucket {
    /// score >= 0.6
    Positive,
    /// score < 0.4
    Negative,
    /// 0.4 <= score < 0.6
    Neutral,
}

/// Advanced filter criteria. All fields optional; ranges are inclusive.
/// Rows with null fundamentals fail the corresponding range filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Non-empty list restricts rows to these sectors
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub price_range: Option<(f64, f64)>,
    #[serde(default)]
    pub per_range: Option<(f64, f64)>,
    #[serde(default)]
    pub pbr_range: Option<(f64, f64)>,
    /// Sentiment percentage range on a 0-100 scale
    #[serde(default)]
    pub sentiment_range: Option<(f64, f64)>,
    /// Applied independently of `sentiment_range`; both must pass
    #[serde(default)]
    pub sentiment_bucket: Option<SentimentBucket>,
}

/// Sortable row fields. Numeric keys fall back to 0 when null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Name,
    Price,
    ChangePercent,
    Volume,
    Sentiment,
    MarketCap,
    Per,
    Pbr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Full query configuration, passed by value on every change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Free-text match against name or code
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub simple: SimpleFilter,
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub sort_key: SortKey,
    #[serde(default)]
    pub sort_dir: SortDirection,
}
