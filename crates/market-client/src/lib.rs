use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use dashboard_core::{
    DashboardError, IndexSummary, InstrumentList, InstrumentRecord, MarketDataApi, MarketOverview,
    MutationOutcome, SentimentCounts, WatchlistAction, WatchlistEntry,
};

pub mod websocket;
pub use websocket::MarketSocket;

// ---------------------------------------------------------------------------
// Wire DTOs (backend field names)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiInstrument {
    stock_code: String,
    stock_name: String,
    market: String,
    sector: String,
    current_price: f64,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    per: Option<f64>,
    #[serde(default)]
    pbr: Option<f64>,
}

impl From<ApiInstrument> for InstrumentRecord {
    fn from(api: ApiInstrument) -> Self {
        InstrumentRecord {
            code: api.stock_code,
            name: api.stock_name,
            market: api.market,
            sector: api.sector,
            current_price: api.current_price,
            market_cap: api.market_cap,
            per: api.per,
            pbr: api.pbr,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InstrumentListResponse {
    count: usize,
    results: Vec<ApiInstrument>,
}

#[derive(Debug, Deserialize)]
struct OverviewResponse {
    indices: Vec<IndexSummary>,
}

/// The sentiment endpoint serializes counts as decimal strings on some
/// deployments and numbers on others; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Num(f64),
    Str(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Result<f64, DashboardError> {
        match self {
            NumberOrString::Num(n) => Ok(*n),
            NumberOrString::Str(s) => s
                .parse::<f64>()
                .map_err(|_| DashboardError::InvalidData(format!("bad sentiment count: {s:?}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SentimentResponse {
    positive: NumberOrString,
    negative: NumberOrString,
    #[serde(default)]
    neutral: Option<NumberOrString>,
}

// ---------------------------------------------------------------------------
// REST client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RestClient {
    base_url: String,
    client: Client,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, DashboardError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DashboardError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::Api(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DashboardError::InvalidData(e.to_string()))
    }
}

#[async_trait]
impl MarketDataApi for RestClient {
    async fn fetch_instruments(&self) -> Result<InstrumentList, DashboardError> {
        let response: InstrumentListResponse = self.get_json("/api/stocks/").await?;
        tracing::debug!("Fetched {} instruments", response.count);
        Ok(InstrumentList {
            count: response.count,
            results: response.results.into_iter().map(Into::into).collect(),
        })
    }

    async fn fetch_market_overview(&self) -> Result<MarketOverview, DashboardError> {
        let response: OverviewResponse = self.get_json("/api/market-overview/").await?;
        Ok(MarketOverview {
            indices: response.indices,
            updated_at: Utc::now(),
        })
    }

    async fn fetch_watchlist(&self) -> Result<Vec<WatchlistEntry>, DashboardError> {
        self.get_json("/api/watchlist/").await
    }

    async fn mutate_watchlist(
        &self,
        code: &str,
        action: WatchlistAction,
    ) -> Result<MutationOutcome, DashboardError> {
        let url = match action {
            WatchlistAction::Add => format!("{}/api/watchlist/", self.base_url),
            WatchlistAction::Remove => format!("{}/api/watchlist/{}/", self.base_url, code),
        };

        let request = match action {
            WatchlistAction::Add => self
                .client
                .post(&url)
                .json(&serde_json::json!({ "stock_code": code })),
            WatchlistAction::Remove => self.client.delete(&url),
        };

        let response = request
            .send()
            .await
            .map_err(|e| DashboardError::Mutation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DashboardError::Mutation(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DashboardError::InvalidData(e.to_string()))
    }

    async fn fetch_sentiment(&self, code: &str) -> Result<SentimentCounts, DashboardError> {
        let response: SentimentResponse = self
            .get_json(&format!("/api/stocks/{}/sentiment/", code))
            .await?;

        Ok(SentimentCounts {
            positive: response.positive.as_f64()?,
            negative: response.negative.as_f64()?,
            neutral: response
                .neutral
                .map(|n| n.as_f64())
                .transpose()?
                .unwrap_or(0.0),
        })
    }
}
