//! Concurrent batch fetch into the sentiment cache. One independent
//! fetch per code; a failing code is logged and skipped without
//! cancelling its siblings.

use std::sync::Arc;
use tokio::task::JoinSet;

use dashboard_core::MarketDataApi;

use crate::SentimentCache;

/// Fetch sentiment for every code, write successes into the cache, and
/// return the success count. Resolves once every fetch has settled.
pub async fn fetch_batch(
    api: Arc<dyn MarketDataApi>,
    cache: Arc<SentimentCache>,
    codes: Vec<String>,
) -> usize {
    let total = codes.len();
    let mut tasks = JoinSet::new();

    for code in codes {
        let api = Arc::clone(&api);
        tasks.spawn(async move {
            let result = api.fetch_sentiment(&code).await;
            (code, result)
        });
    }

    let mut loaded = 0usize;
    while let Some(join_result) = tasks.join_next().await {
        match join_result {
            Ok((code, Ok(counts))) => {
                cache.put(&code, counts);
                loaded += 1;
            }
            Ok((code, Err(e))) => {
                tracing::debug!("Sentiment fetch failed for {}: {}", code, e);
            }
            Err(e) => {
                tracing::warn!("Sentiment fetch task panicked: {}", e);
            }
        }
    }

    tracing::info!("Sentiment batch complete: {}/{}", loaded, total);
    loaded
}
