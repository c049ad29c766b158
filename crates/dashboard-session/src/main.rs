//! MarketDesk demo binary: load a snapshot, attach the tick stream,
//! and keep the session current until interrupted.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use dashboard_session::{DashboardSession, RecencyLog};
use market_client::{MarketSocket, RestClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let api_url = std::env::var("MARKETDESK_API_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string());
    let ws_url = std::env::var("MARKETDESK_WS_URL")
        .unwrap_or_else(|_| "ws://localhost:8000/ws/stream".to_string());
    tracing::info!("MarketDesk starting against {} / {}", api_url, ws_url);

    let api = Arc::new(RestClient::new(api_url.as_str()));
    let (socket, mut events) = MarketSocket::new(ws_url.as_str());
    let socket = Arc::new(socket);

    let recency_path = RecencyLog::default_path().context("no platform data directory")?;
    let session = Arc::new(DashboardSession::new(
        api,
        socket.clone(),
        RecencyLog::open(recency_path),
    ));

    session.refresh().await?;
    tracing::info!("Session ready with {} rows", session.row_count());
    for feed in session.partial_failures().await {
        tracing::warn!("Degraded feed: {:?}", feed);
    }

    {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            let loaded = session.enrich_all().await;
            tracing::info!("Sentiment loaded for {} instruments", loaded);
        });
    }

    let runner = Arc::clone(&socket);
    tokio::spawn(async move { runner.run().await });
    session.sync_stream().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                // Stream-path failures degrade the session, never end it
                Ok(event) => {
                    if let Err(e) = session.apply_event(event).await {
                        tracing::warn!("Stream event dropped: {}", e);
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Dropped {} stream events", n);
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                socket.shutdown();
                break;
            }
        }
    }

    Ok(())
}
