//! Row materialization: merge policy for snapshot, tick, and
//! enrichment data keyed by instrument code.

use chrono::{DateTime, Utc};

use crate::{InstrumentRecord, InstrumentRow, MarketTick, SentimentCounts, SentimentDetail, WatchlistEntry};

/// Fixed neutral score shown before real enrichment data arrives.
/// Rows carrying it have `sentiment_placeholder = true` and no detail,
/// and the value is never written back into the cache.
pub const PLACEHOLDER_SENTIMENT: f64 = 0.5;

/// Build a display row from a snapshot record, an optional live tick,
/// and optional sentiment counts.
///
/// Live fields take the tick value when present, else the snapshot's
/// resting price with zeroed change/volume. Sentiment detail is
/// populated only when real counts exist.
pub fn materialize(
    record: &InstrumentRecord,
    tick: Option<&MarketTick>,
    sentiment: Option<&SentimentCounts>,
    now: DateTime<Utc>,
) -> InstrumentRow {
    let (price, change, change_percent, volume) = match tick {
        Some(t) => (t.price, t.change_amount, t.change_percent, t.volume),
        None => (record.current_price, 0.0, 0.0, 0.0),
    };

    let (score, placeholder, detail) = match sentiment {
        Some(counts) => (
            counts.score(),
            false,
            Some(SentimentDetail {
                positive: counts.positive,
                negative: counts.negative,
                neutral: counts.neutral,
                last_updated: now,
            }),
        ),
        None => (PLACEHOLDER_SENTIMENT, true, None),
    };

    InstrumentRow {
        code: record.code.clone(),
        name: record.name.clone(),
        market: record.market.clone(),
        sector: record.sector.clone(),
        price,
        change,
        change_percent,
        volume,
        market_cap: record.market_cap,
        per: record.per,
        pbr: record.pbr,
        sentiment: score,
        sentiment_placeholder: placeholder,
        sentiment_detail: detail,
    }
}

/// Overwrite a row's live field group from one tick. The four fields
/// move together; nothing else on the row changes. Idempotent.
pub fn apply_tick(row: &mut InstrumentRow, tick: &MarketTick) {
    row.price = tick.price;
    row.change = tick.change_amount;
    row.change_percent = tick.change_percent;
    row.volume = tick.volume;
}

/// Minimal displayable row for a watch-list entry that is not in the
/// loaded snapshot: price and derived change from the server-provided
/// values, zero volume, placeholder sentiment.
pub fn synthesize_watchlist_row(entry: &WatchlistEntry) -> InstrumentRow {
    let change_percent = entry.change_percent.unwrap_or(0.0);
    InstrumentRow {
        code: entry.stock_code.clone(),
        name: entry.stock_name.clone(),
        market: entry.market.clone().unwrap_or_else(|| "KOSPI".to_string()),
        sector: entry.sector.clone().unwrap_or_else(|| "Other".to_string()),
        price: entry.current_price,
        change: entry.current_price * change_percent / 100.0,
        change_percent,
        volume: 0.0,
        market_cap: None,
        per: None,
        pbr: None,
        sentiment: PLACEHOLDER_SENTIMENT,
        sentiment_placeholder: true,
        sentiment_detail: None,
    }
}
