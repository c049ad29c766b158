use dashboard_core::InstrumentRow;

use crate::criteria::{FilterCriteria, FilterSpec, SentimentBucket, SimpleFilter, SortDirection, SortKey};

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full query pipeline: free-text -> simple filter -> advanced
/// criteria -> sort. Returns a new ordered vector; the input is never
/// mutated.
pub fn run(rows: &[InstrumentRow], spec: &FilterSpec) -> Vec<InstrumentRow> {
    let mut out: Vec<InstrumentRow> = rows
        .iter()
        .filter(|row| {
            matches_text(row, &spec.query)
                && matches_simple(row, spec.simple)
                && matches_criteria(row, &spec.criteria)
        })
        .cloned()
        .collect();

    sort_rows(&mut out, spec.sort_key, spec.sort_dir);
    out
}

// ---------------------------------------------------------------------------
// Filter evaluation
// ---------------------------------------------------------------------------

fn matches_text(row: &InstrumentRow, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let q = query.to_lowercase();
    row.name.to_lowercase().contains(&q) || row.code.to_lowercase().contains(&q)
}

fn matches_simple(row: &InstrumentRow, filter: SimpleFilter) -> bool {
    match filter {
        SimpleFilter::All => true,
        SimpleFilter::Gainers => row.change > 0.0,
        SimpleFilter::Losers => row.change < 0.0,
        SimpleFilter::HighSentiment => row.sentiment > 0.6,
    }
}

fn in_range(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

/// Inclusive range over a nullable fundamental; null fails the filter
fn nullable_in_range(value: Option<f64>, range: (f64, f64)) -> bool {
    value.is_some_and(|v| in_range(v, range))
}

fn matches_bucket(score: f64, bucket: SentimentBucket) -> bool {
    match bucket {
        SentimentBucket::Positive => score >= 0.6,
        SentimentBucket::Negative => score < 0.4,
        SentimentBucket::Neutral => (0.4..0.6).contains(&score),
    }
}

fn matches_criteria(row: &InstrumentRow, criteria: &FilterCriteria) -> bool {
    if !criteria.sectors.is_empty() && !criteria.sectors.contains(&row.sector) {
        return false;
    }
    if let Some(range) = criteria.price_range {
        if !in_range(row.price, range) {
            return false;
        }
    }
    if let Some(range) = criteria.per_range {
        if !nullable_in_range(row.per, range) {
            return false;
        }
    }
    if let Some(range) = criteria.pbr_range {
        if !nullable_in_range(row.pbr, range) {
            return false;
        }
    }
    if let Some(range) = criteria.sentiment_range {
        if !in_range(row.sentiment * 100.0, range) {
            return false;
        }
    }
    if let Some(bucket) = criteria.sentiment_bucket {
        if !matches_bucket(row.sentiment, bucket) {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

fn sort_value(row: &InstrumentRow, key: SortKey) -> f64 {
    match key {
        SortKey::Price => row.price,
        SortKey::ChangePercent => row.change_percent,
        SortKey::Volume => row.volume,
        SortKey::Sentiment => row.sentiment,
        SortKey::MarketCap => row.market_cap.unwrap_or(0.0),
        SortKey::Per => row.per.unwrap_or(0.0),
        SortKey::Pbr => row.pbr.unwrap_or(0.0),
        SortKey::Name => 0.0,
    }
}

fn sort_rows(rows: &mut [InstrumentRow], key: SortKey, dir: SortDirection) {
    rows.sort_by(|a, b| {
        let cmp = if key == SortKey::Name {
            a.name.to_lowercase().cmp(&b.name.to_lowercase())
        } else {
            sort_value(a, key)
                .partial_cmp(&sort_value(b, key))
                .unwrap_or(std::cmp::Ordering::Equal)
        };
        match dir {
            SortDirection::Asc => cmp,
            SortDirection::Desc => cmp.reverse(),
        }
    });
}
