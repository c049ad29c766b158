//! Sentiment Enrichment Cache
//!
//! Keyed store of sentiment counts per instrument with a fixed TTL.
//! Staleness is checked on read, never on a timer, and entries are
//! never proactively evicted. The clock is injected so TTL behavior is
//! deterministic under test.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use dashboard_core::SentimentCounts;

pub mod batch;
pub use batch::fetch_batch;

/// Entries older than this are stale on read
const TTL_SECS: i64 = 5 * 60;

/// Injectable time source
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One cached enrichment fetch
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSentiment {
    pub counts: SentimentCounts,
    pub fetched_at: DateTime<Utc>,
}

/// Session-owned sentiment store. Side table only: never the source of
/// truth for a row's identity.
pub struct SentimentCache {
    entries: DashMap<String, CachedSentiment>,
    clock: Arc<dyn Clock>,
}

impl SentimentCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Cache on the system clock
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Raw entry, stale or not. Callers decide freshness via [`fresh`]
    /// so "missing" and "stale" stay distinguishable and stale data can
    /// still be shown while a refresh is in flight.
    ///
    /// [`fresh`]: SentimentCache::fresh
    pub fn get(&self, code: &str) -> Option<CachedSentiment> {
        self.entries.get(code).map(|e| e.clone())
    }

    /// Store real counts fetched now. Placeholder scores must never
    /// pass through here.
    pub fn put(&self, code: &str, counts: SentimentCounts) {
        self.entries.insert(
            code.to_string(),
            CachedSentiment {
                counts,
                fetched_at: self.clock.now(),
            },
        );
    }

    /// Fresh iff `now - fetched_at < TTL`
    pub fn fresh(&self, entry: &CachedSentiment) -> bool {
        self.clock.now() - entry.fetched_at < Duration::seconds(TTL_SECS)
    }

    /// Convenience read for row materialization: counts only when a
    /// fresh entry exists.
    pub fn fresh_counts(&self, code: &str) -> Option<SentimentCounts> {
        self.get(code).filter(|e| self.fresh(e)).map(|e| e.counts)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn at(t: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(t)))
        }

        fn advance(&self, d: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += d;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn counts() -> SentimentCounts {
        SentimentCounts { positive: 3.0, negative: 1.0, neutral: 0.0 }
    }

    #[test]
    fn entry_just_under_ttl_is_fresh() {
        let clock = ManualClock::at(Utc::now());
        let cache = SentimentCache::new(clock.clone());
        cache.put("005930", counts());

        clock.advance(Duration::seconds(4 * 60 + 59));
        let entry = cache.get("005930").unwrap();
        assert!(cache.fresh(&entry));
        assert_eq!(cache.fresh_counts("005930"), Some(counts()));
    }

    #[test]
    fn entry_just_over_ttl_is_stale_but_still_readable() {
        let clock = ManualClock::at(Utc::now());
        let cache = SentimentCache::new(clock.clone());
        cache.put("005930", counts());

        clock.advance(Duration::seconds(5 * 60 + 1));
        // get still returns the raw entry; fresh_counts does not
        let entry = cache.get("005930").unwrap();
        assert!(!cache.fresh(&entry));
        assert_eq!(cache.fresh_counts("005930"), None);
    }

    #[test]
    fn missing_and_stale_are_distinguishable() {
        let clock = ManualClock::at(Utc::now());
        let cache = SentimentCache::new(clock.clone());
        cache.put("005930", counts());
        clock.advance(Duration::seconds(10 * 60));

        assert!(cache.get("005930").is_some());
        assert!(cache.get("000660").is_none());
    }

    #[test]
    fn put_refreshes_fetched_at() {
        let clock = ManualClock::at(Utc::now());
        let cache = SentimentCache::new(clock.clone());
        cache.put("005930", counts());
        clock.advance(Duration::seconds(6 * 60));
        cache.put("005930", counts());

        let entry = cache.get("005930").unwrap();
        assert!(cache.fresh(&entry));
        assert_eq!(cache.len(), 1);
    }
}
