//! Instrument Screener
//!
//! Pure filter/sort/paginate pipeline over merged instrument rows.
//! Deterministic, no side effects, safe to re-run on every input
//! change.

pub mod criteria;
pub mod engine;
pub mod page;

pub use criteria::{FilterCriteria, FilterSpec, SentimentBucket, SimpleFilter, SortDirection, SortKey};
pub use engine::run;
pub use page::{paginate, window, PageView};
