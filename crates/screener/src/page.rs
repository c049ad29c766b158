use serde::{Deserialize, Serialize};

/// One page window over an ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    /// Zero-based index of the first row in the window
    pub start: usize,
    /// Exclusive end index
    pub end: usize,
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

/// Compute the window for a 1-based page over `len` rows.
/// `total_pages` is at least 1 even for an empty set; out-of-range
/// pages clamp to the last page.
pub fn paginate(len: usize, page: usize, page_size: usize) -> PageView {
    let page_size = page_size.max(1);
    let total_pages = len.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * page_size).min(len);
    let end = (start + page_size).min(len);
    PageView { start, end, page, total_pages, total_rows: len }
}

/// Slice the visible window out of an ordered result set
pub fn window<T>(rows: &[T], page: usize, page_size: usize) -> &[T] {
    let view = paginate(rows.len(), page, page_size);
    &rows[view.start..view.end]
}
