use serde::{Deserialize, Serialize};

/// Page size used when the caller passes a non-positive limit.
pub const DEFAULT_PAGE_LIMIT: u64 = 25;

/// Normalized window over a collection of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    /// 0-based first position
    pub offset: u64,
    pub size: u64,
    pub total: u64,
}

/// One page of results together with the window that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub offset: u64,
    pub size: u64,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            offset: 0,
            size: 0,
            total: 0,
            items: Vec::new(),
        }
    }

    pub fn from_window(window: PageWindow, items: Vec<T>) -> Self {
        Self {
            offset: window.offset,
            size: window.size,
            total: window.total,
            items,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            offset: self.offset,
            size: self.size,
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Window for `(offset, limit)` using [`DEFAULT_PAGE_LIMIT`].
pub fn paginate(offset: i64, limit: i64, total: u64) -> PageWindow {
    paginate_with_default(offset, limit, total, DEFAULT_PAGE_LIMIT)
}

/// Negative offsets count back from the end; offsets past the end clamp
/// to the last item. A non-positive limit selects `default_limit`.
pub fn paginate_with_default(offset: i64, limit: i64, total: u64, default_limit: u64) -> PageWindow {
    if total == 0 {
        return PageWindow {
            offset: 0,
            size: 0,
            total: 0,
        };
    }

    let total_i = i64::try_from(total).unwrap_or(i64::MAX);
    let mut start = offset.min(total_i - 1);
    if start < 0 {
        start = (total_i + start).max(0);
    }
    let start = start as u64;

    let limit = if limit > 0 { limit as u64 } else { default_limit };
    PageWindow {
        offset: start,
        size: limit.min(total - start),
        total,
    }
}
