//! Offset pagination shared by the list queries.

use serde::{Deserialize, Serialize};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: i64 = 5;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Highest page index; keeps `page * page_size` within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// A requested page (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }.normalized()
    }

    /// Clamp the page into `0..=MAX_PAGE` and the size into `1..=MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.clamp(0, MAX_PAGE),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    /// False exactly when fewer than `page_size` rows remained at this offset.
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from the rows returned for `request`.
    pub fn from_rows(items: Vec<T>, request: PageRequest) -> Self {
        let has_more = items.len() as i64 >= request.page_size;
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            has_more,
        }
    }
}
