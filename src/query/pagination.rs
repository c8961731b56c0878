use serde::Serialize;

use crate::models::common::SortDirection;

/// Hard cap on the page size a caller may request.
pub const MAX_PAGE_SIZE: u64 = 10_000;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Copy)]
pub struct PagingOptions {
    /// 1-based page number.
    pub page: u64,
    pub page_size: u64,
    pub direction: SortDirection,
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE, direction: SortDirection::Desc }
    }
}

impl PagingOptions {
    /// Clamp to sane bounds: page floors at 1, page size at 1..=max.
    pub fn normalized(&self, max_page_size: u64) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, max_page_size),
            direction: self.direction,
        }
    }

    /// Offset of the first item on the page. Saturates on degenerate page
    /// numbers and stays within what Postgres accepts for OFFSET.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1).saturating_mul(self.page_size).min(i64::MAX as u64)
    }
}

/// Pagination metadata returned alongside every listing. `total_items` and
/// `total_pages` come from the approximate count estimator and are advisory;
/// `item_count` is the number of items actually returned, after any
/// visibility filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: u64,
    pub item_count: u64,
    pub items_per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

pub fn build_page<T>(items: Vec<T>, paging: &PagingOptions, total_items: u64) -> Page<T> {
    let total_pages =
        if total_items == 0 { 0 } else { total_items.div_ceil(paging.page_size.max(1)) };
    let meta = PageMeta {
        current_page: paging.page,
        item_count: items.len() as u64,
        items_per_page: paging.page_size,
        total_items,
        total_pages,
    };
    Page { items, meta }
}
