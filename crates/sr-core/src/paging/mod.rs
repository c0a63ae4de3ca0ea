//! Page navigation state for paged views

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when navigating pages
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PagingError {
    #[error("Page number must be positive, got {0}")]
    NonPositive(i64),

    #[error("Not a page number: '{0}'")]
    Invalid(String),

    #[error("Page size must be positive")]
    ZeroPageSize,

    #[error("Page {0} is past the last addressable record")]
    OutOfRange(i64),
}

/// Current page of a paged view (0-based internally)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pager {
    page: usize,
    page_size: usize,
    total_records: u64,
}

impl Pager {
    /// Create a pager positioned on the first page
    pub fn new(page_size: usize) -> Result<Self, PagingError> {
        if page_size == 0 {
            return Err(PagingError::ZeroPageSize);
        }
        Ok(Self {
            page: 0,
            page_size,
            total_records: 0,
        })
    }

    /// Current page, 0-based
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    /// Update the record count reported by the count query
    pub fn set_total_records(&mut self, total: u64) {
        self.total_records = total;
    }

    /// Number of pages for the current record count
    pub fn total_pages(&self) -> u64 {
        self.total_records.div_ceil(self.page_size as u64)
    }

    /// Offset of the first record on the current page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }

    /// Advance to the next page
    ///
    /// Paging past the last known page is allowed; the count may be stale.
    /// Stays put when the next page's offset would not fit in `usize`.
    pub fn next(&mut self) {
        if let Some(page) = self.page.checked_add(1).filter(|&page| self.offset_of(page).is_some()) {
            self.page = page;
        }
    }

    /// Go back one page; no-op on the first page
    pub fn previous(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    /// Jump to the first page
    pub fn first(&mut self) {
        self.page = 0;
    }

    /// Jump to a 1-based page number
    pub fn go_to(&mut self, page_number: i64) -> Result<(), PagingError> {
        if page_number <= 0 {
            return Err(PagingError::NonPositive(page_number));
        }
        let page = usize::try_from(page_number - 1)
            .ok()
            .filter(|&page| self.offset_of(page).is_some())
            .ok_or(PagingError::OutOfRange(page_number))?;
        self.page = page;
        Ok(())
    }

    /// Offset of a 0-based page, `None` if it does not fit in `usize`
    fn offset_of(&self, page: usize) -> Option<usize> {
        page.checked_mul(self.page_size)
    }

    /// Jump to a page typed by the user
    pub fn go_to_input(&mut self, input: &str) -> Result<(), PagingError> {
        let page_number = input
            .trim()
            .parse::<i64>()
            .map_err(|_| PagingError::Invalid(input.to_string()))?;
        self.go_to(page_number)
    }

    /// 1-based (start, end) of the records shown on this page
    ///
    /// Returns `None` when the page is empty.
    pub fn record_range(&self, rows_on_page: usize) -> Option<(usize, usize)> {
        if rows_on_page == 0 {
            return None;
        }
        let offset = self.offset();
        Some((offset.saturating_add(1), offset.saturating_add(rows_on_page)))
    }
}
