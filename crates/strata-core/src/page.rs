//! # Paging
//!
//! `(skip, take)` is the one paging convention used by every store and
//! repository. Page-number callers convert with [`PageRequest::page`].
//!
//! ## Conversion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  page (1-based)   page_size   →   skip               take              │
//! │  ───────────────  ─────────     ─────────────────  ─────               │
//! │  1                20              0                  20                │
//! │  2                20              20                 20                │
//! │  0 (treated as 1) 20              0                  20                │
//! │                                                                         │
//! │  skip = (max(page, 1) - 1) × page_size                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency Caveat
//! A [`Paged`] result comes from two independent queries: a count and a page
//! fetch. Unless both run on the same transaction, concurrent writes can make
//! `total` disagree with the rows in `items`. This is expected.

use serde::{Deserialize, Serialize};

/// Default page size when none is given.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

// =============================================================================
// Page Request
// =============================================================================

/// Which slice of a result set to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// Rows to skip.
    pub skip: u64,
    /// Maximum rows to return.
    pub take: u64,
}

impl PageRequest {
    /// Creates a request from an offset and a limit.
    #[inline]
    pub const fn new(skip: u64, take: u64) -> Self {
        PageRequest { skip, take }
    }

    /// Creates a request from a 1-based page number and a page size.
    ///
    /// ## Example
    /// ```rust
    /// use strata_core::PageRequest;
    ///
    /// let page = PageRequest::page(3, 20);
    /// assert_eq!(page, PageRequest::new(40, 20));
    /// ```
    pub fn page(page: u64, page_size: u64) -> Self {
        let index = page.max(1) - 1;
        PageRequest {
            skip: index.saturating_mul(page_size),
            take: page_size,
        }
    }

    /// The first page with the default size.
    pub const fn first() -> Self {
        PageRequest::new(0, DEFAULT_PAGE_SIZE)
    }

    /// Returns the request for the following page.
    pub fn next(&self) -> Self {
        PageRequest {
            skip: self.skip.saturating_add(self.take),
            take: self.take,
        }
    }

    /// 1-based page number this request corresponds to (for display).
    pub fn page_number(&self) -> u64 {
        if self.take == 0 {
            return 1;
        }
        self.skip / self.take + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::first()
    }
}

// =============================================================================
// Paged Result
// =============================================================================

/// One page of entities together with the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<E> {
    /// Entities on this page.
    pub items: Vec<E>,
    /// Total rows matching the query, counted separately.
    pub total: i64,
}

impl<E> Paged<E> {
    pub fn new(items: Vec<E>, total: i64) -> Self {
        Paged { items, total }
    }

    /// Number of entities on this page.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pages of size `take` needed to cover `total`.
    pub fn page_count(&self, take: u64) -> u64 {
        if take == 0 || self.total <= 0 {
            return 0;
        }
        (self.total as u64).div_ceil(take)
    }

    /// Returns true if rows remain after the page described by `request`.
    pub fn has_more(&self, request: &PageRequest) -> bool {
        self.total > 0 && request.skip.saturating_add(self.items.len() as u64) < self.total as u64
    }

    /// Maps the items, keeping the total.
    pub fn map<T>(self, f: impl FnMut(E) -> T) -> Paged<T> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
