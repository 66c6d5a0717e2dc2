//! Page requests and page-count arithmetic shared by every listing.

use crate::error::{BankError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// A skip/limit window over an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub skip: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(skip: u64, limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(BankError::ValidationError(
                "Page size must be at least 1".to_string(),
            ));
        }
        Ok(Self { skip, limit })
    }

    /// Zero-based page `index` of `size` items.
    pub fn page(index: u64, size: u64) -> Result<Self> {
        let skip = index.checked_mul(size).ok_or_else(|| {
            BankError::ValidationError(format!("Page {index} is out of range"))
        })?;
        Self::new(skip, size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a listing together with the number of pages available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_total: u64,
}

/// Number of pages needed to show `count` items, `page_size` at a time.
///
/// An empty listing has zero pages. A zero page size yields zero as well.
pub fn page_total(count: u64, page_size: u64) -> u64 {
    if count == 0 || page_size == 0 {
        return 0;
    }
    (count - 1) / page_size + 1
}
