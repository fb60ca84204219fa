//! Pagination request and response descriptors.

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, Result};

/// Requested page of a history, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationOptions {
    /// Page to return (>= 1).
    pub page_number: u32,
    /// Maximum records per page (>= 1).
    pub max_page_size: u32,
}

impl PaginationOptions {
    /// Create validated pagination options.
    pub fn new(page_number: u32, max_page_size: u32) -> Result<Self> {
        let options = Self {
            page_number,
            max_page_size,
        };
        options.validate()?;
        Ok(options)
    }

    /// Validate bounds.
    pub fn validate(&self) -> Result<()> {
        if self.page_number < 1 {
            return Err(CommonError::InvalidPagination(
                "page number must be at least 1".to_string(),
            ));
        }
        if self.max_page_size < 1 {
            return Err(CommonError::InvalidPagination(
                "max page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Position of a returned page within the full collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    /// Page number returned.
    pub current_page_number: u32,
    /// Records on the returned page.
    pub current_page_size: u32,
    /// Pages in the whole collection.
    pub page_count_total: u32,
}

impl PaginationInfo {
    /// Info for an unpaginated result holding `count` records.
    pub fn single_page(count: u32) -> Self {
        Self {
            current_page_number: 1,
            current_page_size: count,
            page_count_total: if count == 0 { 0 } else { 1 },
        }
    }
}

/// Number of pages needed for `count` records at `page_size` per page.
pub fn page_count(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}
