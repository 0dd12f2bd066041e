//! Paginator
//!
//! Page count, maximum offset and offset validation for list endpoints.

use serde::Serialize;

use crate::error::{AppError, Result};

// == Pagination ==
/// Paging metadata of one list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub pages: i64,
    pub max_offset: i64,
}

impl Pagination {
    // == Compute ==
    /// Validates `offset` against `total` and derives the page counts.
    ///
    /// An offset past the last page is an error; an empty collection only
    /// accepts offset 0.
    pub fn compute(total: i64, limit: i64, offset: i64) -> Result<Self> {
        if limit <= 0 {
            return Err(AppError::Validation(format!(
                "limit ({limit}) must be a positive integer"
            )));
        }
        if total < 0 {
            return Err(AppError::Validation(format!(
                "total ({total}) must not be negative"
            )));
        }
        if offset < 0 {
            return Err(AppError::Validation(format!(
                "offset ({offset}) must not be negative"
            )));
        }

        let pages = (total + limit - 1) / limit;
        let max_offset = ((pages - 1) * limit).max(0);

        if offset > max_offset {
            return Err(AppError::Validation(format!(
                "not enough records, offset ({offset}) would return an empty page."
            )));
        }

        Ok(Self {
            total,
            limit,
            offset,
            pages,
            max_offset,
        })
    }
}
