//! Data models for the Recipe Hub application.
//!
//! Field names serialize in camelCase to match the web client.

mod notification;
mod recipe;
mod review;
mod user;

pub use notification::*;
pub use recipe::*;
pub use review::*;
pub use user::*;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Deepest row a paged listing reaches (`page * limit`). Search collects every
/// hit up to this depth, so it also bounds the collector's allocation.
pub const MAX_PAGE_DEPTH: i64 = 10_000;

/// `?page=&limit=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Resolve to a 1-based page and a clamped limit.
    ///
    /// Pages past [`MAX_PAGE_DEPTH`] are a validation error.
    pub fn resolve(&self, default_limit: i64) -> Result<(i64, i64), AppError> {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = self
            .limit
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_SIZE);

        match page.checked_mul(limit) {
            Some(depth) if depth <= MAX_PAGE_DEPTH => Ok((page, limit)),
            _ => Err(AppError::validation(format!(
                "Page must be at most {} with a limit of {}",
                MAX_PAGE_DEPTH / limit,
                limit
            ))),
        }
    }

    /// Rows skipped before `page`. Only meaningful for a resolved page.
    pub fn offset(page: i64, limit: i64) -> i64 {
        (page - 1) * limit
    }
}

/// Pagination metadata returned with every paged listing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// A page of recipes.
#[derive(Debug, Clone, Serialize)]
pub struct RecipePage {
    pub recipes: Vec<Recipe>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_defaults_and_clamps() {
        let q = PageQuery::default();
        assert_eq!(q.resolve(10).unwrap(), (1, 10));

        let q = PageQuery {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(q.resolve(10).unwrap(), (1, MAX_PAGE_SIZE));
        assert_eq!(PageQuery::offset(3, 10), 20);
    }

    #[test]
    fn test_page_depth_is_bounded() {
        let last = PageQuery {
            page: Some(MAX_PAGE_DEPTH / 10),
            limit: Some(10),
        };
        assert_eq!(last.resolve(10).unwrap(), (1_000, 10));

        let past = PageQuery {
            page: Some(MAX_PAGE_DEPTH / 10 + 1),
            limit: Some(10),
        };
        assert_eq!(past.resolve(10).unwrap_err().error_code(), "VALIDATION_ERROR");

        let huge = PageQuery {
            page: Some(i64::MAX),
            limit: Some(MAX_PAGE_SIZE),
        };
        assert_eq!(huge.resolve(10).unwrap_err().error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_pagination_rounds_pages_up() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).pages, 2);
    }
}
