//! Page/limit pagination shared by the owned and public session listings.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, FieldError};

/// Page returned when the caller does not ask for one.
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page size a caller can request; larger values are clamped.
pub const MAX_LIMIT: i64 = 100;

/// A validated page request (`page >= 1`, `1 <= limit <= MAX_LIMIT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, CoreError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        let mut errors = Vec::new();
        if page < 1 {
            errors.push(FieldError::new("page", "Page must be at least 1"));
        }
        if limit < 1 {
            errors.push(FieldError::new("limit", "Limit must be at least 1"));
        }
        if !errors.is_empty() {
            return Err(CoreError::Validation(errors));
        }

        Ok(Self {
            page,
            limit: limit.min(MAX_LIMIT),
        })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination metadata returned alongside every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// The page that was returned.
    pub current: i64,
    /// Total number of pages at the requested limit.
    pub total: i64,
    /// Number of items on this page.
    pub count: i64,
    /// Number of items matching the query across all pages.
    pub total_count: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, count: usize, total_count: i64) -> Self {
        Self {
            current: request.page,
            total: total_pages(total_count, request.limit),
            count: count as i64,
            total_count,
        }
    }
}

/// `ceil(total_count / limit)`; zero when nothing matched.
pub fn total_pages(total_count: i64, limit: i64) -> i64 {
    if total_count <= 0 || limit <= 0 {
        return 0;
    }
    (total_count + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::new(None, None).unwrap();
        assert_eq!(req.page(), 1);
        assert_eq!(req.limit(), 10);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_offset() {
        let req = PageRequest::new(Some(3), Some(20)).unwrap();
        assert_eq!(req.offset(), 40);
    }

    #[test]
    fn test_limit_is_clamped() {
        let req = PageRequest::new(Some(1), Some(5_000)).unwrap();
        assert_eq!(req.limit(), MAX_LIMIT);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        assert_matches!(
            PageRequest::new(Some(0), None),
            Err(CoreError::Validation(errs)) if errs[0].field == "page"
        );
        assert_matches!(
            PageRequest::new(None, Some(0)),
            Err(CoreError::Validation(errs)) if errs[0].field == "limit"
        );
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 7), 4);
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let req = PageRequest::new(Some(2), Some(5)).unwrap();
        let json = serde_json::to_value(Pagination::new(req, 5, 12)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"current": 2, "total": 3, "count": 5, "totalCount": 12})
        );
    }
}
