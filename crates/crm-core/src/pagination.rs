//! Pagination types for list endpoints
//!
//! Lists are addressed with `page` (1-indexed) and `limit` query parameters.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Pagination parameters (from query string)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,

    /// Items per page
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    DEFAULT_PAGE
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PaginationParams {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }.normalized()
    }

    /// Clamp out-of-range values instead of rejecting them
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Calculate the SQL offset
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Calculate the SQL limit
    pub fn limit(&self) -> i64 {
        self.limit
    }
}

/// Paginated collection response
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(params: &PaginationParams, total: i64) -> Self {
        let total_pages = if params.limit == 0 {
            1
        } else {
            (total + params.limit - 1) / params.limit
        };
        Self {
            page: params.page,
            limit: params.limit,
            total,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PaginationParams) -> Self {
        Self {
            data: items,
            pagination: PageInfo::new(params, total),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = PaginationParams::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_offset() {
        let p = PaginationParams::new(3, 10);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn test_normalization_boundaries() {
        let p = PaginationParams::new(0, 0);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 1);

        let p = PaginationParams::new(-5, 5000);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, MAX_LIMIT);
    }

    #[test]
    fn test_page_info() {
        let params = PaginationParams::new(2, 5);
        let info = PageInfo::new(&params, 50);
        assert_eq!(info.total_pages, 10);
        assert!(info.has_next());
        assert!(info.has_prev());

        let last = PageInfo::new(&PaginationParams::new(10, 5), 50);
        assert!(!last.has_next());

        let empty = PageInfo::new(&PaginationParams::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next());
    }

    #[test]
    fn test_deserialize_missing_fields() {
        let p: PaginationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(p.page, DEFAULT_PAGE);
        assert_eq!(p.limit, DEFAULT_LIMIT);
    }
}
