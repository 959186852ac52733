//! Common API utilities and shared types
//!
//! This module contains shared utilities used across multiple API endpoints.

use serde::Deserialize;

use crate::models::ListParams;

/// Basic pagination query parameters
///
/// `per_page` falls back to the configured listing size.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl PaginationQuery {
    pub fn params(&self, default_per_page: u32) -> ListParams {
        ListParams::new(self.page.unwrap_or(1), self.per_page.unwrap_or(default_per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_configured_page_size() {
        let params = PaginationQuery::default().params(10);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 10);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let query = PaginationQuery {
            page: Some(0),
            per_page: Some(1000),
        };
        let params = query.params(10);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
    }
}
