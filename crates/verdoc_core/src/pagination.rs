//! Paged listing.

use crate::config::Config;
use crate::error::CoreResult;
use crate::model::Model;
use crate::schema::ApiDocument;
use serde::Serialize;
use verdoc_storage::{Cursor, Filter, Sort};

/// A page request.
///
/// Pages are 1-based; page 0 is read as page 1. A `per_page` of 0 means
/// the configured default, and larger values are capped.
#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    /// Page number, starting at 1.
    pub page: u64,
    /// Items per page.
    pub per_page: u64,
    /// Caller filter, combined with the listing's own baseline.
    pub filter: Filter,
    /// Caller sort; `None` uses the listing's default.
    pub sort_by: Option<Sort>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 0,
            filter: Filter::new(),
            sort_by: None,
        }
    }
}

impl Pagination {
    /// Requests one page.
    #[must_use]
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page,
            per_page,
            ..Self::default()
        }
    }

    /// Sets the caller filter.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn sort_by(mut self, sort: Sort) -> Self {
        self.sort_by = Some(sort);
        self
    }
}

/// One page of models plus the total match count.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    /// Matches across all pages.
    pub total: u64,
    /// Page number served.
    pub page: u64,
    /// Effective page size.
    pub per_page: u64,
    /// Models on this page.
    pub items: Vec<T>,
}

impl<T> PaginatedResult<T> {
    /// Number of pages needed for `total` items.
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }

    /// Returns true if a later page exists.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Returns true if an earlier page exists.
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Consumes the page, returning its items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T: Model> PaginatedResult<T> {
    pub(crate) fn fetch(
        cursor: Cursor<'_>,
        pagination: &Pagination,
        config: &Config,
    ) -> CoreResult<Self> {
        let per_page = config.effective_per_page(pagination.per_page);
        let page = pagination.page.max(1);
        let total = cursor.count()?;
        let documents = cursor
            .skip((page - 1).saturating_mul(per_page))
            .limit(per_page)
            .fetch()?;
        let items = documents
            .iter()
            .map(T::from_document)
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            total,
            page,
            per_page,
            items,
        })
    }

    /// API representation of the page.
    pub fn to_api(&self) -> ApiPage {
        ApiPage {
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            items: self.items.iter().map(Model::to_api_document).collect(),
        }
    }
}

/// Serializable page of API documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiPage {
    /// Matches across all pages.
    pub total: u64,
    /// Page number served.
    pub page: u64,
    /// Effective page size.
    pub per_page: u64,
    /// Documents on this page.
    pub items: Vec<ApiDocument>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: u64, page: u64, per_page: u64) -> PaginatedResult<()> {
        PaginatedResult {
            total,
            page,
            per_page,
            items: Vec::new(),
        }
    }

    #[test]
    fn page_arithmetic() {
        assert_eq!(page(0, 1, 10).total_pages(), 0);
        assert_eq!(page(10, 1, 10).total_pages(), 1);
        assert_eq!(page(11, 1, 10).total_pages(), 2);

        assert!(page(11, 1, 10).has_next());
        assert!(!page(11, 2, 10).has_next());
        assert!(!page(11, 1, 10).has_previous());
        assert!(page(11, 2, 10).has_previous());

        let mut full = page(2, 1, 10);
        full.items = vec![(), ()];
        assert_eq!(full.into_items().len(), 2);
    }

    #[test]
    fn request_defaults() {
        let request = Pagination::default();
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 0);
        assert!(request.filter.is_empty());
        assert!(request.sort_by.is_none());

        let request = Pagination::new(3, 5).sort_by(Sort::descending("version"));
        assert_eq!(request.page, 3);
        assert!(request.sort_by.is_some());
    }
}
