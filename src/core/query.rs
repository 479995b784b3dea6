//! Offset pagination parameters and paginated results

use crate::config::PaginationConfig;
use crate::core::error::{OdmError, ValidationError};
use mongodb::bson::Document;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Pagination parameters taken from the query string
///
/// # Example
/// ```rust,ignore
/// pub async fn list_orders(
///     State(state): State<AppState>,
///     Query(params): Query<PageParams>,
/// ) -> Result<Json<PaginatedResponse<Document>>, OdmError> {
///     let page = params.paginator(&state.config.pagination);
///     // ...
/// }
///
/// // Usage:
/// GET /orders?offset=40&limit=20
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PageParams {
    /// Number of documents to skip
    pub offset: u64,

    /// Maximum number of documents to return; the configured default when absent
    pub limit: Option<u64>,
}

impl PageParams {
    /// Resolve into a paginator, clamping the limit to the configured maximum
    pub fn paginator(&self, config: &PaginationConfig) -> OffsetPaginator {
        let max = config.max_limit.max(1);
        let limit = self.limit.unwrap_or(config.default_limit).clamp(1, max);

        OffsetPaginator {
            offset: self.offset,
            limit,
        }
    }
}

/// An offset/limit window over a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OffsetPaginator {
    offset: u64,
    limit: u64,
}

impl OffsetPaginator {
    /// Fails when `limit` is zero
    pub fn new(offset: u64, limit: u64) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::InvalidArgument {
                argument: "limit".to_string(),
                message: "must be positive".to_string(),
            });
        }

        Ok(Self { offset, limit })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// A page of documents together with the total number of matches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    /// Number of documents matching the filters, ignoring offset and limit
    pub total: u64,

    /// The documents of the requested window, in result order
    pub items: Vec<T>,
}

impl<T> PageResult<T> {
    pub fn new(total: u64, items: Vec<T>) -> Self {
        Self { total, items }
    }

    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            total: self.total,
            items: self.items.into_iter().map(f).collect(),
        }
    }

    pub fn meta(&self, page: &OffsetPaginator) -> PaginationMeta {
        PaginationMeta::new(page.offset(), page.limit(), self.total)
    }

    pub fn into_response(self, page: &OffsetPaginator) -> PaginatedResponse<T> {
        let pagination = self.meta(page);
        PaginatedResponse {
            data: self.items,
            pagination,
        }
    }
}

impl PageResult<Document> {
    /// Deserialize every document into `T`
    pub fn hydrate<T: DeserializeOwned>(self) -> Result<PageResult<T>, OdmError> {
        let items = self
            .items
            .into_iter()
            .map(mongodb::bson::from_document)
            .collect::<Result<Vec<T>, _>>()?;

        Ok(PageResult {
            total: self.total,
            items,
        })
    }
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationMeta {
    pub offset: u64,
    pub limit: u64,

    /// Total number of documents (after filters)
    pub total: u64,

    /// Whether documents remain after this window
    pub has_next: bool,

    /// Whether documents precede this window
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(offset: u64, limit: u64, total: u64) -> Self {
        Self {
            offset,
            limit,
            total,
            has_next: offset.saturating_add(limit) < total,
            has_prev: offset > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_page_params_defaults() {
        let page = PageParams::default().paginator(&PaginationConfig::default());
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn test_page_params_clamp_limit() {
        let config = PaginationConfig {
            default_limit: 20,
            max_limit: 50,
        };
        let params = PageParams {
            offset: 10,
            limit: Some(500),
        };
        assert_eq!(params.paginator(&config).limit(), 50);

        let params = PageParams {
            offset: 0,
            limit: Some(0),
        };
        assert_eq!(params.paginator(&config).limit(), 1);
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        assert!(OffsetPaginator::new(0, 0).is_err());
        assert_eq!(OffsetPaginator::new(20, 10).unwrap().offset(), 20);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(20, 20, 145);
        assert!(meta.has_prev);
        assert!(meta.has_next);

        let meta = PaginationMeta::new(140, 20, 145);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_hydrate_items() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Order {
            number: i32,
        }

        let page = PageResult::new(2, vec![doc! { "number": 1 }, doc! { "number": 2 }]);
        let typed: PageResult<Order> = page.hydrate().unwrap();
        assert_eq!(typed.total, 2);
        assert_eq!(typed.items, vec![Order { number: 1 }, Order { number: 2 }]);
    }
}
