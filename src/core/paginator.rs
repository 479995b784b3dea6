//! Count-then-fetch pagination over either builder kind
//!
//! Every call runs two executions on the store: a count on a clone of the
//! builder, then the windowed fetch on the original. The clone never shares
//! state with the original, so the count stage and the skip/limit modifiers
//! cannot leak into each other.

use crate::core::builder::{AggregationBuilder, BuilderHandle, QueryBuilder};
use crate::core::document::with_document_id;
use crate::core::error::{OdmError, StorageError};
use crate::core::query::{OffsetPaginator, PageResult};
use crate::core::store::{DocumentStore, QueryOutcome};
use mongodb::bson::{Bson, Document};
use serde::de::DeserializeOwned;
use std::any::Any;

/// Output field of the `$count` stage appended to aggregation pipelines
pub const COUNT_FIELD: &str = "total";

/// Paginates query and aggregation builders against a [`DocumentStore`]
///
/// # Example
///
/// ```rust,ignore
/// let paginator = BuilderAwarePaginator::new(store.clone());
///
/// let mut builder = BuilderHandle::aggregation("orders");
/// dispatcher.dispatch_criteria(&mut builder, &criteria)?;
///
/// let page = paginator
///     .paginate(builder, OffsetPaginator::new(20, 10)?)
///     .await?;
/// println!("{} of {}", page.items.len(), page.total);
/// ```
#[derive(Debug, Clone)]
pub struct BuilderAwarePaginator<S> {
    store: S,
}

impl<S: DocumentStore> BuilderAwarePaginator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Count every match, then fetch the requested window
    ///
    /// A failure of either execution fails the whole call.
    pub async fn paginate(
        &self,
        builder: BuilderHandle,
        page: OffsetPaginator,
    ) -> Result<PageResult<Document>, OdmError> {
        match builder {
            BuilderHandle::Query(qb) => self.paginate_query(qb, page).await,
            BuilderHandle::Aggregation(ab) => self.paginate_aggregation(ab, page).await,
        }
    }

    /// Paginate a type-erased builder
    ///
    /// Fails with `UNSUPPORTED_BUILDER_KIND` before touching the store when the
    /// value is not a known builder.
    pub async fn paginate_any(
        &self,
        builder: Box<dyn Any + Send>,
        page: OffsetPaginator,
    ) -> Result<PageResult<Document>, OdmError> {
        let handle = BuilderHandle::from_any(builder)?;
        self.paginate(handle, page).await
    }

    /// Paginate and deserialize the items into `T`
    ///
    /// Hydrated builders have each stored `_id` read as `id`. An aggregation
    /// with hydration disabled deserializes its records as they come.
    pub async fn paginate_as<T: DeserializeOwned>(
        &self,
        builder: BuilderHandle,
        page: OffsetPaginator,
    ) -> Result<PageResult<T>, OdmError> {
        let hydrated = builder.is_hydrated();
        let result = self.paginate(builder, page).await?;

        if hydrated {
            result.map_items(with_document_id).hydrate()
        } else {
            result.hydrate()
        }
    }

    async fn paginate_aggregation(
        &self,
        mut builder: AggregationBuilder,
        page: OffsetPaginator,
    ) -> Result<PageResult<Document>, OdmError> {
        let mut counter = builder.clone();
        counter.hydrate(false).count(COUNT_FIELD);

        let counted = self.store.aggregate(&counter).await?;
        let total = match counted.first() {
            Some(record) => read_total(record)?,
            None => 0,
        };

        builder.skip(page.offset()).limit(page.limit());
        let items = self.store.aggregate(&builder).await?;

        tracing::debug!(
            collection = %builder.collection(),
            backend = "aggregation",
            offset = page.offset(),
            limit = page.limit(),
            total,
            returned = items.len(),
            "Paginated aggregation"
        );

        Ok(PageResult::new(total, items))
    }

    async fn paginate_query(
        &self,
        mut builder: QueryBuilder,
        page: OffsetPaginator,
    ) -> Result<PageResult<Document>, OdmError> {
        let mut counter = builder.clone();
        counter.count();

        let total = match self.store.execute(&counter).await? {
            QueryOutcome::Count(total) => total,
            QueryOutcome::Documents(_) => {
                return Err(StorageError::UnexpectedOutcome {
                    expected: "a count".to_string(),
                }
                .into());
            }
        };

        builder.limit(page.limit()).skip(page.offset());
        let items = match self.store.execute(&builder).await? {
            QueryOutcome::Documents(items) => items,
            QueryOutcome::Count(_) => {
                return Err(StorageError::UnexpectedOutcome {
                    expected: "a list of documents".to_string(),
                }
                .into());
            }
        };

        tracing::debug!(
            collection = %builder.collection(),
            backend = "query",
            offset = page.offset(),
            limit = page.limit(),
            total,
            returned = items.len(),
            "Paginated query"
        );

        Ok(PageResult::new(total, items))
    }
}

/// Read the count stage output; a record without the field counts as zero
fn read_total(record: &Document) -> Result<u64, StorageError> {
    let unexpected = || StorageError::UnexpectedOutcome {
        expected: format!("a non-negative integer in '{}'", COUNT_FIELD),
    };

    match record.get(COUNT_FIELD) {
        None | Some(Bson::Null) => Ok(0),
        Some(Bson::Int32(n)) => u64::try_from(*n).map_err(|_| unexpected()),
        Some(Bson::Int64(n)) => u64::try_from(*n).map_err(|_| unexpected()),
        Some(Bson::Double(n)) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as u64),
        Some(_) => Err(unexpected()),
    }
}
