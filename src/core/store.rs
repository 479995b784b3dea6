//! Document store trait executing builders

use crate::core::builder::{AggregationBuilder, QueryBuilder};
use crate::core::error::StorageError;
use async_trait::async_trait;
use mongodb::bson::Document;
use std::sync::Arc;

/// What executing a [`QueryBuilder`] produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The query was turned into a count
    Count(u64),

    /// Matching documents, in result order
    Documents(Vec<Document>),
}

/// Trait for stores that execute query and aggregation builders
///
/// Implement this trait to plug a backend under the paginator and the
/// existence validators.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute a find or count query
    ///
    /// Returns [`QueryOutcome::Count`] when the builder was turned into a count,
    /// [`QueryOutcome::Documents`] otherwise.
    async fn execute(&self, query: &QueryBuilder) -> Result<QueryOutcome, StorageError>;

    /// Run an aggregation pipeline and collect its output documents
    async fn aggregate(&self, pipeline: &AggregationBuilder) -> Result<Vec<Document>, StorageError>;

    /// Find the first document of `collection` matching every field of `criteria`
    async fn find_one_by(
        &self,
        collection: &str,
        criteria: Document,
    ) -> Result<Option<Document>, StorageError>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn execute(&self, query: &QueryBuilder) -> Result<QueryOutcome, StorageError> {
        (**self).execute(query).await
    }

    async fn aggregate(
        &self,
        pipeline: &AggregationBuilder,
    ) -> Result<Vec<Document>, StorageError> {
        (**self).aggregate(pipeline).await
    }

    async fn find_one_by(
        &self,
        collection: &str,
        criteria: Document,
    ) -> Result<Option<Document>, StorageError> {
        (**self).find_one_by(collection, criteria).await
    }
}
