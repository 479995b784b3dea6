//! MongoDB storage backend using the official MongoDB async driver.
//!
//! Provides [`MongoStore`], a [`DocumentStore`] executing query and
//! aggregation builders, and [`MongoRepository<T>`] for persisting typed
//! documents with their lifecycle hooks.
//!
//! # Serialization strategy
//!
//! Documents are serialized straight to BSON. The `id` field is mapped to
//! MongoDB's `_id` convention, and `impl_document!` timestamps are stored as
//! BSON dates so they compare against date range bounds.

use crate::config::MongoConfig;
use crate::core::builder::{AggregationBuilder, QueryBuilder};
use crate::core::document::{
    IdGenerator, OdmDocument, UuidGenerator, with_document_id, with_stored_id,
};
use crate::core::error::{OdmError, StorageError, ValidationError};
use crate::core::store::{DocumentStore, QueryOutcome};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::{Client, Collection, Database};
use std::sync::Arc;

fn query_error(context: &str, err: mongodb::error::Error) -> StorageError {
    StorageError::QueryError {
        backend: "MongoDB".to_string(),
        message: format!("{}: {}", context, err),
    }
}

// ---------------------------------------------------------------------------
// MongoStore
// ---------------------------------------------------------------------------

/// Builder execution backed by MongoDB
///
/// # Example
///
/// ```rust,ignore
/// let store = MongoStore::connect(&config.mongodb).await?;
/// let paginator = BuilderAwarePaginator::new(store.clone());
/// ```
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: String,
}

impl MongoStore {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    /// Connect with the configured URI; no round-trip happens until the first query
    pub async fn connect(config: &MongoConfig) -> Result<Self, StorageError> {
        let client = Client::with_uri_str(&config.uri).await.map_err(|e| {
            StorageError::ConnectionError {
                backend: "MongoDB".to_string(),
                message: e.to_string(),
            }
        })?;

        tracing::info!(database = %config.database, "MongoDB client ready");

        Ok(Self::new(client, config.database.clone()))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The default database
    pub fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    /// Raw collection access, defaulting to the configured database
    pub fn collection(&self, collection: &str, database: Option<&str>) -> Collection<Document> {
        self.client
            .database(database.unwrap_or(&self.database))
            .collection(collection)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn execute(&self, query: &QueryBuilder) -> Result<QueryOutcome, StorageError> {
        let collection = self.collection(query.collection(), None);

        if query.is_count() {
            let total = collection
                .count_documents(query.criteria().clone())
                .await
                .map_err(|e| query_error("Failed to count documents", e))?;
            return Ok(QueryOutcome::Count(total));
        }

        let mut find = collection.find(query.criteria().clone());
        if !query.sort_document().is_empty() {
            find = find.sort(query.sort_document().clone());
        }
        if let Some(skip) = query.skip_value() {
            find = find.skip(skip);
        }
        if let Some(limit) = query.limit_value() {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let cursor = find
            .await
            .map_err(|e| query_error("Failed to find documents", e))?;
        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| query_error("Failed to collect documents", e))?;

        Ok(QueryOutcome::Documents(docs))
    }

    async fn aggregate(
        &self,
        pipeline: &AggregationBuilder,
    ) -> Result<Vec<Document>, StorageError> {
        let cursor = self
            .collection(pipeline.collection(), None)
            .aggregate(pipeline.pipeline())
            .await
            .map_err(|e| query_error("Failed to run aggregation", e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| query_error("Failed to collect aggregation results", e))
    }

    async fn find_one_by(
        &self,
        collection: &str,
        criteria: Document,
    ) -> Result<Option<Document>, StorageError> {
        self.collection(collection, None)
            .find_one(criteria)
            .await
            .map_err(|e| query_error("Failed to find document", e))
    }
}

// ---------------------------------------------------------------------------
// MongoRepository<T>
// ---------------------------------------------------------------------------

/// Typed persistence for one document type
///
/// Each document type lives in the collection named by
/// `T::collection_name()`. Persisting assigns an identifier when missing and
/// runs the document's lifecycle hooks.
///
/// # Example
///
/// ```rust,ignore
/// let orders = MongoRepository::<Order>::new(store.clone());
/// let order = orders.persist(Order::new("A-1001".to_string(), 49.90)).await?;
/// let found = orders.find(order.id().unwrap_or_default()).await?;
/// ```
#[derive(Clone)]
pub struct MongoRepository<T> {
    store: MongoStore,
    generator: Arc<dyn IdGenerator>,
    _marker: std::marker::PhantomData<T>,
}

impl<T> std::fmt::Debug for MongoRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoRepository")
            .field("store", &self.store)
            .field("document", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: OdmDocument> MongoRepository<T> {
    pub fn new(store: MongoStore) -> Self {
        Self::with_generator(store, Arc::new(UuidGenerator))
    }

    pub fn with_generator(store: MongoStore, generator: Arc<dyn IdGenerator>) -> Self {
        Self {
            store,
            generator,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn store(&self) -> &MongoStore {
        &self.store
    }

    /// Raw collection access
    ///
    /// Defaults to the document's own collection in the configured database.
    pub fn collection(
        &self,
        collection: Option<&str>,
        database: Option<&str>,
    ) -> Collection<Document> {
        self.store
            .collection(collection.unwrap_or(T::collection_name()), database)
    }

    /// A query builder on the document's collection
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(T::collection_name())
    }

    /// An aggregation builder on the document's collection
    pub fn aggregation_builder(&self) -> AggregationBuilder {
        AggregationBuilder::new(T::collection_name())
    }

    fn to_document(document: &T) -> Result<Document, OdmError> {
        let doc = mongodb::bson::to_document(document).map_err(|e| {
            StorageError::SerializationError {
                message: format!("Failed to serialize document: {}", e),
            }
        })?;
        Ok(with_stored_id(doc))
    }

    fn from_document(doc: Document) -> Result<T, OdmError> {
        mongodb::bson::from_document(with_document_id(doc)).map_err(|e| {
            StorageError::SerializationError {
                message: format!("Failed to deserialize document: {}", e),
            }
            .into()
        })
    }

    /// Insert a new document
    ///
    /// Generates an identifier when missing and runs the persist hook.
    pub async fn persist(&self, mut document: T) -> Result<T, OdmError> {
        document.ensure_id(self.generator.as_ref());
        document.pre_persist(Utc::now());

        let doc = Self::to_document(&document)?;
        self.collection(None, None)
            .insert_one(doc)
            .await
            .map_err(|e| query_error("Failed to insert document", e))?;

        tracing::debug!(
            collection = T::collection_name(),
            id = ?document.id(),
            "Document persisted"
        );

        Ok(document)
    }

    /// Replace a stored document
    ///
    /// Runs the update hook. Fails when the document has no identifier or
    /// does not exist.
    pub async fn update(&self, mut document: T) -> Result<T, OdmError> {
        let id = document
            .id()
            .map(str::to_string)
            .ok_or_else(|| ValidationError::InvalidArgument {
                argument: "id".to_string(),
                message: "document has no identifier".to_string(),
            })?;

        document.pre_update(Utc::now());

        let doc = Self::to_document(&document)?;
        let result = self
            .collection(None, None)
            .replace_one(doc! { "_id": id.as_str() }, doc)
            .await
            .map_err(|e| query_error("Failed to update document", e))?;

        if result.matched_count == 0 {
            return Err(StorageError::QueryError {
                backend: "MongoDB".to_string(),
                message: format!("Document not found: {}", id),
            }
            .into());
        }

        Ok(document)
    }

    pub async fn find(&self, id: &str) -> Result<Option<T>, OdmError> {
        self.find_one_by(doc! { "_id": id }).await
    }

    /// First document matching every field of `criteria`
    pub async fn find_one_by(&self, criteria: Document) -> Result<Option<T>, OdmError> {
        let found = self
            .store
            .find_one_by(T::collection_name(), criteria)
            .await?;

        found.map(Self::from_document).transpose()
    }

    /// Delete by identifier; deleting a missing document succeeds
    pub async fn delete(&self, id: &str) -> Result<(), OdmError> {
        self.collection(None, None)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| query_error("Failed to delete document", e))?;

        Ok(())
    }
}
