//! In-memory implementation of DocumentStore for testing and development
//!
//! Evaluates the subset of MongoDB semantics the builders produce:
//! equality and `$gt`/`$gte`/`$lt`/`$lte`/`$ne`/`$in` conditions, multi-key
//! sorts, skip/limit and `$count`. Custom pipeline stages are rejected.

use crate::core::builder::{AggregationBuilder, QueryBuilder, Stage};
use crate::core::error::StorageError;
use crate::core::store::{DocumentStore, QueryOutcome};
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const BACKEND: &str = "in-memory";

/// In-memory document store
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Documents keep their insertion order.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, document: Document) -> Result<(), StorageError> {
        self.insert_many(collection, vec![document])
    }

    pub fn insert_many(
        &self,
        collection: &str,
        documents: impl IntoIterator<Item = Document>,
    ) -> Result<(), StorageError> {
        let mut collections = self.collections.write().map_err(|e| lock_error(&e))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(())
    }

    /// Number of documents stored in `collection`
    pub fn len(&self, collection: &str) -> Result<usize, StorageError> {
        let collections = self.collections.read().map_err(|e| lock_error(&e))?;
        Ok(collections.get(collection).map_or(0, Vec::len))
    }

    fn snapshot(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        let collections = self.collections.read().map_err(|e| lock_error(&e))?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }
}

fn lock_error(err: &impl std::fmt::Display) -> StorageError {
    StorageError::QueryError {
        backend: BACKEND.to_string(),
        message: format!("Failed to acquire lock: {}", err),
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn execute(&self, query: &QueryBuilder) -> Result<QueryOutcome, StorageError> {
        let mut docs = self.snapshot(query.collection())?;
        docs.retain(|doc| matches(doc, query.criteria()));

        if query.is_count() {
            return Ok(QueryOutcome::Count(docs.len() as u64));
        }

        sort_documents(&mut docs, query.sort_document());
        let skip = usize::try_from(query.skip_value().unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = query
            .limit_value()
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(QueryOutcome::Documents(
            docs.into_iter().skip(skip).take(limit).collect(),
        ))
    }

    async fn aggregate(
        &self,
        pipeline: &AggregationBuilder,
    ) -> Result<Vec<Document>, StorageError> {
        let mut docs = self.snapshot(pipeline.collection())?;

        for stage in pipeline.stages() {
            match stage {
                Stage::Match(conditions) => docs.retain(|doc| matches(doc, conditions)),
                Stage::Sort(keys) => sort_documents(&mut docs, keys),
                Stage::Skip(n) => {
                    let n = usize::try_from(*n).unwrap_or(usize::MAX);
                    docs = docs.into_iter().skip(n).collect();
                }
                Stage::Limit(n) => docs.truncate(usize::try_from(*n).unwrap_or(usize::MAX)),
                Stage::Count(field) => {
                    // $count emits nothing for an empty input
                    docs = if docs.is_empty() {
                        Vec::new()
                    } else {
                        let mut counted = Document::new();
                        counted.insert(field.clone(), count_value(docs.len()));
                        vec![counted]
                    };
                }
                Stage::Custom(stage) => {
                    return Err(StorageError::QueryError {
                        backend: BACKEND.to_string(),
                        message: format!("Unsupported pipeline stage: {}", stage),
                    });
                }
            }
        }

        Ok(docs)
    }

    async fn find_one_by(
        &self,
        collection: &str,
        criteria: Document,
    ) -> Result<Option<Document>, StorageError> {
        let docs = self.snapshot(collection)?;
        Ok(docs.into_iter().find(|doc| matches(doc, &criteria)))
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Resolve a dotted path (`customer.name`)
fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Ordering of two comparable values; `None` across unrelated types
fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::DateTime(a), Bson::DateTime(b)) => Some(a.cmp(b)),
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => as_f64(a)?.partial_cmp(&as_f64(b)?),
    }
}

fn equals(actual: Option<&Bson>, expected: &Bson) -> bool {
    match actual {
        Some(actual) => compare(actual, expected) == Some(Ordering::Equal) || actual == expected,
        None => matches!(expected, Bson::Null),
    }
}

fn is_operator_document(value: &Bson) -> Option<&Document> {
    match value {
        Bson::Document(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
            Some(ops)
        }
        _ => None,
    }
}

fn matches(doc: &Document, conditions: &Document) -> bool {
    conditions.iter().all(|(field, condition)| {
        let actual = lookup(doc, field);
        match is_operator_document(condition) {
            Some(operators) => operators
                .iter()
                .all(|(op, operand)| matches_operator(actual, op, operand)),
            None => equals(actual, condition),
        }
    })
}

fn matches_operator(actual: Option<&Bson>, op: &str, operand: &Bson) -> bool {
    let ordered = |accept: fn(Ordering) -> bool| {
        actual
            .and_then(|value| compare(value, operand))
            .is_some_and(accept)
    };

    match op {
        "$gt" => ordered(|o| o == Ordering::Greater),
        "$gte" => ordered(|o| o != Ordering::Less),
        "$lt" => ordered(|o| o == Ordering::Less),
        "$lte" => ordered(|o| o != Ordering::Greater),
        "$ne" => !equals(actual, operand),
        "$in" => match operand {
            Bson::Array(candidates) => candidates.iter().any(|c| equals(actual, c)),
            _ => false,
        },
        _ => false,
    }
}

/// Stable multi-key sort; missing values sort first
fn sort_documents(docs: &mut [Document], keys: &Document) {
    if keys.is_empty() {
        return;
    }

    docs.sort_by(|a, b| {
        for (field, direction) in keys {
            let ordering = match (lookup(a, field), lookup(b, field)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
            };
            let ordering = match direction.as_i32() {
                Some(-1) => ordering.reverse(),
                _ => ordering,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// `$count` output: Int32 while it fits, Int64 beyond, like MongoDB
fn count_value(n: usize) -> Bson {
    match i32::try_from(n) {
        Ok(n) => Bson::Int32(n),
        Err(_) => Bson::Int64(i64::try_from(n).unwrap_or(i64::MAX)),
    }
}
