//! Query and aggregation builders
//!
//! Builders accumulate filter, sort and pagination intent as plain BSON
//! values. Nothing runs until a [`DocumentStore`](crate::core::store::DocumentStore)
//! executes them, so a builder can be cloned freely: the clone owns its own
//! copy of every condition and stage.
//!
//! Two backends are supported and wrapped by [`BuilderHandle`]:
//! - [`QueryBuilder`]: a `find`/`count` query (filter, sort, skip, limit)
//! - [`AggregationBuilder`]: an aggregation pipeline made of [`Stage`]s

use crate::core::error::BuilderError;
use crate::core::sort::{SortDirection, SortSpec};
use mongodb::bson::{Bson, Document, doc};
use std::any::Any;
use std::fmt;
use std::str::FromStr;

/// The two backend kinds a [`BuilderHandle`] can wrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuilderKind {
    Query,
    Aggregation,
}

impl BuilderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuilderKind::Query => "query",
            BuilderKind::Aggregation => "aggregation",
        }
    }
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuilderKind {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(BuilderKind::Query),
            "aggregation" => Ok(BuilderKind::Aggregation),
            other => Err(BuilderError::UnsupportedKind {
                kind: other.to_string(),
            }),
        }
    }
}

fn bson_count(n: u64) -> Bson {
    Bson::Int64(i64::try_from(n).unwrap_or(i64::MAX))
}

// ---------------------------------------------------------------------------
// Field conditions
// ---------------------------------------------------------------------------

/// Comparison operators scoped to one field of a condition document
///
/// Operators on the same field accumulate: `gte("a")` then `lte("b")`
/// yields `{ field: { "$gte": "a", "$lte": "b" } }`.
pub struct FieldCondition<'a> {
    conditions: &'a mut Document,
    field: String,
}

impl<'a> FieldCondition<'a> {
    fn new(conditions: &'a mut Document, field: &str) -> Self {
        Self {
            conditions,
            field: field.to_string(),
        }
    }

    /// Exact match, replacing any operator set on the field
    pub fn equals(&mut self, value: impl Into<Bson>) -> &mut Self {
        self.conditions.insert(self.field.clone(), value.into());
        self
    }

    pub fn gte(&mut self, value: impl Into<Bson>) -> &mut Self {
        self.operator("$gte", value.into())
    }

    pub fn gt(&mut self, value: impl Into<Bson>) -> &mut Self {
        self.operator("$gt", value.into())
    }

    pub fn lte(&mut self, value: impl Into<Bson>) -> &mut Self {
        self.operator("$lte", value.into())
    }

    pub fn lt(&mut self, value: impl Into<Bson>) -> &mut Self {
        self.operator("$lt", value.into())
    }

    pub fn ne(&mut self, value: impl Into<Bson>) -> &mut Self {
        self.operator("$ne", value.into())
    }

    pub fn in_values(&mut self, values: Vec<Bson>) -> &mut Self {
        self.operator("$in", Bson::Array(values))
    }

    fn operator(&mut self, op: &str, value: Bson) -> &mut Self {
        match self.conditions.get_mut(&self.field) {
            Some(Bson::Document(operators)) => {
                operators.insert(op, value);
            }
            _ => {
                self.conditions.insert(self.field.clone(), doc! { op: value });
            }
        }
        self
    }
}

/// Anything filter handlers can write conditions and sort directives to
///
/// Implemented by [`QueryBuilder`] and by the aggregation [`MatchStage`], so
/// range and sort handlers are written once for both backends.
pub trait ConditionTarget {
    /// Field-scoped condition context
    fn field(&mut self, name: &str) -> FieldCondition<'_>;

    /// Append a sort directive after those already applied
    fn apply_sort(&mut self, spec: &SortSpec);
}

// ---------------------------------------------------------------------------
// QueryBuilder
// ---------------------------------------------------------------------------

/// Builder for a `find` or `count` query on one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    collection: String,
    criteria: Document,
    sort: Document,
    skip: Option<u64>,
    limit: Option<u64>,
    count: bool,
}

impl QueryBuilder {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn field(&mut self, name: &str) -> FieldCondition<'_> {
        FieldCondition::new(&mut self.criteria, name)
    }

    /// Add a sort key; the first key added is the primary one
    pub fn sort(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        self.sort.insert(field, direction);
        self
    }

    pub fn skip(&mut self, skip: u64) -> &mut Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Turn the query into a count: executing it yields a number, not documents
    pub fn count(&mut self) -> &mut Self {
        self.count = true;
        self
    }

    pub fn criteria(&self) -> &Document {
        &self.criteria
    }

    pub fn sort_document(&self) -> &Document {
        &self.sort
    }

    pub fn skip_value(&self) -> Option<u64> {
        self.skip
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn is_count(&self) -> bool {
        self.count
    }
}

impl ConditionTarget for QueryBuilder {
    fn field(&mut self, name: &str) -> FieldCondition<'_> {
        QueryBuilder::field(self, name)
    }

    fn apply_sort(&mut self, spec: &SortSpec) {
        self.sort(&spec.field, spec.direction);
    }
}

// ---------------------------------------------------------------------------
// AggregationBuilder
// ---------------------------------------------------------------------------

/// One stage of an aggregation pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Document),
    Sort(Document),
    Skip(u64),
    Limit(u64),
    /// `$count` into the named output field
    Count(String),
    /// Any other stage, passed through verbatim
    Custom(Document),
}

impl Stage {
    pub fn to_document(&self) -> Document {
        match self {
            Stage::Match(conditions) => doc! { "$match": conditions.clone() },
            Stage::Sort(keys) => doc! { "$sort": keys.clone() },
            Stage::Skip(n) => doc! { "$skip": bson_count(*n) },
            Stage::Limit(n) => doc! { "$limit": bson_count(*n) },
            Stage::Count(field) => doc! { "$count": field.clone() },
            Stage::Custom(stage) => stage.clone(),
        }
    }
}

/// Builder for an aggregation pipeline on one collection
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationBuilder {
    collection: String,
    stages: Vec<Stage>,
    hydrate: bool,
}

impl AggregationBuilder {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            stages: Vec::new(),
            hydrate: true,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Append an empty `$match` stage and return a handle to fill it
    pub fn match_stage(&mut self) -> MatchStage<'_> {
        self.stages.push(Stage::Match(Document::new()));
        let index = self.stages.len() - 1;
        MatchStage {
            builder: self,
            index,
        }
    }

    /// Add a sort key, extending the trailing `$sort` stage if there is one
    pub fn sort(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        if let Some(Stage::Sort(keys)) = self.stages.last_mut() {
            keys.insert(field, direction);
        } else {
            self.stages.push(Stage::Sort(doc! { field: direction }));
        }
        self
    }

    pub fn skip(&mut self, skip: u64) -> &mut Self {
        self.stages.push(Stage::Skip(skip));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.stages.push(Stage::Limit(limit));
        self
    }

    pub fn count(&mut self, field: &str) -> &mut Self {
        self.stages.push(Stage::Count(field.to_string()));
        self
    }

    pub fn add_stage(&mut self, stage: Document) -> &mut Self {
        self.stages.push(Stage::Custom(stage));
        self
    }

    /// Whether results should be mapped onto document types
    ///
    /// A hydrated result has its stored `_id` read as the document's `id`;
    /// raw records keep the pipeline's own field names.
    pub fn hydrate(&mut self, enabled: bool) -> &mut Self {
        self.hydrate = enabled;
        self
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrate
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The pipeline as MongoDB stage documents
    pub fn pipeline(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}

/// Handle on one `$match` stage of an [`AggregationBuilder`]
///
/// Conditions go into the stage; sort directives go to the builder, after
/// the stage.
pub struct MatchStage<'a> {
    builder: &'a mut AggregationBuilder,
    index: usize,
}

impl MatchStage<'_> {
    fn conditions(&mut self) -> &mut Document {
        match &mut self.builder.stages[self.index] {
            Stage::Match(conditions) => conditions,
            _ => unreachable!("match stage handle points at a non-$match stage"),
        }
    }

    pub fn field(&mut self, name: &str) -> FieldCondition<'_> {
        FieldCondition::new(self.conditions(), name)
    }

    pub fn sort(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        self.builder.sort(field, direction);
        self
    }
}

impl ConditionTarget for MatchStage<'_> {
    fn field(&mut self, name: &str) -> FieldCondition<'_> {
        MatchStage::field(self, name)
    }

    fn apply_sort(&mut self, spec: &SortSpec) {
        self.sort(&spec.field, spec.direction);
    }
}

// ---------------------------------------------------------------------------
// BuilderHandle
// ---------------------------------------------------------------------------

/// A builder bound to exactly one backend kind
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderHandle {
    Query(QueryBuilder),
    Aggregation(AggregationBuilder),
}

impl BuilderHandle {
    pub fn new(kind: BuilderKind, collection: impl Into<String>) -> Self {
        match kind {
            BuilderKind::Query => BuilderHandle::Query(QueryBuilder::new(collection)),
            BuilderKind::Aggregation => {
                BuilderHandle::Aggregation(AggregationBuilder::new(collection))
            }
        }
    }

    pub fn query(collection: impl Into<String>) -> Self {
        Self::new(BuilderKind::Query, collection)
    }

    pub fn aggregation(collection: impl Into<String>) -> Self {
        Self::new(BuilderKind::Aggregation, collection)
    }

    pub fn kind(&self) -> BuilderKind {
        match self {
            BuilderHandle::Query(_) => BuilderKind::Query,
            BuilderHandle::Aggregation(_) => BuilderKind::Aggregation,
        }
    }

    pub fn collection(&self) -> &str {
        match self {
            BuilderHandle::Query(qb) => qb.collection(),
            BuilderHandle::Aggregation(ab) => ab.collection(),
        }
    }

    /// Whether results map onto document types; query builders always do
    pub fn is_hydrated(&self) -> bool {
        match self {
            BuilderHandle::Query(_) => true,
            BuilderHandle::Aggregation(ab) => ab.is_hydrated(),
        }
    }

    /// Recover a handle from a type-erased value
    ///
    /// Accepts a boxed `BuilderHandle`, `QueryBuilder` or `AggregationBuilder`;
    /// anything else is an [`BuilderError::UnsupportedKind`].
    pub fn from_any(value: Box<dyn Any + Send>) -> Result<Self, BuilderError> {
        let value = match value.downcast::<BuilderHandle>() {
            Ok(handle) => return Ok(*handle),
            Err(value) => value,
        };
        let value = match value.downcast::<QueryBuilder>() {
            Ok(qb) => return Ok(BuilderHandle::Query(*qb)),
            Err(value) => value,
        };
        match value.downcast::<AggregationBuilder>() {
            Ok(ab) => Ok(BuilderHandle::Aggregation(*ab)),
            Err(_) => Err(BuilderError::UnsupportedKind {
                kind: "unknown type".to_string(),
            }),
        }
    }
}

impl From<QueryBuilder> for BuilderHandle {
    fn from(qb: QueryBuilder) -> Self {
        BuilderHandle::Query(qb)
    }
}

impl From<AggregationBuilder> for BuilderHandle {
    fn from(ab: AggregationBuilder) -> Self {
        BuilderHandle::Aggregation(ab)
    }
}

impl TryFrom<Box<dyn Any + Send>> for BuilderHandle {
    type Error = BuilderError;

    fn try_from(value: Box<dyn Any + Send>) -> Result<Self, Self::Error> {
        Self::from_any(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_operators_accumulate() {
        let mut qb = QueryBuilder::new("orders");
        qb.field("createdAt").gte("2025-01-01").lte("2025-01-31");

        assert_eq!(
            qb.criteria(),
            &doc! { "createdAt": { "$gte": "2025-01-01", "$lte": "2025-01-31" } }
        );
    }

    #[test]
    fn test_equals_replaces_operators() {
        let mut qb = QueryBuilder::new("orders");
        qb.field("status").ne("draft");
        qb.field("status").equals("paid");

        assert_eq!(qb.criteria(), &doc! { "status": "paid" });
    }

    #[test]
    fn test_query_sort_keeps_insertion_order() {
        let mut qb = QueryBuilder::new("orders");
        qb.sort("title", SortDirection::Ascending)
            .sort("createdAt", SortDirection::Descending);

        let keys: Vec<&String> = qb.sort_document().keys().collect();
        assert_eq!(keys, vec!["title", "createdAt"]);
        assert_eq!(qb.sort_document().get_i32("createdAt").unwrap(), -1);
    }

    #[test]
    fn test_match_stage_writes_into_its_own_stage() {
        let mut ab = AggregationBuilder::new("orders");
        {
            let mut stage = ab.match_stage();
            stage.sort("title", SortDirection::Ascending);
            stage.field("total").gt(10);
            stage.sort("createdAt", SortDirection::Descending);
        }

        assert_eq!(
            ab.pipeline(),
            vec![
                doc! { "$match": { "total": { "$gt": 10 } } },
                doc! { "$sort": { "title": 1, "createdAt": -1 } },
            ]
        );
    }

    #[test]
    fn test_sort_after_other_stage_opens_new_sort_stage() {
        let mut ab = AggregationBuilder::new("orders");
        ab.sort("a", SortDirection::Ascending)
            .skip(5)
            .sort("b", SortDirection::Descending);

        assert_eq!(
            ab.stages(),
            &[
                Stage::Sort(doc! { "a": 1 }),
                Stage::Skip(5),
                Stage::Sort(doc! { "b": -1 }),
            ]
        );
    }

    #[test]
    fn test_clone_does_not_share_state() {
        let mut original = AggregationBuilder::new("orders");
        original.match_stage().field("status").equals("paid");

        let mut copy = original.clone();
        copy.hydrate(false).count("total");
        original.skip(20).limit(10);

        assert!(original.is_hydrated());
        assert_eq!(original.stages().len(), 3);
        assert_eq!(copy.stages().len(), 2);
        assert_eq!(copy.stages()[1], Stage::Count("total".to_string()));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("query".parse::<BuilderKind>().unwrap(), BuilderKind::Query);
        assert_eq!(
            "aggregation".parse::<BuilderKind>().unwrap(),
            BuilderKind::Aggregation
        );
        assert!(matches!(
            "plain".parse::<BuilderKind>(),
            Err(BuilderError::UnsupportedKind { .. })
        ));
    }

    #[test]
    fn test_from_any_accepts_known_builders() {
        let handle = BuilderHandle::from_any(Box::new(QueryBuilder::new("a"))).unwrap();
        assert_eq!(handle.kind(), BuilderKind::Query);

        let handle =
            BuilderHandle::try_from(Box::new(AggregationBuilder::new("b")) as Box<dyn Any + Send>)
                .unwrap();
        assert_eq!(handle.kind(), BuilderKind::Aggregation);
        assert_eq!(handle.collection(), "b");
    }

    #[test]
    fn test_from_any_rejects_plain_record() {
        #[derive(Default)]
        struct PlainRecord;

        let result = BuilderHandle::from_any(Box::new(PlainRecord));
        assert!(matches!(result, Err(BuilderError::UnsupportedKind { .. })));
    }
}
