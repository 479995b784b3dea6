//! Builder-aware filter dispatch
//!
//! A [`FilterDispatcher`] is a table of handlers keyed by criteria property
//! name, with one handler slot per backend:
//!
//! - the query slot receives the [`QueryBuilder`] itself
//! - the aggregation slot receives a [`MatchStage`], obtained once per
//!   dispatch before any handler runs
//!
//! Dispatch walks the criteria in declared order. A property is skipped when
//! its value is null or when no handler is registered for it on the current
//! backend; skipping is never an error.
//!
//! # Example
//!
//! ```rust,ignore
//! let dispatcher = FilterDispatcher::new()
//!     .range("date", "createdAt")
//!     .range_exclusive("dateExclusive", "createdAt")
//!     .sort("sort")
//!     .on_query("status", |qb, value| {
//!         qb.field("status").equals(value.as_str().unwrap_or_default());
//!         Ok(())
//!     });
//!
//! let mut builder = BuilderHandle::query("orders");
//! dispatcher.dispatch_criteria(&mut builder, &criteria)?;
//! ```

use crate::core::builder::{
    AggregationBuilder, BuilderHandle, ConditionTarget, MatchStage, QueryBuilder,
};
use crate::core::criteria::{FilterCriteria, RangeValue, json_type_name, to_filter_criteria};
use crate::core::date_format::DateFormat;
use crate::core::error::{FilterError, OdmError};
use crate::core::sort::SortSpec;
use mongodb::bson::{self, Bson};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

type QueryHandler =
    Arc<dyn Fn(&mut QueryBuilder, &Value) -> Result<(), FilterError> + Send + Sync>;
type AggregationHandler = Arc<
    dyn for<'a, 'b> Fn(&'b mut MatchStage<'a>, &Value) -> Result<(), FilterError> + Send + Sync,
>;

#[derive(Default, Clone)]
struct PropertyHandlers {
    query: Option<QueryHandler>,
    aggregation: Option<AggregationHandler>,
}

/// How range bounds are written into conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BoundConversion {
    /// Bounds are compared as strings
    #[default]
    Raw,
    /// Bounds are parsed with the format and compared as BSON dates
    Date(DateFormat),
}

impl BoundConversion {
    fn convert(&self, property: &str, bound: &str) -> Result<Bson, FilterError> {
        match self {
            BoundConversion::Raw => Ok(Bson::String(bound.to_string())),
            BoundConversion::Date(format) => {
                let parsed = format.parse(bound).ok_or_else(|| FilterError::InvalidValue {
                    property: property.to_string(),
                    message: format!("'{}' does not match date format '{}'", bound, format),
                })?;
                Ok(Bson::DateTime(bson::DateTime::from_millis(
                    parsed.and_utc().timestamp_millis(),
                )))
            }
        }
    }
}

/// Apply a lower/upper bound pair to one field
///
/// `from` becomes `$gte` (inclusive) or `$gt`; `to` becomes `$lte` or `$lt`.
/// Absent bounds add nothing.
pub fn apply_range<T: ConditionTarget + ?Sized>(
    target: &mut T,
    property: &str,
    field: &str,
    range: &RangeValue,
    inclusive: bool,
    conversion: &BoundConversion,
) -> Result<(), FilterError> {
    if range.is_unbounded() {
        return Ok(());
    }

    let mut condition = target.field(field);

    if let Some(from) = range.lower() {
        let from = conversion.convert(property, from)?;
        if inclusive {
            condition.gte(from);
        } else {
            condition.gt(from);
        }
    }

    if let Some(to) = range.upper() {
        let to = conversion.convert(property, to)?;
        if inclusive {
            condition.lte(to);
        } else {
            condition.lt(to);
        }
    }

    Ok(())
}

/// Apply sort tokens in order; the first token is the primary key
pub fn apply_sort<T: ConditionTarget + ?Sized>(
    target: &mut T,
    property: &str,
    value: &Value,
) -> Result<(), FilterError> {
    let tokens = match value {
        Value::Array(tokens) => tokens,
        other => {
            return Err(FilterError::InvalidValue {
                property: property.to_string(),
                message: format!("expected a list of sort tokens, got {}", json_type_name(other)),
            });
        }
    };

    for token in tokens {
        let token = token.as_str().ok_or_else(|| FilterError::InvalidValue {
            property: property.to_string(),
            message: format!("sort tokens must be strings, got {}", json_type_name(token)),
        })?;
        target.apply_sort(&SortSpec::parse(token)?);
    }

    Ok(())
}

/// Dispatches criteria properties to registered filter handlers
#[derive(Default, Clone)]
pub struct FilterDispatcher {
    handlers: HashMap<String, PropertyHandlers>,
}

impl FilterDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the query-builder handler of a property
    pub fn on_query<F>(mut self, property: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut QueryBuilder, &Value) -> Result<(), FilterError> + Send + Sync + 'static,
    {
        self.handlers.entry(property.into()).or_default().query = Some(Arc::new(handler));
        self
    }

    /// Register the aggregation handler of a property
    pub fn on_aggregation<F>(mut self, property: impl Into<String>, handler: F) -> Self
    where
        F: for<'a, 'b> Fn(&'b mut MatchStage<'a>, &Value) -> Result<(), FilterError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.entry(property.into()).or_default().aggregation = Some(Arc::new(handler));
        self
    }

    /// Inclusive range on `field` for both backends
    pub fn range(self, property: impl Into<String>, field: impl Into<String>) -> Self {
        self.range_with(property, field, true, BoundConversion::Raw)
    }

    /// Exclusive range on `field` for both backends
    pub fn range_exclusive(self, property: impl Into<String>, field: impl Into<String>) -> Self {
        self.range_with(property, field, false, BoundConversion::Raw)
    }

    /// Range whose bounds are parsed with `format` and compared as dates
    pub fn date_range(
        self,
        property: impl Into<String>,
        field: impl Into<String>,
        format: DateFormat,
        inclusive: bool,
    ) -> Self {
        self.range_with(property, field, inclusive, BoundConversion::Date(format))
    }

    pub fn range_with(
        self,
        property: impl Into<String>,
        field: impl Into<String>,
        inclusive: bool,
        conversion: BoundConversion,
    ) -> Self {
        let property = property.into();
        let field = field.into();

        let (query_property, query_field, query_conversion) =
            (property.clone(), field.clone(), conversion.clone());
        let (agg_property, agg_field) = (property.clone(), field);

        self.on_query(property.clone(), move |qb, value| {
            let range = RangeValue::from_value(&query_property, value)?;
            apply_range(qb, &query_property, &query_field, &range, inclusive, &query_conversion)
        })
        .on_aggregation(property, move |stage, value| {
            let range = RangeValue::from_value(&agg_property, value)?;
            apply_range(stage, &agg_property, &agg_field, &range, inclusive, &conversion)
        })
    }

    /// Sort directives from a list of sort tokens, for both backends
    pub fn sort(self, property: impl Into<String>) -> Self {
        let property = property.into();
        let (query_property, agg_property) = (property.clone(), property.clone());

        self.on_query(property.clone(), move |qb, value| {
            apply_sort(qb, &query_property, value)
        })
        .on_aggregation(property, move |stage, value| {
            apply_sort(stage, &agg_property, value)
        })
    }

    /// Whether a handler is registered for the property on the query backend
    pub fn handles_query(&self, property: &str) -> bool {
        self.handlers
            .get(property)
            .is_some_and(|h| h.query.is_some())
    }

    /// Whether a handler is registered for the property on the aggregation backend
    pub fn handles_aggregation(&self, property: &str) -> bool {
        self.handlers
            .get(property)
            .is_some_and(|h| h.aggregation.is_some())
    }

    /// Apply every matching criteria property to the builder
    ///
    /// Mutates the builder only; nothing is executed.
    pub fn dispatch(
        &self,
        builder: &mut BuilderHandle,
        criteria: &FilterCriteria,
    ) -> Result<(), OdmError> {
        match builder {
            BuilderHandle::Query(qb) => self.dispatch_query(qb, criteria),
            BuilderHandle::Aggregation(ab) => self.dispatch_aggregation(ab, criteria),
        }
    }

    /// [`dispatch`](Self::dispatch) for any serializable criteria object
    pub fn dispatch_criteria<C: Serialize + ?Sized>(
        &self,
        builder: &mut BuilderHandle,
        criteria: &C,
    ) -> Result<(), OdmError> {
        let criteria = to_filter_criteria(criteria)?;
        self.dispatch(builder, &criteria)
    }

    /// Dispatch onto a type-erased builder and hand the handle back
    ///
    /// Fails with [`BuilderError::UnsupportedKind`](crate::core::error::BuilderError)
    /// before any handler runs when the value is not a known builder.
    pub fn dispatch_any(
        &self,
        builder: Box<dyn Any + Send>,
        criteria: &FilterCriteria,
    ) -> Result<BuilderHandle, OdmError> {
        let mut handle = BuilderHandle::from_any(builder)?;
        self.dispatch(&mut handle, criteria)?;
        Ok(handle)
    }

    pub fn dispatch_query(
        &self,
        qb: &mut QueryBuilder,
        criteria: &FilterCriteria,
    ) -> Result<(), OdmError> {
        for (property, value) in criteria {
            if value.is_null() {
                continue;
            }

            let Some(handler) = self.handlers.get(property).and_then(|h| h.query.as_ref()) else {
                tracing::debug!(
                    property = %property,
                    backend = "query",
                    "No filter handler, skipping"
                );
                continue;
            };

            handler(&mut *qb, value)?;
        }

        Ok(())
    }

    pub fn dispatch_aggregation(
        &self,
        ab: &mut AggregationBuilder,
        criteria: &FilterCriteria,
    ) -> Result<(), OdmError> {
        let mut stage = ab.match_stage();

        for (property, value) in criteria {
            if value.is_null() {
                continue;
            }

            let Some(handler) = self
                .handlers
                .get(property)
                .and_then(|h| h.aggregation.as_ref())
            else {
                tracing::debug!(
                    property = %property,
                    backend = "aggregation",
                    "No filter handler, skipping"
                );
                continue;
            };

            handler(&mut stage, value)?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for FilterDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut properties: Vec<&String> = self.handlers.keys().collect();
        properties.sort();
        f.debug_struct("FilterDispatcher")
            .field("properties", &properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::Stage;
    use mongodb::bson::doc;
    use serde_json::json;

    fn criteria(value: Value) -> FilterCriteria {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => panic!("criteria must be an object"),
        }
    }

    fn dispatcher() -> FilterDispatcher {
        FilterDispatcher::new()
            .range("date", "createdAt")
            .range_exclusive("dateExclusive", "createdAt")
            .sort("sort")
    }

    #[test]
    fn test_inclusive_range_with_only_from() {
        let mut qb = QueryBuilder::new("orders");
        dispatcher()
            .dispatch_query(&mut qb, &criteria(json!({ "date": { "from": "2025-01-01" } })))
            .unwrap();

        assert_eq!(qb.criteria(), &doc! { "createdAt": { "$gte": "2025-01-01" } });
    }

    #[test]
    fn test_exclusive_range_with_only_from() {
        let mut qb = QueryBuilder::new("orders");
        dispatcher()
            .dispatch_query(
                &mut qb,
                &criteria(json!({ "dateExclusive": { "from": "2025-01-01" } })),
            )
            .unwrap();

        assert_eq!(qb.criteria(), &doc! { "createdAt": { "$gt": "2025-01-01" } });
    }

    #[test]
    fn test_exclusive_range_with_both_bounds() {
        let mut qb = QueryBuilder::new("orders");
        dispatcher()
            .dispatch_query(
                &mut qb,
                &criteria(json!({ "dateExclusive": { "from": "2025-01-01", "to": "2025-02-01" } })),
            )
            .unwrap();

        assert_eq!(
            qb.criteria(),
            &doc! { "createdAt": { "$gt": "2025-01-01", "$lt": "2025-02-01" } }
        );
    }

    #[test]
    fn test_unbounded_range_is_a_noop() {
        let mut qb = QueryBuilder::new("orders");
        dispatcher()
            .dispatch_query(&mut qb, &criteria(json!({ "date": { "from": "", "to": null } })))
            .unwrap();

        assert_eq!(qb, QueryBuilder::new("orders"));
    }

    #[test]
    fn test_query_sort_tokens_in_order() {
        let mut qb = QueryBuilder::new("orders");
        dispatcher()
            .dispatch_query(&mut qb, &criteria(json!({ "sort": ["a", "-b"] })))
            .unwrap();

        assert_eq!(qb.sort_document(), &doc! { "a": 1, "b": -1 });
    }

    #[test]
    fn test_aggregation_obtains_one_match_stage() {
        let mut ab = AggregationBuilder::new("orders");
        dispatcher()
            .dispatch_aggregation(
                &mut ab,
                &criteria(json!({
                    "sort": ["title", "-createdAt"],
                    "date": { "from": "2025-01-01", "to": "2025-01-31" }
                })),
            )
            .unwrap();

        assert_eq!(
            ab.stages(),
            &[
                Stage::Match(doc! { "createdAt": { "$gte": "2025-01-01", "$lte": "2025-01-31" } }),
                Stage::Sort(doc! { "title": 1, "createdAt": -1 }),
            ]
        );
    }

    #[test]
    fn test_null_and_unhandled_properties_are_skipped() {
        let mut qb = QueryBuilder::new("orders");
        dispatcher()
            .dispatch_query(
                &mut qb,
                &criteria(json!({ "date": null, "customer": "acme", "sort": null })),
            )
            .unwrap();

        assert_eq!(qb, QueryBuilder::new("orders"));
    }

    #[test]
    fn test_backend_specific_handlers() {
        let dispatcher = FilterDispatcher::new().on_query("status", |qb, value| {
            qb.field("status").equals(value.as_str().unwrap_or_default());
            Ok(())
        });

        assert!(dispatcher.handles_query("status"));
        assert!(!dispatcher.handles_aggregation("status"));

        let mut handle =
            BuilderHandle::new(crate::core::builder::BuilderKind::Aggregation, "orders");
        dispatcher
            .dispatch(&mut handle, &criteria(json!({ "status": "paid" })))
            .unwrap();

        match handle {
            BuilderHandle::Aggregation(ab) => {
                assert_eq!(ab.stages(), &[Stage::Match(doc! {})]);
            }
            other => panic!("unexpected builder: {:?}", other),
        }
    }

    #[test]
    fn test_date_range_converts_bounds() {
        let dispatcher = FilterDispatcher::new().date_range(
            "date",
            "createdAt",
            DateFormat::default(),
            true,
        );
        let mut qb = QueryBuilder::new("orders");
        dispatcher
            .dispatch_query(&mut qb, &criteria(json!({ "date": { "from": "2025-01-02" } })))
            .unwrap();

        let bound = qb
            .criteria()
            .get_document("createdAt")
            .unwrap()
            .get_datetime("$gte")
            .unwrap();
        assert_eq!(bound.timestamp_millis(), 1_735_776_000_000);
    }

    #[test]
    fn test_malformed_values_are_errors() {
        let mut qb = QueryBuilder::new("orders");
        let err = dispatcher()
            .dispatch_query(&mut qb, &criteria(json!({ "sort": "title" })))
            .unwrap_err();
        assert!(matches!(err, OdmError::Filter(FilterError::InvalidValue { .. })));

        let err = dispatcher()
            .dispatch_query(&mut qb, &criteria(json!({ "sort": [""] })))
            .unwrap_err();
        assert!(matches!(err, OdmError::Filter(FilterError::InvalidSortToken { .. })));

        let err = dispatcher()
            .dispatch_query(&mut qb, &criteria(json!({ "date": "2025-01-01" })))
            .unwrap_err();
        assert!(matches!(err, OdmError::Filter(FilterError::InvalidValue { .. })));
    }

    #[test]
    fn test_dispatch_any_rejects_unknown_builder() {
        #[derive(Default)]
        struct PlainRecord;

        let err = dispatcher()
            .dispatch_any(Box::new(PlainRecord), &criteria(json!({ "sort": ["a"] })))
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_BUILDER_KIND");

        let handle = dispatcher()
            .dispatch_any(
                Box::new(QueryBuilder::new("orders")),
                &criteria(json!({ "sort": ["a"] })),
            )
            .unwrap();
        match handle {
            BuilderHandle::Query(qb) => assert_eq!(qb.sort_document(), &doc! { "a": 1 }),
            other => panic!("unexpected builder: {:?}", other),
        }
    }
}
