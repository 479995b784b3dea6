//! Tests for builder-aware filter dispatch
//!
//! These tests verify that:
//! - Sort tokens become sort directives in order on both backends
//! - Range handlers emit the right operators for inclusive and exclusive ranges
//! - Null values and unhandled properties leave the builder untouched
//! - Typed criteria dispatch in declared field order

use odm::core::sort::parse_sort_tokens;
use odm::prelude::*;
use serde_json::json;

#[derive(Debug, Default, Serialize, Deserialize)]
struct OrderCriteria {
    date: Option<RangeValue>,
    #[serde(rename = "dateExclusive")]
    date_exclusive: Option<RangeValue>,
    sort: Option<Vec<String>>,
    customer: Option<String>,
}

fn dispatcher() -> FilterDispatcher {
    FilterDispatcher::new()
        .range("date", "createdAt")
        .range_exclusive("dateExclusive", "createdAt")
        .sort("sort")
}

fn query(handle: BuilderHandle) -> QueryBuilder {
    match handle {
        BuilderHandle::Query(qb) => qb,
        other => panic!("expected a query builder, got {:?}", other.kind()),
    }
}

fn aggregation(handle: BuilderHandle) -> AggregationBuilder {
    match handle {
        BuilderHandle::Aggregation(ab) => ab,
        other => panic!("expected an aggregation builder, got {:?}", other.kind()),
    }
}

// =============================================================================
// Sort tokens
// =============================================================================

mod sort_tests {
    use super::*;

    #[test]
    fn test_tokens_keep_precedence() {
        let specs = parse_sort_tokens(&["a", "-b"]).unwrap();
        assert_eq!(
            specs,
            vec![
                SortSpec::new("a", SortDirection::Ascending),
                SortSpec::new("b", SortDirection::Descending),
            ]
        );
    }

    #[test]
    fn test_query_sort() {
        let mut handle = BuilderHandle::query("orders");
        dispatcher()
            .dispatch_criteria(&mut handle, &json!({ "sort": ["-createdAt", "number"] }))
            .unwrap();

        let qb = query(handle);
        let keys: Vec<(&str, i32)> = qb
            .sort_document()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_i32().unwrap()))
            .collect();
        assert_eq!(keys, vec![("createdAt", -1), ("number", 1)]);
    }

    #[test]
    fn test_aggregation_sort_goes_after_match() {
        let mut handle = BuilderHandle::aggregation("orders");
        dispatcher()
            .dispatch_criteria(&mut handle, &json!({ "sort": ["number"] }))
            .unwrap();

        assert_eq!(
            aggregation(handle).pipeline(),
            vec![doc! { "$match": {} }, doc! { "$sort": { "number": 1 } }]
        );
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let mut handle = BuilderHandle::query("orders");
        let err = dispatcher()
            .dispatch_criteria(&mut handle, &json!({ "sort": ["-"] }))
            .unwrap_err();

        assert_eq!(err.error_code(), "INVALID_SORT_TOKEN");
    }
}

// =============================================================================
// Ranges
// =============================================================================

mod range_tests {
    use super::*;

    #[test]
    fn test_inclusive_from_only_on_aggregation() {
        let mut handle = BuilderHandle::aggregation("orders");
        dispatcher()
            .dispatch_criteria(&mut handle, &json!({ "date": { "from": "2025-01-01" } }))
            .unwrap();

        assert_eq!(
            aggregation(handle).stages(),
            &[Stage::Match(doc! { "createdAt": { "$gte": "2025-01-01" } })]
        );
    }

    #[test]
    fn test_inclusive_to_only() {
        let mut handle = BuilderHandle::query("orders");
        dispatcher()
            .dispatch_criteria(&mut handle, &json!({ "date": { "to": "2025-01-31" } }))
            .unwrap();

        assert_eq!(
            query(handle).criteria(),
            &doc! { "createdAt": { "$lte": "2025-01-31" } }
        );
    }

    #[test]
    fn test_exclusive_both_bounds_on_aggregation() {
        let mut handle = BuilderHandle::aggregation("orders");
        dispatcher()
            .dispatch_criteria(
                &mut handle,
                &json!({ "dateExclusive": { "from": "2025-01-01", "to": "2025-02-01" } }),
            )
            .unwrap();

        assert_eq!(
            aggregation(handle).stages(),
            &[Stage::Match(
                doc! { "createdAt": { "$gt": "2025-01-01", "$lt": "2025-02-01" } }
            )]
        );
    }

    #[test]
    fn test_range_must_be_an_object() {
        let mut handle = BuilderHandle::query("orders");
        let err = dispatcher()
            .dispatch_criteria(&mut handle, &json!({ "date": ["2025-01-01"] }))
            .unwrap_err();

        assert_eq!(err.error_code(), "INVALID_FILTER_VALUE");
        assert_eq!(err.to_response().details, Some(json!({ "property": "date" })));
    }

    #[test]
    fn test_date_conversion_rejects_bad_bounds() {
        let dispatcher =
            FilterDispatcher::new().date_range("date", "createdAt", DateFormat::default(), true);
        let mut handle = BuilderHandle::query("orders");

        let err = dispatcher
            .dispatch_criteria(&mut handle, &json!({ "date": { "from": "01-01-2025" } }))
            .unwrap_err();
        assert!(matches!(err, OdmError::Filter(FilterError::InvalidValue { .. })));
    }
}

// =============================================================================
// Skipping
// =============================================================================

mod skip_tests {
    use super::*;

    #[test]
    fn test_unhandled_and_null_properties_leave_builder_untouched() {
        let mut handle = BuilderHandle::query("orders");
        dispatcher()
            .dispatch_criteria(
                &mut handle,
                &OrderCriteria {
                    customer: Some("acme".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(query(handle), QueryBuilder::new("orders"));
    }

    #[test]
    fn test_empty_criteria_still_opens_one_match_stage() {
        let mut handle = BuilderHandle::aggregation("orders");
        dispatcher()
            .dispatch_criteria(&mut handle, &OrderCriteria::default())
            .unwrap();

        assert_eq!(aggregation(handle).stages(), &[Stage::Match(doc! {})]);
    }
}

// =============================================================================
// Typed criteria
// =============================================================================

mod typed_criteria_tests {
    use super::*;

    #[test]
    fn test_declared_order_drives_dispatch() {
        let criteria = OrderCriteria {
            date: Some(RangeValue::new(Some("2025-01-01"), None)),
            date_exclusive: Some(RangeValue::new(None, Some("2025-03-01"))),
            sort: Some(vec!["-createdAt".to_string()]),
            customer: None,
        };

        let mut handle = BuilderHandle::query("orders");
        dispatcher().dispatch_criteria(&mut handle, &criteria).unwrap();

        let qb = query(handle);
        assert_eq!(
            qb.criteria(),
            &doc! { "createdAt": { "$gte": "2025-01-01", "$lt": "2025-03-01" } }
        );
        assert_eq!(qb.sort_document(), &doc! { "createdAt": -1 });
    }

    #[test]
    fn test_custom_handler_per_backend() {
        let dispatcher = FilterDispatcher::new()
            .on_query("customer", |qb, value| {
                qb.field("customer.name").equals(value.as_str().unwrap_or_default());
                Ok(())
            })
            .on_aggregation("customer", |stage, value| {
                stage
                    .field("customer.name")
                    .in_values(vec![value.as_str().unwrap_or_default().into()]);
                Ok(())
            });

        let criteria = OrderCriteria {
            customer: Some("acme".to_string()),
            ..Default::default()
        };

        let mut handle = BuilderHandle::query("orders");
        dispatcher.dispatch_criteria(&mut handle, &criteria).unwrap();
        assert_eq!(query(handle).criteria(), &doc! { "customer.name": "acme" });

        let mut handle = BuilderHandle::aggregation("orders");
        dispatcher.dispatch_criteria(&mut handle, &criteria).unwrap();
        assert_eq!(
            aggregation(handle).stages(),
            &[Stage::Match(doc! { "customer.name": { "$in": ["acme"] } })]
        );
    }
}
