//! Axum extractor for filter criteria
//!
//! [`FilterQuery<C>`] binds a criteria type from the request:
//! - path parameters and `filter[...]` query parameters are merged into one
//!   mapping, filter values winning on conflicts
//! - top-level empty values are dropped
//! - repeated `sort` / `sort[]` parameters are injected into the `sort`
//!   property when [`Criteria::accepts_sort`] says so
//! - the mapping is deserialized into `C` and validated
//!
//! Failures are rejected as an [`OdmError`] carrying the violation list.
//!
//! Bracket notation nests: `filter[date][from]=2025-01-01` yields
//! `{"date": {"from": "2025-01-01"}}` and `filter[tags][]=a` appends to a list.

use crate::core::criteria::Criteria;
use crate::core::error::{FieldValidationError, OdmError, ValidationError};
use crate::core::validation::messages;
use axum::extract::{FromRequestParts, Query, RawPathParams};
use axum::http::request::Parts;
use serde_json::{Map, Value};
use validator::Validate;

/// Query parameter holding the criteria
pub const FILTER_PARAM: &str = "filter";

/// Query parameter holding sort tokens
pub const SORT_PARAM: &str = "sort";

/// Validated criteria bound from path and query parameters
///
/// # Usage
///
/// ```rust,ignore
/// pub async fn list_orders(
///     State(state): State<AppState>,
///     FilterQuery(criteria): FilterQuery<OrderCriteria>,
///     Query(params): Query<PageParams>,
/// ) -> Result<Json<PaginatedResponse<Document>>, OdmError> {
///     // criteria is already validated
/// }
///
/// // GET /orders?filter[date][from]=2025-01-01&sort[]=-createdAt
/// ```
#[derive(Debug, Clone)]
pub struct FilterQuery<C>(pub C);

impl<C> FilterQuery<C> {
    pub fn into_inner(self) -> C {
        self.0
    }
}

impl<C> std::ops::Deref for FilterQuery<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, C> FromRequestParts<S> for FilterQuery<C>
where
    S: Send + Sync,
    C: Criteria,
{
    type Rejection = OdmError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Routes without parameters have nothing to merge
        let route_params: Vec<(String, String)> = RawPathParams::from_request_parts(parts, state)
            .await
            .map(|params| {
                params
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri).map_err(|e| {
            ValidationError::InvalidArgument {
                argument: "query".to_string(),
                message: e.to_string(),
            }
        })?;

        resolve_criteria(&route_params, &query).map(FilterQuery)
    }
}

/// Build and validate criteria from route parameters and raw query pairs
pub fn resolve_criteria<C: Criteria>(
    route_params: &[(String, String)],
    query: &[(String, String)],
) -> Result<C, OdmError> {
    let mut data: Map<String, Value> = route_params
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();

    let mut filter = Value::Object(Map::new());
    let mut sort = Vec::new();

    for (key, value) in query {
        let (base, path) = split_key(key);
        match base {
            FILTER_PARAM if !path.is_empty() => insert_at(&mut filter, &path, value),
            SORT_PARAM => sort.push(Value::String(value.clone())),
            _ => {}
        }
    }

    if let Value::Object(filter) = filter {
        data.extend(filter);
    }
    data.retain(|_, value| !is_blank(value));

    if C::accepts_sort() && !sort.is_empty() {
        data.insert(SORT_PARAM.to_string(), Value::Array(sort));
    }

    let criteria: C = serde_json::from_value(Value::Object(data)).map_err(|e| {
        ValidationError::FieldErrors(vec![FieldValidationError {
            field: FILTER_PARAM.to_string(),
            code: messages::INVALID_CRITERIA.to_string(),
            message: e.to_string(),
        }])
    })?;

    criteria.validate().map_err(ValidationError::from)?;

    tracing::debug!(criteria = std::any::type_name::<C>(), "Criteria bound from request");

    Ok(criteria)
}

/// Split `filter[date][from]` into `("filter", ["date", "from"])`
///
/// Keys with unbalanced brackets are taken literally.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };

    let base = &key[..open];
    let mut rest = &key[open..];
    let mut path = Vec::new();

    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            return (key, Vec::new());
        };
        path.push(&stripped[..close]);
        rest = &stripped[close + 1..];
    }

    if !rest.is_empty() {
        return (key, Vec::new());
    }

    (base, path)
}

fn insert_at(target: &mut Value, path: &[&str], value: &str) {
    let Some((segment, rest)) = path.split_first() else {
        *target = Value::String(value.to_string());
        return;
    };

    if segment.is_empty() {
        if !target.is_array() {
            *target = Value::Array(Vec::new());
        }
        if let Value::Array(items) = target {
            items.push(Value::Null);
            if let Some(last) = items.last_mut() {
                insert_at(last, rest, value);
            }
        }
        return;
    }

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry(segment.to_string()).or_insert(Value::Null);
        insert_at(slot, rest, value);
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
