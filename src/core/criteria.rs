//! Filter criteria and range values
//!
//! Criteria are flat value objects whose property names select filter
//! handlers. Typed criteria structs are converted into a [`FilterCriteria`]
//! map through serde, which keeps the fields in declaration order.

use crate::core::error::FilterError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Key of the lower bound of a range value
pub const RANGE_FROM: &str = "from";

/// Key of the upper bound of a range value
pub const RANGE_TO: &str = "to";

/// Criteria properties in declared order
pub type FilterCriteria = IndexMap<String, Value>;

/// A typed criteria object bound from a request
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize, Default)]
/// struct OrderCriteria {
///     date: Option<RangeValue>,
///     sort: Option<Vec<String>>,
/// }
///
/// impl Criteria for OrderCriteria {
///     fn accepts_sort() -> bool {
///         true
///     }
/// }
/// ```
pub trait Criteria: Serialize + DeserializeOwned + Validate + Send {
    /// Whether the `sort` query parameter is injected into a `sort` property
    fn accepts_sort() -> bool {
        false
    }
}

/// Convert any serializable criteria object into an ordered property map
///
/// Fails when the value does not serialize to an object.
pub fn to_filter_criteria<T: Serialize + ?Sized>(
    criteria: &T,
) -> Result<FilterCriteria, FilterError> {
    let value = serde_json::to_value(criteria).map_err(|e| FilterError::InvalidValue {
        property: String::new(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Null => Ok(FilterCriteria::new()),
        other => Err(FilterError::InvalidValue {
            property: String::new(),
            message: format!("criteria must be an object, got {}", json_type_name(&other)),
        }),
    }
}

/// JSON type name used in error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A pair of optional bounds
///
/// An empty string counts as an absent bound. Keys other than `from` and
/// `to` are kept in `extra` so validation can reject them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl RangeValue {
    pub fn new(from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            extra: IndexMap::new(),
        }
    }

    /// Whether the value carried keys other than `from` and `to`
    pub fn has_unknown_keys(&self) -> bool {
        !self.extra.is_empty()
    }

    pub fn lower(&self) -> Option<&str> {
        self.from.as_deref().filter(|s| !s.is_empty())
    }

    pub fn upper(&self) -> Option<&str> {
        self.to.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower().is_none() && self.upper().is_none()
    }

    /// Read a range from a criteria value
    pub fn from_value(property: &str, value: &Value) -> Result<Self, FilterError> {
        if !value.is_object() {
            return Err(FilterError::InvalidValue {
                property: property.to_string(),
                message: format!("expected a range object, got {}", json_type_name(value)),
            });
        }

        serde_json::from_value(value.clone()).map_err(|e| FilterError::InvalidValue {
            property: property.to_string(),
            message: e.to_string(),
        })
    }
}
