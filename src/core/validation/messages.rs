//! Stable violation codes
//!
//! Violations carry these codes instead of free text so callers can
//! translate them.

/// No document matches the constrained fields
pub const EXISTS: &str = "validation.exists";

/// A document already matches the constrained fields
pub const NOT_EXISTS: &str = "validation.not_exists";

/// Request parameters cannot be mapped onto the criteria type
pub const INVALID_CRITERIA: &str = "validation.invalid_criteria";

pub const DATE_RANGE_INVALID_FORMAT: &str = "validation.date_range.invalid_format";
pub const DATE_RANGE_FROM_GREATER_TO: &str = "validation.date_range.from_greater_to";
pub const DATE_RANGE_FROM_EQUALS_TO: &str = "validation.date_range.from_equals_to";
