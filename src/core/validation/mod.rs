//! Validation of criteria and documents
//!
//! Violations are reported with the stable codes of [`messages`] so they can
//! be translated by the caller.

pub mod date_range;
pub mod existence;
pub mod messages;

pub use date_range::{DateRangeOutcome, DateRangeRule, valid_date_range, valid_strict_date_range};
pub use existence::{
    ConstraintDefinitionError, ExistenceConstraint, ExistenceMode, ExistenceValidator,
};
