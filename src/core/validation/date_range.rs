//! Structural validation of date range values
//!
//! A range value is a mapping holding at most the `from` and `to` keys. Each
//! present bound must be a string that survives a parse/format round trip
//! under the configured [`DateFormat`], which rejects values a lenient parser
//! would silently normalize (`2025-02-30`). When both bounds are present they
//! must be ordered.

use super::messages;
use crate::config::DateRangeConfig;
use crate::core::criteria::{RANGE_FROM, RANGE_TO, RangeValue, json_type_name};
use crate::core::date_format::DateFormat;
use crate::core::error::ValidationError;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::borrow::Cow;

/// Result of checking one range value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangeOutcome {
    Valid,
    /// An unknown key, a non-string bound, or a bound not matching the format
    InvalidFormat,
    FromGreaterThanTo,
    /// `from == to` while equal bounds are disallowed
    FromEqualsToDisallowed,
}

impl DateRangeOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, DateRangeOutcome::Valid)
    }

    /// Violation code, `None` when valid
    pub fn code(&self) -> Option<&'static str> {
        match self {
            DateRangeOutcome::Valid => None,
            DateRangeOutcome::InvalidFormat => Some(messages::DATE_RANGE_INVALID_FORMAT),
            DateRangeOutcome::FromGreaterThanTo => Some(messages::DATE_RANGE_FROM_GREATER_TO),
            DateRangeOutcome::FromEqualsToDisallowed => Some(messages::DATE_RANGE_FROM_EQUALS_TO),
        }
    }
}

/// Date range constraint: bound format plus whether `from == to` is accepted
#[derive(Debug, Clone, PartialEq)]
pub struct DateRangeRule {
    pub format: DateFormat,
    pub allow_equal: bool,
}

impl Default for DateRangeRule {
    fn default() -> Self {
        Self {
            format: DateFormat::default(),
            allow_equal: true,
        }
    }
}

impl From<&DateRangeConfig> for DateRangeRule {
    fn from(config: &DateRangeConfig) -> Self {
        Self::new(config.format.clone(), config.allow_equal)
    }
}

impl DateRangeRule {
    pub fn new(format: DateFormat, allow_equal: bool) -> Self {
        Self {
            format,
            allow_equal,
        }
    }

    /// Check a raw range value
    ///
    /// An absent or null value is valid. Keys are checked in their stored
    /// order and the first offending key decides the outcome. A value that is
    /// neither a mapping nor a list is a contract violation, reported as
    /// [`ValidationError::UnexpectedType`] instead of an outcome.
    pub fn validate(&self, value: Option<&Value>) -> Result<DateRangeOutcome, ValidationError> {
        let entries: Vec<(Cow<'_, str>, &Value)> = match value {
            None | Some(Value::Null) => return Ok(DateRangeOutcome::Valid),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, bound)| (Cow::Borrowed(key.as_str()), bound))
                .collect(),
            // List positions act as keys, which are never `from` or `to`
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, bound)| (Cow::Owned(index.to_string()), bound))
                .collect(),
            Some(other) => {
                return Err(ValidationError::UnexpectedType {
                    expected: "range object".to_string(),
                    actual: json_type_name(other).to_string(),
                });
            }
        };

        let mut from = None;
        let mut to = None;

        for (key, bound) in entries {
            let slot = match key.as_ref() {
                RANGE_FROM => &mut from,
                RANGE_TO => &mut to,
                _ => return Ok(DateRangeOutcome::InvalidFormat),
            };

            match bound.as_str().and_then(|text| self.format.parse_exact(text)) {
                Some(parsed) => *slot = Some(parsed),
                None => return Ok(DateRangeOutcome::InvalidFormat),
            }
        }

        Ok(self.compare(from, to))
    }

    /// Check a typed range value; `from` is checked before `to`
    pub fn check_range(&self, range: &RangeValue) -> DateRangeOutcome {
        if range.has_unknown_keys() {
            return DateRangeOutcome::InvalidFormat;
        }

        let mut bounds = [None, None];

        for (slot, bound) in bounds.iter_mut().zip([&range.from, &range.to]) {
            if let Some(text) = bound {
                match self.format.parse_exact(text) {
                    Some(parsed) => *slot = Some(parsed),
                    None => return DateRangeOutcome::InvalidFormat,
                }
            }
        }

        let [from, to] = bounds;
        self.compare(from, to)
    }

    /// [`check_range`](Self::check_range) as a `validator` custom function result
    pub fn check(&self, range: &RangeValue) -> Result<(), validator::ValidationError> {
        let outcome = self.check_range(range);
        match outcome.code() {
            None => Ok(()),
            Some(code) => {
                let mut error = validator::ValidationError::new(code);
                error.add_param(Cow::Borrowed("format"), &self.format.pattern());
                Err(error)
            }
        }
    }

    fn compare(&self, from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> DateRangeOutcome {
        match (from, to) {
            (Some(from), Some(to)) if from > to => DateRangeOutcome::FromGreaterThanTo,
            (Some(from), Some(to)) if from == to && !self.allow_equal => {
                DateRangeOutcome::FromEqualsToDisallowed
            }
            _ => DateRangeOutcome::Valid,
        }
    }
}

/// `Y-m-d` range with equal bounds allowed, for `#[validate(custom(function = ...))]`
pub fn valid_date_range(range: &RangeValue) -> Result<(), validator::ValidationError> {
    DateRangeRule::default().check(range)
}

/// `Y-m-d` range rejecting equal bounds
pub fn valid_strict_date_range(range: &RangeValue) -> Result<(), validator::ValidationError> {
    DateRangeRule::new(DateFormat::default(), false).check(range)
}
