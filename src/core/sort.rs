//! Sort token parsing
//!
//! A sort token is a field name, optionally prefixed with `-` for a
//! descending order: `createdAt` sorts ascending, `-createdAt` descending.

use crate::core::error::FilterError;
use mongodb::bson::Bson;
use std::fmt;
use std::str::FromStr;

/// Direction of a sort directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// MongoDB sort value (`1` or `-1`)
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl From<SortDirection> for Bson {
    fn from(direction: SortDirection) -> Self {
        Bson::Int32(direction.as_i32())
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed sort token: the field to sort on and its direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parse a sort token
    ///
    /// Only the first `-` is a sign: `--a` sorts descending on the field `-a`.
    pub fn parse(token: &str) -> Result<Self, FilterError> {
        let (field, direction) = match token.strip_prefix('-') {
            Some(rest) => (rest, SortDirection::Descending),
            None => (token, SortDirection::Ascending),
        };

        if field.is_empty() {
            return Err(FilterError::InvalidSortToken {
                token: token.to_string(),
            });
        }

        Ok(Self::new(field, direction))
    }
}

impl FromStr for SortSpec {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a list of tokens, keeping their order as sort precedence
pub fn parse_sort_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<SortSpec>, FilterError> {
    tokens.iter().map(|t| SortSpec::parse(t.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_token_is_ascending() {
        let spec = SortSpec::parse("title").unwrap();
        assert_eq!(spec, SortSpec::new("title", SortDirection::Ascending));
    }

    #[test]
    fn test_dash_prefix_is_descending() {
        let spec: SortSpec = "-createdAt".parse().unwrap();
        assert_eq!(spec.field, "createdAt");
        assert_eq!(spec.direction, SortDirection::Descending);
    }

    #[test]
    fn test_only_first_dash_is_a_sign() {
        let spec = SortSpec::parse("--weird").unwrap();
        assert_eq!(spec.field, "-weird");
        assert_eq!(spec.direction, SortDirection::Descending);
    }

    #[test]
    fn test_empty_and_bare_dash_are_rejected() {
        assert!(matches!(
            SortSpec::parse(""),
            Err(FilterError::InvalidSortToken { .. })
        ));
        assert!(matches!(
            SortSpec::parse("-"),
            Err(FilterError::InvalidSortToken { .. })
        ));
    }

    #[test]
    fn test_token_order_is_preserved() {
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
    fn test_direction_bson_values() {
        assert_eq!(Bson::from(SortDirection::Ascending), Bson::Int32(1));
        assert_eq!(Bson::from(SortDirection::Descending), Bson::Int32(-1));
    }
}
