//! Date formats written with PHP-style format letters
//!
//! Date patterns in configuration and constraints use the compact letter
//! notation (`Y-m-d`, `d/m/Y H:i`) and are translated once to a chrono
//! strftime pattern.
//!
//! | Letter | Meaning                     | chrono |
//! |--------|-----------------------------|--------|
//! | `Y`    | 4-digit year                | `%Y`   |
//! | `y`    | 2-digit year                | `%y`   |
//! | `m`    | month, zero padded          | `%m`   |
//! | `n`    | month, no padding           | `%-m`  |
//! | `d`    | day of month, zero padded   | `%d`   |
//! | `j`    | day of month, no padding    | `%-d`  |
//! | `M`    | short month name            | `%b`   |
//! | `F`    | full month name             | `%B`   |
//! | `D`    | short weekday name          | `%a`   |
//! | `l`    | full weekday name           | `%A`   |
//! | `H`    | hour 00-23                  | `%H`   |
//! | `G`    | hour 0-23                   | `%-H`  |
//! | `i`    | minutes                     | `%M`   |
//! | `s`    | seconds                     | `%S`   |
//!
//! `\` escapes the next character; every other non-letter is a literal.

use crate::core::error::ConfigError;
use chrono::format::{Parsed, StrftimeItems};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format letters accepted in date patterns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateFormat {
    pattern: String,
    strftime: String,
    has_time: bool,
}

impl DateFormat {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let mut strftime = String::with_capacity(pattern.len() * 2);
        let mut has_time = false;
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            let directive = match c {
                'Y' => "%Y",
                'y' => "%y",
                'm' => "%m",
                'n' => "%-m",
                'd' => "%d",
                'j' => "%-d",
                'M' => "%b",
                'F' => "%B",
                'D' => "%a",
                'l' => "%A",
                'H' => "%H",
                'G' => "%-H",
                'i' => "%M",
                's' => "%S",
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        push_literal(&mut strftime, escaped);
                    }
                    continue;
                }
                c if c.is_ascii_alphabetic() => {
                    return Err(ConfigError::InvalidValue {
                        field: "format".to_string(),
                        value: pattern.to_string(),
                        message: format!("unsupported format letter '{}'", c),
                    });
                }
                c => {
                    push_literal(&mut strftime, c);
                    continue;
                }
            };

            if matches!(c, 'H' | 'G' | 'i' | 's') {
                has_time = true;
            }
            strftime.push_str(directive);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            strftime,
            has_time,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Parse a value; dates without a time part resolve to midnight
    ///
    /// Missing minutes and seconds read as zero.
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let mut parsed = Parsed::new();
        chrono::format::parse(&mut parsed, value, StrftimeItems::new(&self.strftime)).ok()?;

        let date = parsed.to_naive_date().ok()?;
        let time = if self.has_time {
            // Hour-only patterns leave the minute unset
            if parsed.minute().is_none() {
                parsed.set_minute(0).ok()?;
            }
            parsed.to_naive_time().ok()?
        } else {
            NaiveTime::default()
        };

        Some(date.and_time(time))
    }

    pub fn format(&self, value: &NaiveDateTime) -> String {
        value.format(&self.strftime).to_string()
    }

    /// Parse a value and check that formatting it again gives the same text
    ///
    /// Rejects values that only parse loosely, like unpadded numbers under a
    /// padded format.
    pub fn parse_exact(&self, value: &str) -> Option<NaiveDateTime> {
        let parsed = self.parse(value)?;
        (self.format(&parsed) == value).then_some(parsed)
    }
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            pattern: "Y-m-d".to_string(),
            strftime: "%Y-%m-%d".to_string(),
            has_time: false,
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl TryFrom<String> for DateFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DateFormat> for String {
    fn from(format: DateFormat) -> Self {
        format.pattern
    }
}
