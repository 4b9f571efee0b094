//! Typed coercion behind the value-family comparers.
//!
//! The expected side picks the type: candidates are tried in the order
//! date/time, boolean, integer, float, string, and the first one the
//! expected text parses as wins. An actual value that does not parse as that
//! type compares as the type's default. A rule with no meaning for a type
//! (ordering on booleans or strings) falls through to the next candidate.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%A, %B %d, %Y",
];

/// Value comparison rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOp {
    /// actual == expected
    Equals,
    /// actual != expected
    NotEquals,
    /// actual > expected
    GreaterThan,
    /// actual >= expected
    GreaterThanOrEquals,
    /// actual < expected
    LessThan,
    /// actual <= expected
    LessThanOrEquals,
}

impl ValueOp {
    const fn is_equality(self) -> bool {
        matches!(self, Self::Equals | Self::NotEquals)
    }

    /// Apply the rule to `actual.cmp(expected)`
    #[must_use]
    pub const fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Equals => matches!(ordering, Ordering::Equal),
            Self::NotEquals => !matches!(ordering, Ordering::Equal),
            Self::GreaterThan => matches!(ordering, Ordering::Greater),
            Self::GreaterThanOrEquals => !matches!(ordering, Ordering::Less),
            Self::LessThan => matches!(ordering, Ordering::Less),
            Self::LessThanOrEquals => !matches!(ordering, Ordering::Greater),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Candidate {
    Date,
    Bool,
    Int,
    Float,
    Text,
}

const CANDIDATES: [Candidate; 5] = [
    Candidate::Date,
    Candidate::Bool,
    Candidate::Int,
    Candidate::Float,
    Candidate::Text,
];

#[derive(Debug, Clone, PartialEq)]
enum Typed {
    Date(NaiveDateTime),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// The rule has no meaning for the type
#[derive(Debug)]
struct Unsupported;

impl Candidate {
    fn parse(self, text: &str) -> Option<Typed> {
        match self {
            Self::Date => parse_date(text).map(Typed::Date),
            Self::Bool => parse_bool(text).map(Typed::Bool),
            Self::Int => text.parse::<i64>().ok().map(Typed::Int),
            Self::Float => text.parse::<f64>().ok().map(Typed::Float),
            Self::Text => Some(Typed::Text(text.to_string())),
        }
    }

    fn default_value(self) -> Typed {
        match self {
            Self::Date => Typed::Date(NaiveDateTime::default()),
            Self::Bool => Typed::Bool(false),
            Self::Int => Typed::Int(0),
            Self::Float => Typed::Float(0.0),
            Self::Text => Typed::Text(String::new()),
        }
    }
}

fn apply(op: ValueOp, expected: &Typed, actual: &Typed) -> Result<bool, Unsupported> {
    let ordering = match (expected, actual) {
        (Typed::Date(e), Typed::Date(a)) => a.cmp(e),
        (Typed::Int(e), Typed::Int(a)) => a.cmp(e),
        (Typed::Float(e), Typed::Float(a)) => a.partial_cmp(e).ok_or(Unsupported)?,
        (Typed::Bool(e), Typed::Bool(a)) if op.is_equality() => a.cmp(e),
        (Typed::Text(e), Typed::Text(a)) if op.is_equality() => {
            if a.to_lowercase() == e.to_lowercase() {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
        _ => return Err(Unsupported),
    };
    Ok(op.accepts(ordering))
}

/// Compare an expected table value against an observed value.
///
/// Never fails: a comparison no candidate type supports is simply false.
#[must_use]
pub fn compare_values(op: ValueOp, expected: &str, actual: Option<&str>) -> bool {
    let expected = expected.trim();
    let actual = actual.map(str::trim);

    for candidate in CANDIDATES {
        let Some(expected_value) = candidate.parse(expected) else {
            continue;
        };
        let actual_value = actual
            .and_then(|a| candidate.parse(a))
            .unwrap_or_else(|| candidate.default_value());

        if let Ok(result) = apply(op, &expected_value, &actual_value) {
            return result;
        }
    }
    false
}

/// Case-insensitive boolean parse
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse the date and date/time forms accepted in tables
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_date_forms() {
            let a = parse_date("2/22/2013").unwrap();
            let b = parse_date("February 22, 2013").unwrap();
            let c = parse_date("2013-02-22").unwrap();
            assert_eq!(a, b);
            assert_eq!(b, c);
            assert!(parse_date("2013-02-22 10:30:00").is_some());
            assert!(parse_date("2013-02-22T10:30:00Z").is_some());
        }

        #[test]
        fn test_numbers_are_not_dates() {
            assert!(parse_date("2").is_none());
            assert!(parse_date("2.0").is_none());
            assert!(parse_date("2013").is_none());
            assert!(parse_date("").is_none());
        }

        #[test]
        fn test_parse_bool_ignores_case() {
            assert_eq!(parse_bool("TRUE"), Some(true));
            assert_eq!(parse_bool(" false "), Some(false));
            assert_eq!(parse_bool("yes"), None);
        }
    }

    mod compare_tests {
        use super::*;

        #[test]
        fn test_numeric_coercion() {
            assert!(compare_values(ValueOp::Equals, "2.0", Some("2")));
            assert!(compare_values(ValueOp::Equals, "10", Some("10")));
            assert!(!compare_values(ValueOp::Equals, "10", Some("11")));
        }

        #[test]
        fn test_boolean_equality() {
            assert!(compare_values(ValueOp::Equals, "true", Some("True")));
            assert!(compare_values(ValueOp::NotEquals, "true", Some("false")));
        }

        #[test]
        fn test_date_equality() {
            assert!(compare_values(
                ValueOp::Equals,
                "2/22/2013",
                Some("February 22, 2013")
            ));
        }

        #[test]
        fn test_ordering_on_strings_is_false() {
            assert!(!compare_values(ValueOp::GreaterThan, "foo", Some("foo")));
            assert!(!compare_values(ValueOp::LessThan, "a", Some("b")));
        }

        #[test]
        fn test_ordering_on_bools_falls_through_to_false() {
            assert!(!compare_values(ValueOp::GreaterThan, "true", Some("false")));
        }

        #[test]
        fn test_ordering_on_numbers_and_dates() {
            assert!(compare_values(ValueOp::GreaterThan, "5", Some("6")));
            assert!(!compare_values(ValueOp::GreaterThan, "5", Some("5")));
            assert!(compare_values(ValueOp::GreaterThanOrEquals, "5", Some("5")));
            assert!(compare_values(ValueOp::LessThan, "1.5", Some("1.25")));
            assert!(compare_values(
                ValueOp::LessThan,
                "2013-02-22",
                Some("2013-02-21")
            ));
        }

        #[test]
        fn test_unparsable_actual_uses_default() {
            // "abc" is not an integer so it compares as 0
            assert!(compare_values(ValueOp::LessThan, "5", Some("abc")));
            assert!(compare_values(ValueOp::Equals, "0", None));
        }

        #[test]
        fn test_string_equality_ignores_case() {
            assert!(compare_values(ValueOp::Equals, "Hello", Some("hello")));
            assert!(compare_values(ValueOp::NotEquals, "Hello", Some("world")));
            assert!(!compare_values(ValueOp::Equals, "Hello", None));
        }
    }
}
