//! Table-driven validation: comparison rules, typed coercion, tables,
//! token expansion and reports.

pub mod comparer;
pub mod result;
pub mod table;
pub mod token;
pub mod typed;

pub use comparer::{
    builtin_comparers, find_comparer, ContainsComparer, DoesNotContainComparer,
    DoesNotExistComparer, EnabledComparer, EndsWithComparer, EqualsComparer, ExistsComparer,
    FixedProbe, GreaterThanComparer, GreaterThanOrEqualsComparer, LessThanComparer,
    LessThanOrEqualsComparer, NotEnabledComparer, NotEqualsComparer, PropertyProbe,
    StartsWithComparer, ValidationComparer,
};
pub use result::{FieldValidationResult, ItemValidationResult, ValidationResult};
pub use table::{ItemValidation, ValidationTable};
pub use token::TokenManager;
pub use typed::{compare_values, ValueOp};

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a whole list is judged against a validation table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListComparison {
    /// Every item matches
    Equals,
    /// At least one item matches
    Contains,
    /// The first item matches
    StartsWith,
    /// The last item matches
    EndsWith,
    /// No item matches
    DoesNotContain,
    /// No item matches
    DoesNotEqual,
    /// Unrecognized mode; never valid
    Other(String),
}

impl ListComparison {
    /// Parse a step phrase such as "contains" or "does not contain"
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match comparer::normalize_rule(text).as_str() {
            "equals" | "equal" | "is" => Self::Equals,
            "contains" | "contain" => Self::Contains,
            "startswith" | "startwith" => Self::StartsWith,
            "endswith" | "endwith" => Self::EndsWith,
            "doesnotcontain" | "notcontains" => Self::DoesNotContain,
            "doesnotequal" | "notequals" => Self::DoesNotEqual,
            _ => Self::Other(text.trim().to_string()),
        }
    }
}

impl fmt::Display for ListComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals => write!(f, "equals"),
            Self::Contains => write!(f, "contains"),
            Self::StartsWith => write!(f, "starts with"),
            Self::EndsWith => write!(f, "ends with"),
            Self::DoesNotContain => write!(f, "does not contain"),
            Self::DoesNotEqual => write!(f, "does not equal"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Row count comparison
pub type NumericComparison = ValueOp;

impl ValueOp {
    /// Compare two counts
    #[must_use]
    pub fn compare_counts(self, actual: usize, expected: usize) -> bool {
        self.accepts(actual.cmp(&expected))
    }

    /// Parse a phrase such as "at least" or "less than"
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match comparer::normalize_rule(text).as_str() {
            "equals" | "equal" | "exactly" | "=" | "==" => Some(Self::Equals),
            "notequals" | "doesnotequal" | "!=" => Some(Self::NotEquals),
            "greaterthan" | "morethan" | ">" => Some(Self::GreaterThan),
            "greaterthanorequals" | "atleast" | ">=" => Some(Self::GreaterThanOrEquals),
            "lessthan" | "fewerthan" | "<" => Some(Self::LessThan),
            "lessthanorequals" | "atmost" | "<=" => Some(Self::LessThanOrEquals),
            _ => None,
        }
    }
}
