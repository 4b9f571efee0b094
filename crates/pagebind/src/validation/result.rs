//! Outcomes of table validations and their text report.

use serde::Serialize;
use std::fmt::{self, Write as _};

/// Outcome of one field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidationResult {
    /// Field name from the table
    pub field: String,
    /// Rule key from the table
    pub rule: String,
    /// Expected value after token expansion
    pub expected: String,
    /// Observed value, when one was read
    pub actual: Option<String>,
    /// Whether the check passed
    pub is_valid: bool,
}

impl fmt::Display for FieldValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.is_valid { "ok" } else { "x" };
        write!(f, "[{mark}] {} {} '{}'", self.field, self.rule, self.expected)?;
        match &self.actual {
            Some(actual) => write!(f, " (actual: '{actual}')"),
            None => write!(f, " (actual: <none>)"),
        }
    }
}

/// Field checks made against one list item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemValidationResult {
    /// 1-based item position
    pub index: usize,
    /// Per-field outcomes
    pub fields: Vec<FieldValidationResult>,
}

impl ItemValidationResult {
    /// Every field passed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|f| f.is_valid)
    }
}

/// Outcome of validating a table against a list or a single item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ValidationResult {
    /// Overall verdict
    pub is_valid: bool,
    /// Number of items the list had
    pub item_count: usize,
    /// Items that were checked, in order
    pub checked_items: Vec<ItemValidationResult>,
}

impl ValidationResult {
    /// Empty result for a list of `item_count` items
    #[must_use]
    pub const fn new(item_count: usize) -> Self {
        Self {
            is_valid: false,
            item_count,
            checked_items: Vec::new(),
        }
    }

    /// Single-item result
    #[must_use]
    pub fn for_item(fields: Vec<FieldValidationResult>) -> Self {
        let item = ItemValidationResult { index: 1, fields };
        Self {
            is_valid: item.is_valid(),
            item_count: 1,
            checked_items: vec![item],
        }
    }

    /// Record a checked item
    pub fn push_item(&mut self, item: ItemValidationResult) {
        self.checked_items.push(item);
    }

    /// Human-readable report of every check
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = String::new();
        let verdict = if self.is_valid { "passed" } else { "failed" };
        let _ = writeln!(out, "Validation {verdict} (items: {})", self.item_count);
        for item in &self.checked_items {
            let _ = writeln!(out, "  Item {}:", item.index);
            for field in &item.fields {
                let _ = writeln!(out, "    {field}");
            }
        }
        out
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.report())
    }
}
