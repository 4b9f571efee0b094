//! Validation tables: `Field | Rule | Value` rows from a BDD step.

use super::comparer::{find_comparer, PropertyProbe, ValidationComparer};
use super::token::TokenManager;
use crate::page_object::normalize_property_name;
use crate::result::{PageError, PageResult};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

const FIELD_HEADERS: &[&str] = &["field", "fieldname", "property", "name"];
const RULE_HEADERS: &[&str] = &["rule", "comparison", "comparisontype", "compare"];
const VALUE_HEADERS: &[&str] = &["value", "expected", "expectedvalue", "comparisonvalue"];

#[derive(Debug, Clone)]
struct Binding {
    field_name: String,
    comparison_value: String,
    comparer: Arc<dyn ValidationComparer>,
}

/// One table row.
///
/// Raw values are kept as written (trimmed). Binding resolves the comparer
/// and expands tokens in the value exactly once; later binds are no-ops.
#[derive(Debug, Clone)]
pub struct ItemValidation {
    raw_field_name: String,
    raw_comparison_type: String,
    raw_comparison_value: String,
    binding: Option<Binding>,
}

impl ItemValidation {
    /// Create an unbound validation
    #[must_use]
    pub fn new(field: impl Into<String>, rule: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            raw_field_name: field.into().trim().to_string(),
            raw_comparison_type: rule.into().trim().to_string(),
            raw_comparison_value: value.into().trim().to_string(),
            binding: None,
        }
    }

    /// Field name as written
    #[must_use]
    pub fn raw_field_name(&self) -> &str {
        &self.raw_field_name
    }

    /// Rule key as written
    #[must_use]
    pub fn raw_comparison_type(&self) -> &str {
        &self.raw_comparison_type
    }

    /// Expected value as written
    #[must_use]
    pub fn raw_comparison_value(&self) -> &str {
        &self.raw_comparison_value
    }

    /// Normalized field name used for property lookup
    #[must_use]
    pub fn field_name(&self) -> String {
        self.binding.as_ref().map_or_else(
            || normalize_property_name(&self.raw_field_name),
            |b| b.field_name.clone(),
        )
    }

    /// Expected value, token-expanded once bound
    #[must_use]
    pub fn comparison_value(&self) -> &str {
        self.binding
            .as_ref()
            .map_or(&self.raw_comparison_value, |b| &b.comparison_value)
    }

    /// Whether [`Self::bind`] has run
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Bound comparer
    pub fn comparer(&self) -> PageResult<&Arc<dyn ValidationComparer>> {
        self.binding
            .as_ref()
            .map(|b| &b.comparer)
            .ok_or_else(|| PageError::UnboundValidation {
                field: self.raw_field_name.clone(),
            })
    }

    /// Resolve the comparer and expand tokens in the value
    pub fn bind(
        &mut self,
        comparers: &[Arc<dyn ValidationComparer>],
        tokens: &TokenManager,
    ) -> PageResult<()> {
        if self.binding.is_some() {
            return Ok(());
        }
        let comparer = find_comparer(comparers, &self.raw_comparison_type).ok_or_else(|| {
            PageError::UnknownComparison {
                rule: self.raw_comparison_type.clone(),
                known: comparers
                    .iter()
                    .filter_map(|c| c.rule_keys().first().map(|k| (*k).to_string()))
                    .collect(),
            }
        })?;
        self.binding = Some(Binding {
            field_name: normalize_property_name(&self.raw_field_name),
            comparison_value: tokens.expand(&self.raw_comparison_value),
            comparer,
        });
        Ok(())
    }

    /// Evaluate against an observed value
    pub fn compare(&self, property: &dyn PropertyProbe, actual: Option<&str>) -> PageResult<bool> {
        let comparer = self.comparer()?;
        Ok(comparer.compare(property, self.comparison_value(), actual))
    }
}

impl fmt::Display for ItemValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.raw_field_name, self.raw_comparison_type, self.comparison_value()
        )
    }
}

#[derive(Debug, Deserialize)]
struct TableRow {
    field: String,
    rule: String,
    #[serde(default)]
    value: serde_yaml_ng::Value,
}

fn yaml_scalar(value: &serde_yaml_ng::Value) -> PageResult<String> {
    use serde_yaml_ng::Value as Y;
    match value {
        Y::Null => Ok(String::new()),
        Y::Bool(b) => Ok(b.to_string()),
        Y::Number(n) => Ok(n.to_string()),
        Y::String(s) => Ok(s.clone()),
        other => Err(PageError::InvalidTable {
            message: format!("value must be a scalar, got {other:?}"),
        }),
    }
}

fn column(header: &[&str], accepted: &[&str], label: &str) -> PageResult<usize> {
    header
        .iter()
        .position(|h| accepted.contains(&normalize_property_name(h).as_str()))
        .ok_or_else(|| PageError::InvalidTable {
            message: format!("missing '{label}' column in header [{}]", header.join(", ")),
        })
}

/// Ordered validations for one step
#[derive(Debug, Clone, Default)]
pub struct ValidationTable {
    validations: Vec<ItemValidation>,
}

impl ValidationTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row
    pub fn add_validation(
        &mut self,
        field: impl Into<String>,
        rule: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut ItemValidation {
        self.validations.push(ItemValidation::new(field, rule, value));
        let last = self.validations.len() - 1;
        &mut self.validations[last]
    }

    /// Builder-style append
    #[must_use]
    pub fn with(mut self, field: &str, rule: &str, value: &str) -> Self {
        self.add_validation(field, rule, value);
        self
    }

    /// Parse a header row plus data rows. Columns may appear in any order
    /// and the header is matched loosely.
    pub fn from_rows<R, C>(header: &[&str], rows: R) -> PageResult<Self>
    where
        R: IntoIterator<Item = C>,
        C: AsRef<[String]>,
    {
        let field = column(header, FIELD_HEADERS, "Field")?;
        let rule = column(header, RULE_HEADERS, "Rule")?;
        let value = column(header, VALUE_HEADERS, "Value")?;

        let mut table = Self::new();
        for (line, row) in rows.into_iter().enumerate() {
            let row = row.as_ref();
            let cell = |i: usize| {
                row.get(i).ok_or_else(|| PageError::InvalidTable {
                    message: format!("row {} has {} cells, expected {}", line + 1, row.len(), header.len()),
                })
            };
            table.add_validation(cell(field)?.as_str(), cell(rule)?.as_str(), cell(value)?.as_str());
        }
        Ok(table)
    }

    /// Parse a YAML list of `{field, rule, value}` rows
    pub fn from_yaml(yaml: &str) -> PageResult<Self> {
        let rows: Vec<TableRow> = serde_yaml_ng::from_str(yaml)?;
        let mut table = Self::new();
        for row in rows {
            let value = yaml_scalar(&row.value)?;
            table.add_validation(row.field, row.rule, value);
        }
        Ok(table)
    }

    /// Rows in order
    #[must_use]
    pub fn validations(&self) -> &[ItemValidation] {
        &self.validations
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.validations.len()
    }

    /// Whether the table has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validations.is_empty()
    }

    /// Whether every row is bound
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.validations.iter().all(ItemValidation::is_bound)
    }

    /// Bind every row. The first unknown rule fails the whole table.
    pub fn bind_all(
        &mut self,
        comparers: &[Arc<dyn ValidationComparer>],
        tokens: &TokenManager,
    ) -> PageResult<()> {
        for validation in &mut self.validations {
            validation.bind(comparers, tokens)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationTable {
    type Item = &'a ItemValidation;
    type IntoIter = std::slice::Iter<'a, ItemValidation>;

    fn into_iter(self) -> Self::IntoIter {
        self.validations.iter()
    }
}

impl fmt::Display for ValidationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "| Field | Rule | Value |")?;
        for v in &self.validations {
            writeln!(
                f,
                "| {} | {} | {} |",
                v.raw_field_name, v.raw_comparison_type, v.comparison_value()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::validation::comparer::{builtin_comparers, FixedProbe};

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    mod item_tests {
        use super::*;

        #[test]
        fn test_new_trims_raw_values() {
            let v = ItemValidation::new(" First Name ", " equals ", " Bob ");
            assert_eq!(v.raw_field_name(), "First Name");
            assert_eq!(v.raw_comparison_type(), "equals");
            assert_eq!(v.raw_comparison_value(), "Bob");
            assert_eq!(v.field_name(), "firstname");
            assert!(!v.is_bound());
        }

        #[test]
        fn test_unbound_compare_fails() {
            let v = ItemValidation::new("name", "equals", "x");
            let err = v.compare(&FixedProbe::present(), Some("x")).unwrap_err();
            assert!(matches!(err, PageError::UnboundValidation { .. }));
        }

        #[test]
        fn test_bind_expands_tokens_once() {
            let tokens = TokenManager::with_tokens([("user", "bob")]);
            let mut v = ItemValidation::new("name", "equals", "{user}");
            v.bind(&builtin_comparers(), &tokens).unwrap();
            assert_eq!(v.comparison_value(), "bob");

            tokens.set_token("user", "alice");
            v.bind(&builtin_comparers(), &tokens).unwrap();
            assert_eq!(v.comparison_value(), "bob");
            assert!(v.compare(&FixedProbe::present(), Some("BOB")).unwrap());
        }

        #[test]
        fn test_unknown_rule_lists_known_rules() {
            let mut v = ItemValidation::new("name", "roughly", "x");
            let err = v.bind(&builtin_comparers(), &TokenManager::new()).unwrap_err();
            match err {
                PageError::UnknownComparison { rule, known } => {
                    assert_eq!(rule, "roughly");
                    assert!(known.contains(&"equals".to_string()));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_from_rows_any_column_order() {
            let table = ValidationTable::from_rows(
                &["Value", "Field", "Rule"],
                vec![row(&["Bob", "Name", "equals"]), row(&["3", "Age", ">"])],
            )
            .unwrap();
            assert_eq!(table.len(), 2);
            assert_eq!(table.validations()[0].raw_field_name(), "Name");
            assert_eq!(table.validations()[1].raw_comparison_type(), ">");
        }

        #[test]
        fn test_from_rows_missing_column() {
            let err = ValidationTable::from_rows(&["Field", "Value"], Vec::<Vec<String>>::new())
                .unwrap_err();
            assert!(err.to_string().contains("'Rule'"));
        }

        #[test]
        fn test_from_rows_short_row() {
            let err = ValidationTable::from_rows(&["Field", "Rule", "Value"], vec![row(&["a", "b"])])
                .unwrap_err();
            assert!(matches!(err, PageError::InvalidTable { .. }));
        }

        #[test]
        fn test_from_yaml_accepts_scalars() {
            let table = ValidationTable::from_yaml(
                "- field: Name\n  rule: equals\n  value: Bob\n\
                 - field: Age\n  rule: greater than\n  value: 21\n\
                 - field: Active\n  rule: equals\n  value: true\n\
                 - field: Banner\n  rule: does not exist\n",
            )
            .unwrap();
            assert_eq!(table.len(), 4);
            assert_eq!(table.validations()[1].raw_comparison_value(), "21");
            assert_eq!(table.validations()[2].raw_comparison_value(), "true");
            assert_eq!(table.validations()[3].raw_comparison_value(), "");
        }

        #[test]
        fn test_bind_all_stops_at_unknown_rule() {
            let mut table = ValidationTable::new()
                .with("a", "equals", "1")
                .with("b", "bogus", "2");
            assert!(table.bind_all(&builtin_comparers(), &TokenManager::new()).is_err());
            assert!(!table.is_bound());
        }

        #[test]
        fn test_display_renders_rows() {
            let table = ValidationTable::new().with("Name", "equals", "Bob");
            assert!(table.to_string().contains("| Name | equals | Bob |"));
        }
    }
}
