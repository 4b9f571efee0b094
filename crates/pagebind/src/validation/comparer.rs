//! Comparison rules used by validation tables.
//!
//! Rules are looked up by key ("equals", "greater than or equals", ...);
//! matching ignores case, whitespace, `_` and `-`.

use super::typed::{compare_values, parse_bool, ValueOp};
use std::fmt;
use std::sync::Arc;

/// Existence and enabled-state checks a comparer may need from the property
/// under validation.
pub trait PropertyProbe {
    /// Wait for the property to exist
    fn check_exists(&self) -> bool;

    /// Wait for the property to disappear
    fn check_not_exists(&self) -> bool;

    /// Whether the property is enabled
    fn check_enabled(&self) -> bool;
}

/// Probe with fixed answers, for comparisons outside a live page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProbe {
    /// Answer for existence checks
    pub exists: bool,
    /// Answer for enabled checks
    pub enabled: bool,
}

impl FixedProbe {
    /// Present and enabled
    #[must_use]
    pub const fn present() -> Self {
        Self {
            exists: true,
            enabled: true,
        }
    }

    /// Not present
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            exists: false,
            enabled: false,
        }
    }
}

impl PropertyProbe for FixedProbe {
    fn check_exists(&self) -> bool {
        self.exists
    }

    fn check_not_exists(&self) -> bool {
        !self.exists
    }

    fn check_enabled(&self) -> bool {
        self.enabled
    }
}

/// Normalized form of a rule key
#[must_use]
pub fn normalize_rule(rule: &str) -> String {
    rule.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A comparison rule
pub trait ValidationComparer: Send + Sync + fmt::Debug {
    /// Keys this rule answers to; the first is the display name
    fn rule_keys(&self) -> &'static [&'static str];

    /// Whether `rule` names this comparer
    fn matches_rule(&self, rule: &str) -> bool {
        let key = normalize_rule(rule);
        self.rule_keys().iter().any(|k| normalize_rule(k) == key)
    }

    /// Whether the property must exist before comparing. Rules that test
    /// existence themselves opt out.
    fn requires_existence_check(&self) -> bool {
        true
    }

    /// Whether the comparison needs the property's current value
    fn requires_field_value(&self) -> bool {
        true
    }

    /// Whether a list item missing the field still counts as a pass
    fn tolerates_missing_field(&self) -> bool {
        false
    }

    /// Compare
    fn compare(&self, property: &dyn PropertyProbe, expected: &str, actual: Option<&str>) -> bool;
}

macro_rules! value_comparer {
    ($(#[$meta:meta])* $name:ident, $op:expr, [$($key:literal),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl ValidationComparer for $name {
            fn rule_keys(&self) -> &'static [&'static str] {
                &[$($key),+]
            }

            fn compare(&self, _property: &dyn PropertyProbe, expected: &str, actual: Option<&str>) -> bool {
                compare_values($op, expected, actual)
            }
        }
    };
}

value_comparer!(
    /// Typed equality
    EqualsComparer,
    ValueOp::Equals,
    ["equals", "=", "=="]
);
value_comparer!(
    /// Typed inequality
    NotEqualsComparer,
    ValueOp::NotEquals,
    ["does not equal", "not equals", "!="]
);
value_comparer!(GreaterThanComparer, ValueOp::GreaterThan, ["greater than", ">"]);
value_comparer!(
    GreaterThanOrEqualsComparer,
    ValueOp::GreaterThanOrEquals,
    ["greater than or equals", "greater than or equal to", ">="]
);
value_comparer!(LessThanComparer, ValueOp::LessThan, ["less than", "<"]);
value_comparer!(
    LessThanOrEqualsComparer,
    ValueOp::LessThanOrEquals,
    ["less than or equals", "less than or equal to", "<="]
);

fn lowered(actual: Option<&str>) -> Option<String> {
    actual.map(|a| a.trim().to_lowercase())
}

/// Case-insensitive substring
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsComparer;

impl ValidationComparer for ContainsComparer {
    fn rule_keys(&self) -> &'static [&'static str] {
        &["contains"]
    }

    fn compare(&self, _property: &dyn PropertyProbe, expected: &str, actual: Option<&str>) -> bool {
        lowered(actual).is_some_and(|a| a.contains(&expected.trim().to_lowercase()))
    }
}

/// Negated substring. A missing value or missing list field passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoesNotContainComparer;

impl ValidationComparer for DoesNotContainComparer {
    fn rule_keys(&self) -> &'static [&'static str] {
        &["does not contain", "not contains"]
    }

    fn tolerates_missing_field(&self) -> bool {
        true
    }

    fn compare(&self, _property: &dyn PropertyProbe, expected: &str, actual: Option<&str>) -> bool {
        !lowered(actual).is_some_and(|a| a.contains(&expected.trim().to_lowercase()))
    }
}

/// Case-insensitive prefix
#[derive(Debug, Clone, Copy, Default)]
pub struct StartsWithComparer;

impl ValidationComparer for StartsWithComparer {
    fn rule_keys(&self) -> &'static [&'static str] {
        &["starts with"]
    }

    fn compare(&self, _property: &dyn PropertyProbe, expected: &str, actual: Option<&str>) -> bool {
        lowered(actual).is_some_and(|a| a.starts_with(&expected.trim().to_lowercase()))
    }
}

/// Case-insensitive suffix
#[derive(Debug, Clone, Copy, Default)]
pub struct EndsWithComparer;

impl ValidationComparer for EndsWithComparer {
    fn rule_keys(&self) -> &'static [&'static str] {
        &["ends with"]
    }

    fn compare(&self, _property: &dyn PropertyProbe, expected: &str, actual: Option<&str>) -> bool {
        lowered(actual).is_some_and(|a| a.ends_with(&expected.trim().to_lowercase()))
    }
}

/// Expected "false" inverts the check
fn wants(expected: &str) -> bool {
    parse_bool(expected) != Some(false)
}

/// Presence check. `exists | false` asks for absence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistsComparer;

impl ValidationComparer for ExistsComparer {
    fn rule_keys(&self) -> &'static [&'static str] {
        &["exists"]
    }

    fn requires_existence_check(&self) -> bool {
        false
    }

    fn requires_field_value(&self) -> bool {
        false
    }

    fn compare(&self, property: &dyn PropertyProbe, expected: &str, _actual: Option<&str>) -> bool {
        if wants(expected) {
            property.check_exists()
        } else {
            property.check_not_exists()
        }
    }
}

/// Absence check. `does not exist | false` asks for presence.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoesNotExistComparer;

impl ValidationComparer for DoesNotExistComparer {
    fn rule_keys(&self) -> &'static [&'static str] {
        &["does not exist", "not exists"]
    }

    fn requires_existence_check(&self) -> bool {
        false
    }

    fn requires_field_value(&self) -> bool {
        false
    }

    fn compare(&self, property: &dyn PropertyProbe, expected: &str, _actual: Option<&str>) -> bool {
        if wants(expected) {
            property.check_not_exists()
        } else {
            property.check_exists()
        }
    }
}

/// Enabled-state check
#[derive(Debug, Clone, Copy, Default)]
pub struct EnabledComparer;

impl ValidationComparer for EnabledComparer {
    fn rule_keys(&self) -> &'static [&'static str] {
        &["enabled", "is enabled"]
    }

    fn requires_field_value(&self) -> bool {
        false
    }

    fn compare(&self, property: &dyn PropertyProbe, expected: &str, _actual: Option<&str>) -> bool {
        property.check_enabled() == wants(expected)
    }
}

/// Disabled-state check
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEnabledComparer;

impl ValidationComparer for NotEnabledComparer {
    fn rule_keys(&self) -> &'static [&'static str] {
        &["not enabled", "disabled", "is disabled"]
    }

    fn requires_field_value(&self) -> bool {
        false
    }

    fn compare(&self, property: &dyn PropertyProbe, expected: &str, _actual: Option<&str>) -> bool {
        property.check_enabled() != wants(expected)
    }
}

/// The built-in rule set in registration order
#[must_use]
pub fn builtin_comparers() -> Vec<Arc<dyn ValidationComparer>> {
    vec![
        Arc::new(EqualsComparer),
        Arc::new(NotEqualsComparer),
        Arc::new(GreaterThanComparer),
        Arc::new(GreaterThanOrEqualsComparer),
        Arc::new(LessThanComparer),
        Arc::new(LessThanOrEqualsComparer),
        Arc::new(ContainsComparer),
        Arc::new(DoesNotContainComparer),
        Arc::new(StartsWithComparer),
        Arc::new(EndsWithComparer),
        Arc::new(ExistsComparer),
        Arc::new(DoesNotExistComparer),
        Arc::new(EnabledComparer),
        Arc::new(NotEnabledComparer),
    ]
}

/// Find the comparer for a rule key
#[must_use]
pub fn find_comparer(
    comparers: &[Arc<dyn ValidationComparer>],
    rule: &str,
) -> Option<Arc<dyn ValidationComparer>> {
    comparers.iter().find(|c| c.matches_rule(rule)).cloned()
}
