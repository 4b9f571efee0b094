//! Actions registered by [`ActionRepository::initialize`].
//!
//! Validation failures come back from these actions as element-execute
//! errors carrying the full per-field report.

use super::{Action, ActionContext, ActionValue, ElementLocator};
use crate::result::{PageError, PageResult};
use crate::validation::{ListComparison, TokenManager, ValidationResult, ValidationTable};
use std::time::Duration;

fn missing(action: &str, what: &str) -> PageError {
    PageError::ActionFailed {
        action: action.to_string(),
        message: format!("{what} was not provided"),
    }
}

fn injected<'a>(locator: Option<&'a ElementLocator>, action: &str) -> PageResult<&'a ElementLocator> {
    locator.ok_or_else(|| missing(action, "element locator"))
}

fn property_name<'a>(context: &'a ActionContext, action: &str) -> PageResult<&'a str> {
    context.property_name().ok_or_else(|| missing(action, "property name"))
}

fn table<'a>(context: &'a ActionContext, action: &str) -> PageResult<&'a ValidationTable> {
    context.validation().ok_or_else(|| missing(action, "validation table"))
}

fn failed_validation(property: &str, locator: &ElementLocator, result: &ValidationResult) -> PageError {
    PageError::element(property, locator.page().name(), result.report())
}

/// Declares an action whose only state is its injected locator and whose
/// body is `run(&self, locator, context)`.
macro_rules! locator_action {
    ($(#[$meta:meta])* $type:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        pub struct $type {
            locator: Option<ElementLocator>,
        }

        impl Action for $type {
            fn name(&self) -> &str {
                $name
            }

            fn set_element_locator(&mut self, locator: ElementLocator) {
                self.locator = Some(locator);
            }

            fn execute(&self, context: &ActionContext) -> PageResult<ActionValue> {
                let locator = injected(self.locator.as_ref(), $name)?;
                self.run(locator, context)
            }
        }
    };
}

locator_action!(
    /// Click an element
    ClickItemAction,
    "ClickItem"
);

impl ClickItemAction {
    #[allow(clippy::unused_self)]
    fn run(&self, locator: &ElementLocator, context: &ActionContext) -> PageResult<ActionValue> {
        let name = property_name(context, "ClickItem")?;
        locator.get_element(name)?.click_element()?;
        Ok(ActionValue::Unit)
    }
}

locator_action!(
    /// Read the current value of a property
    GetItemValueAction,
    "GetItemValue"
);

impl GetItemValueAction {
    #[allow(clippy::unused_self)]
    fn run(&self, locator: &ElementLocator, context: &ActionContext) -> PageResult<ActionValue> {
        let name = property_name(context, "GetItemValue")?;
        Ok(ActionValue::Value(locator.get_property(name)?.current_value()?))
    }
}

locator_action!(
    /// Validate fields of the page against the context's table
    ValidateItemAction,
    "ValidateItem"
);

impl ValidateItemAction {
    #[allow(clippy::unused_self)]
    fn run(&self, locator: &ElementLocator, context: &ActionContext) -> PageResult<ActionValue> {
        let table = table(context, "ValidateItem")?;
        let mut fields = Vec::with_capacity(table.len());
        for validation in table {
            let property = locator.get_property(&validation.field_name())?;
            fields.push(property.validate_item(validation)?);
        }
        let result = ValidationResult::for_item(fields);
        if result.is_valid {
            Ok(ActionValue::Validation(result))
        } else {
            let subject = context.property_name().unwrap_or_else(|| locator.page().name());
            Err(failed_validation(subject, locator, &result))
        }
    }
}

locator_action!(
    /// Judge a list against the context's table; `Equals` when no list
    /// comparison is given
    ValidateListAction,
    "ValidateList"
);

impl ValidateListAction {
    #[allow(clippy::unused_self)]
    fn run(&self, locator: &ElementLocator, context: &ActionContext) -> PageResult<ActionValue> {
        let name = property_name(context, "ValidateList")?;
        let table = table(context, "ValidateList")?;
        let comparison = context
            .list_comparison()
            .cloned()
            .unwrap_or(ListComparison::Equals);
        let result = locator.get_element(name)?.validate_list(&comparison, table)?;
        if result.is_valid {
            Ok(ActionValue::Validation(result))
        } else {
            Err(failed_validation(name, locator, &result))
        }
    }
}

locator_action!(
    /// List item at the context's 1-based index
    GetListItemByIndexAction,
    "GetListItemByIndex"
);

impl GetListItemByIndexAction {
    #[allow(clippy::unused_self)]
    fn run(&self, locator: &ElementLocator, context: &ActionContext) -> PageResult<ActionValue> {
        let name = property_name(context, "GetListItemByIndex")?;
        let index = context
            .index()
            .ok_or_else(|| missing("GetListItemByIndex", "list index"))?;
        locator
            .get_element(name)?
            .get_item_at_index(index)?
            .map(ActionValue::Item)
            .ok_or_else(|| {
                PageError::element(name, locator.page().name(), format!("list has no item at index {index}"))
            })
    }
}

locator_action!(
    /// First list item matching the context's table
    GetListItemByCriteriaAction,
    "GetListItemByCriteria"
);

impl GetListItemByCriteriaAction {
    #[allow(clippy::unused_self)]
    fn run(&self, locator: &ElementLocator, context: &ActionContext) -> PageResult<ActionValue> {
        let name = property_name(context, "GetListItemByCriteria")?;
        let table = table(context, "GetListItemByCriteria")?;
        locator
            .get_element(name)?
            .find_item_in_list(table)?
            .map(ActionValue::Item)
            .ok_or_else(|| {
                PageError::element(
                    name,
                    locator.page().name(),
                    format!("no list item matches\n{table}"),
                )
            })
    }
}

locator_action!(
    /// Compare the number of list rows
    ValidateListRowCountAction,
    "ValidateListRowCount"
);

impl ValidateListRowCountAction {
    #[allow(clippy::unused_self)]
    fn run(&self, locator: &ElementLocator, context: &ActionContext) -> PageResult<ActionValue> {
        let name = property_name(context, "ValidateListRowCount")?;
        let (comparison, expected) = context
            .row_count()
            .ok_or_else(|| missing("ValidateListRowCount", "row count"))?;
        let (passed, actual) = locator
            .get_element(name)?
            .validate_list_row_count(comparison, expected)?;
        if passed {
            Ok(ActionValue::Count(actual))
        } else {
            Err(PageError::element(
                name,
                locator.page().name(),
                format!("expected row count {comparison:?} {expected}, found {actual}"),
            ))
        }
    }
}

locator_action!(
    /// Visually mark an element
    HighlightItemAction,
    "HighlightItem"
);

impl HighlightItemAction {
    #[allow(clippy::unused_self)]
    fn run(&self, locator: &ElementLocator, context: &ActionContext) -> PageResult<ActionValue> {
        let name = property_name(context, "HighlightItem")?;
        locator.get_element(name)?.highlight()?;
        Ok(ActionValue::Unit)
    }
}

/// Enter the context's data into a property after token expansion
#[derive(Debug, Clone)]
pub struct EnterDataAction {
    locator: Option<ElementLocator>,
    tokens: TokenManager,
}

impl EnterDataAction {
    /// Action expanding `{tokens}` with `tokens`
    #[must_use]
    pub const fn new(tokens: TokenManager) -> Self {
        Self {
            locator: None,
            tokens,
        }
    }
}

impl Action for EnterDataAction {
    fn name(&self) -> &str {
        "EnterData"
    }

    fn set_element_locator(&mut self, locator: ElementLocator) {
        self.locator = Some(locator);
    }

    fn execute(&self, context: &ActionContext) -> PageResult<ActionValue> {
        let locator = injected(self.locator.as_ref(), "EnterData")?;
        let name = property_name(context, "EnterData")?;
        let data = context.data().ok_or_else(|| missing("EnterData", "data"))?;
        let data = self.tokens.expand(data);
        locator.get_property(name)?.fill_data(&data)?;
        Ok(ActionValue::Value(Some(data)))
    }
}

/// Wait for a condition on an element
#[derive(Debug, Clone)]
pub struct WaitForElementAction {
    locator: Option<ElementLocator>,
    default_timeout: Duration,
}

impl WaitForElementAction {
    /// Action falling back to `default_timeout` when the context names none
    #[must_use]
    pub const fn new(default_timeout: Duration) -> Self {
        Self {
            locator: None,
            default_timeout,
        }
    }
}

impl Action for WaitForElementAction {
    fn name(&self) -> &str {
        "WaitForElement"
    }

    fn set_element_locator(&mut self, locator: ElementLocator) {
        self.locator = Some(locator);
    }

    fn execute(&self, context: &ActionContext) -> PageResult<ActionValue> {
        let locator = injected(self.locator.as_ref(), "WaitForElement")?;
        let name = property_name(context, "WaitForElement")?;
        let (condition, timeout) = context
            .wait()
            .ok_or_else(|| missing("WaitForElement", "wait condition"))?;
        let timeout = timeout.unwrap_or(self.default_timeout);
        if locator.get_element(name)?.wait_for(condition, timeout)? {
            Ok(ActionValue::Bool(true))
        } else {
            Err(PageError::element(
                name,
                locator.page().name(),
                format!("{condition:?} not met within {} ms", timeout.as_millis()),
            ))
        }
    }
}
