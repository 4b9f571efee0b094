//! Actions and the pipeline that runs them.
//!
//! An [`Action`] is one step a scenario performs against a page (click,
//! fill, validate...). The [`ActionPipelineService`] wraps it with the
//! pre-actions, post-actions and locator hooks registered in the
//! [`ActionRepository`].

mod builtin;
mod hooks;
mod locator;
mod pipeline;
mod repository;

pub use builtin::{
    ClickItemAction, EnterDataAction, GetItemValueAction, GetListItemByCriteriaAction,
    GetListItemByIndexAction, HighlightItemAction, ValidateItemAction, ValidateListAction,
    ValidateListRowCountAction, WaitForElementAction,
};
pub use hooks::{HighlightLocatorAction, TracingPostAction, ValidationTablePreAction};
pub use locator::ElementLocator;
pub use pipeline::ActionPipelineService;
pub use repository::{ActionFactory, ActionRepository};

use crate::native::WaitCondition;
use crate::page::Page;
use crate::property::PropertyData;
use crate::result::{PageError, PageResult};
use crate::validation::{ListComparison, NumericComparison, ValidationResult, ValidationTable};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A step performed against a page
pub trait Action: Send + fmt::Debug {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Receive the locator for the page the pipeline runs against
    fn set_element_locator(&mut self, locator: ElementLocator);

    /// Run the step
    fn execute(&self, context: &ActionContext) -> PageResult<ActionValue>;
}

/// Hook run before every action. All pre-actions run even when one fails.
pub trait PreAction: Send + Sync + fmt::Debug {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Inspect or prepare the context
    fn perform(&self, action: &dyn Action, context: &mut ActionContext) -> PageResult<()>;
}

/// Hook run after every action with its final result
pub trait PostAction: Send + Sync + fmt::Debug {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Observe the result
    fn perform(
        &self,
        action: &dyn Action,
        context: &ActionContext,
        result: &ActionResult,
    ) -> PageResult<()>;
}

/// Hook notified around every property lookup
pub trait LocatorAction: Send + Sync + fmt::Debug {
    /// Before the lookup
    fn on_locate(&self, name: &str);

    /// After the lookup; `property` is `None` when nothing was found
    fn on_locate_complete(&self, name: &str, property: Option<&PropertyData>);
}

/// Arguments of one action invocation.
///
/// ```ignore
/// let context = ActionContext::for_property("email").with_data("ann@example.com");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    property_name: Option<String>,
    validation: Option<ValidationTable>,
    data: Option<String>,
    index: Option<usize>,
    list_comparison: Option<ListComparison>,
    row_count: Option<(NumericComparison, usize)>,
    wait: Option<(WaitCondition, Option<Duration>)>,
}

impl ActionContext {
    /// Context without a target property
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context targeting a property
    #[must_use]
    pub fn for_property(name: impl Into<String>) -> Self {
        Self {
            property_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Attach a validation table
    #[must_use]
    pub fn with_validation(mut self, table: ValidationTable) -> Self {
        self.validation = Some(table);
        self
    }

    /// Data to enter
    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// 1-based list index
    #[must_use]
    pub const fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// How a list is judged against the validation table
    #[must_use]
    pub fn with_list_comparison(mut self, comparison: ListComparison) -> Self {
        self.list_comparison = Some(comparison);
        self
    }

    /// Expected number of list rows
    #[must_use]
    pub const fn with_row_count(mut self, comparison: NumericComparison, expected: usize) -> Self {
        self.row_count = Some((comparison, expected));
        self
    }

    /// Condition to wait for; `None` uses the repository default timeout
    #[must_use]
    pub const fn with_wait(mut self, condition: WaitCondition, timeout: Option<Duration>) -> Self {
        self.wait = Some((condition, timeout));
        self
    }

    /// Target property
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        self.property_name.as_deref()
    }

    /// Validation table
    #[must_use]
    pub const fn validation(&self) -> Option<&ValidationTable> {
        self.validation.as_ref()
    }

    /// Validation table, for binding
    pub fn validation_mut(&mut self) -> Option<&mut ValidationTable> {
        self.validation.as_mut()
    }

    /// Data to enter
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// List index
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// List comparison
    #[must_use]
    pub const fn list_comparison(&self) -> Option<&ListComparison> {
        self.list_comparison.as_ref()
    }

    /// Row count expectation
    #[must_use]
    pub const fn row_count(&self) -> Option<(NumericComparison, usize)> {
        self.row_count
    }

    /// Wait condition and timeout
    #[must_use]
    pub const fn wait(&self) -> Option<(WaitCondition, Option<Duration>)> {
        self.wait
    }
}

/// What a successful action produced
#[derive(Debug, Clone)]
pub enum ActionValue {
    /// Nothing to report
    Unit,
    /// Current value of a property
    Value(Option<String>),
    /// Outcome of a wait
    Bool(bool),
    /// Number of list rows
    Count(usize),
    /// Projected list item
    Item(Arc<Page>),
    /// Passed validation with its details
    Validation(ValidationResult),
}

/// Outcome of a pipeline run. Successful results carry a value, failed ones
/// carry the error; never both.
#[derive(Debug, Clone)]
pub struct ActionResult {
    success: bool,
    result: Option<ActionValue>,
    error: Option<Arc<PageError>>,
}

impl ActionResult {
    /// Successful result
    #[must_use]
    pub const fn success(value: ActionValue) -> Self {
        Self {
            success: true,
            result: Some(value),
            error: None,
        }
    }

    /// Failed result
    #[must_use]
    pub const fn failure(error: Arc<PageError>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error),
        }
    }

    /// Whether the action succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Produced value
    #[must_use]
    pub const fn result(&self) -> Option<&ActionValue> {
        self.result.as_ref()
    }

    /// Failure
    #[must_use]
    pub const fn error(&self) -> Option<&Arc<PageError>> {
        self.error.as_ref()
    }

    /// Convert into a `Result`
    pub fn into_result(self) -> Result<ActionValue, Arc<PageError>> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(value), None) => Ok(value),
            (None, None) => Ok(ActionValue::Unit),
        }
    }
}

impl From<PageResult<ActionValue>> for ActionResult {
    fn from(result: PageResult<ActionValue>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::failure(Arc::new(error)),
        }
    }
}
