//! Uniform operations over page properties.
//!
//! [`PropertyData`] is the single facade steps act on. Each variant supports
//! the operations that make sense for it and answers every other one with
//! [`PageError::NotSupported`] naming the operation:
//!
//! | Operation              | Element | List | Page | Virtual |
//! |------------------------|---------|------|------|---------|
//! | `click_element`        | yes     |      |      |         |
//! | `fill_data`            | yes     |      | text | yes     |
//! | `current_value`        | yes     |      | yes  | yes     |
//! | `validate_item`        | yes     | yes  | yes  | yes     |
//! | list operations        |         | yes  |      |         |
//! | `highlight`            | yes     |      |      |         |
//! | `wait_for`             | yes     |      |      |         |

use crate::fill::FillHandlers;
use crate::list::ElementList;
use crate::native::{ElementKind, NativeRef, WaitCondition};
use crate::page::{NestedPage, Page, VirtualNode};
use crate::result::{PageError, PageResult};
use crate::validation::{
    FieldValidationResult, ItemValidation, ListComparison, NumericComparison, PropertyProbe,
    ValidationResult, ValidationTable,
};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const ELEMENT: &str = "ElementPropertyData";
const LIST: &str = "ListPropertyData";
const PAGE: &str = "PagePropertyData";
const VIRTUAL: &str = "VirtualPropertyData";

/// Declared type of a property, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    /// Element of a native kind
    Element(ElementKind),
    /// List projecting items as the named page type
    List {
        /// Item page type
        item: &'static str,
    },
    /// Scalar of the named value type
    Scalar(&'static str),
    /// Computed value
    Virtual,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(kind) => write!(f, "{kind}"),
            Self::List { item } => write!(f, "List<{item}>"),
            Self::Scalar(name) => write!(f, "{name}"),
            Self::Virtual => write!(f, "virtual"),
        }
    }
}

/// A single located element (also nested fragments and frames)
#[derive(Debug, Clone)]
pub struct ElementPropertyData {
    name: String,
    page: String,
    native: NativeRef,
    kind: ElementKind,
    fills: Arc<FillHandlers>,
    nested: Option<NestedPage>,
    timeout: Duration,
}

impl ElementPropertyData {
    pub(crate) fn new(
        name: String,
        page: String,
        native: NativeRef,
        kind: ElementKind,
        fills: Arc<FillHandlers>,
        nested: Option<NestedPage>,
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            page,
            native,
            kind,
            fills,
            nested,
            timeout,
        }
    }

    /// Backend element
    #[must_use]
    pub fn native(&self) -> &NativeRef {
        &self.native
    }

    /// Declared kind
    #[must_use]
    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Page fragment rooted at this element, for nested properties.
    ///
    /// The fragment is built the first time any handle asks for it.
    pub fn nested_page(&self) -> PageResult<Option<Arc<Page>>> {
        self.nested.as_ref().map(NestedPage::page).transpose()
    }

    fn execute_error(&self, message: impl Into<String>) -> PageError {
        PageError::element(&self.name, &self.page, message)
    }

    fn require_present(&self) -> PageResult<()> {
        if self.native.wait_for(WaitCondition::Exists, self.timeout) {
            Ok(())
        } else {
            Err(self.execute_error("element does not exist"))
        }
    }

    fn click(&self) -> PageResult<()> {
        self.require_present()?;
        if self.native.click() {
            Ok(())
        } else {
            Err(self.execute_error("click was not performed"))
        }
    }

    fn fill(&self, data: &str) -> PageResult<()> {
        self.require_present()?;
        let handler = self
            .fills
            .handler_for(&self.kind)
            .ok_or_else(|| PageError::FillHandlerMissing {
                kind: self.kind.to_string(),
                property: self.name.clone(),
                page: self.page.clone(),
            })?;
        handler
            .fill(self.native.as_ref(), &self.kind, data)
            .map_err(|e| self.execute_error(e.to_string()))
    }

    fn value(&self) -> PageResult<Option<String>> {
        self.require_present()?;
        Ok(self.native.text())
    }

    fn validate(&self, validation: &ItemValidation) -> PageResult<FieldValidationResult> {
        let comparer = validation.comparer()?;
        if comparer.requires_existence_check() {
            self.require_present()?;
        }
        let actual = if comparer.requires_field_value() {
            self.native.text()
        } else {
            None
        };
        let is_valid = validation.compare(self, actual.as_deref())?;
        Ok(field_result(validation, actual, is_valid))
    }

    fn highlight(&self) -> PageResult<()> {
        self.require_present()?;
        self.native.highlight();
        Ok(())
    }
}

impl PropertyProbe for ElementPropertyData {
    fn check_exists(&self) -> bool {
        self.native.wait_for(WaitCondition::Exists, self.timeout)
    }

    fn check_not_exists(&self) -> bool {
        self.native.wait_for(WaitCondition::NotExists, self.timeout)
    }

    fn check_enabled(&self) -> bool {
        self.native.exists() && self.native.enabled()
    }
}

/// A repeated element
#[derive(Debug, Clone)]
pub struct ListPropertyData {
    name: String,
    page: String,
    list: ElementList,
}

impl ListPropertyData {
    pub(crate) fn new(name: String, page: String, list: ElementList) -> Self {
        Self { name, page, list }
    }

    /// Underlying list
    #[must_use]
    pub const fn list(&self) -> &ElementList {
        &self.list
    }

    fn validate(&self, validation: &ItemValidation) -> PageResult<FieldValidationResult> {
        let comparer = validation.comparer()?;
        let actual = if comparer.requires_field_value() {
            self.list.container().text()
        } else {
            None
        };
        let is_valid = validation.compare(self, actual.as_deref())?;
        Ok(field_result(validation, actual, is_valid))
    }

    fn row_count(&self, comparison: NumericComparison, expected: usize) -> (bool, usize) {
        let count = self.list.count();
        tracing::debug!(
            property = %self.name,
            page = %self.page,
            count,
            expected,
            ?comparison,
            "checked list row count"
        );
        (comparison.compare_counts(count, expected), count)
    }
}

impl PropertyProbe for ListPropertyData {
    fn check_exists(&self) -> bool {
        self.list.container().exists()
    }

    fn check_not_exists(&self) -> bool {
        !self.list.container().exists()
    }

    fn check_enabled(&self) -> bool {
        self.list.container().enabled()
    }
}

/// A plain value held by the page
#[derive(Debug, Clone)]
pub struct PagePropertyData {
    name: String,
    key: String,
    page: Arc<Page>,
}

impl PagePropertyData {
    pub(crate) fn new(name: String, key: String, page: Arc<Page>) -> Self {
        Self { name, key, page }
    }

    /// Current scalar value
    #[must_use]
    pub fn value(&self) -> Value {
        self.page.value(&self.key).unwrap_or_default()
    }

    fn fill(&self, data: &str) -> PageResult<()> {
        match self.value() {
            Value::Text(_) | Value::Null => self.page.set_value(&self.key, data),
            other => Err(PageError::not_supported("FillData", other.type_name())),
        }
    }

    fn current(&self) -> Option<String> {
        match self.value() {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    fn validate(&self, validation: &ItemValidation) -> PageResult<FieldValidationResult> {
        let comparer = validation.comparer()?;
        let expected = validation.comparison_value();
        let value = self.value();
        let is_valid = match value.as_list() {
            Some(items) => items
                .iter()
                .any(|item| comparer.compare(self, expected, Some(item))),
            None => comparer.compare(self, expected, self.current().as_deref()),
        };
        Ok(field_result(validation, self.current(), is_valid))
    }
}

impl PropertyProbe for PagePropertyData {
    fn check_exists(&self) -> bool {
        true
    }

    fn check_not_exists(&self) -> bool {
        false
    }

    fn check_enabled(&self) -> bool {
        true
    }
}

/// A value computed from an attribute, the page text or a script
#[derive(Debug, Clone)]
pub struct VirtualPropertyData {
    name: String,
    page: String,
    source: VirtualNode,
}

impl VirtualPropertyData {
    pub(crate) fn new(name: String, page: String, source: VirtualNode) -> Self {
        Self { name, page, source }
    }

    fn fill(&self, data: &str) -> PageResult<()> {
        let outcome = match &self.source {
            VirtualNode::Attribute { native, attribute } => native.set_attribute(attribute, data),
            VirtualNode::Script { scope, script } => scope.execute_script(script, &[data]).map(drop),
            VirtualNode::Text { .. } => {
                return Err(PageError::element(&self.name, &self.page, "text is read-only"));
            }
        };
        outcome.map_err(|e| PageError::element(&self.name, &self.page, e.to_string()))
    }

    fn current(&self) -> PageResult<Option<String>> {
        match &self.source {
            VirtualNode::Attribute { native, attribute } => Ok(native.attribute(attribute)),
            VirtualNode::Text { scope } => Ok(scope.text()),
            VirtualNode::Script { scope, script } => scope
                .execute_script(script, &[])
                .map_err(|e| PageError::element(&self.name, &self.page, e.to_string())),
        }
    }

    fn validate(&self, validation: &ItemValidation) -> PageResult<FieldValidationResult> {
        let actual = self.current()?;
        let is_valid = validation.compare(self, actual.as_deref())?;
        Ok(field_result(validation, actual, is_valid))
    }

    fn scope(&self) -> &NativeRef {
        match &self.source {
            VirtualNode::Attribute { native, .. } => native,
            VirtualNode::Text { scope } | VirtualNode::Script { scope, .. } => scope,
        }
    }
}

impl PropertyProbe for VirtualPropertyData {
    fn check_exists(&self) -> bool {
        self.scope().exists()
    }

    fn check_not_exists(&self) -> bool {
        !self.scope().exists()
    }

    fn check_enabled(&self) -> bool {
        true
    }
}

fn field_result(
    validation: &ItemValidation,
    actual: Option<String>,
    is_valid: bool,
) -> FieldValidationResult {
    FieldValidationResult {
        field: validation.raw_field_name().to_string(),
        rule: validation.raw_comparison_type().to_string(),
        expected: validation.comparison_value().to_string(),
        actual,
        is_valid,
    }
}

/// One page property, whatever its kind
#[derive(Debug, Clone)]
pub enum PropertyData {
    /// Located element
    Element(ElementPropertyData),
    /// Repeated element
    List(ListPropertyData),
    /// Scalar held by the page
    Page(PagePropertyData),
    /// Computed value
    Virtual(VirtualPropertyData),
}

impl PropertyData {
    /// Declared property name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Element(p) => &p.name,
            Self::List(p) => &p.name,
            Self::Page(p) => &p.name,
            Self::Virtual(p) => &p.name,
        }
    }

    /// Declaring page type
    #[must_use]
    pub fn page_name(&self) -> &str {
        match self {
            Self::Element(p) => &p.page,
            Self::List(p) => &p.page,
            Self::Page(p) => p.page.name(),
            Self::Virtual(p) => &p.page,
        }
    }

    /// Declared type
    #[must_use]
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Element(p) => PropertyType::Element(p.kind.clone()),
            Self::List(p) => PropertyType::List {
                item: p.list.item_type().type_name(),
            },
            Self::Page(p) => PropertyType::Scalar(p.value().type_name()),
            Self::Virtual(_) => PropertyType::Virtual,
        }
    }

    /// Variant name used in not-supported errors
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::Element(_) => ELEMENT,
            Self::List(_) => LIST,
            Self::Page(_) => PAGE,
            Self::Virtual(_) => VIRTUAL,
        }
    }

    /// Whether this is a single element
    #[must_use]
    pub const fn is_element(&self) -> bool {
        matches!(self, Self::Element(_))
    }

    /// Whether this is a list
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    const fn unsupported(&self, operation: &'static str) -> PageError {
        PageError::not_supported(operation, self.variant_name())
    }

    /// Click the element
    pub fn click_element(&self) -> PageResult<()> {
        match self {
            Self::Element(p) => p.click(),
            _ => Err(self.unsupported("ClickElement")),
        }
    }

    /// Enter data
    pub fn fill_data(&self, data: &str) -> PageResult<()> {
        match self {
            Self::Element(p) => p.fill(data),
            Self::Page(p) => p.fill(data),
            Self::Virtual(p) => p.fill(data),
            Self::List(_) => Err(self.unsupported("FillData")),
        }
    }

    /// Current value as text
    pub fn current_value(&self) -> PageResult<Option<String>> {
        match self {
            Self::Element(p) => p.value(),
            Self::Page(p) => Ok(p.current()),
            Self::Virtual(p) => p.current(),
            Self::List(_) => Err(self.unsupported("GetCurrentValue")),
        }
    }

    /// Evaluate one bound validation against this property
    pub fn validate_item(&self, validation: &ItemValidation) -> PageResult<FieldValidationResult> {
        match self {
            Self::Element(p) => p.validate(validation),
            Self::List(p) => p.validate(validation),
            Self::Page(p) => p.validate(validation),
            Self::Virtual(p) => p.validate(validation),
        }
    }

    /// List item at a 1-based position
    pub fn get_item_at_index(&self, index: usize) -> PageResult<Option<Arc<Page>>> {
        match self {
            Self::List(p) => p.list.item_at(index),
            _ => Err(self.unsupported("GetItemAtIndex")),
        }
    }

    /// First list item satisfying every validation
    pub fn find_item_in_list(&self, table: &ValidationTable) -> PageResult<Option<Arc<Page>>> {
        match self {
            Self::List(p) => p.list.find_item(table),
            _ => Err(self.unsupported("FindItemInList")),
        }
    }

    /// Judge the whole list against a table
    pub fn validate_list(
        &self,
        comparison: &ListComparison,
        table: &ValidationTable,
    ) -> PageResult<ValidationResult> {
        match self {
            Self::List(p) => p.list.validate(comparison, table),
            _ => Err(self.unsupported("ValidateList")),
        }
    }

    /// Compare the number of items. Returns the verdict and the count.
    pub fn validate_list_row_count(
        &self,
        comparison: NumericComparison,
        expected: usize,
    ) -> PageResult<(bool, usize)> {
        match self {
            Self::List(p) => Ok(p.row_count(comparison, expected)),
            _ => Err(self.unsupported("ValidateListRowCount")),
        }
    }

    /// Visually mark the element
    pub fn highlight(&self) -> PageResult<()> {
        match self {
            Self::Element(p) => p.highlight(),
            _ => Err(self.unsupported("Highlight")),
        }
    }

    /// Wait for a condition on the element
    pub fn wait_for(&self, condition: WaitCondition, timeout: Duration) -> PageResult<bool> {
        match self {
            Self::Element(p) => Ok(p.native.wait_for(condition, timeout)),
            _ => Err(self.unsupported("WaitForElement")),
        }
    }

    fn probe(&self) -> &dyn PropertyProbe {
        match self {
            Self::Element(p) => p,
            Self::List(p) => p,
            Self::Page(p) => p,
            Self::Virtual(p) => p,
        }
    }
}

impl PropertyProbe for PropertyData {
    fn check_exists(&self) -> bool {
        self.probe().check_exists()
    }

    fn check_not_exists(&self) -> bool {
        self.probe().check_not_exists()
    }

    fn check_enabled(&self) -> bool {
        self.probe().check_enabled()
    }
}
