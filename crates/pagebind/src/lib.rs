//! Pagebind: declarative page objects for table-driven UI tests
//!
//! Pages are declared once as types carrying locator metadata. The
//! [`PageBuilder`] compiles each page type into a cached factory that binds
//! the declaration to a native UI tree supplied through the
//! [`NativeElement`] and [`DocumentHost`] traits. Scenario steps then act on
//! properties through the [`ActionPipelineService`], and behaviour tables
//! become typed [`ValidationTable`]s judged by pluggable comparers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   compile once   ┌──────────────┐   bind    ┌──────────────┐
//! │ PageModel    │ ───────────────► │ PageFactory  │ ────────► │ Page         │
//! │ (descriptor) │                  │ (cached)     │           │ PropertyData │
//! └──────────────┘                  └──────────────┘           └──────┬───────┘
//!                                                                     │
//!        ┌────────────┐   ┌────────────────┐   ┌─────────────┐        │
//!        │ pre-actions│──►│ action         │──►│ post-actions│ ◄──────┘
//!        └────────────┘   │ (ElementLocator)│   └─────────────┘
//!                         └────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pagebind::prelude::*;
//!
//! #[derive(PageModel)]
//! #[page(document, route = "/login")]
//! struct LoginPage {
//!     #[locator(id = "user")]
//!     user_name: TextBox,
//!     #[locator(text = "Sign in")]
//!     sign_in: Button,
//! }
//!
//! let page = PageBuilder::global().build_page::<LoginPage>(&host)?;
//! let pipeline = ActionPipelineService::global();
//! pipeline.repository().initialize();
//! let result = pipeline.perform::<EnterDataAction>(
//!     &page,
//!     &mut ActionContext::for_property("user name").with_data("ann"),
//! );
//! assert!(result.is_success());
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Actions, hooks and the pipeline that runs them
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod action;

#[allow(clippy::missing_errors_doc)]
mod builder;
mod config;
mod fill;
mod frame;
#[allow(clippy::missing_errors_doc)]
mod list;
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
mod locator;

/// In-memory backend for tests and dry runs
#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
pub mod mock;

mod native;
mod page;
mod page_object;
#[allow(clippy::missing_errors_doc)]
mod property;
mod result;

/// Comparers, validation tables and their results
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod validation;

mod value;

pub use action::{
    Action, ActionContext, ActionPipelineService, ActionRepository, ActionResult, ActionValue,
    ElementLocator, LocatorAction, PostAction, PreAction,
};
pub use builder::{PageBuilder, PageFactory, PropertyVisitor, DEFAULT_WAIT_TIMEOUT};
pub use config::PagebindConfig;
pub use fill::{FillHandler, FillHandlers, TextFill, ToggleFill};
pub use frame::{FrameEntry, FrameRegistry};
pub use list::ElementList;
pub use locator::{Condition, LocatorExpr, LocatorMetadata};
pub use native::{DocumentHost, ElementKind, NativeElement, NativeRef, WaitCondition};
pub use page::Page;
pub use page_object::{
    normalize_property_name, Button, CheckBox, Div, Element, ElementList as ListOf, Frame,
    HtmlDocument, Image, Link, NavigationRoute, PageDescriptor, PageDescriptorBuilder, PageModel,
    PageScope, PageTypeRef, PropertyDescriptor, PropertyKind, RadioButton, Select, Span, Table,
    TableRow, TextArea, TextBox, TextItem, UrlMatcher, VirtualSource,
};
pub use property::{
    ElementPropertyData, ListPropertyData, PagePropertyData, PropertyData, PropertyType,
    VirtualPropertyData,
};
pub use result::{ErrorKind, ErrorList, PageError, PageResult};
pub use validation::{
    FieldValidationResult, ItemValidation, ItemValidationResult, ListComparison,
    NumericComparison, TokenManager, ValidationComparer, ValidationResult, ValidationTable,
};
pub use value::Value;

#[cfg(feature = "derive")]
pub use pagebind_derive::PageModel;

/// Everything a step library usually needs
pub mod prelude {
    pub use super::action::{
        ClickItemAction, EnterDataAction, GetItemValueAction, GetListItemByCriteriaAction,
        GetListItemByIndexAction, HighlightItemAction, ValidateItemAction, ValidateListAction,
        ValidateListRowCountAction, WaitForElementAction,
    };
    pub use super::{
        ActionContext, ActionPipelineService, ActionRepository, ActionResult, ActionValue,
        Button, CheckBox, DocumentHost, Element, ElementKind, Frame, ListComparison, ListOf,
        LocatorMetadata, NumericComparison, Page, PageBuilder, PageDescriptor, PageError,
        PageModel, PageResult, PagebindConfig, PropertyData, RadioButton, Select, TextArea,
        TextBox, ValidationTable, WaitCondition,
    };
}
