//! Backend seam: the capability set a UI driver must provide.
//!
//! Concrete drivers (WebDriver, native UI automation, the in-memory
//! [`crate::mock`] DOM) implement [`NativeElement`] and [`DocumentHost`].
//! Everything above this module is driver-agnostic.

use crate::locator::LocatorExpr;
use crate::page_object::PageDescriptor;
use crate::result::PageResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to a backend element
pub type NativeRef = Arc<dyn NativeElement>;

/// Declared native type of an element property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Any element; no default tag
    #[default]
    Generic,
    /// Single line text input
    TextBox,
    /// Multi-line text input
    TextArea,
    /// Check box input
    CheckBox,
    /// Radio button input
    RadioButton,
    /// Drop-down list
    Select,
    /// Button
    Button,
    /// Hyperlink
    Link,
    /// Image
    Image,
    /// Div container
    Div,
    /// Span
    Span,
    /// Table
    Table,
    /// Table row
    TableRow,
    /// Inline frame
    Frame,
    /// Backend specific control type
    Custom(String),
}

impl ElementKind {
    /// Parse a kind from a loose name (`"text box"`, `"textbox"`, `"check_box"`)
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "" | "generic" | "element" => Self::Generic,
            "textbox" | "input" | "text" => Self::TextBox,
            "textarea" => Self::TextArea,
            "checkbox" => Self::CheckBox,
            "radio" | "radiobutton" => Self::RadioButton,
            "select" | "dropdown" | "combobox" => Self::Select,
            "button" => Self::Button,
            "link" | "anchor" | "a" => Self::Link,
            "image" | "img" => Self::Image,
            "div" => Self::Div,
            "span" => Self::Span,
            "table" => Self::Table,
            "tablerow" | "row" | "tr" => Self::TableRow,
            "frame" | "iframe" => Self::Frame,
            _ => Self::Custom(name.to_string()),
        }
    }

    /// Tag used when locator metadata does not name one
    #[must_use]
    pub fn default_tag(&self) -> Option<&'static str> {
        match self {
            Self::Generic | Self::Custom(_) => None,
            Self::TextBox | Self::CheckBox | Self::RadioButton => Some("input"),
            Self::TextArea => Some("textarea"),
            Self::Select => Some("select"),
            Self::Button => Some("button"),
            Self::Link => Some("a"),
            Self::Image => Some("img"),
            Self::Div => Some("div"),
            Self::Span => Some("span"),
            Self::Table => Some("table"),
            Self::TableRow => Some("tr"),
            Self::Frame => Some("iframe"),
        }
    }

    /// `type` attribute implied by the kind, for input elements
    #[must_use]
    pub fn default_input_type(&self) -> Option<&'static str> {
        match self {
            Self::CheckBox => Some("checkbox"),
            Self::RadioButton => Some("radio"),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Condition passed through to [`NativeElement::wait_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    /// Element appears
    Exists,
    /// Element disappears
    NotExists,
    /// Element becomes enabled
    Enabled,
    /// Element becomes disabled
    NotEnabled,
}

impl WaitCondition {
    /// Evaluate the condition once against an element
    pub fn is_met(self, element: &dyn NativeElement) -> bool {
        match self {
            Self::Exists => element.exists(),
            Self::NotExists => !element.exists(),
            Self::Enabled => element.exists() && element.enabled(),
            Self::NotEnabled => element.exists() && !element.enabled(),
        }
    }
}

/// Capability set of one backend element.
///
/// Handles are lazy: [`NativeElement::find`] returns a proxy that resolves
/// against the live UI each time it is queried, so building a page never
/// touches the UI.
pub trait NativeElement: Send + Sync + fmt::Debug {
    /// Whether the element is currently present
    fn exists(&self) -> bool;

    /// Whether the element accepts input
    fn enabled(&self) -> bool;

    /// Rendered text, `None` when the element is absent
    fn text(&self) -> Option<String>;

    /// Click the element. Returns false when the click did not happen.
    fn click(&self) -> bool;

    /// Enter a value using the strategy for the declared kind
    fn fill(&self, kind: &ElementKind, value: &str) -> PageResult<()>;

    /// Visually mark the element
    fn highlight(&self);

    /// Block until `condition` holds or `timeout` elapses
    fn wait_for(&self, condition: WaitCondition, timeout: Duration) -> bool;

    /// Read an attribute
    fn attribute(&self, name: &str) -> Option<String>;

    /// Write an attribute
    fn set_attribute(&self, name: &str, value: &str) -> PageResult<()>;

    /// Run a script with this element as its scope
    fn execute_script(&self, script: &str, args: &[&str]) -> PageResult<Option<String>>;

    /// Lazy child lookup scoped to this element
    fn find(&self, locator: &LocatorExpr) -> NativeRef;

    /// Present children matching `locator` in order, at most `limit`.
    ///
    /// The default resolves one position at a time; a driver with a bulk
    /// query can answer in a single round trip.
    fn find_all(&self, locator: &LocatorExpr, limit: usize) -> Vec<NativeRef> {
        (1..=limit)
            .map_while(|index| {
                let native = self.find(&locator.clone().nth(u32::try_from(index).ok()?));
                native.exists().then_some(native)
            })
            .collect()
    }

    /// Content document when this element is a frame
    fn frame_document(&self) -> Option<NativeRef> {
        None
    }
}

/// Page lifecycle collaborator: supplies the root container for a page.
pub trait DocumentHost: fmt::Debug {
    /// Root native container the page should be built on
    fn page_root(&self, page: &PageDescriptor) -> PageResult<NativeRef>;

    /// URL currently shown, when the host has one
    fn current_url(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name_is_loose() {
        assert_eq!(ElementKind::from_name("Text Box"), ElementKind::TextBox);
        assert_eq!(ElementKind::from_name("check_box"), ElementKind::CheckBox);
        assert_eq!(ElementKind::from_name("tr"), ElementKind::TableRow);
        assert_eq!(
            ElementKind::from_name("DatePicker"),
            ElementKind::Custom("DatePicker".to_string())
        );
    }

    #[test]
    fn test_default_tags() {
        assert_eq!(ElementKind::Link.default_tag(), Some("a"));
        assert_eq!(ElementKind::CheckBox.default_tag(), Some("input"));
        assert_eq!(ElementKind::CheckBox.default_input_type(), Some("checkbox"));
        assert_eq!(ElementKind::Generic.default_tag(), None);
    }
}
