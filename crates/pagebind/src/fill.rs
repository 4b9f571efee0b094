//! Fill handlers: how a value is entered into each native element kind.

use crate::native::{ElementKind, NativeElement};
use crate::result::{PageError, PageResult};
use crate::validation::typed::parse_bool;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Enters a value into one kind of element
pub trait FillHandler: Send + Sync + fmt::Debug {
    /// Fill `element` with `value`
    fn fill(&self, element: &dyn NativeElement, kind: &ElementKind, value: &str) -> PageResult<()>;
}

/// Delegates to the backend's own fill
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFill;

impl FillHandler for TextFill {
    fn fill(&self, element: &dyn NativeElement, kind: &ElementKind, value: &str) -> PageResult<()> {
        element.fill(kind, value)
    }
}

/// Checkbox and radio: clicks only when the requested state differs from
/// the current `checked` attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleFill;

impl FillHandler for ToggleFill {
    fn fill(&self, element: &dyn NativeElement, _kind: &ElementKind, value: &str) -> PageResult<()> {
        let wanted = match value.trim().to_ascii_lowercase().as_str() {
            "checked" | "on" | "yes" | "1" => true,
            "unchecked" | "off" | "no" | "0" | "" => false,
            other => parse_bool(other).ok_or_else(|| PageError::Driver {
                message: format!("cannot interpret '{value}' as a checked state"),
            })?,
        };
        let current = element
            .attribute("checked")
            .is_some_and(|v| !v.eq_ignore_ascii_case("false"));
        if wanted != current && !element.click() {
            return Err(PageError::Driver {
                message: "click to toggle the checked state failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Fill handlers keyed by element kind
#[derive(Debug, Clone, Default)]
pub struct FillHandlers {
    handlers: HashMap<ElementKind, Arc<dyn FillHandler>>,
}

impl FillHandlers {
    /// No handlers at all
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Handlers for the text-entry and toggle kinds
    #[must_use]
    pub fn with_defaults() -> Self {
        let text: Arc<dyn FillHandler> = Arc::new(TextFill);
        let toggle: Arc<dyn FillHandler> = Arc::new(ToggleFill);
        let mut handlers = Self::empty();
        for kind in [
            ElementKind::Generic,
            ElementKind::TextBox,
            ElementKind::TextArea,
            ElementKind::Select,
        ] {
            handlers.register(kind, Arc::clone(&text));
        }
        handlers.register(ElementKind::CheckBox, Arc::clone(&toggle));
        handlers.register(ElementKind::RadioButton, toggle);
        handlers
    }

    /// Add or replace the handler for a kind
    pub fn register(&mut self, kind: ElementKind, handler: Arc<dyn FillHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Handler for a kind
    #[must_use]
    pub fn handler_for(&self, kind: &ElementKind) -> Option<Arc<dyn FillHandler>> {
        self.handlers.get(kind).cloned()
    }
}
