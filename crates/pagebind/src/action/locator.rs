//! Property lookup with locator hooks.

use super::LocatorAction;
use crate::page::Page;
use crate::property::PropertyData;
use crate::result::{PageError, PageResult};
use std::fmt;
use std::sync::Arc;

/// Finds properties on one page and notifies every [`LocatorAction`].
#[derive(Clone)]
pub struct ElementLocator {
    page: Arc<Page>,
    hooks: Arc<[Arc<dyn LocatorAction>]>,
}

impl fmt::Debug for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementLocator")
            .field("page", &self.page.name())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl ElementLocator {
    /// Locator over `page` with the given hooks
    #[must_use]
    pub fn new(page: Arc<Page>, hooks: Vec<Arc<dyn LocatorAction>>) -> Self {
        Self {
            page,
            hooks: hooks.into(),
        }
    }

    /// Page searched
    #[must_use]
    pub const fn page(&self) -> &Arc<Page> {
        &self.page
    }

    fn locate(&self, name: &str, lookup: impl FnOnce(&Arc<Page>) -> Option<PropertyData>) -> Option<PropertyData> {
        for hook in self.hooks.iter() {
            hook.on_locate(name);
        }
        let found = lookup(&self.page);
        tracing::debug!(
            page = self.page.name(),
            property = name,
            found = found.is_some(),
            "located property"
        );
        for hook in self.hooks.iter() {
            hook.on_locate_complete(name, found.as_ref());
        }
        found
    }

    fn not_found(&self, name: &str) -> PageError {
        PageError::PropertyNotFound {
            property: name.to_string(),
            page: self.page.name().to_string(),
            available: self.page.property_names(),
        }
    }

    /// Located property by name
    ///
    /// # Errors
    /// Returns [`PageError::PropertyNotFound`] when the page declares no
    /// located property of that name
    pub fn get_element(&self, name: &str) -> PageResult<PropertyData> {
        self.try_get_element(name).ok_or_else(|| self.not_found(name))
    }

    /// Any property by name
    ///
    /// # Errors
    /// Returns [`PageError::PropertyNotFound`] when the page declares no
    /// property of that name
    pub fn get_property(&self, name: &str) -> PageResult<PropertyData> {
        self.try_get_property(name).ok_or_else(|| self.not_found(name))
    }

    /// Located property by name, if any
    #[must_use]
    pub fn try_get_element(&self, name: &str) -> Option<PropertyData> {
        self.locate(name, |page| page.get_element(name))
    }

    /// Any property by name, if any
    #[must_use]
    pub fn try_get_property(&self, name: &str) -> Option<PropertyData> {
        self.locate(name, |page| page.get_property(name))
    }
}
