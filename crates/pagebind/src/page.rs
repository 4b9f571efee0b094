//! Constructed page instances.

use crate::builder::PageFactory;
use crate::fill::FillHandlers;
use crate::list::ElementList;
use crate::native::{ElementKind, NativeRef};
use crate::page_object::{normalize_property_name, PageDescriptor, PageTypeRef, PropertyKind};
use crate::property::{
    ElementPropertyData, ListPropertyData, PagePropertyData, PropertyData, VirtualPropertyData,
};
use crate::result::{PageError, PageResult};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

/// Built form of one declared property
#[derive(Debug, Clone)]
pub(crate) enum PropertyNode {
    Element { native: NativeRef, kind: ElementKind },
    List(ElementList),
    Nested(NestedPage),
    Frame { native: NativeRef },
    Scalar,
    Virtual(VirtualNode),
}

/// Nested fragment, instantiated on first access and then shared by every
/// clone of the node.
#[derive(Clone)]
pub(crate) struct NestedPage {
    native: NativeRef,
    page_type: PageTypeRef,
    factory: PageFactory,
    page: Arc<OnceLock<Arc<Page>>>,
}

impl fmt::Debug for NestedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedPage")
            .field("page_type", &self.page_type.type_name())
            .field("built", &self.page.get().is_some())
            .finish_non_exhaustive()
    }
}

impl NestedPage {
    pub(crate) fn new(native: NativeRef, page_type: PageTypeRef, factory: PageFactory) -> Self {
        Self {
            native,
            page_type,
            factory,
            page: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn native(&self) -> &NativeRef {
        &self.native
    }

    /// Fragment page; failed builds are not cached
    pub(crate) fn page(&self) -> PageResult<Arc<Page>> {
        if let Some(page) = self.page.get() {
            return Ok(Arc::clone(page));
        }
        let built = (self.factory)(Arc::clone(&self.native), None)?;
        tracing::trace!(page_type = self.page_type.type_name(), "built nested page");
        Ok(Arc::clone(self.page.get_or_init(|| built)))
    }
}

/// Where a computed property reads and writes
#[derive(Debug, Clone)]
pub(crate) enum VirtualNode {
    Attribute { native: NativeRef, attribute: String },
    Text { scope: NativeRef },
    Script { scope: NativeRef, script: String },
}

/// A page object bound to a native root.
///
/// Properties keep declaration order; lookups by name are normalized.
/// Scalar properties live in the page and can be changed through
/// [`Page::set_value`] or a fill.
pub struct Page {
    descriptor: Arc<PageDescriptor>,
    root: NativeRef,
    nodes: Vec<PropertyNode>,
    scalars: RwLock<HashMap<String, Value>>,
    fills: Arc<FillHandlers>,
    timeout: Duration,
    route_params: OnceLock<HashMap<String, String>>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("name", &self.descriptor.name())
            .field("properties", &self.descriptor.property_names())
            .finish_non_exhaustive()
    }
}

impl Page {
    pub(crate) fn new(
        descriptor: Arc<PageDescriptor>,
        root: NativeRef,
        nodes: Vec<PropertyNode>,
        scalars: HashMap<String, Value>,
        fills: Arc<FillHandlers>,
        timeout: Duration,
    ) -> Self {
        Self {
            descriptor,
            root,
            nodes,
            scalars: RwLock::new(scalars),
            fills,
            timeout,
            route_params: OnceLock::new(),
        }
    }

    pub(crate) fn set_route_params(&self, params: HashMap<String, String>) {
        if self.route_params.set(params).is_err() {
            tracing::debug!(page = self.name(), "route parameters already captured");
        }
    }

    /// Parameters captured from the host URL when the page was built
    #[must_use]
    pub fn route_params(&self) -> HashMap<String, String> {
        self.route_params.get().cloned().unwrap_or_default()
    }

    /// One captured route parameter
    #[must_use]
    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get()?.get(name).map(String::as_str)
    }

    /// Page type name
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Declared structure
    #[must_use]
    pub fn descriptor(&self) -> &PageDescriptor {
        &self.descriptor
    }

    /// Native root this page is scoped to
    #[must_use]
    pub fn root(&self) -> &NativeRef {
        &self.root
    }

    /// Declared property names in order
    #[must_use]
    pub fn property_names(&self) -> Vec<String> {
        self.descriptor.property_names()
    }

    /// Existence timeout used by element checks
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        let key = normalize_property_name(name);
        self.descriptor
            .properties()
            .iter()
            .position(|p| p.key() == key)
    }

    /// Located property (element, list, nested fragment or frame)
    #[must_use]
    pub fn get_element(self: &Arc<Self>, name: &str) -> Option<PropertyData> {
        let index = self.index_of(name)?;
        if self.descriptor.properties()[index].kind().is_located() {
            self.property_at(index)
        } else {
            None
        }
    }

    /// Any declared property, located or not
    #[must_use]
    pub fn get_property(self: &Arc<Self>, name: &str) -> Option<PropertyData> {
        self.property_at(self.index_of(name)?)
    }

    fn property_at(self: &Arc<Self>, index: usize) -> Option<PropertyData> {
        let declared = &self.descriptor.properties()[index];
        let name = declared.name().to_string();
        let page = self.name().to_string();
        let element = |native: &NativeRef, kind: ElementKind, nested: Option<NestedPage>| {
            PropertyData::Element(ElementPropertyData::new(
                name.clone(),
                page.clone(),
                Arc::clone(native),
                kind,
                Arc::clone(&self.fills),
                nested,
                self.timeout,
            ))
        };

        Some(match self.nodes.get(index)? {
            PropertyNode::Element { native, kind } => element(native, kind.clone(), None),
            PropertyNode::Nested(nested) => {
                element(nested.native(), ElementKind::Generic, Some(nested.clone()))
            }
            PropertyNode::Frame { native } => element(native, ElementKind::Frame, None),
            PropertyNode::List(list) => {
                PropertyData::List(ListPropertyData::new(name.clone(), page.clone(), list.clone()))
            }
            PropertyNode::Scalar => {
                PropertyData::Page(PagePropertyData::new(
                    name.clone(),
                    declared.key(),
                    Arc::clone(self),
                ))
            }
            PropertyNode::Virtual(node) => {
                PropertyData::Virtual(VirtualPropertyData::new(name.clone(), page.clone(), node.clone()))
            }
        })
    }

    /// Nested page fragment, built on first access.
    ///
    /// `None` when `name` is not a nested property or the fragment cannot
    /// be built; [`Page::try_nested`] reports the build error.
    #[must_use]
    pub fn nested(&self, name: &str) -> Option<Arc<Page>> {
        match self.try_nested(name) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(page = self.name(), property = name, error = %e, "nested page build failed");
                None
            }
        }
    }

    /// Nested page fragment, with build errors
    pub fn try_nested(&self, name: &str) -> PageResult<Option<Arc<Page>>> {
        let Some(node) = self.index_of(name).and_then(|i| self.nodes.get(i)) else {
            return Ok(None);
        };
        match node {
            PropertyNode::Nested(nested) => nested.page().map(Some),
            _ => Ok(None),
        }
    }

    /// List property
    #[must_use]
    pub fn list(&self, name: &str) -> Option<ElementList> {
        match self.nodes.get(self.index_of(name)?)? {
            PropertyNode::List(list) => Some(list.clone()),
            _ => None,
        }
    }

    /// Current value of a scalar property
    #[must_use]
    pub fn value(&self, name: &str) -> Option<Value> {
        self.scalars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_property_name(name))
            .cloned()
    }

    /// Replace the value of a scalar property
    pub fn set_value(&self, name: &str, value: impl Into<Value>) -> PageResult<()> {
        let key = normalize_property_name(name);
        let declared = self
            .descriptor
            .property(name)
            .filter(|p| matches!(p.kind(), PropertyKind::Scalar(_)));
        if declared.is_none() {
            return Err(PageError::PropertyNotFound {
                property: name.to_string(),
                page: self.name().to_string(),
                available: self.property_names(),
            });
        }
        self.scalars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.into());
        Ok(())
    }
}
