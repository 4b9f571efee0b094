//! Page declarations: the metadata a page type exposes to the builder.
//!
//! A page type implements [`PageModel`], either by hand through
//! [`PageDescriptor::builder`] or with `#[derive(PageModel)]`. The descriptor
//! is plain data; [`crate::builder::PageBuilder`] reads it once per type and
//! compiles it into a factory.
//!
//! # Example
//!
//! ```ignore
//! struct LoginPage;
//!
//! impl PageModel for LoginPage {
//!     fn descriptor() -> PageDescriptor {
//!         PageDescriptor::builder("LoginPage")
//!             .document()
//!             .route("/login")
//!             .element("user_name", ElementKind::TextBox, LocatorMetadata::id("user"))
//!             .element("sign_in", ElementKind::Button, LocatorMetadata::new().with_text("Sign in"))
//!             .scalar("title", "Login")
//!             .build()
//!     }
//! }
//! ```

use crate::locator::LocatorMetadata;
use crate::native::ElementKind;
use crate::value::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A type that declares a page (or a page-like fragment such as a list row).
pub trait PageModel: 'static {
    /// Declared structure of the page
    fn descriptor() -> PageDescriptor;

    /// Type-erased reference used by caches and nested declarations
    fn page_type() -> PageTypeRef
    where
        Self: Sized,
    {
        PageTypeRef::of::<Self>()
    }
}

/// Type-erased handle to a [`PageModel`] implementation
#[derive(Clone, Copy)]
pub struct PageTypeRef {
    id: TypeId,
    name: &'static str,
    descriptor: fn() -> PageDescriptor,
}

impl PageTypeRef {
    /// Handle for `T`
    #[must_use]
    pub fn of<T: PageModel>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            descriptor: T::descriptor,
        }
    }

    /// Cache key
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.id
    }

    /// Rust type name
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.name
    }

    /// Read the declaration
    #[must_use]
    pub fn descriptor(&self) -> PageDescriptor {
        (self.descriptor)()
    }
}

impl PartialEq for PageTypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PageTypeRef {}

impl fmt::Debug for PageTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PageTypeRef").field(&self.name).finish()
    }
}

/// Where a page is rooted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageScope {
    /// A whole document (browser page or frame content)
    Document,
    /// A fragment rooted at an element of its parent
    #[default]
    Element,
}

/// Navigation annotation of a page
#[derive(Debug, Clone)]
pub struct NavigationRoute {
    url: String,
    frame: Option<String>,
    matcher: UrlMatcher,
}

impl NavigationRoute {
    /// Route for a URL pattern
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let matcher = UrlMatcher::new(&url);
        Self {
            url,
            frame: None,
            matcher,
        }
    }

    /// Host the page inside a named frame
    #[must_use]
    pub fn in_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    /// URL pattern
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Frame the page lives in
    #[must_use]
    pub fn frame(&self) -> Option<&str> {
        self.frame.as_deref()
    }

    /// Whether a concrete URL matches the route pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.matcher.matches(url)
    }

    /// Route parameters captured from a concrete URL
    #[must_use]
    pub fn extract_params(&self, url: &str) -> HashMap<String, String> {
        self.matcher.extract_params(url)
    }
}

/// Source of a computed property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualSource {
    /// Attribute of another element property on the same page
    Attribute {
        /// Element property the attribute belongs to
        element: String,
        /// Attribute name
        attribute: String,
    },
    /// Rendered text of the page root
    Text,
    /// Script evaluated against the page root
    Script {
        /// Script body; the fill value is passed as its first argument
        script: String,
    },
}

/// What a declared property is
#[derive(Debug, Clone)]
pub enum PropertyKind {
    /// Single element of a native type
    Element(ElementKind),
    /// Repeated element, each item projected as a page of type `item`
    List {
        /// Item page type
        item: PageTypeRef,
        /// Native type of each item element
        item_kind: ElementKind,
    },
    /// Nested page fragment rooted at the located element
    Nested(PageTypeRef),
    /// Frame element (used by frame maps)
    Frame,
    /// Plain value with its initial content
    Scalar(Value),
    /// Computed value
    Virtual(VirtualSource),
}

impl PropertyKind {
    /// Whether properties of this kind are located in the UI
    #[must_use]
    pub const fn is_located(&self) -> bool {
        matches!(
            self,
            Self::Element(_) | Self::List { .. } | Self::Nested(_) | Self::Frame
        )
    }
}

/// One declared property
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    locator: Option<LocatorMetadata>,
    kind: PropertyKind,
}

impl PropertyDescriptor {
    /// Create a property descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PropertyKind, locator: Option<LocatorMetadata>) -> Self {
        Self {
            name: name.into(),
            locator,
            kind,
        }
    }

    /// Element property
    #[must_use]
    pub fn element(name: impl Into<String>, kind: ElementKind, locator: LocatorMetadata) -> Self {
        Self::new(name, PropertyKind::Element(kind), Some(locator))
    }

    /// Declared name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Locator metadata, if any
    #[must_use]
    pub const fn locator(&self) -> Option<&LocatorMetadata> {
        self.locator.as_ref()
    }

    /// Property kind
    #[must_use]
    pub const fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Lookup key
    #[must_use]
    pub fn key(&self) -> String {
        normalize_property_name(&self.name)
    }
}

/// Declared structure of a page type
#[derive(Debug, Clone)]
pub struct PageDescriptor {
    name: String,
    scope: PageScope,
    locator: Option<LocatorMetadata>,
    route: Option<NavigationRoute>,
    frame_map: bool,
    frame_redirect: bool,
    properties: Vec<PropertyDescriptor>,
}

impl PageDescriptor {
    /// Start a descriptor
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PageDescriptorBuilder {
        PageDescriptorBuilder::new(name)
    }

    /// Page name used in diagnostics
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rooting scope
    #[must_use]
    pub const fn scope(&self) -> PageScope {
        self.scope
    }

    /// Locator used when the page appears nested without its own field locator
    #[must_use]
    pub const fn locator(&self) -> Option<&LocatorMetadata> {
        self.locator.as_ref()
    }

    /// Navigation annotation
    #[must_use]
    pub const fn route(&self) -> Option<&NavigationRoute> {
        self.route.as_ref()
    }

    /// Whether the type is a frame map
    #[must_use]
    pub const fn is_frame_map(&self) -> bool {
        self.frame_map
    }

    /// Whether a route frame redirects the page root
    #[must_use]
    pub const fn frame_redirect(&self) -> bool {
        self.frame_redirect
    }

    /// Declared properties in order
    #[must_use]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Find a property by (normalized) name
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        let key = normalize_property_name(name);
        self.properties.iter().find(|p| p.key() == key)
    }

    /// Declared property names in order
    #[must_use]
    pub fn property_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name.clone()).collect()
    }

    /// Base resets for document-rooted pages: a document is matched
    /// structurally, never by its own locator, and may be redirected into a
    /// frame by its route.
    pub fn apply_document_resets(&mut self) {
        if self.scope == PageScope::Document {
            self.locator = None;
            self.frame_redirect = true;
        }
    }
}

/// Builder for [`PageDescriptor`]
#[derive(Debug, Clone)]
pub struct PageDescriptorBuilder {
    inner: PageDescriptor,
}

impl PageDescriptorBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: PageDescriptor {
                name: name.into(),
                scope: PageScope::Element,
                locator: None,
                route: None,
                frame_map: false,
                frame_redirect: false,
                properties: Vec::new(),
            },
        }
    }

    /// Root the page at a whole document
    #[must_use]
    pub const fn document(mut self) -> Self {
        self.inner.scope = PageScope::Document;
        self
    }

    /// Own locator used when nested without a field locator
    #[must_use]
    pub fn locator(mut self, locator: LocatorMetadata) -> Self {
        self.inner.locator = Some(locator);
        self
    }

    /// Set the URL pattern
    #[must_use]
    pub fn route(mut self, url: impl Into<String>) -> Self {
        let frame = self
            .inner
            .route
            .take()
            .and_then(|r| r.frame);
        let mut route = NavigationRoute::new(url);
        route.frame = frame;
        self.inner.route = Some(route);
        self
    }

    /// Host the page inside a named frame
    #[must_use]
    pub fn frame(mut self, frame: impl Into<String>) -> Self {
        let route = self
            .inner
            .route
            .take()
            .unwrap_or_else(|| NavigationRoute::new(""));
        self.inner.route = Some(route.in_frame(frame));
        self.inner.frame_redirect = true;
        self
    }

    /// Mark the type as a frame map
    #[must_use]
    pub const fn frame_map(mut self) -> Self {
        self.inner.frame_map = true;
        self
    }

    /// Add a prepared property
    #[must_use]
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.inner.properties.push(property);
        self
    }

    /// Add an element property
    #[must_use]
    pub fn element(self, name: impl Into<String>, kind: ElementKind, locator: LocatorMetadata) -> Self {
        self.property(PropertyDescriptor::element(name, kind, locator))
    }

    /// Add a list property whose items project as `T`
    #[must_use]
    pub fn list<T: PageModel>(
        self,
        name: impl Into<String>,
        item_kind: ElementKind,
        locator: LocatorMetadata,
    ) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            PropertyKind::List {
                item: PageTypeRef::of::<T>(),
                item_kind,
            },
            Some(locator),
        ))
    }

    /// Add a nested page fragment; `None` uses the fragment's own locator
    #[must_use]
    pub fn nested<T: PageModel>(self, name: impl Into<String>, locator: Option<LocatorMetadata>) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            PropertyKind::Nested(PageTypeRef::of::<T>()),
            locator,
        ))
    }

    /// Add a frame element
    #[must_use]
    pub fn frame_element(self, name: impl Into<String>, locator: LocatorMetadata) -> Self {
        self.property(PropertyDescriptor::new(name, PropertyKind::Frame, Some(locator)))
    }

    /// Add a scalar property with its initial value
    #[must_use]
    pub fn scalar(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            PropertyKind::Scalar(value.into()),
            None,
        ))
    }

    /// Add a property computed from another element's attribute
    #[must_use]
    pub fn virtual_attribute(
        self,
        name: impl Into<String>,
        element: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            PropertyKind::Virtual(VirtualSource::Attribute {
                element: element.into(),
                attribute: attribute.into(),
            }),
            None,
        ))
    }

    /// Add a property computed by a script
    #[must_use]
    pub fn virtual_script(self, name: impl Into<String>, script: impl Into<String>) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            PropertyKind::Virtual(VirtualSource::Script {
                script: script.into(),
            }),
            None,
        ))
    }

    /// Add a property reading the page root's own text
    #[must_use]
    pub fn virtual_text(self, name: impl Into<String>) -> Self {
        self.property(PropertyDescriptor::new(
            name,
            PropertyKind::Virtual(VirtualSource::Text),
            None,
        ))
    }

    /// Finish
    #[must_use]
    pub fn build(self) -> PageDescriptor {
        self.inner
    }
}

/// Lookup key for property and field names: case, whitespace, `_` and `-`
/// are ignored, so a table header "First Name" finds `first_name`.
#[must_use]
pub fn normalize_property_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Declaration marker for a single element field (`#[derive(PageModel)]`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Element;

/// Declaration marker for a list field whose items project as `T`
pub struct ElementList<T>(PhantomData<fn() -> T>);

impl<T> Default for ElementList<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> fmt::Debug for ElementList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementList<{}>", std::any::type_name::<T>())
    }
}

/// Declaration marker for a frame field of a frame map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame;

macro_rules! kind_markers {
    ($($marker:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Declaration marker for a `", stringify!($marker), "` element field")]
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct $marker;

            impl $marker {
                /// Declared element kind
                #[must_use]
                pub fn kind() -> ElementKind {
                    ElementKind::$marker
                }
            }
        )+
    };
}

kind_markers!(
    TextBox,
    TextArea,
    CheckBox,
    RadioButton,
    Select,
    Button,
    Link,
    Image,
    Div,
    Span,
    Table,
    TableRow,
);

/// Base document type: the root of every browser page.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDocument;

impl PageModel for HtmlDocument {
    fn descriptor() -> PageDescriptor {
        PageDescriptor::builder("HtmlDocument")
            .document()
            .locator(LocatorMetadata::tag("html"))
            .build()
    }
}

/// List item whose only field is its own rendered text (`Text`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TextItem;

impl PageModel for TextItem {
    fn descriptor() -> PageDescriptor {
        PageDescriptor::builder("TextItem").virtual_text("Text").build()
    }
}

/// URL pattern matcher for navigation routes
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

impl UrlMatcher {
    /// Create a new URL matcher from a pattern
    ///
    /// Patterns support literal segments (`/login`), wildcards (`/users/*`)
    /// and named parameters (`/users/{id}` or `/users/:id`). Query strings
    /// on the URL are ignored.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    fn url_segments(url: &str) -> Vec<&str> {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Check if a URL matches the pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let url_segments = Self::url_segments(url);
        if url_segments.len() != self.segments.len() {
            return false;
        }

        self.segments
            .iter()
            .zip(url_segments)
            .all(|(segment, actual)| match segment {
                UrlSegment::Literal(lit) => lit.eq_ignore_ascii_case(actual),
                UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
            })
    }

    /// Extract parameters from a URL; empty when the URL does not match
    #[must_use]
    pub fn extract_params(&self, url: &str) -> HashMap<String, String> {
        if !self.matches(url) {
            return HashMap::new();
        }
        self.segments
            .iter()
            .zip(Self::url_segments(url))
            .filter_map(|(segment, value)| match segment {
                UrlSegment::Parameter(name) => Some((name.clone(), value.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Get the original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
