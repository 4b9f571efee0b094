//! Page construction.
//!
//! Each page type is compiled once into a [`PageFactory`]: locator metadata
//! becomes [`LocatorExpr`]s, nested and list item types are bound by
//! reference and instantiated only when first reached, and virtual
//! properties are checked against the elements they read. The compiled
//! factory is cached per type and reused by every later build, including
//! concurrent first builds.

use crate::fill::{FillHandler, FillHandlers};
use crate::frame::FrameRegistry;
use crate::list::ElementList;
use crate::locator::LocatorExpr;
use crate::native::{DocumentHost, ElementKind, NativeRef};
use crate::page::{NestedPage, Page, PropertyNode, VirtualNode};
use crate::page_object::{
    PageDescriptor, PageModel, PageTypeRef, PropertyDescriptor, PropertyKind, VirtualSource,
};
use crate::result::{PageError, PageResult};
use crate::value::Value;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};
use std::time::Duration;

/// Default existence timeout for element checks
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Instantiates a compiled page type on a native root
pub type PageFactory =
    Arc<dyn Fn(NativeRef, Option<&dyn PropertyVisitor>) -> PageResult<Arc<Page>> + Send + Sync>;

/// Hook run on every constructed property in declaration order.
///
/// Returning `Some` replaces the native element the property binds to.
/// Only the page being built is visited: nested fragments and list items
/// are instantiated later, on first access, without a visitor.
pub trait PropertyVisitor {
    /// Visit one property; `native` is `None` for scalar properties
    fn visit(
        &self,
        page: &PageDescriptor,
        property: &PropertyDescriptor,
        native: Option<&NativeRef>,
    ) -> Option<NativeRef>;
}

impl<F> PropertyVisitor for F
where
    F: Fn(&PageDescriptor, &PropertyDescriptor, Option<&NativeRef>) -> Option<NativeRef>,
{
    fn visit(
        &self,
        page: &PageDescriptor,
        property: &PropertyDescriptor,
        native: Option<&NativeRef>,
    ) -> Option<NativeRef> {
        self(page, property, native)
    }
}

#[derive(Debug, Clone)]
enum PropertyPlan {
    Element {
        locator: LocatorExpr,
        kind: ElementKind,
    },
    List {
        locator: LocatorExpr,
        item: PageTypeRef,
        item_kind: ElementKind,
    },
    Nested {
        locator: Option<LocatorExpr>,
        page: PageTypeRef,
    },
    Frame {
        locator: LocatorExpr,
    },
    Scalar(Value),
    VirtualAttribute {
        locator: LocatorExpr,
        attribute: String,
    },
    VirtualText,
    VirtualScript {
        script: String,
    },
}

#[derive(Debug)]
struct CompiledPage {
    descriptor: Arc<PageDescriptor>,
    own_locator: Option<LocatorExpr>,
    plans: Vec<PropertyPlan>,
}

#[derive(Clone)]
struct CompiledEntry {
    compiled: Arc<CompiledPage>,
    factory: PageFactory,
}

type CacheSlot = Arc<OnceLock<Result<CompiledEntry, (String, String)>>>;

struct BuilderInner {
    cache: RwLock<HashMap<TypeId, CacheSlot>>,
    compilations: AtomicUsize,
    frames: FrameRegistry,
    fills: RwLock<Arc<FillHandlers>>,
    timeout: RwLock<Duration>,
}

/// Compiles page types and builds page instances.
///
/// Cloning is cheap and clones share the same cache.
#[derive(Clone)]
pub struct PageBuilder {
    inner: Arc<BuilderInner>,
}

impl fmt::Debug for PageBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageBuilder")
            .field("compiled_types", &self.read_cache().len())
            .field("compilations", &self.compilation_count())
            .field("frame_maps", &self.inner.frames.len())
            .finish()
    }
}

impl Default for PageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PageBuilder {
    /// Builder with the default fill handlers and timeout
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BuilderInner {
                cache: RwLock::new(HashMap::new()),
                compilations: AtomicUsize::new(0),
                frames: FrameRegistry::new(),
                fills: RwLock::new(Arc::new(FillHandlers::with_defaults())),
                timeout: RwLock::new(DEFAULT_WAIT_TIMEOUT),
            }),
        }
    }

    /// Process-wide builder
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<PageBuilder> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<TypeId, CacheSlot>> {
        self.inner.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// How many page types have been compiled
    #[must_use]
    pub fn compilation_count(&self) -> usize {
        self.inner.compilations.load(Ordering::SeqCst)
    }

    /// Existence timeout given to pages built from now on
    pub fn set_wait_timeout(&self, timeout: Duration) {
        *self.inner.timeout.write().unwrap_or_else(PoisonError::into_inner) = timeout;
    }

    /// Current existence timeout
    #[must_use]
    pub fn wait_timeout(&self) -> Duration {
        *self.inner.timeout.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace the fill handler for an element kind
    pub fn register_fill_handler(&self, kind: ElementKind, handler: Arc<dyn FillHandler>) {
        let mut slot = self.inner.fills.write().unwrap_or_else(PoisonError::into_inner);
        let mut handlers = FillHandlers::clone(&slot);
        handlers.register(kind, handler);
        *slot = Arc::new(handlers);
    }

    fn fills(&self) -> Arc<FillHandlers> {
        Arc::clone(&self.inner.fills.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Register a frame map used to resolve route frames
    pub fn register_frame_map<T: PageModel>(&self) -> PageResult<()> {
        self.inner.frames.register(T::page_type())
    }

    /// Frame registry
    #[must_use]
    pub fn frames(&self) -> &FrameRegistry {
        &self.inner.frames
    }

    /// Factory for `T`
    pub fn create_element<T: PageModel>(&self) -> PageResult<PageFactory> {
        self.create_element_for(T::page_type())
    }

    /// Factory for a page type
    pub fn create_element_for(&self, page_type: PageTypeRef) -> PageResult<PageFactory> {
        self.entry(page_type).map(|e| e.factory)
    }

    /// Build `T` on the root supplied by `host`
    pub fn build_page<T: PageModel>(&self, host: &dyn DocumentHost) -> PageResult<Arc<Page>> {
        self.build_page_for(T::page_type(), host, None)
    }

    /// Build a page type on the root supplied by `host`.
    ///
    /// The root is redirected into the route's frame when one is declared,
    /// then narrowed by the page's own locator when it has one. Route
    /// parameters are read from the host's current URL.
    pub fn build_page_for(
        &self,
        page_type: PageTypeRef,
        host: &dyn DocumentHost,
        visitor: Option<&dyn PropertyVisitor>,
    ) -> PageResult<Arc<Page>> {
        let entry = self.entry(page_type)?;
        let descriptor = &entry.compiled.descriptor;
        let mut root = host.page_root(descriptor)?;

        if descriptor.frame_redirect() {
            if let Some(frame) = descriptor.route().and_then(|r| r.frame()) {
                root = self.inner.frames.resolve(frame, descriptor.name(), &root)?;
            }
        }
        if let Some(locator) = &entry.compiled.own_locator {
            root = root.find(locator);
        }

        tracing::debug!(page = descriptor.name(), "building page");
        let page = (entry.factory)(root, visitor)?;
        if let (Some(url), Some(route)) = (host.current_url(), descriptor.route()) {
            page.set_route_params(route.extract_params(&url));
        }
        Ok(page)
    }

    fn entry(&self, page_type: PageTypeRef) -> PageResult<CompiledEntry> {
        let slot = {
            let cache = self.read_cache();
            cache.get(&page_type.type_id()).cloned()
        };
        let slot = match slot {
            Some(slot) => slot,
            None => {
                let mut cache = self.inner.cache.write().unwrap_or_else(PoisonError::into_inner);
                Arc::clone(cache.entry(page_type.type_id()).or_default())
            }
        };

        let outcome = slot.get_or_init(|| {
            self.inner.compilations.fetch_add(1, Ordering::SeqCst);
            self.compile(page_type)
                .map(|compiled| self.entry_for(compiled))
                .map_err(|e| match e {
                    PageError::Configuration { page, message } => (page, message),
                    other => (page_type.type_name().to_string(), other.to_string()),
                })
        });

        outcome
            .clone()
            .map_err(|(page, message)| PageError::Configuration { page, message })
    }

    fn entry_for(&self, compiled: CompiledPage) -> CompiledEntry {
        let compiled = Arc::new(compiled);
        let weak: Weak<BuilderInner> = Arc::downgrade(&self.inner);
        let captured = Arc::clone(&compiled);
        let factory: PageFactory = Arc::new(move |root, visitor| {
            let inner = weak.upgrade().ok_or_else(|| {
                PageError::configuration(captured.descriptor.name(), "page builder was dropped")
            })?;
            PageBuilder { inner }.instantiate(&captured, root, visitor)
        });
        CompiledEntry { compiled, factory }
    }

    fn compile(&self, page_type: PageTypeRef) -> PageResult<CompiledPage> {
        let mut descriptor = page_type.descriptor();
        descriptor.apply_document_resets();
        let page = descriptor.name().to_string();

        let mut seen = HashSet::new();
        for property in descriptor.properties() {
            if !seen.insert(property.key()) {
                return Err(PageError::configuration(
                    &page,
                    format!("property '{}' is declared more than once", property.name()),
                ));
            }
        }

        let own_locator = descriptor
            .locator()
            .map(|l| l.compile(&ElementKind::Generic, &page, "<page>"))
            .transpose()?;

        let plans = descriptor
            .properties()
            .iter()
            .map(|property| Self::plan(&descriptor, property))
            .collect::<PageResult<Vec<_>>>()?;

        tracing::debug!(page = %page, properties = plans.len(), "compiled page type");
        Ok(CompiledPage {
            descriptor: Arc::new(descriptor),
            own_locator,
            plans,
        })
    }

    fn plan(descriptor: &PageDescriptor, property: &PropertyDescriptor) -> PageResult<PropertyPlan> {
        let page = descriptor.name();
        let name = property.name();
        let required = |kind: &ElementKind| -> PageResult<LocatorExpr> {
            property
                .locator()
                .ok_or_else(|| PageError::configuration(page, format!("property '{name}' has no locator")))?
                .compile(kind, page, name)
        };

        Ok(match property.kind() {
            PropertyKind::Element(kind) => PropertyPlan::Element {
                locator: required(kind)?,
                kind: kind.clone(),
            },
            PropertyKind::List { item, item_kind } => PropertyPlan::List {
                locator: required(item_kind)?,
                item: *item,
                item_kind: item_kind.clone(),
            },
            PropertyKind::Nested(nested) => {
                let locator = match property.locator() {
                    Some(meta) => Some(meta.compile(&ElementKind::Generic, page, name)?),
                    None => {
                        let mut nested_descriptor = nested.descriptor();
                        nested_descriptor.apply_document_resets();
                        nested_descriptor
                            .locator()
                            .map(|meta| meta.compile(&ElementKind::Generic, page, name))
                            .transpose()?
                    }
                };
                PropertyPlan::Nested {
                    locator,
                    page: *nested,
                }
            }
            PropertyKind::Frame => PropertyPlan::Frame {
                locator: required(&ElementKind::Frame)?,
            },
            PropertyKind::Scalar(value) => PropertyPlan::Scalar(value.clone()),
            PropertyKind::Virtual(VirtualSource::Attribute { element, attribute }) => {
                let target = descriptor
                    .property(element)
                    .filter(|p| matches!(p.kind(), PropertyKind::Element(_)))
                    .ok_or_else(|| {
                        PageError::configuration(
                            page,
                            format!("virtual property '{name}' reads unknown element '{element}'"),
                        )
                    })?;
                let kind = match target.kind() {
                    PropertyKind::Element(kind) => kind.clone(),
                    _ => ElementKind::Generic,
                };
                let locator = target
                    .locator()
                    .ok_or_else(|| {
                        PageError::configuration(page, format!("property '{element}' has no locator"))
                    })?
                    .compile(&kind, page, target.name())?;
                PropertyPlan::VirtualAttribute {
                    locator,
                    attribute: attribute.clone(),
                }
            }
            PropertyKind::Virtual(VirtualSource::Text) => PropertyPlan::VirtualText,
            PropertyKind::Virtual(VirtualSource::Script { script }) => PropertyPlan::VirtualScript {
                script: script.clone(),
            },
        })
    }

    fn instantiate(
        &self,
        compiled: &CompiledPage,
        root: NativeRef,
        visitor: Option<&dyn PropertyVisitor>,
    ) -> PageResult<Arc<Page>> {
        let descriptor = &compiled.descriptor;
        let visit = |property: &PropertyDescriptor, native: NativeRef| -> NativeRef {
            visitor
                .and_then(|v| v.visit(descriptor, property, Some(&native)))
                .unwrap_or(native)
        };

        let mut nodes = Vec::with_capacity(compiled.plans.len());
        let mut scalars = HashMap::new();

        for (property, plan) in descriptor.properties().iter().zip(&compiled.plans) {
            let node = match plan {
                PropertyPlan::Element { locator, kind } => PropertyNode::Element {
                    native: visit(property, root.find(locator)),
                    kind: kind.clone(),
                },
                PropertyPlan::List {
                    locator,
                    item,
                    item_kind,
                } => PropertyNode::List(ElementList::new(
                    visit(property, Arc::clone(&root)),
                    locator.clone(),
                    *item,
                    item_kind.clone(),
                    self.clone(),
                )),
                PropertyPlan::Nested { locator, page } => {
                    let located = locator
                        .as_ref()
                        .map_or_else(|| Arc::clone(&root), |l| root.find(l));
                    let native = visit(property, located);
                    // compiled here, instantiated on first access
                    let factory = self.create_element_for(*page)?;
                    PropertyNode::Nested(NestedPage::new(native, *page, factory))
                }
                PropertyPlan::Frame { locator } => PropertyNode::Frame {
                    native: visit(property, root.find(locator)),
                },
                PropertyPlan::Scalar(value) => {
                    if let Some(v) = visitor {
                        v.visit(descriptor, property, None);
                    }
                    scalars.insert(property.key(), value.clone());
                    PropertyNode::Scalar
                }
                PropertyPlan::VirtualAttribute { locator, attribute } => {
                    PropertyNode::Virtual(VirtualNode::Attribute {
                        native: visit(property, root.find(locator)),
                        attribute: attribute.clone(),
                    })
                }
                PropertyPlan::VirtualText => PropertyNode::Virtual(VirtualNode::Text {
                    scope: visit(property, Arc::clone(&root)),
                }),
                PropertyPlan::VirtualScript { script } => {
                    PropertyNode::Virtual(VirtualNode::Script {
                        scope: visit(property, Arc::clone(&root)),
                        script: script.clone(),
                    })
                }
            };
            nodes.push(node);
        }

        Ok(Arc::new(Page::new(
            Arc::clone(descriptor),
            root,
            nodes,
            scalars,
            self.fills(),
            self.wait_timeout(),
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::locator::LocatorMetadata;
    use crate::mock::{MockDocument, MockNode};
    use crate::page_object::HtmlDocument;
    use std::sync::Mutex;

    struct Address;

    impl PageModel for Address {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("Address")
                .locator(LocatorMetadata::id("address"))
                .element("City", ElementKind::TextBox, LocatorMetadata::new().with_name("city"))
                .build()
        }
    }

    struct Customer;

    impl PageModel for Customer {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("Customer")
                .document()
                .element("Name", ElementKind::TextBox, LocatorMetadata::id("name"))
                .nested::<Address>("Home", None)
                .scalar("Segment", "retail")
                .build()
        }
    }

    struct Duplicate;

    impl PageModel for Duplicate {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("Duplicate")
                .scalar("First Name", "a")
                .scalar("first_name", "b")
                .build()
        }
    }

    struct BadVirtual;

    impl PageModel for BadVirtual {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("BadVirtual")
                .virtual_attribute("Hint", "Missing", "title")
                .build()
        }
    }

    struct BadIndex;

    impl PageModel for BadIndex {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("BadIndex")
                .element("Cell", ElementKind::Generic, LocatorMetadata::tag("td").with_index(0))
                .build()
        }
    }

    struct Frames;

    impl PageModel for Frames {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("Frames")
                .document()
                .frame_map()
                .frame_element("Content", LocatorMetadata::id("content"))
                .build()
        }
    }

    struct Framed;

    impl PageModel for Framed {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("Framed")
                .document()
                .frame("content")
                .element("Inside", ElementKind::Generic, LocatorMetadata::id("inside"))
                .build()
        }
    }

    struct Lost;

    impl PageModel for Lost {
        fn descriptor() -> PageDescriptor {
            PageDescriptor::builder("Lost")
                .document()
                .frame("nowhere")
                .build()
        }
    }

    fn customer_doc() -> MockDocument {
        MockDocument::new(
            MockNode::new("html")
                .child(MockNode::new("input").id("name").attr("value", "Ann"))
                .child(MockNode::new("input").attr("name", "city").attr("value", "Elsewhere"))
                .child(
                    MockNode::new("fieldset")
                        .id("address")
                        .child(
                            MockNode::new("input")
                                .id("home-city")
                                .attr("name", "city")
                                .attr("value", "Oslo"),
                        ),
                ),
        )
    }

    mod cache_tests {
        use super::*;

        #[test]
        fn test_each_type_compiles_once() {
            let builder = PageBuilder::new();
            let a = builder.create_element::<Customer>().unwrap();
            let b = builder.create_element::<Customer>().unwrap();
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(builder.compilation_count(), 1);

            let doc = customer_doc();
            let first = a(doc.root(), None).unwrap();
            let second = b(doc.root(), None).unwrap();
            assert!(!Arc::ptr_eq(&first, &second));
            // Address compiles lazily on first instantiation
            assert_eq!(builder.compilation_count(), 2);
        }

        #[test]
        fn test_concurrent_first_builds_compile_once() {
            let builder = PageBuilder::new();
            std::thread::scope(|scope| {
                for _ in 0..8 {
                    scope.spawn(|| builder.create_element::<Customer>().unwrap());
                }
            });
            assert_eq!(builder.compilation_count(), 1);
        }

        #[test]
        fn test_configuration_errors_are_cached() {
            let builder = PageBuilder::new();
            let first = builder.create_element::<Duplicate>().err().unwrap();
            let second = builder.create_element::<Duplicate>().err().unwrap();
            assert_eq!(first.to_string(), second.to_string());
            assert!(first.to_string().contains("more than once"));
            assert_eq!(builder.compilation_count(), 1);
        }

        #[test]
        fn test_incompatible_metadata_fails_at_first_build() {
            let builder = PageBuilder::new();
            assert!(builder.create_element::<BadVirtual>().is_err());
            let err = builder.create_element::<BadIndex>().err().unwrap();
            assert_eq!(err.kind(), crate::result::ErrorKind::Configuration);
        }
    }

    mod build_tests {
        use super::*;

        #[test]
        fn test_nested_page_is_rooted_at_its_element() {
            let doc = customer_doc();
            let page = PageBuilder::new().build_page::<Customer>(&doc).unwrap();
            let home = page.nested("home").unwrap();
            let city = home.get_element("city").unwrap();
            assert_eq!(city.current_value().unwrap().as_deref(), Some("Oslo"));
            assert_eq!(page.value("segment"), Some(Value::from("retail")));
        }

        #[test]
        fn test_document_type_has_no_own_locator() {
            let doc = customer_doc();
            let page = PageBuilder::new().build_page::<HtmlDocument>(&doc).unwrap();
            assert!(page.root().exists());
            assert!(page.property_names().is_empty());
        }

        #[test]
        fn test_visitor_sees_properties_in_order() {
            let doc = customer_doc();
            let seen = Mutex::new(Vec::new());
            let visitor = |page: &PageDescriptor,
                           property: &PropertyDescriptor,
                           native: Option<&NativeRef>|
             -> Option<NativeRef> {
                seen.lock()
                    .unwrap()
                    .push(format!("{}.{}:{}", page.name(), property.name(), native.is_some()));
                None
            };
            PageBuilder::new()
                .build_page_for(Customer::page_type(), &doc, Some(&visitor))
                .unwrap();
            assert_eq!(
                *seen.lock().unwrap(),
                vec![
                    "Customer.Name:true",
                    "Customer.Home:true",
                    "Customer.Segment:false",
                ]
            );
        }

        #[test]
        fn test_visitor_can_replace_elements() {
            let doc = customer_doc();
            let replacement = doc.node_by_id("home-city").unwrap();
            let visitor = move |_: &PageDescriptor,
                                property: &PropertyDescriptor,
                                _: Option<&NativeRef>|
             -> Option<NativeRef> {
                (property.name() == "Name").then(|| Arc::clone(&replacement))
            };
            let page = PageBuilder::new()
                .build_page_for(Customer::page_type(), &doc, Some(&visitor))
                .unwrap();
            let name = page.get_element("name").unwrap();
            assert_eq!(name.current_value().unwrap().as_deref(), Some("Oslo"));
        }
    }

    mod nesting_tests {
        use super::*;
        use crate::property::PropertyData;

        struct Menu;

        impl PageModel for Menu {
            fn descriptor() -> PageDescriptor {
                PageDescriptor::builder("Menu")
                    .element("Label", ElementKind::Generic, LocatorMetadata::tag("span"))
                    .nested::<Menu>("Submenu", Some(LocatorMetadata::tag("ul")))
                    .build()
            }
        }

        struct Site;

        impl PageModel for Site {
            fn descriptor() -> PageDescriptor {
                PageDescriptor::builder("Site")
                    .document()
                    .nested::<Menu>("Menu", Some(LocatorMetadata::id("menu")))
                    .build()
            }
        }

        fn menu_doc() -> MockDocument {
            MockDocument::new(
                MockNode::new("html").child(
                    MockNode::new("ul")
                        .id("menu")
                        .child(MockNode::new("span").text("Top"))
                        .child(
                            MockNode::new("ul")
                                .child(MockNode::new("span").text("Middle"))
                                .child(MockNode::new("ul").child(MockNode::new("span").text("Leaf"))),
                        ),
                ),
            )
        }

        fn label(page: &Arc<Page>) -> Option<String> {
            page.get_element("label").unwrap().current_value().unwrap()
        }

        #[test]
        fn test_self_nesting_page_builds_and_descends() {
            let doc = menu_doc();
            let builder = PageBuilder::new();
            let site = builder.build_page::<Site>(&doc).unwrap();
            assert_eq!(builder.compilation_count(), 2);

            let top = site.nested("menu").unwrap();
            let middle = top.nested("submenu").unwrap();
            let leaf = middle.nested("submenu").unwrap();
            assert_eq!(label(&top).as_deref(), Some("Top"));
            assert_eq!(label(&middle).as_deref(), Some("Middle"));
            assert_eq!(label(&leaf).as_deref(), Some("Leaf"));

            let below = leaf.nested("submenu").unwrap();
            assert!(!below.root().exists());
            assert_eq!(builder.compilation_count(), 2);
        }

        #[test]
        fn test_nested_page_is_built_once_and_shared() {
            let doc = menu_doc();
            let site = PageBuilder::new().build_page::<Site>(&doc).unwrap();
            let first = site.nested("menu").unwrap();
            assert!(Arc::ptr_eq(&first, &site.nested("Menu").unwrap()));

            let Some(PropertyData::Element(element)) = site.get_element("menu") else {
                panic!("menu should be an element property");
            };
            let from_property = element.nested_page().unwrap().unwrap();
            assert!(Arc::ptr_eq(&first, &from_property));
            assert!(site.try_nested("missing").unwrap().is_none());
        }
    }

    mod frame_tests {
        use super::*;

        fn framed_doc() -> MockDocument {
            MockDocument::new(
                MockNode::new("html").child(
                    MockNode::new("iframe")
                        .id("content")
                        .frame_content(MockNode::new("html").child(MockNode::new("p").id("inside").text("hi"))),
                ),
            )
        }

        #[test]
        fn test_route_frame_becomes_root() {
            let builder = PageBuilder::new();
            builder.register_frame_map::<Frames>().unwrap();
            let page = builder.build_page::<Framed>(&framed_doc()).unwrap();
            let inside = page.get_element("inside").unwrap();
            assert_eq!(inside.current_value().unwrap().as_deref(), Some("hi"));
        }

        #[test]
        fn test_unknown_frame_is_a_navigation_error() {
            let builder = PageBuilder::new();
            builder.register_frame_map::<Frames>().unwrap();
            match builder.build_page::<Lost>(&framed_doc()).unwrap_err() {
                PageError::FrameNotFound { frame, page } => {
                    assert_eq!(frame, "nowhere");
                    assert_eq!(page, "Lost");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
