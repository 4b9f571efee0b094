//! In-memory document backend.
//!
//! A [`MockDocument`] is a small element tree that implements
//! [`NativeElement`] and [`DocumentHost`], so pages, the pipeline and
//! validation can be exercised without a browser. Handles returned by
//! `find` are lazy: they resolve against the current tree each time, and
//! the tree can be changed between steps to simulate a live UI.
//!
//! # Example
//!
//! ```
//! use pagebind::mock::{MockDocument, MockNode};
//!
//! let doc = MockDocument::new(
//!     MockNode::new("html").child(MockNode::new("button").id("save").text("Save")),
//! );
//! assert!(doc.node_by_id("save").is_some());
//! ```

use crate::locator::{Condition, LocatorExpr};
use crate::native::{DocumentHost, ElementKind, NativeElement, NativeRef, WaitCondition};
use crate::page_object::PageDescriptor;
use crate::result::{PageError, PageResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Script handler registered on a [`MockDocument`]
pub type ScriptHandler = Arc<dyn Fn(&[&str]) -> Option<String> + Send + Sync>;

/// Declarative node used to build a [`MockDocument`]
#[derive(Debug, Clone, Default)]
pub struct MockNode {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    disabled: bool,
    children: Vec<MockNode>,
    frame_content: Option<Box<MockNode>>,
}

impl MockNode {
    /// Element with a tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
        self
    }

    /// Set the id attribute
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Set the class attribute
    #[must_use]
    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Mark disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    /// Content document of a frame element
    #[must_use]
    pub fn frame_content(mut self, document: Self) -> Self {
        self.frame_content = Some(Box::new(document));
        self
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    text: String,
    enabled: bool,
    children: Vec<usize>,
    parent: Option<usize>,
    frame_root: Option<usize>,
    removed: bool,
}

impl NodeData {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        if let Some(slot) = self
            .attributes
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            slot.1 = value.to_string();
        } else {
            self.attributes.push((name.to_string(), value.to_string()));
        }
    }

    fn has_classes(&self, classes: &str) -> bool {
        let own: Vec<&str> = self.attribute("class").unwrap_or("").split_whitespace().collect();
        classes.split_whitespace().all(|c| own.contains(&c))
    }

    fn label(&self) -> String {
        self.attribute("id")
            .map_or_else(|| self.tag.clone(), |id| format!("#{id}"))
    }

    fn is_value_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }
}

struct DocState {
    nodes: RwLock<Vec<NodeData>>,
    events: Mutex<Vec<String>>,
    scripts: RwLock<HashMap<String, ScriptHandler>>,
    url: RwLock<Option<String>>,
}

impl fmt::Debug for DocState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocState")
            .field("nodes", &self.read().len())
            .finish_non_exhaustive()
    }
}

impl DocState {
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<NodeData>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<NodeData>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn insert(&self, node: MockNode, parent: Option<usize>) -> usize {
        let index = {
            let mut nodes = self.write();
            nodes.push(NodeData {
                tag: node.tag,
                attributes: node.attributes,
                text: node.text,
                enabled: !node.disabled,
                children: Vec::new(),
                parent,
                frame_root: None,
                removed: false,
            });
            nodes.len() - 1
        };
        if let Some(content) = node.frame_content {
            let frame_root = self.insert(*content, None);
            self.write()[index].frame_root = Some(frame_root);
        }
        for child in node.children {
            let child_index = self.insert(child, Some(index));
            self.write()[index].children.push(child_index);
        }
        index
    }

    fn is_live(nodes: &[NodeData], index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if nodes[i].removed {
                return false;
            }
            current = nodes[i].parent;
        }
        true
    }

    fn text_content(nodes: &[NodeData], index: usize) -> String {
        let node = &nodes[index];
        let mut parts = vec![node.text.clone()];
        parts.extend(
            node.children
                .iter()
                .filter(|c| !nodes[**c].removed)
                .map(|c| Self::text_content(nodes, *c)),
        );
        parts
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn descendants(nodes: &[NodeData], index: usize, out: &mut Vec<usize>) {
        for child in &nodes[index].children {
            if !nodes[*child].removed {
                out.push(*child);
                Self::descendants(nodes, *child, out);
            }
        }
    }

    fn matches(nodes: &[NodeData], index: usize, locator: &LocatorExpr) -> bool {
        let node = &nodes[index];
        match locator {
            LocatorExpr::Id(id) => node.attribute("id") == Some(id.as_str()),
            LocatorExpr::Name(name) => node.attribute("name") == Some(name.as_str()),
            LocatorExpr::Class(class) => node.has_classes(class),
            LocatorExpr::Tag(tag) => node.tag.eq_ignore_ascii_case(tag),
            LocatorExpr::Compound { tag, conditions } => {
                tag.as_ref().map_or(true, |t| node.tag.eq_ignore_ascii_case(t))
                    && conditions.iter().all(|c| match c {
                        Condition::Attribute { name, value } => {
                            node.attribute(name) == Some(value.as_str())
                        }
                        Condition::Class(class) => node.has_classes(class),
                        Condition::Text(text) => Self::text_content(nodes, index) == text.trim(),
                    })
            }
            LocatorExpr::Nth { inner, .. } | LocatorExpr::Row { inner, .. } => {
                Self::matches(nodes, index, inner)
            }
        }
    }

    fn search(nodes: &[NodeData], scope: usize, locator: &LocatorExpr) -> Option<usize> {
        let mut candidates = Vec::new();
        Self::descendants(nodes, scope, &mut candidates);
        let ordinal = match locator {
            LocatorExpr::Nth { index, .. } => *index as usize,
            LocatorExpr::Row { position, .. } => *position as usize,
            _ => 1,
        };
        candidates
            .into_iter()
            .filter(|i| Self::matches(nodes, *i, locator))
            .nth(ordinal.checked_sub(1)?)
    }
}

#[derive(Debug, Clone)]
enum Target {
    Fixed(usize),
    Found {
        scope: Arc<MockElement>,
        locator: LocatorExpr,
    },
}

/// Lazy handle into a [`MockDocument`]
#[derive(Debug, Clone)]
pub struct MockElement {
    doc: Arc<DocState>,
    target: Target,
}

impl MockElement {
    fn resolve(&self) -> Option<usize> {
        match &self.target {
            Target::Fixed(index) => {
                DocState::is_live(&self.doc.read(), *index).then_some(*index)
            }
            Target::Found { scope, locator } => {
                let scope = scope.resolve()?;
                DocState::search(&self.doc.read(), scope, locator)
            }
        }
    }

    fn label(&self) -> String {
        match (&self.target, self.resolve()) {
            (_, Some(index)) => self.doc.read()[index].label(),
            (Target::Found { locator, .. }, None) => locator.to_string(),
            (Target::Fixed(_), None) => "<removed>".to_string(),
        }
    }

    fn with_node<R>(&self, f: impl FnOnce(&NodeData) -> R) -> Option<R> {
        let index = self.resolve()?;
        Some(f(&self.doc.read()[index]))
    }

    fn missing(&self, action: &str) -> PageError {
        PageError::Driver {
            message: format!("cannot {action}: no element matches {}", self.label()),
        }
    }
}

impl NativeElement for MockElement {
    fn exists(&self) -> bool {
        self.resolve().is_some()
    }

    fn enabled(&self) -> bool {
        self.with_node(|n| n.enabled).unwrap_or(false)
    }

    fn text(&self) -> Option<String> {
        let index = self.resolve()?;
        let nodes = self.doc.read();
        let node = &nodes[index];
        if node.is_value_control() {
            if let Some(value) = node.attribute("value") {
                return Some(value.to_string());
            }
        }
        Some(DocState::text_content(&nodes, index))
    }

    fn click(&self) -> bool {
        let Some(index) = self.resolve() else {
            return false;
        };
        let label = {
            let mut nodes = self.doc.write();
            let node = &mut nodes[index];
            if !node.enabled {
                return false;
            }
            match node.attribute("type").map(str::to_ascii_lowercase).as_deref() {
                Some("checkbox") => {
                    let checked = node.attribute("checked").is_some_and(|v| v != "false");
                    node.set_attribute("checked", if checked { "false" } else { "true" });
                }
                Some("radio") => node.set_attribute("checked", "true"),
                _ => {}
            }
            node.label()
        };
        self.doc.record(format!("click {label}"));
        true
    }

    fn fill(&self, kind: &ElementKind, value: &str) -> PageResult<()> {
        let index = self.resolve().ok_or_else(|| self.missing("fill"))?;
        let label = {
            let mut nodes = self.doc.write();
            let node = &mut nodes[index];
            if !node.enabled {
                return Err(PageError::Driver {
                    message: format!("cannot fill disabled element {}", node.label()),
                });
            }
            node.set_attribute("value", value);
            node.label()
        };
        self.doc.record(format!("fill {label} ({kind}) = {value}"));
        Ok(())
    }

    fn highlight(&self) {
        if let Some(index) = self.resolve() {
            let label = {
                let mut nodes = self.doc.write();
                nodes[index].set_attribute("data-highlighted", "true");
                nodes[index].label()
            };
            self.doc.record(format!("highlight {label}"));
        }
    }

    fn wait_for(&self, condition: WaitCondition, _timeout: Duration) -> bool {
        condition.is_met(self)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.with_node(|n| n.attribute(name).map(str::to_string))
            .flatten()
    }

    fn set_attribute(&self, name: &str, value: &str) -> PageResult<()> {
        let index = self.resolve().ok_or_else(|| self.missing("set attribute"))?;
        self.doc.write()[index].set_attribute(name, value);
        Ok(())
    }

    fn execute_script(&self, script: &str, args: &[&str]) -> PageResult<Option<String>> {
        self.doc.record(format!("script {script}"));
        let handler = self
            .doc
            .scripts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(script)
            .cloned();
        Ok(handler.and_then(|h| h(args)))
    }

    fn find(&self, locator: &LocatorExpr) -> NativeRef {
        Arc::new(Self {
            doc: Arc::clone(&self.doc),
            target: Target::Found {
                scope: Arc::new(self.clone()),
                locator: locator.clone(),
            },
        })
    }

    fn frame_document(&self) -> Option<NativeRef> {
        let frame_root = self.with_node(|n| n.frame_root).flatten()?;
        Some(Arc::new(Self {
            doc: Arc::clone(&self.doc),
            target: Target::Fixed(frame_root),
        }))
    }
}

/// In-memory document
#[derive(Debug, Clone)]
pub struct MockDocument {
    doc: Arc<DocState>,
    root: usize,
}

impl MockDocument {
    /// Build a document from its root node
    #[must_use]
    pub fn new(root: MockNode) -> Self {
        let doc = Arc::new(DocState {
            nodes: RwLock::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            scripts: RwLock::new(HashMap::new()),
            url: RwLock::new(None),
        });
        let root = doc.insert(root, None);
        Self { doc, root }
    }

    /// Root element handle
    #[must_use]
    pub fn root(&self) -> NativeRef {
        Arc::new(MockElement {
            doc: Arc::clone(&self.doc),
            target: Target::Fixed(self.root),
        })
    }

    /// Set the current URL; pages with a route must then match it
    pub fn navigate(&self, url: impl Into<String>) {
        *self.doc.url.write().unwrap_or_else(PoisonError::into_inner) = Some(url.into());
    }

    fn index_by_id(&self, id: &str) -> Option<usize> {
        let nodes = self.doc.read();
        (0..nodes.len())
            .find(|i| nodes[*i].attribute("id") == Some(id) && DocState::is_live(&nodes, *i))
    }

    /// Fixed handle to the element with `id`, searching frames too
    #[must_use]
    pub fn node_by_id(&self, id: &str) -> Option<NativeRef> {
        let index = self.index_by_id(id)?;
        Some(Arc::new(MockElement {
            doc: Arc::clone(&self.doc),
            target: Target::Fixed(index),
        }))
    }

    /// Replace the own text of the element with `id`
    pub fn set_text(&self, id: &str, text: impl Into<String>) -> bool {
        self.update(id, |n| n.text = text.into())
    }

    /// Enable or disable the element with `id`
    pub fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        self.update(id, |n| n.enabled = enabled)
    }

    /// Detach the element with `id`
    pub fn remove(&self, id: &str) -> bool {
        self.update(id, |n| n.removed = true)
    }

    /// Append a child under the element with `id`
    pub fn append_child(&self, id: &str, child: MockNode) -> bool {
        let Some(parent) = self.index_by_id(id) else {
            return false;
        };
        let index = self.doc.insert(child, Some(parent));
        self.doc.write()[parent].children.push(index);
        true
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut NodeData)) -> bool {
        let Some(index) = self.index_by_id(id) else {
            return false;
        };
        f(&mut self.doc.write()[index]);
        true
    }

    /// Register the result of a script
    pub fn on_script<F>(&self, script: impl Into<String>, handler: F)
    where
        F: Fn(&[&str]) -> Option<String> + Send + Sync + 'static,
    {
        self.doc
            .scripts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(script.into(), Arc::new(handler));
    }

    /// Interactions recorded so far, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.doc
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DocumentHost for MockDocument {
    fn page_root(&self, page: &PageDescriptor) -> PageResult<NativeRef> {
        if let (Some(url), Some(route)) = (self.current_url(), page.route()) {
            if !route.url().is_empty() && !route.matches(&url) {
                return Err(PageError::Driver {
                    message: format!(
                        "page '{}' expects '{}' but the document is at '{url}'",
                        page.name(),
                        route.url()
                    ),
                });
            }
        }
        Ok(self.root())
    }

    fn current_url(&self) -> Option<String> {
        self.doc
            .url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
