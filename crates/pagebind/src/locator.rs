//! Locator metadata and the compiled locator expressions handed to drivers.
//!
//! A property declares *what* identifies its element ([`LocatorMetadata`]);
//! the page builder compiles that once into a [`LocatorExpr`]. When several
//! discriminators are present they always compose into one compound match,
//! never into alternative locators that could each hit a different element.

use crate::native::ElementKind;
use crate::result::{PageError, PageResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminators declared on a property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorMetadata {
    /// `id` attribute
    pub id: Option<String>,
    /// `name` attribute
    pub name: Option<String>,
    /// CSS class (space separated for several)
    pub class: Option<String>,
    /// Tag name
    pub tag: Option<String>,
    /// Exact rendered text
    pub text: Option<String>,
    /// 1-based ordinal among matches
    pub index: Option<u32>,
    /// `title` attribute
    pub title: Option<String>,
    /// `href` of a link
    pub url: Option<String>,
    /// `alt` text of an image
    pub alt: Option<String>,
    /// `type` attribute of an input
    pub input_type: Option<String>,
    /// Any further attribute pairs
    pub attributes: Vec<(String, String)>,
}

impl LocatorMetadata {
    /// Empty metadata
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match by id
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::new().with_id(id)
    }

    /// Match by tag
    #[must_use]
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::new().with_tag(tag)
    }

    /// Set the id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the name attribute
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the CSS class
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Set the tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the rendered text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the 1-based index
    #[must_use]
    pub const fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the title attribute
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the link target
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the image alt text
    #[must_use]
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    /// Set the input type
    #[must_use]
    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    /// Add an arbitrary attribute constraint
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// True when no discriminator is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.class.is_none()
            && self.tag.is_none()
            && self.text.is_none()
            && self.title.is_none()
            && self.url.is_none()
            && self.alt.is_none()
            && self.input_type.is_none()
            && self.attributes.is_empty()
    }

    /// Compile into a single locator expression.
    ///
    /// `kind` supplies a default tag (and input type) when the metadata does
    /// not name one. `page` and `property` only feed error messages.
    pub fn compile(&self, kind: &ElementKind, page: &str, property: &str) -> PageResult<LocatorExpr> {
        let fail = |message: String| {
            PageError::configuration(page, format!("property '{property}': {message}"))
        };

        if self.index == Some(0) {
            return Err(fail("locator index is 1-based, got 0".to_string()));
        }

        let mut tag = self
            .tag
            .clone()
            .or_else(|| {
                // An id is unique on its own; other discriminators are narrowed by kind
                if self.id.is_some() {
                    None
                } else {
                    kind.default_tag().map(str::to_string)
                }
            })
            .map(|t| t.to_ascii_lowercase());

        if self.url.is_some() {
            match tag.as_deref() {
                None => tag = Some("a".to_string()),
                Some("a" | "area" | "link") => {}
                Some(other) => {
                    return Err(fail(format!("url requires a link tag, found '{other}'")));
                }
            }
        }
        if self.alt.is_some() {
            match tag.as_deref() {
                None => tag = Some("img".to_string()),
                Some("img" | "area" | "input") => {}
                Some(other) => {
                    return Err(fail(format!("alt requires an image tag, found '{other}'")));
                }
            }
        }

        let input_type = self
            .input_type
            .clone()
            .or_else(|| kind.default_input_type().map(str::to_string));
        if input_type.is_some() {
            match tag.as_deref() {
                None => tag = Some("input".to_string()),
                Some("input" | "button") => {}
                Some(other) => {
                    return Err(fail(format!("type requires an input tag, found '{other}'")));
                }
            }
        }

        let mut conditions = Vec::new();
        if let Some(id) = &self.id {
            conditions.push(Condition::attribute("id", id));
        }
        if let Some(name) = &self.name {
            conditions.push(Condition::attribute("name", name));
        }
        if let Some(class) = &self.class {
            conditions.push(Condition::Class(class.trim().to_string()));
        }
        if let Some(input_type) = input_type {
            conditions.push(Condition::attribute("type", input_type));
        }
        if let Some(title) = &self.title {
            conditions.push(Condition::attribute("title", title));
        }
        if let Some(url) = &self.url {
            conditions.push(Condition::attribute("href", url));
        }
        if let Some(alt) = &self.alt {
            conditions.push(Condition::attribute("alt", alt));
        }
        for (name, value) in &self.attributes {
            conditions.push(Condition::attribute(name, value));
        }
        if let Some(text) = &self.text {
            conditions.push(Condition::Text(text.clone()));
        }

        let base = match (tag, conditions.len()) {
            (None, 0) => return Err(fail("no locator discriminators declared".to_string())),
            (Some(tag), 0) => LocatorExpr::Tag(tag),
            (None, 1) => match conditions.remove(0) {
                Condition::Attribute { name, value } if name == "id" => LocatorExpr::Id(value),
                Condition::Attribute { name, value } if name == "name" => LocatorExpr::Name(value),
                Condition::Class(class) => LocatorExpr::Class(class),
                single => LocatorExpr::Compound {
                    tag: None,
                    conditions: vec![single],
                },
            },
            (tag, _) => LocatorExpr::Compound { tag, conditions },
        };

        Ok(match self.index {
            Some(index) => base.nth(index),
            None => base,
        })
    }
}

/// One constraint of a compound locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Attribute equals value
    Attribute {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// Element carries every listed class
    Class(String),
    /// Normalized rendered text equals value
    Text(String),
}

impl Condition {
    /// Attribute equality condition
    #[must_use]
    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    fn to_xpath_predicate(&self) -> String {
        match self {
            Self::Attribute { name, value } => format!("@{name}={}", xpath_literal(value)),
            Self::Class(classes) => classes
                .split_whitespace()
                .map(|c| {
                    format!(
                        "contains(concat(' ', normalize-space(@class), ' '), {})",
                        xpath_literal(&format!(" {c} "))
                    )
                })
                .collect::<Vec<_>>()
                .join(" and "),
            Self::Text(text) => format!("normalize-space(.)={}", xpath_literal(text.trim())),
        }
    }
}

/// Compiled, driver-neutral locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorExpr {
    /// By id
    Id(String),
    /// By name attribute
    Name(String),
    /// By CSS class
    Class(String),
    /// By tag
    Tag(String),
    /// Optional tag plus conditions that must all hold on the same element
    Compound {
        /// Tag constraint
        tag: Option<String>,
        /// Conditions, all required
        conditions: Vec<Condition>,
    },
    /// The n-th (1-based) element matching `inner`
    Nth {
        /// Base locator
        inner: Box<LocatorExpr>,
        /// 1-based ordinal
        index: u32,
    },
    /// The row at `position` (1-based) among rows matching `inner`
    Row {
        /// Base row locator
        inner: Box<LocatorExpr>,
        /// 1-based row position
        position: u32,
    },
}

impl LocatorExpr {
    /// Ordinal "nth instance" of this locator
    #[must_use]
    pub fn nth(self, index: u32) -> Self {
        if self.is_table_row() {
            return self.row(index);
        }
        Self::Nth {
            inner: Box::new(self),
            index,
        }
    }

    /// Row position of this locator
    #[must_use]
    pub fn row(self, position: u32) -> Self {
        Self::Row {
            inner: Box::new(self),
            position,
        }
    }

    /// Tag this locator constrains, if any
    #[must_use]
    pub fn tag_name(&self) -> Option<&str> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::Compound { tag, .. } => tag.as_deref(),
            Self::Nth { inner, .. } | Self::Row { inner, .. } => inner.tag_name(),
            Self::Id(_) | Self::Name(_) | Self::Class(_) => None,
        }
    }

    /// Whether the locator targets table rows
    #[must_use]
    pub fn is_table_row(&self) -> bool {
        self.tag_name().is_some_and(|t| t.eq_ignore_ascii_case("tr"))
    }

    /// CSS rendering, when the locator is expressible in CSS
    #[must_use]
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Id(id) => Some(format!("[id={}]", css_literal(id))),
            Self::Name(name) => Some(format!("[name={}]", css_literal(name))),
            Self::Class(class) => Some(class_selector(class)),
            Self::Tag(tag) => Some(tag.clone()),
            Self::Compound { tag, conditions } => {
                let mut css = tag.clone().unwrap_or_default();
                for condition in conditions {
                    match condition {
                        Condition::Attribute { name, value } => {
                            css.push_str(&format!("[{name}={}]", css_literal(value)));
                        }
                        Condition::Class(class) => css.push_str(&class_selector(class)),
                        Condition::Text(_) => return None,
                    }
                }
                Some(css)
            }
            Self::Row { inner, position } => inner
                .to_css()
                .map(|css| format!("{css}:nth-of-type({position})")),
            Self::Nth { .. } => None,
        }
    }

    /// XPath rendering; every locator has one
    #[must_use]
    pub fn to_xpath(&self) -> String {
        match self {
            Self::Id(id) => format!("//*[@id={}]", xpath_literal(id)),
            Self::Name(name) => format!("//*[@name={}]", xpath_literal(name)),
            Self::Class(class) => format!(
                "//*[{}]",
                Condition::Class(class.clone()).to_xpath_predicate()
            ),
            Self::Tag(tag) => format!("//{tag}"),
            Self::Compound { tag, conditions } => {
                let predicate = conditions
                    .iter()
                    .map(Condition::to_xpath_predicate)
                    .collect::<Vec<_>>()
                    .join(" and ");
                format!("//{}[{predicate}]", tag.as_deref().unwrap_or("*"))
            }
            Self::Nth { inner, index } => format!("({})[{index}]", inner.to_xpath()),
            Self::Row { inner, position } => format!("({})[{position}]", inner.to_xpath()),
        }
    }
}

impl fmt::Display for LocatorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_xpath())
    }
}

fn class_selector(classes: &str) -> String {
    classes
        .split_whitespace()
        .map(|c| format!(".{c}"))
        .collect::<String>()
}

fn css_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{value}'")
    } else if !value.contains('"') {
        format!("\"{value}\"")
    } else {
        let parts = value
            .split('\'')
            .map(|p| format!("'{p}'"))
            .collect::<Vec<_>>()
            .join(", \"'\", ");
        format!("concat({parts})")
    }
}
