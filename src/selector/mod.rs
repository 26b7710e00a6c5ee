//! Selector capability
//!
//! Wraps a parsed HTML tree and resolves CSS or XPath expressions into
//! owned node handles. Accessors are part of the expression:
//! - CSS: `::text`, `::attr(name)`
//! - XPath: `text()`, `@name`

mod css;
mod xpath;

use std::fmt;
use std::rc::Rc;

use ego_tree::NodeId;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Selector dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Style path (CSS selectors)
    Css,
    /// Structural path (XPath subset)
    XPath,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Css => "css",
            Dialect::XPath => "xpath",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a selection starts from
#[derive(Clone, Copy)]
enum Scope<'a> {
    Document,
    Element(ElementRef<'a>),
    /// Text and attribute handles have no children
    Empty,
}

/// Parsed HTML document, shared by every node handle taken from it
#[derive(Clone)]
pub struct Document {
    html: Rc<Html>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Rc::new(Html::parse_document(html)),
        }
    }

    /// Parse fetched bytes, replacing invalid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Resolve an expression against the whole document
    pub fn select(&self, dialect: Dialect, expression: &str) -> Result<Vec<Node>, ConfigurationError> {
        select_in(self, Scope::Document, dialect, expression)
    }

    /// Serialized document
    pub fn html(&self) -> String {
        self.html.html()
    }

    fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.html.root_element().value().name())
            .finish()
    }
}

fn select_in(
    doc: &Document,
    scope: Scope<'_>,
    dialect: Dialect,
    expression: &str,
) -> Result<Vec<Node>, ConfigurationError> {
    match dialect {
        Dialect::Css => css::select(doc, scope, expression),
        Dialect::XPath => xpath::select(doc, scope, expression),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Element(NodeId),
    Text(String),
    Attribute { name: String, value: String },
}

/// Handle to one matched location
///
/// Element handles keep their document alive, so they can be queried
/// again after the pass that produced them.
#[derive(Clone)]
pub struct Node {
    doc: Document,
    kind: NodeKind,
}

impl Node {
    fn element(doc: &Document, element: ElementRef<'_>) -> Self {
        Self {
            doc: doc.clone(),
            kind: NodeKind::Element(element.id()),
        }
    }

    fn text(doc: &Document, text: String) -> Self {
        Self {
            doc: doc.clone(),
            kind: NodeKind::Text(text),
        }
    }

    fn attribute(doc: &Document, name: &str, value: &str) -> Self {
        Self {
            doc: doc.clone(),
            kind: NodeKind::Attribute {
                name: name.to_string(),
                value: value.to_string(),
            },
        }
    }

    fn as_element(&self) -> Option<ElementRef<'_>> {
        match self.kind {
            NodeKind::Element(id) => self.doc.element(id),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    /// Tag name for element handles
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Attribute { name, .. } => Some(name),
            NodeKind::Element(_) => self.as_element().map(|el| el.value().name()),
            NodeKind::Text(_) => None,
        }
    }

    /// Attribute of an element handle
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.as_element().and_then(|el| el.value().attr(name))
    }

    /// Outer HTML for elements, content for text, value for attributes
    pub fn extract(&self) -> String {
        match &self.kind {
            NodeKind::Element(_) => self.as_element().map(|el| el.html()).unwrap_or_default(),
            NodeKind::Text(text) => text.clone(),
            NodeKind::Attribute { value, .. } => value.clone(),
        }
    }

    /// All descendant text, trimmed
    pub fn text_content(&self) -> String {
        match &self.kind {
            NodeKind::Element(_) => self
                .as_element()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
            NodeKind::Text(text) => text.trim().to_string(),
            NodeKind::Attribute { value, .. } => value.clone(),
        }
    }

    /// Resolve an expression relative to this node
    ///
    /// CSS matches descendants, XPath starts at the node itself.
    /// Text and attribute handles have no children and match nothing.
    pub fn select(&self, dialect: Dialect, expression: &str) -> Result<Vec<Node>, ConfigurationError> {
        let scope = match self.as_element() {
            Some(el) => Scope::Element(el),
            None => Scope::Empty,
        };
        select_in(&self.doc, scope, dialect, expression)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.doc.html, &other.doc.html) && self.kind == other.kind
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Element(_) => f.debug_tuple("Element").field(&self.extract()).finish(),
            NodeKind::Text(text) => f.debug_tuple("Text").field(text).finish(),
            NodeKind::Attribute { name, value } => {
                f.debug_tuple("Attribute").field(name).field(value).finish()
            }
        }
    }
}
