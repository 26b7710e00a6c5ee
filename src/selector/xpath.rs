//! Structural-path (XPath subset) selection
//!
//! Supported:
//! - absolute (`/`, `//`) and relative location paths
//! - steps: `name`, `*`, `.`, `..`, `text()`, `@name`, `@*`
//! - predicates: `[n]`, `[last()]`, `[@a]`, `[@a="v"]`,
//!   `[contains(@a, "v")]`, `[text()="v"]`, `[contains(text(), "v")]`
//!
//! Anything else is rejected as a configuration error.

use std::collections::HashMap;

use ego_tree::NodeId;
use scraper::ElementRef;

use super::css::direct_text;
use super::{Document, Node, Scope};
use crate::error::ConfigurationError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    /// `//`: descendant-or-self, then child
    Descendant,
}

#[derive(Debug, Clone, PartialEq)]
enum Test {
    /// `None` is `*`
    Element(Option<String>),
    SelfNode,
    Parent,
    Text,
    /// `None` is `@*`
    Attribute(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Position(usize),
    Last,
    HasAttr(String),
    AttrEquals(String, String),
    AttrContains(String, String),
    TextEquals(String),
    TextContains(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: Test,
    predicates: Vec<Predicate>,
}

#[derive(Debug, PartialEq)]
struct Path {
    absolute: bool,
    steps: Vec<Step>,
}

pub(super) fn select(
    doc: &Document,
    scope: Scope<'_>,
    expression: &str,
) -> Result<Vec<Node>, ConfigurationError> {
    let path = Parser::new(expression).path()?;

    let start = match (scope, path.absolute) {
        (Scope::Empty, _) => return Ok(vec![]),
        (Scope::Document, _) | (_, true) => Item::Root,
        (Scope::Element(el), false) => Item::Element(el),
    };

    // Pre-order position of every tree node, for document order
    let order: HashMap<NodeId, usize> = doc
        .html
        .tree
        .root()
        .descendants()
        .enumerate()
        .map(|(i, node)| (node.id(), i))
        .collect();

    let mut current = vec![start];
    for step in &path.steps {
        let mut next: Vec<Item<'_>> = Vec::new();
        for item in &current {
            let contexts = match step.axis {
                Axis::Child => vec![item.clone()],
                Axis::Descendant => self_and_descendants(doc, item),
            };
            for context in &contexts {
                let candidates = apply_test(doc, context, &step.test);
                next.extend(apply_predicates(candidates, &step.predicates));
            }
        }
        next.sort_by_key(|item| item.position(&order));
        next.dedup_by_key(|item| item.position(&order));
        current = next;
    }

    Ok(current
        .into_iter()
        .map(|item| item.into_node(doc))
        .collect())
}

#[derive(Clone)]
enum Item<'a> {
    Root,
    Element(ElementRef<'a>),
    Text {
        id: NodeId,
        parent: ElementRef<'a>,
        text: String,
    },
    Attr {
        owner: ElementRef<'a>,
        index: usize,
        name: String,
        value: String,
    },
}

impl<'a> Item<'a> {
    /// Document order key; attributes sort after their owner and
    /// before its children
    fn position(&self, order: &HashMap<NodeId, usize>) -> (usize, usize) {
        let at = |id: NodeId| order.get(&id).copied().unwrap_or(usize::MAX);
        match self {
            Item::Root => (0, 0),
            Item::Element(el) => (at(el.id()), 0),
            Item::Text { id, .. } => (at(*id), 0),
            Item::Attr { owner, index, .. } => (at(owner.id()), index + 1),
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Item::Element(el) => el.value().attr(name),
            _ => None,
        }
    }

    fn texts(&self) -> Vec<String> {
        match self {
            Item::Element(el) => direct_text(*el),
            Item::Text { text, .. } => vec![text.clone()],
            _ => vec![],
        }
    }

    fn into_node(self, doc: &Document) -> Node {
        match self {
            Item::Root => Node::element(doc, doc.html.root_element()),
            Item::Element(el) => Node::element(doc, el),
            Item::Text { text, .. } => Node::text(doc, text),
            Item::Attr { name, value, .. } => Node::attribute(doc, &name, &value),
        }
    }
}

fn self_and_descendants<'a>(doc: &'a Document, item: &Item<'a>) -> Vec<Item<'a>> {
    match item {
        Item::Root => std::iter::once(Item::Root)
            .chain(
                doc.html
                    .root_element()
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .map(Item::Element),
            )
            .collect(),
        Item::Element(el) => el
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(Item::Element)
            .collect(),
        other => vec![other.clone()],
    }
}

fn apply_test<'a>(doc: &'a Document, context: &Item<'a>, test: &Test) -> Vec<Item<'a>> {
    match test {
        Test::Element(name) => {
            let children: Vec<ElementRef<'a>> = match context {
                Item::Root => vec![doc.html.root_element()],
                Item::Element(el) => el.children().filter_map(ElementRef::wrap).collect(),
                _ => vec![],
            };
            children
                .into_iter()
                .filter(|el| match name {
                    Some(name) => el.value().name().eq_ignore_ascii_case(name),
                    None => true,
                })
                .map(Item::Element)
                .collect()
        }
        Test::SelfNode => vec![context.clone()],
        Test::Parent => match context {
            Item::Root => vec![],
            Item::Element(el) => match el.parent() {
                Some(parent) => match ElementRef::wrap(parent) {
                    Some(parent) => vec![Item::Element(parent)],
                    None => vec![Item::Root],
                },
                None => vec![],
            },
            Item::Text { parent, .. } => vec![Item::Element(*parent)],
            Item::Attr { owner, .. } => vec![Item::Element(*owner)],
        },
        Test::Text => match context {
            Item::Element(el) => el
                .children()
                .filter_map(|child| {
                    child.value().as_text().map(|text| {
                        let text: &str = text;
                        Item::Text {
                            id: child.id(),
                            parent: *el,
                            text: text.to_string(),
                        }
                    })
                })
                .collect(),
            _ => vec![],
        },
        Test::Attribute(name) => match context {
            Item::Element(el) => el
                .value()
                .attrs()
                .enumerate()
                .filter(|(_, (attr, _))| match name {
                    Some(name) => attr.eq_ignore_ascii_case(name),
                    None => true,
                })
                .map(|(index, (attr, value))| Item::Attr {
                    owner: *el,
                    index,
                    name: attr.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            _ => vec![],
        },
    }
}

fn apply_predicates<'a>(mut items: Vec<Item<'a>>, predicates: &[Predicate]) -> Vec<Item<'a>> {
    for predicate in predicates {
        let len = items.len();
        items = items
            .into_iter()
            .enumerate()
            .filter(|(i, item)| predicate.matches(item, i + 1, len))
            .map(|(_, item)| item)
            .collect();
    }
    items
}

impl Predicate {
    fn matches(&self, item: &Item<'_>, position: usize, len: usize) -> bool {
        match self {
            Predicate::Position(n) => position == *n,
            Predicate::Last => position == len,
            Predicate::HasAttr(name) => item.attr(name).is_some(),
            Predicate::AttrEquals(name, value) => item.attr(name) == Some(value.as_str()),
            Predicate::AttrContains(name, value) => {
                item.attr(name).is_some_and(|attr| attr.contains(value.as_str()))
            }
            Predicate::TextEquals(value) => item.texts().iter().any(|t| t == value),
            Predicate::TextContains(value) => {
                item.texts().iter().any(|t| t.contains(value.as_str()))
            }
        }
    }
}

/// Recursive-descent parser over the expression
struct Parser<'a> {
    src: &'a str,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            rest: src.trim(),
        }
    }

    fn path(mut self) -> Result<Path, ConfigurationError> {
        if self.rest.is_empty() {
            return Err(self.error("empty expression"));
        }

        let mut absolute = false;
        let mut axis = Axis::Child;
        if self.eat("//") {
            absolute = true;
            axis = Axis::Descendant;
        } else if self.eat("/") {
            absolute = true;
        }

        let mut steps = Vec::new();
        loop {
            steps.push(self.step(axis)?);
            self.skip_ws();
            if self.rest.is_empty() {
                break;
            }
            if self.eat("//") {
                axis = Axis::Descendant;
            } else if self.eat("/") {
                axis = Axis::Child;
            } else {
                return Err(self.unexpected());
            }
        }

        Ok(Path { absolute, steps })
    }

    fn step(&mut self, axis: Axis) -> Result<Step, ConfigurationError> {
        self.skip_ws();
        let test = if self.eat("..") {
            Test::Parent
        } else if self.eat(".") {
            Test::SelfNode
        } else if self.eat("@") {
            if self.eat("*") {
                Test::Attribute(None)
            } else {
                Test::Attribute(Some(self.name()?.to_ascii_lowercase()))
            }
        } else if self.eat("*") {
            Test::Element(None)
        } else {
            let name = self.name()?;
            if self.rest.starts_with("::") {
                return Err(self.error("axis specifiers are not supported"));
            }
            self.skip_ws();
            if self.eat("(") {
                self.skip_ws();
                if name == "text" && self.eat(")") {
                    Test::Text
                } else {
                    return Err(self.error(&format!("unsupported function {name}()")));
                }
            } else {
                Test::Element(Some(name.to_ascii_lowercase()))
            }
        };

        let mut predicates = Vec::new();
        loop {
            self.skip_ws();
            if !self.eat("[") {
                break;
            }
            predicates.push(self.predicate()?);
            self.skip_ws();
            self.expect("]")?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate, ConfigurationError> {
        self.skip_ws();

        let digits = self.rest.len() - self.rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits > 0 {
            let (number, rest) = self.rest.split_at(digits);
            self.rest = rest;
            return match number.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Predicate::Position(n)),
                _ => Err(self.error("positions start at 1")),
            };
        }

        if self.eat("last()") {
            return Ok(Predicate::Last);
        }

        if self.eat("@") {
            let name = self.name()?.to_ascii_lowercase();
            self.skip_ws();
            if self.eat("=") {
                let value = self.literal()?;
                return Ok(Predicate::AttrEquals(name, value));
            }
            return Ok(Predicate::HasAttr(name));
        }

        if self.eat("text()") {
            self.skip_ws();
            self.expect("=")?;
            let value = self.literal()?;
            return Ok(Predicate::TextEquals(value));
        }

        if self.eat("contains(") {
            self.skip_ws();
            let attr = if self.eat("text()") {
                None
            } else {
                self.expect("@")?;
                Some(self.name()?.to_ascii_lowercase())
            };
            self.skip_ws();
            self.expect(",")?;
            let value = self.literal()?;
            self.skip_ws();
            self.expect(")")?;
            return Ok(match attr {
                Some(attr) => Predicate::AttrContains(attr, value),
                None => Predicate::TextContains(value),
            });
        }

        Err(self.error("unsupported predicate"))
    }

    fn name(&mut self) -> Result<&'a str, ConfigurationError> {
        let mut end = 0;
        for (i, c) in self.rest.char_indices() {
            let valid = if i == 0 {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_' || c == '-'
                    || (c == ':' && !self.rest[i..].starts_with("::"))
            };
            if !valid {
                break;
            }
            end = i + c.len_utf8();
        }
        if end == 0 {
            return Err(self.unexpected());
        }
        let (name, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(name)
    }

    fn literal(&mut self) -> Result<String, ConfigurationError> {
        self.skip_ws();
        let rest = self.rest;
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted string")),
        };
        let body = &rest[1..];
        let end = body
            .find(quote)
            .ok_or_else(|| self.error("unterminated string"))?;
        let value = body[..end].to_string();
        self.rest = &body[end + 1..];
        Ok(value)
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), ConfigurationError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected `{token}`")))
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn unexpected(&self) -> ConfigurationError {
        match self.rest.chars().next() {
            Some(c) => self.error(&format!("unexpected `{c}`")),
            None => self.error("unexpected end of expression"),
        }
    }

    fn error(&self, reason: &str) -> ConfigurationError {
        ConfigurationError::Selector {
            dialect: "xpath",
            expression: self.src.to_string(),
            reason: reason.to_string(),
        }
    }
}
