//! Field values
//!
//! A field starts as the nodes its selector matched and is reshaped by
//! extraction options and processors into any of these variants.

use serde::{Serialize, Serializer};
use serde_json::json;

use crate::selector::Node;

/// Value of one field at any point of the pipeline
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Empty sentinel: `take_first` over zero matches
    #[default]
    Null,
    Text(String),
    Node(Node),
    List(Vec<Value>),
    /// A processor failed; the message says which and why
    Error(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Nodes of a `Node` or a list of nodes; non-node entries are skipped
    pub fn nodes(&self) -> Vec<&Node> {
        match self {
            Value::Node(n) => vec![n],
            Value::List(items) => items.iter().filter_map(Value::as_node).collect(),
            _ => vec![],
        }
    }

    /// Variant name, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Node(_) => "node",
            Value::List(_) => "list",
            Value::Error(_) => "error",
        }
    }

    /// JSON view: nodes become their extracted content
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Node(n) => serde_json::Value::String(n.extract()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Error(msg) => json!({ "error": msg }),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map(Value::Text).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}
