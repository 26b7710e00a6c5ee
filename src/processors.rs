//! Processor chains
//!
//! A processor takes the current value of a field and returns its
//! replacement. Chains run left to right and stop at the first failure.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::error::ProcessorError;
use crate::value::Value;

type ProcessorFn = dyn Fn(Value) -> Result<Value, ProcessorError>;

/// Named `value -> value` function
#[derive(Clone)]
pub struct Processor {
    name: Cow<'static, str>,
    func: Rc<ProcessorFn>,
}

impl Processor {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ProcessorError> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// Processor that cannot fail
    pub fn infallible<F>(name: impl Into<Cow<'static, str>>, func: F) -> Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        Self::new(name, move |value| Ok(func(value)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, value: Value) -> Result<Value, ProcessorError> {
        (self.func)(value)
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Processor({})", self.name)
    }
}

/// Run a chain over a value. The error names the failing processor.
pub fn apply_chain(chain: &[Processor], value: Value) -> Result<Value, (String, ProcessorError)> {
    chain.iter().try_fold(value, |value, processor| {
        processor
            .apply(value)
            .map_err(|e| (processor.name().to_string(), e))
    })
}

/// Look up a built-in processor by the name used in mapping documents
pub fn by_name(name: &str) -> Option<Processor> {
    let processor = match name {
        "strip" | "trim" => strip(),
        "uppercase" => uppercase(),
        "lowercase" => lowercase(),
        "collapse_whitespace" => collapse_whitespace(),
        "parse_price" => parse_price(),
        "join" => join(),
        "first" => first(),
        _ => return None,
    };
    Some(processor)
}

/// Names accepted by [`by_name`]
pub const BUILTIN_NAMES: &[&str] = &[
    "strip",
    "trim",
    "uppercase",
    "lowercase",
    "collapse_whitespace",
    "parse_price",
    "join",
    "first",
];

pub fn strip() -> Processor {
    text_processor("strip", |s| Value::Text(s.trim().to_string()))
}

pub fn uppercase() -> Processor {
    text_processor("uppercase", |s| Value::Text(s.to_uppercase()))
}

pub fn lowercase() -> Processor {
    text_processor("lowercase", |s| Value::Text(s.to_lowercase()))
}

pub fn collapse_whitespace() -> Processor {
    text_processor("collapse_whitespace", |s| {
        Value::Text(s.split_whitespace().collect::<Vec<_>>().join(" "))
    })
}

/// Numeric part of a price string like "€12.99" or "12,99 €"
pub fn parse_price() -> Processor {
    text_processor("parse_price", |s| {
        let mut result = String::new();
        let mut has_decimal = false;
        for c in s.chars() {
            if c.is_ascii_digit() {
                result.push(c);
            } else if (c == '.' || c == ',') && !has_decimal {
                result.push('.');
                has_decimal = true;
            }
        }
        if result.trim_matches('.').is_empty() {
            Value::Null
        } else {
            Value::Text(result)
        }
    })
}

/// Join a list of strings with a single space
pub fn join() -> Processor {
    Processor::new("join", |value| match value {
        Value::List(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Text(s) => parts.push(s),
                    Value::Null => {}
                    other => {
                        return Err(ProcessorError::Unsupported {
                            processor: "join",
                            found: other.kind(),
                        })
                    }
                }
            }
            Ok(Value::Text(parts.join(" ")))
        }
        other => Ok(other),
    })
}

/// First element of a list, or `Null` if it is empty
pub fn first() -> Processor {
    Processor::infallible("first", |value| match value {
        Value::List(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    })
}

// Apply `f` to text, mapping over lists and passing null through
fn text_processor(name: &'static str, f: fn(&str) -> Value) -> Processor {
    Processor::new(name, move |value| map_text(name, f, value))
}

fn map_text(name: &'static str, f: fn(&str) -> Value, value: Value) -> Result<Value, ProcessorError> {
    match value {
        Value::Text(s) => Ok(f(&s)),
        Value::List(items) => items
            .into_iter()
            .map(|item| map_text(name, f, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Null | Value::Error(_) => Ok(value),
        Value::Node(_) => Err(ProcessorError::Unsupported {
            processor: name,
            found: "node",
        }),
    }
}
