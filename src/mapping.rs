//! Mapping tables
//!
//! Ordered, unique-by-name set of field descriptors. Tables come from
//! code, from a JSON mapping document, or both:
//!
//! ```json
//! {
//!     "name": {"css": "#section_0::text", "take_first": true, "auto_extract": true},
//!     "phone": {"xpath": "//phone/text()", "processors": ["strip"]},
//!     "location": ".location"
//! }
//! ```
//!
//! A bare string is a CSS expression.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Map;

use crate::error::ConfigurationError;
use crate::field::FieldDescriptor;
use crate::processors;
use crate::selector::Dialect;

#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    fields: Vec<FieldDescriptor>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from code-declared fields. Names must be unique.
    pub fn from_fields(
        fields: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Result<Self, ConfigurationError> {
        let mut table = Self::new();
        for field in fields {
            if table.contains(field.name()) {
                return Err(ConfigurationError::DuplicateField(field.name().to_string()));
            }
            table.fields.push(field);
        }
        Ok(table)
    }

    /// Parse a mapping document into a fresh table
    pub fn from_document(source: &str) -> Result<Self, ConfigurationError> {
        let entries: Map<String, serde_json::Value> = serde_json::from_str(source)
            .map_err(|e| ConfigurationError::Document(e.to_string()))?;

        let mut table = Self::new();
        for (name, entry) in entries {
            let field = parse_entry(&name, entry)?;
            table.insert(field);
        }
        Ok(table)
    }

    /// Insert or replace by name. A replaced field keeps its position.
    pub fn insert(&mut self, field: FieldDescriptor) -> Option<FieldDescriptor> {
        match self.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => Some(std::mem::replace(existing, field)),
            None => {
                self.fields.push(field);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldDescriptor> {
        let pos = self.fields.iter().position(|f| f.name() == name)?;
        Some(self.fields.remove(pos))
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldDescriptor::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    /// New table with `other`'s fields layered over this one's
    pub fn merge(mut self, other: MappingTable) -> MappingTable {
        for field in other.fields {
            self.insert(field);
        }
        self
    }

    /// Merge a mapping document into this table; entries in the
    /// document replace same-named fields. Left unchanged on error.
    pub fn load_from_str(&mut self, source: &str) -> Result<(), ConfigurationError> {
        let loaded = Self::from_document(source)?;
        *self = std::mem::take(self).merge(loaded);
        Ok(())
    }

    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigurationError> {
        let source = fs::read_to_string(path)?;
        self.load_from_str(&source)
    }

    pub fn load_from_reader(&mut self, mut reader: impl Read) -> Result<(), ConfigurationError> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        self.load_from_str(&source)
    }
}

impl<'a> IntoIterator for &'a MappingTable {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// One entry of a mapping document
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
    Css(String),
    Full(EntrySpec),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntrySpec {
    #[serde(default)]
    css: Option<String>,
    #[serde(default)]
    xpath: Option<String>,
    #[serde(default)]
    auto_extract: bool,
    #[serde(default)]
    take_first: bool,
    #[serde(default)]
    processors: Vec<String>,
}

fn parse_entry(name: &str, entry: serde_json::Value) -> Result<FieldDescriptor, ConfigurationError> {
    let field_error = |reason: String| ConfigurationError::Field {
        field: name.to_string(),
        reason,
    };

    // Untagged enums only say "did not match any variant", so give the
    // object form its own error message.
    let entry = match entry {
        serde_json::Value::Object(_) => {
            Entry::Full(serde_json::from_value(entry).map_err(|e| field_error(e.to_string()))?)
        }
        other => serde_json::from_value::<Entry>(other).map_err(|_| {
            field_error("expected a CSS string or an object with a `css` or `xpath` key".to_string())
        })?,
    };

    let spec = match entry {
        Entry::Css(expression) => {
            return Ok(FieldDescriptor::css(name, expression));
        }
        Entry::Full(spec) => spec,
    };

    let (dialect, expression) = match (spec.css, spec.xpath) {
        (Some(css), None) => (Dialect::Css, css),
        (None, Some(xpath)) => (Dialect::XPath, xpath),
        (Some(_), Some(_)) => return Err(field_error("both `css` and `xpath` given".to_string())),
        (None, None) => return Err(field_error("missing `css` or `xpath` expression".to_string())),
    };

    let chain = spec
        .processors
        .iter()
        .map(|p| processors::by_name(p).ok_or_else(|| field_error(format!("unknown processor `{p}`"))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FieldDescriptor::new(name, dialect, expression)
        .auto_extract(spec.auto_extract)
        .take_first(spec.take_first)
        .processors(chain))
}
