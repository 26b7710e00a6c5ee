//! Extraction engine
//!
//! One pass over a document:
//! 1. resolve every mapped field, in mapping order, into `raw`
//! 2. run each field's override routine (if any) into `final`
//! 3. run the model's post-parse hook once over `final`
//!
//! No field is resolved twice and overrides only start once every raw
//! value exists, so an override may read other fields' raw values.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, error};

use crate::error::{ConfigurationError, Error, ProcessorError};
use crate::fetcher::Fetcher;
use crate::field::FieldDescriptor;
use crate::mapping::MappingTable;
use crate::record::{Fields, Record};
use crate::selector::Document;
use crate::value::Value;

type OverrideFn = dyn Fn(&Value, &Fields) -> Result<Value, ProcessorError>;

/// Per-field override routines, keyed by field name
///
/// A routine gets the field's raw value and every raw value of the
/// pass, and returns the field's final value.
#[derive(Clone, Default)]
pub struct Overrides {
    routines: HashMap<String, Rc<OverrideFn>>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the routine for `field`, replacing any previous one
    pub fn on<F>(mut self, field: impl Into<String>, routine: F) -> Self
    where
        F: Fn(&Value, &Fields) -> Result<Value, ProcessorError> + 'static,
    {
        self.routines.insert(field.into(), Rc::new(routine));
        self
    }

    pub fn get(&self, field: &str) -> Option<&OverrideFn> {
        self.routines.get(field).map(|r| r.as_ref())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.routines.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}

impl std::fmt::Debug for Overrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.routines.keys().collect();
        names.sort();
        f.debug_tuple("Overrides").field(&names).finish()
    }
}

/// What the post-parse hook can see and change
pub struct PostParse<'a> {
    source: Option<&'a str>,
    document: &'a Document,
    raw: &'a Fields,
    values: &'a mut Fields,
}

impl<'a> PostParse<'a> {
    /// URL the document was fetched from, if any
    pub fn source(&self) -> Option<&str> {
        self.source
    }

    pub fn document(&self) -> &Document {
        self.document
    }

    pub fn raw(&self) -> &Fields {
        self.raw
    }

    pub fn values(&self) -> &Fields {
        self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Add a derived field or replace a final value
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name, value)
    }
}

/// A scrape target: its fields, override routines and post-parse hook
pub trait Model {
    /// Field descriptors declared in code
    fn fields(&self) -> Vec<FieldDescriptor> {
        Vec::new()
    }

    fn overrides(&self) -> Overrides {
        Overrides::new()
    }

    /// Runs once per pass, after every override
    fn post_parse(&self, _pass: &mut PostParse<'_>) {}
}

/// Mapping-only model
impl Model for () {}

/// Owns a model, its mapping table and the fetcher for its documents
#[derive(Debug)]
pub struct Extractor<M = ()> {
    model: M,
    mapping: MappingTable,
    fetcher: Fetcher,
    url: Option<String>,
}

impl Extractor<()> {
    /// Extractor driven by a mapping table alone
    pub fn from_mapping(mapping: MappingTable) -> Self {
        Self {
            model: (),
            mapping,
            fetcher: Fetcher::default(),
            url: None,
        }
    }
}

impl<M: Model> Extractor<M> {
    /// Collects the model's fields. Duplicate field
    /// names are a configuration error.
    pub fn new(model: M) -> Result<Self, ConfigurationError> {
        let mapping = MappingTable::from_fields(model.fields())?;
        Ok(Self {
            model,
            mapping,
            fetcher: Fetcher::default(),
            url: None,
        })
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut MappingTable {
        &mut self.mapping
    }

    /// Merge a JSON mapping document over the current fields
    pub fn load_mappings(&mut self, source: &str) -> Result<(), ConfigurationError> {
        self.mapping.load_from_str(source)
    }

    pub fn load_mappings_from_path(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigurationError> {
        self.mapping.load_from_path(path)
    }

    /// Fetch the configured URL through the fetcher (and its cache)
    pub fn fetch(&self) -> Result<Vec<u8>, Error> {
        let url = self.url.as_deref().ok_or(ConfigurationError::MissingUrl)?;
        Ok(self.fetcher.fetch(url)?)
    }

    /// Fetch the configured URL and run a pass over it
    pub fn parse(&self) -> Result<Record, Error> {
        let body = self.fetch()?;
        let document = Document::from_bytes(&body);
        Ok(self.parse_document(&document)?)
    }

    pub fn parse_html(&self, html: &str) -> Result<Record, ConfigurationError> {
        self.parse_document(&Document::parse(html))
    }

    /// Run one pass over a document
    pub fn parse_document(&self, document: &Document) -> Result<Record, ConfigurationError> {
        extract(document, &self.mapping, &self.model, self.url.as_deref())
    }
}

/// One extraction pass: every mapped field into `raw`, then overrides
/// into `final`, then the model's post-parse hook.
///
/// `source` is the URL the document came from, handed to the hook.
/// A malformed expression fails the whole pass.
pub fn extract<M: Model + ?Sized>(
    document: &Document,
    mapping: &MappingTable,
    model: &M,
    source: Option<&str>,
) -> Result<Record, ConfigurationError> {
    let mut raw = Fields::new();
    for field in mapping {
        let value = field.resolve(document)?;
        raw.insert(field.name(), value);
    }

    let overrides = model.overrides();
    let mut values = Fields::new();
    for (name, value) in raw.iter() {
        let final_value = match overrides.get(name) {
            Some(routine) if !value.is_error() => match routine(value, &raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("Exception occurred in override for {}: {}", name, e);
                    value.clone()
                }
            },
            _ => value.clone(),
        };
        values.insert(name, final_value);
    }

    for name in overrides.routines.keys() {
        if !mapping.contains(name) {
            debug!("Override for unmapped field {} never runs", name);
        }
    }

    let mut pass = PostParse {
        source,
        document,
        raw: &raw,
        values: &mut values,
    };
    model.post_parse(&mut pass);

    let names = mapping.names().map(String::from).collect();
    Ok(Record::new(names, raw, values))
}
