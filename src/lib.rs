//! Declarative field extraction from HTML documents
//!
//! A model names its fields and says where each one lives in a page:
//! - field descriptors: CSS or XPath expression, extraction options and
//!   a processor chain
//! - mapping tables: descriptors declared in code or loaded from JSON
//! - overrides and a post-parse hook for anything an expression can't say
//!
//! An [`Extractor`] fetches the page (optionally through a cache), runs
//! one pass over it and returns a [`Record`] with raw and final values,
//! which can then be copied onto any [`Populate`] target.
//!
//! ```no_run
//! use scrape_model::{Extractor, FieldDescriptor, MappingTable, processors};
//!
//! let mapping = MappingTable::from_fields([
//!     FieldDescriptor::css("name", "h1#section_0::text")
//!         .auto_extract(true)
//!         .take_first(true)
//!         .processor(processors::strip()),
//! ])?;
//! let record = Extractor::from_mapping(mapping)
//!     .with_url("http://en.m.wikipedia.org/wiki/Guido_van_Rossum")
//!     .parse()?;
//! println!("{}", record.to_json());
//! # Ok::<(), scrape_model::Error>(())
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod ffi;
pub mod field;
pub mod mapping;
pub mod populate;
pub mod processors;
pub mod record;
pub mod selector;
pub mod value;

pub use cache::{CacheBackend, MemoryCache, NoCache, RedisCache};
pub use config::FetchConfig;
pub use engine::{extract, Extractor, Model, Overrides, PostParse};
pub use error::{
    CacheError, ConfigurationError, Error, FetchError, PopulationError, ProcessorError, Result,
};
pub use fetcher::{Fetcher, HttpTransport, Transport};
pub use ffi::*;
pub use field::FieldDescriptor;
pub use mapping::MappingTable;
pub use populate::Populate;
pub use processors::Processor;
pub use record::{Fields, Record};
pub use selector::{Dialect, Document, Node};
pub use value::Value;
