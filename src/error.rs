//! Error types
//!
//! One enum per concern. Fetch and configuration errors abort the call
//! that raised them, processor errors stay local to one field and
//! population errors only abort the populate call.

use thiserror::Error;

/// Failure to retrieve a document
#[derive(Debug, Error)]
pub enum FetchError {
    /// Identifier is not an absolute http(s) URL
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Transport-level failure (DNS, TLS, timeout, connection reset)
    #[error("failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },
    /// Server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    /// Body could not be read
    #[error("failed to read {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Programmer error in a mapping document or selector expression
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid {dialect} expression `{expression}`: {reason}")]
    Selector {
        dialect: &'static str,
        expression: String,
        reason: String,
    },
    #[error("malformed mapping document: {0}")]
    Document(String),
    #[error("field `{field}`: {reason}")]
    Field { field: String, reason: String },
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    #[error("failed to read mapping document: {0}")]
    Io(#[from] std::io::Error),
    #[error("no URL to fetch")]
    MissingUrl,
}

/// A processor or override routine rejected its input
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProcessorError {
    #[error("{processor}: cannot process {found}")]
    Unsupported {
        processor: &'static str,
        found: &'static str,
    },
    #[error("{0}")]
    Failed(String),
}

impl ProcessorError {
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// `populate` was asked for a field the record does not have
#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("target rejected field `{field}`: {reason}")]
    Rejected { field: String, reason: String },
}

/// Cache backend failure. Never fatal to a fetch.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("cache lock poisoned")]
    Poisoned,
}

/// Crate-level error for calls that span several concerns
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Population(#[from] PopulationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
