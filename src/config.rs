//! Fetch configuration

use serde::{Deserialize, Serialize};

/// Settings for [`crate::fetcher::Fetcher`]
///
/// Deserializable so it can live in a host's own config file; every
/// key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Global per-request timeout
    pub timeout_secs: u64,
    /// Read and write the cache backend around live fetches
    pub cache_fetch: bool,
    /// Expiry passed to the cache backend on write
    pub cache_expire: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("scrape_model/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            cache_fetch: false,
            cache_expire: None,
        }
    }
}

impl FetchConfig {
    /// Turn caching on with the given expiry
    pub fn cached(mut self, expire: Option<u64>) -> Self {
        self.cache_fetch = true;
        self.cache_expire = expire;
        self
    }
}
