//! Document fetching with an optional cache in front
//!
//! Uses ureq (simple blocking HTTP). Caching is off unless the config
//! turns it on; when on, a hit skips the live request entirely.

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheBackend, NoCache};
use crate::config::FetchConfig;
use crate::error::FetchError;

/// Single blocking GET
pub trait Transport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

impl<F> Transport for F
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError>,
{
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self(url)
    }
}

/// HTTP transport over a ureq agent
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(config: &FetchConfig) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
                .user_agent(config.user_agent.as_str())
                .build(),
        );
        Self { agent }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = match self.agent.get(url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                })
            }
            Err(e) => {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.into_body().read_to_vec().map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Resolves a URL to document bytes
pub struct Fetcher {
    transport: Box<dyn Transport>,
    cache: Box<dyn CacheBackend>,
    config: FetchConfig,
}

impl Fetcher {
    /// HTTP transport, no cache backend
    pub fn new(config: FetchConfig) -> Self {
        Self {
            transport: Box::new(HttpTransport::new(&config)),
            cache: Box::new(NoCache),
            config,
        }
    }

    /// Backend used when `cache_fetch` is on
    pub fn with_cache(mut self, cache: impl CacheBackend + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch `identifier`, consulting the cache first if enabled.
    ///
    /// Cache failures never fail the fetch: a failed read is a miss, a
    /// failed write is logged and dropped.
    pub fn fetch(&self, identifier: &str) -> Result<Vec<u8>, FetchError> {
        validate_url(identifier)?;

        if self.config.cache_fetch {
            match self.cache.get(identifier) {
                Ok(Some(body)) => {
                    debug!("Cache hit for: {}", identifier);
                    return Ok(body);
                }
                Ok(None) => debug!("Cache miss for: {}", identifier),
                Err(e) => warn!("Cache read failed for {}: {}", identifier, e),
            }
        }

        debug!("Fetching: {}", identifier);
        let body = self.transport.get(identifier)?;

        if self.config.cache_fetch {
            if let Err(e) = self.cache.set(identifier, &body, self.config.cache_expire) {
                warn!("Cache write failed for {}: {}", identifier, e);
            }
        }

        Ok(body)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(FetchConfig::default())
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher").field("config", &self.config).finish()
    }
}

fn validate_url(identifier: &str) -> Result<(), FetchError> {
    let parsed = Url::parse(identifier).map_err(|e| FetchError::InvalidUrl {
        url: identifier.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::InvalidUrl {
            url: identifier.to_string(),
            reason: format!("unsupported scheme {other}"),
        }),
    }
}
