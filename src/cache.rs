//! Cache backends for fetched documents
//!
//! Keys are fetch URLs, values are raw response bodies. A backend may
//! drop or expire entries at will; callers treat that as a miss.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::error;

use crate::error::CacheError;

/// Narrow get/set contract in front of document fetch
pub trait CacheBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// `expire` is in seconds; `None` keeps the entry until evicted
    fn set(&self, key: &str, value: &[u8], expire: Option<u64>) -> Result<(), CacheError>;
}

impl<C: CacheBackend + ?Sized> CacheBackend for Box<C> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8], expire: Option<u64>) -> Result<(), CacheError> {
        (**self).set(key, value, expire)
    }
}

impl<C: CacheBackend + ?Sized> CacheBackend for std::rc::Rc<C> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8], expire: Option<u64>) -> Result<(), CacheError> {
        (**self).set(key, value, expire)
    }
}

/// Always misses, never stores
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl CacheBackend for NoCache {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &[u8], _expire: Option<u64>) -> Result<(), CacheError> {
        Ok(())
    }
}

#[derive(Debug)]
struct CachedBody {
    body: Vec<u8>,
    expires_at: Option<Instant>,
}

/// In-process cache with per-entry expiry
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CachedBody>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        if entry.expires_at.is_some_and(|at| Instant::now() >= at) {
            return Ok(None);
        }
        Ok(Some(entry.body.clone()))
    }

    fn set(&self, key: &str, value: &[u8], expire: Option<u64>) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        // Purge on write so expired bodies don't pile up
        let now = Instant::now();
        entries.retain(|_, e| e.expires_at.map_or(true, |at| at > now));
        entries.insert(
            key.to_string(),
            CachedBody {
                body: value.to_vec(),
                expires_at: expire.map(|secs| now + Duration::from_secs(secs)),
            },
        );
        Ok(())
    }
}

/// Redis-backed cache
///
/// Connection failures are logged and reported as errors; the fetcher
/// turns them into a miss / an ignored write.
#[derive(Debug, Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    /// `redis_url` like `redis://127.0.0.1:6379/0`. Does not connect yet.
    pub fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    fn connection(&self) -> Result<redis::Connection, CacheError> {
        self.client.get_connection().map_err(|e| {
            error!("Cant connect to Redis server: {}", e);
            CacheError::from(e)
        })
    }
}

impl CacheBackend for RedisCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut con = self.connection()?;
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query(&mut con)?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8], expire: Option<u64>) -> Result<(), CacheError> {
        let mut con = self.connection()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(secs) = expire {
            cmd.arg("EX").arg(secs);
        }
        cmd.query::<()>(&mut con)?;
        Ok(())
    }
}
