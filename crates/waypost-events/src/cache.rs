//! Query cache in front of the geospatial event endpoints.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use waypost_protocol::{Clock, EventQuery, EventsMeta, MapEvent, MapEventsResponse, UserId};

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry answers queries. Default: 30 seconds.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Whose view of the map a query is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorScope {
    /// Anonymous, public events.
    Public,
    /// Events as seen by one signed-in user.
    User(UserId),
}

impl fmt::Display for ActorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::User(id) => write!(f, "user_{id}"),
        }
    }
}

/// `"{scope}_{lat}_{lon}_{radius_km}_{categories}"` with the categories
/// sorted and comma-joined.
///
/// Coordinates are concatenated as-is: two queries a micro-degree apart
/// are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(scope: ActorScope, query: &EventQuery) -> Self {
        let mut categories = query.categories.clone();
        categories.sort_unstable();
        let categories = categories
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self(format!(
            "{scope}_{}_{}_{}_{categories}",
            query.lat, query.lon, query.radius_km
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// EventCache
// ---------------------------------------------------------------------------

/// One cached response. `data` is shared, so handing an entry out does
/// not copy the events.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Arc<Vec<MapEvent>>,
    pub meta: EventsMeta,
    /// When the response was stored, Unix milliseconds.
    pub stored_at_ms: i64,
}

/// TTL cache of event query responses.
///
/// Entries are replaced whole, never merged, and never swept: a stale
/// entry just stops answering until it is overwritten or the cache is
/// cleared.
pub struct EventCache {
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl EventCache {
    pub fn new(clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        Self {
            clock,
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The entry for `key`, if it is younger than the TTL.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now_ms();
        let ttl_ms = i64::try_from(self.config.ttl.as_millis()).unwrap_or(i64::MAX);
        self.entries()
            .get(key)
            .filter(|entry| now.saturating_sub(entry.stored_at_ms) < ttl_ms)
            .cloned()
    }

    /// Stores a response under `key`, replacing whatever was there.
    pub fn put(&self, key: CacheKey, data: Vec<MapEvent>, meta: EventsMeta) -> CacheEntry {
        let entry = CacheEntry {
            data: Arc::new(data),
            meta,
            stored_at_ms: self.clock.now_ms(),
        };
        self.entries().insert(key, entry.clone());
        entry
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Answers `query` for `scope` from the cache, or through `loader`.
    ///
    /// `loader` runs on a miss, an expired entry, or when `force_refresh`
    /// is set. A successful load replaces the entry; a failed one leaves
    /// it untouched and returns the loader's error.
    pub async fn fetch<F, Fut, E>(
        &self,
        query: &EventQuery,
        scope: ActorScope,
        force_refresh: bool,
        loader: F,
    ) -> Result<CacheEntry, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MapEventsResponse, E>>,
    {
        let key = CacheKey::new(scope, query);
        if !force_refresh {
            if let Some(entry) = self.get(&key) {
                tracing::debug!(%key, "event cache hit");
                return Ok(entry);
            }
        }

        tracing::debug!(%key, force_refresh, "event cache miss");
        let response = loader().await?;
        Ok(self.put(key, response.data, response.meta))
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
