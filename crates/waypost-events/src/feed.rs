//! The map's event feed: what is shown, and how it got there.
//!
//! [`EventFeed`] owns a [`FeedState`] published through a
//! `tokio::sync::watch` channel. Every fetch goes through the
//! [`EventCache`]; the feed decides the scope, whether a session is
//! required, and what the state looks like afterwards.
//!
//! # Cancellation
//!
//! Each fetch takes a [`CancelToken`] owned by whoever asked (typically a
//! view). Once that owner cancels, a fetch still in flight applies nothing
//! to the state when it resolves and reports [`EventsError::Cancelled`].
//!
//! # Overlapping fetches
//!
//! Fetches are not coalesced. Two in-flight fetches both apply their
//! results; whichever resolves last is what the state shows.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use waypost_api::{ApiClient, ApiError};
use waypost_protocol::{Activity, Clock, DeepLinkConfig, EventQuery, EventsMeta, MapEvent, activities_from};
use waypost_session::SessionManager;

use crate::{ActorScope, CacheConfig, CacheEntry, EventCache, EventsError};

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// A "torn down" flag shared between a request's owner and the request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// FeedState
// ---------------------------------------------------------------------------

/// Snapshot of what the map shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub events: Arc<Vec<MapEvent>>,
    pub meta: Option<EventsMeta>,
    pub error: Option<String>,
    pub loading: bool,
    /// When `events` was fetched, Unix milliseconds. For a cache hit this
    /// is when the cached response was stored.
    pub last_updated_ms: Option<i64>,
}

impl FeedState {
    /// The events projected for display.
    pub fn activities(&self, links: &DeepLinkConfig) -> Vec<Activity> {
        activities_from(&self.events, links)
    }
}

// ---------------------------------------------------------------------------
// EventFeed
// ---------------------------------------------------------------------------

pub struct EventFeed<A: ApiClient> {
    session: Arc<SessionManager<A>>,
    cache: EventCache,
    state: watch::Sender<FeedState>,
}

impl<A: ApiClient> EventFeed<A> {
    pub fn new(session: Arc<SessionManager<A>>, clock: Arc<dyn Clock>, config: CacheConfig) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            session,
            cache: EventCache::new(clock, config),
            state,
        }
    }

    pub fn cache(&self) -> &EventCache {
        &self.cache
    }

    /// Current snapshot.
    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// A receiver that is notified on every state change.
    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Public events around the query point.
    ///
    /// Served from the cache unless `force_refresh` is set or the entry
    /// expired. On failure the visible events are cleared, the error is
    /// set, and any cache entry is left as it was.
    pub async fn fetch_public(
        &self,
        query: &EventQuery,
        force_refresh: bool,
        cancel: &CancelToken,
    ) -> Result<Arc<Vec<MapEvent>>, EventsError> {
        let api = self.session.api();
        let result = self
            .cache
            .fetch(query, ActorScope::Public, force_refresh, || {
                self.begin_loading(cancel);
                api.map_events(query)
            })
            .await;
        self.finish(result, cancel)
    }

    /// Events as seen by the signed-in user.
    ///
    /// Requires a live session; without one the error is set to
    /// "User not authenticated" and nothing is fetched. A backend answer
    /// of "Authentication failed" also logs the user out.
    pub async fn fetch_user(
        &self,
        query: &EventQuery,
        force_refresh: bool,
        cancel: &CancelToken,
    ) -> Result<Arc<Vec<MapEvent>>, EventsError> {
        let Some(user) = self.session.user() else {
            if !cancel.is_cancelled() {
                self.state.send_modify(|state| {
                    state.error = Some(EventsError::NotAuthenticated.to_string());
                });
            }
            return Err(EventsError::NotAuthenticated);
        };

        let api = self.session.api();
        let result = self
            .cache
            .fetch(query, ActorScope::User(user.id), force_refresh, || {
                self.begin_loading(cancel);
                api.user_map_events(user.id, query)
            })
            .await;

        if let Err(e) = &result {
            if e.is_auth_failure() && !cancel.is_cancelled() {
                tracing::warn!(user_id = %user.id, "backend rejected the session, logging out");
                self.session.logout();
            }
        }
        self.finish(result, cancel)
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    /// Clears the visible events and meta, and empties the cache.
    pub fn clear(&self) {
        self.cache.clear();
        self.state.send_modify(|state| {
            state.events = Arc::default();
            state.meta = None;
        });
    }

    fn begin_loading(&self, cancel: &CancelToken) {
        if cancel.is_cancelled() {
            return;
        }
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn finish(
        &self,
        result: Result<CacheEntry, ApiError>,
        cancel: &CancelToken,
    ) -> Result<Arc<Vec<MapEvent>>, EventsError> {
        if cancel.is_cancelled() {
            tracing::debug!("dropping result of cancelled fetch");
            return Err(EventsError::Cancelled);
        }

        match result {
            Ok(entry) => {
                self.state.send_modify(|state| {
                    state.events = Arc::clone(&entry.data);
                    state.meta = Some(entry.meta.clone());
                    state.last_updated_ms = Some(entry.stored_at_ms);
                    state.loading = false;
                });
                Ok(entry.data)
            }
            Err(e) => {
                self.state.send_modify(|state| {
                    state.events = Arc::default();
                    state.meta = None;
                    state.error = Some(e.to_string());
                    state.loading = false;
                });
                Err(EventsError::Api(e))
            }
        }
    }
}
