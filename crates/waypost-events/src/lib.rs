//! Event queries for the Waypost map.
//!
//! - [`EventCache`]: a short-lived cache keyed by actor scope and query
//!   parameters, in front of the geospatial endpoints.
//! - [`EventFeed`]: the owner of what the map currently shows (events,
//!   meta, error, loading) built on the cache and the session.
//!
//! # How it fits in the stack
//!
//! ```text
//! App (above)  ← drives fetches as the map moves, renders FeedState
//!     ↕
//! Events Layer (this crate)  ← caching, scoping and feed state
//!     ↕
//! Session / Api Layers (below)  ← bearer session, HTTP calls
//! ```

mod cache;
mod error;
mod feed;

pub use cache::{ActorScope, CacheConfig, CacheEntry, CacheKey, EventCache};
pub use error::EventsError;
pub use feed::{CancelToken, EventFeed, FeedState};
