//! Backend HTTP surface for Waypost.
//!
//! Provides the [`ApiClient`] trait that abstracts over how the backend is
//! reached, and [`HttpApi`], the `reqwest` implementation.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpApi`] via `reqwest`
//!
//! # Endpoints
//!
//! | Call | Request |
//! |---|---|
//! | [`create_session`](ApiClient::create_session) | `GET /auth/session?session=<launch>` |
//! | [`map_events`](ApiClient::map_events) | `GET /map/events?lat=&lon=&radius_km=&limit=&offset=&categories=…` |
//! | [`user_map_events`](ApiClient::user_map_events) | `GET /map/users/{id}/events?…` (bearer) |
//! | [`health`](ApiClient::health) | `GET /health` |

#![allow(async_fn_in_trait)]

mod config;
mod error;
#[cfg(feature = "http")]
mod http;
mod query;

pub use config::ApiConfig;
pub use error::{ApiError, server_message};
#[cfg(feature = "http")]
pub use http::HttpApi;
pub use query::event_query_pairs;

use std::future::Future;

use waypost_protocol::{EventQuery, MapEventsResponse, SessionGrant, UserId};

/// The calls the mini-app makes against its backend.
///
/// One request per call: no retries, no backoff. Implementations attach the
/// bearer credential set through [`set_bearer`](Self::set_bearer) to every
/// request that follows.
pub trait ApiClient: Send + Sync + 'static {
    /// Exchanges a raw launch string for a bearer session.
    fn create_session(
        &self,
        launch: &str,
    ) -> impl Future<Output = Result<SessionGrant, ApiError>> + Send;

    /// Public events around a point.
    fn map_events(
        &self,
        query: &EventQuery,
    ) -> impl Future<Output = Result<MapEventsResponse, ApiError>> + Send;

    /// Events relevant to one user. Requires a bearer credential.
    fn user_map_events(
        &self,
        user: UserId,
        query: &EventQuery,
    ) -> impl Future<Output = Result<MapEventsResponse, ApiError>> + Send;

    /// Liveness probe.
    ///
    /// A 4xx answer still proves the server is reachable and counts as
    /// healthy; only network failures and 5xx are unhealthy.
    fn health(&self) -> impl Future<Output = bool> + Send;

    /// Attaches (`Some`) or detaches (`None`) the bearer credential.
    fn set_bearer(&self, token: Option<String>);
}
