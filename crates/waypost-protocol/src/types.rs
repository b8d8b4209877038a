//! Records exchanged with the Waypost backend.
//!
//! Field names follow the backend's JSON: map events use camelCase,
//! the user profile uses snake_case (it is forwarded from the host's
//! launch payload as-is).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a messenger user.
///
/// Newtype over `i64` so a `UserId` can't be passed where an [`EventId`]
/// is expected. `#[serde(transparent)]` keeps the wire form a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a volunteer event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an event category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The profile of the user who launched the mini-app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Session exchange
// ---------------------------------------------------------------------------

/// Response of `GET /auth/session`: a bearer token, its lifetime in
/// seconds, and the profile it was issued for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub token: String,
    /// Lifetime of `token` in seconds, counted from receipt.
    pub expires_in: f64,
    pub user: User,
}

// ---------------------------------------------------------------------------
// Map events
// ---------------------------------------------------------------------------

/// Server-side lifecycle of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Open,
    Closed,
    Cancelled,
    Completed,
}

/// One event record as returned by the map endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEvent {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub date: String,
    pub duration_hours: f64,
    pub location: String,
    pub location_lat: f64,
    pub location_lon: f64,
    pub category_id: CategoryId,
    pub category_name: String,
    pub organizer_id: i64,
    pub contacts: String,
    pub max_volunteers: u32,
    pub current_volunteers: u32,
    pub slots_left: i64,
    pub distance_km: f64,
    pub status: EventStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Echo of the query the server actually ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsMeta {
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    pub count: u32,
    pub lat: f64,
    pub limit: u32,
    pub lon: f64,
    pub offset: u32,
    pub radius_km: f64,
}

/// Envelope of `GET /map/events` and `GET /map/users/{id}/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEventsResponse {
    pub data: Vec<MapEvent>,
    pub meta: EventsMeta,
}

/// Parameters of a geospatial event query.
///
/// `limit` and `offset` fall back to the client defaults when `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub categories: Vec<CategoryId>,
}

impl EventQuery {
    /// Creates a query around a point with no category filter.
    pub fn around(lat: f64, lon: f64, radius_km: f64) -> Self {
        Self {
            lat,
            lon,
            radius_km,
            ..Self::default()
        }
    }

    /// Restricts the query to the given categories.
    pub fn with_categories(
        mut self,
        categories: impl IntoIterator<Item = CategoryId>,
    ) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }
}
