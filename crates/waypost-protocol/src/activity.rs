//! Projection of server event records into UI-facing activities.
//!
//! An [`Activity`] is what the map and bottom sheet render. It is derived
//! from a [`MapEvent`] by a pure function: no state, no I/O. The only
//! derived values are the display status, the distance label and the deep
//! link into the chat bot.

use serde::{Deserialize, Serialize};

use crate::{CategoryId, EventId, EventStatus, MapEvent};

// ---------------------------------------------------------------------------
// DeepLinkConfig
// ---------------------------------------------------------------------------

/// Where "register for this activity" sends the user.
///
/// The link opens the chat bot with a start parameter naming the event:
/// `{base}?start={start_prefix}{event_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLinkConfig {
    /// Bot URL, without query string.
    pub base: String,
    /// Prefix of the `start` parameter, followed by the event ID.
    pub start_prefix: String,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            base: "https://max.ru/t379_hakaton_bot".to_string(),
            start_prefix: "OpenEvent_".to_string(),
        }
    }
}

impl DeepLinkConfig {
    /// Builds the deep link for one event.
    pub fn link_for(&self, event_id: EventId) -> String {
        format!("{}?start={}{}", self.base, self.start_prefix, event_id)
    }
}

// ---------------------------------------------------------------------------
// Activity
// ---------------------------------------------------------------------------

/// Display status. Only two states matter to the UI: can you sign up or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Open,
    Closed,
}

/// UI-facing view of a [`MapEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Event ID rendered as a string (map markers key on strings).
    pub id: String,
    pub event_id: EventId,
    pub title: String,
    pub description: String,
    pub date: String,
    pub duration_hours: f64,
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    pub status: ActivityStatus,
    /// Distance label, one decimal place, e.g. `"1.3 км"`.
    pub distance_text: String,
    pub distance_km: f64,
    pub category_id: CategoryId,
    pub category_name: String,
    pub organizer_id: i64,
    pub contacts: String,
    pub max_volunteers: u32,
    pub current_volunteers: u32,
    pub slots_left: i64,
    pub deeplink: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Activity {
    /// Projects a server record.
    ///
    /// `status` is [`ActivityStatus::Open`] iff the server says `open`
    /// AND at least one slot is left.
    pub fn from_event(event: &MapEvent, links: &DeepLinkConfig) -> Self {
        let status = if event.status == EventStatus::Open && event.slots_left > 0 {
            ActivityStatus::Open
        } else {
            ActivityStatus::Closed
        };

        Self {
            id: event.id.to_string(),
            event_id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date.clone(),
            duration_hours: event.duration_hours,
            location: event.location.clone(),
            lat: event.location_lat,
            lon: event.location_lon,
            status,
            distance_text: format!("{:.1} км", event.distance_km),
            distance_km: event.distance_km,
            category_id: event.category_id,
            category_name: event.category_name.clone(),
            organizer_id: event.organizer_id,
            contacts: event.contacts.clone(),
            max_volunteers: event.max_volunteers,
            current_volunteers: event.current_volunteers,
            slots_left: event.slots_left,
            deeplink: links.link_for(event.id),
            created_at: event.created_at.clone(),
            updated_at: event.updated_at.clone(),
        }
    }

    /// Returns `true` if the user can still sign up.
    pub fn is_open(&self) -> bool {
        self.status == ActivityStatus::Open
    }
}

/// Projects a batch of records, preserving order.
pub fn activities_from(events: &[MapEvent], links: &DeepLinkConfig) -> Vec<Activity> {
    events
        .iter()
        .map(|event| Activity::from_event(event, links))
        .collect()
}
