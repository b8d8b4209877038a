//! Wire and domain types for Waypost.
//!
//! This crate defines the "language" the mini-app and its backend speak:
//!
//! - **Types** ([`MapEvent`], [`SessionGrant`], [`EventQuery`], etc.):
//!   the records that travel over HTTP.
//! - **Activity** ([`Activity`], [`DeepLinkConfig`]): the pure projection
//!   from a server record to the UI-facing record.
//! - **Clock** ([`Clock`], [`SystemClock`], [`ManualClock`]): the single
//!   source of "now" for every time-dependent decision above this layer.
//!
//! # Architecture
//!
//! ```text
//! Launch (verifier) ─┐
//! Api (HTTP)        ─┼─→ Protocol (types + clock)
//! Session / Events  ─┘
//! ```

mod activity;
mod clock;
mod types;

pub use activity::{Activity, ActivityStatus, DeepLinkConfig, activities_from};
pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{
    CategoryId, EventId, EventQuery, EventStatus, EventsMeta, MapEvent,
    MapEventsResponse, SessionGrant, User, UserId,
};
