//! # Waypost
//!
//! Client core for a map-based volunteer activity mini-app that runs
//! inside a chat messenger.
//!
//! Waypost verifies the host's signed launch payload, exchanges it for a
//! bearer session, serves cached geospatial event queries, and gates
//! "register for this activity" behind authentication.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use waypost::prelude::*;
//!
//! # async fn run(bridge: std::sync::Arc<dyn HostBridge>) -> Result<(), WaypostError> {
//! waypost::init_logging("info,waypost=debug");
//!
//! let app = App::builder()
//!     .config(AppConfig::from_env()?)
//!     .bridge(bridge)
//!     .build_http()?;
//!
//! if let Startup::Limited { reason } = app.start().await {
//!     eprintln!("limited mode: {reason}");
//! }
//! let query = EventQuery::around(59.935, 30.325, 5.0);
//! app.feed().fetch_public(&query, false, &CancelToken::new()).await?;
//! # Ok(())
//! # }
//! ```

mod app;
mod config;
mod error;
mod logging;

pub use app::{App, AppBuilder, Startup};
pub use config::{AppConfig, ConfigError};
pub use error::WaypostError;
pub use logging::init_logging;

pub use waypost_api as api;
pub use waypost_events as events;
pub use waypost_geo as geo;
pub use waypost_launch as launch;
pub use waypost_protocol as protocol;
pub use waypost_session as session;

pub mod prelude {
    pub use crate::{App, AppBuilder, AppConfig, Startup, WaypostError};
    pub use waypost_api::{ApiClient, ApiError, HttpApi};
    pub use waypost_events::{ActorScope, CancelToken, EventFeed, FeedState};
    pub use waypost_geo::{GeoError, GeoOptions, Locator, Position, PositionSource};
    pub use waypost_launch::{
        BridgeSlot, Haptic, HostBridge, LaunchError, VerificationResult, Verifier,
    };
    pub use waypost_protocol::{
        Activity, Clock, DeepLinkConfig, EventQuery, MapEvent, SystemClock, User, UserId,
    };
    pub use waypost_session::{AuthState, SessionError, SessionManager};
}
