//! Unified error type for Waypost.

use waypost_api::ApiError;
use waypost_events::EventsError;
use waypost_geo::GeoError;
use waypost_launch::LaunchError;
use waypost_session::SessionError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapping variant generates the `From`
/// impl, so `?` converts sub-crate errors automatically.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WaypostError {
    /// Host bridge or launch payload problem.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Events(#[from] EventsError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The launch payload failed verification. Protected actions stay
    /// blocked for the rest of the app instance.
    #[error("Data validation failed. The application cannot be trusted. ({0})")]
    Untrusted(LaunchError),

    /// The launch payload is genuine but too old.
    #[error("Authentication data is expired. Please re-open the mini-app to refresh session.")]
    SessionExpired,

    /// Registration was attempted on an activity that is closed or full.
    #[error("activity {0} is not open for registration")]
    ActivityClosed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_launch_error() {
        let err: WaypostError = LaunchError::BridgeUnavailable.into();
        assert!(matches!(err, WaypostError::Launch(_)));
        assert_eq!(err.to_string(), "host bridge not available");
    }

    #[test]
    fn test_from_api_error() {
        let err: WaypostError = ApiError::Network("refused".into()).into();
        assert!(matches!(err, WaypostError::Api(_)));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_from_session_error() {
        let err: WaypostError = SessionError::LoginInProgress.into();
        assert!(matches!(err, WaypostError::Session(_)));
    }

    #[test]
    fn test_from_events_error() {
        let err: WaypostError = EventsError::NotAuthenticated.into();
        assert_eq!(err.to_string(), "User not authenticated");
    }

    #[test]
    fn test_from_geo_error() {
        let err: WaypostError = GeoError::Timeout.into();
        assert!(matches!(err, WaypostError::Geo(GeoError::Timeout)));
    }

    #[test]
    fn test_untrusted_and_expired_messages_differ() {
        let untrusted = WaypostError::Untrusted(LaunchError::SignatureMismatch).to_string();
        let expired = WaypostError::SessionExpired.to_string();
        assert!(untrusted.contains("cannot be trusted"));
        assert!(expired.contains("expired"));
        assert_ne!(untrusted, expired);
    }
}
