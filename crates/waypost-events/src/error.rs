//! Error types for the events layer.

use waypost_api::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventsError {
    /// A user-scoped query was made without a live session.
    #[error("User not authenticated")]
    NotAuthenticated,

    /// The backend call failed. Displays the backend's message.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The owner of the request was torn down before it resolved. Nothing
    /// was applied to state; callers should drop this silently.
    #[error("request cancelled")]
    Cancelled,
}
