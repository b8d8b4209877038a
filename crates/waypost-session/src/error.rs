//! Error types for the session layer.

use waypost_api::ApiError;

/// Errors that can occur while establishing or using a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Another `login` is still waiting on the backend. Only one exchange
    /// runs at a time per manager.
    #[error("a login is already in progress")]
    LoginInProgress,

    /// The backend refused or failed the exchange. Displays the backend's
    /// own message, which is what the UI shows.
    #[error(transparent)]
    Exchange(#[from] ApiError),

    /// The backend issued a session that was already dead on arrival, or
    /// a stored session outlived its expiry.
    #[error("session expired")]
    Expired,

    /// A protected operation was attempted without a live session.
    #[error("User not authenticated")]
    NotAuthenticated,

    /// The persistent store failed to read or write.
    #[error("session storage failed: {0}")]
    Storage(String),
}
