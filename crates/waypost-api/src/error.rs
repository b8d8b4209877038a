//! Error types for the backend HTTP surface.

/// Errors from a backend call.
///
/// `Clone` so the event feed can keep the last error as state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never got an HTTP answer (DNS, refused, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    ///
    /// `message` is the server-supplied message when the body carried
    /// one, a generic description otherwise.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// A 2xx answer whose body didn't match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The client could not be constructed.
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl ApiError {
    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The backend rejected our credential. The client is expected to log
    /// the user out when this happens.
    pub fn is_auth_failure(&self) -> bool {
        self.to_string().contains("Authentication failed")
    }
}

/// Extracts the server's message from an error body:
/// `{"error":{"message":…}}` first, then `{"message":…}`.
pub fn server_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
