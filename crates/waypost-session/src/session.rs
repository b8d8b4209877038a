//! Session types: the record of a signed-in user.
//!
//! A session is what the backend hands back for a trusted launch string:
//! - WHO the user is (`User`)
//! - HOW to prove it on later calls (a bearer token)
//! - WHEN that proof stops being accepted (`expires_at_ms`)

use serde::{Deserialize, Serialize};
use waypost_protocol::{SessionGrant, User};

use crate::claims::token_expiry_ms;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session persistence.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Key the session is persisted under in the [`SessionStore`](crate::SessionStore).
    ///
    /// Default: `"max_auth_session"`.
    pub storage_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: "max_auth_session".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Where the manager stands with the backend.
///
/// ```text
///   Unauthenticated ──(login)──→ Authenticating ──(ok)──→ Authenticated
///          ↑                           │                        │
///          └────────(failure)──────────┘                        │
///          └───────────────(logout / expiry)────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// A `login` is waiting on the backend.
    Authenticating,
    Authenticated,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A bearer session, as persisted.
///
/// Serialized as `{"token": …, "expiresAt": …, "user": …}` with
/// `expiresAt` in Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    #[serde(rename = "expiresAt")]
    pub expires_at_ms: i64,
    pub user: User,
}

impl Session {
    /// Builds a session from a backend grant received at `now_ms`.
    ///
    /// A missing, negative or non-finite lifetime counts as zero, which
    /// yields a session that is already expired.
    pub fn from_grant(grant: SessionGrant, now_ms: i64) -> Self {
        let lifetime_secs = if grant.expires_in.is_finite() && grant.expires_in > 0.0 {
            grant.expires_in
        } else {
            0.0
        };
        Self {
            token: grant.token,
            expires_at_ms: now_ms.saturating_add((lifetime_secs * 1000.0) as i64),
            user: grant.user,
        }
    }

    /// Whether the session is still accepted at `now_ms`.
    ///
    /// Both the stored expiry and, when the token is a JWT carrying one,
    /// the `exp` claim must lie in the future.
    pub fn is_live(&self, now_ms: i64) -> bool {
        if self.token.is_empty() || now_ms >= self.expires_at_ms {
            return false;
        }
        token_expiry_ms(&self.token).is_none_or(|exp_ms| exp_ms > now_ms)
    }
}

#[cfg(test)]
mod tests {
    use waypost_protocol::UserId;

    use super::*;

    fn user() -> User {
        User {
            id: UserId(5),
            first_name: "Ann".into(),
            last_name: None,
            username: None,
            language_code: None,
            photo_url: None,
        }
    }

    #[test]
    fn test_from_grant_converts_seconds_to_deadline() {
        let grant = SessionGrant {
            token: "t".into(),
            expires_in: 3600.0,
            user: user(),
        };
        let session = Session::from_grant(grant, 1_000);
        assert_eq!(session.expires_at_ms, 3_601_000);
        assert!(session.is_live(3_600_999));
        assert!(!session.is_live(3_601_000));
    }

    #[test]
    fn test_from_grant_bad_lifetime_is_expired() {
        let grant = SessionGrant {
            token: "t".into(),
            expires_in: f64::NAN,
            user: user(),
        };
        let session = Session::from_grant(grant, 1_000);
        assert_eq!(session.expires_at_ms, 1_000);
        assert!(!session.is_live(1_000));
    }

    #[test]
    fn test_session_serializes_expires_at_in_camel_case() {
        let session = Session {
            token: "t".into(),
            expires_at_ms: 42,
            user: user(),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["expiresAt"], 42);
        assert_eq!(json["token"], "t");
        assert_eq!(json["user"]["first_name"], "Ann");
    }

    #[test]
    fn test_empty_token_is_never_live() {
        let session = Session {
            token: String::new(),
            expires_at_ms: i64::MAX,
            user: user(),
        };
        assert!(!session.is_live(0));
    }
}
