//! The launch-data verifier: signature + freshness → trust decision.
//!
//! The verifier is a fast client-side gate. The backend re-verifies every
//! launch string it receives; this check exists so the UI can refuse
//! protected actions early and explain why ("cannot be trusted" vs.
//! "session expired").

use std::sync::Arc;

use waypost_protocol::Clock;

use crate::signature::{hashes_equal, sign};
use crate::{BridgeSlot, LaunchData, LaunchError, LaunchFields};

/// Verifier defaults.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Oldest acceptable `auth_date`, in minutes. Default: 60.
    pub max_age_minutes: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// VerificationResult
// ---------------------------------------------------------------------------

/// The outcome of verifying a launch string.
///
/// `is_valid` is the only field that grants trust. `is_fresh` is computed
/// independently of the signature so callers can tell a tampered payload
/// (`is_fresh == Some(true)`, invalid) from a genuine but old one
/// (`is_fresh == Some(false)`). It is `None` when verification stopped
/// before the freshness check (missing bridge, undecodable string, etc.).
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationResult {
    pub is_valid: bool,
    pub is_fresh: Option<bool>,
    pub error: Option<LaunchError>,
    /// Structured fields, when the string could be parsed.
    pub fields: Option<LaunchData>,
}

impl VerificationResult {
    fn rejected(error: LaunchError, fields: Option<LaunchData>) -> Self {
        Self {
            is_valid: false,
            is_fresh: None,
            error: Some(error),
            fields,
        }
    }

    /// The signature did not match.
    pub fn is_tampered(&self) -> bool {
        self.error == Some(LaunchError::SignatureMismatch)
    }

    /// The signature matched but `auth_date` is too old.
    pub fn is_stale(&self) -> bool {
        self.error == Some(LaunchError::Expired)
    }

    /// The user-facing error message, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifies launch strings against a shared secret.
pub struct Verifier {
    clock: Arc<dyn Clock>,
    config: VerifierConfig,
}

impl Verifier {
    /// Creates a verifier with default config.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_config(clock, VerifierConfig::default())
    }

    pub fn with_config(clock: Arc<dyn Clock>, config: VerifierConfig) -> Self {
        Self { clock, config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verifies `launch` against `secret`, rejecting payloads older than
    /// `max_age_minutes`.
    ///
    /// Never fails: every problem is reported inside the result.
    pub fn verify(
        &self,
        launch: &str,
        secret: &str,
        max_age_minutes: u64,
    ) -> VerificationResult {
        if launch.is_empty() {
            return VerificationResult::rejected(LaunchError::LaunchDataMissing, None);
        }

        let fields = match LaunchFields::parse(launch) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::debug!(error = %e, "launch data rejected");
                return VerificationResult::rejected(e, None);
            }
        };
        let data = fields.launch_data();

        let Some(received) = fields.hash() else {
            return VerificationResult::rejected(LaunchError::MissingHash, Some(data));
        };

        if secret.is_empty() {
            return VerificationResult::rejected(LaunchError::SecretMissing, Some(data));
        }

        let expected = match sign(secret, &fields.data_check_string()) {
            Ok(sig) => sig,
            Err(e) => return VerificationResult::rejected(e, Some(data)),
        };
        let signature_ok = hashes_equal(received, &expected);
        let fresh = is_fresh(fields.get("auth_date"), max_age_minutes, self.clock.now_ms());

        let error = if !signature_ok {
            Some(LaunchError::SignatureMismatch)
        } else if !fresh {
            Some(LaunchError::Expired)
        } else {
            None
        };

        tracing::debug!(signature_ok, fresh, "launch data verified");

        VerificationResult {
            is_valid: signature_ok && fresh,
            is_fresh: Some(fresh),
            error,
            fields: Some(data),
        }
    }

    /// [`verify`](Self::verify) with the configured maximum age.
    pub fn verify_default(&self, launch: &str, secret: &str) -> VerificationResult {
        self.verify(launch, secret, self.config.max_age_minutes)
    }

    /// Verifies the launch string currently exposed by the host bridge.
    ///
    /// Reports a missing bridge, a missing launch string and a missing
    /// secret as distinct errors. The host's own structured view is
    /// attached when the bridge provides one.
    pub fn verify_bridge(&self, bridge: &BridgeSlot, secret: &str) -> VerificationResult {
        let Some(host) = bridge.current() else {
            return VerificationResult::rejected(LaunchError::BridgeUnavailable, None);
        };

        let unsafe_view = host.launch_data_unsafe();
        let Some(raw) = host.launch_data().filter(|raw| !raw.is_empty()) else {
            return VerificationResult::rejected(LaunchError::LaunchDataMissing, unsafe_view);
        };

        if secret.is_empty() {
            return VerificationResult::rejected(LaunchError::SecretMissing, unsafe_view);
        }

        let mut result = self.verify_default(&raw, secret);
        if unsafe_view.is_some() {
            result.fields = unsafe_view;
        }
        result
    }
}

/// Freshness policy for `auth_date` (seconds since the epoch).
///
/// - absent or empty → fresh (no recency check possible)
/// - not a finite positive number → stale
/// - otherwise fresh iff `now − auth_date·1000 ≤ max_age·60000` (ms)
pub fn is_fresh(auth_date: Option<&str>, max_age_minutes: u64, now_ms: i64) -> bool {
    let Some(raw) = auth_date.filter(|raw| !raw.is_empty()) else {
        return true;
    };

    let Ok(auth_secs) = raw.trim().parse::<f64>() else {
        return false;
    };
    if !auth_secs.is_finite() || auth_secs <= 0.0 {
        return false;
    }

    let age_ms = now_ms as f64 - auth_secs * 1000.0;
    let max_age_ms = max_age_minutes as f64 * 60_000.0;
    age_ms <= max_age_ms
}
