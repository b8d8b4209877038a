//! Error types for the launch layer.

/// Why a launch payload was not trusted.
///
/// The verifier never returns these through `Result`: they are carried
/// inside a [`VerificationResult`](crate::VerificationResult) so callers
/// turn them into state instead of propagating them. Variants are grouped
/// the way the UI reports them: bridge problems (degraded read-only mode),
/// tampering ("cannot be trusted"), and staleness ("session expired").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    /// The host bridge is not installed (or never became ready).
    #[error("host bridge not available")]
    BridgeUnavailable,

    /// The bridge is present but handed us no launch string.
    #[error("launch data not provided by host")]
    LaunchDataMissing,

    /// No shared secret was configured, so nothing can be verified.
    #[error("shared secret is required")]
    SecretMissing,

    /// The launch string is not valid percent-encoding or not UTF-8.
    #[error("failed to URL-decode launch data: {0}")]
    Decode(String),

    /// The launch string carries no `hash` field.
    #[error("hash parameter missing in launch data")]
    MissingHash,

    /// The HMAC primitive rejected its input.
    #[error("signing failed: {0}")]
    Crypto(String),

    /// The recomputed signature differs from the supplied one.
    #[error("data validation failed: signature mismatch")]
    SignatureMismatch,

    /// The signature may be fine but `auth_date` is too old (or unusable).
    #[error("data validation failed: data expired")]
    Expired,
}

impl LaunchError {
    /// Returns `true` for failures caused by the host environment rather
    /// than by the payload itself.
    pub fn is_bridge_problem(&self) -> bool {
        matches!(self, Self::BridgeUnavailable | Self::LaunchDataMissing)
    }
}
