//! Best-effort reading of the `exp` claim of a JWT bearer token.
//!
//! The signature is not checked: the backend does that. We only want to
//! stop presenting a token we already know it will refuse.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// The token's `exp` claim in Unix milliseconds.
///
/// `None` when the token is not a JWT, its payload does not decode, or it
/// has no numeric `exp`. Callers treat `None` as "no claim to enforce".
pub fn token_expiry_ms(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_f64()?;
    // JS truthiness: `exp: 0` means no claim.
    (exp.is_finite() && exp != 0.0).then(|| (exp * 1000.0) as i64)
}
