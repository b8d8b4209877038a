//! The HMAC-SHA256 signing chain shared with the backend.
//!
//! ```text
//! derived   = HMAC-SHA256(key = "WebAppData", msg = secret)
//! signature = hex(HMAC-SHA256(key = derived, msg = data_check_string))
//! ```
//!
//! Any change here breaks interoperability with the verifying backend.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{LaunchError, LaunchFields};

type HmacSha256 = Hmac<Sha256>;

/// Fixed label used as the HMAC key when deriving the signing key.
pub const KEY_DERIVATION_LABEL: &[u8] = b"WebAppData";

/// Derives the signing key from the shared secret (the bot token).
///
/// # Errors
/// [`LaunchError::Crypto`] if the HMAC primitive refuses the key.
pub fn derive_key(secret: &str) -> Result<Vec<u8>, LaunchError> {
    hmac_sha256(KEY_DERIVATION_LABEL, secret.as_bytes())
}

/// Signs a data-check-string, returning lowercase hex.
///
/// # Errors
/// [`LaunchError::Crypto`] if the HMAC primitive refuses a key.
pub fn sign(secret: &str, data_check_string: &str) -> Result<String, LaunchError> {
    let key = derive_key(secret)?;
    let mac = hmac_sha256(&key, data_check_string.as_bytes())?;
    Ok(hex::encode(mac))
}

/// Signs the data-check-string of `fields`. Any `hash` entries in
/// `fields` are ignored.
///
/// # Errors
/// [`LaunchError::Crypto`] if the HMAC primitive refuses a key.
pub fn sign_fields(fields: &LaunchFields, secret: &str) -> Result<String, LaunchError> {
    sign(secret, &fields.data_check_string())
}

/// Compares two hex digests without leaking where they differ.
///
/// Both sides are trimmed and lowercased first. Returns `false` (never
/// panics) when either side is empty, the lengths differ, or either side
/// is not valid hex (odd length, non-hex characters). Equal-length inputs
/// are compared over every byte: the check must not short-circuit.
pub fn hashes_equal(received: &str, expected: &str) -> bool {
    let received = received.trim().to_ascii_lowercase();
    let expected = expected.trim().to_ascii_lowercase();

    if received.is_empty() || expected.is_empty() {
        return false;
    }
    if received.len() != expected.len() {
        return false;
    }

    let (Ok(received), Ok(expected)) = (hex::decode(&received), hex::decode(&expected))
    else {
        return false;
    };

    received.ct_eq(expected.as_slice()).into()
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, LaunchError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| LaunchError::Crypto(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_is_32_bytes_and_deterministic() {
        let a = derive_key("BOT:TOKEN").unwrap();
        let b = derive_key("BOT:TOKEN").unwrap();
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
        assert_ne!(a, derive_key("BOT:OTHER").unwrap());
    }

    #[test]
    fn test_hmac_sha256_known_vector() {
        // HMAC-SHA256(key="key", msg="The quick brown fox jumps over the lazy dog")
        let mac = hmac_sha256(b"key", b"The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(
            hex::encode(mac),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_sign_is_lowercase_hex_of_64_chars() {
        let sig = sign("s", "a=1").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_sign_fields_ignores_hash_entries() {
        let plain = LaunchFields::from_pairs([("auth_date", "1"), ("query_id", "q")]);
        let with_hash =
            LaunchFields::from_pairs([("hash", "00"), ("query_id", "q"), ("auth_date", "1")]);
        assert_eq!(
            sign_fields(&plain, "s").unwrap(),
            sign_fields(&with_hash, "s").unwrap()
        );
    }

    #[test]
    fn test_hashes_equal_same_content() {
        assert!(hashes_equal("00ff10", "00ff10"));
    }

    #[test]
    fn test_hashes_equal_ignores_case_and_whitespace() {
        assert!(hashes_equal(" 00FF10\n", "00ff10"));
    }

    #[test]
    fn test_hashes_equal_single_bit_difference_is_false() {
        assert!(!hashes_equal("00ff10", "00ff11"));
        assert!(!hashes_equal("80ff10", "00ff10"));
    }

    #[test]
    fn test_hashes_equal_length_mismatch_is_false() {
        assert!(!hashes_equal("00ff", "00ff10"));
    }

    #[test]
    fn test_hashes_equal_odd_length_is_false() {
        assert!(!hashes_equal("abc", "abc"));
    }

    #[test]
    fn test_hashes_equal_non_hex_is_false() {
        assert!(!hashes_equal("zz", "zz"));
        assert!(!hashes_equal("0g", "00"));
    }

    #[test]
    fn test_hashes_equal_empty_is_false() {
        assert!(!hashes_equal("", ""));
        assert!(!hashes_equal("   ", "00"));
    }
}
