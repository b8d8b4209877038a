//! Integration tests for launch payload verification.
//!
//! These exercise the verifier the way the app does: through raw,
//! URL-encoded launch strings, with a frozen clock.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use waypost_launch::{LaunchError, LaunchFields, Verifier, sign};
use waypost_protocol::ManualClock;

const SECRET: &str = "BOT:TOKEN";
const AUTH_DATE: i64 = 1_700_000_000;
/// HMAC chain of `auth_date=1700000000\nuser={"id":1}` under `BOT:TOKEN`.
const KNOWN_HASH: &str = "b9dc21ad41a111620c9d964f6dff6341c4fed3f8bc706a2c95767947767f0890";

// =========================================================================
// Helpers
// =========================================================================

fn verifier_at_ms(now_ms: i64) -> Verifier {
    Verifier::new(Arc::new(ManualClock::new(now_ms)))
}

fn minutes_after_auth(minutes: i64) -> i64 {
    (AUTH_DATE + minutes * 60) * 1000
}

fn sample_pairs() -> Vec<(String, String)> {
    vec![
        ("auth_date".into(), AUTH_DATE.to_string()),
        ("query_id".into(), "AAHdF6IQAAAAAN0XohDhrOrc".into()),
        (
            "user".into(),
            r#"{"id":279058397,"first_name":"Vladislav","username":"vdkfrost"}"#.into(),
        ),
        ("chat_type".into(), "sender".into()),
    ]
}

fn sign_pairs(pairs: &[(String, String)]) -> String {
    let mut fields = LaunchFields::from_pairs(pairs.iter().cloned());
    let hash = sign(SECRET, &fields.data_check_string()).expect("sign");
    fields.push("hash", hash);
    fields.to_query()
}

// =========================================================================
// End-to-end scenario
// =========================================================================

#[test]
fn test_known_payload_thirty_minutes_old_is_valid_and_fresh() {
    let launch = format!("auth_date=1700000000&hash={KNOWN_HASH}&user=%7B%22id%22%3A1%7D");

    let result = verifier_at_ms(minutes_after_auth(30)).verify(&launch, SECRET, 60);

    assert!(result.is_valid, "error: {:?}", result.error);
    assert_eq!(result.is_fresh, Some(true));
}

#[test]
fn test_known_payload_two_hours_old_is_stale() {
    let launch = format!("auth_date=1700000000&hash={KNOWN_HASH}&user=%7B%22id%22%3A1%7D");

    let result = verifier_at_ms(minutes_after_auth(120)).verify(&launch, SECRET, 60);

    assert!(!result.is_valid);
    assert_eq!(result.is_fresh, Some(false));
    // The signature itself still matches: the only complaint is age.
    assert_eq!(result.error, Some(LaunchError::Expired));
}

#[test]
fn test_known_hash_matches_local_signing_chain() {
    let fields = LaunchFields::parse("auth_date=1700000000&user=%7B%22id%22%3A1%7D").unwrap();
    assert_eq!(sign(SECRET, &fields.data_check_string()).unwrap(), KNOWN_HASH);
}

// =========================================================================
// Properties
// =========================================================================

#[test]
fn test_verify_is_deterministic() {
    let launch = sign_pairs(&sample_pairs());
    let verifier = verifier_at_ms(minutes_after_auth(5));

    let first = verifier.verify(&launch, SECRET, 60);
    for _ in 0..10 {
        assert_eq!(verifier.verify(&launch, SECRET, 60), first);
    }
    assert!(first.is_valid);
}

#[test]
fn test_field_order_does_not_matter() {
    let pairs = sample_pairs();
    let launch = sign_pairs(&pairs);
    let hash = LaunchFields::parse(&launch).unwrap().hash().unwrap().to_string();

    let mut reordered = pairs.clone();
    reordered.reverse();
    reordered.insert(1, ("hash".into(), hash));
    let reordered = LaunchFields::from_pairs(reordered).to_query();

    let result = verifier_at_ms(minutes_after_auth(5)).verify(&reordered, SECRET, 60);
    assert!(result.is_valid);
}

#[test]
fn test_reformatted_user_json_still_verifies() {
    let pairs = sample_pairs();
    let launch = sign_pairs(&pairs);
    let hash = LaunchFields::parse(&launch).unwrap().hash().unwrap().to_string();

    let mut spaced = pairs.clone();
    spaced[2].1 = r#"{ "id": 279058397, "first_name": "Vladislav", "username": "vdkfrost" }"#.into();
    spaced.push(("hash".into(), hash));
    let spaced = LaunchFields::from_pairs(spaced).to_query();

    let result = verifier_at_ms(minutes_after_auth(5)).verify(&spaced, SECRET, 60);
    assert!(result.is_valid, "error: {:?}", result.error);
}

#[test]
fn test_minted_launch_with_reserved_characters_verifies() {
    for name in ["Tom & Jerry", "A+B", "x=y %41"] {
        let mut pairs = sample_pairs();
        pairs[2].1 = serde_json::json!({ "id": 1, "first_name": name }).to_string();
        let launch = sign_pairs(&pairs);

        let result = verifier_at_ms(minutes_after_auth(5)).verify(&launch, SECRET, 60);

        assert!(result.is_valid, "{name}: {:?}", result.error);
        assert_eq!(result.fields.unwrap().user.unwrap().first_name, name);
    }
}

#[test]
fn test_single_character_tamper_in_any_field_is_detected() {
    let pairs = sample_pairs();
    let launch = sign_pairs(&pairs);
    let hash = LaunchFields::parse(&launch).unwrap().hash().unwrap().to_string();
    let verifier = verifier_at_ms(minutes_after_auth(5));
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let mut tampered = pairs.clone();
        tampered.push(("hash".into(), hash.clone()));

        let field = rng.random_range(0..tampered.len());
        let value: Vec<char> = tampered[field].1.chars().collect();
        let pos = rng.random_range(0..value.len());
        let replacement = loop {
            let candidate = if field == tampered.len() - 1 {
                // Keep the hash hex so the failure is a mismatch, not a decode error.
                char::from_digit(rng.random_range(0..16), 16).unwrap()
            } else {
                char::from(rng.random_range(b'a'..=b'z'))
            };
            if candidate != value[pos] {
                break candidate;
            }
        };
        let mut value = value;
        value[pos] = replacement;
        tampered[field].1 = value.into_iter().collect();

        let launch = LaunchFields::from_pairs(tampered).to_query();
        let result = verifier.verify(&launch, SECRET, 60);
        assert!(!result.is_valid, "tamper in field {field} at {pos} went unnoticed");
    }
}

#[test]
fn test_fresh_and_valid_are_independent() {
    let launch = sign_pairs(&sample_pairs());

    let old = verifier_at_ms(minutes_after_auth(600)).verify(&launch, SECRET, 60);
    assert_eq!((old.is_valid, old.is_fresh), (false, Some(false)));

    let forged = verifier_at_ms(minutes_after_auth(1)).verify(&launch, "WRONG", 60);
    assert_eq!((forged.is_valid, forged.is_fresh), (false, Some(true)));
    assert!(forged.is_tampered());
}
