//! Launch string parsing and the data-check-string.
//!
//! A launch string looks like a URL query:
//!
//! ```text
//! auth_date=1700000000&hash=9f…&user=%7B%22id%22%3A1%7D
//! ```
//!
//! It is decoded in two passes, exactly as the host SDK does it: one
//! `decodeURIComponent`-style pass over the whole string, then ordinary
//! `application/x-www-form-urlencoded` parsing (which decodes once more and
//! turns `+` into a space). Both passes must be reproduced or signatures
//! computed by the backend won't match.

use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;
use waypost_protocol::User;

use crate::LaunchError;

/// Fields whose values are JSON documents and get re-serialized in
/// minimal form before they enter the data-check-string.
const JSON_FIELDS: [&str; 2] = ["user", "chat"];

/// Characters `encodeURIComponent` escapes.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

// ---------------------------------------------------------------------------
// LaunchFields
// ---------------------------------------------------------------------------

/// The ordered multiset of `key=value` pairs in a launch string.
///
/// Order and duplicates are preserved as received; only the
/// data-check-string sorts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchFields {
    pairs: Vec<(String, String)>,
}

impl LaunchFields {
    /// Decodes a raw launch string as handed over by the host.
    ///
    /// # Errors
    /// [`LaunchError::Decode`] if the string has a malformed `%` escape
    /// or decodes to invalid UTF-8.
    pub fn parse(raw: &str) -> Result<Self, LaunchError> {
        let decoded = decode_component(raw)?;
        Ok(Self::parse_decoded(&decoded))
    }

    /// Parses an already-decoded string as form-urlencoded pairs.
    /// A leading `?` is ignored.
    pub fn parse_decoded(decoded: &str) -> Self {
        let query = decoded.strip_prefix('?').unwrap_or(decoded);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// Builds a field set from explicit pairs, in the given order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Appends a field.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the supplied signature, if present and non-empty.
    pub fn hash(&self) -> Option<&str> {
        self.get("hash").filter(|h| !h.is_empty())
    }

    /// Iterates over the pairs in received order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs, duplicates included.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the launch string carried no pairs at all.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Builds the data-check-string: every field except `hash`, stably
    /// sorted by key in byte order, `user`/`chat` JSON re-serialized
    /// minimally, joined as `key=value` lines with no trailing newline.
    pub fn data_check_string(&self) -> String {
        let mut fields: Vec<(&str, &str)> =
            self.iter().filter(|(k, _)| *k != "hash").collect();
        // `sort_by` is stable: duplicate keys keep their received order.
        fields.sort_by(|a, b| a.0.cmp(b.0));

        fields
            .into_iter()
            .map(|(key, value)| {
                let value = if JSON_FIELDS.contains(&key) {
                    canonical_json(value)
                        .map(Cow::Owned)
                        .unwrap_or(Cow::Borrowed(value))
                } else {
                    Cow::Borrowed(value)
                };
                format!("{key}={value}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Encodes the fields the way the host hands them over: form-urlencoded,
    /// then escaped once more as a URI component. [`parse`](Self::parse)
    /// undoes both passes, so any value survives the trip.
    pub fn to_query(&self) -> String {
        let form = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish();
        utf8_percent_encode(&form, URI_COMPONENT).to_string()
    }

    /// Best-effort structured view of the fields. Unparseable values are
    /// left as `None`.
    pub fn launch_data(&self) -> LaunchData {
        let json = |key: &str| self.get(key).and_then(|v| serde_json::from_str(v).ok());
        let text = |key: &str| self.get(key).map(str::to_string);

        LaunchData {
            query_id: text("query_id"),
            auth_date: self.get("auth_date").and_then(|v| v.trim().parse().ok()),
            hash: text("hash"),
            start_param: text("start_param"),
            user: json("user"),
            receiver: json("receiver"),
            chat: self.get("chat").and_then(|v| serde_json::from_str(v).ok()),
            chat_type: text("chat_type"),
            chat_instance: text("chat_instance"),
        }
    }
}

// ---------------------------------------------------------------------------
// LaunchData
// ---------------------------------------------------------------------------

/// The chat the mini-app was opened from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Structured, NOT verified view of a launch payload (the host's
/// "unsafe" form). Only trust it after a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchData {
    pub query_id: Option<String>,
    /// Seconds since the Unix epoch.
    pub auth_date: Option<i64>,
    pub hash: Option<String>,
    pub start_param: Option<String>,
    pub user: Option<User>,
    pub receiver: Option<User>,
    pub chat: Option<LaunchChat>,
    pub chat_type: Option<String>,
    pub chat_instance: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `decodeURIComponent`: every `%` must start a two-digit hex escape and
/// the result must be UTF-8. `+` is left alone.
fn decode_component(raw: &str) -> Result<String, LaunchError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !well_formed {
                return Err(LaunchError::Decode(format!(
                    "malformed escape at byte {i}"
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|e| LaunchError::Decode(e.to_string()))
}

/// Minimal JSON form of `value`, key order preserved. `None` if `value`
/// is not JSON.
fn canonical_json(value: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(value).ok()?;
    serde_json::to_string(&parsed).ok()
}
