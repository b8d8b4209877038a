//! Launch payload verification for Waypost.
//!
//! The messenger host hands the mini-app an opaque, URL-encoded "launch
//! string" describing who opened it and when. This crate decides whether
//! that string can be trusted:
//!
//! 1. **Parsing** ([`LaunchFields`]): decode the string into an ordered
//!    multiset of `key=value` fields and build the data-check-string.
//! 2. **Signature** ([`derive_key`], [`sign`], [`hashes_equal`]): the
//!    HMAC-SHA256 chain shared with the backend, compared in constant time.
//! 3. **Verification** ([`Verifier`]): signature plus freshness, folded into
//!    a [`VerificationResult`] that never panics and never errors.
//! 4. **Host bridge** ([`HostBridge`], [`BridgeSlot`]): the capability
//!    interface the host injects, with an explicit "not yet available" state.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Layer (above)  ← exchanges a trusted launch string for a token
//!     ↕
//! Launch Layer (this crate)  ← decides whether the launch string is genuine
//!     ↕
//! Protocol Layer (below)  ← provides User, Clock
//! ```

mod bridge;
mod error;
mod payload;
mod signature;
mod verifier;

pub use bridge::{
    BridgeCallback, BridgeEvent, BridgeSlot, Haptic, HostBridge, ImpactStyle,
    NotificationKind, Unsubscribe,
};
pub use error::LaunchError;
pub use payload::{LaunchChat, LaunchData, LaunchFields};
pub use signature::{KEY_DERIVATION_LABEL, derive_key, hashes_equal, sign, sign_fields};
pub use verifier::{VerificationResult, Verifier, VerifierConfig, is_fresh};
