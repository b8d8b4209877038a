//! Bearer session management for Waypost.
//!
//! This crate owns the lifecycle of the user's backend session:
//!
//! 1. **Exchange**: trading a launch string for a bearer token
//!    ([`SessionManager::login`])
//! 2. **Persistence**: keeping the session for the lifetime of the browsing
//!    context ([`SessionStore`], [`MemoryStore`])
//! 3. **Expiry**: treating a session as dead once its lifetime or its
//!    token's `exp` claim has passed
//! 4. **Signal**: telling interested parties whenever the authenticated
//!    state may have changed ([`AuthSignal`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Events Layer (above)  ← asks whether a user is signed in, logs out on 401
//!     ↕
//! Session Layer (this crate)  ← owns the token, its expiry and the signal
//!     ↕
//! Api / Protocol Layers (below)  ← ApiClient, SessionGrant, User, Clock
//! ```

mod claims;
mod error;
mod manager;
mod session;
mod signal;
mod store;

pub use claims::token_expiry_ms;
pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{AuthState, Session, SessionConfig};
pub use signal::{AuthSignal, Subscription};
pub use store::{MemoryStore, SessionStore};
