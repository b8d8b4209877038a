//! The session manager: owns the user's bearer session.
//!
//! Responsibilities:
//! - Exchanging a launch string for a session ([`login`](SessionManager::login))
//! - Persisting it and keeping an in-memory copy so it is not re-read and
//!   re-parsed on every check
//! - Detecting expiry and clearing everything when it happens
//! - Keeping the API client's bearer credential in step with the session
//! - Emitting on the [`AuthSignal`] at every transition
//!
//! # Concurrency note
//!
//! All methods take `&self`, so the manager is shared behind an `Arc`.
//! The in-memory copy sits behind a `std::sync::Mutex` that is never held
//! across an `.await`. Only one `login` may be in flight at a time; a
//! second caller gets [`SessionError::LoginInProgress`] instead of racing
//! the first one to the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use waypost_api::ApiClient;
use waypost_protocol::{Clock, User};

use crate::{
    AuthSignal, AuthState, MemoryStore, Session, SessionConfig, SessionError, SessionStore,
    Subscription,
};

/// Manages the bearer session of one app instance.
///
/// ## Lifecycle
///
/// ```text
/// restore() ──→ login() ──→ is_authenticated() ──→ logout()
///                  │               │
///                  ▼               ▼ (deadline or `exp` passed)
///          [Authenticated]   cleared + emit(false)
/// ```
pub struct SessionManager<A: ApiClient> {
    api: Arc<A>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn SessionStore>,
    config: SessionConfig,

    /// In-memory copy of the persisted session.
    cached: Mutex<Option<Session>>,

    /// Set while a `login` awaits the backend.
    logging_in: AtomicBool,

    /// Message of the last failed login, cleared on success.
    last_error: Mutex<Option<String>>,

    signal: AuthSignal,
}

impl<A: ApiClient> SessionManager<A> {
    /// Creates a manager persisting into a fresh [`MemoryStore`].
    pub fn new(api: Arc<A>, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        Self::with_store(api, clock, Arc::new(MemoryStore::new()), config)
    }

    /// Creates a manager persisting into `store`.
    ///
    /// Nothing is read until the first check; call
    /// [`restore`](Self::restore) at startup to pick up a stored session.
    pub fn with_store(
        api: Arc<A>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            api,
            clock,
            store,
            config,
            cached: Mutex::new(None),
            logging_in: AtomicBool::new(false),
            last_error: Mutex::new(None),
            signal: AuthSignal::new(),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn signal(&self) -> &AuthSignal {
        &self.signal
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Exchanges the raw launch string for a bearer session.
    ///
    /// On success the session is persisted, the bearer is attached and
    /// `true` is emitted. On failure any existing session is cleared, the
    /// bearer is detached and `false` is emitted.
    ///
    /// # Errors
    /// - [`SessionError::LoginInProgress`] if another login is in flight
    ///   (nothing else happens)
    /// - [`SessionError::Exchange`] if the backend call fails
    /// - [`SessionError::Expired`] if the granted session is already dead
    pub async fn login(&self, launch: &str) -> Result<Session, SessionError> {
        if self
            .logging_in
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("login refused: another login is in flight");
            return Err(SessionError::LoginInProgress);
        }
        // Reset on every exit, including the future being dropped.
        let _in_flight = InFlight(&self.logging_in);

        let grant = match self.api.create_session(launch).await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::warn!(error = %e, "session exchange failed");
                self.clear();
                *lock(&self.last_error) = Some(e.to_string());
                self.signal.emit(false);
                return Err(SessionError::Exchange(e));
            }
        };

        let session = Session::from_grant(grant, self.clock.now_ms());
        if !session.is_live(self.clock.now_ms()) {
            tracing::warn!(user_id = %session.user.id, "backend granted an expired session");
            self.clear();
            *lock(&self.last_error) = Some(SessionError::Expired.to_string());
            self.signal.emit(false);
            return Err(SessionError::Expired);
        }

        self.persist(&session);
        *lock(&self.cached) = Some(session.clone());
        self.api.set_bearer(Some(session.token.clone()));
        *lock(&self.last_error) = None;

        tracing::info!(user_id = %session.user.id, expires_at_ms = session.expires_at_ms, "logged in");
        self.signal.emit(true);
        Ok(session)
    }

    /// Drops the session everywhere and emits `false`.
    pub fn logout(&self) {
        self.clear();
        tracing::info!("logged out");
        self.signal.emit(false);
    }

    /// Loads a persisted session at startup.
    ///
    /// A live session is cached and its bearer attached; an expired or
    /// unreadable one is removed. Emits the resulting state either way.
    pub fn restore(&self) -> bool {
        let now = self.clock.now_ms();
        let live = match self.read_store() {
            Some(session) if session.is_live(now) => {
                self.api.set_bearer(Some(session.token.clone()));
                tracing::info!(user_id = %session.user.id, "session restored");
                *lock(&self.cached) = Some(session);
                true
            }
            _ => {
                self.clear();
                false
            }
        };
        self.signal.emit(live);
        live
    }

    /// Clears the message of the last failed login.
    pub fn clear_error(&self) {
        *lock(&self.last_error) = None;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether a live session exists.
    ///
    /// Finding an expired session clears it and emits `false`.
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<Session> {
        let now = self.clock.now_ms();
        let mut cached = lock(&self.cached);
        if cached.is_none() {
            *cached = self.read_store();
        }

        match cached.take() {
            Some(session) if session.is_live(now) => {
                *cached = Some(session.clone());
                Some(session)
            }
            Some(session) => {
                tracing::info!(user_id = %session.user.id, "session expired");
                drop(cached);
                self.clear();
                self.signal.emit(false);
                None
            }
            None => None,
        }
    }

    /// The bearer token of the live session.
    pub fn token(&self) -> Option<String> {
        self.session().map(|session| session.token)
    }

    /// The user of the live session.
    pub fn user(&self) -> Option<User> {
        self.session().map(|session| session.user)
    }

    pub fn state(&self) -> AuthState {
        if self.logging_in.load(Ordering::Acquire) {
            AuthState::Authenticating
        } else if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn is_logging_in(&self) -> bool {
        self.logging_in.load(Ordering::Acquire)
    }

    /// Message of the last failed login.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }

    /// Registers a callback on the auth signal. It is invoked right away
    /// with the current authentication state.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        self.sync_signal();
        self.signal.subscribe(callback)
    }

    /// A receiver of the auth signal, starting from the current
    /// authentication state.
    pub fn watch(&self) -> tokio::sync::watch::Receiver<bool> {
        self.sync_signal();
        self.signal.watch()
    }

    /// Brings the signal in line with the session, which may have been
    /// loaded from the store or expired without an emission.
    fn sync_signal(&self) {
        let live = self.is_authenticated();
        if live != self.signal.current() {
            self.signal.emit(live);
        }
    }

    // -----------------------------------------------------------------------
    // Storage
    // -----------------------------------------------------------------------

    fn read_store(&self) -> Option<Session> {
        let raw = match self.store.load(&self.config.storage_key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored session");
                return None;
            }
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if !session.token.is_empty() && session.expires_at_ms != 0 => Some(session),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable stored session");
                None
            }
        }
    }

    fn persist(&self, session: &Session) {
        let result = serde_json::to_string(session)
            .map_err(|e| SessionError::Storage(e.to_string()))
            .and_then(|json| self.store.save(&self.config.storage_key, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    /// Removes the session from memory and storage and detaches the bearer.
    fn clear(&self) {
        *lock(&self.cached) = None;
        if let Err(e) = self.store.remove(&self.config.storage_key) {
            tracing::warn!(error = %e, "failed to remove stored session");
        }
        self.api.set_bearer(None);
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
