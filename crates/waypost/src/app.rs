//! `App` builder and the flows that tie the layers together.
//!
//! This is the entry point for embedding Waypost. It wires:
//! host bridge → launch verifier → session → event feed.

use std::sync::Arc;

use waypost_api::{ApiClient, HttpApi};
use waypost_events::{CancelToken, EventFeed};
use waypost_launch::{
    BridgeSlot, Haptic, HostBridge, ImpactStyle, LaunchError, NotificationKind,
    VerificationResult, Verifier,
};
use waypost_protocol::{Activity, Clock, SystemClock};
use waypost_session::{MemoryStore, Session, SessionError, SessionManager, SessionStore};

use crate::{AppConfig, WaypostError};

// ---------------------------------------------------------------------------
// AppBuilder
// ---------------------------------------------------------------------------

/// Builder for an [`App`].
///
/// # Example
///
/// ```rust,ignore
/// use waypost::prelude::*;
///
/// let app = App::builder()
///     .config(AppConfig::from_env()?)
///     .bridge(host_bridge)
///     .build_http()?;
/// let startup = app.start().await;
/// ```
pub struct AppBuilder {
    config: AppConfig,
    clock: Arc<dyn Clock>,
    bridge: BridgeSlot,
    store: Arc<dyn SessionStore>,
}

impl AppBuilder {
    /// Creates a builder with default settings, the system clock, an
    /// empty bridge slot and an in-memory session store.
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            clock: Arc::new(SystemClock),
            bridge: BridgeSlot::new(),
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Installs the host bridge up front. Hosts that inject it later can
    /// use [`App::bridge`] and [`BridgeSlot::install`] instead.
    pub fn bridge(self, bridge: Arc<dyn HostBridge>) -> Self {
        self.bridge.install(bridge);
        self
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    /// Builds the app on top of `api`.
    pub fn build<A: ApiClient>(self, api: A) -> App<A> {
        let session = Arc::new(SessionManager::with_store(
            Arc::new(api),
            Arc::clone(&self.clock),
            self.store,
            self.config.session.clone(),
        ));
        let feed = EventFeed::new(
            Arc::clone(&session),
            Arc::clone(&self.clock),
            self.config.cache.clone(),
        );
        let verifier = Verifier::with_config(self.clock, self.config.verifier.clone());

        App {
            config: self.config,
            bridge: self.bridge,
            verifier,
            session,
            feed,
        }
    }

    /// Builds the app on the `reqwest` backend client from `config.api`.
    ///
    /// # Errors
    /// [`WaypostError::Api`] if the HTTP client cannot be constructed.
    pub fn build_http(self) -> Result<App<HttpApi>, WaypostError> {
        let api = HttpApi::new(self.config.api.clone())?;
        Ok(self.build(api))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// How [`App::start`] left things.
#[derive(Debug, Clone, PartialEq)]
pub enum Startup {
    /// Launch payload verified and exchanged for a session.
    Authenticated(Session),
    /// Running read-only: public events can be browsed, protected actions
    /// are blocked. `reason` is shown to the user.
    Limited { reason: String },
}

/// A Waypost app instance.
pub struct App<A: ApiClient> {
    config: AppConfig,
    bridge: BridgeSlot,
    verifier: Verifier,
    session: Arc<SessionManager<A>>,
    feed: EventFeed<A>,
}

impl App<HttpApi> {
    /// Starts an [`AppBuilder`]. [`AppBuilder::build`] picks the client
    /// type, so this also serves apps over other [`ApiClient`]s.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }
}

impl<A: ApiClient> App<A> {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bridge(&self) -> &BridgeSlot {
        &self.bridge
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn session(&self) -> &Arc<SessionManager<A>> {
        &self.session
    }

    pub fn feed(&self) -> &EventFeed<A> {
        &self.feed
    }

    /// Startup sequence:
    ///
    /// 1. pick up a persisted session
    /// 2. wait up to `bridge_wait` for the host bridge
    /// 3. verify the launch payload and exchange it for a session
    /// 4. confirm with a soft haptic
    ///
    /// Any failure after step 1 leaves the app in limited mode; nothing
    /// here is fatal.
    pub async fn start(&self) -> Startup {
        self.session.restore();

        let host = match self.bridge.ready_within(self.config.bridge_wait).await {
            Ok(host) => host,
            Err(e) => {
                tracing::warn!(error = %e, "no host bridge, running in limited mode");
                return Startup::Limited {
                    reason: e.to_string(),
                };
            }
        };

        match self.authenticate().await {
            Ok(session) => {
                host.haptic(Haptic::Impact(ImpactStyle::Soft));
                Startup::Authenticated(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "authentication failed, running in limited mode");
                Startup::Limited {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Verifies the host's launch payload once the bridge is available.
    ///
    /// Returns `None` if `cancel` fired while waiting: the owner is gone
    /// and the result must not be applied.
    pub async fn validate_launch(&self, cancel: &CancelToken) -> Option<VerificationResult> {
        if let Err(e) = self.bridge.ready_within(self.config.bridge_wait).await {
            tracing::debug!(error = %e, "validating without a host bridge");
        }
        if cancel.is_cancelled() {
            return None;
        }
        Some(self.verifier.verify_bridge(&self.bridge, self.config.secret()))
    }

    /// Verifies the launch payload, then exchanges it for a session.
    ///
    /// # Errors
    /// - [`WaypostError::Launch`] when the bridge, the payload or the
    ///   secret is missing
    /// - [`WaypostError::Untrusted`] when the signature does not match
    /// - [`WaypostError::SessionExpired`] when the payload is too old
    /// - [`WaypostError::Session`] when the backend exchange fails
    pub async fn authenticate(&self) -> Result<Session, WaypostError> {
        let verdict = self.verifier.verify_bridge(&self.bridge, self.config.secret());
        if !verdict.is_valid {
            return Err(match verdict.error {
                Some(LaunchError::Expired) => WaypostError::SessionExpired,
                Some(e) if e.is_bridge_problem() || e == LaunchError::SecretMissing => e.into(),
                Some(e) => WaypostError::Untrusted(e),
                None => WaypostError::Untrusted(LaunchError::SignatureMismatch),
            });
        }

        let launch = self
            .bridge
            .current()
            .and_then(|host| host.launch_data())
            .ok_or(LaunchError::LaunchDataMissing)?;
        Ok(self.session.login(&launch).await?)
    }

    /// Registers for `activity` by opening its deep link in the host.
    ///
    /// # Errors
    /// - [`WaypostError::ActivityClosed`] when the activity is closed or full
    /// - [`WaypostError::Session`] when no user is signed in
    /// - [`WaypostError::Launch`] when there is no host bridge
    pub fn register(&self, activity: &Activity) -> Result<(), WaypostError> {
        if !activity.is_open() {
            return Err(WaypostError::ActivityClosed(activity.id.clone()));
        }
        let Some(user) = self.session.user() else {
            return Err(SessionError::NotAuthenticated.into());
        };
        let host = self.bridge.current().ok_or(LaunchError::BridgeUnavailable)?;

        host.haptic(Haptic::Notification(NotificationKind::Success));
        host.open_link(&activity.deeplink);
        tracing::info!(user_id = %user.id, event_id = %activity.event_id, "opened registration link");
        Ok(())
    }

    /// Whether the backend is reachable.
    pub async fn health(&self) -> bool {
        self.session.api().health().await
    }
}
