//! The host bridge: capabilities the messenger injects into the mini-app.
//!
//! Waypost doesn't implement the bridge; the host does. The core only
//! consumes it through the [`HostBridge`] trait, and learns about it
//! through a [`BridgeSlot`], which starts out empty ("not yet available")
//! and is filled once the host signals readiness.
//!
//! Code that needs the bridge either checks [`BridgeSlot::current`]
//! (synchronous, may be `None`) or awaits [`BridgeSlot::ready`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::{LaunchData, LaunchError};

// ---------------------------------------------------------------------------
// Haptics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpactStyle {
    Light,
    Medium,
    Heavy,
    Rigid,
    Soft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Success,
    Warning,
}

/// A haptic feedback request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Haptic {
    Impact(ImpactStyle),
    Notification(NotificationKind),
    SelectionChanged,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Named host events a mini-app can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BridgeEvent {
    BackButtonPressed,
    Close,
    OpenLink,
    /// Any other event, by its host name.
    Other(String),
}

impl BridgeEvent {
    /// The host's name for this event.
    pub fn name(&self) -> &str {
        match self {
            Self::BackButtonPressed => "WebAppBackButtonPressed",
            Self::Close => "WebAppClose",
            Self::OpenLink => "WebAppOpenLink",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for BridgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Callback invoked with the event's JSON payload (`Null` if none).
pub type BridgeCallback = Box<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Handle returned by [`HostBridge::subscribe`].
///
/// Calling [`unsubscribe`](Self::unsubscribe) more than once is a no-op.
/// Dropping the handle does NOT unsubscribe, matching the host's
/// "returns an unsubscribe function" contract.
pub struct Unsubscribe(Option<Box<dyn FnOnce() + Send>>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// A handle with nothing to undo.
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn unsubscribe(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.0.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// HostBridge
// ---------------------------------------------------------------------------

/// The capability surface the host exposes.
///
/// `Send + Sync + 'static` so a single bridge can be shared through an
/// `Arc` by every component that needs it.
pub trait HostBridge: Send + Sync + 'static {
    /// The raw, signed launch string. `None` if the host gave none.
    fn launch_data(&self) -> Option<String>;

    /// The host's parsed view of the launch string. Not verified.
    fn launch_data_unsafe(&self) -> Option<LaunchData>;

    /// Opens an external or deep link.
    fn open_link(&self, url: &str);

    /// Triggers haptic feedback. Hosts without haptics ignore it.
    fn haptic(&self, feedback: Haptic);

    /// Subscribes to a named host event.
    fn subscribe(&self, event: BridgeEvent, callback: BridgeCallback) -> Unsubscribe;
}

// ---------------------------------------------------------------------------
// BridgeSlot
// ---------------------------------------------------------------------------

type SharedBridge = Arc<dyn HostBridge>;

/// Holds the host bridge once it exists.
///
/// Built on a `watch` channel, so waiting for readiness is event-driven:
/// [`ready`](Self::ready) wakes as soon as [`install`](Self::install) runs.
pub struct BridgeSlot {
    tx: watch::Sender<Option<SharedBridge>>,
}

impl BridgeSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Creates a slot that is already filled.
    pub fn with(bridge: SharedBridge) -> Self {
        let slot = Self::new();
        slot.install(bridge);
        slot
    }

    /// Makes the bridge available and wakes every waiter.
    pub fn install(&self, bridge: SharedBridge) {
        self.tx.send_replace(Some(bridge));
        tracing::debug!("host bridge installed");
    }

    /// Removes the bridge (host detached).
    pub fn uninstall(&self) {
        self.tx.send_replace(None);
    }

    /// The bridge, if it is available right now.
    pub fn current(&self) -> Option<SharedBridge> {
        self.tx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Waits until a bridge is installed.
    ///
    /// # Errors
    /// [`LaunchError::BridgeUnavailable`] if the slot is dropped first.
    pub async fn ready(&self) -> Result<SharedBridge, LaunchError> {
        let mut rx = self.tx.subscribe();
        let bridge = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| LaunchError::BridgeUnavailable)?
            .clone();
        bridge.ok_or(LaunchError::BridgeUnavailable)
    }

    /// Like [`ready`](Self::ready), but gives up after `timeout`.
    ///
    /// # Errors
    /// [`LaunchError::BridgeUnavailable`] if no bridge arrives in time.
    pub async fn ready_within(&self, timeout: Duration) -> Result<SharedBridge, LaunchError> {
        tokio::time::timeout(timeout, self.ready())
            .await
            .map_err(|_| LaunchError::BridgeUnavailable)?
    }
}

impl Default for BridgeSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BridgeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeSlot")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct FakeBridge {
        opened: Mutex<Vec<String>>,
    }

    impl HostBridge for FakeBridge {
        fn launch_data(&self) -> Option<String> {
            Some("a=1".into())
        }
        fn launch_data_unsafe(&self) -> Option<LaunchData> {
            None
        }
        fn open_link(&self, url: &str) {
            self.opened.lock().unwrap().push(url.to_string());
        }
        fn haptic(&self, _feedback: Haptic) {}
        fn subscribe(&self, _event: BridgeEvent, _callback: BridgeCallback) -> Unsubscribe {
            Unsubscribe::noop()
        }
    }

    #[test]
    fn test_slot_starts_not_ready() {
        let slot = BridgeSlot::new();
        assert!(!slot.is_ready());
        assert!(slot.current().is_none());
    }

    #[test]
    fn test_install_then_uninstall() {
        let slot = BridgeSlot::new();
        slot.install(Arc::new(FakeBridge::default()));
        assert!(slot.is_ready());
        slot.uninstall();
        assert!(!slot.is_ready());
    }

    #[tokio::test]
    async fn test_ready_resolves_when_installed_later() {
        let slot = Arc::new(BridgeSlot::new());
        let waiter = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move { slot.ready().await.map(|b| b.launch_data()) })
        };
        tokio::task::yield_now().await;
        slot.install(Arc::new(FakeBridge::default()));

        let launch = waiter.await.unwrap().unwrap();
        assert_eq!(launch.as_deref(), Some("a=1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_within_times_out_without_bridge() {
        let slot = BridgeSlot::new();
        let result = slot.ready_within(Duration::from_secs(3)).await;
        assert!(matches!(result, Err(LaunchError::BridgeUnavailable)));
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handle = {
            let calls = Arc::clone(&calls);
            Unsubscribe::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        handle.unsubscribe();
        handle.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bridge_event_names() {
        assert_eq!(BridgeEvent::BackButtonPressed.name(), "WebAppBackButtonPressed");
        assert_eq!(BridgeEvent::Other("X".into()).to_string(), "X");
    }
}
