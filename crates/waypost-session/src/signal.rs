//! The authenticated/unauthenticated signal.
//!
//! Two ways to listen:
//! - [`AuthSignal::subscribe`] for synchronous callbacks (UI glue). The
//!   callback sees the current value immediately, then every emission.
//! - [`AuthSignal::watch`] for async consumers, via a `tokio::sync::watch`
//!   receiver that always holds the latest value.
//!
//! Every emission reaches every callback, even when the value did not
//! change: a login that replaces one session with another is still news.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;

type Callback = Arc<dyn Fn(bool) + Send + Sync>;

struct Listeners {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

struct Inner {
    value: watch::Sender<bool>,
    listeners: Mutex<Listeners>,
}

impl Inner {
    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Broadcasts whether the user is authenticated. Cloning shares the
/// same signal.
#[derive(Clone)]
pub struct AuthSignal {
    inner: Arc<Inner>,
}

impl AuthSignal {
    /// A signal whose current value is `false`.
    pub fn new() -> Self {
        let (value, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                value,
                listeners: Mutex::new(Listeners {
                    next_id: 0,
                    callbacks: Vec::new(),
                }),
            }),
        }
    }

    /// The last emitted value.
    pub fn current(&self) -> bool {
        *self.inner.value.borrow()
    }

    /// Registers `callback` and immediately invokes it with the current
    /// value.
    ///
    /// The callback stays registered until the returned [`Subscription`]
    /// is unsubscribed or dropped.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        let callback: Callback = Arc::new(callback);
        let id = {
            let mut listeners = self.inner.listeners();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.callbacks.push((id, Arc::clone(&callback)));
            id
        };
        callback(self.current());
        Subscription {
            signal: Some(Arc::downgrade(&self.inner)),
            id,
        }
    }

    /// A receiver that observes every value from now on.
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.inner.value.subscribe()
    }

    /// Number of registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners().callbacks.len()
    }

    /// Publishes `authenticated` to every listener.
    pub fn emit(&self, authenticated: bool) {
        self.inner.value.send_replace(authenticated);
        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<Callback> = self
            .inner
            .listeners()
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(authenticated);
        }
    }
}

impl Default for AuthSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuthSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSignal")
            .field("current", &self.current())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to a registered callback.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    signal: Option<Weak<Inner>>,
    id: u64,
}

impl Subscription {
    /// Removes the callback. Calling it again does nothing.
    pub fn unsubscribe(&mut self) {
        let Some(signal) = self.signal.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        signal.listeners().callbacks.retain(|(id, _)| *id != self.id);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
