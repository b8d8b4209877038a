//! Bounded geolocation acquisition for Waypost.
//!
//! The map centers on the user when it can. Getting a position is slow and
//! can fail in several user-visible ways, so this crate wraps whatever
//! the platform provides ([`PositionSource`]) in a [`Locator`] that:
//!
//! - gives up after [`GeoOptions::timeout`] with [`GeoError::Timeout`]
//! - answers from the last fix when it is younger than
//!   [`GeoOptions::maximum_age`], without asking the source
//! - publishes a [`GeoState`] (location, error message, loading) that a
//!   view can render directly
//!
//! Failures here never block the rest of the app: the map just stays
//! where it was.

#![allow(async_fn_in_trait)]

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use waypost_protocol::Clock;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Options for one position request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoOptions {
    /// Longest wait for the source. Default: 30 seconds.
    pub timeout: Duration,
    /// Oldest cached fix still accepted. Default: 10 minutes.
    pub maximum_age: Duration,
    /// Ask the source for its best accuracy. Default: true.
    pub high_accuracy: bool,
}

impl Default for GeoOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            maximum_age: Duration::from_secs(10 * 60),
            high_accuracy: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Positions and errors
// ---------------------------------------------------------------------------

/// A position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    /// Radius of uncertainty in meters, when the source reports one.
    pub accuracy_m: Option<f64>,
    /// When the fix was taken, Unix milliseconds.
    pub timestamp_ms: i64,
}

impl Position {
    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

/// Why a position could not be obtained. Each kind has its own
/// user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    #[error("Доступ к геолокации запрещен.")]
    PermissionDenied,

    #[error("Информация о местоположении недоступна")]
    Unavailable,

    #[error("Время ожидания определения местоположения истекло")]
    Timeout,

    #[error("Геолокация не поддерживается вашим устройством")]
    Unsupported,

    /// Any other platform failure.
    #[error("Не удалось определить местоположение")]
    Unknown,
}

// ---------------------------------------------------------------------------
// PositionSource
// ---------------------------------------------------------------------------

/// Where positions come from: the platform's location service, or a fake
/// in tests.
pub trait PositionSource: Send + Sync + 'static {
    /// Whether the platform offers geolocation at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Acquires a fresh fix. May take arbitrarily long; [`Locator`]
    /// bounds the wait.
    fn current_position(
        &self,
        options: &GeoOptions,
    ) -> impl Future<Output = Result<Position, GeoError>> + Send;
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// What a view renders for geolocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoState {
    /// Last known `(lat, lon)`.
    pub location: Option<(f64, f64)>,
    pub error: Option<String>,
    pub loading: bool,
}

pub struct Locator<S: PositionSource> {
    source: S,
    clock: Arc<dyn Clock>,
    options: GeoOptions,
    last_fix: Mutex<Option<Position>>,
    state: watch::Sender<GeoState>,
}

impl<S: PositionSource> Locator<S> {
    pub fn new(source: S, clock: Arc<dyn Clock>, options: GeoOptions) -> Self {
        let (state, _) = watch::channel(GeoState::default());
        Self {
            source,
            clock,
            options,
            last_fix: Mutex::new(None),
            state,
        }
    }

    pub fn options(&self) -> &GeoOptions {
        &self.options
    }

    pub fn state(&self) -> GeoState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<GeoState> {
        self.state.subscribe()
    }

    /// Obtains the user's position, updating [`GeoState`] either way.
    ///
    /// # Errors
    /// - [`GeoError::Unsupported`] when the source has no geolocation
    /// - [`GeoError::Timeout`] when the source takes longer than
    ///   [`GeoOptions::timeout`]
    /// - whatever the source reports otherwise
    pub async fn request_location(&self) -> Result<Position, GeoError> {
        if !self.source.is_supported() {
            return Err(self.fail(GeoError::Unsupported));
        }

        if let Some(fix) = self.cached_fix() {
            tracing::debug!(age_ms = self.clock.now_ms() - fix.timestamp_ms, "using cached position");
            self.succeed(fix);
            return Ok(fix);
        }

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = tokio::time::timeout(
            self.options.timeout,
            self.source.current_position(&self.options),
        )
        .await
        .unwrap_or(Err(GeoError::Timeout));

        match result {
            Ok(fix) => {
                *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) = Some(fix);
                self.succeed(fix);
                Ok(fix)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Forgets the location, any error and the cached fix.
    pub fn clear_location(&self) {
        *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.state.send_replace(GeoState::default());
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    fn cached_fix(&self) -> Option<Position> {
        let max_age_ms = i64::try_from(self.options.maximum_age.as_millis()).unwrap_or(i64::MAX);
        let now = self.clock.now_ms();
        let last = *self.last_fix.lock().unwrap_or_else(PoisonError::into_inner);
        last.filter(|fix| now.saturating_sub(fix.timestamp_ms) <= max_age_ms)
    }

    fn succeed(&self, fix: Position) {
        self.state.send_replace(GeoState {
            location: Some(fix.coords()),
            error: None,
            loading: false,
        });
    }

    fn fail(&self, error: GeoError) -> GeoError {
        tracing::warn!(%error, "geolocation failed");
        // The last known location stays visible.
        self.state.send_modify(|state| {
            state.error = Some(error.to_string());
            state.loading = false;
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use waypost_protocol::ManualClock;

    use super::*;

    const T0: i64 = 1_700_000_000_000;

    struct FakeSource {
        supported: bool,
        delay: Duration,
        answer: Result<(f64, f64), GeoError>,
        clock: Arc<ManualClock>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn at(lat: f64, lon: f64, clock: Arc<ManualClock>) -> Self {
            Self {
                supported: true,
                delay: Duration::from_millis(10),
                answer: Ok((lat, lon)),
                clock,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PositionSource for FakeSource {
        fn is_supported(&self) -> bool {
            self.supported
        }

        async fn current_position(&self, _options: &GeoOptions) -> Result<Position, GeoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let (lat, lon) = self.answer.clone()?;
            Ok(Position {
                lat,
                lon,
                accuracy_m: Some(12.0),
                timestamp_ms: self.clock.now_ms(),
            })
        }
    }

    fn locator(source: FakeSource, clock: Arc<ManualClock>) -> Locator<FakeSource> {
        Locator::new(source, clock, GeoOptions::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_location_success_updates_state() {
        let clock = Arc::new(ManualClock::new(T0));
        let locator = locator(FakeSource::at(59.9, 30.3, clock.clone()), clock);

        let fix = locator.request_location().await.unwrap();

        assert_eq!(fix.coords(), (59.9, 30.3));
        assert_eq!(
            locator.state(),
            GeoState {
                location: Some((59.9, 30.3)),
                error: None,
                loading: false,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_location_times_out() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut source = FakeSource::at(0.0, 0.0, clock.clone());
        source.delay = Duration::from_secs(31);
        let locator = locator(source, clock);

        let started = tokio::time::Instant::now();
        let err = locator.request_location().await.unwrap_err();

        assert_eq!(err, GeoError::Timeout);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(30) && waited < Duration::from_secs(31));
        let state = locator.state();
        assert!(!state.loading);
        assert_eq!(
            state.error.as_deref(),
            Some("Время ожидания определения местоположения истекло")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_fix_within_maximum_age_skips_source() {
        let clock = Arc::new(ManualClock::new(T0));
        let locator = locator(FakeSource::at(1.0, 2.0, clock.clone()), clock.clone());
        locator.request_location().await.unwrap();

        clock.advance_secs(10 * 60);
        locator.request_location().await.unwrap();
        assert_eq!(locator.source.calls.load(Ordering::SeqCst), 1);

        clock.advance_secs(1);
        locator.request_location().await.unwrap();
        assert_eq!(locator.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_location() {
        let clock = Arc::new(ManualClock::new(T0));
        let locator = locator(FakeSource::at(1.0, 2.0, clock.clone()), clock.clone());
        locator.request_location().await.unwrap();
        clock.advance_secs(3600);

        // Swap in a denying source by rebuilding around the same state.
        let mut denied = FakeSource::at(0.0, 0.0, clock.clone());
        denied.answer = Err(GeoError::PermissionDenied);
        let locator = Locator {
            source: denied,
            ..locator
        };

        let err = locator.request_location().await.unwrap_err();

        assert_eq!(err, GeoError::PermissionDenied);
        let state = locator.state();
        assert_eq!(state.location, Some((1.0, 2.0)));
        assert_eq!(state.error.as_deref(), Some("Доступ к геолокации запрещен."));
    }

    #[tokio::test]
    async fn test_unsupported_source_fails_fast() {
        let clock = Arc::new(ManualClock::new(T0));
        let mut source = FakeSource::at(0.0, 0.0, clock.clone());
        source.supported = false;
        let locator = locator(source, clock);

        assert_eq!(locator.request_location().await, Err(GeoError::Unsupported));
        assert_eq!(locator.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_location_forgets_cached_fix() {
        let clock = Arc::new(ManualClock::new(T0));
        let locator = locator(FakeSource::at(1.0, 2.0, clock.clone()), clock);
        locator.request_location().await.unwrap();

        locator.clear_location();
        assert_eq!(locator.state(), GeoState::default());

        locator.request_location().await.unwrap();
        assert_eq!(locator.source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let messages: std::collections::HashSet<String> = [
            GeoError::PermissionDenied,
            GeoError::Unavailable,
            GeoError::Timeout,
            GeoError::Unsupported,
            GeoError::Unknown,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(messages.len(), 5);
    }
}
