//! The location capture facade.
//!
//! [`LocationCapture`] forwards requests to the host geolocation capability,
//! normalizes what comes back, appends successful fixes to the
//! [`LocationStore`], and hands the result to the caller. It does not
//! debounce, retry, or rate-limit: every call and every watch update is
//! independent.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::LocationError;
use crate::host::{GeolocationHost, HostPosition, HostPositionError, PositionOptions, WatchId};
use crate::location::{classify_error, normalize_position, EnvironmentSnapshot, LocationRecord};
use crate::storage::LocationStore;

/// Buffered updates per watch before the host side waits on the caller.
const WATCH_BUFFER: usize = 32;

/// Outcome of a single location request or watch update.
pub type CaptureResult = std::result::Result<LocationRecord, LocationError>;

/// Facade over the host geolocation capability.
#[derive(Debug, Clone)]
pub struct LocationCapture {
    geolocation: Option<Arc<dyn GeolocationHost>>,
    store: LocationStore,
    environment: EnvironmentSnapshot,
    options: PositionOptions,
}

impl LocationCapture {
    /// Create a facade. `geolocation` is `None` when the host has no
    /// geolocation capability.
    #[must_use]
    pub fn new(
        geolocation: Option<Arc<dyn GeolocationHost>>,
        store: LocationStore,
        environment: EnvironmentSnapshot,
    ) -> Self {
        Self {
            geolocation,
            store,
            environment,
            options: PositionOptions::default(),
        }
    }

    /// Replace the options sent with every request.
    #[must_use]
    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether the host exposes a geolocation capability.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.geolocation.is_some()
    }

    /// The options sent with every request.
    #[must_use]
    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    /// The store successful captures are appended to.
    #[must_use]
    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    /// Request a single position fix.
    ///
    /// A successful fix is persisted before it is returned. A persistence
    /// failure is logged and does not turn the capture into an error.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::UnsupportedCapability`] if no geolocation
    /// capability is installed, otherwise the classified host error.
    pub async fn capture_location(&self) -> CaptureResult {
        let Some(host) = &self.geolocation else {
            warn!("Geolocation requested but the host does not support it");
            return Err(LocationError::UnsupportedCapability);
        };

        debug!(host = host.name(), options = ?self.options, "Requesting position");
        match host.current_position(&self.options).await {
            Ok(position) => Ok(accept(&self.store, &self.environment, &position)),
            Err(error) => Err(reject(&error)),
        }
    }

    /// Callback form of [`capture_location`](Self::capture_location).
    ///
    /// Exactly one of the two callbacks runs.
    pub async fn capture_location_with<S, E>(&self, on_success: S, on_error: E)
    where
        S: FnOnce(LocationRecord),
        E: FnOnce(LocationError),
    {
        match self.capture_location().await {
            Ok(record) => on_success(record),
            Err(error) => on_error(error),
        }
    }

    /// Subscribe to continuous position updates.
    ///
    /// Every host update goes through the same path as
    /// [`capture_location`](Self::capture_location): fixes are persisted,
    /// errors are classified, and both are forwarded through the returned
    /// subscription. Returns `None` when geolocation is unsupported, when no
    /// async runtime is running, or when the host refuses the registration.
    #[must_use]
    pub fn start_watching(&self) -> Option<WatchSubscription> {
        let Some(host) = self.geolocation.clone() else {
            warn!("Watch requested but the host does not support geolocation");
            return None;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Watch requested outside of an async runtime");
            return None;
        };

        let (host_tx, mut host_rx) = mpsc::channel(WATCH_BUFFER);
        let id = match host.watch_position(&self.options, host_tx) {
            Ok(id) => id,
            Err(error) => {
                warn!(host = host.name(), "Host refused watch registration: {error}");
                return None;
            }
        };

        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let token = CancellationToken::new();
        let task_token = token.clone();
        let store = self.store.clone();
        let environment = self.environment.clone();

        runtime.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = task_token.cancelled() => break,
                    update = host_rx.recv() => {
                        let Some(update) = update else { break };
                        let outcome = match update {
                            Ok(position) => Ok(accept(&store, &environment, &position)),
                            Err(error) => Err(reject(&error)),
                        };
                        if tx.send(outcome).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(%id, "Watch forwarding stopped");
        });

        info!(%id, host = host.name(), "Started watching position");
        Some(WatchSubscription {
            id,
            token,
            host: Some(host),
            updates: rx,
        })
    }

    /// Release a subscription returned by [`start_watching`](Self::start_watching).
    ///
    /// `None` is accepted and ignored.
    pub fn stop_watching(&self, subscription: Option<WatchSubscription>) {
        let Some(mut subscription) = subscription else {
            return;
        };

        subscription.release();
        info!(id = %subscription.id, "Stopped watching position");
    }
}

/// An active continuous-location registration.
///
/// Dropping the subscription has the same effect as
/// [`LocationCapture::stop_watching`]: forwarding stops and the host
/// registration is cleared.
#[derive(Debug)]
pub struct WatchSubscription {
    id: WatchId,
    token: CancellationToken,
    // Taken on release so the host watch is cleared once
    host: Option<Arc<dyn GeolocationHost>>,
    updates: mpsc::Receiver<CaptureResult>,
}

impl WatchSubscription {
    /// The host watch id.
    #[must_use]
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Token cancelled when the subscription is stopped.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the next update. Returns `None` once the watch has ended.
    pub async fn next(&mut self) -> Option<CaptureResult> {
        self.updates.recv().await
    }

    fn release(&mut self) {
        self.token.cancel();
        if let Some(host) = self.host.take() {
            host.clear_watch(self.id);
        }
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

fn accept(
    store: &LocationStore,
    environment: &EnvironmentSnapshot,
    position: &HostPosition,
) -> LocationRecord {
    let record = normalize_position(position, environment);
    match store.save(record.clone()) {
        Ok(entry) => debug!(capture_id = %entry.capture_id, "Captured position"),
        Err(e) => warn!("Captured position could not be persisted: {e}"),
    }
    record
}

fn reject(error: &HostPositionError) -> LocationError {
    let classified = classify_error(error);
    warn!(kind = classified.kind(), "Position request failed: {error}");
    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::error::{Error, Result};
    use crate::config::SimulatorConfig;
    use crate::host::{HostCoordinates, HostUpdate, HostUpdateSender};
    use crate::simulator::SimulatedGeolocation;
    use crate::storage::KeyValueStore;

    /// Geolocation host driven by the test.
    #[derive(Debug, Default)]
    struct ScriptedHost {
        responses: Mutex<VecDeque<HostUpdate>>,
        watcher: Mutex<Option<HostUpdateSender>>,
        cleared: Mutex<Vec<WatchId>>,
        refuse_watch: bool,
    }

    impl ScriptedHost {
        fn with_responses(responses: Vec<HostUpdate>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn sender(&self) -> HostUpdateSender {
            self.watcher.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl GeolocationHost for ScriptedHost {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn current_position(
            &self,
            _options: &PositionOptions,
        ) -> std::result::Result<HostPosition, HostPositionError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(HostPositionError::new(2, "script exhausted")))
        }

        fn watch_position(
            &self,
            _options: &PositionOptions,
            sender: HostUpdateSender,
        ) -> std::result::Result<WatchId, HostPositionError> {
            if self.refuse_watch {
                return Err(HostPositionError::new(1, "denied"));
            }
            *self.watcher.lock().unwrap() = Some(sender);
            Ok(WatchId(41))
        }

        fn clear_watch(&self, id: WatchId) {
            self.cleared.lock().unwrap().push(id);
        }
    }

    /// Backend whose writes always fail.
    #[derive(Debug)]
    struct ReadOnlyBackend;

    impl KeyValueStore for ReadOnlyBackend {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::StorageUnavailable("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    fn fix(latitude: f64, longitude: f64, accuracy: f64, timestamp: i64) -> HostUpdate {
        Ok(HostPosition {
            coords: HostCoordinates::new(latitude, longitude, accuracy),
            timestamp,
        })
    }

    fn environment() -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            user_agent: "test-agent".to_string(),
            platform: "test-platform".to_string(),
            language: "en-GB".to_string(),
        }
    }

    fn facade(host: &Arc<ScriptedHost>) -> LocationCapture {
        let host: Arc<dyn GeolocationHost> = host.clone();
        LocationCapture::new(Some(host), LocationStore::in_memory(), environment())
    }

    #[tokio::test]
    async fn test_capture_normalizes_and_persists() {
        let host = Arc::new(ScriptedHost::with_responses(vec![fix(
            37.7749,
            -122.4194,
            10.0,
            1_700_000_000_000,
        )]));
        let capture = facade(&host);

        let record = capture.capture_location().await.unwrap();
        assert!((record.latitude - 37.7749).abs() < f64::EPSILON);
        assert!((record.longitude + 122.4194).abs() < f64::EPSILON);
        assert!((record.accuracy - 10.0).abs() < f64::EPSILON);
        assert_eq!(record.timestamp, "2023-11-14T22:13:20.000Z");
        assert_eq!(record.environment.language, "en-GB");

        let stored = capture.store().get_all();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].record, record);
    }

    #[tokio::test]
    async fn test_capture_classifies_host_errors() {
        let host = Arc::new(ScriptedHost::with_responses(vec![
            Err(HostPositionError::new(1, "denied")),
            Err(HostPositionError::new(2, "unavailable")),
            Err(HostPositionError::new(3, "timeout")),
            Err(HostPositionError::new(0, "odd")),
        ]));
        let capture = facade(&host);

        assert_eq!(
            capture.capture_location().await,
            Err(LocationError::PermissionDenied)
        );
        assert_eq!(
            capture.capture_location().await,
            Err(LocationError::PositionUnavailable)
        );
        assert_eq!(capture.capture_location().await, Err(LocationError::Timeout));
        assert_eq!(
            capture.capture_location().await,
            Err(LocationError::Unknown { code: 0 })
        );
        assert!(capture.store().get_all().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_calls_only_on_error() {
        let capture = LocationCapture::new(None, LocationStore::in_memory(), environment());
        assert!(!capture.is_supported());

        let mut success_called = false;
        let mut error = None;
        capture
            .capture_location_with(|_| success_called = true, |e| error = Some(e))
            .await;

        assert!(!success_called);
        assert_eq!(error, Some(LocationError::UnsupportedCapability));
    }

    #[tokio::test]
    async fn test_callback_success() {
        let host = Arc::new(ScriptedHost::with_responses(vec![fix(1.0, 2.0, 3.0, 0)]));
        let capture = facade(&host);

        let mut received = None;
        let mut error_called = false;
        capture
            .capture_location_with(|r| received = Some(r), |_| error_called = true)
            .await;

        assert!(!error_called);
        assert!((received.unwrap().longitude - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_concurrent_captures_each_persist() {
        let host = Arc::new(ScriptedHost::with_responses(vec![
            fix(1.0, 1.0, 1.0, 1),
            fix(2.0, 2.0, 2.0, 2),
        ]));
        let capture = facade(&host);

        let (a, b) = tokio::join!(capture.capture_location(), capture.capture_location());
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(capture.store().get_all().len(), 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_swallowed() {
        let host: Arc<dyn GeolocationHost> =
            Arc::new(ScriptedHost::with_responses(vec![fix(1.0, 2.0, 3.0, 0)]));
        let store = LocationStore::new(Arc::new(ReadOnlyBackend));
        let capture = LocationCapture::new(Some(host), store, environment());

        assert!(capture.capture_location().await.is_ok());
        assert!(capture.store().get_all().is_empty());
    }

    #[tokio::test]
    async fn test_with_options() {
        let options = PositionOptions {
            high_accuracy: false,
            ..PositionOptions::default()
        };
        let capture = LocationCapture::new(None, LocationStore::in_memory(), environment())
            .with_options(options);
        assert!(!capture.options().high_accuracy);
    }

    #[tokio::test]
    async fn test_watch_forwards_and_persists_every_update() {
        let host = Arc::new(ScriptedHost::default());
        let capture = facade(&host);

        let mut subscription = capture.start_watching().unwrap();
        assert_eq!(subscription.id(), WatchId(41));

        let sender = host.sender();
        sender.send(fix(1.0, 1.0, 5.0, 1_000)).await.unwrap();
        sender.send(fix(1.0, 1.0, 5.0, 1_000)).await.unwrap();
        sender
            .send(Err(HostPositionError::new(3, "timeout")))
            .await
            .unwrap();

        let first = subscription.next().await.unwrap().unwrap();
        let second = subscription.next().await.unwrap().unwrap();
        let third = subscription.next().await.unwrap();

        // Identical updates are not deduplicated
        assert_eq!(first, second);
        assert_eq!(third, Err(LocationError::Timeout));
        assert_eq!(capture.store().get_all().len(), 2);

        let token = subscription.cancellation_token();
        capture.stop_watching(Some(subscription));
        assert!(token.is_cancelled());
        assert_eq!(*host.cleared.lock().unwrap(), vec![WatchId(41)]);
    }

    #[tokio::test]
    async fn test_watch_ends_when_host_stops() {
        let host = Arc::new(ScriptedHost::default());
        let capture = facade(&host);

        let mut subscription = capture.start_watching().unwrap();
        host.watcher.lock().unwrap().take();

        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn test_watch_unsupported_returns_none() {
        let capture = LocationCapture::new(None, LocationStore::in_memory(), environment());
        assert!(capture.start_watching().is_none());
    }

    #[tokio::test]
    async fn test_watch_refused_returns_none() {
        let host = Arc::new(ScriptedHost {
            refuse_watch: true,
            ..ScriptedHost::default()
        });
        assert!(facade(&host).start_watching().is_none());
    }

    #[test]
    fn test_watch_outside_runtime_returns_none() {
        let host = Arc::new(ScriptedHost::default());
        assert!(facade(&host).start_watching().is_none());
        assert!(host.watcher.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscription_clears_host_watch() {
        let host = Arc::new(ScriptedHost::default());
        let capture = facade(&host);

        let subscription = capture.start_watching().unwrap();
        let token = subscription.cancellation_token();
        drop(subscription);

        assert!(token.is_cancelled());
        assert_eq!(*host.cleared.lock().unwrap(), vec![WatchId(41)]);
    }

    #[tokio::test]
    async fn test_stop_then_drop_clears_once() {
        let host = Arc::new(ScriptedHost::default());
        let capture = facade(&host);

        capture.stop_watching(capture.start_watching());
        capture.stop_watching(capture.start_watching());

        assert_eq!(*host.cleared.lock().unwrap(), vec![WatchId(41), WatchId(41)]);
    }

    #[tokio::test]
    async fn test_dropped_subscriptions_leave_no_simulated_watches() {
        let simulator = Arc::new(SimulatedGeolocation::new(
            SimulatorConfig::default(),
            Duration::from_millis(10),
        ));
        let host: Arc<dyn GeolocationHost> = simulator.clone();
        let capture = LocationCapture::new(Some(host), LocationStore::in_memory(), environment());

        for _ in 0..3 {
            let mut subscription = capture.start_watching().unwrap();
            assert!(subscription.next().await.unwrap().is_ok());
        }
        assert_eq!(simulator.active_watches(), 0);

        let kept = capture.start_watching().unwrap();
        assert_eq!(simulator.active_watches(), 1);
        capture.stop_watching(Some(kept));
        assert_eq!(simulator.active_watches(), 0);
    }

    #[tokio::test]
    async fn test_stop_watching_none_is_noop() {
        let host = Arc::new(ScriptedHost::default());
        facade(&host).stop_watching(None);
        assert!(host.cleared.lock().unwrap().is_empty());
    }
}
