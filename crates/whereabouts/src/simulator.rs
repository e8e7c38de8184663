//! A config-driven stand-in for a real geolocation service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::{Config, SimulatorConfig};
use crate::error::LocationError;
use crate::host::{
    GeolocationHost, HostCoordinates, HostPosition, HostPositionError, HostUpdateSender,
    PositionOptions, WatchId,
};

/// Geolocation host that reports a fixed, configured position.
///
/// When `error_code` is configured every request fails with that code, which
/// is how the CLI demonstrates denied or timed-out requests.
#[derive(Debug)]
pub struct SimulatedGeolocation {
    config: SimulatorConfig,
    interval: Duration,
    next_id: AtomicU64,
    watches: Mutex<HashMap<WatchId, CancellationToken>>,
}

impl SimulatedGeolocation {
    /// Create a simulated host emitting watch updates every `interval`.
    #[must_use]
    pub fn new(config: SimulatorConfig, interval: Duration) -> Self {
        Self {
            config,
            interval,
            next_id: AtomicU64::new(1),
            watches: Mutex::new(HashMap::new()),
        }
    }

    /// Create a simulated host from the application configuration.
    ///
    /// Returns `None` if the simulator is disabled, leaving the host without
    /// any geolocation capability.
    #[must_use]
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .simulator
            .enabled
            .then(|| Self::new(config.simulator.clone(), config.watch_interval()))
    }

    /// Number of watches currently registered.
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.watches.lock().map(|w| w.len()).unwrap_or(0)
    }

    fn fix(config: &SimulatorConfig) -> std::result::Result<HostPosition, HostPositionError> {
        if let Some(code) = config.error_code {
            return Err(HostPositionError::new(
                code,
                LocationError::from_code(code).to_string(),
            ));
        }

        let mut coords = HostCoordinates::new(config.latitude, config.longitude, config.accuracy);
        coords.altitude = config.altitude;
        Ok(HostPosition {
            coords,
            timestamp: Utc::now().timestamp_millis(),
        })
    }
}

#[async_trait::async_trait]
impl GeolocationHost for SimulatedGeolocation {
    fn name(&self) -> &'static str {
        "simulator"
    }

    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> std::result::Result<HostPosition, HostPositionError> {
        trace!(?options, "Simulated position request");
        Self::fix(&self.config)
    }

    fn watch_position(
        &self,
        options: &PositionOptions,
        sender: HostUpdateSender,
    ) -> std::result::Result<WatchId, HostPositionError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            HostPositionError::new(
                LocationError::POSITION_UNAVAILABLE,
                "no async runtime available for watch updates",
            )
        })?;

        let id = WatchId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let token = CancellationToken::new();
        self.watches
            .lock()
            .map_err(|_| {
                HostPositionError::new(
                    LocationError::POSITION_UNAVAILABLE,
                    "watch registry poisoned",
                )
            })?
            .insert(id, token.clone());

        let config = self.config.clone();
        let interval = self.interval;
        debug!(%id, ?options, ?interval, "Simulated watch registered");

        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if sender.send(Self::fix(&config)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            trace!(%id, "Simulated watch finished");
        });

        Ok(id)
    }

    fn clear_watch(&self, id: WatchId) {
        if let Ok(mut watches) = self.watches.lock() {
            if let Some(token) = watches.remove(&id) {
                token.cancel();
                debug!(%id, "Simulated watch cleared");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn host(config: SimulatorConfig) -> SimulatedGeolocation {
        SimulatedGeolocation::new(config, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_current_position_reports_configured_fix() {
        let mut config = SimulatorConfig::default();
        config.altitude = Some(16.0);
        let position = host(config)
            .current_position(&PositionOptions::default())
            .await
            .unwrap();

        assert!((position.coords.latitude - 37.7749).abs() < f64::EPSILON);
        assert!((position.coords.longitude + 122.4194).abs() < f64::EPSILON);
        assert_eq!(position.coords.altitude, Some(16.0));
        assert!(position.timestamp > 0);
    }

    #[tokio::test]
    async fn test_configured_error_code() {
        let config = SimulatorConfig {
            error_code: Some(1),
            ..SimulatorConfig::default()
        };
        let err = host(config)
            .current_position(&PositionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, 1);
        assert!(err.message.contains("denied"));
    }

    #[tokio::test]
    async fn test_watch_emits_until_cleared() {
        let host = host(SimulatorConfig::default());
        let (tx, mut rx) = mpsc::channel(8);

        let id = host.watch_position(&PositionOptions::default(), tx).unwrap();
        assert_eq!(host.active_watches(), 1);

        for _ in 0..3 {
            let update = rx.recv().await.unwrap();
            assert!(update.is_ok());
        }

        host.clear_watch(id);
        assert_eq!(host.active_watches(), 0);

        // Drain whatever was in flight; the channel must close once the task stops
        while rx.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn test_watch_ids_are_distinct() {
        let host = host(SimulatorConfig::default());
        let (tx1, _rx1) = mpsc::channel(1);
        let (tx2, _rx2) = mpsc::channel(1);

        let a = host.watch_position(&PositionOptions::default(), tx1).unwrap();
        let b = host.watch_position(&PositionOptions::default(), tx2).unwrap();
        assert_ne!(a, b);

        host.clear_watch(a);
        host.clear_watch(b);
        host.clear_watch(WatchId(999));
        assert_eq!(host.active_watches(), 0);
    }

    #[test]
    fn test_watch_without_runtime_fails() {
        let host = host(SimulatorConfig::default());
        let (tx, _rx) = mpsc::channel(1);
        let err = host
            .watch_position(&PositionOptions::default(), tx)
            .unwrap_err();
        assert_eq!(err.code, LocationError::POSITION_UNAVAILABLE);
    }

    #[test]
    fn test_from_config_disabled() {
        let mut config = Config::default();
        assert!(SimulatedGeolocation::from_config(&config).is_some());

        config.simulator.enabled = false;
        assert!(SimulatedGeolocation::from_config(&config).is_none());
    }
}
