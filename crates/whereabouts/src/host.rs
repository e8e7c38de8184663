//! Host geolocation capability.
//!
//! The geolocation capability belongs to whatever hosts whereabouts: a browser,
//! an OS location service, or the [`SimulatedGeolocation`](crate::simulator::SimulatedGeolocation)
//! used by the CLI. This module defines the seam the capture facade talks to and
//! the raw shapes the host hands back before normalization.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Options passed with every position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Ask for the most accurate fix the host can produce.
    pub high_accuracy: bool,
    /// How long the host may take before failing with a timeout.
    pub timeout: Duration,
    /// How old a cached fix the host may return instead of a fresh one.
    pub max_cached_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_cached_age: Duration::from_secs(60),
        }
    }
}

/// Raw coordinates as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostCoordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
    /// Altitude in meters above the WGS84 ellipsoid.
    pub altitude: Option<f64>,
    /// Altitude accuracy in meters.
    pub altitude_accuracy: Option<f64>,
    /// Direction of travel in degrees clockwise from true north.
    pub heading: Option<f64>,
    /// Ground speed in meters per second.
    pub speed: Option<f64>,
}

impl HostCoordinates {
    /// Coordinates with only the mandatory fields set.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
        }
    }
}

/// A position fix as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostPosition {
    /// The coordinates of the fix.
    pub coords: HostCoordinates,
    /// When the fix was acquired, in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// A failed position request as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPositionError {
    /// Host error code (`1` denied, `2` unavailable, `3` timeout).
    pub code: u16,
    /// Host-provided description.
    pub message: String,
}

impl HostPositionError {
    /// Create a host error.
    #[must_use]
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for HostPositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// One update delivered by the host.
pub type HostUpdate = std::result::Result<HostPosition, HostPositionError>;

/// Channel the host pushes watch updates into.
pub type HostUpdateSender = mpsc::Sender<HostUpdate>;

/// Identifier of a registered watch, issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub u64);

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "watch-{}", self.0)
    }
}

/// A host-provided geolocation capability.
#[async_trait::async_trait]
pub trait GeolocationHost: Send + Sync + std::fmt::Debug {
    /// The name of this host (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Request a single position fix.
    ///
    /// # Errors
    ///
    /// Returns the host's error when no fix could be produced.
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> std::result::Result<HostPosition, HostPositionError>;

    /// Register for continuous updates delivered through `sender`.
    ///
    /// Updates keep flowing until [`clear_watch`](Self::clear_watch) is called
    /// with the returned id or the receiving side is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses to register the watch.
    fn watch_position(
        &self,
        options: &PositionOptions,
        sender: HostUpdateSender,
    ) -> std::result::Result<WatchId, HostPositionError>;

    /// Release a watch registration. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);
}
