//! Location records and the mapping from raw host results.
//!
//! Normalization is a pure pass-through: coordinates are not range-checked, and
//! the only transformation is the host's epoch-millisecond timestamp becoming
//! an ISO-8601 UTC string.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::LocationError;
use crate::host::{HostPosition, HostPositionError};

/// What the host says about itself, copied onto every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    /// User-agent string.
    #[serde(default)]
    pub user_agent: String,
    /// Platform / OS identifier.
    #[serde(default)]
    pub platform: String,
    /// Preferred language tag.
    #[serde(default)]
    pub language: String,
}

/// A normalized location fix.
///
/// Records are immutable once created: storage appends them and never
/// rewrites one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    /// Latitude in decimal degrees.
    #[serde(deserialize_with = "nullable_f64")]
    pub latitude: f64,
    /// Longitude in decimal degrees.
    #[serde(deserialize_with = "nullable_f64")]
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    #[serde(deserialize_with = "nullable_f64")]
    pub accuracy: f64,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Altitude accuracy in meters.
    pub altitude_accuracy: Option<f64>,
    /// Heading in degrees.
    pub heading: Option<f64>,
    /// Speed in meters per second.
    pub speed: Option<f64>,
    /// Capture time, ISO-8601 UTC with millisecond precision.
    pub timestamp: String,
    /// Host snapshot taken at capture time.
    #[serde(flatten)]
    pub environment: EnvironmentSnapshot,
}

impl LocationRecord {
    /// Parse the stored timestamp back into a `DateTime`.
    #[must_use]
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Map a host position into a [`LocationRecord`].
#[must_use]
pub fn normalize_position(
    position: &HostPosition,
    environment: &EnvironmentSnapshot,
) -> LocationRecord {
    let coords = &position.coords;
    LocationRecord {
        latitude: coords.latitude,
        longitude: coords.longitude,
        accuracy: coords.accuracy,
        altitude: coords.altitude,
        altitude_accuracy: coords.altitude_accuracy,
        heading: coords.heading,
        speed: coords.speed,
        timestamp: format_timestamp(position.timestamp),
        environment: environment.clone(),
    }
}

/// Map a host error into its classification.
#[must_use]
pub fn classify_error(error: &HostPositionError) -> LocationError {
    LocationError::from_code(error.code)
}

/// Format an epoch-millisecond timestamp as ISO-8601 UTC (`...T22:13:20.000Z`).
///
/// Timestamps outside chrono's range fall back to the current time.
#[must_use]
pub fn format_timestamp(epoch_millis: i64) -> String {
    let dt = DateTime::<Utc>::from_timestamp_millis(epoch_millis).unwrap_or_else(|| {
        warn!(epoch_millis, "Host timestamp out of range, using current time");
        Utc::now()
    });
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// JSON has no NaN; serialized NaN comes back as `null`.
fn nullable_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
