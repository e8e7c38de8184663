//! Device profiling.
//!
//! [`DeviceProfiler`] reads every introspection surface the host offers and
//! assembles one flat [`DeviceProfile`]. Surfaces are read independently and
//! best-effort: a missing or failing surface becomes a sentinel string in
//! the profile, and collecting a profile never fails.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use whereabouts::profile::{DeviceProfiler, NativeHost};
//!
//! # async fn run() {
//! let profiler = DeviceProfiler::new(Arc::new(NativeHost::new()));
//! let profile = profiler.collect().await;
//! println!("{}", profile.get("platform").unwrap());
//! # }
//! ```

pub mod fingerprint;
mod host;
mod native;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

pub use host::{
    BatteryInfo, ConnectionInfo, IntrospectionHost, MediaDeviceInfo, MediaDeviceKind,
    PermissionState, PluginInfo, ScreenMetrics, WebGlInfo,
};
pub use native::{locale_to_language_tag, NativeHost};

/// Sentinel for a surface the host does not have.
pub const NOT_SUPPORTED: &str = "not supported";
/// Sentinel for a surface present but unable to say.
pub const UNKNOWN: &str = "unknown";
/// Sentinel for a surface that failed while being read.
pub const ERROR: &str = "error";

/// Fields left out of [`DeviceProfile::digest`] because they change per call.
const VOLATILE_FIELDS: &[&str] = &["collected_at", "battery"];

/// Why a surface produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unavailable {
    /// The host has no such surface.
    #[error("not supported")]
    NotSupported,
    /// The surface exists but has no value to report.
    #[error("unknown")]
    Unknown,
    /// Reading the surface failed.
    #[error("probe failed: {0}")]
    Failed(String),
}

impl Unavailable {
    /// Create a failure from any displayable error.
    #[must_use]
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed(error.to_string())
    }

    /// The placeholder shown in a profile.
    #[must_use]
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::NotSupported => NOT_SUPPORTED,
            Self::Unknown => UNKNOWN,
            Self::Failed(_) => ERROR,
        }
    }
}

/// Outcome of reading one surface.
pub type Probe<T> = std::result::Result<T, Unavailable>;

/// A flat mapping of surface name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DeviceProfile {
    fields: BTreeMap<String, Value>,
}

impl DeviceProfile {
    /// Value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// All fields, ordered by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the profile has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether a field holds one of the sentinel strings.
    #[must_use]
    pub fn is_sentinel(&self, name: &str) -> bool {
        matches!(
            self.fields.get(name).and_then(Value::as_str),
            Some(NOT_SUPPORTED | UNKNOWN | ERROR)
        )
    }

    /// Number of fields holding a real value.
    #[must_use]
    pub fn revealed_count(&self) -> usize {
        self.fields.keys().filter(|k| !self.is_sentinel(k)).count()
    }

    /// Digest over the stable fields.
    ///
    /// Two collections on the same device give the same digest, which is
    /// what makes the combination of fields identifying.
    #[must_use]
    pub fn digest(&self) -> String {
        let stable: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .filter(|(k, _)| !VOLATILE_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        fingerprint::value_digest(&Value::Object(stable))
    }

    fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    /// Record a probe, flattening failures to their sentinel.
    fn insert_probe<T: Serialize>(&mut self, name: &str, probe: Probe<T>) {
        let value = flatten(name, probe);
        self.insert(name, value);
    }
}

fn flatten<T: Serialize>(name: &str, probe: Probe<T>) -> Value {
    match probe {
        Ok(value) => serde_json::to_value(value).unwrap_or_else(|e| {
            trace!(field = name, "Probe value not serializable: {e}");
            Value::from(ERROR)
        }),
        Err(unavailable) => {
            trace!(field = name, "Probe unavailable: {unavailable}");
            Value::from(unavailable.sentinel())
        }
    }
}

/// Builds [`DeviceProfile`]s from an introspection host.
#[derive(Debug, Clone)]
pub struct DeviceProfiler {
    host: Arc<dyn IntrospectionHost>,
    permissions: Vec<String>,
}

impl DeviceProfiler {
    /// Create a profiler querying the default permission set.
    #[must_use]
    pub fn new(host: Arc<dyn IntrospectionHost>) -> Self {
        Self {
            host,
            permissions: crate::config::ProfileConfig::default().permissions,
        }
    }

    /// Replace the permission names queried.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }

    /// The host being profiled.
    #[must_use]
    pub fn host(&self) -> &Arc<dyn IntrospectionHost> {
        &self.host
    }

    /// Read every surface and assemble a profile.
    ///
    /// Fingerprints are re-derived on every call. The permission, battery,
    /// and media-device queries run concurrently.
    pub async fn collect(&self) -> DeviceProfile {
        let host = &self.host;
        let mut profile = DeviceProfile::default();

        profile.insert_probe("user_agent", host.user_agent());
        profile.insert_probe("platform", host.platform());
        profile.insert_probe("language", host.language());
        profile.insert_probe("languages", host.languages());
        profile.insert_probe("cookies_enabled", host.cookies_enabled());
        profile.insert_probe("do_not_track", host.do_not_track());
        profile.insert_probe("hardware_concurrency", host.hardware_concurrency());
        profile.insert_probe("device_memory", host.device_memory());
        profile.insert_probe("max_touch_points", host.max_touch_points());
        profile.insert_probe("screen", host.screen());
        profile.insert_probe("timezone", host.timezone());
        profile.insert_probe("timezone_offset_minutes", host.timezone_offset_minutes());
        profile.insert_probe("plugins", host.plugins());
        profile.insert_probe("mime_types", host.mime_types());
        profile.insert_probe("connection", host.connection());
        profile.insert_probe(
            "canvas_fingerprint",
            host.canvas_artifact().map(|p| fingerprint::canvas_digest(&p)),
        );
        profile.insert_probe(
            "audio_fingerprint",
            host.audio_artifact().map(|s| fingerprint::audio_digest(&s)),
        );
        profile.insert_probe("webgl", host.webgl());

        let (permissions, battery, media_devices) = tokio::join!(
            self.query_permissions(),
            host.battery(),
            host.media_devices()
        );
        profile.insert("permissions", permissions);
        profile.insert_probe("battery", battery);
        profile.insert_probe("media_devices", media_devices);

        profile.insert(
            "collected_at",
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        debug!(
            host = host.name(),
            fields = profile.len(),
            revealed = profile.revealed_count(),
            "Collected device profile"
        );
        profile
    }

    async fn query_permissions(&self) -> Value {
        let mut states = serde_json::Map::new();
        for name in &self.permissions {
            let state = self.host.permission_state(name).await;
            states.insert(name.clone(), flatten(name, state));
        }
        Value::Object(states)
    }
}
