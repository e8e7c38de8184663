//! Host introspection surfaces.
//!
//! Every surface is optional. The default implementation of each method reports
//! [`Unavailable::NotSupported`], so a host only overrides what it can see.

use serde::{Deserialize, Serialize};

use super::{Probe, Unavailable};
use crate::location::EnvironmentSnapshot;

/// Screen metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenMetrics {
    /// Full width in CSS pixels.
    pub width: u32,
    /// Full height in CSS pixels.
    pub height: u32,
    /// Width excluding OS chrome.
    pub avail_width: u32,
    /// Height excluding OS chrome.
    pub avail_height: u32,
    /// Bits per pixel.
    pub color_depth: u32,
    /// Device pixels per CSS pixel.
    pub pixel_ratio: f64,
}

/// An installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Plugin file name.
    pub filename: String,
    /// Plugin description.
    pub description: String,
}

/// Network connection hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection type or effective type (`wifi`, `ethernet`, `4g`, `none`...).
    pub effective_type: String,
    /// Estimated downlink bandwidth in megabits per second.
    pub downlink_mbps: Option<f64>,
    /// Estimated round-trip time in milliseconds.
    pub rtt_ms: Option<u32>,
    /// Whether the user asked for reduced data usage.
    pub save_data: bool,
}

/// WebGL renderer identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebGlInfo {
    /// GPU vendor string.
    pub vendor: String,
    /// GPU renderer string.
    pub renderer: String,
    /// WebGL version string, if exposed.
    pub version: Option<String>,
}

/// Result of a permission query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    /// Access already granted.
    Granted,
    /// Access refused.
    Denied,
    /// The user would be asked.
    Prompt,
}

/// Battery status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryInfo {
    /// Charge level between 0.0 and 1.0.
    pub level: f64,
    /// Whether the battery is charging.
    pub charging: bool,
    /// Seconds until full, if known.
    pub charging_time: Option<f64>,
    /// Seconds until empty, if known.
    pub discharging_time: Option<f64>,
}

/// Kind of a media device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    /// Microphone or other audio capture.
    AudioInput,
    /// Speaker or headphones.
    AudioOutput,
    /// Camera.
    VideoInput,
}

/// A media device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDeviceInfo {
    /// Device kind.
    pub kind: MediaDeviceKind,
    /// Human-readable label; empty until permission is granted in browsers.
    pub label: String,
    /// Opaque per-origin device id.
    pub device_id: String,
}

/// Read-only introspection surfaces of the host.
#[async_trait::async_trait]
pub trait IntrospectionHost: Send + Sync + std::fmt::Debug {
    /// The name of this host (for logging/debugging).
    fn name(&self) -> &'static str;

    /// User-agent string.
    fn user_agent(&self) -> Probe<String> {
        Err(Unavailable::NotSupported)
    }

    /// Platform identifier.
    fn platform(&self) -> Probe<String> {
        Err(Unavailable::NotSupported)
    }

    /// Preferred language tag.
    fn language(&self) -> Probe<String> {
        Err(Unavailable::NotSupported)
    }

    /// All preferred language tags, most preferred first.
    fn languages(&self) -> Probe<Vec<String>> {
        Err(Unavailable::NotSupported)
    }

    /// Whether cookies are enabled.
    fn cookies_enabled(&self) -> Probe<bool> {
        Err(Unavailable::NotSupported)
    }

    /// Do-Not-Track preference as reported.
    fn do_not_track(&self) -> Probe<String> {
        Err(Unavailable::NotSupported)
    }

    /// Number of logical processors.
    fn hardware_concurrency(&self) -> Probe<u32> {
        Err(Unavailable::NotSupported)
    }

    /// Approximate device memory in gigabytes.
    fn device_memory(&self) -> Probe<f64> {
        Err(Unavailable::NotSupported)
    }

    /// Maximum simultaneous touch points.
    fn max_touch_points(&self) -> Probe<u32> {
        Err(Unavailable::NotSupported)
    }

    /// Screen metrics.
    fn screen(&self) -> Probe<ScreenMetrics> {
        Err(Unavailable::NotSupported)
    }

    /// IANA timezone name.
    fn timezone(&self) -> Probe<String> {
        Err(Unavailable::NotSupported)
    }

    /// Local time minus UTC, in minutes.
    fn timezone_offset_minutes(&self) -> Probe<i32> {
        Err(Unavailable::NotSupported)
    }

    /// Installed plugins.
    fn plugins(&self) -> Probe<Vec<PluginInfo>> {
        Err(Unavailable::NotSupported)
    }

    /// Supported MIME types.
    fn mime_types(&self) -> Probe<Vec<String>> {
        Err(Unavailable::NotSupported)
    }

    /// Network connection hints.
    fn connection(&self) -> Probe<ConnectionInfo> {
        Err(Unavailable::NotSupported)
    }

    /// Raw pixels of a fixed text-and-shapes canvas rendering.
    fn canvas_artifact(&self) -> Probe<Vec<u8>> {
        Err(Unavailable::NotSupported)
    }

    /// Samples of a fixed oscillator rendered offline.
    fn audio_artifact(&self) -> Probe<Vec<f32>> {
        Err(Unavailable::NotSupported)
    }

    /// WebGL renderer identification.
    fn webgl(&self) -> Probe<WebGlInfo> {
        Err(Unavailable::NotSupported)
    }

    /// Query the state of a named permission.
    async fn permission_state(&self, _name: &str) -> Probe<PermissionState> {
        Err(Unavailable::NotSupported)
    }

    /// Query the battery.
    async fn battery(&self) -> Probe<BatteryInfo> {
        Err(Unavailable::NotSupported)
    }

    /// Enumerate media devices.
    async fn media_devices(&self) -> Probe<Vec<MediaDeviceInfo>> {
        Err(Unavailable::NotSupported)
    }

    /// The snapshot copied onto every location record.
    ///
    /// Unavailable fields become their sentinel.
    fn environment(&self) -> EnvironmentSnapshot {
        let flatten = |probe: Probe<String>| probe.unwrap_or_else(|u| u.sentinel().to_string());
        EnvironmentSnapshot {
            user_agent: flatten(self.user_agent()),
            platform: flatten(self.platform()),
            language: flatten(self.language()),
        }
    }
}
