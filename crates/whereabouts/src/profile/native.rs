//! Introspection of the machine the process runs on.

#[cfg(target_os = "linux")]
use std::path::PathBuf;

use chrono::Local;
#[cfg(target_os = "linux")]
use serde_json::Value;

#[cfg(target_os = "linux")]
use super::fingerprint;
use super::host::IntrospectionHost;
#[cfg(target_os = "linux")]
use super::host::{BatteryInfo, ConnectionInfo, MediaDeviceInfo, MediaDeviceKind};
use super::{Probe, Unavailable};

/// Reads the process environment and, on Linux, sysfs.
///
/// Surfaces that only exist in a browser (screen, plugins, canvas, WebGL,
/// permissions) report not supported.
#[derive(Debug, Clone)]
pub struct NativeHost {
    #[cfg(target_os = "linux")]
    power_supply_dir: PathBuf,
    #[cfg(target_os = "linux")]
    net_dir: PathBuf,
    #[cfg(target_os = "linux")]
    video_dir: PathBuf,
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHost {
    /// Create a host reading the live system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "linux")]
            power_supply_dir: PathBuf::from(whereabouts_linux::POWER_SUPPLY_DIR),
            #[cfg(target_os = "linux")]
            net_dir: PathBuf::from(whereabouts_linux::NET_DIR),
            #[cfg(target_os = "linux")]
            video_dir: PathBuf::from(whereabouts_linux::VIDEO4LINUX_DIR),
        }
    }

    /// Read sysfs classes from `root` instead of `/sys/class`.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn with_sys_class(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            power_supply_dir: root.join("power_supply"),
            net_dir: root.join("net"),
            video_dir: root.join("video4linux"),
        }
    }
}

/// Turn a POSIX locale such as `en_US.UTF-8` into a language tag (`en-US`).
///
/// The `C` and `POSIX` locales carry no language and give `None`.
#[must_use]
pub fn locale_to_language_tag(locale: &str) -> Option<String> {
    let base = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// First locale variable set, in the order the C library consults them.
fn language_from(get: impl Fn(&str) -> Option<String>) -> Probe<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|&name| get(name))
        .map_or(Err(Unavailable::NotSupported), |locale| {
            locale_to_language_tag(&locale).ok_or(Unavailable::Unknown)
        })
}

/// Colon-separated `LANGUAGE` list, falling back to the single language.
fn languages_from(get: impl Fn(&str) -> Option<String> + Copy) -> Probe<Vec<String>> {
    if let Some(list) = get("LANGUAGE") {
        let tags: Vec<String> = list
            .split(':')
            .filter_map(locale_to_language_tag)
            .collect();
        if !tags.is_empty() {
            return Ok(tags);
        }
    }
    language_from(get).map(|tag| vec![tag])
}

#[async_trait::async_trait]
impl IntrospectionHost for NativeHost {
    fn name(&self) -> &'static str {
        "native"
    }

    fn user_agent(&self) -> Probe<String> {
        Ok(format!(
            "whereabouts/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        ))
    }

    fn platform(&self) -> Probe<String> {
        #[cfg(target_os = "linux")]
        {
            Ok(format!(
                "{} {}",
                whereabouts_linux::platform_name(),
                std::env::consts::ARCH
            ))
        }
        #[cfg(not(target_os = "linux"))]
        {
            Ok(format!("{} {}", std::env::consts::OS, std::env::consts::ARCH))
        }
    }

    fn language(&self) -> Probe<String> {
        language_from(env_var)
    }

    fn languages(&self) -> Probe<Vec<String>> {
        languages_from(env_var)
    }

    fn hardware_concurrency(&self) -> Probe<u32> {
        std::thread::available_parallelism()
            .map_err(Unavailable::failed)
            .and_then(|n| u32::try_from(n.get()).map_err(Unavailable::failed))
    }

    fn timezone(&self) -> Probe<String> {
        env_var("TZ")
            .map(|tz| tz.trim_start_matches(':').to_string())
            .ok_or(Unavailable::Unknown)
    }

    fn timezone_offset_minutes(&self) -> Probe<i32> {
        Ok(Local::now().offset().local_minus_utc() / 60)
    }

    #[cfg(target_os = "linux")]
    fn connection(&self) -> Probe<ConnectionInfo> {
        let interfaces =
            whereabouts_linux::read_interfaces(&self.net_dir).map_err(Unavailable::failed)?;
        Ok(ConnectionInfo {
            effective_type: whereabouts_linux::connection_type(&interfaces)
                .map_or_else(|| "none".to_string(), |kind| kind.to_string()),
            downlink_mbps: None,
            rtt_ms: None,
            save_data: false,
        })
    }

    #[cfg(target_os = "linux")]
    async fn battery(&self) -> Probe<BatteryInfo> {
        let reading = whereabouts_linux::read_battery(&self.power_supply_dir)
            .map_err(Unavailable::failed)?
            .ok_or(Unavailable::NotSupported)?;
        Ok(BatteryInfo {
            level: reading.level.ok_or(Unavailable::Unknown)?,
            charging: reading.charging,
            charging_time: None,
            discharging_time: None,
        })
    }

    #[cfg(target_os = "linux")]
    async fn media_devices(&self) -> Probe<Vec<MediaDeviceInfo>> {
        let devices =
            whereabouts_linux::read_video_devices(&self.video_dir).map_err(Unavailable::failed)?;
        Ok(devices
            .into_iter()
            .map(|device| MediaDeviceInfo {
                kind: MediaDeviceKind::VideoInput,
                device_id: fingerprint::value_digest(&Value::from(device.node)),
                label: device.label.unwrap_or_default(),
            })
            .collect())
    }
}
