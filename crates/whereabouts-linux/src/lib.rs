//! Linux-specific device introspection for whereabouts
//!
//! This crate reads what the kernel exposes under `/sys` about batteries,
//! network interfaces and video capture devices. Every reader takes the sysfs
//! class directory as a parameter so it can be pointed at a fixture tree.

#![cfg(target_os = "linux")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod battery;
pub mod network;
pub mod video;

pub use battery::{read_battery, BatteryReading, POWER_SUPPLY_DIR};
pub use network::{connection_type, read_interfaces, InterfaceKind, NetworkInterface, NET_DIR};
pub use video::{read_video_devices, VideoDevice, VIDEO4LINUX_DIR};

/// Initialize Linux-specific components
///
/// # Errors
///
/// Returns an error if initialization fails
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Initializing Linux introspection");
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Read a sysfs attribute, trimming the trailing newline.
pub(crate) fn read_attr(path: &std::path::Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
pub(crate) fn fixture_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "whereabouts_linux_{name}_{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
