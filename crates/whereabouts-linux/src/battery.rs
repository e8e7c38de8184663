//! Battery state from `/sys/class/power_supply`.

use std::io;
use std::path::Path;

use tracing::trace;

use crate::read_attr;

/// Default location of power supply entries.
pub const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

/// A single battery reading.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryReading {
    /// Supply name, e.g. `BAT0`.
    pub name: String,
    /// Charge level between 0.0 and 1.0, if reported.
    pub level: Option<f64>,
    /// Whether the battery is charging or full on external power.
    pub charging: bool,
    /// Raw kernel status string.
    pub status: String,
}

/// Read the first battery found under `dir`.
///
/// Returns `Ok(None)` when the directory exists but holds no battery
/// (desktops, most VMs).
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed.
pub fn read_battery(dir: &Path) -> io::Result<Option<BatteryReading>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        if read_attr(&path.join("type")).as_deref() != Some("Battery") {
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let level = read_attr(&path.join("capacity"))
            .and_then(|c| c.parse::<f64>().ok())
            .map(|pct| (pct / 100.0).clamp(0.0, 1.0));
        let status = read_attr(&path.join("status")).unwrap_or_else(|| "Unknown".to_string());
        let charging = matches!(status.as_str(), "Charging" | "Full");

        trace!(name = %name, ?level, status = %status, "Found battery");
        return Ok(Some(BatteryReading {
            name,
            level,
            charging,
            status,
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture_dir;

    fn write_supply(root: &Path, name: &str, kind: &str, attrs: &[(&str, &str)]) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("type"), format!("{kind}\n")).unwrap();
        for (key, value) in attrs {
            std::fs::write(dir.join(key), format!("{value}\n")).unwrap();
        }
    }

    #[test]
    fn test_reads_discharging_battery() {
        let root = fixture_dir("battery_discharging");
        write_supply(&root, "AC", "Mains", &[("online", "0")]);
        write_supply(
            &root,
            "BAT0",
            "Battery",
            &[("capacity", "73"), ("status", "Discharging")],
        );

        let reading = read_battery(&root).unwrap().unwrap();
        assert_eq!(reading.name, "BAT0");
        assert_eq!(reading.level, Some(0.73));
        assert!(!reading.charging);
        assert_eq!(reading.status, "Discharging");
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_full_counts_as_charging() {
        let root = fixture_dir("battery_full");
        write_supply(&root, "BAT1", "Battery", &[("capacity", "100"), ("status", "Full")]);

        let reading = read_battery(&root).unwrap().unwrap();
        assert!(reading.charging);
        assert_eq!(reading.level, Some(1.0));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_no_battery() {
        let root = fixture_dir("battery_none");
        write_supply(&root, "AC", "Mains", &[]);
        assert!(read_battery(&root).unwrap().is_none());
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(read_battery(Path::new("/nonexistent/power_supply")).is_err());
    }
}
