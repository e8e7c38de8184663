//! Video capture devices from `/sys/class/video4linux`.

use std::io;
use std::path::Path;

use crate::read_attr;

/// Default location of video4linux entries.
pub const VIDEO4LINUX_DIR: &str = "/sys/class/video4linux";

/// A video capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    /// Device node name, e.g. `video0`.
    pub node: String,
    /// Human-readable label reported by the driver.
    pub label: Option<String>,
}

/// List video devices under `dir`, sorted by node name.
///
/// A missing directory means no video devices, not an error.
///
/// # Errors
///
/// Returns an error if `dir` exists but cannot be listed.
pub fn read_video_devices(dir: &Path) -> io::Result<Vec<VideoDevice>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut devices: Vec<VideoDevice> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let node = entry.file_name().to_string_lossy().into_owned();
            node.starts_with("video").then(|| VideoDevice {
                label: read_attr(&entry.path().join("name")),
                node,
            })
        })
        .collect();
    devices.sort_by(|a, b| a.node.cmp(&b.node));
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture_dir;

    #[test]
    fn test_lists_devices_with_labels() {
        let root = fixture_dir("video_list");
        for (node, label) in [("video1", "Integrated IR Camera"), ("video0", "Integrated Camera")] {
            std::fs::create_dir_all(root.join(node)).unwrap();
            std::fs::write(root.join(node).join("name"), format!("{label}\n")).unwrap();
        }
        std::fs::create_dir_all(root.join("v4l-subdev0")).unwrap();

        let devices = read_video_devices(&root).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].node, "video0");
        assert_eq!(devices[0].label.as_deref(), Some("Integrated Camera"));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let devices = read_video_devices(Path::new("/nonexistent/video4linux")).unwrap();
        assert!(devices.is_empty());
    }
}
