//! Network interface hints from `/sys/class/net`.

use std::io;
use std::path::Path;

use crate::read_attr;

/// Default location of network interface entries.
pub const NET_DIR: &str = "/sys/class/net";

/// Coarse classification of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// 802.11 wireless.
    Wifi,
    /// Wired ethernet.
    Ethernet,
    /// Loopback device.
    Loopback,
    /// Anything else (bridges, tunnels, cellular modems).
    Other,
}

impl std::fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wifi => write!(f, "wifi"),
            Self::Ethernet => write!(f, "ethernet"),
            Self::Loopback => write!(f, "loopback"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A network interface as seen in sysfs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    /// Interface name, e.g. `wlan0`.
    pub name: String,
    /// Interface classification.
    pub kind: InterfaceKind,
    /// Whether the kernel reports the link as up.
    pub up: bool,
}

/// List the interfaces under `dir`, sorted by name.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed.
pub fn read_interfaces(dir: &Path) -> io::Result<Vec<NetworkInterface>> {
    let mut interfaces = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };

        let kind = if path.join("wireless").exists() || path.join("phy80211").exists() {
            InterfaceKind::Wifi
        } else {
            // ARPHRD_ETHER = 1, ARPHRD_LOOPBACK = 772
            match read_attr(&path.join("type")).as_deref() {
                Some("772") => InterfaceKind::Loopback,
                Some("1") => InterfaceKind::Ethernet,
                _ => InterfaceKind::Other,
            }
        };
        let up = read_attr(&path.join("operstate")).as_deref() == Some("up");

        interfaces.push(NetworkInterface { name, kind, up });
    }
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(interfaces)
}

/// Pick the connection type the way a browser's network hint would.
///
/// Wifi wins over ethernet when both are up; `None` when nothing besides
/// loopback is up.
#[must_use]
pub fn connection_type(interfaces: &[NetworkInterface]) -> Option<InterfaceKind> {
    let up: Vec<_> = interfaces
        .iter()
        .filter(|i| i.up && i.kind != InterfaceKind::Loopback)
        .collect();

    if up.iter().any(|i| i.kind == InterfaceKind::Wifi) {
        Some(InterfaceKind::Wifi)
    } else if up.iter().any(|i| i.kind == InterfaceKind::Ethernet) {
        Some(InterfaceKind::Ethernet)
    } else if up.is_empty() {
        None
    } else {
        Some(InterfaceKind::Other)
    }
}
