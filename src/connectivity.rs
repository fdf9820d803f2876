use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Wifi,
    Cellular,
    Ethernet,
    Other,
}

impl Transport {
    /// Transports that count as "online" for fetching news.
    pub fn carries_internet(&self) -> bool {
        matches!(
            self,
            Transport::Wifi | Transport::Cellular | Transport::Ethernet
        )
    }
}

/// Host reachability check consulted before every remote fetch.
pub trait Connectivity: Send + Sync {
    fn active_transports(&self) -> Vec<Transport>;

    fn is_online(&self) -> bool {
        self.active_transports()
            .iter()
            .any(Transport::carries_internet)
    }
}

/// Reports a wired link regardless of host state.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeOnline;

impl Connectivity for AssumeOnline {
    fn active_transports(&self) -> Vec<Transport> {
        vec![Transport::Ethernet]
    }
}

const IFF_UP: u32 = 0x1;

/// Classifies the host's network interfaces from Linux sysfs.
#[derive(Debug, Clone)]
pub struct SysfsConnectivity {
    root: PathBuf,
}

impl Default for SysfsConnectivity {
    fn default() -> Self {
        Self::new("/sys/class/net")
    }
}

impl SysfsConnectivity {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `operstate` is `unknown` for ppp and many wwan links even when they
    /// carry traffic; fall back to IFF_UP in `flags` or an active `carrier`.
    fn is_up(iface: &Path) -> bool {
        let operstate = match fs::read_to_string(iface.join("operstate")) {
            Ok(state) => state,
            Err(_) => return false,
        };
        match operstate.trim() {
            "up" => true,
            "unknown" => {
                let flags_up = fs::read_to_string(iface.join("flags"))
                    .ok()
                    .and_then(|f| u32::from_str_radix(f.trim().trim_start_matches("0x"), 16).ok())
                    .is_some_and(|f| f & IFF_UP != 0);
                let carrier = fs::read_to_string(iface.join("carrier"))
                    .is_ok_and(|c| c.trim() == "1");
                flags_up || carrier
            }
            _ => false,
        }
    }

    fn classify(iface: &Path, name: &str) -> Option<Transport> {
        if name == "lo" {
            return None;
        }

        if !Self::is_up(iface) {
            return None;
        }

        if iface.join("wireless").exists() || iface.join("phy80211").exists() {
            return Some(Transport::Wifi);
        }

        let uevent = fs::read_to_string(iface.join("uevent")).unwrap_or_default();
        let is_wwan = uevent.lines().any(|l| l.trim() == "DEVTYPE=wwan");
        if is_wwan || ["wwan", "rmnet", "ppp"].iter().any(|p| name.starts_with(p)) {
            return Some(Transport::Cellular);
        }

        // ARPHRD_ETHER
        match fs::read_to_string(iface.join("type")) {
            Ok(t) if t.trim() == "1" => Some(Transport::Ethernet),
            _ => Some(Transport::Other),
        }
    }
}

impl Connectivity for SysfsConnectivity {
    fn active_transports(&self) -> Vec<Transport> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                Self::classify(&entry.path(), &name)
            })
            .collect()
    }
}
