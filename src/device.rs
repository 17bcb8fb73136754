//! Cached device state: firmware/product identity, MAC addresses, IP
//! configuration, per-interface link state, and the scan result cache.
//!
//! Grounded on `EmwApiCore::SystemInformations_s`/`StationSettings_s`/
//! `Runtime_s::scanResults` — mutated only through the driver API
//! (single-writer: the receive/IO paths update only their own fields),
//! visible to callers as read-only snapshots.

use heapless::{String, Vec};

use crate::addr::Ip6AddrState;
use crate::commands::wifi::{ApInfo, MAX_SCAN_RESULTS};
use crate::commands::Interface;

/// `EmwApiBase::EmwWiFiLinkState`, derived from `WIFI_STATUS_EVENT`
/// payloads rather than carried on the wire directly — `EmwApiCore` keeps
/// exactly this derived enum per interface (station/softap) to answer
/// `isConnected`/`getLinkInfo` without a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    GotIp,
}

impl LinkState {
    /// Folds a `WIFI_STATUS_EVENT` payload's `event` byte into the next
    /// link state, matching `WifiEvent`'s station/soft-AP up/down/got-ip
    /// transitions.
    pub fn apply(self, event: crate::commands::wifi::WifiEvent) -> Self {
        use crate::commands::wifi::WifiEvent as E;
        match event {
            E::None => self,
            E::StationDown | E::SoftApDown => Self::Disconnected,
            E::StationUp | E::SoftApUp => Self::Connected,
            E::StationGotIp => Self::GotIp,
        }
    }
}

/// Fixed-size MAC address, used for both station and soft-AP interfaces.
pub type MacAddress = [u8; 6];

/// `EmwApiCore::SystemInformations_s`: product identity plus both
/// interfaces' MAC addresses, populated during `initialize()`.
#[derive(Debug, Clone, Default)]
pub struct SystemInfo {
    pub product_name: String<16>,
    pub product_identifier: String<12>,
    pub firmware_revision: String<24>,
    pub station_mac: MacAddress,
    pub softap_mac: MacAddress,
}

/// `EmwApiCore::StationSettings_s`'s IP-related fields: current address,
/// mask, gateway, DNS (IPv4) plus up to three IPv6 slots with their
/// address-state bitmask.
#[derive(Debug, Clone, Default)]
pub struct IpInfo {
    pub ip_address: [u8; 4],
    pub ip_mask: [u8; 4],
    pub gateway_address: [u8; 4],
    pub dns: [u8; 4],
    pub ipv6_state: [Ip6AddrState; 3],
    pub ipv6_address: [[u8; 16]; 3],
}

/// Full device state cache: identity, per-interface link state, IP
/// configuration, and the most recent scan results. One instance per
/// driver; see [`crate::api::Driver`].
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub system: SystemInfo,
    pub station_link: LinkState,
    pub softap_link: LinkState,
    pub ip: IpInfo,
    pub scan_cache: ScanCache,
}

impl DeviceState {
    pub const fn new() -> Self {
        Self {
            system: SystemInfo {
                product_name: String::new(),
                product_identifier: String::new(),
                firmware_revision: String::new(),
                station_mac: [0; 6],
                softap_mac: [0; 6],
            },
            station_link: LinkState::Disconnected,
            softap_link: LinkState::Disconnected,
            ip: IpInfo {
                ip_address: [0; 4],
                ip_mask: [0; 4],
                gateway_address: [0; 4],
                dns: [0; 4],
                ipv6_state: [Ip6AddrState::empty(); 3],
                ipv6_address: [[0; 16]; 3],
            },
            scan_cache: ScanCache::new(),
        }
    }

    /// Mirrors `toIpcInterface`/the per-interface link-state selector: the
    /// station and soft-AP caches are distinct fields, not an array, since
    /// there are exactly two logical interfaces.
    pub fn link_state(&self, interface: Interface) -> LinkState {
        match interface {
            Interface::Station => self.station_link,
            Interface::SoftAp => self.softap_link,
        }
    }

    pub fn set_link_state(&mut self, interface: Interface, state: LinkState) {
        match interface {
            Interface::Station => self.station_link = state,
            Interface::SoftAp => self.softap_link = state,
        }
    }

    pub fn mac(&self, interface: Interface) -> MacAddress {
        match interface {
            Interface::Station => self.system.station_mac,
            Interface::SoftAp => self.system.softap_mac,
        }
    }
}

/// `EmwApiBase::ScanResults_t`: a fixed-size array of at least 10 entries,
/// populated wholesale on the response to `WIFI_SCAN_CMD` and read back by
/// count via `getScanResults`.
#[derive(Debug, Clone, Default)]
pub struct ScanCache {
    entries: Vec<ScanEntry, MAX_SCAN_RESULTS>,
}

/// An owned copy of one scan result, decoded out of the wire [`ApInfo`]
/// (which borrows from the response buffer and cannot outlive it).
#[derive(Debug, Clone, Copy)]
pub struct ScanEntry {
    pub rssi: i32,
    pub ssid: String<33>,
    pub bssid: [u8; 6],
    pub channel: i32,
    pub security: u8,
}

impl From<&ApInfo> for ScanEntry {
    fn from(ap: &ApInfo) -> Self {
        Self {
            rssi: ap.rssi(),
            ssid: String::try_from(ap.ssid()).unwrap_or_default(),
            bssid: ap.bssid(),
            channel: ap.channel(),
            security: ap.security(),
        }
    }
}

impl ScanCache {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Replaces the cache wholesale with a freshly parsed scan response,
    /// matching `getScanResults`'s "populated on the response" rule — a
    /// scan with fewer APs than the previous one must not leave stale
    /// entries visible.
    pub fn replace(&mut self, results: &[ApInfo]) {
        self.entries.clear();
        for ap in results {
            if self.entries.push(ScanEntry::from(ap)).is_err() {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies out at most `max` entries, matching
    /// `EmwApiCore::getScanResults`'s `min(count, number)` behavior.
    pub fn copy_out(&self, max: usize) -> Vec<ScanEntry, MAX_SCAN_RESULTS> {
        let n = core::cmp::min(max, self.entries.len());
        let mut out = Vec::new();
        for entry in self.entries.iter().take(n) {
            let _ = out.push(*entry);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_state_folds_events() {
        use crate::commands::wifi::WifiEvent;
        let s = LinkState::Disconnected;
        assert_eq!(s.apply(WifiEvent::StationUp), LinkState::Connected);
        assert_eq!(s.apply(WifiEvent::StationGotIp), LinkState::GotIp);
        assert_eq!(LinkState::Connected.apply(WifiEvent::StationDown), LinkState::Disconnected);
    }

    #[test]
    fn scan_cache_copy_out_caps_at_requested_count() {
        let mut cache = ScanCache::new();
        let raw = [0u8; ApInfo::WIRE_SIZE * 2];
        let ap: ApInfo = zerocopy::TryFromBytes::try_read_from_bytes(&raw[..ApInfo::WIRE_SIZE]).unwrap();
        cache.replace(&[ap, ap]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.copy_out(1).len(), 1);
        assert_eq!(cache.copy_out(10).len(), 2);
    }

    #[test]
    fn scan_cache_replace_clears_stale_entries() {
        let mut cache = ScanCache::new();
        let raw = [0u8; ApInfo::WIRE_SIZE];
        let ap: ApInfo = zerocopy::TryFromBytes::try_read_from_bytes(&raw[..]).unwrap();
        cache.replace(&[ap, ap, ap]);
        assert_eq!(cache.len(), 3);
        cache.replace(&[ap]);
        assert_eq!(cache.len(), 1);
    }
}
