//! Wi-Fi subsystem wire bodies: scan results, connect parameters, soft-AP
//! settings, and link info — grounded on `EmwApiBase.hpp`'s
//! `ApInfo_t`/`ScanResults_t`/`ConnectAttributes_t`/`IpAttributes_t`/
//! `WiFiConnectParams_t`/`SoftApSettings_t`/`WiFiLinkInfo_s`.

use heapless::Vec;
use zerocopy::{Immutable, IntoBytes, KnownLayout, TryFromBytes, Unaligned};

pub const SSID_LEN: usize = 33;
pub const KEY_LEN: usize = 65;
pub const MAC_LEN: usize = 6;
pub const IP_FIELD_LEN: usize = 16;
pub const MAX_SCAN_RESULTS: usize = 10;

/// `EmwApiBase::ScanMode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ScanMode {
    Passive = 0,
    Active = 1,
}

/// `EmwApiBase::WiFiEvent`, carried by `WIFI_STATUS_EVENT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WifiEvent {
    None = 0x00,
    StationDown = 0x01,
    StationUp = 0x02,
    StationGotIp = 0x03,
    SoftApDown = 0x04,
    SoftApUp = 0x05,
}

impl WifiEvent {
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0x00 => Self::None,
            0x01 => Self::StationDown,
            0x02 => Self::StationUp,
            0x03 => Self::StationGotIp,
            0x04 => Self::SoftApDown,
            0x05 => Self::SoftApUp,
            _ => return None,
        })
    }
}

/// One scan result entry: `rssi`, `ssid`, `bssid`, `channel`, `security`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct ApInfo {
    rssi_le: [u8; 4],
    ssid: [u8; SSID_LEN],
    bssid: [u8; MAC_LEN],
    channel_le: [u8; 4],
    security: u8,
}

impl ApInfo {
    pub const WIRE_SIZE: usize = 48;

    pub fn rssi(&self) -> i32 {
        i32::from_le_bytes(self.rssi_le)
    }

    pub fn ssid(&self) -> &str {
        let end = self.ssid.iter().position(|&b| b == 0).unwrap_or(SSID_LEN);
        core::str::from_utf8(&self.ssid[..end]).unwrap_or("")
    }

    pub fn bssid(&self) -> [u8; MAC_LEN] {
        self.bssid
    }

    pub fn channel(&self) -> i32 {
        i32::from_le_bytes(self.channel_le)
    }

    pub fn security(&self) -> u8 {
        self.security
    }
}

/// Parses up to [`MAX_SCAN_RESULTS`] entries from a `WIFI_SCAN_CMD`
/// response body (`{count: u8, ap: ApInfo[]}`), matching
/// `getScanResults`'s "copy at most the caller's requested count, capped
/// by what arrived" behavior.
pub fn parse_scan_results(body: &[u8]) -> Vec<ApInfo, MAX_SCAN_RESULTS> {
    let mut out = Vec::new();
    let Some(&count) = body.first() else {
        return out;
    };
    let entries = core::cmp::min(count as usize, MAX_SCAN_RESULTS);
    for i in 0..entries {
        let start = 1 + i * ApInfo::WIRE_SIZE;
        let end = start + ApInfo::WIRE_SIZE;
        let Some(chunk) = body.get(start..end) else {
            break;
        };
        if let Ok(ap) = ApInfo::try_read_from_bytes(chunk) {
            let _ = out.push(ap);
        }
    }
    out
}

/// `ConnectAttributes_t`: preferred BSSID/channel/security hint for
/// `connectAdvance`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct ConnectAttributes {
    pub bssid: [u8; MAC_LEN],
    pub channel: u8,
    pub security: u8,
}

impl ConnectAttributes {
    pub const WIRE_SIZE: usize = 8;

    pub const fn none() -> Self {
        Self {
            bssid: [0; MAC_LEN],
            channel: 0,
            security: 0,
        }
    }
}

/// `IpAttributes_t`: static IP configuration as dotted-decimal ASCII
/// strings, matching the original's choice to keep this on the wire as
/// text rather than binary.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct IpAttributes {
    ip_address_local: [u8; IP_FIELD_LEN],
    network_mask: [u8; IP_FIELD_LEN],
    gateway_address: [u8; IP_FIELD_LEN],
    dns_server_address: [u8; IP_FIELD_LEN],
}

impl IpAttributes {
    pub const WIRE_SIZE: usize = 64;

    pub const fn dhcp() -> Self {
        Self {
            ip_address_local: [0; IP_FIELD_LEN],
            network_mask: [0; IP_FIELD_LEN],
            gateway_address: [0; IP_FIELD_LEN],
            dns_server_address: [0; IP_FIELD_LEN],
        }
    }

    pub fn set_static(&mut self, ip: &str, mask: &str, gateway: &str, dns: &str) {
        write_ascii_field(&mut self.ip_address_local, ip);
        write_ascii_field(&mut self.network_mask, mask);
        write_ascii_field(&mut self.gateway_address, gateway);
        write_ascii_field(&mut self.dns_server_address, dns);
    }

    pub fn ip_address(&self) -> &str {
        read_ascii_field(&self.ip_address_local)
    }

    pub fn network_mask(&self) -> &str {
        read_ascii_field(&self.network_mask)
    }

    pub fn gateway_address(&self) -> &str {
        read_ascii_field(&self.gateway_address)
    }

    pub fn dns_server_address(&self) -> &str {
        read_ascii_field(&self.dns_server_address)
    }
}

fn write_ascii_field(field: &mut [u8; IP_FIELD_LEN], value: &str) {
    field.fill(0);
    let bytes = value.as_bytes();
    let n = core::cmp::min(bytes.len(), IP_FIELD_LEN - 1);
    field[..n].copy_from_slice(&bytes[..n]);
}

fn read_ascii_field(field: &[u8; IP_FIELD_LEN]) -> &str {
    let end = field.iter().position(|&b| b == 0).unwrap_or(IP_FIELD_LEN);
    core::str::from_utf8(&field[..end]).unwrap_or("")
}

/// `WiFiConnectParams_t`, the `WIFI_CONNECT_CMD` request body.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct WifiConnectParams {
    ssid: [u8; SSID_LEN],
    key: [u8; KEY_LEN],
    key_length_le: [u8; 4],
    use_attribute: u8,
    use_ip: u8,
    attr: ConnectAttributes,
    ip: IpAttributes,
}

impl WifiConnectParams {
    pub const WIRE_SIZE: usize = 176;

    pub fn simple(ssid: &str, key: &str) -> Self {
        let mut p = Self {
            ssid: [0; SSID_LEN],
            key: [0; KEY_LEN],
            key_length_le: (key.len() as u32).to_le_bytes(),
            use_attribute: 0,
            use_ip: 0,
            attr: ConnectAttributes::none(),
            ip: IpAttributes::dhcp(),
        };
        write_ascii_field_sized(&mut p.ssid, ssid);
        write_ascii_field_sized(&mut p.key, key);
        p
    }

    pub fn advance(ssid: &str, key: &str, attr: ConnectAttributes, ip: IpAttributes) -> Self {
        let mut p = Self::simple(ssid, key);
        p.use_attribute = 1;
        p.use_ip = 1;
        p.attr = attr;
        p.ip = ip;
        p
    }
}

fn write_ascii_field_sized<const N: usize>(field: &mut [u8; N], value: &str) {
    field.fill(0);
    let bytes = value.as_bytes();
    let n = core::cmp::min(bytes.len(), N - 1);
    field[..n].copy_from_slice(&bytes[..n]);
}

/// `SoftApSettings_t`, the `WIFI_SOFTAP_START_CMD` request body.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SoftApSettings {
    ssid: [u8; SSID_LEN],
    password: [u8; KEY_LEN],
    pub channel: u8,
    ip: IpAttributes,
}

impl SoftApSettings {
    pub const WIRE_SIZE: usize = 163;

    pub fn new(ssid: &str, password: &str, channel: u8) -> Self {
        let mut s = Self {
            ssid: [0; SSID_LEN],
            password: [0; KEY_LEN],
            channel,
            ip: IpAttributes::dhcp(),
        };
        write_ascii_field_sized(&mut s.ssid, ssid);
        write_ascii_field_sized(&mut s.password, password);
        s
    }
}

/// `WiFiLinkInfo_s`, carried inside the `WIFI_GET_LINKINFO_CMD` response.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct WifiLinkInfo {
    is_connected_le: [u8; 4],
    rssi_le: [u8; 4],
    ssid: [u8; SSID_LEN],
    bssid: [u8; MAC_LEN],
    key: [u8; KEY_LEN],
    channel_le: [u8; 4],
    security: u8,
}

impl WifiLinkInfo {
    pub const WIRE_SIZE: usize = 117;

    pub fn is_connected(&self) -> bool {
        i32::from_le_bytes(self.is_connected_le) > 0
    }

    pub fn rssi(&self) -> i32 {
        i32::from_le_bytes(self.rssi_le)
    }

    pub fn ssid(&self) -> &str {
        let end = self.ssid.iter().position(|&b| b == 0).unwrap_or(SSID_LEN);
        core::str::from_utf8(&self.ssid[..end]).unwrap_or("")
    }

    pub fn channel(&self) -> i32 {
        i32::from_le_bytes(self.channel_le)
    }

    pub fn security(&self) -> u8 {
        self.security
    }
}

/// `{status: i32, info: WiFiLinkInfo}`, the full `WIFI_GET_LINKINFO_CMD`
/// response body.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct WifiGetLinkInfoResponse {
    status_le: [u8; 4],
    pub info: WifiLinkInfo,
}

impl WifiGetLinkInfoResponse {
    pub const WIRE_SIZE: usize = 121;

    pub fn status(&self) -> i32 {
        i32::from_le_bytes(self.status_le)
    }
}

/// `WiFiScanParams_t`, the `WIFI_SCAN_CMD` request body — a bare SSID
/// filter (empty for a passive scan).
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct ScanParams {
    ssid: [u8; SSID_LEN],
}

impl ScanParams {
    pub const WIRE_SIZE: usize = SSID_LEN;

    pub fn new(ssid: Option<&str>) -> Self {
        let mut p = Self { ssid: [0; SSID_LEN] };
        if let Some(ssid) = ssid {
            write_ascii_field_sized(&mut p.ssid, ssid);
        }
        p
    }
}

/// `{status: i32, ip: IpAttributes}`, the `WIFI_GET_IP_CMD` response body.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct WifiGetIpResponse {
    status_le: [u8; 4],
    pub ip: IpAttributes,
}

impl WifiGetIpResponse {
    pub const WIRE_SIZE: usize = 4 + IpAttributes::WIRE_SIZE;

    pub fn status(&self) -> i32 {
        i32::from_le_bytes(self.status_le)
    }
}

/// `WiFiGetIp6StateParams_t`: `{addressSlot, interfaceNum}`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct GetIp6StateParams {
    pub address_slot: u8,
    pub interface_num: u8,
}

impl GetIp6StateParams {
    pub const WIRE_SIZE: usize = 2;

    pub fn new(address_slot: u8, interface_num: u8) -> Self {
        Self { address_slot, interface_num }
    }
}

/// `WiFiGetIp6StateResponseParams_t`: a single address-state byte, see
/// [`crate::addr::Ip6AddrState`].
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct GetIp6StateResponse {
    pub state: u8,
}

impl GetIp6StateResponse {
    pub const WIRE_SIZE: usize = 1;

    pub fn state(&self) -> crate::addr::Ip6AddrState {
        crate::addr::Ip6AddrState::from_bits_retain(self.state)
    }
}

/// `WiFiGetIp6AddrParams_t`: `{addressSlot, interfaceNum}`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct GetIp6AddrParams {
    pub address_slot: u8,
    pub interface_num: u8,
}

impl GetIp6AddrParams {
    pub const WIRE_SIZE: usize = 2;

    pub fn new(address_slot: u8, interface_num: u8) -> Self {
        Self { address_slot, interface_num }
    }
}

/// `{status: i32, ip6: [u8; 16]}`, the `WIFI_GET_IP6_ADDR_CMD` response.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct GetIp6AddrResponse {
    status_le: [u8; 4],
    pub ip6: [u8; 16],
}

impl GetIp6AddrResponse {
    pub const WIRE_SIZE: usize = 4 + 16;

    pub fn status(&self) -> i32 {
        i32::from_le_bytes(self.status_le)
    }
}

pub const PING_HOSTNAME_LEN: usize = 255;
pub const MAX_PING_COUNT: usize = 10;

/// `WiFiPingParams_t`, shared by `WIFI_PING_CMD`/`WIFI_PING6_CMD`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct PingParams {
    hostname: [u8; PING_HOSTNAME_LEN],
    count_le: [u8; 4],
    delay_ms_le: [u8; 4],
}

impl PingParams {
    pub const WIRE_SIZE: usize = PING_HOSTNAME_LEN + 8;

    pub fn new(hostname: &str, count: i32, delay_ms: i32) -> Self {
        let mut p = Self {
            hostname: [0; PING_HOSTNAME_LEN],
            count_le: count.to_le_bytes(),
            delay_ms_le: delay_ms.to_le_bytes(),
        };
        write_ascii_field_sized(&mut p.hostname, hostname);
        p
    }
}

/// `WiFiPingResponseParams_t`: `{numberOf, delaysInMs[10]}`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct PingResponse {
    number_of_le: [u8; 4],
    delays_le: [[u8; 4]; MAX_PING_COUNT],
}

impl PingResponse {
    pub const WIRE_SIZE: usize = 4 + 4 * MAX_PING_COUNT;

    pub fn number_of(&self) -> i32 {
        i32::from_le_bytes(self.number_of_le)
    }

    pub fn delay_ms(&self, index: usize) -> Option<i32> {
        self.delays_le.get(index).map(|b| i32::from_le_bytes(*b))
    }
}

/// `EapAttributes_t`, stripped of the original's raw certificate pointers:
/// certificates are uploaded in advance via `WIFI_EAP_SET_CERT_CMD` and
/// referenced by the module server-side, so only the EAP method selector
/// crosses the wire here.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct EapAttributes {
    pub eap_type: u8,
}

impl EapAttributes {
    pub const WIRE_SIZE: usize = 1;
}

/// `WiFiEapConnectParams_t`, the `WIFI_EAP_CONNECT_CMD` request body.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct EapConnectParams {
    ssid: [u8; 32],
    identity: [u8; 32],
    password: [u8; 64],
    attr_used: u8,
    attr: EapAttributes,
    ip_used: u8,
    ip: IpAttributes,
}

impl EapConnectParams {
    pub const WIRE_SIZE: usize = 32 + 32 + 64 + 1 + EapAttributes::WIRE_SIZE + 1 + IpAttributes::WIRE_SIZE;

    pub fn new(ssid: &str, identity: &str, password: &str, eap_type: u8, ip: Option<IpAttributes>) -> Self {
        let mut p = Self {
            ssid: [0; 32],
            identity: [0; 32],
            password: [0; 64],
            attr_used: 1,
            attr: EapAttributes { eap_type },
            ip_used: u8::from(ip.is_some()),
            ip: ip.unwrap_or_else(IpAttributes::dhcp),
        };
        write_ascii_field_sized(&mut p.ssid, ssid);
        write_ascii_field_sized(&mut p.identity, identity);
        write_ascii_field_sized(&mut p.password, password);
        p
    }
}

/// `WiFiEapSetCertParams_t`'s fixed prefix: `{type, length}`, followed by
/// the certificate/key bytes themselves (the original's trailing
/// `cert[1]` flexible-array idiom — handled the same way
/// [`super::socket::SendHeader`] handles a trailing payload).
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct EapSetCertHeader {
    pub cert_type: u8,
    length_le: [u8; 2],
}

impl EapSetCertHeader {
    pub const WIRE_SIZE: usize = 3;

    pub fn new(cert_type: u8, length: u16) -> Self {
        Self {
            cert_type,
            length_le: length.to_le_bytes(),
        }
    }
}

/// `EmwCoreIpc`'s EAP certificate type selector (`EAP_ROOTCA` and
/// friends).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EapCertType {
    RootCa = 0x01,
    ClientCertificate = 0x02,
    ClientKey = 0x03,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_attributes_round_trip_ascii() {
        let mut ip = IpAttributes::dhcp();
        ip.set_static("192.168.1.10", "255.255.255.0", "192.168.1.1", "8.8.8.8");
        assert_eq!(ip.ip_address(), "192.168.1.10");
        assert_eq!(ip.dns_server_address(), "8.8.8.8");
    }

    #[test]
    fn scan_results_parses_count_and_entries() {
        let mut body = heapless::Vec::<u8, 512>::new();
        body.push(1).unwrap();
        let ap = [0u8; ApInfo::WIRE_SIZE];
        body.extend_from_slice(&ap).unwrap();
        let parsed = parse_scan_results(&body);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn scan_results_caps_at_max() {
        let mut body = heapless::Vec::<u8, 1024>::new();
        body.push(255).unwrap();
        for _ in 0..20 {
            body.extend_from_slice(&[0u8; ApInfo::WIRE_SIZE]).unwrap();
        }
        let parsed = parse_scan_results(&body);
        assert_eq!(parsed.len(), MAX_SCAN_RESULTS);
    }
}
