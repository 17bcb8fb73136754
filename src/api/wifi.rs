//! Wi-Fi control surface: scan, connect (simple/advance/EAP/WPS),
//! disconnect, soft-AP start/stop, IP/IPv6 queries, MAC queries, ping,
//! and station power save — each a single blocking [`Driver::call`].
//!
//! Grounded on `EmwApiCore.cpp`'s command sequencing and timeout budget
//! for each operation.

use heapless::Vec;
use zerocopy::{IntoBytes, TryFromBytes};

use crate::addr::Ip6AddrState;
use crate::commands::system::StatusResponse;
use crate::commands::wifi::{
    parse_scan_results, ConnectAttributes, EapConnectParams, EapSetCertHeader, GetIp6AddrParams, GetIp6AddrResponse,
    GetIp6StateParams, GetIp6StateResponse, IpAttributes, PingParams, PingResponse, ScanParams, SoftApSettings,
    WifiConnectParams, WifiEvent as WireWifiEvent, WifiGetIpResponse, WifiGetLinkInfoResponse, MAC_LEN,
    MAX_SCAN_RESULTS,
};
use crate::commands::{ApiId, Interface, WIFI_PS_OFF_CMD, WIFI_PS_ON_CMD};
use crate::config::Config;
use crate::device::{LinkState, MacAddress, ScanEntry};
use crate::error::{DriverError, Result};
use crate::ipc::header::IpcHeader;
use crate::platform::{Platform, RecursiveMutex, Semaphore};
use crate::transport::SpiHal;

use super::Driver;

impl<H, P, C, const N: usize, const CAP: usize> Driver<H, P, C, N, CAP>
where
    H: SpiHal,
    P: Platform,
    C: Config,
{
    /// `WIFI_SCAN_CMD`: requests a scan (optionally filtered by `ssid`),
    /// caches the results, and returns how many were found.
    pub fn scan(&self, ssid: Option<&str>) -> Result<usize> {
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + ScanParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(ScanParams::new(ssid).as_bytes());

        const RESP_SIZE: usize = 1 + MAX_SCAN_RESULTS * 48;
        let mut resp = [0u8; RESP_SIZE];
        let n = self.call(ApiId::WifiScan, &mut cmd, &mut resp, C::SCAN_TIMEOUT_MS)?;

        let results = parse_scan_results(&resp[..n]);
        let count = results.len();
        self.with_state(|state| state.scan_cache.replace(&results));
        Ok(count)
    }

    /// Returns up to `max` entries from the most recent [`scan`](Self::scan).
    pub fn get_scan_results(&self, max: usize) -> Vec<ScanEntry, MAX_SCAN_RESULTS> {
        self.with_state(|state| state.scan_cache.copy_out(max))
    }

    /// `WIFI_CONNECT_CMD` with no BSSID/channel hint and DHCP.
    pub fn connect(&self, ssid: &str, key: &str) -> Result<()> {
        self.connect_request(WifiConnectParams::simple(ssid, key))
    }

    /// `WIFI_CONNECT_CMD` with an explicit BSSID/channel/security hint and
    /// a static IP configuration.
    pub fn connect_advance(&self, ssid: &str, key: &str, attr: ConnectAttributes, ip: IpAttributes) -> Result<()> {
        self.connect_request(WifiConnectParams::advance(ssid, key, attr, ip))
    }

    fn connect_request(&self, params: WifiConnectParams) -> Result<()> {
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + WifiConnectParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; 4];
        let n = self.call(ApiId::WifiConnect, &mut cmd, &mut resp, C::CONNECT_TIMEOUT_MS)?;
        DriverError::from_status(StatusResponse::from_bytes(&resp[..n]).map(|s| s.status()).unwrap_or(-1))
    }

    /// `WIFI_EAP_CONNECT_CMD`: EAP-authenticated station connect.
    pub fn connect_eap(&self, ssid: &str, identity: &str, password: &str, eap_type: u8, ip: Option<IpAttributes>) -> Result<()> {
        let params = EapConnectParams::new(ssid, identity, password, eap_type, ip);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + EapConnectParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; 4];
        let n = self.call(ApiId::WifiEapConnect, &mut cmd, &mut resp, C::CONNECT_TIMEOUT_MS)?;
        DriverError::from_status(StatusResponse::from_bytes(&resp[..n]).map(|s| s.status()).unwrap_or(-1))
    }

    /// `WIFI_EAP_SET_CERT_CMD`: uploads a root CA, client certificate, or
    /// client private key ahead of `connectEap`, keyed by
    /// [`crate::commands::wifi::EapCertType`].
    pub fn eap_set_cert(&self, cert_type: u8, cert: &[u8]) -> Result<()> {
        if cert.len() > C::MAX_CERTIFICATE_LEN {
            return Err(DriverError::ParamError);
        }
        let header = EapSetCertHeader::new(cert_type, cert.len() as u16);
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE + EapSetCertHeader::WIRE_SIZE + 2500];
        let body_start = IpcHeader::WIRE_SIZE;
        cmd[body_start..body_start + EapSetCertHeader::WIRE_SIZE].copy_from_slice(header.as_bytes());
        let cert_start = body_start + EapSetCertHeader::WIRE_SIZE;
        cmd[cert_start..cert_start + cert.len()].copy_from_slice(cert);
        let cmd_len = cert_start + cert.len();
        let mut resp = [0u8; 4];
        let n = self.call(ApiId::WifiEapSetCert, &mut cmd[..cmd_len], &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        DriverError::from_status(StatusResponse::from_bytes(&resp[..n]).map(|s| s.status()).unwrap_or(-1))
    }

    /// `WIFI_WPS_CONNECT_CMD`: push-button WPS station connect, header-only
    /// command (no fixed-shape body beyond the IPC header).
    pub fn connect_wps(&self) -> Result<()> {
        self.no_body_command(ApiId::WifiWpsConnect, C::CONNECT_TIMEOUT_MS)
    }

    pub fn stop_wps(&self) -> Result<()> {
        self.no_body_command(ApiId::WifiWpsStop, C::DEFAULT_TIMEOUT_MS)
    }

    /// `WIFI_DISCONNECT_CMD`.
    pub fn disconnect(&self) -> Result<()> {
        self.no_body_command(ApiId::WifiDisconnect, C::CONNECT_TIMEOUT_MS)
    }

    /// `WIFI_SOFTAP_START_CMD`.
    pub fn start_soft_ap(&self, ssid: &str, password: &str, channel: u8) -> Result<()> {
        let params = SoftApSettings::new(ssid, password, channel);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SoftApSettings::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; 4];
        let n = self.call(ApiId::WifiSoftApStart, &mut cmd, &mut resp, C::SOFTAP_START_TIMEOUT_MS)?;
        DriverError::from_status(StatusResponse::from_bytes(&resp[..n]).map(|s| s.status()).unwrap_or(-1))
    }

    /// `WIFI_SOFTAP_STOP_CMD`.
    pub fn stop_soft_ap(&self) -> Result<()> {
        self.no_body_command(ApiId::WifiSoftApStop, C::DEFAULT_TIMEOUT_MS)
    }

    fn no_body_command(&self, api_id: ApiId, timeout_ms: u32) -> Result<()> {
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; 4];
        let n = self.call(api_id, &mut cmd, &mut resp, timeout_ms)?;
        DriverError::from_status(StatusResponse::from_bytes(&resp[..n]).map(|s| s.status()).unwrap_or(-1))
    }

    /// Cached link state fold, not a round trip: `true` once the interface
    /// has reported `Connected` or `GotIp`.
    pub fn is_connected(&self, interface: Interface) -> bool {
        !matches!(self.link_state(interface), LinkState::Disconnected | LinkState::Connecting)
    }

    /// `WIFI_GET_LINKINFO_CMD`.
    pub fn get_link_info(&self, interface: Interface) -> Result<WifiGetLinkInfoResponse> {
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE + 1];
        cmd[IpcHeader::WIRE_SIZE] = interface as u8;
        let mut resp = [0u8; WifiGetLinkInfoResponse::WIRE_SIZE];
        self.call(ApiId::WifiGetLinkInfo, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        WifiGetLinkInfoResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)
    }

    /// `WIFI_GET_IP_CMD`: refreshes and returns the cached IPv4
    /// configuration.
    pub fn get_ip_address(&self) -> Result<crate::device::IpInfo> {
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; WifiGetIpResponse::WIRE_SIZE];
        self.call(ApiId::WifiGetIp, &mut cmd, &mut resp, C::GET_IP_TIMEOUT_MS)?;
        let parsed = WifiGetIpResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())?;

        let ip = crate::addr::ascii_to_ipv4(parsed.ip.ip_address()).unwrap_or([0; 4]);
        let mask = crate::addr::ascii_to_ipv4(parsed.ip.network_mask()).unwrap_or([0; 4]);
        let gateway = crate::addr::ascii_to_ipv4(parsed.ip.gateway_address()).unwrap_or([0; 4]);
        let dns = crate::addr::ascii_to_ipv4(parsed.ip.dns_server_address()).unwrap_or([0; 4]);
        self.with_state(|state| {
            state.ip.ip_address = ip;
            state.ip.ip_mask = mask;
            state.ip.gateway_address = gateway;
            state.ip.dns = dns;
        });
        Ok(self.ip_info())
    }

    /// `WIFI_GET_IP6_STATE_CMD`.
    pub fn get_ip6_address_state(&self, address_slot: u8, interface: Interface) -> Result<Ip6AddrState> {
        let params = GetIp6StateParams::new(address_slot, interface as u8);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + GetIp6StateParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; GetIp6StateResponse::WIRE_SIZE];
        self.call(ApiId::WifiGetIp6State, &mut cmd, &mut resp, C::GET_IP_TIMEOUT_MS)?;
        let parsed = GetIp6StateResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        let state = parsed.state();
        if (address_slot as usize) < 3 {
            self.with_state(|s| s.ip.ipv6_state[address_slot as usize] = state);
        }
        Ok(state)
    }

    /// `WIFI_GET_IP6_ADDR_CMD`.
    pub fn get_ip6_address(&self, address_slot: u8, interface: Interface) -> Result<[u8; 16]> {
        let params = GetIp6AddrParams::new(address_slot, interface as u8);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + GetIp6AddrParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; GetIp6AddrResponse::WIRE_SIZE];
        self.call(ApiId::WifiGetIp6Addr, &mut cmd, &mut resp, C::GET_IP_TIMEOUT_MS)?;
        let parsed = GetIp6AddrResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())?;
        if (address_slot as usize) < 3 {
            self.with_state(|state| state.ip.ipv6_address[address_slot as usize] = parsed.ip6);
        }
        Ok(parsed.ip6)
    }

    /// Cached station MAC address, populated by [`Driver::initialize`].
    pub fn get_station_mac_address(&self) -> MacAddress {
        self.mac(Interface::Station)
    }

    /// `WIFI_GET_SOFTMAC_CMD`: refreshes and returns the soft-AP MAC
    /// address (not queried eagerly during `initialize`, since a soft-AP
    /// is not brought up automatically).
    pub fn get_softap_mac_address(&self) -> Result<MacAddress> {
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; MAC_LEN];
        let n = self.call(ApiId::WifiGetSoftMac, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        if n < MAC_LEN {
            return Err(DriverError::IoError);
        }
        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&resp[..MAC_LEN]);
        self.with_state(|state| state.system.softap_mac = mac);
        Ok(mac)
    }

    /// `WIFI_PING_CMD`. Returns the round-trip delays reported, in
    /// milliseconds.
    pub fn ping(&self, hostname: &str, count: i32, delay_ms: i32) -> Result<Vec<i32, 10>> {
        self.ping_request(ApiId::WifiPing, hostname, count, delay_ms)
    }

    /// `WIFI_PING6_CMD`.
    pub fn ping6(&self, hostname: &str, count: i32, delay_ms: i32) -> Result<Vec<i32, 10>> {
        self.ping_request(ApiId::WifiPing6, hostname, count, delay_ms)
    }

    fn ping_request(&self, api_id: ApiId, hostname: &str, count: i32, delay_ms: i32) -> Result<Vec<i32, 10>> {
        let params = PingParams::new(hostname, count, delay_ms);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + PingParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; PingResponse::WIRE_SIZE];
        self.call(api_id, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = PingResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        let replies = core::cmp::max(parsed.number_of(), 0) as usize;
        let mut out = Vec::new();
        for i in 0..replies {
            if let Some(delay) = parsed.delay_ms(i) {
                let _ = out.push(delay);
            }
        }
        Ok(out)
    }

    /// `WIFI_PS_ON_CMD`/`WIFI_PS_OFF_CMD`: station power save. [`Ipc`]
    /// tracks the resulting power-save state itself to prepend the wake
    /// packet ahead of the next command while it's enabled.
    ///
    /// [`Ipc`]: crate::ipc::Ipc
    pub fn station_power_save(&self, enable: bool) -> Result<()> {
        let api_id = if enable { WIFI_PS_ON_CMD } else { WIFI_PS_OFF_CMD };
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; 4];
        self.ipc.request(&mut cmd, api_id, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        Ok(())
    }
}

/// Re-exported so callers matching on a [`super::Driver::register_status_callback`]
/// event do not need to reach into `crate::commands::wifi` directly.
pub type WifiStatusEvent = WireWifiEvent;
