//! API identifier enumeration and the typed wire bodies carried behind
//! the 6-byte IPC header, grouped by subsystem.
//!
//! Grounded on `examples/original_source/drivers/emw/EmwCoreIpc.hpp`'s
//! `ApiId` enum (including the `SYS_CFG_SERVER_START/STOP`,
//! `SOCKET_SELECT`, `SOCKET_GETSOCKNAME`, `SOCKET_GETPEERNAME`
//! supplements not present in the distilled command table) and
//! `EmwApiBase.hpp`'s parameter structs.

pub mod bypass;
pub mod events;
pub mod socket;
pub mod system;
pub mod tls;
pub mod wifi;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Every command identifier the module accepts. Event identifiers (high
/// bit set) are listed separately in [`events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum ApiId {
    SysEcho = 0x0001,
    SysReboot = 0x0002,
    SysVersion = 0x0003,
    SysReset = 0x0004,
    SysFotaStart = 0x0005,
    SysCfgServerStart = 0x0006,
    SysCfgServerStop = 0x0007,

    WifiGetMac = 0x0101,
    WifiScan = 0x0102,
    WifiConnect = 0x0103,
    WifiDisconnect = 0x0104,
    WifiSoftApStart = 0x0105,
    WifiSoftApStop = 0x0106,
    WifiGetIp = 0x0107,
    WifiGetLinkInfo = 0x0108,
    WifiPsOn = 0x0109,
    WifiPsOff = 0x010A,
    WifiPing = 0x010B,
    WifiBypassSet = 0x010C,
    WifiBypassGet = 0x010D,
    WifiBypassOut = 0x010E,
    WifiEapSetCert = 0x010F,
    WifiEapConnect = 0x0110,
    WifiWpsConnect = 0x0111,
    WifiWpsStop = 0x0112,
    WifiGetIp6State = 0x0113,
    WifiGetIp6Addr = 0x0114,
    WifiGetSoftMac = 0x0115,
    WifiPing6 = 0x0118,

    SocketCreate = 0x0201,
    SocketConnect = 0x0202,
    SocketSend = 0x0203,
    SocketSendTo = 0x0204,
    SocketRecv = 0x0205,
    SocketRecvFrom = 0x0206,
    SocketShutdown = 0x0207,
    SocketClose = 0x0208,
    SocketGetSockOpt = 0x0209,
    SocketSetSockOpt = 0x020A,
    SocketBind = 0x020B,
    SocketListen = 0x020C,
    SocketAccept = 0x020D,
    SocketSelect = 0x020E,
    SocketGetSockName = 0x020F,
    SocketGetPeerName = 0x0210,
    SocketGetHostByName = 0x0211,
    SocketGetAddrInfo = 0x0212,
}

/// Command identifiers referenced outside this module (the IPC layer
/// tracks power-save state without depending on the full [`ApiId`] enum).
pub const WIFI_PS_ON_CMD: u16 = ApiId::WifiPsOn as u16;
pub const WIFI_PS_OFF_CMD: u16 = ApiId::WifiPsOff as u16;

/// `EmwApiBase::EmwInterface`: soft-AP is index 0, station is index 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Interface {
    SoftAp = 0,
    Station = 1,
}

impl Interface {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::SoftAp),
            1 => Some(Self::Station),
            _ => None,
        }
    }
}
