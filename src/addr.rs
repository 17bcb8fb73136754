//! Socket address storage and the small set of BSD-ish constants the
//! socket surface needs.
//!
//! Grounded on `examples/original_source/drivers/emw/EmwAddress.hpp`:
//! the 28-byte `SockAddrStorage_t` generic container, the AF/SOCK/
//! IPPROTO/SOL numeric constants, the `EmwSockOptVal`/`EmwIpOptVal`
//! option id enums, and the IPv6 address-state bitmask.

use bitflags::bitflags;
use zerocopy::{Immutable, IntoBytes, KnownLayout, TryFromBytes, Unaligned};

pub const AF_UNSPEC: u8 = 0;
pub const AF_INET: u8 = 2;
pub const AF_INET6: u8 = 10;

pub const SOCK_STREAM: i32 = 1;
pub const SOCK_DGRAM: i32 = 2;

pub const IPPROTO_IP: i32 = 0;
pub const IPPROTO_TCP: i32 = 6;
pub const IPPROTO_UDP: i32 = 17;

pub const SOL_SOCKET: i32 = 0xFFF;

/// `EmwSockOptVal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum SockOpt {
    Debug = 0x0001,
    AcceptConn = 0x0002,
    ReuseAddr = 0x0004,
    KeepAlive = 0x0008,
    DontRoute = 0x0010,
    Broadcast = 0x0020,
    UseLoopback = 0x0040,
    Linger = 0x0080,
    OobInline = 0x0100,
    ReusePort = 0x0200,
    BlockMode = 0x1000,
    SendBuf = 0x1001,
    SendTimeout = 0x1005,
    RecvTimeout = 0x1006,
    Error = 0x1007,
    Type = 0x1008,
    NoCheck = 0x100A,
}

/// `EmwIpOptVal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum IpOpt {
    AddMembership = 0x0003,
    DropMembership = 0x0004,
    MulticastTtl = 0x0005,
    MulticastIf = 0x0006,
    MulticastLoop = 0x0007,
}

bitflags! {
    /// IPv6 address state bitmask, `EMW_IP6_ADDR_*`. `PREFERRED` and
    /// `DEPRECATED` are themselves composites of `VALID` with an extra bit,
    /// matching the source's layout; `empty()` is the invalid state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[repr(transparent)]
    pub struct Ip6AddrState: u8 {
        const TENTATIVE = 0x08;
        const VALID = 0x10;
        const PREFERRED = 0x30;
        const DEPRECATED = 0x50;
    }
}

impl Ip6AddrState {
    pub fn is_invalid(self) -> bool {
        self.is_empty()
    }

    pub fn is_tentative(self) -> bool {
        self.contains(Self::TENTATIVE)
    }

    pub fn is_valid(self) -> bool {
        self.contains(Self::VALID)
    }

    pub fn is_preferred(self) -> bool {
        self == Self::PREFERRED
    }

    pub fn is_deprecated(self) -> bool {
        self == Self::DEPRECATED
    }
}

/// Generic 28-byte socket address container, laid out exactly like
/// `SockAddrStorage_t`: `length`, `family`, a 2-byte field usually holding
/// the port, and two 12-byte blocks holding either an IPv4 address (first
/// word of `data2`) or an IPv6 address (`data2[4..12] ++ data3[0..8]`).
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SockAddrStorage {
    length: u8,
    family: u8,
    data1: [u8; 2],
    data2: [u8; 12],
    data3: [u8; 12],
}

impl SockAddrStorage {
    pub const WIRE_SIZE: usize = 28;

    pub fn family(&self) -> u8 {
        self.family
    }

    pub fn port(&self) -> u16 {
        u16::from_be_bytes(self.data1)
    }

    /// Builds an IPv4 socket address (`AF_INET`), matching `SockAddrIn_t`'s
    /// layout once projected onto the generic storage.
    pub fn new_v4(port: u16, addr: [u8; 4]) -> Self {
        let mut s = Self {
            length: Self::WIRE_SIZE as u8,
            family: AF_INET,
            data1: port.to_be_bytes(),
            data2: [0; 12],
            data3: [0; 12],
        };
        s.data2[..4].copy_from_slice(&addr);
        s
    }

    pub fn v4_address(&self) -> Option<[u8; 4]> {
        if self.family != AF_INET {
            return None;
        }
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.data2[..4]);
        Some(out)
    }

    /// Builds an IPv6 socket address (`AF_INET6`): the 16 address bytes
    /// span `data2[4..12] ++ data3[0..8]`, matching `SockAddrIn6_t`'s
    /// `flowInfo` (4 bytes, left zero) preceding the address.
    pub fn new_v6(port: u16, addr: [u8; 16]) -> Self {
        let mut s = Self {
            length: Self::WIRE_SIZE as u8,
            family: AF_INET6,
            data1: port.to_be_bytes(),
            data2: [0; 12],
            data3: [0; 12],
        };
        s.data2[4..12].copy_from_slice(&addr[..8]);
        s.data3[0..8].copy_from_slice(&addr[8..16]);
        s
    }

    pub fn v6_address(&self) -> Option<[u8; 16]> {
        if self.family != AF_INET6 {
            return None;
        }
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.data2[4..12]);
        out[8..].copy_from_slice(&self.data3[0..8]);
        Some(out)
    }
}

/// Converts a dotted-decimal IPv4 string into a 4-byte address, matching
/// `EmwAddress::AsciiToNetwork`'s documented role (ASCII on the wire,
/// binary in the API). No allocation; rejects anything but 4 octets.
pub fn ascii_to_ipv4(text: &str) -> Option<[u8; 4]> {
    let mut out = [0u8; 4];
    let mut parts = text.split('.');
    for slot in out.iter_mut() {
        let part = parts.next()?;
        *slot = part.parse::<u8>().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Formats a 4-byte IPv4 address into a caller-supplied ASCII buffer,
/// returning the written slice.
pub fn ipv4_to_ascii<'a>(addr: [u8; 4], buf: &'a mut [u8; 16]) -> &'a str {
    use core::fmt::Write;
    let mut w = heapless::String::<16>::new();
    let _ = write!(w, "{}.{}.{}.{}", addr[0], addr[1], addr[2], addr[3]);
    let n = w.len();
    buf[..n].copy_from_slice(w.as_bytes());
    core::str::from_utf8(&buf[..n]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_round_trips_through_storage() {
        let s = SockAddrStorage::new_v4(443, [192, 168, 1, 1]);
        assert_eq!(s.family(), AF_INET);
        assert_eq!(s.port(), 443);
        assert_eq!(s.v4_address(), Some([192, 168, 1, 1]));
        assert_eq!(s.v6_address(), None);
    }

    #[test]
    fn v6_round_trips_through_storage() {
        let addr = [
            0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
        ];
        let s = SockAddrStorage::new_v6(8080, addr);
        assert_eq!(s.family(), AF_INET6);
        assert_eq!(s.port(), 8080);
        assert_eq!(s.v6_address(), Some(addr));
    }

    #[test]
    fn ascii_ipv4_round_trip() {
        let parsed = ascii_to_ipv4("10.0.0.5").unwrap();
        assert_eq!(parsed, [10, 0, 0, 5]);
        let mut buf = [0u8; 16];
        assert_eq!(ipv4_to_ascii(parsed, &mut buf), "10.0.0.5");
    }

    #[test]
    fn ip6_state_predicates() {
        assert!(Ip6AddrState::PREFERRED.is_valid());
        assert!((Ip6AddrState::TENTATIVE | Ip6AddrState::from_bits_retain(0x02)).is_tentative());
        assert!(Ip6AddrState::empty().is_invalid());
    }
}
