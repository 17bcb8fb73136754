//! TLS wire bodies.
//!
//! `EmwApiEmw.hpp` exposes a TLS surface (`tlsConnect`, `tlsSend`, ...)
//! built directly on the socket command set plus the certificate-upload
//! path `WIFI_EAP_SET_CERT_CMD` already shares with EAP-TLS — there is no
//! separate `ApiId` range for TLS. `tlsConnect`/`tlsSend`/`tlsReceive`/
//! `tlsClose` therefore reuse [`super::socket`]'s `CreateParams`/
//! `AddrParams`/`SendHeader`/`RecvParams` bodies over `SOCKET_CREATE_CMD`/
//! `SOCKET_CONNECT_CMD`/`SOCKET_SEND_CMD`/`SOCKET_RECV_CMD`/
//! `SOCKET_CLOSE_CMD`; this module adds only what is genuinely TLS-specific:
//! the version selector, the certificate/key upload bodies, and the SNI
//! connect body.

use zerocopy::{Immutable, IntoBytes, KnownLayout, TryFromBytes, Unaligned};

use crate::addr::SockAddrStorage;

/// `EmwApiEmw::TlsVersion`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TlsVersion {
    SslV3 = 1,
    TlsV1_0 = 2,
    TlsV1_1 = 3,
    TlsV1_2 = 4,
}

/// Opaque handle returned by `tlsConnect`/`tlsConnectSni`, matching
/// `EmwApiBase::Mtls_t` (a `void *` on the module side, never dereferenced
/// by the host — modelled as an opaque integer here).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlsHandle(pub i32);

pub const MAX_SNI_LEN: usize = 128;

/// `tlsConnectSni`'s server-name-indication request body: the usual
/// create-socket triple plus the destination address and the SNI host
/// name, sent as an extended `SOCKET_CONNECT_CMD`-family command that
/// folds create-with-hint and connect into a single round trip (the SNI
/// string rides after the usual connect parameters).
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct ConnectSniParams {
    domain_le: [u8; 4],
    type_le: [u8; 4],
    protocol_le: [u8; 4],
    pub addr: SockAddrStorage,
    sni: [u8; MAX_SNI_LEN],
}

impl ConnectSniParams {
    pub const WIRE_SIZE: usize = 12 + SockAddrStorage::WIRE_SIZE + MAX_SNI_LEN;

    pub fn new(domain: i32, kind: i32, protocol: i32, addr: SockAddrStorage, sni: &str) -> Option<Self> {
        if sni.len() >= MAX_SNI_LEN {
            return None;
        }
        let mut buf = [0u8; MAX_SNI_LEN];
        buf[..sni.len()].copy_from_slice(sni.as_bytes());
        Some(Self {
            domain_le: domain.to_le_bytes(),
            type_le: kind.to_le_bytes(),
            protocol_le: protocol.to_le_bytes(),
            addr,
            sni: buf,
        })
    }
}

/// Option name this driver uses with `SOCKET_SETSOCKOPT_CMD` to toggle
/// non-blocking mode on a TLS handle's underlying socket — `tlsSetNonBlocking`
/// has no dedicated command id of its own (see this module's doc comment),
/// so it is modelled as a plain socket option alongside [`crate::addr::SockOpt`].
pub const SO_NONBLOCK: i32 = 0x1009;
