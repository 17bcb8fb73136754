//! Socket subsystem wire bodies, grounded on
//! `EmwCoreIpc::Socket*Params_s`/`Socket*ResponseParams_s`.
//!
//! Fixed-shape command/response bodies are `zerocopy` packed structs.
//! `send`/`sendto`/`recv`/`recvfrom` carry a variable-length payload
//! after a fixed prefix; those are built/parsed with plain byte-slice
//! helpers instead, since a `zerocopy` struct cannot itself express a
//! trailing slice.

use zerocopy::{Immutable, IntoBytes, KnownLayout, TryFromBytes, Unaligned};

use crate::addr::SockAddrStorage;

#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct CreateParams {
    domain_le: [u8; 4],
    kind_le: [u8; 4],
    protocol_le: [u8; 4],
}

impl CreateParams {
    pub const WIRE_SIZE: usize = 12;

    pub fn new(domain: i32, kind: i32, protocol: i32) -> Self {
        Self {
            domain_le: domain.to_le_bytes(),
            kind_le: kind.to_le_bytes(),
            protocol_le: protocol.to_le_bytes(),
        }
    }
}

#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct FdResponse {
    fd_le: [u8; 4],
}

impl FdResponse {
    pub const WIRE_SIZE: usize = 4;

    pub fn fd(&self) -> i32 {
        i32::from_le_bytes(self.fd_le)
    }
}

#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct StatusResponse {
    status_le: [u8; 4],
}

impl StatusResponse {
    pub const WIRE_SIZE: usize = 4;

    pub fn status(&self) -> i32 {
        i32::from_le_bytes(self.status_le)
    }
}

/// `SocketBindParams_t`/`SocketConnectParams_t`: `{socket, addr, length}`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct AddrParams {
    socket_le: [u8; 4],
    pub addr: SockAddrStorage,
    length_le: [u8; 4],
}

impl AddrParams {
    pub const WIRE_SIZE: usize = 4 + SockAddrStorage::WIRE_SIZE + 4;

    pub fn new(socket: i32, addr: SockAddrStorage) -> Self {
        Self {
            socket_le: socket.to_le_bytes(),
            addr,
            length_le: (SockAddrStorage::WIRE_SIZE as u32).to_le_bytes(),
        }
    }
}

/// `SocketGetSockOptParams_t` / request half of `setsockopt`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SockOptParams {
    socket_le: [u8; 4],
    level_le: [u8; 4],
    name_le: [u8; 4],
}

impl SockOptParams {
    pub const WIRE_SIZE: usize = 12;

    pub fn new(socket: i32, level: i32, name: i32) -> Self {
        Self {
            socket_le: socket.to_le_bytes(),
            level_le: level.to_le_bytes(),
            name_le: name.to_le_bytes(),
        }
    }
}

pub const SOCK_OPT_VALUE_LEN: usize = 16;

/// `SocketSetSockOptParams_t`: option params plus a fixed 16-byte value
/// scratch area, modelled generously rather than per-option-sized.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SetSockOptParams {
    params: SockOptParams,
    length_le: [u8; 4],
    value: [u8; SOCK_OPT_VALUE_LEN],
}

impl SetSockOptParams {
    pub const WIRE_SIZE: usize = SockOptParams::WIRE_SIZE + 4 + SOCK_OPT_VALUE_LEN;

    pub fn new(socket: i32, level: i32, name: i32, value: &[u8]) -> Self {
        let mut v = [0u8; SOCK_OPT_VALUE_LEN];
        let n = core::cmp::min(value.len(), SOCK_OPT_VALUE_LEN);
        v[..n].copy_from_slice(&value[..n]);
        Self {
            params: SockOptParams::new(socket, level, name),
            length_le: (n as u32).to_le_bytes(),
            value: v,
        }
    }
}

/// `SocketGetSockOptResponseParams_t`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct GetSockOptResponse {
    status_le: [u8; 4],
    length_le: [u8; 4],
    value: [u8; SOCK_OPT_VALUE_LEN],
}

impl GetSockOptResponse {
    pub const WIRE_SIZE: usize = 4 + 4 + SOCK_OPT_VALUE_LEN;

    pub fn status(&self) -> i32 {
        i32::from_le_bytes(self.status_le)
    }

    pub fn value(&self) -> &[u8] {
        let len = core::cmp::min(u32::from_le_bytes(self.length_le) as usize, SOCK_OPT_VALUE_LEN);
        &self.value[..len]
    }
}

/// `SocketListenParams_t`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct ListenParams {
    socket_le: [u8; 4],
    backlog_le: [u8; 4],
}

impl ListenParams {
    pub const WIRE_SIZE: usize = 8;

    pub fn new(socket: i32, backlog: i32) -> Self {
        Self {
            socket_le: socket.to_le_bytes(),
            backlog_le: backlog.to_le_bytes(),
        }
    }
}

/// `SocketAcceptParams_t` / `SocketGetPeerNameParams_t`: a bare socket id.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SocketIdParams {
    socket_le: [u8; 4],
}

impl SocketIdParams {
    pub const WIRE_SIZE: usize = 4;

    pub fn new(socket: i32) -> Self {
        Self {
            socket_le: socket.to_le_bytes(),
        }
    }
}

/// `SocketAcceptResponseParams_t`: `{addr, length}` of the new peer.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct AcceptResponse {
    pub addr: SockAddrStorage,
    length_le: [u8; 4],
}

impl AcceptResponse {
    pub const WIRE_SIZE: usize = SockAddrStorage::WIRE_SIZE + 4;

    pub fn length(&self) -> u32 {
        u32::from_le_bytes(self.length_le)
    }
}

/// `SocketGetHostByNameParams_t`: a single ASCII host name field.
pub const HOSTNAME_LEN: usize = 253;

/// Writes a `SOCKET_GETHOSTBYNAME_CMD` request body (just the ASCII host
/// name, NUL-padded) into `out`, which must be at least
/// [`HOSTNAME_LEN`] bytes.
pub fn write_hostname(out: &mut [u8], name: &str) {
    let buf = &mut out[..HOSTNAME_LEN];
    buf.fill(0);
    let n = core::cmp::min(name.len(), HOSTNAME_LEN - 1);
    buf[..n].copy_from_slice(&name.as_bytes()[..n]);
}

/// `SocketGetHostByNameResponseParams_t`: `{status, s_addr}`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct GetHostByNameResponse {
    status_le: [u8; 4],
    s_addr_le: [u8; 4],
}

impl GetHostByNameResponse {
    pub const WIRE_SIZE: usize = 8;

    pub fn status(&self) -> i32 {
        i32::from_le_bytes(self.status_le)
    }

    pub fn address(&self) -> [u8; 4] {
        // Network byte order on the wire (`s_addr` as filled by the
        // module's own resolver), matching `InAddr_t`'s big-endian
        // convention in the original driver's socket glue.
        u32::from_le_bytes(self.s_addr_le).to_be_bytes()
    }
}

/// Fixed prefix of a `SOCKET_SEND_CMD`/`SOCKET_SENDTO_CMD` request:
/// `{socket, size, flags}`, followed by the payload bytes themselves
/// (the original's trailing `buffer[1]` flexible-array idiom).
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SendHeader {
    socket_le: [u8; 4],
    size_le: [u8; 4],
    flags_le: [u8; 4],
}

impl SendHeader {
    pub const WIRE_SIZE: usize = 12;

    pub fn new(socket: i32, size: u32, flags: i32) -> Self {
        Self {
            socket_le: socket.to_le_bytes(),
            size_le: size.to_le_bytes(),
            flags_le: flags.to_le_bytes(),
        }
    }
}

/// Fixed prefix of a `SOCKET_SENDTO_CMD` request, adding the destination
/// address ahead of the payload.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SendToHeader {
    socket_le: [u8; 4],
    size_le: [u8; 4],
    flags_le: [u8; 4],
    pub addr: SockAddrStorage,
    length_le: [u8; 4],
}

impl SendToHeader {
    pub const WIRE_SIZE: usize = 12 + SockAddrStorage::WIRE_SIZE + 4;

    pub fn new(socket: i32, size: u32, flags: i32, addr: SockAddrStorage) -> Self {
        Self {
            socket_le: socket.to_le_bytes(),
            size_le: size.to_le_bytes(),
            flags_le: flags.to_le_bytes(),
            addr,
            length_le: (SockAddrStorage::WIRE_SIZE as u32).to_le_bytes(),
        }
    }
}

/// `SocketSendResponseParams_t`/`SocketSendToResponseParams_t`: bytes
/// actually sent (negative on error).
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SentResponse {
    sent_le: [u8; 4],
}

impl SentResponse {
    pub const WIRE_SIZE: usize = 4;

    pub fn sent(&self) -> i32 {
        i32::from_le_bytes(self.sent_le)
    }
}

/// Request prefix shared by `recv`/`recvfrom`: `{socket, size, flags}`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct RecvParams {
    socket_le: [u8; 4],
    size_le: [u8; 4],
    flags_le: [u8; 4],
}

impl RecvParams {
    pub const WIRE_SIZE: usize = 12;

    pub fn new(socket: i32, size: u32, flags: i32) -> Self {
        Self {
            socket_le: socket.to_le_bytes(),
            size_le: size.to_le_bytes(),
            flags_le: flags.to_le_bytes(),
        }
    }
}

/// A `recvfrom` response's fixed prefix (`{received, addr, length}`)
/// ahead of the payload bytes.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct RecvFromHeader {
    received_le: [u8; 4],
    pub addr: SockAddrStorage,
    length_le: [u8; 4],
}

impl RecvFromHeader {
    pub const WIRE_SIZE: usize = 4 + SockAddrStorage::WIRE_SIZE + 4;

    pub fn received(&self) -> i32 {
        i32::from_le_bytes(self.received_le)
    }
}

/// `SocketGetAddrInfoParams_t`'s two ASCII fields (node name, service
/// name). The original's trailing `AddrInfo_t hints`/response
/// `res.nextPtr` linked-list is a raw-pointer construct with no wire
/// meaning over IPC; this models `getaddrinfo` as resolving to a single
/// [`SockAddrStorage`] result instead, the same resolution as
/// `gethostbyname`'s single-address return.
pub const NODE_NAME_LEN: usize = 256;
pub const SERVICE_NAME_LEN: usize = 256;

#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct GetAddrInfoParams {
    node_name: [u8; NODE_NAME_LEN],
    service_name: [u8; SERVICE_NAME_LEN],
}

impl GetAddrInfoParams {
    pub const WIRE_SIZE: usize = NODE_NAME_LEN + SERVICE_NAME_LEN;

    pub fn new(node_name: &str, service_name: &str) -> Self {
        let mut p = Self {
            node_name: [0; NODE_NAME_LEN],
            service_name: [0; SERVICE_NAME_LEN],
        };
        let n = core::cmp::min(node_name.len(), NODE_NAME_LEN - 1);
        p.node_name[..n].copy_from_slice(&node_name.as_bytes()[..n]);
        let s = core::cmp::min(service_name.len(), SERVICE_NAME_LEN - 1);
        p.service_name[..s].copy_from_slice(&service_name.as_bytes()[..s]);
        p
    }
}

/// `{status: i32, res: SockAddrStorage}`, the simplified `getaddrinfo`
/// response (see [`GetAddrInfoParams`]).
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct GetAddrInfoResponse {
    status_le: [u8; 4],
    pub addr: SockAddrStorage,
}

impl GetAddrInfoResponse {
    pub const WIRE_SIZE: usize = 4 + SockAddrStorage::WIRE_SIZE;

    pub fn status(&self) -> i32 {
        i32::from_le_bytes(self.status_le)
    }
}

/// `SocketSelectParams_t`: a bounded list of socket ids to poll for
/// readability, modelled as a fixed-capacity array rather than the
/// original's bitmask `EmwFdSet_t`: `select` is modelled as a single
/// command id taking a plain socket-id list rather than committing to
/// the original's bitmask wire format.
pub const MAX_SELECT_SOCKETS: usize = 16;

#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SelectParams {
    count_le: [u8; 4],
    sockets_le: [[u8; 4]; MAX_SELECT_SOCKETS],
    timeout_ms_le: [u8; 4],
}

impl SelectParams {
    pub const WIRE_SIZE: usize = 4 + 4 * MAX_SELECT_SOCKETS + 4;

    pub fn new(sockets: &[i32], timeout_ms: u32) -> Self {
        let mut sockets_le = [[0u8; 4]; MAX_SELECT_SOCKETS];
        let n = core::cmp::min(sockets.len(), MAX_SELECT_SOCKETS);
        for (slot, &s) in sockets_le.iter_mut().zip(&sockets[..n]) {
            *slot = s.to_le_bytes();
        }
        Self {
            count_le: (n as u32).to_le_bytes(),
            sockets_le,
            timeout_ms_le: timeout_ms.to_le_bytes(),
        }
    }
}

/// `{count, sockets[16]}`: the subset of the requested sockets that are
/// ready.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SelectResponse {
    count_le: [u8; 4],
    sockets_le: [[u8; 4]; MAX_SELECT_SOCKETS],
}

impl SelectResponse {
    pub const WIRE_SIZE: usize = 4 + 4 * MAX_SELECT_SOCKETS;

    pub fn ready(&self) -> heapless::Vec<i32, MAX_SELECT_SOCKETS> {
        let count = core::cmp::min(u32::from_le_bytes(self.count_le) as usize, MAX_SELECT_SOCKETS);
        let mut out = heapless::Vec::new();
        for raw in &self.sockets_le[..count] {
            let _ = out.push(i32::from_le_bytes(*raw));
        }
        out
    }
}
