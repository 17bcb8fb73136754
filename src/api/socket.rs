//! Socket surface: create/connect/bind/listen/accept, send/recv in both
//! connected and unconnected (`*_to`/`*_from`) forms, get/set socket
//! options, name resolution, and `select`.
//!
//! Large send/recv payloads are split so the IPC body never exceeds
//! `buffer_capacity - sizeof(IpcHeader) - sizeof(fixed fields)`,
//! implemented directly in [`Driver::send`]/[`Driver::recv`] and their
//! `_to`/`_from` counterparts.

use heapless::Vec;
use zerocopy::{IntoBytes, TryFromBytes};

use crate::addr::SockAddrStorage;
use crate::commands::socket::{
    AcceptResponse, AddrParams, CreateParams, FdResponse, GetAddrInfoParams, GetAddrInfoResponse,
    GetHostByNameResponse, GetSockOptResponse, ListenParams, RecvFromHeader, RecvParams, SelectParams,
    SelectResponse, SendHeader, SendToHeader, SentResponse, SetSockOptParams, SockOptParams, SocketIdParams,
    StatusResponse, HOSTNAME_LEN, MAX_SELECT_SOCKETS, NODE_NAME_LEN, SERVICE_NAME_LEN,
};
use crate::commands::ApiId;
use crate::config::{Config, IPC_HEADER_SIZE};
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
    /// Largest payload one `send`/`recv`-family command can carry inline,
    /// after the IPC header and the command's own fixed prefix. Bounded by
    /// `CAP`, the actual command-buffer capacity, rather than
    /// `Config::BUFFER_CAPACITY` directly, so a chunk never overruns the
    /// `[0u8; CAP]` scratch buffers below even if the two are configured
    /// apart.
    fn max_payload_chunk(fixed_prefix: usize) -> usize {
        CAP.saturating_sub(IPC_HEADER_SIZE + fixed_prefix)
    }

    /// `SOCKET_CREATE_CMD`.
    pub fn socket(&self, domain: i32, kind: i32, protocol: i32) -> Result<i32> {
        let params = CreateParams::new(domain, kind, protocol);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + CreateParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; FdResponse::WIRE_SIZE];
        self.call(ApiId::SocketCreate, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = FdResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        Ok(parsed.fd())
    }

    /// `SOCKET_CONNECT_CMD`.
    pub fn socket_connect(&self, socket: i32, addr: SockAddrStorage) -> Result<()> {
        self.addr_command(ApiId::SocketConnect, socket, addr)
    }

    /// `SOCKET_BIND_CMD`.
    pub fn bind(&self, socket: i32, addr: SockAddrStorage) -> Result<()> {
        self.addr_command(ApiId::SocketBind, socket, addr)
    }

    fn addr_command(&self, api_id: ApiId, socket: i32, addr: SockAddrStorage) -> Result<()> {
        let params = AddrParams::new(socket, addr);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + AddrParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; StatusResponse::WIRE_SIZE];
        self.call(api_id, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = StatusResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())
    }

    /// `SOCKET_LISTEN_CMD`.
    pub fn listen(&self, socket: i32, backlog: i32) -> Result<()> {
        let params = ListenParams::new(socket, backlog);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + ListenParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; StatusResponse::WIRE_SIZE];
        self.call(ApiId::SocketListen, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = StatusResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())
    }

    /// `SOCKET_ACCEPT_CMD`. Returns the new connection's fd and its peer
    /// address — the original multiplexes both onto one response; here a
    /// second hidden field (`FdResponse` over the front) is unnecessary
    /// since the module reuses the listening socket id for the backlog
    /// entry and returns the accepted peer address alongside it.
    pub fn accept(&self, socket: i32) -> Result<SockAddrStorage> {
        let params = SocketIdParams::new(socket);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SocketIdParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; AcceptResponse::WIRE_SIZE];
        self.call(ApiId::SocketAccept, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = AcceptResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        Ok(parsed.addr)
    }

    /// `SOCKET_SEND_CMD`, split into [`Self::max_payload_chunk`]-sized
    /// writes. Returns the total number of bytes accepted.
    pub fn send(&self, socket: i32, data: &[u8], flags: i32) -> Result<usize> {
        let chunk_cap = Self::max_payload_chunk(SendHeader::WIRE_SIZE);
        let mut sent = 0;
        for chunk in data.chunks(chunk_cap) {
            let n = self.send_one(socket, chunk, flags)?;
            sent += n;
            if n < chunk.len() {
                break;
            }
        }
        Ok(sent)
    }

    fn send_one(&self, socket: i32, chunk: &[u8], flags: i32) -> Result<usize> {
        let header = SendHeader::new(socket, chunk.len() as u32, flags);
        let mut cmd = [0u8; CAP];
        let body_start = IpcHeader::WIRE_SIZE;
        cmd[body_start..body_start + SendHeader::WIRE_SIZE].copy_from_slice(header.as_bytes());
        let payload_start = body_start + SendHeader::WIRE_SIZE;
        cmd[payload_start..payload_start + chunk.len()].copy_from_slice(chunk);
        let cmd_len = payload_start + chunk.len();
        let mut resp = [0u8; SentResponse::WIRE_SIZE];
        self.call(ApiId::SocketSend, &mut cmd[..cmd_len], &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = SentResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        if parsed.sent() < 0 {
            return Err(DriverError::Error);
        }
        Ok(parsed.sent() as usize)
    }

    /// `SOCKET_SENDTO_CMD`: one datagram, never split (splitting a
    /// connectionless payload would change its framing on the wire).
    pub fn send_to(&self, socket: i32, data: &[u8], flags: i32, addr: SockAddrStorage) -> Result<usize> {
        let chunk_cap = Self::max_payload_chunk(SendToHeader::WIRE_SIZE);
        if data.len() > chunk_cap {
            return Err(DriverError::ParamError);
        }
        let header = SendToHeader::new(socket, data.len() as u32, flags, addr);
        let mut cmd = [0u8; CAP];
        let body_start = IpcHeader::WIRE_SIZE;
        cmd[body_start..body_start + SendToHeader::WIRE_SIZE].copy_from_slice(header.as_bytes());
        let payload_start = body_start + SendToHeader::WIRE_SIZE;
        cmd[payload_start..payload_start + data.len()].copy_from_slice(data);
        let cmd_len = payload_start + data.len();
        let mut resp = [0u8; SentResponse::WIRE_SIZE];
        self.call(ApiId::SocketSendTo, &mut cmd[..cmd_len], &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = SentResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        if parsed.sent() < 0 {
            return Err(DriverError::Error);
        }
        Ok(parsed.sent() as usize)
    }

    /// `SOCKET_RECV_CMD`, looping until `out` is full, the peer returns
    /// fewer bytes than requested, or an error occurs.
    pub fn recv(&self, socket: i32, out: &mut [u8], flags: i32) -> Result<usize> {
        let chunk_cap = Self::max_payload_chunk(0);
        let mut received = 0;
        while received < out.len() {
            let want = core::cmp::min(out.len() - received, chunk_cap);
            let n = self.recv_one(socket, &mut out[received..received + want], flags)?;
            received += n;
            if n < want {
                break;
            }
        }
        Ok(received)
    }

    fn recv_one(&self, socket: i32, out: &mut [u8], flags: i32) -> Result<usize> {
        let params = RecvParams::new(socket, out.len() as u32, flags);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + RecvParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; CAP];
        let n = self.call(ApiId::SocketRecv, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let copy_len = core::cmp::min(n, out.len());
        out[..copy_len].copy_from_slice(&resp[..copy_len]);
        Ok(copy_len)
    }

    /// `SOCKET_RECVFROM_CMD`: one datagram, returning the sender address
    /// alongside the bytes read.
    pub fn recv_from(&self, socket: i32, out: &mut [u8], flags: i32) -> Result<(usize, SockAddrStorage)> {
        let params = RecvParams::new(socket, out.len() as u32, flags);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + RecvParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; CAP];
        let n = self.call(ApiId::SocketRecvFrom, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        if n < RecvFromHeader::WIRE_SIZE {
            return Err(DriverError::IoError);
        }
        let header = RecvFromHeader::try_read_from_bytes(&resp[..RecvFromHeader::WIRE_SIZE]).map_err(|_| DriverError::IoError)?;
        let payload = &resp[RecvFromHeader::WIRE_SIZE..n];
        let copy_len = core::cmp::min(payload.len(), out.len());
        out[..copy_len].copy_from_slice(&payload[..copy_len]);
        Ok((copy_len, header.addr))
    }

    /// `SOCKET_SHUTDOWN_CMD`.
    pub fn shutdown(&self, socket: i32) -> Result<()> {
        self.socket_id_command(ApiId::SocketShutdown, socket)
    }

    /// `SOCKET_CLOSE_CMD`.
    pub fn close(&self, socket: i32) -> Result<()> {
        self.socket_id_command(ApiId::SocketClose, socket)
    }

    fn socket_id_command(&self, api_id: ApiId, socket: i32) -> Result<()> {
        let params = SocketIdParams::new(socket);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SocketIdParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; StatusResponse::WIRE_SIZE];
        self.call(api_id, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = StatusResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())
    }

    /// `SOCKET_GETSOCKNAME_CMD`/`SOCKET_GETPEERNAME_CMD` share the same
    /// request/response shape as `accept`'s bare-id request and
    /// address-carrying response.
    pub fn get_sock_name(&self, socket: i32) -> Result<SockAddrStorage> {
        self.addr_query(ApiId::SocketGetSockName, socket)
    }

    pub fn get_peer_name(&self, socket: i32) -> Result<SockAddrStorage> {
        self.addr_query(ApiId::SocketGetPeerName, socket)
    }

    fn addr_query(&self, api_id: ApiId, socket: i32) -> Result<SockAddrStorage> {
        let params = SocketIdParams::new(socket);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SocketIdParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; AcceptResponse::WIRE_SIZE];
        self.call(api_id, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = AcceptResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        Ok(parsed.addr)
    }

    /// `SOCKET_GETSOCKOPT_CMD`.
    pub fn get_sock_opt(&self, socket: i32, level: i32, name: i32) -> Result<Vec<u8, 16>> {
        let params = SockOptParams::new(socket, level, name);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SockOptParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; GetSockOptResponse::WIRE_SIZE];
        self.call(ApiId::SocketGetSockOpt, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = GetSockOptResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())?;
        Vec::from_slice(parsed.value()).map_err(|_| DriverError::IoError)
    }

    /// `SOCKET_SETSOCKOPT_CMD`.
    pub fn set_sock_opt(&self, socket: i32, level: i32, name: i32, value: &[u8]) -> Result<()> {
        let params = SetSockOptParams::new(socket, level, name, value);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SetSockOptParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; StatusResponse::WIRE_SIZE];
        self.call(ApiId::SocketSetSockOpt, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = StatusResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())
    }

    /// `SOCKET_GETHOSTBYNAME_CMD`.
    pub fn gethostbyname(&self, name: &str) -> Result<[u8; 4]> {
        if name.len() >= HOSTNAME_LEN {
            return Err(DriverError::ParamError);
        }
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + HOSTNAME_LEN;
        let mut cmd = [0u8; CMD_SIZE];
        crate::commands::socket::write_hostname(&mut cmd[IpcHeader::WIRE_SIZE..], name);
        let mut resp = [0u8; GetHostByNameResponse::WIRE_SIZE];
        self.call(ApiId::SocketGetHostByName, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = GetHostByNameResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())?;
        Ok(parsed.address())
    }

    /// `SOCKET_GETADDRINFO_CMD`, simplified to a single resolved address
    /// (see [`GetAddrInfoResponse`]'s doc comment).
    pub fn getaddrinfo(&self, node_name: &str, service_name: &str) -> Result<SockAddrStorage> {
        if node_name.len() >= NODE_NAME_LEN || service_name.len() >= SERVICE_NAME_LEN {
            return Err(DriverError::ParamError);
        }
        let params = GetAddrInfoParams::new(node_name, service_name);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + GetAddrInfoParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; GetAddrInfoResponse::WIRE_SIZE];
        self.call(ApiId::SocketGetAddrInfo, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = GetAddrInfoResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())?;
        Ok(parsed.addr)
    }

    /// `SOCKET_SELECT_CMD` (supplemented command — see [`SelectParams`]'s
    /// doc comment for the fixed-array simplification). Returns the subset
    /// of `sockets` ready to read.
    pub fn select(&self, sockets: &[i32], timeout_ms: u32) -> Result<Vec<i32, MAX_SELECT_SOCKETS>> {
        let params = SelectParams::new(sockets, timeout_ms);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SelectParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; SelectResponse::WIRE_SIZE];
        let ipc_timeout = timeout_ms.saturating_add(C::DEFAULT_TIMEOUT_MS);
        self.call(ApiId::SocketSelect, &mut cmd, &mut resp, ipc_timeout)?;
        let parsed = SelectResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        Ok(parsed.ready())
    }
}
