//! TLS surface: version selection, client certificate/key upload,
//! connect (with or without SNI), send/receive, close, and the
//! non-blocking toggle.
//!
//! Grounded on `EmwApiEmw.hpp`'s TLS surface — `EmwApiEmw.cpp` declares
//! these methods but never wires a command sequence for them upstream, so
//! the exact request/response shape here is this driver's own resolution
//! (see [`crate::commands::tls`]'s module doc comment and DESIGN.md) built
//! by reusing the socket command set: `tlsConnect`/`tlsConnectSni` issue
//! `SOCKET_CREATE_CMD`/`SOCKET_CONNECT_CMD`, `tlsSend`/`tlsReceive`/
//! `tlsClose` issue `SOCKET_SEND_CMD`/`SOCKET_RECV_CMD`/`SOCKET_CLOSE_CMD`,
//! and certificate upload shares `WIFI_EAP_SET_CERT_CMD` with EAP-TLS.

use zerocopy::{IntoBytes, TryFromBytes};

use crate::addr::SockAddrStorage;
use crate::commands::socket::{AddrParams, CreateParams, FdResponse, RecvParams, SendHeader, SentResponse, SetSockOptParams, SocketIdParams, StatusResponse};
use crate::commands::tls::{ConnectSniParams, TlsHandle, TlsVersion, MAX_SNI_LEN, SO_NONBLOCK};
use crate::commands::wifi::{EapCertType, EapSetCertHeader};
use crate::commands::ApiId;
use crate::config::{Config, IPC_HEADER_SIZE};
use crate::error::{DriverError, Result};
use crate::ipc::header::IpcHeader;
use crate::platform::Platform;
use crate::transport::SpiHal;

use super::Driver;

impl<H, P, C, const N: usize, const CAP: usize> Driver<H, P, C, N, CAP>
where
    H: SpiHal,
    P: Platform,
    C: Config,
{
    /// Caches the TLS protocol version used by subsequent [`Self::tls_connect`]/
    /// [`Self::tls_connect_sni`] calls.
    pub fn tls_set_version(&self, version: TlsVersion) {
        self.set_cached_tls_version(version);
    }

    pub fn tls_version(&self) -> TlsVersion {
        self.cached_tls_version()
    }

    /// `WIFI_EAP_SET_CERT_CMD` with [`EapCertType::ClientCertificate`].
    pub fn tls_set_client_certificate(&self, certificate: &[u8]) -> Result<()> {
        self.upload_cert(EapCertType::ClientCertificate as u8, certificate)
    }

    /// `WIFI_EAP_SET_CERT_CMD` with [`EapCertType::ClientKey`].
    pub fn tls_set_client_private_key(&self, private_key: &[u8]) -> Result<()> {
        self.upload_cert(EapCertType::ClientKey as u8, private_key)
    }

    fn upload_cert(&self, cert_type: u8, data: &[u8]) -> Result<()> {
        if data.len() > C::MAX_CERTIFICATE_LEN {
            return Err(DriverError::ParamError);
        }
        let header = EapSetCertHeader::new(cert_type, data.len() as u16);
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE + EapSetCertHeader::WIRE_SIZE + 2500];
        let body_start = IpcHeader::WIRE_SIZE;
        cmd[body_start..body_start + EapSetCertHeader::WIRE_SIZE].copy_from_slice(header.as_bytes());
        let cert_start = body_start + EapSetCertHeader::WIRE_SIZE;
        cmd[cert_start..cert_start + data.len()].copy_from_slice(data);
        let cmd_len = cert_start + data.len();
        let mut resp = [0u8; StatusResponse::WIRE_SIZE];
        self.call(ApiId::WifiEapSetCert, &mut cmd[..cmd_len], &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = StatusResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())
    }

    /// `tlsConnect`: creates a socket and connects it to `addr`, uploading
    /// `ca_cert` first when supplied (the original's inline per-call CA
    /// argument). On a connect failure the freshly created socket is
    /// closed before the error is returned.
    pub fn tls_connect(&self, domain: i32, kind: i32, protocol: i32, addr: SockAddrStorage, ca_cert: Option<&[u8]>) -> Result<TlsHandle> {
        if let Some(ca) = ca_cert {
            self.upload_cert(EapCertType::RootCa as u8, ca)?;
        }
        let fd = self.tls_create(domain, kind, protocol)?;
        if let Err(e) = self.tls_connect_addr(fd, addr) {
            let _ = self.tls_close(TlsHandle(fd));
            return Err(e);
        }
        Ok(TlsHandle(fd))
    }

    fn tls_create(&self, domain: i32, kind: i32, protocol: i32) -> Result<i32> {
        let params = CreateParams::new(domain, kind, protocol);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + CreateParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; FdResponse::WIRE_SIZE];
        self.call(ApiId::SocketCreate, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = FdResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        Ok(parsed.fd())
    }

    fn tls_connect_addr(&self, fd: i32, addr: SockAddrStorage) -> Result<()> {
        let params = AddrParams::new(fd, addr);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + AddrParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; StatusResponse::WIRE_SIZE];
        self.call(ApiId::SocketConnect, &mut cmd, &mut resp, C::CONNECT_TIMEOUT_MS)?;
        let parsed = StatusResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())
    }

    /// `tlsConnectSni`: folds create-with-hint and connect into a single
    /// round trip via [`ConnectSniParams`].
    pub fn tls_connect_sni(&self, domain: i32, kind: i32, protocol: i32, sni: &str, addr: SockAddrStorage, ca_cert: Option<&[u8]>) -> Result<TlsHandle> {
        if sni.len() >= MAX_SNI_LEN {
            return Err(DriverError::ParamError);
        }
        if let Some(ca) = ca_cert {
            self.upload_cert(EapCertType::RootCa as u8, ca)?;
        }
        let params = ConnectSniParams::new(domain, kind, protocol, addr, sni).ok_or(DriverError::ParamError)?;
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + ConnectSniParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; FdResponse::WIRE_SIZE];
        self.call(ApiId::SocketConnect, &mut cmd, &mut resp, C::CONNECT_TIMEOUT_MS)?;
        let parsed = FdResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        Ok(TlsHandle(parsed.fd()))
    }

    /// See `socket::Driver::max_payload_chunk`: bounded by `CAP`, the
    /// actual command-buffer capacity, not `Config::BUFFER_CAPACITY`.
    fn max_payload_chunk(fixed_prefix: usize) -> usize {
        CAP.saturating_sub(IPC_HEADER_SIZE + fixed_prefix)
    }

    /// `tlsSend`, chunked the same way [`super::socket::Driver::send`] is.
    pub fn tls_send(&self, handle: TlsHandle, data: &[u8]) -> Result<usize> {
        let chunk_cap = Self::max_payload_chunk(SendHeader::WIRE_SIZE);
        let mut sent = 0;
        for chunk in data.chunks(chunk_cap) {
            let n = self.tls_send_one(handle.0, chunk)?;
            sent += n;
            if n < chunk.len() {
                break;
            }
        }
        Ok(sent)
    }

    fn tls_send_one(&self, socket: i32, chunk: &[u8]) -> Result<usize> {
        let header = SendHeader::new(socket, chunk.len() as u32, 0);
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

    /// `tlsReceive`, looping the same way [`super::socket::Driver::recv`] does.
    pub fn tls_receive(&self, handle: TlsHandle, out: &mut [u8]) -> Result<usize> {
        let chunk_cap = Self::max_payload_chunk(0);
        let mut received = 0;
        while received < out.len() {
            let want = core::cmp::min(out.len() - received, chunk_cap);
            let n = self.tls_receive_one(handle.0, &mut out[received..received + want])?;
            received += n;
            if n < want {
                break;
            }
        }
        Ok(received)
    }

    fn tls_receive_one(&self, socket: i32, out: &mut [u8]) -> Result<usize> {
        let params = RecvParams::new(socket, out.len() as u32, 0);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + RecvParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; CAP];
        let n = self.call(ApiId::SocketRecv, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let copy_len = core::cmp::min(n, out.len());
        out[..copy_len].copy_from_slice(&resp[..copy_len]);
        Ok(copy_len)
    }

    /// `tlsClose`: `SOCKET_CLOSE_CMD` on the handle's underlying socket id.
    pub fn tls_close(&self, handle: TlsHandle) -> Result<()> {
        let params = SocketIdParams::new(handle.0);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SocketIdParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; StatusResponse::WIRE_SIZE];
        self.call(ApiId::SocketClose, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = StatusResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())
    }

    /// `tlsSetNonBlocking`: `SOCKET_SETSOCKOPT_CMD` with [`SO_NONBLOCK`].
    pub fn tls_set_non_blocking(&self, handle: TlsHandle, nonblock: bool) -> Result<()> {
        let value = [u8::from(nonblock)];
        let params = SetSockOptParams::new(handle.0, 0, SO_NONBLOCK, &value);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + SetSockOptParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; StatusResponse::WIRE_SIZE];
        self.call(ApiId::SocketSetSockOpt, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let parsed = StatusResponse::try_read_from_bytes(&resp[..]).map_err(|_| DriverError::IoError)?;
        DriverError::from_status(parsed.status())
    }
}
