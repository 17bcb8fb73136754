//! System subsystem: echo/keepalive, reboot, version probe, reset, FOTA,
//! and the supplemented configuration-server start/stop commands.

use zerocopy::{Immutable, IntoBytes, KnownLayout, TryFromBytes, Unaligned};

/// Common `status: i32` response body shared by most system/Wi-Fi/socket
/// commands, grounded on `EmwCoreIpc::SysCommonResponseParams_t`.
#[derive(Clone, Copy, Debug, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct StatusResponse {
    status_le: [u8; 4],
}

impl StatusResponse {
    pub fn status(&self) -> i32 {
        i32::from_le_bytes(self.status_le)
    }

    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        buf.get(..4).map(|b| Self {
            status_le: [b[0], b[1], b[2], b[3]],
        })
    }
}

/// `firmwareRevision[24]` response to `SYS_VERSION_CMD`: an ASCII,
/// NUL-terminated (or -padded) version string such as `"V2.3.4"`.
pub const FIRMWARE_REVISION_LEN: usize = 24;

/// Extracts the ASCII version string out of a raw firmware-revision
/// response, stopping at the first NUL or the buffer's end.
pub fn firmware_revision_str(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    core::str::from_utf8(&buf[..end]).unwrap_or("")
}

/// `SysFotaStartParams_t`: a URL plus an MD5 digest string.
pub const FOTA_URL_LEN: usize = 256;
pub const FOTA_MD5_LEN: usize = 64;
