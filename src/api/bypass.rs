//! Bypass mode: entering/leaving raw-frame passthrough, and injecting
//! outbound Ethernet frames past the module-hosted network stack.
//!
//! Grounded on `EmwApiEmwBypass.cpp`'s `setMode`/`output`: `setMode`
//! installs (or clears) the netlink-input callback locally before issuing
//! `WIFI_BYPASS_SET_CMD`, and `output` is a synchronous request — the
//! module acks the frame with a plain status, it does not silently drop
//! it — built by prefixing the frame with a [`BypassOutDescriptor`]
//! exactly as `EmwCoreIpc::WiFiBypassOutParams_t` is laid out directly
//! ahead of the caller's buffer.

use zerocopy::{IntoBytes, TryFromBytes};

use crate::commands::bypass::{BypassGetResponse, BypassOutDescriptor, BypassSetParams};
use crate::commands::system::StatusResponse;
use crate::commands::ApiId;
use crate::config::{Config, BYPASS_DESCRIPTOR_SIZE, IPC_HEADER_SIZE};
use crate::error::{DriverError, Result};
use crate::ipc::dispatch::BypassInputCallback;
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
    /// `WIFI_BYPASS_SET_CMD`. When `enable` and `callback` is `Some`, the
    /// callback becomes the target of every subsequent
    /// `WIFI_BYPASS_INPUT_EVENT`; otherwise any previously registered
    /// callback is cleared first, matching `setMode`'s "new callback only
    /// takes effect together with `enable`" rule.
    pub fn bypass_set_mode(&self, enable: bool, callback: Option<BypassInputCallback>, arg: usize) -> Result<()> {
        match (enable, callback) {
            (true, Some(cb)) => self.ipc.events.register_bypass_input(cb, arg),
            _ => self.ipc.events.unregister_bypass_input(),
        }
        let params = BypassSetParams::new(enable);
        const CMD_SIZE: usize = IpcHeader::WIRE_SIZE + BypassSetParams::WIRE_SIZE;
        let mut cmd = [0u8; CMD_SIZE];
        cmd[IpcHeader::WIRE_SIZE..].copy_from_slice(params.as_bytes());
        let mut resp = [0u8; 4];
        let n = self.call(ApiId::WifiBypassSet, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        DriverError::from_status(StatusResponse::from_bytes(&resp[..n]).map(|s| s.status()).unwrap_or(-1))
    }

    /// `WIFI_BYPASS_GET_CMD`: whether bypass mode is currently active.
    pub fn bypass_get_mode(&self) -> Result<bool> {
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; BypassGetResponse::WIRE_SIZE];
        let n = self.call(ApiId::WifiBypassGet, &mut cmd, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        if n < BypassGetResponse::WIRE_SIZE {
            return Err(DriverError::IoError);
        }
        let parsed = BypassGetResponse::try_read_from_bytes(&resp[..BypassGetResponse::WIRE_SIZE]).map_err(|_| DriverError::IoError)?;
        Ok(parsed.is_enabled())
    }

    /// `WIFI_BYPASS_OUT_CMD`: injects `frame` as a raw Ethernet frame on
    /// `interface`. Oversized frames are truncated to the largest payload
    /// one command can carry, matching `output`'s own clamp rather than
    /// rejecting the call outright.
    pub fn bypass_output(&self, interface_idx: i32, frame: &[u8]) -> Result<()> {
        let max_frame = CAP.saturating_sub(IPC_HEADER_SIZE + BYPASS_DESCRIPTOR_SIZE);
        let frame = &frame[..core::cmp::min(frame.len(), max_frame)];

        let descriptor = BypassOutDescriptor::new(interface_idx, frame.len() as u16);
        let mut cmd = [0u8; CAP];
        let descriptor_start = IpcHeader::WIRE_SIZE;
        descriptor.write_into(&mut cmd[descriptor_start..]);
        let frame_start = descriptor_start + BypassOutDescriptor::WIRE_SIZE;
        cmd[frame_start..frame_start + frame.len()].copy_from_slice(frame);
        let cmd_len = frame_start + frame.len();

        let mut resp = [0u8; 4];
        let n = self.call(ApiId::WifiBypassOut, &mut cmd[..cmd_len], &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        DriverError::from_status(StatusResponse::from_bytes(&resp[..n]).map(|s| s.status()).unwrap_or(-1))
    }
}
