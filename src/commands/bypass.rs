//! Bypass-mode wire bodies: `WIFI_BYPASS_SET_CMD`/`WIFI_BYPASS_GET_CMD`
//! mode toggling and the 22-byte `WIFI_BYPASS_OUT_CMD` descriptor.
//!
//! Grounded on `EmwCoreIpc.hpp`'s `WiFiBypassSetParams_t`/
//! `WiFiBypassGetResponseParams_t`/`WiFiBypassOutParams_t`. The *inbound*
//! descriptor (`WiFiBypassInParams_t`, carried by `WIFI_BYPASS_INPUT_EVENT`)
//! is deliberately not given a typed decoder here: it is kept fully
//! opaque, stripped only via the buffer's reserved-prefix mechanism in
//! [`crate::ipc::dispatch`].

use zerocopy::{Immutable, IntoBytes, KnownLayout, TryFromBytes, Unaligned};

use crate::config::BYPASS_DESCRIPTOR_SIZE;

/// `WiFiBypassSetParams_t`: `{mode: i32}`, 1 to enter bypass, 0 to leave.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct BypassSetParams {
    mode_le: [u8; 4],
}

impl BypassSetParams {
    pub const WIRE_SIZE: usize = 4;

    pub fn new(enable: bool) -> Self {
        Self {
            mode_le: i32::from(enable).to_le_bytes(),
        }
    }
}

/// `WiFiBypassGetResponseParams_t`: `{mode: i32}`.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct BypassGetResponse {
    mode_le: [u8; 4],
}

impl BypassGetResponse {
    pub const WIRE_SIZE: usize = 4;

    pub fn is_enabled(&self) -> bool {
        i32::from_le_bytes(self.mode_le) != 0
    }
}

/// `WiFiBypassOutParams_t`: `{idx: i32, useless: [u8; 16], dataLength: u16}`
/// — 22 bytes total, matching [`BYPASS_DESCRIPTOR_SIZE`]. Built via the
/// destination buffer's reserved prefix so the Ethernet frame bytes that
/// follow are never copied.
#[derive(Clone, Copy, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct BypassOutDescriptor {
    idx_le: [u8; 4],
    useless: [u8; 16],
    data_length_le: [u8; 2],
}

impl BypassOutDescriptor {
    pub const WIRE_SIZE: usize = BYPASS_DESCRIPTOR_SIZE;

    pub fn new(interface_idx: i32, data_length: u16) -> Self {
        Self {
            idx_le: interface_idx.to_le_bytes(),
            useless: [0; 16],
            data_length_le: data_length.to_le_bytes(),
        }
    }

    /// Writes the descriptor into the first [`Self::WIRE_SIZE`] bytes of
    /// `out`, which must be at least that long.
    pub fn write_into(self, out: &mut [u8]) {
        out[..Self::WIRE_SIZE].copy_from_slice(self.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_22_bytes() {
        assert_eq!(BypassOutDescriptor::WIRE_SIZE, 22);
        let mut buf = [0xFFu8; 22];
        BypassOutDescriptor::new(1, 64).write_into(&mut buf);
        assert_eq!(&buf[0..4], &1i32.to_le_bytes());
        assert_eq!(&buf[20..22], &64u16.to_le_bytes());
    }

    #[test]
    fn set_params_round_trip() {
        let p = BypassSetParams::new(true);
        assert_eq!(p.mode_le, 1i32.to_le_bytes());
    }
}
