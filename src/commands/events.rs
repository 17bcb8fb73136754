//! Event identifiers and payload decoders for the module-originated
//! events the driver reacts to. Grounded on `EmwCoreIpc::ApiId`'s event
//! range (high bit set) and `EmwApiBase::WiFiStatusCallback_t`/
//! `FotaStatusCallback_t`/`NetlinkInputCallback_t`'s payload shapes.

/// Mask distinguishing an event id from a command id, duplicated here
/// (rather than imported from [`crate::ipc::header::EVENT_MASK`]) since
/// this module is the canonical home for every api-id constant, command
/// or event.
pub const EVENT_MASK: u16 = 0x8000;

pub const SYS_REBOOT_EVENT: u16 = 0x8001;
pub const SYS_FOTA_STATUS_EVENT: u16 = 0x8002;
pub const WIFI_STATUS_EVENT: u16 = 0x8101;
pub const WIFI_BYPASS_INPUT_EVENT: u16 = 0x8102;

/// `SysFotaStatusEventParams_t`: `{status: i32}`, 0 success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FotaStatusPayload {
    pub status: i32,
}

impl FotaStatusPayload {
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let b: [u8; 4] = buf.get(..4)?.try_into().ok()?;
        Some(Self {
            status: i32::from_le_bytes(b),
        })
    }
}

/// `WifiStatusEventParams_t`: `{interface: u8, event: u8}`, matching
/// [`crate::commands::Interface`] and [`crate::commands::wifi::WifiEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WifiStatusPayload {
    pub interface: u8,
    pub event: u8,
}

impl WifiStatusPayload {
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() < 2 {
            return None;
        }
        Some(Self {
            interface: buf[0],
            event: buf[1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wifi_status_payload() {
        let p = WifiStatusPayload::from_bytes(&[1, 3]).unwrap();
        assert_eq!(p.interface, 1);
        assert_eq!(p.event, 3);
    }

    #[test]
    fn decodes_fota_status_payload() {
        let p = FotaStatusPayload::from_bytes(&0i32.to_le_bytes()).unwrap();
        assert_eq!(p.status, 0);
    }
}
