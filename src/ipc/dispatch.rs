//! Event dispatch table.
//!
//! Grounded on `EmwCoreIpc::EventItem_t` / `EventCallback_t`: a small fixed
//! table of event id to function-pointer-plus-opaque-argument callback,
//! rather than a dynamic subscriber list. Each slot is independently
//! replaceable at runtime via `register_*`/`unregister_*`.

use core::cell::Cell;

use critical_section::Mutex as CsMutex;

use crate::buffer::pool::PooledBuffer;
use crate::buffer::NetworkBuffer;
use crate::commands::events::{SYS_FOTA_STATUS_EVENT, SYS_REBOOT_EVENT, WIFI_BYPASS_INPUT_EVENT, WIFI_STATUS_EVENT};
use crate::config::BYPASS_DESCRIPTOR_SIZE;

use super::header::IpcHeader;

/// `SYS_REBOOT_EVENT` carries no payload; the callback only signals that
/// the module has restarted.
pub type RebootCallback = fn(arg: usize);
/// `SYS_FOTA_STATUS_EVENT` payload: a single status byte/word from the
/// module's firmware-update state machine.
pub type FotaStatusCallback = fn(status: i32, arg: usize);
/// `WIFI_STATUS_EVENT` payload: `{interface, event}`.
pub type WifiStatusCallback = fn(interface: u8, event: u8, arg: usize);
/// `WIFI_BYPASS_INPUT_EVENT` payload, with the 22-byte descriptor already
/// stripped — kept fully opaque.
pub type BypassInputCallback = fn(frame: &[u8], arg: usize);

#[derive(Clone, Copy)]
struct Slot<F: Copy> {
    callback: Option<F>,
    arg: usize,
}

impl<F: Copy> Slot<F> {
    const fn empty() -> Self {
        Self { callback: None, arg: 0 }
    }
}

/// Fixed table of event subscriptions. One slot per named event id; the
/// per-interface status callback is a single slot shared by station and
/// soft-AP (the event payload itself carries the interface number).
pub struct EventDispatchTable {
    reboot: CsMutex<Cell<Slot<RebootCallback>>>,
    fota_status: CsMutex<Cell<Slot<FotaStatusCallback>>>,
    wifi_status: CsMutex<Cell<Slot<WifiStatusCallback>>>,
    bypass_input: CsMutex<Cell<Slot<BypassInputCallback>>>,
}

impl EventDispatchTable {
    pub const fn new() -> Self {
        Self {
            reboot: CsMutex::new(Cell::new(Slot::empty())),
            fota_status: CsMutex::new(Cell::new(Slot::empty())),
            wifi_status: CsMutex::new(Cell::new(Slot::empty())),
            bypass_input: CsMutex::new(Cell::new(Slot::empty())),
        }
    }

    pub fn register_reboot(&self, callback: RebootCallback, arg: usize) {
        critical_section::with(|cs| self.reboot.borrow(cs).set(Slot { callback: Some(callback), arg }));
    }

    pub fn register_fota_status(&self, callback: FotaStatusCallback, arg: usize) {
        critical_section::with(|cs| self.fota_status.borrow(cs).set(Slot { callback: Some(callback), arg }));
    }

    pub fn register_wifi_status(&self, callback: WifiStatusCallback, arg: usize) {
        critical_section::with(|cs| self.wifi_status.borrow(cs).set(Slot { callback: Some(callback), arg }));
    }

    pub fn unregister_wifi_status(&self) {
        critical_section::with(|cs| self.wifi_status.borrow(cs).set(Slot::empty()));
    }

    pub fn register_bypass_input(&self, callback: BypassInputCallback, arg: usize) {
        critical_section::with(|cs| self.bypass_input.borrow(cs).set(Slot { callback: Some(callback), arg }));
    }

    pub fn unregister_bypass_input(&self) {
        critical_section::with(|cs| self.bypass_input.borrow(cs).set(Slot::empty()));
    }

    /// Dispatches one event buffer. The buffer is always consumed (freed
    /// on return), matching `processResponse`'s unconditional free and the
    /// spec's "unknown events are logged and dropped" rule.
    pub fn handle(&self, header: IpcHeader, mut buf: PooledBuffer) {
        let api_id = header.api_id();
        match api_id {
            SYS_REBOOT_EVENT => {
                let slot = critical_section::with(|cs| self.reboot.borrow(cs).get());
                if let Some(cb) = slot.callback {
                    cb(slot.arg);
                }
            }
            SYS_FOTA_STATUS_EVENT => {
                let slot = critical_section::with(|cs| self.fota_status.borrow(cs).get());
                if let Some(cb) = slot.callback {
                    let payload = buf.payload();
                    let status = if payload.len() >= 4 {
                        i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]])
                    } else {
                        0
                    };
                    cb(status, slot.arg);
                }
            }
            WIFI_STATUS_EVENT => {
                let slot = critical_section::with(|cs| self.wifi_status.borrow(cs).get());
                if let Some(cb) = slot.callback {
                    let payload = buf.payload();
                    if payload.len() >= 2 {
                        cb(payload[0], payload[1], slot.arg);
                    }
                }
            }
            WIFI_BYPASS_INPUT_EVENT => {
                let slot = critical_section::with(|cs| self.bypass_input.borrow(cs).get());
                if buf.payload_len() >= BYPASS_DESCRIPTOR_SIZE {
                    buf.advance(BYPASS_DESCRIPTOR_SIZE);
                    if let Some(cb) = slot.callback {
                        cb(buf.payload(), slot.arg);
                    }
                } else {
                    log::warn!("ipc: bypass input event shorter than its descriptor");
                }
            }
            other => {
                log::warn!("ipc: unknown event api_id 0x{other:04x}, dropping");
            }
        }
        // `buf` drops here, freeing the slot regardless of branch taken.
    }
}
