//! The `Driver` façade: lifecycle, Wi-Fi control, sockets, TLS, and
//! bypass mode, each a blocking call built on top of [`crate::ipc::Ipc`].
//!
//! Grounded on `EmwApiCore.cpp`/`EmwApiEmwBypass.cpp` for the exact
//! command sequencing (`SYS_VERSION_CMD` then `WIFI_GET_MAC_CMD` on
//! `initialize()`, firmware-version-floor assert, bypass `output()`'s
//! synchronous ack).

mod bypass;
mod socket;
mod tls;
mod wifi;

use core::cell::{Cell, RefCell};

use critical_section::Mutex as CsMutex;
use heapless::String;

use crate::buffer::pool::Pool;
use crate::commands::system::firmware_revision_str;
use crate::commands::wifi::MAC_LEN;
use crate::commands::{ApiId, Interface};
use crate::config::Config;
use crate::device::{DeviceState, IpInfo, LinkState, MacAddress, SystemInfo};
use crate::error::{DriverError, Result};
use crate::commands::tls::TlsVersion;
use crate::ipc::dispatch::WifiStatusCallback;
use crate::ipc::header::IpcHeader;
use crate::ipc::Ipc;
use crate::transport::spi::SpiTransport;
use crate::transport::SpiHal;

pub use crate::commands::wifi::WifiEvent;

#[derive(Clone, Copy)]
struct StatusSlot {
    callback: Option<WifiStatusCallback>,
    arg: usize,
}

impl StatusSlot {
    const fn empty() -> Self {
        Self { callback: None, arg: 0 }
    }
}

/// Host-side driver core. Generic over the HAL, the platform backend,
/// the build-time configuration, and the buffer pool's sizing — exactly
/// the type parameters [`Ipc`] and [`crate::transport::spi::SpiTransport`]
/// are already generic over.
pub struct Driver<H, P, C, const N: usize, const CAP: usize>
where
    H: SpiHal,
    P: crate::platform::Platform,
    C: Config,
{
    ipc: Ipc<H, P, C, N, CAP>,
    state: CsMutex<RefCell<DeviceState>>,
    ref_count: CsMutex<Cell<u8>>,
    /// Per-interface user callback, indexed by [`Interface`] as `u8`
    /// (soft-AP = 0, station = 1). The event dispatch table itself only
    /// ever holds one slot (`Self::on_wifi_status_event`, installed once
    /// by `initialize`); this table is consulted by that trampoline so
    /// `registerStatusCallback`/`unRegisterStatusCallback` can target
    /// either interface independently, matching `EmwApiBase`'s two
    /// `WiFiStatusCallback_t` slots.
    user_status: CsMutex<Cell<[StatusSlot; 2]>>,
    /// Cached `tlsSetVersion` selection, consulted by `tlsConnect`/
    /// `tlsConnectSni` (see `api::tls`'s module doc comment).
    tls_version: CsMutex<Cell<TlsVersion>>,
}

impl<H, P, C, const N: usize, const CAP: usize> Driver<H, P, C, N, CAP>
where
    H: SpiHal,
    P: crate::platform::Platform,
    C: Config,
{
    pub fn new(transport: SpiTransport<H, P, C, N, CAP>, pool: &'static Pool<N, CAP>) -> Self {
        Self {
            ipc: Ipc::new(transport, pool),
            state: CsMutex::new(RefCell::new(DeviceState::new())),
            ref_count: CsMutex::new(Cell::new(0)),
            user_status: CsMutex::new(Cell::new([StatusSlot::empty(); 2])),
            tls_version: CsMutex::new(Cell::new(TlsVersion::TlsV1_2)),
        }
    }

    /// Bootstraps OS objects and hardware, then probes firmware version
    /// and the station MAC address. Re-entrant: the instance count is
    /// reference-counted, matching `EmwApiCore::initialize`'s singleton
    /// sharing — only the first caller actually does the work.
    pub fn initialize(&'static self) -> Result<()> {
        let is_first = critical_section::with(|cs| {
            let cell = self.ref_count.borrow(cs);
            let count = cell.get();
            cell.set(count.saturating_add(1));
            count == 0
        });
        if !is_first {
            return Ok(());
        }

        if let Err(e) = self.ipc.initialize() {
            critical_section::with(|cs| self.ref_count.borrow(cs).set(0));
            return Err(e);
        }
        self.ipc.events.register_wifi_status(Self::on_wifi_status_event, self as *const Self as usize);

        if let Err(e) = self.probe_version_and_mac() {
            self.ipc.un_initialize();
            critical_section::with(|cs| self.ref_count.borrow(cs).set(0));
            return Err(e);
        }
        Ok(())
    }

    /// Tears down the transport worker at the last release.
    pub fn un_initialize(&'static self) {
        let is_last = critical_section::with(|cs| {
            let cell = self.ref_count.borrow(cs);
            let count = cell.get().saturating_sub(1);
            cell.set(count);
            count == 0
        });
        if is_last {
            self.ipc.events.unregister_wifi_status();
            self.ipc.un_initialize();
        }
    }

    /// Toggles the RESET line with the configured power-on timings,
    /// independent of the reference count — used to recover a wedged
    /// module in place without a full `unInitialize`/`initialize` cycle.
    pub fn reset_hardware(&self) -> Result<()> {
        self.ipc.transport().reset_hardware()
    }

    fn probe_version_and_mac(&self) -> Result<()> {
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; crate::commands::system::FIRMWARE_REVISION_LEN];
        let n = self.ipc.request(&mut cmd, ApiId::SysVersion as u16, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        let version = firmware_revision_str(&resp[..n]);
        if version < C::MINIMUM_FIRMWARE_VERSION {
            // Treated as a recoverable library-boundary error rather than
            // aborting the host process: logged and returned to the caller.
            debug_assert!(false, "firmware revision below the supported minimum");
            log::error!("emw: firmware revision {version} below minimum {}", C::MINIMUM_FIRMWARE_VERSION);
            return Err(DriverError::Error);
        }
        critical_section::with(|cs| {
            let mut state = self.state.borrow(cs).borrow_mut();
            state.system.firmware_revision = String::try_from(version).unwrap_or_default();
        });

        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; MAC_LEN];
        let n = self.ipc.request(&mut cmd, ApiId::WifiGetMac as u16, &mut resp, C::DEFAULT_TIMEOUT_MS)?;
        if n >= MAC_LEN {
            let mut mac = [0u8; MAC_LEN];
            mac.copy_from_slice(&resp[..MAC_LEN]);
            critical_section::with(|cs| self.state.borrow(cs).borrow_mut().system.station_mac = mac);
        }
        Ok(())
    }

    /// Installed once (in `initialize`) as the sole `WIFI_STATUS_EVENT`
    /// subscriber: folds the event into the cached [`LinkState`], then
    /// forwards to whichever user callback `registerStatusCallback`
    /// installed for that interface, if any.
    fn on_wifi_status_event(interface: u8, event: u8, arg: usize) {
        // SAFETY: `arg` was set to `self as *const Self as usize` in
        // `initialize`, which requires `&'static self` — the driver
        // outlives every event the dispatch table can still deliver to
        // it (delivery stops at `un_initialize`, called through the same
        // `&'static self`).
        let this = unsafe { &*(arg as *const Self) };
        let (Some(iface), Some(ev)) = (Interface::from_index(interface), WifiEvent::from_raw(event)) else {
            log::warn!("emw: wifi status event with out-of-range interface/event byte");
            return;
        };
        critical_section::with(|cs| {
            let mut state = this.state.borrow(cs).borrow_mut();
            let next = state.link_state(iface).apply(ev);
            state.set_link_state(iface, next);
        });
        let slot = critical_section::with(|cs| this.user_status.borrow(cs).get()[interface as usize]);
        if let Some(cb) = slot.callback {
            cb(interface, event, slot.arg);
        }
    }

    pub fn register_status_callback(&self, interface: Interface, callback: WifiStatusCallback, arg: usize) {
        critical_section::with(|cs| {
            let cell = self.user_status.borrow(cs);
            let mut slots = cell.get();
            slots[interface as usize] = StatusSlot { callback: Some(callback), arg };
            cell.set(slots);
        });
    }

    pub fn unregister_status_callback(&self, interface: Interface) {
        critical_section::with(|cs| {
            let cell = self.user_status.borrow(cs);
            let mut slots = cell.get();
            slots[interface as usize] = StatusSlot::empty();
            cell.set(slots);
        });
    }

    /// A snapshot of the cached identity/MAC information populated by
    /// `initialize()` and the `getSoftApMacAddress` path.
    pub fn system_info(&self) -> SystemInfo {
        critical_section::with(|cs| self.state.borrow(cs).borrow().system.clone())
    }

    pub fn ip_info(&self) -> IpInfo {
        critical_section::with(|cs| self.state.borrow(cs).borrow().ip.clone())
    }

    pub fn link_state(&self, interface: Interface) -> LinkState {
        critical_section::with(|cs| self.state.borrow(cs).borrow().link_state(interface))
    }

    pub fn mac(&self, interface: Interface) -> MacAddress {
        critical_section::with(|cs| self.state.borrow(cs).borrow().mac(interface))
    }

    /// Issues one request/response round trip, a thin wrapper over
    /// [`Ipc::request`] used by every operation in the `wifi`/`socket`/
    /// `tls`/`bypass` submodules.
    fn call(&self, api_id: ApiId, cmd: &mut [u8], response: &mut [u8], timeout_ms: u32) -> Result<usize> {
        self.ipc.request(cmd, api_id as u16, response, timeout_ms)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow(cs).borrow_mut()))
    }

    fn cached_tls_version(&self) -> TlsVersion {
        critical_section::with(|cs| self.tls_version.borrow(cs).get())
    }

    fn set_cached_tls_version(&self, version: TlsVersion) {
        critical_section::with(|cs| self.tls_version.borrow(cs).set(version));
    }
}
