//! IPC request/response multiplexing over a [`Transport`].
//!
//! One outstanding request at a time: `request` stamps a fresh `req_id`
//! into the caller's command buffer, sends it, and blocks on a rendezvous
//! semaphore until `dispatch` (driven by draining the transport's inbound
//! fifo) finds a response whose `req_id` matches, or the timeout expires.
//! Events are demultiplexed the same way and handed to
//! [`dispatch::EventDispatchTable`] instead of waking a waiter.

pub mod dispatch;
pub mod header;

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex as CsMutex;

use crate::buffer::pool::{Pool, PooledBuffer};
use crate::buffer::NetworkBuffer;
use crate::commands::{WIFI_PS_OFF_CMD, WIFI_PS_ON_CMD};
use crate::config::{Config, REQ_ID_NONE};
use crate::error::{DriverError, Result};
use crate::platform::{wait_with_poll, Clock, Platform, RecursiveMutex, Semaphore};
use crate::transport::spi::SpiTransport;
use crate::transport::{SpiHal, Transport};

use dispatch::EventDispatchTable;
use header::IpcHeader;

/// A response buffer pointer/capacity pair, valid only for the duration
/// of the `request` call that installed it (the call blocks on
/// `rendezvous` until the pointer is either consumed or discarded, so it
/// never outlives its referent's stack frame).
struct PendingRequest {
    req_id: u32,
    response_ptr: usize,
    response_cap: usize,
    written_len: usize,
}

impl PendingRequest {
    const fn empty() -> Self {
        Self {
            req_id: REQ_ID_NONE,
            response_ptr: 0,
            response_cap: 0,
            written_len: 0,
        }
    }
}

/// Request/response multiplexer plus event dispatcher, generic over the
/// platform backend, the HAL, and the buffer pool's sizing.
pub struct Ipc<H, P, C, const N: usize, const CAP: usize>
where
    H: SpiHal,
    P: Platform,
    C: Config,
{
    transport: SpiTransport<H, P, C, N, CAP>,
    pool: &'static Pool<N, CAP>,
    mutex: P::Mutex,
    rendezvous: P::Semaphore,
    next_req_id: CsMutex<Cell<u32>>,
    pending: CsMutex<RefCell<PendingRequest>>,
    power_save_enabled: AtomicBool,
    pub events: EventDispatchTable,
}

impl<H, P, C, const N: usize, const CAP: usize> Ipc<H, P, C, N, CAP>
where
    H: SpiHal,
    P: Platform,
    C: Config,
{
    pub fn new(transport: SpiTransport<H, P, C, N, CAP>, pool: &'static Pool<N, CAP>) -> Self {
        Self {
            transport,
            pool,
            mutex: P::Mutex::new(),
            rendezvous: P::Semaphore::new(1, 0),
            // Seeded two below the sentinel so the first call's increment
            // lands one below it, matching `GetNewReqId`'s static local.
            next_req_id: CsMutex::new(Cell::new(REQ_ID_NONE - 2)),
            pending: CsMutex::new(RefCell::new(PendingRequest::empty())),
            power_save_enabled: AtomicBool::new(false),
            events: EventDispatchTable::new(),
        }
    }

    pub fn transport(&self) -> &SpiTransport<H, P, C, N, CAP> {
        &self.transport
    }

    pub fn initialize(&self) -> Result<()> {
        self.transport.initialize()
    }

    pub fn un_initialize(&self) {
        self.transport.un_initialize();
    }

    fn next_req_id(&self) -> u32 {
        critical_section::with(|cs| {
            let cell = self.next_req_id.borrow(cs);
            let mut v = cell.get().wrapping_add(1);
            if v == REQ_ID_NONE {
                v = v.wrapping_add(1);
            }
            cell.set(v);
            v
        })
    }

    /// Issues one command and blocks for its response.
    ///
    /// `command` must have its first [`IpcHeader::WIRE_SIZE`] bytes
    /// reserved for the header and `api_id` already known; `request`
    /// stamps `req_id` in place before sending. Returns the number of
    /// response bytes written into `response`.
    pub fn request(&self, command: &mut [u8], api_id: u16, response: &mut [u8], timeout_ms: u32) -> Result<usize> {
        self.mutex.lock();
        let result = self.request_locked(command, api_id, response, timeout_ms);
        if api_id == WIFI_PS_ON_CMD {
            self.power_save_enabled.store(true, Ordering::SeqCst);
        } else if api_id == WIFI_PS_OFF_CMD {
            self.power_save_enabled.store(false, Ordering::SeqCst);
        }
        self.mutex.unlock();
        result
    }

    fn request_locked(&self, command: &mut [u8], api_id: u16, response: &mut [u8], timeout_ms: u32) -> Result<usize> {
        let req_id = self.next_req_id();
        IpcHeader::write_into(command, req_id, api_id);

        critical_section::with(|cs| {
            let mut pending = self.pending.borrow(cs).borrow_mut();
            debug_assert!(pending.req_id == REQ_ID_NONE, "more than one IPC request outstanding");
            *pending = PendingRequest {
                req_id,
                response_ptr: response.as_mut_ptr() as usize,
                response_cap: response.len(),
                written_len: 0,
            };
        });

        if self.power_save_enabled.load(Ordering::SeqCst) {
            self.transport.send(crate::config::POWER_SAVE_WAKE_PACKET);
            <P::Clock as Clock>::delay_ms(C::POWER_SAVE_WAKE_DELAY_MS);
        }

        let sent = self.transport.send(command);
        debug_assert!(sent == command.len(), "transport accepted a partial command write");

        let arrived = wait_with_poll::<P::Semaphore, P::Clock, _>(&self.rendezvous, timeout_ms, |remaining| {
            let _ = self.transport.process_polling_data(remaining);
            self.drain_inbound();
        });

        if arrived {
            let written = critical_section::with(|cs| self.pending.borrow(cs).borrow().written_len);
            Ok(written)
        } else {
            critical_section::with(|cs| *self.pending.borrow(cs).borrow_mut() = PendingRequest::empty());
            Err(DriverError::Timeout)
        }
    }

    /// Drains every buffer the transport worker has queued so far,
    /// dispatching each as a response or an event. Also the entry point a
    /// dedicated receive thread (the `rtos` backend) calls in a loop.
    pub fn drain_inbound(&self) {
        while let Some(token) = self.transport.poll_data(0) {
            let buf = PooledBuffer::from_token(self.pool, token);
            self.handle_buffer(buf);
        }
    }

    /// Blocks up to `timeout_ms` for the next inbound buffer and
    /// dispatches it, for a dedicated receive thread's poll loop.
    pub fn receive_once(&self, timeout_ms: u32) {
        if let Some(token) = self.transport.poll_data(timeout_ms) {
            let buf = PooledBuffer::from_token(self.pool, token);
            self.handle_buffer(buf);
        }
    }

    fn handle_buffer(&self, buf: PooledBuffer) {
        if buf.payload_len() < IpcHeader::WIRE_SIZE {
            log::warn!("ipc: unknown buffer content (shorter than the header)");
            return;
        }
        let mut header_wire = [0u8; IpcHeader::WIRE_SIZE];
        header_wire.copy_from_slice(&buf.payload()[..IpcHeader::WIRE_SIZE]);
        let header = IpcHeader::from_wire_bytes(&header_wire);

        if header.is_event() {
            let mut buf = buf;
            buf.advance(IpcHeader::WIRE_SIZE);
            self.events.handle(header, buf);
        } else {
            self.process_response(header.req_id(), buf);
        }
    }

    fn process_response(&self, req_id: u32, buf: PooledBuffer) {
        let matched = critical_section::with(|cs| {
            let mut pending = self.pending.borrow(cs).borrow_mut();
            if pending.req_id != req_id {
                return false;
            }
            let body = &buf.payload()[IpcHeader::WIRE_SIZE..];
            let n = core::cmp::min(pending.response_cap, body.len());
            if pending.response_ptr != 0 && n > 0 {
                // SAFETY: `response_ptr`/`response_cap` were installed by
                // `request_locked` from a `&mut [u8]` that is still live —
                // the caller is blocked on `rendezvous` in the very call
                // that installed them.
                unsafe {
                    core::ptr::copy_nonoverlapping(body.as_ptr(), pending.response_ptr as *mut u8, n);
                }
            }
            pending.written_len = n;
            pending.req_id = REQ_ID_NONE;
            true
        });
        if matched {
            self.rendezvous.release();
        } else {
            log::warn!("ipc: response req_id 0x{req_id:08x} did not match the pending request, dropping");
        }
        // `buf` frees here unconditionally, matching `processResponse`'s
        // unconditional `EmwCoreHci::Free`.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::pool::Pool;
    use crate::commands::events::WIFI_STATUS_EVENT;
    use crate::commands::system::firmware_revision_str;
    use crate::commands::wifi::parse_scan_results;
    use crate::commands::ApiId;
    use crate::config::DefaultConfig;
    use crate::platform::no_os::NoOsPlatform;
    use crate::test_hal::{FakeBus, FakeHal, Scripted, VirtualClock};

    type TestPlatform = NoOsPlatform<VirtualClock>;
    type TestTransport = SpiTransport<FakeHal, TestPlatform, DefaultConfig, 4, 512>;
    type TestIpc = Ipc<FakeHal, TestPlatform, DefaultConfig, 4, 512>;

    static POOL: Pool<4, 512> = Pool::new();

    /// Wires a real `Ipc`/`SpiTransport` to a scriptable `FakeBus`, with the
    /// FLOW/NOTIFY "ISR" pulses looped back so a turn never actually stalls
    /// on the watchdog — see `test_hal`'s module doc comment.
    fn build_ipc() -> (&'static TestIpc, &'static FakeBus) {
        let hal = FakeHal::new();
        let bus = hal.bus;
        let transport = TestTransport::new(hal, &POOL);
        let ipc: &'static TestIpc = Box::leak(Box::new(Ipc::new(transport, &POOL)));
        let flow_cb: &'static (dyn Fn() + Sync) = Box::leak(Box::new(move || ipc.transport().on_flow_rising()));
        let notify_cb: &'static (dyn Fn() + Sync) = Box::leak(Box::new(move || ipc.transport().on_notify_rising()));
        bus.set_flow_pulse(flow_cb);
        bus.set_notify_pulse(notify_cb);
        ipc.transport().on_flow_rising();
        (ipc, bus)
    }

    fn req_id_of(frame: &[u8]) -> u32 {
        u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]])
    }

    #[test]
    fn request_response_round_trip_delivers_body_and_bumps_req_id() {
        let (ipc, bus) = build_ipc();
        let mut fw = [0u8; 24];
        fw[..6].copy_from_slice(b"V2.3.4");
        bus.push(Scripted::Frame {
            api_id: ApiId::SysVersion as u16,
            body: fw.to_vec(),
        });

        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; 32];
        let written = ipc.request(&mut cmd, ApiId::SysVersion as u16, &mut resp, 1000).unwrap();
        assert_eq!(firmware_revision_str(&resp[..written]), "V2.3.4");

        bus.push(Scripted::Frame {
            api_id: ApiId::SysVersion as u16,
            body: fw.to_vec(),
        });
        let mut cmd2 = [0u8; IpcHeader::WIRE_SIZE];
        ipc.request(&mut cmd2, ApiId::SysVersion as u16, &mut resp, 1000).unwrap();

        let sent = bus.sent_frames();
        assert_ne!(req_id_of(&sent[0]), req_id_of(&sent[1]));
    }

    #[test]
    fn scan_response_parses_into_ap_info_entries() {
        let (ipc, bus) = build_ipc();
        let mut body = Vec::new();
        body.push(1u8);
        body.extend_from_slice(&(-40i32).to_le_bytes());
        let mut ssid = [0u8; 33];
        ssid[..8].copy_from_slice(b"TestNet1");
        body.extend_from_slice(&ssid);
        body.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        body.extend_from_slice(&6i32.to_le_bytes());
        body.push(3u8);
        bus.push(Scripted::Frame {
            api_id: ApiId::WifiScan as u16,
            body,
        });

        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; 256];
        let written = ipc.request(&mut cmd, ApiId::WifiScan as u16, &mut resp, 1000).unwrap();
        let entries = parse_scan_results(&resp[..written]);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ssid(), "TestNet1");
        assert_eq!(entries[0].rssi(), -40);
        assert_eq!(entries[0].channel(), 6);
        assert_eq!(entries[0].security(), 3);
        assert_eq!(entries[0].bssid(), [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    }

    #[test]
    fn event_interleaved_with_an_in_flight_request_still_resolves() {
        static EVENT_SEEN: core::sync::atomic::AtomicU8 = core::sync::atomic::AtomicU8::new(0xFF);
        fn on_wifi_status(_interface: u8, event: u8, _arg: usize) {
            EVENT_SEEN.store(event, core::sync::atomic::Ordering::SeqCst);
        }

        let (ipc, bus) = build_ipc();
        ipc.events.register_wifi_status(on_wifi_status, 0);

        // The first turn delivers an unrelated event; the module still has
        // the real response queued behind it and re-asserts NOTIFY for it.
        bus.push(Scripted::Frame {
            api_id: WIFI_STATUS_EVENT,
            body: vec![1u8, 0x02],
        });
        let mut fw = [0u8; 24];
        fw[..6].copy_from_slice(b"V2.3.4");
        bus.push(Scripted::Frame {
            api_id: ApiId::SysVersion as u16,
            body: fw.to_vec(),
        });

        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; 32];
        let written = ipc.request(&mut cmd, ApiId::SysVersion as u16, &mut resp, 1000).unwrap();

        assert_eq!(firmware_revision_str(&resp[..written]), "V2.3.4");
        assert_eq!(EVENT_SEEN.load(core::sync::atomic::Ordering::SeqCst), 0x02);
    }

    #[test]
    fn timed_out_request_is_cleared_and_a_late_response_is_dropped_not_matched() {
        let (ipc, bus) = build_ipc();
        // Nothing scripted: every turn answers Silence, so this gives up.
        let mut cmd = [0u8; IpcHeader::WIRE_SIZE];
        let mut resp = [0u8; 32];
        let err = ipc.request(&mut cmd, ApiId::SysVersion as u16, &mut resp, 5).unwrap_err();
        assert!(matches!(err, DriverError::Timeout));

        // A response now arriving out of band (nothing pending to match)
        // must be logged and dropped, not crash the dispatcher.
        bus.push(Scripted::Frame {
            api_id: ApiId::SysVersion as u16,
            body: vec![0u8; 24],
        });
        ipc.transport().send(&[0u8; IpcHeader::WIRE_SIZE]);
        let _ = ipc.transport().process_polling_data(1000);
        ipc.drain_inbound();
    }
}
