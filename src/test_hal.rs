//! Test-only fake [`crate::transport::SpiHal`] used by the `ipc` and
//! `transport::spi` unit tests to drive a real
//! [`crate::transport::spi::SpiTransport`] end to end without real
//! hardware.
//!
//! The fake models exactly one SPI turn as two `transfer` calls (header,
//! then data), echoing the most recently seen host `req_id` back into
//! whatever module response the test has queued — so a test only has to
//! say *what* the module should answer, not *which* request it answers,
//! matching the real module's behaviour of always replying with the
//! request id it last saw on the wire.
//!
//! FLOW is edge-triggered in the production code (an ISR releases a
//! semaphore; levels are only rechecked defensively), which a
//! single-threaded fake cannot reproduce by holding a GPIO "high" — so
//! [`FakeBus`] instead exposes `set_flow_pulse`/`set_notify_pulse` hooks
//! that a test wires back to the real [`crate::transport::spi::SpiTransport`]'s
//! `on_flow_rising`/`on_notify_rising`, fired at the point in the turn a
//! real module would actually toggle the line.

#![allow(dead_code)]

use core::cell::Cell;
use std::cell::RefCell;
use std::collections::VecDeque;

use embedded_hal::digital::{Error as DigitalError, ErrorKind as DigitalErrorKind, ErrorType as DigitalErrorType, InputPin, OutputPin};
use embedded_hal::spi::{Error as SpiError, ErrorKind as SpiErrorKind, ErrorType as SpiErrorType, SpiBus};

use crate::ipc::header::IpcHeader;
use crate::transport::SpiHal;

#[derive(Debug, Clone, Copy)]
pub struct FakeError;

impl DigitalError for FakeError {
    fn kind(&self) -> DigitalErrorKind {
        DigitalErrorKind::Other
    }
}

impl SpiError for FakeError {
    fn kind(&self) -> SpiErrorKind {
        SpiErrorKind::Other
    }
}

/// A level-only GPIO line; `is_low`/`is_high` reflect whatever was last
/// set, starting high (matching NSS/FLOW idling high).
pub struct FakePin {
    high: Cell<bool>,
}

impl FakePin {
    pub fn new(initially_high: bool) -> Self {
        Self {
            high: Cell::new(initially_high),
        }
    }
}

impl DigitalErrorType for FakePin {
    type Error = FakeError;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), FakeError> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), FakeError> {
        self.high.set(true);
        Ok(())
    }
}

impl InputPin for FakePin {
    fn is_high(&mut self) -> Result<bool, FakeError> {
        Ok(self.high.get())
    }

    fn is_low(&mut self) -> Result<bool, FakeError> {
        Ok(!self.high.get())
    }
}

/// What the fake module says back on the turn that consumes this entry.
pub enum Scripted {
    /// A response/event frame: `IpcHeader{req_id: <echoed>, api_id}` then
    /// `body`. Used for both ordinary responses and injected events — the
    /// caller sets `api_id`'s event bit (`0x8000`) for the latter.
    Frame { api_id: u16, body: Vec<u8> },
    /// The module has nothing to say this turn (`module_len == 0`).
    Silence,
}

type PulseFn = dyn Fn() + Sync;

/// Scriptable [`SpiBus`] fake: a FIFO of [`Scripted`] turns, plus a log of
/// every data-phase payload the host actually transmitted (the full
/// command bytes, header included) for assertions.
///
/// Every public method takes `&self`: all mutable state lives behind
/// `Cell`/`RefCell` so the fake can be shared as a `&'static FakeBus`
/// between the test (which scripts it) and the `SpiTransport` that owns
/// the `FakeHal` wrapping it (see `FakeHal::bus`'s doc comment for why).
pub struct FakeBus {
    script: RefCell<VecDeque<Scripted>>,
    current: RefCell<Option<(Scripted, usize)>>,
    sent: RefCell<Vec<Vec<u8>>>,
    last_req_id: Cell<u32>,
    flow_pulse: Cell<Option<&'static PulseFn>>,
    notify_pulse: Cell<Option<&'static PulseFn>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            script: RefCell::new(VecDeque::new()),
            current: RefCell::new(None),
            sent: RefCell::new(Vec::new()),
            last_req_id: Cell::new(0),
            flow_pulse: Cell::new(None),
            notify_pulse: Cell::new(None),
        }
    }

    pub fn push(&self, item: Scripted) {
        self.script.borrow_mut().push_back(item);
    }

    /// Every data-phase write the host performed, oldest first.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.borrow().clone()
    }

    /// Fired once after every `transfer` call (header or data phase),
    /// simulating the module re-asserting FLOW as soon as it is ready
    /// for the next phase.
    pub fn set_flow_pulse(&self, f: &'static PulseFn) {
        self.flow_pulse.set(Some(f));
    }

    /// Fired once per header phase while the script still has queued
    /// turns after the one just popped, simulating NOTIFY: the module
    /// has more to say and wants another turn even without a fresh host
    /// send.
    pub fn set_notify_pulse(&self, f: &'static PulseFn) {
        self.notify_pulse.set(Some(f));
    }

    fn transfer_impl(&self, read: &mut [u8], write: &[u8]) {
        let in_data_phase = self.current.borrow().is_some();
        if !in_data_phase {
            // Header phase: `write` is the host's own SpiHeader, not
            // useful here. Pop the next scripted turn and announce its
            // length as the module's.
            let item = self.script.borrow_mut().pop_front().unwrap_or(Scripted::Silence);
            let more_queued = !self.script.borrow().is_empty();
            let module_len = match &item {
                Scripted::Silence => 0usize,
                Scripted::Frame { body, .. } => IpcHeader::WIRE_SIZE + body.len(),
            };
            *self.current.borrow_mut() = Some((item, module_len));
            let len = module_len as u16;
            let lenx = !len;
            read[0] = 0x0B;
            read[1..3].copy_from_slice(&len.to_le_bytes());
            read[3..5].copy_from_slice(&lenx.to_le_bytes());
            read[5..7].fill(0);
            if more_queued {
                if let Some(f) = self.notify_pulse.get() {
                    f();
                }
            }
        } else {
            // Data phase: `write` is the host command (or empty, for a
            // NOTIFY-only turn). Build the module's reply frame, echoing
            // the most recently seen host req_id so it matches whatever
            // is pending.
            let (item, module_len) = self.current.borrow_mut().take().expect("data phase without a header phase");
            self.sent.borrow_mut().push(write.to_vec());
            if write.len() >= IpcHeader::WIRE_SIZE {
                self.last_req_id.set(u32::from_le_bytes([write[0], write[1], write[2], write[3]]));
            }
            if module_len > 0 {
                let (api_id, body) = match item {
                    Scripted::Frame { api_id, body } => (api_id, body),
                    Scripted::Silence => (0, Vec::new()),
                };
                let header = IpcHeader::new(self.last_req_id.get(), api_id).to_wire_bytes();
                read[..IpcHeader::WIRE_SIZE].copy_from_slice(&header);
                read[IpcHeader::WIRE_SIZE..module_len].copy_from_slice(&body);
            }
        }
        if let Some(f) = self.flow_pulse.get() {
            f();
        }
    }
}

impl SpiErrorType for FakeBus {
    type Error = FakeError;
}

impl SpiBus<u8> for FakeBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), FakeError> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, _words: &[u8]) -> Result<(), FakeError> {
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), FakeError> {
        self.transfer_impl(read, write);
        Ok(())
    }

    fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), FakeError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), FakeError> {
        Ok(())
    }
}

/// Bundles a scriptable bus with always-idle NSS/RESET pins and a FLOW
/// pin that idles high (so the defensive re-check in `wait_flow` never
/// trips once the semaphore wait itself succeeds).
///
/// `bus` is a leaked `&'static FakeBus` rather than an owned value: a
/// test needs to keep scripting/inspecting the same bus instance after
/// `hal` has been moved into a `SpiTransport`, and needs to wire the
/// bus's flow/notify pulses back to that same (by-then-constructed)
/// transport — an unavoidable bit of shared mutable test plumbing that
/// `FakeBus`'s all-`Cell`/`RefCell` interior makes safe to alias.
pub struct FakeHal {
    pub bus: &'static FakeBus,
    nss: FakePin,
    reset: FakePin,
    flow: FakePin,
}

impl FakeHal {
    pub fn new() -> Self {
        Self {
            bus: Box::leak(Box::new(FakeBus::new())),
            nss: FakePin::new(true),
            reset: FakePin::new(true),
            flow: FakePin::new(true),
        }
    }
}

impl SpiHal for FakeHal {
    type Bus = FakeBus;
    type Nss = FakePin;
    type Reset = FakePin;
    type Flow = FakePin;

    fn bus(&mut self) -> &mut FakeBus {
        // SAFETY: test-only. `FakeBus`'s public surface only ever takes
        // `&self` (its state lives behind `Cell`/`RefCell`), so handing
        // out `&mut FakeBus` from a shared `&'static FakeBus` never
        // allows two live references to actually race on the same cell.
        unsafe { &mut *(self.bus as *const FakeBus as *mut FakeBus) }
    }

    fn nss(&mut self) -> &mut FakePin {
        &mut self.nss
    }

    fn reset(&mut self) -> &mut FakePin {
        &mut self.reset
    }

    fn flow(&mut self) -> &mut FakePin {
        &mut self.flow
    }
}

/// A monotonic clock driven entirely by its own `delay_ms`/`delay_ticks`
/// calls rather than real wall-clock time, so timeout-spinning tests
/// (the FLOW watchdog above all) run instantly regardless of the
/// configured timeout.
pub struct VirtualClock;

static VIRTUAL_TICKS: critical_section::Mutex<Cell<u64>> = critical_section::Mutex::new(Cell::new(0));

impl crate::platform::Clock for VirtualClock {
    fn now_ms() -> u64 {
        critical_section::with(|cs| VIRTUAL_TICKS.borrow(cs).get())
    }

    fn delay_ms(ms: u32) {
        critical_section::with(|cs| {
            let cell = VIRTUAL_TICKS.borrow(cs);
            cell.set(cell.get() + u64::from(ms));
        });
    }
}
