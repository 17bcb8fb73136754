//! SPI transport (HCI I/O): drives SPI plus the FLOW/NOTIFY/NSS/RESET
//! handshake lines, exchanges framed turns with the module, and delivers
//! inbound payloads into a bounded fifo for the IPC layer to demultiplex.

pub mod header;
pub mod spi;

use crate::error::Result;

/// Fixed method set the IPC layer is generic over, so a hypothetical
/// UART transport would implement the same trait.
pub trait Transport {
    /// Performs RESET-line power-on sequencing and prepares the worker.
    fn initialize(&self) -> Result<()>;
    /// Accepts `bytes` for transmission on the next turn. Returns the
    /// number of bytes accepted (0 if `bytes.len()` exceeds the maximum
    /// payload size); does not block on the actual wire transfer.
    fn send(&self, bytes: &[u8]) -> usize;
    /// Runs one iteration of the worker loop body, used by a cooperative
    /// (no-os) integration in place of a dedicated IO thread.
    fn process_polling_data(&self, timeout_ms: u32) -> Result<()>;
    /// Signals the worker to exit on its next wake and stop accepting new
    /// sends.
    fn un_initialize(&self);
}

/// HAL surface the transport is generic over: one SPI bus plus the three
/// host-driven/sensed GPIO lines. FLOW/NOTIFY edge events are delivered by
/// the integrator calling [`spi::SpiTransport::on_flow_rising`] /
/// [`spi::SpiTransport::on_notify_rising`] from real interrupt handlers;
/// this trait only exposes the level-sensing needed for the post-wait
/// defensive re-check the original driver performs in `waitFlowHigh`.
pub trait SpiHal {
    type Bus: embedded_hal::spi::SpiBus<u8>;
    type Nss: embedded_hal::digital::OutputPin;
    type Reset: embedded_hal::digital::OutputPin;
    type Flow: embedded_hal::digital::InputPin;

    fn bus(&mut self) -> &mut Self::Bus;
    fn nss(&mut self) -> &mut Self::Nss;
    fn reset(&mut self) -> &mut Self::Reset;
    fn flow(&mut self) -> &mut Self::Flow;
}
