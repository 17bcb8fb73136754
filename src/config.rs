//! Build-time tunables.
//!
//! Exposed as associated constants on a trait rather than a runtime config
//! structure, so a build can override any of them with a zero-cost
//! alternate implementation instead of a boxed dyn or runtime lookup.

/// Sentinel request id meaning "no request pending".
pub const REQ_ID_NONE: u32 = 0xFFFF_FFFF;

/// Size, in bytes, of the on-wire IPC header (`req_id` + `api_id`).
pub const IPC_HEADER_SIZE: usize = 6;

/// Size, in bytes, of the on-wire SPI header.
pub const SPI_HEADER_SIZE: usize = 7;

/// Bytes of the 22-byte bypass input/output descriptor.
pub const BYPASS_DESCRIPTOR_SIZE: usize = 22;

/// The literal power-save wake packet.
pub const POWER_SAVE_WAKE_PACKET: &[u8] = b"dummy";

/// Tunable knobs, gathered behind a trait so a downstream crate can supply
/// an alternate set without touching core logic.
pub trait Config {
    /// Maximum payload carried by one network buffer (default 2500).
    const BUFFER_CAPACITY: usize = 2500;
    /// Depth of the inbound fifo feeding the IPC demultiplexer.
    const INBOUND_FIFO_DEPTH: usize = 4;
    /// Number of statically-allocated network buffers in the
    /// `module-hosted-stack` pool.
    const BUFFER_POOL_SIZE: usize = 8;
    /// FLOW-line watchdog, milliseconds.
    const HARDWARE_WATCHDOG_MS: u32 = 2000;
    /// Default IPC wait for most commands, milliseconds.
    const DEFAULT_TIMEOUT_MS: u32 = 10_000;
    /// IPC wait for `scan`, milliseconds.
    const SCAN_TIMEOUT_MS: u32 = 5_000;
    /// IPC wait for connect / disconnect / WPS, milliseconds.
    const CONNECT_TIMEOUT_MS: u32 = 15_000;
    /// IPC wait for get-IP / get-IPv6, milliseconds.
    const GET_IP_TIMEOUT_MS: u32 = 12_000;
    /// IPC wait for soft-AP start, milliseconds.
    const SOFTAP_START_TIMEOUT_MS: u32 = 3_000;
    /// Delay after sending the power-save wake packet, milliseconds.
    const POWER_SAVE_WAKE_DELAY_MS: u32 = 10;
    /// Minimum accepted firmware version string, compared lexicographically
    /// the way the original driver compares `"V2.3.4"`.
    const MINIMUM_FIRMWARE_VERSION: &'static str = "V2.3.4";
    /// RESET line low-hold duration, milliseconds.
    const RESET_LOW_MS: u32 = 100;
    /// RESET settle duration after driving the line high, milliseconds.
    const RESET_SETTLE_MS: u32 = 1200;
    /// Maximum accepted length for a CA/client certificate blob.
    const MAX_CERTIFICATE_LEN: usize = 2500;
    /// Maximum accepted length for a TLS SNI host name.
    const MAX_SNI_LEN: usize = 128;
    /// Timeout used to wait for FOREVER-style blocking operations at the
    /// platform layer (u32::MAX milliseconds, matching
    /// `EMW_OS_TIMEOUT_FOREVER`).
    const TIMEOUT_FOREVER: u32 = u32::MAX;
}

/// Default configuration implementing every constant above unmodified.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConfig;

impl Config for DefaultConfig {}
