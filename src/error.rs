//! Driver-wide error taxonomy.
//!
//! Mirrors the distinct result kinds of the original EMW driver's status
//! enum, minus the `Ok` variant (modelled as `Result::Ok` instead).

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, DriverError>;

/// Error kinds returned by the public API.
///
/// Conditions that would otherwise be treated as fatal (OS-primitive
/// allocation failure, a full push of an already-allocated rx buffer,
/// firmware revision below the supported minimum, a partial transport
/// write) are not represented here: a library must not unilaterally
/// abort its host process, so those paths `debug_assert!` in place and
/// degrade to [`DriverError::Error`] in release builds.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The IPC rendezvous wait expired before a response arrived.
    #[error("ipc request timed out")]
    Timeout,
    /// The SPI transfer failed, or the module's header failed validation
    /// (`type` mismatch or `len ^ lenx != 0xFFFF`).
    #[error("transport io error")]
    IoError,
    /// A caller-supplied argument was out of range.
    #[error("invalid parameter")]
    ParamError,
    /// The module responded with a non-zero status, or any other
    /// non-fatal failure.
    #[error("request failed")]
    Error,
}

impl DriverError {
    /// Translates a raw module-side status code (`0` success) into a
    /// result, matching the "per-command `status` field ... becomes OK
    /// iff zero" rule of the error handling design.
    pub fn from_status(status: i32) -> Result<()> {
        if status == 0 {
            Ok(())
        } else {
            Err(DriverError::Error)
        }
    }
}
