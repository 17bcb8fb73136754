//! Network buffer pool.
//!
//! A network buffer is an opaque, fixed-capacity, move-only container:
//! transport (for rx) or an API caller (for tx) creates one, ownership
//! transfers exclusively down the pipeline, and the sole consumer frees
//! it. Two interchangeable backends are selected at build time: a
//! statically-allocated [`pool`] (default) and a [`host_stack`] adapter
//! wrapping a caller-supplied native packet type (feature `host-stack`).

pub mod pool;
#[cfg(feature = "host-stack")]
pub mod host_stack;

/// Lightweight, `Copy` handle to a buffer in flight through a bounded
/// queue. The queue primitive only moves pointer-sized messages; the
/// token is reinflated back into an owning [`NetworkBuffer`] by the
/// consumer. See `pool::PooledBuffer::{leak, from_token}`.
pub type BufferToken = u16;

/// Operations common to every network buffer, regardless of backend.
pub trait NetworkBuffer {
    /// Total storage capacity, in bytes.
    fn capacity(&self) -> usize;
    /// Number of leading bytes hidden from [`NetworkBuffer::payload`] —
    /// typically a link/IPC header the lower layer has already consumed.
    fn reserved_prefix(&self) -> usize;
    /// Current payload length, excluding the reserved prefix.
    fn payload_len(&self) -> usize;
    /// Sets the payload length. Must not exceed `capacity - reserved_prefix`.
    fn set_payload_len(&mut self, len: usize);
    /// Hides `by` additional leading bytes, shrinking the visible payload
    /// and growing the reserved prefix — used to strip a header a lower
    /// layer has already decoded without copying.
    fn advance(&mut self, by: usize);
    /// The payload view, after the reserved prefix.
    fn payload(&self) -> &[u8];
    fn payload_mut(&mut self) -> &mut [u8];
    /// The full backing storage, including the reserved prefix — used to
    /// write a header into bytes reserved ahead of a caller's frame (the
    /// bypass-output path).
    fn full(&self) -> &[u8];
    fn full_mut(&mut self) -> &mut [u8];
}
