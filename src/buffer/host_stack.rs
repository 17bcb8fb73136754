//! Host-hosted-stack buffer backend: wraps a host network stack's native
//! packet buffer type instead of allocating from a private arena.
//! Capacity is computed from MTU (1500) + link header (14) +
//! encapsulation header (28), per the component design.

use super::NetworkBuffer;

/// MTU assumed for sizing a host-stack packet buffer.
pub const MTU: usize = 1500;
/// Ethernet header size.
pub const LINK_HEADER: usize = 14;
/// IPC + bypass-descriptor encapsulation overhead reserved ahead of the
/// link-layer frame.
pub const ENCAPSULATION_HEADER: usize = 28;
/// Total recommended allocation size for a host-stack packet buffer.
pub const HOST_BUFFER_CAPACITY: usize = MTU + LINK_HEADER + ENCAPSULATION_HEADER;

/// Minimal contract a host stack's native packet type must satisfy to be
/// wrapped as a [`NetworkBuffer`]. An integrator implements this over
/// e.g. an `smoltcp` `PacketBuffer` or a DMA descriptor ring entry.
pub trait HostPacket {
    fn capacity(&self) -> usize;
    fn len(&self) -> usize;
    fn set_len(&mut self, len: usize);
    fn as_bytes(&self) -> &[u8];
    fn as_bytes_mut(&mut self) -> &mut [u8];
}

/// Adapter from a [`HostPacket`] to this crate's [`NetworkBuffer`]
/// contract, adding the reserved-prefix bookkeeping the host packet type
/// itself does not know about.
pub struct HostBuffer<P: HostPacket> {
    inner: P,
    reserved_prefix: usize,
}

impl<P: HostPacket> HostBuffer<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            reserved_prefix: 0,
        }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: HostPacket> NetworkBuffer for HostBuffer<P> {
    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn reserved_prefix(&self) -> usize {
        self.reserved_prefix
    }

    fn payload_len(&self) -> usize {
        self.inner.len() - self.reserved_prefix
    }

    fn set_payload_len(&mut self, len: usize) {
        self.inner.set_len(self.reserved_prefix + len);
    }

    fn advance(&mut self, by: usize) {
        debug_assert!(by <= self.payload_len());
        self.reserved_prefix += by;
    }

    fn payload(&self) -> &[u8] {
        &self.inner.as_bytes()[self.reserved_prefix..]
    }

    fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.inner.as_bytes_mut()[self.reserved_prefix..]
    }

    fn full(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    fn full_mut(&mut self) -> &mut [u8] {
        self.inner.as_bytes_mut()
    }
}
