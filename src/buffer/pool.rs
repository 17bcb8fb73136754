//! Module-hosted-stack buffer backend: a fixed arena of statically
//! allocated slots, tracked by a free bitmap guarded by
//! [`critical_section`]. No heap allocator required, matching
//! `examples/original_source/drivers/emw/EmwNetworkStack.hpp`'s static
//! arena.

use core::cell::{RefCell, UnsafeCell};

use critical_section::Mutex as CsMutex;

use super::{BufferToken, NetworkBuffer};

#[derive(Clone, Copy)]
struct SlotMeta {
    in_use: bool,
    payload_len: usize,
    reserved_prefix: usize,
}

impl SlotMeta {
    const fn empty() -> Self {
        Self {
            in_use: false,
            payload_len: 0,
            reserved_prefix: 0,
        }
    }
}

/// Fixed pool of `N` buffers of `CAP` bytes each.
///
/// `CAP` defaults to [`crate::config::Config::BUFFER_CAPACITY`] (2500) and
/// `N` to [`crate::config::Config::BUFFER_POOL_SIZE`] (8) at the call
/// sites that instantiate [`DefaultPool`]; both are plain const generics
/// here rather than pulled from the `Config` trait, since stable Rust
/// cannot use an associated const of a generic type parameter as an array
/// length.
pub struct Pool<const N: usize, const CAP: usize> {
    storage: [UnsafeCell<[u8; CAP]>; N],
    meta: CsMutex<RefCell<[SlotMeta; N]>>,
}

// SAFETY: access to `storage[i]` is exclusive to whichever `PooledBuffer`
// currently owns slot `i`, enforced by `meta`'s `in_use` flag being set
// only while that buffer exists and cleared only on drop/free.
unsafe impl<const N: usize, const CAP: usize> Sync for Pool<N, CAP> {}

impl<const N: usize, const CAP: usize> Pool<N, CAP> {
    pub const fn new() -> Self {
        Self {
            storage: [const { UnsafeCell::new([0u8; CAP]) }; N],
            meta: CsMutex::new(RefCell::new([SlotMeta::empty(); N])),
        }
    }

    /// Allocates a free slot, or `None` if the pool is exhausted.
    pub fn alloc(&'static self) -> Option<PooledBuffer> {
        let index = critical_section::with(|cs| {
            let mut meta = self.meta.borrow(cs).borrow_mut();
            for (i, slot) in meta.iter_mut().enumerate() {
                if !slot.in_use {
                    slot.in_use = true;
                    slot.payload_len = 0;
                    slot.reserved_prefix = 0;
                    return Some(i);
                }
            }
            None
        })?;
        Some(PooledBuffer {
            pool: self,
            index: index as u16,
        })
    }

    fn free(&self, index: u16) {
        critical_section::with(|cs| {
            let mut meta = self.meta.borrow(cs).borrow_mut();
            meta[index as usize] = SlotMeta::empty();
        });
    }

    fn set_meta(&self, index: u16, f: impl FnOnce(&mut SlotMeta)) {
        critical_section::with(|cs| {
            let mut meta = self.meta.borrow(cs).borrow_mut();
            f(&mut meta[index as usize]);
        });
    }

    fn get_meta(&self, index: u16) -> SlotMeta {
        critical_section::with(|cs| self.meta.borrow(cs).borrow()[index as usize])
    }

    fn bytes(&self, index: u16) -> *mut [u8; CAP] {
        self.storage[index as usize].get()
    }
}

/// An owned, move-only handle to one pool slot. Returns the slot to the
/// pool on drop unless it has been [`leak`](PooledBuffer::leak)ed into a
/// [`BufferToken`] to pass through a bounded queue.
pub struct PooledBuffer {
    pool: &'static (dyn PoolErase + 'static),
    index: u16,
}

/// Object-safe facade over `Pool<N, CAP>` so `PooledBuffer` need not be
/// generic over the pool's const parameters.
trait PoolErase {
    fn free(&self, index: u16);
    fn set_meta(&self, index: u16, f: &mut dyn FnMut(&mut SlotMeta));
    fn get_meta(&self, index: u16) -> SlotMeta;
    fn capacity(&self) -> usize;
    fn bytes_ptr(&self, index: u16) -> *mut u8;
}

impl<const N: usize, const CAP: usize> PoolErase for Pool<N, CAP> {
    fn free(&self, index: u16) {
        Pool::free(self, index);
    }
    fn set_meta(&self, index: u16, f: &mut dyn FnMut(&mut SlotMeta)) {
        Pool::set_meta(self, index, f);
    }
    fn get_meta(&self, index: u16) -> SlotMeta {
        Pool::get_meta(self, index)
    }
    fn capacity(&self) -> usize {
        CAP
    }
    fn bytes_ptr(&self, index: u16) -> *mut u8 {
        Pool::bytes(self, index).cast()
    }
}

impl PooledBuffer {
    /// Detaches this buffer into a bare token suitable for a
    /// [`crate::platform::MessageQueue`], without running `Drop` (the slot
    /// stays marked in-use). The consumer must call
    /// [`PooledBuffer::from_token`] exactly once to reclaim it.
    pub fn leak(self) -> BufferToken {
        let token = self.index;
        core::mem::forget(self);
        token
    }

    /// Reconstructs a buffer previously detached with
    /// [`leak`](PooledBuffer::leak). `pool` must be the same pool the
    /// token was allocated from.
    pub fn from_token<const N: usize, const CAP: usize>(pool: &'static Pool<N, CAP>, token: BufferToken) -> Self {
        Self { pool, index: token }
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.free(self.index);
    }
}

impl NetworkBuffer for PooledBuffer {
    fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    fn reserved_prefix(&self) -> usize {
        self.pool.get_meta(self.index).reserved_prefix
    }

    fn payload_len(&self) -> usize {
        self.pool.get_meta(self.index).payload_len
    }

    fn set_payload_len(&mut self, len: usize) {
        let cap = self.capacity();
        let prefix = self.reserved_prefix();
        debug_assert!(prefix + len <= cap, "payload length exceeds buffer capacity");
        self.pool.set_meta(self.index, &mut |m| m.payload_len = len);
    }

    fn advance(&mut self, by: usize) {
        let meta = self.pool.get_meta(self.index);
        debug_assert!(by <= meta.payload_len, "advance past current payload length");
        self.pool.set_meta(self.index, &mut |m| {
            m.reserved_prefix += by;
            m.payload_len -= by;
        });
    }

    fn payload(&self) -> &[u8] {
        let meta = self.pool.get_meta(self.index);
        // SAFETY: exclusive ownership of this slot is guaranteed by the
        // move-only `PooledBuffer`/`BufferToken` handoff discipline.
        unsafe {
            let base = self.pool.bytes_ptr(self.index);
            core::slice::from_raw_parts(base.add(meta.reserved_prefix), meta.payload_len)
        }
    }

    fn payload_mut(&mut self) -> &mut [u8] {
        let meta = self.pool.get_meta(self.index);
        unsafe {
            let base = self.pool.bytes_ptr(self.index);
            core::slice::from_raw_parts_mut(base.add(meta.reserved_prefix), meta.payload_len)
        }
    }

    fn full(&self) -> &[u8] {
        let cap = self.capacity();
        unsafe { core::slice::from_raw_parts(self.pool.bytes_ptr(self.index), cap) }
    }

    fn full_mut(&mut self) -> &mut [u8] {
        let cap = self.capacity();
        unsafe { core::slice::from_raw_parts_mut(self.pool.bytes_ptr(self.index), cap) }
    }
}

/// Default pool sizing: 8 buffers of 2500 bytes, matching
/// [`crate::config::DefaultConfig`].
pub type DefaultPool = Pool<8, 2500>;

#[cfg(test)]
mod tests {
    use super::*;

    static POOL: DefaultPool = Pool::new();

    #[test]
    fn alloc_free_and_reuse() {
        let a = POOL.alloc().expect("pool should have free slots");
        let idx_a = a.index;
        drop(a);
        let b = POOL.alloc().expect("slot should be reusable after free");
        assert_eq!(b.index, idx_a);
    }

    #[test]
    fn exhaustion_returns_none() {
        let mut held = heapless::Vec::<PooledBuffer, 8>::new();
        for _ in 0..8 {
            held.push(POOL.alloc().expect("should allocate")).ok().unwrap();
        }
        assert!(POOL.alloc().is_none());
        drop(held);
    }

    #[test]
    fn advance_hides_prefix() {
        let mut buf = POOL.alloc().unwrap();
        buf.set_payload_len(10);
        buf.payload_mut().copy_from_slice(&[0xAAu8; 10]);
        buf.advance(4);
        assert_eq!(buf.payload_len(), 6);
        assert_eq!(buf.reserved_prefix(), 4);
    }

    #[test]
    fn leak_and_recover_via_token() {
        let buf = POOL.alloc().unwrap();
        let token = buf.leak();
        let recovered = PooledBuffer::from_token(&POOL, token);
        assert_eq!(recovered.capacity(), 2500);
    }
}
