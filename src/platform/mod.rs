//! OS-portable primitives: counting semaphores, recursive mutexes, bounded
//! message queues, threads, and a monotonic clock — with identical
//! contracts across a preemptive RTOS backend and a cooperative,
//! thread-free backend.
//!
//! The original driver attached a C-style `RunnerHook_t(this, arg,
//! timeout)` callback to a blocking primitive so a cooperative build could
//! pump the transport while a caller waited. That pattern does not
//! translate cleanly into safe, alloc-free Rust (it relies on untyped
//! `void*` back-references). Here the same effect is obtained with an
//! explicit combinator, [`wait_with_poll`], called by the one or two sites
//! that actually own both a semaphore and a poll routine (the IPC
//! rendezvous wait, the buffer-pool starvation retry) — see DESIGN.md,
//! "Open Question decisions", #8.

pub mod no_os;
#[cfg(feature = "rtos")]
pub mod rtos;

/// A monotonic millisecond clock plus blocking delay primitives.
pub trait Clock {
    /// Milliseconds since an arbitrary but fixed epoch.
    fn now_ms() -> u64;
    /// Blocks the calling context for approximately `ms` milliseconds.
    fn delay_ms(ms: u32);
    /// Blocks for a small, implementation-defined "tick" — used by the
    /// buffer-starvation retry loop, which only needs forward progress,
    /// not a precise duration.
    fn delay_ticks(ticks: u32) {
        Self::delay_ms(ticks);
    }
}

/// A recursive mutex: lock blocks until owned; the owner may re-lock.
pub trait RecursiveMutex: Sized {
    fn new() -> Self;
    fn lock(&self);
    fn unlock(&self);
}

/// A counting semaphore with a bounded maximum count.
pub trait Semaphore: Sized {
    fn new(max: u32, initial: u32) -> Self;
    /// Blocks until the count is positive or `timeout_ms` elapses.
    /// `timeout_ms == Config::TIMEOUT_FOREVER` blocks indefinitely.
    fn take(&self, timeout_ms: u32) -> bool;
    /// Non-blocking variant of [`take`](Semaphore::take).
    fn try_take(&self) -> bool;
    /// Increments the count and wakes a waiter, if any. Saturates at the
    /// configured maximum (a spurious extra release is logged, not fatal,
    /// matching the original `TxRxSem`'s coalescing behaviour).
    fn release(&self);
    /// Variant of [`release`](Semaphore::release) safe to call from
    /// interrupt context: never blocks, never yields.
    fn release_from_isr(&self) {
        self.release();
    }
}

/// A bounded FIFO queue of `Copy` messages (conceptually pointer-sized:
/// the crate only ever queues [`crate::buffer::BufferToken`] values).
pub trait MessageQueue<T: Copy>: Sized {
    fn new() -> Self;
    fn put(&self, msg: T, timeout_ms: u32) -> bool;
    fn get(&self, timeout_ms: u32) -> Option<T>;
}

/// Bundles the primitive families plus a thread-spawn contract so the
/// transport and IPC layers are generic over one type parameter.
pub trait Platform {
    type Mutex: RecursiveMutex;
    type Semaphore: Semaphore;
    type Queue<T: Copy>: MessageQueue<T>;
    type Clock: Clock;
    /// Opaque handle to a spawned worker. Under the `no-os` backend this
    /// is `()`: there is nothing to spawn, callers drive progress by
    /// calling blocking API methods directly.
    type ThreadHandle;

    /// Spawns a named worker at the given priority. Returns `None` when
    /// the backend has no real threads (`no-os`).
    fn spawn(entry: fn(), name: &'static str, stack_words: usize, priority: u8) -> Option<Self::ThreadHandle>;
}

/// Cooperatively waits on `sem`, invoking `poll` in a loop with the
/// remaining timeout until the semaphore becomes available or the overall
/// `timeout_ms` elapses. On an RTOS backend this degenerates to a single
/// call to `sem.take(timeout_ms)` with `poll` never invoked, since a real
/// receive thread already drains the transport independently.
pub fn wait_with_poll<S, C, F>(sem: &S, timeout_ms: u32, mut poll: F) -> bool
where
    S: Semaphore,
    C: Clock,
    F: FnMut(u32),
{
    if sem.try_take() {
        return true;
    }
    if timeout_ms == 0 {
        return false;
    }
    let forever = timeout_ms == u32::MAX;
    let deadline = if forever { 0 } else { C::now_ms() + u64::from(timeout_ms) };
    loop {
        let remaining = if forever {
            u32::MAX
        } else {
            let now = C::now_ms();
            if now >= deadline {
                return false;
            }
            (deadline - now) as u32
        };
        poll(remaining);
        if sem.try_take() {
            return true;
        }
        if !forever && C::now_ms() >= deadline {
            return false;
        }
    }
}
