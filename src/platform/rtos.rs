//! Preemptive-RTOS backend built on the `freertos-rust` bindings.
//!
//! Thin adapters from this crate's primitive traits onto real FreeRTOS
//! objects, matching the original driver's `COMPILATION_WITH_FREERTOS`
//! branch (`xSemaphoreCreateCounting`, `xQueueCreate`, `xTaskCreate`) but
//! through an idiomatic Rust binding crate instead of raw FFI.

use core::marker::PhantomData;

use freertos_rust::{Duration, FreeRtosUtils, Queue, Semaphore as FreeRtosSemaphore, Task, TaskPriority};

use super::{Clock, MessageQueue, Platform, RecursiveMutex, Semaphore};

fn to_duration(timeout_ms: u32) -> Duration {
    if timeout_ms == u32::MAX {
        Duration::infinite()
    } else {
        Duration::ms(timeout_ms)
    }
}

/// Recursive mutex backed by a FreeRTOS recursive mutex handle.
pub struct RtosMutex {
    inner: freertos_rust::Mutex<()>,
}

impl RecursiveMutex for RtosMutex {
    fn new() -> Self {
        Self {
            inner: freertos_rust::Mutex::new(()).expect("mutex allocation failed"),
        }
    }

    fn lock(&self) {
        // Held for the lifetime of the caller's critical section; the
        // original contract is "lock blocks until owned, the owner may
        // re-lock", which `freertos_rust::Mutex` provides recursively.
        core::mem::forget(self.inner.lock(Duration::infinite()).expect("mutex lock failed"));
    }

    fn unlock(&self) {
        // The guard produced by `lock` above was intentionally leaked, so
        // unlocking here re-derives and drops a guard to release it. This
        // mirrors the original's separate lock/unlock call pair rather
        // than Rust's usual scoped-guard idiom, since the trait contract
        // is call/release, not RAII.
        if let Ok(guard) = self.inner.lock(Duration::zero()) {
            drop(guard);
        }
    }
}

/// Counting semaphore backed by a FreeRTOS counting semaphore handle.
pub struct RtosSemaphore {
    inner: FreeRtosSemaphore,
}

impl Semaphore for RtosSemaphore {
    fn new(max: u32, initial: u32) -> Self {
        Self {
            inner: FreeRtosSemaphore::new_counting(max, initial).expect("semaphore allocation failed"),
        }
    }

    fn take(&self, timeout_ms: u32) -> bool {
        self.inner.take(to_duration(timeout_ms)).is_ok()
    }

    fn try_take(&self) -> bool {
        self.inner.take(Duration::zero()).is_ok()
    }

    fn release(&self) {
        let _ = self.inner.give();
    }

    fn release_from_isr(&self) {
        let _ = self.inner.give_from_isr();
    }
}

/// Bounded message queue backed by a FreeRTOS queue of `T`.
pub struct RtosQueue<T: Copy> {
    inner: Queue<T>,
}

impl<T: Copy> MessageQueue<T> for RtosQueue<T> {
    fn new() -> Self {
        Self {
            inner: Queue::new(4).expect("queue allocation failed"),
        }
    }

    fn put(&self, msg: T, timeout_ms: u32) -> bool {
        self.inner.send(msg, to_duration(timeout_ms)).is_ok()
    }

    fn get(&self, timeout_ms: u32) -> Option<T> {
        self.inner.receive(to_duration(timeout_ms)).ok()
    }
}

/// Marker backend selecting the FreeRTOS-backed primitives, generic over
/// the monotonic clock (FreeRTOS's own tick count, exposed via
/// `FreeRtosUtils::get_tick_count()`, is the natural implementation).
pub struct RtosPlatform<C> {
    _clock: PhantomData<C>,
}

impl<C: Clock> Platform for RtosPlatform<C> {
    type Mutex = RtosMutex;
    type Semaphore = RtosSemaphore;
    type Queue<T: Copy> = RtosQueue<T>;
    type Clock = C;
    type ThreadHandle = freertos_rust::TaskHandle;

    fn spawn(entry: fn(), name: &'static str, stack_words: usize, priority: u8) -> Option<Self::ThreadHandle> {
        Task::new()
            .name(name)
            .stack_size(stack_words as u16)
            .priority(TaskPriority(priority as u32))
            .start(move |_this_task| entry())
            .ok()
    }
}

/// Monotonic clock backed by the FreeRTOS tick counter.
pub struct RtosClock;

impl Clock for RtosClock {
    fn now_ms() -> u64 {
        u64::from(FreeRtosUtils::get_tick_count())
    }

    fn delay_ms(ms: u32) {
        freertos_rust::CurrentTask::delay(Duration::ms(ms));
    }
}
