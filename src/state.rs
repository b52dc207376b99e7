/// Shared capture state: the run flag and the matched-frame counter.
///
/// Both are plain atomics so the driver callback can read them without
/// taking a lock.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Process-wide "capturing" flag.
///
/// SeqCst throughout: `stop()` relies on a total order between clearing
/// this flag and draining in-flight callbacks.
pub struct CaptureState {
    running: AtomicBool,
}

impl CaptureState {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stopped → Running. Returns false if it was already running.
    pub fn start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Running → Stopped. Returns whether it was running.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::new()
    }
}

/// Count of matched frames since the session started.
pub struct PacketCounter {
    count: AtomicU32,
}

impl PacketCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
        }
    }

    /// Increment and return the new value. Only the callback thread calls this.
    pub fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    pub fn get(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl Default for PacketCounter {
    fn default() -> Self {
        Self::new()
    }
}
