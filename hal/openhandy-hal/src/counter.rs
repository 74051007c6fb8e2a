//! Interrupt-fed position counter
//!
//! One context (the encoder edge handler) writes, one context (the control
//! loop) reads. The writer updates with a plain load and store, so no
//! read-modify-write atomics are required on ARMv6-M.

use portable_atomic::{AtomicI32, Ordering};

/// Shared absolute position count
#[derive(Debug)]
pub struct PositionCounter {
    count: AtomicI32,
}

impl Default for PositionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicI32::new(0),
        }
    }

    /// Add `delta` counts
    ///
    /// Must only be called from the single writer context.
    pub fn advance(&self, delta: i32) {
        let next = self.count.load(Ordering::Relaxed).wrapping_add(delta);
        self.count.store(next, Ordering::Release);
    }

    /// Current count
    pub fn load(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }
}
