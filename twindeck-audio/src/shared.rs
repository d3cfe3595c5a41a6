//! Lock-free cells shared between the control path and the render path

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// `f32` stored as its bit pattern; every store is a single visible write
#[derive(Debug)]
pub(crate) struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

/// `f64` stored as its bit pattern
#[derive(Debug)]
pub(crate) struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// Replace `current` with `new` unless another writer got there first
    ///
    /// Returns false (and leaves the other writer's value) on a lost race.
    #[inline]
    pub fn replace_if_unchanged(&self, current: f64, new: f64) -> bool {
        self.0
            .compare_exchange(
                current.to_bits(),
                new.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

/// Single-slot hand-off from the control path to the render path
///
/// The control path overwrites the slot with a complete value; the render
/// path takes it with `try_lock`, so it never waits. Unconsumed values are
/// replaced, only the latest one matters.
pub(crate) struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Publish a value, returning the one it displaced (if never taken)
    pub fn publish(&self, value: T) -> Option<T> {
        self.slot.lock().replace(value)
    }

    /// Render side: take the pending value without blocking
    ///
    /// On contention the render path keeps its current value for one more block.
    #[inline]
    pub fn try_take(&self) -> Option<T> {
        self.slot.try_lock().and_then(|mut slot| slot.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_float_roundtrip() {
        let a = AtomicF32::new(0.5);
        a.store(-3.25);
        assert_eq!(a.load(), -3.25);

        let b = AtomicF64::new(1.0);
        b.store(1e-9);
        assert_eq!(b.load(), 1e-9);
    }

    #[test]
    fn test_replace_if_unchanged_loses_to_seek() {
        let pos = AtomicF64::new(100.0);
        let seen = pos.load();
        pos.store(5.0); // a seek lands mid-block
        assert!(!pos.replace_if_unchanged(seen, 612.0));
        assert_eq!(pos.load(), 5.0);
        assert!(pos.replace_if_unchanged(5.0, 517.0));
        assert_eq!(pos.load(), 517.0);
    }

    #[test]
    fn test_mailbox_keeps_latest() {
        let mb = Mailbox::new();
        assert_eq!(mb.publish(1), None);
        assert_eq!(mb.publish(2), Some(1));
        assert_eq!(mb.try_take(), Some(2));
        assert_eq!(mb.try_take(), None);
    }
}
