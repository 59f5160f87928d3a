//! Locked chip handle for cross-thread use
//!
//! A chip instance is not internally synchronized. [`SharedYm2413`] serializes a
//! control thread (register writes) and an audio thread (sample pulls) on one
//! `parking_lot::Mutex`. Buffer fills take the lock once per buffer.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::ym2413::Ym2413;

/// Cloneable, thread-safe handle to one chip
#[derive(Clone)]
pub struct SharedYm2413 {
    inner: Arc<Mutex<Ym2413>>,
}

impl SharedYm2413 {
    /// Wrap a chip
    pub fn new(chip: Ym2413) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chip)),
        }
    }

    /// Lock the chip for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, Ym2413> {
        self.inner.lock()
    }

    /// Write one register
    pub fn write_register(&self, addr: u8, value: u8) {
        self.inner.lock().write_register(addr, value);
    }

    /// Apply a batch of (address, value) writes under one lock
    pub fn write_registers(&self, writes: &[(u8, u8)]) {
        let mut chip = self.inner.lock();
        for &(addr, value) in writes {
            chip.write_register(addr, value);
        }
    }

    /// Fill a buffer with mono samples
    pub fn fill_mono(&self, buffer: &mut [i16]) {
        let mut chip = self.inner.lock();
        for sample in buffer.iter_mut() {
            *sample = chip.get_sample();
        }
    }

    /// Fill an interleaved (L, R) buffer with stereo frames; a trailing odd element is untouched
    pub fn fill_stereo(&self, buffer: &mut [i32]) {
        let mut chip = self.inner.lock();
        for frame in buffer.chunks_exact_mut(2) {
            let (left, right) = chip.get_stereo_sample();
            frame[0] = left;
            frame[1] = right;
        }
    }

    /// Reset the chip
    pub fn reset(&self) {
        self.inner.lock().reset();
    }
}

impl std::fmt::Debug for SharedYm2413 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedYm2413")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_one_chip() {
        let shared = SharedYm2413::new(Ym2413::new(3_579_545, 44_100).unwrap());
        let other = shared.clone();
        other.write_registers(&[(0x30, 0x21), (0x0e, 0x20)]);
        let chip = shared.lock();
        assert_eq!(chip.read_register(0x30), 0x21);
        assert!(chip.rhythm_mode());
    }
}
