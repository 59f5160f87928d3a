//! Amplitude (tremolo) and pitch (vibrato) LFOs shared by every operator of a chip

use super::registers::TestFlags;
use super::tables::{AM_TABLE, PM_DP_BITS, PM_DP_WIDTH, PM_PG_BITS};

/// Pitch LFO phase increment per tick (one PM step every 1024 ticks)
const PM_DPHASE: u32 = PM_DP_WIDTH / (1024 * 8);

/// Chip-wide LFO state
#[derive(Debug, Clone, Default)]
pub struct Lfo {
    pm_phase: u32,
    am_phase: u32,
    am: u8,
}

impl Lfo {
    /// Create an LFO at phase zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Return both phases to zero
    pub fn reset(&mut self) {
        self.pm_phase = 0;
        self.am_phase = 0;
        self.am = 0;
    }

    /// Advance one tick
    #[inline]
    pub fn update(&mut self, test: TestFlags) {
        let fast = test.contains(TestFlags::LFO_FAST);
        let pm_inc = if fast { PM_DPHASE << 10 } else { PM_DPHASE };
        let am_inc = if fast { 64 } else { 1 };

        if test.contains(TestFlags::LFO_RESET) {
            self.pm_phase = 0;
            self.am_phase = 0;
        } else {
            self.pm_phase = (self.pm_phase + pm_inc) & (PM_DP_WIDTH - 1);
            self.am_phase = self.am_phase.wrapping_add(am_inc);
        }
        self.am = AM_TABLE[((self.am_phase >> 6) as usize) % AM_TABLE.len()];
    }

    /// Current tremolo attenuation in envelope units
    #[inline]
    pub fn am(&self) -> u8 {
        self.am
    }

    /// Current vibrato step (column of the PM table)
    #[inline]
    pub fn pm_step(&self) -> usize {
        (self.pm_phase >> (PM_DP_BITS - PM_PG_BITS)) as usize
    }
}
