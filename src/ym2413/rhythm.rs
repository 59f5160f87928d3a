//! Rhythm mode voices and noise sources
//!
//! With rhythm mode on, the operators of channels 7-9 become five percussion voices.
//! Bass drum keeps regular two-operator FM, tom is a lone sine operator, and hi-hat,
//! snare and top cymbal replace the phase generator output with fixed phases chosen
//! by the noise bits below.

use bitflags::bitflags;

use super::tables::PG_BITS;

/// Bass drum modulator (channel 7 modulator)
pub const SLOT_BD1: usize = 12;
/// Bass drum carrier (channel 7 carrier)
pub const SLOT_BD2: usize = 13;
/// Hi-hat (channel 8 modulator)
pub const SLOT_HH: usize = 14;
/// Snare drum (channel 8 carrier)
pub const SLOT_SD: usize = 15;
/// Tom-tom (channel 9 modulator)
pub const SLOT_TOM: usize = 16;
/// Top cymbal (channel 9 carrier)
pub const SLOT_CYM: usize = 17;

/// First channel taken over by rhythm mode (0-based)
pub const FIRST_RHYTHM_CHANNEL: usize = 6;

/// Initial LFSR state after reset
const NOISE_SEED: u32 = 0xffff;
/// Feedback taps of the 23-bit white noise LFSR
const NOISE_TAPS: u32 = 0x800_3020;

bitflags! {
    /// Rhythm Control Register (0x0E) bitflags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RhythmFlags: u8 {
        /// Hi-hat key
        const HH = 0x01;
        /// Top cymbal key
        const CYM = 0x02;
        /// Tom-tom key
        const TOM = 0x04;
        /// Snare drum key
        const SD = 0x08;
        /// Bass drum key
        const BD = 0x10;
        /// Rhythm mode enable
        const RHYTHM = 0x20;
    }
}

impl RhythmFlags {
    /// Create rhythm flags from raw register value
    pub fn from_register(value: u8) -> Self {
        RhythmFlags::from_bits_truncate(value)
    }

    /// Rhythm mode enabled
    pub fn rhythm_mode(&self) -> bool {
        self.contains(RhythmFlags::RHYTHM)
    }
}

#[inline]
fn bit(value: u32, n: u32) -> bool {
    (value >> n) & 1 != 0
}

/// White noise LFSR plus the "short noise" bit derived from hi-hat and cymbal phases
#[derive(Debug, Clone)]
pub struct Noise {
    seed: u32,
    white: bool,
    short: bool,
}

impl Noise {
    /// Create a noise generator in its reset state
    pub fn new() -> Self {
        Noise {
            seed: NOISE_SEED,
            white: false,
            short: false,
        }
    }

    /// Reload the LFSR seed
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Shift the LFSR once. Runs every tick, rhythm mode or not.
    #[inline]
    pub fn update_white(&mut self) {
        if self.seed & 1 != 0 {
            self.seed ^= NOISE_TAPS;
        }
        self.seed >>= 1;
        self.white = self.seed & 1 != 0;
    }

    /// Recompute the short noise bit from the hi-hat and cymbal phase outputs
    #[inline]
    pub fn update_short(&mut self, pg_hh: u32, pg_cym: u32) {
        let h_bit2 = bit(pg_hh, PG_BITS - 8);
        let h_bit7 = bit(pg_hh, PG_BITS - 3);
        let h_bit3 = bit(pg_hh, PG_BITS - 7);

        let c_bit3 = bit(pg_cym, PG_BITS - 7);
        let c_bit5 = bit(pg_cym, PG_BITS - 5);

        self.short = (h_bit2 ^ h_bit7) | (h_bit3 ^ c_bit5) | (c_bit3 ^ c_bit5);
    }

    /// Current white noise bit
    #[inline]
    pub fn white(&self) -> bool {
        self.white
    }

    /// Current short noise bit
    #[inline]
    pub fn short(&self) -> bool {
        self.short
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}

/// Hi-hat waveform phase
#[inline]
pub fn hihat_phase(noise: &Noise) -> usize {
    match (noise.short(), noise.white()) {
        (true, true) => 0x2d0,
        (true, false) => 0x234,
        (false, true) => 0x34,
        (false, false) => 0xd0,
    }
}

/// Snare drum waveform phase, driven by bit 8 of its own phase output
#[inline]
pub fn snare_phase(pg_out: u32, noise: &Noise) -> usize {
    match (bit(pg_out, PG_BITS - 2), noise.white()) {
        (true, true) => 0x300,
        (true, false) => 0x200,
        (false, true) => 0x0,
        (false, false) => 0x100,
    }
}

/// Top cymbal waveform phase
#[inline]
pub fn cymbal_phase(noise: &Noise) -> usize {
    if noise.short() {
        0x300
    } else {
        0x100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfsr_first_bits() {
        let mut noise = Noise::new();
        // 0xffff is odd: taps applied, then shifted
        noise.update_white();
        assert_eq!(noise.seed, (0xffff ^ NOISE_TAPS) >> 1);
        assert_eq!(noise.white(), noise.seed & 1 != 0);
    }

    #[test]
    fn test_lfsr_never_locks_up() {
        let mut noise = Noise::new();
        let mut ones = 0;
        for _ in 0..10_000 {
            noise.update_white();
            assert_ne!(noise.seed, 0);
            ones += noise.white() as u32;
        }
        assert!((3_000..7_000).contains(&ones), "ones = {ones}");
    }

    #[test]
    fn test_short_noise_bits() {
        let mut noise = Noise::new();
        noise.update_short(0, 0);
        assert!(!noise.short());
        // hi-hat bit 2 alone
        noise.update_short(1 << 2, 0);
        assert!(noise.short());
        // hi-hat bit 2 and bit 7 cancel
        noise.update_short((1 << 2) | (1 << 7), 0);
        assert!(!noise.short());
        // cymbal bit 5 alone pairs against both hi-hat bit 3 and cymbal bit 3
        noise.update_short(0, 1 << 5);
        assert!(noise.short());
    }

    #[test]
    fn test_percussion_phases() {
        let mut noise = Noise::new();
        noise.update_short(0, 0);
        assert_eq!(cymbal_phase(&noise), 0x100);
        assert_eq!(snare_phase(0, &noise), if noise.white() { 0x0 } else { 0x100 });
        assert_eq!(
            snare_phase(1 << 8, &noise),
            if noise.white() { 0x300 } else { 0x200 }
        );
        assert_eq!(hihat_phase(&noise), if noise.white() { 0x34 } else { 0xd0 });
    }

    #[test]
    fn test_rhythm_flags() {
        let flags = RhythmFlags::from_register(0x31);
        assert!(flags.rhythm_mode());
        assert!(flags.contains(RhythmFlags::BD | RhythmFlags::HH));
        assert!(!flags.contains(RhythmFlags::SD));
    }
}
