//! YM2413 Envelope Generator
//!
//! Envelope output is a 7-bit attenuation (0 = loudest, [`EG_MUTE`] = silent).
//! The effective rate of the current phase is split into a coarse part (`high`, 0-15)
//! and a fine part (`low`, 0-3). The coarse part sets how often the envelope steps
//! (once every `2^shift` ticks), the fine part picks one of the four increment
//! patterns in [`EG_STEP_TABLES`]. Attack is exponential, everything else is linear.

use std::fmt;

use super::patch::OperatorParams;
use super::tables::{DAMPER_RATE, EG_MUTE, EG_STEP_TABLES};

/// Release rate used while the channel sustain flag is set
const SUSTAIN_FLAG_RELEASE_RATE: u8 = 5;
/// Release rate for percussive patches after key-off
const PERCUSSIVE_RELEASE_RATE: u8 = 7;

/// Envelope phase of one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnvelopeState {
    /// Rising towards full volume
    Attack,
    /// Falling towards the sustain level
    Decay,
    /// Holding (sustained patches) or still falling (percussive patches)
    Sustain,
    /// Falling towards silence after key-off
    #[default]
    Release,
    /// Quick fade-out that precedes every key-on
    Damp,
}

impl EnvelopeState {
    /// Base rate (0-15) of this phase before key-scale rate is applied
    pub fn parameter_rate(self, params: &OperatorParams, sus_flag: bool) -> u8 {
        match self {
            EnvelopeState::Attack => params.ar,
            EnvelopeState::Decay => params.dr,
            EnvelopeState::Sustain => {
                if params.eg {
                    0
                } else {
                    params.rr
                }
            }
            EnvelopeState::Release => {
                if sus_flag {
                    SUSTAIN_FLAG_RELEASE_RATE
                } else if params.eg {
                    params.rr
                } else {
                    PERCUSSIVE_RELEASE_RATE
                }
            }
            EnvelopeState::Damp => DAMPER_RATE,
        }
    }
}

impl fmt::Display for EnvelopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeState::Attack => write!(f, "attack"),
            EnvelopeState::Decay => write!(f, "decay"),
            EnvelopeState::Sustain => write!(f, "sustain"),
            EnvelopeState::Release => write!(f, "release"),
            EnvelopeState::Damp => write!(f, "damp"),
        }
    }
}

/// Effective envelope rate derived from the parameter rate and key-scale rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvelopeRate {
    /// Coarse rate (0-15)
    pub high: u8,
    /// Fine rate (0-3)
    pub low: u8,
    /// Step once every `2^shift` ticks
    pub shift: u8,
}

impl EnvelopeRate {
    /// Combine a phase's parameter rate with the operator's key-scale rate
    pub fn new(state: EnvelopeState, parameter_rate: u8, rks: u8) -> Self {
        if parameter_rate == 0 {
            return EnvelopeRate::default();
        }

        let high = (parameter_rate + (rks >> 2)).min(15);
        let low = rks & 3;
        let shift = if state == EnvelopeState::Attack {
            if 0 < high && high < 12 {
                13 - high
            } else {
                0
            }
        } else if high < 13 {
            13 - high
        } else {
            0
        };

        EnvelopeRate { high, low, shift }
    }

    /// Attack shift amount for this tick (0 = no step)
    #[inline]
    pub fn attack_step(&self, counter: u16) -> u8 {
        let steps = &EG_STEP_TABLES[self.low as usize];
        match self.high {
            12 => 4 - steps[((counter & 0xc) >> 1) as usize],
            13 => 3 - steps[((counter & 0xc) >> 1) as usize],
            14 => 2 - steps[((counter & 0xc) >> 1) as usize],
            0 | 15 => 0,
            _ => {
                if steps[((counter >> self.shift) & 7) as usize] != 0 {
                    4
                } else {
                    0
                }
            }
        }
    }

    /// Decay/release increment for this tick
    #[inline]
    pub fn decay_step(&self, counter: u16) -> u8 {
        let steps = &EG_STEP_TABLES[self.low as usize];
        match self.high {
            0 => 0,
            13 => steps[(((counter & 0xc) >> 1) | (counter & 1)) as usize],
            14 => steps[((counter & 0xc) >> 1) as usize] + 1,
            15 => 2,
            _ => steps[((counter >> self.shift) & 7) as usize],
        }
    }

    /// Advance an envelope output by one tick of the global envelope counter
    #[inline]
    pub fn advance(&self, state: EnvelopeState, eg_out: u8, counter: u16) -> u8 {
        let mask = (1u16 << self.shift) - 1;

        if state == EnvelopeState::Attack {
            if eg_out > 0 && self.high > 0 && (counter & mask & !3) == 0 {
                let s = self.attack_step(counter);
                if s > 0 {
                    let next = eg_out as i32 - (eg_out >> s) as i32 - 1;
                    return next.max(0) as u8;
                }
            }
            eg_out
        } else if self.high > 0 && (counter & mask) == 0 {
            (eg_out + self.decay_step(counter)).min(EG_MUTE)
        } else {
            eg_out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(ar: u8, dr: u8, rr: u8, eg: bool) -> OperatorParams {
        OperatorParams {
            ar,
            dr,
            rr,
            eg,
            ..Default::default()
        }
    }

    #[test]
    fn test_parameter_rate_per_state() {
        let p = params(10, 6, 3, true);
        assert_eq!(EnvelopeState::Attack.parameter_rate(&p, false), 10);
        assert_eq!(EnvelopeState::Decay.parameter_rate(&p, false), 6);
        assert_eq!(EnvelopeState::Sustain.parameter_rate(&p, false), 0);
        assert_eq!(EnvelopeState::Release.parameter_rate(&p, false), 3);
        assert_eq!(EnvelopeState::Release.parameter_rate(&p, true), 5);
        assert_eq!(EnvelopeState::Damp.parameter_rate(&p, false), DAMPER_RATE);

        let percussive = params(10, 6, 3, false);
        assert_eq!(EnvelopeState::Sustain.parameter_rate(&percussive, false), 3);
        assert_eq!(EnvelopeState::Release.parameter_rate(&percussive, false), 7);
    }

    #[test]
    fn test_rate_combines_key_scale() {
        let rate = EnvelopeRate::new(EnvelopeState::Decay, 10, 7);
        assert_eq!(rate.high, 11);
        assert_eq!(rate.low, 3);
        assert_eq!(rate.shift, 2);

        let saturated = EnvelopeRate::new(EnvelopeState::Decay, 15, 15);
        assert_eq!(saturated.high, 15);
        assert_eq!(saturated.shift, 0);

        let attack = EnvelopeRate::new(EnvelopeState::Attack, 12, 0);
        assert_eq!(attack.shift, 0);
    }

    #[test]
    fn test_zero_parameter_rate_freezes_envelope() {
        let rate = EnvelopeRate::new(EnvelopeState::Decay, 0, 15);
        assert_eq!(rate, EnvelopeRate::default());
        for counter in 0..64 {
            assert_eq!(rate.advance(EnvelopeState::Decay, 40, counter), 40);
        }
    }

    #[test]
    fn test_attack_moves_towards_full_volume() {
        let rate = EnvelopeRate::new(EnvelopeState::Attack, 14, 0);
        let mut eg = EG_MUTE;
        let mut counter = 0u16;
        while eg > 0 && counter < 10_000 {
            counter = counter.wrapping_add(1);
            let next = rate.advance(EnvelopeState::Attack, eg, counter);
            assert!(next <= eg);
            eg = next;
        }
        assert_eq!(eg, 0);
    }

    #[test]
    fn test_decay_fastest_rate_steps_by_two() {
        let rate = EnvelopeRate::new(EnvelopeState::Release, 15, 0);
        assert_eq!(rate.advance(EnvelopeState::Release, 10, 1), 12);
        assert_eq!(rate.advance(EnvelopeState::Release, EG_MUTE - 1, 1), EG_MUTE);
    }
}
