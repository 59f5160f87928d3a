//! Chip construction parameters

use serde::{Deserialize, Serialize};

use crate::resampler::{internal_rate, MAX_RATE};
use crate::ym2413::ToneSet;
use crate::{Result, Ym2413Error};

/// NTSC colorburst clock used by most YM2413 boards
pub const DEFAULT_CLOCK: u32 = 3_579_545;

/// Default audio sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Register decoding variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipMode {
    /// Full YM2413 register map
    #[default]
    Ym2413,
    /// Konami VRC7: no rhythm section, register 0x0E is ignored
    Vrc7,
}

/// Configuration for one [`crate::Ym2413`] instance
///
/// # Example
///
/// ```
/// use ym2413::{ChipConfig, ChipMode, ToneSet};
///
/// let config = ChipConfig {
///     tone_set: ToneSet::Vrc7,
///     chip_mode: ChipMode::Vrc7,
///     ..ChipConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    /// Input clock in Hz (internal rate is `clock / 72`)
    pub clock: u32,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Instrument ROM loaded at construction and reset
    pub tone_set: ToneSet,
    /// Register decoding variant
    pub chip_mode: ChipMode,
}

impl ChipConfig {
    /// Config with the given clock and sample rate, default tones and mode
    pub fn with_rates(clock: u32, sample_rate: u32) -> Self {
        Self {
            clock,
            sample_rate,
            ..Self::default()
        }
    }

    /// Check that both rates are usable
    ///
    /// # Errors
    ///
    /// [`Ym2413Error::ConfigError`] if the output rate is zero or above
    /// [`MAX_RATE`], or the clock gives an internal rate of zero or above [`MAX_RATE`].
    pub fn validate(&self) -> Result<()> {
        validate_rates(self.clock, self.sample_rate)
    }
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            clock: DEFAULT_CLOCK,
            sample_rate: DEFAULT_SAMPLE_RATE,
            tone_set: ToneSet::default(),
            chip_mode: ChipMode::default(),
        }
    }
}

pub(crate) fn validate_rates(clock: u32, sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(Ym2413Error::ConfigError(
            "output sample rate must be non-zero".to_string(),
        ));
    }
    if sample_rate > MAX_RATE {
        return Err(Ym2413Error::ConfigError(format!(
            "output sample rate {sample_rate} Hz exceeds {MAX_RATE} Hz"
        )));
    }
    let internal = internal_rate(clock);
    if internal == 0 {
        return Err(Ym2413Error::ConfigError(format!(
            "clock {clock} Hz is below 72 Hz, internal rate would be zero"
        )));
    }
    if internal > MAX_RATE {
        return Err(Ym2413Error::ConfigError(format!(
            "clock {clock} Hz gives internal rate {internal} Hz, above {MAX_RATE} Hz"
        )));
    }
    Ok(())
}
