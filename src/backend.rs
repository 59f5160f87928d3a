//! Backend trait abstraction for YM2413 chip implementations
//!
//! Players and drivers program the chip through this interface, so a test double
//! or an alternative core can stand in for [`crate::Ym2413`].

use crate::config::ChipConfig;
use crate::ym2413::{Bus, ChannelMask, Ym2413, REGISTER_COUNT};
use crate::Result;

/// Common interface for YM2413 chip backends
///
/// # Example
///
/// ```
/// use ym2413::{Ym2413, Ym2413Backend, ChipConfig};
///
/// fn play_note<B: Ym2413Backend>(chip: &mut B) -> Vec<i16> {
///     chip.write_register(0x30, 0x40); // Channel 1: flute, full volume
///     chip.write_register(0x10, 0xac); // F-number low
///     chip.write_register(0x20, 0x1b); // Key on, block 5, F-number MSB
///     chip.generate_samples(256)
/// }
///
/// let mut chip = Ym2413::with_config(ChipConfig::default()).unwrap();
/// let samples = play_note(&mut chip);
/// assert_eq!(samples.len(), 256);
/// ```
pub trait Ym2413Backend: Send {
    /// Create a backend from a configuration
    ///
    /// # Errors
    ///
    /// Invalid rates or failed converter allocation.
    fn with_config(config: ChipConfig) -> Result<Self>
    where
        Self: Sized;

    /// Reset the backend to its power-on state
    ///
    /// Clears all registers, silences every operator and reloads the configured tone set.
    fn reset(&mut self);

    /// Write to a register
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address (masked to 0x00-0x3F)
    /// * `value` - Register value (0x00-0xFF)
    fn write_register(&mut self, addr: u8, value: u8);

    /// Read back a register
    ///
    /// # Returns
    ///
    /// Last value written to `addr` after mirror folding
    fn read_register(&self, addr: u8) -> u8;

    /// Dump the register file
    ///
    /// # Returns
    ///
    /// Current state of all 64 register slots
    fn dump_registers(&self) -> [u8; REGISTER_COUNT];

    /// Change the output sample rate
    ///
    /// # Errors
    ///
    /// Zero rate or failed converter allocation.
    fn set_output_rate(&mut self, rate: u32) -> Result<()>;

    /// Pull one mono sample at the output rate
    fn get_sample(&mut self) -> i16;

    /// Pull one stereo frame (left, right) at the output rate
    fn get_stereo_sample(&mut self) -> (i32, i32);

    /// Generate multiple mono samples
    ///
    /// # Arguments
    ///
    /// * `count` - Number of samples to generate
    fn generate_samples(&mut self, count: usize) -> Vec<i16> {
        let mut samples = vec![0; count];
        self.generate_samples_into(&mut samples);
        samples
    }

    /// Generate mono samples into a caller-provided buffer
    ///
    /// This avoids per-call allocations; prefer this in hot paths.
    fn generate_samples_into(&mut self, buffer: &mut [i16]) {
        for sample in buffer.iter_mut() {
            *sample = self.get_sample();
        }
    }

    /// Generate interleaved stereo frames (L, R, L, R, ...) into a caller-provided buffer
    ///
    /// A trailing odd element is left untouched.
    fn generate_stereo_into(&mut self, buffer: &mut [i32]) {
        for frame in buffer.chunks_exact_mut(2) {
            let (left, right) = self.get_stereo_sample();
            frame[0] = left;
            frame[1] = right;
        }
    }

    /// Mute or unmute an output bus
    fn set_channel_mute(&mut self, bus: Bus, mute: bool);

    /// Check if an output bus is muted
    fn is_channel_muted(&self, bus: Bus) -> bool;
}

impl Ym2413Backend for Ym2413 {
    fn with_config(config: ChipConfig) -> Result<Self> {
        Ym2413::with_config(config)
    }

    fn reset(&mut self) {
        Ym2413::reset(self);
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        Ym2413::write_register(self, addr, value);
    }

    fn read_register(&self, addr: u8) -> u8 {
        Ym2413::read_register(self, addr)
    }

    fn dump_registers(&self) -> [u8; REGISTER_COUNT] {
        Ym2413::dump_registers(self)
    }

    fn set_output_rate(&mut self, rate: u32) -> Result<()> {
        Ym2413::set_output_rate(self, rate)
    }

    fn get_sample(&mut self) -> i16 {
        Ym2413::get_sample(self)
    }

    fn get_stereo_sample(&mut self) -> (i32, i32) {
        Ym2413::get_stereo_sample(self)
    }

    fn set_channel_mute(&mut self, bus: Bus, mute: bool) {
        let mut mask: ChannelMask = self.mask();
        mask.set(bus.mask(), mute);
        self.set_mask(mask);
    }

    fn is_channel_muted(&self, bus: Bus) -> bool {
        self.mask().is_muted(bus)
    }
}
