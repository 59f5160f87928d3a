//! YM2413 (OPLL) FM Sound Chip Emulator
//!
//! A register-accurate emulator of the Yamaha YM2413 as found in the MSX-MUSIC
//! cartridge, the Sega Master System FM unit and (as the VRC7 variant) Konami
//! Famicom carts. Driven by register writes, pulled one sample at a time.
//!
//! # Features
//! - 9 two-operator FM channels, or 6 channels + 5 rhythm voices
//! - Hardware envelope timing including the damp phase before every key-on
//! - Tremolo/vibrato LFOs, 23-bit noise LFSR for the percussion voices
//! - YM2413, VRC7 and YMF281B instrument ROMs, 8-byte patch dump codec
//! - 15 output buses with mute mask and 2-bit stereo pan
//! - Windowed-sinc conversion from the internal rate (clock / 72) to any output rate
//!
//! # Backend Trait
//! The [`Ym2413Backend`] trait lets players drive the emulator (or a stand-in)
//! without depending on the concrete chip type.
//!
//! # Quick start
//! ```
//! use ym2413::Ym2413;
//! let mut chip = Ym2413::new(3_579_545, 44_100).unwrap();
//! chip.write_register(0x30, 0x10); // Channel 1: violin, full volume
//! chip.write_register(0x10, 0x22); // F-number low
//! chip.write_register(0x20, 0x19); // Key on, block 4, F-number MSB
//! let sample = chip.get_sample();
//! let (left, right) = chip.get_stereo_sample();
//! ```
//!
//! ## Sharing one chip between threads
//! ```
//! use ym2413::{SharedYm2413, Ym2413};
//! let shared = SharedYm2413::new(Ym2413::new(3_579_545, 48_000).unwrap());
//! let control = shared.clone();
//! std::thread::spawn(move || control.write_register(0x0e, 0x30)).join().unwrap();
//! let mut buffer = [0i32; 512];
//! shared.fill_stereo(&mut buffer);
//! ```

#![warn(missing_docs)]

pub mod backend; // Backend trait abstraction
pub mod config; // Construction parameters
pub mod resampler; // Output rate conversion
pub mod shared; // Locked handle for cross-thread use
pub mod ym2413; // YM2413 emulation (core)

/// Error types for YM2413 emulator operations
///
/// Only construction and output-rate changes can fail; register writes and
/// sample pulls are infallible.
#[derive(thiserror::Error, Debug)]
pub enum Ym2413Error {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Rate converter buffers could not be reserved
    #[error("Allocation failed: {0}")]
    Allocation(#[from] std::collections::TryReserveError),
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, Ym2413Error>;

// Public API exports
pub use backend::Ym2413Backend;
pub use config::{ChipConfig, ChipMode};
pub use resampler::RateConverter;
pub use shared::SharedYm2413;
pub use ym2413::{
    Bus, ChannelMask, EnvelopeState, OperatorParams, Pan, Patch, PatchBank, ToneSet, Ym2413,
};
