//! YM2413 (OPLL) chip emulation
//!
//! Leaf modules hold the pieces of one chip; [`Ym2413`] wires them together.

pub mod chip;
pub mod envelope;
pub mod lfo;
pub mod mixer;
pub mod patch;
pub mod registers;
pub mod rhythm;
pub mod slot;
pub mod tables;

pub use chip::Ym2413;
pub use envelope::EnvelopeState;
pub use mixer::{Bus, ChannelMask, Pan, BUS_COUNT, CHANNEL_COUNT};
pub use patch::{OperatorParams, Patch, PatchBank, ToneSet, BANK_DUMP_SIZE, INSTRUMENT_COUNT, PATCH_DUMP_SIZE};
pub use registers::{Register, TestFlags, REGISTER_COUNT};
pub use rhythm::RhythmFlags;
pub use slot::{Slot, SlotKind, SLOT_COUNT};
