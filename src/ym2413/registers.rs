//! YM2413 Register Definitions
//!
//! The chip decodes a 6-bit address space (0x00-0x3F). Only a subset is backed by
//! real registers; 0x19-0x1F, 0x29-0x2F and 0x39-0x3F mirror the nine channel
//! registers below them and are folded back before dispatch.

use std::fmt;

use bitflags::bitflags;

/// Size of the register address space
pub const REGISTER_COUNT: usize = 0x40;

/// Decoded register address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// User patch byte (0x00-0x07), same layout as a patch dump byte
    UserPatch(u8),
    /// Rhythm mode enable and rhythm key bits - 0x0E
    RhythmControl,
    /// Test register - 0x0F
    Test,
    /// Channel F-number low 8 bits (0x10-0x18)
    FnumLow(usize),
    /// Channel sustain, key-on, block and F-number MSB (0x20-0x28)
    Control(usize),
    /// Channel instrument and volume (0x30-0x38)
    InstrumentVolume(usize),
    /// Unassigned address
    Unused(u8),
}

impl Register {
    /// Mask an address into the 6-bit space and fold mirrored channel registers
    #[inline]
    pub fn normalize(addr: u8) -> u8 {
        let addr = addr & 0x3f;
        match addr {
            0x19..=0x1f | 0x29..=0x2f | 0x39..=0x3f => addr - 9,
            _ => addr,
        }
    }

    /// Decode a raw address (any value, masked and mirror-normalized)
    pub fn decode(addr: u8) -> Self {
        match Self::normalize(addr) {
            a @ 0x00..=0x07 => Register::UserPatch(a),
            0x0e => Register::RhythmControl,
            0x0f => Register::Test,
            a @ 0x10..=0x18 => Register::FnumLow((a - 0x10) as usize),
            a @ 0x20..=0x28 => Register::Control((a - 0x20) as usize),
            a @ 0x30..=0x38 => Register::InstrumentVolume((a - 0x30) as usize),
            a => Register::Unused(a),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::UserPatch(n) => write!(f, "${n:02X} (User Patch Byte {n})"),
            Register::RhythmControl => write!(f, "$0E (Rhythm Control)"),
            Register::Test => write!(f, "$0F (Test)"),
            Register::FnumLow(ch) => write!(f, "${:02X} (Channel {} F-Number Low)", 0x10 + ch, ch + 1),
            Register::Control(ch) => write!(f, "${:02X} (Channel {} Key/Block)", 0x20 + ch, ch + 1),
            Register::InstrumentVolume(ch) => {
                write!(f, "${:02X} (Channel {} Instrument/Volume)", 0x30 + ch, ch + 1)
            }
            Register::Unused(a) => write!(f, "${a:02X} (Unused)"),
        }
    }
}

bitflags! {
    /// Test Register (0x0F) bitflags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TestFlags: u8 {
        /// Force every envelope output to full volume
        const EG_ZERO = 0x01;
        /// Hold both LFO phases at zero
        const LFO_RESET = 0x02;
        /// Phase generator loads the increment instead of accumulating
        const PG_LOAD = 0x04;
        /// Run the LFOs fast (PM x1024, AM x64)
        const LFO_FAST = 0x08;
    }
}

impl TestFlags {
    /// Create test flags from raw register value
    pub fn from_register(value: u8) -> Self {
        TestFlags::from_bits_truncate(value)
    }
}

/// Register mirror (64 bytes, addressed after mirror normalization)
#[derive(Debug, Clone, Copy)]
pub struct RegisterBank {
    registers: [u8; REGISTER_COUNT],
}

impl RegisterBank {
    /// Create a new register bank with all values set to 0
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; REGISTER_COUNT],
        }
    }

    /// Read a register value
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.registers[Register::normalize(addr) as usize]
    }

    /// Write a register value
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        self.registers[Register::normalize(addr) as usize] = value;
    }

    /// Get all registers as a slice
    pub fn as_slice(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}
