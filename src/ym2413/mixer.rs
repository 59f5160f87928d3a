//! YM2413 Output Mixer
//!
//! Every tick the chip produces one value per output bus: nine melodic channels,
//! five rhythm voices and one spare. Melodic channels are inverted relative to the
//! rhythm voices, matching the polarity of the real chip's outputs.
//!
//! Features:
//! - Per-bus mute mask (`ChannelMask`)
//! - Per-bus 2-bit stereo pan
//! - 16-bit wrapping summation like the hardware accumulator

use bitflags::bitflags;

/// Number of output buses
pub const BUS_COUNT: usize = 15;

/// Melodic channel count
pub const CHANNEL_COUNT: usize = 9;

/// Output bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bus {
    /// Melodic channel 0-8
    Channel(usize),
    /// Bass drum
    BassDrum,
    /// Hi-hat
    HiHat,
    /// Snare drum
    Snare,
    /// Tom-tom
    Tom,
    /// Top cymbal
    Cymbal,
    /// Unused bus, always silent
    Spare,
}

impl Bus {
    /// Bus index (0-14), `None` for a melodic channel past 8
    #[inline]
    pub fn index(self) -> Option<usize> {
        match self {
            Bus::Channel(ch) if ch < CHANNEL_COUNT => Some(ch),
            Bus::Channel(_) => None,
            Bus::BassDrum => Some(9),
            Bus::HiHat => Some(10),
            Bus::Snare => Some(11),
            Bus::Tom => Some(12),
            Bus::Cymbal => Some(13),
            Bus::Spare => Some(14),
        }
    }

    /// Bus at `index`, if any
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0..=8 => Some(Bus::Channel(index)),
            9 => Some(Bus::BassDrum),
            10 => Some(Bus::HiHat),
            11 => Some(Bus::Snare),
            12 => Some(Bus::Tom),
            13 => Some(Bus::Cymbal),
            14 => Some(Bus::Spare),
            _ => None,
        }
    }

    /// Mute mask bit gating this bus (empty for a channel past 8)
    pub fn mask(self) -> ChannelMask {
        match self {
            Bus::Channel(ch) => ChannelMask::channel(ch),
            Bus::BassDrum => ChannelMask::BD,
            Bus::HiHat => ChannelMask::HH,
            Bus::Snare => ChannelMask::SD,
            Bus::Tom => ChannelMask::TOM,
            Bus::Cymbal => ChannelMask::CYM,
            Bus::Spare => ChannelMask::SPARE,
        }
    }
}

bitflags! {
    /// Mute mask (set bit = bus muted)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct ChannelMask: u16 {
        /// Melodic channel 1
        const CH0 = 1 << 0;
        /// Melodic channel 2
        const CH1 = 1 << 1;
        /// Melodic channel 3
        const CH2 = 1 << 2;
        /// Melodic channel 4
        const CH3 = 1 << 3;
        /// Melodic channel 5
        const CH4 = 1 << 4;
        /// Melodic channel 6
        const CH5 = 1 << 5;
        /// Melodic channel 7
        const CH6 = 1 << 6;
        /// Melodic channel 8
        const CH7 = 1 << 7;
        /// Melodic channel 9
        const CH8 = 1 << 8;
        /// Hi-hat
        const HH = 1 << 9;
        /// Top cymbal
        const CYM = 1 << 10;
        /// Tom-tom
        const TOM = 1 << 11;
        /// Snare drum
        const SD = 1 << 12;
        /// Bass drum
        const BD = 1 << 13;
        /// Spare bus
        const SPARE = 1 << 14;
        /// All five rhythm voices
        const RHYTHM = Self::HH.bits() | Self::CYM.bits() | Self::TOM.bits()
            | Self::SD.bits() | Self::BD.bits();
    }
}

impl ChannelMask {
    /// Mask bit of melodic channel `ch` (0-8); empty for any other channel
    #[inline]
    pub fn channel(ch: usize) -> Self {
        if ch < CHANNEL_COUNT {
            ChannelMask::from_bits_truncate(1 << ch)
        } else {
            ChannelMask::empty()
        }
    }

    /// Whether `bus` is muted
    #[inline]
    pub fn is_muted(&self, bus: Bus) -> bool {
        self.intersects(bus.mask())
    }
}

/// Stereo placement of one bus (bit 1 = left, bit 0 = right)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pan(u8);

impl Pan {
    /// Right output only
    pub const RIGHT: Pan = Pan(0b01);
    /// Left output only
    pub const LEFT: Pan = Pan(0b10);
    /// Both outputs
    pub const CENTER: Pan = Pan(0b11);
    /// Neither output
    pub const OFF: Pan = Pan(0);

    /// Create from the low two bits of `bits`
    pub fn from_bits(bits: u8) -> Self {
        Pan(bits & 3)
    }

    /// Raw 2-bit value
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Routed to the left output
    #[inline]
    pub fn left(self) -> bool {
        self.0 & 2 != 0
    }

    /// Routed to the right output
    #[inline]
    pub fn right(self) -> bool {
        self.0 & 1 != 0
    }
}

impl Default for Pan {
    fn default() -> Self {
        Pan::CENTER
    }
}

/// Per-tick bus values plus their pan routing
#[derive(Debug, Clone)]
pub struct Mixer {
    buses: [i16; BUS_COUNT],
    pan: [Pan; BUS_COUNT],
}

impl Mixer {
    /// Create a mixer with silent, centered buses
    pub fn new() -> Self {
        Mixer {
            buses: [0; BUS_COUNT],
            pan: [Pan::CENTER; BUS_COUNT],
        }
    }

    /// Silence every bus and re-center every pan
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Zero all buses before a tick writes the driven ones
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.buses = [0; BUS_COUNT];
    }

    /// Store a melodic channel output (inverted)
    #[inline]
    pub(crate) fn set_melodic(&mut self, ch: usize, value: i16) {
        self.buses[ch] = (-(value as i32) >> 1) as i16;
    }

    /// Store a rhythm voice output
    #[inline]
    pub(crate) fn set_rhythm(&mut self, bus: Bus, value: i16) {
        if let Some(index) = bus.index() {
            self.buses[index] = value;
        }
    }

    /// Value of `bus` from the most recent tick (0 for a channel past 8)
    pub fn bus(&self, bus: Bus) -> i16 {
        bus.index().map_or(0, |index| self.buses[index])
    }

    /// Set pan for the bus at `index`; out-of-range indices are ignored
    pub fn set_pan(&mut self, index: usize, pan: Pan) {
        if let Some(slot) = self.pan.get_mut(index) {
            *slot = pan;
        }
    }

    /// Pan of the bus at `index`
    pub fn pan(&self, index: usize) -> Pan {
        self.pan.get(index).copied().unwrap_or_default()
    }

    /// Sum of every bus
    #[inline]
    pub fn mix_mono(&self) -> i16 {
        self.buses.iter().fold(0i16, |acc, &v| acc.wrapping_add(v))
    }

    /// Left/right sums according to each bus's pan
    #[inline]
    pub fn mix_stereo(&self) -> (i32, i32) {
        let mut left = 0i16;
        let mut right = 0i16;
        for (&value, &pan) in self.buses.iter().zip(self.pan.iter()) {
            if pan.left() {
                left = left.wrapping_add(value);
            }
            if pan.right() {
                right = right.wrapping_add(value);
            }
        }
        (left as i32, right as i32)
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_index_round_trip() {
        for index in 0..BUS_COUNT {
            let bus = Bus::from_index(index).unwrap();
            assert_eq!(bus.index(), Some(index));
        }
        assert_eq!(Bus::from_index(BUS_COUNT), None);
    }

    #[test]
    fn test_out_of_range_channel_has_no_bus() {
        assert_eq!(Bus::Channel(9).index(), None);
        assert_eq!(Bus::Channel(12).mask(), ChannelMask::empty());
        assert!(!ChannelMask::all().is_muted(Bus::Channel(12)));
        assert_eq!(Mixer::new().bus(Bus::Channel(12)), 0);
    }

    #[test]
    fn test_mask_layout() {
        assert_eq!(Bus::Channel(3).mask(), ChannelMask::CH3);
        assert_eq!(Bus::HiHat.mask().bits(), 1 << 9);
        assert_eq!(Bus::BassDrum.mask().bits(), 1 << 13);
        assert_eq!(ChannelMask::all().bits(), 0x7fff);
        assert!(ChannelMask::RHYTHM.is_muted(Bus::Snare));
        assert!(!ChannelMask::RHYTHM.is_muted(Bus::Channel(6)));
    }

    #[test]
    fn test_melodic_polarity() {
        let mut mixer = Mixer::new();
        mixer.set_melodic(0, 1000);
        mixer.set_rhythm(Bus::Tom, 300);
        assert_eq!(mixer.bus(Bus::Channel(0)), -500);
        assert_eq!(mixer.mix_mono(), -200);
    }

    #[test]
    fn test_stereo_pan_routing() {
        let mut mixer = Mixer::new();
        mixer.set_rhythm(Bus::BassDrum, 100);
        mixer.set_rhythm(Bus::HiHat, 10);
        mixer.set_pan(9, Pan::LEFT);
        mixer.set_pan(10, Pan::RIGHT);
        assert_eq!(mixer.mix_stereo(), (100, 10));

        mixer.set_pan(10, Pan::OFF);
        assert_eq!(mixer.mix_stereo(), (100, 0));
        assert_eq!(mixer.mix_mono(), 110);
    }

    #[test]
    fn test_sum_wraps_in_16_bits() {
        let mut mixer = Mixer::new();
        for bus in [Bus::BassDrum, Bus::HiHat, Bus::Snare, Bus::Tom, Bus::Cymbal] {
            mixer.set_rhythm(bus, 8000);
        }
        assert_eq!(mixer.mix_mono(), 40000u16 as i16);
        let (l, r) = mixer.mix_stereo();
        assert_eq!(l, 40000u16 as i16 as i32);
        assert_eq!(r, l);
    }

    #[test]
    fn test_clear_zeroes_buses() {
        let mut mixer = Mixer::new();
        mixer.set_melodic(8, -2000);
        mixer.clear();
        assert_eq!(mixer.mix_mono(), 0);
    }
}
