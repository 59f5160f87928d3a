//! Instrument patches
//!
//! A patch is the parameter set of one two-operator instrument. The chip holds 19 of them:
//! instrument 0 is the user patch (programmed through registers 0x00-0x07), 1-15 are the
//! melodic ROM instruments and 16-18 drive the rhythm voices.
//!
//! Patches are exchanged as 8-byte dumps:
//!
//! | byte | bits |
//! |------|------|
//! | 0, 1 | AM, PM, EG, KR, ML[3:0] (modulator, carrier) |
//! | 2    | modulator KL[1:0], TL[5:0] |
//! | 3    | carrier KL[1:0], -, carrier WF, modulator WF, FB[2:0] |
//! | 4, 5 | AR[3:0], DR[3:0] (modulator, carrier) |
//! | 6, 7 | SL[3:0], RR[3:0] (modulator, carrier) |

use serde::{Deserialize, Serialize};

use super::tables::Waveform;

/// Instruments per bank (16 melodic + 3 rhythm)
pub const INSTRUMENT_COUNT: usize = 19;
/// Size of one instrument dump
pub const PATCH_DUMP_SIZE: usize = 8;
/// Size of a whole bank dump
pub const BANK_DUMP_SIZE: usize = INSTRUMENT_COUNT * PATCH_DUMP_SIZE;

/// Instrument used by the bass drum in rhythm mode
pub const BASS_DRUM_INSTRUMENT: u8 = 16;
/// Instrument used by hi-hat (modulator) and snare (carrier) in rhythm mode
pub const HIHAT_SNARE_INSTRUMENT: u8 = 17;
/// Instrument used by tom (modulator) and top cymbal (carrier) in rhythm mode
pub const TOM_CYMBAL_INSTRUMENT: u8 = 18;

/// Parameters of one operator inside a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperatorParams {
    /// Tremolo (amplitude LFO) enable
    pub am: bool,
    /// Vibrato (pitch LFO) enable
    pub pm: bool,
    /// Sustained envelope (false = percussive)
    pub eg: bool,
    /// Key-scale rate enable
    pub kr: bool,
    /// Frequency multiplier index (0-15)
    pub ml: u8,
    /// Key-scale level (0-3)
    pub kl: u8,
    /// Total level (0-63), meaningful for the modulator only
    pub tl: u8,
    /// Feedback depth (0-7), meaningful for the modulator only
    pub fb: u8,
    /// Waveform select bit
    pub wf: u8,
    /// Attack rate (0-15)
    pub ar: u8,
    /// Decay rate (0-15)
    pub dr: u8,
    /// Sustain level (0-15)
    pub sl: u8,
    /// Release rate (0-15)
    pub rr: u8,
}

impl OperatorParams {
    /// Decode the AM|PM|EG|KR|ML byte
    pub fn set_flags_byte(&mut self, value: u8) {
        self.am = value & 0x80 != 0;
        self.pm = value & 0x40 != 0;
        self.eg = value & 0x20 != 0;
        self.kr = value & 0x10 != 0;
        self.ml = value & 0x0f;
    }

    /// Encode the AM|PM|EG|KR|ML byte
    pub fn flags_byte(&self) -> u8 {
        (self.am as u8) << 7 | (self.pm as u8) << 6 | (self.eg as u8) << 5 | (self.kr as u8) << 4 | self.ml
    }

    /// Decode an AR|DR byte
    pub fn set_attack_decay(&mut self, value: u8) {
        self.ar = (value >> 4) & 0x0f;
        self.dr = value & 0x0f;
    }

    /// Decode an SL|RR byte
    pub fn set_sustain_release(&mut self, value: u8) {
        self.sl = (value >> 4) & 0x0f;
        self.rr = value & 0x0f;
    }

    /// Selected waveform
    #[inline]
    pub fn waveform(&self) -> Waveform {
        Waveform::from_bit(self.wf)
    }
}

/// A two-operator instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Patch {
    /// Modulator operator parameters
    pub modulator: OperatorParams,
    /// Carrier operator parameters
    pub carrier: OperatorParams,
}

impl Patch {
    /// Decode an 8-byte instrument dump
    pub fn from_dump(dump: &[u8; PATCH_DUMP_SIZE]) -> Self {
        let mut modulator = OperatorParams::default();
        let mut carrier = OperatorParams::default();

        modulator.set_flags_byte(dump[0]);
        carrier.set_flags_byte(dump[1]);

        modulator.kl = (dump[2] >> 6) & 3;
        modulator.tl = dump[2] & 63;
        carrier.kl = (dump[3] >> 6) & 3;
        carrier.wf = (dump[3] >> 4) & 1;
        modulator.wf = (dump[3] >> 3) & 1;
        modulator.fb = dump[3] & 7;

        modulator.set_attack_decay(dump[4]);
        carrier.set_attack_decay(dump[5]);
        modulator.set_sustain_release(dump[6]);
        carrier.set_sustain_release(dump[7]);

        Patch {
            modulator,
            carrier,
        }
    }

    /// Encode into an 8-byte instrument dump.
    ///
    /// Carrier TL and FB have no place in the dump format and are dropped.
    pub fn to_dump(&self) -> [u8; PATCH_DUMP_SIZE] {
        let m = &self.modulator;
        let c = &self.carrier;
        [
            m.flags_byte(),
            c.flags_byte(),
            (m.kl << 6) | m.tl,
            (c.kl << 6) | (c.wf << 4) | (m.wf << 3) | m.fb,
            (m.ar << 4) | m.dr,
            (c.ar << 4) | c.dr,
            (m.sl << 4) | m.rr,
            (c.sl << 4) | c.rr,
        ]
    }
}

/// Built-in instrument ROM variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneSet {
    /// Yamaha YM2413
    #[default]
    Ym2413,
    /// Konami VRC7
    Vrc7,
    /// Yamaha YMF281B
    Ymf281b,
}

impl ToneSet {
    /// Select a tone set by index, wrapping like the chip's ROM selector (0-2)
    pub fn from_index(index: u8) -> Self {
        match index % 3 {
            0 => ToneSet::Ym2413,
            1 => ToneSet::Vrc7,
            _ => ToneSet::Ymf281b,
        }
    }

    /// Raw 8-byte dumps of all 19 instruments
    pub fn dumps(self) -> &'static [[u8; PATCH_DUMP_SIZE]; INSTRUMENT_COUNT] {
        match self {
            ToneSet::Ym2413 => &YM2413_TONES,
            ToneSet::Vrc7 => &VRC7_TONES,
            ToneSet::Ymf281b => &YMF281B_TONES,
        }
    }

    /// Decoded default patch for one instrument
    pub fn patch(self, instrument: usize) -> Patch {
        Patch::from_dump(&self.dumps()[instrument % INSTRUMENT_COUNT])
    }
}

/// The 19 instruments owned by one chip instance.
///
/// Operators refer to their parameters by operator index (`instrument * 2 + half`),
/// never by address, so replacing the bank never invalidates an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchBank {
    patches: [Patch; INSTRUMENT_COUNT],
}

impl PatchBank {
    /// Create a bank loaded from a built-in tone set
    pub fn new(tone_set: ToneSet) -> Self {
        let mut bank = PatchBank {
            patches: [Patch::default(); INSTRUMENT_COUNT],
        };
        bank.load_tone_set(tone_set);
        bank
    }

    /// Replace every instrument with a built-in tone set
    pub fn load_tone_set(&mut self, tone_set: ToneSet) {
        for (i, patch) in self.patches.iter_mut().enumerate() {
            *patch = tone_set.patch(i);
        }
    }

    /// Replace every instrument from a flat 152-byte dump
    pub fn load_dump(&mut self, dump: &[u8; BANK_DUMP_SIZE]) {
        for (patch, chunk) in self
            .patches
            .iter_mut()
            .zip(dump.chunks_exact(PATCH_DUMP_SIZE))
        {
            let mut bytes = [0u8; PATCH_DUMP_SIZE];
            bytes.copy_from_slice(chunk);
            *patch = Patch::from_dump(&bytes);
        }
    }

    /// Encode every instrument into a flat 152-byte dump
    pub fn to_dump(&self) -> [u8; BANK_DUMP_SIZE] {
        let mut dump = [0u8; BANK_DUMP_SIZE];
        for (patch, chunk) in self
            .patches
            .iter()
            .zip(dump.chunks_exact_mut(PATCH_DUMP_SIZE))
        {
            chunk.copy_from_slice(&patch.to_dump());
        }
        dump
    }

    /// Instrument by number (0-18)
    pub fn patch(&self, instrument: usize) -> &Patch {
        &self.patches[instrument % INSTRUMENT_COUNT]
    }

    /// Mutable instrument by number (0-18)
    pub fn patch_mut(&mut self, instrument: usize) -> &mut Patch {
        &mut self.patches[instrument % INSTRUMENT_COUNT]
    }

    /// Operator parameters by operator index (`instrument * 2`, `+ 1` for the carrier)
    #[inline]
    pub fn operator(&self, index: usize) -> &OperatorParams {
        let patch = &self.patches[(index >> 1) % INSTRUMENT_COUNT];
        if index & 1 == 0 {
            &patch.modulator
        } else {
            &patch.carrier
        }
    }

    /// Mutable operator parameters by operator index
    #[inline]
    pub fn operator_mut(&mut self, index: usize) -> &mut OperatorParams {
        let patch = &mut self.patches[(index >> 1) % INSTRUMENT_COUNT];
        if index & 1 == 0 {
            &mut patch.modulator
        } else {
            &mut patch.carrier
        }
    }
}

impl Default for PatchBank {
    fn default() -> Self {
        Self::new(ToneSet::default())
    }
}

/// Built-in YM2413 instruments (16 melodic + 3 rhythm, rhythm from VRC7 dumps)
const YM2413_TONES: [[u8; PATCH_DUMP_SIZE]; INSTRUMENT_COUNT] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // User
    [0x71, 0x61, 0x1e, 0x17, 0xd0, 0x78, 0x00, 0x17], // Violin
    [0x13, 0x41, 0x1a, 0x0d, 0xd8, 0xf7, 0x23, 0x13], // Guitar
    [0x13, 0x01, 0x99, 0x00, 0xf2, 0xd4, 0x21, 0x23], // Piano
    [0x11, 0x61, 0x0e, 0x07, 0x8d, 0x64, 0x70, 0x27], // Flute
    [0x32, 0x21, 0x1e, 0x06, 0xe1, 0x76, 0x01, 0x28], // Clarinet
    [0x31, 0x22, 0x16, 0x05, 0xe0, 0x71, 0x00, 0x18], // Oboe
    [0x21, 0x61, 0x1d, 0x07, 0x82, 0x81, 0x11, 0x07], // Trumpet
    [0x33, 0x21, 0x2d, 0x13, 0xb0, 0x70, 0x00, 0x07], // Organ
    [0x61, 0x61, 0x1b, 0x06, 0x64, 0x65, 0x10, 0x17], // Horn
    [0x41, 0x61, 0x0b, 0x18, 0x85, 0xf0, 0x81, 0x07], // Synthesizer
    [0x33, 0x01, 0x83, 0x11, 0xea, 0xef, 0x10, 0x04], // Harpsichord
    [0x17, 0xc1, 0x24, 0x07, 0xf8, 0xf8, 0x22, 0x12], // Vibraphone
    [0x61, 0x50, 0x0c, 0x05, 0xd2, 0xf5, 0x40, 0x42], // Synth Bass
    [0x01, 0x01, 0x55, 0x03, 0xe4, 0x90, 0x03, 0x02], // Acoustic Bass
    [0x41, 0x41, 0x89, 0x03, 0xf1, 0xe4, 0xc0, 0x13], // Electric Guitar
    [0x01, 0x01, 0x18, 0x0f, 0xdf, 0xf8, 0x6a, 0x6d], // Bass Drum
    [0x01, 0x01, 0x00, 0x00, 0xc8, 0xd8, 0xa7, 0x68], // Hi-Hat / Snare Drum
    [0x05, 0x01, 0x00, 0x00, 0xf8, 0xaa, 0x59, 0x55], // Tom-Tom / Top Cymbal
];

/// Konami VRC7 instrument ROM
const VRC7_TONES: [[u8; PATCH_DUMP_SIZE]; INSTRUMENT_COUNT] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x03, 0x21, 0x05, 0x06, 0xe8, 0x81, 0x42, 0x27],
    [0x13, 0x41, 0x14, 0x0d, 0xd8, 0xf6, 0x23, 0x12],
    [0x11, 0x11, 0x08, 0x08, 0xfa, 0xb2, 0x20, 0x12],
    [0x31, 0x61, 0x0c, 0x07, 0xa8, 0x64, 0x61, 0x27],
    [0x32, 0x21, 0x1e, 0x06, 0xe1, 0x76, 0x01, 0x28],
    [0x02, 0x01, 0x06, 0x00, 0xa3, 0xe2, 0xf4, 0xf4],
    [0x21, 0x61, 0x1d, 0x07, 0x82, 0x81, 0x11, 0x07],
    [0x23, 0x21, 0x22, 0x17, 0xa2, 0x72, 0x01, 0x17],
    [0x35, 0x11, 0x25, 0x00, 0x40, 0x73, 0x72, 0x01],
    [0xb5, 0x01, 0x0f, 0x0f, 0xa8, 0xa5, 0x51, 0x02],
    [0x17, 0xc1, 0x24, 0x07, 0xf8, 0xf8, 0x22, 0x12],
    [0x71, 0x23, 0x11, 0x06, 0x65, 0x74, 0x18, 0x16],
    [0x01, 0x02, 0xd3, 0x05, 0xc9, 0x95, 0x03, 0x02],
    [0x61, 0x63, 0x0c, 0x00, 0x94, 0xc0, 0x33, 0xf6],
    [0x21, 0x72, 0x0d, 0x00, 0xc1, 0xd5, 0x56, 0x06],
    [0x01, 0x01, 0x18, 0x0f, 0xdf, 0xf8, 0x6a, 0x6d],
    [0x01, 0x01, 0x00, 0x00, 0xc8, 0xd8, 0xa7, 0x68],
    [0x05, 0x01, 0x00, 0x00, 0xf8, 0xaa, 0x59, 0x55],
];

/// Yamaha YMF281B instrument ROM
const YMF281B_TONES: [[u8; PATCH_DUMP_SIZE]; INSTRUMENT_COUNT] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    [0x62, 0x21, 0x1a, 0x07, 0xf0, 0x6f, 0x00, 0x16],
    [0x00, 0x10, 0x44, 0x02, 0xf6, 0xf4, 0x54, 0x23],
    [0x03, 0x01, 0x97, 0x04, 0xf3, 0xf3, 0x13, 0xf3],
    [0x01, 0x61, 0x0a, 0x0f, 0xfa, 0x64, 0x70, 0x17],
    [0x22, 0x21, 0x1e, 0x06, 0xf0, 0x76, 0x00, 0x28],
    [0x00, 0x61, 0x8a, 0x0e, 0xc0, 0x61, 0x00, 0x07],
    [0x21, 0x61, 0x1b, 0x07, 0x84, 0x80, 0x17, 0x17],
    [0x37, 0x32, 0xc9, 0x01, 0x66, 0x64, 0x40, 0x28],
    [0x01, 0x21, 0x06, 0x03, 0xa5, 0x71, 0x51, 0x07],
    [0x06, 0x11, 0x5e, 0x07, 0xf3, 0xf2, 0xf6, 0x11],
    [0x00, 0x20, 0x18, 0x06, 0xf5, 0xf3, 0x20, 0x26],
    [0x97, 0x41, 0x20, 0x07, 0xff, 0xf4, 0x22, 0x22],
    [0x65, 0x61, 0x15, 0x00, 0xf7, 0xf3, 0x16, 0xf4],
    [0x01, 0x31, 0x0e, 0x07, 0xfa, 0xf3, 0xff, 0xff],
    [0x48, 0x61, 0x09, 0x07, 0xf1, 0x94, 0xf0, 0xf5],
    [0x07, 0x21, 0x14, 0x00, 0xee, 0xf8, 0xff, 0xf8],
    [0x01, 0x31, 0x00, 0x00, 0xf8, 0xf7, 0xf8, 0xf7],
    [0x25, 0x11, 0x00, 0x00, 0xf8, 0xfa, 0xf8, 0x55],
];
