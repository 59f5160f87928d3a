//! Operator (slot) state
//!
//! Each of the 18 slots pairs a phase generator with an envelope generator. Fields
//! derived from patch and pitch settings (waveform, attenuation, envelope rate) are
//! recomputed lazily: register writes only set bits in `update_requests`, and the
//! chip commits them at the start of the next synthesis tick.

use bitflags::bitflags;

use super::envelope::{EnvelopeRate, EnvelopeState};
use super::patch::{OperatorParams, PatchBank};
use super::tables::{
    lookup_exp, Waveform, DP_BASE_BITS, DP_WIDTH, EG_BITS, EG_MAX, EG_MUTE, ML_TABLE, PG_WIDTH,
    PM_TABLE, RKS_TABLE, SL_BITS, TLL_TABLE,
};

/// Number of operators on the chip
pub const SLOT_COUNT: usize = 18;

bitflags! {
    /// Derived slot fields waiting to be recomputed
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UpdateFlags: u8 {
        /// Waveform table selection
        const WF = 0x01;
        /// Total level + key-scale level attenuation
        const TLL = 0x02;
        /// Key-scale rate
        const RKS = 0x04;
        /// Envelope rate of the current state
        const EG = 0x08;
    }
}

/// Role of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Feeds its output into the paired carrier's phase
    Modulator,
    /// Drives a melodic channel bus
    Carrier,
    /// Stand-alone rhythm operator (hi-hat, snare, tom, cymbal)
    Percussion,
}

impl SlotKind {
    /// Carriers and percussion operators own their envelope: they react to key-off,
    /// leave the damp state on their own and take attenuation from the channel volume.
    #[inline]
    pub fn is_output(self) -> bool {
        !matches!(self, SlotKind::Modulator)
    }
}

/// One operator
#[derive(Debug, Clone)]
pub struct Slot {
    pub(crate) number: usize,
    pub(crate) kind: SlotKind,
    /// Keep phase across key-on (noise-driven percussion)
    pub(crate) pg_keep: bool,
    pub(crate) waveform: Waveform,
    pub(crate) pg_phase: u32,
    pub(crate) pg_out: u32,
    /// Last two outputs, newest first (modulator feedback)
    pub(crate) output: [i16; 2],
    pub(crate) eg_state: EnvelopeState,
    pub(crate) eg_out: u8,
    pub(crate) rate: EnvelopeRate,
    pub(crate) rks: u8,
    pub(crate) tll: u16,
    pub(crate) sus_flag: bool,
    pub(crate) blk_fnum: u32,
    pub(crate) blk: u32,
    pub(crate) fnum: u32,
    /// Channel volume in TL units (register value << 2)
    pub(crate) volume: u8,
    /// Operator index into the patch bank
    pub(crate) patch: usize,
    pub(crate) update_requests: UpdateFlags,
}

impl Slot {
    /// Create slot `number` in its reset state, attached to instrument 0
    pub fn new(number: usize) -> Self {
        Slot {
            number,
            kind: if number % 2 == 0 {
                SlotKind::Modulator
            } else {
                SlotKind::Carrier
            },
            pg_keep: false,
            waveform: Waveform::Full,
            pg_phase: 0,
            pg_out: 0,
            output: [0; 2],
            eg_state: EnvelopeState::Release,
            eg_out: EG_MUTE,
            rate: EnvelopeRate::default(),
            rks: 0,
            tll: 0,
            sus_flag: false,
            blk_fnum: 0,
            blk: 0,
            fnum: 0,
            volume: 0,
            patch: number % 2,
            update_requests: UpdateFlags::all(),
        }
    }

    /// Current envelope phase
    pub fn envelope_state(&self) -> EnvelopeState {
        self.eg_state
    }

    /// Current envelope attenuation (0 = loudest, 127 = silent)
    pub fn envelope_output(&self) -> u8 {
        self.eg_out
    }

    /// Role of this slot
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Operator index into the patch bank (`instrument * 2`, `+ 1` for a carrier half)
    pub fn patch_index(&self) -> usize {
        self.patch
    }

    #[inline]
    pub(crate) fn request_update(&mut self, flags: UpdateFlags) {
        self.update_requests |= flags;
    }

    pub(crate) fn set_patch(&mut self, operator_index: usize) {
        self.patch = operator_index;
        self.request_update(UpdateFlags::all());
    }

    pub(crate) fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
        self.request_update(UpdateFlags::TLL);
    }

    pub(crate) fn set_sus_flag(&mut self, flag: bool) {
        self.sus_flag = flag;
        self.request_update(UpdateFlags::EG);
    }

    pub(crate) fn set_fnumber(&mut self, fnum: u32) {
        self.fnum = fnum;
        self.blk_fnum = (self.blk_fnum & 0xe00) | (fnum & 0x1ff);
        self.request_update(UpdateFlags::EG | UpdateFlags::RKS | UpdateFlags::TLL);
    }

    pub(crate) fn set_block(&mut self, blk: u32) {
        self.blk = blk;
        self.blk_fnum = ((blk & 7) << 9) | (self.blk_fnum & 0x1ff);
        self.request_update(UpdateFlags::EG | UpdateFlags::RKS | UpdateFlags::TLL);
    }

    /// Force silence in the release state (rhythm remapping)
    pub(crate) fn silence(&mut self) {
        self.eg_state = EnvelopeState::Release;
        self.eg_out = EG_MUTE;
    }

    /// Key-on: always passes through the damp state first
    pub(crate) fn key_on(&mut self) {
        self.eg_state = EnvelopeState::Damp;
        self.request_update(UpdateFlags::EG);
    }

    /// Key-off: only output operators enter release, modulators keep running
    pub(crate) fn key_off(&mut self) {
        if self.kind.is_output() {
            self.eg_state = EnvelopeState::Release;
            self.request_update(UpdateFlags::EG);
        }
    }

    /// Apply pending derived-field updates
    pub(crate) fn commit_update(&mut self, params: &OperatorParams) {
        let requests = self.update_requests;

        if requests.contains(UpdateFlags::WF) {
            self.waveform = params.waveform();
        }

        if requests.contains(UpdateFlags::TLL) {
            let level = if self.kind.is_output() {
                self.volume
            } else {
                params.tl
            };
            self.tll = TLL_TABLE[(self.blk_fnum >> 5) as usize][level as usize & 63]
                [params.kl as usize & 3];
        }

        if requests.contains(UpdateFlags::RKS) {
            self.rks = RKS_TABLE[(self.blk_fnum >> 8) as usize][params.kr as usize];
        }

        if requests.intersects(UpdateFlags::RKS | UpdateFlags::EG) {
            let p_rate = self.eg_state.parameter_rate(params, self.sus_flag);
            self.rate = EnvelopeRate::new(self.eg_state, p_rate, self.rks);
            log::trace!(
                "slot {} {} rate {}-{}",
                self.number,
                self.eg_state,
                self.rate.high,
                self.rate.low
            );
        }

        self.update_requests = UpdateFlags::empty();
    }

    /// Advance the phase accumulator one tick
    #[inline]
    pub(crate) fn calc_phase(&mut self, params: &OperatorParams, pm_step: usize, load: bool) {
        let pm = if params.pm {
            PM_TABLE[((self.fnum >> 6) & 7) as usize][pm_step] as i32
        } else {
            0
        };
        let base = ((self.fnum & 0x1ff) as i32 * 2 + pm) as u32;
        let inc = (base * ML_TABLE[params.ml as usize & 15]) << self.blk >> 2;

        if load {
            self.pg_phase = inc;
        } else {
            self.pg_phase = self.pg_phase.wrapping_add(inc) & (DP_WIDTH - 1);
        }
        self.pg_out = self.pg_phase >> DP_BASE_BITS;
    }

    /// Leave the damp state: attack (or decay when attack is instantaneous)
    pub(crate) fn finish_damp(&mut self, params: &OperatorParams) {
        if (params.ar + (self.rks >> 2)).min(15) == 15 {
            self.eg_state = EnvelopeState::Decay;
            self.eg_out = 0;
        } else {
            self.eg_state = EnvelopeState::Attack;
            self.eg_out = EG_MUTE;
        }
        if !self.pg_keep {
            self.pg_phase = 0;
        }
        self.request_update(UpdateFlags::EG);
    }

    /// Advance the envelope one tick.
    ///
    /// `modulator` is the paired modulator of a melodic carrier: a carrier only
    /// leaves the damp state once both operators are quiet, and takes its
    /// modulator along.
    pub(crate) fn calc_envelope(
        &mut self,
        bank: &PatchBank,
        modulator: Option<&mut Slot>,
        counter: u16,
        force_zero: bool,
    ) {
        let params = bank.operator(self.patch);
        self.eg_out = self.rate.advance(self.eg_state, self.eg_out, counter);

        match self.eg_state {
            EnvelopeState::Damp => {
                let paired_quiet = modulator.as_ref().map_or(true, |m| m.eg_out >= EG_MAX);
                if self.eg_out >= EG_MAX && self.kind.is_output() && paired_quiet {
                    self.finish_damp(params);
                    if let Some(m) = modulator {
                        let m_params = bank.operator(m.patch);
                        m.finish_damp(m_params);
                    }
                }
            }
            EnvelopeState::Attack => {
                if self.eg_out == 0 {
                    self.eg_state = EnvelopeState::Decay;
                    self.request_update(UpdateFlags::EG);
                }
            }
            EnvelopeState::Decay => {
                if (self.eg_out >> (EG_BITS - SL_BITS)) == params.sl {
                    self.eg_state = EnvelopeState::Sustain;
                    self.request_update(UpdateFlags::EG);
                }
            }
            EnvelopeState::Sustain | EnvelopeState::Release => {}
        }

        if force_zero {
            self.eg_out = 0;
        }
    }

    /// Convert a log-sine table value into a linear sample using the current attenuation
    #[inline]
    pub(crate) fn to_linear(&self, h: u16, am: u8) -> i16 {
        if self.eg_out >= EG_MAX {
            return 0;
        }
        let att = (self.eg_out as u16 + self.tll + am as u16).min(127) << 4;
        lookup_exp(h + att)
    }

    /// Linear output at an explicit waveform phase
    #[inline]
    pub(crate) fn output_at(&self, phase: usize, am: u8) -> i16 {
        self.to_linear(self.waveform.table()[phase & (PG_WIDTH - 1)], am)
    }
}
