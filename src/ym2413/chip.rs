//! YM2413 (OPLL) FM synthesis emulation
//!
//! Register-accurate emulation running at the chip's internal rate of
//! clock / 72 (49,715 Hz at the usual 3.579545 MHz). Every internal tick advances
//! all 18 operators, the LFOs and the noise generator, then renders the 15 output
//! buses. Output samples are pulled one at a time at the configured output rate;
//! the windowed-sinc converter bridges the two rates when they differ.

use super::envelope::EnvelopeState;
use super::lfo::Lfo;
use super::mixer::{Bus, ChannelMask, Mixer, Pan, CHANNEL_COUNT};
use super::patch::{
    OperatorParams, PatchBank, ToneSet, BANK_DUMP_SIZE, BASS_DRUM_INSTRUMENT,
    HIHAT_SNARE_INSTRUMENT, TOM_CYMBAL_INSTRUMENT,
};
use super::registers::{Register, RegisterBank, TestFlags, REGISTER_COUNT};
use super::rhythm::{
    cymbal_phase, hihat_phase, snare_phase, Noise, RhythmFlags, FIRST_RHYTHM_CHANNEL, SLOT_BD1,
    SLOT_BD2, SLOT_CYM, SLOT_HH, SLOT_SD, SLOT_TOM,
};
use super::slot::{Slot, SlotKind, UpdateFlags, SLOT_COUNT};
use crate::config::{validate_rates, ChipConfig, ChipMode};
use crate::resampler::{conversion_needed, internal_rate, OutputClock, RateConverter};
use crate::Result;

/// Highest instrument number selectable from a channel register
const MAX_MELODIC_INSTRUMENT: u8 = 15;

#[inline]
fn modulator(ch: usize) -> usize {
    ch * 2
}

#[inline]
fn carrier(ch: usize) -> usize {
    ch * 2 + 1
}

/// YM2413 FM sound chip emulator
///
/// One instance is one chip: 9 two-operator channels, or 6 channels plus
/// 5 rhythm voices when rhythm mode is on.
///
/// # Example
///
/// ```
/// use ym2413::Ym2413;
///
/// let mut chip = Ym2413::new(3_579_545, 44_100).unwrap();
///
/// // Channel 1: piano, loudest volume, A4
/// chip.write_register(0x30, 0x30);
/// chip.write_register(0x10, 0x22);
/// chip.write_register(0x20, 0x19);
///
/// let sample = chip.get_sample();
/// let (left, right) = chip.get_stereo_sample();
/// ```
#[derive(Clone)]
pub struct Ym2413 {
    // Configuration
    clock: u32,
    rate: u32,
    tone_set: ToneSet,
    chip_mode: ChipMode,

    // Register interface
    registers: RegisterBank,
    address_latch: u8,
    test_flags: TestFlags,

    // Voices
    patches: PatchBank,
    patch_number: [u8; CHANNEL_COUNT],
    slots: [Slot; SLOT_COUNT],
    slot_key_status: u32,
    rhythm_mode: bool,
    eg_counter: u32,

    // Modulation sources
    lfo: Lfo,
    noise: Noise,

    // Output
    mask: ChannelMask,
    mixer: Mixer,
    mix_out: [i16; 2],
    output_clock: OutputClock,
    converter: Option<RateConverter>,
}

impl Ym2413 {
    /// Create a chip with the default tone set
    ///
    /// # Arguments
    ///
    /// * `clock` - Input clock in Hz (3,579,545 on most boards)
    /// * `rate` - Output sample rate in Hz
    ///
    /// # Errors
    ///
    /// [`crate::Ym2413Error::ConfigError`] for a zero output rate or a clock below
    /// 72 Hz, [`crate::Ym2413Error::Allocation`] if converter buffers cannot be reserved.
    pub fn new(clock: u32, rate: u32) -> Result<Self> {
        Self::with_config(ChipConfig::with_rates(clock, rate))
    }

    /// Create a chip from a full configuration
    pub fn with_config(config: ChipConfig) -> Result<Self> {
        config.validate()?;

        let mut chip = Self {
            clock: config.clock,
            rate: config.sample_rate,
            tone_set: config.tone_set,
            chip_mode: config.chip_mode,
            registers: RegisterBank::new(),
            address_latch: 0,
            test_flags: TestFlags::empty(),
            patches: PatchBank::new(config.tone_set),
            patch_number: [0; CHANNEL_COUNT],
            slots: std::array::from_fn(Slot::new),
            slot_key_status: 0,
            rhythm_mode: false,
            eg_counter: 0,
            lfo: Lfo::new(),
            noise: Noise::new(),
            mask: ChannelMask::empty(),
            mixer: Mixer::new(),
            mix_out: [0; 2],
            output_clock: OutputClock::new(internal_rate(config.clock), config.sample_rate),
            converter: None,
        };
        chip.converter = chip.build_converter()?;
        chip.reset();

        log::debug!(
            "YM2413 created: clock {} Hz, internal {} Hz, output {} Hz, tones {:?}, mode {:?}",
            chip.clock,
            chip.internal_rate(),
            chip.rate,
            chip.tone_set,
            chip.chip_mode
        );
        Ok(chip)
    }

    fn build_converter(&self) -> Result<Option<RateConverter>> {
        let f_in = internal_rate(self.clock) as f64;
        let f_out = self.rate as f64;
        if conversion_needed(f_in, f_out) {
            let mut conv = RateConverter::new(f_in, f_out)?;
            conv.reset();
            log::debug!("rate converter {f_in} Hz -> {f_out} Hz (ratio {:.5})", conv.ratio());
            Ok(Some(conv))
        } else {
            log::debug!("output rate {f_out} Hz matches internal rate, converter bypassed");
            Ok(None)
        }
    }

    /// Reset the chip to its power-on state, keeping clock, rates, tone set and mode
    pub fn reset(&mut self) {
        self.address_latch = 0;
        self.lfo.reset();
        self.noise.reset();
        self.mask = ChannelMask::empty();
        self.rhythm_mode = false;
        self.slot_key_status = 0;
        self.eg_counter = 0;

        self.output_clock.reset();
        if let Some(conv) = self.converter.as_mut() {
            conv.reset();
        }

        for (i, slot) in self.slots.iter_mut().enumerate() {
            *slot = Slot::new(i);
        }
        self.patches.load_tone_set(self.tone_set);
        for ch in 0..CHANNEL_COUNT {
            self.set_patch(ch, 0);
        }

        for addr in 0..REGISTER_COUNT as u8 {
            self.write_register(addr, 0);
        }

        self.mixer.reset();
        self.mix_out = [0; 2];

        log::debug!("YM2413 reset");
    }

    /// Change the output sample rate and rebuild the converter
    ///
    /// Synthesis state is untouched; only the converter history and output timer restart.
    ///
    /// # Errors
    ///
    /// Same as [`Ym2413::new`]. On error the previous rate stays in effect.
    pub fn set_output_rate(&mut self, rate: u32) -> Result<()> {
        validate_rates(self.clock, rate)?;
        let previous = self.rate;
        self.rate = rate;
        match self.build_converter() {
            Ok(converter) => {
                self.converter = converter;
                self.output_clock = OutputClock::new(internal_rate(self.clock), rate);
                Ok(())
            }
            Err(e) => {
                self.rate = previous;
                Err(e)
            }
        }
    }

    /// Select the register decoding variant
    pub fn set_chip_mode(&mut self, mode: ChipMode) {
        if mode != self.chip_mode {
            log::debug!("chip mode {:?} -> {:?}", self.chip_mode, mode);
        }
        self.chip_mode = mode;
    }

    /// Current register decoding variant
    pub fn chip_mode(&self) -> ChipMode {
        self.chip_mode
    }

    // ----- register interface -----

    /// Write a chip register
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address, masked to 6 bits; mirrors are folded
    /// * `data` - Register value
    pub fn write_register(&mut self, addr: u8, data: u8) {
        let reg = Register::normalize(addr);
        self.registers.write(reg, data);

        match Register::decode(reg) {
            Register::UserPatch(n) => self.write_user_patch(n, data),
            Register::RhythmControl => {
                if self.chip_mode == ChipMode::Vrc7 {
                    return;
                }
                self.update_rhythm_mode();
                self.update_key_status();
            }
            Register::Test => self.test_flags = TestFlags::from_register(data),
            Register::FnumLow(ch) => {
                let msb = (self.registers.read(0x20 + ch as u8) & 1) as u32;
                self.set_fnumber(ch, data as u32 + (msb << 8));
            }
            Register::Control(ch) => {
                let lsb = self.registers.read(0x10 + ch as u8) as u32;
                self.set_fnumber(ch, (((data & 1) as u32) << 8) + lsb);
                self.set_block(ch, ((data >> 1) & 7) as u32);
                self.set_sus_flag(ch, data & 0x20 != 0);
                self.update_key_status();
                // rhythm key-off of a remapped channel only completes once its key bit drops
                self.update_rhythm_mode();
            }
            Register::InstrumentVolume(ch) => {
                let rhythm_bit = RhythmFlags::from_register(self.registers.read(0x0e)).rhythm_mode();
                if rhythm_bit && ch >= FIRST_RHYTHM_CHANNEL {
                    // upper nibble is the hi-hat / tom volume here
                    if ch == 7 || ch == 8 {
                        self.slots[modulator(ch)].set_volume(((data >> 4) & 15) << 2);
                    }
                } else {
                    self.set_patch(ch, data >> 4);
                }
                self.slots[carrier(ch)].set_volume((data & 15) << 2);
            }
            Register::Unused(_) => {}
        }
    }

    /// Read back a register (after mirror folding)
    pub fn read_register(&self, addr: u8) -> u8 {
        self.registers.read(addr)
    }

    /// Snapshot of all 64 register slots (mirrors folded onto their base address)
    pub fn dump_registers(&self) -> [u8; REGISTER_COUNT] {
        *self.registers.as_slice()
    }

    /// Bus-style access: even port latches the address, odd port writes data
    pub fn write_io(&mut self, port: u32, value: u8) {
        if port & 1 != 0 {
            self.write_register(self.address_latch, value);
        } else {
            self.address_latch = value;
        }
    }

    fn write_user_patch(&mut self, n: u8, data: u8) {
        let (mod_updates, car_updates) = match n {
            0 => {
                self.patches.operator_mut(0).set_flags_byte(data);
                (UpdateFlags::RKS | UpdateFlags::EG, UpdateFlags::empty())
            }
            1 => {
                self.patches.operator_mut(1).set_flags_byte(data);
                (UpdateFlags::empty(), UpdateFlags::RKS | UpdateFlags::EG)
            }
            2 => {
                let m = self.patches.operator_mut(0);
                m.kl = (data >> 6) & 3;
                m.tl = data & 63;
                (UpdateFlags::TLL, UpdateFlags::empty())
            }
            3 => {
                let patch = self.patches.patch_mut(0);
                patch.carrier.kl = (data >> 6) & 3;
                patch.carrier.wf = (data >> 4) & 1;
                patch.modulator.wf = (data >> 3) & 1;
                patch.modulator.fb = data & 7;
                (UpdateFlags::WF, UpdateFlags::WF | UpdateFlags::TLL)
            }
            4 => {
                self.patches.operator_mut(0).set_attack_decay(data);
                (UpdateFlags::EG, UpdateFlags::empty())
            }
            5 => {
                self.patches.operator_mut(1).set_attack_decay(data);
                (UpdateFlags::empty(), UpdateFlags::EG)
            }
            6 => {
                self.patches.operator_mut(0).set_sustain_release(data);
                (UpdateFlags::EG, UpdateFlags::empty())
            }
            _ => {
                self.patches.operator_mut(1).set_sustain_release(data);
                (UpdateFlags::empty(), UpdateFlags::EG)
            }
        };

        for ch in 0..CHANNEL_COUNT {
            if self.patch_number[ch] == 0 {
                self.slots[modulator(ch)].request_update(mod_updates);
                self.slots[carrier(ch)].request_update(car_updates);
            }
        }
    }

    // ----- channel setters -----

    fn set_patch(&mut self, ch: usize, num: u8) {
        self.patch_number[ch] = num;
        self.slots[modulator(ch)].set_patch(num as usize * 2);
        self.slots[carrier(ch)].set_patch(num as usize * 2 + 1);
    }

    fn set_fnumber(&mut self, ch: usize, fnum: u32) {
        self.slots[carrier(ch)].set_fnumber(fnum);
        self.slots[modulator(ch)].set_fnumber(fnum);
    }

    fn set_block(&mut self, ch: usize, blk: u32) {
        self.slots[carrier(ch)].set_block(blk);
        self.slots[modulator(ch)].set_block(blk);
    }

    fn set_sus_flag(&mut self, ch: usize, flag: bool) {
        self.slots[carrier(ch)].set_sus_flag(flag);
        let m = &mut self.slots[modulator(ch)];
        if m.kind.is_output() {
            m.set_sus_flag(flag);
        }
    }

    fn update_key_status(&mut self) {
        let r14 = RhythmFlags::from_register(self.registers.read(0x0e));
        let mut new_status = 0u32;

        for ch in 0..CHANNEL_COUNT {
            if self.registers.read(0x20 + ch as u8) & 0x10 != 0 {
                new_status |= 3 << (ch * 2);
            }
        }

        if r14.rhythm_mode() {
            if r14.contains(RhythmFlags::BD) {
                new_status |= 3 << SLOT_BD1;
            }
            if r14.contains(RhythmFlags::HH) {
                new_status |= 1 << SLOT_HH;
            }
            if r14.contains(RhythmFlags::SD) {
                new_status |= 1 << SLOT_SD;
            }
            if r14.contains(RhythmFlags::TOM) {
                new_status |= 1 << SLOT_TOM;
            }
            if r14.contains(RhythmFlags::CYM) {
                new_status |= 1 << SLOT_CYM;
            }
        }

        let changed = self.slot_key_status ^ new_status;
        if changed != 0 {
            for (i, slot) in self.slots.iter_mut().enumerate() {
                if changed & (1 << i) == 0 {
                    continue;
                }
                if new_status & (1 << i) != 0 {
                    slot.key_on();
                } else {
                    slot.key_off();
                }
            }
        }

        self.slot_key_status = new_status;
    }

    #[inline]
    fn key_bit(&self, slot: usize) -> bool {
        self.slot_key_status & (1 << slot) != 0
    }

    fn update_rhythm_mode(&mut self) {
        let new_mode = RhythmFlags::from_register(self.registers.read(0x0e)).rhythm_mode();

        // channel 7: bass drum
        if self.patch_number[6] & 0x10 != 0 {
            if !(self.key_bit(SLOT_BD2) || new_mode) {
                self.slots[SLOT_BD1].silence();
                self.slots[SLOT_BD2].silence();
                self.set_patch(6, self.registers.read(0x36) >> 4);
            }
        } else if new_mode {
            self.patch_number[6] = BASS_DRUM_INSTRUMENT;
            self.slots[SLOT_BD1].silence();
            self.slots[SLOT_BD2].silence();
            self.slots[SLOT_BD1].set_patch(BASS_DRUM_INSTRUMENT as usize * 2);
            self.slots[SLOT_BD2].set_patch(BASS_DRUM_INSTRUMENT as usize * 2 + 1);
        }

        // channel 8: hi-hat + snare
        if self.patch_number[7] & 0x10 != 0 {
            if !((self.key_bit(SLOT_HH) && self.key_bit(SLOT_SD)) || new_mode) {
                let hh = &mut self.slots[SLOT_HH];
                hh.kind = SlotKind::Modulator;
                hh.pg_keep = false;
                hh.silence();
                let sd = &mut self.slots[SLOT_SD];
                sd.kind = SlotKind::Carrier;
                sd.silence();
                self.set_patch(7, self.registers.read(0x37) >> 4);
            }
        } else if new_mode {
            self.patch_number[7] = HIHAT_SNARE_INSTRUMENT;
            let volume = ((self.registers.read(0x37) >> 4) & 15) << 2;
            let hh = &mut self.slots[SLOT_HH];
            hh.kind = SlotKind::Percussion;
            hh.pg_keep = true;
            hh.silence();
            hh.set_patch(HIHAT_SNARE_INSTRUMENT as usize * 2);
            hh.set_volume(volume);
            let sd = &mut self.slots[SLOT_SD];
            sd.kind = SlotKind::Percussion;
            sd.silence();
            sd.set_patch(HIHAT_SNARE_INSTRUMENT as usize * 2 + 1);
        }

        // channel 9: tom + top cymbal
        if self.patch_number[8] & 0x10 != 0 {
            if !((self.key_bit(SLOT_CYM) && self.key_bit(SLOT_TOM)) || new_mode) {
                let tom = &mut self.slots[SLOT_TOM];
                tom.kind = SlotKind::Modulator;
                tom.silence();
                let cym = &mut self.slots[SLOT_CYM];
                cym.kind = SlotKind::Carrier;
                cym.pg_keep = false;
                cym.silence();
                self.set_patch(8, self.registers.read(0x38) >> 4);
            }
        } else if new_mode {
            self.patch_number[8] = TOM_CYMBAL_INSTRUMENT;
            let volume = ((self.registers.read(0x38) >> 4) & 15) << 2;
            let tom = &mut self.slots[SLOT_TOM];
            tom.kind = SlotKind::Percussion;
            tom.silence();
            tom.set_patch(TOM_CYMBAL_INSTRUMENT as usize * 2);
            tom.set_volume(volume);
            let cym = &mut self.slots[SLOT_CYM];
            cym.kind = SlotKind::Percussion;
            cym.pg_keep = true;
            cym.silence();
            cym.set_patch(TOM_CYMBAL_INSTRUMENT as usize * 2 + 1);
        }

        if new_mode != self.rhythm_mode {
            log::trace!("rhythm mode {}", if new_mode { "on" } else { "off" });
        }
        self.rhythm_mode = new_mode;
    }

    // ----- patches -----

    /// Replace all 19 instruments from a 152-byte dump (8 bytes per instrument)
    pub fn load_patch_dump(&mut self, dump: &[u8; BANK_DUMP_SIZE]) {
        self.patches.load_dump(dump);
        self.mark_all_dirty();
        log::debug!("loaded {BANK_DUMP_SIZE}-byte patch dump");
    }

    /// Encode the current 19 instruments as a 152-byte dump
    pub fn patch_dump(&self) -> [u8; BANK_DUMP_SIZE] {
        self.patches.to_dump()
    }

    /// Overwrite one operator half (`instrument * 2`, `+ 1` for the carrier)
    pub fn copy_patch(&mut self, index: usize, params: OperatorParams) {
        *self.patches.operator_mut(index) = params;
        self.mark_all_dirty();
    }

    /// Reload every instrument from a built-in tone set
    pub fn reset_patch(&mut self, tone_set: ToneSet) {
        self.patches.load_tone_set(tone_set);
        self.mark_all_dirty();
        log::debug!("patch bank reset to {tone_set:?}");
    }

    /// Current instrument bank
    pub fn patches(&self) -> &PatchBank {
        &self.patches
    }

    /// Re-apply every channel's instrument and recompute all derived operator state
    pub fn force_refresh(&mut self) {
        for ch in 0..CHANNEL_COUNT {
            self.set_patch(ch, self.patch_number[ch]);
        }
        self.mark_all_dirty();
    }

    fn mark_all_dirty(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.request_update(UpdateFlags::all());
        }
    }

    // ----- output shaping -----

    /// Replace the mute mask, returning the previous one
    pub fn set_mask(&mut self, mask: ChannelMask) -> ChannelMask {
        std::mem::replace(&mut self.mask, mask)
    }

    /// Flip the bits of `mask`, returning the previous mask
    pub fn toggle_mask(&mut self, mask: ChannelMask) -> ChannelMask {
        let previous = self.mask;
        self.mask ^= mask;
        previous
    }

    /// Current mute mask
    pub fn mask(&self) -> ChannelMask {
        self.mask
    }

    /// Set the stereo placement of bus `index` (0-14) from the low two bits of `pan`
    pub fn set_pan(&mut self, index: usize, pan: u8) {
        self.mixer.set_pan(index, Pan::from_bits(pan));
    }

    /// Stereo placement of bus `index`
    pub fn pan(&self, index: usize) -> Pan {
        self.mixer.pan(index)
    }

    // ----- synthesis -----

    fn update_slots(&mut self) {
        self.eg_counter = self.eg_counter.wrapping_add(1);
        let counter = self.eg_counter as u16;
        let pm_step = self.lfo.pm_step();
        let load = self.test_flags.contains(TestFlags::PG_LOAD);
        let force_zero = self.test_flags.contains(TestFlags::EG_ZERO);

        for i in 0..SLOT_COUNT {
            let (head, tail) = self.slots.split_at_mut(i);
            let slot = &mut tail[0];
            let params = self.patches.operator(slot.patch);

            if !slot.update_requests.is_empty() {
                slot.commit_update(params);
            }
            slot.calc_phase(params, pm_step, load);

            let paired = if slot.kind == SlotKind::Carrier {
                head.last_mut()
            } else {
                None
            };
            slot.calc_envelope(&self.patches, paired, counter, force_zero);
        }
    }

    #[inline]
    fn calc_modulator(&mut self, ch: usize) -> i16 {
        let lfo_am = self.lfo.am();
        let slot = &mut self.slots[modulator(ch)];
        let params = self.patches.operator(slot.patch);

        let fm = if params.fb > 0 {
            (slot.output[1] as i32 + slot.output[0] as i32) >> (8 - params.fb)
        } else {
            0
        };
        let am = if params.am { lfo_am } else { 0 };

        slot.output[1] = slot.output[0];
        slot.output[0] = slot.output_at((slot.pg_out as i32 + fm) as usize, am) >> 1;
        slot.output[0]
    }

    #[inline]
    fn calc_carrier(&self, ch: usize, fm: i16) -> i16 {
        let slot = &self.slots[carrier(ch)];
        let am = if self.patches.operator(slot.patch).am {
            self.lfo.am()
        } else {
            0
        };
        slot.output_at((slot.pg_out as i32 + 2 * fm as i32) as usize, am)
    }

    #[inline]
    fn is_melodic(&self, ch: usize) -> bool {
        ch < FIRST_RHYTHM_CHANNEL || self.patch_number[ch] <= MAX_MELODIC_INSTRUMENT
    }

    /// One internal tick: LFO, noise, operators, then every bus
    fn tick(&mut self) {
        self.lfo.update(self.test_flags);
        self.noise.update_white();
        self.noise
            .update_short(self.slots[SLOT_HH].pg_out, self.slots[SLOT_CYM].pg_out);
        self.update_slots();

        self.mixer.clear();

        for ch in 0..CHANNEL_COUNT {
            if self.is_melodic(ch) && !self.mask.is_muted(Bus::Channel(ch)) {
                let fm = self.calc_modulator(ch);
                let out = self.calc_carrier(ch, fm);
                self.mixer.set_melodic(ch, out);
            }
        }

        if !self.is_melodic(6) && !self.mask.is_muted(Bus::BassDrum) {
            let fm = self.calc_modulator(6);
            let out = self.calc_carrier(6, fm);
            self.mixer.set_rhythm(Bus::BassDrum, out);
        }

        if !self.is_melodic(7) {
            if !self.mask.is_muted(Bus::HiHat) {
                let out = self.slots[SLOT_HH].output_at(hihat_phase(&self.noise), 0);
                self.mixer.set_rhythm(Bus::HiHat, out);
            }
            if !self.mask.is_muted(Bus::Snare) {
                let sd = &self.slots[SLOT_SD];
                let out = sd.output_at(snare_phase(sd.pg_out, &self.noise), 0);
                self.mixer.set_rhythm(Bus::Snare, out);
            }
        }

        if !self.is_melodic(8) {
            if !self.mask.is_muted(Bus::Tom) {
                let tom = &self.slots[SLOT_TOM];
                let out = tom.output_at(tom.pg_out as usize, 0);
                self.mixer.set_rhythm(Bus::Tom, out);
            }
            if !self.mask.is_muted(Bus::Cymbal) {
                let out = self.slots[SLOT_CYM].output_at(cymbal_phase(&self.noise), 0);
                self.mixer.set_rhythm(Bus::Cymbal, out);
            }
        }
    }

    /// Pull one mono sample at the output rate
    #[inline]
    pub fn get_sample(&mut self) -> i16 {
        while self.output_clock.tick_due() {
            self.tick();
            let out = self.mixer.mix_mono();
            match self.converter.as_mut() {
                Some(conv) => conv.put_data(0, out),
                None => self.mix_out[0] = out,
            }
        }
        self.output_clock.finish_sample();

        if let Some(conv) = self.converter.as_mut() {
            conv.advance();
            self.mix_out[0] = conv.get_data(0);
        }
        self.mix_out[0]
    }

    /// Pull one stereo frame (left, right) at the output rate
    #[inline]
    pub fn get_stereo_sample(&mut self) -> (i32, i32) {
        while self.output_clock.tick_due() {
            self.tick();
            let (left, right) = self.mixer.mix_stereo();
            self.mix_out = [left as i16, right as i16];
            if let Some(conv) = self.converter.as_mut() {
                conv.put_data(0, self.mix_out[0]);
                conv.put_data(1, self.mix_out[1]);
            }
        }
        self.output_clock.finish_sample();

        match self.converter.as_mut() {
            Some(conv) => {
                conv.advance();
                (conv.get_data(0) as i32, conv.get_data(1) as i32)
            }
            None => (self.mix_out[0] as i32, self.mix_out[1] as i32),
        }
    }

    /// Run exactly one internal tick and return its mono mix.
    ///
    /// Bypasses the output timer and the converter.
    pub fn raw_tick(&mut self) -> i16 {
        self.tick();
        self.mixer.mix_mono()
    }

    // ----- introspection -----

    /// Envelope state and attenuation of operator `slot` (0-17)
    pub fn slot_envelope(&self, slot: usize) -> Option<(EnvelopeState, u8)> {
        self.slots
            .get(slot)
            .map(|s| (s.envelope_state(), s.envelope_output()))
    }

    /// Operator `slot` (0-17)
    pub fn slot(&self, slot: usize) -> Option<&Slot> {
        self.slots.get(slot)
    }

    /// Whether rhythm mode is active
    pub fn rhythm_mode(&self) -> bool {
        self.rhythm_mode
    }

    /// Instrument selected on channel `ch` (16-18 while rhythm mode owns it)
    pub fn patch_number(&self, ch: usize) -> Option<u8> {
        self.patch_number.get(ch).copied()
    }

    /// Whether output passes through the sinc converter
    pub fn has_rate_converter(&self) -> bool {
        self.converter.is_some()
    }

    /// Input clock in Hz
    pub fn clock(&self) -> u32 {
        self.clock
    }

    /// Internal synthesis rate (clock / 72)
    pub fn internal_rate(&self) -> u32 {
        internal_rate(self.clock)
    }

    /// Output sample rate
    pub fn output_rate(&self) -> u32 {
        self.rate
    }

    /// Tone set loaded on reset
    pub fn tone_set(&self) -> ToneSet {
        self.tone_set
    }

    /// Value of `bus` from the most recent internal tick
    pub fn bus_output(&self, bus: Bus) -> i16 {
        self.mixer.bus(bus)
    }
}

impl std::fmt::Debug for Ym2413 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ym2413")
            .field("clock", &self.clock)
            .field("rate", &self.rate)
            .field("chip_mode", &self.chip_mode)
            .field("rhythm_mode", &self.rhythm_mode)
            .field("patch_number", &self.patch_number)
            .field("mask", &self.mask)
            .field("converter", &self.converter)
            .finish_non_exhaustive()
    }
}
