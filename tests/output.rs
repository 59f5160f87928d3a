use std::thread;

use ym2413::resampler::MAX_RATE;
use ym2413::{
    ChannelMask, ChipConfig, EnvelopeState, SharedYm2413, ToneSet, Ym2413, Ym2413Backend,
};

const CLOCK: u32 = 3_579_545;
const RATE: u32 = 44_100;

/// Pure sine on channel 1: silent modulator, instant carrier attack, held sustain
fn program_sine(chip: &mut Ym2413) {
    chip.write_register(0x00, 0x20);
    chip.write_register(0x01, 0x21); // car ML=1
    chip.write_register(0x02, 0x3f);
    chip.write_register(0x03, 0x00);
    chip.write_register(0x04, 0x00); // mod AR=0 never opens
    chip.write_register(0x05, 0xf0);
    chip.write_register(0x06, 0x00);
    chip.write_register(0x07, 0x0f);
    chip.write_register(0x30, 0x00);
    chip.write_register(0x10, 0x22); // F-number 290
    chip.write_register(0x20, 0x19); // key on, block 4
}

#[test]
fn concert_a_has_expected_pitch() {
    let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
    program_sine(&mut chip);

    let mut crossings = 0;
    let mut peak = 0;
    let mut prev = 0;
    for _ in 0..RATE {
        let (left, _) = chip.get_stereo_sample();
        if prev < 0 && left >= 0 {
            crossings += 1;
        }
        peak = peak.max(left.abs());
        prev = left;
    }

    assert!(peak > 100, "tone too quiet: peak {peak}");
    assert!(
        (437..=443).contains(&crossings),
        "expected ~440 Hz, counted {crossings} cycles"
    );
}

/// Render `frames` stereo frames of the sine with bus 0 panned by `pan`
fn render_panned(pan: u8, frames: usize) -> Vec<(i32, i32)> {
    let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
    chip.set_pan(0, pan);
    program_sine(&mut chip);
    (0..frames).map(|_| chip.get_stereo_sample()).collect()
}

#[test]
fn pan_routes_bus_to_one_side() {
    // bit 1 = left
    let left_only = render_panned(0b10, 4_000);
    assert!(left_only.iter().all(|&(_, r)| r == 0));
    assert!(left_only.iter().any(|&(l, _)| l != 0));

    // bit 0 = right
    let right_only = render_panned(0b01, 4_000);
    assert!(right_only.iter().all(|&(l, _)| l == 0));
    assert!(right_only.iter().any(|&(_, r)| r != 0));

    let off = render_panned(0b00, 4_000);
    assert!(off.iter().all(|&frame| frame == (0, 0)));

    let center = render_panned(0b11, 4_000);
    assert!(center.iter().all(|&(l, r)| l == r));
    assert!(center.iter().any(|&(l, _)| l != 0));
}

#[test]
fn full_mask_silences_everything() {
    let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
    chip.set_mask(ChannelMask::all());
    for ch in 0..9u8 {
        chip.write_register(0x30 + ch, (ch + 1) << 4);
        chip.write_register(0x10 + ch, 0x80 + ch * 8);
        chip.write_register(0x20 + ch, 0x18);
    }
    chip.write_register(0x0e, 0x3f);

    for _ in 0..5_000 {
        assert_eq!(chip.get_sample(), 0);
    }
    for _ in 0..5_000 {
        assert_eq!(chip.get_stereo_sample(), (0, 0));
    }
}

#[test]
fn unmuting_restores_sound() {
    let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
    program_sine(&mut chip);
    chip.set_channel_mute(ym2413::Bus::Channel(0), true);
    assert!(chip.generate_samples(2_000).iter().all(|&s| s == 0));

    chip.set_channel_mute(ym2413::Bus::Channel(0), false);
    assert!(chip.generate_samples(2_000).iter().any(|&s| s != 0));
}

#[test]
fn patch_dump_matches_tone_set_rom() {
    for tone_set in [ToneSet::Ym2413, ToneSet::Vrc7, ToneSet::Ymf281b] {
        let config = ChipConfig {
            tone_set,
            ..ChipConfig::with_rates(CLOCK, RATE)
        };
        let mut chip = Ym2413::with_config(config).unwrap();
        let expected: Vec<u8> = tone_set.dumps().iter().flatten().copied().collect();
        let dump = chip.patch_dump();
        assert_eq!(dump.to_vec(), expected, "{tone_set:?}");

        chip.load_patch_dump(&dump);
        assert_eq!(chip.patch_dump(), dump);
    }
}

#[test]
fn reset_restores_configured_tone_set() {
    let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
    let vrc7: Vec<u8> = ToneSet::Vrc7.dumps().iter().flatten().copied().collect();
    let mut dump = [0u8; 152];
    dump.copy_from_slice(&vrc7);

    chip.load_patch_dump(&dump);
    assert_eq!(chip.patch_dump(), dump);

    chip.reset();
    assert_eq!(chip.tone_set(), ToneSet::Ym2413);
    assert_ne!(chip.patch_dump(), dump);
}

#[test]
fn shared_chip_renders_while_another_thread_writes() {
    let shared = SharedYm2413::new(Ym2413::new(CLOCK, RATE).unwrap());

    let writer = {
        let control = shared.clone();
        thread::spawn(move || {
            for ch in 0..9u8 {
                control.write_registers(&[
                    (0x30 + ch, 0x30),
                    (0x10 + ch, 0x60 + ch * 4),
                    (0x20 + ch, 0x1a),
                ]);
            }
        })
    };

    let renderer = {
        let audio = shared.clone();
        thread::spawn(move || {
            let mut buffer = [0i32; 1024];
            for _ in 0..32 {
                audio.fill_stereo(&mut buffer);
            }
        })
    };

    writer.join().unwrap();
    renderer.join().unwrap();

    let mut buffer = [0i16; 4096];
    shared.fill_mono(&mut buffer);
    assert!(buffer.iter().any(|&s| s != 0));
    assert_eq!(shared.lock().patch_number(8), Some(3));
}

#[test]
fn reset_patch_swaps_bank_but_not_configured_tone_set() {
    let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
    chip.reset_patch(ToneSet::Vrc7);
    let vrc7: Vec<u8> = ToneSet::Vrc7.dumps().iter().flatten().copied().collect();
    assert_eq!(chip.patch_dump().to_vec(), vrc7);
    assert_eq!(chip.tone_set(), ToneSet::Ym2413);

    chip.reset();
    let ym2413: Vec<u8> = ToneSet::Ym2413.dumps().iter().flatten().copied().collect();
    assert_eq!(chip.patch_dump().to_vec(), ym2413);
}

#[test]
fn reset_patch_changes_the_sound_of_a_held_note() {
    let render = |swap: bool| {
        let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
        chip.write_register(0x30, 0x10); // violin
        chip.write_register(0x10, 0x80);
        chip.write_register(0x20, 0x1a);
        chip.generate_samples(1_000);
        if swap {
            chip.reset_patch(ToneSet::Vrc7);
        }
        chip.generate_samples(2_000)
    };
    assert_ne!(render(false), render(true));
}

#[test]
fn output_rate_change_keeps_voice_state() {
    let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
    program_sine(&mut chip);
    chip.generate_samples(2_000);

    let envelope = chip.slot_envelope(1).unwrap();
    assert_eq!(envelope.0, EnvelopeState::Sustain);
    let registers = chip.dump_registers();

    chip.set_output_rate(48_000).unwrap();
    assert_eq!(chip.output_rate(), 48_000);
    assert_eq!(chip.slot_envelope(1), Some(envelope));
    assert_eq!(chip.dump_registers(), registers);
    assert_eq!(chip.patch_number(0), Some(0));

    // note keeps sounding without a new key-on
    assert!(chip.generate_samples(2_000).iter().any(|&s| s != 0));
    assert_eq!(chip.slot_envelope(1).unwrap().0, EnvelopeState::Sustain);
}

#[test]
fn rates_past_timer_range_are_rejected() {
    assert!(Ym2413::new(CLOCK, 1 << 24).is_err());
    assert!(Ym2413::new((MAX_RATE + 1) * 72, RATE).is_err());

    let mut chip = Ym2413::new(CLOCK, RATE).unwrap();
    assert!(chip.set_output_rate(1 << 24).is_err());
    assert_eq!(chip.output_rate(), RATE);
}

#[test]
fn highest_accepted_output_rate_still_pulls() {
    let mut chip = Ym2413::new(CLOCK, MAX_RATE).unwrap();
    program_sine(&mut chip);
    // roughly one internal tick per 337 output samples
    let samples = chip.generate_samples(200_000);
    assert!(samples.iter().any(|&s| s != 0));
}
