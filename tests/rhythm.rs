use ym2413::ym2413::slot::SlotKind;
use ym2413::{Bus, ChannelMask, Ym2413};

const CLOCK: u32 = 3_579_545;

fn chip() -> Ym2413 {
    Ym2413::new(CLOCK, CLOCK / 72).unwrap()
}

fn snapshot(chip: &Ym2413) -> Vec<(Option<u8>, usize, SlotKind)> {
    (12..18)
        .map(|slot| {
            let s = chip.slot(slot).unwrap();
            (chip.patch_number(slot / 2), s.patch_index(), s.kind())
        })
        .collect()
}

#[test]
fn rhythm_toggle_restores_channel_patches() {
    let mut chip = chip();
    chip.write_register(0x36, 0x53);
    chip.write_register(0x37, 0x64);
    chip.write_register(0x38, 0x75);
    let before = snapshot(&chip);

    chip.write_register(0x0e, 0x20);
    assert!(chip.rhythm_mode());
    assert_ne!(snapshot(&chip), before);

    chip.write_register(0x0e, 0x00);
    assert!(!chip.rhythm_mode());
    assert_eq!(snapshot(&chip), before);
    assert_eq!(chip.patch_number(6), Some(5));
    assert_eq!(chip.patch_number(7), Some(6));
    assert_eq!(chip.patch_number(8), Some(7));
}

#[test]
fn rhythm_toggle_twice_is_stable() {
    let mut chip = chip();
    chip.write_register(0x37, 0x20);
    for _ in 0..3 {
        chip.write_register(0x0e, 0x20);
        let on = snapshot(&chip);
        chip.write_register(0x0e, 0x20);
        assert_eq!(snapshot(&chip), on);
        chip.write_register(0x0e, 0x00);
    }
    assert_eq!(chip.patch_number(7), Some(2));
}

#[test]
fn drums_drive_rhythm_buses_only() {
    let mut chip = chip();
    chip.write_register(0x16, 0x20);
    chip.write_register(0x26, 0x05);
    chip.write_register(0x17, 0x50);
    chip.write_register(0x27, 0x05);
    chip.write_register(0x18, 0xc0);
    chip.write_register(0x28, 0x01);
    chip.write_register(0x36, 0x00);
    chip.write_register(0x37, 0x00);
    chip.write_register(0x38, 0x00);
    chip.write_register(0x0e, 0x3f); // rhythm on, all five drums keyed

    let drums = [Bus::BassDrum, Bus::HiHat, Bus::Snare, Bus::Tom, Bus::Cymbal];
    let mut heard = [false; 5];
    for _ in 0..4_000 {
        chip.raw_tick();
        for (flag, bus) in heard.iter_mut().zip(drums) {
            *flag |= chip.bus_output(bus) != 0;
        }
        for ch in 6..9 {
            assert_eq!(chip.bus_output(Bus::Channel(ch)), 0);
        }
        assert_eq!(chip.bus_output(Bus::Spare), 0);
    }
    assert_eq!(heard, [true; 5], "silent drums: {heard:?}");
}

#[test]
fn muted_drum_bus_stays_zero() {
    let mut chip = chip();
    chip.set_mask(ChannelMask::SD | ChannelMask::HH);
    chip.write_register(0x17, 0x50);
    chip.write_register(0x27, 0x05);
    chip.write_register(0x0e, 0x29); // rhythm on, snare + hi-hat

    for _ in 0..4_000 {
        chip.raw_tick();
        assert_eq!(chip.bus_output(Bus::Snare), 0);
        assert_eq!(chip.bus_output(Bus::HiHat), 0);
    }
}

#[test]
fn key_held_drum_defers_restore() {
    let mut chip = chip();
    chip.write_register(0x0e, 0x30); // rhythm on, bass drum keyed
    chip.write_register(0x0e, 0x10); // rhythm off, key bit still set
    // the remap check runs before the key bits are recomputed, so the restore
    // lands on the next rhythm write
    assert_eq!(chip.patch_number(6), Some(16));

    chip.write_register(0x0e, 0x00);
    assert_eq!(chip.patch_number(6), Some(0));
}
