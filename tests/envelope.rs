use ym2413::{EnvelopeState, Ym2413};

const CLOCK: u32 = 3_579_545;
const CARRIER_0: usize = 1;
const MODULATOR_0: usize = 0;

fn chip() -> Ym2413 {
    Ym2413::new(CLOCK, CLOCK / 72).unwrap()
}

/// User patch with a slow carrier attack and a mid release rate
fn program_slow_attack(chip: &mut Ym2413) {
    chip.write_register(0x00, 0x21); // mod: EG, ML=1
    chip.write_register(0x01, 0x21); // car: EG, ML=1
    chip.write_register(0x02, 0x3f); // mod TL max
    chip.write_register(0x03, 0x00);
    chip.write_register(0x04, 0x40); // mod AR=4
    chip.write_register(0x05, 0x40); // car AR=4, DR=0
    chip.write_register(0x06, 0x07);
    chip.write_register(0x07, 0x07); // car SL=0, RR=7
    chip.write_register(0x30, 0x00); // user patch, full volume
    chip.write_register(0x10, 0x22);
}

#[test]
fn key_off_during_attack_reaches_silence() {
    let mut chip = chip();
    program_slow_attack(&mut chip);
    chip.write_register(0x20, 0x19); // key on

    assert_eq!(chip.slot_envelope(CARRIER_0).unwrap().0, EnvelopeState::Damp);
    for _ in 0..3_000 {
        chip.raw_tick();
    }
    let (state, level) = chip.slot_envelope(CARRIER_0).unwrap();
    assert_eq!(state, EnvelopeState::Attack);
    assert!(level < 127, "attack made no progress");

    chip.write_register(0x20, 0x09); // key off, same block
    assert_eq!(
        chip.slot_envelope(CARRIER_0).unwrap().0,
        EnvelopeState::Release
    );

    let mut ticks = 0;
    while chip.slot_envelope(CARRIER_0).unwrap().1 < 127 {
        chip.raw_tick();
        ticks += 1;
        assert!(ticks < 200_000, "release did not finish");
    }
    assert_eq!(
        chip.slot_envelope(CARRIER_0).unwrap().0,
        EnvelopeState::Release
    );

    // fully attenuated carrier is silent
    for _ in 0..100 {
        assert_eq!(chip.raw_tick(), 0);
    }
}

#[test]
fn faster_release_rate_finishes_sooner() {
    let release_ticks = |rr: u8| {
        let mut chip = chip();
        program_slow_attack(&mut chip);
        chip.write_register(0x05, 0xf0); // instant attack
        chip.write_register(0x07, rr);
        chip.write_register(0x20, 0x19);
        for _ in 0..100 {
            chip.raw_tick();
        }
        chip.write_register(0x20, 0x09);
        let mut ticks = 0u32;
        while chip.slot_envelope(CARRIER_0).unwrap().1 < 127 {
            chip.raw_tick();
            ticks += 1;
        }
        ticks
    };

    let slow = release_ticks(5);
    let fast = release_ticks(10);
    assert!(fast < slow, "rr=10 took {fast}, rr=5 took {slow}");
}

/// Track every state/level pair and check direction within each state
fn assert_monotonic(chip: &mut Ym2413, slot: usize, ticks: usize) {
    let mut prev = chip.slot_envelope(slot).unwrap();
    for _ in 0..ticks {
        chip.raw_tick();
        let cur = chip.slot_envelope(slot).unwrap();
        if cur.0 == prev.0 {
            match cur.0 {
                EnvelopeState::Attack => {
                    assert!(cur.1 <= prev.1, "attack rose {} -> {}", prev.1, cur.1)
                }
                _ => assert!(cur.1 >= prev.1, "{} fell {} -> {}", cur.0, prev.1, cur.1),
            }
        }
        prev = cur;
    }
}

#[test]
fn envelope_moves_one_way_per_state() {
    let mut chip = chip();
    // piano: percussive, keeps decaying through sustain
    chip.write_register(0x30, 0x30);
    chip.write_register(0x10, 0x80);
    chip.write_register(0x20, 0x1a);
    for slot in [MODULATOR_0, CARRIER_0] {
        assert_monotonic(&mut chip.clone(), slot, 40_000);
    }

    assert_monotonic(&mut chip, CARRIER_0, 20_000);
    chip.write_register(0x20, 0x0a);
    assert_monotonic(&mut chip, CARRIER_0, 40_000);

    // retrigger with sustain flag set
    chip.write_register(0x20, 0x3a);
    assert_monotonic(&mut chip, CARRIER_0, 20_000);
    chip.write_register(0x20, 0x2a);
    assert_monotonic(&mut chip, CARRIER_0, 40_000);
}

#[test]
fn envelope_passes_through_every_state() {
    let mut chip = chip();
    chip.write_register(0x30, 0x10); // violin, sustained
    chip.write_register(0x10, 0x80);
    chip.write_register(0x20, 0x1a);

    let mut seen = Vec::new();
    let mut record = |chip: &Ym2413| {
        let state = chip.slot_envelope(CARRIER_0).unwrap().0;
        if seen.last() != Some(&state) {
            seen.push(state);
        }
    };

    record(&chip);
    for _ in 0..30_000 {
        chip.raw_tick();
        record(&chip);
    }
    chip.write_register(0x20, 0x0a);
    for _ in 0..10 {
        chip.raw_tick();
        record(&chip);
    }

    assert_eq!(
        seen,
        vec![
            EnvelopeState::Damp,
            EnvelopeState::Attack,
            EnvelopeState::Decay,
            EnvelopeState::Sustain,
            EnvelopeState::Release
        ]
    );
}

#[test]
fn test_register_forces_full_level() {
    let mut chip = chip();
    chip.write_register(0x0f, 0x01);
    chip.raw_tick();
    for slot in 0..18 {
        assert_eq!(chip.slot_envelope(slot).unwrap().1, 0);
    }
    chip.write_register(0x0f, 0x00);
}
