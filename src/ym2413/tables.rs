//! Static lookup tables
//!
//! Every table the synthesis path reads is built at compile time by `const fn`
//! evaluation, so there is no runtime initialization step and no init flag to race on.
//! All tables are read-only and shared by every chip instance in the process.

/// Phase generator output width in bits (1024-entry waveform tables)
pub const PG_BITS: u32 = 10;
/// Waveform table length
pub const PG_WIDTH: usize = 1 << PG_BITS;

/// Phase accumulator width in bits
pub const DP_BITS: u32 = 19;
/// Phase accumulator modulus
pub const DP_WIDTH: u32 = 1 << DP_BITS;
/// Fractional bits dropped when indexing the waveform table
pub const DP_BASE_BITS: u32 = DP_BITS - PG_BITS;

/// Envelope output width in bits
pub const EG_BITS: u32 = 7;
/// Envelope output at full attenuation
pub const EG_MUTE: u8 = (1 << EG_BITS) - 1;
/// Envelope output at or above which an operator is treated as silent
pub const EG_MAX: u8 = EG_MUTE - 3;

/// Total level width in bits
pub const TL_BITS: u32 = 6;
/// Sustain level width in bits
pub const SL_BITS: u32 = 4;

/// Fixed envelope rate used while damping an operator before key-on
pub const DAMPER_RATE: u8 = 12;

/// Pitch LFO table width in bits
pub const PM_PG_BITS: u32 = 3;
/// Pitch LFO phase accumulator width in bits
pub const PM_DP_BITS: u32 = 22;
/// Pitch LFO phase modulus
pub const PM_DP_WIDTH: u32 = 1 << PM_DP_BITS;

/// `EXP_TABLE[x] = round((exp2(x / 256) - 1) * 1024)`
pub const EXP_TABLE: [u16; 256] = [
    0, 3, 6, 8, 11, 14, 17, 20, 22, 25, 28, 31, 34, 37, 40, 42,
    45, 48, 51, 54, 57, 60, 63, 66, 69, 72, 75, 78, 81, 84, 87, 90,
    93, 96, 99, 102, 105, 108, 111, 114, 117, 120, 123, 126, 130, 133, 136, 139,
    142, 145, 148, 152, 155, 158, 161, 164, 168, 171, 174, 177, 181, 184, 187, 190,
    194, 197, 200, 204, 207, 210, 214, 217, 220, 224, 227, 231, 234, 237, 241, 244,
    248, 251, 255, 258, 262, 265, 268, 272, 276, 279, 283, 286, 290, 293, 297, 300,
    304, 308, 311, 315, 318, 322, 326, 329, 333, 337, 340, 344, 348, 352, 355, 359,
    363, 367, 370, 374, 378, 382, 385, 389, 393, 397, 401, 405, 409, 412, 416, 420,
    424, 428, 432, 436, 440, 444, 448, 452, 456, 460, 464, 468, 472, 476, 480, 484,
    488, 492, 496, 501, 505, 509, 513, 517, 521, 526, 530, 534, 538, 542, 547, 551,
    555, 560, 564, 568, 572, 577, 581, 585, 590, 594, 599, 603, 607, 612, 616, 621,
    625, 630, 634, 639, 643, 648, 652, 657, 661, 666, 670, 675, 680, 684, 689, 693,
    698, 703, 708, 712, 717, 722, 726, 731, 736, 741, 745, 750, 755, 760, 765, 770,
    774, 779, 784, 789, 794, 799, 804, 809, 814, 819, 824, 829, 834, 839, 844, 849,
    854, 859, 864, 869, 874, 880, 885, 890, 895, 900, 906, 911, 916, 921, 927, 932,
    937, 942, 948, 953, 959, 964, 969, 975, 980, 986, 991, 996, 1002, 1007, 1013, 1018,
];

/// First quarter of the log-sine table:
/// `round(-log2(sin((x + 0.5) * PI / (PG_WIDTH / 4) / 2)) * 256)`
const QUARTER_SINE: [u16; PG_WIDTH / 4] = [
    2137, 1731, 1543, 1419, 1326, 1252, 1190, 1137, 1091, 1050, 1013, 979, 949, 920, 894, 869,
    846, 825, 804, 785, 767, 749, 732, 717, 701, 687, 672, 659, 646, 633, 621, 609,
    598, 587, 576, 566, 556, 546, 536, 527, 518, 509, 501, 492, 484, 476, 468, 461,
    453, 446, 439, 432, 425, 418, 411, 405, 399, 392, 386, 380, 375, 369, 363, 358,
    352, 347, 341, 336, 331, 326, 321, 316, 311, 307, 302, 297, 293, 289, 284, 280,
    276, 271, 267, 263, 259, 255, 251, 248, 244, 240, 236, 233, 229, 226, 222, 219,
    215, 212, 209, 205, 202, 199, 196, 193, 190, 187, 184, 181, 178, 175, 172, 169,
    167, 164, 161, 159, 156, 153, 151, 148, 146, 143, 141, 138, 136, 134, 131, 129,
    127, 125, 122, 120, 118, 116, 114, 112, 110, 108, 106, 104, 102, 100, 98, 96,
    94, 92, 91, 89, 87, 85, 83, 82, 80, 78, 77, 75, 74, 72, 70, 69,
    67, 66, 64, 63, 62, 60, 59, 57, 56, 55, 53, 52, 51, 49, 48, 47,
    46, 45, 43, 42, 41, 40, 39, 38, 37, 36, 35, 34, 33, 32, 31, 30,
    29, 28, 27, 26, 25, 24, 23, 23, 22, 21, 20, 20, 19, 18, 17, 17,
    16, 15, 15, 14, 13, 13, 12, 12, 11, 10, 10, 9, 9, 8, 8, 7,
    7, 7, 6, 6, 5, 5, 5, 4, 4, 4, 3, 3, 3, 2, 2, 2,
    2, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Full log-sine wave, bit 15 carries the sign of the second half
pub static FULL_SINE_TABLE: [u16; PG_WIDTH] = build_full_sine();

/// Rectified log-sine wave, second half pinned to near silence
pub static HALF_SINE_TABLE: [u16; PG_WIDTH] = build_half_sine();

/// Pitch LFO offsets added to `fnum * 2`, indexed by `fnum >> 6` and the LFO step.
/// Roughly 14 cents of depth.
pub const PM_TABLE: [[i8; 1 << PM_PG_BITS]; 8] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, 0, 0, 0, -1, 0],
    [0, 1, 2, 1, 0, -1, -2, -1],
    [0, 1, 3, 1, 0, -1, -3, -1],
    [0, 2, 4, 2, 0, -2, -4, -2],
    [0, 2, 5, 2, 0, -2, -5, -2],
    [0, 3, 6, 3, 0, -3, -6, -3],
    [0, 3, 7, 3, 0, -3, -7, -3],
];

/// Amplitude LFO pattern measured on a real YM2413. Each entry lasts 64 ticks.
pub const AM_TABLE: [u8; 210] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, //
    2, 2, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3, //
    4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 5, 5, 5, //
    6, 6, 6, 6, 6, 6, 6, 6, 7, 7, 7, 7, 7, 7, 7, 7, //
    8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9, 9, 9, 9, 9, //
    10, 10, 10, 10, 10, 10, 10, 10, 11, 11, 11, 11, 11, 11, 11, 11, //
    12, 12, 12, 12, 12, 12, 12, 12, //
    13, 13, 13, //
    12, 12, 12, 12, 12, 12, 12, 12, //
    11, 11, 11, 11, 11, 11, 11, 11, 10, 10, 10, 10, 10, 10, 10, 10, //
    9, 9, 9, 9, 9, 9, 9, 9, 8, 8, 8, 8, 8, 8, 8, 8, //
    7, 7, 7, 7, 7, 7, 7, 7, 6, 6, 6, 6, 6, 6, 6, 6, //
    5, 5, 5, 5, 5, 5, 5, 5, 4, 4, 4, 4, 4, 4, 4, 4, //
    3, 3, 3, 3, 3, 3, 3, 3, 2, 2, 2, 2, 2, 2, 2, 2, //
    1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, //
];

/// Envelope increment patterns, indexed by the low two rate bits
pub const EG_STEP_TABLES: [[u8; 8]; 4] = [
    [0, 1, 0, 1, 0, 1, 0, 1],
    [0, 1, 0, 1, 1, 1, 0, 1],
    [0, 1, 1, 1, 0, 1, 1, 1],
    [0, 1, 1, 1, 1, 1, 1, 1],
];

/// Frequency multiplier (ML) in half steps: ML=0 means x0.5
pub const ML_TABLE: [u32; 16] = [
    1,
    2,
    2 * 2,
    3 * 2,
    4 * 2,
    5 * 2,
    6 * 2,
    7 * 2,
    8 * 2,
    9 * 2,
    10 * 2,
    10 * 2,
    12 * 2,
    12 * 2,
    15 * 2,
    15 * 2,
];

/// Key-scale level attenuation per `fnum >> 5` in eighths of a dB
/// (0, 9, 12, 13.875 ... 21 dB)
const KL_EIGHTH_DB: [i32; 16] = [
    0, 72, 96, 111, 120, 129, 135, 141, 144, 150, 153, 156, 159, 162, 165, 168,
];

/// Total level + key-scale level attenuation in envelope units,
/// indexed by `(block << 4) | (fnum >> 5)`, TL (or channel volume) and KL.
pub static TLL_TABLE: [[[u16; 4]; 1 << TL_BITS]; 8 * 16] = build_tll_table();

/// Key-scale rate, indexed by `(block << 1) | (fnum >> 8)` and the KR bit
pub static RKS_TABLE: [[u8; 2]; 8 * 2] = build_rks_table();

const fn build_full_sine() -> [u16; PG_WIDTH] {
    let mut table = [0u16; PG_WIDTH];
    let quarter = PG_WIDTH / 4;

    let mut x = 0;
    while x < quarter {
        table[x] = QUARTER_SINE[x];
        x += 1;
    }

    x = 0;
    while x < quarter {
        table[quarter + x] = table[quarter - x - 1];
        x += 1;
    }

    x = 0;
    while x < PG_WIDTH / 2 {
        table[PG_WIDTH / 2 + x] = 0x8000 | table[x];
        x += 1;
    }
    table
}

const fn build_half_sine() -> [u16; PG_WIDTH] {
    let full = build_full_sine();
    let mut table = [0xfffu16; PG_WIDTH];
    let mut x = 0;
    while x < PG_WIDTH / 2 {
        table[x] = full[x];
        x += 1;
    }
    table
}

const fn tl_to_eg(tl: usize) -> u16 {
    (tl as u16) << (EG_BITS - TL_BITS)
}

const fn build_tll_table() -> [[[u16; 4]; 1 << TL_BITS]; 8 * 16] {
    let mut table = [[[0u16; 4]; 1 << TL_BITS]; 8 * 16];

    let mut fnum = 0;
    while fnum < 16 {
        let mut block = 0;
        while block < 8 {
            let mut tl = 0;
            while tl < (1 << TL_BITS) {
                let mut kl = 0;
                while kl < 4 {
                    let index = (block << 4) | fnum;
                    // 3 dB per octave below block 7, in whole dB2 units
                    let tmp = (KL_EIGHTH_DB[fnum] - 24 * (7 - block as i32)) / 4;
                    table[index][tl][kl] = if kl == 0 || tmp <= 0 {
                        tl_to_eg(tl)
                    } else {
                        // divide by the 0.375 dB envelope step
                        (((tmp >> (3 - kl)) * 8 / 3) as u16) + tl_to_eg(tl)
                    };
                    kl += 1;
                }
                tl += 1;
            }
            block += 1;
        }
        fnum += 1;
    }
    table
}

const fn build_rks_table() -> [[u8; 2]; 8 * 2] {
    let mut table = [[0u8; 2]; 8 * 2];
    let mut fnum8 = 0;
    while fnum8 < 2 {
        let mut block = 0;
        while block < 8 {
            table[(block << 1) | fnum8][1] = ((block << 1) + fnum8) as u8;
            table[(block << 1) | fnum8][0] = (block >> 1) as u8;
            block += 1;
        }
        fnum8 += 1;
    }
    table
}

/// Waveform select (patch WF bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    /// Full sine wave
    #[default]
    Full,
    /// Positive half of the sine wave only
    Half,
}

impl Waveform {
    /// Decode the patch WF bit
    #[inline]
    pub fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            Waveform::Full
        } else {
            Waveform::Half
        }
    }

    /// Log-sine table backing this waveform
    #[inline]
    pub fn table(self) -> &'static [u16; PG_WIDTH] {
        match self {
            Waveform::Full => &FULL_SINE_TABLE,
            Waveform::Half => &HALF_SINE_TABLE,
        }
    }
}

/// Convert a log-domain value (bit 15 = sign, bits 8..14 = shift, 0..7 = mantissa)
/// into a linear sample in -4096..=4094.
#[inline]
pub fn lookup_exp(i: u16) -> i16 {
    let t = EXP_TABLE[((i & 0xff) ^ 0xff) as usize] as i32 + 1024;
    let res = t >> ((i & 0x7f00) >> 8);
    let signed = if i & 0x8000 != 0 { !res } else { res };
    (signed << 1) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sine_quarter_mirror() {
        for x in 0..PG_WIDTH / 4 {
            assert_eq!(
                FULL_SINE_TABLE[PG_WIDTH / 4 + x],
                FULL_SINE_TABLE[PG_WIDTH / 4 - x - 1]
            );
        }
        // peak of the sine sits at the quarter boundary
        assert_eq!(FULL_SINE_TABLE[PG_WIDTH / 4 - 1], 0);
        assert_eq!(FULL_SINE_TABLE[0], 2137);
    }

    #[test]
    fn test_full_sine_negative_half_has_sign_bit() {
        for x in 0..PG_WIDTH / 2 {
            let v = FULL_SINE_TABLE[PG_WIDTH / 2 + x];
            assert_eq!(v & 0x8000, 0x8000);
            assert_eq!(v & 0x7fff, FULL_SINE_TABLE[x]);
        }
    }

    #[test]
    fn test_half_sine_second_half_silent() {
        assert_eq!(&HALF_SINE_TABLE[..PG_WIDTH / 2], &FULL_SINE_TABLE[..PG_WIDTH / 2]);
        assert!(HALF_SINE_TABLE[PG_WIDTH / 2..].iter().all(|&v| v == 0xfff));
        assert_eq!(lookup_exp(0xfff), 0);
    }

    #[test]
    fn test_exp_table_monotonic() {
        for i in 1..EXP_TABLE.len() {
            assert!(EXP_TABLE[i] >= EXP_TABLE[i - 1]);
        }
    }

    #[test]
    fn test_lookup_exp_range_and_sign() {
        assert_eq!(lookup_exp(0), 4084);
        assert_eq!(lookup_exp(0x8000), -4086);
        // each 0x100 step halves the amplitude
        assert_eq!(lookup_exp(0x100), 2042);
    }

    #[test]
    fn test_tll_table_key_scale() {
        // KL off: plain total level
        assert_eq!(TLL_TABLE[(7 << 4) | 15][10][0], 20);
        // Highest pitch, KL=3: 21 dB / 0.375 dB
        assert_eq!(TLL_TABLE[(7 << 4) | 15][0][3], 112);
        assert_eq!(TLL_TABLE[(7 << 4) | 15][0][1], (42 >> 2) * 8 / 3);
        // low octaves never receive key-scale attenuation
        assert_eq!(TLL_TABLE[0][5][3], 10);
    }

    #[test]
    fn test_rks_table() {
        assert_eq!(RKS_TABLE[(7 << 1) | 1][1], 15);
        assert_eq!(RKS_TABLE[(7 << 1) | 1][0], 3);
        assert_eq!(RKS_TABLE[(2 << 1)][1], 4);
        assert_eq!(RKS_TABLE[(2 << 1)][0], 1);
    }

    #[test]
    fn test_waveform_table_selection() {
        assert!(std::ptr::eq(Waveform::from_bit(0).table(), &FULL_SINE_TABLE));
        assert!(std::ptr::eq(Waveform::from_bit(1).table(), &HALF_SINE_TABLE));
    }
}
