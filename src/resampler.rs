//! Internal-rate to output-rate conversion
//!
//! The chip synthesizes at `clock / 72` Hz. [`OutputClock`] decides how many internal
//! ticks to run per output sample, and [`RateConverter`] band-limits the internal
//! stream with a Blackman-windowed sinc kernel when the two rates differ.

use std::f64::consts::PI;

use crate::Result;

/// Kernel length in input samples
const LW: usize = 16;
/// Sub-sample resolution of the kernel table
const SINC_RESO: usize = 256;
/// Fixed-point scale of the kernel table
const SINC_AMP_BITS: u32 = 12;
/// One-sided kernel table length
const SINC_TABLE_LEN: usize = SINC_RESO * LW / 2;

/// Highest internal or output rate the 24.8 fixed-point [`OutputClock`] accepts
pub const MAX_RATE: u32 = 0xff_ffff;

/// Channels carried by every converter (left, right; mono uses channel 0)
pub const CONVERTER_CHANNELS: usize = 2;

fn blackman(x: f64) -> f64 {
    0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

fn windowed_sinc(x: f64) -> f64 {
    blackman(0.5 + 0.5 * x / (LW / 2) as f64) * sinc(x)
}

/// Internal synthesis rate for a chip clock (integer division, like the hardware divider)
#[inline]
pub fn internal_rate(clock: u32) -> u32 {
    clock / 72
}

/// Whether converting `f_in` to `f_out` needs the sinc filter.
///
/// Rates that agree after truncation or after rounding pass straight through.
pub fn conversion_needed(f_in: f64, f_out: f64) -> bool {
    f_in.floor() != f_out && (f_in + 0.5).floor() != f_out
}

/// Windowed-sinc sample-rate converter
#[derive(Clone)]
pub struct RateConverter {
    f_ratio: f64,
    timer: f64,
    /// One-sided kernel, indexed by |x| * SINC_RESO
    sinc_table: Vec<i16>,
    /// Sliding input history per channel, oldest first
    history: Vec<[i16; LW]>,
}

impl RateConverter {
    /// Build a converter from `f_in` Hz to `f_out` Hz
    ///
    /// # Arguments
    ///
    /// * `f_in` - Input (internal) rate
    /// * `f_out` - Output rate
    ///
    /// # Errors
    ///
    /// Returns [`crate::Ym2413Error::Allocation`] if the kernel or history buffers
    /// cannot be reserved.
    pub fn new(f_in: f64, f_out: f64) -> Result<Self> {
        let f_ratio = f_in / f_out;

        let mut sinc_table = Vec::new();
        sinc_table.try_reserve_exact(SINC_TABLE_LEN)?;
        for i in 0..SINC_TABLE_LEN {
            let x = i as f64 / SINC_RESO as f64;
            let amp = (1 << SINC_AMP_BITS) as f64;
            let value = if f_out < f_in {
                // downsampling: widen the kernel to cut below the output Nyquist
                amp * windowed_sinc(x / f_ratio) / f_ratio
            } else {
                amp * windowed_sinc(x)
            };
            sinc_table.push(value as i16);
        }

        let mut history = Vec::new();
        history.try_reserve_exact(CONVERTER_CHANNELS)?;
        history.resize(CONVERTER_CHANNELS, [0; LW]);

        Ok(Self {
            f_ratio,
            timer: 0.0,
            sinc_table,
            history,
        })
    }

    /// Input samples consumed per output sample
    pub fn ratio(&self) -> f64 {
        self.f_ratio
    }

    /// Clear history and phase without reallocating
    pub fn reset(&mut self) {
        self.timer = 0.0;
        for buf in self.history.iter_mut() {
            buf.fill(0);
        }
    }

    /// Push one input sample into channel `ch`
    #[inline]
    pub fn put_data(&mut self, ch: usize, data: i16) {
        if let Some(buf) = self.history.get_mut(ch) {
            buf.copy_within(1.., 0);
            buf[LW - 1] = data;
        }
    }

    #[inline]
    fn lookup(&self, x: f64) -> i32 {
        let index = ((x * SINC_RESO as f64) as i16).unsigned_abs() as usize;
        self.sinc_table[index.min(SINC_TABLE_LEN - 1)] as i32
    }

    /// Step the fractional phase by one output sample.
    ///
    /// Call once per output frame, before reading the frame's channels.
    #[inline]
    pub fn advance(&mut self) {
        self.timer += self.f_ratio;
        self.timer -= self.timer.floor();
    }

    /// Interpolated sample of channel `ch` at the current phase
    #[inline]
    pub fn get_data(&self, ch: usize) -> i16 {
        let dn = self.timer;
        let Some(buf) = self.history.get(ch) else {
            return 0;
        };

        let mut sum = 0i32;
        for (k, &sample) in buf.iter().enumerate() {
            let x = (k as f64 - (LW / 2 - 1) as f64) - dn;
            sum = sum.wrapping_add(sample as i32 * self.lookup(x));
        }
        (sum >> SINC_AMP_BITS) as i16
    }
}

impl std::fmt::Debug for RateConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateConverter")
            .field("f_ratio", &self.f_ratio)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

/// Output-rate timer: schedules internal ticks against output samples in 24.8 fixed point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputClock {
    out_time: u64,
    out_step: u64,
    inp_step: u64,
}

impl OutputClock {
    /// Create a timer for `internal_rate` Hz in, `output_rate` Hz out
    pub fn new(internal_rate: u32, output_rate: u32) -> Self {
        Self {
            out_time: 0,
            out_step: (internal_rate as u64) << 8,
            inp_step: (output_rate as u64) << 8,
        }
    }

    /// Rewind to the start of an output period
    pub fn reset(&mut self) {
        self.out_time = 0;
    }

    /// Whether another internal tick is due before the next output sample.
    /// Consumes the tick when it returns true.
    #[inline]
    pub fn tick_due(&mut self) -> bool {
        if self.out_step > self.out_time {
            self.out_time = self.out_time.wrapping_add(self.inp_step);
            true
        } else {
            false
        }
    }

    /// Close the current output period
    #[inline]
    pub fn finish_sample(&mut self) {
        self.out_time = self.out_time.wrapping_sub(self.out_step);
    }
}
