//! Parameter block layouts and byte-to-value conversions.
//!
//! Every parameter is a byte in `0..=127`. The modulation matrix works on the
//! same scale in `f32`, so these helpers take `f32` and accept modulated
//! values as well as raw bytes.

/// Highest legal parameter value.
pub const PARAM_MAX: f32 = 127.0;

/// Per-voice parameter indices.
pub mod voice {
    pub const PAN: usize = 0;
    pub const TRANSPOSE: usize = 1;

    pub const OSC_BASE: usize = 2;
    pub const OSC_STRIDE: usize = 6;
    pub const OSC_MODE: usize = 0;
    pub const OSC_RING: usize = 1;
    pub const OSC_TRANSPOSE: usize = 2;
    pub const OSC_DETUNE: usize = 3;
    pub const OSC_COLOR: usize = 4;
    pub const OSC_GAIN: usize = 5;

    pub const FILTER_BASE: usize = 20;
    pub const FILTER_STRIDE: usize = 3;
    pub const FILTER_MODE: usize = 0;
    pub const FILTER_CUTOFF: usize = 1;
    pub const FILTER_RESONANCE: usize = 2;

    pub const FILTER_ROUTING: usize = 26;
    pub const FILTER1_GAIN: usize = 27;
    pub const FILTER2_GAIN: usize = 28;

    pub const DIST_MODE: usize = 29;
    pub const DIST_DRIVE: usize = 30;
    pub const DIST_PARAM: usize = 31;

    pub const ENV_BASE: usize = 32;
    pub const ENV_STRIDE: usize = 6;
    pub const ENV_ATTACK: usize = 0;
    pub const ENV_DECAY: usize = 1;
    pub const ENV_SUSTAIN: usize = 2;
    pub const ENV_SUSTAIN_SLOPE: usize = 3;
    pub const ENV_RELEASE: usize = 4;
    pub const ENV_AMPLIFY: usize = 5;

    pub const LFO_BASE: usize = 44;
    pub const LFO_STRIDE: usize = 7;
    pub const LFO_WAVEFORM: usize = 0;
    pub const LFO_KEYSYNC: usize = 1;
    pub const LFO_ONE_SHOT: usize = 2;
    pub const LFO_RATE: usize = 3;
    pub const LFO_PHASE: usize = 4;
    pub const LFO_POLARITY: usize = 5;
    pub const LFO_AMPLIFY: usize = 6;

    pub const KEYSYNC: usize = 58;

    pub const COUNT: usize = 59;

    #[inline]
    pub const fn osc(index: usize, field: usize) -> usize {
        OSC_BASE + index * OSC_STRIDE + field
    }

    #[inline]
    pub const fn filter(index: usize, field: usize) -> usize {
        FILTER_BASE + index * FILTER_STRIDE + field
    }

    #[inline]
    pub const fn env(index: usize, field: usize) -> usize {
        ENV_BASE + index * ENV_STRIDE + field
    }

    #[inline]
    pub const fn lfo(index: usize, field: usize) -> usize {
        LFO_BASE + index * LFO_STRIDE + field
    }
}

/// Per-channel parameter indices.
pub mod channel {
    pub const VOLUME: usize = 0;
    pub const AUX_A_SEND: usize = 1;
    pub const AUX_B_SEND: usize = 2;
    pub const BOOST: usize = 3;
    pub const FX_ORDER: usize = 4;

    pub const DIST_MODE: usize = 5;
    pub const DIST_DRIVE: usize = 6;
    pub const DIST_PARAM: usize = 7;

    pub const CHORUS_AMOUNT: usize = 8;
    pub const CHORUS_FEEDBACK: usize = 9;
    pub const CHORUS_DELAY_L: usize = 10;
    pub const CHORUS_DELAY_R: usize = 11;
    pub const CHORUS_RATE: usize = 12;
    pub const CHORUS_DEPTH: usize = 13;
    pub const CHORUS_PHASE: usize = 14;

    pub const COMP_BASE: usize = 15;

    pub const COUNT: usize = 24;
}

/// Master bus parameter indices.
pub mod global {
    pub const REVERB_TIME: usize = 0;
    pub const REVERB_DAMPING: usize = 1;
    pub const REVERB_LOW_CUT: usize = 2;
    pub const REVERB_VOLUME: usize = 3;

    pub const DELAY_AMOUNT: usize = 4;
    pub const DELAY_FEEDBACK: usize = 5;
    pub const DELAY_L: usize = 6;
    pub const DELAY_R: usize = 7;
    pub const DELAY_RATE: usize = 8;
    pub const DELAY_DEPTH: usize = 9;
    pub const DELAY_PHASE: usize = 10;

    pub const LOW_CUT: usize = 11;
    pub const HIGH_CUT: usize = 12;

    pub const COMP_BASE: usize = 13;

    pub const MASTER_VOLUME: usize = 22;

    pub const COUNT: usize = 23;
}

/// Compressor parameter offsets, shared by the channel and master blocks.
pub mod comp {
    pub const MODE: usize = 0;
    pub const STEREO_LINK: usize = 1;
    pub const AUTO_GAIN: usize = 2;
    pub const LOOKAHEAD: usize = 3;
    pub const THRESHOLD: usize = 4;
    pub const RATIO: usize = 5;
    pub const ATTACK: usize = 6;
    pub const RELEASE: usize = 7;
    pub const OUT_GAIN: usize = 8;

    pub const COUNT: usize = 9;
}

/// `0..=127` to `0.0..=1.0`.
#[inline]
pub fn unit(value: f32) -> f32 {
    (value / PARAM_MAX).clamp(0.0, 1.0)
}

/// Volume curve: square law on the unit value.
#[inline]
pub fn volume(value: f32) -> f32 {
    let u = unit(value);
    u * u
}

/// 64-centred value to `-1.0..1.0`.
#[inline]
pub fn bipolar(value: f32) -> f32 {
    (value - 64.0) / 64.0
}

/// On/off switch. Values in the upper half are on.
#[inline]
pub fn switch(value: f32) -> bool {
    value >= 64.0
}

/// Small-integer selector clamped to `0..count`.
#[inline]
pub fn selector(value: f32, count: usize) -> usize {
    let index = value.round().max(0.0) as usize;
    index.min(count - 1)
}

/// Exponential map of `0..=127` onto `min..=max`.
#[inline]
pub fn exp_range(value: f32, min: f32, max: f32) -> f32 {
    min * (max / min).powf(unit(value))
}

#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 1.0e-9 {
        -180.0
    } else {
        20.0 * gain.log10()
    }
}
