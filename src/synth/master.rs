use crate::dsp::biquad::{Biquad, BiquadCoeffs};
use crate::dsp::compressor::{Compressor, CompressorParams};
use crate::dsp::delay::{ModDelayParams, ModulatedDelay};
use crate::dsp::oscillator::AuxInput;
use crate::dsp::ramp::Ramp;
use crate::dsp::reverb::StereoReverb;
use crate::engine::meter::{frame_peak, PeakHold, StereoMeter};
use crate::patch::params::{comp, exp_range, global, unit, volume, PARAM_MAX};
use crate::patch::{GlobalParams, NUM_GLOBAL_PARAMS};
use crate::FRAME_SIZE;

/*
Master Bus
==========

    channels ──→ mix ──────────────────────────┐
             ──→ aux A ──→ [reverb] ───────────┼─→ [low cut] ─→ [high cut] ─→ [compressor] ─→ volume ─→ out
             ──→ aux B ──→ [delay] × amount ───┘

Before the effects run, each aux bus is copied to a mono snapshot. The aux
oscillator modes read that snapshot during the next frame, so a voice can
feed on the reverb and delay sends without a cycle inside one frame.
*/

const DELAY_MAX_MS: f32 = 1_000.0;
const DELAY_MAX_DEPTH_MS: f32 = 10.0;

/// Stereo summing buses written by the channels each frame.
pub struct Buses {
    pub mix_left: [f32; FRAME_SIZE],
    pub mix_right: [f32; FRAME_SIZE],
    pub aux_a_left: [f32; FRAME_SIZE],
    pub aux_a_right: [f32; FRAME_SIZE],
    pub aux_b_left: [f32; FRAME_SIZE],
    pub aux_b_right: [f32; FRAME_SIZE],
}

impl Default for Buses {
    fn default() -> Self {
        Self {
            mix_left: [0.0; FRAME_SIZE],
            mix_right: [0.0; FRAME_SIZE],
            aux_a_left: [0.0; FRAME_SIZE],
            aux_a_right: [0.0; FRAME_SIZE],
            aux_b_left: [0.0; FRAME_SIZE],
            aux_b_right: [0.0; FRAME_SIZE],
        }
    }
}

impl Buses {
    pub fn clear(&mut self) {
        for bus in [
            &mut self.mix_left,
            &mut self.mix_right,
            &mut self.aux_a_left,
            &mut self.aux_a_right,
            &mut self.aux_b_left,
            &mut self.aux_b_right,
        ] {
            bus.fill(0.0);
        }
    }
}

fn low_cut_coeffs(value: f32, sample_rate: f32) -> BiquadCoeffs {
    if value <= 0.0 {
        BiquadCoeffs::IDENTITY
    } else {
        let cutoff = exp_range(value, 20.0, 2_000.0);
        BiquadCoeffs::highpass(cutoff as f64, sample_rate as f64)
    }
}

fn high_cut_coeffs(value: f32, sample_rate: f32) -> BiquadCoeffs {
    if value >= PARAM_MAX {
        BiquadCoeffs::IDENTITY
    } else {
        let cutoff = exp_range(value, 1_000.0, 20_000.0).min(sample_rate * 0.45);
        BiquadCoeffs::lowpass(cutoff as f64, sample_rate as f64)
    }
}

pub struct Master {
    buses: Buses,
    prev_aux_a: [f32; FRAME_SIZE],
    prev_aux_b: [f32; FRAME_SIZE],

    reverb: Box<StereoReverb>,
    delay: Box<ModulatedDelay>,
    delay_amount: Ramp,
    low_cut: [Biquad; 2],
    high_cut: [Biquad; 2],
    compressor: Compressor,
    volume: Ramp,
    volume_target: f32,

    out_left: [f32; FRAME_SIZE],
    out_right: [f32; FRAME_SIZE],
    peak: PeakHold,
    sample_rate: f32,
}

impl Master {
    pub fn new(sample_rate: f32) -> Self {
        let mut master = Self {
            buses: Buses::default(),
            prev_aux_a: [0.0; FRAME_SIZE],
            prev_aux_b: [0.0; FRAME_SIZE],
            reverb: Box::new(StereoReverb::new(sample_rate)),
            delay: Box::new(ModulatedDelay::new(
                sample_rate,
                DELAY_MAX_MS,
                DELAY_MAX_DEPTH_MS,
            )),
            delay_amount: Ramp::new(0.0),
            low_cut: [Biquad::default(), Biquad::default()],
            high_cut: [Biquad::default(), Biquad::default()],
            compressor: Compressor::new(sample_rate),
            volume: Ramp::new(0.0),
            volume_target: 0.0,
            out_left: [0.0; FRAME_SIZE],
            out_right: [0.0; FRAME_SIZE],
            peak: PeakHold::new(sample_rate, FRAME_SIZE),
            sample_rate,
        };
        master.set_globals(&GlobalParams::default());
        master.volume.snap(master.volume_target);
        master.delay_amount.finish();
        master
    }

    /// Reconfigure every master effect.
    pub fn set_globals(&mut self, globals: &GlobalParams) {
        let raw: [f32; NUM_GLOBAL_PARAMS] = globals.as_bytes().map(f32::from);

        self.reverb.set(
            raw[global::REVERB_TIME],
            raw[global::REVERB_DAMPING],
            raw[global::REVERB_LOW_CUT],
            raw[global::REVERB_VOLUME],
        );

        let delay = ModDelayParams::from_raw(&raw[global::DELAY_AMOUNT..=global::DELAY_PHASE]);
        self.delay_amount.set_target(unit(delay.amount), FRAME_SIZE);
        self.delay.set(&delay);

        let low = low_cut_coeffs(raw[global::LOW_CUT], self.sample_rate);
        let high = high_cut_coeffs(raw[global::HIGH_CUT], self.sample_rate);
        for filter in &mut self.low_cut {
            filter.set_coeffs(low);
        }
        for filter in &mut self.high_cut {
            filter.set_coeffs(high);
        }

        self.compressor.set(&CompressorParams::from_raw(
            &raw[global::COMP_BASE..global::COMP_BASE + comp::COUNT],
        ));
        self.volume_target = volume(raw[global::MASTER_VOLUME]);
    }

    pub fn begin_frame(&mut self) {
        self.buses.clear();
        self.volume.set_target(self.volume_target, FRAME_SIZE);
    }

    pub fn buses_mut(&mut self) -> &mut Buses {
        &mut self.buses
    }

    /// Last frame's aux buses, for the aux oscillator modes.
    pub fn aux_input(&self) -> AuxInput<'_> {
        AuxInput {
            a: &self.prev_aux_a,
            b: &self.prev_aux_b,
        }
    }

    /// Run the bus effects and publish the output level.
    pub fn process(&mut self, meter: &StereoMeter) {
        let buses = &self.buses;
        for i in 0..FRAME_SIZE {
            self.prev_aux_a[i] = 0.5 * (buses.aux_a_left[i] + buses.aux_a_right[i]);
            self.prev_aux_b[i] = 0.5 * (buses.aux_b_left[i] + buses.aux_b_right[i]);
        }

        for i in 0..FRAME_SIZE {
            let (reverb_l, reverb_r) =
                self.reverb.process(buses.aux_a_left[i], buses.aux_a_right[i]);
            let (delay_l, delay_r) = self.delay.process(buses.aux_b_left[i], buses.aux_b_right[i]);
            let delay_amount = self.delay_amount.next();
            self.out_left[i] = buses.mix_left[i] + reverb_l + delay_l * delay_amount;
            self.out_right[i] = buses.mix_right[i] + reverb_r + delay_r * delay_amount;
        }

        let [low_l, low_r] = &mut self.low_cut;
        low_l.render(&mut self.out_left);
        low_r.render(&mut self.out_right);
        let [high_l, high_r] = &mut self.high_cut;
        high_l.render(&mut self.out_left);
        high_r.render(&mut self.out_right);

        self.compressor
            .render(&mut self.out_left, &mut self.out_right);

        for (l, r) in self.out_left.iter_mut().zip(self.out_right.iter_mut()) {
            let gain = self.volume.next();
            *l *= gain;
            *r *= gain;
        }

        self.peak.update(
            frame_peak(&self.out_left),
            frame_peak(&self.out_right),
            meter,
        );
    }

    pub fn output(&self) -> (&[f32; FRAME_SIZE], &[f32; FRAME_SIZE]) {
        (&self.out_left, &self.out_right)
    }

    /// Clear every tail.
    pub fn reset(&mut self) {
        self.buses.clear();
        self.prev_aux_a.fill(0.0);
        self.prev_aux_b.fill(0.0);
        self.reverb.reset();
        self.delay.reset();
        self.low_cut.iter_mut().for_each(Biquad::reset);
        self.high_cut.iter_mut().for_each(Biquad::reset);
        self.compressor.reset();
        self.peak.reset();
    }
}
