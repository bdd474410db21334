use std::sync::Arc;

use crate::dsp::biquad::{Biquad, BiquadCoeffs};
use crate::dsp::chorus::Chorus;
use crate::dsp::compressor::{Compressor, CompressorParams};
use crate::dsp::delay::ModDelayParams;
use crate::dsp::distortion::{Distortion, DistortionMode};
use crate::dsp::ramp::Ramp;
use crate::engine::meter::{frame_peak, PeakHold, StereoMeter};
use crate::patch::params::{channel, comp, switch, unit, volume};
use crate::patch::{ModRouting, Patch, NUM_CHANNEL_PARAMS};
use crate::synth::master::Buses;
use crate::synth::modulation::{apply_channel, ModSources, NUM_SOURCE_CONTROLLERS};
use crate::synth::voice::VoiceInput;
use crate::FRAME_SIZE;

/*
Channel Strip
=============

    voices ─→ L/R ─→ [distortion] ⇄ [chorus] ─→ [bass boost] ─→ [compressor] ─→ volume ─┬─→ mix
                      (order is a patch switch)                                          ├─→ × send A ─→ aux A
                                                                                         └─→ × send B ─→ aux B

A channel holds the controller state and the patch its voices play. Voices
are not owned here; the pool records which channel each slot belongs to.
*/

const BOOST_FREQUENCY: f64 = 150.0;
const MAX_BOOST_DB: f32 = 18.0;
/// Full bend range in semitones.
const BEND_RANGE: f32 = 2.0;

pub const CC_RESET_CONTROLLERS: u8 = 121;

pub struct Channel {
    patch: Option<Arc<Patch>>,
    controllers: [u8; NUM_SOURCE_CONTROLLERS],
    pitch_bend: f32,
    working: [f32; NUM_CHANNEL_PARAMS],

    distortion: [Distortion; 2],
    chorus: Chorus,
    boost: [Biquad; 2],
    boost_db: f32,
    compressor: Compressor,
    volume: Ramp,
    send_a: Ramp,
    send_b: Ramp,

    left: [f32; FRAME_SIZE],
    right: [f32; FRAME_SIZE],
    peak: PeakHold,
    sample_rate: f32,
}

impl Channel {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            patch: None,
            controllers: [0; NUM_SOURCE_CONTROLLERS],
            pitch_bend: 0.0,
            working: [0.0; NUM_CHANNEL_PARAMS],
            distortion: [Distortion::new(sample_rate), Distortion::new(sample_rate)],
            chorus: Chorus::new(sample_rate),
            boost: [Biquad::default(), Biquad::default()],
            boost_db: 0.0,
            compressor: Compressor::new(sample_rate),
            volume: Ramp::new(0.0),
            send_a: Ramp::new(0.0),
            send_b: Ramp::new(0.0),
            left: [0.0; FRAME_SIZE],
            right: [0.0; FRAME_SIZE],
            peak: PeakHold::new(sample_rate, FRAME_SIZE),
            sample_rate,
        }
    }

    /// Install a patch and hand back the one it replaces.
    pub fn set_patch(&mut self, patch: Arc<Patch>) -> Option<Arc<Patch>> {
        for (w, &b) in self.working.iter_mut().zip(patch.channel_params()) {
            *w = b as f32;
        }
        self.patch.replace(patch)
    }

    pub fn patch(&self) -> Option<&Arc<Patch>> {
        self.patch.as_ref()
    }

    pub fn has_patch(&self) -> bool {
        self.patch.is_some()
    }

    /// Store a controller value. Only CC1 to CC7 are modulation sources;
    /// CC121 resets them along with pitch bend.
    pub fn control_change(&mut self, controller: u8, value: u8) {
        if controller == CC_RESET_CONTROLLERS {
            self.controllers = [0; NUM_SOURCE_CONTROLLERS];
            self.pitch_bend = 0.0;
        } else if let Some(slot) = self.controllers.get_mut(controller as usize) {
            *slot = value.min(127);
        }
    }

    pub fn controller(&self, controller: u8) -> Option<u8> {
        self.controllers.get(controller as usize).copied()
    }

    /// `value` in `-8192..=8191`.
    pub fn set_pitch_bend(&mut self, value: i16) {
        self.pitch_bend = value.clamp(-8192, 8191) as f32 / 8192.0 * BEND_RANGE;
    }

    /// Current bend in semitones.
    pub fn pitch_bend(&self) -> f32 {
        self.pitch_bend
    }

    /// What a voice on this channel needs for its tick, if a patch is set.
    pub fn voice_input(&self) -> Option<VoiceInput<'_>> {
        self.patch.as_deref().map(|patch| VoiceInput {
            patch,
            controllers: &self.controllers,
            pitch_bend: self.pitch_bend,
        })
    }

    pub fn begin_frame(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }

    /// Control-frame update. Channel routings read `sources`, normally the
    /// channel's newest voice; with no voice they contribute nothing.
    pub fn tick(&mut self, sources: Option<&ModSources>) {
        let Some(patch) = self.patch.as_deref() else {
            return;
        };
        let routings: &[ModRouting] = match sources {
            Some(_) => patch.routings(),
            None => &[],
        };
        let fallback = ModSources::default();
        apply_channel(
            routings,
            sources.unwrap_or(&fallback),
            patch.channel_params(),
            &mut self.working,
        );

        let w = &self.working;
        let mode = DistortionMode::from_param(w[channel::DIST_MODE]);
        for dist in &mut self.distortion {
            dist.set(mode, w[channel::DIST_DRIVE], w[channel::DIST_PARAM]);
        }
        self.chorus.set(&ModDelayParams::from_raw(
            &w[channel::CHORUS_AMOUNT..=channel::CHORUS_PHASE],
        ));

        let boost_db = unit(w[channel::BOOST]) * MAX_BOOST_DB;
        if boost_db != self.boost_db {
            self.boost_db = boost_db;
            let coeffs = if boost_db <= 0.0 {
                BiquadCoeffs::IDENTITY
            } else {
                BiquadCoeffs::low_shelf(BOOST_FREQUENCY, boost_db as f64, self.sample_rate as f64)
            };
            for filter in &mut self.boost {
                filter.set_coeffs(coeffs);
            }
        }

        self.compressor.set(&CompressorParams::from_raw(
            &w[channel::COMP_BASE..channel::COMP_BASE + comp::COUNT],
        ));

        self.volume.set_target(volume(w[channel::VOLUME]), FRAME_SIZE);
        self.send_a.set_target(unit(w[channel::AUX_A_SEND]), FRAME_SIZE);
        self.send_b.set_target(unit(w[channel::AUX_B_SEND]), FRAME_SIZE);
    }

    /// Voices render into these.
    pub fn buffers_mut(&mut self) -> (&mut [f32; FRAME_SIZE], &mut [f32; FRAME_SIZE]) {
        (&mut self.left, &mut self.right)
    }

    pub fn working_params(&self) -> &[f32; NUM_CHANNEL_PARAMS] {
        &self.working
    }

    fn render_distortion(&mut self) {
        let [left, right] = &mut self.distortion;
        left.render(&mut self.left);
        right.render(&mut self.right);
    }

    /// Run the effect chain and add the result to the buses.
    pub fn process(&mut self, buses: &mut Buses, meter: &StereoMeter) {
        if self.patch.is_none() {
            self.peak.update(0.0, 0.0, meter);
            return;
        }

        if switch(self.working[channel::FX_ORDER]) {
            self.chorus.render(&mut self.left, &mut self.right);
            self.render_distortion();
        } else {
            self.render_distortion();
            self.chorus.render(&mut self.left, &mut self.right);
        }

        let [boost_l, boost_r] = &mut self.boost;
        boost_l.render(&mut self.left);
        boost_r.render(&mut self.right);
        self.compressor.render(&mut self.left, &mut self.right);

        for i in 0..FRAME_SIZE {
            let gain = self.volume.next();
            let send_a = self.send_a.next();
            let send_b = self.send_b.next();
            let l = self.left[i] * gain;
            let r = self.right[i] * gain;
            self.left[i] = l;
            self.right[i] = r;

            buses.mix_left[i] += l;
            buses.mix_right[i] += r;
            buses.aux_a_left[i] += l * send_a;
            buses.aux_a_right[i] += r * send_a;
            buses.aux_b_left[i] += l * send_b;
            buses.aux_b_right[i] += r * send_b;
        }

        self.peak
            .update(frame_peak(&self.left), frame_peak(&self.right), meter);
    }

    /// Clear effect tails.
    pub fn reset(&mut self) {
        self.distortion.iter_mut().for_each(Distortion::reset);
        self.chorus.reset();
        self.boost.iter_mut().for_each(Biquad::reset);
        self.compressor.reset();
        self.peak.reset();
    }
}
