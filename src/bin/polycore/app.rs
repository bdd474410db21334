//! Audio device setup and the render callback

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;

use polycore::patch::params::global;
use polycore::{initialize, presets, GlobalParams, SynthConfig};

use super::ui::{UiApp, SCOPE_LEN};

/// Largest stereo block rendered in one engine call.
const MAX_CALLBACK_FRAMES: usize = 4096;

/// Channels the demo sets up, one preset each.
pub const DEMO_CHANNELS: [(&str, fn() -> Vec<u8>); 5] = [
    ("lead", presets::lead),
    ("bass", presets::bass),
    ("pad", presets::pad),
    ("pluck", presets::pluck),
    ("bell", presets::bell),
];

/// Application builder
pub struct Polycore {
    octave: u8,
}

impl Polycore {
    pub fn new() -> Self {
        Self { octave: 4 }
    }

    /// Octave of the home row's lowest key.
    pub fn octave(mut self, octave: u8) -> Self {
        self.octave = octave.min(8);
        self
    }

    /// Open the default output device and run the UI until quit.
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let config = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = config.sample_rate().0 as f32;
        let channels = config.channels() as usize;

        let (mut synth, mut controller) = initialize(SynthConfig::with_sample_rate(sample_rate))
            .wrap_err("failed to start the engine")?;

        controller.load_bank(&presets::bank())?;
        for (channel, (_, preset)) in DEMO_CHANNELS.iter().enumerate() {
            controller.select_patch(channel as u8, &preset())?;
        }
        let mut globals = GlobalParams::default();
        globals.set(global::REVERB_VOLUME, 90);
        globals.set(global::DELAY_AMOUNT, 70);
        globals.set(global::DELAY_FEEDBACK, 90);
        controller.set_global_params(globals)?;

        let (mut scope_tx, scope_rx) = RingBuffer::<f32>::new(SCOPE_LEN * 4);
        let mut stereo = vec![0.0f32; 2 * MAX_CALLBACK_FRAMES];

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                let total_frames = data.len() / channels;
                let mut frames_written = 0;

                while frames_written < total_frames {
                    let frames = (total_frames - frames_written).min(MAX_CALLBACK_FRAMES);
                    let block = &mut stereo[..2 * frames];
                    synth.render(block, frames, None, false);

                    let out = &mut data[frames_written * channels..(frames_written + frames) * channels];
                    for (frame, pair) in out.chunks_exact_mut(channels).zip(block.chunks_exact(2)) {
                        for (ch, sample) in frame.iter_mut().enumerate() {
                            *sample = if ch % 2 == 0 { pair[0] } else { pair[1] };
                        }
                        // The scope is best effort; a full queue drops samples.
                        let _ = scope_tx.push(0.5 * (pair[0] + pair[1]));
                    }

                    frames_written += frames;
                }
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        )?;

        stream.play()?;

        let mut terminal = ratatui::init();
        let result = UiApp::new(controller, scope_rx, sample_rate, self.octave).run(&mut terminal);
        ratatui::restore();
        result
    }
}

impl Default for Polycore {
    fn default() -> Self {
        Self::new()
    }
}
