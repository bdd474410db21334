//! The modulation matrix.
//!
//! Once per control frame every routing adds `source * (amount - 64) / 64`
//! to one working parameter, starting from the patch's static values. The
//! result is clamped back onto the parameter scale, so a routing can never
//! push a parameter outside what a patch could have stored directly.

use crate::patch::{Destination, ModRouting, ModSource};
use crate::patch::params::PARAM_MAX;

/// Controller numbers readable as sources: CC0 to CC7.
pub const NUM_SOURCE_CONTROLLERS: usize = 8;

/// Values of every modulation source for one voice and frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModSources {
    values: [f32; ModSource::COUNT],
}

impl Default for ModSources {
    fn default() -> Self {
        Self {
            values: [0.0; ModSource::COUNT],
        }
    }
}

impl ModSources {
    pub fn new(
        velocity: u8,
        note: u8,
        controllers: &[u8; NUM_SOURCE_CONTROLLERS],
        envelopes: [f32; 2],
        lfos: [f32; 2],
    ) -> Self {
        let mut values = [0.0; ModSource::COUNT];
        values[ModSource::Velocity as usize] = velocity as f32;
        for cc in 1..NUM_SOURCE_CONTROLLERS {
            values[cc] = controllers[cc] as f32;
        }
        values[ModSource::Envelope1 as usize] = envelopes[0];
        values[ModSource::Envelope2 as usize] = envelopes[1];
        values[ModSource::Lfo1 as usize] = lfos[0];
        values[ModSource::Lfo2 as usize] = lfos[1];
        values[ModSource::Note as usize] = note as f32;
        Self { values }
    }

    #[inline]
    pub fn get(&self, source: ModSource) -> f32 {
        self.values[source as usize]
    }

    pub fn set(&mut self, source: ModSource, value: f32) {
        self.values[source as usize] = value;
    }
}

/// Reset `working` to `base`, add every routing `select` accepts, clamp.
fn apply<const N: usize, F>(
    routings: &[ModRouting],
    sources: &ModSources,
    base: &[u8; N],
    working: &mut [f32; N],
    select: F,
) where
    F: Fn(Destination) -> Option<usize>,
{
    for (w, &b) in working.iter_mut().zip(base.iter()) {
        *w = b as f32;
    }

    let mut touched = false;
    for routing in routings {
        if let Some(index) = select(routing.target()) {
            if let Some(slot) = working.get_mut(index) {
                *slot += sources.get(routing.source) * routing.scale();
                touched = true;
            }
        }
    }

    if touched {
        for w in working.iter_mut() {
            *w = w.clamp(0.0, PARAM_MAX);
        }
    }
}

/// Recompute a voice's working parameters.
pub fn apply_voice<const N: usize>(
    routings: &[ModRouting],
    sources: &ModSources,
    base: &[u8; N],
    working: &mut [f32; N],
) {
    apply(routings, sources, base, working, |target| match target {
        Destination::Voice(index) => Some(index),
        Destination::Channel(_) => None,
    });
}

/// Recompute a channel's working parameters from one voice's sources.
pub fn apply_channel<const N: usize>(
    routings: &[ModRouting],
    sources: &ModSources,
    base: &[u8; N],
    working: &mut [f32; N],
) {
    apply(routings, sources, base, working, |target| match target {
        Destination::Channel(index) => Some(index),
        Destination::Voice(_) => None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::NUM_VOICE_PARAMS;

    fn sources() -> ModSources {
        let mut controllers = [0u8; NUM_SOURCE_CONTROLLERS];
        controllers[1] = 100;
        ModSources::new(127, 60, &controllers, [128.0, 64.0], [-128.0, 32.0])
    }

    #[test]
    fn sources_read_their_inputs() {
        let s = sources();
        assert_eq!(s.get(ModSource::Velocity), 127.0);
        assert_eq!(s.get(ModSource::ModWheel), 100.0);
        assert_eq!(s.get(ModSource::Envelope1), 128.0);
        assert_eq!(s.get(ModSource::Lfo1), -128.0);
        assert_eq!(s.get(ModSource::Note), 60.0);
    }

    #[test]
    fn neutral_amount_changes_nothing() {
        let base = [50u8; NUM_VOICE_PARAMS];
        let mut working = [0.0; NUM_VOICE_PARAMS];
        let routings = [ModRouting::new(ModSource::Velocity, 64, 3)];
        apply_voice(&routings, &sources(), &base, &mut working);
        assert!(working.iter().all(|&w| w == 50.0));
    }

    #[test]
    fn routings_add_and_clamp() {
        let base = [50u8; NUM_VOICE_PARAMS];
        let mut working = [0.0; NUM_VOICE_PARAMS];
        let routings = [
            // +0.5 * 64 = +32
            ModRouting::new(ModSource::Envelope2, 96, 3),
            // +1.0 * 128 saturates
            ModRouting::new(ModSource::Envelope1, 127, 4),
            // -1.0 * 127 saturates low
            ModRouting::new(ModSource::Velocity, 0, 5),
        ];
        apply_voice(&routings, &sources(), &base, &mut working);
        assert_eq!(working[3], 82.0);
        assert_eq!(working[4], 127.0);
        assert_eq!(working[5], 0.0);
        assert_eq!(working[6], 50.0);
    }

    #[test]
    fn routings_stack_on_one_destination() {
        let base = [10u8; NUM_VOICE_PARAMS];
        let mut working = [0.0; NUM_VOICE_PARAMS];
        let routings = [
            ModRouting::new(ModSource::Lfo2, 127, 0),
            ModRouting::new(ModSource::Lfo2, 127, 0),
        ];
        apply_voice(&routings, &sources(), &base, &mut working);
        let one = 32.0 * 63.0 / 64.0;
        assert!((working[0] - (10.0 + 2.0 * one)).abs() < 1e-4);
    }

    #[test]
    fn channel_and_voice_routings_are_separated() {
        let voice_base = [20u8; NUM_VOICE_PARAMS];
        let channel_base = [20u8; 24];
        let mut voice = [0.0; NUM_VOICE_PARAMS];
        let mut channel = [0.0; 24];
        let routings = [ModRouting::new(ModSource::Velocity, 127, NUM_VOICE_PARAMS as u8)];

        apply_voice(&routings, &sources(), &voice_base, &mut voice);
        apply_channel(&routings, &sources(), &channel_base, &mut channel);

        assert!(voice.iter().all(|&w| w == 20.0));
        assert_eq!(channel[0], 127.0);
        assert_eq!(channel[1], 20.0);
    }
}
