//! Compact byte patches.
//!
//! A patch is authored elsewhere and arrives as bytes:
//!
//! ```text
//! [ voice params x59 ][ channel params x24 ][ max_poly ][ n ][ routing x n ]
//!                                                            (src, amount, dest)
//! ```
//!
//! Parsing validates everything up front so the render thread only ever sees
//! well-formed data.

pub mod builder;
pub mod params;

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{error::PatchError, MAX_VOICES};

pub use builder::PatchBuilder;
use params::{channel, global, voice};

pub const NUM_VOICE_PARAMS: usize = voice::COUNT;
pub const NUM_CHANNEL_PARAMS: usize = channel::COUNT;
pub const NUM_GLOBAL_PARAMS: usize = global::COUNT;
/// Voice and channel parameters share one destination index space.
pub const NUM_DESTINATIONS: usize = NUM_VOICE_PARAMS + NUM_CHANNEL_PARAMS;

const HEADER_LEN: usize = NUM_VOICE_PARAMS + NUM_CHANNEL_PARAMS + 2;
const ROUTING_LEN: usize = 3;

/// Modulation sources. The set is closed; ids are stable wire values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModSource {
    Velocity = 0,
    ModWheel = 1,
    Breath = 2,
    Control3 = 3,
    Control4 = 4,
    Control5 = 5,
    Control6 = 6,
    Volume = 7,
    Envelope1 = 8,
    Envelope2 = 9,
    Lfo1 = 10,
    Lfo2 = 11,
    Note = 12,
}

impl ModSource {
    pub const COUNT: usize = 13;

    pub fn from_id(id: u8) -> Option<Self> {
        use ModSource::*;
        Some(match id {
            0 => Velocity,
            1 => ModWheel,
            2 => Breath,
            3 => Control3,
            4 => Control4,
            5 => Control5,
            6 => Control6,
            7 => Volume,
            8 => Envelope1,
            9 => Envelope2,
            10 => Lfo1,
            11 => Lfo2,
            12 => Note,
            _ => return None,
        })
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Controller number read by this source, for CC1-CC7 sources.
    pub fn controller(self) -> Option<usize> {
        match self.id() {
            id @ 1..=7 => Some(id as usize),
            _ => None,
        }
    }
}

/// Where a routing writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Voice(usize),
    Channel(usize),
}

/// One row of the modulation matrix.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRouting {
    pub source: ModSource,
    /// 64 is neutral; below subtracts, above adds.
    pub amount: u8,
    pub destination: u8,
}

impl ModRouting {
    pub fn new(source: ModSource, amount: u8, destination: u8) -> Self {
        Self {
            source,
            amount,
            destination,
        }
    }

    /// Signed scale factor in `-1.0..1.0`.
    #[inline]
    pub fn scale(&self) -> f32 {
        (self.amount as f32 - 64.0) / 64.0
    }

    #[inline]
    pub fn target(&self) -> Destination {
        let index = self.destination as usize;
        if index < NUM_VOICE_PARAMS {
            Destination::Voice(index)
        } else {
            Destination::Channel(index - NUM_VOICE_PARAMS)
        }
    }
}

/// Immutable sound description shared by every voice of a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    voice: [u8; NUM_VOICE_PARAMS],
    channel: [u8; NUM_CHANNEL_PARAMS],
    max_poly: u8,
    routings: Vec<ModRouting>,
}

impl Patch {
    /// Parse and validate patch bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PatchError> {
        if bytes.len() < HEADER_LEN {
            return Err(PatchError::Truncated {
                expected: HEADER_LEN,
                found: bytes.len(),
            });
        }

        let (voice_bytes, rest) = bytes.split_at(NUM_VOICE_PARAMS);
        let (channel_bytes, rest) = rest.split_at(NUM_CHANNEL_PARAMS);
        check_range("voice", voice_bytes)?;
        check_range("channel", channel_bytes)?;

        let max_poly = rest[0];
        if max_poly == 0 || max_poly as usize > MAX_VOICES {
            return Err(PatchError::InvalidPolyphony {
                limit: max_poly,
                max: MAX_VOICES,
            });
        }

        let count = rest[1] as usize;
        let records = &rest[2..];
        let expected = count * ROUTING_LEN;
        if records.len() < expected {
            return Err(PatchError::Truncated {
                expected: HEADER_LEN + expected,
                found: bytes.len(),
            });
        }
        if records.len() > expected {
            return Err(PatchError::TrailingBytes {
                extra: records.len() - expected,
            });
        }

        let mut routings = Vec::with_capacity(count);
        for (routing, record) in records.chunks_exact(ROUTING_LEN).enumerate() {
            let source = ModSource::from_id(record[0]).ok_or(PatchError::UnknownSource {
                routing,
                source_id: record[0],
            })?;
            let amount = record[1];
            if amount > 127 {
                return Err(PatchError::ParamOutOfRange {
                    block: "routing amount",
                    index: routing,
                    value: amount,
                });
            }
            let destination = record[2];
            if destination as usize >= NUM_DESTINATIONS {
                return Err(PatchError::DestinationOutOfRange {
                    routing,
                    destination,
                    max: NUM_DESTINATIONS - 1,
                });
            }
            routings.push(ModRouting::new(source, amount, destination));
        }

        let mut voice = [0u8; NUM_VOICE_PARAMS];
        voice.copy_from_slice(voice_bytes);
        let mut channel = [0u8; NUM_CHANNEL_PARAMS];
        channel.copy_from_slice(channel_bytes);

        Ok(Self {
            voice,
            channel,
            max_poly,
            routings,
        })
    }

    /// Serialize back into the wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.routings.len() * ROUTING_LEN);
        bytes.extend_from_slice(&self.voice);
        bytes.extend_from_slice(&self.channel);
        bytes.push(self.max_poly);
        bytes.push(self.routings.len() as u8);
        for routing in &self.routings {
            bytes.extend_from_slice(&[routing.source.id(), routing.amount, routing.destination]);
        }
        bytes
    }

    pub fn voice_params(&self) -> &[u8; NUM_VOICE_PARAMS] {
        &self.voice
    }

    pub fn channel_params(&self) -> &[u8; NUM_CHANNEL_PARAMS] {
        &self.channel
    }

    pub fn max_poly(&self) -> usize {
        self.max_poly as usize
    }

    pub fn routings(&self) -> &[ModRouting] {
        &self.routings
    }
}

fn check_range(block: &'static str, bytes: &[u8]) -> Result<(), PatchError> {
    match bytes.iter().position(|&b| b > 127) {
        Some(index) => Err(PatchError::ParamOutOfRange {
            block,
            index,
            value: bytes[index],
        }),
        None => Ok(()),
    }
}

/// Program-change table. Program numbers index into it.
#[derive(Debug, Clone, Default)]
pub struct PatchBank {
    patches: Vec<Arc<Patch>>,
}

impl PatchBank {
    pub fn new(patches: Vec<Patch>) -> Self {
        Self {
            patches: patches.into_iter().map(Arc::new).collect(),
        }
    }

    /// Parse every entry, failing on the first malformed patch.
    pub fn from_bytes<B: AsRef<[u8]>>(entries: &[B]) -> Result<Self, PatchError> {
        let patches = entries
            .iter()
            .map(|bytes| Patch::from_bytes(bytes.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(patches))
    }

    pub fn get(&self, program: u8) -> Option<&Arc<Patch>> {
        self.patches.get(program as usize)
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

/// Master bus settings: reverb, delay, cut filters, bus compressor, volume.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalParams {
    values: [u8; NUM_GLOBAL_PARAMS],
}

impl Default for GlobalParams {
    fn default() -> Self {
        use params::comp;

        let mut values = [0u8; NUM_GLOBAL_PARAMS];
        values[global::REVERB_TIME] = 64;
        values[global::REVERB_DAMPING] = 64;
        values[global::REVERB_LOW_CUT] = 16;
        values[global::REVERB_VOLUME] = 0;
        values[global::DELAY_AMOUNT] = 0;
        values[global::DELAY_FEEDBACK] = 64;
        values[global::DELAY_L] = 48;
        values[global::DELAY_R] = 64;
        values[global::DELAY_RATE] = 0;
        values[global::DELAY_DEPTH] = 0;
        values[global::DELAY_PHASE] = 64;
        values[global::LOW_CUT] = 0;
        values[global::HIGH_CUT] = 127;
        values[global::COMP_BASE + comp::MODE] = 0;
        values[global::COMP_BASE + comp::STEREO_LINK] = 127;
        values[global::COMP_BASE + comp::AUTO_GAIN] = 0;
        values[global::COMP_BASE + comp::LOOKAHEAD] = 0;
        values[global::COMP_BASE + comp::THRESHOLD] = 100;
        values[global::COMP_BASE + comp::RATIO] = 32;
        values[global::COMP_BASE + comp::ATTACK] = 20;
        values[global::COMP_BASE + comp::RELEASE] = 64;
        values[global::COMP_BASE + comp::OUT_GAIN] = 64;
        values[global::MASTER_VOLUME] = 127;
        Self { values }
    }
}

impl GlobalParams {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PatchError> {
        if bytes.len() < NUM_GLOBAL_PARAMS {
            return Err(PatchError::Truncated {
                expected: NUM_GLOBAL_PARAMS,
                found: bytes.len(),
            });
        }
        if bytes.len() > NUM_GLOBAL_PARAMS {
            return Err(PatchError::TrailingBytes {
                extra: bytes.len() - NUM_GLOBAL_PARAMS,
            });
        }
        check_range("global", bytes)?;
        let mut values = [0u8; NUM_GLOBAL_PARAMS];
        values.copy_from_slice(bytes);
        Ok(Self { values })
    }

    pub fn get(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0) as f32
    }

    pub fn set(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value.min(127);
        }
    }

    pub fn as_bytes(&self) -> &[u8; NUM_GLOBAL_PARAMS] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_bytes() -> Vec<u8> {
        let mut bytes = vec![64u8; NUM_VOICE_PARAMS + NUM_CHANNEL_PARAMS];
        bytes.push(8); // max_poly
        bytes.push(0); // no routings
        bytes
    }

    #[test]
    fn parses_minimal_patch() {
        let patch = Patch::from_bytes(&minimal_bytes()).unwrap();
        assert_eq!(patch.max_poly(), 8);
        assert!(patch.routings().is_empty());
        assert_eq!(patch.to_bytes(), minimal_bytes());
    }

    #[test]
    fn parses_routings() {
        let mut bytes = minimal_bytes();
        let len = bytes.len();
        bytes[len - 1] = 2;
        bytes.extend_from_slice(&[0, 96, 5]);
        bytes.extend_from_slice(&[10, 32, (NUM_VOICE_PARAMS + 1) as u8]);

        let patch = Patch::from_bytes(&bytes).unwrap();
        assert_eq!(patch.routings().len(), 2);
        assert_eq!(patch.routings()[0].source, ModSource::Velocity);
        assert_eq!(patch.routings()[0].target(), Destination::Voice(5));
        assert!((patch.routings()[0].scale() - 0.5).abs() < 1e-6);
        assert_eq!(patch.routings()[1].target(), Destination::Channel(1));
        assert!((patch.routings()[1].scale() + 0.5).abs() < 1e-6);
    }

    #[test]
    fn rejects_bad_polyphony() {
        let mut bytes = minimal_bytes();
        let idx = NUM_VOICE_PARAMS + NUM_CHANNEL_PARAMS;
        bytes[idx] = 0;
        assert!(matches!(
            Patch::from_bytes(&bytes),
            Err(PatchError::InvalidPolyphony { limit: 0, .. })
        ));
        bytes[idx] = (MAX_VOICES + 1) as u8;
        assert!(matches!(
            Patch::from_bytes(&bytes),
            Err(PatchError::InvalidPolyphony { .. })
        ));
    }

    #[test]
    fn rejects_destination_out_of_range() {
        let mut bytes = minimal_bytes();
        let len = bytes.len();
        bytes[len - 1] = 1;
        bytes.extend_from_slice(&[0, 64, NUM_DESTINATIONS as u8]);
        assert!(matches!(
            Patch::from_bytes(&bytes),
            Err(PatchError::DestinationOutOfRange { routing: 0, .. })
        ));
    }

    #[test]
    fn rejects_unknown_source_and_bad_lengths() {
        let mut bytes = minimal_bytes();
        let len = bytes.len();
        bytes[len - 1] = 1;
        bytes.extend_from_slice(&[ModSource::COUNT as u8, 64, 0]);
        assert!(matches!(
            Patch::from_bytes(&bytes),
            Err(PatchError::UnknownSource { .. })
        ));

        let mut short = minimal_bytes();
        let len = short.len();
        short[len - 1] = 3;
        assert!(matches!(
            Patch::from_bytes(&short),
            Err(PatchError::Truncated { .. })
        ));

        let mut long = minimal_bytes();
        long.push(0);
        assert!(matches!(
            Patch::from_bytes(&long),
            Err(PatchError::TrailingBytes { extra: 1 })
        ));
    }

    #[test]
    fn rejects_param_above_127() {
        let mut bytes = minimal_bytes();
        bytes[3] = 200;
        assert!(matches!(
            Patch::from_bytes(&bytes),
            Err(PatchError::ParamOutOfRange { block: "voice", index: 3, value: 200 })
        ));
    }

    #[test]
    fn global_params_validate_length() {
        let defaults = GlobalParams::default();
        let parsed = GlobalParams::from_bytes(defaults.as_bytes()).unwrap();
        assert_eq!(parsed, defaults);
        assert!(GlobalParams::from_bytes(&[0; 3]).is_err());
    }
}
