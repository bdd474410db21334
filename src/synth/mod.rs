// Purpose: per-voice synthesis, channel strips and the master bus

pub mod channel;
pub mod master;
pub mod message;
pub mod modulation;
pub mod voice;

pub use channel::Channel;
pub use master::{Buses, Master};
pub use message::{Command, MessageReceiver, Retired};
pub use voice::{KeySync, Voice, VoiceInput};
