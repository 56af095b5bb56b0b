//! Streaming recognition of trained sounds and Morse code from raw PCM.
//!
//! Audio flows through a [`audio::FrequencyExtractor`], which reduces each
//! frame to its dominant frequencies, into either a
//! [`recognition::SoundRecognizer`] or a [`morse::MorseInterpreter`].
//! [`audio::Pipeline`] wires the stages together for pull-based sources.

pub mod audio;
pub mod config;
pub mod error;
pub mod handoff;
pub mod morse;
pub mod recognition;

pub use config::{AnalysisConfig, MorseConfig};
pub use error::{ConfigError, PacketError};
