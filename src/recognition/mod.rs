pub mod library;
pub mod recognizer;
pub mod sound;

pub use library::{SequenceSpec, SoundLibrary, SoundSpec};
pub use recognizer::{MatchHandler, SoundRecognizer};
pub use sound::{MissCount, Sound, SoundSample, SoundSequence, FREQUENCY_SLACK_HZ, MAX_SAMPLE_LEN};
