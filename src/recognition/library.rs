use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::sound::{Sound, SoundSample, SoundSequence, MAX_SAMPLE_LEN};
use crate::error::ConfigError;

/// Training data for one sequence: alternative frequency templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSpec {
    pub threshold: u32,
    pub deviation: u8,
    pub samples: Vec<Vec<u16>>,
}

/// Training data for one named sound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundSpec {
    pub name: String,
    pub max_deviation: u8,
    #[serde(default = "default_consider_all")]
    pub consider_all_frequencies: bool,
    pub sequences: Vec<SequenceSpec>,
}

fn default_consider_all() -> bool {
    true
}

/// A set of trained sound signatures, in recognition priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundLibrary {
    pub sounds: Vec<SoundSpec>,
}

impl SoundSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sequences.is_empty() {
            return Err(ConfigError::EmptySound(self.name.clone()));
        }
        for (index, sequence) in self.sequences.iter().enumerate() {
            if sequence.samples.is_empty() {
                return Err(ConfigError::EmptySequence {
                    sound: self.name.clone(),
                    sequence: index,
                });
            }
            for sample in &sequence.samples {
                if sample.is_empty() || sample.len() > MAX_SAMPLE_LEN {
                    return Err(ConfigError::InvalidSampleLength {
                        sound: self.name.clone(),
                        length: sample.len(),
                        max: MAX_SAMPLE_LEN,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Sound, ConfigError> {
        self.validate()?;
        let sequences = self
            .sequences
            .iter()
            .map(|sequence| {
                let samples = sequence
                    .samples
                    .iter()
                    .map(|frequencies| SoundSample::new(frequencies.clone()))
                    .collect();
                SoundSequence::new(samples, sequence.threshold, sequence.deviation)
            })
            .collect();
        Ok(Sound::new(sequences, self.max_deviation, self.consider_all_frequencies))
    }
}

impl SoundLibrary {
    /// The built-in emoji signatures.
    pub fn emoji() -> Self {
        Self {
            sounds: vec![happy()],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sounds.iter().try_for_each(SoundSpec::validate)
    }

    /// Build every sound, keeping library order.
    pub fn build(&self) -> Result<Vec<(String, Sound)>, ConfigError> {
        self.sounds
            .iter()
            .map(|spec| Ok((spec.name.clone(), spec.build()?)))
            .collect()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(&path)?;
        let library: Self = serde_json::from_str(&json)?;
        library.validate()?;
        info!(
            "Loaded {} sound signatures from {}",
            library.sounds.len(),
            path.as_ref().display()
        );
        Ok(library)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

// Rising chirp followed by a falling tail, trained on the 512-sample front end
const HAPPY_RISE: [&[u16]; 3] = [
    &[3024, 3024, 3276, 3276, 3255],
    &[3024, 3024, 3717, 3276, 3276, 3255],
    &[2751, 3003, 3276, 3276, 3276],
];

const HAPPY_FALL: [&[u16]; 4] = [
    &[3423, 3276, 3276, 3024, 3024, 3024],
    &[3423, 3276, 3276, 3255, 3024, 3024],
    &[3423, 3276, 3276, 3024, 3024, 2961],
    &[3276, 3234, 3234, 3276, 3003, 3003],
];

const HAPPY_THRESHOLD: u32 = 50 * 100;

fn happy() -> SoundSpec {
    let sequence = |samples: &[&[u16]]| SequenceSpec {
        threshold: HAPPY_THRESHOLD,
        deviation: 1,
        samples: samples.iter().map(|s| s.to_vec()).collect(),
    };

    SoundSpec {
        name: "happy".to_string(),
        max_deviation: 3,
        consider_all_frequencies: true,
        sequences: vec![sequence(&HAPPY_RISE), sequence(&HAPPY_FALL)],
    }
}
