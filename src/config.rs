use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Default microphone sample rate, roughly 1 MHz / 91 µs.
pub const MIC_SAMPLE_RATE: u32 = 11_000;

/// Frame length used for sound signature recognition.
pub const AUDIO_SAMPLES_NUMBER: usize = 512;

/// Frame length used for Morse decoding; shorter frames give finer timing.
pub const MORSE_AUDIO_SAMPLES_NUMBER: usize = 128;

/// Upper bound on a Morse time unit, in frames.
pub const MAX_TIME_UNIT: usize = 500;

/// Upper bound on buffered Morse output symbols.
pub const MAX_MESSAGE: usize = 500;

/// Parameters for the spectral front end.
///
/// Defaults are the values the emoji signatures were trained with; the
/// thresholds are expressed in units of the normalised magnitude spectrum
/// (`|X[k]| * 2 / N` over DC-corrected sample values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sample_rate: u32,
    pub audio_samples_number: usize,
    pub divisor: i32,

    // Peak outlier test: magnitude > mean + std_mult_threshold * stddev
    pub std_mult_threshold: f32,
    // Silence: mean below mean_threshold or stddev below std_threshold
    pub std_threshold: f32,
    pub mean_threshold: f32,

    pub min_frequency: u32,
    pub max_frequency: u32,
    pub suppression_bins: usize,

    pub max_pending_frames: usize,
    pub hann_window: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: MIC_SAMPLE_RATE,
            audio_samples_number: AUDIO_SAMPLES_NUMBER,
            divisor: 1,
            std_mult_threshold: 3.0,
            std_threshold: 2.0,
            mean_threshold: 0.0,
            min_frequency: 1400,
            max_frequency: 4500,
            suppression_bins: 2,
            max_pending_frames: 100,
            hann_window: true,
        }
    }
}

impl AnalysisConfig {
    /// Front end tuned for emoji signatures.
    pub fn emoji() -> Self {
        Self::default()
    }

    /// Front end tuned for Morse: short frames over a wider band.
    pub fn morse() -> Self {
        Self {
            audio_samples_number: MORSE_AUDIO_SAMPLES_NUMBER,
            min_frequency: 500,
            max_frequency: 5000,
            suppression_bins: 1,
            ..Self::default()
        }
    }

    /// Width of one FFT bin in Hz.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.audio_samples_number as f32
    }

    /// Frames produced per second of audio.
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.audio_samples_number as f32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if self.audio_samples_number < 4 || !self.audio_samples_number.is_power_of_two() {
            return Err(ConfigError::InvalidFrameSize(self.audio_samples_number));
        }
        if self.divisor == 0 {
            return Err(ConfigError::InvalidDivisor);
        }
        if self.min_frequency >= self.max_frequency || self.max_frequency > self.sample_rate / 2 {
            return Err(ConfigError::InvalidBand {
                min: self.min_frequency,
                max: self.max_frequency,
            });
        }
        if self.max_pending_frames == 0 {
            return Err(ConfigError::InvalidPendingCapacity);
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Parameters for the Morse timing decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorseConfig {
    pub listening_frequency: u32,
    pub dot_duration_ms: u32,
    pub detection_threshold: u32,
    pub true_rate_threshold: f32,
    // Subtracted from the listening frequency to compensate speaker distortion
    pub frequency_bias: u32,
}

impl Default for MorseConfig {
    fn default() -> Self {
        Self {
            listening_frequency: 2000,
            dot_duration_ms: 100,
            detection_threshold: 100,
            true_rate_threshold: 0.8,
            frequency_bias: 50,
        }
    }
}

impl MorseConfig {
    pub fn new(listening_frequency: u32, dot_duration_ms: u32) -> Self {
        Self {
            listening_frequency,
            dot_duration_ms,
            ..Self::default()
        }
    }

    /// Frames per dot for the given front end, rounded to the nearest frame.
    pub fn time_unit(&self, analysis: &AnalysisConfig) -> usize {
        let frames = analysis.sample_rate as f64 * self.dot_duration_ms as f64
            / 1000.0
            / analysis.audio_samples_number as f64;
        (frames + 0.5) as usize
    }

    pub fn validate(&self, analysis: &AnalysisConfig) -> Result<(), ConfigError> {
        let frames = self.time_unit(analysis);
        if frames == 0 || frames > MAX_TIME_UNIT {
            return Err(ConfigError::InvalidTimeUnit {
                frames,
                max: MAX_TIME_UNIT,
            });
        }
        if self.listening_frequency <= self.frequency_bias {
            return Err(ConfigError::InvalidListeningFrequency(self.listening_frequency));
        }
        if !(self.true_rate_threshold > 0.0 && self.true_rate_threshold <= 1.0) {
            return Err(ConfigError::InvalidRateThreshold(self.true_rate_threshold));
        }
        Ok(())
    }

    /// Load from JSON and validate against the front end the decoder will run on.
    pub fn load<P: AsRef<Path>>(path: P, analysis: &AnalysisConfig) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate(analysis)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
