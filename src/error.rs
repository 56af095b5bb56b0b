use thiserror::Error;

/// Setup-time configuration failures.
///
/// These are only ever returned while building extractors, recognizers or
/// signature libraries. Once a component exists, processing frames cannot fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    InvalidSampleRate,

    #[error("frame size must be a positive power of two, got {0}")]
    InvalidFrameSize(usize),

    #[error("divisor must be non-zero")]
    InvalidDivisor,

    #[error("recognition band {min}..{max} Hz is empty or above Nyquist")]
    InvalidBand { min: u32, max: u32 },

    #[error("pending frame capacity must be non-zero")]
    InvalidPendingCapacity,

    #[error("time unit of {frames} frames is outside 1..={max}")]
    InvalidTimeUnit { frames: usize, max: usize },

    #[error("listening frequency {0} Hz is too low for the configured bias")]
    InvalidListeningFrequency(u32),

    #[error("true-rate threshold {0} must lie in (0, 1]")]
    InvalidRateThreshold(f32),

    #[error("sound '{0}' has no sequences")]
    EmptySound(String),

    #[error("sound '{sound}' sequence {sequence} has no samples")]
    EmptySequence { sound: String, sequence: usize },

    #[error("sound '{sound}' has a sample of length {length}, expected 1..={max}")]
    InvalidSampleLength {
        sound: String,
        length: usize,
        max: usize,
    },
}

/// Failures decoding packed frame records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("packet of {len} bytes is not a multiple of the {record}-byte record size")]
    TruncatedRecord { len: usize, record: usize },

    #[error("record declares {0} peaks, at most 3 are allowed")]
    TooManyPeaks(u8),
}
