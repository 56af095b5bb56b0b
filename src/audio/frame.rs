use serde::{Deserialize, Serialize};

use crate::error::PacketError;

/// Maximum number of dominant frequencies reported per frame.
pub const MAX_PEAKS: usize = 3;

/// Packed transport record: `count: u8` followed by `MAX_PEAKS` little-endian `u16`.
///
/// Per-record layout (7 bytes total):
/// - count: u8 (number of valid peaks, 0-3)
/// - peaks: 3x u16 LE (unused slots are zero)
pub const FRAME_RECORD_SIZE: usize = 1 + 2 * MAX_PEAKS;

/// Dominant frequencies of one analysis frame, most likely first.
///
/// A frame with no peaks is a silent frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFrameAnalysis {
    count: u8,
    peaks: [u16; MAX_PEAKS],
}

impl AudioFrameAnalysis {
    pub const SILENT: Self = Self {
        count: 0,
        peaks: [0; MAX_PEAKS],
    };

    /// Build a frame from up to `MAX_PEAKS` frequencies; extra entries are ignored.
    pub fn new(frequencies: &[u16]) -> Self {
        let mut frame = Self::SILENT;
        for &frequency in frequencies.iter().take(MAX_PEAKS) {
            frame.push(frequency);
        }
        frame
    }

    /// Append a peak. Returns false when the frame is already full.
    pub fn push(&mut self, frequency: u16) -> bool {
        if self.count as usize >= MAX_PEAKS {
            return false;
        }
        self.peaks[self.count as usize] = frequency;
        self.count += 1;
        true
    }

    pub fn frequencies(&self) -> &[u16] {
        &self.peaks[..self.count as usize]
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Most likely frequency of the frame.
    pub fn dominant(&self) -> Option<u16> {
        self.frequencies().first().copied()
    }

    /// Absolute distance from `frequency` to the nearest reported peak.
    pub fn closest_distance(&self, frequency: u16) -> Option<u16> {
        self.frequencies()
            .iter()
            .map(|&peak| peak.abs_diff(frequency))
            .min()
    }

    /// Whether any peak lies strictly closer than `tolerance` Hz to `frequency`.
    pub fn contains_within(&self, frequency: u16, tolerance: u16) -> bool {
        self.frequencies()
            .iter()
            .any(|&peak| peak.abs_diff(frequency) < tolerance)
    }

    pub fn to_bytes(&self) -> [u8; FRAME_RECORD_SIZE] {
        let mut bytes = [0u8; FRAME_RECORD_SIZE];
        bytes[0] = self.count;
        for (i, peak) in self.peaks.iter().enumerate() {
            bytes[1 + 2 * i..3 + 2 * i].copy_from_slice(&peak.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8; FRAME_RECORD_SIZE]) -> Result<Self, PacketError> {
        let count = bytes[0];
        if count as usize > MAX_PEAKS {
            return Err(PacketError::TooManyPeaks(count));
        }
        let mut peaks = [0u16; MAX_PEAKS];
        for (i, peak) in peaks.iter_mut().enumerate() {
            *peak = u16::from_le_bytes([bytes[1 + 2 * i], bytes[2 + 2 * i]]);
        }
        Ok(Self { count, peaks })
    }
}

/// Append the packed records for `frames` to `out`.
pub fn encode_frames(frames: &[AudioFrameAnalysis], out: &mut Vec<u8>) {
    out.reserve(frames.len() * FRAME_RECORD_SIZE);
    for frame in frames {
        out.extend_from_slice(&frame.to_bytes());
    }
}

/// Decode a packet of zero or more records.
pub fn decode_frames(packet: &[u8]) -> Result<Vec<AudioFrameAnalysis>, PacketError> {
    if packet.len() % FRAME_RECORD_SIZE != 0 {
        return Err(PacketError::TruncatedRecord {
            len: packet.len(),
            record: FRAME_RECORD_SIZE,
        });
    }

    packet
        .chunks_exact(FRAME_RECORD_SIZE)
        .map(|chunk| {
            let mut record = [0u8; FRAME_RECORD_SIZE];
            record.copy_from_slice(chunk);
            AudioFrameAnalysis::from_bytes(&record)
        })
        .collect()
}
