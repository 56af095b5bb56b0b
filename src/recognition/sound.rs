use log::trace;

use crate::audio::{AudioFrameAnalysis, HistoryBuffer};

/// Maximum number of data points in one sample template.
pub const MAX_SAMPLE_LEN: usize = 16;

/// Frequency drift forgiven before a deviation is squared, in Hz.
pub const FREQUENCY_SLACK_HZ: u16 = 100;

/// Outcome of matching one sequence at one frame: the number of misses
/// accumulated along the chain of sequences, or `None` when it did not match.
pub type MissCount = Option<u8>;

/// One acceptable rendering of a sub-gesture.
///
/// A frequency of 0 means "don't care" and skips the comparison at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundSample {
    frequencies: Vec<u16>,
}

impl SoundSample {
    pub fn new(frequencies: Vec<u16>) -> Self {
        Self { frequencies }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn frequencies(&self) -> &[u16] {
        &self.frequencies
    }
}

/// A sub-gesture: interchangeable samples plus their tolerance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundSequence {
    samples: Vec<SoundSample>,
    // Squared-distance threshold per data point
    threshold: u32,
    // Data points that may exceed the threshold and still match
    deviation: u8,
}

impl SoundSequence {
    pub fn new(samples: Vec<SoundSample>, threshold: u32, deviation: u8) -> Self {
        Self {
            samples,
            threshold,
            deviation,
        }
    }

    pub fn samples(&self) -> &[SoundSample] {
        &self.samples
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn deviation(&self) -> u8 {
        self.deviation
    }

    pub fn longest_sample(&self) -> usize {
        self.samples.iter().map(SoundSample::len).max().unwrap_or(0)
    }
}

/// A trained sound: an ordered chain of sequences matched against recent frames.
///
/// Matching is incremental. For every frame, each sequence records in its
/// history the fewest misses with which it matched the tail of the frame
/// window. Sequence `k > 0` can only match if sequence `k - 1` matched right
/// before the sample window of sequence `k` starts, so the chain enforces the
/// order of the sub-gestures (e.g. attack before sustain). The value stored
/// for the last sequence is the total for the whole chain.
#[derive(Debug, Clone)]
pub struct Sound {
    sequences: Vec<SoundSequence>,
    max_deviation: u8,
    consider_all_frequencies: bool,

    history: Vec<HistoryBuffer<MissCount>>,
    row: Vec<MissCount>,
}

impl Sound {
    /// Callers must pass at least one sequence, each with at least one non-empty sample.
    pub fn new(sequences: Vec<SoundSequence>, max_deviation: u8, consider_all_frequencies: bool) -> Self {
        // The chain looks back one frame past the longest sample
        let window = sequences
            .iter()
            .map(SoundSequence::longest_sample)
            .max()
            .unwrap_or(1)
            + 1;

        let history = (0..sequences.len()).map(|_| HistoryBuffer::new(window)).collect();
        let row = vec![None; sequences.len()];

        Self {
            sequences,
            max_deviation,
            consider_all_frequencies,
            history,
            row,
        }
    }

    pub fn sequences(&self) -> &[SoundSequence] {
        &self.sequences
    }

    pub fn max_deviation(&self) -> u8 {
        self.max_deviation
    }

    /// Frames of match history retained per sequence.
    pub fn history_window(&self) -> usize {
        self.history.first().map_or(0, HistoryBuffer::window)
    }

    /// Record the match state of every sequence for the newest frame in `frames`.
    pub fn update(&mut self, frames: &[AudioFrameAnalysis]) {
        for seq_id in 0..self.sequences.len() {
            self.row[seq_id] = self.match_sequence(seq_id, frames);
        }
        for (history, &value) in self.history.iter_mut().zip(&self.row) {
            history.push(value);
        }
        trace!("sound history row {:?}", self.row);
    }

    /// Whether the full chain matched at the newest frame.
    ///
    /// A match clears the history so the same gesture is not reported twice.
    pub fn matched(&mut self) -> bool {
        let Some(last) = self.sequences.len().checked_sub(1) else {
            return false;
        };
        match self.deviation(1, last) {
            Some(misses) if misses <= self.max_deviation => {
                self.reset_history();
                true
            }
            _ => false,
        }
    }

    pub fn reset_history(&mut self) {
        for history in &mut self.history {
            history.clear();
        }
    }

    /// Chain misses recorded for `seq_id`, `frames_ago` frames back
    /// (`1` is the newest recorded frame).
    fn deviation(&self, frames_ago: usize, seq_id: usize) -> MissCount {
        self.history[seq_id].ago(frames_ago).flatten()
    }

    fn match_sequence(&self, seq_id: usize, frames: &[AudioFrameAnalysis]) -> MissCount {
        let sequence = &self.sequences[seq_id];
        let mut best: MissCount = None;

        for sample in &sequence.samples {
            let len = sample.len();
            if len == 0 || frames.len() < len {
                continue;
            }

            // Sequence 0 anchors the chain; later ones continue from the
            // previous sequence, ending exactly before this window or one frame earlier
            let base = if seq_id == 0 {
                0
            } else {
                let adjacent = self.deviation(len, seq_id - 1);
                let earlier = self.deviation(len + 1, seq_id - 1);
                match (adjacent, earlier) {
                    (Some(a), Some(b)) => a.min(b),
                    (Some(a), None) | (None, Some(a)) => a,
                    (None, None) => continue,
                }
            };

            if base > self.max_deviation || best.is_some_and(|b| base >= b) {
                continue;
            }

            let window = &frames[frames.len() - len..];
            if let Some(misses) = self.match_sample(sequence, sample, window, base) {
                if best.map_or(true, |b| misses < b) {
                    best = Some(misses);
                }
            }
        }

        best
    }

    fn match_sample(
        &self,
        sequence: &SoundSequence,
        sample: &SoundSample,
        window: &[AudioFrameAnalysis],
        base: u8,
    ) -> MissCount {
        let threshold = sequence.threshold as u64;
        let mut misses = base as u32;
        let mut excusable = sequence.deviation;
        let mut total: u64 = 0;

        for (&expected, frame) in sample.frequencies.iter().zip(window) {
            if expected == 0 {
                continue;
            }
            if frame.is_empty() {
                misses += 1;
                continue;
            }

            let distance = if self.consider_all_frequencies {
                frame.closest_distance(expected)
            } else {
                frame.dominant().map(|f| f.abs_diff(expected))
            }
            .unwrap_or(u16::MAX);

            let drift = distance.saturating_sub(FREQUENCY_SLACK_HZ) as u64;
            let squared = drift * drift;

            if squared > threshold && excusable > 0 {
                excusable -= 1;
                misses += 1;
                continue;
            }
            total += squared;
        }

        if total > sample.len() as u64 * threshold || misses > self.max_deviation as u32 {
            return None;
        }
        Some(misses as u8)
    }
}
