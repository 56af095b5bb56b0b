use log::{debug, info, trace, warn};

use super::symbol::MorseSymbol;
use crate::audio::{AudioFrameAnalysis, HistoryBuffer};
use crate::config::{AnalysisConfig, MorseConfig, MAX_MESSAGE};
use crate::error::ConfigError;

/// Silence, in time units, that separates letters.
const LETTER_GAP_UNITS: std::ops::RangeInclusive<usize> = 2..=4;
/// Silence, in time units, that separates words.
const WORD_GAP_UNITS: std::ops::RangeInclusive<usize> = 5..=8;
/// Silence, in time units, that ends a transmission.
const END_OF_TRANSMISSION_UNITS: usize = 9;
/// Tone longer than this many units is a dash.
const MAX_DOT_UNITS: usize = 2;

/// Turns a stream of analysed frames into Morse symbols.
///
/// Each frame is reduced to "tone present" at the listening frequency and
/// appended to a run buffer of at most two time units. The decoder
/// alternates between waiting for a tone (unsynchronised) and timing one
/// (synchronised): an edge is only accepted once a full time unit of frames
/// agrees with it, so isolated misdetected frames inside a run are absorbed.
/// Whenever the buffer fills without an edge the run counter advances by
/// one unit and the oldest unit is discarded.
///
/// Tolerance is limited by the one-unit gap between elements of a letter.
/// A single missed frame anywhere after the first frame of an element is
/// absorbed. A missed first frame delays the rising edge by one frame, and
/// that delay carries across one-unit gaps, so a second such miss inside the
/// same letter can merge two elements. Spurious tone frames inside a
/// one-unit gap are worse: they can hold off the falling edge until the next
/// element begins. Letter and word gaps reset the timing.
pub struct MorseRecognizer {
    config: MorseConfig,
    time_unit: usize,
    // Listening frequency corrected for speaker distortion
    frequency: u32,
    on_threshold: usize,
    off_threshold: usize,

    buffer: HistoryBuffer<bool>,
    synchronised: bool,
    zeros: usize,
    ones: usize,
    end_emitted: bool,

    output: Vec<MorseSymbol>,
    dropped_symbols: u64,
    analysing: bool,
}

impl MorseRecognizer {
    pub fn new(config: MorseConfig, analysis: &AnalysisConfig) -> Result<Self, ConfigError> {
        analysis.validate()?;
        config.validate(analysis)?;

        let time_unit = config.time_unit(analysis);
        let on_threshold = (time_unit as f32 * config.true_rate_threshold) as usize;
        let off_threshold = time_unit - on_threshold;
        let frequency = config.listening_frequency - config.frequency_bias;

        info!(
            "Morse recognizer listening at {} Hz (biased {} Hz), time unit {} frames",
            config.listening_frequency, frequency, time_unit
        );

        Ok(Self {
            config,
            time_unit,
            frequency,
            on_threshold,
            off_threshold,
            buffer: HistoryBuffer::new(time_unit),
            synchronised: false,
            zeros: 0,
            ones: 0,
            end_emitted: false,
            output: Vec::with_capacity(MAX_MESSAGE),
            dropped_symbols: 0,
            analysing: false,
        })
    }

    pub fn config(&self) -> &MorseConfig {
        &self.config
    }

    /// Frames per dot.
    pub fn time_unit(&self) -> usize {
        self.time_unit
    }

    pub fn is_synchronised(&self) -> bool {
        self.synchronised
    }

    pub fn is_analysing(&self) -> bool {
        self.analysing
    }

    pub fn start_analysing(&mut self) {
        self.analysing = true;
        info!("Morse recognition started");
    }

    /// Stop and discard the run buffer. Symbols already decoded stay available to `pull`.
    pub fn stop_analysing(&mut self) {
        self.analysing = false;
        self.buffer.clear();
        self.synchronised = false;
        self.zeros = 0;
        self.ones = 0;
        self.end_emitted = false;
        info!("Morse recognition stopped");
    }

    /// Whether a frame carries the listening tone.
    pub fn detects_tone(&self, frame: &AudioFrameAnalysis) -> bool {
        let target = self.frequency.min(u16::MAX as u32) as u16;
        let tolerance = self.config.detection_threshold.min(u16::MAX as u32) as u16;
        frame.contains_within(target, tolerance)
    }

    /// Feed one frame. Returns the symbol it completed, if one was emitted.
    /// Frames are ignored while the recognizer is stopped.
    pub fn process_frame(&mut self, frame: &AudioFrameAnalysis) -> Option<MorseSymbol> {
        if !self.analysing {
            return None;
        }
        let tone = self.detects_tone(frame);
        self.push_sample(tone)
    }

    fn push_sample(&mut self, tone: bool) -> Option<MorseSymbol> {
        let unit = self.time_unit;
        // The buffer never exceeds two units here, so no compaction on push
        self.buffer.push(tone);
        trace!("morse frame tone={} len={}", tone, self.buffer.len());

        let len = self.buffer.len();
        if len < unit {
            return None;
        }

        let ones_in_unit = self.buffer.latest(unit).iter().filter(|&&on| on).count();
        let unit_start = self.buffer.get(len - unit).unwrap_or(false);
        // Units spanned by the buffer, to the nearest unit
        let units = (len + unit / 2) / unit;

        if !self.synchronised && ones_in_unit >= self.on_threshold && unit_start {
            self.zeros += units - 1;
            let gap = self.gap_symbol();
            debug!("tone after {} silent units", self.zeros);

            self.buffer.clear();
            self.zeros = 0;
            self.ones = 1;
            self.synchronised = true;
            self.end_emitted = false;
            return gap.and_then(|symbol| self.push_out(symbol));
        }

        if self.synchronised && ones_in_unit < self.off_threshold && !unit_start {
            self.ones += units - 1;
            let symbol = if self.ones > MAX_DOT_UNITS {
                MorseSymbol::Dash
            } else {
                MorseSymbol::Dot
            };
            debug!("silence after {} tone units", self.ones);

            self.buffer.clear();
            self.synchronised = false;
            self.zeros = 1;
            self.ones = 0;
            return self.push_out(symbol);
        }

        let mut emitted = None;
        if len == 2 * unit {
            if !self.synchronised && self.zeros == END_OF_TRANSMISSION_UNITS && !self.end_emitted {
                self.end_emitted = true;
                emitted = self.push_out(MorseSymbol::EndOfTransmission);
            }

            if self.synchronised {
                self.ones += 1;
            } else {
                self.zeros = self.zeros.saturating_add(1);
            }
            self.buffer.compact();
        }
        emitted
    }

    fn gap_symbol(&self) -> Option<MorseSymbol> {
        if LETTER_GAP_UNITS.contains(&self.zeros) {
            Some(MorseSymbol::LetterGap)
        } else if WORD_GAP_UNITS.contains(&self.zeros) {
            Some(MorseSymbol::WordGap)
        } else if self.zeros >= END_OF_TRANSMISSION_UNITS && !self.end_emitted {
            Some(MorseSymbol::EndOfTransmission)
        } else {
            None
        }
    }

    fn push_out(&mut self, symbol: MorseSymbol) -> Option<MorseSymbol> {
        // Gaps mean nothing before the first element of a message
        if self.output.is_empty() && !symbol.is_element() {
            return None;
        }

        if self.output.len() >= MAX_MESSAGE {
            self.dropped_symbols += 1;
            warn!("Morse output full, dropping '{}'", symbol);
            // Keep the terminator so the buffered message still gets delivered
            if symbol != MorseSymbol::EndOfTransmission {
                return None;
            }
            self.output.pop();
        }

        debug!("morse symbol '{}'", symbol);
        self.output.push(symbol);
        Some(symbol)
    }

    /// Drain every symbol decoded since the previous pull.
    pub fn pull(&mut self) -> std::vec::Drain<'_, MorseSymbol> {
        self.output.drain(..)
    }

    pub fn pending_symbols(&self) -> usize {
        self.output.len()
    }

    pub fn dropped_symbols(&self) -> u64 {
        self.dropped_symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morse::encoder::encode;
    use crate::morse::symbol::symbols_to_string;
    use crate::morse::timeline::Timeline;

    // 12.8 kHz with 128-sample frames gives 100 frames per second
    fn analysis() -> AnalysisConfig {
        AnalysisConfig {
            sample_rate: 12_800,
            ..AnalysisConfig::morse()
        }
    }

    fn recognizer() -> MorseRecognizer {
        let mut recognizer = MorseRecognizer::new(MorseConfig::new(2000, 90), &analysis()).unwrap();
        recognizer.start_analysing();
        recognizer
    }

    fn tone() -> AudioFrameAnalysis {
        AudioFrameAnalysis::new(&[2000])
    }

    fn feed_units(recognizer: &mut MorseRecognizer, on: bool, units: usize) {
        let frame = if on { tone() } else { AudioFrameAnalysis::SILENT };
        for _ in 0..units * recognizer.time_unit() {
            recognizer.process_frame(&frame);
        }
    }

    fn decoded(recognizer: &mut MorseRecognizer) -> String {
        let symbols: Vec<MorseSymbol> = recognizer.pull().collect();
        symbols_to_string(&symbols)
    }

    #[test]
    fn test_time_unit_from_frame_rate() {
        assert_eq!(recognizer().time_unit(), 9);
    }

    #[test]
    fn test_tone_detection_is_biased_and_strict() {
        let recognizer = recognizer();
        assert!(recognizer.detects_tone(&AudioFrameAnalysis::new(&[2000])));
        assert!(recognizer.detects_tone(&AudioFrameAnalysis::new(&[3000, 1900])));
        // 1950 - 100 is exactly at the threshold
        assert!(!recognizer.detects_tone(&AudioFrameAnalysis::new(&[1850])));
        assert!(!recognizer.detects_tone(&AudioFrameAnalysis::new(&[2050])));
        assert!(!recognizer.detects_tone(&AudioFrameAnalysis::SILENT));
    }

    #[test]
    fn test_dot_and_dash() {
        let mut recognizer = recognizer();
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 1);
        feed_units(&mut recognizer, true, 3);
        feed_units(&mut recognizer, false, 1);
        assert_eq!(decoded(&mut recognizer), ".-");
    }

    #[test]
    fn test_gap_lengths() {
        let mut recognizer = recognizer();
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 3);
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 7);
        feed_units(&mut recognizer, true, 3);
        feed_units(&mut recognizer, false, 1);
        assert_eq!(decoded(&mut recognizer), ". .;-");
    }

    #[test]
    fn test_short_dash_still_reads_as_dash() {
        let mut recognizer = recognizer();
        // Two frames short of three units
        for _ in 0..25 {
            recognizer.process_frame(&tone());
        }
        feed_units(&mut recognizer, false, 1);
        assert_eq!(decoded(&mut recognizer), "-");
    }

    #[test]
    fn test_isolated_dropouts_are_absorbed() {
        let mut recognizer = recognizer();
        // One missed frame in the middle of a dash
        for i in 0..27 {
            let frame = if i == 13 { AudioFrameAnalysis::SILENT } else { tone() };
            recognizer.process_frame(&frame);
        }
        feed_units(&mut recognizer, false, 1);
        assert_eq!(decoded(&mut recognizer), "-");
    }

    #[test]
    fn test_leading_silence_emits_nothing() {
        let mut recognizer = recognizer();
        feed_units(&mut recognizer, false, 30);
        assert_eq!(recognizer.pending_symbols(), 0);
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 1);
        assert_eq!(decoded(&mut recognizer), ".");
    }

    #[test]
    fn test_long_silence_forces_end_of_transmission_once() {
        let mut recognizer = recognizer();
        feed_units(&mut recognizer, true, 1);

        let mut emitted = Vec::new();
        for _ in 0..40 * recognizer.time_unit() {
            if let Some(symbol) = recognizer.process_frame(&AudioFrameAnalysis::SILENT) {
                emitted.push(symbol);
            }
        }
        assert_eq!(emitted, vec![MorseSymbol::Dot, MorseSymbol::EndOfTransmission]);
        assert_eq!(decoded(&mut recognizer), ".#");
    }

    #[test]
    fn test_end_of_transmission_at_eleven_units() {
        let mut recognizer = recognizer();
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 10);
        assert_eq!(recognizer.pending_symbols(), 1);
        feed_units(&mut recognizer, false, 1);
        assert_eq!(decoded(&mut recognizer), ".#");
    }

    #[test]
    fn test_decoding_resumes_after_forced_end() {
        let mut recognizer = recognizer();
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 12);
        assert_eq!(decoded(&mut recognizer), ".#");

        // Rising edge after the forced terminator must not repeat it
        feed_units(&mut recognizer, true, 3);
        feed_units(&mut recognizer, false, 1);
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 3);
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 1);
        assert_eq!(decoded(&mut recognizer), "-. .");
    }

    #[test]
    fn test_timeline_round_trip() {
        let mut recognizer = recognizer();
        let symbols = encode("SOS 73");
        let timeline = Timeline::from_symbols(&symbols);
        for on in timeline.frames(recognizer.time_unit()) {
            let frame = if on { tone() } else { AudioFrameAnalysis::SILENT };
            recognizer.process_frame(&frame);
        }
        feed_units(&mut recognizer, false, 2);
        assert_eq!(decoded(&mut recognizer), symbols_to_string(&symbols));
    }

    #[test]
    fn test_stop_discards_run() {
        let mut recognizer = recognizer();
        feed_units(&mut recognizer, true, 2);
        recognizer.stop_analysing();
        assert!(!recognizer.is_synchronised());
        recognizer.start_analysing();
        feed_units(&mut recognizer, false, 2);
        assert_eq!(recognizer.pending_symbols(), 0);
    }

    #[test]
    fn test_stopped_recognizer_ignores_frames() {
        let mut recognizer = MorseRecognizer::new(MorseConfig::new(2000, 90), &analysis()).unwrap();
        assert!(!recognizer.is_analysing());
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 1);
        feed_units(&mut recognizer, true, 3);
        feed_units(&mut recognizer, false, 1);
        assert_eq!(recognizer.pending_symbols(), 0);
        assert!(!recognizer.is_synchronised());

        recognizer.start_analysing();
        feed_units(&mut recognizer, true, 1);
        feed_units(&mut recognizer, false, 1);
        recognizer.stop_analysing();
        feed_units(&mut recognizer, true, 3);
        feed_units(&mut recognizer, false, 12);
        assert_eq!(decoded(&mut recognizer), ".");
    }

    #[test]
    fn test_output_is_bounded() {
        let mut recognizer = recognizer();
        for _ in 0..MAX_MESSAGE + 10 {
            feed_units(&mut recognizer, true, 1);
            feed_units(&mut recognizer, false, 1);
        }
        assert_eq!(recognizer.pending_symbols(), MAX_MESSAGE);
        assert_eq!(recognizer.dropped_symbols(), 10);

        feed_units(&mut recognizer, false, 12);
        let symbols: Vec<MorseSymbol> = recognizer.pull().collect();
        assert_eq!(symbols.len(), MAX_MESSAGE);
        assert_eq!(symbols.last(), Some(&MorseSymbol::EndOfTransmission));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = MorseRecognizer::new(MorseConfig::new(40, 90), &analysis());
        assert!(matches!(result, Err(ConfigError::InvalidListeningFrequency(40))));
    }
}
