use log::{debug, info};

use super::encoder::decode;
use super::recognizer::MorseRecognizer;
use super::symbol::MorseSymbol;
use crate::audio::{AudioFrameAnalysis, FrameConsumer};
use crate::config::MAX_MESSAGE;

/// Receives every decoded message.
pub trait MessageHandler {
    fn on_message(&mut self, message: &str);
}

impl<F: FnMut(&str)> MessageHandler for F {
    fn on_message(&mut self, message: &str) {
        self(message)
    }
}

/// Decodes the symbol stream of a `MorseRecognizer` into text.
///
/// Symbols are collected until an end of transmission, then the whole
/// message is decoded at once and handed to the handler.
pub struct MorseInterpreter {
    recognizer: MorseRecognizer,
    symbols: Vec<MorseSymbol>,
    last_message: Option<String>,
    handler: Option<Box<dyn MessageHandler + Send>>,
    interpreting: bool,
    messages: u64,
}

impl MorseInterpreter {
    pub fn new(recognizer: MorseRecognizer) -> Self {
        Self {
            recognizer,
            symbols: Vec::with_capacity(MAX_MESSAGE),
            last_message: None,
            handler: None,
            interpreting: false,
            messages: 0,
        }
    }

    /// Start decoding; also starts the recognizer.
    pub fn start_interpreting<H: MessageHandler + Send + 'static>(&mut self, handler: H) {
        self.handler = Some(Box::new(handler));
        self.interpreting = true;
        self.recognizer.start_analysing();
        info!("Morse interpreter started");
    }

    /// Stop decoding; also stops the recognizer.
    pub fn stop_interpreting(&mut self) {
        self.interpreting = false;
        self.handler = None;
        self.recognizer.stop_analysing();
        info!("Morse interpreter stopped after {} messages", self.messages);
    }

    pub fn is_interpreting(&self) -> bool {
        self.interpreting
    }

    /// Most recently decoded message.
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn messages(&self) -> u64 {
        self.messages
    }

    pub fn recognizer(&self) -> &MorseRecognizer {
        &self.recognizer
    }

    /// Feed one frame. Returns the message it completed, if any.
    pub fn process_frame(&mut self, frame: &AudioFrameAnalysis) -> Option<&str> {
        if self.recognizer.process_frame(frame) != Some(MorseSymbol::EndOfTransmission) {
            return None;
        }

        self.symbols.clear();
        self.symbols.extend(self.recognizer.pull());
        if !self.interpreting {
            return None;
        }

        let message = decode(&self.symbols);
        debug!("Decoded message '{}' from {} symbols", message, self.symbols.len());
        self.messages += 1;
        if let Some(handler) = self.handler.as_mut() {
            handler.on_message(&message);
        }
        self.last_message = Some(message);
        self.last_message.as_deref()
    }
}

impl FrameConsumer for MorseInterpreter {
    fn consume_frames(&mut self, frames: &[AudioFrameAnalysis]) {
        if !self.interpreting {
            return;
        }
        for frame in frames {
            self.process_frame(frame);
        }
    }

    fn is_analysing(&self) -> bool {
        self.interpreting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{BufferSource, FrequencyExtractor, Pipeline};
    use crate::config::{AnalysisConfig, MorseConfig};
    use crate::morse::encoder::encode;
    use crate::morse::timeline::{Timeline, ToneSpec};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::{Arc, Mutex};

    const SAMPLE_RATE: u32 = 12_800;
    const DOT_MS: u32 = 90;

    fn analysis() -> AnalysisConfig {
        AnalysisConfig {
            sample_rate: SAMPLE_RATE,
            ..AnalysisConfig::morse()
        }
    }

    fn interpreter() -> MorseInterpreter {
        let recognizer = MorseRecognizer::new(MorseConfig::new(2000, DOT_MS), &analysis()).unwrap();
        MorseInterpreter::new(recognizer)
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) + Send + 'static) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        (messages, move |message: &str| sink.lock().unwrap().push(message.to_string()))
    }

    // Frames keyed by `text`, with small frequency wobble and a missed
    // frame in the middle of every dash
    fn keyed_frames(text: &str, trailing_units: usize) -> Vec<AudioFrameAnalysis> {
        let mut timeline = Timeline::from_symbols(&encode(text));
        timeline.push(false, trailing_units);

        let wobble = [2000u16, 2030, 1980, 2010, 1970];
        let mut frames = Vec::new();
        let mut run = 0;
        for (i, on) in timeline.frames(9).enumerate() {
            run = if on { run + 1 } else { 0 };
            let frame = if on && run != 13 {
                AudioFrameAnalysis::new(&[wobble[i % wobble.len()]])
            } else {
                AudioFrameAnalysis::SILENT
            };
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_round_trip_with_jitter() {
        let text = "THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG 0123456789";
        let mut interpreter = interpreter();
        let (messages, handler) = recorder();
        interpreter.start_interpreting(handler);

        interpreter.consume_frames(&keyed_frames(text, 4));
        assert_eq!(*messages.lock().unwrap(), vec![text]);
        assert_eq!(interpreter.last_message(), Some(text));
    }

    #[test]
    fn test_round_trip_with_random_dropouts() {
        let text = "THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG 0123456789";
        let mut timeline = Timeline::from_symbols(&encode(text));
        timeline.push(false, 4);

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            // One missed frame per element, anywhere after its first frame
            let mut frames = Vec::new();
            for segment in timeline.segments() {
                let len = segment.units * 9;
                let missed = if segment.on { rng.random_range(1..len) } else { len };
                for i in 0..len {
                    frames.push(if segment.on && i != missed {
                        AudioFrameAnalysis::new(&[2000])
                    } else {
                        AudioFrameAnalysis::SILENT
                    });
                }
            }

            let mut interpreter = interpreter();
            let (messages, handler) = recorder();
            interpreter.start_interpreting(handler);
            interpreter.consume_frames(&frames);
            assert_eq!(*messages.lock().unwrap(), vec![text], "seed {}", seed);
        }
    }

    #[test]
    fn test_consecutive_messages() {
        let mut interpreter = interpreter();
        let (messages, handler) = recorder();
        interpreter.start_interpreting(handler);

        // The end-of-transmission gap of the first message runs straight into the second
        interpreter.consume_frames(&keyed_frames("SOS", 0));
        interpreter.consume_frames(&keyed_frames("HI", 4));
        assert_eq!(*messages.lock().unwrap(), vec!["SOS", "HI"]);
        assert_eq!(interpreter.messages(), 2);
    }

    #[test]
    fn test_resumes_after_dropout() {
        let mut interpreter = interpreter();
        let (messages, handler) = recorder();
        interpreter.start_interpreting(handler);

        // Signal lost mid-message for long enough to force a terminator
        let mut frames = Vec::new();
        for _ in 0..9 {
            frames.push(AudioFrameAnalysis::new(&[2000]));
        }
        frames.extend(std::iter::repeat(AudioFrameAnalysis::SILENT).take(11 * 9));
        frames.extend(keyed_frames("OK", 4));
        interpreter.consume_frames(&frames);

        assert_eq!(*messages.lock().unwrap(), vec!["E", "OK"]);
    }

    #[test]
    fn test_stopped_interpreter_ignores_frames() {
        let mut interpreter = interpreter();
        interpreter.consume_frames(&keyed_frames("E", 4));
        assert_eq!(interpreter.last_message(), None);
        assert!(!interpreter.recognizer().is_analysing());

        let (messages, handler) = recorder();
        interpreter.start_interpreting(handler);
        interpreter.stop_interpreting();
        interpreter.consume_frames(&keyed_frames("E", 4));
        assert!(messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_decodes_rendered_audio() {
        let text = "CQ 73";
        let spec = ToneSpec {
            frequency: 2000.0,
            sample_rate: SAMPLE_RATE,
            dot_duration_ms: DOT_MS,
            amplitude: 8000,
        };
        let mut timeline = Timeline::from_symbols(&encode(text));
        timeline.push(false, 4);
        let samples = timeline.render(&spec);

        let source = BufferSource::new(samples, SAMPLE_RATE, 300);
        let extractor = FrequencyExtractor::new(analysis()).unwrap();
        let mut interpreter = interpreter();
        let (messages, handler) = recorder();
        interpreter.start_interpreting(handler);

        let mut pipeline = Pipeline::new(source, extractor, interpreter);
        pipeline.run();

        assert_eq!(*messages.lock().unwrap(), vec![text]);
        assert_eq!(pipeline.consumer().last_message(), Some(text));
        assert_eq!(pipeline.extractor().dropped_frames(), 0);
    }
}
