use log::{debug, info};

use super::sound::Sound;
use crate::audio::{AudioFrameAnalysis, FrameConsumer, HistoryBuffer};

/// Receives the name of every recognized sound.
///
/// Called synchronously on the audio path, so implementations must return
/// quickly and must not block.
pub trait MatchHandler {
    fn on_match(&mut self, name: &str);
}

impl<F: FnMut(&str)> MatchHandler for F {
    fn on_match(&mut self, name: &str) {
        self(name)
    }
}

/// Registry of named sounds evaluated against every incoming frame.
///
/// Sounds are checked in registration order and the first one that matches
/// wins the frame; the rest are not evaluated until the next frame.
pub struct SoundRecognizer {
    sounds: Vec<(String, Sound)>,
    frames: HistoryBuffer<AudioFrameAnalysis>,
    handler: Option<Box<dyn MatchHandler + Send>>,
    analysing: bool,
    matches: u64,
}

impl SoundRecognizer {
    pub fn new(sounds: Vec<(String, Sound)>) -> Self {
        let window = sounds
            .iter()
            .map(|(_, sound)| sound.history_window())
            .max()
            .unwrap_or(1);

        info!(
            "Sound recognizer ready with {} sounds, frame window {}",
            sounds.len(),
            window
        );

        Self {
            sounds,
            frames: HistoryBuffer::new(window),
            handler: None,
            analysing: false,
            matches: 0,
        }
    }

    /// Arm the recognizer; `handler` receives each matched sound name.
    pub fn start_analysing<H: MatchHandler + Send + 'static>(&mut self, handler: H) {
        self.handler = Some(Box::new(handler));
        self.analysing = true;
        info!("Sound recognition started");
    }

    /// Disarm, dropping the frame window and every sound's match history.
    pub fn stop_analysing(&mut self) {
        self.analysing = false;
        self.handler = None;
        self.frames.clear();
        for (_, sound) in &mut self.sounds {
            sound.reset_history();
        }
        info!("Sound recognition stopped after {} matches", self.matches);
    }

    /// Feed one frame. Returns the name of the sound it completed, if any.
    ///
    /// The handler is only notified while analysing; this method works
    /// regardless so that recorded frames can be replayed directly.
    pub fn process_frame(&mut self, frame: AudioFrameAnalysis) -> Option<&str> {
        self.frames.push(frame);
        let window = self.frames.as_slice();

        let mut matched = None;
        for (index, (name, sound)) in self.sounds.iter_mut().enumerate() {
            sound.update(window);
            if sound.matched() {
                debug!("Matched sound '{}'", name);
                matched = Some(index);
                break;
            }
        }

        let index = matched?;
        self.matches += 1;
        let name = self.sounds[index].0.as_str();
        if self.analysing {
            if let Some(handler) = self.handler.as_mut() {
                handler.on_match(name);
            }
        }
        Some(name)
    }

    pub fn sound_names(&self) -> impl Iterator<Item = &str> {
        self.sounds.iter().map(|(name, _)| name.as_str())
    }

    pub fn sound(&self, name: &str) -> Option<&Sound> {
        self.sounds.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn matches(&self) -> u64 {
        self.matches
    }
}

impl FrameConsumer for SoundRecognizer {
    fn consume_frames(&mut self, frames: &[AudioFrameAnalysis]) {
        if !self.analysing {
            return;
        }
        for &frame in frames {
            self.process_frame(frame);
        }
    }

    fn is_analysing(&self) -> bool {
        self.analysing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::sound::{SoundSample, SoundSequence};
    use std::sync::{Arc, Mutex};

    fn chirp(name_freq: u16) -> Sound {
        Sound::new(
            vec![
                SoundSequence::new(vec![SoundSample::new(vec![name_freq, name_freq])], 50 * 50, 0),
                SoundSequence::new(vec![SoundSample::new(vec![3000, 3000])], 50 * 50, 0),
            ],
            0,
            true,
        )
    }

    fn frames(freqs: &[u16]) -> Vec<AudioFrameAnalysis> {
        freqs
            .iter()
            .map(|&f| {
                if f == 0 {
                    AudioFrameAnalysis::SILENT
                } else {
                    AudioFrameAnalysis::new(&[f])
                }
            })
            .collect()
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) + Send + 'static) {
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = names.clone();
        (names, move |name: &str| sink.lock().unwrap().push(name.to_string()))
    }

    #[test]
    fn test_callback_receives_matched_name() {
        let mut recognizer = SoundRecognizer::new(vec![
            ("low".to_string(), chirp(2000)),
            ("high".to_string(), chirp(4000)),
        ]);
        let (names, handler) = recorder();
        recognizer.start_analysing(handler);
        assert!(recognizer.is_analysing());

        recognizer.consume_frames(&frames(&[4000, 4000, 3000, 3000, 0, 2000, 2000, 3000, 3000]));
        assert_eq!(*names.lock().unwrap(), vec!["high", "low"]);
        assert_eq!(recognizer.matches(), 2);
    }

    #[test]
    fn test_first_registered_sound_wins_the_frame() {
        // Both sounds complete on the same frame
        let mut recognizer = SoundRecognizer::new(vec![
            ("first".to_string(), chirp(4000)),
            ("second".to_string(), chirp(4000)),
        ]);
        let (names, handler) = recorder();
        recognizer.start_analysing(handler);

        recognizer.consume_frames(&frames(&[4000, 4000, 3000, 3000]));
        assert_eq!(*names.lock().unwrap(), vec!["first"]);
    }

    #[test]
    fn test_frames_ignored_while_stopped() {
        let mut recognizer = SoundRecognizer::new(vec![("high".to_string(), chirp(4000))]);
        recognizer.consume_frames(&frames(&[4000, 4000, 3000, 3000]));
        assert_eq!(recognizer.matches(), 0);
    }

    #[test]
    fn test_stop_discards_partial_gesture() {
        let mut recognizer = SoundRecognizer::new(vec![("high".to_string(), chirp(4000))]);
        let (names, handler) = recorder();
        recognizer.start_analysing(handler);
        recognizer.consume_frames(&frames(&[4000, 4000, 3000]));
        recognizer.stop_analysing();
        assert!(!recognizer.is_analysing());

        let (names_after, handler) = recorder();
        recognizer.start_analysing(handler);
        recognizer.consume_frames(&frames(&[3000]));
        assert!(names.lock().unwrap().is_empty());
        assert!(names_after.lock().unwrap().is_empty());
    }

    #[test]
    fn test_process_frame_reports_without_handler() {
        let mut recognizer = SoundRecognizer::new(vec![("high".to_string(), chirp(4000))]);
        let results: Vec<Option<String>> = frames(&[4000, 4000, 3000, 3000])
            .into_iter()
            .map(|f| recognizer.process_frame(f).map(str::to_string))
            .collect();
        assert_eq!(results, vec![None, None, None, Some("high".to_string())]);
    }

    #[test]
    fn test_lookup_by_name() {
        let recognizer = SoundRecognizer::new(vec![("high".to_string(), chirp(4000))]);
        assert_eq!(recognizer.sound_names().collect::<Vec<_>>(), vec!["high"]);
        assert!(recognizer.sound("high").is_some());
        assert!(recognizer.sound("low").is_none());
    }
}
