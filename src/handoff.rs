use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::warn;

use crate::morse::MessageHandler;
use crate::recognition::MatchHandler;

/// Bounded hand-off from the audio path to another thread.
///
/// Sending never blocks: when the queue is full the oldest entry is
/// discarded to make room, so a slow reader only ever misses stale events.
#[derive(Clone)]
pub struct QueueHandoff {
    sender: Sender<String>,
    // Producer-side handle used to evict the oldest entry
    evict: Receiver<String>,
    dropped: u64,
}

impl QueueHandoff {
    /// Returns the producer half and the receiver to hand to the consumer thread.
    pub fn bounded(capacity: usize) -> (Self, Receiver<String>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        let handoff = Self {
            sender,
            evict: receiver.clone(),
            dropped: 0,
        };
        (handoff, receiver)
    }

    pub fn send(&mut self, event: &str) {
        let mut event = event.to_string();
        loop {
            match self.sender.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.evict.try_recv().is_ok() {
                        self.dropped += 1;
                        warn!("Hand-off queue full, dropped oldest event ({} total)", self.dropped);
                    }
                    event = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl MatchHandler for QueueHandoff {
    fn on_match(&mut self, name: &str) {
        self.send(name);
    }
}

impl MessageHandler for QueueHandoff {
    fn on_message(&mut self, message: &str) {
        self.send(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFrameAnalysis;
    use crate::recognition::{SoundLibrary, SoundRecognizer};

    #[test]
    fn test_full_queue_drops_oldest() {
        let (mut handoff, receiver) = QueueHandoff::bounded(2);
        handoff.send("one");
        handoff.send("two");
        handoff.send("three");

        assert_eq!(handoff.dropped(), 1);
        let received: Vec<String> = receiver.try_iter().collect();
        assert_eq!(received, vec!["two", "three"]);
    }

    #[test]
    fn test_send_never_blocks_without_reader() {
        let (mut handoff, receiver) = QueueHandoff::bounded(1);
        drop(receiver);
        handoff.send("first");
        handoff.send("second");
        assert_eq!(handoff.dropped(), 1);
    }

    #[test]
    fn test_matches_cross_threads() {
        let (handoff, receiver) = QueueHandoff::bounded(4);
        let reader = std::thread::spawn(move || receiver.recv().unwrap());

        let mut recognizer = SoundRecognizer::new(SoundLibrary::emoji().build().unwrap());
        recognizer.start_analysing(handoff);
        let frames: Vec<AudioFrameAnalysis> = [3024u16, 3024, 3276, 3276, 3255, 3423, 3276, 3276, 3024, 3024, 3024]
            .iter()
            .map(|&f| AudioFrameAnalysis::new(&[f]))
            .collect();
        crate::audio::FrameConsumer::consume_frames(&mut recognizer, &frames);

        assert_eq!(reader.join().unwrap(), "happy");
    }
}
