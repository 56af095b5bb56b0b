use log::{debug, info, warn};

use super::fft::FrequencyExtractor;
use super::frame::AudioFrameAnalysis;
use super::source::SampleSource;

/// Downstream stage fed with analysed frames.
///
/// Implementations receive zero or more frames per call, oldest first, and
/// must finish within one audio block period: no blocking, no allocation.
pub trait FrameConsumer {
    fn consume_frames(&mut self, frames: &[AudioFrameAnalysis]);

    /// Whether the consumer currently wants frames. The pipeline keeps the
    /// extractor recording only while this is true.
    fn is_analysing(&self) -> bool;
}

impl<C: FrameConsumer + ?Sized> FrameConsumer for Box<C> {
    fn consume_frames(&mut self, frames: &[AudioFrameAnalysis]) {
        (**self).consume_frames(frames)
    }

    fn is_analysing(&self) -> bool {
        (**self).is_analysing()
    }
}

/// Source → extractor → consumer, driven one block at a time.
///
/// Every `step` pulls one block from the source, runs it through the
/// extractor and synchronously hands the completed frames to the consumer.
/// Nothing is queued between steps.
pub struct Pipeline<S, C> {
    source: S,
    extractor: FrequencyExtractor,
    consumer: C,
    scratch: Vec<AudioFrameAnalysis>,
    blocks: u64,
}

impl<S: SampleSource, C: FrameConsumer> Pipeline<S, C> {
    pub fn new(source: S, extractor: FrequencyExtractor, consumer: C) -> Self {
        if source.sample_rate() != extractor.config().sample_rate {
            warn!(
                "Source rate {} Hz differs from analysis rate {} Hz",
                source.sample_rate(),
                extractor.config().sample_rate
            );
        }
        let scratch = Vec::with_capacity(extractor.config().max_pending_frames);
        Self {
            source,
            extractor,
            consumer,
            scratch,
            blocks: 0,
        }
    }

    /// Process one block. Returns false once the source is exhausted.
    pub fn step(&mut self) -> bool {
        self.sync_recording();

        let Some(block) = self.source.pull() else {
            return false;
        };
        self.blocks += 1;

        if self.extractor.process(block) == 0 {
            return true;
        }

        self.scratch.extend(self.extractor.pull());
        self.consumer.consume_frames(&self.scratch);
        self.scratch.clear();
        true
    }

    /// Step until the source is exhausted. Returns the number of blocks processed.
    pub fn run(&mut self) -> u64 {
        let start = self.blocks;
        while self.step() {}
        info!(
            "Pipeline drained after {} blocks, {} frames ({} dropped)",
            self.blocks - start,
            self.extractor.frames_produced(),
            self.extractor.dropped_frames()
        );
        self.blocks - start
    }

    fn sync_recording(&mut self) {
        match (self.consumer.is_analysing(), self.extractor.is_recording()) {
            (true, false) => {
                debug!("consumer armed, starting extractor");
                self.extractor.start_recording();
            }
            (false, true) => {
                debug!("consumer disarmed, stopping extractor");
                self.extractor.stop_recording();
            }
            _ => {}
        }
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    pub fn extractor(&self) -> &FrequencyExtractor {
        &self.extractor
    }

    pub fn into_parts(self) -> (S, FrequencyExtractor, C) {
        (self.source, self.extractor, self.consumer)
    }
}
