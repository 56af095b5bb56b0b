use log::{debug, info, trace, warn};
use rustfft::{num_complex::Complex, FftPlanner};
use std::collections::VecDeque;
use std::sync::Arc;

use super::frame::{AudioFrameAnalysis, MAX_PEAKS};
use crate::config::AnalysisConfig;
use crate::error::ConfigError;

/// Spectral front end: raw PCM in, dominant frequencies per frame out.
///
/// Samples are collected into a double buffer of `2 * audio_samples_number`
/// floats. Whenever either half fills up it is analysed in place, so a frame
/// boundary falling in the middle of an input block never needs a copy.
/// All buffers are allocated in `new`; steady-state processing does not allocate.
pub struct FrequencyExtractor {
    config: AnalysisConfig,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,

    samples: Vec<f32>,
    position: usize,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,

    // Best-effort guess of the signal's zero point, from the previous frame
    zero_offset: i32,
    frame_sum: i64,
    pending_byte: Option<u8>,

    pending: VecDeque<AudioFrameAnalysis>,
    last_frequency: Option<u32>,
    recording: bool,
    frames_produced: u64,
    dropped_frames: u64,

    band: (usize, usize),
}

impl FrequencyExtractor {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let n = config.audio_samples_number;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let window = if config.hann_window {
            Self::hann_window(n)
        } else {
            vec![1.0; n]
        };

        let band = Self::band_bins(&config);
        info!(
            "Frequency extractor: {} samples/frame at {} Hz ({:.1} Hz bins, band {}-{} Hz)",
            n,
            config.sample_rate,
            config.bin_width(),
            config.min_frequency,
            config.max_frequency
        );

        Ok(Self {
            fft,
            window,
            samples: vec![0.0; 2 * n],
            position: 0,
            spectrum: vec![Complex::new(0.0, 0.0); n],
            scratch,
            magnitudes: vec![0.0; n / 2],
            zero_offset: 0,
            frame_sum: 0,
            pending_byte: None,
            pending: VecDeque::with_capacity(config.max_pending_frames),
            last_frequency: None,
            recording: false,
            frames_produced: 0,
            dropped_frames: 0,
            band,
            config,
        })
    }

    fn hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    // Inclusive range of magnitude indices inside the recognition band.
    // Index i holds FFT bin i + 1; DC is never part of the magnitude array.
    fn band_bins(config: &AnalysisConfig) -> (usize, usize) {
        let bin_width = config.bin_width();
        let last = config.audio_samples_number / 2 - 1;
        let lo = ((config.min_frequency as f32 / bin_width).ceil() as usize).max(1) - 1;
        let hi = ((config.max_frequency as f32 / bin_width).floor() as usize).max(1) - 1;
        (lo.min(last), hi.min(last))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn start_recording(&mut self) {
        if !self.recording {
            info!("Frequency extractor recording");
        }
        self.recording = true;
    }

    /// Stop accepting samples and discard any partial frame and unread output.
    pub fn stop_recording(&mut self) {
        if self.recording {
            info!("Frequency extractor stopped after {} frames", self.frames_produced);
        }
        self.recording = false;
        self.position = 0;
        self.frame_sum = 0;
        self.pending_byte = None;
        self.pending.clear();
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Feed a block of mono PCM samples. Returns the number of frames completed.
    ///
    /// Samples are ignored while not recording.
    pub fn process(&mut self, block: &[i16]) -> usize {
        if !self.recording || block.is_empty() {
            return 0;
        }

        let n = self.config.audio_samples_number;
        let mut completed = 0;

        for &sample in block {
            self.frame_sum += sample as i64;
            let value = (sample as i32 - self.zero_offset) / self.config.divisor;
            self.samples[self.position] = value as f32;
            self.position += 1;

            if self.position % n == 0 {
                let offset = self.position - n;
                if self.position == 2 * n {
                    self.position = 0;
                }
                self.zero_offset = (self.frame_sum / n as i64) as i32;
                self.frame_sum = 0;
                self.analyse_frame(offset);
                completed += 1;
            }
        }

        completed
    }

    /// Feed little-endian PCM bytes. A trailing odd byte is kept for the next call.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> usize {
        if !self.recording || bytes.is_empty() {
            return 0;
        }

        let mut completed = 0;
        let mut rest = bytes;
        if let Some(low) = self.pending_byte.take() {
            completed += self.process(&[i16::from_le_bytes([low, rest[0]])]);
            rest = &rest[1..];
        }

        let mut block = [0i16; 64];
        let mut chunks = rest.chunks_exact(2);
        loop {
            let mut filled = 0;
            for (slot, pair) in block.iter_mut().zip(chunks.by_ref()) {
                *slot = i16::from_le_bytes([pair[0], pair[1]]);
                filled += 1;
            }
            if filled == 0 {
                break;
            }
            completed += self.process(&block[..filled]);
        }

        if let [low] = chunks.remainder() {
            self.pending_byte = Some(*low);
        }
        completed
    }

    fn analyse_frame(&mut self, offset: usize) {
        let n = self.config.audio_samples_number;

        for (i, slot) in self.spectrum.iter_mut().enumerate() {
            *slot = Complex::new(self.samples[offset + i] * self.window[i], 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let scale = 2.0 / n as f32;
        for (i, magnitude) in self.magnitudes.iter_mut().enumerate() {
            *magnitude = self.spectrum[i + 1].norm() * scale;
        }

        let loudest = self
            .magnitudes
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &m)| if m > best.1 { (i, m) } else { best });
        self.last_frequency = Some(self.index_to_frequency(loudest.0));

        let analysis = self.analyse_peaks();
        trace!("frame {}: {:?}", self.frames_produced, analysis.frequencies());
        self.frames_produced += 1;

        if self.pending.len() == self.config.max_pending_frames {
            self.pending.pop_front();
            self.dropped_frames += 1;
            warn!("Frame output overrun, {} frames dropped so far", self.dropped_frames);
        }
        self.pending.push_back(analysis);
    }

    fn analyse_peaks(&self) -> AudioFrameAnalysis {
        let (lo, hi) = self.band;
        let band = &self.magnitudes[lo..=hi];

        let count = band.len() as f32;
        let mean = band.iter().sum::<f32>() / count;
        let variance = band.iter().map(|&m| (m - mean).powi(2)).sum::<f32>() / count;
        let std_dev = variance.sqrt();

        if mean < self.config.mean_threshold || std_dev < self.config.std_threshold {
            debug!("silent frame (mean {:.3}, std {:.3})", mean, std_dev);
            return AudioFrameAnalysis::SILENT;
        }

        let threshold = mean + self.config.std_mult_threshold * std_dev;
        let radius = self.config.suppression_bins;
        let mut picked = [usize::MAX; MAX_PEAKS];
        let mut analysis = AudioFrameAnalysis::SILENT;

        for slot in 0..MAX_PEAKS {
            let mut best: Option<(usize, f32)> = None;
            for (i, &magnitude) in band.iter().enumerate() {
                if magnitude <= threshold {
                    continue;
                }
                let suppressed = picked[..slot].iter().any(|&p| p.abs_diff(i) <= radius);
                if suppressed {
                    continue;
                }
                if best.map_or(true, |(_, m)| magnitude > m) {
                    best = Some((i, magnitude));
                }
            }

            match best {
                Some((i, _)) => {
                    picked[slot] = i;
                    let frequency = self.index_to_frequency(lo + i);
                    analysis.push(frequency.min(u16::MAX as u32) as u16);
                }
                None => break,
            }
        }

        analysis
    }

    /// Centre frequency of the magnitude at `index` (FFT bin `index + 1`).
    pub fn index_to_frequency(&self, index: usize) -> u32 {
        (self.config.bin_width() * (index + 1) as f32).round() as u32
    }

    /// Dominant frequency of the most recent frame, DC excluded.
    pub fn last_frequency(&self) -> Option<u32> {
        self.last_frequency
    }

    /// Drain every frame analysed since the previous pull, oldest first.
    ///
    /// Returns an empty iterator when no frame has completed.
    pub fn pull(&mut self) -> std::collections::vec_deque::Drain<'_, AudioFrameAnalysis> {
        self.pending.drain(..)
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    pub fn frames_produced(&self) -> u64 {
        self.frames_produced
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }
}
