use anyhow::Result;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::info;
use std::path::Path;

/// Pull-based provider of mono 16-bit PCM.
///
/// Each pull hands out the next block; block boundaries need not line up
/// with analysis frames.
pub trait SampleSource {
    fn sample_rate(&self) -> u32;

    /// Next block of samples, or `None` once the stream is exhausted.
    fn pull(&mut self) -> Option<&[i16]>;
}

/// In-memory source that replays a buffer in fixed-size blocks.
pub struct BufferSource {
    samples: Vec<i16>,
    sample_rate: u32,
    block_size: usize,
    position: usize,
}

impl BufferSource {
    pub fn new(samples: Vec<i16>, sample_rate: u32, block_size: usize) -> Self {
        Self {
            samples,
            sample_rate,
            block_size: block_size.max(1),
            position: 0,
        }
    }

    /// Load a WAV file, mixed down to mono.
    pub fn from_wav<P: AsRef<Path>>(path: P, block_size: usize) -> Result<Self> {
        let (samples, sample_rate) = load_wav_mono(path)?;
        Ok(Self::new(samples, sample_rate, block_size))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl SampleSource for BufferSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn pull(&mut self) -> Option<&[i16]> {
        if self.position >= self.samples.len() {
            return None;
        }
        let end = (self.position + self.block_size).min(self.samples.len());
        let block = &self.samples[self.position..end];
        self.position = end;
        Some(block)
    }
}

/// Read a WAV file into mono i16 samples. Returns the samples and the sample rate.
pub fn load_wav_mono<P: AsRef<Path>>(path: P) -> Result<(Vec<i16>, u32)> {
    let mut reader = WavReader::open(&path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let shift = spec.bits_per_sample as i32 - 16;
            reader
                .samples::<i32>()
                .map(|s| {
                    s.map(|v| {
                        if shift >= 0 {
                            (v >> shift) as f32
                        } else {
                            (v << -shift) as f32
                        }
                    })
                })
                .collect::<std::result::Result<_, _>>()?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| v * 32767.0))
            .collect::<std::result::Result<_, _>>()?,
    };

    // Mix to mono
    let samples: Vec<i16> = interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().sum();
            (sum / channels as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
        })
        .collect();

    info!(
        "Loaded {} samples ({:.2}s) at {} Hz from {}",
        samples.len(),
        samples.len() as f32 / spec.sample_rate as f32,
        spec.sample_rate,
        path.as_ref().display()
    );

    Ok((samples, spec.sample_rate))
}

/// Write mono i16 samples to a WAV file.
pub fn save_wav_mono<P: AsRef<Path>>(path: P, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
