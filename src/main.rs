use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use earshot::audio::{encode_frames, AudioFrameAnalysis, BufferSource, FrameConsumer, FrequencyExtractor, Pipeline, SampleSource};
use earshot::handoff::QueueHandoff;
use earshot::morse::{MorseInterpreter, MorseRecognizer};
use earshot::recognition::{SoundLibrary, SoundRecognizer};
use earshot::{AnalysisConfig, MorseConfig};

#[derive(Parser)]
#[command(name = "earshot")]
#[command(about = "Recognize trained sounds and Morse code in WAV recordings")]
struct Args {
    /// Analysis parameters as JSON (defaults depend on the subcommand)
    #[arg(long, global = true)]
    analysis: Option<PathBuf>,

    /// Samples handed to the extractor per pull
    #[arg(long, global = true, default_value = "256")]
    block_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode Morse code
    Morse {
        input: PathBuf,

        /// Tone frequency to listen for, in Hz
        #[arg(short, long, default_value = "2000")]
        frequency: u32,

        /// Duration of one dot, in milliseconds
        #[arg(short, long, default_value = "100")]
        dot_ms: u32,

        /// Full Morse parameters as JSON; overrides --frequency and --dot-ms
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Recognize trained sound signatures
    Sounds {
        input: PathBuf,

        /// Signature library as JSON (built-in emoji signatures if omitted)
        #[arg(short, long)]
        library: Option<PathBuf>,
    },

    /// Dump the dominant frequencies of every frame
    Peaks {
        input: PathBuf,

        /// Use the short Morse frame instead of the sound frame
        #[arg(long)]
        morse: bool,

        /// Write frames as JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the packed 7-byte frame records to this file
        #[arg(long)]
        packed: Option<PathBuf>,
    },
}

/// Collects every frame for offline inspection.
struct FrameRecorder {
    frames: Vec<AudioFrameAnalysis>,
}

impl FrameConsumer for FrameRecorder {
    fn consume_frames(&mut self, frames: &[AudioFrameAnalysis]) {
        self.frames.extend_from_slice(frames);
    }

    fn is_analysing(&self) -> bool {
        true
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match &args.command {
        Command::Morse {
            input,
            frequency,
            dot_ms,
            config,
        } => {
            let source = open_source(input, args.block_size)?;
            let analysis = analysis_config(&args, AnalysisConfig::morse(), &source)?;
            let morse = match config {
                Some(path) => MorseConfig::load(path, &analysis)?,
                None => MorseConfig::new(*frequency, *dot_ms),
            };

            let recognizer = MorseRecognizer::new(morse, &analysis)?;
            info!("Time unit: {} frames", recognizer.time_unit());

            let (handoff, messages) = QueueHandoff::bounded(64);
            let mut interpreter = MorseInterpreter::new(recognizer);
            interpreter.start_interpreting(handoff);

            let mut pipeline = Pipeline::new(source, FrequencyExtractor::new(analysis)?, interpreter);
            pipeline.run();
            pipeline.consumer_mut().stop_interpreting();

            for message in messages.try_iter() {
                println!("{}", message);
            }
        }

        Command::Sounds { input, library } => {
            let source = open_source(input, args.block_size)?;
            let analysis = analysis_config(&args, AnalysisConfig::emoji(), &source)?;
            let library = match library {
                Some(path) => SoundLibrary::load(path)?,
                None => SoundLibrary::emoji(),
            };

            let (handoff, matches) = QueueHandoff::bounded(64);
            let mut recognizer = SoundRecognizer::new(library.build()?);
            recognizer.start_analysing(handoff);

            let mut pipeline = Pipeline::new(source, FrequencyExtractor::new(analysis)?, recognizer);
            pipeline.run();
            pipeline.consumer_mut().stop_analysing();

            for name in matches.try_iter() {
                println!("{}", name);
            }
        }

        Command::Peaks {
            input,
            morse,
            output,
            packed,
        } => {
            let source = open_source(input, args.block_size)?;
            let defaults = if *morse {
                AnalysisConfig::morse()
            } else {
                AnalysisConfig::emoji()
            };
            let analysis = analysis_config(&args, defaults, &source)?;
            let frame_rate = analysis.frame_rate();

            let recorder = FrameRecorder { frames: Vec::new() };
            let mut pipeline = Pipeline::new(source, FrequencyExtractor::new(analysis)?, recorder);
            pipeline.run();
            let (_, _, recorder) = pipeline.into_parts();

            info!(
                "{} frames ({:.2}s)",
                recorder.frames.len(),
                recorder.frames.len() as f32 / frame_rate
            );

            let json = serde_json::to_string_pretty(&recorder.frames)?;
            match output {
                Some(path) => std::fs::write(path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", json),
            }

            if let Some(path) = packed {
                let mut bytes = Vec::new();
                encode_frames(&recorder.frames, &mut bytes);
                std::fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
                info!("Wrote {} packed bytes to {}", bytes.len(), path.display());
            }
        }
    }

    Ok(())
}

fn open_source(input: &Path, block_size: usize) -> Result<BufferSource> {
    BufferSource::from_wav(input, block_size).with_context(|| format!("reading {}", input.display()))
}

// Analysis parameters from --analysis or the preset, at the recording's sample rate
fn analysis_config(args: &Args, preset: AnalysisConfig, source: &BufferSource) -> Result<AnalysisConfig> {
    let mut config = match &args.analysis {
        Some(path) => AnalysisConfig::load(path)?,
        None => preset,
    };
    config.sample_rate = source.sample_rate();
    config.validate()?;
    info!(
        "Analysing at {} Hz, {} samples per frame",
        config.sample_rate, config.audio_samples_number
    );
    Ok(config)
}
