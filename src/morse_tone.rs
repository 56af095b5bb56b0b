use anyhow::Result;
use clap::Parser;
use log::info;

use earshot::audio::save_wav_mono;
use earshot::config::MIC_SAMPLE_RATE;
use earshot::morse::{encode, symbols_to_string, Timeline, ToneSpec};

#[derive(Parser)]
#[command(name = "morse-tone")]
#[command(about = "Render text as a Morse tone WAV file")]
struct Args {
    /// Text to send
    text: String,

    /// Output WAV file
    #[arg(short, long, default_value = "morse.wav")]
    output: String,

    /// Tone frequency in Hz
    #[arg(short, long, default_value = "2000")]
    frequency: f32,

    /// Duration of one dot, in milliseconds
    #[arg(short, long, default_value = "100")]
    dot_ms: u32,

    #[arg(long, default_value_t = MIC_SAMPLE_RATE)]
    sample_rate: u32,

    /// Peak amplitude of the tone
    #[arg(long, default_value = "12000")]
    amplitude: i16,

    /// Silent time units before the first element
    #[arg(long, default_value = "2")]
    lead_units: usize,

    /// Extra silent time units after the end of transmission
    #[arg(long, default_value = "4")]
    tail_units: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let symbols = encode(&args.text);
    info!("Symbols: {}", symbols_to_string(&symbols));

    let mut timeline = Timeline::default();
    timeline.push(false, args.lead_units);
    for segment in Timeline::from_symbols(&symbols).segments() {
        timeline.push(segment.on, segment.units);
    }
    timeline.push(false, args.tail_units);

    let spec = ToneSpec {
        frequency: args.frequency,
        sample_rate: args.sample_rate,
        dot_duration_ms: args.dot_ms,
        amplitude: args.amplitude,
    };
    let samples = timeline.render(&spec);
    save_wav_mono(&args.output, &samples, args.sample_rate)?;

    info!(
        "Wrote {} units ({:.2}s) to {}",
        timeline.total_units(),
        samples.len() as f32 / args.sample_rate as f32,
        args.output
    );
    Ok(())
}
