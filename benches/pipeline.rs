use criterion::{black_box, criterion_group, criterion_main, Criterion};

use earshot::audio::{AudioFrameAnalysis, FrequencyExtractor};
use earshot::morse::MorseRecognizer;
use earshot::recognition::{SoundLibrary, SoundRecognizer};
use earshot::{AnalysisConfig, MorseConfig};

fn tone(frequency: f32, sample_rate: u32, len: usize) -> Vec<i16> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32;
            (8000.0 * phase.sin()) as i16
        })
        .collect()
}

fn bench_extractor(c: &mut Criterion) {
    let config = AnalysisConfig::emoji();
    let samples = tone(3000.0, config.sample_rate, config.audio_samples_number);
    let mut extractor = FrequencyExtractor::new(config).unwrap();
    extractor.start_recording();

    c.bench_function("extract_frame_512", |b| {
        b.iter(|| {
            extractor.process(black_box(&samples));
            extractor.pull().count()
        })
    });
}

fn bench_sound_recognizer(c: &mut Criterion) {
    let mut recognizer = SoundRecognizer::new(SoundLibrary::emoji().build().unwrap());
    let frames: Vec<AudioFrameAnalysis> = [3024u16, 3276, 3255, 3423, 2961, 3003]
        .iter()
        .map(|&f| AudioFrameAnalysis::new(&[f, f + 400]))
        .collect();

    c.bench_function("sound_frame", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % frames.len();
            recognizer.process_frame(black_box(frames[i])).is_some()
        })
    });
}

fn bench_morse_recognizer(c: &mut Criterion) {
    let mut recognizer = MorseRecognizer::new(MorseConfig::default(), &AnalysisConfig::morse()).unwrap();
    recognizer.start_analysing();
    let on = AudioFrameAnalysis::new(&[2000]);

    c.bench_function("morse_frame", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            let frame = if (i / 9) % 2 == 0 { on } else { AudioFrameAnalysis::SILENT };
            let symbol = recognizer.process_frame(black_box(&frame));
            if recognizer.pending_symbols() > 400 {
                recognizer.pull().count();
            }
            symbol
        })
    });
}

criterion_group!(benches, bench_extractor, bench_sound_recognizer, bench_morse_recognizer);
criterion_main!(benches);
