use super::symbol::MorseSymbol;

pub const DOT_UNITS: usize = 1;
pub const DASH_UNITS: usize = 3;
pub const ELEMENT_GAP_UNITS: usize = 1;
pub const LETTER_GAP_UNITS: usize = 3;
pub const WORD_GAP_UNITS: usize = 7;
pub const END_OF_TRANSMISSION_UNITS: usize = 10;

/// A run of tone or silence, in time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub on: bool,
    pub units: usize,
}

/// Keying plan for a symbol stream: when the tone is on and for how long.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    segments: Vec<Segment>,
}

/// Parameters for rendering a timeline to PCM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency: f32,
    pub sample_rate: u32,
    pub dot_duration_ms: u32,
    pub amplitude: i16,
}

impl ToneSpec {
    pub fn samples_per_unit(&self) -> usize {
        (self.sample_rate as u64 * self.dot_duration_ms as u64 / 1000) as usize
    }
}

impl Timeline {
    /// Element gaps are inserted between consecutive dots and dashes.
    pub fn from_symbols(symbols: &[MorseSymbol]) -> Self {
        let mut timeline = Self::default();
        for (i, &symbol) in symbols.iter().enumerate() {
            let (on, units) = match symbol {
                MorseSymbol::Dot => (true, DOT_UNITS),
                MorseSymbol::Dash => (true, DASH_UNITS),
                MorseSymbol::LetterGap => (false, LETTER_GAP_UNITS),
                MorseSymbol::WordGap => (false, WORD_GAP_UNITS),
                MorseSymbol::EndOfTransmission => (false, END_OF_TRANSMISSION_UNITS),
            };
            timeline.push(on, units);

            let next_is_element = symbols.get(i + 1).is_some_and(|next| next.is_element());
            if symbol.is_element() && next_is_element {
                timeline.push(false, ELEMENT_GAP_UNITS);
            }
        }
        timeline
    }

    /// Append a run, merging it with the previous one when the state matches.
    pub fn push(&mut self, on: bool, units: usize) {
        if units == 0 {
            return;
        }
        match self.segments.last_mut() {
            Some(last) if last.on == on => last.units += units,
            _ => self.segments.push(Segment { on, units }),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn total_units(&self) -> usize {
        self.segments.iter().map(|s| s.units).sum()
    }

    /// Per-frame tone state at `frames_per_unit` frames per unit.
    pub fn frames(&self, frames_per_unit: usize) -> impl Iterator<Item = bool> + '_ {
        self.segments
            .iter()
            .flat_map(move |s| std::iter::repeat(s.on).take(s.units * frames_per_unit))
    }

    /// Render the keyed tone as mono PCM with a continuous phase.
    pub fn render(&self, spec: &ToneSpec) -> Vec<i16> {
        let unit = spec.samples_per_unit();
        let step = 2.0 * std::f64::consts::PI * spec.frequency as f64 / spec.sample_rate as f64;
        let amplitude = spec.amplitude as f64;

        let mut samples = Vec::with_capacity(self.total_units() * unit);
        for segment in &self.segments {
            for _ in 0..segment.units * unit {
                let value = if segment.on {
                    amplitude * (step * samples.len() as f64).sin()
                } else {
                    0.0
                };
                samples.push(value as i16);
            }
        }
        samples
    }
}
