use std::fmt;

/// One element of the Morse symbol stream.
///
/// The textual form uses `.` and `-` for tone elements, `' '` between
/// letters, `;` between words and `#` for end of transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MorseSymbol {
    Dot,
    Dash,
    LetterGap,
    WordGap,
    EndOfTransmission,
}

impl MorseSymbol {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Dot),
            '-' => Some(Self::Dash),
            ' ' => Some(Self::LetterGap),
            ';' => Some(Self::WordGap),
            '#' => Some(Self::EndOfTransmission),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Dot => '.',
            Self::Dash => '-',
            Self::LetterGap => ' ',
            Self::WordGap => ';',
            Self::EndOfTransmission => '#',
        }
    }

    /// Dots and dashes; everything else is silence.
    pub fn is_element(self) -> bool {
        matches!(self, Self::Dot | Self::Dash)
    }

    /// Parse a symbol string, skipping characters outside the alphabet.
    pub fn parse(text: &str) -> Vec<Self> {
        text.chars().filter_map(Self::from_char).collect()
    }
}

impl fmt::Display for MorseSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Render symbols back to their textual form.
pub fn symbols_to_string(symbols: &[MorseSymbol]) -> String {
    symbols.iter().map(|s| s.as_char()).collect()
}
