use super::symbol::MorseSymbol;

/// Stand-in for characters the code table cannot express.
pub const UNKNOWN_CHAR: char = '&';

/// Decoded in place of element runs that match no table entry.
pub const UNDECODABLE_CHAR: char = '?';

const CODE_TABLE: [(char, &str); 37] = [
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('0', "-----"),
    ('&', ".-..."),
];

/// Longest code in the table, in elements.
pub const MAX_CODE_LEN: usize = 5;

/// Dot/dash code for a character, after uppercase folding.
pub fn code_for(c: char) -> Option<&'static str> {
    let upper = c.to_ascii_uppercase();
    CODE_TABLE
        .iter()
        .find(|(character, _)| *character == upper)
        .map(|(_, code)| *code)
}

/// Character for a dot/dash code.
pub fn char_for(code: &str) -> Option<char> {
    CODE_TABLE
        .iter()
        .find(|(_, candidate)| *candidate == code)
        .map(|(character, _)| *character)
}

/// Encode text into symbols terminated by an end of transmission.
///
/// Letters are separated by letter gaps and spaces become word gaps.
/// Characters outside `A-Z`, `a-z` and `0-9` are sent as `&`.
pub fn encode(text: &str) -> Vec<MorseSymbol> {
    let mut out = Vec::with_capacity(text.len() * (MAX_CODE_LEN + 1) + 1);

    for c in text.chars() {
        if c == ' ' {
            replace_trailing_gap(&mut out, MorseSymbol::WordGap);
            continue;
        }

        let code = code_for(c).filter(|_| c.is_ascii_alphanumeric());
        let code = code.or_else(|| code_for(UNKNOWN_CHAR)).unwrap_or_default();
        out.extend(code.chars().filter_map(MorseSymbol::from_char));
        out.push(MorseSymbol::LetterGap);
    }

    replace_trailing_gap(&mut out, MorseSymbol::EndOfTransmission);
    out
}

fn replace_trailing_gap(out: &mut Vec<MorseSymbol>, symbol: MorseSymbol) {
    match out.last_mut() {
        Some(last) if *last == MorseSymbol::LetterGap => *last = symbol,
        _ => out.push(symbol),
    }
}

/// Decode symbols into text.
///
/// Each run of dots and dashes becomes one character; word gaps become
/// spaces. Runs matching no table entry decode to `?`.
pub fn decode(symbols: &[MorseSymbol]) -> String {
    let mut out = String::with_capacity(symbols.len());
    let mut code = String::with_capacity(MAX_CODE_LEN);

    for &symbol in symbols {
        if symbol.is_element() {
            code.push(symbol.as_char());
            continue;
        }
        flush_code(&mut code, &mut out);
        if symbol == MorseSymbol::WordGap {
            out.push(' ');
        }
    }
    flush_code(&mut code, &mut out);
    out
}

fn flush_code(code: &mut String, out: &mut String) {
    if code.is_empty() {
        return;
    }
    out.push(char_for(code).unwrap_or(UNDECODABLE_CHAR));
    code.clear();
}
