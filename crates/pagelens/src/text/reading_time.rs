// ABOUTME: Reading time estimation for mixed Japanese and Latin-script text.
// ABOUTME: Counts CJK characters and Latin words separately and converts each at its own reading rate.

/// CJK characters read per minute.
pub const CJK_CHARS_PER_MINUTE: f64 = 400.0;
/// Latin-script words read per minute.
pub const LATIN_WORDS_PER_MINUTE: f64 = 200.0;

/// Character and word counts used for reading time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStats {
    pub cjk_chars: usize,
    pub latin_words: usize,
}

impl TextStats {
    /// Count CJK characters and Latin words in `text`.
    pub fn of(text: &str) -> Self {
        let cjk_chars = text.chars().filter(|&c| is_cjk(c)).count();
        let latin_words = text
            .split_whitespace()
            .filter(|token| token.chars().any(|c| c.is_ascii_alphanumeric()))
            .count();
        Self {
            cjk_chars,
            latin_words,
        }
    }

    /// Word-equivalent count: each CJK character counts as one unit.
    pub fn word_count(&self) -> usize {
        self.cjk_chars + self.latin_words
    }

    /// Estimated minutes, rounded, never below 1.
    pub fn minutes(&self) -> u32 {
        let raw = self.cjk_chars as f64 / CJK_CHARS_PER_MINUTE
            + self.latin_words as f64 / LATIN_WORDS_PER_MINUTE;
        (raw.round() as u32).max(1)
    }
}

/// Estimate reading time in whole minutes (at least 1).
pub fn estimate(text: &str) -> u32 {
    TextStats::of(text).minutes()
}

/// Hiragana, Katakana and CJK ideographs (including extension A).
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF)
}
