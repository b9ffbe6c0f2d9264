//! Japanese script classification and the character counters built on it.

use std::collections::HashSet;

/// Script type of a character.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[repr(u8)]
pub enum ScriptType {
    /// Kanji character. (e.g. 漢, 字, ...)
    Kanji = b'K',

    /// Japanese Hiragana character. (e.g. あ, い, う, ...)
    Hiragana = b'H',

    /// Japanese Katakana character. (e.g. ア, イ, ウ, ...)
    Katakana = b'T',

    /// Other character.
    Other = b'O',
}

impl ScriptType {
    /// Gets a script type of a given character.
    ///
    /// # Arguments
    ///
    /// * `c` - A character.
    ///
    /// # Returns
    ///
    /// A script type.
    ///
    /// # Examples
    ///
    /// ```
    /// use jlpt_estimator::ScriptType;
    ///
    /// assert_eq!(ScriptType::Kanji, ScriptType::of('漢'));
    /// assert_eq!(ScriptType::Katakana, ScriptType::of('ー'));
    /// assert_eq!(ScriptType::Other, ScriptType::of('A'));
    /// ```
    pub const fn of(c: char) -> Self {
        match c as u32 {
            0x3040..=0x309F => Self::Hiragana,
            // double hyphen and middle dot are punctuation inside the katakana block
            0x30A0 | 0x30FB => Self::Other,
            0x30A0..=0x30FF      // Katakana
                | 0x31F0..=0x31FF  // Katakana Phonetic Extensions
                | 0xFF66..=0xFF9F  // Halfwidth Katakana
                => Self::Katakana,
            0x3400..=0x4DBF          // CJK Unified Ideographs Extension A
                | 0x4E00..=0x9FFF    // CJK Unified Ideographs
                | 0xF900..=0xFAFF    // CJK Compatibility Ideographs
                | 0x20000..=0x2A6DF  // CJK Unified Ideographs Extension B
                | 0x2A700..=0x2B73F  // CJK Unified Ideographs Extension C
                | 0x2B740..=0x2B81F  // CJK Unified Ideographs Extension D
                | 0x2B820..=0x2CEAF  // CJK Unified Ideographs Extension E
                | 0x2F800..=0x2FA1F  // CJK Compatibility Ideographs Supplement
                => Self::Kanji,
            _ => Self::Other,
        }
    }

    /// Returns `true` for kanji, hiragana and katakana.
    pub const fn is_japanese(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// Returns `true` if `c` is a kanji, hiragana or katakana character.
#[inline]
pub const fn is_japanese(c: char) -> bool {
    ScriptType::of(c).is_japanese()
}

/// Number of characters of each Japanese script in a text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptCounts {
    pub kanji: usize,
    pub hiragana: usize,
    pub katakana: usize,
}

impl ScriptCounts {
    /// Total number of Japanese script characters.
    pub const fn total(&self) -> usize {
        self.kanji + self.hiragana + self.katakana
    }
}

/// Counts the characters of each Japanese script in `text`.
pub fn script_counts(text: &str) -> ScriptCounts {
    let mut counts = ScriptCounts::default();
    for c in text.chars() {
        match ScriptType::of(c) {
            ScriptType::Kanji => counts.kanji += 1,
            ScriptType::Hiragana => counts.hiragana += 1,
            ScriptType::Katakana => counts.katakana += 1,
            ScriptType::Other => {}
        }
    }
    counts
}

/// Counts kanji characters.
pub fn count_kanji(text: &str) -> usize {
    text.chars()
        .filter(|&c| ScriptType::of(c) == ScriptType::Kanji)
        .count()
}

/// Ratio of kanji to all Japanese script characters, or 0 if there are none.
pub fn script_ratio(text: &str) -> f64 {
    let counts = script_counts(text);
    match counts.total() {
        0 => 0.0,
        total => counts.kanji as f64 / total as f64,
    }
}

/// Number of distinct kanji characters.
pub fn unique_kanji_count(text: &str) -> usize {
    text.chars()
        .filter(|&c| ScriptType::of(c) == ScriptType::Kanji)
        .collect::<HashSet<_>>()
        .len()
}

/// Number of maximal katakana runs that are at least two characters long.
pub fn katakana_word_count(text: &str) -> usize {
    let mut n_words = 0;
    let mut run = 0;
    for c in text.chars() {
        if ScriptType::of(c) == ScriptType::Katakana {
            run += 1;
            continue;
        }
        if run >= 2 {
            n_words += 1;
        }
        run = 0;
    }
    if run >= 2 {
        n_words += 1;
    }
    n_words
}
