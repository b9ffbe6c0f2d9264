//! Character-level cleaning filters applied before analysis.

use crate::script::is_japanese;

/// Filter that maps a string to a cleaned string.
pub trait StringFilter<S>
where
    S: AsRef<str>,
{
    /// Filter a specified string.
    ///
    /// # Arguments:
    ///
    /// * `string` - Input string.
    ///
    /// # Returns
    ///
    /// A processed string.
    fn filter(&self, string: S) -> String;
}

/// Removes C0 and C1 control characters (U+0000..U+001F, U+007F..U+009F).
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlCharFilter;

impl<S> StringFilter<S> for ControlCharFilter
where
    S: AsRef<str>,
{
    fn filter(&self, string: S) -> String {
        string
            .as_ref()
            .chars()
            .filter(|&c| !matches!(c as u32, 0x00..=0x1F | 0x7F..=0x9F))
            .collect()
    }
}

/// Keeps Japanese scripts, common punctuation, ASCII alphanumerics and whitespace.
///
/// The result is trimmed.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowListFilter;

impl AllowListFilter {
    const PUNCTUATION: &'static [char] = &[
        '。', '、', '！', '？', '「', '」', '『', '』', '・', '…', 'ー', '!', '?', '.', ',',
    ];

    fn is_allowed(c: char) -> bool {
        is_japanese(c)
            || c.is_ascii_alphanumeric()
            || c.is_whitespace()
            || Self::PUNCTUATION.contains(&c)
    }
}

impl<S> StringFilter<S> for AllowListFilter
where
    S: AsRef<str>,
{
    fn filter(&self, string: S) -> String {
        let cleaned: String = string
            .as_ref()
            .chars()
            .filter(|&c| Self::is_allowed(c))
            .collect();
        cleaned.trim().to_string()
    }
}

/// Keeps kanji, hiragana and katakana only.
#[derive(Clone, Copy, Debug, Default)]
pub struct JapaneseScriptFilter;

impl<S> StringFilter<S> for JapaneseScriptFilter
where
    S: AsRef<str>,
{
    fn filter(&self, string: S) -> String {
        string.as_ref().chars().filter(|&c| is_japanese(c)).collect()
    }
}

/// Keeps Japanese scripts and the CJK symbols and punctuation block (U+3000..U+303F).
///
/// Used to strip recognition noise from OCR output.
#[derive(Clone, Copy, Debug, Default)]
pub struct OcrTextFilter;

impl<S> StringFilter<S> for OcrTextFilter
where
    S: AsRef<str>,
{
    fn filter(&self, string: S) -> String {
        string
            .as_ref()
            .chars()
            .filter(|&c| is_japanese(c) || ('\u{3000}'..='\u{303F}').contains(&c))
            .collect()
    }
}

/// Drops carriage returns, collapses consecutive line feeds and trims the result.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewlineFilter;

impl<S> StringFilter<S> for NewlineFilter
where
    S: AsRef<str>,
{
    fn filter(&self, string: S) -> String {
        let mut result = String::with_capacity(string.as_ref().len());
        let mut prev_lf = false;
        for c in string.as_ref().chars() {
            match c {
                '\r' => continue,
                '\n' if prev_lf => continue,
                _ => {}
            }
            prev_lf = c == '\n';
            result.push(c);
        }
        result.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_char_filter() {
        let filter = ControlCharFilter;
        assert_eq!("ab c", filter.filter("a\u{0}b\t \u{85}c\n\u{7f}"));
        assert_eq!("日本語", filter.filter("日本語"));
    }

    #[test]
    fn test_allow_list_filter() {
        let filter = AllowListFilter;
        assert_eq!(
            "これはテスト。abc 123！",
            filter.filter("  これは😀テスト。abc #123！\u{3000}")
        );
        assert_eq!("", filter.filter("♪♪♪"));
    }

    #[test]
    fn test_japanese_script_filter() {
        let filter = JapaneseScriptFilter;
        assert_eq!(
            "これは簡単な文章です",
            filter.filter("これは簡単な文章です。")
        );
        assert_eq!("コーヒー", filter.filter("Coffee: コーヒー (1)"));
        assert_eq!("テレビラジオ", filter.filter("テレビ・ラジオ"));
    }

    #[test]
    fn test_ocr_text_filter() {
        let filter = OcrTextFilter;
        assert_eq!("「問題」", filter.filter("「問題1」"));
        assert_eq!("問題。", filter.filter("問題abc。"));
    }

    #[test]
    fn test_newline_filter() {
        let filter = NewlineFilter;
        assert_eq!("前の行\n次の行", filter.filter("\r\n前の行\r\n\r\n\n次の行\n"));
        assert_eq!("", filter.filter("\n\n"));
    }
}
