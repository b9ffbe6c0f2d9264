//! The fixed numeric feature schema and its extractor.

use std::fmt;
use std::ops::Index;

use crate::script;
use crate::tokenizer::Token;

/// Coarse part-of-speech categories counted as features, in IPADIC notation.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Particle,
    AuxiliaryVerb,
    Adnominal,
    Interjection,
    Conjunction,
    Prefix,
    Symbol,
}

impl PartOfSpeech {
    pub const ALL: [Self; 11] = [
        Self::Noun,
        Self::Verb,
        Self::Adjective,
        Self::Adverb,
        Self::Particle,
        Self::AuxiliaryVerb,
        Self::Adnominal,
        Self::Interjection,
        Self::Conjunction,
        Self::Prefix,
        Self::Symbol,
    ];

    /// IPADIC tag of the category.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Noun => "名詞",
            Self::Verb => "動詞",
            Self::Adjective => "形容詞",
            Self::Adverb => "副詞",
            Self::Particle => "助詞",
            Self::AuxiliaryVerb => "助動詞",
            Self::Adnominal => "連体詞",
            Self::Interjection => "感動詞",
            Self::Conjunction => "接続詞",
            Self::Prefix => "接頭詞",
            Self::Symbol => "記号",
        }
    }

    /// Maps a coarse tag to a category.
    ///
    /// UniDic names of the same categories are accepted as aliases. Tags outside the vocabulary
    /// (e.g. `フィラー`) yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let pos = match tag {
            "名詞" | "代名詞" | "形状詞" => Self::Noun,
            "動詞" => Self::Verb,
            "形容詞" => Self::Adjective,
            "副詞" => Self::Adverb,
            "助詞" => Self::Particle,
            "助動詞" => Self::AuxiliaryVerb,
            "連体詞" => Self::Adnominal,
            "感動詞" => Self::Interjection,
            "接続詞" => Self::Conjunction,
            "接頭詞" | "接頭辞" => Self::Prefix,
            "記号" | "補助記号" => Self::Symbol,
            _ => return None,
        };
        Some(pos)
    }
}

/// Number of numeric features.
pub const N_FEATURES: usize = 5 + PartOfSpeech::ALL.len();

/// A numeric feature. [`Feature::ALL`] is the column order shared by training and inference.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Feature {
    TokenCount,
    KanjiCount,
    KanjiRatio,
    UniqueKanjiCount,
    KatakanaWordCount,
    PosCount(PartOfSpeech),
}

impl Feature {
    pub const ALL: [Self; N_FEATURES] = [
        Self::TokenCount,
        Self::KanjiCount,
        Self::KanjiRatio,
        Self::UniqueKanjiCount,
        Self::KatakanaWordCount,
        Self::PosCount(PartOfSpeech::Noun),
        Self::PosCount(PartOfSpeech::Verb),
        Self::PosCount(PartOfSpeech::Adjective),
        Self::PosCount(PartOfSpeech::Adverb),
        Self::PosCount(PartOfSpeech::Particle),
        Self::PosCount(PartOfSpeech::AuxiliaryVerb),
        Self::PosCount(PartOfSpeech::Adnominal),
        Self::PosCount(PartOfSpeech::Interjection),
        Self::PosCount(PartOfSpeech::Conjunction),
        Self::PosCount(PartOfSpeech::Prefix),
        Self::PosCount(PartOfSpeech::Symbol),
    ];

    /// Column of the feature.
    pub const fn index(self) -> usize {
        match self {
            Self::TokenCount => 0,
            Self::KanjiCount => 1,
            Self::KanjiRatio => 2,
            Self::UniqueKanjiCount => 3,
            Self::KatakanaWordCount => 4,
            Self::PosCount(pos) => 5 + pos as usize,
        }
    }

    /// Column name stored in models.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TokenCount => "token_count",
            Self::KanjiCount => "kanji_count",
            Self::KanjiRatio => "kanji_ratio",
            Self::UniqueKanjiCount => "unique_kanji_count",
            Self::KatakanaWordCount => "katakana_word_count",
            Self::PosCount(pos) => pos.tag(),
        }
    }

    /// Column names in schema order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        Self::ALL.iter().map(|f| f.name())
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric feature values of one document in [`Feature::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord([f64; N_FEATURES]);

impl Default for FeatureRecord {
    fn default() -> Self {
        Self([0.0; N_FEATURES])
    }
}

impl FeatureRecord {
    /// Gets the value of a feature.
    pub const fn get(&self, feature: Feature) -> f64 {
        self.0[feature.index()]
    }

    /// Values in schema order.
    pub const fn values(&self) -> &[f64; N_FEATURES] {
        &self.0
    }

    /// Pairs of feature and value in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.iter().map(|&f| (f, self.get(f)))
    }

    fn set(&mut self, feature: Feature, value: f64) {
        self.0[feature.index()] = value;
    }
}

impl Index<Feature> for FeatureRecord {
    type Output = f64;

    fn index(&self, feature: Feature) -> &f64 {
        &self.0[feature.index()]
    }
}

/// Derives a [`FeatureRecord`] from script-filtered text and its tokens.
///
/// # Arguments
///
/// * `script_text` - Text restricted to kanji, hiragana and katakana.
/// * `tokens` - Tokens produced from `script_text`, including single-character tokens.
///
/// # Returns
///
/// The feature record. Part-of-speech tags outside [`PartOfSpeech`] are ignored and absent ones
/// count as 0.
pub fn extract_features(script_text: &str, tokens: &[Token]) -> FeatureRecord {
    let mut record = FeatureRecord::default();

    let n_tokens = tokens.iter().filter(|t| t.is_content()).count();
    record.set(Feature::TokenCount, n_tokens as f64);
    record.set(Feature::KanjiCount, script::count_kanji(script_text) as f64);
    record.set(Feature::KanjiRatio, script::script_ratio(script_text));
    record.set(
        Feature::UniqueKanjiCount,
        script::unique_kanji_count(script_text) as f64,
    );
    record.set(
        Feature::KatakanaWordCount,
        script::katakana_word_count(script_text) as f64,
    );

    for pos in tokens.iter().filter_map(|t| PartOfSpeech::from_tag(t.pos())) {
        record.0[Feature::PosCount(pos).index()] += 1.0;
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_order() {
        assert_eq!(16, N_FEATURES);
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(i, f.index());
        }
        let names: Vec<_> = Feature::names().collect();
        assert_eq!(
            vec![
                "token_count",
                "kanji_count",
                "kanji_ratio",
                "unique_kanji_count",
                "katakana_word_count",
                "名詞",
                "動詞",
                "形容詞",
                "副詞",
                "助詞",
                "助動詞",
                "連体詞",
                "感動詞",
                "接続詞",
                "接頭詞",
                "記号",
            ],
            names
        );
    }

    #[test]
    fn test_pos_aliases() {
        assert_eq!(Some(PartOfSpeech::Prefix), PartOfSpeech::from_tag("接頭辞"));
        assert_eq!(Some(PartOfSpeech::Symbol), PartOfSpeech::from_tag("補助記号"));
        assert_eq!(None, PartOfSpeech::from_tag("フィラー"));
        assert_eq!(None, PartOfSpeech::from_tag("その他"));
        for pos in PartOfSpeech::ALL {
            assert_eq!(Some(pos), PartOfSpeech::from_tag(pos.tag()));
        }
    }

    #[test]
    fn test_extract_features() {
        let tokens = vec![
            Token::new("アイスコーヒー", "名詞"),
            Token::new("を", "助詞"),
            Token::new("飲む", "動詞"),
            Token::new("えーと", "フィラー"),
        ];
        let record = extract_features("アイスコーヒーを飲むえーと", &tokens);

        assert_eq!(3.0, record[Feature::TokenCount]);
        assert_eq!(1.0, record[Feature::KanjiCount]);
        assert!((record[Feature::KanjiRatio] - 1.0 / 13.0).abs() < 1e-12);
        assert_eq!(1.0, record[Feature::UniqueKanjiCount]);
        assert_eq!(1.0, record[Feature::KatakanaWordCount]);
        assert_eq!(1.0, record[Feature::PosCount(PartOfSpeech::Noun)]);
        assert_eq!(1.0, record[Feature::PosCount(PartOfSpeech::Particle)]);
        assert_eq!(1.0, record[Feature::PosCount(PartOfSpeech::Verb)]);
        assert_eq!(0.0, record[Feature::PosCount(PartOfSpeech::Symbol)]);
        let total_pos: f64 = PartOfSpeech::ALL
            .iter()
            .map(|&p| record.get(Feature::PosCount(p)))
            .sum();
        assert_eq!(3.0, total_pos);
    }

    #[test]
    fn test_extract_features_empty() {
        assert_eq!(FeatureRecord::default(), extract_features("", &[]));
    }

    #[test]
    fn test_extract_features_is_stable() {
        let tokens = vec![Token::new("日本語", "名詞"), Token::new("です", "助動詞")];
        let a: Vec<_> = extract_features("日本語です", &tokens).iter().collect();
        let b: Vec<_> = extract_features("日本語です", &tokens).iter().collect();
        assert_eq!(a, b);
        assert_eq!(Feature::ALL.to_vec(), a.iter().map(|(f, _)| *f).collect::<Vec<_>>());
    }
}
