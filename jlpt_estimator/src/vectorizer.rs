//! TF-IDF bag of n-grams concatenated with the numeric feature record.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use bincode::{Decode, Encode};
use regex::Regex;

use crate::errors::{EstimatorError, Result};
use crate::feature::{FeatureRecord, N_FEATURES};

static WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // A constant pattern always compiles.
    Regex::new(r"\b\w+\b").unwrap()
});

/// Parameters of the n-gram vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Decode, Encode)]
pub struct VectorizerConfig {
    /// Maximum number of n-grams kept, selected by corpus frequency.
    pub max_features: usize,

    /// Smallest n-gram length.
    pub min_n: usize,

    /// Largest n-gram length.
    pub max_n: usize,

    /// Lowercases documents before splitting.
    pub lowercase: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            min_n: 1,
            max_n: 2,
            lowercase: true,
        }
    }
}

impl VectorizerConfig {
    /// Checks the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the vocabulary size is zero or the n-gram range is empty.
    pub fn validate(&self) -> Result<()> {
        if self.max_features == 0 {
            return Err(EstimatorError::invalid_argument(
                "max_features",
                "must be greater than 0",
            ));
        }
        if self.min_n == 0 || self.min_n > self.max_n {
            return Err(EstimatorError::invalid_argument(
                "min_n",
                "must satisfy 1 <= min_n <= max_n",
            ));
        }
        Ok(())
    }
}

/// A document turned into model input: sparse n-gram weights followed by the numeric features.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizedSample {
    ngrams: Vec<(u32, f64)>,
    numeric: FeatureRecord,
    n_terms: usize,
}

impl VectorizedSample {
    /// Number of columns of the full vector.
    pub const fn dim(&self) -> usize {
        self.n_terms + N_FEATURES
    }

    /// Non-zero n-gram weights as `(term index, weight)`, sorted by index.
    pub fn ngrams(&self) -> &[(u32, f64)] {
        &self.ngrams
    }

    /// Numeric features.
    pub const fn numeric(&self) -> &FeatureRecord {
        &self.numeric
    }

    /// Iterates over non-zero columns of the concatenated vector as `(column, value)`.
    ///
    /// N-gram columns come first, numeric features follow at `n_terms + feature index`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        let offset = self.n_terms;
        self.ngrams
            .iter()
            .map(|&(i, v)| (i as usize, v))
            .chain(
                self.numeric
                    .values()
                    .iter()
                    .enumerate()
                    .map(move |(i, &v)| (offset + i, v)),
            )
            .filter(|&(_, v)| v != 0.0)
    }
}

/// Fitted TF-IDF vocabulary.
///
/// Terms are kept in lexicographic order; a term's column is its position in that order.
#[derive(Debug, Clone, PartialEq, Decode, Encode)]
pub struct Vectorizer {
    config: VectorizerConfig,
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl Vectorizer {
    /// Fits a vocabulary on tokenized documents.
    ///
    /// # Arguments
    ///
    /// * `documents` - Documents whose tokens are separated by whitespace.
    /// * `config` - Vocabulary parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn fit<I, S>(documents: I, config: VectorizerConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        config.validate()?;

        let mut n_docs = 0usize;
        // term -> (total frequency, document frequency)
        let mut stats: HashMap<String, (usize, usize)> = HashMap::new();
        for doc in documents {
            n_docs += 1;
            for (term, count) in count_ngrams(doc.as_ref(), &config) {
                let entry = stats.entry(term).or_default();
                entry.0 += count;
                entry.1 += 1;
            }
        }

        let mut ranked: Vec<_> = stats.into_iter().collect();
        ranked.sort_unstable_by(|(t1, (tf1, _)), (t2, (tf2, _))| tf2.cmp(tf1).then(t1.cmp(t2)));
        ranked.truncate(config.max_features);
        ranked.sort_unstable_by(|(t1, _), (t2, _)| t1.cmp(t2));

        let n = n_docs as f64;
        let (terms, idf) = ranked
            .into_iter()
            .map(|(term, (_, df))| (term, ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .unzip();

        Ok(Self { config, terms, idf })
    }

    /// Gets the configuration.
    pub const fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// Number of n-gram columns.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Vocabulary in column order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Inverse document frequencies in column order.
    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Number of columns of a transformed sample.
    pub fn dim(&self) -> usize {
        self.terms.len() + N_FEATURES
    }

    /// Column of a term, if it is in the vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }

    /// Transforms a tokenized document and its numeric features.
    ///
    /// Terms outside the vocabulary are ignored. The n-gram part is L2-normalized.
    pub fn transform(&self, document: &str, features: FeatureRecord) -> VectorizedSample {
        let mut ngrams: Vec<(u32, f64)> = count_ngrams(document, &self.config)
            .into_iter()
            .filter_map(|(term, count)| {
                let idx = self.term_index(&term)?;
                Some((idx as u32, count as f64 * self.idf[idx]))
            })
            .collect();
        ngrams.sort_unstable_by_key(|&(i, _)| i);

        let norm = ngrams.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut ngrams {
                *v /= norm;
            }
        }

        VectorizedSample {
            ngrams,
            numeric: features,
            n_terms: self.terms.len(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if self.terms.len() != self.idf.len() {
            return Err(EstimatorError::invalid_model(
                "vocabulary and idf lengths differ",
            ));
        }
        if self.terms.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EstimatorError::invalid_model(
                "vocabulary is not strictly sorted",
            ));
        }
        if self.idf.iter().any(|v| !v.is_finite()) {
            return Err(EstimatorError::invalid_model("idf contains a non-finite value"));
        }
        Ok(())
    }
}

/// Counts the n-grams of a document. Words are `\w+` runs; n-grams join words with one space.
fn count_ngrams(document: &str, config: &VectorizerConfig) -> BTreeMap<String, usize> {
    let document = if config.lowercase {
        document.to_lowercase()
    } else {
        document.to_string()
    };
    let words: Vec<&str> = WORD_PATTERN
        .find_iter(&document)
        .map(|m| m.as_str())
        .collect();

    let mut counts = BTreeMap::new();
    for n in config.min_n..=config.max_n {
        for window in words.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::feature::Feature;

    const CORPUS: &[&str] = &[
        "日本 語 勉強 する",
        "日本 語 難しい",
        "勉強 する 毎日",
        "猫 可愛い",
    ];

    #[test]
    fn test_count_ngrams() {
        let counts = count_ngrams("猫 猫 犬", &VectorizerConfig::default());
        assert_eq!(Some(&2), counts.get("猫"));
        assert_eq!(Some(&1), counts.get("犬"));
        assert_eq!(Some(&1), counts.get("猫 猫"));
        assert_eq!(Some(&1), counts.get("猫 犬"));
        assert_eq!(4, counts.len());
    }

    #[test]
    fn test_count_ngrams_lowercase() {
        let counts = count_ngrams("Tokyo TOKYO", &VectorizerConfig::default());
        assert_eq!(Some(&2), counts.get("tokyo"));
    }

    #[test]
    fn test_fit_vocabulary() {
        let v = Vectorizer::fit(CORPUS, VectorizerConfig::default()).unwrap();
        assert!(v.terms().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(v.terms().len(), v.idf().len());
        assert!(v.term_index("日本 語").is_some());
        assert!(v.term_index("勉強 する").is_some());
        assert!(v.term_index("存在しない").is_none());
        // "日本" appears in 2 of 4 documents
        let idf = v.idf()[v.term_index("日本").unwrap()];
        assert!((idf - ((5.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_fit_max_features() {
        let config = VectorizerConfig {
            max_features: 3,
            ..VectorizerConfig::default()
        };
        let v = Vectorizer::fit(CORPUS, config).unwrap();
        // the three most frequent n-grams; ties are broken alphabetically
        assert_eq!(vec!["する", "勉強", "勉強 する"], v.terms());
    }

    #[test]
    fn test_fit_invalid_config() {
        let config = VectorizerConfig {
            min_n: 3,
            max_n: 2,
            ..VectorizerConfig::default()
        };
        assert!(Vectorizer::fit(CORPUS, config).is_err());
    }

    #[test]
    fn test_transform() {
        let v = Vectorizer::fit(CORPUS, VectorizerConfig::default()).unwrap();
        let sample = v.transform("猫 可愛い 未知語", FeatureRecord::default());
        assert_eq!(v.len() + 16, sample.dim());
        assert_eq!(3, sample.ngrams().len());
        let norm: f64 = sample.ngrams().iter().map(|(_, x)| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(sample.ngrams().windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_transform_unknown_only() {
        let v = Vectorizer::fit(CORPUS, VectorizerConfig::default()).unwrap();
        let sample = v.transform("未知語", FeatureRecord::default());
        assert!(sample.ngrams().is_empty());
        assert_eq!(0, sample.iter().count());
    }

    #[test]
    fn test_transform_is_deterministic() {
        let v1 = Vectorizer::fit(CORPUS, VectorizerConfig::default()).unwrap();
        let v2 = Vectorizer::fit(CORPUS, VectorizerConfig::default()).unwrap();
        assert_eq!(v1, v2);
        for doc in CORPUS {
            let a = v1.transform(doc, FeatureRecord::default());
            let b = v1.transform(doc, FeatureRecord::default());
            let c = v2.transform(doc, FeatureRecord::default());
            assert_eq!(a, b);
            assert_eq!(a, c);
        }
    }

    #[test]
    fn test_sample_iter_concatenation() {
        let v = Vectorizer::fit(CORPUS, VectorizerConfig::default()).unwrap();
        let tokens = vec![crate::tokenizer::Token::new("猫", "名詞")];
        let record = crate::feature::extract_features("猫", &tokens);
        let sample = v.transform("猫", record);
        let columns: Vec<_> = sample.iter().collect();
        let cat = v.term_index("猫").unwrap();
        assert_eq!(cat, columns[0].0);
        assert!((columns[0].1 - 1.0).abs() < 1e-12);
        // kanji_count, kanji_ratio, unique_kanji_count and the noun count
        assert_eq!(
            vec![
                v.len() + Feature::KanjiCount.index(),
                v.len() + Feature::KanjiRatio.index(),
                v.len() + Feature::UniqueKanjiCount.index(),
                v.len() + Feature::ALL[5].index(),
            ],
            columns[1..].iter().map(|&(i, _)| i).collect::<Vec<_>>()
        );
    }
}
