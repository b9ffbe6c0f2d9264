//! Seam to external morphological analyzers.

use crate::errors::Result;

/// A morpheme returned by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    /// Surface string.
    pub surface: String,

    /// Part-of-speech tag in the analyzer's own notation, e.g. `名詞,一般,*,*` or `名詞-普通名詞`.
    /// Empty if the analyzer did not assign a tag.
    pub tag: String,
}

impl Morpheme {
    /// Creates a new morpheme.
    pub fn new<S, T>(surface: S, tag: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            surface: surface.into(),
            tag: tag.into(),
        }
    }

    /// Returns the top-level category of the tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use jlpt_estimator::Morpheme;
    ///
    /// assert_eq!("名詞", Morpheme::new("東京", "名詞,固有名詞,地域,一般").coarse_tag());
    /// assert_eq!("動詞", Morpheme::new("行く", "動詞-一般").coarse_tag());
    /// ```
    pub fn coarse_tag(&self) -> &str {
        self.tag
            .split([',', '-'])
            .next()
            .unwrap_or_default()
            .trim()
    }
}

/// Morphological analyzer.
///
/// `analyze` takes `&mut self`: an analyzer instance must never be used from two threads at once.
/// Share one behind a lock, or create one instance per thread.
pub trait Analyzer {
    /// Name identifying the analyzer and its dictionary. It is stored in trained models.
    fn name(&self) -> &str;

    /// Splits `text` into morphemes.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::Analyzer`](crate::EstimatorError::Analyzer) when the underlying
    /// analyzer cannot process the text.
    fn analyze(&mut self, text: &str) -> Result<Vec<Morpheme>>;
}

impl<A> Analyzer for Box<A>
where
    A: Analyzer + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn analyze(&mut self, text: &str) -> Result<Vec<Morpheme>> {
        (**self).analyze(text)
    }
}

#[cfg(feature = "vaporetto")]
mod vaporetto_analyzer {
    use std::io::Read;

    use vaporetto::{Model, Predictor, Sentence};

    use super::{Analyzer, Morpheme};
    use crate::errors::{EstimatorError, Result};

    /// Analyzer backed by Vaporetto with tag prediction.
    ///
    /// The model must have been trained with POS tags (e.g. a `+unidic` or `+tag` model); the first
    /// tag of each token is used as its part of speech.
    pub struct VaporettoAnalyzer {
        predictor: Predictor,
    }

    impl VaporettoAnalyzer {
        /// Creates an analyzer from a Vaporetto model.
        ///
        /// # Errors
        ///
        /// Returns an error if the model cannot be compiled into a predictor.
        pub fn new(model: Model) -> Result<Self> {
            let predictor =
                Predictor::new(model, true).map_err(|e| EstimatorError::analyzer(e.to_string()))?;
            Ok(Self { predictor })
        }

        /// Reads an uncompressed Vaporetto model and creates an analyzer.
        ///
        /// # Errors
        ///
        /// Returns an error if the model is broken.
        pub fn read<R>(rdr: &mut R) -> Result<Self>
        where
            R: Read,
        {
            let model = Model::read(rdr).map_err(|e| EstimatorError::analyzer(e.to_string()))?;
            Self::new(model)
        }
    }

    impl Analyzer for VaporettoAnalyzer {
        fn name(&self) -> &str {
            "vaporetto"
        }

        fn analyze(&mut self, text: &str) -> Result<Vec<Morpheme>> {
            let mut s =
                Sentence::from_raw(text).map_err(|e| EstimatorError::analyzer(e.to_string()))?;
            self.predictor.predict(&mut s);
            s.fill_tags();
            Ok(s.iter_tokens()
                .map(|token| {
                    let tag = token
                        .tags()
                        .first()
                        .and_then(|tag| tag.as_deref())
                        .unwrap_or_default();
                    Morpheme::new(token.surface(), tag)
                })
                .collect())
        }
    }
}

#[cfg(feature = "vaporetto")]
pub use vaporetto_analyzer::VaporettoAnalyzer;

#[cfg(feature = "lindera")]
mod lindera_analyzer {
    use lindera::dictionary::load_dictionary;
    use lindera::mode::Mode;
    use lindera::segmenter::Segmenter;
    use lindera::tokenizer::Tokenizer;

    use super::{Analyzer, Morpheme};
    use crate::errors::{EstimatorError, Result};

    /// Analyzer backed by Lindera with the embedded IPADIC dictionary.
    pub struct LinderaAnalyzer {
        tokenizer: Tokenizer,
    }

    impl LinderaAnalyzer {
        /// Loads the embedded IPADIC dictionary.
        ///
        /// # Errors
        ///
        /// Returns an error if the dictionary cannot be loaded.
        pub fn new() -> Result<Self> {
            let dictionary = load_dictionary("embedded://ipadic")
                .map_err(|e| EstimatorError::analyzer(format!("failed to load IPADIC: {e}")))?;
            let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
            Ok(Self {
                tokenizer: Tokenizer::new(segmenter),
            })
        }
    }

    impl Analyzer for LinderaAnalyzer {
        fn name(&self) -> &str {
            "lindera-ipadic"
        }

        fn analyze(&mut self, text: &str) -> Result<Vec<Morpheme>> {
            let mut tokens = self
                .tokenizer
                .tokenize(text)
                .map_err(|e| EstimatorError::analyzer(e.to_string()))?;
            let mut morphemes = Vec::with_capacity(tokens.len());
            for token in tokens.iter_mut() {
                let surface = token.surface.to_string();
                let tag = token.details().join(",");
                morphemes.push(Morpheme { surface, tag });
            }
            Ok(morphemes)
        }
    }
}

#[cfg(feature = "lindera")]
pub use lindera_analyzer::LinderaAnalyzer;

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic analyzers used by unit tests.

    use super::{Analyzer, Morpheme};
    use crate::errors::{EstimatorError, Result};
    use crate::script::ScriptType;

    /// Splits text into runs of the same script.
    ///
    /// Kanji and katakana runs are tagged as nouns, hiragana runs as particles, everything else as
    /// symbols. Whitespace separates runs and is dropped.
    #[derive(Default)]
    pub struct ScriptRunAnalyzer {
        pub n_calls: usize,
    }

    impl ScriptRunAnalyzer {
        fn tag(t: ScriptType) -> &'static str {
            match t {
                ScriptType::Kanji | ScriptType::Katakana => "名詞,一般,*,*",
                ScriptType::Hiragana => "助詞,格助詞,一般,*",
                ScriptType::Other => "記号,一般,*,*",
            }
        }
    }

    impl Analyzer for ScriptRunAnalyzer {
        fn name(&self) -> &str {
            "script-run"
        }

        fn analyze(&mut self, text: &str) -> Result<Vec<Morpheme>> {
            self.n_calls += 1;
            let mut morphemes = vec![];
            let mut current = String::new();
            let mut current_type = ScriptType::Other;
            for c in text.chars() {
                let t = ScriptType::of(c);
                if c.is_whitespace() || (!current.is_empty() && t != current_type) {
                    if !current.is_empty() {
                        morphemes.push(Morpheme::new(
                            std::mem::take(&mut current),
                            Self::tag(current_type),
                        ));
                    }
                }
                if !c.is_whitespace() {
                    current.push(c);
                    current_type = t;
                }
            }
            if !current.is_empty() {
                morphemes.push(Morpheme::new(current, Self::tag(current_type)));
            }
            Ok(morphemes)
        }
    }

    /// Fails on every input containing `marker`, otherwise behaves like [`ScriptRunAnalyzer`].
    pub struct FlakyAnalyzer {
        pub marker: char,
        pub inner: ScriptRunAnalyzer,
    }

    impl Analyzer for FlakyAnalyzer {
        fn name(&self) -> &str {
            "flaky"
        }

        fn analyze(&mut self, text: &str) -> Result<Vec<Morpheme>> {
            if text.contains(self.marker) {
                return Err(EstimatorError::analyzer("simulated analyzer crash"));
            }
            self.inner.analyze(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptRunAnalyzer;
    use super::*;

    #[test]
    fn test_coarse_tag() {
        assert_eq!("助詞", Morpheme::new("は", "助詞,係助詞,*,*").coarse_tag());
        assert_eq!("補助記号", Morpheme::new("。", "補助記号-句点").coarse_tag());
        assert_eq!("名詞", Morpheme::new("猫", "名詞").coarse_tag());
        assert_eq!("", Morpheme::new("猫", "").coarse_tag());
    }

    #[test]
    fn test_script_run_analyzer() {
        let mut analyzer = ScriptRunAnalyzer::default();
        let morphemes = analyzer.analyze("これは簡単な文章です").unwrap();
        let surfaces: Vec<_> = morphemes.iter().map(|m| m.surface.as_str()).collect();
        assert_eq!(vec!["これは", "簡単", "な", "文章", "です"], surfaces);
        assert_eq!("名詞", morphemes[1].coarse_tag());
        assert_eq!("助詞", morphemes[2].coarse_tag());
    }

    #[test]
    fn test_boxed_analyzer() {
        let mut analyzer: Box<dyn Analyzer> = Box::new(ScriptRunAnalyzer::default());
        assert_eq!("script-run", analyzer.name());
        assert_eq!(2, analyzer.analyze("猫 犬").unwrap().len());
    }
}

#[cfg(all(test, feature = "lindera"))]
mod lindera_tests {
    use super::*;

    use crate::feature::PartOfSpeech;

    #[test]
    fn test_lindera_tags_reduce_to_pos() {
        let mut analyzer = LinderaAnalyzer::new().unwrap();
        let text = "これは簡単な文章です";
        let morphemes = analyzer.analyze(text).unwrap();

        let surfaces: String = morphemes.iter().map(|m| m.surface.as_str()).collect();
        assert_eq!(text, surfaces);

        let pos: Vec<_> = morphemes
            .iter()
            .map(|m| PartOfSpeech::from_tag(m.coarse_tag()))
            .collect();
        assert!(pos.iter().all(Option::is_some), "{morphemes:?}");
        for expected in [
            PartOfSpeech::Noun,
            PartOfSpeech::Particle,
            PartOfSpeech::AuxiliaryVerb,
        ] {
            assert!(pos.contains(&Some(expected)), "{morphemes:?}");
        }
    }
}
