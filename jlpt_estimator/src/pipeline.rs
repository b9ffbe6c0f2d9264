use crate::analyzer::Analyzer;
use crate::errors::Result;
use crate::feature::{extract_features, FeatureRecord};
use crate::string_filters::{AllowListFilter, JapaneseScriptFilter, StringFilter};
use crate::tokenizer::{Token, Tokenizer, TokenizerConfig};

/// Intermediate results of [`TextPipeline::process`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedText {
    /// Input restricted to kanji, hiragana and katakana.
    pub script_text: String,

    /// Tokens of `script_text`, including single-character ones.
    pub tokens: Vec<Token>,

    /// Surfaces of multi-character tokens joined by single spaces; the n-gram input.
    pub joined: String,

    /// Numeric features.
    pub features: FeatureRecord,
}

/// Text transformation shared by training and inference.
///
/// clean → script-filter → tokenize → featurize. Vectorization is left to the caller, which
/// holds the fitted vocabulary.
#[derive(Debug, Clone)]
pub struct TextPipeline {
    tokenizer: Tokenizer,
}

impl TextPipeline {
    /// Creates a pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(config: TokenizerConfig) -> Result<Self> {
        Ok(Self {
            tokenizer: Tokenizer::new(config)?,
        })
    }

    pub const fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Runs the transformation on one document.
    pub fn process<A>(&self, analyzer: &mut A, raw: &str) -> ProcessedText
    where
        A: Analyzer + ?Sized,
    {
        let cleaned = AllowListFilter.filter(raw);
        let script_text = JapaneseScriptFilter.filter(&cleaned);
        let tokens = self.tokenizer.tokenize(analyzer, script_text.as_str());
        let features = extract_features(&script_text, &tokens);
        let joined = tokens
            .iter()
            .filter(|t| t.is_content())
            .map(Token::surface)
            .collect::<Vec<_>>()
            .join(" ");
        ProcessedText {
            script_text,
            tokens,
            joined,
            features,
        }
    }
}
