//! Adapter normalizing analyzer output into tokens with coarse part-of-speech tags.

use bincode::{Decode, Encode};
use tracing::{debug, warn};

use crate::analyzer::{Analyzer, Morpheme};
use crate::errors::{EstimatorError, Result};
use crate::string_filters::{ControlCharFilter, StringFilter};

/// A token with its coarse part-of-speech tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    surface: String,
    pos: String,
}

impl Token {
    /// Creates a new token.
    pub fn new<S, T>(surface: S, pos: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            surface: surface.into(),
            pos: pos.into(),
        }
    }

    /// Surface string of the token.
    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Top-level part-of-speech category, e.g. `名詞`.
    pub fn pos(&self) -> &str {
        &self.pos
    }

    /// Returns `true` if the token is longer than one character.
    ///
    /// Single-character tokens are dropped from the token count and from the n-gram input.
    pub fn is_content(&self) -> bool {
        self.surface.chars().nth(1).is_some()
    }
}

impl From<Morpheme> for Token {
    fn from(morpheme: Morpheme) -> Self {
        let pos = morpheme.coarse_tag().to_string();
        Self {
            surface: morpheme.surface,
            pos,
        }
    }
}

/// Length limits applied before text reaches the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Decode, Encode)]
pub struct TokenizerConfig {
    /// Texts longer than this (in characters) are truncated.
    pub max_length: usize,

    /// Texts are passed to the analyzer in pieces of at most this many characters.
    ///
    /// A word crossing a chunk boundary is split in two.
    pub chunk_size: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            max_length: 10_000,
            chunk_size: 1_000,
        }
    }
}

impl TokenizerConfig {
    /// Checks the limits.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is zero or `chunk_size` exceeds `max_length`.
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(EstimatorError::invalid_argument(
                "max_length",
                "must be greater than 0",
            ));
        }
        if self.chunk_size == 0 {
            return Err(EstimatorError::invalid_argument(
                "chunk_size",
                "must be greater than 0",
            ));
        }
        if self.chunk_size > self.max_length {
            return Err(EstimatorError::invalid_argument(
                "chunk_size",
                "must not exceed max_length",
            ));
        }
        Ok(())
    }
}

/// Tokenizer adapter.
///
/// Analyzer failures never escape: a failing chunk is logged and skipped.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    /// Creates a new tokenizer.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(config: TokenizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Gets the configuration.
    pub const fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenizes a text.
    ///
    /// # Arguments
    ///
    /// * `analyzer` - Morphological analyzer. Exclusive access is required for the whole call.
    /// * `text` - Input text; `None` stands for a missing value.
    ///
    /// # Returns
    ///
    /// Tokens in text order. Missing, empty or whitespace-only input yields no tokens.
    pub fn tokenize<'a, A, T>(&self, analyzer: &mut A, text: T) -> Vec<Token>
    where
        A: Analyzer + ?Sized,
        T: Into<Option<&'a str>>,
    {
        let Some(text) = text.into() else {
            return vec![];
        };
        let cleaned = ControlCharFilter.filter(text);
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return vec![];
        }

        let chunks = chunk_by_chars(cleaned, self.config.chunk_size, self.config.max_length);
        if chunks.n_dropped_chars != 0 {
            debug!(
                max_length = self.config.max_length,
                dropped = chunks.n_dropped_chars,
                "truncated long input"
            );
        }

        let mut tokens = vec![];
        let mut n_analyzed = 0;
        let mut n_failed = 0;
        for (i, chunk) in chunks.chunks.iter().enumerate() {
            if chunk.trim().is_empty() {
                continue;
            }
            n_analyzed += 1;
            match analyzer.analyze(chunk) {
                Ok(morphemes) => tokens.extend(
                    morphemes
                        .into_iter()
                        .filter(|m| !m.surface.trim().is_empty())
                        .map(Token::from),
                ),
                Err(e) => {
                    n_failed += 1;
                    warn!(
                        analyzer = analyzer.name(),
                        chunk = i,
                        error = %e,
                        "skipping chunk that could not be analyzed"
                    );
                }
            }
        }
        if n_analyzed != 0 && n_failed == n_analyzed {
            warn!(
                analyzer = analyzer.name(),
                n_chunks = n_failed,
                "every chunk failed; treating the text as empty"
            );
        }
        tokens
    }
}

struct Chunks<'a> {
    chunks: Vec<&'a str>,
    n_dropped_chars: usize,
}

/// Splits `text` into slices of at most `chunk_size` characters, ignoring everything after
/// `max_length` characters.
fn chunk_by_chars(text: &str, chunk_size: usize, max_length: usize) -> Chunks<'_> {
    let mut chunks = vec![];
    let mut start = 0;
    let mut n_chars = 0;
    let mut end = text.len();
    let mut n_dropped_chars = 0;
    for (i, (pos, _)) in text.char_indices().enumerate() {
        if i == max_length {
            end = pos;
            n_dropped_chars = text[pos..].chars().count();
            break;
        }
        if n_chars == chunk_size {
            chunks.push(&text[start..pos]);
            start = pos;
            n_chars = 0;
        }
        n_chars += 1;
    }
    if start < end {
        chunks.push(&text[start..end]);
    }
    Chunks {
        chunks,
        n_dropped_chars,
    }
}
