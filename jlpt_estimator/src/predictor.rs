use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::warn;

use crate::analyzer::Analyzer;
use crate::classifier::argmax;
use crate::errors::{EstimatorError, PredictError, Result};
use crate::level::JlptLevel;
use crate::model::Model;
use crate::pipeline::{ProcessedText, TextPipeline};

/// Result of [`Estimator::predict`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    level: JlptLevel,
    probabilities: BTreeMap<JlptLevel, f64>,
    processed: ProcessedText,
}

impl Prediction {
    /// Most probable level.
    pub const fn level(&self) -> JlptLevel {
        self.level
    }

    /// Probability of every level, iterated from N1 to N5. Sums to 1.
    pub const fn probabilities(&self) -> &BTreeMap<JlptLevel, f64> {
        &self.probabilities
    }

    /// Probability of one level.
    pub fn probability(&self, level: JlptLevel) -> f64 {
        self.probabilities.get(&level).copied().unwrap_or_default()
    }

    /// Intermediate results of the text transformation.
    pub const fn processed(&self) -> &ProcessedText {
        &self.processed
    }
}

/// Inference facade.
///
/// Loads nothing by itself: the caller provides a [`Model`] and an analyzer. The model is
/// read-only after construction. The analyzer is locked for the duration of each tokenization, so
/// an estimator can be shared between threads.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
///
/// use jlpt_estimator::{Estimator, Model, VaporettoAnalyzer};
///
/// let mut f = BufReader::new(File::open("jlpt-model.bin").unwrap());
/// let model = Model::read(&mut f).unwrap();
/// let mut f = BufReader::new(File::open("vaporetto-tag.model").unwrap());
/// let analyzer = VaporettoAnalyzer::read(&mut f).unwrap();
///
/// let estimator = Estimator::new(model, analyzer).unwrap();
/// let prediction = estimator.predict("これは簡単な文章です。").unwrap();
/// println!("{}", prediction.level());
/// ```
pub struct Estimator<A> {
    model: Model,
    pipeline: TextPipeline,
    analyzer: Mutex<A>,
}

impl<A> Estimator<A>
where
    A: Analyzer,
{
    /// Creates an estimator.
    ///
    /// A model trained with a different analyzer is accepted with a warning, since token
    /// boundaries and tags then differ from training.
    ///
    /// # Errors
    ///
    /// Returns an error if the model's tokenizer configuration is invalid.
    pub fn new(model: Model, analyzer: A) -> Result<Self> {
        if model.analyzer() != analyzer.name() {
            warn!(
                trained_with = model.analyzer(),
                running_with = analyzer.name(),
                "the model was trained with a different analyzer"
            );
        }
        let pipeline = TextPipeline::new(*model.tokenizer_config())?;
        Ok(Self {
            model,
            pipeline,
            analyzer: Mutex::new(analyzer),
        })
    }

    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// Runs the training-time text transformation on `text`.
    pub fn process(&self, text: &str) -> ProcessedText {
        let mut analyzer = self.analyzer.lock();
        self.pipeline.process(&mut *analyzer, text)
    }

    /// Estimates the JLPT level of a text.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::EmptyInput`] if `text` is empty or whitespace only, and
    /// [`PredictError::Failed`] if the model cannot score the text.
    pub fn predict(&self, text: &str) -> Result<Prediction, PredictError> {
        if text.trim().is_empty() {
            return Err(PredictError::EmptyInput);
        }
        let processed = self.process(text);
        let sample = self
            .model
            .vectorizer()
            .transform(&processed.joined, processed.features);
        let probabilities = self.model.predict_proba(&sample)?;
        let level = argmax(&probabilities)
            .ok_or_else(|| EstimatorError::invalid_model("the model has no labels"))?;
        Ok(Prediction {
            level,
            probabilities,
            processed,
        })
    }
}
