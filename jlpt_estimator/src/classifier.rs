//! Linear classifier and feature scaling stored in trained models.

use std::collections::BTreeMap;

use bincode::{Decode, Encode};

use crate::errors::{EstimatorError, Result};
use crate::level::JlptLevel;

/// Scales each column by the inverse of its standard deviation. Columns are not centered, so
/// sparse inputs stay sparse.
#[derive(Debug, Clone, PartialEq, Decode, Encode)]
pub struct Scaler {
    scale: Vec<f64>,
}

impl Scaler {
    /// Computes per-column population standard deviations.
    ///
    /// # Arguments
    ///
    /// * `rows` - Non-zero `(column, value)` pairs of each row. Columns not listed are 0.
    /// * `dim` - Number of columns.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no rows or a column is out of range.
    pub fn fit<I, R>(rows: I, dim: usize) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (usize, f64)>,
    {
        let mut sum = vec![0.0; dim];
        let mut sum_sq = vec![0.0; dim];
        let mut n_rows = 0usize;
        for row in rows {
            n_rows += 1;
            for (i, v) in row {
                if i >= dim {
                    return Err(EstimatorError::invalid_argument(
                        "rows",
                        format!("column {i} is out of range"),
                    ));
                }
                sum[i] += v;
                sum_sq[i] += v * v;
            }
        }
        if n_rows == 0 {
            return Err(EstimatorError::invalid_argument("rows", "must not be empty"));
        }

        let n = n_rows as f64;
        let scale = sum
            .into_iter()
            .zip(sum_sq)
            .map(|(s, sq)| {
                let mean = s / n;
                let std = (sq / n - mean * mean).max(0.0).sqrt();
                // constant columns are left as they are
                if std < 10.0 * f64::EPSILON * mean.abs().max(1.0) {
                    1.0
                } else {
                    std
                }
            })
            .collect();
        Ok(Self { scale })
    }

    /// Number of columns.
    pub fn dim(&self) -> usize {
        self.scale.len()
    }

    /// Per-column divisors.
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Scales one value.
    #[inline(always)]
    pub fn apply(&self, column: usize, value: f64) -> f64 {
        value / self.scale[column]
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.scale.iter().any(|&s| !s.is_finite() || s <= 0.0) {
            return Err(EstimatorError::invalid_model(
                "scale must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// One-vs-rest linear classifier over JLPT levels.
#[derive(Debug, Clone, PartialEq, Decode, Encode)]
pub struct LinearClassifier {
    labels: Vec<JlptLevel>,
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl LinearClassifier {
    /// Creates a classifier.
    ///
    /// # Arguments
    ///
    /// * `labels` - Known levels.
    /// * `weights` - One weight vector per label, all of the same length.
    /// * `bias` - One bias term per label.
    ///
    /// # Errors
    ///
    /// Returns an error if the shapes disagree or labels are empty or duplicated.
    pub fn new(labels: Vec<JlptLevel>, weights: Vec<Vec<f64>>, bias: Vec<f64>) -> Result<Self> {
        let classifier = Self {
            labels,
            weights,
            bias,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    /// Levels known to the classifier in training order.
    pub fn labels(&self) -> &[JlptLevel] {
        &self.labels
    }

    /// Weight vector of each label.
    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    /// Bias of each label.
    pub fn bias(&self) -> &[f64] {
        &self.bias
    }

    /// Number of input columns.
    pub fn dim(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    /// Decision score of every label.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is out of range or a score is not finite.
    pub fn scores<I>(&self, columns: I) -> Result<Vec<f64>>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let dim = self.dim();
        let mut scores = self.bias.clone();
        for (i, v) in columns {
            if i >= dim {
                return Err(EstimatorError::invalid_argument(
                    "columns",
                    format!("column {i} exceeds the model dimension {dim}"),
                ));
            }
            for (score, w) in scores.iter_mut().zip(&self.weights) {
                *score += w[i] * v;
            }
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(EstimatorError::invalid_argument(
                "columns",
                "decision score is not finite",
            ));
        }
        Ok(scores)
    }

    /// Probability of every JLPT level.
    ///
    /// Each label's logistic score is normalized over all labels. Levels the classifier does not
    /// know get probability 0.
    ///
    /// # Errors
    ///
    /// See [`LinearClassifier::scores`].
    pub fn predict_proba<I>(&self, columns: I) -> Result<BTreeMap<JlptLevel, f64>>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let scores = self.scores(columns)?;
        let mut probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
        let total: f64 = probs.iter().sum();
        if total > 0.0 {
            probs.iter_mut().for_each(|p| *p /= total);
        } else {
            // every sigmoid underflowed; softmax over the raw scores keeps the ranking
            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
            let total: f64 = exps.iter().sum();
            probs = exps.into_iter().map(|e| e / total).collect();
        }

        let mut result: BTreeMap<_, _> = JlptLevel::ALL.iter().map(|&l| (l, 0.0)).collect();
        for (&label, p) in self.labels.iter().zip(probs) {
            result.insert(label, p);
        }
        Ok(result)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(EstimatorError::invalid_model("no labels"));
        }
        let mut sorted = self.labels.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != self.labels.len() {
            return Err(EstimatorError::invalid_model("duplicated labels"));
        }
        if self.weights.len() != self.labels.len() || self.bias.len() != self.labels.len() {
            return Err(EstimatorError::invalid_model(
                "weights and bias must have one entry per label",
            ));
        }
        let dim = self.dim();
        if self.weights.iter().any(|w| w.len() != dim) {
            return Err(EstimatorError::invalid_model(
                "weight vectors have different lengths",
            ));
        }
        if self
            .weights
            .iter()
            .flatten()
            .chain(&self.bias)
            .any(|w| !w.is_finite())
        {
            return Err(EstimatorError::invalid_model("weights must be finite"));
        }
        Ok(())
    }
}

#[inline(always)]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Returns the level with the highest probability. Ties go to the harder level.
pub fn argmax(probabilities: &BTreeMap<JlptLevel, f64>) -> Option<JlptLevel> {
    probabilities
        .iter()
        .fold(None, |best: Option<(JlptLevel, f64)>, (&l, &p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((l, p)),
        })
        .map(|(l, _)| l)
}
