//! Classification metrics.

use std::fmt;

use crate::level::JlptLevel;

/// Precision, recall and F1 score of one level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelMetrics {
    pub level: JlptLevel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,

    /// Number of gold documents of the level.
    pub support: usize,
}

/// Confusion matrix over the five levels.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Evaluation {
    // counts[gold][predicted]
    counts: [[usize; 5]; 5],
}

impl Evaluation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one prediction.
    pub fn add(&mut self, gold: JlptLevel, predicted: JlptLevel) {
        self.counts[gold.index()][predicted.index()] += 1;
    }

    /// Number of recorded predictions.
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Number of documents of level `gold` predicted as `predicted`.
    pub const fn count(&self, gold: JlptLevel, predicted: JlptLevel) -> usize {
        self.counts[gold.index()][predicted.index()]
    }

    /// Ratio of correct predictions; 0 if nothing was recorded.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: usize = (0..5).map(|i| self.counts[i][i]).sum();
        correct as f64 / total as f64
    }

    /// Metrics of one level. Undefined ratios are reported as 0.
    pub fn level_metrics(&self, level: JlptLevel) -> LevelMetrics {
        let i = level.index();
        let tp = self.counts[i][i] as f64;
        let support: usize = self.counts[i].iter().sum();
        let n_predicted: usize = self.counts.iter().map(|row| row[i]).sum();
        let ratio = |a: f64, b: usize| if b == 0 { 0.0 } else { a / b as f64 };
        let precision = ratio(tp, n_predicted);
        let recall = ratio(tp, support);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        LevelMetrics {
            level,
            precision,
            recall,
            f1,
            support,
        }
    }

    /// Metrics of the levels that occur as gold labels or predictions.
    pub fn metrics(&self) -> Vec<LevelMetrics> {
        JlptLevel::ALL
            .iter()
            .filter(|l| {
                let i = l.index();
                self.counts[i].iter().sum::<usize>() != 0 || self.counts.iter().any(|r| r[i] != 0)
            })
            .map(|&l| self.level_metrics(l))
            .collect()
    }

    /// Unweighted mean F1 score over [`Evaluation::metrics`].
    pub fn macro_f1(&self) -> f64 {
        let metrics = self.metrics();
        if metrics.is_empty() {
            return 0.0;
        }
        metrics.iter().map(|m| m.f1).sum::<f64>() / metrics.len() as f64
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{:>6} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for m in self.metrics() {
            writeln!(
                f,
                "{:>6} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                m.level.to_string(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "accuracy: {:.4} ({} documents), macro F1: {:.4}",
            self.accuracy(),
            self.total(),
            self.macro_f1()
        )?;
        writeln!(f)?;
        write!(f, "{:>9}", "gold\\pred")?;
        for level in JlptLevel::ALL {
            write!(f, " {:>6}", level.to_string())?;
        }
        writeln!(f)?;
        for gold in JlptLevel::ALL {
            write!(f, "{:>9}", gold.to_string())?;
            for predicted in JlptLevel::ALL {
                write!(f, " {:>6}", self.count(gold, predicted))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
