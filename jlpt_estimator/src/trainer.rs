use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use liblinear::LibLinearModel;
use tracing::{debug, info};

use crate::analyzer::Analyzer;
use crate::classifier::{LinearClassifier, Scaler};
use crate::errors::{EstimatorError, Result};
use crate::feature::FeatureRecord;
use crate::level::JlptLevel;
use crate::model::Model;
use crate::pipeline::TextPipeline;
use crate::tokenizer::TokenizerConfig;
use crate::vectorizer::{Vectorizer, VectorizerConfig};

/// Solver type. Only solvers of logistic regression are offered, since the model reports
/// probabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverType {
    /// L2-regularized logistic regression (primal).
    L2RegularizedLogistic = 0,

    /// L1-regularized logistic regression
    L1RegularizedLogistic = 6,

    /// L2-regularized logistic regression (dual).
    L2RegularizedLogisticDual = 7,
}

impl FromStr for SolverType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Self::L2RegularizedLogistic),
            "6" => Ok(Self::L1RegularizedLogistic),
            "7" => Ok(Self::L2RegularizedLogisticDual),
            _ => Err("Unsupported solver type."),
        }
    }
}

impl From<SolverType> for liblinear::SolverType {
    fn from(solver: SolverType) -> Self {
        match solver {
            SolverType::L2RegularizedLogistic => Self::L2R_LR,
            SolverType::L1RegularizedLogistic => Self::L1R_LR,
            SolverType::L2RegularizedLogisticDual => Self::L2R_LR_DUAL,
        }
    }
}

/// Weighting of the misclassification cost of each level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClassWeight {
    /// Weights each level by `n_samples / (n_levels * n_samples_of_level)`, so that rare levels
    /// count as much as frequent ones.
    #[default]
    Balanced,

    /// Every document has the same cost.
    None,
}

/// Hyperparameters of the classifier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainerConfig {
    /// The tolerance of the termination criterion.
    pub epsilon: f64,

    /// The parameter C.
    pub cost: f64,

    pub solver: SolverType,

    pub class_weight: ClassWeight,

    /// Divides every column by its standard deviation before training.
    pub scale: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            cost: 1.0,
            solver: SolverType::L2RegularizedLogistic,
            class_weight: ClassWeight::Balanced,
            scale: true,
        }
    }
}

struct Example {
    joined: String,
    features: FeatureRecord,
    level: JlptLevel,
}

/// Trainer.
///
/// # Examples
///
/// ```no_run
/// use std::fs::File;
/// use std::io::{BufReader, BufWriter};
///
/// use jlpt_estimator::{
///     dataset, Trainer, TrainerConfig, TokenizerConfig, VaporettoAnalyzer, VectorizerConfig,
/// };
///
/// let mut f = BufReader::new(File::open("vaporetto-tag.model").unwrap());
/// let mut analyzer = VaporettoAnalyzer::read(&mut f).unwrap();
/// let documents = dataset::read_documents(File::open("dataset.csv").unwrap()).unwrap();
///
/// let mut trainer =
///     Trainer::new("vaporetto", TokenizerConfig::default(), VectorizerConfig::default()).unwrap();
/// for doc in &documents {
///     trainer.push_document(&mut analyzer, &doc.text, doc.level);
/// }
///
/// let model = trainer.train(&TrainerConfig::default()).unwrap();
/// let mut f = BufWriter::new(File::create("jlpt-model.bin").unwrap());
/// model.write(&mut f).unwrap();
/// ```
#[cfg_attr(docsrs, doc(cfg(feature = "train")))]
pub struct Trainer {
    analyzer: String,
    pipeline: TextPipeline,
    vectorizer_config: VectorizerConfig,
    examples: Vec<Example>,
}

impl Trainer {
    /// Creates a new trainer.
    ///
    /// # Arguments
    ///
    /// * `analyzer` - Name of the analyzer that will tokenize the documents.
    /// * `tokenizer_config` - Tokenizer limits. Inference reuses them.
    /// * `vectorizer_config` - Vocabulary parameters.
    ///
    /// # Errors
    ///
    /// If invalid parameters are given, an error variant will be returned.
    pub fn new<S>(
        analyzer: S,
        tokenizer_config: TokenizerConfig,
        vectorizer_config: VectorizerConfig,
    ) -> Result<Self>
    where
        S: Into<String>,
    {
        vectorizer_config.validate()?;
        Ok(Self {
            analyzer: analyzer.into(),
            pipeline: TextPipeline::new(tokenizer_config)?,
            vectorizer_config,
            examples: vec![],
        })
    }

    /// Transforms a document and adds it to the dataset.
    ///
    /// # Arguments
    ///
    /// * `analyzer` - The analyzer named in [`Trainer::new`].
    /// * `text` - Raw text.
    /// * `level` - Gold level.
    pub fn push_document<A>(&mut self, analyzer: &mut A, text: &str, level: JlptLevel)
    where
        A: Analyzer + ?Sized,
    {
        let processed = self.pipeline.process(analyzer, text);
        self.examples.push(Example {
            joined: processed.joined,
            features: processed.features,
            level,
        });
    }

    /// Gets the number of documents.
    pub fn n_documents(&self) -> usize {
        self.examples.len()
    }

    /// Trains the vectorizer and the classifier.
    ///
    /// # Arguments
    ///
    /// * `config` - Classifier hyperparameters.
    ///
    /// # Returns
    ///
    /// A trained model.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two levels occur in the dataset or the solver fails.
    pub fn train(self, config: &TrainerConfig) -> Result<Model> {
        let levels: BTreeSet<_> = self.examples.iter().map(|e| e.level).collect();
        if levels.len() < 2 {
            return Err(EstimatorError::invalid_argument(
                "dataset",
                format!("at least two levels are required, found {levels:?}"),
            ));
        }

        let vectorizer = Vectorizer::fit(
            self.examples.iter().map(|e| e.joined.as_str()),
            self.vectorizer_config,
        )?;
        info!(
            documents = self.examples.len(),
            vocabulary = vectorizer.len(),
            "fitted vectorizer"
        );

        let dim = vectorizer.dim();
        let samples: Vec<_> = self
            .examples
            .iter()
            .map(|e| vectorizer.transform(&e.joined, e.features))
            .collect();
        let scaler = if config.scale {
            Some(Scaler::fit(samples.iter().map(|s| s.iter()), dim)?)
        } else {
            None
        };

        let mut xs = Vec::with_capacity(samples.len());
        for sample in &samples {
            let mut x = vec![];
            for (i, v) in sample.iter() {
                let v = scaler.as_ref().map_or(v, |s| s.apply(i, v));
                // liblinear feature ids start at 1
                x.push((u32::try_from(i + 1)?, v));
            }
            xs.push(x);
        }
        let ys = self
            .examples
            .iter()
            .map(|e| f64::from(e.level.number()))
            .collect();

        info!(solver = ?config.solver, cost = config.cost, "start training");
        let mut builder = liblinear::Builder::new();
        let training_input = liblinear::util::TrainingInput::from_sparse_features(ys, xs)
            .map_err(|e| EstimatorError::invalid_model(format!("liblinear error: {e:?}")))?;
        builder.problem().input_data(training_input).bias(1.0);
        builder
            .parameters()
            .solver_type(config.solver.into())
            .stopping_criterion(config.epsilon)
            .constraints_violation_cost(config.cost);
        if config.class_weight == ClassWeight::Balanced {
            let weights = balanced_class_weights(self.examples.iter().map(|e| e.level));
            debug!(?weights, "class weights");
            let (labels, weights): (Vec<_>, Vec<_>) = weights
                .into_iter()
                .map(|(level, w)| (i32::from(level.number()), w))
                .unzip();
            let parameters = builder.parameters();
            parameters.cost_penalty_labels(labels);
            parameters.cost_penalty_weights(weights);
        }
        liblinear::toggle_liblinear_stdout_output(false);
        let model = builder
            .build_model()
            .map_err(|e| EstimatorError::invalid_model(e.to_string()));
        liblinear::toggle_liblinear_stdout_output(true);
        let model = model?;
        info!("finish training");

        let n_features = (model.num_features() as usize).min(dim);
        let mut labels = vec![];
        let mut weights = vec![];
        let mut bias = vec![];
        for (i, &cls) in model.labels().iter().enumerate() {
            let level = u8::try_from(cls)
                .ok()
                .and_then(JlptLevel::from_number)
                .ok_or_else(|| {
                    EstimatorError::invalid_model(format!("unexpected class id {cls}"))
                })?;
            let label_idx = i32::try_from(i)?;
            let mut w = vec![0.0; dim];
            for (fid, coef) in w.iter_mut().enumerate().take(n_features) {
                *coef = model.feature_coefficient(i32::try_from(fid + 1)?, label_idx);
            }
            debug!(%level, bias = model.label_bias(label_idx), "extracted weights");
            labels.push(level);
            weights.push(w);
            bias.push(model.label_bias(label_idx));
        }

        let classifier = LinearClassifier::new(labels, weights, bias)?;
        Model::new(
            self.analyzer,
            *self.pipeline.tokenizer().config(),
            vectorizer,
            scaler,
            classifier,
        )
    }
}

/// Computes `n_samples / (n_levels * n_samples_of_level)` for every level that occurs.
fn balanced_class_weights<I>(levels: I) -> BTreeMap<JlptLevel, f64>
where
    I: IntoIterator<Item = JlptLevel>,
{
    let mut counts: BTreeMap<JlptLevel, usize> = BTreeMap::new();
    for level in levels {
        *counts.entry(level).or_default() += 1;
    }
    let n_samples: usize = counts.values().sum();
    let n_levels = counts.len() as f64;
    counts
        .into_iter()
        .map(|(level, n)| (level, n_samples as f64 / (n_levels * n as f64)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::analyzer::testing::ScriptRunAnalyzer;
    use crate::predictor::Estimator;

    const N1_TEXTS: &[&str] = &[
        "経済政策の抜本的改革",
        "国際情勢の緊迫化と外交",
        "学術論文の精読と考察",
        "財政赤字削減の議論",
    ];

    const N5_TEXTS: &[&str] = &[
        "わたしは ねこが すきです",
        "きょうは いい てんきです",
        "あさごはんを たべました",
        "ともだちと あそびます",
    ];

    fn trainer(analyzer: &mut ScriptRunAnalyzer) -> Trainer {
        let mut trainer = Trainer::new(
            analyzer.name(),
            TokenizerConfig::default(),
            VectorizerConfig::default(),
        )
        .unwrap();
        for text in N1_TEXTS {
            trainer.push_document(analyzer, text, JlptLevel::N1);
        }
        for text in N5_TEXTS {
            trainer.push_document(analyzer, text, JlptLevel::N5);
        }
        trainer
    }

    #[test]
    fn test_balanced_class_weights() {
        let levels = [JlptLevel::N1; 6].into_iter().chain([JlptLevel::N5; 2]);
        let weights = balanced_class_weights(levels);
        assert_eq!(2, weights.len());
        assert!((weights[&JlptLevel::N1] - 8.0 / 12.0).abs() < 1e-12);
        assert!((weights[&JlptLevel::N5] - 2.0).abs() < 1e-12);
        // every level carries the same total cost
        assert!((6.0 * weights[&JlptLevel::N1] - 2.0 * weights[&JlptLevel::N5]).abs() < 1e-12);
    }

    #[test]
    fn test_train_imbalanced() {
        let extra_n1 = ["行政機関の権限委譲", "環境保護条約の批准手続"];
        let train = |class_weight| {
            let mut analyzer = ScriptRunAnalyzer::default();
            let mut trainer = Trainer::new(
                analyzer.name(),
                TokenizerConfig::default(),
                VectorizerConfig::default(),
            )
            .unwrap();
            for text in N1_TEXTS.iter().chain(&extra_n1) {
                trainer.push_document(&mut analyzer, text, JlptLevel::N1);
            }
            for text in &N5_TEXTS[..2] {
                trainer.push_document(&mut analyzer, text, JlptLevel::N5);
            }
            let config = TrainerConfig {
                class_weight,
                ..TrainerConfig::default()
            };
            Estimator::new(trainer.train(&config).unwrap(), analyzer).unwrap()
        };
        let balanced = train(ClassWeight::Balanced);
        let uniform = train(ClassWeight::None);

        for text in &N5_TEXTS[..2] {
            let prediction = balanced.predict(text).unwrap();
            assert_eq!(JlptLevel::N5, prediction.level());
            // the rare level gains weight
            assert!(
                prediction.probability(JlptLevel::N5)
                    >= uniform.predict(text).unwrap().probability(JlptLevel::N5)
            );
        }
        for text in N1_TEXTS {
            assert_eq!(JlptLevel::N1, balanced.predict(text).unwrap().level());
        }
    }

    #[test]
    fn test_solver_from_str() {
        assert_eq!(Ok(SolverType::L1RegularizedLogistic), "6".parse());
        assert!("1".parse::<SolverType>().is_err());
    }

    #[test]
    fn test_train_requires_two_levels() {
        let mut analyzer = ScriptRunAnalyzer::default();
        let mut trainer = Trainer::new(
            "script-run",
            TokenizerConfig::default(),
            VectorizerConfig::default(),
        )
        .unwrap();
        trainer.push_document(&mut analyzer, "日本語", JlptLevel::N3);
        trainer.push_document(&mut analyzer, "英語", JlptLevel::N3);
        assert!(trainer.train(&TrainerConfig::default()).is_err());
    }

    #[test]
    fn test_train_and_predict() {
        let mut analyzer = ScriptRunAnalyzer::default();
        let trainer = trainer(&mut analyzer);
        assert_eq!(8, trainer.n_documents());
        let model = trainer.train(&TrainerConfig::default()).unwrap();
        assert_eq!(&[JlptLevel::N1, JlptLevel::N5], model.labels());
        assert!(model.scaler().is_some());

        let estimator = Estimator::new(model, analyzer).unwrap();
        for text in N1_TEXTS {
            assert_eq!(JlptLevel::N1, estimator.predict(text).unwrap().level());
        }
        for text in N5_TEXTS {
            let prediction = estimator.predict(text).unwrap();
            assert_eq!(JlptLevel::N5, prediction.level());
            let total: f64 = prediction.probabilities().values().sum();
            assert!((total - 1.0).abs() < 1e-6);
            assert_eq!(0.0, prediction.probability(JlptLevel::N3));
        }
    }

    #[test]
    fn test_train_without_scaling() {
        let mut analyzer = ScriptRunAnalyzer::default();
        let config = TrainerConfig {
            scale: false,
            ..TrainerConfig::default()
        };
        let model = trainer(&mut analyzer).train(&config).unwrap();
        assert!(model.scaler().is_none());
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        assert_eq!(model, Model::read(&mut buf.as_slice()).unwrap());
    }
}
