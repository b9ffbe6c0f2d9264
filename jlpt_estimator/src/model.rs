use std::collections::BTreeMap;
use std::io::{Read, Write};

use bincode::{Decode, Encode};

use crate::classifier::{LinearClassifier, Scaler};
use crate::errors::{EstimatorError, Result};
use crate::feature::Feature;
use crate::level::JlptLevel;
use crate::tokenizer::TokenizerConfig;
use crate::vectorizer::{VectorizedSample, Vectorizer};

/// Magic number.
const MODEL_MAGIC: &[u8] = b"JlptEstimator 0.1.0\n";

/// Upper bound of the decoded model size in bytes.
const MODEL_SIZE_LIMIT: usize = 1 << 30;

/// Trained model: the fitted vectorizer, the scaler and the classifier as one artifact.
///
/// Everything needed to reproduce the training-time transformation is stored together, so a
/// vectorizer can never be paired with a classifier from another run.
#[derive(Debug, Clone, PartialEq, Decode, Encode)]
pub struct Model {
    pub(crate) analyzer: String,
    pub(crate) tokenizer_config: TokenizerConfig,
    pub(crate) feature_names: Vec<String>,
    pub(crate) vectorizer: Vectorizer,
    pub(crate) scaler: Option<Scaler>,
    pub(crate) classifier: LinearClassifier,
}

impl Model {
    /// Assembles a model from its parts.
    ///
    /// # Arguments
    ///
    /// * `analyzer` - Name of the analyzer used at training time.
    /// * `tokenizer_config` - Tokenizer limits used at training time.
    /// * `vectorizer` - Fitted vectorizer.
    /// * `scaler` - Optional column scaling applied before the classifier.
    /// * `classifier` - Classifier over `vectorizer.dim()` columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the parts do not fit together.
    pub fn new<S>(
        analyzer: S,
        tokenizer_config: TokenizerConfig,
        vectorizer: Vectorizer,
        scaler: Option<Scaler>,
        classifier: LinearClassifier,
    ) -> Result<Self>
    where
        S: Into<String>,
    {
        let model = Self {
            analyzer: analyzer.into(),
            tokenizer_config,
            feature_names: Feature::names().map(String::from).collect(),
            vectorizer,
            scaler,
            classifier,
        };
        model.validate()?;
        Ok(model)
    }

    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;
        bincode::encode_into_std_write(self, wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is. A model that is not an
    /// estimator model or whose parts are inconsistent is rejected.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0; MODEL_MAGIC.len()];
        rdr.read_exact(&mut magic)?;
        if magic != MODEL_MAGIC {
            return Err(EstimatorError::invalid_model(
                "model version mismatch or not an estimator model",
            ));
        }
        let config = bincode::config::standard().with_limit::<MODEL_SIZE_LIMIT>();
        let model: Self = bincode::decode_from_std_read(rdr, config)?;
        model.validate()?;
        Ok(model)
    }

    /// Name of the analyzer the model was trained with.
    pub fn analyzer(&self) -> &str {
        &self.analyzer
    }

    /// Tokenizer limits the model was trained with.
    pub const fn tokenizer_config(&self) -> &TokenizerConfig {
        &self.tokenizer_config
    }

    /// Numeric feature names in column order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub const fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    pub const fn scaler(&self) -> Option<&Scaler> {
        self.scaler.as_ref()
    }

    pub const fn classifier(&self) -> &LinearClassifier {
        &self.classifier
    }

    /// Levels seen in training.
    pub fn labels(&self) -> &[JlptLevel] {
        self.classifier.labels()
    }

    /// Name of every input column: the vocabulary followed by the numeric features.
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.vectorizer
            .terms()
            .iter()
            .chain(&self.feature_names)
            .map(String::as_str)
    }

    /// Probability of every level for a vectorized sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample does not match the model or a score is not finite.
    pub fn predict_proba(&self, sample: &VectorizedSample) -> Result<BTreeMap<JlptLevel, f64>> {
        if sample.dim() != self.classifier.dim() {
            return Err(EstimatorError::invalid_argument(
                "sample",
                format!(
                    "dimension {} does not match the model dimension {}",
                    sample.dim(),
                    self.classifier.dim()
                ),
            ));
        }
        match &self.scaler {
            Some(scaler) => self
                .classifier
                .predict_proba(sample.iter().map(|(i, v)| (i, scaler.apply(i, v)))),
            None => self.classifier.predict_proba(sample.iter()),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.tokenizer_config.validate()?;
        self.vectorizer.validate()?;
        self.classifier.validate()?;
        if !self.feature_names.iter().map(String::as_str).eq(Feature::names()) {
            return Err(EstimatorError::invalid_model(format!(
                "numeric feature columns {:?} differ from the expected schema",
                self.feature_names
            )));
        }
        let dim = self.vectorizer.dim();
        if self.classifier.dim() != dim {
            return Err(EstimatorError::invalid_model(format!(
                "classifier expects {} columns but the vectorizer produces {dim}",
                self.classifier.dim()
            )));
        }
        if let Some(scaler) = &self.scaler {
            scaler.validate()?;
            if scaler.dim() != dim {
                return Err(EstimatorError::invalid_model(format!(
                    "scaler expects {} columns but the vectorizer produces {dim}",
                    scaler.dim()
                )));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::toy_model;
    use super::*;

    use crate::feature::FeatureRecord;

    #[test]
    fn test_write_read() {
        let model = toy_model("script-run");
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        assert!(buf.starts_with(MODEL_MAGIC));
        let restored = Model::read(&mut buf.as_slice()).unwrap();
        assert_eq!(model, restored);
    }

    #[test]
    fn test_write_read_file() {
        let model = toy_model("script-run");
        let mut file = tempfile::tempfile().unwrap();
        model.write(&mut file).unwrap();
        std::io::Seek::rewind(&mut file).unwrap();
        let restored = Model::read(&mut std::io::BufReader::new(file)).unwrap();
        assert_eq!(model.labels(), restored.labels());
    }

    #[test]
    fn test_read_bad_magic() {
        let mut data: &[u8] = b"VaporettoTokenizer 0.6.0\n";
        assert!(matches!(
            Model::read(&mut data),
            Err(EstimatorError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_read_truncated() {
        let mut buf = vec![];
        toy_model("script-run").write(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(Model::read(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn test_read_oversized_length() {
        let mut data = MODEL_MAGIC.to_vec();
        // varint marker of a u64 followed by a 1 TiB string length
        data.push(0xFD);
        data.extend_from_slice(&(1u64 << 40).to_le_bytes());
        data.extend_from_slice(b"vaporetto");
        assert!(matches!(
            Model::read(&mut data.as_slice()),
            Err(EstimatorError::Decode(_))
        ));
    }

    #[test]
    fn test_reject_mismatched_schema() {
        let mut model = toy_model("script-run");
        model.feature_names.swap(0, 1);
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        assert!(matches!(
            Model::read(&mut buf.as_slice()),
            Err(EstimatorError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_reject_mismatched_dimensions() {
        let model = toy_model("script-run");
        let small = Vectorizer::fit(["猫"], Default::default()).unwrap();
        assert!(Model::new(
            "script-run",
            TokenizerConfig::default(),
            small,
            None,
            model.classifier.clone(),
        )
        .is_err());
        let scaler = Scaler::fit([vec![(0, 1.0)], vec![]], 3).unwrap();
        assert!(Model::new(
            "script-run",
            TokenizerConfig::default(),
            model.vectorizer.clone(),
            Some(scaler),
            model.classifier.clone(),
        )
        .is_err());
    }

    #[test]
    fn test_column_names() {
        let model = toy_model("script-run");
        let names: Vec<_> = model.column_names().collect();
        assert_eq!(model.vectorizer.dim(), names.len());
        assert_eq!(Some(&"記号"), names.last());
    }

    #[test]
    fn test_predict_proba_dimension_check() {
        let model = toy_model("script-run");
        let other = Vectorizer::fit(["猫"], Default::default()).unwrap();
        let sample = other.transform("猫", FeatureRecord::default());
        assert!(model.predict_proba(&sample).is_err());
    }
}
