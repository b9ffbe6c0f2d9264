#![cfg_attr(docsrs, feature(doc_cfg))]

//! # JLPT estimator
//!
//! Estimates the JLPT level (N1 to N5) of a Japanese text with a linear classifier over TF-IDF
//! n-grams and a fixed set of script and part-of-speech counts.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{prelude::*, stdin, BufReader};
//!
//! use jlpt_estimator::{Estimator, Model, VaporettoAnalyzer};
//!
//! let mut f = BufReader::new(File::open("jlpt-model.bin").unwrap());
//! let model = Model::read(&mut f).unwrap();
//! let mut f = BufReader::new(File::open("vaporetto-tag.model").unwrap());
//! let analyzer = VaporettoAnalyzer::read(&mut f).unwrap();
//! let estimator = Estimator::new(model, analyzer).unwrap();
//!
//! for line in stdin().lock().lines() {
//!     let prediction = estimator.predict(&line.unwrap()).unwrap();
//!     println!("{}", prediction.level());
//! }
//! ```
//!
//! Training requires **crate feature** `train`. For more details, see [`Trainer`].

mod analyzer;
mod classifier;
mod errors;
mod feature;
mod level;
mod model;
mod pipeline;
mod predictor;
mod tokenizer;
mod vectorizer;

pub mod dataset;
pub mod evaluation;
pub mod script;
pub mod string_filters;

#[cfg(feature = "train")]
mod trainer;

pub use analyzer::{Analyzer, Morpheme};
pub use classifier::{argmax, LinearClassifier, Scaler};
pub use errors::{EstimatorError, PredictError, Result};
pub use feature::{extract_features, Feature, FeatureRecord, PartOfSpeech, N_FEATURES};
pub use level::JlptLevel;
pub use model::Model;
pub use pipeline::{ProcessedText, TextPipeline};
pub use predictor::{Estimator, Prediction};
pub use script::ScriptType;
pub use tokenizer::{Token, Tokenizer, TokenizerConfig};
pub use vectorizer::{VectorizedSample, Vectorizer, VectorizerConfig};

#[cfg(feature = "vaporetto")]
pub use analyzer::VaporettoAnalyzer;

#[cfg(feature = "lindera")]
pub use analyzer::LinderaAnalyzer;

#[cfg(feature = "train")]
pub use trainer::{ClassWeight, SolverType, Trainer, TrainerConfig};
