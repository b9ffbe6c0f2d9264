use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Parser;
use jlpt_estimator::dataset::{self, Document};
use jlpt_estimator::evaluation::Evaluation;
use jlpt_estimator::{
    Analyzer, ClassWeight, Estimator, PredictError, SolverType, TokenizerConfig, Trainer,
    TrainerConfig, VaporettoAnalyzer, VectorizerConfig,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(about = "A program to train JLPT level estimation models.")]
struct Args {
    /// Prepared CSV datasets with `text` and `level` columns
    #[arg(long, required = true)]
    dataset: Vec<PathBuf>,

    /// The file to write the trained model to
    #[arg(long)]
    model: PathBuf,

    /// A zstd-compressed Vaporetto model with tag prediction used for tokenization
    #[arg(long)]
    analyzer_model: Option<PathBuf>,

    /// Use Lindera with the embedded IPADIC dictionary for tokenization
    #[cfg(feature = "lindera")]
    #[arg(long, conflicts_with = "analyzer_model")]
    lindera: bool,

    /// Texts longer than this are truncated, where the length is in characters
    #[arg(long, default_value = "10000")]
    max_length: usize,

    /// Texts are passed to the analyzer in pieces of this many characters
    #[arg(long, default_value = "1000")]
    chunk_size: usize,

    /// The maximum number of n-grams in the vocabulary
    #[arg(long, default_value = "1000")]
    max_features: usize,

    /// The longest n-gram length, where the length is in tokens
    #[arg(long, default_value = "2")]
    max_ngram: usize,

    /// The ratio of documents held out for evaluation (0 disables the evaluation)
    #[arg(long, default_value = "0.2")]
    test_ratio: f64,

    /// The random seed of the train/test split
    #[arg(long, default_value = "42")]
    seed: u64,

    /// The epsilon stopping criterion for classifier training
    #[arg(long, default_value = "0.01")]
    eps: f64,

    /// The cost hyperparameter for classifier training
    #[arg(long, default_value = "1.0")]
    cost: f64,

    /// The solver. {0, 6, 7} (see LIBLINEAR documentation for more details)
    #[arg(long, default_value = "0")]
    solver: SolverType,

    /// Give every document the same cost instead of weighting levels by their inverse frequency.
    #[arg(long)]
    no_class_weight: bool,

    /// Do not scale features before training.
    #[arg(long)]
    no_scale: bool,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

#[cfg(not(feature = "lindera"))]
fn load_analyzer(args: &Args) -> Result<Box<dyn Analyzer + Send>, Box<dyn std::error::Error>> {
    let path = args
        .analyzer_model
        .as_deref()
        .ok_or("--analyzer-model is required")?;
    load_vaporetto(path)
}

#[cfg(feature = "lindera")]
fn load_analyzer(args: &Args) -> Result<Box<dyn Analyzer + Send>, Box<dyn std::error::Error>> {
    if args.lindera {
        return Ok(Box::new(jlpt_estimator::LinderaAnalyzer::new()?));
    }
    let path = args
        .analyzer_model
        .as_deref()
        .ok_or("--analyzer-model or --lindera is required")?;
    load_vaporetto(path)
}

fn load_vaporetto(path: &Path) -> Result<Box<dyn Analyzer + Send>, Box<dyn std::error::Error>> {
    info!(?path, "loading analyzer model");
    let mut f = zstd::Decoder::new(File::open(path)?)?;
    Ok(Box::new(VaporettoAnalyzer::read(&mut f)?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let tokenizer_config = TokenizerConfig {
        max_length: args.max_length,
        chunk_size: args.chunk_size,
    };
    let vectorizer_config = VectorizerConfig {
        max_features: args.max_features,
        max_n: args.max_ngram,
        ..VectorizerConfig::default()
    };
    let trainer_config = TrainerConfig {
        epsilon: args.eps,
        cost: args.cost,
        solver: args.solver,
        class_weight: if args.no_class_weight {
            ClassWeight::None
        } else {
            ClassWeight::Balanced
        },
        scale: !args.no_scale,
    };

    let mut analyzer = load_analyzer(&args)?;

    let mut documents: Vec<Document> = vec![];
    for path in &args.dataset {
        info!(?path, "loading dataset");
        documents.extend(dataset::read_documents(File::open(path)?)?);
    }
    info!(documents = documents.len(), "loaded datasets");

    let (train_docs, test_docs) = dataset::stratified_split(documents, args.test_ratio, args.seed)?;
    info!(
        train = train_docs.len(),
        test = test_docs.len(),
        "split the dataset"
    );

    info!("extracting features");
    let mut trainer = Trainer::new(analyzer.name(), tokenizer_config, vectorizer_config)?;
    for (i, doc) in train_docs.iter().enumerate() {
        if i % 1000 == 0 {
            info!(documents = i, "extracting features");
        }
        trainer.push_document(&mut analyzer, &doc.text, doc.level);
    }

    let model = trainer.train(&trainer_config)?;

    let mut f = zstd::Encoder::new(File::create(&args.model)?, 19)?;
    f.multithread(args.zstd_workers)?;
    model.write(&mut f)?;
    f.finish()?;
    info!(path = ?args.model, "saved the model");

    if !test_docs.is_empty() {
        let estimator = Estimator::new(model, analyzer)?;
        let mut evaluation = Evaluation::new();
        for doc in &test_docs {
            match estimator.predict(&doc.text) {
                Ok(prediction) => evaluation.add(doc.level, prediction.level()),
                Err(PredictError::EmptyInput) => warn!("skipping an empty test document"),
                Err(e) => return Err(e.into()),
            }
        }
        println!("Logistic regression results on the held-out split");
        print!("{evaluation}");
    }

    Ok(())
}
