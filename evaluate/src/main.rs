use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Parser;
use jlpt_estimator::dataset;
use jlpt_estimator::evaluation::Evaluation;
use jlpt_estimator::{Analyzer, Estimator, Model, PredictError, VaporettoAnalyzer};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "evaluate",
    about = "A program to evaluate JLPT level estimation models on labelled datasets."
)]
struct Args {
    /// The model file to evaluate
    #[arg(long)]
    model: PathBuf,

    /// A zstd-compressed Vaporetto model with tag prediction used for tokenization
    #[arg(long)]
    analyzer_model: Option<PathBuf>,

    /// Use Lindera with the embedded IPADIC dictionary for tokenization
    #[cfg(feature = "lindera")]
    #[arg(long, conflicts_with = "analyzer_model")]
    lindera: bool,

    /// CSV datasets with `text` and `level` columns
    #[arg(long, required = true)]
    dataset: Vec<PathBuf>,
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
    let mut f = zstd::Decoder::new(File::open(path)?)?;
    Ok(Box::new(VaporettoAnalyzer::read(&mut f)?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!(path = ?args.model, "loading model file");
    let mut f = zstd::Decoder::new(File::open(&args.model)?)?;
    let model = Model::read(&mut f)?;
    let analyzer = load_analyzer(&args)?;
    let estimator = Estimator::new(model, analyzer)?;

    let mut evaluation = Evaluation::new();
    let mut n_skipped = 0;
    for path in &args.dataset {
        info!(?path, "loading dataset");
        let documents = dataset::read_documents(File::open(path)?)?;
        for doc in &documents {
            match estimator.predict(&doc.text) {
                Ok(prediction) => evaluation.add(doc.level, prediction.level()),
                Err(PredictError::EmptyInput) => {
                    warn!(level = %doc.level, "skipping an empty document");
                    n_skipped += 1;
                }
                Err(e) => {
                    error!(error = %e, level = %doc.level, "prediction failed");
                    n_skipped += 1;
                }
            }
        }
        info!(?path, documents = documents.len(), "evaluated");
    }
    if n_skipped != 0 {
        warn!(documents = n_skipped, "some documents were not evaluated");
    }
    if evaluation.total() == 0 {
        return Err("no documents were evaluated".into());
    }

    print!("{evaluation}");

    Ok(())
}
