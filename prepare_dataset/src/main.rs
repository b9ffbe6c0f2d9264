use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use jlpt_estimator::dataset::{self, PrepareConfig, PreparedDataset, Source};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "prepare_dataset",
    about = "A program to merge and clean collected JLPT texts into a training dataset."
)]
struct Args {
    /// CSV files of scraped texts with `text` and `level` columns.
    #[arg(long)]
    scraped: Vec<PathBuf>,

    /// CSV files of OCR texts with `text` and `level` columns.
    ///
    /// Characters outside Japanese scripts and CJK punctuation are removed and long texts are
    /// split.
    #[arg(long)]
    ocr: Vec<PathBuf>,

    /// The file to write the prepared dataset to
    #[arg(long)]
    output: PathBuf,

    /// The file to write rejected rows to
    #[arg(long)]
    rejected: Option<PathBuf>,

    /// OCR texts are split into pieces of this many characters
    #[arg(long, default_value = "1000")]
    ocr_chunk_size: usize,

    /// Texts with at least this many characters are rejected
    #[arg(long, default_value = "4000")]
    max_chars: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.scraped.is_empty() && args.ocr.is_empty() {
        return Err("at least one of --scraped or --ocr is required".into());
    }
    if args.ocr_chunk_size == 0 {
        return Err("--ocr-chunk-size must be greater than 0".into());
    }
    let config = PrepareConfig {
        ocr_chunk_size: args.ocr_chunk_size,
        max_chars: args.max_chars,
    };

    let mut prepared = PreparedDataset::default();
    let inputs = args
        .scraped
        .iter()
        .map(|p| (Source::Scraped, p))
        .chain(args.ocr.iter().map(|p| (Source::Ocr, p)));
    for (source, path) in inputs {
        info!(?path, ?source, "loading");
        let records = dataset::read_records(File::open(path)?)?;
        let n_records = records.len();
        prepared.extend(records, source, &config);
        info!(
            rows = n_records,
            accepted = prepared.accepted.len(),
            rejected = prepared.rejected.len(),
            "loaded"
        );
    }

    dataset::write_records(BufWriter::new(File::create(&args.output)?), &prepared.accepted)?;
    info!(path = ?args.output, rows = prepared.accepted.len(), "saved the dataset");

    if let Some(path) = args.rejected {
        dataset::write_records(BufWriter::new(File::create(&path)?), &prepared.rejected)?;
        info!(?path, rows = prepared.rejected.len(), "saved rejected rows");
    }

    Ok(())
}
