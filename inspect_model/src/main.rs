use std::fs::File;
use std::io::{prelude::*, stdout, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use jlpt_estimator::Model;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "inspect_model",
    about = "A program to inspect trained JLPT level estimation models."
)]
struct Args {
    /// The model file to inspect
    #[arg(long)]
    model: PathBuf,

    /// Output weights of every term, numeric feature and level as CSV.
    ///
    /// Weights are divided by the column scale when the model scales features, so they apply to
    /// raw TF-IDF values and counts.
    #[arg(long)]
    dump_weights: Option<PathBuf>,
}

#[derive(Serialize)]
struct WeightRecord<'a> {
    term: &'a str,
    level: String,
    weight: f64,
}

fn write_summary<W>(wtr: &mut W, model: &Model) -> std::io::Result<()>
where
    W: Write,
{
    let tokenizer_config = model.tokenizer_config();
    let vectorizer_config = model.vectorizer().config();
    writeln!(wtr, "analyzer: {}", model.analyzer())?;
    let labels: Vec<_> = model.labels().iter().map(|l| l.to_string()).collect();
    writeln!(wtr, "labels: {}", labels.join(", "))?;
    writeln!(
        wtr,
        "tokenizer: max_length={} chunk_size={}",
        tokenizer_config.max_length, tokenizer_config.chunk_size,
    )?;
    writeln!(
        wtr,
        "vectorizer: max_features={} ngram_range=({}, {}) lowercase={}",
        vectorizer_config.max_features,
        vectorizer_config.min_n,
        vectorizer_config.max_n,
        vectorizer_config.lowercase,
    )?;
    writeln!(wtr, "vocabulary: {} n-grams", model.vectorizer().len())?;
    writeln!(wtr, "numeric features: {}", model.feature_names().join(", "))?;
    writeln!(
        wtr,
        "scaling: {}",
        if model.scaler().is_some() { "on" } else { "off" }
    )?;
    let classifier = model.classifier();
    for (level, bias) in classifier.labels().iter().zip(classifier.bias()) {
        writeln!(wtr, "bias {level}: {bias:.6}")?;
    }
    Ok(())
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

    let mut out = BufWriter::new(stdout().lock());
    write_summary(&mut out, &model)?;
    out.flush()?;

    if let Some(path) = args.dump_weights {
        info!(?path, "saving weights");
        let mut wtr = csv::Writer::from_writer(BufWriter::new(File::create(&path)?));
        let classifier = model.classifier();
        for (col, term) in model.column_names().enumerate() {
            let scale = model.scaler().map_or(1.0, |s| s.scale()[col]);
            for (level, weights) in classifier.labels().iter().zip(classifier.weights()) {
                wtr.serialize(WeightRecord {
                    term,
                    level: level.to_string(),
                    weight: weights[col] / scale,
                })?;
            }
        }
        wtr.flush()?;
    }

    Ok(())
}
