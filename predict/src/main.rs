use std::collections::BTreeMap;
use std::fs::File;
use std::io::{prelude::*, stdin, stdout, BufWriter};
use std::path::{Path, PathBuf};

use clap::Parser;
use jlpt_estimator::{
    Analyzer, Estimator, JlptLevel, Model, PredictError, Prediction, VaporettoAnalyzer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "predict",
    about = "A program to estimate JLPT levels of Japanese texts."
)]
struct Args {
    /// The model file to use when estimating levels
    #[arg(long)]
    model: PathBuf,

    /// A zstd-compressed Vaporetto model with tag prediction used for tokenization
    #[arg(long)]
    analyzer_model: Option<PathBuf>,

    /// Use Lindera with the embedded IPADIC dictionary for tokenization
    #[cfg(feature = "lindera")]
    #[arg(long, conflicts_with = "analyzer_model")]
    lindera: bool,

    /// Texts to estimate. Lines of the standard input are used if no text is given.
    ///
    /// Each result is printed as the level followed by the percentage of every level from N5 to
    /// N1.
    #[arg(long)]
    text: Vec<String>,

    /// Also print the tokens and numeric features of each text.
    #[arg(long)]
    verbose: bool,
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

/// Writes the level followed by the percentage of every level, sorted by label name in
/// descending order.
fn write_levels<W>(
    wtr: &mut W,
    level: JlptLevel,
    probabilities: &BTreeMap<JlptLevel, f64>,
) -> std::io::Result<()>
where
    W: Write,
{
    write!(wtr, "{level}")?;
    for (level, p) in probabilities.iter().rev() {
        write!(wtr, "\t{level} {:.2}%", p * 100.0)?;
    }
    writeln!(wtr)
}

fn write_prediction<W>(
    wtr: &mut W,
    prediction: &Prediction,
    verbose: bool,
) -> std::io::Result<()>
where
    W: Write,
{
    write_levels(wtr, prediction.level(), prediction.probabilities())?;
    if verbose {
        let processed = prediction.processed();
        let tokens: Vec<_> = processed
            .tokens
            .iter()
            .map(|t| format!("{}/{}", t.surface(), t.pos()))
            .collect();
        writeln!(wtr, "  tokens: {}", tokens.join(" "))?;
        for (feature, value) in processed.features.iter() {
            writeln!(wtr, "  {feature}: {value}")?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Nothing is read from the input until both models are loaded.
    info!(path = ?args.model, "loading model file");
    let mut f = zstd::Decoder::new(File::open(&args.model)?)?;
    let model = Model::read(&mut f)?;
    info!(analyzer = model.analyzer(), labels = ?model.labels(), "loaded the model");
    let analyzer = load_analyzer(&args)?;
    let estimator = Estimator::new(model, analyzer)?;

    let texts: Box<dyn Iterator<Item = std::io::Result<String>>> = if args.text.is_empty() {
        Box::new(
            stdin()
                .lock()
                .lines()
                .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty())),
        )
    } else {
        Box::new(args.text.iter().cloned().map(Ok))
    };

    let mut out = BufWriter::new(stdout().lock());
    for text in texts {
        match estimator.predict(&text?) {
            Ok(prediction) => write_prediction(&mut out, &prediction, args.verbose)?,
            Err(PredictError::EmptyInput) => warn!("the text is empty; enter a Japanese text"),
            Err(e) => error!(error = %e, "prediction failed"),
        }
        out.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_levels_descending() {
        let probabilities: BTreeMap<_, _> = [
            (JlptLevel::N1, 0.1),
            (JlptLevel::N2, 0.0),
            (JlptLevel::N3, 0.6),
            (JlptLevel::N4, 0.2),
            (JlptLevel::N5, 0.1),
        ]
        .into_iter()
        .collect();
        let mut buf = vec![];
        write_levels(&mut buf, JlptLevel::N3, &probabilities).unwrap();
        assert_eq!(
            "N3\tN5 10.00%\tN4 20.00%\tN3 60.00%\tN2 0.00%\tN1 10.00%\n",
            String::from_utf8(buf).unwrap()
        );
    }
}
