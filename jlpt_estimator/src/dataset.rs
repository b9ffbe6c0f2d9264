//! Labelled text datasets stored as CSV.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{EstimatorError, Result};
use crate::level::JlptLevel;
use crate::string_filters::{NewlineFilter, OcrTextFilter, StringFilter};

/// A row of a collected CSV file. Columns other than `text` and `level` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawRecord {
    /// Text; `None` if the cell is empty.
    pub text: Option<String>,

    /// Level label as written in the source, e.g. `N3` or `3`.
    pub level: String,
}

/// A text with a parsed level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub level: JlptLevel,
}

#[derive(Serialize)]
struct DocumentRecord<'a> {
    text: &'a str,
    level: String,
}

/// Reads every row of a CSV file with a header.
///
/// # Errors
///
/// Returns an error if the CSV is malformed or lacks the `level` column.
pub fn read_records<R>(rdr: R) -> Result<Vec<RawRecord>>
where
    R: Read,
{
    let mut rdr = csv::Reader::from_reader(rdr);
    let mut records = vec![];
    for result in rdr.deserialize() {
        records.push(result?);
    }
    Ok(records)
}

/// Writes records as CSV with a `text,level` header.
///
/// # Errors
///
/// When `wtr` generates an error, it will be returned.
pub fn write_records<'a, W, I>(wtr: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut wtr = csv::Writer::from_writer(wtr);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads labelled documents.
///
/// Rows with a missing text or an unknown level are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the CSV is malformed.
pub fn read_documents<R>(rdr: R) -> Result<Vec<Document>>
where
    R: Read,
{
    let records = read_records(rdr)?;
    let mut documents = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        let Some(text) = record.text else {
            warn!(row = i + 1, "skipping row without text");
            continue;
        };
        match record.level.parse() {
            Ok(level) => documents.push(Document { text, level }),
            Err(e) => warn!(row = i + 1, error = %e, "skipping row with an unknown level"),
        }
    }
    Ok(documents)
}

/// Writes labelled documents as CSV with a `text,level` header.
///
/// # Errors
///
/// When `wtr` generates an error, it will be returned.
pub fn write_documents<'a, W, I>(wtr: W, documents: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Document>,
{
    let mut wtr = csv::Writer::from_writer(wtr);
    for doc in documents {
        wtr.serialize(DocumentRecord {
            text: &doc.text,
            level: doc.level.to_string(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Origin of collected texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Texts scraped from web pages.
    Scraped,

    /// Texts recognized from scanned pages. Recognition noise is removed and long pages are split.
    Ocr,
}

/// Settings of [`prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareConfig {
    /// OCR texts are split into pieces of this many characters.
    pub ocr_chunk_size: usize,

    /// Texts with at least this many characters are rejected.
    pub max_chars: usize,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            ocr_chunk_size: 1_000,
            max_chars: 4_000,
        }
    }
}

/// Output of [`prepare`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreparedDataset {
    /// Cleaned rows.
    pub accepted: Vec<RawRecord>,

    /// Rows whose text is missing, empty after cleaning, or too long.
    pub rejected: Vec<RawRecord>,
}

impl PreparedDataset {
    /// Cleans and appends rows from one source.
    ///
    /// Level labels are rewritten in the `N<digit>` form. Rows with an unknown level are dropped
    /// with a warning.
    pub fn extend<I>(&mut self, records: I, source: Source, config: &PrepareConfig)
    where
        I: IntoIterator<Item = RawRecord>,
    {
        for record in records {
            let level = match record.level.parse::<JlptLevel>() {
                Ok(level) => level.to_string(),
                Err(e) => {
                    warn!(error = %e, "skipping row with an unknown level");
                    continue;
                }
            };
            let pieces = match (source, record.text) {
                (Source::Ocr, Some(text)) => {
                    split_chars(&OcrTextFilter.filter(text), config.ocr_chunk_size)
                        .into_iter()
                        .map(Some)
                        .collect()
                }
                (_, text) => vec![text],
            };
            for text in pieces {
                let text = text.map(|t| NewlineFilter.filter(t));
                let record = RawRecord {
                    text,
                    level: level.clone(),
                };
                let n_chars = record.text.as_deref().map_or(0, |t| t.chars().count());
                if n_chars == 0 || n_chars >= config.max_chars {
                    warn!(level = %record.level, chars = n_chars, "rejecting row");
                    self.rejected.push(record);
                } else {
                    self.accepted.push(record);
                }
            }
        }
    }
}

/// Cleans and merges collected rows into one dataset.
pub fn prepare<I>(sources: I, config: &PrepareConfig) -> PreparedDataset
where
    I: IntoIterator<Item = (Source, Vec<RawRecord>)>,
{
    let mut dataset = PreparedDataset::default();
    for (source, records) in sources {
        dataset.extend(records, source, config);
    }
    dataset
}

fn split_chars(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Splits documents into training and test sets, keeping the level distribution.
///
/// From each level, `round(n * test_ratio)` documents go to the test set, but at least one stays
/// in the training set. The split is reproducible for a given `seed`.
///
/// # Errors
///
/// Returns an error if `test_ratio` is outside `[0, 1)`.
pub fn stratified_split(
    documents: Vec<Document>,
    test_ratio: f64,
    seed: u64,
) -> Result<(Vec<Document>, Vec<Document>)> {
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(EstimatorError::invalid_argument(
            "test_ratio",
            "must be in [0, 1)",
        ));
    }
    let mut by_level: BTreeMap<JlptLevel, Vec<Document>> = BTreeMap::new();
    for doc in documents {
        by_level.entry(doc.level).or_default().push(doc);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = vec![];
    let mut test = vec![];
    for (_, mut docs) in by_level {
        docs.shuffle(&mut rng);
        let n = docs.len();
        let n_test = ((n as f64 * test_ratio).round() as usize).min(n - 1);
        test.extend(docs.drain(..n_test));
        train.extend(docs);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: Option<&str>, level: &str) -> RawRecord {
        RawRecord {
            text: text.map(String::from),
            level: level.to_string(),
        }
    }

    fn docs(level: JlptLevel, n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document {
                text: format!("{level}-{i}"),
                level,
            })
            .collect()
    }

    #[test]
    fn test_read_records() {
        let data = "url,text,level\nhttp://a,日本語,N3\nhttp://b,,N2\n";
        let records = read_records(data.as_bytes()).unwrap();
        assert_eq!(
            vec![raw(Some("日本語"), "N3"), raw(None, "N2")],
            records
        );
    }

    #[test]
    fn test_read_records_without_level() {
        assert!(read_records("text\n日本語\n".as_bytes()).is_err());
    }

    #[test]
    fn test_read_documents() {
        let data = "text,level\n日本語,N3\n猫,6\n,N1\n犬,n5\n";
        let documents = read_documents(data.as_bytes()).unwrap();
        assert_eq!(
            vec![
                Document {
                    text: "日本語".into(),
                    level: JlptLevel::N3
                },
                Document {
                    text: "犬".into(),
                    level: JlptLevel::N5
                },
            ],
            documents
        );
    }

    #[test]
    fn test_write_read_documents() {
        let documents = vec![Document {
            text: "改行を\n含む, テキスト".into(),
            level: JlptLevel::N2,
        }];
        let mut buf = vec![];
        write_documents(&mut buf, &documents).unwrap();
        assert_eq!(documents, read_documents(buf.as_slice()).unwrap());
    }

    #[test]
    fn test_prepare() {
        let config = PrepareConfig {
            ocr_chunk_size: 3,
            max_chars: 8,
        };
        let scraped = vec![
            raw(Some("\r\n前の行\r\n\r\n次の行\n"), "N4"),
            raw(Some("とても長い行です"), "N4"),
            raw(None, "N1"),
            raw(Some(" \n "), "2"),
            raw(Some("日本語"), "N7"),
        ];
        let ocr = vec![raw(Some("第1問 あいうえお"), "ｎ５")];
        let dataset = prepare([(Source::Scraped, scraped), (Source::Ocr, ocr)], &config);
        assert_eq!(
            vec![
                raw(Some("前の行\n次の行"), "N4"),
                raw(Some("第問あ"), "N5"),
                raw(Some("いうえ"), "N5"),
                raw(Some("お"), "N5"),
            ],
            dataset.accepted
        );
        assert_eq!(
            vec![
                raw(Some("とても長い行です"), "N4"),
                raw(None, "N1"),
                raw(Some(""), "N2"),
            ],
            dataset.rejected
        );
    }

    #[test]
    fn test_stratified_split() {
        let mut documents = docs(JlptLevel::N1, 10);
        documents.extend(docs(JlptLevel::N5, 5));
        documents.extend(docs(JlptLevel::N3, 1));
        let (train, test) = stratified_split(documents.clone(), 0.2, 42).unwrap();
        assert_eq!(16, train.len() + test.len());
        let count = |docs: &[Document], level: JlptLevel| docs.iter().filter(|d| d.level == level).count();
        assert_eq!(2, count(&test, JlptLevel::N1));
        assert_eq!(1, count(&test, JlptLevel::N5));
        assert_eq!(0, count(&test, JlptLevel::N3));
        assert_eq!(1, count(&train, JlptLevel::N3));

        let (train2, test2) = stratified_split(documents, 0.2, 42).unwrap();
        assert_eq!(train, train2);
        assert_eq!(test, test2);
    }

    #[test]
    fn test_stratified_split_without_test() {
        let (train, test) = stratified_split(docs(JlptLevel::N2, 4), 0.0, 1).unwrap();
        assert_eq!(4, train.len());
        assert!(test.is_empty());
        assert!(stratified_split(vec![], 1.0, 1).is_err());
        assert!(stratified_split(vec![], -0.1, 1).is_err());
    }
}
