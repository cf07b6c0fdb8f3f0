//! Cleaning stage between the checkpoint and the text encoder
//!
//! Reads every stored [`Record`], normalizes its text, drops records whose
//! description is too short to embed meaningfully, removes repeated
//! (title, artist) pairs and writes the survivors as [`PreparedRecord`] lines.
//! Vectors are produced downstream; nothing here encodes or decodes them.

use crate::config::CleaningConfig;
use crate::record::{normalize_whitespace, Record, Rejection};
use crate::storage::{AtomicFile, CheckpointStore, StorageError};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A record ready for the text encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedRecord {
    pub source_key: String,
    pub title: String,
    pub artist: String,
    pub styles: Vec<String>,
    pub description: String,
    pub tags: String,
    pub rating_review: Option<f64>,
    pub rating_average: Option<f64>,
    /// Lowercased concatenation of every text field, fed to the encoder
    pub text_full: String,
}

/// Counts reported by one cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub read: u64,
    pub written: u64,
    pub too_short: u64,
    pub duplicate: u64,
    pub invalid: u64,
    pub output_path: PathBuf,
}

/// Lowercases and strips characters the encoder has no use for
///
/// Keeps letters, digits, underscores, whitespace and `, . ! ? ; : ( ) -`.
pub fn encoder_text(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| {
            c.is_alphanumeric() || *c == '_' || c.is_whitespace() || ",.!?;:()-".contains(*c)
        })
        .collect();
    normalize_whitespace(&kept).to_lowercase()
}

/// Cleans one record, rejecting it when a required field is blank or the
/// description is shorter than `min_description_length` characters
fn prepare_record(
    record: Record,
    min_description_length: usize,
) -> std::result::Result<PreparedRecord, Rejection> {
    let title = normalize_whitespace(&record.title);
    if title.is_empty() {
        return Err(Rejection::MissingTitle);
    }
    let artist = normalize_whitespace(&record.artist);
    if artist.is_empty() {
        return Err(Rejection::MissingArtist);
    }

    let description = normalize_whitespace(&record.description);
    let len = description.chars().count();
    if len < min_description_length {
        return Err(Rejection::DescriptionTooShort {
            len,
            min: min_description_length,
        });
    }

    let tags = normalize_whitespace(&record.tags);
    let text_full = encoder_text(&format!(
        "{} {} {} {} {}",
        artist,
        title,
        record.styles.join(" "),
        description,
        tags
    ));

    Ok(PreparedRecord {
        source_key: record.source_key,
        title,
        artist,
        styles: record.styles,
        description,
        tags,
        rating_review: record.rating_review,
        rating_average: record.rating_average,
        text_full,
    })
}

/// Cleans a batch of records in `source_key` order
///
/// The first record of every (title, artist) pair wins, compared
/// case-insensitively. The returned report has no output path yet.
pub fn prepare_records(
    mut records: Vec<Record>,
    min_description_length: usize,
) -> (Vec<PreparedRecord>, CleaningReport) {
    records.sort_by(|a, b| a.source_key.cmp(&b.source_key));

    let mut report = CleaningReport {
        read: records.len() as u64,
        ..CleaningReport::default()
    };
    let mut seen = HashSet::new();
    let mut prepared = Vec::new();

    for record in records {
        match prepare_record(record, min_description_length) {
            Ok(item) => {
                let key = (item.title.to_lowercase(), item.artist.to_lowercase());
                if seen.insert(key) {
                    prepared.push(item);
                } else {
                    report.duplicate += 1;
                }
            }
            Err(Rejection::DescriptionTooShort { .. }) => report.too_short += 1,
            Err(_) => report.invalid += 1,
        }
    }

    report.written = prepared.len() as u64;
    (prepared, report)
}

/// Writes prepared records as JSON Lines, replacing `path` atomically
pub fn write_prepared(path: &Path, records: &[PreparedRecord]) -> Result<()> {
    let mut file = AtomicFile::create(path)?;
    let temp = file.temp_path().to_path_buf();
    for record in records {
        let line = serde_json::to_string(record).map_err(StorageError::from)?;
        writeln!(file, "{}", line).map_err(|e| StorageError::io(&temp, e))?;
    }
    file.commit()?;
    Ok(())
}

/// Runs the cleaning stage over the whole checkpoint
pub fn run_cleaning(
    store: &dyn CheckpointStore,
    config: &CleaningConfig,
) -> Result<CleaningReport> {
    let records = store.read_all()?;
    tracing::info!(
        "Cleaning {} records from {}",
        records.len(),
        store.location().display()
    );

    let (prepared, mut report) = prepare_records(records, config.min_description_length);
    let output = PathBuf::from(&config.cleaned_path);
    write_prepared(&output, &prepared)?;
    report.output_path = output;

    tracing::info!(
        "Cleaned {} of {} records ({} too short, {} duplicates, {} invalid) -> {}",
        report.written,
        report.read,
        report.too_short,
        report.duplicate,
        report.invalid,
        report.output_path.display()
    );
    Ok(report)
}
