//! Replaying a trainer's per-epoch results log as scalar events.
//!
//! The trainer writes `results.csv` with one row per finished epoch and one
//! column per metric. Headers and cells are usually right-aligned with
//! spaces:
//!
//! ```text
//!                epoch,      train/box_loss,      metrics/mAP_0.5
//!                    0,             0.11368,              0.01342
//! ```
//!
//! Every metric cell becomes one `(tag, value, step = epoch)` scalar fed into
//! a [`MetricSink`].

pub mod events;

pub use events::EventFileWriter;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::{debug, warn};
use serde::Serialize;

use crate::error::EndoYoloError;

/// Destination for replayed scalars.
pub trait MetricSink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: i64) -> Result<(), EndoYoloError>;

    fn flush(&mut self) -> Result<(), EndoYoloError> {
        Ok(())
    }
}

/// A scalar captured by the in-memory sink.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScalarEvent {
    pub tag: String,
    pub value: f64,
    pub step: i64,
}

impl MetricSink for Vec<ScalarEvent> {
    fn add_scalar(&mut self, tag: &str, value: f64, step: i64) -> Result<(), EndoYoloError> {
        self.push(ScalarEvent {
            tag: tag.to_string(),
            value,
            step,
        });
        Ok(())
    }
}

/// What a replay did.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub epoch_column: String,
    pub metric_columns: Vec<String>,
    pub rows: usize,
    pub events: usize,
    /// Metric cells that did not parse as numbers.
    pub skipped_cells: usize,
    /// Rows dropped because their epoch cell did not parse.
    pub skipped_rows: usize,
}

/// Replays the results log at `path` into `sink`.
pub fn replay_results_csv<S: MetricSink + ?Sized>(
    path: &Path,
    sink: &mut S,
) -> Result<ReplaySummary, EndoYoloError> {
    if !path.is_file() {
        return Err(EndoYoloError::ResultsLogNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(EndoYoloError::Io)?;
    replay_results(BufReader::new(file), path, sink)
}

/// Replays results log text. Useful for tests.
pub fn replay_results_str<S: MetricSink + ?Sized>(
    csv_str: &str,
    sink: &mut S,
) -> Result<ReplaySummary, EndoYoloError> {
    replay_results(csv_str.as_bytes(), Path::new("<string>"), sink)
}

/// Fuzz-only entrypoint for results log parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_replay_results(bytes: &[u8]) -> Result<(), EndoYoloError> {
    let mut events: Vec<ScalarEvent> = Vec::new();
    let _ = replay_results(bytes, Path::new("<fuzz>"), &mut events)?;
    Ok(())
}

fn replay_results<R: Read, S: MetricSink + ?Sized>(
    reader: R,
    path: &Path,
    sink: &mut S,
) -> Result<ReplaySummary, EndoYoloError> {
    let parse_err = |source| EndoYoloError::ResultsLogParse {
        path: path.to_path_buf(),
        source,
    };

    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let epoch_idx = headers
        .iter()
        .position(|name| is_epoch_column(name))
        .ok_or_else(|| EndoYoloError::MissingEpochColumn {
            path: path.to_path_buf(),
        })?;

    let metric_idx: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, name)| !name.is_empty() && !is_epoch_column(name))
        .map(|(idx, _)| idx)
        .collect();

    let mut summary = ReplaySummary {
        epoch_column: headers[epoch_idx].clone(),
        metric_columns: metric_idx.iter().map(|&i| headers[i].clone()).collect(),
        ..Default::default()
    };

    for (row_idx, record) in csv_reader.records().enumerate() {
        let record = record.map_err(parse_err)?;
        summary.rows += 1;

        let Some(epoch) = record.get(epoch_idx).and_then(parse_epoch) else {
            warn!(
                "{}: row {} has no usable epoch value, skipping row",
                path.display(),
                row_idx + 1
            );
            summary.skipped_rows += 1;
            continue;
        };

        for &col in &metric_idx {
            let cell = record.get(col).unwrap_or_default();
            match cell.parse::<f64>() {
                Ok(value) => {
                    sink.add_scalar(&headers[col], value, epoch)?;
                    summary.events += 1;
                }
                Err(_) => {
                    debug!(
                        "{}: skipping non-numeric '{}' in column '{}' at epoch {}",
                        path.display(),
                        cell,
                        headers[col],
                        epoch
                    );
                    summary.skipped_cells += 1;
                }
            }
        }
    }

    sink.flush()?;
    Ok(summary)
}

fn is_epoch_column(name: &str) -> bool {
    name.to_lowercase().contains("epoch")
}

/// Integer epochs, with float cells ("3.0") truncated.
fn parse_epoch(cell: &str) -> Option<i64> {
    cell.parse::<i64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| v.trunc() as i64)
    })
}
