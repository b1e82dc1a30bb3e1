use std::path::PathBuf;
use thiserror::Error;

use crate::setup::SetupReport;

/// The main error type for endoyolo operations.
#[derive(Debug, Error)]
pub enum EndoYoloError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Split manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    #[error("Failed to read split manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse annotation CSV {path}: {source}")]
    AnnotationCsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset config not found: {path}")]
    DataConfigNotFound { path: PathBuf },

    #[error("Failed to parse dataset config {path}: {source}")]
    DataConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize dataset config for {path}: {source}")]
    DataConfigWrite {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Checkpoint not found: {path} (run training first or check the run name)")]
    CheckpointNotFound { path: PathBuf },

    #[error("Failed to launch trainer '{program}': {source}")]
    TrainerLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Training exited with {}", describe_exit(.code))]
    TrainingFailed { code: Option<i32> },

    #[error("Setup check failed with {failures} problem(s)")]
    SetupIncomplete { failures: usize, report: SetupReport },

    #[error("Results log not found: {path}")]
    ResultsLogNotFound { path: PathBuf },

    #[error("Failed to parse results log {path}: {source}")]
    ResultsLogParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Results log {path} has no epoch column")]
    MissingEpochColumn { path: PathBuf },

    #[error("Failed to write event file {path}: {source}")]
    EventWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

impl EndoYoloError {
    /// Process exit code for this error.
    ///
    /// A failed training run hands back the trainer's own code; everything
    /// else, including a trainer killed by a signal, exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            EndoYoloError::TrainingFailed { code: Some(code) } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
