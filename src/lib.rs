//! endoyolo: dataset preparation and training orchestration for YOLO polyp
//! detection.
//!
//! The crate wraps an external YOLO training framework. It converts a
//! bounding-box dataset (images + one CSV per image + split manifests) into
//! the framework's layout, checks that everything is in place, launches and
//! resumes training runs, and replays the framework's results log into a
//! TensorBoard event file.
//!
//! # Modules
//!
//! - [`dataset`]: the converter, class registry and `data.yaml` handling
//! - [`geometry`]: pixel/normalized bounding boxes
//! - [`setup`]: pre-training environment checks
//! - [`training`]: trainer command assembly and launching
//! - [`metrics`]: results log replay and event files
//! - [`error`]: error types for endoyolo operations

pub mod dataset;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod setup;
pub mod training;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

pub use error::EndoYoloError;

/// The endoyolo CLI application.
#[derive(Parser)]
#[command(name = "endoyolo")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Convert a bounding-box CSV dataset into YOLO layout.
    Convert(ConvertArgs),
    /// Check that the dataset and training framework are ready.
    Check(CheckArgs),
    /// Launch a training run.
    Train(TrainArgs),
    /// Resume a training run from its last checkpoint.
    Resume(ResumeArgs),
    /// Replay a results CSV into a TensorBoard event file.
    ExportEvents(ExportEventsArgs),
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Source dataset root containing images/ and bbox/.
    #[arg(long, env = "ENDOYOLO_SOURCE_ROOT", default_value = "datasheet/Kvasir-SEG/Kvasir-SEG")]
    source_root: PathBuf,

    /// Manifest listing training image ids, one per line.
    #[arg(long, default_value = "datasheet/train.txt")]
    train_manifest: PathBuf,

    /// Manifest listing validation image ids, one per line.
    #[arg(long, default_value = "datasheet/val.txt")]
    val_manifest: PathBuf,

    /// Output dataset root. Split directories are regenerated on every run.
    #[arg(long, env = "ENDOYOLO_OUTPUT_ROOT", default_value = "datasheet/Kvasir-SEG-YOLO")]
    output_root: PathBuf,

    /// Also write the dataset config here (e.g. yolov5_project/data/Kvasir-SEG.yaml).
    #[arg(long)]
    data_config: Option<PathBuf>,

    /// Keep degenerate boxes in label files instead of dropping them.
    #[arg(long)]
    keep_invalid_boxes: bool,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Dataset config to verify.
    #[arg(long, default_value = "yolov5_project/data/Kvasir-SEG.yaml")]
    data_config: PathBuf,

    /// Training framework directory.
    #[arg(long, env = "ENDOYOLO_FRAMEWORK_DIR", default_value = "yolov5_project")]
    framework_dir: PathBuf,

    /// Pretrained weights file, relative to the framework directory.
    #[arg(long, default_value = "yolov5s.pt")]
    weights: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Flags shared by `train` and `resume`.
#[derive(clap::Args)]
struct TrainerArgs {
    /// Training framework directory; the trainer runs from here.
    #[arg(long, env = "ENDOYOLO_FRAMEWORK_DIR", default_value = "yolov5_project")]
    framework_dir: PathBuf,

    /// Python interpreter used to run train.py.
    #[arg(long, env = "ENDOYOLO_PYTHON", default_value = "python3")]
    python: PathBuf,

    /// Dataset config, relative to the framework directory.
    #[arg(long, default_value = "data/Kvasir-SEG.yaml")]
    data: PathBuf,

    /// Image size passed to --img.
    #[arg(long, default_value_t = 640)]
    img: u32,

    /// Batch size.
    #[arg(long, default_value_t = 16)]
    batch: u32,

    /// Device selector ("0", "0,1", "cpu").
    #[arg(long, env = "ENDOYOLO_DEVICE", default_value = "0")]
    device: String,

    /// Run name.
    #[arg(long, default_value = "endoscope_polyp_detection")]
    name: String,
}

#[derive(clap::Args)]
struct TrainArgs {
    #[command(flatten)]
    trainer: TrainerArgs,

    /// Pretrained weights.
    #[arg(long, default_value = "yolov5s.pt")]
    weights: String,

    /// Number of epochs.
    #[arg(long, default_value_t = 1000)]
    epochs: u32,

    /// Directory runs are saved under, relative to the framework directory.
    #[arg(long, default_value = "runs/train")]
    project: String,
}

#[derive(clap::Args)]
struct ResumeArgs {
    #[command(flatten)]
    trainer: TrainerArgs,

    /// Checkpoint to resume from [default: <framework>/runs/train/<name>/weights/last.pt].
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Number of epochs.
    #[arg(long, default_value_t = 100)]
    epochs: u32,
}

#[derive(clap::Args)]
struct ExportEventsArgs {
    /// Results CSV written by the trainer.
    #[arg(default_value = "yolov5_project/runs/train/endoscope_polyp_detection/results.csv")]
    results: PathBuf,

    /// Directory for the event file [default: the results file's directory].
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl TrainerArgs {
    fn into_settings(self, epochs: u32) -> training::TrainSettings {
        training::TrainSettings {
            framework_dir: self.framework_dir,
            python: self.python,
            data: self.data,
            img_size: self.img,
            epochs,
            batch_size: self.batch,
            device: self.device,
            name: self.name,
            ..Default::default()
        }
    }
}

/// Run the endoyolo CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), EndoYoloError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::Train(args)) => run_train(args),
        Some(Commands::Resume(args)) => run_resume(args),
        Some(Commands::ExportEvents(args)) => run_export_events(args),
        None => {
            println!("endoyolo {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Dataset preparation and training orchestration for YOLO polyp detection.");
            println!();
            println!("Run 'endoyolo --help' for usage information.");
            Ok(())
        }
    }
}

fn check_output_format(output: &str) -> Result<(), EndoYoloError> {
    match output {
        "text" | "json" => Ok(()),
        other => Err(EndoYoloError::UnsupportedFormat(format!(
            "'{}' (supported: text, json)",
            other
        ))),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), EndoYoloError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| EndoYoloError::Io(std::io::Error::other(err)))?;
    println!("{json}");
    Ok(())
}

/// Execute the convert subcommand.
fn run_convert(args: ConvertArgs) -> Result<(), EndoYoloError> {
    check_output_format(&args.output)?;

    let request = dataset::ConvertRequest {
        source_root: args.source_root,
        train_manifest: args.train_manifest,
        val_manifest: args.val_manifest,
        output_root: args.output_root,
        extra_config: args.data_config,
        options: dataset::ConvertOptions {
            keep_invalid_boxes: args.keep_invalid_boxes,
        },
    };

    let report = dataset::convert_dataset(&request)?;

    if args.output == "json" {
        print_json(&report)?;
    } else {
        print!("{}", report);
        println!();
        println!("Check the setup with:");
        println!(
            "  endoyolo check --data-config {}",
            report.config_path.display()
        );
    }
    Ok(())
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), EndoYoloError> {
    check_output_format(&args.output)?;

    let report = setup::check_setup(&setup::SetupPaths {
        data_config: args.data_config,
        framework_dir: args.framework_dir,
        weights: args.weights,
    });

    if args.output == "json" {
        print_json(&report)?;
    } else {
        print!("{}", report);
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(EndoYoloError::SetupIncomplete {
            failures: report.failure_count(),
            report,
        })
    }
}

/// Execute the train subcommand.
fn run_train(args: TrainArgs) -> Result<(), EndoYoloError> {
    let mut settings = args.trainer.into_settings(args.epochs);
    settings.weights = args.weights;
    settings.project = args.project;

    training::train(&mut training::ProcessLauncher, &settings)
}

/// Execute the resume subcommand.
fn run_resume(args: ResumeArgs) -> Result<(), EndoYoloError> {
    let settings = args.trainer.into_settings(args.epochs);
    training::resume(
        &mut training::ProcessLauncher,
        &settings,
        args.checkpoint.as_deref(),
    )
}

/// Execute the export-events subcommand.
fn run_export_events(args: ExportEventsArgs) -> Result<(), EndoYoloError> {
    if !args.results.is_file() {
        return Err(EndoYoloError::ResultsLogNotFound { path: args.results });
    }

    let log_dir = match args.log_dir {
        Some(dir) => dir,
        None => args
            .results
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let mut writer = metrics::EventFileWriter::create(&log_dir)?;
    let summary = metrics::replay_results_csv(&args.results, &mut writer)?;

    info!(
        "Replayed {} epoch(s) from {} ({} metric column(s))",
        summary.rows,
        args.results.display(),
        summary.metric_columns.len()
    );
    println!(
        "Wrote {} scalar event(s) to {}",
        summary.events,
        writer.path().display()
    );
    if summary.skipped_cells > 0 || summary.skipped_rows > 0 {
        println!(
            "Skipped {} non-numeric cell(s) and {} row(s) without an epoch",
            summary.skipped_cells, summary.skipped_rows
        );
    }
    println!("View with: tensorboard --logdir {}", log_dir.display());
    Ok(())
}
