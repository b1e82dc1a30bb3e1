//! Launching the external YOLO trainer.
//!
//! The trainer is a script inside its own project directory (`train.py`).
//! This module only assembles its command line, checks the inputs the
//! command refers to, and reports the child's exit status. The run itself
//! belongs entirely to the framework.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;

use crate::error::EndoYoloError;
use crate::setup::{megabytes, TRAIN_SCRIPT};

/// Flags shared by fresh and resumed training runs.
#[derive(Clone, Debug)]
pub struct TrainSettings {
    pub framework_dir: PathBuf,
    /// Interpreter used to run the trainer script.
    pub python: PathBuf,
    /// Dataset config, relative to `framework_dir`.
    pub data: PathBuf,
    pub weights: String,
    pub img_size: u32,
    pub epochs: u32,
    pub batch_size: u32,
    pub device: String,
    pub name: String,
    pub project: String,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            framework_dir: PathBuf::from("yolov5_project"),
            python: PathBuf::from("python3"),
            data: PathBuf::from("data/Kvasir-SEG.yaml"),
            weights: "yolov5s.pt".to_string(),
            img_size: 640,
            epochs: 1000,
            batch_size: 16,
            device: "0".to_string(),
            name: "endoscope_polyp_detection".to_string(),
            project: "runs/train".to_string(),
        }
    }
}

impl TrainSettings {
    /// Where the trainer leaves the last checkpoint of run `name`.
    pub fn default_checkpoint(&self) -> PathBuf {
        self.framework_dir
            .join(&self.project)
            .join(&self.name)
            .join("weights")
            .join("last.pt")
    }

    pub fn data_config_path(&self) -> PathBuf {
        self.framework_dir.join(&self.data)
    }
}

/// A fully assembled trainer command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// The trainer resolves relative paths against its own directory.
    pub working_dir: PathBuf,
}

impl TrainInvocation {
    /// Command line for a fresh run starting from pretrained weights.
    pub fn fresh(settings: &TrainSettings) -> Self {
        let args = vec![
            TRAIN_SCRIPT.to_string(),
            "--data".to_string(),
            path_arg(&settings.data),
            "--weights".to_string(),
            settings.weights.clone(),
            "--img".to_string(),
            settings.img_size.to_string(),
            "--epochs".to_string(),
            settings.epochs.to_string(),
            "--batch".to_string(),
            settings.batch_size.to_string(),
            "--device".to_string(),
            settings.device.clone(),
            "--name".to_string(),
            settings.name.clone(),
            "--project".to_string(),
            settings.project.clone(),
        ];

        Self {
            program: settings.python.clone(),
            args,
            working_dir: settings.framework_dir.clone(),
        }
    }

    /// Command line continuing from `checkpoint`.
    ///
    /// The child runs from the framework directory, so the checkpoint is
    /// passed relative to it when it lives inside it and as an absolute path
    /// otherwise.
    pub fn resume(settings: &TrainSettings, checkpoint: &Path) -> Self {
        let checkpoint_arg = match checkpoint.strip_prefix(&settings.framework_dir) {
            Ok(inside) => inside.to_path_buf(),
            Err(_) => std::path::absolute(checkpoint).unwrap_or_else(|_| checkpoint.to_path_buf()),
        };

        let args = vec![
            TRAIN_SCRIPT.to_string(),
            "--resume".to_string(),
            path_arg(&checkpoint_arg),
            "--data".to_string(),
            path_arg(&settings.data),
            "--img".to_string(),
            settings.img_size.to_string(),
            "--epochs".to_string(),
            settings.epochs.to_string(),
            "--batch".to_string(),
            settings.batch_size.to_string(),
            "--device".to_string(),
            settings.device.clone(),
            "--name".to_string(),
            settings.name.clone(),
        ];

        Self {
            program: settings.python.clone(),
            args,
            working_dir: settings.framework_dir.clone(),
        }
    }
}

impl fmt::Display for TrainInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Runs a trainer invocation to completion.
///
/// Returns the child's exit code, or `None` if it was terminated by a signal.
pub trait TrainerLauncher {
    fn launch(&mut self, invocation: &TrainInvocation) -> Result<Option<i32>, EndoYoloError>;
}

/// Launches the trainer as a real child process and waits for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessLauncher;

impl TrainerLauncher for ProcessLauncher {
    fn launch(&mut self, invocation: &TrainInvocation) -> Result<Option<i32>, EndoYoloError> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .status()
            .map_err(|source| EndoYoloError::TrainerLaunch {
                program: invocation.program.clone(),
                source,
            })?;
        Ok(status.code())
    }
}

/// Starts a fresh training run.
///
/// Fails before launching anything if the dataset config is missing.
pub fn train<L: TrainerLauncher + ?Sized>(
    launcher: &mut L,
    settings: &TrainSettings,
) -> Result<(), EndoYoloError> {
    let data_config = settings.data_config_path();
    if !data_config.is_file() {
        return Err(EndoYoloError::DataConfigNotFound { path: data_config });
    }

    info!("Dataset config: {}", data_config.display());
    info!(
        "Weights: {} (downloaded by the trainer if absent)",
        settings.weights
    );
    info!(
        "img {} | epochs {} | batch {} | device {}",
        settings.img_size, settings.epochs, settings.batch_size, settings.device
    );

    let invocation = TrainInvocation::fresh(settings);
    run(launcher, &invocation)?;

    info!(
        "Training finished; run saved under {}",
        settings
            .framework_dir
            .join(&settings.project)
            .join(&settings.name)
            .display()
    );
    Ok(())
}

/// Resumes an interrupted run from `checkpoint`, or from the run's
/// `weights/last.pt` when none is given.
pub fn resume<L: TrainerLauncher + ?Sized>(
    launcher: &mut L,
    settings: &TrainSettings,
    checkpoint: Option<&Path>,
) -> Result<(), EndoYoloError> {
    let checkpoint = checkpoint
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.default_checkpoint());

    let meta = match fs::metadata(&checkpoint) {
        Ok(meta) if meta.is_file() => meta,
        _ => return Err(EndoYoloError::CheckpointNotFound { path: checkpoint }),
    };
    info!(
        "Checkpoint: {} ({:.2} MB)",
        checkpoint.display(),
        megabytes(meta.len())
    );

    let invocation = TrainInvocation::resume(settings, &checkpoint);
    run(launcher, &invocation)?;
    info!("Resumed training finished");
    Ok(())
}

fn run<L: TrainerLauncher + ?Sized>(
    launcher: &mut L,
    invocation: &TrainInvocation,
) -> Result<(), EndoYoloError> {
    info!("Working directory: {}", invocation.working_dir.display());
    info!("Command: {invocation}");

    match launcher.launch(invocation)? {
        Some(0) => Ok(()),
        code => Err(EndoYoloError::TrainingFailed { code }),
    }
}
