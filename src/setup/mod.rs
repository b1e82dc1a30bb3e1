//! Pre-training environment checks.
//!
//! Verifies that a converted dataset and the training framework are where
//! the launcher expects them, without touching either.

mod report;

pub use report::{CheckStatus, SetupCheck, SetupReport};

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::dataset::{read_config, LoadedConfig, Split, IMAGE_EXTENSIONS};

/// Entry script the framework directory must contain.
pub const TRAIN_SCRIPT: &str = "train.py";

/// What to check.
#[derive(Clone, Debug)]
pub struct SetupPaths {
    pub data_config: PathBuf,
    pub framework_dir: PathBuf,
    /// Weights file name, relative to `framework_dir`.
    pub weights: PathBuf,
}

/// Runs every check and collects the results.
///
/// Dataset checks depend on the config; when it cannot be read they are
/// skipped but the framework checks still run.
pub fn check_setup(paths: &SetupPaths) -> SetupReport {
    let mut report = SetupReport::new();

    match read_config(&paths.data_config) {
        Ok(config) => {
            report.pass(
                "dataset config",
                format!(
                    "{} ({} class(es): {})",
                    paths.data_config.display(),
                    config.class_count(),
                    config.names.to_vec().join(", ")
                ),
            );
            check_dataset(&config, &mut report);
        }
        Err(err) => report.fail("dataset config", err.to_string()),
    }

    check_framework(paths, &mut report);
    report
}

fn check_dataset(config: &LoadedConfig, report: &mut SetupReport) {
    let root = std::path::absolute(&config.path).unwrap_or_else(|_| config.path.clone());
    if !root.is_dir() {
        report.fail("dataset root", format!("missing: {}", root.display()));
        return;
    }
    report.pass("dataset root", root.display().to_string());

    let image_dirs = [("train images", &config.train), ("val images", &config.val)];
    for (subject, rel) in image_dirs {
        count_into(report, subject, &root.join(rel), &IMAGE_EXTENSIONS, "image(s)");
    }

    for split in Split::ALL {
        let subject = format!("{} labels", split.name());
        count_into(report, &subject, &root.join(split.labels_subdir()), &["txt"], "label file(s)");
    }
}

fn check_framework(paths: &SetupPaths, report: &mut SetupReport) {
    if !paths.framework_dir.is_dir() {
        report.fail(
            "framework",
            format!("missing: {}", paths.framework_dir.display()),
        );
        return;
    }
    report.pass("framework", paths.framework_dir.display().to_string());

    let script = paths.framework_dir.join(TRAIN_SCRIPT);
    if script.is_file() {
        report.pass("train script", script.display().to_string());
    } else {
        report.fail("train script", format!("missing: {}", script.display()));
    }

    let weights = paths.framework_dir.join(&paths.weights);
    match fs::metadata(&weights) {
        Ok(meta) if meta.is_file() => report.pass(
            "weights",
            format!("{} ({:.2} MB)", weights.display(), megabytes(meta.len())),
        ),
        _ => report.warn(
            "weights",
            format!(
                "missing: {} (the trainer downloads it on first run)",
                weights.display()
            ),
        ),
    }
}

fn count_into(report: &mut SetupReport, subject: &str, dir: &Path, extensions: &[&str], noun: &str) {
    if !dir.is_dir() {
        report.fail(subject, format!("missing: {}", dir.display()));
        return;
    }
    let count = count_files(dir, extensions);
    report.pass(subject, format!("{} {} in {}", count, noun, dir.display()));
}

/// Counts files directly inside `dir` with one of `extensions`.
pub fn count_files(dir: &Path, extensions: &[&str]) -> usize {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
                .unwrap_or(false)
        })
        .count()
}

pub(crate) fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framework(root: &Path) -> PathBuf {
        let dir = root.join("yolov5_project");
        fs::create_dir_all(&dir).expect("create framework dir");
        fs::write(dir.join(TRAIN_SCRIPT), "print('train')\n").expect("write train.py");
        dir
    }

    fn dataset(root: &Path) -> PathBuf {
        let ds = root.join("ds");
        for sub in ["images/train", "images/val", "labels/train", "labels/val"] {
            fs::create_dir_all(ds.join(sub)).expect("create dataset dir");
        }
        fs::write(ds.join("images/train/a.jpg"), b"jpg").expect("write image");
        fs::write(ds.join("images/train/b.JPG"), b"jpg").expect("write image");
        fs::write(ds.join("images/train/notes.md"), b"x").expect("write other");
        fs::write(ds.join("labels/train/a.txt"), "").expect("write label");
        let config = root.join("data.yaml");
        fs::write(
            &config,
            format!(
                "path: {}\ntrain: images/train\nval: images/val\nnc: 1\nnames:\n  0: polyp\n",
                ds.display()
            ),
        )
        .expect("write config");
        config
    }

    #[test]
    fn complete_setup_passes_with_weights_warning() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let paths = SetupPaths {
            data_config: dataset(temp.path()),
            framework_dir: framework(temp.path()),
            weights: PathBuf::from("yolov5s.pt"),
        };

        let report = check_setup(&paths);

        assert!(report.is_ok(), "{report}");
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.find("weights").map(|c| c.status), Some(CheckStatus::Warn));
        let train = report.find("train images").expect("train images check");
        assert!(train.detail.starts_with("2 image(s)"), "{}", train.detail);
        let labels = report.find("train labels").expect("train labels check");
        assert!(labels.detail.starts_with("1 label file(s)"));
    }

    #[test]
    fn missing_config_fails_but_framework_is_still_checked() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let paths = SetupPaths {
            data_config: temp.path().join("missing.yaml"),
            framework_dir: framework(temp.path()),
            weights: PathBuf::from("yolov5s.pt"),
        };

        let report = check_setup(&paths);

        assert_eq!(report.failure_count(), 1);
        assert_eq!(
            report.find("dataset config").map(|c| c.status),
            Some(CheckStatus::Fail)
        );
        assert_eq!(
            report.find("train script").map(|c| c.status),
            Some(CheckStatus::Pass)
        );
        assert!(report.find("dataset root").is_none());
    }

    #[test]
    fn present_weights_report_size() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let framework_dir = framework(temp.path());
        fs::write(framework_dir.join("yolov5s.pt"), vec![0u8; 1024 * 1024]).expect("write weights");
        let paths = SetupPaths {
            data_config: dataset(temp.path()),
            framework_dir,
            weights: PathBuf::from("yolov5s.pt"),
        };

        let report = check_setup(&paths);
        let weights = report.find("weights").expect("weights check");
        assert_eq!(weights.status, CheckStatus::Pass);
        assert!(weights.detail.contains("1.00 MB"));
    }

    #[test]
    fn missing_label_dir_fails() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let config = dataset(temp.path());
        fs::remove_dir_all(temp.path().join("ds/labels/val")).expect("remove val labels");
        let paths = SetupPaths {
            data_config: config,
            framework_dir: framework(temp.path()),
            weights: PathBuf::from("yolov5s.pt"),
        };

        let report = check_setup(&paths);
        assert_eq!(
            report.find("val labels").map(|c| c.status),
            Some(CheckStatus::Fail)
        );
        assert!(!report.is_ok());
    }
}
