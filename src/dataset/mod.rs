//! Bounding-box dataset to YOLO layout conversion.
//!
//! The source dataset is a flat directory of images plus one annotation CSV
//! per image, partitioned by two manifest files:
//!
//! ```text
//! <source>/images/<id>.jpg      <source>/bbox/<id>.csv
//! train.txt, val.txt            one image id per line
//! ```
//!
//! The output is the directory tree a YOLO trainer expects:
//!
//! ```text
//! <out>/images/{train,val}/<id>.<ext>
//! <out>/labels/{train,val}/<id>.txt
//! <out>/data.yaml
//! ```
//!
//! Conversion is skip-and-continue per item: a missing file or unreadable
//! image is recorded in the [`SplitReport`] and the next id is processed.
//! Only whole-run preconditions (manifests) and write failures abort.

pub mod annotation;
pub mod config;
pub mod registry;
pub mod report;

pub use annotation::{BoxDefect, RawAnnotation, YoloBox};
pub use config::{emit_config, read_config, DatasetConfig, LoadedConfig, CONFIG_FILE_NAME};
pub use registry::{ClassId, ClassRegistry};
pub use report::{BoxIssue, ConversionReport, Severity, SkipReason, SkippedItem, SplitReport};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use image::GenericImageView;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;

use crate::error::EndoYoloError;

/// Image extensions tried, in order, when resolving an id to a file.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];
const ANNOTATION_EXTENSION: &str = "csv";
const LABEL_EXTENSION: &str = "txt";

/// A named dataset partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
}

impl Split {
    pub const ALL: [Split; 2] = [Split::Train, Split::Val];

    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }

    /// Image directory relative to the dataset root, as written to `data.yaml`.
    pub fn images_subdir(&self) -> &'static str {
        match self {
            Split::Train => "images/train",
            Split::Val => "images/val",
        }
    }

    pub fn labels_subdir(&self) -> &'static str {
        match self {
            Split::Train => "labels/train",
            Split::Val => "labels/val",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where source images and annotation CSVs live.
#[derive(Clone, Debug)]
pub struct SourceLayout {
    pub images_dir: PathBuf,
    pub annotations_dir: PathBuf,
}

impl SourceLayout {
    /// The standard `<root>/images` + `<root>/bbox` layout.
    pub fn from_root(root: &Path) -> Self {
        Self {
            images_dir: root.join("images"),
            annotations_dir: root.join("bbox"),
        }
    }

    /// First existing image for `id`, trying [`IMAGE_EXTENSIONS`] in order.
    pub fn find_image(&self, id: &str) -> Option<PathBuf> {
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| self.images_dir.join(format!("{id}.{ext}")))
            .find(|candidate| candidate.is_file())
    }

    pub fn annotation_path(&self, id: &str) -> PathBuf {
        self.annotations_dir
            .join(format!("{id}.{ANNOTATION_EXTENSION}"))
    }
}

/// Where the converted dataset is written.
#[derive(Clone, Debug)]
pub struct OutputLayout {
    pub root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn images_dir(&self, split: Split) -> PathBuf {
        self.root.join(split.images_subdir())
    }

    pub fn labels_dir(&self, split: Split) -> PathBuf {
        self.root.join(split.labels_subdir())
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Removes stale split directories and recreates them empty.
    pub fn prepare(&self) -> Result<(), EndoYoloError> {
        for split in Split::ALL {
            for dir in [self.images_dir(split), self.labels_dir(split)] {
                if dir.exists() {
                    warn!("Removing previous output in {}", dir.display());
                    fs::remove_dir_all(&dir).map_err(|source| EndoYoloError::OutputWrite {
                        path: dir.clone(),
                        source,
                    })?;
                }
                create_dir(&dir)?;
            }
        }
        Ok(())
    }
}

/// Options for a conversion run.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    /// Write degenerate boxes to label files instead of dropping them.
    ///
    /// A class seen only on dropped boxes gets no id and stays out of the
    /// dataset config.
    pub keep_invalid_boxes: bool,
}

/// Loads a split manifest: one id per line, trimmed, blank lines ignored.
pub fn load_split(path: &Path) -> Result<Vec<String>, EndoYoloError> {
    if !path.is_file() {
        return Err(EndoYoloError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = fs::read_to_string(path).map_err(|source| EndoYoloError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Converts every id of one split, in order, into `output`.
///
/// `registry` is shared with the other split of the same run. Items whose
/// image or annotation cannot be read are skipped and recorded; classes of a
/// skipped item are never registered.
pub fn convert_split(
    source: &SourceLayout,
    output: &OutputLayout,
    ids: &[String],
    split: Split,
    registry: &mut ClassRegistry,
    opts: &ConvertOptions,
) -> Result<SplitReport, EndoYoloError> {
    let images_dir = output.images_dir(split);
    let labels_dir = output.labels_dir(split);
    create_dir(&images_dir)?;
    create_dir(&labels_dir)?;

    let mut report = SplitReport::new(split);
    let progress = create_progress_bar(ids.len() as u64, split.name());

    for id in ids {
        progress.inc(1);

        let item = match load_item(source, id) {
            Ok(item) => item,
            Err(reason) => {
                warn!("Skipping {split}/{id}: {reason}");
                report.skip(id, reason);
                continue;
            }
        };

        let mut kept_rows = Vec::with_capacity(item.rows.len());
        for (row_idx, raw) in item.rows.iter().enumerate() {
            let defect = annotation::inspect_box(raw, item.width, item.height);
            let keep = match defect {
                Some(defect) => {
                    let kept = !defect.is_fatal() || opts.keep_invalid_boxes;
                    let issue = BoxIssue {
                        severity: if defect.is_fatal() {
                            Severity::Error
                        } else {
                            Severity::Warning
                        },
                        id: id.clone(),
                        row: row_idx + 1,
                        class_name: raw.class_name.clone(),
                        rect: [raw.xmin, raw.ymin, raw.xmax, raw.ymax],
                        defect,
                        kept,
                    };
                    warn!("{split}: {issue}");
                    report.box_issues.push(issue);
                    kept
                }
                None => true,
            };

            if keep {
                kept_rows.push(raw);
            }
        }

        // Only boxes that reach a label file register their class.
        let class_ids = annotation::assign_class_ids(kept_rows.iter().copied(), registry);
        let boxes: Vec<YoloBox> = kept_rows
            .into_iter()
            .zip(class_ids)
            .map(|(raw, class_id)| YoloBox::from_raw(class_id, raw, item.width, item.height))
            .collect();

        let extension = item
            .image_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(IMAGE_EXTENSIONS[0])
            .to_ascii_lowercase();
        let image_target = images_dir.join(format!("{id}.{extension}"));
        fs::copy(&item.image_path, &image_target).map_err(|source| EndoYoloError::OutputWrite {
            path: image_target.clone(),
            source,
        })?;

        let label_target = labels_dir.join(format!("{id}.{LABEL_EXTENSION}"));
        annotation::write_label_file(&label_target, &boxes)?;

        report.converted += 1;
        report.boxes += boxes.len();
    }

    progress.finish_and_clear();
    info!(
        "{}: {} converted, {} skipped",
        split, report.converted, report.skipped
    );
    Ok(report)
}

/// Paths and defaults for a whole conversion run.
#[derive(Clone, Debug)]
pub struct ConvertRequest {
    pub source_root: PathBuf,
    pub train_manifest: PathBuf,
    pub val_manifest: PathBuf,
    pub output_root: PathBuf,
    /// Optional second location for `data.yaml`, e.g. the trainer's `data/` dir.
    pub extra_config: Option<PathBuf>,
    pub options: ConvertOptions,
}

/// Converts both splits with one registry and writes `data.yaml`.
pub fn convert_dataset(request: &ConvertRequest) -> Result<ConversionReport, EndoYoloError> {
    let train_ids = load_split(&request.train_manifest)?;
    let val_ids = load_split(&request.val_manifest)?;
    info!(
        "Loaded splits: {} train, {} val",
        train_ids.len(),
        val_ids.len()
    );

    let source = SourceLayout::from_root(&request.source_root);
    let output = OutputLayout::new(&request.output_root);
    output.prepare()?;

    let mut registry = ClassRegistry::new();
    let mut splits = Vec::with_capacity(2);
    for (split, ids) in [(Split::Train, &train_ids), (Split::Val, &val_ids)] {
        splits.push(convert_split(
            &source,
            &output,
            ids,
            split,
            &mut registry,
            &request.options,
        )?);
    }

    let config = emit_config(&registry, &output.root)?;
    info!("Dataset config saved to {}", output.config_path().display());
    if let Some(extra) = &request.extra_config {
        config.write(extra)?;
        info!("Dataset config copied to {}", extra.display());
    }

    Ok(ConversionReport {
        output_root: PathBuf::from(&config.path),
        config_path: output.config_path(),
        splits,
        classes: registry.names().to_vec(),
    })
}

struct LoadedItem {
    image_path: PathBuf,
    width: u32,
    height: u32,
    rows: Vec<RawAnnotation>,
}

fn load_item(source: &SourceLayout, id: &str) -> Result<LoadedItem, SkipReason> {
    let image_path = source.find_image(id).ok_or(SkipReason::ImageNotFound)?;

    let annotation_path = source.annotation_path(id);
    if !annotation_path.is_file() {
        return Err(SkipReason::AnnotationNotFound);
    }

    let (width, height) = read_image_dimensions(&image_path)
        .map_err(|err| SkipReason::ImageDecode(err.to_string()))?;

    let rows = annotation::read_annotation_csv(&annotation_path)
        .map_err(|err| SkipReason::AnnotationParse(err.to_string()))?;

    Ok(LoadedItem {
        image_path,
        width,
        height,
        rows,
    })
}

/// Fully decodes the image so corrupt files are caught, not just bad headers.
fn read_image_dimensions(path: &Path) -> Result<(u32, u32), EndoYoloError> {
    let decoded = image::open(path).map_err(|source| EndoYoloError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.dimensions())
}

fn create_dir(path: &Path) -> Result<(), EndoYoloError> {
    fs::create_dir_all(path).map_err(|source| EndoYoloError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{label}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(style);
    bar
}
