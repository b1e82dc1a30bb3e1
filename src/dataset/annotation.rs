//! Per-image bounding-box CSV files and YOLO label lines.
//!
//! Source annotations are one CSV per image, header-driven, with at least the
//! columns `class_name, xmin, ymin, xmax, ymax` in pixel space. Extra columns
//! are ignored and column order does not matter.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use serde::Deserialize;

use super::registry::{ClassId, ClassRegistry};
use crate::error::EndoYoloError;
use crate::geometry::{BBoxXYXY, Pixel};

/// One row of a source annotation CSV.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RawAnnotation {
    pub class_name: String,
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

impl RawAnnotation {
    pub fn bbox(&self) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_pixel_corners(self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// A box ready to be written as a YOLO label line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloBox {
    pub class_id: ClassId,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl YoloBox {
    /// Normalizes a raw record against the dimensions of its image.
    pub fn from_raw(class_id: ClassId, raw: &RawAnnotation, image_width: u32, image_height: u32) -> Self {
        let (x_center, y_center, width, height) = raw
            .bbox()
            .to_normalized_cxcywh(image_width as f64, image_height as f64);
        Self {
            class_id,
            x_center,
            y_center,
            width,
            height,
        }
    }
}

impl fmt::Display for YoloBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.x_center, self.y_center, self.width, self.height
        )
    }
}

/// A geometric defect found in a source box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxDefect {
    /// Zero or negative width or height (`xmax <= xmin` or `ymax <= ymin`).
    Degenerate,
    /// A corner lies outside the image.
    OutOfBounds,
}

impl BoxDefect {
    /// Degenerate boxes produce meaningless labels; out-of-bounds boxes are
    /// usually off by a pixel and still train fine.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BoxDefect::Degenerate)
    }
}

impl fmt::Display for BoxDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxDefect::Degenerate => f.write_str("degenerate box"),
            BoxDefect::OutOfBounds => f.write_str("box outside image"),
        }
    }
}

/// Checks a raw box against its image; degenerate wins over out-of-bounds.
pub fn inspect_box(raw: &RawAnnotation, image_width: u32, image_height: u32) -> Option<BoxDefect> {
    let bbox = raw.bbox();
    if !bbox.has_area() {
        Some(BoxDefect::Degenerate)
    } else if !bbox.is_within(image_width as f64, image_height as f64) {
        Some(BoxDefect::OutOfBounds)
    } else {
        None
    }
}

/// Reads every row of an annotation CSV.
///
/// The whole file is parsed before anything is returned, so a bad row late in
/// the file never leaves a partially converted item behind.
pub fn read_annotation_csv(path: &Path) -> Result<Vec<RawAnnotation>, EndoYoloError> {
    let file = File::open(path).map_err(EndoYoloError::Io)?;
    parse_annotations(BufReader::new(file), path)
}

/// Parses annotation CSV text. Useful for tests.
pub fn from_annotation_csv_str(csv_str: &str) -> Result<Vec<RawAnnotation>, EndoYoloError> {
    parse_annotations(csv_str.as_bytes(), Path::new("<string>"))
}

fn parse_annotations<R: Read>(reader: R, path: &Path) -> Result<Vec<RawAnnotation>, EndoYoloError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        let row: RawAnnotation = result.map_err(|source| EndoYoloError::AnnotationCsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }

    Ok(rows)
}

/// Fuzz-only entrypoint for annotation CSV parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_annotation_csv(bytes: &[u8]) -> Result<(), EndoYoloError> {
    let _ = parse_annotations(bytes, Path::new("<fuzz>"))?;
    Ok(())
}

/// Resolves class names for the rows that will be written, in row order.
pub fn assign_class_ids<'a>(
    rows: impl IntoIterator<Item = &'a RawAnnotation>,
    registry: &mut ClassRegistry,
) -> Vec<ClassId> {
    rows.into_iter()
        .map(|row| registry.resolve(&row.class_name))
        .collect()
}

/// Writes one label line per box, newline-terminated.
pub fn write_label_file(path: &Path, boxes: &[YoloBox]) -> Result<(), EndoYoloError> {
    let mut contents = String::new();
    for yolo_box in boxes {
        contents.push_str(&yolo_box.to_string());
        contents.push('\n');
    }

    let mut file = File::create(path).map_err(|source| EndoYoloError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(contents.as_bytes())
        .map_err(|source| EndoYoloError::OutputWrite {
            path: path.to_path_buf(),
            source,
        })
}
