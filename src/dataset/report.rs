//! Conversion report types.
//!
//! A conversion never aborts on a bad item, so the report is the only place
//! the operator learns which items were skipped and which boxes were suspect.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::annotation::BoxDefect;
use super::Split;

/// Why an item of a split manifest was not converted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    ImageNotFound,
    AnnotationNotFound,
    ImageDecode(String),
    AnnotationParse(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ImageNotFound => f.write_str("image not found"),
            SkipReason::AnnotationNotFound => f.write_str("annotation CSV not found"),
            SkipReason::ImageDecode(msg) => write!(f, "cannot decode image: {msg}"),
            SkipReason::AnnotationParse(msg) => write!(f, "cannot parse annotation CSV: {msg}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub id: String,
    pub reason: SkipReason,
}

/// Severity of a box issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A suspicious box found while converting an item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoxIssue {
    pub severity: Severity,
    pub id: String,
    /// 1-based data row in the annotation CSV.
    pub row: usize,
    pub class_name: String,
    pub rect: [i64; 4],
    #[serde(serialize_with = "serialize_defect")]
    pub defect: BoxDefect,
    /// Whether the box still made it into the label file.
    pub kept: bool,
}

fn serialize_defect<S: serde::Serializer>(defect: &BoxDefect, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(match defect {
        BoxDefect::Degenerate => "degenerate",
        BoxDefect::OutOfBounds => "out_of_bounds",
    })
}

impl fmt::Display for BoxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [xmin, ymin, xmax, ymax] = self.rect;
        write!(
            f,
            "[{:?}] {} row {}: {} '{}' ({}, {}, {}, {}){}",
            self.severity,
            self.id,
            self.row,
            self.defect,
            self.class_name,
            xmin,
            ymin,
            xmax,
            ymax,
            if self.kept { "" } else { " dropped" }
        )
    }
}

/// Outcome of converting one split.
#[derive(Clone, Debug, Serialize)]
pub struct SplitReport {
    pub split: Split,
    pub converted: usize,
    pub skipped: usize,
    /// Label lines written across the split.
    pub boxes: usize,
    pub skipped_items: Vec<SkippedItem>,
    pub box_issues: Vec<BoxIssue>,
}

impl SplitReport {
    pub fn new(split: Split) -> Self {
        Self {
            split,
            converted: 0,
            skipped: 0,
            boxes: 0,
            skipped_items: Vec::new(),
            box_issues: Vec::new(),
        }
    }

    /// `(converted_count, skipped_count)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.converted, self.skipped)
    }

    pub(crate) fn skip(&mut self, id: &str, reason: SkipReason) {
        self.skipped += 1;
        self.skipped_items.push(SkippedItem {
            id: id.to_string(),
            reason,
        });
    }
}

/// Outcome of a whole conversion run.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionReport {
    pub output_root: PathBuf,
    pub config_path: PathBuf,
    pub splits: Vec<SplitReport>,
    /// Class names in id order.
    pub classes: Vec<String>,
}

impl ConversionReport {
    pub fn converted(&self) -> usize {
        self.splits.iter().map(|s| s.converted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.splits.iter().map(|s| s.skipped).sum()
    }

    pub fn box_issues(&self) -> impl Iterator<Item = &BoxIssue> {
        self.splits.iter().flat_map(|s| s.box_issues.iter())
    }

    pub fn split(&self, split: Split) -> Option<&SplitReport> {
        self.splits.iter().find(|s| s.split == split)
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conversion summary")?;
        for split in &self.splits {
            writeln!(
                f,
                "  {}: {} converted, {} skipped, {} boxes",
                split.split, split.converted, split.skipped, split.boxes
            )?;
        }
        writeln!(f, "  classes ({}): {}", self.classes.len(), self.classes.join(", "))?;
        writeln!(f, "  output: {}", self.output_root.display())?;
        writeln!(f, "  config: {}", self.config_path.display())?;

        let skipped: Vec<_> = self
            .splits
            .iter()
            .flat_map(|s| s.skipped_items.iter().map(move |item| (s.split, item)))
            .collect();
        if !skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped ({}):", skipped.len())?;
            for (split, item) in skipped {
                writeln!(f, "  - {}/{}: {}", split, item.id, item.reason)?;
            }
        }

        let issues: Vec<_> = self.box_issues().collect();
        if !issues.is_empty() {
            writeln!(f)?;
            writeln!(f, "Box issues ({}):", issues.len())?;
            for issue in issues {
                writeln!(f, "  - {}", issue)?;
            }
        }

        Ok(())
    }
}
