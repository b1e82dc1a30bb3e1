//! Axis-aligned boxes in XYXY form.

use super::coord::Coord;
use super::{Normalized, Pixel};

/// An axis-aligned bounding box stored as (xmin, ymin, xmax, ymax).
///
/// The constructor does not enforce `min < max`. Flipped or empty boxes from
/// a bad annotation file must stay representable so the converter can report
/// them instead of panicking while reading.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
    }

    /// Builds a box from its center point and size.
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::from_xyxy(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Negative when the box is flipped horizontally.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Negative when the box is flipped vertically.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Center point and size as `(cx, cy, w, h)`.
    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        (
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            self.width(),
            self.height(),
        )
    }

    /// True when the box has strictly positive width and height.
    #[inline]
    pub fn has_area(&self) -> bool {
        self.min.x < self.max.x && self.min.y < self.max.y
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl BBoxXYXY<Pixel> {
    /// Builds a pixel box from the integer corners found in annotation files.
    #[inline]
    pub fn from_pixel_corners(xmin: i64, ymin: i64, xmax: i64, ymax: i64) -> Self {
        Self::from_xyxy(xmin as f64, ymin as f64, xmax as f64, ymax as f64)
    }

    /// Normalized `(cx, cy, w, h)` for a YOLO label line.
    ///
    /// Sums and differences are taken in pixel space before dividing, so the
    /// result is exactly `(xmin + xmax) / 2 / W` and `(xmax - xmin) / W`.
    pub fn to_normalized_cxcywh(&self, image_width: f64, image_height: f64) -> (f64, f64, f64, f64) {
        let (cx, cy, w, h) = self.to_cxcywh();
        (
            cx / image_width,
            cy / image_height,
            w / image_width,
            h / image_height,
        )
    }

    /// True when every corner lies inside a `width` x `height` image.
    pub fn is_within(&self, image_width: f64, image_height: f64) -> bool {
        self.min.x >= 0.0
            && self.min.y >= 0.0
            && self.max.x <= image_width
            && self.max.y <= image_height
    }
}

impl BBoxXYXY<Normalized> {
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.min.x * image_width,
            self.min.y * image_height,
            self.max.x * image_width,
            self.max.y * image_height,
        )
    }
}
