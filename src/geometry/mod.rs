//! Bounding-box geometry shared by the converter.
//!
//! Annotation files describe boxes as integer pixel corners; YOLO label files
//! want center and size as fractions of the image. The types here keep the two
//! spaces apart at compile time:
//!
//! ```
//! use endoyolo::geometry::{BBoxXYXY, Pixel};
//!
//! let bbox = BBoxXYXY::<Pixel>::from_pixel_corners(100, 50, 300, 250);
//! let (cx, cy, w, _h) = bbox.to_normalized_cxcywh(640.0, 480.0);
//! assert_eq!((cx, cy, w), (0.3125, 0.3125, 0.3125));
//! ```

mod bbox;
mod coord;
mod space;

pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use space::{Normalized, Pixel};
