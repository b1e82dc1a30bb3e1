//! Typed 2D points.

use std::marker::PhantomData;

/// A point tagged with the coordinate space it lives in.
///
/// `TSpace` is [`Pixel`](super::Pixel) or [`Normalized`](super::Normalized).
#[derive(Clone, Copy, PartialEq)]
pub struct Coord<TSpace> {
    pub x: f64,
    pub y: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Pixel;

    #[test]
    fn coord_keeps_components() {
        let coord: Coord<Pixel> = Coord::new(640.0, 480.0);
        assert_eq!(coord.x, 640.0);
        assert_eq!(coord.y, 480.0);
    }
}
