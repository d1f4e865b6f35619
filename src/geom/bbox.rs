//! Axis-aligned bounding boxes in canonical XYXY form.

use super::{Coord, Normalized, Pixel};

/// An axis-aligned bounding box (xmin, ymin, xmax, ymax).
///
/// The `TSpace` parameter is either [`Pixel`] or [`Normalized`]. The
/// constructor does not enforce min <= max: source annotation data is
/// occasionally malformed and callers decide whether to drop or repair
/// such boxes.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBox<TSpace> {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
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

    /// Width of the box; negative when the box is malformed.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the box; negative when the box is malformed.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Returns true if the box is properly ordered (min <= max on both axes).
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Center/size representation: (cx, cy, w, h).
    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        (
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            self.width(),
            self.height(),
        )
    }

    /// Builds a box from center/size representation.
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::from_xyxy(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }
}

impl BBox<Pixel> {
    /// Intersects this box with `other`, returning `None` when the overlap
    /// has no positive area. Zero-area contact (shared edge or corner)
    /// counts as no overlap.
    pub fn intersect(&self, other: &BBox<Pixel>) -> Option<BBox<Pixel>> {
        let xmin = self.min.x.max(other.min.x);
        let ymin = self.min.y.max(other.min.y);
        let xmax = self.max.x.min(other.max.x);
        let ymax = self.max.y.min(other.max.y);

        if xmin < xmax && ymin < ymax {
            Some(BBox::from_xyxy(xmin, ymin, xmax, ymax))
        } else {
            None
        }
    }

    /// Shifts the box by (dx, dy).
    #[inline]
    pub fn translate(&self, dx: f64, dy: f64) -> BBox<Pixel> {
        BBox::from_xyxy(
            self.min.x + dx,
            self.min.y + dy,
            self.max.x + dx,
            self.max.y + dy,
        )
    }

    /// Converts pixel coordinates to fractions of the given image extent.
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBox<Normalized> {
        BBox::from_xyxy(
            self.min.x / image_width,
            self.min.y / image_height,
            self.max.x / image_width,
            self.max.y / image_height,
        )
    }
}

impl BBox<Normalized> {
    /// Converts normalized coordinates to pixels of the given image extent.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBox<Pixel> {
        BBox::from_xyxy(
            self.min.x * image_width,
            self.min.y * image_height,
            self.max.x * image_width,
            self.max.y * image_height,
        )
    }
}

impl<TSpace> std::fmt::Debug for BBox<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBox")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl<TSpace> Default for BBox<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}
