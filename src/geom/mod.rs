//! Typed bounding-box geometry.
//!
//! Coordinate spaces are tracked at the type level: [`Pixel`] for absolute
//! image coordinates and [`Normalized`] for 0.0–1.0 fractions of the chip
//! dimensions. Source annotations arrive in pixel space, get clipped and
//! translated during chipping, and only become normalized at YOLO
//! serialization time. The marker types make it impossible to mix the two
//! by accident.

mod bbox;

use std::fmt;
use std::marker::PhantomData;

pub use bbox::BBox;

/// Marker type for absolute pixel coordinates, (0, 0) at the top-left.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for coordinates normalized to 0.0–1.0 of the image extent.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {} // uninhabited
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {} // uninhabited
    }
}

/// A 2D point with a type-level marker for its coordinate space.
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

    /// Returns true if both components are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl<TSpace> fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
