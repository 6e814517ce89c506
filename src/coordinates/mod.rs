//! Coordinate vectors and the spaces they live in
//!
//! Coordinates are plain `nalgebra` 3-vectors. Which space a vector belongs to
//! is a matter of call-site convention; [`Space`] exists only to label output.

use std::fmt;

use nalgebra::{Vector3, Vector4};

use crate::affine::errors::{coordinate_len_err, AffineError};

/// A point in voxel or reference space
pub type Coord3 = Vector3<f64>;

/// Append the homogeneous 1
#[inline]
pub fn to_homogeneous(v: &Vector3<f64>) -> Vector4<f64> {
    Vector4::new(v.x, v.y, v.z, 1.0)
}

/// Drop the homogeneous component (no division, affine rows keep it at 1)
#[inline]
pub fn from_homogeneous(h: &Vector4<f64>) -> Vector3<f64> {
    Vector3::new(h.x, h.y, h.z)
}

/// Build a coordinate from exactly three values
pub fn from_slice(values: &[f64]) -> Result<Coord3, AffineError> {
    match values {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(coordinate_len_err(values.len())),
    }
}

/// The coordinate system a vector is expressed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Space {
    /// The shared stereotactic space both affines map into
    Reference,
    /// Voxel indices of the named volume
    Voxel(String),
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Reference => write!(f, "reference"),
            Space::Voxel(name) => write!(f, "voxel[{}]", name),
        }
    }
}

/// Display adapter printing a coordinate as `[x y z]` at a fixed precision
pub struct Formatted<'a> {
    coord: &'a Coord3,
    precision: usize,
}

/// Format `coord` with `precision` decimals
pub fn formatted(coord: &Coord3, precision: usize) -> Formatted<'_> {
    Formatted { coord, precision }
}

impl fmt::Display for Formatted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.precision;
        // -0.0 prints as 0
        let clean = |v: f64| if v == 0.0 { 0.0 } else { v };
        write!(
            f,
            "[{:.*} {:.*} {:.*}]",
            p,
            clean(self.coord.x),
            p,
            clean(self.coord.y),
            p,
            clean(self.coord.z)
        )
    }
}
