//! Affine transforms between voxel space and reference space
//!
//! A volume's affine is a 4x4 matrix that maps homogeneous voxel indices
//! `(i, j, k, 1)` onto homogeneous reference coordinates `(x, y, z, 1)`.
//! This module provides the two conversions built on it:
//!
//! - [`xyz2mni`]: voxel -> reference, a plain matrix-vector product
//! - [`mni2xyz`]: reference -> voxel, an LU solve of `A x = [v, 1]`
//!
//! The inverse direction never forms `A⁻¹` explicitly.
//!
//! ```rust
//! use nalgebra::{Matrix4, Vector3};
//! use voxspace::affine::{mni2xyz, xyz2mni};
//!
//! let affine = Matrix4::new(
//!     2.0, 0.0, 0.0, 1.0,
//!     0.0, 2.0, 0.0, 1.0,
//!     0.0, 0.0, 2.0, 1.0,
//!     0.0, 0.0, 0.0, 1.0,
//! );
//! let mni = xyz2mni(&affine, &Vector3::new(1.0, 1.0, 1.0));
//! assert_eq!(mni, Vector3::new(3.0, 3.0, 3.0));
//!
//! let voxel = mni2xyz(&affine, &mni).unwrap();
//! assert!((voxel - Vector3::new(1.0, 1.0, 1.0)).norm() < 1e-12);
//! ```

pub mod array;
pub mod errors;

use std::fmt;

use nalgebra::{Matrix3, Matrix4, Vector3};

use crate::coordinates::{from_homogeneous, to_homogeneous, Coord3};

pub use self::errors::{AffineError, Result};

/// Anatomical axis labels, negative direction first
const AXIS_LABELS: [(char, char); 3] = [('L', 'R'), ('P', 'A'), ('I', 'S')];

/// Map a voxel coordinate into reference space.
///
/// Appends 1 to `v`, multiplies by `affine` and drops the homogeneous
/// component again.
pub fn xyz2mni(affine: &Matrix4<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    from_homogeneous(&(affine * to_homogeneous(v)))
}

/// Map a reference coordinate back into voxel space.
///
/// Solves `affine * x = [v, 1]` by LU decomposition with partial pivoting
/// and returns the first three components of `x`.
///
/// # Errors
///
/// [`AffineError::SingularMatrix`] when `affine` is not invertible.
pub fn mni2xyz(affine: &Matrix4<f64>, v: &Vector3<f64>) -> Result<Vector3<f64>> {
    let solution = affine
        .lu()
        .solve(&to_homogeneous(v))
        .ok_or(AffineError::SingularMatrix)?;

    // A pivot that is tiny but non-zero still blows up the solve
    if solution.iter().any(|c| !c.is_finite()) {
        return Err(AffineError::SingularMatrix);
    }

    Ok(from_homogeneous(&solution))
}

/// A volume's voxel-to-reference transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    matrix: Matrix4<f64>,
}

impl Affine {
    /// Wrap a 4x4 matrix
    pub fn new(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// The identity transform (voxel space == reference space)
    pub fn identity() -> Self {
        Self::new(Matrix4::identity())
    }

    /// Build from row-major values, the layout NIfTI `srow_*` fields use
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self::new(Matrix4::from_fn(|r, c| rows[r][c]))
    }

    /// Pure translation by `offset`
    pub fn from_translation(offset: &Vector3<f64>) -> Self {
        Self::new(Matrix4::new_translation(offset))
    }

    /// Compose a 3x3 linear part with a translation
    pub fn from_parts(linear: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        let mut matrix = linear.to_homogeneous();
        matrix[(0, 3)] = translation.x;
        matrix[(1, 3)] = translation.y;
        matrix[(2, 3)] = translation.z;
        Self::new(matrix)
    }

    /// The underlying 4x4 matrix
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    /// Row-major copy of the matrix
    pub fn rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.matrix[(r, c)];
            }
        }
        rows
    }

    /// Upper-left 3x3 block (rotation, zoom and shear)
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Reference coordinate of voxel (0, 0, 0)
    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// Voxel edge lengths in reference units (column norms of the linear part)
    pub fn voxel_sizes(&self) -> Vector3<f64> {
        let linear = self.linear();
        Vector3::new(
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        )
    }

    /// Whether the reference -> voxel direction can be computed
    pub fn is_invertible(&self) -> bool {
        self.matrix.lu().is_invertible()
    }

    /// Orientation of each voxel axis as anatomical codes, e.g. `['R', 'A', 'S']`.
    ///
    /// Each voxel axis is assigned the reference axis it is most aligned with,
    /// skipping reference axes already taken. An axis with no usable
    /// component is reported as `'?'`.
    pub fn axis_codes(&self) -> [char; 3] {
        let linear = self.linear();
        let mut used = [false; 3];
        let mut codes = ['?'; 3];

        for (col, code) in codes.iter_mut().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for (row, taken) in used.iter().enumerate() {
                if *taken {
                    continue;
                }
                let value = linear[(row, col)];
                if value != 0.0 && best.map_or(true, |(_, b)| value.abs() > b.abs()) {
                    best = Some((row, value));
                }
            }

            if let Some((row, value)) = best {
                used[row] = true;
                let (negative, positive) = AXIS_LABELS[row];
                *code = if value > 0.0 { positive } else { negative };
            }
        }

        codes
    }

    /// Voxel -> reference, see [`xyz2mni`]
    pub fn to_reference(&self, voxel: &Coord3) -> Coord3 {
        xyz2mni(&self.matrix, voxel)
    }

    /// Reference -> voxel, see [`mni2xyz`]
    pub fn to_voxel(&self, reference: &Coord3) -> Result<Coord3> {
        mni2xyz(&self.matrix, reference)
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Matrix4<f64>> for Affine {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self::new(matrix)
    }
}

impl fmt::Display for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(4);
        for (i, row) in self.rows().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[")?;
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:>12.*}", precision, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}
