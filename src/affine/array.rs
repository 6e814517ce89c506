//! Shape-checked converters over dynamically sized arrays
//!
//! These accept `ndarray` views whose shapes are only known at runtime (for
//! example matrices read from text or handed over from another tool) and
//! reject anything that is not a 4x4 affine and a 3-element coordinate
//! before delegating to the fixed-size converters.

use nalgebra::{Matrix4, Vector3};
use ndarray::{Array1, ArrayView1, ArrayView2};

use super::errors::{coordinate_len_err, AffineError, Result};

/// Copy a 4x4 view into a fixed-size matrix
pub fn affine_from_view(affine: ArrayView2<f64>) -> Result<Matrix4<f64>> {
    let (rows, cols) = affine.dim();
    if (rows, cols) != (4, 4) {
        return Err(AffineError::DimensionMismatch {
            what: "affine",
            expected: "4x4".to_string(),
            found: format!("{}x{}", rows, cols),
        });
    }
    Ok(Matrix4::from_fn(|r, c| affine[[r, c]]))
}

/// Copy a length-3 view into a fixed-size vector
pub fn coordinate_from_view(v: ArrayView1<f64>) -> Result<Vector3<f64>> {
    if v.len() != 3 {
        return Err(coordinate_len_err(v.len()));
    }
    Ok(Vector3::new(v[0], v[1], v[2]))
}

fn to_array(v: Vector3<f64>) -> Array1<f64> {
    Array1::from(vec![v.x, v.y, v.z])
}

/// Voxel -> reference with runtime shape checks
pub fn xyz2mni(affine: ArrayView2<f64>, v: ArrayView1<f64>) -> Result<Array1<f64>> {
    let matrix = affine_from_view(affine)?;
    let coord = coordinate_from_view(v)?;
    Ok(to_array(super::xyz2mni(&matrix, &coord)))
}

/// Reference -> voxel with runtime shape checks
pub fn mni2xyz(affine: ArrayView2<f64>, v: ArrayView1<f64>) -> Result<Array1<f64>> {
    let matrix = affine_from_view(affine)?;
    let coord = coordinate_from_view(v)?;
    Ok(to_array(super::mni2xyz(&matrix, &coord)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, arr2, Array2};

    fn scaled() -> Array2<f64> {
        arr2(&[
            [2.0, 0.0, 0.0, 1.0],
            [0.0, 2.0, 0.0, 1.0],
            [0.0, 0.0, 2.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    #[test]
    fn test_scenario_through_arrays() {
        let a = scaled();
        let mni = xyz2mni(a.view(), arr1(&[1.0, 1.0, 1.0]).view()).unwrap();
        assert_eq!(mni, arr1(&[3.0, 3.0, 3.0]));

        let voxel = mni2xyz(a.view(), mni.view()).unwrap();
        for (got, want) in voxel.iter().zip([1.0, 1.0, 1.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_two_vector_is_dimension_error() {
        let a = scaled();
        let short = arr1(&[1.0, 2.0]);

        for result in [
            xyz2mni(a.view(), short.view()),
            mni2xyz(a.view(), short.view()),
        ] {
            match result {
                Err(AffineError::DimensionMismatch { what, expected, found }) => {
                    assert_eq!(what, "coordinate");
                    assert_eq!(expected, "3");
                    assert_eq!(found, "2");
                }
                other => panic!("Expected DimensionMismatch, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_square_affine_is_dimension_error() {
        let a = Array2::<f64>::eye(3);
        let result = xyz2mni(a.view(), arr1(&[1.0, 2.0, 3.0]).view());
        assert!(matches!(
            result,
            Err(AffineError::DimensionMismatch { what: "affine", .. })
        ));
    }

    #[test]
    fn test_zero_affine_is_singular() {
        let a = Array2::<f64>::zeros((4, 4));
        let result = mni2xyz(a.view(), arr1(&[1.0, 2.0, 3.0]).view());
        assert_eq!(result, Err(AffineError::SingularMatrix));
    }
}
