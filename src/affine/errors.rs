//! Error types for the affine module

use thiserror::Error;

/// Errors raised by the voxel/reference converters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AffineError {
    /// An input matrix or vector does not have the shape the conversion needs
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Which argument was malformed ("affine" or "coordinate")
        what: &'static str,
        /// The expected shape, e.g. "4x4" or "3"
        expected: String,
        /// The shape that was supplied
        found: String,
    },

    /// The affine has no inverse, so reference coordinates cannot be mapped back
    #[error("Singular matrix: affine transform is not invertible")]
    SingularMatrix,
}

/// Extension of the Result type for affine operations
pub type Result<T> = std::result::Result<T, AffineError>;

/// Helper to build a coordinate length error
pub fn coordinate_len_err(found: usize) -> AffineError {
    AffineError::DimensionMismatch {
        what: "coordinate",
        expected: "3".to_string(),
        found: found.to_string(),
    }
}
