//! Voxspace: coordinate conversion between neuroimaging volumes
//!
//! Every volume in a study carries an affine transform mapping its voxel
//! indices into a physical or stereotactic reference space (MNI, Talairach,
//! scanner coordinates). Two volumes registered to the same reference can
//! therefore be related point by point: go forward through one affine, then
//! invert through the other.
//!
//! ```rust
//! use nalgebra::Vector3;
//! use voxspace::affine::Affine;
//!
//! let bold = Affine::from_rows([
//!     [2.0, 0.0, 0.0, 1.0],
//!     [0.0, 2.0, 0.0, 1.0],
//!     [0.0, 0.0, 2.0, 1.0],
//!     [0.0, 0.0, 0.0, 1.0],
//! ]);
//! let t1 = Affine::identity();
//!
//! let mni = bold.to_reference(&Vector3::new(1.0, 1.0, 1.0));
//! let voxel = t1.to_voxel(&mni).unwrap();
//! assert_eq!(voxel, Vector3::new(3.0, 3.0, 3.0));
//! ```

use thiserror::Error;

pub mod affine;
pub mod convert;
pub mod coordinates;
pub mod logging;
pub mod nifti;
pub mod volume;

// Re-export commonly used types
pub use affine::{mni2xyz, xyz2mni, Affine, AffineError};
pub use convert::{convert, Conversion, ConvertOptions};
pub use coordinates::Coord3;
pub use nifti::{NiftiError, NiftiHeader, XformCode};
pub use volume::Volume;

/// Main error type for the voxspace library
#[derive(Debug, Error)]
pub enum VoxspaceError {
    #[error("Affine error: {0}")]
    Affine(#[from] AffineError),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] NiftiError),

    #[error("Reference spaces differ: source maps into {source_space}, target into {target_space}")]
    SpaceMismatch {
        source_space: XformCode,
        target_space: XformCode,
    },

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// Result type for voxspace operations
pub type Result<T> = std::result::Result<T, VoxspaceError>;
