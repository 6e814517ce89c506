//! Choosing a volume's affine from its header
//!
//! A NIfTI-1 header can describe the voxel-to-world mapping in two ways: the
//! sform (three explicit affine rows) and the qform (a rotation quaternion,
//! voxel sizes and an offset). Each carries a code naming the space it maps
//! into. Readers pick the sform when its code is set, fall back to the
//! qform, and finally to a centred scaling built from the voxel sizes.

use std::fmt;

use log::warn;
use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};
use serde::Serialize;

use super::errors::{NiftiError, Result};
use super::header::NiftiHeader;
use crate::affine::Affine;

/// Largest negative `1 - (b² + c² + d²)` still treated as a unit quaternion
const QUATERNION_TOLERANCE: f64 = 3.0 * f32::EPSILON as f64;

/// Space an sform or qform maps into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum XformCode {
    /// Arbitrary coordinates
    Unknown,
    /// Scanner-based anatomical coordinates
    ScannerAnat,
    /// Coordinates aligned to another file or to "truth"
    AlignedAnat,
    /// Talairach-Tournoux atlas space
    Talairach,
    /// MNI 152 normalized space
    Mni152,
    /// Some other template space
    TemplateOther,
    /// Any other raw value
    Other(i16),
}

impl XformCode {
    /// Raw header value
    pub fn code(self) -> i16 {
        match self {
            XformCode::Unknown => 0,
            XformCode::ScannerAnat => 1,
            XformCode::AlignedAnat => 2,
            XformCode::Talairach => 3,
            XformCode::Mni152 => 4,
            XformCode::TemplateOther => 5,
            XformCode::Other(code) => code,
        }
    }

    /// Whether the code names a stereotactic template shared across subjects
    pub fn is_template(self) -> bool {
        matches!(
            self,
            XformCode::Talairach | XformCode::Mni152 | XformCode::TemplateOther
        )
    }
}

impl From<i16> for XformCode {
    fn from(code: i16) -> Self {
        match code {
            0 => XformCode::Unknown,
            1 => XformCode::ScannerAnat,
            2 => XformCode::AlignedAnat,
            3 => XformCode::Talairach,
            4 => XformCode::Mni152,
            5 => XformCode::TemplateOther,
            other => XformCode::Other(other),
        }
    }
}

impl fmt::Display for XformCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XformCode::Unknown => write!(f, "unknown"),
            XformCode::ScannerAnat => write!(f, "scanner_anat"),
            XformCode::AlignedAnat => write!(f, "aligned_anat"),
            XformCode::Talairach => write!(f, "talairach"),
            XformCode::Mni152 => write!(f, "mni_152"),
            XformCode::TemplateOther => write!(f, "template_other"),
            XformCode::Other(code) => write!(f, "code {}", code),
        }
    }
}

/// Which header fields produced a volume's affine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AffineSource {
    Sform,
    Qform,
    Base,
}

impl fmt::Display for AffineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffineSource::Sform => write!(f, "sform"),
            AffineSource::Qform => write!(f, "qform"),
            AffineSource::Base => write!(f, "base"),
        }
    }
}

impl NiftiHeader {
    /// Code attached to the sform
    pub fn sform_xform(&self) -> XformCode {
        XformCode::from(self.sform_code)
    }

    /// Code attached to the qform
    pub fn qform_xform(&self) -> XformCode {
        XformCode::from(self.qform_code)
    }

    /// Affine stored in the `srow_*` fields, regardless of `sform_code`
    pub fn sform(&self) -> Affine {
        let row = |r: &[f32; 4]| r.map(|v| v as f64);
        Affine::from_rows([
            row(&self.srow_x),
            row(&self.srow_y),
            row(&self.srow_z),
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Affine encoded by the quaternion fields, regardless of `qform_code`
    ///
    /// # Errors
    ///
    /// [`NiftiError::InvalidFormat`] if `(b, c, d)` is longer than a unit
    /// quaternion allows or a voxel size is negative.
    pub fn qform(&self) -> Result<Affine> {
        let b = self.quatern_b as f64;
        let c = self.quatern_c as f64;
        let d = self.quatern_d as f64;

        let w2 = 1.0 - (b * b + c * c + d * d);
        if w2 < -QUATERNION_TOLERANCE {
            return Err(NiftiError::InvalidFormat(format!(
                "quaternion (b, c, d) = ({}, {}, {}) is not a unit quaternion",
                b, c, d
            )));
        }
        let a = w2.max(0.0).sqrt();
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(a, b, c, d))
            .to_rotation_matrix()
            .into_inner();

        let zooms = Vector3::new(
            self.pixdim[1] as f64,
            self.pixdim[2] as f64,
            self.pixdim[3] as f64,
        );
        if zooms.iter().any(|&z| z < 0.0) {
            return Err(NiftiError::InvalidFormat(format!(
                "pixdim[1..=3] must be non-negative, got {:?}",
                &self.pixdim[1..4]
            )));
        }

        let qfac = if self.pixdim[0] == -1.0 {
            -1.0
        } else {
            if self.pixdim[0] != 1.0 {
                warn!(
                    "qfac (pixdim[0]) is {}, should be 1 or -1; using 1",
                    self.pixdim[0]
                );
            }
            1.0
        };

        let scale = Matrix3::from_diagonal(&Vector3::new(zooms.x, zooms.y, zooms.z * qfac));
        let offset = Vector3::new(
            self.qoffset_x as f64,
            self.qoffset_y as f64,
            self.qoffset_z as f64,
        );

        Ok(Affine::from_parts(&(rotation * scale), &offset))
    }

    /// Fallback affine from shape and voxel sizes alone.
    ///
    /// Scales by the voxel sizes with the x axis flipped (radiological
    /// convention) and places the centre of the volume at the origin.
    pub fn base_affine(&self) -> Affine {
        let mut shape = [1.0f64; 3];
        let mut zooms = [1.0f64; 3];
        for i in 0..self.ndim().min(3) {
            shape[i] = self.dim[i + 1] as f64;
            zooms[i] = self.pixdim[i + 1] as f64;
        }
        zooms[0] = -zooms[0];

        let linear = Matrix3::from_diagonal(&Vector3::from(zooms));
        let translation = Vector3::from_fn(|i, _| -(shape[i] - 1.0) / 2.0 * zooms[i]);
        Affine::from_parts(&linear, &translation)
    }

    /// The affine a reader should use, and where it came from.
    ///
    /// Any nonzero code selects its transform, negative ones included.
    pub fn best_affine(&self) -> Result<(Affine, AffineSource)> {
        if self.sform_code != 0 {
            Ok((self.sform(), AffineSource::Sform))
        } else if self.qform_code != 0 {
            Ok((self.qform()?, AffineSource::Qform))
        } else {
            Ok((self.base_affine(), AffineSource::Base))
        }
    }

    /// Code of the space [`best_affine`](Self::best_affine) maps into
    pub fn reference_xform(&self) -> XformCode {
        if self.sform_code != 0 {
            self.sform_xform()
        } else if self.qform_code != 0 {
            self.qform_xform()
        } else {
            XformCode::Unknown
        }
    }
}
