//! Voxel -> reference -> voxel conversion between two volumes
//!
//! A point given in the source volume's voxel grid is mapped into the shared
//! reference space with the source affine, then back into voxel space
//! through the target affine and, as a round-trip check, through the source
//! affine again.

use log::{debug, warn};
use serde::{Serialize, Serializer};

use crate::coordinates::{formatted, Coord3, Space};
use crate::nifti::XformCode;
use crate::volume::Volume;
use crate::{Result, VoxspaceError};

/// Library-side settings for [`convert`]
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Refuse volumes that are not both registered to the same template space
    pub strict: bool,
}

/// How confidently two volumes share a reference space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceAgreement {
    /// Both map into the same template space
    Shared(XformCode),
    /// Same code, but not a template, so the spaces may still differ
    Unverified(XformCode),
    /// Different codes
    Different {
        source: XformCode,
        target: XformCode,
    },
}

/// Compare the reference space codes of two volumes
pub fn check_reference_spaces(source: XformCode, target: XformCode) -> SpaceAgreement {
    if source != target {
        SpaceAgreement::Different { source, target }
    } else if source.is_template() {
        SpaceAgreement::Shared(source)
    } else {
        SpaceAgreement::Unverified(source)
    }
}

fn serialize_coord<S>(v: &Coord3, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    [v.x, v.y, v.z].serialize(serializer)
}

/// Result of converting one voxel coordinate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    /// Name of the volume the input voxel belongs to
    pub source: String,
    /// Name of the volume the point is mapped into
    pub target: String,
    /// Input voxel coordinate in the source volume
    #[serde(serialize_with = "serialize_coord")]
    pub voxel: Coord3,
    /// Point in the shared reference space
    #[serde(serialize_with = "serialize_coord")]
    pub reference: Coord3,
    /// Point in the target volume's voxel space
    #[serde(serialize_with = "serialize_coord")]
    pub target_voxel: Coord3,
    /// Point mapped back into the source volume's voxel space
    #[serde(serialize_with = "serialize_coord")]
    pub source_voxel: Coord3,
}

impl Conversion {
    /// The three outputs in print order: reference, target voxel, source voxel
    pub fn outputs(&self) -> [(Space, Coord3); 3] {
        [
            (Space::Reference, self.reference),
            (Space::Voxel(self.target.clone()), self.target_voxel),
            (Space::Voxel(self.source.clone()), self.source_voxel),
        ]
    }

    /// One formatted vector per line, in print order
    pub fn render(&self, precision: usize) -> String {
        self.outputs()
            .iter()
            .map(|(_, coord)| formatted(coord, precision).to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Like [`render`](Self::render) with each line prefixed by its space
    pub fn render_labelled(&self, precision: usize) -> String {
        self.outputs()
            .iter()
            .map(|(space, coord)| format!("{}: {}", space, formatted(coord, precision)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Map `voxel` from `source`'s voxel space into `target`'s.
///
/// # Errors
///
/// - [`VoxspaceError::InvalidCoordinate`] for NaN or infinite input
/// - [`VoxspaceError::SpaceMismatch`] in strict mode when the volumes are not
///   both tagged with the same template space
/// - [`VoxspaceError::Affine`] when either affine is singular
pub fn convert(
    source: &Volume,
    target: &Volume,
    voxel: &Coord3,
    options: &ConvertOptions,
) -> Result<Conversion> {
    if voxel.iter().any(|c| !c.is_finite()) {
        return Err(VoxspaceError::InvalidCoordinate(format!(
            "voxel coordinate must be finite, got ({}, {}, {})",
            voxel.x, voxel.y, voxel.z
        )));
    }

    let agreement = check_reference_spaces(source.reference_space(), target.reference_space());
    match agreement {
        SpaceAgreement::Shared(code) => {
            debug!("{} and {} share the {} space", source.name(), target.name(), code)
        }
        SpaceAgreement::Unverified(code) => warn!(
            "{} and {} are both tagged {}, which is not a template space; \
             assuming they share a reference",
            source.name(),
            target.name(),
            code
        ),
        SpaceAgreement::Different {
            source: source_code,
            target: target_code,
        } => warn!(
            "{} maps into {} space but {} maps into {} space",
            source.name(),
            source_code,
            target.name(),
            target_code
        ),
    }

    if options.strict && !matches!(agreement, SpaceAgreement::Shared(_)) {
        return Err(VoxspaceError::SpaceMismatch {
            source_space: source.reference_space(),
            target_space: target.reference_space(),
        });
    }

    let reference = source.affine().to_reference(voxel);
    let target_voxel = target.affine().to_voxel(&reference)?;
    let source_voxel = source.affine().to_voxel(&reference)?;

    Ok(Conversion {
        source: source.name(),
        target: target.name(),
        voxel: *voxel,
        reference,
        target_voxel,
        source_voxel,
    })
}
