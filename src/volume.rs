//! Volumes: a file on disk reduced to what coordinate conversion needs

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::affine::Affine;
use crate::nifti::{AffineSource, NiftiHeader, XformCode};
use crate::Result;

/// A loaded neuroimaging volume
#[derive(Debug, Clone)]
pub struct Volume {
    path: PathBuf,
    header: NiftiHeader,
    affine: Affine,
    affine_source: AffineSource,
}

impl Volume {
    /// Read a volume's header and pick its affine
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let header = NiftiHeader::from_file(path)?;
        let volume = Self::from_header(path, header)?;

        info!(
            "Loaded {} ({} affine, {} space)",
            path.display(),
            volume.affine_source,
            volume.reference_space()
        );
        Ok(volume)
    }

    /// Build from an already decoded header
    pub fn from_header<P: AsRef<Path>>(path: P, header: NiftiHeader) -> Result<Self> {
        let (affine, affine_source) = header.best_affine()?;
        debug!("Affine of {}:\n{}", path.as_ref().display(), affine);

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            header,
            affine,
            affine_source,
        })
    }

    /// Where the volume was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name, or the whole path if it has none
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Decoded header
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// Voxel-to-reference transform
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// Header fields the affine was built from
    pub fn affine_source(&self) -> AffineSource {
        self.affine_source
    }

    /// Space the affine maps into
    pub fn reference_space(&self) -> XformCode {
        self.header.reference_xform()
    }

    /// Volume extents
    pub fn shape(&self) -> Vec<usize> {
        self.header.shape()
    }

    /// Summary suitable for printing or serialising
    pub fn summary(&self) -> VolumeSummary {
        VolumeSummary {
            path: self.path.display().to_string(),
            endian: self.header.endian,
            shape: self.shape(),
            zooms: self.header.zooms(),
            datatype: self.header.datatype_name(),
            spatial_unit: self.header.spatial_unit(),
            description: self.header.descrip.clone(),
            sform_code: self.header.sform_xform(),
            qform_code: self.header.qform_xform(),
            affine_source: self.affine_source,
            reference_space: self.reference_space(),
            affine: self.affine.rows(),
            invertible: self.affine.is_invertible(),
            axis_codes: self.affine.axis_codes().iter().collect(),
        }
    }
}

/// Printable description of a volume's geometry
#[derive(Debug, Clone, Serialize)]
pub struct VolumeSummary {
    pub path: String,
    pub endian: crate::nifti::Endian,
    pub shape: Vec<usize>,
    pub zooms: Vec<f64>,
    pub datatype: &'static str,
    pub spatial_unit: &'static str,
    pub description: String,
    pub sform_code: XformCode,
    pub qform_code: XformCode,
    pub affine_source: AffineSource,
    pub reference_space: XformCode,
    pub affine: [[f64; 4]; 4],
    pub invertible: bool,
    pub axis_codes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VoxspaceError;
    use tempfile::tempdir;

    #[test]
    fn test_load_volume() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("t1_y.nii.gz");

        let affine = Affine::from_rows([
            [-1.0, 0.0, 0.0, 96.0],
            [0.0, 1.0, 0.0, -132.0],
            [0.0, 0.0, 1.0, -78.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        NiftiHeader::new(&[19, 23, 19], &affine, XformCode::Mni152)
            .unwrap()
            .save_zeroed(&path)
            .unwrap();

        let volume = Volume::load(&path).unwrap();
        assert_eq!(volume.name(), "t1_y.nii.gz");
        assert_eq!(volume.path(), path.as_path());
        assert_eq!(volume.affine(), &affine);
        assert_eq!(volume.affine_source(), AffineSource::Sform);
        assert_eq!(volume.reference_space(), XformCode::Mni152);
        assert_eq!(volume.shape(), vec![19, 23, 19]);

        let summary = volume.summary();
        assert_eq!(summary.axis_codes, "LAS");
        assert_eq!(summary.affine[0][3], 96.0);
    }

    #[test]
    fn test_load_missing_volume() {
        let temp_dir = tempdir().unwrap();
        let result = Volume::load(temp_dir.path().join("bold_y.nii.gz"));
        assert!(matches!(result, Err(VoxspaceError::Nifti(_))));
    }

    #[test]
    fn test_summary_serializes() {
        let affine = Affine::identity();
        let header = NiftiHeader::new(&[2, 2, 2], &affine, XformCode::ScannerAnat).unwrap();
        let volume = Volume::from_header("mem.nii", header).unwrap();

        let json = serde_json::to_value(volume.summary()).unwrap();
        assert_eq!(json["affine_source"], "sform");
        assert_eq!(json["reference_space"], "scanner_anat");
        assert_eq!(json["endian"], "little");
        assert_eq!(json["shape"], serde_json::json!([2, 2, 2]));
        assert_eq!(json["invertible"], true);
    }

    #[test]
    fn test_singular_sform_reported() {
        let mut header =
            NiftiHeader::new(&[2, 2, 2], &Affine::identity(), XformCode::Mni152).unwrap();
        header.srow_z = [0.0; 4];

        let volume = Volume::from_header("flat.nii", header).unwrap();
        assert_eq!(volume.affine_source(), AffineSource::Sform);
        assert!(!volume.summary().invertible);
    }
}
