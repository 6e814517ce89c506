//! End-to-end conversion between two volumes written to disk

use std::path::Path;
use std::process::Command;

use approx::assert_relative_eq;
use nalgebra::Vector3;
use tempfile::tempdir;
use voxspace::nifti::{Endian, NiftiHeader, XformCode};
use voxspace::{convert, Affine, ConvertOptions, Volume, VoxspaceError};

/// 3 mm functional grid in MNI space
fn bold_affine() -> Affine {
    Affine::from_rows([
        [-3.0, 0.0, 0.0, 90.0],
        [0.0, 3.0, 0.0, -126.0],
        [0.0, 0.0, 3.0, -72.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

/// 1 mm structural grid in MNI space
fn t1_affine() -> Affine {
    Affine::from_rows([
        [-1.0, 0.0, 0.0, 90.0],
        [0.0, 1.0, 0.0, -126.0],
        [0.0, 0.0, 1.0, -72.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

fn write_volume(path: &Path, shape: &[usize], affine: &Affine, code: XformCode) {
    NiftiHeader::new(shape, affine, code)
        .unwrap()
        .save_zeroed(path)
        .unwrap();
}

fn write_study(dir: &Path) {
    write_volume(
        &dir.join("bold_y.nii.gz"),
        &[61, 73, 61],
        &bold_affine(),
        XformCode::Mni152,
    );
    write_volume(
        &dir.join("t1_y.nii.gz"),
        &[18, 22, 18],
        &t1_affine(),
        XformCode::Mni152,
    );
}

#[test]
fn test_bold_to_t1() {
    let temp_dir = tempdir().unwrap();
    write_study(temp_dir.path());

    let bold = Volume::load(temp_dir.path().join("bold_y.nii.gz")).unwrap();
    let t1 = Volume::load(temp_dir.path().join("t1_y.nii.gz")).unwrap();

    let result = convert(
        &bold,
        &t1,
        &Vector3::new(60.0, 27.0, 23.0),
        &ConvertOptions { strict: true },
    )
    .unwrap();

    assert_relative_eq!(result.reference, Vector3::new(-90.0, -45.0, -3.0));
    assert_relative_eq!(result.target_voxel, Vector3::new(180.0, 81.0, 69.0), epsilon = 1e-9);
    assert_relative_eq!(result.source_voxel, Vector3::new(60.0, 27.0, 23.0), epsilon = 1e-9);
}

#[test]
fn test_big_endian_uncompressed_target() {
    let temp_dir = tempdir().unwrap();
    let bold_path = temp_dir.path().join("bold.nii.gz");
    let t1_path = temp_dir.path().join("t1.nii");

    write_volume(&bold_path, &[4, 4, 4], &bold_affine(), XformCode::Mni152);
    let mut t1_header = NiftiHeader::new(&[4, 4, 4], &t1_affine(), XformCode::Mni152).unwrap();
    t1_header.endian = Endian::Big;
    t1_header.save_zeroed(&t1_path).unwrap();

    let bold = Volume::load(&bold_path).unwrap();
    let t1 = Volume::load(&t1_path).unwrap();
    assert_eq!(t1.header().endian, Endian::Big);

    let result = convert(&bold, &t1, &Vector3::new(0.0, 0.0, 0.0), &ConvertOptions::default())
        .unwrap();
    assert_relative_eq!(result.reference, Vector3::new(90.0, -126.0, -72.0));
    assert_relative_eq!(result.target_voxel, Vector3::zeros(), epsilon = 1e-9);
}

#[test]
fn test_strict_mode_with_scanner_space() {
    let temp_dir = tempdir().unwrap();
    let bold_path = temp_dir.path().join("bold.nii.gz");
    let t1_path = temp_dir.path().join("t1.nii.gz");
    write_volume(&bold_path, &[4, 4, 4], &bold_affine(), XformCode::ScannerAnat);
    write_volume(&t1_path, &[4, 4, 4], &t1_affine(), XformCode::ScannerAnat);

    let bold = Volume::load(&bold_path).unwrap();
    let t1 = Volume::load(&t1_path).unwrap();
    let v = Vector3::new(1.0, 2.0, 3.0);

    assert!(convert(&bold, &t1, &v, &ConvertOptions::default()).is_ok());
    assert!(matches!(
        convert(&bold, &t1, &v, &ConvertOptions { strict: true }),
        Err(VoxspaceError::SpaceMismatch { .. })
    ));
}

#[test]
fn test_cli_defaults() {
    let temp_dir = tempdir().unwrap();
    write_study(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_voxconvert"))
        .current_dir(temp_dir.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "[-90.0000 -45.0000 -3.0000]",
            "[180.0000 81.0000 69.0000]",
            "[60.0000 27.0000 23.0000]",
        ]
    );
}

#[test]
fn test_cli_json() {
    let temp_dir = tempdir().unwrap();
    write_study(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_voxconvert"))
        .current_dir(temp_dir.path())
        .args(["--json", "--voxel", "0", "0", "0"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["reference"], serde_json::json!([90.0, -126.0, -72.0]));
    assert_eq!(json["source"], "bold_y.nii.gz");
    assert_eq!(json["target"], "t1_y.nii.gz");
}

#[test]
fn test_cli_missing_volume() {
    let temp_dir = tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_voxconvert"))
        .current_dir(temp_dir.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("bold_y.nii.gz"));
}

#[test]
fn test_nifti_info_runs() {
    let temp_dir = tempdir().unwrap();
    write_study(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_nifti_info"))
        .current_dir(temp_dir.path())
        .args(["--raw", "bold_y.nii.gz", "t1_y.nii.gz"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Shape: 61 x 73 x 61"));
    assert!(stdout.contains("In use: sform (mni_152 space)"));
    assert!(stdout.contains("Orientation: LAS"));
}
