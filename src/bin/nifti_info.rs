//! NIfTI Header Information Tool
//!
//! This binary reads the headers of NIfTI-1 volumes (`.nii` or `.nii.gz`) and
//! prints the geometry relevant to coordinate conversion: shape, voxel sizes,
//! xform codes, the affine in use and the axis orientation.
//!
//! Usage:
//!   cargo run --bin nifti_info -- [--raw] [--json] path/to/volume.nii.gz...

use std::path::Path;

use clap::{ArgAction, Parser};
use voxspace::logging::{init_logging, level_from_verbosity};
use voxspace::nifti::NiftiHeader;
use voxspace::volume::VolumeSummary;
use voxspace::Volume;

/// Type alias for the error type used throughout this module
type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// NIfTI header information tool
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Displays geometry information stored in NIfTI-1 headers",
    long_about = None
)]
struct Args {
    /// Also display the raw sform and qform fields
    #[arg(short, long, action = ArgAction::SetTrue)]
    raw: bool,

    /// Print summaries as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Increase log verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Volumes to inspect
    #[arg(required = true)]
    files: Vec<String>,
}

/// Format bytes as KB, MB, or GB
fn format_size(size_bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size_bytes >= GB {
        format!("{:.2} GB", size_bytes as f64 / GB as f64)
    } else if size_bytes >= MB {
        format!("{:.2} MB", size_bytes as f64 / MB as f64)
    } else if size_bytes >= KB {
        format!("{:.2} KB", size_bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", size_bytes)
    }
}

/// Size of the voxel payload, or "unknown" when the shape overflows
fn data_size(header: &NiftiHeader) -> String {
    header
        .data_bytes()
        .map(format_size)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Prints a section header with a title and separator line
fn print_section_header(title: &str) {
    println!("\n{}:", title);
    println!("-------------------------------------------------------");
}

/// Helper to print named values in a formatted way
fn print_named_value(name: &str, value: impl std::fmt::Display) {
    println!("{}: {}", name, value);
}

fn join<T: std::fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" x ")
}

/// Displays shape, datatype and units
fn display_geometry(summary: &VolumeSummary, header: &NiftiHeader) {
    print_section_header("Geometry");
    print_named_value("Shape", join(&summary.shape));
    print_named_value("Voxel sizes", join(&summary.zooms));
    print_named_value("Spatial unit", summary.spatial_unit);
    print_named_value(
        "Datatype",
        format!("{} ({} bits)", summary.datatype, header.bitpix),
    );
    print_named_value("Byte order", format!("{:?}", summary.endian));
    print_named_value("Voxel data", data_size(header));
    if !summary.description.is_empty() {
        print_named_value("Description", &summary.description);
    }
}

fn invertibility(summary: &VolumeSummary) -> &'static str {
    if summary.invertible {
        "yes"
    } else {
        "no (voxel coordinates cannot be recovered)"
    }
}

/// Displays the affine chosen for coordinate conversion
fn display_affine(volume: &Volume, summary: &VolumeSummary) {
    print_section_header("Affine");
    print_named_value("sform code", summary.sform_code);
    print_named_value("qform code", summary.qform_code);
    print_named_value(
        "In use",
        format!("{} ({} space)", summary.affine_source, summary.reference_space),
    );
    print_named_value("Orientation", &summary.axis_codes);
    print_named_value("Invertible", invertibility(summary));
    println!("{:.4}", volume.affine());
}

/// Displays the raw transform fields
fn display_raw(header: &NiftiHeader) {
    print_section_header("Raw transform fields");
    print_named_value("srow_x", format!("{:?}", header.srow_x));
    print_named_value("srow_y", format!("{:?}", header.srow_y));
    print_named_value("srow_z", format!("{:?}", header.srow_z));
    print_named_value(
        "quatern",
        format!(
            "b={}, c={}, d={}",
            header.quatern_b, header.quatern_c, header.quatern_d
        ),
    );
    print_named_value(
        "qoffset",
        format!(
            "x={}, y={}, z={}",
            header.qoffset_x, header.qoffset_y, header.qoffset_z
        ),
    );
    print_named_value("qfac (pixdim[0])", header.pixdim[0]);

    match header.qform() {
        Ok(qform) => println!("qform affine:\n{:.4}", qform),
        Err(e) => println!("qform affine: unavailable ({})", e),
    }
}

fn display_volume(path: &str, args: &Args) -> Result<()> {
    let volume = Volume::load(path)?;
    let summary = volume.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Analyzing NIfTI volume: {}", path);
    println!("-------------------------------------------------------");
    let file_size = std::fs::metadata(Path::new(path))?.len();
    print_named_value("File size", format_size(file_size));

    display_geometry(&summary, volume.header());
    display_affine(&volume, &summary);
    if args.raw {
        display_raw(volume.header());
    }
    println!();

    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let level = (args.verbose > 0).then(|| level_from_verbosity(args.verbose));
    init_logging(level);

    for path in &args.files {
        display_volume(path, &args)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxspace::{Affine, XformCode};

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_data_size() {
        let mut header =
            NiftiHeader::new(&[4, 4, 4], &Affine::identity(), XformCode::Mni152).unwrap();
        assert_eq!(data_size(&header), "64 bytes");

        header.dim = [7, 32767, 32767, 32767, 32767, 32767, 32767, 32767];
        assert_eq!(data_size(&header), "unknown");
    }

    #[test]
    fn test_invertibility() {
        let mut header =
            NiftiHeader::new(&[4, 4, 4], &Affine::identity(), XformCode::Mni152).unwrap();
        let volume = Volume::from_header("a.nii", header.clone()).unwrap();
        assert_eq!(invertibility(&volume.summary()), "yes");

        header.srow_x = [0.0; 4];
        let volume = Volume::from_header("a.nii", header).unwrap();
        assert!(invertibility(&volume.summary()).starts_with("no"));
    }

    #[test]
    fn test_join() {
        assert_eq!(join(&[91, 109, 91]), "91 x 109 x 91");
    }

    #[test]
    fn test_files_required() {
        assert!(Args::try_parse_from(["nifti_info"]).is_err());
        let args = Args::try_parse_from(["nifti_info", "--raw", "a.nii", "b.nii.gz"]).unwrap();
        assert_eq!(args.files.len(), 2);
        assert!(args.raw);
    }
}
