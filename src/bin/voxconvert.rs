//! Voxel coordinate conversion between two volumes
//!
//! Maps a voxel of the source volume into the shared reference space, then
//! into the target volume's voxel grid, and back into the source grid as a
//! check. Prints the reference point, the target voxel and the source voxel,
//! one per line.
//!
//! Usage:
//!   cargo run --bin voxconvert -- [--source bold.nii.gz] [--target t1.nii.gz] [--voxel I J K]

use std::error::Error;

use clap::{ArgAction, Parser};
use log::debug;
use voxspace::coordinates;
use voxspace::logging::{init_logging, level_from_verbosity};
use voxspace::{convert, ConvertOptions, Volume};

/// Type alias for the error type used throughout this module
type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Voxel coordinate conversion tool
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Converts a voxel coordinate between two NIfTI volumes via their reference space",
    long_about = None
)]
struct Args {
    /// Volume the input voxel coordinate belongs to
    #[arg(short, long, default_value = "bold_y.nii.gz")]
    source: String,

    /// Volume to map the coordinate into
    #[arg(short, long, default_value = "t1_y.nii.gz")]
    target: String,

    /// Voxel coordinate in the source volume
    #[arg(
        long,
        num_args = 3,
        value_names = ["I", "J", "K"],
        default_values_t = [60.0, 27.0, 23.0],
        allow_negative_numbers = true
    )]
    voxel: Vec<f64>,

    /// Decimal places in printed coordinates
    #[arg(short, long, default_value_t = 4)]
    precision: usize,

    /// Print one JSON document instead of plain vectors
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Prefix each printed vector with the space it is in
    #[arg(short, long, action = ArgAction::SetTrue)]
    labels: bool,

    /// Fail unless both volumes are registered to the same template space
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn run(args: Args) -> Result<()> {
    let voxel = coordinates::from_slice(&args.voxel)?;
    debug!(
        "Converting voxel {} of {}",
        coordinates::formatted(&voxel, args.precision),
        args.source
    );

    let source = Volume::load(&args.source)?;
    let target = Volume::load(&args.target)?;

    let options = ConvertOptions {
        strict: args.strict,
    };
    let conversion = convert(&source, &target, &voxel, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&conversion)?);
    } else if args.labels {
        println!("{}", conversion.render_labelled(args.precision));
    } else {
        println!("{}", conversion.render(args.precision));
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    let level = (args.verbose > 0).then(|| level_from_verbosity(args.verbose));
    init_logging(level);

    if let Err(err) = run(args) {
        eprintln!("Error: {}", err);
        let mut cause = err.source();
        while let Some(inner) = cause {
            eprintln!("  caused by: {}", inner);
            cause = inner.source();
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["voxconvert"]);
        assert_eq!(args.source, "bold_y.nii.gz");
        assert_eq!(args.target, "t1_y.nii.gz");
        assert_eq!(args.voxel, vec![60.0, 27.0, 23.0]);
        assert_eq!(args.precision, 4);
        assert!(!args.json && !args.strict);
    }

    #[test]
    fn test_negative_voxel() {
        let args = Args::parse_from(["voxconvert", "--voxel", "-1", "2.5", "3", "-vv"]);
        assert_eq!(args.voxel, vec![-1.0, 2.5, 3.0]);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_voxel_needs_three_values() {
        assert!(Args::try_parse_from(["voxconvert", "--voxel", "1", "2"]).is_err());
    }
}
