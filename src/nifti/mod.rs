//! NIfTI-1 header reading and writing
//!
//! Only the fixed 348-byte header is decoded; the voxel payload is never
//! touched. That is all a coordinate conversion needs: the header carries
//! the volume shape, the voxel sizes and the two affine encodings (sform and
//! qform).
//!
//! # Main Components
//!
//! - `header`: the raw header fields, byte order detection, read and write
//! - `xform`: xform codes and the rules choosing a volume's affine
//! - Error types for proper error handling
//!
//! Both plain `.nii` files and gzip-compressed `.nii.gz` files are read;
//! compression is detected from the content rather than the file name.

pub mod errors;
pub mod header;
pub mod xform;

// Re-export primary types for convenience
pub use self::errors::NiftiError;
pub use self::header::{Endian, NiftiHeader};
pub use self::xform::{AffineSource, XformCode};

/// Size of a NIfTI-1 header (bytes)
pub const HEADER_SIZE: usize = 348;
/// `sizeof_hdr` of a NIfTI-2 header, recognised only to reject it
pub const NIFTI2_HEADER_SIZE: i32 = 540;
/// Offset of voxel data in a single-file volume with an empty extension block
pub const DEFAULT_VOX_OFFSET: usize = 352;
/// Magic string of single-file (`.nii`) volumes
pub const MAGIC_SINGLE: &[u8; 4] = b"n+1\0";
/// Magic string of header/image pairs (`.hdr` + `.img`)
pub const MAGIC_PAIR: &[u8; 4] = b"ni1\0";
/// First two bytes of every gzip stream
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Check whether a byte prefix starts a gzip stream
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(&[0x1f]));
        assert!(!is_gzip(&[0x5c, 0x01, 0x00, 0x00]));
    }
}
