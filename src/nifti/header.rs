//! NIfTI-1 header decoding and encoding
//!
//! The header is a fixed 348-byte record. Its byte order is not flagged
//! anywhere explicitly: a reader decodes `sizeof_hdr` both ways and keeps the
//! order in which it reads 348.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use serde::Serialize;

use super::errors::{io_err, with_path, NiftiError, Result};
use super::xform::XformCode;
use super::{
    is_gzip, DEFAULT_VOX_OFFSET, HEADER_SIZE, MAGIC_PAIR, MAGIC_SINGLE, NIFTI2_HEADER_SIZE,
};
use crate::affine::Affine;

/// NIfTI datatype code for unsigned 8-bit voxels
pub const DT_UINT8: i16 = 2;
/// `xyzt_units` value for millimetres and seconds
const UNITS_MM_SEC: u8 = 2 | 8;

/// Header byte order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    Big,
    Little,
}

/// Decoded NIfTI-1 header
///
/// Legacy ANALYZE fields that NIfTI-1 marks as unused (`data_type`,
/// `db_name`, `extents`, `session_error`, `glmax`, `glmin`) are skipped on
/// read and zeroed on write.
#[derive(Clone, Debug, PartialEq)]
pub struct NiftiHeader {
    /// Byte order the header was read in (and will be written in)
    pub endian: Endian,
    /// MRI slice ordering
    pub dim_info: u8,
    /// `dim[0]` is the number of dimensions, `dim[1..=dim[0]]` the extents
    pub dim: [i16; 8],
    /// Intent parameters
    pub intent_p: [f32; 3],
    /// Intent code
    pub intent_code: i16,
    /// Voxel datatype code
    pub datatype: i16,
    /// Bits per voxel
    pub bitpix: i16,
    /// First slice index
    pub slice_start: i16,
    /// `pixdim[0]` is qfac, `pixdim[1..=3]` the voxel sizes
    pub pixdim: [f32; 8],
    /// Byte offset of voxel data in a `.nii` file
    pub vox_offset: f32,
    /// Data scaling slope
    pub scl_slope: f32,
    /// Data scaling intercept
    pub scl_inter: f32,
    /// Last slice index
    pub slice_end: i16,
    /// Slice timing order
    pub slice_code: u8,
    /// Spatial and temporal units packed into one byte
    pub xyzt_units: u8,
    /// Display range maximum
    pub cal_max: f32,
    /// Display range minimum
    pub cal_min: f32,
    /// Time to acquire one slice
    pub slice_duration: f32,
    /// Time axis shift
    pub toffset: f32,
    /// Free-form description (80 bytes on disk)
    pub descrip: String,
    /// Auxiliary file name (24 bytes on disk)
    pub aux_file: String,
    /// Space the qform maps into
    pub qform_code: i16,
    /// Space the sform maps into
    pub sform_code: i16,
    /// Quaternion b parameter
    pub quatern_b: f32,
    /// Quaternion c parameter
    pub quatern_c: f32,
    /// Quaternion d parameter
    pub quatern_d: f32,
    /// Quaternion x shift
    pub qoffset_x: f32,
    /// Quaternion y shift
    pub qoffset_y: f32,
    /// Quaternion z shift
    pub qoffset_z: f32,
    /// First row of the sform affine
    pub srow_x: [f32; 4],
    /// Second row of the sform affine
    pub srow_y: [f32; 4],
    /// Third row of the sform affine
    pub srow_z: [f32; 4],
    /// Name or meaning of the data (16 bytes on disk)
    pub intent_name: String,
    /// `n+1\0` or `ni1\0`
    pub magic: [u8; 4],
}

impl NiftiHeader {
    /// Build a single-file header for a `uint8` volume of the given shape whose
    /// sform is `affine`, tagged with `code`.
    ///
    /// The qform is left unset (`qform_code = 0`). `pixdim[1..=3]` are the
    /// affine's voxel sizes.
    pub fn new(shape: &[usize], affine: &Affine, code: XformCode) -> Result<Self> {
        if shape.is_empty() || shape.len() > 7 {
            return Err(NiftiError::InvalidFormat(format!(
                "volume must have 1 to 7 dimensions, got {}",
                shape.len()
            )));
        }

        let mut dim = [1i16; 8];
        dim[0] = shape.len() as i16;
        for (slot, &extent) in dim[1..].iter_mut().zip(shape) {
            *slot = i16::try_from(extent).map_err(|_| {
                NiftiError::InvalidFormat(format!("dimension {} exceeds {}", extent, i16::MAX))
            })?;
        }

        let mut pixdim = [1.0f32; 8];
        let sizes = affine.voxel_sizes();
        pixdim[1] = sizes.x as f32;
        pixdim[2] = sizes.y as f32;
        pixdim[3] = sizes.z as f32;

        let rows = affine.rows();
        let row = |r: usize| rows[r].map(|v| v as f32);

        Ok(Self {
            endian: Endian::Little,
            dim_info: 0,
            dim,
            intent_p: [0.0; 3],
            intent_code: 0,
            datatype: DT_UINT8,
            bitpix: 8,
            slice_start: 0,
            pixdim,
            vox_offset: DEFAULT_VOX_OFFSET as f32,
            scl_slope: 1.0,
            scl_inter: 0.0,
            slice_end: 0,
            slice_code: 0,
            xyzt_units: UNITS_MM_SEC,
            cal_max: 0.0,
            cal_min: 0.0,
            slice_duration: 0.0,
            toffset: 0.0,
            descrip: String::from("voxspace"),
            aux_file: String::new(),
            qform_code: 0,
            sform_code: code.code(),
            quatern_b: 0.0,
            quatern_c: 0.0,
            quatern_d: 0.0,
            qoffset_x: 0.0,
            qoffset_y: 0.0,
            qoffset_z: 0.0,
            srow_x: row(0),
            srow_y: row(1),
            srow_z: row(2),
            intent_name: String::new(),
            magic: *MAGIC_SINGLE,
        })
    }

    /// Read the header of a `.nii` or `.nii.gz` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| io_err(path, e))?;
        let mut reader = BufReader::new(file);

        // Peek without consuming so the decoder sees the whole stream
        let gzipped = is_gzip(reader.fill_buf().map_err(|e| io_err(path, e))?);

        let header = if gzipped {
            debug!("Reading gzipped NIfTI header: {}", path.display());
            Self::read(&mut GzDecoder::new(reader))
        } else {
            debug!("Reading NIfTI header: {}", path.display());
            Self::read(&mut reader)
        };

        header.map_err(|e| with_path(path, e))
    }

    /// Read a header from the start of an uncompressed stream
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];

        // sizeof_hdr first: NIfTI-2 must be rejected before it looks truncated
        read_header_bytes(reader, &mut buf[..4])?;
        let endian = detect_endian(&buf[..4])?;
        read_header_bytes(reader, &mut buf[4..])?;

        match endian {
            Endian::Little => Self::decode::<LittleEndian>(&buf, endian),
            Endian::Big => Self::decode::<BigEndian>(&buf, endian),
        }
    }

    fn decode<E: ByteOrder>(buf: &[u8], endian: Endian) -> Result<Self> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[344..348]);
        if &magic != MAGIC_SINGLE && &magic != MAGIC_PAIR {
            return Err(NiftiError::InvalidFormat(format!(
                "bad magic {:?}, expected \"n+1\" or \"ni1\"",
                String::from_utf8_lossy(&magic)
            )));
        }

        let dim = read_i16s::<E, 8>(buf, 40);
        if !(1..=7).contains(&dim[0]) {
            return Err(NiftiError::InvalidFormat(format!(
                "dim[0] must be between 1 and 7, got {}",
                dim[0]
            )));
        }

        Ok(Self {
            endian,
            dim_info: buf[39],
            dim,
            intent_p: read_f32s::<E, 3>(buf, 56),
            intent_code: E::read_i16(&buf[68..]),
            datatype: E::read_i16(&buf[70..]),
            bitpix: E::read_i16(&buf[72..]),
            slice_start: E::read_i16(&buf[74..]),
            pixdim: read_f32s::<E, 8>(buf, 76),
            vox_offset: E::read_f32(&buf[108..]),
            scl_slope: E::read_f32(&buf[112..]),
            scl_inter: E::read_f32(&buf[116..]),
            slice_end: E::read_i16(&buf[120..]),
            slice_code: buf[122],
            xyzt_units: buf[123],
            cal_max: E::read_f32(&buf[124..]),
            cal_min: E::read_f32(&buf[128..]),
            slice_duration: E::read_f32(&buf[132..]),
            toffset: E::read_f32(&buf[136..]),
            descrip: read_str(&buf[148..228]),
            aux_file: read_str(&buf[228..252]),
            qform_code: E::read_i16(&buf[252..]),
            sform_code: E::read_i16(&buf[254..]),
            quatern_b: E::read_f32(&buf[256..]),
            quatern_c: E::read_f32(&buf[260..]),
            quatern_d: E::read_f32(&buf[264..]),
            qoffset_x: E::read_f32(&buf[268..]),
            qoffset_y: E::read_f32(&buf[272..]),
            qoffset_z: E::read_f32(&buf[276..]),
            srow_x: read_f32s::<E, 4>(buf, 280),
            srow_y: read_f32s::<E, 4>(buf, 296),
            srow_z: read_f32s::<E, 4>(buf, 312),
            intent_name: read_str(&buf[328..344]),
            magic,
        })
    }

    /// Write the 348 header bytes in the header's own byte order
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buf = [0u8; HEADER_SIZE];
        match self.endian {
            Endian::Little => self.encode::<LittleEndian>(&mut buf),
            Endian::Big => self.encode::<BigEndian>(&mut buf),
        }
        writer.write_all(&buf)?;
        Ok(())
    }

    fn encode<E: ByteOrder>(&self, buf: &mut [u8]) {
        E::write_i32(&mut buf[0..], HEADER_SIZE as i32);
        buf[38] = b'r';
        buf[39] = self.dim_info;
        write_i16s::<E>(buf, 40, &self.dim);
        write_f32s::<E>(buf, 56, &self.intent_p);
        E::write_i16(&mut buf[68..], self.intent_code);
        E::write_i16(&mut buf[70..], self.datatype);
        E::write_i16(&mut buf[72..], self.bitpix);
        E::write_i16(&mut buf[74..], self.slice_start);
        write_f32s::<E>(buf, 76, &self.pixdim);
        E::write_f32(&mut buf[108..], self.vox_offset);
        E::write_f32(&mut buf[112..], self.scl_slope);
        E::write_f32(&mut buf[116..], self.scl_inter);
        E::write_i16(&mut buf[120..], self.slice_end);
        buf[122] = self.slice_code;
        buf[123] = self.xyzt_units;
        E::write_f32(&mut buf[124..], self.cal_max);
        E::write_f32(&mut buf[128..], self.cal_min);
        E::write_f32(&mut buf[132..], self.slice_duration);
        E::write_f32(&mut buf[136..], self.toffset);
        write_str(&mut buf[148..228], &self.descrip);
        write_str(&mut buf[228..252], &self.aux_file);
        E::write_i16(&mut buf[252..], self.qform_code);
        E::write_i16(&mut buf[254..], self.sform_code);
        E::write_f32(&mut buf[256..], self.quatern_b);
        E::write_f32(&mut buf[260..], self.quatern_c);
        E::write_f32(&mut buf[264..], self.quatern_d);
        E::write_f32(&mut buf[268..], self.qoffset_x);
        E::write_f32(&mut buf[272..], self.qoffset_y);
        E::write_f32(&mut buf[276..], self.qoffset_z);
        write_f32s::<E>(buf, 280, &self.srow_x);
        write_f32s::<E>(buf, 296, &self.srow_y);
        write_f32s::<E>(buf, 312, &self.srow_z);
        write_str(&mut buf[328..344], &self.intent_name);
        buf[344..348].copy_from_slice(&self.magic);
    }

    /// Write a complete single-file volume with all voxels zero.
    ///
    /// The file is gzip-compressed when `path` ends in `.gz`.
    pub fn save_zeroed<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| io_err(path, e))?;
        let gzipped = path.extension().map_or(false, |ext| ext == "gz");

        let result = if gzipped {
            let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            self.write_zeroed_volume(&mut encoder)
                .and_then(|_| Ok(encoder.finish()?.flush()?))
        } else {
            let mut writer = BufWriter::new(file);
            self.write_zeroed_volume(&mut writer)
                .and_then(|_| Ok(writer.flush()?))
        };

        result.map_err(|e| with_path(path, e))
    }

    fn write_zeroed_volume<W: Write>(&self, writer: &mut W) -> Result<()> {
        let data_bytes = self.data_bytes().ok_or_else(|| {
            NiftiError::InvalidFormat(format!("voxel data too large: shape {:?}", self.shape()))
        })?;
        self.write(writer)?;

        // Extension flag bytes plus any padding up to vox_offset
        let data_start = (self.vox_offset.max(0.0) as usize).max(DEFAULT_VOX_OFFSET);
        let payload = (data_start - HEADER_SIZE) as u64 + data_bytes;
        io::copy(&mut io::repeat(0).take(payload), writer)?;
        Ok(())
    }

    /// Number of dimensions (`dim[0]`)
    pub fn ndim(&self) -> usize {
        self.dim[0].clamp(0, 7) as usize
    }

    /// Extent of each dimension
    pub fn shape(&self) -> Vec<usize> {
        self.dim[1..=self.ndim()]
            .iter()
            .map(|&d| d.max(0) as usize)
            .collect()
    }

    /// Voxel size along each dimension
    pub fn zooms(&self) -> Vec<f64> {
        self.pixdim[1..=self.ndim()]
            .iter()
            .map(|&p| p as f64)
            .collect()
    }

    /// Total number of voxels, `None` if it does not fit in a `u64`
    pub fn voxel_count(&self) -> Option<u64> {
        self.shape()
            .iter()
            .try_fold(1u64, |count, &d| count.checked_mul(d as u64))
    }

    /// Size of the voxel payload in bytes, `None` if it does not fit in a `u64`
    pub fn data_bytes(&self) -> Option<u64> {
        self.voxel_count()?
            .checked_mul(self.bitpix.max(0) as u64)
            .map(|bits| bits / 8)
    }

    /// Human-readable name of the voxel datatype
    pub fn datatype_name(&self) -> &'static str {
        match self.datatype {
            2 => "uint8",
            4 => "int16",
            8 => "int32",
            16 => "float32",
            32 => "complex64",
            64 => "float64",
            128 => "rgb24",
            256 => "int8",
            512 => "uint16",
            768 => "uint32",
            1024 => "int64",
            1280 => "uint64",
            1536 => "float128",
            1792 => "complex128",
            2304 => "rgba32",
            _ => "unknown",
        }
    }

    /// Unit of the spatial axes
    pub fn spatial_unit(&self) -> &'static str {
        match self.xyzt_units & 0x07 {
            1 => "m",
            2 => "mm",
            3 => "um",
            _ => "unknown",
        }
    }
}

/// Work out the byte order from `sizeof_hdr`
fn detect_endian(bytes: &[u8]) -> Result<Endian> {
    let little = LittleEndian::read_i32(bytes);
    let big = BigEndian::read_i32(bytes);

    if little == HEADER_SIZE as i32 {
        Ok(Endian::Little)
    } else if big == HEADER_SIZE as i32 {
        Ok(Endian::Big)
    } else if little == NIFTI2_HEADER_SIZE || big == NIFTI2_HEADER_SIZE {
        Err(NiftiError::UnsupportedVersion(NIFTI2_HEADER_SIZE))
    } else {
        Err(NiftiError::InvalidFormat(format!(
            "sizeof_hdr is {} (little-endian) / {} (big-endian), expected {}",
            little, big, HEADER_SIZE
        )))
    }
}

fn read_header_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            NiftiError::InvalidFormat(format!(
                "truncated header, expected {} bytes",
                HEADER_SIZE
            ))
        } else {
            NiftiError::Io(e)
        }
    })
}

fn read_f32s<E: ByteOrder, const N: usize>(buf: &[u8], offset: usize) -> [f32; N] {
    let mut values = [0.0f32; N];
    for (i, value) in values.iter_mut().enumerate() {
        *value = E::read_f32(&buf[offset + 4 * i..]);
    }
    values
}

fn read_i16s<E: ByteOrder, const N: usize>(buf: &[u8], offset: usize) -> [i16; N] {
    let mut values = [0i16; N];
    for (i, value) in values.iter_mut().enumerate() {
        *value = E::read_i16(&buf[offset + 2 * i..]);
    }
    values
}

fn write_f32s<E: ByteOrder>(buf: &mut [u8], offset: usize, values: &[f32]) {
    for (i, &value) in values.iter().enumerate() {
        E::write_f32(&mut buf[offset + 4 * i..], value);
    }
}

fn write_i16s<E: ByteOrder>(buf: &mut [u8], offset: usize, values: &[i16]) {
    for (i, &value) in values.iter().enumerate() {
        E::write_i16(&mut buf[offset + 2 * i..], value);
    }
}

/// NUL-terminated fixed-width text field
fn read_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

/// Truncates so the field always keeps a terminating NUL
fn write_str(buf: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(buf.len().saturating_sub(1));
    buf[..len].copy_from_slice(&bytes[..len]);
}
