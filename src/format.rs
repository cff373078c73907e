//! `.dasm` binary matrix container.
//!
//! Layout (little-endian):
//!
//! | offset | size | field                               |
//! |--------|------|-------------------------------------|
//! | 0      | 4    | magic `DASM`                        |
//! | 4      | 1    | version (1)                         |
//! | 5      | 1    | dtype (0 = f64, 1 = u8)             |
//! | 6      | 2    | reserved                            |
//! | 8      | 8    | rows                                |
//! | 16     | 8    | cols                                |
//! | 24     | 8    | sampling frequency (0 if unknown)   |
//! | 32     | ...  | `rows * cols` elements, row-major   |

use crate::error::{DetectError, Result};
use crate::matrix::Matrix;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const MAGIC: &[u8; 4] = b"DASM";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 32;

/// Element type stored in a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F64 = 0,
    U8 = 1,
}

impl DType {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(DType::F64),
            1 => Ok(DType::U8),
            other => Err(DetectError::Parse(format!("unknown dtype tag {}", other))),
        }
    }

    pub fn element_size(self) -> usize {
        match self {
            DType::F64 => 8,
            DType::U8 => 1,
        }
    }
}

/// Parsed container header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    pub dtype: DType,
    pub rows: usize,
    pub cols: usize,
    pub sampling_freq: f64,
}

impl Header {
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = VERSION;
        buf[5] = self.dtype as u8;
        buf[8..16].copy_from_slice(&(self.rows as u64).to_le_bytes());
        buf[16..24].copy_from_slice(&(self.cols as u64).to_le_bytes());
        buf[24..32].copy_from_slice(&self.sampling_freq.to_le_bytes());
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(DetectError::Parse(format!(
                "container truncated: {} bytes, header needs {}",
                bytes.len(),
                HEADER_LEN
            )));
        }
        if &bytes[0..4] != MAGIC {
            return Err(DetectError::Parse("bad magic, not a .dasm file".to_string()));
        }
        if bytes[4] != VERSION {
            return Err(DetectError::Parse(format!(
                "unsupported container version {}",
                bytes[4]
            )));
        }

        let dtype = DType::from_byte(bytes[5])?;
        let rows = read_u64(&bytes[8..16]);
        let cols = read_u64(&bytes[16..24]);
        let sampling_freq = f64::from_le_bytes(read_array(&bytes[24..32]));

        let to_usize = |v: u64, name: &str| {
            usize::try_from(v)
                .map_err(|_| DetectError::Parse(format!("{} count {} too large", name, v)))
        };

        Ok(Self {
            dtype,
            rows: to_usize(rows, "row")?,
            cols: to_usize(cols, "column")?,
            sampling_freq,
        })
    }

    /// Payload size in bytes, or `None` on overflow
    fn payload_len(&self) -> Option<usize> {
        self.rows
            .checked_mul(self.cols)?
            .checked_mul(self.dtype.element_size())
    }
}

fn read_array(bytes: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&bytes[..8]);
    out
}

fn read_u64(bytes: &[u8]) -> u64 {
    u64::from_le_bytes(read_array(bytes))
}

/// Open a file and map it into memory (read-only)
fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path)?;
    // SAFETY: the mapping is read-only and dropped before this module returns.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap)
}

/// Check the header against the payload and return it with the payload slice
fn split_payload(bytes: &[u8]) -> Result<(Header, &[u8])> {
    let header = Header::decode(bytes)?;
    let expected = header
        .payload_len()
        .ok_or_else(|| DetectError::Parse("matrix dimensions overflow".to_string()))?;
    let payload = &bytes[HEADER_LEN..];
    if payload.len() != expected {
        return Err(DetectError::Parse(format!(
            "payload is {} bytes, header {}×{} needs {}",
            payload.len(),
            header.rows,
            header.cols,
            expected
        )));
    }
    Ok((header, payload))
}

/// Decode an f64 container from memory
pub fn decode_f64(bytes: &[u8]) -> Result<(Matrix<f64>, f64)> {
    let (header, payload) = split_payload(bytes)?;
    if header.dtype != DType::F64 {
        return Err(DetectError::Parse(format!(
            "expected f64 container, found {:?}",
            header.dtype
        )));
    }
    let data = payload
        .chunks_exact(8)
        .map(|chunk| f64::from_le_bytes(read_array(chunk)))
        .collect();
    Ok((Matrix::from_vec(header.rows, header.cols, data)?, header.sampling_freq))
}

/// Decode a u8 mask container from memory (non-zero = active)
pub fn decode_mask(bytes: &[u8]) -> Result<Matrix<bool>> {
    let (header, payload) = split_payload(bytes)?;
    if header.dtype != DType::U8 {
        return Err(DetectError::Parse(format!(
            "expected u8 container, found {:?}",
            header.dtype
        )));
    }
    let data = payload.iter().map(|&b| b != 0).collect();
    Matrix::from_vec(header.rows, header.cols, data)
}

/// Read an f64 matrix and its sampling frequency from a `.dasm` file
pub fn read_f64_matrix(path: &Path) -> Result<(Matrix<f64>, f64)> {
    let mmap = mmap_file(path)?;
    decode_f64(&mmap)
}

/// Read a boolean mask from a `.dasm` file
pub fn read_mask(path: &Path) -> Result<Matrix<bool>> {
    let mmap = mmap_file(path)?;
    decode_mask(&mmap)
}

/// Write an f64 matrix; `sampling_freq` may be 0 when not applicable
pub fn write_f64_matrix(path: &Path, matrix: &Matrix<f64>, sampling_freq: f64) -> Result<()> {
    let header = Header {
        dtype: DType::F64,
        rows: matrix.rows(),
        cols: matrix.cols(),
        sampling_freq,
    };
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&header.encode())?;
    for value in matrix.as_slice() {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a boolean mask as 0/1 bytes
pub fn write_mask(path: &Path, mask: &Matrix<bool>) -> Result<()> {
    let header = Header {
        dtype: DType::U8,
        rows: mask.rows(),
        cols: mask.cols(),
        sampling_freq: 0.0,
    };
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&header.encode())?;
    let bytes: Vec<u8> = mask.as_slice().iter().map(|&b| u8::from(b)).collect();
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
