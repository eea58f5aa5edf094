//! Corner-point file read/write implementation.
//!
//! # Format
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ HEADER: dimension i32 LE values                              │
//! │   3D: Nx+1, Ny+1, Nz+1      2D: Nx+1, Ny+1                   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ PAYLOAD: (Nx+1)·(Ny+1)·(Nz+1) u8 samples                     │
//! │   row-major, x fastest, z slowest                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every sample on the outer boundary of the block must be zero; that
//! invariant is enforced by the scatter pass, not here.

use std::io::{Read, Write};

use crate::error::{IsurfIoError, Result};

/// Payload chunk size in samples.
pub const CHUNK: usize = 8192;

/// Parsed corner-file header: corner-point lattice extents.
///
/// `npz` is 1 for 2D files, which carry only two header values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerHeader {
    /// Corner points along x (`Nx + 1`).
    pub npx: u32,
    /// Corner points along y (`Ny + 1`).
    pub npy: u32,
    /// Corner points along z (`Nz + 1`; 1 in 2D).
    pub npz: u32,
}

impl CornerHeader {
    /// Number of header bytes for the given dimensionality.
    #[inline]
    pub const fn byte_len(dim: usize) -> usize {
        dim * 4
    }

    /// Total number of samples in the payload.
    #[inline]
    pub const fn ncorners(&self) -> u64 {
        self.npx as u64 * self.npy as u64 * self.npz as u64
    }

    /// Serialize to little-endian bytes (2 or 3 values by dimension).
    pub fn to_bytes(&self, dim: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::byte_len(dim));
        bytes.extend_from_slice(&(self.npx as i32).to_le_bytes());
        bytes.extend_from_slice(&(self.npy as i32).to_le_bytes());
        if dim == 3 {
            bytes.extend_from_slice(&(self.npz as i32).to_le_bytes());
        }
        bytes
    }

    /// Deserialize from little-endian bytes.
    pub fn from_bytes(bytes: &[u8], dim: usize) -> Result<Self> {
        let mut vals = [1i32; 3];
        for (i, chunk) in bytes.chunks_exact(4).take(dim).enumerate() {
            vals[i] = i32::from_le_bytes(chunk.try_into().unwrap());
        }
        for &v in vals.iter().take(dim) {
            if v < 1 {
                return Err(IsurfIoError::InvalidHeader { value: v });
            }
        }
        Ok(Self {
            npx: vals[0] as u32,
            npy: vals[1] as u32,
            npz: vals[2] as u32,
        })
    }

    /// Check the header against the requested cell extents.
    pub fn check_extent(&self, nx: u32, ny: u32, nz: u32, dim: usize) -> Result<()> {
        let mut ok = self.npx == nx + 1 && self.npy == ny + 1;
        if dim == 3 {
            ok = ok && self.npz == nz + 1;
        }
        if ok {
            Ok(())
        } else {
            Err(IsurfIoError::ExtentMismatch {
                file: [self.npx, self.npy, self.npz],
                requested: [nx + 1, ny + 1, if dim == 3 { nz + 1 } else { 1 }],
            })
        }
    }
}

/// Chunked reader over a corner-point file.
pub struct CornerFile<R> {
    reader: R,
    /// Parsed header.
    pub header: CornerHeader,
    remaining: u64,
}

impl<R: Read> CornerFile<R> {
    /// Read and parse the header, leaving the reader at the payload.
    pub fn open(mut reader: R, dim: usize) -> Result<Self> {
        let mut bytes = [0u8; 12];
        reader.read_exact(&mut bytes[..CornerHeader::byte_len(dim)])?;
        let header = CornerHeader::from_bytes(&bytes, dim)?;
        let remaining = header.ncorners();
        Ok(Self {
            reader,
            header,
            remaining,
        })
    }

    /// Read the next chunk of samples into `buf`.
    ///
    /// # Returns
    /// The number of samples read; 0 once the payload is exhausted.
    pub fn read_chunk(&mut self, buf: &mut [u8; CHUNK]) -> Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let n = self.remaining.min(CHUNK as u64) as usize;
        self.reader.read_exact(&mut buf[..n]).map_err(|_| {
            IsurfIoError::Truncated {
                expected: self.header.ncorners(),
                got: self.header.ncorners() - self.remaining,
            }
        })?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Write a complete corner file: header plus row-major samples.
pub fn write_corner_file<W: Write>(
    writer: &mut W,
    header: CornerHeader,
    dim: usize,
    samples: &[u8],
) -> Result<()> {
    writer.write_all(&header.to_bytes(dim))?;
    writer.write_all(samples)?;
    Ok(())
}
