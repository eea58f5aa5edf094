//! Cell-type file read/write implementation.
//!
//! Same shape as the corner-point format, but the header carries cell
//! extents (`Nx, Ny[, Nz]`) and the payload is one signed 32-bit integer per
//! cell, row-major with x fastest.

use std::io::{Read, Write};

use crate::corner_file::CHUNK;
use crate::error::{IsurfIoError, Result};

/// Parsed type-file header: cell extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHeader {
    /// Cells along x.
    pub nx: u32,
    /// Cells along y.
    pub ny: u32,
    /// Cells along z (1 in 2D).
    pub nz: u32,
}

impl TypeHeader {
    /// Total number of values in the payload.
    #[inline]
    pub const fn ncells(&self) -> u64 {
        self.nx as u64 * self.ny as u64 * self.nz as u64
    }

    /// Serialize to little-endian bytes (2 or 3 values by dimension).
    pub fn to_bytes(&self, dim: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(dim * 4);
        bytes.extend_from_slice(&(self.nx as i32).to_le_bytes());
        bytes.extend_from_slice(&(self.ny as i32).to_le_bytes());
        if dim == 3 {
            bytes.extend_from_slice(&(self.nz as i32).to_le_bytes());
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
            nx: vals[0] as u32,
            ny: vals[1] as u32,
            nz: vals[2] as u32,
        })
    }

    /// Check the header against the requested cell extents.
    pub fn check_extent(&self, nx: u32, ny: u32, nz: u32, dim: usize) -> Result<()> {
        let mut ok = self.nx == nx && self.ny == ny;
        if dim == 3 {
            ok = ok && self.nz == nz;
        }
        if ok {
            Ok(())
        } else {
            Err(IsurfIoError::ExtentMismatch {
                file: [self.nx, self.ny, self.nz],
                requested: [nx, ny, if dim == 3 { nz } else { 1 }],
            })
        }
    }
}

/// Chunked reader over a cell-type file.
pub struct TypeFile<R> {
    reader: R,
    /// Parsed header.
    pub header: TypeHeader,
    remaining: u64,
}

impl<R: Read> TypeFile<R> {
    /// Read and parse the header, leaving the reader at the payload.
    pub fn open(mut reader: R, dim: usize) -> Result<Self> {
        let mut bytes = [0u8; 12];
        reader.read_exact(&mut bytes[..dim * 4])?;
        let header = TypeHeader::from_bytes(&bytes, dim)?;
        let remaining = header.ncells();
        Ok(Self {
            reader,
            header,
            remaining,
        })
    }

    /// Read the next chunk of values into `buf`.
    ///
    /// # Returns
    /// The number of values read; 0 once the payload is exhausted.
    pub fn read_chunk(&mut self, buf: &mut [i32; CHUNK]) -> Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let n = self.remaining.min(CHUNK as u64) as usize;
        let mut bytes = vec![0u8; n * 4];
        self.reader.read_exact(&mut bytes).map_err(|_| {
            IsurfIoError::Truncated {
                expected: self.header.ncells(),
                got: self.header.ncells() - self.remaining,
            }
        })?;
        for (dst, chunk) in buf.iter_mut().zip(bytes.chunks_exact(4)) {
            *dst = i32::from_le_bytes(chunk.try_into().unwrap());
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Write a complete type file: header plus row-major values.
pub fn write_type_file<W: Write>(
    writer: &mut W,
    header: TypeHeader,
    dim: usize,
    values: &[i32],
) -> Result<()> {
    writer.write_all(&header.to_bytes(dim))?;
    for &v in values {
        writer.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_header_roundtrip() {
        let header = TypeHeader {
            nx: 4,
            ny: 3,
            nz: 2,
        };
        let restored = TypeHeader::from_bytes(&header.to_bytes(3), 3).unwrap();
        assert_eq!(header, restored);
        assert_eq!(header.ncells(), 24);
    }

    #[test]
    fn test_chunked_read_roundtrip() {
        let header = TypeHeader {
            nx: 120,
            ny: 90,
            nz: 1,
        };
        let values: Vec<i32> = (0..header.ncells()).map(|i| (i as i32 % 7) - 3).collect();

        let mut file = Vec::new();
        write_type_file(&mut file, header, 2, &values).unwrap();

        let mut reader = TypeFile::open(Cursor::new(file), 2).unwrap();
        assert_eq!(reader.header, header);

        let mut buf = [0i32; CHUNK];
        let mut collected = Vec::new();
        loop {
            let n = reader.read_chunk(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, values);
    }

    #[test]
    fn test_extent_check() {
        let header = TypeHeader {
            nx: 4,
            ny: 4,
            nz: 4,
        };
        assert!(header.check_extent(4, 4, 4, 3).is_ok());
        assert!(header.check_extent(5, 4, 4, 3).is_err());
    }
}
