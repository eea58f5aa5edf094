//! # isurf_io
//!
//! Binary file formats for the implicit-surface reader.
//!
//! Two formats are handled, both little-endian with a bare integer header:
//!
//! - **corner files**: one unsigned 8-bit sample per grid corner point
//! - **type files**: one signed 32-bit integer per grid cell
//!
//! Readers are generic over [`std::io::Read`] and deliver the payload in
//! fixed-size chunks so a coordinator process can broadcast each chunk to
//! the rest of the job without ever holding the whole payload. The scatter
//! logic that consumes the chunks lives in `isurf_run`.

pub mod corner_file;
pub mod error;
pub mod type_file;

pub use corner_file::{write_corner_file, CornerFile, CornerHeader, CHUNK};
pub use error::{IsurfIoError, Result};
pub use type_file::{write_type_file, TypeFile, TypeHeader};
