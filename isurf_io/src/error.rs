//! Error types for grid file parsing.

use core::fmt;

/// Errors that can occur while reading corner or type files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsurfIoError {
    /// The file header does not describe the requested grid block.
    ExtentMismatch {
        /// Extents found in the file header.
        file: [u32; 3],
        /// Extents the caller asked for.
        requested: [u32; 3],
    },

    /// The payload ended before the header-declared sample count.
    Truncated {
        /// Samples the header promised.
        expected: u64,
        /// Samples actually present.
        got: u64,
    },

    /// A header field is not representable (negative extent).
    InvalidHeader {
        /// The offending raw header value.
        value: i32,
    },

    /// I/O error from the underlying reader.
    Io(String),
}

impl fmt::Display for IsurfIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsurfIoError::ExtentMismatch { file, requested } => {
                write!(
                    f,
                    "grid size in file ({} {} {}) does not match request ({} {} {})",
                    file[0], file[1], file[2], requested[0], requested[1], requested[2]
                )
            }
            IsurfIoError::Truncated { expected, got } => {
                write!(f, "file truncated: expected {} samples, got {}", expected, got)
            }
            IsurfIoError::InvalidHeader { value } => {
                write!(f, "invalid header extent {}", value)
            }
            IsurfIoError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for IsurfIoError {}

impl From<std::io::Error> for IsurfIoError {
    fn from(err: std::io::Error) -> Self {
        IsurfIoError::Io(err.to_string())
    }
}

/// Result type alias for file parsing operations.
pub type Result<T> = core::result::Result<T, IsurfIoError>;
