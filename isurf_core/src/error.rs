//! Error types for the tessellation engine.
//!
//! Every variant carries the raw corner values of the offending cell so the
//! diagnostic reaches the log before the collective job aborts.

use core::fmt;

/// Errors that can occur while tessellating one cell.
///
/// None of these are recoverable; the caller is expected to abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// A face test was asked for a face code outside ±1..±6.
    InvalidFaceCode {
        /// The offending signed face code.
        face: i8,
        /// The cell's raw corner values.
        corners: [u8; 8],
    },

    /// An interior test was asked for a case that has no interior ambiguity.
    InvalidAmbiguousCase {
        /// The offending case number.
        icase: u8,
        /// The cell's raw corner values.
        corners: [u8; 8],
    },

    /// An interior test selected a reference edge outside 0..11.
    InvalidReferenceEdge {
        /// The offending edge identifier.
        edge: i8,
        /// The cell's raw corner values.
        corners: [u8; 8],
    },

    /// The six face tests of case 13 produced a sub-configuration outside 0..45.
    ImpossibleCase13 {
        /// The offending sub-configuration index.
        subconfig: usize,
        /// The cell's raw corner values.
        corners: [u8; 8],
    },
}

impl CoreError {
    /// The raw corner values of the cell that failed.
    pub const fn corners(&self) -> [u8; 8] {
        match self {
            CoreError::InvalidFaceCode { corners, .. }
            | CoreError::InvalidAmbiguousCase { corners, .. }
            | CoreError::InvalidReferenceEdge { corners, .. }
            | CoreError::ImpossibleCase13 { corners, .. } => *corners,
        }
    }
}

// Corner dump order matches the cube traversal used by the tessellator:
// v000 v001 v011 v010 v100 v101 v111 v110.
fn write_corners(f: &mut fmt::Formatter<'_>, c: &[u8; 8]) -> fmt::Result {
    write!(
        f,
        "(corners {} {} {} {} {} {} {} {})",
        c[0], c[1], c[3], c[2], c[4], c[5], c[7], c[6]
    )
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidFaceCode { face, corners } => {
                write!(f, "marching cubes: invalid face code {} ", face)?;
                write_corners(f, corners)
            }
            CoreError::InvalidAmbiguousCase { icase, corners } => {
                write!(f, "marching cubes: invalid ambiguous case {} ", icase)?;
                write_corners(f, corners)
            }
            CoreError::InvalidReferenceEdge { edge, corners } => {
                write!(f, "marching cubes: invalid reference edge {} ", edge)?;
                write_corners(f, corners)
            }
            CoreError::ImpossibleCase13 { subconfig, corners } => {
                write!(f, "marching cubes: impossible case 13 ({}) ", subconfig)?;
                write_corners(f, corners)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}

/// Result type alias for tessellation operations.
pub type Result<T> = core::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "std")]
    #[test]
    fn test_error_display_dumps_corners() {
        let err = CoreError::ImpossibleCase13 {
            subconfig: 63,
            corners: [255, 0, 255, 0, 0, 255, 0, 255],
        };
        let msg = std::format!("{}", err);
        assert!(msg.contains("impossible case 13"));
        // Dump order is v000 v001 v011 v010 v100 v101 v111 v110.
        assert!(msg.contains("(corners 255 0 0 255 0 255 255 0)"));
    }

    #[test]
    fn test_corners_accessor() {
        let corners = [1, 2, 3, 4, 5, 6, 7, 8];
        let err = CoreError::InvalidFaceCode { face: 9, corners };
        assert_eq!(err.corners(), corners);
    }
}
