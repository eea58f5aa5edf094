//! Error types for the reconstruction pipeline.
//!
//! Every failure here is fatal to the collective job; callers abort rather
//! than retry.

use core::fmt;

use isurf_core::CoreError;
use isurf_io::IsurfIoError;

/// Errors raised by the reconstruction pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// Implicit-surface mode is not enabled in the surrounding simulation.
    NotImplicit,

    /// Surfaces already exist; the reader must start from a clean store.
    SurfsExist,

    /// Particles already exist.
    ParticlesExist,

    /// The domain is axisymmetric, which this reader does not support.
    Axisymmetric,

    /// Threshold outside the open interval (0, 255).
    InvalidThreshold {
        /// The rejected threshold.
        thresh: f64,
    },

    /// Integer-valued thresholds are not allowed.
    IntegerThreshold {
        /// The rejected threshold.
        thresh: f64,
    },

    /// A 2D run requires `nz == 1`.
    InvalidNz {
        /// The rejected z extent.
        nz: usize,
    },

    /// The grid group block does not match the requested extents.
    GroupExtentMismatch {
        /// Extents the command asked for.
        requested: [usize; 3],
        /// Extents of the grid group block.
        group: [usize; 3],
    },

    /// A non-zero sample sits on the outer boundary of the block.
    BoundaryValue {
        /// Corner-point coordinates of the offending sample.
        point: [usize; 3],
        /// The offending sample.
        value: u8,
    },

    /// Some cell face carries a triangle count other than 0 or 2.
    FaceTriangleCount {
        /// Number of offending faces across all ranks.
        faces: u64,
    },

    /// A face with triangles has no decodable neighbour cell.
    InvalidNeighbor {
        /// Global ID of the cell.
        cell: u64,
        /// Face index 0..5.
        face: usize,
    },

    /// A primitive index was not found in its cell's list.
    SurfNotFound,

    /// Compaction could not repoint a moved primitive's cell entry.
    MovedTriNotFound,

    /// The corner-store collaborator belongs to a different grid group.
    StoreGroupMismatch {
        /// Group of the reader.
        expected: usize,
        /// Group of the collaborator.
        got: usize,
    },

    /// Tessellation failure from the core engine.
    Core(CoreError),

    /// File parsing failure.
    Io(IsurfIoError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::NotImplicit => {
                write!(f, "cannot read isurf unless implicit surface mode is set")
            }
            RunError::SurfsExist => write!(f, "cannot read isurf when surfs already exist"),
            RunError::ParticlesExist => write!(f, "cannot read isurf when particles exist"),
            RunError::Axisymmetric => {
                write!(f, "cannot read isurf for axisymmetric domains")
            }
            RunError::InvalidThreshold { thresh } => {
                write!(f, "threshold {} outside (0, 255)", thresh)
            }
            RunError::IntegerThreshold { thresh } => {
                write!(f, "integer threshold {} is not allowed", thresh)
            }
            RunError::InvalidNz { nz } => {
                write!(f, "nz = {} invalid for a 2D grid", nz)
            }
            RunError::GroupExtentMismatch { requested, group } => {
                write!(
                    f,
                    "grid group block {} {} {} does not match request {} {} {}",
                    group[0], group[1], group[2], requested[0], requested[1], requested[2]
                )
            }
            RunError::BoundaryValue { point, value } => {
                write!(
                    f,
                    "grid boundary value != 0: sample {} at corner ({} {} {})",
                    value, point[0], point[1], point[2]
                )
            }
            RunError::FaceTriangleCount { faces } => {
                write!(f, "{} cell faces do not have zero or 2 triangles", faces)
            }
            RunError::InvalidNeighbor { cell, face } => {
                write!(f, "invalid neighbor for cell {} face {}", cell, face)
            }
            RunError::SurfNotFound => write!(f, "could not find surf in cell list"),
            RunError::MovedTriNotFound => {
                write!(f, "did not find moved tri during compaction")
            }
            RunError::StoreGroupMismatch { expected, got } => {
                write!(
                    f,
                    "corner store group {} does not match grid group {}",
                    got, expected
                )
            }
            RunError::Core(err) => write!(f, "{}", err),
            RunError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RunError {}

impl From<CoreError> for RunError {
    fn from(err: CoreError) -> Self {
        RunError::Core(err)
    }
}

impl From<IsurfIoError> for RunError {
    fn from(err: IsurfIoError) -> Self {
        RunError::Io(err)
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        RunError::Io(IsurfIoError::from(err))
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = core::result::Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_failure() {
        let err = RunError::BoundaryValue {
            point: [3, 0, 1],
            value: 17,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("boundary value != 0"));
        assert!(msg.contains("(3 0 1)"));
    }

    #[test]
    fn test_from_core_error() {
        let core = CoreError::InvalidFaceCode {
            face: 9,
            corners: [0; 8],
        };
        let err: RunError = core.into();
        assert!(matches!(err, RunError::Core(_)));
        assert!(format!("{}", err).contains("invalid face code"));
    }
}
