//! Validated command surface for the implicit-surface reader.

use crate::error::{Result, RunError};

/// Parsed and validated `read_isurf` invocation (immutable after
/// construction).
///
/// Command parsing itself is the caller's problem; this struct holds the
/// result plus the few pieces of surrounding simulation state the reader
/// must check before touching anything.
#[derive(Debug, Clone, PartialEq)]
pub struct IsurfConfig {
    /// Grid group the block of cells belongs to.
    pub group: usize,
    /// Group bit carried on every cell of the block.
    pub groupbit: u32,
    /// Cells along x.
    pub nx: usize,
    /// Cells along y.
    pub ny: usize,
    /// Cells along z (1 in 2D).
    pub nz: usize,
    /// Iso-value, strictly inside (0, 255) and strictly non-integer.
    pub thresh: f64,
    /// Dimensionality, 2 or 3.
    pub dim: usize,
    /// Optional surface-group bit ORed into every emitted primitive's mask.
    pub surf_groupbit: Option<u32>,
    /// Whether a per-cell type file is scattered (collective decision; the
    /// coordinator alone holds the reader).
    pub read_types: bool,
    /// Whether the surrounding simulation runs implicit surfaces.
    pub implicit: bool,
    /// Whether the domain is axisymmetric.
    pub axisymmetric: bool,
    /// Whether particles already exist.
    pub particles_exist: bool,
}

impl IsurfConfig {
    /// Config for a 3D block with default simulation state.
    pub fn new_3d(group: usize, groupbit: u32, nx: usize, ny: usize, nz: usize, thresh: f64) -> Self {
        Self {
            group,
            groupbit,
            nx,
            ny,
            nz,
            thresh,
            dim: 3,
            surf_groupbit: None,
            read_types: false,
            implicit: true,
            axisymmetric: false,
            particles_exist: false,
        }
    }

    /// Config for a 2D block with default simulation state.
    pub fn new_2d(group: usize, groupbit: u32, nx: usize, ny: usize, thresh: f64) -> Self {
        Self {
            nz: 1,
            dim: 2,
            ..Self::new_3d(group, groupbit, nx, ny, 1, thresh)
        }
    }

    /// Check the argument set and simulation state.
    pub fn validate(&self) -> Result<()> {
        if !self.implicit {
            return Err(RunError::NotImplicit);
        }
        if self.particles_exist {
            return Err(RunError::ParticlesExist);
        }
        if self.axisymmetric {
            return Err(RunError::Axisymmetric);
        }
        if self.dim == 2 && self.nz != 1 {
            return Err(RunError::InvalidNz { nz: self.nz });
        }
        if self.thresh <= 0.0 || self.thresh >= 255.0 {
            return Err(RunError::InvalidThreshold {
                thresh: self.thresh,
            });
        }
        if self.thresh == self.thresh.trunc() {
            return Err(RunError::IntegerThreshold {
                thresh: self.thresh,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let cfg = IsurfConfig::new_3d(0, 1, 4, 4, 4, 128.5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_threshold_window() {
        let mut cfg = IsurfConfig::new_3d(0, 1, 4, 4, 4, 0.0);
        assert!(matches!(
            cfg.validate(),
            Err(RunError::InvalidThreshold { .. })
        ));
        cfg.thresh = 255.0;
        assert!(matches!(
            cfg.validate(),
            Err(RunError::InvalidThreshold { .. })
        ));
        cfg.thresh = 300.5;
        assert!(matches!(
            cfg.validate(),
            Err(RunError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_integer_threshold_rejected() {
        let cfg = IsurfConfig::new_3d(0, 1, 4, 4, 4, 128.0);
        assert!(matches!(
            cfg.validate(),
            Err(RunError::IntegerThreshold { .. })
        ));
    }

    #[test]
    fn test_2d_requires_flat_z() {
        let mut cfg = IsurfConfig::new_2d(0, 1, 4, 4, 128.5);
        assert!(cfg.validate().is_ok());
        cfg.nz = 3;
        assert!(matches!(cfg.validate(), Err(RunError::InvalidNz { nz: 3 })));
    }

    #[test]
    fn test_simulation_guards() {
        let mut cfg = IsurfConfig::new_3d(0, 1, 4, 4, 4, 128.5);
        cfg.implicit = false;
        assert!(matches!(cfg.validate(), Err(RunError::NotImplicit)));

        let mut cfg = IsurfConfig::new_3d(0, 1, 4, 4, 4, 128.5);
        cfg.axisymmetric = true;
        assert!(matches!(cfg.validate(), Err(RunError::Axisymmetric)));

        let mut cfg = IsurfConfig::new_3d(0, 1, 4, 4, 4, 128.5);
        cfg.particles_exist = true;
        assert!(matches!(cfg.validate(), Err(RunError::ParticlesExist)));
    }
}
