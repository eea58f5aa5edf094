//! Pipeline orchestration.
//!
//! Sequences scatter, extraction, normals and reconciliation, reduces the
//! global surface count, and hands the corner arrays to the ablation
//! collaborator when one was configured. Wall-clock timers are collected
//! around each phase and logged as percentages of the total, as the phases
//! tend to balance very differently across inputs.
//!
//! Downstream grid work (split cells, ghost rebuild, in/out flagging) is
//! the surrounding simulation's business and happens after this returns.

use std::io::Read;
use std::time::Instant;

use crate::ablate::CornerSink;
use crate::comm::Comm;
use crate::config::IsurfConfig;
use crate::error::{Result, RunError};
use crate::extract;
use crate::grid::GridBlock;
use crate::page::IndexPages;
use crate::reconcile::cleanup_mc;
use crate::scatter::{scatter_corners, scatter_types};
use crate::surf::SurfStore;

/// Timings and counts from one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunStats {
    /// Corner points read and scattered.
    pub ncorners: u64,
    /// Global primitive count after reconciliation.
    pub nsurf: u64,
    /// Seconds spent reading and scattering.
    pub read_secs: f64,
    /// Seconds spent tessellating.
    pub marching_secs: f64,
    /// Seconds spent reconciling faces.
    pub cleanup_secs: f64,
}

/// Run the full reconstruction pipeline.
///
/// `grid_source` and `type_source` are the opened binary files on rank 0
/// (`None` elsewhere; `type_source` is `None` everywhere when no type file
/// was requested). `sink` receives the corner arrays after reconciliation
/// when the store hand-off was configured.
pub fn read_isurf<C: Comm>(
    cfg: &IsurfConfig,
    grid: &mut GridBlock,
    pages: &mut IndexPages,
    store: &mut SurfStore,
    comm: &C,
    grid_source: Option<&mut dyn Read>,
    type_source: Option<&mut dyn Read>,
    mut sink: Option<&mut dyn CornerSink>,
) -> Result<RunStats> {
    cfg.validate()?;

    if !store.is_empty() {
        return Err(RunError::SurfsExist);
    }
    let extent = &grid.extent;
    if extent.nx != cfg.nx || extent.ny != cfg.ny || extent.nz != cfg.nz {
        return Err(RunError::GroupExtentMismatch {
            requested: [cfg.nx, cfg.ny, cfg.nz],
            group: [extent.nx, extent.ny, extent.nz],
        });
    }

    log::info!("reading isurf corner file");

    comm.barrier();
    let time1 = Instant::now();

    // scatter corner samples, and types when requested
    let cvalues = scatter_corners(grid, cfg, comm, grid_source)?;
    let svalues = if cfg.read_types {
        Some(scatter_types(grid, cfg, comm, type_source)?)
    } else {
        None
    };

    comm.barrier();
    let time2 = Instant::now();

    // tessellate every cell in the group
    if cfg.dim == 3 {
        extract::marching_cubes(
            grid,
            pages,
            store,
            &cvalues,
            svalues.as_deref(),
            cfg.thresh,
            cfg.groupbit,
        )?;
    } else {
        extract::marching_squares(
            grid,
            pages,
            store,
            &cvalues,
            svalues.as_deref(),
            cfg.thresh,
            cfg.groupbit,
        )?;
    }

    if let Some(bit) = cfg.surf_groupbit {
        store.or_mask(bit);
    }

    if let Some((lo, hi)) = store.extent() {
        log::info!(
            "implicit surf extent ({} {} {}) to ({} {} {})",
            lo.x,
            lo.y,
            lo.z,
            hi.x,
            hi.y,
            hi.z
        );
    }

    // normals before reconciliation; the keep/move/delete decisions use them
    if cfg.dim == 3 {
        store.compute_tri_normals();
    } else {
        store.compute_line_normals();
    }

    comm.barrier();
    let time3 = Instant::now();

    if cfg.dim == 3 {
        cleanup_mc(grid, pages, store, comm)?;
    }

    comm.barrier();
    let time4 = Instant::now();

    store.nglobal = comm.sum_u64(store.nlocal() as u64);

    // hand corner values to the ablation collaborator
    if let Some(sink) = sink.as_deref_mut() {
        if sink.group() != cfg.group {
            return Err(RunError::StoreGroupMismatch {
                expected: cfg.group,
                got: sink.group(),
            });
        }
        sink.store_corners(&cvalues);
    }

    let stats = RunStats {
        ncorners: corner_count(cfg),
        nsurf: store.nglobal,
        read_secs: (time2 - time1).as_secs_f64(),
        marching_secs: (time3 - time2).as_secs_f64(),
        cleanup_secs: (time4 - time3).as_secs_f64(),
    };

    let total = (time4 - time1).as_secs_f64().max(f64::MIN_POSITIVE);
    log::info!(
        "{} surfs; read/marching/cleanup percent = {:.1} {:.1} {:.1}",
        stats.nsurf,
        100.0 * stats.read_secs / total,
        100.0 * stats.marching_secs / total,
        100.0 * stats.cleanup_secs / total
    );

    Ok(stats)
}

#[inline]
fn corner_count(cfg: &IsurfConfig) -> u64 {
    let npx = cfg.nx as u64 + 1;
    let npy = cfg.ny as u64 + 1;
    let npz = if cfg.dim == 3 { cfg.nz as u64 + 1 } else { 1 };
    npx * npy * npz
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SerialComm;
    use crate::grid::BlockExtent;
    use isurf_io::corner_file::{write_corner_file, CornerHeader};
    use std::io::Cursor;

    fn empty_corner_file(n: usize) -> Vec<u8> {
        let header = CornerHeader {
            npx: n as u32 + 1,
            npy: n as u32 + 1,
            npz: n as u32 + 1,
        };
        let mut file = Vec::new();
        write_corner_file(&mut file, header, 3, &vec![0u8; header.ncorners() as usize]).unwrap();
        file
    }

    #[test]
    fn test_rejects_preexisting_surfs() {
        let cfg = IsurfConfig::new_3d(0, 1, 2, 2, 2, 128.5);
        let mut grid = GridBlock::serial(BlockExtent::unit(3, 2, 2, 2), 1);
        let mut pages = IndexPages::new();
        let mut store = SurfStore::new();
        store.add_tri(
            1,
            isurf_core::Point3::default(),
            isurf_core::Point3::new(1.0, 0.0, 0.0),
            isurf_core::Point3::new(0.0, 1.0, 0.0),
        );

        let mut file = Cursor::new(empty_corner_file(2));
        let err = read_isurf(
            &cfg,
            &mut grid,
            &mut pages,
            &mut store,
            &SerialComm,
            Some(&mut file),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RunError::SurfsExist));
    }

    #[test]
    fn test_rejects_extent_mismatch() {
        let cfg = IsurfConfig::new_3d(0, 1, 3, 2, 2, 128.5);
        let mut grid = GridBlock::serial(BlockExtent::unit(3, 2, 2, 2), 1);
        let mut pages = IndexPages::new();
        let mut store = SurfStore::new();

        let mut file = Cursor::new(empty_corner_file(2));
        let err = read_isurf(
            &cfg,
            &mut grid,
            &mut pages,
            &mut store,
            &SerialComm,
            Some(&mut file),
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RunError::GroupExtentMismatch { .. }));
    }
}
