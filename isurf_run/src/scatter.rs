//! Corner-point and cell-type scatter.
//!
//! The coordinator rank streams the binary file; every chunk is broadcast
//! and each rank walks it, storing every sample into the corner slots of
//! the up to 8 (4 in 2D) local cells that touch it. A transient hash from
//! linearized block index to local cell index drives the scatter and is
//! dropped as soon as the pass completes.

use std::io::Read;

use isurf_io::corner_file::{CornerFile, CornerHeader, CHUNK};
use isurf_io::type_file::{TypeFile, TypeHeader};
use isurf_io::IsurfIoError;

use crate::comm::Comm;
use crate::config::IsurfConfig;
use crate::error::{Result, RunError};
use crate::grid::{CellIndexMap, GridBlock};

/// Build the block-index hash for the local cells in the group.
fn create_hash(grid: &GridBlock, groupbit: u32) -> CellIndexMap {
    let extent = &grid.extent;
    let mut hash = CellIndexMap::with_capacity(grid.nlocal());
    for (icell, cell) in grid.cells.iter().enumerate() {
        if cell.mask & groupbit == 0 {
            continue;
        }
        let ix = ((cell.lo.x - extent.origin.x) / extent.cell_size[0] + 0.5) as usize;
        let iy = ((cell.lo.y - extent.origin.y) / extent.cell_size[1] + 0.5) as usize;
        let iz = ((cell.lo.z - extent.origin.z) / extent.cell_size[2] + 0.5) as usize;
        hash.insert(extent.cell_index(ix, iy, iz), icell as u32);
    }
    hash
}

/// Scatter the corner-point file to per-cell corner arrays.
///
/// `source` must be `Some` on rank 0 and is ignored elsewhere. Returns one
/// 8-slot corner array per local cell (2D uses the first four slots).
pub fn scatter_corners<C: Comm, R: Read>(
    grid: &GridBlock,
    cfg: &IsurfConfig,
    comm: &C,
    source: Option<R>,
) -> Result<Vec<[u8; 8]>> {
    let dim = cfg.dim;
    let hash = create_hash(grid, cfg.groupbit);

    // coordinator opens the file and shares the header
    let mut file = None;
    let mut hdr_bytes = [0u8; 12];
    if comm.rank() == 0 {
        let reader = source.ok_or_else(|| {
            RunError::Io(IsurfIoError::Io("cannot open corner point file".into()))
        })?;
        let f = CornerFile::open(reader, dim)?;
        hdr_bytes[..CornerHeader::byte_len(dim)].copy_from_slice(&f.header.to_bytes(dim));
        file = Some(f);
    }
    comm.broadcast(0, &mut hdr_bytes[..CornerHeader::byte_len(dim)]);
    let header = CornerHeader::from_bytes(&hdr_bytes, dim)?;
    header.check_extent(cfg.nx as u32, cfg.ny as u32, cfg.nz as u32, dim)?;

    let mut cvalues = vec![[0u8; 8]; grid.nlocal()];

    // read and broadcast one chunk at a time
    let ncorners = header.ncorners();
    let mut buf = [0u8; CHUNK];
    let mut nread = 0u64;
    while nread < ncorners {
        let nchunk = (ncorners - nread).min(CHUNK as u64) as usize;
        if let Some(f) = file.as_mut() {
            f.read_chunk(&mut buf)?;
        }
        comm.broadcast(0, &mut buf[..nchunk]);
        assign_corners(cfg, &hash, &mut cvalues, nchunk, nread, &buf)?;
        nread += nchunk as u64;
    }

    log::info!("{} corner points", ncorners);
    Ok(cvalues)
}

/// Store one broadcast chunk of corner samples.
///
/// Every sample is offered to the up to 8 (4 in 2D) cells that share the
/// corner point; the sub-index counts down through the z, y, x neighbour
/// loops so it lands on the canonical corner ordering.
fn assign_corners(
    cfg: &IsurfConfig,
    hash: &CellIndexMap,
    cvalues: &mut [[u8; 8]],
    n: usize,
    offset: u64,
    buf: &[u8],
) -> Result<()> {
    let (nx, ny, nz) = (cfg.nx as i64, cfg.ny as i64, cfg.nz as i64);
    let npx = nx + 1;
    let npy = ny + 1;

    for (i, &value) in buf.iter().take(n).enumerate() {
        let pointindex = offset + i as u64;
        let pix = (pointindex % npx as u64) as i64;
        let piy = ((pointindex / npx as u64) % npy as u64) as i64;
        let piz = (pointindex / (npx * npy) as u64) as i64;

        if value != 0 {
            let mut zeroflag = pix == 0 || piy == 0 || pix == nx || piy == ny;
            if cfg.dim == 3 {
                zeroflag = zeroflag || piz == 0 || piz == nz;
            }
            if zeroflag {
                return Err(RunError::BoundaryValue {
                    point: [pix as usize, piy as usize, piz as usize],
                    value,
                });
            }
        }

        if cfg.dim == 3 {
            let mut ncorner = 8usize;
            for ciz in (piz - 1)..=piz {
                for ciy in (piy - 1)..=piy {
                    for cix in (pix - 1)..=pix {
                        ncorner -= 1;
                        if cix < 0 || cix >= nx || ciy < 0 || ciy >= ny || ciz < 0 || ciz >= nz {
                            continue;
                        }
                        let cellindex = (nx * ny * ciz + nx * ciy + cix) as u64;
                        if let Some(icell) = hash.get(cellindex) {
                            cvalues[icell as usize][ncorner] = value;
                        }
                    }
                }
            }
        } else {
            let mut ncorner = 4usize;
            for ciy in (piy - 1)..=piy {
                for cix in (pix - 1)..=pix {
                    ncorner -= 1;
                    if cix < 0 || cix >= nx || ciy < 0 || ciy >= ny {
                        continue;
                    }
                    let cellindex = (nx * ciy + cix) as u64;
                    if let Some(icell) = hash.get(cellindex) {
                        cvalues[icell as usize][ncorner] = value;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Scatter the per-cell type file.
///
/// `source` must be `Some` on rank 0. Returns one type value per local
/// cell, defaulting to 1 for cells the file does not cover.
pub fn scatter_types<C: Comm, R: Read>(
    grid: &GridBlock,
    cfg: &IsurfConfig,
    comm: &C,
    source: Option<R>,
) -> Result<Vec<i32>> {
    let dim = cfg.dim;
    let hash = create_hash(grid, cfg.groupbit);

    let mut file = None;
    let mut hdr_bytes = [0u8; 12];
    if comm.rank() == 0 {
        let reader = source
            .ok_or_else(|| RunError::Io(IsurfIoError::Io("cannot open type file".into())))?;
        let f = TypeFile::open(reader, dim)?;
        hdr_bytes[..dim * 4].copy_from_slice(&f.header.to_bytes(dim));
        file = Some(f);
    }
    comm.broadcast(0, &mut hdr_bytes[..dim * 4]);
    let header = TypeHeader::from_bytes(&hdr_bytes, dim)?;
    header.check_extent(cfg.nx as u32, cfg.ny as u32, cfg.nz as u32, dim)?;

    let mut svalues = vec![1i32; grid.nlocal()];

    let ntypes = header.ncells();
    let mut ibuf = [0i32; CHUNK];
    let mut bytes = vec![0u8; CHUNK * 4];
    let mut nread = 0u64;
    while nread < ntypes {
        let nchunk = (ntypes - nread).min(CHUNK as u64) as usize;
        if let Some(f) = file.as_mut() {
            f.read_chunk(&mut ibuf)?;
            for (chunk, v) in bytes.chunks_exact_mut(4).zip(ibuf.iter()) {
                chunk.copy_from_slice(&v.to_le_bytes());
            }
        }
        comm.broadcast(0, &mut bytes[..nchunk * 4]);

        for i in 0..nchunk {
            let cellindex = nread + i as u64;
            if let Some(icell) = hash.get(cellindex) {
                let raw: [u8; 4] = bytes[i * 4..i * 4 + 4].try_into().unwrap_or([0; 4]);
                svalues[icell as usize] = i32::from_le_bytes(raw);
            }
        }
        nread += nchunk as u64;
    }

    log::info!("{} surface types", ntypes);
    Ok(svalues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SerialComm;
    use crate::grid::BlockExtent;
    use isurf_io::corner_file::write_corner_file;
    use isurf_io::type_file::write_type_file;
    use std::io::Cursor;

    fn corner_file_3d(nx: usize, ny: usize, nz: usize, set: &[((usize, usize, usize), u8)]) -> Vec<u8> {
        let header = CornerHeader {
            npx: nx as u32 + 1,
            npy: ny as u32 + 1,
            npz: nz as u32 + 1,
        };
        let mut samples = vec![0u8; header.ncorners() as usize];
        for &((x, y, z), v) in set {
            samples[z * (nx + 1) * (ny + 1) + y * (nx + 1) + x] = v;
        }
        let mut file = Vec::new();
        write_corner_file(&mut file, header, 3, &samples).unwrap();
        file
    }

    #[test]
    fn test_scatter_single_interior_corner() {
        let cfg = IsurfConfig::new_3d(0, 1, 2, 2, 2, 128.5);
        let grid = GridBlock::serial(BlockExtent::unit(3, 2, 2, 2), 1);
        let comm = SerialComm;

        let file = corner_file_3d(2, 2, 2, &[((1, 1, 1), 200)]);
        let cvalues =
            scatter_corners(&grid, &cfg, &comm, Some(Cursor::new(file))).unwrap();

        // the interior corner belongs to all 8 cells, at the slot opposite
        // each cell's position
        for (icell, values) in cvalues.iter().enumerate() {
            let (ix, iy, iz) = grid.coords_of_local(icell);
            let expect = (1 - iz) * 4 + (1 - iy) * 2 + (1 - ix);
            for (slot, &v) in values.iter().enumerate() {
                if slot == expect {
                    assert_eq!(v, 200, "cell {:?} slot {}", (ix, iy, iz), slot);
                } else {
                    assert_eq!(v, 0);
                }
            }
        }
    }

    #[test]
    fn test_boundary_violation_aborts() {
        let cfg = IsurfConfig::new_3d(0, 1, 2, 2, 2, 128.5);
        let grid = GridBlock::serial(BlockExtent::unit(3, 2, 2, 2), 1);
        let comm = SerialComm;

        let file = corner_file_3d(2, 2, 2, &[((0, 1, 1), 9)]);
        let err = scatter_corners(&grid, &cfg, &comm, Some(Cursor::new(file))).unwrap_err();
        assert!(matches!(
            err,
            RunError::BoundaryValue {
                point: [0, 1, 1],
                value: 9
            }
        ));
    }

    #[test]
    fn test_extent_mismatch_aborts() {
        let cfg = IsurfConfig::new_3d(0, 1, 2, 2, 2, 128.5);
        let grid = GridBlock::serial(BlockExtent::unit(3, 2, 2, 2), 1);
        let comm = SerialComm;

        let file = corner_file_3d(3, 2, 2, &[]);
        let err = scatter_corners(&grid, &cfg, &comm, Some(Cursor::new(file))).unwrap_err();
        assert!(matches!(err, RunError::Io(IsurfIoError::ExtentMismatch { .. })));
    }

    #[test]
    fn test_missing_coordinator_reader() {
        let cfg = IsurfConfig::new_3d(0, 1, 2, 2, 2, 128.5);
        let grid = GridBlock::serial(BlockExtent::unit(3, 2, 2, 2), 1);
        let comm = SerialComm;

        let err =
            scatter_corners::<_, Cursor<Vec<u8>>>(&grid, &cfg, &comm, None).unwrap_err();
        assert!(matches!(err, RunError::Io(IsurfIoError::Io(_))));
    }

    #[test]
    fn test_scatter_2d() {
        let cfg = IsurfConfig::new_2d(0, 1, 2, 2, 128.5);
        let grid = GridBlock::serial(BlockExtent::unit(2, 2, 2, 1), 1);
        let comm = SerialComm;

        let header = CornerHeader {
            npx: 3,
            npy: 3,
            npz: 1,
        };
        let mut samples = vec![0u8; 9];
        samples[1 * 3 + 1] = 77; // corner (1,1)
        let mut file = Vec::new();
        write_corner_file(&mut file, header, 2, &samples).unwrap();

        let cvalues =
            scatter_corners(&grid, &cfg, &comm, Some(Cursor::new(file))).unwrap();
        // lower-left cell sees it as upper-right (slot 3), etc.
        for (icell, values) in cvalues.iter().enumerate() {
            let (ix, iy, _) = grid.coords_of_local(icell);
            let expect = (1 - iy) * 2 + (1 - ix);
            assert_eq!(values[expect], 77);
            assert_eq!(values[4..], [0; 4]);
        }
    }

    #[test]
    fn test_scatter_types_overrides_default() {
        let cfg = IsurfConfig::new_3d(0, 1, 2, 1, 1, 128.5);
        let grid = GridBlock::serial(BlockExtent::unit(3, 2, 1, 1), 1);
        let comm = SerialComm;

        let header = TypeHeader {
            nx: 2,
            ny: 1,
            nz: 1,
        };
        let mut file = Vec::new();
        write_type_file(&mut file, header, 3, &[4, -2]).unwrap();

        let svalues = scatter_types(&grid, &cfg, &comm, Some(Cursor::new(file))).unwrap();
        assert_eq!(svalues, vec![4, -2]);
    }
}
