//! Per-cell tessellation into the surface store.
//!
//! Walks the local cells of the group, runs the cell tessellator on each
//! corner array and appends the resulting primitives. Cells that emit
//! anything are tagged OVERLAP and get a span of primitive indices from
//! the page arena.

use isurf_core::{tessellate_cell, tessellate_square};

use crate::error::Result;
use crate::grid::{CellType, GridBlock};
use crate::page::IndexPages;
use crate::surf::SurfStore;

/// Extract triangles from every local 3D cell in the group.
pub fn marching_cubes(
    grid: &mut GridBlock,
    pages: &mut IndexPages,
    store: &mut SurfStore,
    cvalues: &[[u8; 8]],
    svalues: Option<&[i32]>,
    thresh: f64,
    groupbit: u32,
) -> Result<()> {
    for icell in 0..grid.nlocal() {
        let cell = &grid.cells[icell];
        if cell.mask & groupbit == 0 {
            continue;
        }
        let (lo, hi, id) = (cell.lo, cell.hi, cell.id);

        let (tris, nsurf) = tessellate_cell(&cvalues[icell], thresh, lo, hi)?;

        let span = pages.alloc(nsurf);
        let ttype = svalues.map_or(1, |s| s[icell]);
        for (k, tri) in tris.iter().take(nsurf).enumerate() {
            let isurf = store.add_tri(ttype, tri[0], tri[1], tri[2]);
            store.tris[isurf].cell_id = id;
            pages.slice_mut(span)[k] = isurf as u32;
        }

        let cell = &mut grid.cells[icell];
        cell.nsurf = nsurf;
        if nsurf > 0 {
            cell.csurfs = span;
            cell.ctype = CellType::Overlap;
        }
    }
    Ok(())
}

/// Extract line segments from every local 2D cell in the group.
pub fn marching_squares(
    grid: &mut GridBlock,
    pages: &mut IndexPages,
    store: &mut SurfStore,
    cvalues: &[[u8; 8]],
    svalues: Option<&[i32]>,
    thresh: f64,
    groupbit: u32,
) -> Result<()> {
    for icell in 0..grid.nlocal() {
        let cell = &grid.cells[icell];
        if cell.mask & groupbit == 0 {
            continue;
        }
        let (lo, hi, id) = (cell.lo, cell.hi, cell.id);

        let corners = [
            cvalues[icell][0],
            cvalues[icell][1],
            cvalues[icell][2],
            cvalues[icell][3],
        ];
        let (segs, nsurf) = tessellate_square(&corners, thresh, lo, hi);

        let span = pages.alloc(nsurf);
        let ltype = svalues.map_or(1, |s| s[icell]);
        for (k, seg) in segs.iter().take(nsurf).enumerate() {
            let isurf = store.add_line(ltype, seg[0], seg[1]);
            store.lines[isurf].cell_id = id;
            pages.slice_mut(span)[k] = isurf as u32;
        }

        let cell = &mut grid.cells[icell];
        cell.nsurf = nsurf;
        if nsurf > 0 {
            cell.csurfs = span;
            cell.ctype = CellType::Overlap;
        }
    }
    Ok(())
}
