//! Shared fixtures for the pipeline tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;

use isurf_io::corner_file::{write_corner_file, CornerHeader};
use isurf_run::{
    read_isurf, BlockExtent, Comm, GridBlock, IndexPages, IsurfConfig, RunStats, SurfStore,
};

/// Serialize a 3D corner lattice to file bytes. `set` lists the non-zero
/// samples by corner-point coordinates.
pub fn corner_file_3d(
    nx: usize,
    ny: usize,
    nz: usize,
    set: &[((usize, usize, usize), u8)],
) -> Vec<u8> {
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

/// Serialize a 2D corner lattice to file bytes.
pub fn corner_file_2d(nx: usize, ny: usize, set: &[((usize, usize), u8)]) -> Vec<u8> {
    let header = CornerHeader {
        npx: nx as u32 + 1,
        npy: ny as u32 + 1,
        npz: 1,
    };
    let mut samples = vec![0u8; header.ncorners() as usize];
    for &((x, y), v) in set {
        samples[y * (nx + 1) + x] = v;
    }
    let mut file = Vec::new();
    write_corner_file(&mut file, header, 2, &samples).unwrap();
    file
}

/// Run the pipeline on one rank over the given file bytes.
pub fn run_serial<C: Comm>(
    cfg: &IsurfConfig,
    comm: &C,
    me_file: Option<Vec<u8>>,
    nprocs: usize,
) -> (GridBlock, IndexPages, SurfStore, RunStats) {
    let extent = BlockExtent::unit(cfg.dim, cfg.nx, cfg.ny, cfg.nz);
    let mut grid = if nprocs == 1 {
        GridBlock::serial(extent, cfg.groupbit)
    } else {
        GridBlock::slab_x(extent, nprocs, comm.rank(), cfg.groupbit)
    };
    let mut pages = IndexPages::new();
    let mut store = SurfStore::new();
    let mut reader = me_file.map(Cursor::new);
    let stats = read_isurf(
        cfg,
        &mut grid,
        &mut pages,
        &mut store,
        comm,
        reader.as_mut().map(|r| r as &mut dyn std::io::Read),
        None,
        None,
    )
    .unwrap();
    (grid, pages, store, stats)
}

/// Check that every triangle index appears in exactly one cell list and
/// that owning-cell IDs agree with the listing cell.
pub fn check_primitive_cell_consistency(grid: &GridBlock, pages: &IndexPages, store: &SurfStore) {
    let mut seen = vec![0usize; store.tris.len()];
    for cell in &grid.cells {
        for &m in &pages.slice(cell.csurfs)[..cell.nsurf] {
            seen[m as usize] += 1;
            assert_eq!(
                store.tris[m as usize].cell_id, cell.id,
                "triangle {} listed by cell {} but owned by {}",
                m, cell.id, store.tris[m as usize].cell_id
            );
        }
    }
    for (m, &count) in seen.iter().enumerate() {
        assert_eq!(count, 1, "triangle {} listed {} times", m, count);
    }
}

/// Per-face tallies for the face-symmetry invariant: maps a global face
/// key to (count, inward) seen from each side.
pub fn face_tallies(
    grid: &GridBlock,
    pages: &IndexPages,
    store: &SurfStore,
) -> HashMap<(u64, usize), (usize, bool)> {
    let mut out = HashMap::new();
    for cell in &grid.cells {
        for iface in 0..6 {
            let mut count = 0;
            let mut inward = false;
            for &m in &pages.slice(cell.csurfs)[..cell.nsurf] {
                let tri = &store.tris[m as usize];
                if isurf_run::surf::tri_on_hex_face(tri.p1, tri.p2, tri.p3, cell.lo, cell.hi)
                    == Some(iface)
                {
                    if count == 0 {
                        let idim = iface / 2;
                        inward = if iface % 2 == 1 {
                            tri.norm.axis(idim) < 0.0
                        } else {
                            tri.norm.axis(idim) > 0.0
                        };
                    }
                    count += 1;
                }
            }
            if count > 0 {
                out.insert((cell.id, iface), (count, inward));
            }
        }
    }
    out
}

/// Assert the post-reconciliation invariant over a set of rank tallies:
/// each shared face carries triangles on at most one side, always as an
/// inward-facing pair.
pub fn check_face_symmetry(grids: &[&GridBlock], tallies: &[HashMap<(u64, usize), (usize, bool)>]) {
    let all: HashMap<(u64, usize), (usize, bool)> = tallies
        .iter()
        .flat_map(|t| t.iter().map(|(k, v)| (*k, *v)))
        .collect();
    for (&(id, iface), &(count, inward)) in &all {
        assert_eq!(count, 2, "face ({}, {}) carries {} triangles", id, iface, count);
        assert!(inward, "face ({}, {}) pair faces outward", id, iface);

        // the adjoining side must be empty
        for grid in grids {
            if let Some(icell) = grid.local_of_id(id) {
                if let Some(neigh) = grid.neighbor(icell, iface) {
                    let other = (neigh.id, iface ^ 1);
                    assert!(
                        !all.contains_key(&other),
                        "both sides of face ({}, {}) carry pairs",
                        id,
                        iface
                    );
                }
            }
        }
    }
}
