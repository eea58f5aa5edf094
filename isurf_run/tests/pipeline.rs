//! End-to-end pipeline scenarios.

mod common;

use std::io::Cursor;
use std::thread;

use common::{
    check_face_symmetry, check_primitive_cell_consistency, corner_file_2d, corner_file_3d,
    face_tallies, run_serial,
};
use isurf_core::Point3;
use isurf_run::{
    read_isurf, BlockExtent, CellType, Comm, CornerSink, GridBlock, IndexPages, IsurfConfig,
    RunError, SerialComm, SurfStore, ThreadComm,
};

#[test]
fn empty_block_produces_no_surfaces() {
    let cfg = IsurfConfig::new_3d(0, 1, 2, 2, 2, 128.5);
    let file = corner_file_3d(2, 2, 2, &[]);
    let (grid, pages, store, stats) = run_serial(&cfg, &SerialComm, Some(file), 1);

    assert_eq!(store.tris.len(), 0);
    assert_eq!(stats.nsurf, 0);
    assert_eq!(stats.ncorners, 27);
    for cell in &grid.cells {
        assert_eq!(cell.ctype, CellType::Unknown);
        assert_eq!(cell.nsurf, 0);
    }
    check_primitive_cell_consistency(&grid, &pages, &store);
}

#[test]
fn lone_voxel_closed_shell() {
    // all eight corners of the center cell of a 3x3x3 block are material
    let cfg = IsurfConfig::new_3d(0, 1, 3, 3, 3, 128.5);
    let mut set = Vec::new();
    for x in 1..=2 {
        for y in 1..=2 {
            for z in 1..=2 {
                set.push(((x, y, z), 255u8));
            }
        }
    }
    let file = corner_file_3d(3, 3, 3, &set);
    let (grid, pages, store, stats) = run_serial(&cfg, &SerialComm, Some(file), 1);

    // 6 face quads, 12 edge quads and 8 corner caps close the voxel
    assert_eq!(store.tris.len(), 44);
    assert_eq!(stats.nsurf, 44);

    let overlap = grid
        .cells
        .iter()
        .filter(|c| c.ctype == CellType::Overlap)
        .count();
    assert_eq!(overlap, 26);

    // every normal points away from the voxel center into the flow
    let center = Point3::new(1.5, 1.5, 1.5);
    for tri in &store.tris {
        let centroid = (tri.p1 + tri.p2 + tri.p3) / 3.0;
        assert!(
            tri.norm.dot(centroid - center) > 0.0,
            "normal {:?} at {:?} points into the voxel",
            tri.norm,
            centroid
        );
        assert!((tri.norm.length() - 1.0).abs() < 1e-12);
    }

    check_primitive_cell_consistency(&grid, &pages, &store);
}

#[test]
fn case13_block_reconstructs() {
    // alternating-parity material corners drive the center cell through
    // the six-face sub-configuration path
    let cfg = IsurfConfig::new_3d(0, 1, 3, 3, 3, 128.5);
    let mut set = Vec::new();
    for x in 1..=2 {
        for y in 1..=2 {
            for z in 1..=2 {
                if (x + y + z) % 2 == 1 {
                    set.push(((x, y, z), 255u8));
                }
            }
        }
    }
    let file = corner_file_3d(3, 3, 3, &set);
    let (grid, pages, store, stats) = run_serial(&cfg, &SerialComm, Some(file), 1);

    assert_eq!(stats.nsurf, 32);

    // the center cell emitted the four-cap tiling
    let center_id = grid.extent.cell_index(1, 1, 1) + 1;
    let icell = grid.local_of_id(center_id).unwrap();
    assert_eq!(grid.cells[icell].nsurf, 4);
    assert_eq!(grid.cells[icell].ctype, CellType::Overlap);

    check_primitive_cell_consistency(&grid, &pages, &store);
    let tallies = face_tallies(&grid, &pages, &store);
    check_face_symmetry(&[&grid], &[tallies]);
}

#[test]
fn saddle_2d_takes_split_branch() {
    // diagonal material at interior corners; the center cell's average
    // exceeds the threshold, so the saddle splits
    let cfg = IsurfConfig::new_2d(0, 1, 3, 3, 126.5);
    let file = corner_file_2d(3, 3, &[((1, 1), 255), ((2, 2), 255)]);
    let (grid, _, store, stats) = run_serial(&cfg, &SerialComm, Some(file), 1);

    assert_eq!(stats.nsurf, 8);
    assert_eq!(store.lines.len(), 8);

    let center_id = grid.extent.cell_index(1, 1, 0) + 1;
    let icell = grid.local_of_id(center_id).unwrap();
    assert_eq!(grid.cells[icell].nsurf, 2);

    // segments oriented into the flow: each normal is unit length and
    // perpendicular to its segment
    for line in &store.lines {
        let d = line.p2 - line.p1;
        assert!((line.norm.length() - 1.0).abs() < 1e-12);
        assert!(line.norm.dot(d).abs() < 1e-12);
    }
}

/// The membrane field: both cells adjoining the plane x = 2 route through
/// the joined face tiling and put a coplanar pair on the shared face.
fn membrane_set() -> Vec<((usize, usize, usize), u8)> {
    vec![
        ((2, 1, 1), 255),
        ((2, 2, 2), 255),
        ((2, 1, 2), 100),
        ((2, 2, 1), 100),
    ]
}

#[test]
fn membrane_pairs_cancel_serial() {
    let cfg = IsurfConfig::new_3d(0, 1, 4, 3, 3, 128.5);
    let file = corner_file_3d(4, 3, 3, &membrane_set());
    let (grid, pages, store, stats) = run_serial(&cfg, &SerialComm, Some(file), 1);

    // both sides emitted a pair on the shared face; reconciliation deleted
    // all four of the twenty extracted triangles
    assert_eq!(stats.nsurf, 16);
    check_primitive_cell_consistency(&grid, &pages, &store);
    let tallies = face_tallies(&grid, &pages, &store);
    check_face_symmetry(&[&grid], &[tallies]);
}

#[test]
fn membrane_pairs_cancel_across_ranks() {
    let comms = ThreadComm::create(2);
    let file = corner_file_3d(4, 3, 3, &membrane_set());

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let file = file.clone();
                scope.spawn(move || {
                    let cfg = IsurfConfig::new_3d(0, 1, 4, 3, 3, 128.5);
                    let source = if comm.rank() == 0 { Some(file) } else { None };
                    let (grid, pages, store, stats) = run_serial(&cfg, &comm, source, 2);
                    check_primitive_cell_consistency(&grid, &pages, &store);
                    let tallies = face_tallies(&grid, &pages, &store);
                    (grid, tallies, store, stats)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // the shared face straddles the rank boundary; the exchange removed
    // both pairs
    assert_eq!(results[0].3.nsurf, 16);
    assert_eq!(results[1].3.nsurf, 16);
    let local_total: usize = results.iter().map(|r| r.2.tris.len()).sum();
    assert_eq!(local_total, 16);

    let grids: Vec<&GridBlock> = results.iter().map(|r| &r.0).collect();
    let tallies: Vec<_> = results.iter().map(|r| r.1.clone()).collect();
    check_face_symmetry(&grids, &tallies);
}

#[test]
fn decomposition_does_not_change_the_surface() {
    let file = corner_file_3d(4, 3, 3, &membrane_set());

    // serial run
    let cfg = IsurfConfig::new_3d(0, 1, 4, 3, 3, 128.5);
    let (_, _, serial_store, _) = run_serial(&cfg, &SerialComm, Some(file.clone()), 1);

    // two-rank run
    let comms = ThreadComm::create(2);
    let stores: Vec<SurfStore> = thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let file = file.clone();
                scope.spawn(move || {
                    let cfg = IsurfConfig::new_3d(0, 1, 4, 3, 3, 128.5);
                    let source = if comm.rank() == 0 { Some(file) } else { None };
                    run_serial(&cfg, &comm, source, 2).2
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // same triangles regardless of the rank split, as an unordered set of
    // canonicalised vertex triples
    let canon = |store: &SurfStore| {
        let mut keys: Vec<String> = store
            .tris
            .iter()
            .map(|t| {
                let mut vs: Vec<[i64; 3]> = [t.p1, t.p2, t.p3]
                    .iter()
                    .map(|p| {
                        [
                            (p.x * 1e9).round() as i64,
                            (p.y * 1e9).round() as i64,
                            (p.z * 1e9).round() as i64,
                        ]
                    })
                    .collect();
                vs.sort();
                format!("{:?}", vs)
            })
            .collect();
        keys.sort();
        keys
    };

    let mut split: Vec<String> = stores.iter().flat_map(|s| canon(s)).collect();
    split.sort();
    assert_eq!(canon(&serial_store), split);
}

#[test]
fn boundary_violation_aborts_run() {
    let cfg = IsurfConfig::new_3d(0, 1, 2, 2, 2, 128.5);
    let file = corner_file_3d(2, 2, 2, &[((0, 0, 1), 200)]);

    let extent = BlockExtent::unit(3, 2, 2, 2);
    let mut grid = GridBlock::serial(extent, 1);
    let mut pages = IndexPages::new();
    let mut store = SurfStore::new();
    let mut reader = Cursor::new(file);

    let err = read_isurf(
        &cfg,
        &mut grid,
        &mut pages,
        &mut store,
        &SerialComm,
        Some(&mut reader),
        None,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, RunError::BoundaryValue { value: 200, .. }));
    // no partial surface state persists
    assert!(store.tris.is_empty());
}

struct TestSink {
    group: usize,
    stored: Vec<[u8; 8]>,
}

impl CornerSink for TestSink {
    fn group(&self) -> usize {
        self.group
    }

    fn store_corners(&mut self, cvalues: &[[u8; 8]]) {
        self.stored = cvalues.to_vec();
    }
}

#[test]
fn ablate_round_trip_reproduces_surface() {
    let cfg = IsurfConfig::new_3d(0, 1, 3, 3, 3, 128.5);
    let mut set = Vec::new();
    for x in 1..=2 {
        for y in 1..=2 {
            for z in 1..=2 {
                set.push(((x, y, z), 255u8));
            }
        }
    }
    let file = corner_file_3d(3, 3, 3, &set);

    // first run, storing corner values
    let extent = BlockExtent::unit(3, 3, 3, 3);
    let mut grid = GridBlock::serial(extent, 1);
    let mut pages = IndexPages::new();
    let mut store = SurfStore::new();
    let mut sink = TestSink {
        group: 0,
        stored: Vec::new(),
    };
    let mut reader = Cursor::new(file);
    read_isurf(
        &cfg,
        &mut grid,
        &mut pages,
        &mut store,
        &SerialComm,
        Some(&mut reader),
        None,
        Some(&mut sink),
    )
    .unwrap();

    // write the stored corners back out as a fresh file
    let mut samples = vec![0u8; 4 * 4 * 4];
    for (icell, values) in sink.stored.iter().enumerate() {
        let (ix, iy, iz) = grid.coords_of_local(icell);
        for (slot, &v) in values.iter().enumerate() {
            let (dx, dy, dz) = (slot & 1, (slot >> 1) & 1, slot >> 2);
            samples[(iz + dz) * 16 + (iy + dy) * 4 + (ix + dx)] = v;
        }
    }
    let mut rewritten = Vec::new();
    isurf_io::corner_file::write_corner_file(
        &mut rewritten,
        isurf_io::corner_file::CornerHeader {
            npx: 4,
            npy: 4,
            npz: 4,
        },
        3,
        &samples,
    )
    .unwrap();

    let (_, _, second_store, _) = run_serial(&cfg, &SerialComm, Some(rewritten), 1);
    assert_eq!(second_store.tris.len(), store.tris.len());
    assert_eq!(second_store.tris, store.tris);
}

#[test]
fn ablate_group_mismatch_aborts() {
    let cfg = IsurfConfig::new_3d(0, 1, 2, 2, 2, 128.5);
    let file = corner_file_3d(2, 2, 2, &[]);

    let mut grid = GridBlock::serial(BlockExtent::unit(3, 2, 2, 2), 1);
    let mut pages = IndexPages::new();
    let mut store = SurfStore::new();
    let mut sink = TestSink {
        group: 5,
        stored: Vec::new(),
    };
    let mut reader = Cursor::new(file);

    let err = read_isurf(
        &cfg,
        &mut grid,
        &mut pages,
        &mut store,
        &SerialComm,
        Some(&mut reader),
        None,
        Some(&mut sink),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RunError::StoreGroupMismatch {
            expected: 0,
            got: 5
        }
    ));
}

#[test]
fn surf_group_bit_applied() {
    let cfg = {
        let mut cfg = IsurfConfig::new_3d(0, 1, 3, 3, 3, 128.5);
        cfg.surf_groupbit = Some(0b100);
        cfg
    };
    let file = corner_file_3d(3, 3, 3, &[((1, 1, 1), 255)]);
    let (_, _, store, _) = run_serial(&cfg, &SerialComm, Some(file), 1);

    assert!(!store.tris.is_empty());
    for tri in &store.tris {
        assert_eq!(tri.mask & 0b100, 0b100);
        assert_eq!(tri.mask & 1, 1);
    }
}
