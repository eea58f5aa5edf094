//! Face reconciliation after marching cubes.
//!
//! Marching cubes can leave a coplanar triangle pair exactly on a cell
//! face, from one or both of the adjoining cells. This pass enforces, for
//! every shared face: either no triangles, or exactly one pair whose
//! normal points into the cell that keeps it.
//!
//! - both cells have a pair: all four triangles are deleted
//! - one cell has a pair with its normal pointing inward: it keeps them
//! - one cell has a pair pointing outward: the pair moves to the neighbour
//!
//! Faces shared with another rank go through one irregular exchange of
//! `FaceTransfer` records; applying a received record only touches the
//! targeted (cell, face) pair, so arrival order does not matter. The store
//! is compacted at the end in descending index order so a slot flagged for
//! deletion is never the source of a swap.

use isurf_core::Point3;

use crate::comm::Comm;
use crate::error::{Result, RunError};
use crate::grid::{opposite_face, GridBlock};
use crate::page::IndexPages;
use crate::surf::{tri_on_hex_face, SurfStore, Tri};

/// Triangle payload of a face transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TriRecord {
    ttype: i32,
    mask: u32,
    p1: Point3,
    p2: Point3,
    p3: Point3,
    norm: Point3,
}

impl TriRecord {
    const SIZE: usize = 8 + 12 * 8;

    fn from_tri(tri: &Tri) -> Self {
        Self {
            ttype: tri.ttype,
            mask: tri.mask,
            p1: tri.p1,
            p2: tri.p2,
            p3: tri.p3,
            norm: tri.norm,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.ttype.to_le_bytes());
        out.extend_from_slice(&self.mask.to_le_bytes());
        for p in [self.p1, self.p2, self.p3, self.norm] {
            for v in p.as_array() {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
    }

    fn read(bytes: &[u8]) -> Self {
        let f64_at = |k: usize| {
            let raw: [u8; 8] = bytes[k..k + 8].try_into().unwrap_or([0; 8]);
            f64::from_le_bytes(raw)
        };
        let point_at = |k: usize| Point3::new(f64_at(k), f64_at(k + 8), f64_at(k + 16));
        Self {
            ttype: i32::from_le_bytes(bytes[0..4].try_into().unwrap_or([0; 4])),
            mask: u32::from_le_bytes(bytes[4..8].try_into().unwrap_or([0; 4])),
            p1: point_at(8),
            p2: point_at(32),
            p3: point_at(56),
            norm: point_at(80),
        }
    }
}

/// One face's worth of reconciliation state sent to the neighbour's owner.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceTransfer {
    send_cell: u32,
    send_face: u8,
    other_cell: u32,
    other_face: u8,
    inwardnorm: bool,
    tri1: TriRecord,
    tri2: TriRecord,
}

impl FaceTransfer {
    const SIZE: usize = 11 + 2 * TriRecord::SIZE;

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.send_cell.to_le_bytes());
        out.extend_from_slice(&self.other_cell.to_le_bytes());
        out.push(self.send_face);
        out.push(self.other_face);
        out.push(u8::from(self.inwardnorm));
        self.tri1.write(out);
        self.tri2.write(out);
    }

    fn read(bytes: &[u8]) -> Self {
        Self {
            send_cell: u32::from_le_bytes(bytes[0..4].try_into().unwrap_or([0; 4])),
            other_cell: u32::from_le_bytes(bytes[4..8].try_into().unwrap_or([0; 4])),
            send_face: bytes[8],
            other_face: bytes[9],
            inwardnorm: bytes[10] != 0,
            tri1: TriRecord::read(&bytes[11..11 + TriRecord::SIZE]),
            tri2: TriRecord::read(&bytes[11 + TriRecord::SIZE..]),
        }
    }
}

/// Does the triangle normal point from face `iface` into the cell?
#[inline]
fn is_inward(norm: Point3, iface: usize) -> bool {
    let idim = iface / 2;
    if iface % 2 == 1 {
        norm.axis(idim) < 0.0
    } else {
        norm.axis(idim) > 0.0
    }
}

/// Remove primitive index `m` from a cell's span by swap-with-last.
fn remove_surf(grid: &mut GridBlock, pages: &mut IndexPages, icell: usize, m: u32) -> Result<()> {
    let cell = &mut grid.cells[icell];
    let n = cell.nsurf;
    let list = pages.slice_mut(cell.csurfs);
    for k in 0..n {
        if list[k] == m {
            list[k] = list[n - 1];
            cell.nsurf = n - 1;
            return Ok(());
        }
    }
    Err(RunError::SurfNotFound)
}

/// Append two primitive indices to a cell, growing its span, and rewrite
/// the primitives' owning-cell IDs.
fn append_pair(
    grid: &mut GridBlock,
    pages: &mut IndexPages,
    store: &mut SurfStore,
    icell: usize,
    pair: [u32; 2],
) {
    let (old, n, id) = {
        let cell = &grid.cells[icell];
        (cell.csurfs, cell.nsurf, cell.id)
    };
    let kept = pages.slice(old)[..n].to_vec();
    let span = pages.alloc(n + 2);
    let dst = pages.slice_mut(span);
    dst[..n].copy_from_slice(&kept);
    dst[n] = pair[0];
    dst[n + 1] = pair[1];

    let cell = &mut grid.cells[icell];
    cell.csurfs = span;
    cell.nsurf = n + 2;
    store.tris[pair[0] as usize].cell_id = id;
    store.tris[pair[1] as usize].cell_id = id;
}

/// Repair inconsistent triangle pairs on shared cell faces.
///
/// Requires normals to be computed. 3D only; the 2D driver has no face
/// pairs to reconcile.
pub fn cleanup_mc<C: Comm>(
    grid: &mut GridBlock,
    pages: &mut IndexPages,
    store: &mut SurfStore,
    comm: &C,
) -> Result<()> {
    let nglocal = grid.nlocal();
    let me = comm.rank();

    // tally triangles lying exactly on each face of every owned cell
    let mut nfacetri = vec![[0usize; 6]; nglocal];
    let mut facetris = vec![[[0u32; 2]; 6]; nglocal];

    for icell in 0..nglocal {
        let cell = &grid.cells[icell];
        if cell.nsurf == 0 {
            continue;
        }
        for &m in &pages.slice(cell.csurfs)[..cell.nsurf] {
            let tri = &store.tris[m as usize];
            if let Some(iface) = tri_on_hex_face(tri.p1, tri.p2, tri.p3, cell.lo, cell.hi) {
                if nfacetri[icell][iface] < 2 {
                    facetris[icell][iface][nfacetri[icell][iface]] = m;
                }
                nfacetri[icell][iface] += 1;
            }
        }
    }

    // collective check: every face carries 0 or 2 triangles
    let mut flag = 0u64;
    for counts in &nfacetri {
        for &n in counts {
            if n != 0 && n != 2 {
                flag += 1;
            }
        }
    }
    let flagall = comm.sum_u64(flag);
    if flagall > 0 {
        return Err(RunError::FaceTriangleCount { faces: flagall });
    }

    // walk every owned face with a pair and reconcile against the
    // adjoining cell
    let mut dests: Vec<usize> = Vec::new();
    let mut sendbuf: Vec<u8> = Vec::new();
    let mut dellist: Vec<u32> = Vec::new();

    for icell in 0..nglocal {
        if grid.cells[icell].nsurf == 0 {
            continue;
        }
        for iface in 0..6 {
            if nfacetri[icell][iface] != 2 {
                continue;
            }

            let neigh = grid
                .neighbor(icell, iface)
                .ok_or(RunError::InvalidNeighbor {
                    cell: grid.cells[icell].id,
                    face: iface,
                })?;
            let pair = facetris[icell][iface];
            let inwardnorm = is_inward(store.tris[pair[0] as usize].norm, iface);
            let otherface = opposite_face(iface);

            if neigh.proc == me {
                let othercell = neigh.ilocal;
                let ntri_other = nfacetri[othercell][otherface];

                // this cell keeps its pair
                if ntri_other == 0 && inwardnorm {
                    continue;
                }

                // hand the pair to the neighbour
                if ntri_other == 0 {
                    append_pair(grid, pages, store, othercell, pair);
                }

                // both sides have a pair: drop the neighbour's now and
                // zero its tally so it is not processed again
                if ntri_other == 2 {
                    nfacetri[othercell][otherface] = 0;
                    let opair = facetris[othercell][otherface];
                    remove_surf(grid, pages, othercell, opair[0])?;
                    remove_surf(grid, pages, othercell, opair[1])?;
                }

                remove_surf(grid, pages, icell, pair[0])?;
                remove_surf(grid, pages, icell, pair[1])?;

                if ntri_other == 2 {
                    let opair = facetris[othercell][otherface];
                    dellist.extend_from_slice(&[pair[0], pair[1], opair[0], opair[1]]);
                }
            } else {
                // remote neighbour: ship the pair, deleting it here first
                // when the normal says the other side owns it
                let record = FaceTransfer {
                    send_cell: icell as u32,
                    send_face: iface as u8,
                    other_cell: neigh.ilocal as u32,
                    other_face: otherface as u8,
                    inwardnorm,
                    tri1: TriRecord::from_tri(&store.tris[pair[0] as usize]),
                    tri2: TriRecord::from_tri(&store.tris[pair[1] as usize]),
                };
                dests.push(neigh.proc);
                record.write(&mut sendbuf);

                if !inwardnorm {
                    remove_surf(grid, pages, icell, pair[0])?;
                    remove_surf(grid, pages, icell, pair[1])?;
                    dellist.extend_from_slice(&[pair[0], pair[1]]);
                }
            }
        }
    }

    // one irregular exchange of all remote face records
    let recvbuf = comm.exchange(&dests, &sendbuf, FaceTransfer::SIZE);

    for chunk in recvbuf.chunks_exact(FaceTransfer::SIZE) {
        let record = FaceTransfer::read(chunk);
        let icell = record.other_cell as usize;
        let iface = record.other_face as usize;

        // sender keeps its pair; nothing to do here
        if nfacetri[icell][iface] == 0 && record.inwardnorm {
            continue;
        }

        // the pair belongs on this side: insert both triangles
        if nfacetri[icell][iface] == 0 {
            let first = store.tris.len() as u32;
            for rec in [&record.tri1, &record.tri2] {
                let isurf = store.add_tri(rec.ttype, rec.p1, rec.p2, rec.p3);
                store.tris[isurf].mask = rec.mask;
                store.tris[isurf].norm = rec.norm;
            }
            append_pair(grid, pages, store, icell, [first, first + 1]);
        }

        // both sides had a pair; the sender already dropped its copy when
        // it sent (its normal was outward), so delete ours exactly when
        // our normal is inward
        if nfacetri[icell][iface] == 2 {
            let pair = facetris[icell][iface];
            let inwardnorm = is_inward(store.tris[pair[0] as usize].norm, iface);
            if !inwardnorm {
                continue;
            }
            remove_surf(grid, pages, icell, pair[0])?;
            remove_surf(grid, pages, icell, pair[1])?;
            dellist.extend_from_slice(&[pair[0], pair[1]]);
        }
    }

    // compact the store, descending so a flagged slot is never a source
    dellist.sort_unstable_by(|a, b| b.cmp(a));

    let mut nslocal = store.tris.len();
    for &m in &dellist {
        let m = m as usize;
        nslocal -= 1;
        if m == nslocal {
            continue;
        }
        store.tris[m] = store.tris[nslocal];

        // repoint the moved triangle's entry in its cell's list
        let moved_cell = grid
            .local_of_id(store.tris[m].cell_id)
            .ok_or(RunError::MovedTriNotFound)?;
        let cell = &grid.cells[moved_cell];
        let n = cell.nsurf;
        let list = pages.slice_mut(cell.csurfs);
        let slot = list[..n]
            .iter()
            .position(|&x| x == nslocal as u32)
            .ok_or(RunError::MovedTriNotFound)?;
        list[slot] = m as u32;
    }
    store.tris.truncate(nslocal);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SerialComm;
    use crate::grid::{BlockExtent, CellType};

    /// Put a coplanar pair on face `iface` of cell `icell`, wound so the
    /// normal points along `sign` on the face axis.
    fn add_face_pair(
        grid: &mut GridBlock,
        pages: &mut IndexPages,
        store: &mut SurfStore,
        icell: usize,
        iface: usize,
        sign: f64,
    ) -> [u32; 2] {
        let cell = &grid.cells[icell];
        let (lo, hi) = (cell.lo, cell.hi);
        let dim = iface / 2;
        let plane = if iface % 2 == 0 {
            lo.axis(dim)
        } else {
            hi.axis(dim)
        };
        // quad corners in the face plane
        let (u, v) = match dim {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let mut corner = |du: f64, dv: f64| {
            let mut p = [0.0; 3];
            p[dim] = plane;
            p[u] = lo.axis(u) + du * (hi.axis(u) - lo.axis(u));
            p[v] = lo.axis(v) + dv * (hi.axis(v) - lo.axis(v));
            Point3::new(p[0], p[1], p[2])
        };
        let (a, b, c, d) = (
            corner(0.2, 0.2),
            corner(0.8, 0.2),
            corner(0.8, 0.8),
            corner(0.2, 0.8),
        );
        let id = cell.id;
        let (t1, t2) = if sign > 0.0 && dim != 1 || sign < 0.0 && dim == 1 {
            (store.add_tri(1, a, b, c), store.add_tri(1, a, c, d))
        } else {
            (store.add_tri(1, c, b, a), store.add_tri(1, d, c, a))
        };
        store.tris[t1].cell_id = id;
        store.tris[t2].cell_id = id;

        let n = grid.cells[icell].nsurf;
        let old = grid.cells[icell].csurfs;
        let span = pages.alloc(n + 2);
        let kept = pages.slice(old)[..n].to_vec();
        let dst = pages.slice_mut(span);
        dst[..n].copy_from_slice(&kept);
        dst[n] = t1 as u32;
        dst[n + 1] = t2 as u32;
        let cell = &mut grid.cells[icell];
        cell.csurfs = span;
        cell.nsurf = n + 2;
        cell.ctype = CellType::Overlap;
        [t1 as u32, t2 as u32]
    }

    fn two_cell_fixture() -> (GridBlock, IndexPages, SurfStore) {
        let grid = GridBlock::serial(BlockExtent::unit(3, 2, 1, 1), 1);
        (grid, IndexPages::new(), SurfStore::new())
    }

    #[test]
    fn test_keep_when_inward() {
        let (mut grid, mut pages, mut store) = two_cell_fixture();
        // pair on cell 0's x-hi face, normal pointing -x (into cell 0)
        add_face_pair(&mut grid, &mut pages, &mut store, 0, 1, -1.0);
        store.compute_tri_normals();
        assert!(store.tris[0].norm.x < 0.0);

        cleanup_mc(&mut grid, &mut pages, &mut store, &SerialComm).unwrap();

        assert_eq!(store.tris.len(), 2);
        assert_eq!(grid.cells[0].nsurf, 2);
        assert_eq!(grid.cells[1].nsurf, 0);
        assert_eq!(store.tris[0].cell_id, grid.cells[0].id);
    }

    #[test]
    fn test_move_when_outward() {
        let (mut grid, mut pages, mut store) = two_cell_fixture();
        // pair on cell 0's x-hi face, normal pointing +x (into cell 1)
        add_face_pair(&mut grid, &mut pages, &mut store, 0, 1, 1.0);
        store.compute_tri_normals();
        assert!(store.tris[0].norm.x > 0.0);

        cleanup_mc(&mut grid, &mut pages, &mut store, &SerialComm).unwrap();

        assert_eq!(store.tris.len(), 2);
        assert_eq!(grid.cells[0].nsurf, 0);
        assert_eq!(grid.cells[1].nsurf, 2);
        // owning-cell IDs rewritten on move
        assert_eq!(store.tris[0].cell_id, grid.cells[1].id);
        assert_eq!(store.tris[1].cell_id, grid.cells[1].id);
        let list = pages.slice(grid.cells[1].csurfs);
        assert_eq!(&list[..2], &[0, 1]);
    }

    #[test]
    fn test_delete_when_both_sides_have_pairs() {
        let (mut grid, mut pages, mut store) = two_cell_fixture();
        add_face_pair(&mut grid, &mut pages, &mut store, 0, 1, -1.0);
        add_face_pair(&mut grid, &mut pages, &mut store, 1, 0, 1.0);
        store.compute_tri_normals();

        cleanup_mc(&mut grid, &mut pages, &mut store, &SerialComm).unwrap();

        assert_eq!(store.tris.len(), 0);
        assert_eq!(grid.cells[0].nsurf, 0);
        assert_eq!(grid.cells[1].nsurf, 0);
    }

    #[test]
    fn test_face_count_invariant_violation() {
        let (mut grid, mut pages, mut store) = two_cell_fixture();
        // a single triangle on a face breaks the 0-or-2 invariant
        let cell = &grid.cells[0];
        let (lo, hi) = (cell.lo, cell.hi);
        let t = store.add_tri(
            1,
            Point3::new(hi.x, lo.y + 0.1, lo.z + 0.1),
            Point3::new(hi.x, lo.y + 0.9, lo.z + 0.1),
            Point3::new(hi.x, lo.y + 0.1, lo.z + 0.9),
        );
        store.tris[t].cell_id = cell.id;
        let span = pages.alloc(1);
        pages.slice_mut(span)[0] = t as u32;
        let cell = &mut grid.cells[0];
        cell.nsurf = 1;
        cell.csurfs = span;

        let err = cleanup_mc(&mut grid, &mut pages, &mut store, &SerialComm).unwrap_err();
        assert!(matches!(err, RunError::FaceTriangleCount { faces: 1 }));
    }

    #[test]
    fn test_compaction_repoints_moved_tri() {
        let (mut grid, mut pages, mut store) = two_cell_fixture();
        // non-face triangle in cell 1 first, so deletions in cell 0 force
        // the compactor to move it down and repoint cell 1's list
        let cell1 = &grid.cells[1];
        let (lo, hi) = (cell1.lo, cell1.hi);
        let mid = (lo + hi) * 0.5;
        let t = store.add_tri(
            1,
            mid,
            Point3::new(mid.x + 0.2, mid.y, mid.z),
            Point3::new(mid.x, mid.y + 0.2, mid.z),
        );
        store.tris[t].cell_id = cell1.id;
        let span = pages.alloc(1);
        pages.slice_mut(span)[0] = t as u32;
        grid.cells[1].nsurf = 1;
        grid.cells[1].csurfs = span;

        // both cells put a pair on the shared face; all four get deleted
        add_face_pair(&mut grid, &mut pages, &mut store, 0, 1, -1.0);
        add_face_pair(&mut grid, &mut pages, &mut store, 1, 0, 1.0);
        store.compute_tri_normals();

        cleanup_mc(&mut grid, &mut pages, &mut store, &SerialComm).unwrap();

        // only the interior triangle survives, compacted to slot 0
        assert_eq!(store.tris.len(), 1);
        assert_eq!(grid.cells[1].nsurf, 1);
        assert_eq!(pages.slice(grid.cells[1].csurfs)[0], 0);
        assert_eq!(store.tris[0].cell_id, grid.cells[1].id);
    }

    #[test]
    fn test_records_roundtrip() {
        let tri = TriRecord {
            ttype: -3,
            mask: 0b1010,
            p1: Point3::new(0.5, 1.5, -2.5),
            p2: Point3::new(1.0, 0.0, 3.5),
            p3: Point3::new(-1.0, 2.0, 0.25),
            norm: Point3::new(0.0, 0.0, 1.0),
        };
        let record = FaceTransfer {
            send_cell: 12,
            send_face: 1,
            other_cell: 40,
            other_face: 0,
            inwardnorm: true,
            tri1: tri,
            tri2: tri,
        };
        let mut bytes = Vec::new();
        record.write(&mut bytes);
        assert_eq!(bytes.len(), FaceTransfer::SIZE);
        assert_eq!(FaceTransfer::read(&bytes), record);
    }
}
