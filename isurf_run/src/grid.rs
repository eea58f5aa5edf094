//! Uniform cell block, rank ownership and the corner-scatter hash.
//!
//! The reader operates on one contiguous block of uniform cells carved out
//! of the simulation grid. Each rank owns a disjoint subset; neighbour
//! relations are decoded from block coordinates rather than stored.

use std::collections::HashMap;

use isurf_core::Point3;

use crate::page::Span;

/// Globally unique cell ID (1-based, block index + 1).
pub type CellId = u64;

/// Cell classification after surface extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellType {
    /// Not yet classified.
    #[default]
    Unknown,
    /// Entirely in the flow volume.
    Outside,
    /// Entirely inside the material.
    Inside,
    /// Intersected by the surface.
    Overlap,
}

/// One locally owned grid cell.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Globally unique ID.
    pub id: CellId,
    /// Lower corner.
    pub lo: Point3,
    /// Upper corner.
    pub hi: Point3,
    /// Group membership bits.
    pub mask: u32,
    /// Classification tag.
    pub ctype: CellType,
    /// Number of primitives attached to this cell.
    pub nsurf: usize,
    /// Span of primitive indices in the page arena.
    pub csurfs: Span,
}

/// Geometry of the uniform block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockExtent {
    /// Dimensionality, 2 or 3.
    pub dim: usize,
    /// Cells along x.
    pub nx: usize,
    /// Cells along y.
    pub ny: usize,
    /// Cells along z (1 in 2D).
    pub nz: usize,
    /// Lower corner of the block.
    pub origin: Point3,
    /// Cell edge lengths.
    pub cell_size: [f64; 3],
}

impl BlockExtent {
    /// Unit-sized cells starting at the coordinate origin.
    pub fn unit(dim: usize, nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            dim,
            nx,
            ny,
            nz,
            origin: Point3::default(),
            cell_size: [1.0, 1.0, 1.0],
        }
    }

    /// Total number of cells in the block.
    #[inline]
    pub fn ncells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Linearized block index, row-major with z outermost.
    #[inline]
    pub fn cell_index(&self, ix: usize, iy: usize, iz: usize) -> u64 {
        (self.nx * self.ny * iz + self.nx * iy + ix) as u64
    }

    /// Block coordinates of a linearized index.
    #[inline]
    pub fn cell_coords(&self, index: u64) -> (usize, usize, usize) {
        let index = index as usize;
        let ix = index % self.nx;
        let iy = (index / self.nx) % self.ny;
        let iz = index / (self.nx * self.ny);
        (ix, iy, iz)
    }

    /// Bounding box of a cell.
    pub fn cell_bounds(&self, ix: usize, iy: usize, iz: usize) -> (Point3, Point3) {
        let lo = Point3::new(
            self.origin.x + ix as f64 * self.cell_size[0],
            self.origin.y + iy as f64 * self.cell_size[1],
            self.origin.z + iz as f64 * self.cell_size[2],
        );
        let hi = Point3::new(
            lo.x + self.cell_size[0],
            lo.y + self.cell_size[1],
            lo.z + if self.dim == 3 { self.cell_size[2] } else { 0.0 },
        );
        (lo, hi)
    }
}

/// Decoded neighbour of a local cell across one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    /// Rank that owns the neighbour.
    pub proc: usize,
    /// Local index of the neighbour on its owner.
    pub ilocal: usize,
    /// Global ID of the neighbour.
    pub id: CellId,
}

/// The rank-local view of the uniform block.
pub struct GridBlock {
    /// Block geometry.
    pub extent: BlockExtent,
    /// This rank.
    pub me: usize,
    /// Locally owned cells, ascending block index.
    pub cells: Vec<Cell>,
    owner: Vec<u32>,
    local_index: Vec<u32>,
    global_of_local: Vec<u64>,
    id_to_local: HashMap<CellId, usize>,
}

impl GridBlock {
    /// Build the local view given an owner rank per block index.
    pub fn with_owner(extent: BlockExtent, owner: Vec<u32>, me: usize, groupbit: u32) -> Self {
        assert_eq!(owner.len(), extent.ncells());

        let mut local_index = vec![0u32; extent.ncells()];
        let mut counts = HashMap::new();
        for (g, &rank) in owner.iter().enumerate() {
            let next = counts.entry(rank).or_insert(0u32);
            local_index[g] = *next;
            *next += 1;
        }

        let mut cells = Vec::new();
        let mut global_of_local = Vec::new();
        let mut id_to_local = HashMap::new();
        for g in 0..extent.ncells() {
            if owner[g] as usize != me {
                continue;
            }
            let (ix, iy, iz) = extent.cell_coords(g as u64);
            let (lo, hi) = extent.cell_bounds(ix, iy, iz);
            let id = g as u64 + 1;
            id_to_local.insert(id, cells.len());
            global_of_local.push(g as u64);
            cells.push(Cell {
                id,
                lo,
                hi,
                mask: groupbit,
                ctype: CellType::Unknown,
                nsurf: 0,
                csurfs: Span::default(),
            });
        }

        Self {
            extent,
            me,
            cells,
            owner,
            local_index,
            global_of_local,
            id_to_local,
        }
    }

    /// Build the local view with cells dealt to ranks in contiguous slabs
    /// along x.
    pub fn slab_x(extent: BlockExtent, nprocs: usize, me: usize, groupbit: u32) -> Self {
        let owner = (0..extent.ncells())
            .map(|g| {
                let (ix, _, _) = extent.cell_coords(g as u64);
                (ix * nprocs / extent.nx) as u32
            })
            .collect();
        Self::with_owner(extent, owner, me, groupbit)
    }

    /// Single-rank view owning every cell.
    pub fn serial(extent: BlockExtent, groupbit: u32) -> Self {
        let owner = vec![0; extent.ncells()];
        Self::with_owner(extent, owner, 0, groupbit)
    }

    /// Number of locally owned cells.
    #[inline]
    pub fn nlocal(&self) -> usize {
        self.cells.len()
    }

    /// Block coordinates of a local cell.
    #[inline]
    pub fn coords_of_local(&self, icell: usize) -> (usize, usize, usize) {
        self.extent.cell_coords(self.global_of_local[icell])
    }

    /// Local index for a cell ID, if this rank owns it.
    #[inline]
    pub fn local_of_id(&self, id: CellId) -> Option<usize> {
        self.id_to_local.get(&id).copied()
    }

    /// Decode the neighbour of a local cell across face 0..5
    /// (x-lo, x-hi, y-lo, y-hi, z-lo, z-hi).
    ///
    /// Returns `None` on the outer boundary of the block.
    pub fn neighbor(&self, icell: usize, iface: usize) -> Option<Neighbor> {
        let (ix, iy, iz) = self.coords_of_local(icell);
        let (mut nix, mut niy, mut niz) = (ix as isize, iy as isize, iz as isize);
        match iface {
            0 => nix -= 1,
            1 => nix += 1,
            2 => niy -= 1,
            3 => niy += 1,
            4 => niz -= 1,
            _ => niz += 1,
        }
        if nix < 0
            || nix >= self.extent.nx as isize
            || niy < 0
            || niy >= self.extent.ny as isize
            || niz < 0
            || niz >= self.extent.nz as isize
        {
            return None;
        }
        let g = self
            .extent
            .cell_index(nix as usize, niy as usize, niz as usize);
        Some(Neighbor {
            proc: self.owner[g as usize] as usize,
            ilocal: self.local_index[g as usize] as usize,
            id: g + 1,
        })
    }
}

/// Matching face on the adjoining cell.
#[inline]
pub const fn opposite_face(iface: usize) -> usize {
    iface ^ 1
}

const EMPTY_KEY: u64 = u64::MAX;

/// Open-addressed hash from linearized block index to local cell index.
///
/// Built once before the corner scatter and dropped right after it; uses
/// linear probing over a power-of-two table.
pub struct CellIndexMap {
    slots: Box<[(u64, u32)]>,
    mask: usize,
    len: usize,
}

impl CellIndexMap {
    /// Create a map sized for `count` entries.
    pub fn with_capacity(count: usize) -> Self {
        let capacity = (count.max(1) * 2).next_power_of_two();
        Self {
            slots: vec![(EMPTY_KEY, 0); capacity].into_boxed_slice(),
            mask: capacity - 1,
            len: 0,
        }
    }

    #[inline]
    fn bucket(&self, key: u64) -> usize {
        (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize & self.mask
    }

    /// Insert a key; the last write for a key wins.
    pub fn insert(&mut self, key: u64, value: u32) {
        debug_assert_ne!(key, EMPTY_KEY);
        let mut idx = self.bucket(key);
        loop {
            let (k, _) = self.slots[idx];
            if k == EMPTY_KEY {
                self.slots[idx] = (key, value);
                self.len += 1;
                return;
            }
            if k == key {
                self.slots[idx] = (key, value);
                return;
            }
            idx = (idx + 1) & self.mask;
        }
    }

    /// Look up a key.
    #[inline]
    pub fn get(&self, key: u64) -> Option<u32> {
        let mut idx = self.bucket(key);
        loop {
            let (k, v) = self.slots[idx];
            if k == key {
                return Some(v);
            }
            if k == EMPTY_KEY {
                return None;
            }
            idx = (idx + 1) & self.mask;
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_index_roundtrip() {
        let extent = BlockExtent::unit(3, 4, 3, 2);
        for iz in 0..2 {
            for iy in 0..3 {
                for ix in 0..4 {
                    let g = extent.cell_index(ix, iy, iz);
                    assert_eq!(extent.cell_coords(g), (ix, iy, iz));
                }
            }
        }
        assert_eq!(extent.cell_index(0, 0, 0), 0);
        assert_eq!(extent.cell_index(1, 0, 0), 1);
        assert_eq!(extent.cell_index(0, 1, 0), 4);
        assert_eq!(extent.cell_index(0, 0, 1), 12);
    }

    #[test]
    fn test_cell_bounds() {
        let mut extent = BlockExtent::unit(3, 2, 2, 2);
        extent.origin = Point3::new(10.0, 20.0, 30.0);
        extent.cell_size = [0.5, 1.0, 2.0];
        let (lo, hi) = extent.cell_bounds(1, 0, 1);
        assert_eq!(lo, Point3::new(10.5, 20.0, 32.0));
        assert_eq!(hi, Point3::new(11.0, 21.0, 34.0));
    }

    #[test]
    fn test_serial_grid_owns_everything() {
        let grid = GridBlock::serial(BlockExtent::unit(3, 3, 3, 3), 1);
        assert_eq!(grid.nlocal(), 27);
        for (i, cell) in grid.cells.iter().enumerate() {
            assert_eq!(grid.local_of_id(cell.id), Some(i));
        }
    }

    #[test]
    fn test_neighbor_decode() {
        let grid = GridBlock::serial(BlockExtent::unit(3, 3, 3, 3), 1);
        // center cell (1,1,1) has all six neighbours
        let center = grid
            .cells
            .iter()
            .position(|c| c.id == grid.extent.cell_index(1, 1, 1) + 1)
            .unwrap();
        for iface in 0..6 {
            let n = grid.neighbor(center, iface).unwrap();
            assert_eq!(n.proc, 0);
            let (ix, iy, iz) = grid.extent.cell_coords(n.id - 1);
            let expect = match iface {
                0 => (0, 1, 1),
                1 => (2, 1, 1),
                2 => (1, 0, 1),
                3 => (1, 2, 1),
                4 => (1, 1, 0),
                _ => (1, 1, 2),
            };
            assert_eq!((ix, iy, iz), expect);
        }
        // corner cell has no x-lo neighbour
        let corner = grid.cells.iter().position(|c| c.id == 1).unwrap();
        assert!(grid.neighbor(corner, 0).is_none());
        assert!(grid.neighbor(corner, 1).is_some());
    }

    #[test]
    fn test_slab_decomposition_is_disjoint_and_complete() {
        let extent = BlockExtent::unit(3, 4, 2, 2);
        let g0 = GridBlock::slab_x(extent, 2, 0, 1);
        let g1 = GridBlock::slab_x(extent, 2, 1, 1);
        assert_eq!(g0.nlocal() + g1.nlocal(), extent.ncells());
        for cell in &g0.cells {
            assert!(g1.local_of_id(cell.id).is_none());
        }
        // cross-rank neighbour decoding agrees from both sides
        let (last0, _, _) = g0.coords_of_local(g0.nlocal() - 1);
        assert_eq!(last0, 1);
        let icell = g0
            .cells
            .iter()
            .position(|c| {
                let (ix, _, _) = g0.coords_of_local(g0.local_of_id(c.id).unwrap());
                ix == 1
            })
            .unwrap();
        let n = g0.neighbor(icell, 1).unwrap();
        assert_eq!(n.proc, 1);
        assert_eq!(g1.cells[n.ilocal].id, n.id);
    }

    #[test]
    fn test_opposite_face() {
        assert_eq!(opposite_face(0), 1);
        assert_eq!(opposite_face(1), 0);
        assert_eq!(opposite_face(4), 5);
    }

    #[test]
    fn test_cell_index_map() {
        let mut map = CellIndexMap::with_capacity(10);
        assert!(map.is_empty());
        for i in 0..10u64 {
            map.insert(i * 1000, i as u32);
        }
        assert_eq!(map.len(), 10);
        for i in 0..10u64 {
            assert_eq!(map.get(i * 1000), Some(i as u32));
        }
        assert_eq!(map.get(999), None);

        // overwrite keeps the latest value
        map.insert(2000, 77);
        assert_eq!(map.get(2000), Some(77));
        assert_eq!(map.len(), 10);
    }

    #[test]
    fn test_cell_index_map_dense_keys() {
        let mut map = CellIndexMap::with_capacity(64);
        for key in 0..64u64 {
            map.insert(key, key as u32 + 1);
        }
        for key in 0..64u64 {
            assert_eq!(map.get(key), Some(key as u32 + 1));
        }
    }
}
