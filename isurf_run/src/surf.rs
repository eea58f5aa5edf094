//! Surface store: owned triangle and line-segment records.
//!
//! The store owns every primitive; cells only hold index lists into it.
//! Vertices are duplicated, not welded. Normals are filled by a separate
//! pass after extraction because the reconciler keys its keep/move/delete
//! decisions on them.

use isurf_core::Point3;

use crate::grid::CellId;

/// Relative tolerance for the on-face test.
const EPSSURF: f64 = 1.0e-9;

/// One triangle record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tri {
    /// Surface type, from the type file or 1.
    pub ttype: i32,
    /// Group bits.
    pub mask: u32,
    /// Owning cell; advisory, rewritten when the triangle moves.
    pub cell_id: CellId,
    /// First vertex.
    pub p1: Point3,
    /// Second vertex.
    pub p2: Point3,
    /// Third vertex.
    pub p3: Point3,
    /// Unit outward normal, zero until the normals pass runs.
    pub norm: Point3,
}

/// One line-segment record (2D).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// Surface type, from the type file or 1.
    pub ltype: i32,
    /// Group bits.
    pub mask: u32,
    /// Owning cell.
    pub cell_id: CellId,
    /// First endpoint.
    pub p1: Point3,
    /// Second endpoint.
    pub p2: Point3,
    /// Unit normal in the plane, zero until the normals pass runs.
    pub norm: Point3,
}

/// Owner of all primitive records on this rank.
#[derive(Debug, Default)]
pub struct SurfStore {
    /// Triangle records (3D).
    pub tris: Vec<Tri>,
    /// Line records (2D).
    pub lines: Vec<Line>,
    /// Global primitive count, filled by the final reduction.
    pub nglobal: u64,
}

impl SurfStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the store holds no primitives.
    pub fn is_empty(&self) -> bool {
        self.tris.is_empty() && self.lines.is_empty()
    }

    /// Number of local primitives.
    pub fn nlocal(&self) -> usize {
        self.tris.len() + self.lines.len()
    }

    /// Append a triangle; the normal stays zero until the normals pass.
    ///
    /// # Returns
    /// The new triangle's index.
    pub fn add_tri(&mut self, ttype: i32, p1: Point3, p2: Point3, p3: Point3) -> usize {
        self.tris.push(Tri {
            ttype,
            mask: 1,
            cell_id: 0,
            p1,
            p2,
            p3,
            norm: Point3::default(),
        });
        self.tris.len() - 1
    }

    /// Append a line segment.
    ///
    /// # Returns
    /// The new segment's index.
    pub fn add_line(&mut self, ltype: i32, p1: Point3, p2: Point3) -> usize {
        self.lines.push(Line {
            ltype,
            mask: 1,
            cell_id: 0,
            p1,
            p2,
            norm: Point3::default(),
        });
        self.lines.len() - 1
    }

    /// Fill triangle normals: normalized `(p2-p1) x (p3-p1)`.
    pub fn compute_tri_normals(&mut self) {
        for tri in &mut self.tris {
            tri.norm = (tri.p2 - tri.p1).cross(tri.p3 - tri.p1).normalize();
        }
    }

    /// Fill line normals: normalized `z_hat x (p2-p1)`.
    pub fn compute_line_normals(&mut self) {
        for line in &mut self.lines {
            let d = line.p2 - line.p1;
            line.norm = Point3::new(-d.y, d.x, 0.0).normalize();
        }
    }

    /// OR a group bit into every primitive's mask.
    pub fn or_mask(&mut self, bit: u32) {
        for tri in &mut self.tris {
            tri.mask |= bit;
        }
        for line in &mut self.lines {
            line.mask |= bit;
        }
    }

    /// Bounding box of all primitive vertices, if any.
    pub fn extent(&self) -> Option<(Point3, Point3)> {
        let mut bounds: Option<(Point3, Point3)> = None;
        let mut grow = |p: Point3| {
            bounds = Some(match bounds {
                None => (p, p),
                Some((lo, hi)) => (lo.min(p), hi.max(p)),
            });
        };
        for tri in &self.tris {
            grow(tri.p1);
            grow(tri.p2);
            grow(tri.p3);
        }
        for line in &self.lines {
            grow(line.p1);
            grow(line.p2);
        }
        bounds
    }
}

/// Which face of the hex cell `[lo, hi]` a triangle lies exactly on.
///
/// Faces are numbered x-lo, x-hi, y-lo, y-hi, z-lo, z-hi; returns `None`
/// when the triangle is not coplanar with any face.
pub fn tri_on_hex_face(p1: Point3, p2: Point3, p3: Point3, lo: Point3, hi: Point3) -> Option<usize> {
    for iface in 0..6 {
        let dim = iface / 2;
        let plane = if iface % 2 == 0 {
            lo.axis(dim)
        } else {
            hi.axis(dim)
        };
        let tol = EPSSURF * (hi.axis(dim) - lo.axis(dim)).abs();
        if (p1.axis(dim) - plane).abs() <= tol
            && (p2.axis(dim) - plane).abs() <= tol
            && (p3.axis(dim) - plane).abs() <= tol
        {
            return Some(iface);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_tri_and_normals() {
        let mut store = SurfStore::new();
        let i = store.add_tri(
            1,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(i, 0);
        store.compute_tri_normals();
        assert_eq!(store.tris[0].norm, Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_line_normal_points_left_of_travel() {
        let mut store = SurfStore::new();
        store.add_line(1, Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        store.compute_line_normals();
        assert_eq!(store.lines[0].norm, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_or_mask() {
        let mut store = SurfStore::new();
        store.add_tri(
            1,
            Point3::default(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        store.or_mask(0b100);
        assert_eq!(store.tris[0].mask, 0b101);
    }

    #[test]
    fn test_extent() {
        let mut store = SurfStore::new();
        assert!(store.extent().is_none());
        store.add_tri(
            1,
            Point3::new(-1.0, 0.0, 2.0),
            Point3::new(1.0, 3.0, 0.0),
            Point3::new(0.0, -2.0, 5.0),
        );
        let (lo, hi) = store.extent().unwrap();
        assert_eq!(lo, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(hi, Point3::new(1.0, 3.0, 5.0));
    }

    #[test]
    fn test_tri_on_hex_face() {
        let lo = Point3::new(0.0, 0.0, 0.0);
        let hi = Point3::new(1.0, 1.0, 1.0);

        // on the x-hi face
        let face = tri_on_hex_face(
            Point3::new(1.0, 0.2, 0.2),
            Point3::new(1.0, 0.8, 0.2),
            Point3::new(1.0, 0.2, 0.8),
            lo,
            hi,
        );
        assert_eq!(face, Some(1));

        // on the z-lo face
        let face = tri_on_hex_face(
            Point3::new(0.1, 0.2, 0.0),
            Point3::new(0.8, 0.2, 0.0),
            Point3::new(0.1, 0.9, 0.0),
            lo,
            hi,
        );
        assert_eq!(face, Some(4));

        // interior triangle
        let face = tri_on_hex_face(
            Point3::new(0.5, 0.2, 0.2),
            Point3::new(0.5, 0.8, 0.2),
            Point3::new(0.2, 0.2, 0.8),
            lo,
            hi,
        );
        assert_eq!(face, None);

        // only two vertices on a face is not enough
        let face = tri_on_hex_face(
            Point3::new(1.0, 0.2, 0.2),
            Point3::new(1.0, 0.8, 0.2),
            Point3::new(0.5, 0.2, 0.8),
            lo,
            hi,
        );
        assert_eq!(face, None);
    }
}
