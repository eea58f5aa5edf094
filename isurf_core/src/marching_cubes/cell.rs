//! Per-cell marching cubes driver.

use super::ambiguity::CubeValues;
use super::tables::{
    CASES, SUBCONFIG13, TEST10, TEST12, TEST13, TEST3, TEST4, TEST6, TEST7, TILING1, TILING10_1_1,
    TILING10_1_1_, TILING10_1_2, TILING10_2, TILING10_2_, TILING11, TILING12_1_1, TILING12_1_1_,
    TILING12_1_2, TILING12_2, TILING12_2_, TILING13_1, TILING13_1_, TILING13_2, TILING13_2_,
    TILING13_3, TILING13_3_, TILING13_4, TILING13_5_1, TILING13_5_2, TILING14, TILING2, TILING3_1,
    TILING3_2, TILING4_1, TILING4_2, TILING5, TILING6_1_1, TILING6_1_2, TILING6_2, TILING7_1,
    TILING7_2, TILING7_3, TILING7_4_1, TILING7_4_2, TILING8, TILING9,
};
use crate::error::{CoreError, Result};
use crate::interpolate::interpolate;
use crate::types::Point3;

/// Maximum number of triangles one cell can emit (case 13.4).
pub const MAX_CELL_TRIS: usize = 12;

/// Edge endpoint pairs in corner order `4*z + 2*y + x`, indexed by the
/// canonical edge identifiers 0..11.
const EDGE_CORNERS: [(usize, usize); 12] = [
    (0, 1),
    (1, 3),
    (2, 3),
    (0, 2),
    (4, 5),
    (5, 7),
    (6, 7),
    (4, 6),
    (0, 4),
    (1, 5),
    (3, 7),
    (2, 6),
];

struct CellGeometry {
    /// Raw corner samples as f64, in corner order `4*z + 2*y + x`.
    rv: [f64; 8],
    /// Corner signs in the case-table bit numbering (bits 2<->3 and 6<->7
    /// swapped relative to corner order).
    bits: [bool; 8],
    thresh: f64,
    lo: Point3,
    hi: Point3,
}

impl CellGeometry {
    /// Crossing point on one of the 12 cube edges.
    fn edge_point(&self, edge: usize) -> Point3 {
        let (c0, c1) = EDGE_CORNERS[edge];
        let v0 = self.rv[c0];
        let v1 = self.rv[c1];
        let (lo, hi) = (self.lo, self.hi);
        match edge {
            0 => Point3::new(interpolate(v0, v1, self.thresh, lo.x, hi.x), lo.y, lo.z),
            1 => Point3::new(hi.x, interpolate(v0, v1, self.thresh, lo.y, hi.y), lo.z),
            2 => Point3::new(interpolate(v0, v1, self.thresh, lo.x, hi.x), hi.y, lo.z),
            3 => Point3::new(lo.x, interpolate(v0, v1, self.thresh, lo.y, hi.y), lo.z),
            4 => Point3::new(interpolate(v0, v1, self.thresh, lo.x, hi.x), lo.y, hi.z),
            5 => Point3::new(hi.x, interpolate(v0, v1, self.thresh, lo.y, hi.y), hi.z),
            6 => Point3::new(interpolate(v0, v1, self.thresh, lo.x, hi.x), hi.y, hi.z),
            7 => Point3::new(lo.x, interpolate(v0, v1, self.thresh, lo.y, hi.y), hi.z),
            8 => Point3::new(lo.x, lo.y, interpolate(v0, v1, self.thresh, lo.z, hi.z)),
            9 => Point3::new(hi.x, lo.y, interpolate(v0, v1, self.thresh, lo.z, hi.z)),
            10 => Point3::new(hi.x, hi.y, interpolate(v0, v1, self.thresh, lo.z, hi.z)),
            _ => Point3::new(lo.x, hi.y, interpolate(v0, v1, self.thresh, lo.z, hi.z)),
        }
    }

    /// Centroid of all crossing edge points (edge identifier 12).
    fn center_point(&self) -> Point3 {
        // Edge i crosses when its endpoint bits differ, in the case-table
        // bit numbering: ring 0-1-2-3, ring 4-5-6-7, pillars 0-4 .. 3-7.
        const EDGE_BITS: [(usize, usize); 12] = [
            (0, 1),
            (1, 2),
            (2, 3),
            (3, 0),
            (4, 5),
            (5, 6),
            (6, 7),
            (7, 4),
            (0, 4),
            (1, 5),
            (2, 6),
            (3, 7),
        ];

        let mut sum = Point3::default();
        let mut u = 0u32;
        for (edge, &(b0, b1)) in EDGE_BITS.iter().enumerate() {
            if self.bits[b0] ^ self.bits[b1] {
                u += 1;
                sum = sum + self.edge_point(edge);
            }
        }
        sum / f64::from(u)
    }

    /// Materialise one triangle strip, reversing each triple so the normal
    /// points into the flow volume.
    fn emit(
        &self,
        strip: &[i8],
        ntri: usize,
        out: &mut [[Point3; 3]; MAX_CELL_TRIS],
    ) -> usize {
        for t in 0..ntri {
            let mut pts = [Point3::default(); 3];
            for k in 0..3 {
                let edge = strip[3 * t + k];
                pts[k] = if edge == 12 {
                    self.center_point()
                } else {
                    self.edge_point(edge as usize)
                };
            }
            out[t] = [pts[2], pts[1], pts[0]];
        }
        ntri
    }
}

/// Extract the triangles crossing one 3D cell.
///
/// `corners` are the eight 8-bit samples in corner order bottom-lower-left,
/// bottom-lower-right, bottom-upper-left, bottom-upper-right, then the same
/// four on top. `lo`/`hi` bound the cell. Triangles come back wound so their
/// normals point into the flow volume.
///
/// # Returns
/// A fixed buffer of vertex triples and the number of valid triangles.
///
/// # Errors
/// Only table/numeric failures: an impossible case-13 sub-configuration or
/// a corrupt face/edge code, each carrying the corner dump.
pub fn tessellate_cell(
    corners: &[u8; 8],
    thresh: f64,
    lo: Point3,
    hi: Point3,
) -> Result<([[Point3; 3]; MAX_CELL_TRIS], usize)> {
    let cube = CubeValues::new(corners, thresh);

    let mut rv = [0.0; 8];
    for (dst, &src) in rv.iter_mut().zip(corners.iter()) {
        *dst = f64::from(src);
    }

    // Case-table bit numbering swaps corners 2<->3 and 6<->7 relative to
    // the corner storage order.
    let above = |i: usize| rv[i] > thresh;
    let bits = [
        above(0),
        above(1),
        above(3),
        above(2),
        above(4),
        above(5),
        above(7),
        above(6),
    ];

    let mut which = 0usize;
    for (i, &b) in bits.iter().enumerate() {
        if b {
            which += 1 << i;
        }
    }

    let geom = CellGeometry {
        rv,
        bits,
        thresh,
        lo,
        hi,
    };

    let icase = CASES[which][0] as u8;
    let config = CASES[which][1] as usize;

    let mut out = [[Point3::default(); 3]; MAX_CELL_TRIS];
    let nsurf = match icase {
        0 => 0,

        1 => geom.emit(&TILING1[config], 1, &mut out),

        2 => geom.emit(&TILING2[config], 2, &mut out),

        3 => {
            if cube.test_face(TEST3[config])? {
                geom.emit(&TILING3_2[config], 4, &mut out) // 3.2
            } else {
                geom.emit(&TILING3_1[config], 2, &mut out) // 3.1
            }
        }

        4 => {
            if cube.modified_test_interior(TEST4[config], icase, config)? {
                geom.emit(&TILING4_1[config], 2, &mut out) // 4.1.1
            } else {
                geom.emit(&TILING4_2[config], 6, &mut out) // 4.1.2
            }
        }

        5 => geom.emit(&TILING5[config], 3, &mut out),

        6 => {
            if cube.test_face(TEST6[config][0])? {
                geom.emit(&TILING6_2[config], 5, &mut out) // 6.2
            } else if cube.modified_test_interior(TEST6[config][1], icase, config)? {
                geom.emit(&TILING6_1_1[config], 3, &mut out) // 6.1.1
            } else {
                geom.emit(&TILING6_1_2[config], 7, &mut out) // 6.1.2
            }
        }

        7 => {
            let mut subconfig = 0usize;
            if cube.test_face(TEST7[config][0])? {
                subconfig += 1;
            }
            if cube.test_face(TEST7[config][1])? {
                subconfig += 2;
            }
            if cube.test_face(TEST7[config][2])? {
                subconfig += 4;
            }
            match subconfig {
                0 => geom.emit(&TILING7_1[config], 3, &mut out),
                1 => geom.emit(&TILING7_2[config][0], 5, &mut out),
                2 => geom.emit(&TILING7_2[config][1], 5, &mut out),
                3 => geom.emit(&TILING7_3[config][0], 9, &mut out),
                4 => geom.emit(&TILING7_2[config][2], 5, &mut out),
                5 => geom.emit(&TILING7_3[config][1], 9, &mut out),
                6 => geom.emit(&TILING7_3[config][2], 9, &mut out),
                _ => {
                    if cube.test_interior(TEST7[config][3], icase, config, 0)? {
                        geom.emit(&TILING7_4_2[config], 9, &mut out)
                    } else {
                        geom.emit(&TILING7_4_1[config], 5, &mut out)
                    }
                }
            }
        }

        8 => geom.emit(&TILING8[config], 2, &mut out),

        9 => geom.emit(&TILING9[config], 4, &mut out),

        10 => {
            if cube.test_face(TEST10[config][0])? {
                if cube.test_face(TEST10[config][1])? {
                    geom.emit(&TILING10_1_1_[config], 4, &mut out) // 10.1.1
                } else {
                    geom.emit(&TILING10_2[config], 8, &mut out) // 10.2
                }
            } else if cube.test_face(TEST10[config][1])? {
                geom.emit(&TILING10_2_[config], 8, &mut out) // 10.2
            } else if cube.test_interior(TEST10[config][2], icase, config, 0)? {
                geom.emit(&TILING10_1_1[config], 4, &mut out) // 10.1.1
            } else {
                geom.emit(&TILING10_1_2[config], 8, &mut out) // 10.1.2
            }
        }

        11 => geom.emit(&TILING11[config], 4, &mut out),

        12 => {
            if cube.test_face(TEST12[config][0])? {
                if cube.test_face(TEST12[config][1])? {
                    geom.emit(&TILING12_1_1_[config], 4, &mut out) // 12.1.1
                } else {
                    geom.emit(&TILING12_2[config], 8, &mut out) // 12.2
                }
            } else if cube.test_face(TEST12[config][1])? {
                geom.emit(&TILING12_2_[config], 8, &mut out) // 12.2
            } else if cube.test_interior(TEST12[config][2], icase, config, 0)? {
                geom.emit(&TILING12_1_1[config], 4, &mut out) // 12.1.1
            } else {
                geom.emit(&TILING12_1_2[config], 8, &mut out) // 12.1.2
            }
        }

        13 => {
            let mut subconfig = 0usize;
            for (bit, &face) in TEST13[config].iter().take(6).enumerate() {
                if cube.test_face(face)? {
                    subconfig += 1 << bit;
                }
            }

            match SUBCONFIG13[config][subconfig] {
                0 => geom.emit(&TILING13_1[config], 4, &mut out), // 13.1

                1 => geom.emit(&TILING13_2[config][0], 6, &mut out), // 13.2
                2 => geom.emit(&TILING13_2[config][1], 6, &mut out),
                3 => geom.emit(&TILING13_2[config][2], 6, &mut out),
                4 => geom.emit(&TILING13_2[config][3], 6, &mut out),
                5 => geom.emit(&TILING13_2[config][4], 6, &mut out),
                6 => geom.emit(&TILING13_2[config][5], 6, &mut out),

                7 => geom.emit(&TILING13_3[config][0], 10, &mut out), // 13.3
                8 => geom.emit(&TILING13_3[config][1], 10, &mut out),
                9 => geom.emit(&TILING13_3[config][2], 10, &mut out),
                10 => geom.emit(&TILING13_3[config][3], 10, &mut out),
                11 => geom.emit(&TILING13_3[config][4], 10, &mut out),
                12 => geom.emit(&TILING13_3[config][5], 10, &mut out),
                13 => geom.emit(&TILING13_3[config][6], 10, &mut out),
                14 => geom.emit(&TILING13_3[config][7], 10, &mut out),
                15 => geom.emit(&TILING13_3[config][8], 10, &mut out),
                16 => geom.emit(&TILING13_3[config][9], 10, &mut out),
                17 => geom.emit(&TILING13_3[config][10], 10, &mut out),
                18 => geom.emit(&TILING13_3[config][11], 10, &mut out),

                19 => geom.emit(&TILING13_4[config][0], 12, &mut out), // 13.4
                20 => geom.emit(&TILING13_4[config][1], 12, &mut out),
                21 => geom.emit(&TILING13_4[config][2], 12, &mut out),
                22 => geom.emit(&TILING13_4[config][3], 12, &mut out),

                s @ 23..=26 => {
                    // 13.5
                    let sub = (s - 23) as usize;
                    if cube.interior_test_case13() {
                        geom.emit(&TILING13_5_1[config][sub], 6, &mut out)
                    } else {
                        geom.emit(&TILING13_5_2[config][sub], 10, &mut out)
                    }
                }

                27 => geom.emit(&TILING13_3_[config][0], 10, &mut out), // 13.3
                28 => geom.emit(&TILING13_3_[config][1], 10, &mut out),
                29 => geom.emit(&TILING13_3_[config][2], 10, &mut out),
                30 => geom.emit(&TILING13_3_[config][3], 10, &mut out),
                31 => geom.emit(&TILING13_3_[config][4], 10, &mut out),
                32 => geom.emit(&TILING13_3_[config][5], 10, &mut out),
                33 => geom.emit(&TILING13_3_[config][6], 10, &mut out),
                34 => geom.emit(&TILING13_3_[config][7], 10, &mut out),
                35 => geom.emit(&TILING13_3_[config][8], 10, &mut out),
                36 => geom.emit(&TILING13_3_[config][9], 10, &mut out),
                37 => geom.emit(&TILING13_3_[config][10], 10, &mut out),
                38 => geom.emit(&TILING13_3_[config][11], 10, &mut out),

                39 => geom.emit(&TILING13_2_[config][0], 6, &mut out), // 13.2
                40 => geom.emit(&TILING13_2_[config][1], 6, &mut out),
                41 => geom.emit(&TILING13_2_[config][2], 6, &mut out),
                42 => geom.emit(&TILING13_2_[config][3], 6, &mut out),
                43 => geom.emit(&TILING13_2_[config][4], 6, &mut out),
                44 => geom.emit(&TILING13_2_[config][5], 6, &mut out),

                45 => geom.emit(&TILING13_1_[config], 4, &mut out), // 13.1

                _ => {
                    return Err(CoreError::ImpossibleCase13 {
                        subconfig,
                        corners: *corners,
                    })
                }
            }
        }

        _ => geom.emit(&TILING14[config], 4, &mut out),
    };

    Ok((out, nsurf))
}

/// Allocating wrapper around [`tessellate_cell`].
#[cfg(any(feature = "std", feature = "alloc"))]
pub fn tessellate_cell_vec(
    corners: &[u8; 8],
    thresh: f64,
    lo: Point3,
    hi: Point3,
) -> Result<crate::alloc_prelude::Vec<[Point3; 3]>> {
    let (tris, n) = tessellate_cell(corners, thresh, lo, hi)?;
    Ok(tris[..n].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cell() -> (Point3, Point3) {
        (Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    fn normal(tri: &[Point3; 3]) -> Point3 {
        (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize()
    }

    #[test]
    fn test_empty_and_full_cells() {
        let (lo, hi) = unit_cell();
        let (_, n) = tessellate_cell(&[0; 8], 128.5, lo, hi).unwrap();
        assert_eq!(n, 0);
        let (_, n) = tessellate_cell(&[255; 8], 128.5, lo, hi).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_single_corner_cap() {
        let (lo, hi) = unit_cell();
        let mut corners = [0u8; 8];
        corners[0] = 255;
        let (tris, n) = tessellate_cell(&corners, 128.5, lo, hi).unwrap();
        assert_eq!(n, 1);

        // The cap cuts the three edges meeting at the material corner, and
        // its normal points away from it into the flow volume.
        let norm = normal(&tris[0]);
        assert!(norm.x > 0.0 && norm.y > 0.0 && norm.z > 0.0, "{:?}", norm);
        for p in &tris[0] {
            assert!(p.x <= 0.51 && p.y <= 0.51 && p.z <= 0.51);
        }
    }

    #[test]
    fn test_each_single_corner_emits_one_triangle() {
        let (lo, hi) = unit_cell();
        for i in 0..8 {
            let mut corners = [0u8; 8];
            corners[i] = 255;
            let (_, n) = tessellate_cell(&corners, 128.5, lo, hi).unwrap();
            assert_eq!(n, 1, "corner {}", i);
        }
    }

    #[test]
    fn test_adjacent_pair_quad() {
        let (lo, hi) = unit_cell();
        // Corners v000 and v001 share the bottom front edge.
        let corners = [255, 255, 0, 0, 0, 0, 0, 0];
        let (_, n) = tessellate_cell(&corners, 128.5, lo, hi).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_half_cell_slab() {
        let (lo, hi) = unit_cell();
        // Bottom four corners high: one quad at z just below the midplane.
        let corners = [255, 255, 255, 255, 0, 0, 0, 0];
        let (tris, n) = tessellate_cell(&corners, 128.5, lo, hi).unwrap();
        assert_eq!(n, 2);
        for tri in tris.iter().take(n) {
            let norm = normal(tri);
            assert!(norm.z > 0.99, "normal should point +z, got {:?}", norm);
            for p in tri {
                assert!((p.z - 126.5 / 255.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_case13_seed_routes_through_subconfig() {
        let (lo, hi) = unit_cell();
        // Alternating tetrahedron: the canonical case 13 cell.
        let corners = [255, 0, 0, 255, 0, 255, 255, 0];
        let (tris, n) = tessellate_cell(&corners, 128.5, lo, hi).unwrap();
        assert!(n >= 4, "case 13 tilings emit at least 4 triangles, got {}", n);
        for tri in tris.iter().take(n) {
            for p in tri {
                assert!(p.x >= 0.0 && p.x <= 1.0);
                assert!(p.y >= 0.0 && p.y <= 1.0);
                assert!(p.z >= 0.0 && p.z <= 1.0);
            }
        }
    }

    #[test]
    fn test_complement_symmetry_of_counts() {
        // A pattern and its complement describe the same surface with
        // opposite orientation; triangle counts for the base cases match.
        let (lo, hi) = unit_cell();
        for pattern in [0x01u8, 0x03, 0x0f, 0x11, 0x33] {
            let mut corners = [0u8; 8];
            let mut inverse = [0u8; 8];
            for i in 0..8 {
                if pattern & (1 << i) != 0 {
                    corners[i] = 255;
                } else {
                    inverse[i] = 255;
                }
            }
            let (_, n) = tessellate_cell(&corners, 128.5, lo, hi).unwrap();
            let (_, m) = tessellate_cell(&inverse, 128.5, lo, hi).unwrap();
            assert_eq!(n, m, "pattern {:#04x}", pattern);
        }
    }

    #[test]
    fn test_vertices_always_inside_cell() {
        let lo = Point3::new(1.0, 2.0, 3.0);
        let hi = Point3::new(1.5, 2.5, 3.5);
        // A handful of irregular corner mixes.
        let sets: [[u8; 8]; 4] = [
            [200, 30, 64, 90, 12, 250, 70, 128],
            [255, 255, 0, 0, 0, 0, 255, 255],
            [0, 130, 0, 130, 130, 0, 130, 0],
            [5, 250, 5, 250, 250, 5, 250, 5],
        ];
        for corners in &sets {
            let (tris, n) = tessellate_cell(corners, 128.5, lo, hi).unwrap();
            for tri in tris.iter().take(n) {
                for p in tri {
                    assert!(p.x >= lo.x - 1e-12 && p.x <= hi.x + 1e-12);
                    assert!(p.y >= lo.y - 1e-12 && p.y <= hi.y + 1e-12);
                    assert!(p.z >= lo.z - 1e-12 && p.z <= hi.z + 1e-12);
                }
            }
        }
    }
}
