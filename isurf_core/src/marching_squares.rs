//! Marching squares: 2D line-segment extraction from one grid cell.
//!
//! Follows the classic 16-case decomposition. Corner samples are treated as
//! material where they exceed the threshold and as flow volume where they do
//! not; every emitted segment is ordered so that its left-hand normal
//! (`z_hat x (p2 - p1)`) points into the flow volume. The two saddle cases
//! are disambiguated by the average of the four corner values against the
//! threshold.

use crate::interpolate::interpolate;
use crate::types::Point3;

/// Maximum number of line segments one cell can emit.
pub const MAX_CELL_LINES: usize = 2;

/// Extract the line segments crossing one 2D cell.
///
/// `corners` are ordered lower-left, lower-right, upper-left, upper-right.
/// Segment endpoints carry `z = 0`.
///
/// # Returns
/// A fixed buffer of segment endpoint pairs and the number of valid segments.
pub fn tessellate_square(
    corners: &[u8; 4],
    thresh: f64,
    lo: Point3,
    hi: Point3,
) -> ([[Point3; 2]; MAX_CELL_LINES], usize) {
    let v00 = f64::from(corners[0]);
    let v01 = f64::from(corners[1]);
    let v10 = f64::from(corners[2]);
    let v11 = f64::from(corners[3]);

    // Corner values are numbered in x then in y; the case index counts
    // corners counter-clockwise, so bits 2 and 3 swap.
    let bit0 = usize::from(v00 > thresh);
    let bit1 = usize::from(v01 > thresh);
    let bit2 = usize::from(v11 > thresh);
    let bit3 = usize::from(v10 > thresh);

    let which = (bit3 << 3) + (bit2 << 2) + (bit1 << 1) + bit0;

    let mut pt = [Point3::default(); 4];
    let nsurf;

    match which {
        0 | 15 => {
            nsurf = 0;
        }

        1 => {
            nsurf = 1;
            pt[0] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
            pt[1] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
        }

        2 => {
            nsurf = 1;
            pt[0] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
            pt[1] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
        }

        3 => {
            nsurf = 1;
            pt[0] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
            pt[1] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
        }

        4 => {
            nsurf = 1;
            pt[0] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
            pt[1] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
        }

        5 => {
            nsurf = 2;
            let ave = 0.25 * (v00 + v01 + v10 + v11);
            if ave > thresh {
                pt[0] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
                pt[1] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
                pt[2] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
                pt[3] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
            } else {
                pt[0] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
                pt[1] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
                pt[2] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
                pt[3] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
            }
        }

        6 => {
            nsurf = 1;
            pt[0] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
            pt[1] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
        }

        7 => {
            nsurf = 1;
            pt[0] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
            pt[1] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
        }

        8 => {
            nsurf = 1;
            pt[0] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
            pt[1] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
        }

        9 => {
            nsurf = 1;
            pt[0] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
            pt[1] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
        }

        10 => {
            nsurf = 2;
            let ave = 0.25 * (v00 + v01 + v10 + v11);
            if ave > thresh {
                pt[0] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
                pt[1] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
                pt[2] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
                pt[3] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
            } else {
                pt[0] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
                pt[1] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
                pt[2] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
                pt[3] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
            }
        }

        11 => {
            nsurf = 1;
            pt[0] = Point3::new(interpolate(v10, v11, thresh, lo.x, hi.x), hi.y, 0.0);
            pt[1] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
        }

        12 => {
            nsurf = 1;
            pt[0] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
            pt[1] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
        }

        13 => {
            nsurf = 1;
            pt[0] = Point3::new(hi.x, interpolate(v01, v11, thresh, lo.y, hi.y), 0.0);
            pt[1] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
        }

        _ => {
            // case 14
            nsurf = 1;
            pt[0] = Point3::new(interpolate(v00, v01, thresh, lo.x, hi.x), lo.y, 0.0);
            pt[1] = Point3::new(lo.x, interpolate(v00, v10, thresh, lo.y, hi.y), 0.0);
        }
    }

    let segments = [[pt[0], pt[1]], [pt[2], pt[3]]];
    (segments, nsurf)
}
