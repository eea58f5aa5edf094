//! Linear inversion along a cell edge.

/// Find the coordinate along an edge where the scalar field crosses `thresh`.
///
/// `v0` and `v1` are the sample values at the `lo` and `hi` ends of the edge.
/// The result is clamped to `[lo, hi]`; callers are allowed to invoke this on
/// an edge whose endpoints sit on the same side of the threshold, and the
/// clamp pins such degenerate crossings to the nearer endpoint.
///
/// # Arguments
/// * `v0` - Sample value at the `lo` end
/// * `v1` - Sample value at the `hi` end
/// * `thresh` - Threshold value to invert for
/// * `lo` - Coordinate of the edge's lower end
/// * `hi` - Coordinate of the edge's upper end
#[inline]
pub fn interpolate(v0: f64, v1: f64, thresh: f64, lo: f64, hi: f64) -> f64 {
    let value = lo + (hi - lo) * (thresh - v0) / (v1 - v0);
    let value = if value > lo { value } else { lo };
    if value < hi {
        value
    } else {
        hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_midpoint() {
        let x = interpolate(0.0, 255.0, 127.5, 2.0, 3.0);
        assert!((x - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_at_endpoints() {
        // Threshold equal to an endpoint value lands exactly on that endpoint.
        assert_eq!(interpolate(128.5, 255.0, 128.5, 2.0, 3.0), 2.0);
        assert_eq!(interpolate(0.0, 128.5, 128.5, 2.0, 3.0), 3.0);
    }

    #[test]
    fn test_interpolate_descending_values() {
        // Crossing works with v0 above and v1 below the threshold.
        let x = interpolate(255.0, 0.0, 127.5, 0.0, 1.0);
        assert!((x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_clamps() {
        // Both endpoints below the threshold: the raw inversion lands past
        // hi and is pinned there.
        let x = interpolate(10.0, 20.0, 128.5, 0.0, 1.0);
        assert_eq!(x, 1.0);

        // Both endpoints above: pinned to lo.
        let x = interpolate(200.0, 250.0, 128.5, 0.0, 1.0);
        assert_eq!(x, 0.0);
    }

    #[test]
    fn test_interpolate_stays_in_range() {
        let mut v = 0.0;
        while v < 256.0 {
            let x = interpolate(v, 255.0 - v, 128.5, 4.0, 5.0);
            assert!((4.0..=5.0).contains(&x));
            v += 17.0;
        }
    }
}
