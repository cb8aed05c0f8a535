//! Projecting stop coordinates onto route geometry.

use geo::{Coord, LineInterpolatePoint, LineLocatePoint, LineString, Point};
use tracing::debug;

use crate::models::types::*;
use crate::spatial::queries::haversine_distance;

/// Fraction (0..=1) of the curve's length at which `point` projects
pub fn locate(line: &LineString, point: Point) -> Result<f64> {
    line.line_locate_point(&point).ok_or_else(|| {
        SequenceError::InvalidData(format!(
            "cannot project ({}, {}) onto a degenerate geometry",
            point.x(),
            point.y()
        ))
    })
}

/// Snap each point to the position along `line` it projects onto.
///
/// Works by arc length: locate the point's fraction along the curve, then
/// interpolate the curve at that fraction. Large deviations are reported in
/// the logs but never rejected.
pub fn snap_points(line: &LineString, points: &[Point]) -> Result<Vec<Coord>> {
    let mut snapped = Vec::with_capacity(points.len());
    let mut max_deviation_m: f64 = 0.0;

    for point in points {
        let fraction = locate(line, *point)?;
        let on_line = line.line_interpolate_point(fraction).ok_or_else(|| {
            SequenceError::InvalidData(format!("cannot interpolate geometry at {}", fraction))
        })?;

        max_deviation_m = max_deviation_m.max(haversine_distance(*point, on_line));
        snapped.push(on_line.0);
    }

    debug!(stops = points.len(), max_deviation_m, "snapped stops to geometry");
    Ok(snapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{coord, line_string};

    #[test]
    fn test_snap_onto_straight_line() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let points = [Point::new(2.0, 1.0), Point::new(7.5, -3.0)];

        let snapped = snap_points(&line, &points).unwrap();

        assert_eq!(snapped.len(), 2);
        assert_abs_diff_eq!(snapped[0].x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(snapped[0].y, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(snapped[1].x, 7.5, epsilon = 1e-12);
    }

    #[test]
    fn test_snap_past_ends_clamps() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let points = [Point::new(-5.0, 0.0), Point::new(1.0, 4.0)];

        let snapped = snap_points(&line, &points).unwrap();

        assert_eq!(snapped[0], coord! { x: 0.0, y: 0.0 });
        assert_abs_diff_eq!(snapped[1].x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(snapped[1].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_locate_fraction() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)];
        assert_abs_diff_eq!(locate(&line, Point::new(1.0, 2.0)).unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_snap_preserves_order_and_count() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let points = [Point::new(9.0, 0.5), Point::new(1.0, 0.5), Point::new(5.0, 0.5)];

        let xs: Vec<f64> = snap_points(&line, &points).unwrap().iter().map(|c| c.x).collect();
        assert_abs_diff_eq!(xs[0], 9.0, epsilon = 1e-12);
        assert_abs_diff_eq!(xs[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(xs[2], 5.0, epsilon = 1e-12);
    }
}
