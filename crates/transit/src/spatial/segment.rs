//! Cutting route geometry at along-curve distances.
//!
//! All distances passed to [`cut`] are in the curve's own units (degrees for
//! geographic geometry). [`segment_by_distances`] takes meters and converts
//! them through a [`DistanceModel`].

use geo::{Coord, EuclideanLength, Line, LineString};

use crate::models::types::*;
use crate::spatial::queries::DistanceModel;

/// Remainders shorter than this (in meters) count as fully consumed
pub const SEGMENT_TOLERANCE_M: f64 = 1e-3;

/// A sub-curve with values attached to its start and end points
#[derive(Clone, Debug, PartialEq)]
pub struct ValuedSegment {
    pub geometry: LineString,
    pub start_value: f64,
    pub end_value: f64,
}

/// Distance from the start of the curve to each vertex.
///
/// `cut` walks the same sums, so the last entry is the exact length it
/// compares against.
pub fn cumulative_lengths(line: &LineString) -> Vec<f64> {
    let mut travelled = 0.0;
    let mut lengths = Vec::with_capacity(line.0.len());
    for (i, coord) in line.0.iter().enumerate() {
        if i > 0 {
            travelled += Line::new(line.0[i - 1], *coord).euclidean_length();
        }
        lengths.push(travelled);
    }
    lengths
}

/// Split `line` at `distance` from its start.
///
/// Returns the unchanged curve as a single element when the distance does not
/// fall strictly inside it, otherwise `[before, after]` sharing the split
/// point.
pub fn cut(line: &LineString, distance: f64) -> Result<Vec<LineString>> {
    let lengths = cumulative_lengths(line);
    let length = lengths.last().copied().unwrap_or(0.0);

    if distance <= 0.0 || distance >= length {
        return Ok(vec![line.clone()]);
    }

    let coords = &line.0;
    for (i, &travelled) in lengths.iter().enumerate() {
        if travelled == distance {
            return Ok(vec![
                LineString::new(coords[..=i].to_vec()),
                LineString::new(coords[i..].to_vec()),
            ]);
        }

        if travelled > distance {
            // i > 0 here: lengths[0] is 0 and distance is positive
            let split = interpolate(coords[i - 1], coords[i], distance - lengths[i - 1], travelled - lengths[i - 1]);

            let mut before = coords[..i].to_vec();
            before.push(split);
            let mut after = vec![split];
            after.extend_from_slice(&coords[i..]);

            return Ok(vec![LineString::new(before), LineString::new(after)]);
        }
    }

    // Only reachable with a non-finite distance
    Err(SequenceError::UnreachableDistance { distance, length })
}

fn interpolate(start: Coord, end: Coord, along: f64, segment_length: f64) -> Coord {
    let t = along / segment_length;
    Coord {
        x: start.x + (end.x - start.x) * t,
        y: start.y + (end.y - start.y) * t,
    }
}

/// Split `line` at a series of cumulative offsets (meters) and attach
/// consecutive `values` to each piece.
///
/// `values` must line up with `distances`. Piece `i` spans
/// `distances[i - 1]..distances[i]` and carries `(values[i - 1], values[i])`.
/// Whatever is left of the curve past the last offset becomes a final piece
/// carrying the last value at both ends; it is omitted when the offsets
/// already consume the whole curve. Offsets that do not advance (two stops at
/// the same position) produce no piece, and an offset past the end of the
/// curve is an [`SequenceError::UnreachableDistance`] error.
pub fn segment_by_distances(
    line: &LineString,
    distances: &[f64],
    values: &[f64],
    model: &dyn DistanceModel,
) -> Result<Vec<ValuedSegment>> {
    if values.len() != distances.len() {
        return Err(SequenceError::ConfigurationMismatch {
            values: values.len(),
            distances: distances.len(),
        });
    }
    let Some(&last_value) = values.last() else {
        return Err(SequenceError::MissingInput(
            "segmentation needs at least one distance".into(),
        ));
    };

    let mut segments = Vec::with_capacity(distances.len());
    let mut remaining = Some(line.clone());

    for i in 1..distances.len() {
        let step = model.meters_to_degrees(distances[i] - distances[i - 1]);
        if step <= 0.0 {
            continue;
        }

        let Some(current) = remaining.take() else {
            // the curve is used up; only float noise may follow
            if model.degrees_to_meters(step) <= SEGMENT_TOLERANCE_M {
                continue;
            }
            return Err(SequenceError::UnreachableDistance {
                distance: distances[i],
                length: model.degrees_to_meters(line.euclidean_length()),
            });
        };
        let current_length = current.euclidean_length();
        let overshoot = model.degrees_to_meters(step - current_length);

        if overshoot > SEGMENT_TOLERANCE_M {
            return Err(SequenceError::UnreachableDistance {
                distance: distances[i],
                length: model.degrees_to_meters(line.euclidean_length()),
            });
        }

        if overshoot >= -SEGMENT_TOLERANCE_M {
            segments.push(ValuedSegment {
                geometry: current,
                start_value: values[i - 1],
                end_value: values[i],
            });
            continue;
        }

        let mut pieces = cut(&current, step)?.into_iter();
        let (Some(before), Some(after)) = (pieces.next(), pieces.next()) else {
            return Err(SequenceError::UnreachableDistance {
                distance: step,
                length: current_length,
            });
        };

        segments.push(ValuedSegment {
            geometry: before,
            start_value: values[i - 1],
            end_value: values[i],
        });
        remaining = Some(after);
    }

    if let Some(rest) = remaining {
        segments.push(ValuedSegment {
            geometry: rest,
            start_value: last_value,
            end_value: last_value,
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::queries::FixedScale;
    use approx::assert_relative_eq;
    use geo::{coord, line_string};

    fn length(line: &LineString) -> f64 {
        line.euclidean_length()
    }

    /// Joins pieces that share their boundary point back into one path
    fn rejoin(pieces: &[LineString]) -> Vec<Coord> {
        let mut coords: Vec<Coord> = Vec::new();
        for piece in pieces {
            let skip = usize::from(!coords.is_empty());
            coords.extend(piece.0.iter().skip(skip));
        }
        coords
    }

    #[test]
    fn test_cut_outside_range_returns_curve() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0)];

        assert_eq!(cut(&line, 0.0).unwrap(), vec![line.clone()]);
        assert_eq!(cut(&line, -1.0).unwrap(), vec![line.clone()]);
        assert_eq!(cut(&line, 2.0).unwrap(), vec![line.clone()]);
        assert_eq!(cut(&line, 5.0).unwrap(), vec![line.clone()]);
    }

    #[test]
    fn test_cut_at_vertex() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let pieces = cut(&line, 1.0).unwrap();

        assert_eq!(pieces[0], line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]);
        assert_eq!(pieces[1], line_string![(x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]);
    }

    #[test]
    fn test_cut_between_vertices() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let pieces = cut(&line, 1.25).unwrap();

        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].0.last(), Some(&coord! { x: 1.0, y: 0.25 }));
        assert_eq!(pieces[1].0.first(), Some(&coord! { x: 1.0, y: 0.25 }));
        assert_relative_eq!(length(&pieces[0]), 1.25, epsilon = 1e-12);
        assert_relative_eq!(length(&pieces[0]) + length(&pieces[1]), length(&line), epsilon = 1e-12);
    }

    #[test]
    fn test_cut_pieces_reconstruct_path() {
        let line = line_string![
            (x: -73.99, y: 40.73),
            (x: -73.985, y: 40.735),
            (x: -73.98, y: 40.737),
            (x: -73.97, y: 40.745),
        ];
        let pieces = cut(&line, length(&line) * 0.4).unwrap();

        let mut expected: Vec<Coord> = line.0.clone();
        expected.insert(2, pieces[0].0[pieces[0].0.len() - 1]);
        assert_eq!(rejoin(&pieces), expected);
        assert_relative_eq!(length(&pieces[0]) + length(&pieces[1]), length(&line), epsilon = 1e-12);
    }

    #[test]
    fn test_cut_nan_distance_is_unreachable() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0)];
        let err = cut(&line, f64::NAN).unwrap_err();
        assert!(matches!(err, SequenceError::UnreachableDistance { .. }));
    }

    #[test]
    fn test_segment_exact_length_curve() {
        let model = FixedScale::default();
        let line = LineString::new(vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: model.meters_to_degrees(300.0), y: 0.0 },
        ]);

        let segments = segment_by_distances(&line, &[0.0, 100.0, 300.0], &[5.0, 7.0, 9.0], &model).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!((segments[0].start_value, segments[0].end_value), (5.0, 7.0));
        assert_eq!((segments[1].start_value, segments[1].end_value), (7.0, 9.0));
        assert_relative_eq!(model.degrees_to_meters(length(&segments[0].geometry)), 100.0, epsilon = 1e-6);
        assert_relative_eq!(model.degrees_to_meters(length(&segments[1].geometry)), 200.0, epsilon = 1e-6);

        let pieces: Vec<LineString> = segments.into_iter().map(|s| s.geometry).collect();
        let rejoined = rejoin(&pieces);
        assert_eq!(rejoined.first(), line.0.first());
        assert_eq!(rejoined.last(), line.0.last());
    }

    #[test]
    fn test_segment_longer_curve_keeps_remainder() {
        let model = FixedScale::default();
        let line = LineString::new(vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: model.meters_to_degrees(250.0), y: 0.0 },
            coord! { x: model.meters_to_degrees(250.0), y: model.meters_to_degrees(250.0) },
        ]);

        let segments = segment_by_distances(&line, &[0.0, 100.0, 300.0], &[5.0, 7.0, 9.0], &model).unwrap();

        let pairs: Vec<(f64, f64)> = segments.iter().map(|s| (s.start_value, s.end_value)).collect();
        assert_eq!(pairs, vec![(5.0, 7.0), (7.0, 9.0), (9.0, 9.0)]);

        let total: f64 = segments.iter().map(|s| length(&s.geometry)).sum();
        assert_relative_eq!(total, length(&line), epsilon = 1e-12);
        assert_relative_eq!(model.degrees_to_meters(length(&segments[2].geometry)), 200.0, epsilon = 1e-6);
    }

    #[test]
    fn test_segment_skips_repeated_offsets() {
        let model = FixedScale::new(1.0);
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];

        let segments = segment_by_distances(&line, &[0.0, 4.0, 4.0, 10.0], &[1.0, 2.0, 3.0, 4.0], &model).unwrap();

        let pairs: Vec<(f64, f64)> = segments.iter().map(|s| (s.start_value, s.end_value)).collect();
        assert_eq!(pairs, vec![(1.0, 2.0), (3.0, 4.0)]);
    }

    #[test]
    fn test_segment_offset_past_curve_end() {
        let model = FixedScale::new(1.0);
        let line = line_string![(x: 0.0, y: 0.0), (x: 150.0, y: 0.0)];

        let err = segment_by_distances(&line, &[0.0, 100.0, 200.0, 300.0], &[1.0, 2.0, 3.0, 4.0], &model)
            .unwrap_err();
        assert!(matches!(err, SequenceError::UnreachableDistance { distance, .. } if distance == 200.0));
    }

    #[test]
    fn test_segment_absorbs_sub_millimetre_overshoot() {
        let model = FixedScale::new(1.0);
        let line = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];

        let segments = segment_by_distances(&line, &[0.0, 4.0, 10.0005, 10.0008], &[1.0, 2.0, 3.0, 4.0], &model)
            .unwrap();

        let pairs: Vec<(f64, f64)> = segments.iter().map(|s| (s.start_value, s.end_value)).collect();
        assert_eq!(pairs, vec![(1.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn test_segment_value_mismatch() {
        let model = FixedScale::default();
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];

        let err = segment_by_distances(&line, &[0.0, 100.0], &[1.0], &model).unwrap_err();
        assert!(matches!(err, SequenceError::ConfigurationMismatch { values: 1, distances: 2 }));
    }

    #[test]
    fn test_segment_needs_distances() {
        let model = FixedScale::default();
        let line = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)];

        let err = segment_by_distances(&line, &[], &[], &model).unwrap_err();
        assert!(matches!(err, SequenceError::MissingInput(_)));
    }
}
