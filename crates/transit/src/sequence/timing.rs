//! Inter-stop distances, durations and speeds.
//!
//! Pure functions over explicit values; [`Sequence`](super::Sequence) stores
//! their results.

use chrono::NaiveDateTime;
use geo::Coord;
use tracing::warn;

use crate::config::ZeroDurationPolicy;
use crate::identifiers::TripIdentifier;
use crate::models::types::*;
use crate::spatial::queries::DistanceModel;

/// Cumulative distance (meters) to each snapped stop.
///
/// Starts at 0 and adds the straight-line distance between consecutive stops.
pub fn stop_distances(snapped: &[Coord], model: &dyn DistanceModel) -> Vec<f64> {
    let mut distances = Vec::with_capacity(snapped.len());
    let mut total = 0.0;
    for (i, coord) in snapped.iter().enumerate() {
        if i > 0 {
            total += model.distance_m(snapped[i - 1], *coord);
        }
        distances.push(total);
    }
    distances
}

/// Seconds between consecutive arrivals, 0 for the first stop
pub fn trip_durations(times: &[NaiveDateTime]) -> Vec<f64> {
    let mut durations = Vec::with_capacity(times.len());
    for (i, time) in times.iter().enumerate() {
        if i == 0 {
            durations.push(0.0);
        } else {
            durations.push((*time - times[i - 1]).num_milliseconds() as f64 / 1000.0);
        }
    }
    durations
}

/// Speed (m/s) into each stop: cumulative distance over the duration of the
/// last hop. The first stop is always 0.
///
/// Non-positive durations are handled by `policy`.
pub fn trip_speeds(
    trip_id: &TripIdentifier,
    distances: &[f64],
    durations: &[f64],
    policy: ZeroDurationPolicy,
) -> Result<Vec<f64>> {
    if distances.len() != durations.len() {
        return Err(SequenceError::InvalidData(format!(
            "trip {} has {} durations for {} stops",
            trip_id,
            durations.len(),
            distances.len()
        )));
    }

    let mut speeds = Vec::with_capacity(distances.len());
    for (i, (distance, duration)) in distances.iter().zip(durations).enumerate() {
        if i == 0 {
            speeds.push(0.0);
        } else if *duration > 0.0 {
            speeds.push(distance / duration);
        } else {
            match policy {
                ZeroDurationPolicy::Zero => {
                    warn!(%trip_id, stop_index = i, duration, "non-positive duration, speed set to 0");
                    speeds.push(0.0);
                }
                ZeroDurationPolicy::Error => {
                    return Err(SequenceError::ZeroDuration {
                        trip_id: trip_id.clone(),
                        stop_index: i,
                    });
                }
            }
        }
    }
    Ok(speeds)
}

/// Mean speed at each stop index across trips
pub fn aggregate_speeds<'a, I>(trip_speeds: I, stop_count: usize) -> Result<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sums = vec![0.0; stop_count];
    let mut trips = 0usize;

    for speeds in trip_speeds {
        if speeds.len() != stop_count {
            return Err(SequenceError::InvalidData(format!(
                "speed list of length {} for {} stops",
                speeds.len(),
                stop_count
            )));
        }
        for (sum, speed) in sums.iter_mut().zip(speeds) {
            *sum += speed;
        }
        trips += 1;
    }

    if trips == 0 {
        return Err(SequenceError::Precondition {
            step: "aggregate speeds",
            requires: "trip speed calculation",
        });
    }

    Ok(sums.into_iter().map(|sum| sum / trips as f64).collect())
}
