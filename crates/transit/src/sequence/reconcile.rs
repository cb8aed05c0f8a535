//! Majority-vote reconciliation of trip attributes.
//!
//! Feeds mislabel individual trips, so a sequence takes each attribute from
//! the value most of its trips agree on.

use std::collections::HashMap;
use std::hash::Hash;

use crate::identifiers::TripIdentifier;
use crate::models::traits::TripTable;
use crate::models::types::*;

/// The most frequent value.
///
/// On a tie the winner is the first value to reach the maximum count while
/// iterating in order. This is not first-seen order: `[a, b, b, a]` yields
/// `b`, although `a` appears first. Returns `None` for an empty input.
pub fn most_common<T, I>(values: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut best: Option<(T, usize)> = None;

    for value in values {
        let count = counts.entry(value.clone()).or_insert(0);
        *count += 1;

        if best.as_ref().map_or(true, |(_, top)| *count > *top) {
            best = Some((value, *count));
        }
    }

    best.map(|(value, _)| value)
}

/// Majority value of one attribute across `trip_ids`
pub fn reconcile_attribute<T, F>(
    trip_ids: &[TripIdentifier],
    trips: &dyn TripTable,
    attribute: F,
) -> Result<T>
where
    T: Eq + Hash + Clone,
    F: Fn(&TripRecord) -> T,
{
    let values = trip_ids
        .iter()
        .map(|id| trips.require_trip(id).map(&attribute))
        .collect::<Result<Vec<T>>>()?;

    most_common(values)
        .ok_or_else(|| SequenceError::MissingInput("cannot reconcile attributes of zero trips".into()))
}

/// Settle every sequence attribute independently
pub fn reconcile(trip_ids: &[TripIdentifier], trips: &dyn TripTable) -> Result<SequenceAttributes> {
    Ok(SequenceAttributes {
        direction_id: reconcile_attribute(trip_ids, trips, |t| t.direction_id)?,
        route_id: reconcile_attribute(trip_ids, trips, |t| t.route_id.clone())?,
        service_id: reconcile_attribute(trip_ids, trips, |t| t.service_id.clone())?,
        trip_headsign: reconcile_attribute(trip_ids, trips, |t| t.trip_headsign.clone())?,
        shape_id: reconcile_attribute(trip_ids, trips, |t| t.shape_id.clone())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::*;

    fn record(route: &str, direction: DirectionId, headsign: &str) -> TripRecord {
        TripRecord {
            direction_id: direction,
            route_id: RouteIdentifier::new(route),
            service_id: ServiceIdentifier::new("WKD"),
            trip_headsign: headsign.into(),
            shape_id: ShapeIdentifier::new(format!("{}_shape", route)),
        }
    }

    #[test]
    fn test_most_common_strict_majority() {
        assert_eq!(most_common(["a", "b", "b", "c", "b"]), Some("b"));
        assert_eq!(most_common([3, 1, 3]), Some(3));
    }

    #[test]
    fn test_most_common_tie_is_first_to_reach_max() {
        // a and b both reach 2, b gets there first
        assert_eq!(most_common(["a", "b", "b", "a"]), Some("b"));
        assert_eq!(most_common(["x", "y"]), Some("x"));
    }

    #[test]
    fn test_most_common_empty() {
        assert_eq!(most_common(Vec::<u8>::new()), None);
    }

    #[test]
    fn test_reconcile_corrects_mislabelled_trip() {
        let trips = HashMap::from([
            (TripIdentifier::new("t1"), record("M15", DirectionId::Outbound, "South Ferry")),
            (TripIdentifier::new("t2"), record("M15", DirectionId::Outbound, "South Ferry")),
            (TripIdentifier::new("t3"), record("M15-SBS", DirectionId::Inbound, "East Harlem")),
        ]);
        let ids = ["t1", "t2", "t3"].map(TripIdentifier::new);

        let attributes = reconcile(&ids, &trips).unwrap();

        assert_eq!(attributes.route_id, RouteIdentifier::new("M15"));
        assert_eq!(attributes.direction_id, DirectionId::Outbound);
        assert_eq!(&*attributes.trip_headsign, "South Ferry");
        assert_eq!(attributes.shape_id, ShapeIdentifier::new("M15_shape"));
    }

    #[test]
    fn test_reconcile_without_trips_fails() {
        let trips: HashMap<TripIdentifier, TripRecord> = HashMap::new();
        let err = reconcile(&[], &trips).unwrap_err();
        assert!(matches!(err, SequenceError::MissingInput(_)));
    }

    #[test]
    fn test_reconcile_unknown_trip_fails() {
        let trips = HashMap::from([(
            TripIdentifier::new("t1"),
            record("M15", DirectionId::Outbound, "South Ferry"),
        )]);
        let ids = ["t1", "t9"].map(TripIdentifier::new);

        let err = reconcile(&ids, &trips).unwrap_err();
        assert!(matches!(err, SequenceError::TripNotFound(id) if id.as_str() == "t9"));
    }
}
