//! Grouping trips that serve an identical ordered stop list.

use itertools::Itertools;

use crate::identifiers::*;

/// Trips sharing one stop order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripGroup {
    pub stop_ids: Vec<StopIdentifier>,
    pub trip_ids: Vec<TripIdentifier>,
}

/// Group trips by their exact stop order.
///
/// Groups come out in the order their first trip was seen, and trips keep
/// their input order within a group.
pub fn group_trips_by_stop_order<I>(trips: I) -> Vec<TripGroup>
where
    I: IntoIterator<Item = (TripIdentifier, Vec<StopIdentifier>)>,
{
    trips
        .into_iter()
        .enumerate()
        .map(|(position, (trip_id, stop_ids))| (stop_ids, (position, trip_id)))
        .into_group_map()
        .into_iter()
        .sorted_by_key(|(_, members)| members.first().map(|(position, _)| *position))
        .map(|(stop_ids, members)| TripGroup {
            stop_ids,
            trip_ids: members.into_iter().map(|(_, trip_id)| trip_id).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(ids: &[u64]) -> Vec<StopIdentifier> {
        ids.iter().copied().map(StopIdentifier).collect()
    }

    #[test]
    fn test_groups_identical_stop_orders() {
        let groups = group_trips_by_stop_order([
            (TripIdentifier::new("a"), stops(&[1, 2, 3])),
            (TripIdentifier::new("b"), stops(&[3, 2, 1])),
            (TripIdentifier::new("c"), stops(&[1, 2, 3])),
            (TripIdentifier::new("d"), stops(&[1, 3])),
        ]);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].stop_ids, stops(&[1, 2, 3]));
        assert_eq!(groups[0].trip_ids, vec![TripIdentifier::new("a"), TripIdentifier::new("c")]);
        assert_eq!(groups[1].stop_ids, stops(&[3, 2, 1]));
        assert_eq!(groups[2].trip_ids, vec![TripIdentifier::new("d")]);
    }

    #[test]
    fn test_order_matters() {
        let groups = group_trips_by_stop_order([
            (TripIdentifier::new("a"), stops(&[1, 2])),
            (TripIdentifier::new("b"), stops(&[2, 1])),
        ]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_no_trips() {
        assert!(group_trips_by_stop_order(Vec::new()).is_empty());
    }
}
