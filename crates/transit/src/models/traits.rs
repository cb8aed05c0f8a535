//! Read-only input tables consumed by sequence processing.
//!
//! Loading these from feed files is left to the caller; anything keyed by the
//! right identifier can serve as a table. Plain `HashMap`s implement them.

use std::collections::HashMap;

use geo::Point;

use crate::identifiers::*;
use crate::models::types::*;

/// Per-trip attribute table (direction, route, service, headsign, shape)
pub trait TripTable: Send + Sync {
    fn trip(&self, id: &TripIdentifier) -> Option<&TripRecord>;

    /// Like [`TripTable::trip`], but a missing row is an error
    fn require_trip(&self, id: &TripIdentifier) -> Result<&TripRecord> {
        self.trip(id)
            .ok_or_else(|| SequenceError::TripNotFound(id.clone()))
    }
}

/// Per-stop location table, (longitude, latitude) points
pub trait StopTable: Send + Sync {
    fn location(&self, id: StopIdentifier) -> Option<Point>;

    /// Locations for an ordered list of stops, failing on the first unknown stop
    fn locations(&self, ids: &[StopIdentifier]) -> Result<Vec<Point>> {
        ids.iter()
            .map(|id| self.location(*id).ok_or(SequenceError::StopNotFound(*id)))
            .collect()
    }
}

impl TripTable for HashMap<TripIdentifier, TripRecord> {
    fn trip(&self, id: &TripIdentifier) -> Option<&TripRecord> {
        self.get(id)
    }
}

impl StopTable for HashMap<StopIdentifier, Point> {
    fn location(&self, id: StopIdentifier) -> Option<Point> {
        self.get(&id).copied()
    }
}
