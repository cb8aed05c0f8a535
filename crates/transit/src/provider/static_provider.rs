//! In-memory schedule tables and batch sequence building.
//!
//! Holds the read-only inputs every sequence draws on: trip attributes, stop
//! locations, candidate geometries and per-trip arrival times. Parsing feed
//! files into these tables is the caller's job.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use geo::{LineString, Point};
use tracing::{debug, warn};

use crate::config::SequenceConfig;
use crate::identifiers::*;
use crate::models::{traits::*, types::*};
use crate::sequence::{group_trips_by_stop_order, PipelineOutcome, Sequence, SequencePipeline};
use crate::spatial::index::GeometryIndex;

/// One scheduled arrival of a trip at a stop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopArrival {
    pub stop_id: StopIdentifier,
    pub arrival: NaiveDateTime,
}

/// A processed sequence and how far its pipeline got
#[derive(Clone, Debug)]
pub struct ProcessedSequence {
    pub sequence: Sequence,
    pub outcome: PipelineOutcome,
}

/// In-memory input tables
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone, Default)]
pub struct StaticScheduleTables {
    trips: Arc<HashMap<TripIdentifier, TripRecord>>,
    stops: Arc<HashMap<StopIdentifier, Point>>,
    geometries: Arc<GeometryIndex>,
    arrivals: Arc<HashMap<TripIdentifier, Vec<StopArrival>>>,
}

impl StaticScheduleTables {
    /// Create an empty set of tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Build tables from raw rows.
    ///
    /// `geometries` are keyed by route-direction; `arrivals` must already be
    /// in stop order for each trip.
    pub fn from_data(
        trips: impl IntoIterator<Item = (TripIdentifier, TripRecord)>,
        stops: impl IntoIterator<Item = (StopIdentifier, Point)>,
        geometries: impl IntoIterator<Item = (String, LineString)>,
        arrivals: impl IntoIterator<Item = (TripIdentifier, Vec<StopArrival>)>,
    ) -> Self {
        Self {
            trips: Arc::new(trips.into_iter().collect()),
            stops: Arc::new(stops.into_iter().collect()),
            geometries: Arc::new(geometries.into_iter().collect()),
            arrivals: Arc::new(arrivals.into_iter().collect()),
        }
    }

    pub fn geometries(&self) -> &GeometryIndex {
        &self.geometries
    }

    pub fn arrivals(&self, trip_id: &TripIdentifier) -> Option<&[StopArrival]> {
        self.arrivals.get(trip_id).map(Vec::as_slice)
    }

    /// Construct one sequence per distinct stop order, with arrival times
    /// attached, but unprocessed.
    ///
    /// Trips are visited in id order so the output order is stable.
    pub fn sequences(&self) -> Vec<Result<Sequence>> {
        let mut trip_ids: Vec<&TripIdentifier> = self.arrivals.keys().collect();
        trip_ids.sort();

        let groups = group_trips_by_stop_order(trip_ids.into_iter().map(|trip_id| {
            let stop_ids = self.arrivals[trip_id].iter().map(|a| a.stop_id).collect();
            (trip_id.clone(), stop_ids)
        }));
        debug!(groups = groups.len(), trips = self.arrivals.len(), "grouped trips by stop order");

        groups
            .into_iter()
            .map(|group| {
                let mut sequence = Sequence::from_trips(group.stop_ids, group.trip_ids, self)?;
                for trip_id in sequence.trip_ids().to_vec() {
                    let times = self.arrivals[&trip_id].iter().map(|a| a.arrival).collect();
                    sequence.attach_trip_times(&trip_id, times)?;
                }
                Ok(sequence)
            })
            .collect()
    }

    /// Construct and fully process every sequence.
    ///
    /// Each sequence succeeds or fails on its own; one bad group does not
    /// abort the rest.
    pub fn build_sequences(&self, config: &SequenceConfig) -> Vec<Result<ProcessedSequence>> {
        let pipeline = SequencePipeline::new(&self.geometries, self, config);

        self.sequences()
            .into_iter()
            .map(|sequence| {
                let mut sequence = sequence?;
                let outcome = pipeline.run(&mut sequence).inspect_err(|err| {
                    warn!(key = %sequence.route_dir_key(), %err, "sequence processing failed");
                })?;
                Ok(ProcessedSequence { sequence, outcome })
            })
            .collect()
    }
}

impl TripTable for StaticScheduleTables {
    fn trip(&self, id: &TripIdentifier) -> Option<&TripRecord> {
        self.trips.get(id)
    }
}

impl StopTable for StaticScheduleTables {
    fn location(&self, id: StopIdentifier) -> Option<Point> {
        self.stops.get(&id).copied()
    }
}
