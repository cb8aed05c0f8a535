//! The stop sequence aggregate.
//!
//! A [`Sequence`] is one canonical ordered stop list shared by a group of
//! trips. It carries the attributes those trips agree on and, once processed,
//! the route geometry, snapped stops, distances and speeds derived from them.
//!
//! Processing steps run in a fixed order:
//!
//! 1. [`Sequence::assign_geometry`]
//! 2. [`Sequence::trim_geometry`]
//! 3. [`Sequence::snap_stops`]
//! 4. [`Sequence::calculate_stop_distances`]
//! 5. [`Sequence::calculate_trip_durations`]
//! 6. [`Sequence::calculate_trip_speeds`]
//! 7. [`Sequence::aggregate_speeds`]
//!
//! Calling a step before the one it depends on is a
//! [`SequenceError::Precondition`]. Every step computes its result before
//! touching the sequence, so a failed step leaves the previous state intact.

pub mod grouping;
pub mod persisted;
pub mod pipeline;
pub mod reconcile;
pub mod timing;

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use geo::{Coord, LineString};
use itertools::Itertools;
use tracing::debug;

use crate::config::ZeroDurationPolicy;
use crate::identifiers::*;
use crate::models::traits::{StopTable, TripTable};
use crate::models::types::*;
use crate::spatial::index::{route_dir_key, GeometryIndex};
use crate::spatial::queries::DistanceModel;
use crate::spatial::segment::{cumulative_lengths, cut, segment_by_distances};
use crate::spatial::snap::{locate, snap_points};

pub use grouping::{group_trips_by_stop_order, TripGroup};
pub use persisted::{PersistedSequence, SchemaVersion};
pub use pipeline::{PipelineOutcome, SequencePipeline};

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    stop_ids: Vec<StopIdentifier>,
    trip_ids: Vec<TripIdentifier>,
    trip_set: HashSet<TripIdentifier>,
    attributes: SequenceAttributes,

    // Derived, filled in pipeline order
    geometry: Option<LineString>,
    stop_coords: Option<Vec<Coord>>,
    stop_distances: Option<Vec<f64>>,
    trip_times: BTreeMap<TripIdentifier, Vec<NaiveDateTime>>,
    trip_durations: BTreeMap<TripIdentifier, Vec<f64>>,
    trip_speeds: BTreeMap<TripIdentifier, Vec<f64>>,
    stop_speeds: Option<Vec<f64>>,
}

impl Sequence {
    /// Build a sequence from trips sharing `stop_ids`, labelling it by
    /// majority vote over their rows in `trips`.
    ///
    /// Repeated trip ids are kept once.
    pub fn from_trips(
        stop_ids: Vec<StopIdentifier>,
        trip_ids: Vec<TripIdentifier>,
        trips: &dyn TripTable,
    ) -> Result<Self> {
        if stop_ids.is_empty() {
            return Err(SequenceError::MissingInput("a sequence needs at least one stop".into()));
        }
        let trip_ids: Vec<TripIdentifier> = trip_ids.into_iter().unique().collect();
        let attributes = reconcile::reconcile(&trip_ids, trips)?;

        Ok(Self::with_attributes(stop_ids, trip_ids, attributes))
    }

    fn with_attributes(
        stop_ids: Vec<StopIdentifier>,
        trip_ids: Vec<TripIdentifier>,
        attributes: SequenceAttributes,
    ) -> Self {
        let trip_set = trip_ids.iter().cloned().collect();
        Self {
            stop_ids,
            trip_ids,
            trip_set,
            attributes,
            geometry: None,
            stop_coords: None,
            stop_distances: None,
            trip_times: BTreeMap::new(),
            trip_durations: BTreeMap::new(),
            trip_speeds: BTreeMap::new(),
            stop_speeds: None,
        }
    }

    // ---- Accessors ----

    pub fn stop_ids(&self) -> &[StopIdentifier] {
        &self.stop_ids
    }

    pub fn trip_ids(&self) -> &[TripIdentifier] {
        &self.trip_ids
    }

    pub fn attributes(&self) -> &SequenceAttributes {
        &self.attributes
    }

    pub fn route_id(&self) -> &RouteIdentifier {
        &self.attributes.route_id
    }

    pub fn direction_id(&self) -> DirectionId {
        self.attributes.direction_id
    }

    pub fn geometry(&self) -> Option<&LineString> {
        self.geometry.as_ref()
    }

    pub fn stop_coords(&self) -> Option<&[Coord]> {
        self.stop_coords.as_deref()
    }

    pub fn stop_distances(&self) -> Option<&[f64]> {
        self.stop_distances.as_deref()
    }

    pub fn trip_times(&self) -> &BTreeMap<TripIdentifier, Vec<NaiveDateTime>> {
        &self.trip_times
    }

    pub fn trip_durations(&self) -> &BTreeMap<TripIdentifier, Vec<f64>> {
        &self.trip_durations
    }

    pub fn trip_speeds(&self) -> &BTreeMap<TripIdentifier, Vec<f64>> {
        &self.trip_speeds
    }

    /// Mean speed at each stop across trips
    pub fn stop_speeds(&self) -> Option<&[f64]> {
        self.stop_speeds.as_deref()
    }

    /// Key used to look up this sequence's geometry
    pub fn route_dir_key(&self) -> String {
        route_dir_key(&self.attributes.route_id, self.attributes.direction_id)
    }

    pub fn has_trip(&self, trip_id: &TripIdentifier) -> bool {
        self.trip_set.contains(trip_id)
    }

    // ---- Pipeline ----

    /// Look up and assign this sequence's geometry.
    ///
    /// Returns whether a geometry was found; no candidate leaves the sequence
    /// untouched. Replacing the geometry discards anything derived from the
    /// previous one.
    pub fn assign_geometry(&mut self, geometries: &GeometryIndex) -> Result<bool> {
        let key = self.route_dir_key();
        let Some(geometry) = geometries.match_key(&key)? else {
            return Ok(false);
        };

        debug!(key = %key, vertices = geometry.0.len(), "assigned geometry");
        self.geometry = Some(geometry.clone());
        self.clear_snapped();
        Ok(true)
    }

    /// Cut the geometry down to the stretch between the first and last stop.
    ///
    /// The tail past the last stop's projected position goes first, then the
    /// head before the first stop's position on what remains.
    pub fn trim_geometry(&mut self, stops: &dyn StopTable) -> Result<()> {
        let geometry = self.require_geometry("trim geometry")?;
        let (Some(first), Some(last)) = (self.stop_ids.first(), self.stop_ids.last()) else {
            return Err(SequenceError::MissingInput("a sequence needs at least one stop".into()));
        };
        let first = stops.location(*first).ok_or(SequenceError::StopNotFound(*first))?;
        let last = stops.location(*last).ok_or(SequenceError::StopNotFound(*last))?;

        let end = locate(geometry, last)? * curve_length(geometry);
        let head = cut(geometry, end)?.swap_remove(0);

        let start = locate(&head, first)? * curve_length(&head);
        let trimmed = cut(&head, start)?.pop().unwrap_or(head);

        self.geometry = Some(trimmed);
        self.clear_snapped();
        Ok(())
    }

    /// Snap every stop onto the assigned geometry
    pub fn snap_stops(&mut self, stops: &dyn StopTable) -> Result<()> {
        let geometry = self.require_geometry("snap stops")?;
        let raw = stops.locations(&self.stop_ids)?;
        let snapped = snap_points(geometry, &raw)?;

        self.clear_snapped();
        self.stop_coords = Some(snapped);
        Ok(())
    }

    /// Attach the arrival times of one member trip, one per stop.
    ///
    /// Replaces any times already attached for the trip and discards the
    /// durations and speeds derived from them.
    pub fn attach_trip_times(&mut self, trip_id: &TripIdentifier, times: Vec<NaiveDateTime>) -> Result<()> {
        if !self.has_trip(trip_id) {
            return Err(SequenceError::TripNotFound(trip_id.clone()));
        }
        if times.len() != self.stop_ids.len() {
            return Err(SequenceError::InvalidData(format!(
                "trip {} has {} arrival times for {} stops",
                trip_id,
                times.len(),
                self.stop_ids.len()
            )));
        }

        self.trip_times.insert(trip_id.clone(), times);
        self.trip_durations.remove(trip_id);
        self.trip_speeds.remove(trip_id);
        self.stop_speeds = None;
        Ok(())
    }

    pub fn calculate_stop_distances(&mut self, model: &dyn DistanceModel) -> Result<()> {
        let distances = self.compute_stop_distances(model)?;
        self.stop_distances = Some(distances);
        self.trip_speeds.clear();
        self.stop_speeds = None;
        Ok(())
    }

    pub fn calculate_trip_durations(&mut self) -> Result<()> {
        let durations = self.compute_trip_durations()?;
        self.trip_durations = durations;
        self.trip_speeds.clear();
        self.stop_speeds = None;
        Ok(())
    }

    /// Speeds for every trip with arrival times.
    ///
    /// Distances and durations are calculated first if they are missing.
    pub fn calculate_trip_speeds(
        &mut self,
        model: &dyn DistanceModel,
        policy: ZeroDurationPolicy,
    ) -> Result<()> {
        let distances = match &self.stop_distances {
            Some(distances) => distances.clone(),
            None => self.compute_stop_distances(model)?,
        };
        let durations = if self.durations_complete() {
            self.trip_durations.clone()
        } else {
            self.compute_trip_durations()?
        };

        let speeds = durations
            .iter()
            .map(|(trip_id, trip_durations)| {
                timing::trip_speeds(trip_id, &distances, trip_durations, policy)
                    .map(|speeds| (trip_id.clone(), speeds))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        self.stop_distances = Some(distances);
        self.trip_durations = durations;
        self.trip_speeds = speeds;
        self.stop_speeds = None;
        Ok(())
    }

    pub fn aggregate_speeds(&mut self) -> Result<()> {
        let mean = timing::aggregate_speeds(
            self.trip_speeds.values().map(Vec::as_slice),
            self.stop_ids.len(),
        )?;
        self.stop_speeds = Some(mean);
        Ok(())
    }

    // ---- Output ----

    /// Geometry cut at each stop, carrying the mean speeds at either end and
    /// tagged with this sequence's route and direction.
    pub fn speed_segments(&self, model: &dyn DistanceModel) -> Result<Vec<SpeedSegment>> {
        let geometry = self.require_geometry("build speed segments")?;
        let distances = self.stop_distances.as_deref().ok_or(SequenceError::Precondition {
            step: "build speed segments",
            requires: "stop distance calculation",
        })?;
        let speeds = self.stop_speeds.as_deref().ok_or(SequenceError::Precondition {
            step: "build speed segments",
            requires: "speed aggregation",
        })?;

        let segments = segment_by_distances(geometry, distances, speeds, model)?;
        Ok(segments
            .into_iter()
            .map(|segment| SpeedSegment {
                geometry: segment.geometry,
                start_speed: segment.start_value,
                end_speed: segment.end_value,
                route_id: self.attributes.route_id.clone(),
                direction_id: self.attributes.direction_id,
            })
            .collect())
    }

    // ---- Helpers ----

    fn require_geometry(&self, step: &'static str) -> Result<&LineString> {
        self.geometry.as_ref().ok_or(SequenceError::Precondition {
            step,
            requires: "geometry assignment",
        })
    }

    fn compute_stop_distances(&self, model: &dyn DistanceModel) -> Result<Vec<f64>> {
        let snapped = self.stop_coords.as_deref().ok_or(SequenceError::Precondition {
            step: "calculate stop distances",
            requires: "stop snapping",
        })?;
        Ok(timing::stop_distances(snapped, model))
    }

    fn compute_trip_durations(&self) -> Result<BTreeMap<TripIdentifier, Vec<f64>>> {
        if self.trip_times.is_empty() {
            return Err(SequenceError::Precondition {
                step: "calculate trip durations",
                requires: "attaching arrival times",
            });
        }
        Ok(self
            .trip_times
            .iter()
            .map(|(trip_id, times)| (trip_id.clone(), timing::trip_durations(times)))
            .collect())
    }

    fn durations_complete(&self) -> bool {
        !self.trip_durations.is_empty()
            && self.trip_times.keys().all(|id| self.trip_durations.contains_key(id))
    }

    /// Drop everything derived from the stop positions on the geometry
    fn clear_snapped(&mut self) {
        self.stop_coords = None;
        self.stop_distances = None;
        self.trip_speeds.clear();
        self.stop_speeds = None;
    }
}

fn curve_length(line: &LineString) -> f64 {
    cumulative_lengths(line).last().copied().unwrap_or(0.0)
}
