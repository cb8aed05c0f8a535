//! Versioned persisted representation of a [`Sequence`].
//!
//! | version | adds                                                    |
//! |---------|---------------------------------------------------------|
//! | 1       | attributes, `stop_ids`, `trip_ids`                      |
//! | 2       | `stop_coords`, optionally `stop_distances`              |
//! | 3       | `trip_times`, optionally `trip_durations`/`trip_speeds` |
//!
//! Documents written before the version field existed are migrated by
//! inferring the version from which fields are present. Route geometry and
//! aggregated speeds are not persisted; they are re-derived after loading.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use geo::Coord;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::identifiers::*;
use crate::models::types::*;

use super::Sequence;

/// ISO-8601 without offset; fractional seconds only when present
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum SchemaVersion {
    Attributes = 1,
    Geometry = 2,
    Timing = 3,
}

impl SchemaVersion {
    pub const CURRENT: Self = Self::Timing;
}

impl TryFrom<u8> for SchemaVersion {
    type Error = SequenceError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Attributes),
            2 => Ok(Self::Geometry),
            3 => Ok(Self::Timing),
            other => Err(SequenceError::Schema(format!("unknown schema version {}", other))),
        }
    }
}

impl From<SchemaVersion> for u8 {
    fn from(version: SchemaVersion) -> Self {
        version as u8
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedSequence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<SchemaVersion>,
    pub direction_id: DirectionId,
    pub route_id: RouteIdentifier,
    pub service_id: ServiceIdentifier,
    pub shape_id: ShapeIdentifier,
    pub stop_ids: Vec<StopIdentifier>,
    pub trip_headsign: Arc<str>,
    pub trip_ids: Vec<TripIdentifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_coords: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_distances: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_durations: Option<BTreeMap<TripIdentifier, Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_speeds: Option<BTreeMap<TripIdentifier, Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_times: Option<BTreeMap<TripIdentifier, Vec<String>>>,
}

impl PersistedSequence {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn has_geometry(&self) -> bool {
        self.stop_coords.is_some() || self.stop_distances.is_some()
    }

    fn has_timing(&self) -> bool {
        self.trip_times.is_some() || self.trip_durations.is_some() || self.trip_speeds.is_some()
    }

    /// Version implied by the fields present
    pub fn inferred_version(&self) -> SchemaVersion {
        if self.has_timing() {
            SchemaVersion::Timing
        } else if self.has_geometry() {
            SchemaVersion::Geometry
        } else {
            SchemaVersion::Attributes
        }
    }

    /// Check the document against its declared (or inferred) version.
    ///
    /// A version-2 document must carry `stop_coords` and a version-3 document
    /// must carry `trip_times`. Fields from a later version than the declared
    /// one are rejected, as is any list that does not line up with `stop_ids`.
    /// Stored distances must start at zero and never decrease.
    pub fn validate(&self) -> Result<SchemaVersion> {
        let inferred = self.inferred_version();
        let version = match self.schema_version {
            Some(declared) => {
                if inferred > declared {
                    return Err(SequenceError::Schema(format!(
                        "version {} document carries version {} fields",
                        u8::from(declared),
                        u8::from(inferred)
                    )));
                }
                declared
            }
            None => {
                debug!(version = u8::from(inferred), "migrating unversioned sequence");
                inferred
            }
        };

        if self.trip_ids.is_empty() {
            return Err(SequenceError::MissingInput("persisted sequence has no trips".into()));
        }
        if self.stop_ids.is_empty() {
            return Err(SequenceError::Schema("persisted sequence has no stops".into()));
        }
        let stop_count = self.stop_ids.len();

        if version == SchemaVersion::Geometry && self.stop_coords.is_none() {
            return Err(SequenceError::Schema("version 2 requires stop_coords".into()));
        }
        if version == SchemaVersion::Timing && self.trip_times.is_none() {
            return Err(SequenceError::Schema("version 3 requires trip_times".into()));
        }
        if self.stop_distances.is_some() && self.stop_coords.is_none() {
            return Err(SequenceError::Schema("stop_distances requires stop_coords".into()));
        }

        check_len("stop_coords", self.stop_coords.as_ref().map(Vec::len), stop_count)?;
        check_len("stop_distances", self.stop_distances.as_ref().map(Vec::len), stop_count)?;
        if let Some(distances) = &self.stop_distances {
            check_distances(distances)?;
        }

        let trips: Vec<&TripIdentifier> = self.trip_ids.iter().collect();
        check_trip_lists("trip_times", self.trip_times.as_ref(), &trips, stop_count)?;
        check_trip_lists("trip_durations", self.trip_durations.as_ref(), &trips, stop_count)?;
        check_trip_lists("trip_speeds", self.trip_speeds.as_ref(), &trips, stop_count)?;

        Ok(version)
    }
}

fn check_len(field: &str, len: Option<usize>, stop_count: usize) -> Result<()> {
    match len {
        Some(len) if len != stop_count => Err(SequenceError::Schema(format!(
            "{} has {} entries for {} stops",
            field, len, stop_count
        ))),
        _ => Ok(()),
    }
}

fn check_distances(distances: &[f64]) -> Result<()> {
    if distances.first().is_some_and(|first| *first != 0.0) {
        return Err(SequenceError::Schema(format!(
            "stop_distances starts at {} instead of 0",
            distances[0]
        )));
    }
    if let Some(i) = distances.windows(2).position(|pair| pair[1] < pair[0]) {
        return Err(SequenceError::Schema(format!(
            "stop_distances decreases at stop index {}",
            i + 1
        )));
    }
    Ok(())
}

fn check_trip_lists<T>(
    field: &str,
    lists: Option<&BTreeMap<TripIdentifier, Vec<T>>>,
    trips: &[&TripIdentifier],
    stop_count: usize,
) -> Result<()> {
    for (trip_id, list) in lists.into_iter().flatten() {
        if !trips.contains(&trip_id) {
            return Err(SequenceError::Schema(format!("{} names unknown trip {}", field, trip_id)));
        }
        check_len(field, Some(list.len()), stop_count)?;
    }
    Ok(())
}

fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|err| SequenceError::Schema(format!("bad timestamp {:?}: {}", value, err)))
}

impl Sequence {
    /// Persisted form of everything computed so far.
    ///
    /// The version is the highest one whose fields are populated.
    pub fn to_persisted(&self) -> PersistedSequence {
        let timed = !self.trip_times.is_empty();

        let version = if timed {
            SchemaVersion::Timing
        } else if self.stop_coords.is_some() {
            SchemaVersion::Geometry
        } else {
            SchemaVersion::Attributes
        };

        let non_empty = |map: &BTreeMap<TripIdentifier, Vec<f64>>| (timed && !map.is_empty()).then(|| map.clone());

        PersistedSequence {
            schema_version: Some(version),
            direction_id: self.attributes.direction_id,
            route_id: self.attributes.route_id.clone(),
            service_id: self.attributes.service_id.clone(),
            shape_id: self.attributes.shape_id.clone(),
            stop_ids: self.stop_ids.clone(),
            trip_headsign: self.attributes.trip_headsign.clone(),
            trip_ids: self.trip_ids.clone(),
            stop_coords: self
                .stop_coords
                .as_ref()
                .map(|coords| coords.iter().map(|c| [c.x, c.y]).collect()),
            stop_distances: self.stop_distances.clone(),
            trip_durations: non_empty(&self.trip_durations),
            trip_speeds: non_empty(&self.trip_speeds),
            trip_times: timed.then(|| {
                self.trip_times
                    .iter()
                    .map(|(trip_id, times)| (trip_id.clone(), times.iter().map(format_timestamp).collect()))
                    .collect()
            }),
        }
    }

    /// Restore a sequence as persisted, without recomputing anything.
    ///
    /// Repeated trip ids collapse to their first occurrence, as in
    /// [`Sequence::from_trips`].
    pub fn from_persisted(persisted: PersistedSequence) -> Result<Self> {
        persisted.validate()?;

        let trip_times = persisted
            .trip_times
            .unwrap_or_default()
            .into_iter()
            .map(|(trip_id, times)| {
                let parsed = times.iter().map(|t| parse_timestamp(t)).collect::<Result<Vec<_>>>()?;
                Ok((trip_id, parsed))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let attributes = SequenceAttributes {
            direction_id: persisted.direction_id,
            route_id: persisted.route_id,
            service_id: persisted.service_id,
            trip_headsign: persisted.trip_headsign,
            shape_id: persisted.shape_id,
        };

        let trip_ids = persisted.trip_ids.into_iter().unique().collect();
        let mut sequence = Self::with_attributes(persisted.stop_ids, trip_ids, attributes);
        sequence.stop_coords = persisted
            .stop_coords
            .map(|coords| coords.into_iter().map(|[x, y]| Coord { x, y }).collect());
        sequence.stop_distances = persisted.stop_distances;
        sequence.trip_times = trip_times;
        sequence.trip_durations = persisted.trip_durations.unwrap_or_default();
        sequence.trip_speeds = persisted.trip_speeds.unwrap_or_default();
        Ok(sequence)
    }
}
