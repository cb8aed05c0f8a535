//! Core data types, records and errors for sequence processing.

use std::sync::Arc;

use geo::LineString;
use serde::{Deserialize, Serialize};

use crate::identifiers::*;

// ============================================================================
// Enums
// ============================================================================

/// Trip direction (0 = outbound, 1 = inbound per GTFS)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum DirectionId {
    Outbound = 0,
    Inbound = 1,
}

impl DirectionId {
    pub fn from_gtfs(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Outbound),
            1 => Some(Self::Inbound),
            _ => None,
        }
    }

    pub fn as_gtfs(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for DirectionId {
    type Error = SequenceError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_gtfs(value)
            .ok_or_else(|| SequenceError::InvalidData(format!("Unknown direction_id {}", value)))
    }
}

impl From<DirectionId> for u8 {
    fn from(direction: DirectionId) -> Self {
        direction.as_gtfs()
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// One row of the trip attribute table.
///
/// These are the raw, possibly mislabelled attributes of a single trip; a
/// sequence settles on the majority value of each across its member trips.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TripRecord {
    pub direction_id: DirectionId,
    pub route_id: RouteIdentifier,
    pub service_id: ServiceIdentifier,
    pub trip_headsign: Arc<str>,
    pub shape_id: ShapeIdentifier,
}

/// Attributes of a sequence, each settled by majority vote over its trips
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceAttributes {
    pub direction_id: DirectionId,
    pub route_id: RouteIdentifier,
    pub service_id: ServiceIdentifier,
    pub trip_headsign: Arc<str>,
    pub shape_id: ShapeIdentifier,
}

/// A piece of route geometry annotated with the speeds at either end,
/// ready for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeedSegment {
    pub geometry: LineString,
    pub start_speed: f64,
    pub end_speed: f64,
    pub route_id: RouteIdentifier,
    pub direction_id: DirectionId,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Cannot {step} before {requires}")]
    Precondition {
        step: &'static str,
        requires: &'static str,
    },

    #[error("{candidates} geometries share the route-direction key {key}")]
    AmbiguousMatch { key: String, candidates: usize },

    #[error("{values} values cannot be attached to {distances} distances")]
    ConfigurationMismatch { values: usize, distances: usize },

    #[error("Trip not found: {0}")]
    TripNotFound(TripIdentifier),

    #[error("Stop not found: {0}")]
    StopNotFound(StopIdentifier),

    #[error("Distance {distance} lies beyond a curve of length {length}")]
    UnreachableDistance { distance: f64, length: f64 },

    #[error("Trip {trip_id} has zero duration into stop index {stop_index}")]
    ZeroDuration {
        trip_id: TripIdentifier,
        stop_index: usize,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SequenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SequenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_gtfs() {
        assert_eq!(DirectionId::from_gtfs(0), Some(DirectionId::Outbound));
        assert_eq!(DirectionId::from_gtfs(1), Some(DirectionId::Inbound));
        assert_eq!(DirectionId::from_gtfs(7), None);
    }

    #[test]
    fn test_direction_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&DirectionId::Inbound).unwrap(), "1");
        let parsed: DirectionId = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, DirectionId::Outbound);
        assert!(serde_json::from_str::<DirectionId>("2").is_err());
    }

    #[test]
    fn test_precondition_message() {
        let err = SequenceError::Precondition {
            step: "snap stops",
            requires: "geometry assignment",
        };
        assert_eq!(err.to_string(), "Cannot snap stops before geometry assignment");
    }
}
