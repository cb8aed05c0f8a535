//! # transit-speeds
//!
//! Reconciles noisy transit schedule records into canonical stop sequences
//! and derives route geometry, inter-stop distances and speeds for each.
//!
//! ## Features
//!
//! - **Majority-vote labelling**: a sequence takes the route, direction,
//!   service, headsign and shape most of its trips agree on
//! - **Geometry matching**: one route geometry per route-direction key
//! - **Snapping and trimming**: stops projected onto the geometry, which is
//!   cut down to the first and last stop
//! - **Timing**: per-trip durations and speeds, averaged per stop
//! - **Speed segments**: geometry split at each stop and tagged with speeds
//! - **Versioned persistence**: sequences round-trip through JSON
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use geo::{line_string, Point};
//! use transit_speeds::prelude::*;
//!
//! let trips = HashMap::from([(
//!     TripIdentifier::new("t1"),
//!     TripRecord {
//!         direction_id: DirectionId::Outbound,
//!         route_id: RouteIdentifier::new("M15"),
//!         service_id: ServiceIdentifier::new("WKD"),
//!         trip_headsign: "South Ferry".into(),
//!         shape_id: ShapeIdentifier::new("M150001"),
//!     },
//! )]);
//! let stops = HashMap::from([
//!     (StopIdentifier(1), Point::new(0.0, 0.0)),
//!     (StopIdentifier(2), Point::new(0.001, 0.0)),
//! ]);
//! let geometries = GeometryIndex::from_iter([
//!     ("M15_0", line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)]),
//! ]);
//!
//! let mut sequence = Sequence::from_trips(
//!     vec![StopIdentifier(1), StopIdentifier(2)],
//!     vec![TripIdentifier::new("t1")],
//!     &trips,
//! )
//! .unwrap();
//!
//! let config = SequenceConfig::default();
//! let pipeline = SequencePipeline::new(&geometries, &stops, &config);
//! assert_eq!(pipeline.run(&mut sequence).unwrap(), PipelineOutcome::Geometry);
//!
//! // 0.001 degrees at the default 110 km per degree
//! let distances = sequence.stop_distances().unwrap();
//! assert!((distances[1] - 110.0).abs() < 1e-6);
//! ```

pub mod config;
pub mod identifiers;
pub mod models;
pub mod provider;
pub mod sequence;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::config::{DistanceConfig, SequenceConfig, ZeroDurationPolicy};
    pub use crate::identifiers::*;
    pub use crate::models::{traits::*, types::*};
    pub use crate::provider::{ProcessedSequence, StaticScheduleTables, StopArrival};
    pub use crate::sequence::{
        PersistedSequence, PipelineOutcome, SchemaVersion, Sequence, SequencePipeline,
    };
    pub use crate::spatial::{DistanceModel, FixedScale, GeometryIndex};
}

pub use prelude::*;
