//! Geometry matching, snapping, segmentation and distance models.

pub mod index;
pub mod queries;
pub mod segment;
pub mod snap;

pub use index::{route_dir_key, GeometryIndex};
pub use queries::{haversine_distance, DistanceModel, FixedScale, DEFAULT_METERS_PER_DEGREE};
pub use segment::{cut, segment_by_distances, ValuedSegment};
pub use snap::snap_points;
