//! Schedule records, input-table traits and errors.

pub mod traits;
pub mod types;

// Re-exports for convenience
pub use traits::{StopTable, TripTable};
pub use types::{
    DirectionId, Result, SequenceAttributes, SequenceError, SpeedSegment, TripRecord,
};
