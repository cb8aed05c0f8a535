//! Running every processing step on a sequence in order.

use tracing::debug;

use crate::config::SequenceConfig;
use crate::models::traits::StopTable;
use crate::models::types::*;
use crate::spatial::index::GeometryIndex;
use crate::spatial::queries::DistanceModel;

use super::Sequence;

/// How far the pipeline got for one sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// No geometry shares the sequence's route-direction key
    NoGeometry,
    /// Geometry, snapped stops and distances, but no arrival times attached
    Geometry,
    /// Everything through aggregated speeds
    Complete,
}

/// Shared, read-only inputs for processing any number of sequences.
///
/// Sequences never share state, so one pipeline can drive them in any order.
pub struct SequencePipeline<'a> {
    geometries: &'a GeometryIndex,
    stops: &'a dyn StopTable,
    config: &'a SequenceConfig,
    model: Box<dyn DistanceModel>,
}

impl<'a> SequencePipeline<'a> {
    pub fn new(geometries: &'a GeometryIndex, stops: &'a dyn StopTable, config: &'a SequenceConfig) -> Self {
        Self {
            geometries,
            stops,
            config,
            model: config.distance.model(),
        }
    }

    pub fn model(&self) -> &dyn DistanceModel {
        self.model.as_ref()
    }

    pub fn run(&self, sequence: &mut Sequence) -> Result<PipelineOutcome> {
        if !sequence.assign_geometry(self.geometries)? {
            return Ok(PipelineOutcome::NoGeometry);
        }
        if self.config.trim_geometry {
            sequence.trim_geometry(self.stops)?;
        }
        sequence.snap_stops(self.stops)?;
        sequence.calculate_stop_distances(self.model())?;

        if sequence.trip_times().is_empty() {
            debug!(key = %sequence.route_dir_key(), "no arrival times, stopping after distances");
            return Ok(PipelineOutcome::Geometry);
        }

        sequence.calculate_trip_durations()?;
        sequence.calculate_trip_speeds(self.model(), self.config.zero_duration)?;
        sequence.aggregate_speeds()?;
        Ok(PipelineOutcome::Complete)
    }

    /// Run the pipeline, then cut the geometry into speed segments
    pub fn speed_segments(&self, sequence: &mut Sequence) -> Result<Vec<SpeedSegment>> {
        match self.run(sequence)? {
            PipelineOutcome::Complete => sequence.speed_segments(self.model()),
            _ => Ok(Vec::new()),
        }
    }
}
