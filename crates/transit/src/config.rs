//! Options controlling sequence processing.

use serde::{Deserialize, Serialize};

use crate::models::types::Result;
use crate::spatial::queries::{DistanceModel, FixedScale, DEFAULT_METERS_PER_DEGREE};

/// How degrees of route geometry convert to meters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistanceConfig {
    Fixed { meters_per_degree: f64 },
    /// Isotropic scale at a reference latitude, see [`FixedScale::at_latitude`]
    Latitude { latitude: f64 },
}

impl DistanceConfig {
    pub fn model(&self) -> Box<dyn DistanceModel> {
        match *self {
            Self::Fixed { meters_per_degree } => Box::new(FixedScale::new(meters_per_degree)),
            Self::Latitude { latitude } => Box::new(FixedScale::at_latitude(latitude)),
        }
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self::Fixed {
            meters_per_degree: DEFAULT_METERS_PER_DEGREE,
        }
    }
}

/// What a speed becomes when consecutive arrivals share a timestamp
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDurationPolicy {
    /// Record a speed of 0 and log a warning
    #[default]
    Zero,
    /// Fail the speed calculation
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub distance: DistanceConfig,
    pub zero_duration: ZeroDurationPolicy,
    /// Cut assigned geometry down to the first and last stop
    pub trim_geometry: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            distance: DistanceConfig::default(),
            zero_duration: ZeroDurationPolicy::default(),
            trim_geometry: true,
        }
    }
}

impl SequenceConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
