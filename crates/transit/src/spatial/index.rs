//! Candidate route geometries keyed by route-direction.
//!
//! Several shapes may be loaded under one key; a lookup only succeeds when the
//! key is unambiguous.

use std::collections::HashMap;

use geo::LineString;
use tracing::debug;

use crate::identifiers::RouteIdentifier;
use crate::models::types::*;

/// Composite `route_id + "_" + direction_id` lookup key
pub fn route_dir_key(route_id: &RouteIdentifier, direction_id: DirectionId) -> String {
    format!("{}_{}", route_id, direction_id.as_gtfs())
}

#[derive(Clone, Debug, Default)]
pub struct GeometryIndex {
    candidates: HashMap<String, Vec<LineString>>,
}

impl GeometryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, geometry: LineString) {
        self.candidates.entry(key.into()).or_default().push(geometry);
    }

    pub fn len(&self) -> usize {
        self.candidates.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Find the geometry for `key`.
    ///
    /// No candidate is `Ok(None)`: the sequence simply stays without geometry.
    /// More than one candidate is [`SequenceError::AmbiguousMatch`].
    pub fn match_key(&self, key: &str) -> Result<Option<&LineString>> {
        match self.candidates.get(key).map(Vec::as_slice) {
            None | Some([]) => {
                debug!(key, "no geometry candidate");
                Ok(None)
            }
            Some([geometry]) => Ok(Some(geometry)),
            Some(many) => Err(SequenceError::AmbiguousMatch {
                key: key.to_string(),
                candidates: many.len(),
            }),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, LineString)> for GeometryIndex {
    fn from_iter<I: IntoIterator<Item = (K, LineString)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (key, geometry) in iter {
            index.insert(key, geometry);
        }
        index
    }
}
