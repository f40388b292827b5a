//! Error and notice types shared by the suggestion stages.

use serde::{Deserialize, Serialize};

/// Malformed geometry input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("invalid encoded polyline at byte {0}")]
    InvalidPolyline(usize),
}

/// Stop sequence problems detected before a route may be committed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("route has no stops")]
    Empty,
    #[error("expected sequence {expected} at position {position}, found {found}")]
    Gap {
        position: usize,
        expected: u32,
        found: u32,
    },
}

/// Non-fatal conditions attached to a suggestion response.
///
/// None of these abort a run; callers decide how to present them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunNotice {
    /// Filtering or clustering left nothing to route.
    NoCandidatesFound { stage: String },
    /// Some route segments were estimated from straight-line distance.
    EstimationDegraded {
        route_name: String,
        fallback_segments: usize,
    },
    /// The run was cancelled; results computed so far are still returned.
    Cancelled,
}
