//! Core data models for route suggestion.

use serde::{Deserialize, Serialize};

/// A point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside the WGS84 latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Usable as a student home location.
    ///
    /// `(0, 0)` is what unset geocoder fields deserialize to, so it is rejected here
    /// even though it is a valid point.
    pub fn is_usable_location(&self) -> bool {
        self.is_valid() && !(self.lat == 0.0 && self.lon == 0.0)
    }
}

/// A student to be routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Home location; `None` when the address could not be geocoded.
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub class_label: Option<String>,
}

/// Fixed origin or destination of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    /// Route start (school or depot).
    Origin,
    /// Clustered pickup / drop-off location.
    #[default]
    Pickup,
    /// Route end.
    Destination,
}

impl StopKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopKind::Origin => "origin",
            StopKind::Pickup => "pickup",
            StopKind::Destination => "destination",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "origin" => Some(StopKind::Origin),
            "pickup" => Some(StopKind::Pickup),
            "destination" => Some(StopKind::Destination),
            _ => None,
        }
    }
}

/// A provisional stop, either clustered from students or derived from an anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopCandidate {
    pub stop_id: String,
    #[serde(default)]
    pub kind: StopKind,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub student_ids: Vec<String>,
    pub sequence: u32,
}

impl StopCandidate {
    pub fn from_anchor(anchor: &Anchor, kind: StopKind, sequence: u32) -> Self {
        let stop_id = match kind {
            StopKind::Origin => "origin",
            StopKind::Destination => "destination",
            StopKind::Pickup => "anchor",
        };
        Self {
            stop_id: stop_id.to_string(),
            kind,
            coordinate: anchor.coordinate,
            address: if anchor.address.is_empty() {
                anchor.name.clone()
            } else {
                anchor.address.clone()
            },
            student_ids: Vec::new(),
            sequence,
        }
    }

    pub fn student_count(&self) -> usize {
        self.student_ids.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteDirection {
    #[default]
    Outbound,
    Return,
}

impl RouteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteDirection::Outbound => "outbound",
            RouteDirection::Return => "return",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "outbound" => Some(RouteDirection::Outbound),
            "return" => Some(RouteDirection::Return),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteWarning {
    /// Fewer students than `min_students_per_route`.
    BelowTargetSize,
    /// A single stop holds more students than `max_students_per_route`.
    ExceedsCapacity,
    /// More pickups than `recommended_stops_per_route`.
    ExceedsRecommendedStops,
    /// Distance/duration partly come from straight-line estimates.
    EstimationDegraded,
}

/// A route proposed for human review before commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedRoute {
    pub name: String,
    #[serde(default)]
    pub direction: RouteDirection,
    pub origin: Anchor,
    pub destination: Anchor,
    /// Ordered stops, anchors included, sequences `1..=n`.
    pub stops: Vec<StopCandidate>,
    pub student_count: usize,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub used_fallback_estimate: bool,
    #[serde(default)]
    pub warnings: Vec<RouteWarning>,
}

impl SuggestedRoute {
    /// Stops that carry students, in sequence order.
    pub fn pickup_stops(&self) -> impl Iterator<Item = &StopCandidate> {
        self.stops.iter().filter(|stop| stop.kind == StopKind::Pickup)
    }

    pub fn add_warning(&mut self, warning: RouteWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    MissingCoordinates,
    InvalidCoordinates,
    OutsideCorridor,
    OutsideDistricts,
    BelowMinimumStopThreshold,
    /// Same id as an earlier student in the request.
    DuplicateId,
}

impl UnassignedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnassignedReason::MissingCoordinates => "missing_coordinates",
            UnassignedReason::InvalidCoordinates => "invalid_coordinates",
            UnassignedReason::OutsideCorridor => "outside_corridor",
            UnassignedReason::OutsideDistricts => "outside_districts",
            UnassignedReason::BelowMinimumStopThreshold => "below_minimum_stop_threshold",
            UnassignedReason::DuplicateId => "duplicate_id",
        }
    }
}

/// A student left out of every suggested route, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedStudent {
    pub student_id: String,
    pub name: String,
    pub reason: UnassignedReason,
}

impl UnassignedStudent {
    pub fn new(student: &Student, reason: UnassignedReason) -> Self {
        Self {
            student_id: student.id.clone(),
            name: student.name.clone(),
            reason,
        }
    }
}
