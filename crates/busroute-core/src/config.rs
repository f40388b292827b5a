//! Tunables for one suggestion run.

use serde::{Deserialize, Serialize};

/// Configuration for filtering, clustering and splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Half-width of the band around the corridor path, in meters
    pub corridor_radius_m: f64,
    /// Radius around a cluster seed within which students join its stop
    pub max_distance_km: f64,
    /// Clusters smaller than this are dissolved
    pub min_students_per_stop: usize,
    /// Optional cap on students absorbed by a single stop (nearest first)
    pub max_students_per_stop: Option<usize>,
    /// Routes below this size are kept but flagged
    pub min_students_per_route: usize,
    pub max_students_per_route: usize,
    /// Pickup stops per route, anchors excluded
    pub max_stops_per_route: usize,
    /// Soft limit on pickups; exceeding it only adds a warning
    pub recommended_stops_per_route: Option<usize>,
    /// Mirror every outbound route into a return route
    pub create_return_routes: bool,
    pub route_name_prefix: String,
    /// Appended to outbound names to name their return routes
    pub return_suffix: String,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            corridor_radius_m: 3_000.0,
            max_distance_km: 2.0,
            min_students_per_stop: 1,
            max_students_per_stop: None,
            min_students_per_route: 10,
            max_students_per_route: 40,
            max_stops_per_route: 15,
            recommended_stops_per_route: None,
            create_return_routes: false,
            route_name_prefix: "Tuyến".into(),
            return_suffix: "(Về)".into(),
        }
    }
}

impl SuggestionConfig {
    /// Clamp nonsensical values instead of failing the run.
    pub fn normalized(mut self) -> Self {
        if !self.corridor_radius_m.is_finite() || self.corridor_radius_m < 0.0 {
            self.corridor_radius_m = Self::default().corridor_radius_m;
        }
        if !self.max_distance_km.is_finite() || self.max_distance_km < 0.0 {
            self.max_distance_km = Self::default().max_distance_km;
        }
        self.min_students_per_stop = self.min_students_per_stop.max(1);
        self.max_students_per_stop = self.max_students_per_stop.map(|cap| cap.max(1));
        self.max_students_per_route = self.max_students_per_route.max(1);
        self.max_stops_per_route = self.max_stops_per_route.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SuggestionConfig =
            serde_json::from_str(r#"{"max_students_per_route": 5}"#).unwrap();
        assert_eq!(config.max_students_per_route, 5);
        assert_eq!(config.corridor_radius_m, 3_000.0);
        assert_eq!(config.max_distance_km, 2.0);
        assert_eq!(config.return_suffix, "(Về)");
    }

    #[test]
    fn normalized_clamps_zero_limits() {
        let config = SuggestionConfig {
            min_students_per_stop: 0,
            max_students_per_route: 0,
            max_stops_per_route: 0,
            corridor_radius_m: f64::NAN,
            ..SuggestionConfig::default()
        }
        .normalized();
        assert_eq!(config.min_students_per_stop, 1);
        assert_eq!(config.max_students_per_route, 1);
        assert_eq!(config.max_stops_per_route, 1);
        assert_eq!(config.corridor_radius_m, 3_000.0);
    }
}
