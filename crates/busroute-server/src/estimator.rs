//! Distance and duration estimates for suggested routes.
//!
//! Never fails: a segment the directions service cannot route is estimated
//! from straight-line distance at an average speed.

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::directions::{DirectionsProvider, TravelMode};
use busroute_core::{haversine, Coordinate, RouteWarning, RunNotice, SuggestedRoute};
use futures::stream::{self, StreamExt};

const DEFAULT_AVERAGE_SPEED_KMH: f64 = 25.0;

#[derive(Debug, Clone)]
pub struct EstimatorSettings {
    pub concurrency: usize,
    pub average_speed_kmh: f64,
    pub mode: TravelMode,
}

impl EstimatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.estimator_concurrency,
            average_speed_kmh: config.average_speed_kmh,
            mode: TravelMode::Driving,
        }
    }

    fn speed_mps(&self) -> f64 {
        let kmh = if self.average_speed_kmh.is_finite() && self.average_speed_kmh > 0.0 {
            self.average_speed_kmh
        } else {
            DEFAULT_AVERAGE_SPEED_KMH
        };
        kmh / 3.6
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEstimate {
    pub distance_m: f64,
    pub duration_s: f64,
    pub fallback_segments: usize,
}

impl RouteEstimate {
    pub fn used_fallback_estimate(&self) -> bool {
        self.fallback_segments > 0
    }
}

struct SegmentEstimate {
    distance_m: f64,
    duration_s: f64,
    fallback: bool,
}

/// Estimate one route, one directions request per consecutive stop pair.
pub async fn estimate_route(
    route: &SuggestedRoute,
    provider: &dyn DirectionsProvider,
    settings: &EstimatorSettings,
    cancel: &CancelToken,
) -> RouteEstimate {
    let segments: Vec<(Coordinate, Coordinate)> = route
        .stops
        .windows(2)
        .map(|pair| (pair[0].coordinate, pair[1].coordinate))
        .collect();

    let results: Vec<SegmentEstimate> = stream::iter(segments)
        .map(|(from, to)| async move {
            if cancel.is_cancelled() {
                return straight_line(from, to, settings);
            }
            match provider.route(from, to, settings.mode).await {
                Ok(leg) => SegmentEstimate {
                    distance_m: leg.distance_m,
                    duration_s: leg.duration_s,
                    fallback: false,
                },
                Err(err) => {
                    tracing::warn!(route = %route.name, error = %err, "directions failed, using straight-line estimate");
                    straight_line(from, to, settings)
                }
            }
        })
        .buffer_unordered(settings.concurrency.max(1))
        .collect()
        .await;

    results.iter().fold(
        RouteEstimate {
            distance_m: 0.0,
            duration_s: 0.0,
            fallback_segments: 0,
        },
        |mut total, segment| {
            total.distance_m += segment.distance_m;
            total.duration_s += segment.duration_s;
            if segment.fallback {
                total.fallback_segments += 1;
            }
            total
        },
    )
}

fn straight_line(from: Coordinate, to: Coordinate, settings: &EstimatorSettings) -> SegmentEstimate {
    let distance_m = haversine(from, to).unwrap_or(0.0);
    SegmentEstimate {
        distance_m,
        duration_s: distance_m / settings.speed_mps(),
        fallback: true,
    }
}

/// Estimate every route in place and report the degraded ones.
pub async fn apply_estimates(
    routes: &mut [SuggestedRoute],
    provider: &dyn DirectionsProvider,
    settings: &EstimatorSettings,
    cancel: &CancelToken,
) -> Vec<RunNotice> {
    let mut notices = Vec::new();
    for route in routes.iter_mut() {
        let estimate = estimate_route(route, provider, settings, cancel).await;
        route.distance_m = Some(estimate.distance_m);
        route.duration_s = Some(estimate.duration_s);
        route.used_fallback_estimate = estimate.used_fallback_estimate();
        if route.used_fallback_estimate {
            route.add_warning(RouteWarning::EstimationDegraded);
            notices.push(RunNotice::EstimationDegraded {
                route_name: route.name.clone(),
                fallback_segments: estimate.fallback_segments,
            });
        }
    }
    notices
}
