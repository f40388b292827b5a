//! Greedy bin-packing of ordered stops into capacity-bounded routes.

use crate::config::SuggestionConfig;
use crate::error::SequenceError;
use crate::models::{
    Anchor, RouteDirection, RouteWarning, StopCandidate, StopKind, SuggestedRoute,
};

/// Partition stops into routes, preserving their order.
///
/// A route is sealed when the next stop would push it past `max_students_per_route`
/// or `max_stops_per_route`. With `create_return_routes`, every outbound route is
/// immediately followed by its mirrored return route.
pub fn split_routes(
    stops: &[StopCandidate],
    origin: &Anchor,
    destination: &Anchor,
    config: &SuggestionConfig,
) -> Vec<SuggestedRoute> {
    let mut outbound = Vec::new();
    let mut current: Vec<&StopCandidate> = Vec::new();
    let mut current_students = 0usize;

    for stop in stops {
        if stop.kind != StopKind::Pickup || stop.student_ids.is_empty() {
            continue;
        }
        let over_students = current_students + stop.student_count() > config.max_students_per_route;
        let over_stops = current.len() + 1 > config.max_stops_per_route;
        if !current.is_empty() && (over_students || over_stops) {
            outbound.push(seal_route(outbound.len() + 1, &current, origin, destination, config));
            current.clear();
            current_students = 0;
        }
        current_students += stop.student_count();
        current.push(stop);
    }
    if !current.is_empty() {
        outbound.push(seal_route(outbound.len() + 1, &current, origin, destination, config));
    }

    if !config.create_return_routes {
        return outbound;
    }
    let mut routes = Vec::with_capacity(outbound.len() * 2);
    for route in outbound {
        let mirrored = mirror_route(&route, config);
        routes.push(route);
        routes.push(mirrored);
    }
    routes
}

fn seal_route(
    index: usize,
    pickups: &[&StopCandidate],
    origin: &Anchor,
    destination: &Anchor,
    config: &SuggestionConfig,
) -> SuggestedRoute {
    let mut stops = Vec::with_capacity(pickups.len() + 2);
    stops.push(StopCandidate::from_anchor(origin, StopKind::Origin, 1));
    for (offset, pickup) in pickups.iter().enumerate() {
        stops.push(StopCandidate {
            sequence: offset as u32 + 2,
            ..(*pickup).clone()
        });
    }
    stops.push(StopCandidate::from_anchor(
        destination,
        StopKind::Destination,
        pickups.len() as u32 + 2,
    ));

    let student_count: usize = pickups.iter().map(|stop| stop.student_count()).sum();
    let mut route = SuggestedRoute {
        name: format!("{} {}", config.route_name_prefix, index),
        direction: RouteDirection::Outbound,
        origin: origin.clone(),
        destination: destination.clone(),
        stops,
        student_count,
        distance_m: None,
        duration_s: None,
        used_fallback_estimate: false,
        warnings: Vec::new(),
    };

    if student_count < config.min_students_per_route {
        route.add_warning(RouteWarning::BelowTargetSize);
    }
    if student_count > config.max_students_per_route {
        route.add_warning(RouteWarning::ExceedsCapacity);
    }
    if config
        .recommended_stops_per_route
        .is_some_and(|recommended| pickups.len() > recommended)
    {
        route.add_warning(RouteWarning::ExceedsRecommendedStops);
    }
    route
}

/// Build the return leg of an outbound route.
///
/// Stops are reversed and renumbered, anchors swap roles, and each pickup keeps its
/// students so a pickup stop becomes the same students' drop-off stop.
pub fn mirror_route(outbound: &SuggestedRoute, config: &SuggestionConfig) -> SuggestedRoute {
    let stops = outbound
        .stops
        .iter()
        .rev()
        .enumerate()
        .map(|(position, stop)| {
            let (kind, stop_id) = match stop.kind {
                StopKind::Origin => (StopKind::Destination, "destination".to_string()),
                StopKind::Destination => (StopKind::Origin, "origin".to_string()),
                StopKind::Pickup => (StopKind::Pickup, stop.stop_id.clone()),
            };
            StopCandidate {
                stop_id,
                kind,
                sequence: position as u32 + 1,
                ..stop.clone()
            }
        })
        .collect();

    SuggestedRoute {
        name: format!("{} {}", outbound.name, config.return_suffix),
        direction: RouteDirection::Return,
        origin: outbound.destination.clone(),
        destination: outbound.origin.clone(),
        stops,
        student_count: outbound.student_count,
        distance_m: None,
        duration_s: None,
        used_fallback_estimate: false,
        warnings: outbound
            .warnings
            .iter()
            .copied()
            .filter(|warning| *warning != RouteWarning::EstimationDegraded)
            .collect(),
    }
}

/// Check that stop sequences run `1..=n` in order with no gaps or duplicates.
pub fn validate_sequence(route: &SuggestedRoute) -> Result<(), SequenceError> {
    if route.stops.is_empty() {
        return Err(SequenceError::Empty);
    }
    for (position, stop) in route.stops.iter().enumerate() {
        let expected = position as u32 + 1;
        if stop.sequence != expected {
            return Err(SequenceError::Gap {
                position,
                expected,
                found: stop.sequence,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn anchor(name: &str, lat: f64) -> Anchor {
        Anchor {
            name: name.into(),
            address: format!("{name} address"),
            coordinate: Coordinate::new(lat, 106.70),
        }
    }

    fn pickups(sizes: &[usize]) -> Vec<StopCandidate> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| StopCandidate {
                stop_id: format!("stop-{}", i + 1),
                kind: StopKind::Pickup,
                coordinate: Coordinate::new(10.70 + i as f64 * 0.01, 106.70),
                address: format!("pickup {}", i + 1),
                student_ids: (0..*size).map(|s| format!("st-{i}-{s}")).collect(),
                sequence: i as u32 + 1,
            })
            .collect()
    }

    fn pickup_sizes(route: &SuggestedRoute) -> Vec<usize> {
        route.pickup_stops().map(StopCandidate::student_count).collect()
    }

    #[test]
    fn greedy_split_seals_on_student_limit() {
        let config = SuggestionConfig {
            max_students_per_route: 5,
            min_students_per_route: 4,
            ..SuggestionConfig::default()
        };
        let routes = split_routes(
            &pickups(&[5, 5, 2]),
            &anchor("school", 10.60),
            &anchor("depot", 10.90),
            &config,
        );

        assert_eq!(routes.len(), 3);
        assert_eq!(pickup_sizes(&routes[0]), vec![5]);
        assert_eq!(pickup_sizes(&routes[1]), vec![5]);
        assert_eq!(pickup_sizes(&routes[2]), vec![2]);
        assert!(routes[0].warnings.is_empty());
        assert!(routes[1].warnings.is_empty());
        assert_eq!(routes[2].warnings, vec![RouteWarning::BelowTargetSize]);
        assert_eq!(routes[0].name, "Tuyến 1");
        assert_eq!(routes[2].student_count, 2);
    }

    #[test]
    fn small_stops_share_a_route() {
        let config = SuggestionConfig {
            max_students_per_route: 5,
            min_students_per_route: 1,
            ..SuggestionConfig::default()
        };
        let routes = split_routes(
            &pickups(&[2, 2, 3]),
            &anchor("school", 10.60),
            &anchor("depot", 10.90),
            &config,
        );
        assert_eq!(routes.len(), 2);
        assert_eq!(pickup_sizes(&routes[0]), vec![2, 2]);
        assert_eq!(pickup_sizes(&routes[1]), vec![3]);
    }

    #[test]
    fn stop_limit_seals_routes() {
        let config = SuggestionConfig {
            max_stops_per_route: 2,
            min_students_per_route: 1,
            ..SuggestionConfig::default()
        };
        let routes = split_routes(
            &pickups(&[1, 1, 1, 1, 1]),
            &anchor("school", 10.60),
            &anchor("depot", 10.90),
            &config,
        );
        assert_eq!(
            routes.iter().map(|r| r.pickup_stops().count()).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );
    }

    #[test]
    fn oversized_stop_gets_its_own_flagged_route() {
        let config = SuggestionConfig {
            max_students_per_route: 5,
            min_students_per_route: 1,
            recommended_stops_per_route: Some(1),
            ..SuggestionConfig::default()
        };
        let routes = split_routes(
            &pickups(&[1, 7, 1, 1]),
            &anchor("school", 10.60),
            &anchor("depot", 10.90),
            &config,
        );
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[1].warnings, vec![RouteWarning::ExceedsCapacity]);
        assert_eq!(routes[2].warnings, vec![RouteWarning::ExceedsRecommendedStops]);
    }

    #[test]
    fn anchors_frame_every_route() {
        let routes = split_routes(
            &pickups(&[3, 4]),
            &anchor("school", 10.60),
            &anchor("depot", 10.90),
            &SuggestionConfig::default(),
        );
        let route = &routes[0];
        let first = route.stops.first().unwrap();
        let last = route.stops.last().unwrap();
        assert_eq!(first.kind, StopKind::Origin);
        assert_eq!(first.address, "school address");
        assert_eq!(last.kind, StopKind::Destination);
        assert_eq!(last.sequence, 4);
        assert_eq!(
            route.stops.iter().map(|s| s.sequence).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn return_routes_mirror_outbound_stops() {
        let config = SuggestionConfig {
            max_students_per_route: 6,
            create_return_routes: true,
            ..SuggestionConfig::default()
        };
        let routes = split_routes(
            &pickups(&[2, 3, 4, 1]),
            &anchor("school", 10.60),
            &anchor("depot", 10.90),
            &config,
        );

        assert_eq!(routes.len(), 4);
        for pair in routes.chunks(2) {
            let (outbound, inbound) = (&pair[0], &pair[1]);
            assert_eq!(outbound.direction, RouteDirection::Outbound);
            assert_eq!(inbound.direction, RouteDirection::Return);
            assert_eq!(inbound.name, format!("{} (Về)", outbound.name));
            assert_eq!(inbound.origin, outbound.destination);
            assert_eq!(inbound.destination, outbound.origin);
            assert_eq!(inbound.student_count, outbound.student_count);

            let n = outbound.stops.len();
            assert_eq!(inbound.stops.len(), n);
            for (i, stop) in outbound.stops.iter().enumerate() {
                let mirrored = &inbound.stops[n - 1 - i];
                assert_eq!(mirrored.student_ids, stop.student_ids);
                assert_eq!(mirrored.coordinate, stop.coordinate);
            }
            assert_eq!(inbound.stops[0].kind, StopKind::Origin);
            assert_eq!(inbound.stops[0].stop_id, "origin");
            assert_eq!(inbound.stops[n - 1].kind, StopKind::Destination);
            assert_eq!(inbound.stops[n - 1].stop_id, "destination");
            assert_eq!(inbound.stops[1].stop_id, outbound.stops[n - 2].stop_id);
            assert!(validate_sequence(inbound).is_ok());
        }
    }

    #[test]
    fn random_splits_keep_contiguous_sequences() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let sizes: Vec<usize> = (0..rng.random_range(0..30))
                .map(|_| rng.random_range(1..12))
                .collect();
            let config = SuggestionConfig {
                max_students_per_route: rng.random_range(1..30),
                max_stops_per_route: rng.random_range(1..8),
                create_return_routes: rng.random_bool(0.5),
                ..SuggestionConfig::default()
            };
            let stops = pickups(&sizes);
            let routes = split_routes(
                &stops,
                &anchor("school", 10.60),
                &anchor("depot", 10.90),
                &config,
            );
            for route in &routes {
                assert!(validate_sequence(route).is_ok(), "{route:?}");
                assert!(route.pickup_stops().count() <= config.max_stops_per_route);
            }
            let outbound_students: usize = routes
                .iter()
                .filter(|route| route.direction == RouteDirection::Outbound)
                .map(|route| route.student_count)
                .sum();
            assert_eq!(outbound_students, sizes.iter().sum::<usize>());
        }
    }

    #[test]
    fn validate_sequence_rejects_gaps_and_duplicates() {
        let mut route = split_routes(
            &pickups(&[1, 1]),
            &anchor("school", 10.60),
            &anchor("depot", 10.90),
            &SuggestionConfig::default(),
        )
        .remove(0);
        route.stops[2].sequence = 2;
        assert_eq!(
            validate_sequence(&route),
            Err(SequenceError::Gap {
                position: 2,
                expected: 3,
                found: 2
            })
        );
        route.stops.clear();
        assert_eq!(validate_sequence(&route), Err(SequenceError::Empty));
    }
}
