//! Greedy seed-radius clustering of students into candidate stops.
//!
//! Each cluster is anchored on its seed: members are every unclustered student within
//! `max_distance_km` of the seed, not of each other. The output depends on input
//! ordering, so students are sorted by id first.

use crate::config::SuggestionConfig;
use crate::models::{
    Coordinate, StopCandidate, StopKind, Student, UnassignedReason, UnassignedStudent,
};
use crate::spatial::{haversine_distance, offset_by_bearing, validate};
use std::collections::HashSet;

/// Stops closer than this are treated as the same point.
const COINCIDENT_STOP_M: f64 = 0.1;
/// Offset applied per earlier coincident stop.
const COLLISION_OFFSET_M: f64 = 1.0;
const GOLDEN_ANGLE_RAD: f64 = 2.399_963_229_728_653;

#[derive(Debug, Clone, Default)]
pub struct ClusterOutcome {
    /// Stops in seed order, sequences `1..=n`.
    pub stops: Vec<StopCandidate>,
    pub unassigned: Vec<UnassignedStudent>,
}

impl ClusterOutcome {
    pub fn assigned_count(&self) -> usize {
        self.stops.iter().map(StopCandidate::student_count).sum()
    }
}

struct PoolEntry<'a> {
    student: &'a Student,
    coordinate: Coordinate,
    clustered: bool,
}

/// Group students into stop candidates.
pub fn cluster_students(students: &[Student], config: &SuggestionConfig) -> ClusterOutcome {
    let mut outcome = ClusterOutcome::default();
    let mut seen = HashSet::new();
    let mut pool: Vec<PoolEntry<'_>> = Vec::with_capacity(students.len());

    for student in students {
        if !seen.insert(student.id.as_str()) {
            tracing::debug!(student_id = %student.id, "duplicate student id");
            outcome
                .unassigned
                .push(UnassignedStudent::new(student, UnassignedReason::DuplicateId));
            continue;
        }
        let Some(coordinate) = student.coordinate else {
            outcome.unassigned.push(UnassignedStudent::new(
                student,
                UnassignedReason::MissingCoordinates,
            ));
            continue;
        };
        match validate(coordinate) {
            Ok(coordinate) if coordinate.is_usable_location() => pool.push(PoolEntry {
                student,
                coordinate,
                clustered: false,
            }),
            _ => outcome.unassigned.push(UnassignedStudent::new(
                student,
                UnassignedReason::InvalidCoordinates,
            )),
        }
    }

    pool.sort_by(|a, b| a.student.id.cmp(&b.student.id));

    let radius_m = config.max_distance_km * 1_000.0;
    let min_members = config.min_students_per_stop.max(1);

    for seed_idx in 0..pool.len() {
        if pool[seed_idx].clustered {
            continue;
        }
        let seed = pool[seed_idx].coordinate;

        let mut members: Vec<(usize, f64)> = pool
            .iter()
            .enumerate()
            .filter(|(idx, entry)| *idx != seed_idx && !entry.clustered)
            .map(|(idx, entry)| {
                let distance = haversine_distance(
                    seed.lat,
                    seed.lon,
                    entry.coordinate.lat,
                    entry.coordinate.lon,
                );
                (idx, distance)
            })
            .filter(|(_, distance)| *distance <= radius_m)
            .collect();

        if let Some(cap) = config.max_students_per_stop {
            let room = cap.max(1) - 1;
            if members.len() > room {
                members.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                members.truncate(room);
                members.sort_by_key(|(idx, _)| *idx);
            }
        }

        if members.len() + 1 < min_members {
            continue;
        }

        let mut student_ids = Vec::with_capacity(members.len() + 1);
        pool[seed_idx].clustered = true;
        student_ids.push(pool[seed_idx].student.id.clone());
        for (idx, _) in &members {
            pool[*idx].clustered = true;
            student_ids.push(pool[*idx].student.id.clone());
        }

        let sequence = outcome.stops.len() as u32 + 1;
        let coordinate = separate_from_existing(seed, &outcome.stops);
        outcome.stops.push(StopCandidate {
            stop_id: format!("stop-{sequence}"),
            kind: StopKind::Pickup,
            coordinate,
            address: pool[seed_idx].student.address.clone(),
            student_ids,
            sequence,
        });
    }

    for entry in pool.iter().filter(|entry| !entry.clustered) {
        outcome.unassigned.push(UnassignedStudent::new(
            entry.student,
            UnassignedReason::BelowMinimumStopThreshold,
        ));
    }

    outcome
}

/// Nudge a stop off any earlier stop it coincides with.
///
/// Only the representative coordinate moves; stop membership is already fixed.
fn separate_from_existing(coordinate: Coordinate, stops: &[StopCandidate]) -> Coordinate {
    let collisions = stops
        .iter()
        .filter(|stop| {
            haversine_distance(
                coordinate.lat,
                coordinate.lon,
                stop.coordinate.lat,
                stop.coordinate.lon,
            ) <= COINCIDENT_STOP_M
        })
        .count();
    if collisions == 0 {
        return coordinate;
    }
    let (lat, lon) = offset_by_bearing(
        coordinate.lat,
        coordinate.lon,
        COLLISION_OFFSET_M * collisions as f64,
        GOLDEN_ANGLE_RAD * collisions as f64,
    );
    Coordinate::new(lat, lon)
}
