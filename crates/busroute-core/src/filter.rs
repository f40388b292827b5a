//! Narrow the student set to those plausibly served by a route.

use crate::config::SuggestionConfig;
use crate::district::{District, DistrictResolver};
use crate::models::{Anchor, Coordinate, Student, UnassignedReason, UnassignedStudent};
use crate::spatial::min_distance_point_to_polyline;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Distance to the decoded route polyline.
    Corridor,
    /// Address districts between the two anchors.
    District,
    /// District fallback resolved nothing, so every valid student passes.
    Unfiltered,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub candidates: Vec<Student>,
    pub unassigned: Vec<UnassignedStudent>,
    pub mode: FilterMode,
    /// Districts used in district mode, in travel order.
    pub districts: Vec<District>,
}

/// Split students into route candidates and unassigned students.
///
/// Uses the corridor when at least two of its points are valid, otherwise falls back
/// to district matching through `resolver`.
pub fn filter_students(
    students: &[Student],
    origin: &Anchor,
    destination: &Anchor,
    corridor: Option<&[Coordinate]>,
    resolver: &dyn DistrictResolver,
    config: &SuggestionConfig,
) -> FilterOutcome {
    let mut unassigned = Vec::new();
    let mut located: Vec<(&Student, Coordinate)> = Vec::with_capacity(students.len());

    for student in students {
        match student.coordinate {
            None => unassigned.push(UnassignedStudent::new(
                student,
                UnassignedReason::MissingCoordinates,
            )),
            Some(coordinate) if !coordinate.is_usable_location() => unassigned.push(
                UnassignedStudent::new(student, UnassignedReason::InvalidCoordinates),
            ),
            Some(coordinate) => located.push((student, coordinate)),
        }
    }

    let path: Vec<Coordinate> = corridor
        .unwrap_or_default()
        .iter()
        .copied()
        .filter(Coordinate::is_valid)
        .collect();

    if path.len() >= 2 {
        let mut candidates = Vec::new();
        for (student, coordinate) in located {
            match min_distance_point_to_polyline(coordinate, &path) {
                Ok(distance) if distance <= config.corridor_radius_m => {
                    candidates.push(student.clone());
                }
                Ok(_) => unassigned.push(UnassignedStudent::new(
                    student,
                    UnassignedReason::OutsideCorridor,
                )),
                Err(_) => unassigned.push(UnassignedStudent::new(
                    student,
                    UnassignedReason::InvalidCoordinates,
                )),
            }
        }
        return FilterOutcome {
            candidates,
            unassigned,
            mode: FilterMode::Corridor,
            districts: Vec::new(),
        };
    }

    let districts = resolver.districts_along_route(origin, destination);
    if districts.is_empty() {
        return FilterOutcome {
            candidates: located.into_iter().map(|(student, _)| student.clone()).collect(),
            unassigned,
            mode: FilterMode::Unfiltered,
            districts,
        };
    }

    let mut candidates = Vec::new();
    for (student, _) in located {
        let on_route = resolver
            .extract_district(&student.address)
            .is_some_and(|district| districts.iter().any(|d| d.matches(&district)));
        if on_route {
            candidates.push(student.clone());
        } else {
            unassigned.push(UnassignedStudent::new(
                student,
                UnassignedReason::OutsideDistricts,
            ));
        }
    }

    FilterOutcome {
        candidates,
        unassigned,
        mode: FilterMode::District,
        districts,
    }
}
