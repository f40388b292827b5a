//! One suggestion request, from raw students to reviewable routes.

use crate::clustering::cluster_students;
use crate::config::SuggestionConfig;
use crate::district::DistrictResolver;
use crate::error::RunNotice;
use crate::filter::{filter_students, FilterMode};
use crate::models::{Anchor, Coordinate, Student, SuggestedRoute, UnassignedStudent};
use crate::splitter::split_routes;
use serde::{Deserialize, Serialize};

/// Context for a single run.
///
/// Owns its inputs; nothing is shared with other runs.
pub struct SuggestionRun<'r> {
    students: Vec<Student>,
    origin: Anchor,
    destination: Anchor,
    corridor: Option<Vec<Coordinate>>,
    config: SuggestionConfig,
    resolver: &'r dyn DistrictResolver,
}

/// Routes plus diagnostics for everything that could not be routed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionOutcome {
    pub routes: Vec<SuggestedRoute>,
    pub unassigned: Vec<UnassignedStudent>,
    pub filter_mode: FilterMode,
    pub stop_count: usize,
    pub assigned_count: usize,
    #[serde(default)]
    pub notices: Vec<RunNotice>,
}

impl<'r> SuggestionRun<'r> {
    pub fn new(
        students: Vec<Student>,
        origin: Anchor,
        destination: Anchor,
        config: SuggestionConfig,
        resolver: &'r dyn DistrictResolver,
    ) -> Self {
        Self {
            students,
            origin,
            destination,
            corridor: None,
            config: config.normalized(),
            resolver,
        }
    }

    pub fn with_corridor(mut self, corridor: Vec<Coordinate>) -> Self {
        self.corridor = Some(corridor);
        self
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// Filter, cluster and split.
    pub fn execute(&self) -> SuggestionOutcome {
        let filtered = filter_students(
            &self.students,
            &self.origin,
            &self.destination,
            self.corridor.as_deref(),
            self.resolver,
            &self.config,
        );
        tracing::debug!(
            mode = ?filtered.mode,
            candidates = filtered.candidates.len(),
            excluded = filtered.unassigned.len(),
            "student filter complete"
        );

        let mut unassigned = filtered.unassigned;
        let mut notices = Vec::new();
        if filtered.candidates.is_empty() {
            notices.push(RunNotice::NoCandidatesFound {
                stage: "filter".into(),
            });
            return SuggestionOutcome {
                routes: Vec::new(),
                unassigned,
                filter_mode: filtered.mode,
                stop_count: 0,
                assigned_count: 0,
                notices,
            };
        }

        let clustered = cluster_students(&filtered.candidates, &self.config);
        let assigned_count = clustered.assigned_count();
        unassigned.extend(clustered.unassigned);
        if clustered.stops.is_empty() {
            notices.push(RunNotice::NoCandidatesFound {
                stage: "clustering".into(),
            });
        }

        let routes = split_routes(
            &clustered.stops,
            &self.origin,
            &self.destination,
            &self.config,
        );
        tracing::debug!(
            stops = clustered.stops.len(),
            routes = routes.len(),
            unassigned = unassigned.len(),
            "route split complete"
        );

        SuggestionOutcome {
            routes,
            unassigned,
            filter_mode: filtered.mode,
            stop_count: clustered.stops.len(),
            assigned_count,
            notices,
        }
    }
}
