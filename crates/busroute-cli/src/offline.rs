//! Offline suggestion runs from a JSON request file.

use anyhow::{Context, Result};
use busroute_core::{
    decode_polyline, parse_students, Anchor, Coordinate, KeywordDistrictResolver, RouteDirection,
    SuggestionConfig, SuggestionOutcome, SuggestionRun,
};
use serde::Deserialize;
use std::fmt::Write as _;

/// Same shape as the server's suggestion request, minus the network options.
#[derive(Debug, Clone, Deserialize)]
pub struct OfflineRequest {
    pub students: serde_json::Value,
    pub origin: Anchor,
    pub destination: Anchor,
    #[serde(default)]
    pub corridor: Option<Vec<Coordinate>>,
    #[serde(default)]
    pub corridor_polyline: Option<String>,
    #[serde(default)]
    pub config: SuggestionConfig,
}

pub fn run_offline(request: OfflineRequest) -> Result<SuggestionOutcome> {
    let students = parse_students(request.students).context("parsing students")?;
    let corridor = match (request.corridor, request.corridor_polyline) {
        (Some(path), _) => Some(path),
        (None, Some(encoded)) => Some(decode_polyline(&encoded).context("decoding corridor polyline")?),
        (None, None) => None,
    };

    let resolver = KeywordDistrictResolver::default();
    let mut run = SuggestionRun::new(
        students,
        request.origin,
        request.destination,
        request.config,
        &resolver,
    );
    if let Some(path) = corridor {
        run = run.with_corridor(path);
    }
    Ok(run.execute())
}

/// Human-readable overview for review before commit.
pub fn summarize(outcome: &SuggestionOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} routes, {} stops, {} students assigned, {} unassigned ({:?} filter)",
        outcome.routes.len(),
        outcome.stop_count,
        outcome.assigned_count,
        outcome.unassigned.len(),
        outcome.filter_mode
    );
    for route in &outcome.routes {
        let marker = match route.direction {
            RouteDirection::Outbound => "->",
            RouteDirection::Return => "<-",
        };
        let _ = write!(
            out,
            "  {marker} {}: {} stops, {} students",
            route.name,
            route.stops.len(),
            route.student_count
        );
        if !route.warnings.is_empty() {
            let _ = write!(out, " {:?}", route.warnings);
        }
        out.push('\n');
    }
    for unassigned in &outcome.unassigned {
        let _ = writeln!(
            out,
            "  ! {} ({}): {}",
            unassigned.student_id,
            unassigned.name,
            unassigned.reason.as_str()
        );
    }
    out
}
