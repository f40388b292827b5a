//! Suggestion requests: ingest, corridor lookup, core run, estimation.

use crate::cancel::CancelToken;
use crate::directions::TravelMode;
use crate::estimator::apply_estimates;
use crate::state::AppState;
use busroute_core::{
    decode_polyline, parse_students, Anchor, Coordinate, GeoError, RunNotice, SuggestionConfig,
    SuggestionOutcome, SuggestionRun,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionRequest {
    /// Student list in any shape accepted by [`parse_students`].
    pub students: serde_json::Value,
    pub origin: Anchor,
    pub destination: Anchor,
    /// Already decoded corridor path.
    #[serde(default)]
    pub corridor: Option<Vec<Coordinate>>,
    /// Encoded corridor polyline, used when `corridor` is absent.
    #[serde(default)]
    pub corridor_polyline: Option<String>,
    /// Ask the directions service for the corridor when none is supplied.
    #[serde(default)]
    pub fetch_corridor: bool,
    /// Fill in distance and duration for every route.
    #[serde(default)]
    pub estimate: bool,
    #[serde(default)]
    pub config: SuggestionConfig,
}

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("unrecognised student list: {0}")]
    InvalidStudents(#[from] serde_json::Error),
    #[error("invalid {which} anchor: {source}")]
    InvalidAnchor {
        which: &'static str,
        #[source]
        source: GeoError,
    },
    #[error("invalid corridor polyline: {0}")]
    InvalidCorridor(#[source] GeoError),
}

pub async fn run_suggestion(
    state: &AppState,
    request: SuggestionRequest,
    cancel: &CancelToken,
) -> Result<SuggestionOutcome, SuggestError> {
    let SuggestionRequest {
        students,
        origin,
        destination,
        corridor,
        corridor_polyline,
        fetch_corridor,
        estimate,
        config,
    } = request;

    let students = parse_students(students)?;
    check_anchor("origin", &origin)?;
    check_anchor("destination", &destination)?;

    let corridor = match (corridor, corridor_polyline) {
        (Some(path), _) => Some(path),
        (None, Some(encoded)) => {
            Some(decode_polyline(&encoded).map_err(SuggestError::InvalidCorridor)?)
        }
        (None, None) if fetch_corridor => fetch_corridor_path(state, &origin, &destination, cancel).await,
        (None, None) => None,
    };

    tracing::info!(
        students = students.len(),
        corridor_points = corridor.as_ref().map_or(0, Vec::len),
        "running route suggestion"
    );

    let mut run = SuggestionRun::new(students, origin, destination, config, state.resolver.as_ref());
    if let Some(path) = corridor {
        run = run.with_corridor(path);
    }
    let mut outcome = run.execute();

    if estimate {
        if let Some(directions) = &state.directions {
            let notices = apply_estimates(
                &mut outcome.routes,
                directions.as_ref(),
                &state.estimator,
                cancel,
            )
            .await;
            outcome.notices.extend(notices);
        }
    }
    if cancel.is_cancelled() {
        outcome.notices.push(RunNotice::Cancelled);
    }

    Ok(outcome)
}

fn check_anchor(which: &'static str, anchor: &Anchor) -> Result<(), SuggestError> {
    busroute_core::spatial::validate(anchor.coordinate)
        .map(|_| ())
        .map_err(|source| SuggestError::InvalidAnchor { which, source })
}

/// Corridor from the directions service; `None` falls back to district filtering.
async fn fetch_corridor_path(
    state: &AppState,
    origin: &Anchor,
    destination: &Anchor,
    cancel: &CancelToken,
) -> Option<Vec<Coordinate>> {
    let directions = state.directions.as_ref()?;
    let leg = tokio::select! {
        leg = directions.route(origin.coordinate, destination.coordinate, TravelMode::Driving) => leg,
        _ = cancel.cancelled() => return None,
    };
    match leg.map_err(|err| err.to_string()).and_then(|leg| {
        decode_polyline(&leg.polyline).map_err(|err| err.to_string())
    }) {
        Ok(path) => Some(path),
        Err(err) => {
            tracing::warn!(error = %err, "corridor lookup failed, using district filter");
            None
        }
    }
}
