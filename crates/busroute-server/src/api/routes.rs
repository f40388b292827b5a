//! REST API routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use busroute_core::SuggestedRoute;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::committer::CommitMode;
use crate::persistence::{list_routes, load_route};
use crate::state::AppState;
use crate::suggest::{run_suggestion, SuggestionRequest};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/suggestions", post(create_suggestion))
        .route("/v1/routes", get(list_committed_routes))
        .route("/v1/routes/commit", post(commit_routes))
        .route("/v1/routes/:route_id", get(get_committed_route))
}

#[derive(Debug, Deserialize)]
struct CommitRequest {
    routes: Vec<SuggestedRoute>,
    #[serde(default)]
    mode: CommitMode,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

async fn create_suggestion(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SuggestionRequest>,
) -> Response {
    let guard = state.shutdown.child();
    match run_suggestion(&state, request, guard.token()).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => error_response(StatusCode::BAD_REQUEST, err),
    }
}

async fn commit_routes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommitRequest>,
) -> Response {
    if request.routes.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no routes to commit");
    }

    // The commit runs on its own task: if the client goes away, the guard drops and
    // routes not yet started are reported cancelled instead of being cut off mid-write.
    let guard = state.shutdown.child();
    let cancel = guard.token().clone();
    let task_state = state.clone();
    let commit = tokio::spawn(async move {
        task_state
            .committer
            .commit(&request.routes, request.mode, &cancel)
            .await
    });

    match commit.await {
        Ok(Ok(result)) => Json(result).into_response(),
        Ok(Err(err)) => {
            tracing::error!(error = %err, "route commit could not start");
            error_response(StatusCode::SERVICE_UNAVAILABLE, err)
        }
        Err(err) => {
            tracing::error!(error = %err, "route commit task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "route commit failed")
        }
    }
}

async fn list_committed_routes(State(state): State<Arc<AppState>>) -> Response {
    match list_routes(state.db.pool()).await {
        Ok(routes) => Json(routes).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to list routes");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to list routes")
        }
    }
}

async fn get_committed_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<String>,
) -> Response {
    match load_route(state.db.pool(), &route_id).await {
        Ok(Some(route)) => Json(route).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "route not found"),
        Err(err) => {
            tracing::error!(error = %err, route_id = %route_id, "failed to load route");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to load route")
        }
    }
}
