use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use busroute_core::Coordinate;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::directions::{DirectionsError, DirectionsLeg, DirectionsProvider, TravelMode};
use crate::{api, config::Config, persistence, state::AppState};

/// Straight corridor along latitude 10.77. Legs ending south of 10.775 fail.
struct StubDirections;

#[async_trait]
impl DirectionsProvider for StubDirections {
    async fn route(
        &self,
        _origin: Coordinate,
        destination: Coordinate,
        _mode: TravelMode,
    ) -> Result<DirectionsLeg, DirectionsError> {
        if destination.lat < 10.775 {
            return Err(DirectionsError::Status(502));
        }
        Ok(DirectionsLeg {
            // (10.77, 106.69) -> (10.77, 106.71)
            polyline: "oov`Ao{djS?_|B".to_string(),
            distance_m: 500.0,
            duration_s: 60.0,
        })
    }
}

async fn setup_app(directions: Option<Arc<dyn DirectionsProvider>>) -> axum::Router {
    let config = Config::default();
    let db = persistence::init_database(":memory:", 1)
        .await
        .expect("init db");
    let mut state = AppState::new(db, config);
    if let Some(directions) = directions {
        state = state.with_directions(directions);
    }
    api::routes().with_state(Arc::new(state))
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn suggestion_body() -> Value {
    json!({
        "students": {
            "data": [
                {"id": 1, "name": "An", "lat": 10.7700, "lng": 106.7000, "address": "12 Lê Lợi, Quận 1"},
                {"id": 2, "name": "Bình", "lat": 10.7702, "lng": 106.7003, "address": "14 Lê Lợi, Quận 1"},
                {"id": 3, "name": "Chi", "address": "Quận 1"},
                {"id": 4, "name": "Dũng", "lat": 10.7300, "lng": 106.7200, "address": "Quận 7"}
            ]
        },
        "origin": {"name": "Trường", "address": "Quận 1", "coordinate": {"lat": 10.7769, "lon": 106.7009}},
        "destination": {"name": "Bãi xe", "address": "Quận 3", "coordinate": {"lat": 10.7840, "lon": 106.6840}},
        "config": {"create_return_routes": true}
    })
}

#[tokio::test]
async fn health_check() {
    let app = setup_app(None).await;
    let res = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn suggest_then_commit_then_read_back() {
    let app = setup_app(None).await;

    let res = app
        .clone()
        .oneshot(post("/v1/suggestions", suggestion_body()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome = read_json(res).await;

    assert_eq!(outcome["filter_mode"], "district");
    assert_eq!(outcome["assigned_count"], 2);
    let routes = outcome["routes"].as_array().unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0]["name"], "Tuyến 1");
    assert_eq!(routes[1]["name"], "Tuyến 1 (Về)");
    assert!(routes[0]["warnings"]
        .as_array()
        .unwrap()
        .contains(&json!("below_target_size")));
    let reasons: Vec<&str> = outcome["unassigned"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["reason"].as_str().unwrap())
        .collect();
    assert!(reasons.contains(&"missing_coordinates"));
    assert!(reasons.contains(&"outside_districts"));

    let res = app
        .clone()
        .oneshot(post(
            "/v1/routes/commit",
            json!({"routes": routes, "mode": "all_or_nothing"}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let result = read_json(res).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["outcomes"][0]["status"], "success");
    let route_id = result["outcomes"][0]["route_id"].as_str().unwrap().to_string();

    let res = app.clone().oneshot(get("/v1/routes")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await.as_array().unwrap().len(), 2);

    let res = app
        .clone()
        .oneshot(get(&format!("/v1/routes/{route_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let route = read_json(res).await;
    assert_eq!(route["name"], "Tuyến 1");
    assert_eq!(route["stops"][0]["kind"], "origin");
    assert_eq!(route["stops"][1]["student_ids"], json!(["1", "2"]));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = setup_app(None).await;
    let res = app.oneshot(get("/v1/routes/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_anchor_is_rejected() {
    let app = setup_app(None).await;
    let mut body = suggestion_body();
    body["origin"]["coordinate"]["lat"] = json!(123.0);
    let res = app.oneshot(post("/v1/suggestions", body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let error = read_json(res).await;
    assert!(error["error"].as_str().unwrap().contains("origin"));
}

#[tokio::test]
async fn empty_commit_is_rejected() {
    let app = setup_app(None).await;
    let res = app
        .oneshot(post("/v1/routes/commit", json!({"routes": []})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fetched_corridor_and_degraded_estimate() {
    let app = setup_app(Some(Arc::new(StubDirections))).await;
    let mut body = suggestion_body();
    body["fetch_corridor"] = json!(true);
    body["estimate"] = json!(true);
    body["config"] = json!({});

    let res = app.oneshot(post("/v1/suggestions", body)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome = read_json(res).await;

    assert_eq!(outcome["filter_mode"], "corridor");
    let route = &outcome["routes"][0];
    assert!(route["distance_m"].as_f64().unwrap() > 0.0);
    assert_eq!(route["used_fallback_estimate"], true);
    assert!(outcome["notices"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["kind"] == "estimation_degraded"));
}

#[tokio::test]
async fn requests_after_shutdown_are_cancelled() {
    let db = persistence::init_database(":memory:", 1)
        .await
        .expect("init db");
    let state = Arc::new(AppState::new(db, Config::default()));
    let app = api::routes().with_state(state.clone());

    let res = app
        .clone()
        .oneshot(post("/v1/suggestions", suggestion_body()))
        .await
        .unwrap();
    let routes = read_json(res).await["routes"].clone();

    state.shutdown.cancel();

    let res = app
        .clone()
        .oneshot(post("/v1/suggestions", suggestion_body()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(read_json(res).await["notices"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["kind"] == "cancelled"));

    let res = app
        .clone()
        .oneshot(post("/v1/routes/commit", json!({"routes": routes})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let result = read_json(res).await;
    assert_eq!(result["outcomes"][0]["status"], "cancelled");
    assert_eq!(result["outcomes"][1]["status"], "cancelled");

    let res = app.oneshot(get("/v1/routes")).await.unwrap();
    assert!(read_json(res).await.as_array().unwrap().is_empty());
}
