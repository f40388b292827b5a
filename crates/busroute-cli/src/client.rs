//! Blocking HTTP client for the busroute server.

use anyhow::{bail, Context, Result};
use busroute_core::SuggestedRoute;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    routes: &'a [SuggestedRoute],
    mode: &'a str,
}

/// Per-route result as reported by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteOutcome {
    pub route_name: String,
    pub status: String,
    #[serde(default)]
    pub route_id: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitResponse {
    pub outcomes: Vec<RouteOutcome>,
    pub success: bool,
    #[serde(default)]
    pub first_failure: Option<String>,
}

pub struct BusrouteClient {
    client: Client,
    base_url: String,
}

impl BusrouteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `mode` is `best_effort` or `all_or_nothing`.
    pub fn commit_routes(&self, routes: &[SuggestedRoute], mode: &str) -> Result<CommitResponse> {
        let url = format!("{}/v1/routes/commit", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CommitRequest { routes, mode })
            .send()
            .with_context(|| format!("POST {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("server returned {status}: {body}");
        }
        response.json().context("decoding commit response")
    }
}

/// Routes from a reviewed file: a suggestion response or a bare route list.
pub fn routes_from_json(value: serde_json::Value) -> Result<Vec<SuggestedRoute>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RouteFile {
        Bare(Vec<SuggestedRoute>),
        Outcome { routes: Vec<SuggestedRoute> },
    }

    let routes = match serde_json::from_value(value).context("reading routes")? {
        RouteFile::Bare(routes) => routes,
        RouteFile::Outcome { routes } => routes,
    };
    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route_json(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "origin": {"name": "School", "coordinate": {"lat": 10.77, "lon": 106.70}},
            "destination": {"name": "Depot", "coordinate": {"lat": 10.78, "lon": 106.68}},
            "stops": [],
            "student_count": 0
        })
    }

    #[test]
    fn reads_bare_and_wrapped_route_files() {
        let bare = routes_from_json(json!([route_json("A")])).unwrap();
        assert_eq!(bare[0].name, "A");

        let wrapped = routes_from_json(json!({
            "routes": [route_json("B"), route_json("C")],
            "unassigned": []
        }))
        .unwrap();
        assert_eq!(wrapped.len(), 2);
    }

    #[test]
    fn parses_commit_response() {
        let response: CommitResponse = serde_json::from_value(json!({
            "mode": "best_effort",
            "outcomes": [
                {"route_name": "A", "status": "success", "route_id": "r1"},
                {"route_name": "B", "status": "failure", "reason": "constraint"}
            ],
            "success": false,
            "first_failure": "B: constraint"
        }))
        .unwrap();
        assert_eq!(response.outcomes[0].route_id.as_deref(), Some("r1"));
        assert_eq!(response.outcomes[1].reason.as_deref(), Some("constraint"));
    }
}
