//! Directions lookups over an OSRM-compatible HTTP service.

use crate::backoff::Backoff;
use crate::cache::TtlCache;
use crate::config::Config;
use async_trait::async_trait;
use busroute_core::Coordinate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    #[default]
    Driving,
    Walking,
}

/// One routed leg between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsLeg {
    /// Encoded polyline, precision 5.
    pub polyline: String,
    pub distance_m: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    Transport(String),
    #[error("directions service returned HTTP {0}")]
    Status(u16),
    #[error("no route between points: {0}")]
    NoRoute(String),
    #[error("invalid directions response: {0}")]
    InvalidResponse(String),
}

impl DirectionsError {
    fn is_retryable(&self) -> bool {
        match self {
            DirectionsError::Transport(_) => true,
            DirectionsError::Status(status) => *status == 429 || *status >= 500,
            DirectionsError::NoRoute(_) | DirectionsError::InvalidResponse(_) => false,
        }
    }
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<DirectionsLeg, DirectionsError>;
}

pub struct OsrmDirections {
    http: reqwest::Client,
    base_url: String,
    driving_profile: String,
    max_retries: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    cache: TtlCache<String, DirectionsLeg>,
}

impl OsrmDirections {
    pub fn from_config(config: &Config) -> Result<Self, DirectionsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.directions_timeout_ms))
            .build()
            .map_err(|err| DirectionsError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base_url: config.directions_url.trim_end_matches('/').to_string(),
            driving_profile: config.directions_profile.clone(),
            max_retries: config.directions_max_retries,
            backoff_base: Duration::from_millis(config.directions_backoff_base_ms),
            backoff_max: Duration::from_millis(config.directions_backoff_max_ms),
            cache: TtlCache::new(
                config.directions_cache_max_entries,
                Duration::from_secs(config.directions_cache_ttl_s),
            ),
        })
    }

    fn profile(&self, mode: TravelMode) -> &str {
        match mode {
            TravelMode::Driving => &self.driving_profile,
            TravelMode::Walking => "foot",
        }
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate, mode: TravelMode) -> String {
        // OSRM takes lon,lat pairs.
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=polyline",
            self.base_url,
            self.profile(mode),
            origin.lon,
            origin.lat,
            destination.lon,
            destination.lat
        )
    }

    async fn fetch_once(&self, url: &str) -> Result<DirectionsLeg, DirectionsError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| DirectionsError::Transport(err.to_string()))?;
        let status = response.status();
        // OSRM answers unroutable pairs with 400 and a JSON body.
        if !status.is_success() && status.as_u16() != 400 {
            return Err(DirectionsError::Status(status.as_u16()));
        }
        let body: OsrmResponse = response
            .json()
            .await
            .map_err(|err| DirectionsError::InvalidResponse(err.to_string()))?;
        parse_osrm_response(body)
    }
}

#[async_trait]
impl DirectionsProvider for OsrmDirections {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<DirectionsLeg, DirectionsError> {
        let url = self.route_url(origin, destination, mode);
        if let Some(leg) = self.cache.get(&url) {
            return Ok(leg);
        }

        let mut backoff = Backoff::new(self.backoff_base, self.backoff_max, self.max_retries);
        loop {
            match self.fetch_once(&url).await {
                Ok(leg) => {
                    self.cache.insert(url, leg.clone());
                    return Ok(leg);
                }
                Err(err) if err.is_retryable() => match backoff.next_delay() {
                    Some(delay) => {
                        tracing::debug!(error = %err, delay_ms = delay.as_millis() as u64, "retrying directions request");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: String,
    distance: f64,
    duration: f64,
}

fn parse_osrm_response(body: OsrmResponse) -> Result<DirectionsLeg, DirectionsError> {
    if body.code != "Ok" {
        return Err(DirectionsError::NoRoute(
            body.message.unwrap_or(body.code),
        ));
    }
    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| DirectionsError::NoRoute("empty route list".to_string()))?;
    if !route.distance.is_finite() || !route.duration.is_finite() {
        return Err(DirectionsError::InvalidResponse(
            "non-finite distance or duration".to_string(),
        ));
    }
    Ok(DirectionsLeg {
        polyline: route.geometry,
        distance_m: route.distance,
        duration_s: route.duration,
    })
}
