//! Server configuration from environment.

use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    /// Base URL of an OSRM-compatible directions service.
    pub directions_url: String,
    pub directions_profile: String,
    pub directions_timeout_ms: u64,
    pub directions_max_retries: u32,
    pub directions_backoff_base_ms: u64,
    pub directions_backoff_max_ms: u64,
    pub directions_cache_ttl_s: u64,
    pub directions_cache_max_entries: usize,
    pub estimator_concurrency: usize,
    pub commit_concurrency: usize,
    /// Used for segments the directions service could not route.
    pub average_speed_kmh: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_path: "data/busroute.db".to_string(),
            database_max_connections: 5,
            directions_url: "http://localhost:5000".to_string(),
            directions_profile: "driving".to_string(),
            directions_timeout_ms: 5_000,
            directions_max_retries: 2,
            directions_backoff_base_ms: 200,
            directions_backoff_max_ms: 2_000,
            directions_cache_ttl_s: 900,
            directions_cache_max_entries: 2_048,
            estimator_concurrency: 4,
            commit_concurrency: 4,
            average_speed_kmh: 25.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_env("BUSROUTE_PORT", defaults.server_port),
            database_path: env::var("BUSROUTE_DATABASE_PATH").unwrap_or(defaults.database_path),
            database_max_connections: parse_env(
                "BUSROUTE_DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )
            .max(1),
            directions_url: env::var("BUSROUTE_DIRECTIONS_URL").unwrap_or(defaults.directions_url),
            directions_profile: env::var("BUSROUTE_DIRECTIONS_PROFILE")
                .unwrap_or(defaults.directions_profile),
            directions_timeout_ms: parse_env(
                "BUSROUTE_DIRECTIONS_TIMEOUT_MS",
                defaults.directions_timeout_ms,
            ),
            directions_max_retries: parse_env(
                "BUSROUTE_DIRECTIONS_MAX_RETRIES",
                defaults.directions_max_retries,
            ),
            directions_backoff_base_ms: parse_env(
                "BUSROUTE_DIRECTIONS_BACKOFF_BASE_MS",
                defaults.directions_backoff_base_ms,
            ),
            directions_backoff_max_ms: parse_env(
                "BUSROUTE_DIRECTIONS_BACKOFF_MAX_MS",
                defaults.directions_backoff_max_ms,
            ),
            directions_cache_ttl_s: parse_env(
                "BUSROUTE_DIRECTIONS_CACHE_TTL_S",
                defaults.directions_cache_ttl_s,
            ),
            directions_cache_max_entries: parse_env(
                "BUSROUTE_DIRECTIONS_CACHE_MAX_ENTRIES",
                defaults.directions_cache_max_entries,
            ),
            estimator_concurrency: parse_env(
                "BUSROUTE_ESTIMATOR_CONCURRENCY",
                defaults.estimator_concurrency,
            )
            .max(1),
            commit_concurrency: parse_env(
                "BUSROUTE_COMMIT_CONCURRENCY",
                defaults.commit_concurrency,
            )
            .max(1),
            average_speed_kmh: parse_env("BUSROUTE_AVERAGE_SPEED_KMH", defaults.average_speed_kmh),
        }
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
