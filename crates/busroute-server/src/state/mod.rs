//! Shared application state.

use crate::cancel::CancelToken;
use crate::committer::BatchCommitter;
use crate::config::Config;
use crate::directions::DirectionsProvider;
use crate::estimator::EstimatorSettings;
use crate::persistence::{Database, SqliteStorage};
use busroute_core::{DistrictResolver, KeywordDistrictResolver};
use std::sync::Arc;

/// Everything a request handler needs. Holds no per-run data.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub committer: BatchCommitter,
    /// `None` disables corridor fetching and estimation.
    pub directions: Option<Arc<dyn DirectionsProvider>>,
    pub resolver: Arc<dyn DistrictResolver>,
    pub estimator: EstimatorSettings,
    /// Cancelled once on shutdown; in-flight runs observe it.
    pub shutdown: CancelToken,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let committer = BatchCommitter::new(
            Arc::new(SqliteStorage::new(&db)),
            config.commit_concurrency,
        );
        Self {
            estimator: EstimatorSettings::from_config(&config),
            committer,
            db,
            config,
            directions: None,
            resolver: Arc::new(KeywordDistrictResolver::default()),
            shutdown: CancelToken::new(),
        }
    }

    pub fn with_directions(mut self, directions: Arc<dyn DirectionsProvider>) -> Self {
        self.directions = Some(directions);
        self
    }
}
