//! Persistence layer for committed routes.
//!
//! SQLite via sqlx. Writes go through the [`StorageEngine`] transaction seam;
//! reads are plain queries against the pool.

pub mod db;
pub mod routes;
pub mod storage;

pub use db::{init_database, Database};
pub use routes::{list_routes, load_route, CommittedRoute, CommittedStop, RouteSummary, SqliteStorage};
pub use storage::{StorageEngine, StorageError, StorageTransaction};
