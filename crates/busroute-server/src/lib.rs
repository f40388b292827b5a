//! Route suggestion server: HTTP API, directions, estimation and commit.

pub mod api;
pub mod backoff;
pub mod cache;
pub mod cancel;
pub mod committer;
pub mod config;
pub mod directions;
pub mod estimator;
pub mod persistence;
pub mod state;
pub mod suggest;
