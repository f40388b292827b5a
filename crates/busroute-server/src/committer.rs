//! Persist reviewed routes in all-or-nothing or best-effort batches.
//!
//! Every route is written in three phases (header, stops, student assignments)
//! on a single transaction, so a failed route never leaves rows behind.

use crate::cancel::CancelToken;
use crate::persistence::{StorageEngine, StorageError, StorageTransaction};
use busroute_core::{validate_sequence, SuggestedRoute};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// One transaction for the whole batch.
    AllOrNothing,
    /// One transaction per route; failures stay isolated.
    #[default]
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitStatus {
    Success { route_id: String },
    Failure { reason: String },
    /// Not attempted because the batch was cancelled.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCommitOutcome {
    pub route_name: String,
    #[serde(flatten)]
    pub status: CommitStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCommitResult {
    pub mode: CommitMode,
    /// One entry per input route, in input order.
    pub outcomes: Vec<RouteCommitOutcome>,
    pub success: bool,
    pub first_failure: Option<String>,
}

/// Per-route outcomes plus the index of the route whose failure sank the batch.
struct BatchOutcomes {
    outcomes: Vec<RouteCommitOutcome>,
    failed: Option<usize>,
}

impl From<Vec<RouteCommitOutcome>> for BatchOutcomes {
    fn from(outcomes: Vec<RouteCommitOutcome>) -> Self {
        let failed = outcomes
            .iter()
            .position(|outcome| matches!(outcome.status, CommitStatus::Failure { .. }));
        Self { outcomes, failed }
    }
}

impl BatchCommitResult {
    fn from_outcomes(mode: CommitMode, batch: BatchOutcomes) -> Self {
        let BatchOutcomes { outcomes, failed } = batch;
        let success = outcomes
            .iter()
            .all(|outcome| matches!(outcome.status, CommitStatus::Success { .. }));
        let first_failure = failed
            .and_then(|index| outcomes.get(index))
            .and_then(|outcome| match &outcome.status {
                CommitStatus::Failure { reason } => {
                    Some(format!("{}: {}", outcome.route_name, reason))
                }
                _ => None,
            });
        Self {
            mode,
            outcomes,
            success,
            first_failure,
        }
    }

    pub fn committed_route_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                CommitStatus::Success { route_id } => Some(route_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("could not open commit transaction: {0}")]
    TransactionUnavailable(#[source] StorageError),
}

pub struct BatchCommitter {
    storage: Arc<dyn StorageEngine>,
    concurrency: usize,
}

impl BatchCommitter {
    pub fn new(storage: Arc<dyn StorageEngine>, concurrency: usize) -> Self {
        Self {
            storage,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn commit(
        &self,
        routes: &[SuggestedRoute],
        mode: CommitMode,
        cancel: &CancelToken,
    ) -> Result<BatchCommitResult, CommitError> {
        let outcomes: BatchOutcomes = match mode {
            CommitMode::AllOrNothing => self.commit_all_or_nothing(routes, cancel).await?,
            CommitMode::BestEffort => self.commit_best_effort(routes, cancel).await.into(),
        };
        let result = BatchCommitResult::from_outcomes(mode, outcomes);
        tracing::info!(
            mode = ?mode,
            routes = routes.len(),
            committed = result.committed_route_ids().len(),
            success = result.success,
            "route batch commit finished"
        );
        Ok(result)
    }

    async fn commit_best_effort(
        &self,
        routes: &[SuggestedRoute],
        cancel: &CancelToken,
    ) -> Vec<RouteCommitOutcome> {
        // Collected first: a lazily mapped stream is not Send-general enough for axum handlers.
        let pending: Vec<_> = routes
            .iter()
            .enumerate()
            .map(|(index, route)| self.commit_indexed(index, route, cancel))
            .collect();
        let mut indexed: Vec<(usize, RouteCommitOutcome)> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn commit_indexed(
        &self,
        index: usize,
        route: &SuggestedRoute,
        cancel: &CancelToken,
    ) -> (usize, RouteCommitOutcome) {
        let status = if cancel.is_cancelled() {
            CommitStatus::Cancelled
        } else if let Err(err) = validate_sequence(route) {
            CommitStatus::Failure {
                reason: format!("invalid stop sequence: {err}"),
            }
        } else {
            self.commit_one(route).await
        };
        (index, outcome(route, status))
    }

    async fn commit_one(&self, route: &SuggestedRoute) -> CommitStatus {
        let mut tx = match self.storage.begin().await {
            Ok(tx) => tx,
            Err(err) => {
                return CommitStatus::Failure {
                    reason: err.to_string(),
                }
            }
        };

        match write_route(tx.as_mut(), route).await {
            Ok(route_id) => match tx.commit().await {
                Ok(()) => CommitStatus::Success { route_id },
                Err(err) => CommitStatus::Failure {
                    reason: err.to_string(),
                },
            },
            Err(err) => {
                tracing::warn!(route = %route.name, error = %err, "route write failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(route = %route.name, error = %rollback_err, "rollback failed");
                }
                CommitStatus::Failure {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn commit_all_or_nothing(
        &self,
        routes: &[SuggestedRoute],
        cancel: &CancelToken,
    ) -> Result<BatchOutcomes, CommitError> {
        if cancel.is_cancelled() {
            return Ok(all_with(routes, CommitStatus::Cancelled).into());
        }

        for (index, route) in routes.iter().enumerate() {
            if let Err(err) = validate_sequence(route) {
                return Ok(rolled_back(routes, index, format!("invalid stop sequence: {err}")));
            }
        }

        let mut tx = self
            .storage
            .begin()
            .await
            .map_err(CommitError::TransactionUnavailable)?;

        let mut route_ids = Vec::with_capacity(routes.len());
        for (index, route) in routes.iter().enumerate() {
            if cancel.is_cancelled() {
                discard(tx).await;
                return Ok(all_with(routes, CommitStatus::Cancelled).into());
            }
            match write_route(tx.as_mut(), route).await {
                Ok(route_id) => route_ids.push(route_id),
                Err(err) => {
                    tracing::warn!(route = %route.name, error = %err, "route write failed, rolling back batch");
                    discard(tx).await;
                    return Ok(rolled_back(routes, index, err.to_string()));
                }
            }
        }

        if let Err(err) = tx.commit().await {
            return Ok(all_with(
                routes,
                CommitStatus::Failure {
                    reason: format!("batch commit failed: {err}"),
                },
            )
            .into());
        }

        Ok(routes
            .iter()
            .zip(route_ids)
            .map(|(route, route_id)| outcome(route, CommitStatus::Success { route_id }))
            .collect::<Vec<_>>()
            .into())
    }
}

/// Header, then stops in sequence, then each stop's students.
async fn write_route(
    tx: &mut dyn StorageTransaction,
    route: &SuggestedRoute,
) -> Result<String, StorageError> {
    let route_id = tx.create_route(route).await?;
    for stop in &route.stops {
        let stop_row_id = tx.create_stop(&route_id, stop).await?;
        if !stop.student_ids.is_empty() {
            tx.assign_students_to_stop(&stop_row_id, &stop.student_ids)
                .await?;
        }
    }
    Ok(route_id)
}

async fn discard(tx: Box<dyn StorageTransaction>) {
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "batch rollback failed");
    }
}

fn outcome(route: &SuggestedRoute, status: CommitStatus) -> RouteCommitOutcome {
    RouteCommitOutcome {
        route_name: route.name.clone(),
        status,
    }
}

fn all_with(routes: &[SuggestedRoute], status: CommitStatus) -> Vec<RouteCommitOutcome> {
    routes
        .iter()
        .map(|route| outcome(route, status.clone()))
        .collect()
}

/// The route at `failed` carries `reason`; every other route reports the rollback.
fn rolled_back(routes: &[SuggestedRoute], failed: usize, reason: String) -> BatchOutcomes {
    let failed_name = routes[failed].name.clone();
    let outcomes = routes
        .iter()
        .enumerate()
        .map(|(index, route)| {
            let reason = if index == failed {
                reason.clone()
            } else {
                format!("rolled back: route {failed_name:?} failed")
            };
            outcome(route, CommitStatus::Failure { reason })
        })
        .collect();
    BatchOutcomes {
        outcomes,
        failed: Some(failed),
    }
}
