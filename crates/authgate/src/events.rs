// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation feed and unauthorized-event watching.
//!
//! The host application's data-fetching layer reports every terminal
//! operation outcome (queries and mutations travel on independent
//! streams, mirroring the host cache's split) into an [`OperationFeed`].
//! A watcher classifies terminal errors and fires a hook once per
//! outcome that is a 401-equivalent. Non-auth errors never fire.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::api::ApiError;

/// Which host cache an outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// Terminal outcome of one in-flight operation.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub kind: OperationKind,
    /// Terminal error, if the operation failed.
    pub error: Option<ApiError>,
}

impl OperationOutcome {
    pub fn query(error: Option<ApiError>) -> Self {
        Self { kind: OperationKind::Query, error }
    }

    pub fn mutation(error: Option<ApiError>) -> Self {
        Self { kind: OperationKind::Mutation, error }
    }
}

/// Completion feed mirroring the host cache's two independent streams.
///
/// Cheap to clone; clones report into the same streams.
#[derive(Clone)]
pub struct OperationFeed {
    query_tx: broadcast::Sender<OperationOutcome>,
    mutation_tx: broadcast::Sender<OperationOutcome>,
}

impl OperationFeed {
    pub fn new() -> Self {
        let (query_tx, _) = broadcast::channel(64);
        let (mutation_tx, _) = broadcast::channel(64);
        Self { query_tx, mutation_tx }
    }

    /// Report a terminal outcome. Delivery is fire-and-forget; outcomes
    /// reported with no watcher subscribed are dropped.
    pub fn report(&self, outcome: OperationOutcome) {
        let tx = match outcome.kind {
            OperationKind::Query => &self.query_tx,
            OperationKind::Mutation => &self.mutation_tx,
        };
        let _ = tx.send(outcome);
    }

    pub fn subscribe_queries(&self) -> broadcast::Receiver<OperationOutcome> {
        self.query_tx.subscribe()
    }

    pub fn subscribe_mutations(&self) -> broadcast::Receiver<OperationOutcome> {
        self.mutation_tx.subscribe()
    }
}

impl Default for OperationFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Hook invoked once per unauthorized completion.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Spawn one watcher task per stream. Each invokes `hook` exactly once
/// per observed outcome whose terminal error is classified unauthorized.
/// Tasks exit when `cancel` fires or the feed is dropped.
pub fn spawn_unauthorized_watcher(
    feed: &OperationFeed,
    cancel: CancellationToken,
    hook: UnauthorizedHook,
) {
    for rx in [feed.subscribe_queries(), feed.subscribe_mutations()] {
        let hook = Arc::clone(&hook);
        let cancel = cancel.clone();
        tokio::spawn(watch_stream(rx, cancel, hook));
    }
}

async fn watch_stream(
    mut rx: broadcast::Receiver<OperationOutcome>,
    cancel: CancellationToken,
    hook: UnauthorizedHook,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            res = rx.recv() => match res {
                Ok(outcome) => {
                    if outcome.error.as_ref().is_some_and(ApiError::is_unauthorized) {
                        hook();
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "unauthorized watcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
