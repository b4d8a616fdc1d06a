// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claims sync: keeps server-asserted claims merged into the store.
//!
//! Fetches are keyed by access token, so a refreshed token naturally
//! triggers a refetch. Outcomes are reported into the operation feed —
//! an unauthorized claims fetch recovers through the same
//! unauthorized-event -> refresh -> new token -> refetch chain as every
//! other operation. There is no internal retry.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::api::AuthApi;
use crate::events::{OperationFeed, OperationOutcome};
use crate::store::SessionStore;

/// Spawn the claims sync task.
///
/// Whenever the store is synced and holds an access token that has not
/// been checked yet, fetch its claims and merge them in. Claims are only
/// ever added or replaced here, never deleted; merging goes through the
/// store's reducer so externally-made session edits are preserved.
pub fn spawn_claims_sync(
    store: Arc<SessionStore>,
    api: Arc<dyn AuthApi>,
    feed: OperationFeed,
    cancel: CancellationToken,
) {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        let mut last_fetched: Option<String> = None;
        loop {
            let (token, synced) = {
                let state = rx.borrow_and_update();
                (
                    state
                        .session
                        .as_ref()
                        .and_then(|s| s.access_token.clone())
                        .unwrap_or_default(),
                    state.synced,
                )
            };

            // Waiting for sync avoids clobbering an in-progress hydration.
            if synced && !token.is_empty() && last_fetched.as_deref() != Some(token.as_str()) {
                last_fetched = Some(token.clone());
                match api.check_session(&token).await {
                    Ok(claims) => {
                        feed.report(OperationOutcome::query(None));
                        store.update(move |prev| {
                            let mut session = prev.unwrap_or_default();
                            session.claims = Some(claims);
                            Some(session)
                        });
                    }
                    Err(err) => {
                        tracing::warn!(err = %err, "claims fetch failed");
                        feed.report(OperationOutcome::query(Some(err)));
                    }
                }
                // The store may have changed under us; re-evaluate.
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Spawn the refresh-token acquisition task.
///
/// An authenticated session that lacks a refresh token gets one issued,
/// once per access token. Failures are logged and not retried until the
/// token changes.
pub fn spawn_refresh_token_fetch(
    store: Arc<SessionStore>,
    api: Arc<dyn AuthApi>,
    feed: OperationFeed,
    cancel: CancellationToken,
) {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        let mut last_requested: Option<String> = None;
        loop {
            let (token, synced, wants_refresh_token) = {
                let state = rx.borrow_and_update();
                let session = state.session.as_ref();
                (
                    session.and_then(|s| s.access_token.clone()).unwrap_or_default(),
                    state.synced,
                    session.is_some_and(|s| s.is_authenticated() && s.refresh_token.is_none()),
                )
            };

            if synced
                && !token.is_empty()
                && wants_refresh_token
                && last_requested.as_deref() != Some(token.as_str())
            {
                last_requested = Some(token.clone());
                match api.new_refresh_token(&token).await {
                    Ok(refresh_token) => {
                        feed.report(OperationOutcome::mutation(None));
                        store.update(move |prev| {
                            let mut session = prev.unwrap_or_default();
                            session.refresh_token = Some(refresh_token);
                            Some(session)
                        });
                    }
                    Err(err) => {
                        tracing::warn!(err = %err, "failed to get refresh token");
                        feed.report(OperationOutcome::mutation(Some(err)));
                    }
                }
                continue;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

#[cfg(test)]
#[path = "claims_tests.rs"]
mod tests;
