// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle controller.
//!
//! Composes the store, the unauthorized-event watcher, the refresh
//! policy, and claims sync. On spawn it hydrates the store from
//! persistent storage, bootstraps an anonymous session when none exists,
//! and from then on answers every unauthorized completion in the host's
//! request cache with a (debounced) session refresh.
//!
//! The rendering gate is `status()`: content stays suppressed while no
//! access token exists; an anonymous token is enough to unblock it, even
//! with claims still resolving. Callers needing a real user check the
//! private gate instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, AuthApi};
use crate::claims::{spawn_claims_sync, spawn_refresh_token_fetch};
use crate::events::{spawn_unauthorized_watcher, OperationFeed};
use crate::refresh::{RefreshPolicy, LOGIN_BUFFERING_INTERVAL};
use crate::store::SessionStore;

/// Controller tuning knobs.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Buffer between consecutive refresh attempts.
    pub refresh_buffer: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { refresh_buffer: LOGIN_BUFFERING_INTERVAL }
    }
}

/// What the host should render right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// No access token yet; show a loading placeholder.
    Loading,
    /// The last acquisition attempt failed; show a retry affordance.
    Error,
    /// An access token exists; render content.
    Ready,
}

/// Client-side session lifecycle controller.
///
/// Dropping the controller (or calling [`shutdown`](Self::shutdown))
/// tears down every background task and subscription.
pub struct SessionController {
    store: Arc<SessionStore>,
    policy: Arc<RefreshPolicy>,
    cancel: CancellationToken,
}

impl SessionController {
    /// Hydrate the store and spawn the lifecycle tasks.
    pub fn spawn(
        store: Arc<SessionStore>,
        api: Arc<dyn AuthApi>,
        feed: OperationFeed,
        config: ControllerConfig,
    ) -> Self {
        let policy = Arc::new(RefreshPolicy::with_buffer(
            Arc::clone(&store),
            Arc::clone(&api),
            config.refresh_buffer,
        ));
        let cancel = CancellationToken::new();

        // One-time storage read; `synced` flips true whatever the outcome.
        store.hydrate();

        // Unauthorized completions anywhere in the host cache kick the
        // refresher. The hook only enqueues, so the watcher never blocks;
        // queued kicks collapse in the policy's buffering window.
        let (kick_tx, kick_rx) = mpsc::unbounded_channel();
        spawn_unauthorized_watcher(
            &feed,
            cancel.clone(),
            Arc::new(move || {
                let _ = kick_tx.send(());
            }),
        );
        Self::spawn_refresher(Arc::clone(&policy), kick_rx, cancel.clone());

        spawn_claims_sync(
            Arc::clone(&store),
            Arc::clone(&api),
            feed.clone(),
            cancel.clone(),
        );
        spawn_refresh_token_fetch(Arc::clone(&store), api, feed, cancel.clone());

        Self::spawn_bootstrap(Arc::clone(&store), Arc::clone(&policy), cancel.clone());

        Self { store, policy, cancel }
    }

    /// Drain unauthorized kicks into refresh attempts.
    fn spawn_refresher(
        policy: Arc<RefreshPolicy>,
        mut kick_rx: mpsc::UnboundedReceiver<()>,
        cancel: CancellationToken,
    ) {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    kick = kick_rx.recv() => {
                        if kick.is_none() {
                            break;
                        }
                        if let Err(err) = policy.refresh_session().await {
                            tracing::error!(err = %err, "session refresh after unauthorized failed");
                        }
                    }
                }
            }
        });
    }

    /// Mint an anonymous session whenever the store is synced and empty.
    ///
    /// Covers the initial bootstrap and re-acquisition after logout. The
    /// errored guard keeps a failed bootstrap from re-triggering until
    /// something changes (typically a manual retry).
    fn spawn_bootstrap(
        store: Arc<SessionStore>,
        policy: Arc<RefreshPolicy>,
        cancel: CancellationToken,
    ) {
        let mut rx = store.subscribe();
        tokio::spawn(async move {
            loop {
                let (synced, empty) = {
                    let state = rx.borrow_and_update();
                    (state.synced, state.session.is_none())
                };

                if synced && empty && !policy.is_errored() {
                    if let Err(err) = policy.refresh_session().await {
                        tracing::error!(err = %err, "anonymous session bootstrap failed");
                    }
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

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// True when the last acquisition attempt failed.
    pub fn is_errored(&self) -> bool {
        self.policy.is_errored()
    }

    /// The rendering gate. A token makes the session `Ready` even while
    /// an old error flag lingers or claims are still resolving.
    pub fn status(&self) -> GateStatus {
        if !self.store.access_token().is_empty() {
            GateStatus::Ready
        } else if self.policy.is_errored() {
            GateStatus::Error
        } else {
            GateStatus::Loading
        }
    }

    /// Resolve once an access token exists.
    pub async fn wait_ready(&self) {
        let mut rx = self.store.subscribe();
        loop {
            let ready = rx
                .borrow_and_update()
                .session
                .as_ref()
                .and_then(|s| s.access_token.as_deref())
                .is_some_and(|t| !t.is_empty());
            if ready || rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Manual retry affordance: runs the refresh policy directly, subject
    /// to the same debounce as every other trigger.
    pub async fn retry(&self) -> Result<(), ApiError> {
        self.policy.refresh_session().await
    }

    /// Cancel all background tasks and subscriptions.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
