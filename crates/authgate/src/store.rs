// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session store: in-memory session value mirrored to persistent storage.
//!
//! The store is the only shared mutable resource of the lifecycle. All
//! mutations are synchronous and total-ordered under an internal lock;
//! dependents observe changes through a watch channel instead of polling.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::session::Session;
use crate::storage::SessionStorage;

/// Snapshot of the store observable by dependents.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    /// The active session, if any.
    pub session: Option<Session>,
    /// True once the one-time storage read has completed, regardless of
    /// its outcome.
    pub synced: bool,
}

/// Holds the current session and mirrors every valid value to storage.
pub struct SessionStore {
    state: watch::Sender<StoreState>,
    storage: Arc<dyn SessionStorage>,
    /// Serializes mutations so read-compute-persist-publish is atomic with
    /// respect to other writers.
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self { state, storage, write_lock: Mutex::new(()) }
    }

    /// The active session. `None` when no session is active.
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    /// True once the one-time storage read has completed.
    pub fn synced(&self) -> bool {
        self.state.borrow().synced
    }

    /// The current access token, or an empty string when no session is
    /// active. Dependents use this pervasively to skip null checks.
    pub fn access_token(&self) -> String {
        self.state
            .borrow()
            .session
            .as_ref()
            .and_then(|s| s.access_token.clone())
            .unwrap_or_default()
    }

    /// Observe store changes. Readers inspect the current state via
    /// `borrow_and_update` before waiting, so nothing is missed between
    /// subscription and the first wait.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    /// Replace the session. `None` removes the persisted entry.
    pub fn set(&self, session: Option<Session>) {
        let _guard = self.write_lock.lock();
        self.apply(session);
    }

    /// Reducer-style update: the transform receives the previous session
    /// and returns the next one, applied atomically.
    pub fn update(&self, f: impl FnOnce(Option<Session>) -> Option<Session>) {
        let _guard = self.write_lock.lock();
        let prev = self.state.borrow().session.clone();
        self.apply(f(prev));
    }

    /// Replace the session from a raw JSON value, validating it against
    /// the session schema first. An invalid value is logged and dropped,
    /// and the persisted entry is deleted — an invalid session is never
    /// persisted.
    pub fn set_raw(&self, value: serde_json::Value) {
        match Session::parse(value) {
            Ok(session) => self.set(Some(session)),
            Err(err) => {
                tracing::error!(err = %err, "invalid session");
                let _guard = self.write_lock.lock();
                self.storage.delete();
                self.state.send_modify(|state| state.session = None);
            }
        }
    }

    /// One-time read of the persisted session. A value that fails schema
    /// validation is discarded and its storage entry deleted. `synced`
    /// flips true after this attempt, regardless of outcome. Subsequent
    /// calls are no-ops.
    pub fn hydrate(&self) {
        let _guard = self.write_lock.lock();
        if self.state.borrow().synced {
            return;
        }

        let loaded = self.storage.read().and_then(|raw| {
            match serde_json::from_str::<Session>(&raw) {
                Ok(session) if !session.is_empty() => Some(session),
                Ok(_) => None,
                Err(err) => {
                    tracing::error!(err = %err, "invalid persisted session, discarding");
                    self.storage.delete();
                    None
                }
            }
        });

        self.state.send_modify(|state| {
            state.session = loaded;
            state.synced = true;
        });
    }

    /// Write the in-memory value and mirror it to storage. Caller must
    /// hold `write_lock`.
    fn apply(&self, next: Option<Session>) {
        // An update with an empty session means removal.
        let next = next.filter(|s| !s.is_empty());

        match &next {
            None => self.storage.delete(),
            Some(session) => match serde_json::to_string(session) {
                Ok(json) => {
                    if let Err(err) = self.storage.write(&json) {
                        tracing::warn!(err = %err, "failed to persist session");
                    }
                }
                Err(err) => tracing::warn!(err = %err, "failed to serialize session"),
            },
        }

        self.state.send_modify(|state| state.session = next);
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
