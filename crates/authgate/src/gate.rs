// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Private-session gate: blocks content until a real user is resolved.
//!
//! An anonymous token is enough for the lifecycle controller's gate;
//! this one additionally requires a resolved user identity, and steers
//! the host's auth-form selection as a one-way signal. It never reads
//! the form state back.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::session::Session;
use crate::store::SessionStore;

/// Auth form the host can be told to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthForm {
    Login,
    Register,
    ResetPassword,
}

/// One-way signal into the host's form-selection context.
pub trait FormSelector: Send + Sync {
    /// `Some(form)` shows the given form; `None` clears the selection.
    fn select_form(&self, form: Option<AuthForm>);
}

/// Accessible iff storage sync has completed and the session carries a
/// user identity. Anonymous and token-without-claims sessions are not
/// accessible.
pub fn accessible(session: Option<&Session>, synced: bool) -> bool {
    synced && session.is_some_and(Session::is_authenticated)
}

/// Observes the store and keeps the host's form selection in line with
/// accessibility.
pub struct PrivateGate {
    store: Arc<SessionStore>,
    cancel: CancellationToken,
}

impl PrivateGate {
    /// Spawn the gate task. Before sync nothing is signalled (no login
    /// form flashing while hydration is pending); afterwards, every
    /// accessibility change emits `Some(Login)` or `None`.
    pub fn spawn(store: Arc<SessionStore>, selector: Arc<dyn FormSelector>) -> Self {
        let cancel = CancellationToken::new();
        let mut rx = store.subscribe();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut last_signal: Option<Option<AuthForm>> = None;
            loop {
                let signal = {
                    let state = rx.borrow_and_update();
                    if state.synced {
                        if accessible(state.session.as_ref(), state.synced) {
                            Some(None)
                        } else {
                            Some(Some(AuthForm::Login))
                        }
                    } else {
                        None
                    }
                };

                if let Some(signal) = signal {
                    if last_signal != Some(signal) {
                        last_signal = Some(signal);
                        selector.select_form(signal);
                    }
                }

                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        Self { store, cancel }
    }

    /// Whether the wrapped content may render right now.
    pub fn accessible(&self) -> bool {
        accessible(self.store.session().as_ref(), self.store.synced())
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PrivateGate {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
