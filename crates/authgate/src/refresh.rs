// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session refresh policy: debounce, anonymous bootstrap, refresh fallback.
//!
//! The anonymous branch is the universal safety net. Any time an
//! authenticated refresh cannot succeed (expired or revoked refresh
//! token, server error), the user silently degrades to an anonymous
//! session rather than being stuck with no token at all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::api::{ApiError, AuthApi};
use crate::session::Session;
use crate::store::SessionStore;

/// Buffer between consecutive refresh attempts. Near-simultaneous
/// triggers inside this window collapse into one network call.
pub const LOGIN_BUFFERING_INTERVAL: Duration = Duration::from_millis(100);

/// Decides between minting an anonymous session and refreshing an
/// authenticated one, with a debounce across concurrent triggers.
pub struct RefreshPolicy {
    store: Arc<SessionStore>,
    api: Arc<dyn AuthApi>,
    buffer: Duration,
    /// When the last attempt was issued. Written synchronously before the
    /// attempt's first await point so racing callers observe the window.
    last_attempt: Mutex<Option<Instant>>,
    /// Whether the last attempt ended in error. An errored attempt is
    /// always eligible for immediate retry.
    last_errored: AtomicBool,
}

impl RefreshPolicy {
    pub fn new(store: Arc<SessionStore>, api: Arc<dyn AuthApi>) -> Self {
        Self::with_buffer(store, api, LOGIN_BUFFERING_INTERVAL)
    }

    pub fn with_buffer(store: Arc<SessionStore>, api: Arc<dyn AuthApi>, buffer: Duration) -> Self {
        Self {
            store,
            api,
            buffer,
            last_attempt: Mutex::new(None),
            last_errored: AtomicBool::new(false),
        }
    }

    /// True when the last attempt ended in error.
    pub fn is_errored(&self) -> bool {
        self.last_errored.load(Ordering::Relaxed)
    }

    /// Refresh the session according to its current mode.
    ///
    /// Anonymous sessions mint a fresh anonymous token; failure
    /// propagates (this branch is the fallback). Authenticated sessions
    /// exchange their token pair; on failure the error is logged and the
    /// anonymous flow runs instead, whose own failure still propagates.
    ///
    /// A call landing inside the buffering window after a non-errored
    /// attempt is dropped silently — it does not join the in-flight
    /// attempt, it relies on that attempt resolving the symptom.
    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        {
            let mut last = self.last_attempt.lock();
            let now = Instant::now();
            if let Some(prev) = *last {
                if now.duration_since(prev) < self.buffer && !self.is_errored() {
                    return Ok(());
                }
            }
            *last = Some(now);
        }

        let session = self.store.session();
        let anonymous = !session.as_ref().is_some_and(Session::is_authenticated);

        let result = if anonymous {
            self.create_anonymous_session().await
        } else {
            // Missing fields are sent as empty strings; the service
            // rejects them like any other invalid pair.
            let access_token =
                session.as_ref().and_then(|s| s.access_token.clone()).unwrap_or_default();
            let refresh_token =
                session.as_ref().and_then(|s| s.refresh_token.clone()).unwrap_or_default();

            match self.api.refresh_session(&access_token, &refresh_token).await {
                Ok(token) => {
                    self.store.update(move |prev| {
                        let mut session = prev.unwrap_or_default();
                        session.access_token = Some(token.access_token);
                        Some(session)
                    });
                    Ok(())
                }
                Err(err) => {
                    tracing::error!(err = %err, "session refresh failed, falling back to anonymous");
                    self.create_anonymous_session().await
                }
            }
        };

        self.last_errored.store(result.is_err(), Ordering::Relaxed);
        result
    }

    /// Mint an anonymous token and store it, leaving other fields
    /// untouched. Stale claims are replaced once claims sync refetches
    /// with the new token.
    async fn create_anonymous_session(&self) -> Result<(), ApiError> {
        let token = self.api.create_anonymous_session().await?;
        self.store.update(move |prev| {
            let mut session = prev.unwrap_or_default();
            session.access_token = Some(token.access_token);
            Some(session)
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
