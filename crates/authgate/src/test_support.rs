// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes for unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{ApiError, AuthApi, TokenResponse};
use crate::session::Claims;

/// Scripted auth service. Counts calls, optionally fails or delays them.
///
/// Anonymous tokens are minted as `anon-N`; refreshed tokens as
/// `refreshed-N`; refresh tokens as `rt-N`. `check_session` returns
/// identity-less claims for `anon-*` tokens and user claims otherwise,
/// mirroring the real service's behavior for anonymous tokens.
#[derive(Default)]
pub struct FakeApi {
    pub anonymous_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub check_calls: AtomicU32,
    pub new_refresh_token_calls: AtomicU32,

    pub fail_anonymous: AtomicBool,
    pub fail_refresh: AtomicBool,
    pub fail_check: Mutex<Option<ApiError>>,
    pub fail_new_refresh_token: AtomicBool,

    /// Applied before each call resolves, to keep attempts in flight.
    pub delay: Mutex<Duration>,
    /// Arguments of the most recent `refresh_session` call.
    pub last_refresh_args: Mutex<Option<(String, String)>>,

    seq: AtomicU32,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AuthApi for FakeApi {
    async fn create_anonymous_session(&self) -> Result<TokenResponse, ApiError> {
        self.anonymous_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        if self.fail_anonymous.load(Ordering::Relaxed) {
            return Err(ApiError::Server("anonymous session unavailable".into()));
        }
        Ok(TokenResponse { access_token: format!("anon-{}", self.next_seq()) })
    }

    async fn refresh_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_refresh_args.lock() =
            Some((access_token.to_owned(), refresh_token.to_owned()));
        self.pause().await;
        if self.fail_refresh.load(Ordering::Relaxed) {
            return Err(ApiError::Forbidden);
        }
        Ok(TokenResponse { access_token: format!("refreshed-{}", self.next_seq()) })
    }

    async fn check_session(&self, access_token: &str) -> Result<Claims, ApiError> {
        self.check_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        if let Some(err) = self.fail_check.lock().clone() {
            return Err(err);
        }
        if access_token.starts_with("anon-") {
            Ok(Claims { user_id: None, roles: vec!["auth:anon".into()], refresh_token_id: None })
        } else {
            Ok(Claims {
                user_id: Some("00000000-0000-0000-0000-000000000001".into()),
                roles: vec!["auth:user".into()],
                refresh_token_id: None,
            })
        }
    }

    async fn new_refresh_token(&self, _access_token: &str) -> Result<String, ApiError> {
        self.new_refresh_token_calls.fetch_add(1, Ordering::Relaxed);
        self.pause().await;
        if self.fail_new_refresh_token.load(Ordering::Relaxed) {
            return Err(ApiError::Forbidden);
        }
        Ok(format!("rt-{}", self.next_seq()))
    }
}

/// Install a test subscriber so `RUST_LOG=debug` surfaces task logs.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll until `cond` holds, failing after one second.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> anyhow::Result<()> {
    for _ in 0..200 {
        if cond() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("condition not reached within 1s")
}
