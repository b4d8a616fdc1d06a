// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end lifecycle tests against a scripted auth connector.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use authgate::{
    ApiError, AuthApi, Claims, ControllerConfig, FileStorage, GateStatus, OperationFeed,
    OperationOutcome, Session, SessionController, SessionStore, TokenResponse,
};

/// Scripted connector standing in for the remote auth service.
#[derive(Default)]
struct Connector {
    anonymous_calls: AtomicU32,
    refresh_calls: AtomicU32,
    refresh_rejected: AtomicBool,
}

#[async_trait]
impl AuthApi for Connector {
    async fn create_anonymous_session(&self) -> Result<TokenResponse, ApiError> {
        let n = self.anonymous_calls.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(TokenResponse { access_token: format!("anon-{n}") })
    }

    async fn refresh_session(
        &self,
        _access_token: &str,
        _refresh_token: &str,
    ) -> Result<TokenResponse, ApiError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.refresh_rejected.load(Ordering::Relaxed) {
            return Err(ApiError::Forbidden);
        }
        Ok(TokenResponse { access_token: format!("refreshed-{n}") })
    }

    async fn check_session(&self, access_token: &str) -> Result<Claims, ApiError> {
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
        Ok("issued-refresh-token".into())
    }
}

async fn wait_until(mut cond: impl FnMut() -> bool) -> anyhow::Result<()> {
    for _ in 0..200 {
        if cond() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    anyhow::bail!("condition not reached within 1s")
}

#[tokio::test]
async fn cold_start_reaches_anonymous_ready_state() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(SessionStore::new(Arc::new(FileStorage::new(
        dir.path().join("session.json"),
    ))));
    let connector = Arc::new(Connector::default());
    let controller = SessionController::spawn(
        Arc::clone(&store),
        Arc::clone(&connector) as Arc<dyn AuthApi>,
        OperationFeed::new(),
        ControllerConfig::default(),
    );

    controller.wait_ready().await;
    assert_eq!(controller.status(), GateStatus::Ready);
    assert_eq!(connector.anonymous_calls.load(Ordering::Relaxed), 1);

    // Anonymous claims resolve, but the session stays identity-less.
    let probe = Arc::clone(&store);
    wait_until(move || probe.session().is_some_and(|s| s.claims.is_some())).await?;
    assert!(!store.session().is_some_and(|s| s.is_authenticated()));
    Ok(())
}

#[tokio::test]
async fn authenticated_session_survives_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");
    let connector = Arc::new(Connector::default());

    // First run: host logs the user in and a refresh token gets issued.
    {
        let store = Arc::new(SessionStore::new(Arc::new(FileStorage::new(path.clone()))));
        let controller = SessionController::spawn(
            Arc::clone(&store),
            Arc::clone(&connector) as Arc<dyn AuthApi>,
            OperationFeed::new(),
            ControllerConfig::default(),
        );
        controller.wait_ready().await;

        store.set(Some(Session {
            access_token: Some("user-token".into()),
            claims: Some(Claims {
                user_id: Some("00000000-0000-0000-0000-000000000001".into()),
                roles: vec!["auth:user".into()],
                refresh_token_id: None,
            }),
            ..Default::default()
        }));

        let probe = Arc::clone(&store);
        wait_until(move || probe.session().is_some_and(|s| s.refresh_token.is_some())).await?;
        controller.shutdown();
    }

    // Second run: the persisted session hydrates intact, no bootstrap.
    let before = connector.anonymous_calls.load(Ordering::Relaxed);
    let store = Arc::new(SessionStore::new(Arc::new(FileStorage::new(path))));
    let controller = SessionController::spawn(
        Arc::clone(&store),
        Arc::clone(&connector) as Arc<dyn AuthApi>,
        OperationFeed::new(),
        ControllerConfig::default(),
    );
    controller.wait_ready().await;

    let session = store.session().unwrap_or_default();
    assert_eq!(session.access_token.as_deref(), Some("user-token"));
    assert_eq!(session.refresh_token.as_deref(), Some("issued-refresh-token"));
    assert!(session.is_authenticated());
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(connector.anonymous_calls.load(Ordering::Relaxed), before);
    Ok(())
}

#[tokio::test]
async fn revoked_refresh_token_degrades_to_anonymous() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(SessionStore::new(Arc::new(FileStorage::new(
        dir.path().join("session.json"),
    ))));
    store.set(Some(Session {
        access_token: Some("user-token".into()),
        refresh_token: Some("revoked".into()),
        claims: Some(Claims {
            user_id: Some("00000000-0000-0000-0000-000000000001".into()),
            roles: vec!["auth:user".into()],
            refresh_token_id: None,
        }),
    }));

    let connector = Arc::new(Connector::default());
    connector.refresh_rejected.store(true, Ordering::Relaxed);
    let feed = OperationFeed::new();
    let controller = SessionController::spawn(
        Arc::clone(&store),
        Arc::clone(&connector) as Arc<dyn AuthApi>,
        feed.clone(),
        ControllerConfig::default(),
    );
    controller.wait_ready().await;

    // A 401 somewhere in the host app kicks the refresh chain; the
    // rejected refresh silently degrades the user to anonymous.
    feed.report(OperationOutcome::query(Some(ApiError::Unauthorized)));

    let probe = Arc::clone(&store);
    wait_until(move || {
        probe.session().is_some_and(|s| {
            s.access_token.as_deref().is_some_and(|t| t.starts_with("anon-"))
                && !s.is_authenticated()
        })
    })
    .await?;
    assert_eq!(connector.refresh_calls.load(Ordering::Relaxed), 1);
    assert_eq!(connector.anonymous_calls.load(Ordering::Relaxed), 1);
    assert_eq!(controller.status(), GateStatus::Ready);
    Ok(())
}
