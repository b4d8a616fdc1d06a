// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote auth service contract and error classification.
//!
//! Transport and serialization belong to the host's connector layer; this
//! module only fixes the operations the session lifecycle depends on.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::Claims;

/// Token payload returned by session creation and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// Errors surfaced by the remote auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 401-equivalent: missing or invalid access token.
    Unauthorized,
    /// 403-equivalent: e.g. an expired or revoked refresh token.
    Forbidden,
    /// Transport-level failure (connection refused, timeout, ...).
    Transport(String),
    /// Any other server-side failure.
    Server(String),
}

impl ApiError {
    /// Classification predicate: should this failure trigger the refresh
    /// policy?
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Transport(_) => "TRANSPORT",
            Self::Server(_) => "SERVER",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized | Self::Forbidden => f.write_str(self.as_str()),
            Self::Transport(msg) | Self::Server(msg) => {
                write!(f, "{}: {msg}", self.as_str())
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// The remote auth service, reduced to the operations the session
/// lifecycle needs.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Mint a fresh anonymous session token.
    async fn create_anonymous_session(&self) -> Result<TokenResponse, ApiError>;

    /// Exchange an access/refresh token pair for a fresh access token.
    async fn refresh_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiError>;

    /// Fetch the claims the server asserts for a token. Anonymous tokens
    /// return claims without a user identity.
    async fn check_session(&self, access_token: &str) -> Result<Claims, ApiError>;

    /// Issue a refresh token for an authenticated session that lacks one.
    async fn new_refresh_token(&self, access_token: &str) -> Result<String, ApiError>;
}
