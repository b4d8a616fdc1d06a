// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session data model: token pair plus decoded claims.
//!
//! Serialized field names match the auth service wire format
//! (`accessToken`, `claims.userID`, ...) so a persisted session written
//! by one client hydrates unchanged in another.

use serde::{Deserialize, Serialize};

/// Server-asserted facts about a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity of the authenticated user. Absent for anonymous tokens.
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Roles granted to the token.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Identifier of the refresh token this access token was minted from.
    #[serde(rename = "refreshTokenID", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_id: Option<String>,
}

/// The active session for the current user.
///
/// A session with `claims.user_id` set is authenticated; one without it
/// (even with an access token) is anonymous. An anonymous session never
/// legitimately carries a refresh token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque bearer token. Absent before first acquisition.
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Opaque refresh token. Present only for authenticated sessions that
    /// have successfully retrieved one.
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Decoded claims. Absent means anonymous or not yet resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<Claims>,
}

impl Session {
    /// True when the session carries a resolved user identity.
    pub fn is_authenticated(&self) -> bool {
        self.claims.as_ref().is_some_and(|c| c.user_id.is_some())
    }

    /// True when no field is populated. An empty session is treated as absent.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.claims.is_none()
    }

    /// Validate a raw JSON value against the session schema.
    ///
    /// Unknown keys are stripped; a wrong-typed field (e.g. a numeric
    /// `accessToken`) rejects the whole value.
    pub fn parse(value: serde_json::Value) -> anyhow::Result<Session> {
        let session: Session = serde_json::from_value(value)?;
        Ok(session)
    }
}
