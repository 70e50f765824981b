use serde::Serialize;
use utoipa::ToSchema;

use crate::{dao::models::MatchEntity, dto::matches::MatchRecordResponse, state::auth::AuthUser};

/// Event name carried by every match feed message.
pub const MATCH_SNAPSHOT_EVENT: &str = "match.snapshot";
/// Event name carried by every auth stream message.
pub const AUTH_STATE_EVENT: &str = "auth.state";

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already encoded data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Snapshot event pushed on a match feed.
    pub fn match_snapshot(entity: MatchEntity) -> serde_json::Result<Self> {
        Self::json(
            Some(MATCH_SNAPSHOT_EVENT.to_string()),
            &MatchRecordResponse::from(entity),
        )
    }

    /// Session state pushed on an auth stream.
    pub fn auth_state(user: Option<AuthUser>) -> serde_json::Result<Self> {
        Self::json(Some(AUTH_STATE_EVENT.to_string()), &AuthStateEvent { user })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Payload of the `auth.state` event: the signed-in user or `null` once signed out.
pub struct AuthStateEvent {
    pub user: Option<AuthUser>,
}
