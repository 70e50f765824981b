use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, Uri},
    response::sse::{Event, Sse},
    routing::{get, post},
};
use futures::Stream;

use crate::{
    dto::auth::{LoginRequest, LoginResponse, SessionResponse, TokenQuery},
    error::AppError,
    services::{auth_service, sse_service},
    state::SharedState,
};

/// Header carrying the session token returned by `/auth/login`.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Read the session token from the header, falling back to the `token` query parameter.
pub fn session_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .or_else(|| {
            Query::<TokenQuery>::try_from_uri(uri)
                .ok()
                .and_then(|Query(query)| query.token)
        })
        .filter(|token| !token.is_empty())
}

/// Sign-in, sign-out and session inspection endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
        .route("/auth/events", get(events))
}

/// Exchange credentials for a session token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 400, description = "Malformed email or short password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    Ok(Json(auth_service::login(&state, payload)?))
}

/// End the caller's session and notify its auth streams.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    params(("x-session-token" = String, Header, description = "Session token issued by /auth/login")),
    responses(
        (status = 200, description = "Signed out", body = SessionResponse),
        (status = 401, description = "No token supplied")
    )
)]
pub async fn logout(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Json<SessionResponse>, AppError> {
    let token = session_token(&headers, &uri)
        .ok_or_else(|| AppError::Unauthorized("missing session token".into()))?;
    auth_service::logout(&state, &token);
    Ok(Json(SessionResponse { user: None }))
}

/// Report the user signed in under the caller's token, or `null`.
#[utoipa::path(
    get,
    path = "/auth/session",
    tag = "auth",
    params(TokenQuery),
    responses((status = 200, description = "Current session", body = SessionResponse))
)]
pub async fn session(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
) -> Json<SessionResponse> {
    let token = session_token(&headers, &uri);
    Json(auth_service::session(&state, token.as_deref()))
}

/// Stream `auth.state` events for the caller's session.
#[utoipa::path(
    get,
    path = "/auth/events",
    tag = "auth",
    params(TokenQuery),
    responses((status = 200, description = "Server-sent `auth.state` events", content_type = "text/event-stream", body = String))
)]
pub async fn events(
    State(state): State<SharedState>,
    headers: HeaderMap,
    uri: Uri,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let token = session_token(&headers, &uri);
    sse_service::auth_stream(auth_service::subscribe(&state, token.as_deref()))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_TOKEN_HEADER, HeaderValue::from_static("from-header"));
        let uri: Uri = "/auth/session?token=from-query".parse().unwrap();
        assert_eq!(
            session_token(&headers, &uri).as_deref(),
            Some("from-header")
        );
        assert_eq!(
            session_token(&HeaderMap::new(), &uri).as_deref(),
            Some("from-query")
        );
    }

    #[test]
    fn absent_or_empty_token_is_none() {
        let uri: Uri = "/auth/session?token=".parse().unwrap();
        assert_eq!(session_token(&HeaderMap::new(), &uri), None);
        let uri: Uri = "/auth/session".parse().unwrap();
        assert_eq!(session_token(&HeaderMap::new(), &uri), None);
    }
}
