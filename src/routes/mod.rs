use axum::{Router, http::Uri};

use crate::{error::AppError, state::SharedState};

pub mod auth;
pub mod docs;
pub mod health;
pub mod matches;
pub mod view;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(auth::router())
        .merge(matches::router(state.clone()))
        .merge(view::router());

    api_router
        .merge(docs::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::memory::MemoryMatchStore,
        routes::auth::SESSION_TOKEN_HEADER,
        state::{AppState, auth::AuthUser},
    };

    async fn app() -> (Router, String) {
        let state = AppState::new(AppConfig::default());
        state.set_match_store(Arc::new(MemoryMatchStore::new())).await;
        let token = state.sessions().open(AuthUser {
            email: "umpire@club.test".into(),
            display_name: "Chair".into(),
        });
        (router(state), token)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(SESSION_TOKEN_HEADER, token);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn match_routes_reject_callers_without_a_session() {
        let (app, _) = app().await;

        let (status, body) = send(&app, request(Method::GET, "/matches", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "unauthorized: missing session token");

        let (status, _) = send(&app, request(Method::POST, "/matches", Some("stale"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_token_is_accepted_from_header_or_query() {
        let (app, token) = app().await;

        let (status, body) = send(&app, request(Method::GET, "/matches", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let uri = format!("/matches?token={token}");
        let (status, _) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_paths_get_a_json_not_found() {
        let (app, _) = app().await;
        let (status, body) = send(&app, request(Method::GET, "/nowhere", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "not found: /nowhere"}));
    }

    #[tokio::test]
    async fn malformed_match_ids_are_not_found() {
        let (app, token) = app().await;
        let (status, _) = send(
            &app,
            request(Method::GET, "/matches/not-a-match", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn replacing_players_with_two_servers_is_a_bad_request() {
        let (app, token) = app().await;
        let (status, created) = send(&app, request(Method::POST, "/matches", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_str().unwrap().to_owned();

        let uri = format!("/matches/{id}/sets/nd/players");
        let crowded = json!({
            "players": {
                "a": [{"name": "Ann", "serve": true}, {"name": "Bea", "serve": true}],
                "b": [{"name": "Cid", "serve": false}, {"name": "Dee", "serve": false}]
            }
        });
        let (status, _) = send(&app, request(Method::PUT, &uri, Some(&token), Some(crowded))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let single = json!({
            "players": {
                "a": [{"name": "Ann", "serve": false}, {"name": "Bea", "serve": true}],
                "b": [{"name": "Cid", "serve": false}, {"name": "Dee", "serve": false}]
            }
        });
        let (status, body) = send(&app, request(Method::PUT, &uri, Some(&token), Some(single))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["match"]["set"]["nd"]["player"]["a"][1]["serve"], json!(true));
    }
}
