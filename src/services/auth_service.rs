use tokio::sync::watch;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dto::auth::{LoginRequest, LoginResponse, SessionResponse},
    error::ServiceError,
    state::{SharedState, auth::AuthUser},
};

const INVALID_CREDENTIALS: &str = "invalid credentials";

/// Check credentials against the configured accounts and open a session.
///
/// Input shape is validated before any lookup. Unknown emails and wrong passwords share
/// one error.
pub fn login(state: &SharedState, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
    request.validate()?;

    let Some(user) = state
        .config()
        .authenticate(&request.email, &request.password)
    else {
        warn!(email = %request.email, "rejected sign-in attempt");
        return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let token = state.sessions().open(user.clone());
    info!(email = %user.email, sessions = state.sessions().len(), "session opened");
    Ok(LoginResponse { token, user })
}

/// End the session behind `token`. Unknown tokens are ignored.
pub fn logout(state: &SharedState, token: &str) {
    if state.sessions().close(token) {
        info!(sessions = state.sessions().len(), "session closed");
    }
}

/// User signed in under `token`, if any.
pub fn current_user(state: &SharedState, token: Option<&str>) -> Option<AuthUser> {
    token.and_then(|token| state.sessions().user(token))
}

/// Same as [`current_user`], wrapped for the `/auth/session` route.
pub fn session(state: &SharedState, token: Option<&str>) -> SessionResponse {
    SessionResponse {
        user: current_user(state, token),
    }
}

/// Resolve the user behind a required token.
pub fn authorize(state: &SharedState, token: Option<&str>) -> Result<AuthUser, ServiceError> {
    let token = token.ok_or_else(|| ServiceError::Unauthorized("missing session token".into()))?;
    state
        .sessions()
        .user(token)
        .ok_or_else(|| ServiceError::Unauthorized("unknown or expired session".into()))
}

/// Watch session changes behind `token`; `None` when the token is not live.
pub fn subscribe(
    state: &SharedState,
    token: Option<&str>,
) -> Option<watch::Receiver<Option<AuthUser>>> {
    token.and_then(|token| state.sessions().watch(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Account, AppConfig},
        state::{AppState, scoreboard::MatchDefaults},
    };

    fn state() -> SharedState {
        AppState::new(AppConfig::new(
            vec![Account {
                email: "umpire@club.test".into(),
                password: "shuttle42".into(),
                display_name: "Chair".into(),
            }],
            MatchDefaults::default(),
        ))
    }

    fn request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn login_opens_a_session() {
        let state = state();
        let response = login(&state, request("umpire@club.test", "shuttle42")).unwrap();
        assert_eq!(response.user.display_name, "Chair");
        assert_eq!(
            current_user(&state, Some(&response.token)),
            Some(response.user.clone())
        );
        assert!(authorize(&state, Some(&response.token)).is_ok());
    }

    #[test]
    fn malformed_input_is_rejected_before_lookup() {
        let state = state();
        let err = login(&state, request("not-an-email", "shuttle42")).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let err = login(&state, request("umpire@club.test", "short")).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(state.sessions().is_empty());
    }

    #[test]
    fn wrong_email_and_wrong_password_look_the_same() {
        let state = state();
        let unknown = login(&state, request("ghost@club.test", "shuttle42")).unwrap_err();
        let wrong = login(&state, request("umpire@club.test", "shuttle43")).unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(wrong, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn logout_notifies_subscribers_with_null() {
        let state = state();
        let token = login(&state, request("umpire@club.test", "shuttle42"))
            .unwrap()
            .token;
        let mut watcher = subscribe(&state, Some(&token)).unwrap();
        assert!(watcher.borrow_and_update().is_some());

        logout(&state, &token);
        watcher.changed().await.unwrap();
        assert!(watcher.borrow().is_none());
        assert_eq!(session(&state, Some(&token)).user, None);
        assert!(authorize(&state, Some(&token)).is_err());

        logout(&state, &token);
        logout(&state, "never-issued");
    }

    #[test]
    fn missing_token_is_unauthorized() {
        let state = state();
        assert!(matches!(
            authorize(&state, None),
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(subscribe(&state, None).is_none());
    }
}
