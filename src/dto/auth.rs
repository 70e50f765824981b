//! DTOs exchanged by the `/auth` routes.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::state::auth::AuthUser;

/// Credentials submitted to sign in.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6))]
    pub password: String,
}

/// Session issued by a successful sign-in.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque token to send as `x-session-token` or `?token=`.
    pub token: String,
    pub user: AuthUser,
}

/// Current user behind the caller's token, `null` when signed out.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: Option<AuthUser>,
}

/// Token accepted as a query parameter by clients that cannot set headers.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    /// Session token returned by `/auth/login`.
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_checks_email_shape_and_password_length() {
        let ok = LoginRequest {
            email: "umpire@club.test".into(),
            password: "secret".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = LoginRequest {
            email: "umpire".into(),
            password: "short".into(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
