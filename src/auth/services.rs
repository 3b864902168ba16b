use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use super::{
    dto::{AuthResponse, CredentialsRequest, PublicUser},
    jwt::JwtKeys,
    password::MIN_PASSWORD_LEN,
    repo_types::User,
};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Email and password pulled out of a request body, both present.
pub(crate) struct Credentials {
    pub email: String,
    pub password: String,
}

pub(crate) fn require_credentials(payload: CredentialsRequest) -> ApiResult<Credentials> {
    match (payload.email, payload.password) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            Ok(Credentials {
                email: normalize_email(&email),
                password,
            })
        }
        _ => Err(ApiError::Validation("Email and password are required".into())),
    }
}

pub(crate) fn check_new_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Signs an access/refresh pair for `user`.
pub(crate) fn issue_tokens(keys: &JwtKeys, user: User) -> ApiResult<AuthResponse> {
    let token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(AuthResponse {
        token,
        refresh_token,
        user: PublicUser::from(user),
    })
}

/// Resolves a bearer token to a live user. Only tokens this server signed
/// are accepted, and the user they name must still exist.
pub(crate) async fn authenticate(state: &AppState, token: &str) -> ApiResult<User> {
    let keys = JwtKeys::from(&state.config.jwt);
    let claims = keys.verify_access(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        ApiError::Unauthorized("Invalid or expired token".into())
    })?;
    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))
}
