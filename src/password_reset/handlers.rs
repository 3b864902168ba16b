use axum::{extract::State, routing::post, Router};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use super::{
    dto::{ForgotPasswordRequest, ForgotPasswordResponse, ResetPasswordRequest},
    services::{generate_token, token_digest},
};
use crate::{
    auth::{
        dto::MessageResponse,
        password::hash_password,
        services::{check_new_password, normalize_email},
    },
    error::{ApiError, ApiResult},
    extract::Json,
    state::AppState,
};

const FORGOT_MESSAGE: &str =
    "If an account exists for this email, password reset instructions have been sent";

pub fn reset_routes() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Answers the same way whether or not the account exists.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<ForgotPasswordResponse>> {
    let email = payload
        .email
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Email is required".into()))?;

    let Some(user) = state.users.find_by_email(&email).await? else {
        debug!("password reset requested for unknown email");
        return Ok(Json(ForgotPasswordResponse {
            message: FORGOT_MESSAGE.into(),
            reset_token: None,
        }));
    };

    let token = generate_token();
    let expires_at = OffsetDateTime::now_utc() + Duration::minutes(state.config.reset.ttl_minutes);
    state
        .resets
        .replace_for_user(user.id, &token_digest(&token), expires_at)
        .await?;
    info!(user_id = user.id, %expires_at, "password reset requested");

    let reset_token = state.config.reset.token_in_response.then_some(token);
    Ok(Json(ForgotPasswordResponse {
        message: FORGOT_MESSAGE.into(),
        reset_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (token, password) = match (payload.token, payload.password) {
        (Some(t), Some(p)) if !t.trim().is_empty() && !p.is_empty() => (t, p),
        _ => {
            return Err(ApiError::Validation(
                "Token and password are required".into(),
            ))
        }
    };
    check_new_password(&password)?;

    let request = state
        .resets
        .take_valid(&token_digest(token.trim()), OffsetDateTime::now_utc())
        .await?
        .ok_or_else(|| {
            warn!("invalid or expired reset token");
            ApiError::Validation("Invalid or expired reset token".into())
        })?;

    let password_hash = hash_password(&password)?;
    state
        .users
        .update_password(request.user_id, &password_hash)
        .await?;

    info!(user_id = request.user_id, "password reset completed");
    Ok(Json(MessageResponse::new("Password has been reset")))
}
