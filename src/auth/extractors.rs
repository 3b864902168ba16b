use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::{repo_types::User, services::authenticate};
use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// The authenticated user for the current request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    // Read Authorization header
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

    // Expect "Bearer <token>"
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))
}

/// Gate for every non-public route: rejects the request unless it carries a
/// valid access token, and stashes the user for handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?.to_owned();
    let user = authenticate(&state, &token).await?;
    req.extensions_mut().insert(AuthUser(user));
    Ok(next.run(req).await)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        let token = bearer_token(&parts.headers)?;
        let user = authenticate(state, token).await?;
        Ok(AuthUser(user))
    }
}
