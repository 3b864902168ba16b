use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, CredentialsRequest, MessageResponse, NewAccount, PublicUser,
            RefreshRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::{NewUser, DEFAULT_ROLE},
        services::{check_new_password, is_valid_email, issue_tokens, require_credentials},
    },
    error::{ApiError, ApiResult, RepoError},
    extract::Json,
    state::AppState,
    validation,
};

/// Routes reachable without a token.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_docs).post(login))
        .route("/register", get(register_docs).post(register))
        .route("/refresh", post(refresh))
}

/// Routes behind the auth gate.
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_me))
}

fn user_shape() -> Value {
    json!({ "id": "integer", "email": "string", "roles": "array" })
}

pub async fn login_docs() -> Json<Value> {
    Json(json!({
        "message": "Login endpoint",
        "method": "POST",
        "content-type": "application/json",
        "body": { "email": "string (required)", "password": "string (required)" },
        "responses": {
            "200": { "token": "string", "refreshToken": "string", "user": user_shape() },
            "400": { "message": "Email and password are required" },
            "401": { "message": "Invalid email or password" }
        }
    }))
}

pub async fn register_docs() -> Json<Value> {
    Json(json!({
        "message": "Registration endpoint",
        "method": "POST",
        "content-type": "application/json",
        "body": { "email": "string (required)", "password": "string (required, min 8)" },
        "responses": {
            "201": { "token": "string", "refreshToken": "string", "user": user_shape() },
            "400": { "message": "Email and password are required" },
            "409": { "message": "An account already exists with this email" }
        }
    }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let creds = require_credentials(payload)?;

    validation::check(&NewAccount {
        email: creds.email.clone(),
    })?;
    if !is_valid_email(&creds.email) {
        warn!(email = %creds.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    check_new_password(&creds.password)?;

    // Ensure email is not taken
    if state.users.find_by_email(&creds.email).await?.is_some() {
        warn!(email = %creds.email, "email already registered");
        return Err(ApiError::Conflict(
            "An account already exists with this email".into(),
        ));
    }

    let password_hash = hash_password(&creds.password)?;
    let user = state
        .users
        .create(NewUser {
            email: creds.email,
            password_hash,
            roles: vec![DEFAULT_ROLE.to_string()],
        })
        .await
        .map_err(|e| match e {
            // lost a race with a concurrent registration
            RepoError::UniqueViolation => {
                ApiError::Conflict("An account already exists with this email".into())
            }
            other => other.into(),
        })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    let keys = JwtKeys::from_ref(&state);
    Ok((StatusCode::CREATED, Json(issue_tokens(&keys, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let creds = require_credentials(payload)?;
    let invalid = || ApiError::Unauthorized("Invalid email or password".into());

    let Some(user) = state.users.find_by_email(&creds.email).await? else {
        warn!(email = %creds.email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&creds.password, &user.password_hash)? {
        warn!(email = %creds.email, user_id = user.id, "login invalid password");
        return Err(invalid());
    }

    info!(user_id = user.id, email = %user.email, "user logged in");
    let keys = JwtKeys::from_ref(&state);
    Ok(Json(issue_tokens(&keys, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
    let user_id = claims
        .user_id()
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&keys, user)?))
}

/// Tokens are stateless; the client discards its copy.
#[instrument(skip(user))]
pub async fn logout(AuthUser(user): AuthUser) -> Json<MessageResponse> {
    info!(user_id = user.id, "user logged out");
    Json(MessageResponse::new("Logged out"))
}

#[instrument(skip(user))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_utils::{register, send, test_app};

    #[tokio::test]
    async fn register_then_login() {
        let app = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["roles"], json!(["ROLE_USER"]));
        assert!(body["user"]["id"].is_i64());
        assert!(body["user"].get("password_hash").is_none());

        let (status, body) = send(
            &app,
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "A@X.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "a@x.com");
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let app = test_app();
        register(&app, "a@x.com").await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");

        let (status, _) = send(
            &app,
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "nobody@x.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = test_app();
        register(&app, "dup@x.com").await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/register",
            None,
            Some(json!({ "email": "dup@x.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let app = test_app();
        for path in ["/api/register", "/api/login"] {
            let (status, body) =
                send(&app, "POST", path, None, Some(json!({ "email": "a@x.com" }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
            assert_eq!(body["message"], "Email and password are required");
        }
    }

    #[tokio::test]
    async fn register_rejects_malformed_input() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/api/register",
            None,
            Some(json!({ "email": "b@x.com", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn docs_are_served_on_get() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/login", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], "POST");
        let (status, _) = send(&app, "GET", "/api/register", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn me_and_logout_require_a_signed_token() {
        let app = test_app();
        let auth = register(&app, "me@x.com").await;

        let (status, body) = send(&app, "GET", "/api/me", Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "me@x.com");

        let (status, _) = send(&app, "POST", "/api/logout", Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::OK);

        // A bare user id is not a credential.
        let raw_id = auth.user_id.to_string();
        let (status, body) = send(&app, "GET", "/api/me", Some(&raw_id), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["message"].is_string());

        let (status, _) = send(&app, "POST", "/api/logout", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_issues_a_new_pair() {
        let app = test_app();
        let auth = register(&app, "r@x.com").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/refresh",
            None,
            Some(json!({ "refreshToken": auth.refresh_token })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().expect("token").to_string();
        let (status, _) = send(&app, "GET", "/api/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        // An access token cannot be used to refresh.
        let (status, _) = send(
            &app,
            "POST",
            "/api/refresh",
            None,
            Some(json!({ "refreshToken": auth.token })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn overlong_email_is_a_bad_request() {
        let app = test_app();
        let at_limit = format!("{}@x.com", "a".repeat(174));
        let too_long = format!("{}@x.com", "a".repeat(175));
        assert_eq!(at_limit.len(), 180);

        let (status, body) = send(
            &app,
            "POST",
            "/api/register",
            None,
            Some(json!({ "email": too_long, "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email must be at most 180 characters");

        let (status, _) = send(
            &app,
            "POST",
            "/api/register",
            None,
            Some(json!({ "email": at_limit, "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}
