use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub(crate) mod services;
mod claims;

/// Public endpoints: login, register, refresh.
pub fn public_router() -> Router<AppState> {
    handlers::auth_routes()
}

/// Endpoints that need an authenticated session.
pub fn session_router() -> Router<AppState> {
    handlers::session_routes()
}
