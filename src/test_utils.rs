use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{app::build_app, state::AppState};

pub const PASSWORD: &str = "secret123";

pub struct TestAuth {
    pub token: String,
    pub refresh_token: String,
    pub user_id: i64,
}

pub fn test_app() -> Router {
    build_app(AppState::fake())
}

/// Sends one request through the router and decodes the JSON body.
/// An empty body comes back as `Value::Null`.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("build request");
    dispatch(app, req).await
}

/// Like `send`, but posts `raw` verbatim as a JSON-typed body.
pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    raw: &str,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(raw.to_string()))
        .expect("build request");
    dispatch(app, req).await
}

async fn dispatch(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.expect("router is infallible");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

pub async fn register(app: &Router, email: &str) -> TestAuth {
    let (status, body) = send(
        app,
        "POST",
        "/api/register",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    TestAuth {
        token: body["token"].as_str().expect("token").to_string(),
        refresh_token: body["refreshToken"].as_str().expect("refresh token").to_string(),
        user_id: body["user"]["id"].as_i64().expect("user id"),
    }
}

pub async fn create_category(app: &Router, token: &str, name: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/categories",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create category failed: {body}");
    body["id"].as_i64().expect("category id")
}

pub async fn create_product(
    app: &Router,
    token: &str,
    name: &str,
    price: &str,
    category_id: i64,
) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/products",
        Some(token),
        Some(json!({
            "name": name,
            "price": price,
            "stock": 1,
            "categoryId": category_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
    body["id"].as_i64().expect("product id")
}
