use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::CategoryPatch,
    repo_types::{Category, CategoryDraft},
};
use crate::{
    error::{ApiError, ApiResult, RepoError},
    extract::{Json, Path},
    state::AppState,
    validation,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Category not found".into())
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(state.categories.list().await?))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Category>> {
    let category = state.categories.find(id).await?.ok_or_else(not_found)?;
    Ok(Json(category))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryPatch>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let mut draft = CategoryDraft::default();
    payload.apply(&mut draft);
    validation::check(&draft)?;

    let category = state.categories.insert(&draft).await?;
    info!(category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryPatch>,
) -> ApiResult<Json<Category>> {
    let current = state.categories.find(id).await?.ok_or_else(not_found)?;
    let mut draft = CategoryDraft::from(&current);
    payload.apply(&mut draft);
    validation::check(&draft)?;

    let category = state
        .categories
        .update(id, &draft)
        .await?
        .ok_or_else(not_found)?;
    info!(category_id = id, "category updated");
    Ok(Json(category))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.categories.find(id).await?.ok_or_else(not_found)?;

    match state.categories.delete(id).await {
        Ok(true) => {
            info!(category_id = id, "category deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(not_found()),
        Err(RepoError::ForeignKeyViolation) => {
            warn!(category_id = id, "category still has products");
            Err(ApiError::Validation(
                "This category still has products. Delete or move them before deleting the category."
                    .into(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_utils::{create_category, create_product, register, send, test_app};

    #[tokio::test]
    async fn create_then_fetch_returns_same_fields() {
        let app = test_app();
        let auth = register(&app, "c@x.com").await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/categories",
            Some(&auth.token),
            Some(json!({ "name": "Books", "description": "Paper things" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().expect("id");

        let (status, fetched) =
            send(&app, "GET", &format!("/api/categories/{id}"), Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Books");
        assert_eq!(fetched["description"], "Paper things");

        let (status, list) = send(&app, "GET", "/api/categories", Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn description_is_optional() {
        let app = test_app();
        let auth = register(&app, "c@x.com").await;
        let (status, created) = send(
            &app,
            "POST",
            "/api/categories",
            Some(&auth.token),
            Some(json!({ "name": "Toys" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["description"].is_null());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let app = test_app();
        let auth = register(&app, "c@x.com").await;
        for body in [json!({}), json!({ "name": "   " })] {
            let (status, body) =
                send(&app, "POST", "/api/categories", Some(&auth.token), Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "name must be between 1 and 255 characters");
        }
    }

    #[tokio::test]
    async fn partial_update_keeps_absent_fields() {
        let app = test_app();
        let auth = register(&app, "c@x.com").await;
        let id = create_category(&app, &auth.token, "Books").await;

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/categories/{id}"),
            Some(&auth.token),
            Some(json!({ "description": "Now described" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Books");
        assert_eq!(updated["description"], "Now described");
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let app = test_app();
        let auth = register(&app, "c@x.com").await;
        for method in ["GET", "DELETE"] {
            let (status, body) =
                send(&app, method, "/api/categories/999", Some(&auth.token), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["message"], "Category not found");
        }
        let (status, _) = send(
            &app,
            "PUT",
            "/api/categories/999",
            Some(&auth.token),
            Some(json!({ "name": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_removes_an_unused_category() {
        let app = test_app();
        let auth = register(&app, "c@x.com").await;
        let id = create_category(&app, &auth.token, "Temp").await;

        let (status, _) =
            send(&app, "DELETE", &format!("/api/categories/{id}"), Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) =
            send(&app, "GET", &format!("/api/categories/{id}"), Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_with_products_is_refused_and_keeps_everything() {
        let app = test_app();
        let auth = register(&app, "c@x.com").await;
        let cat = create_category(&app, &auth.token, "Books").await;
        let product = create_product(&app, &auth.token, "Dune", "9.99", cat).await;

        let (status, body) =
            send(&app, "DELETE", &format!("/api/categories/{cat}"), Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("still has products"));

        let (status, _) =
            send(&app, "GET", &format!("/api/categories/{cat}"), Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, fetched) =
            send(&app, "GET", &format!("/api/products/{product}"), Some(&auth.token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["category"]["id"], cat);
    }

    #[tokio::test]
    async fn requires_authentication() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/categories", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Missing Authorization header");
    }
}
