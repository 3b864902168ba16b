use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{debug, info, instrument};

use super::{
    dto::{ListProductsParams, Paginated, ProductPatch},
    query::ProductQuery,
    repo_types::{Product, ProductDraft, ProductInput},
};
use crate::{
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Product not found".into())
}

async fn ensure_category_exists(state: &AppState, input: &ProductInput) -> ApiResult<()> {
    if state.categories.find(input.category_id).await?.is_none() {
        return Err(ApiError::Validation(format!(
            "categoryId: category {} does not exist",
            input.category_id
        )));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsParams>,
) -> ApiResult<Json<Paginated<Product>>> {
    let query = ProductQuery::from(params);
    let (items, total) = state.products.list(&query).await?;
    debug!(total, returned = items.len(), "products listed");
    Ok(Json(Paginated {
        items,
        total,
        page: query.page,
        limit: query.limit,
        pages: query.pages(total),
    }))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Product>> {
    let product = state.products.find(id).await?.ok_or_else(not_found)?;
    Ok(Json(product))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductPatch>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let mut draft = ProductDraft::default();
    payload.apply(&mut draft);
    let input = draft.validated()?;
    ensure_category_exists(&state, &input).await?;

    let product = state.products.insert(&input).await?;
    info!(product_id = product.id, category_id = input.category_id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductPatch>,
) -> ApiResult<Json<Product>> {
    let current = state.products.find(id).await?.ok_or_else(not_found)?;
    let category_changed = payload.category_id.is_some_and(|c| c != current.category.id);

    let mut draft = ProductDraft::from(&current);
    payload.apply(&mut draft);
    let input = draft.validated()?;
    if category_changed {
        ensure_category_exists(&state, &input).await?;
    }

    let product = state
        .products
        .update(id, &input)
        .await?
        .ok_or_else(not_found)?;
    info!(product_id = id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.products.delete(id).await? {
        return Err(not_found());
    }
    info!(product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
