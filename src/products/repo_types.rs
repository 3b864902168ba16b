use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use validator::Validate;

use crate::{
    categories::repo_types::Category,
    error::{ApiError, ApiResult},
    validation::flatten_errors,
};

/// 99999999.99, the largest value a NUMERIC(10,2) column holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Product as returned to clients, with its category embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock: i32,
    pub category: Category,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Flat row of `products JOIN categories`.
#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: i64,
    pub category_name: String,
    pub category_description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            stock: r.stock,
            category: Category {
                id: r.category_id,
                name: r.category_name,
                description: r.category_description,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Product fields being assembled from a request, not yet checked.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct ProductDraft {
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,
    #[validate(required(message = "price is required"))]
    pub price: Option<Decimal>,
    #[validate(
        required(message = "stock is required"),
        range(min = 0, message = "stock must not be negative")
    )]
    pub stock: Option<i32>,
    #[validate(required(message = "categoryId is required"))]
    pub category_id: Option<i64>,
}

/// A complete, valid set of product values ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: i64,
}

impl From<&Product> for ProductDraft {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            description: p.description.clone(),
            price: Some(p.price),
            stock: Some(p.stock),
            category_id: Some(p.category.id),
        }
    }
}

impl ProductDraft {
    pub fn validated(self) -> ApiResult<ProductInput> {
        let mut messages = Vec::new();
        if let Err(e) = self.validate() {
            messages.push(flatten_errors(&e));
        }
        if let Some(price) = self.price {
            if price < Decimal::ZERO || price > MAX_PRICE {
                messages.push(format!("price must be between 0 and {MAX_PRICE}"));
            }
        }
        if !messages.is_empty() {
            return Err(ApiError::Validation(messages.join(", ")));
        }

        match (self.price, self.stock, self.category_id) {
            (Some(price), Some(stock), Some(category_id)) => Ok(ProductInput {
                name: self.name,
                description: self.description,
                price,
                stock,
                category_id,
            }),
            _ => Err(ApiError::Validation(
                "price, stock and categoryId are required".into(),
            )),
        }
    }
}
