use async_trait::async_trait;
use sqlx::PgPool;

use super::{
    query::ProductQuery,
    repo_types::{Product, ProductInput, ProductRow},
};
use crate::error::RepoResult;

#[async_trait]
pub trait ProductRepo: Send + Sync {
    /// One page of matching products and the number of rows matching the
    /// same filters.
    async fn list(&self, query: &ProductQuery) -> RepoResult<(Vec<Product>, i64)>;
    async fn find(&self, id: i64) -> RepoResult<Option<Product>>;
    async fn insert(&self, input: &ProductInput) -> RepoResult<Product>;
    /// Overwrites every column and refreshes `updated_at`.
    async fn update(&self, id: i64, input: &ProductInput) -> RepoResult<Option<Product>>;
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

const JOINED_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.stock, \
     c.id AS category_id, c.name AS category_name, c.description AS category_description, \
     p.created_at, p.updated_at";

#[derive(Clone)]
pub struct PgProductRepo {
    db: PgPool,
}

impl PgProductRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepo for PgProductRepo {
    async fn list(&self, query: &ProductQuery) -> RepoResult<(Vec<Product>, i64)> {
        let mut count = query.count_query();
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.db).await?;

        let mut select = query.select_query();
        let rows = select
            .build_query_as::<ProductRow>()
            .fetch_all(&self.db)
            .await?;
        Ok((rows.into_iter().map(Product::from).collect(), total))
    }

    async fn find(&self, id: i64) -> RepoResult<Option<Product>> {
        let sql = format!(
            "SELECT {JOINED_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id WHERE p.id = $1"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn insert(&self, input: &ProductInput) -> RepoResult<Product> {
        let sql = format!(
            r#"
            WITH p AS (
                INSERT INTO products (name, description, price, stock, category_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {JOINED_COLUMNS} FROM p JOIN categories c ON c.id = p.category_id
            "#
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.stock)
            .bind(input.category_id)
            .fetch_one(&self.db)
            .await?;
        Ok(row.into())
    }

    async fn update(&self, id: i64, input: &ProductInput) -> RepoResult<Option<Product>> {
        let sql = format!(
            r#"
            WITH p AS (
                UPDATE products
                   SET name = $2, description = $3, price = $4, stock = $5,
                       category_id = $6, updated_at = now()
                 WHERE id = $1
                RETURNING *
            )
            SELECT {JOINED_COLUMNS} FROM p JOIN categories c ON c.id = p.category_id
            "#
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.price)
            .bind(input.stock)
            .bind(input.category_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query(r#"DELETE FROM products WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
