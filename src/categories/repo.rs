use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Category, CategoryDraft};
use crate::error::RepoResult;

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn list(&self) -> RepoResult<Vec<Category>>;
    async fn find(&self, id: i64) -> RepoResult<Option<Category>>;
    async fn insert(&self, draft: &CategoryDraft) -> RepoResult<Category>;
    async fn update(&self, id: i64, draft: &CategoryDraft) -> RepoResult<Option<Category>>;
    /// Returns false when no row matched. Fails with
    /// `RepoError::ForeignKeyViolation` while products still use it.
    async fn delete(&self, id: i64) -> RepoResult<bool>;
}

#[derive(Clone)]
pub struct PgCategoryRepo {
    db: PgPool,
}

impl PgCategoryRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryRepo for PgCategoryRepo {
    async fn list(&self) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, description FROM categories ORDER BY id"#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: i64) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, description FROM categories WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert(&self, draft: &CategoryDraft) -> RepoResult<Category> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, draft: &CategoryDraft) -> RepoResult<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
               SET name = $2, description = $3
             WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query(r#"DELETE FROM categories WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
