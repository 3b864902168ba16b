use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::repo_types::ResetRequest;
use crate::error::RepoResult;

#[async_trait]
pub trait ResetRepo: Send + Sync {
    /// Drops every earlier request of the user and stores a new one.
    async fn replace_for_user(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> RepoResult<ResetRequest>;

    /// Removes the request matching `token_hash` if it is still live at
    /// `now`, returning it. A token can therefore be redeemed once.
    async fn take_valid(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> RepoResult<Option<ResetRequest>>;
}

#[derive(Clone)]
pub struct PgResetRepo {
    db: PgPool,
}

impl PgResetRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResetRepo for PgResetRepo {
    async fn replace_for_user(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> RepoResult<ResetRequest> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        sqlx::query(r#"DELETE FROM password_reset_requests WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, ResetRequest>(
            r#"
            INSERT INTO password_reset_requests (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.context("commit tx")?;
        Ok(row)
    }

    async fn take_valid(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> RepoResult<Option<ResetRequest>> {
        let row = sqlx::query_as::<_, ResetRequest>(
            r#"
            DELETE FROM password_reset_requests
             WHERE token_hash = $1 AND expires_at > $2
            RETURNING id, user_id, token_hash, expires_at
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}
