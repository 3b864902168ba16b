use sqlx::FromRow;
use time::OffsetDateTime;

/// Password reset request. Only a digest of the token is kept.
#[derive(Debug, Clone, FromRow)]
pub struct ResetRequest {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
}

impl ResetRequest {
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}
