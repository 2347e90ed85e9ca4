use sqlx::Row;

use super::{CachedToken, RepositoryError, TokenCacheRepository};
use crate::DbPool;

pub struct SqlTokenCacheRepository {
    pool: DbPool,
}

impl SqlTokenCacheRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TokenCacheRepository for SqlTokenCacheRepository {
    async fn find(&self, visitor_id: &str) -> Result<Option<CachedToken>, RepositoryError> {
        let row = sqlx::query("SELECT user, token, expire FROM search_token_cache WHERE user = ?1")
            .bind(visitor_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| CachedToken {
            visitor_id: row.get("user"),
            token: row.get("token"),
            issued_at: row.get("expire"),
        }))
    }

    async fn upsert(&self, row: &CachedToken) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO search_token_cache (user, token, expire) VALUES (?1, ?2, ?3) \
             ON CONFLICT(user) DO UPDATE SET token = excluded.token, expire = excluded.expire",
        )
        .bind(&row.visitor_id)
        .bind(&row.token)
        .bind(row.issued_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
