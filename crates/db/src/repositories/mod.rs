mod token_cache;

use async_trait::async_trait;
use thiserror::Error;

pub use token_cache::SqlTokenCacheRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// One cached search token per visitor identity. The `expire` column name is
/// historical wire contract; it stores the issue time, and staleness is
/// judged at read time by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedToken {
    pub visitor_id: String,
    pub token: String,
    pub issued_at: i64,
}

#[async_trait]
pub trait TokenCacheRepository: Send + Sync {
    async fn find(&self, visitor_id: &str) -> Result<Option<CachedToken>, RepositoryError>;
    async fn upsert(&self, row: &CachedToken) -> Result<(), RepositoryError>;
}
