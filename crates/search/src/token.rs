use tracing::{debug, warn};

use scout_db::repositories::{CachedToken, TokenCacheRepository};

/// Cached tokens older than this are regenerated. Staleness is judged at
/// read time; rows are never deleted.
pub const TOKEN_TTL_SECS: i64 = 10 * 60 * 60;

/// Best-effort cache over the token repository. Lookups and writes never
/// fail the caller: a broken cache means a fresh token gets issued, nothing
/// more.
pub struct TokenCache<R> {
    repository: R,
}

impl<R> TokenCache<R>
where
    R: TokenCacheRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub async fn get(&self, visitor_id: &str, now_epoch: i64) -> Option<String> {
        let row = match self.repository.find(visitor_id).await {
            Ok(row) => row?,
            Err(error) => {
                warn!(
                    event_name = "search.token_cache.read_failed",
                    visitor_id,
                    error = %error,
                    "token cache lookup failed; issuing a fresh token"
                );
                return None;
            }
        };

        if now_epoch - row.issued_at > TOKEN_TTL_SECS {
            debug!(
                event_name = "search.token_cache.expired",
                visitor_id,
                issued_at = row.issued_at,
                "cached token expired"
            );
            None
        } else {
            Some(row.token)
        }
    }

    pub async fn put(&self, visitor_id: &str, token: &str, now_epoch: i64) {
        let row = CachedToken {
            visitor_id: visitor_id.to_owned(),
            token: token.to_owned(),
            issued_at: now_epoch,
        };
        if let Err(error) = self.repository.upsert(&row).await {
            warn!(
                event_name = "search.token_cache.write_failed",
                visitor_id,
                error = %error,
                "token cache write failed; continuing without caching"
            );
        }
    }
}
