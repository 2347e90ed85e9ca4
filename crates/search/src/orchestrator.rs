use chrono::Utc;
use tracing::warn;

use scout_db::repositories::TokenCacheRepository;

use crate::analytics::{AnalyticsSink, OpenEvent, SearchEvent};
use crate::client::{SearchBackend, SearchClientError, SearchRequest, TenantCredentials};
use crate::token::TokenCache;
use crate::types::ResultSet;

/// Ties one interaction's backend calls together: token acquisition, the
/// query itself, and the best-effort analytics that trail it.
pub struct SearchOrchestrator<B, A, R> {
    backend: B,
    analytics: A,
    tokens: TokenCache<R>,
}

impl<B, A, R> SearchOrchestrator<B, A, R>
where
    B: SearchBackend,
    A: AnalyticsSink,
    R: TokenCacheRepository,
{
    pub fn new(backend: B, analytics: A, token_repository: R) -> Self {
        Self { backend, analytics, tokens: TokenCache::new(token_repository) }
    }

    /// Cached token if fresh, otherwise a newly issued one. Every failure
    /// path degrades to an empty token; the backend will answer the search
    /// with an auth error that reads as zero results.
    pub async fn ensure_token(
        &self,
        credentials: &TenantCredentials,
        visitor_id: &str,
        email: &str,
    ) -> String {
        let now_epoch = Utc::now().timestamp();
        if let Some(token) = self.tokens.get(visitor_id, now_epoch).await {
            return token;
        }

        match self.backend.issue_token(credentials, email).await {
            Ok(Some(token)) => {
                self.tokens.put(visitor_id, &token, now_epoch).await;
                token
            }
            Ok(None) => {
                warn!(
                    event_name = "search.token.absent",
                    visitor_id,
                    "token endpoint produced no token; continuing without one"
                );
                String::new()
            }
            Err(error) => {
                warn!(
                    event_name = "search.token.unreachable",
                    visitor_id,
                    error = %error,
                    "token endpoint unreachable; continuing without a token"
                );
                String::new()
            }
        }
    }

    /// Run the query and report it to analytics. Only transport failure on
    /// the query propagates; the analytics event is best-effort.
    pub async fn execute(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        visitor_id: &str,
        request: &SearchRequest,
    ) -> Result<ResultSet, SearchClientError> {
        let results = self.backend.search(credentials, token, request).await?;

        let event = SearchEvent::from_results(
            &results,
            &request.query,
            &request.advanced_query,
            &request.user_name,
            &request.referrer,
            &request.channel_context,
        );
        if let Err(error) = self.analytics.record_search(credentials, token, visitor_id, &event).await
        {
            warn!(
                event_name = "search.analytics.search_dropped",
                visitor_id,
                error = %error,
                "search analytics event dropped"
            );
        }

        Ok(results)
    }

    /// Report a document-open event. Best-effort; never fails the caller.
    pub async fn record_open(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        visitor_id: &str,
        event: &OpenEvent,
    ) {
        if let Err(error) = self.analytics.record_open(credentials, token, visitor_id, event).await {
            warn!(
                event_name = "search.analytics.open_dropped",
                visitor_id,
                error = %error,
                "open analytics event dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use scout_db::repositories::{CachedToken, RepositoryError, TokenCacheRepository};

    use super::SearchOrchestrator;
    use crate::analytics::{AnalyticsError, AnalyticsSink, OpenEvent, SearchEvent};
    use crate::client::{SearchBackend, SearchClientError, SearchRequest, TenantCredentials};
    use crate::types::ResultSet;

    fn credentials() -> TenantCredentials {
        TenantCredentials { org_id: "org1".to_owned(), api_key: String::from("key").into() }
    }

    #[derive(Default)]
    struct ScriptedBackend {
        search_results: Mutex<Vec<Result<ResultSet, SearchClientError>>>,
        token_results: Mutex<Vec<Result<Option<String>, SearchClientError>>>,
        searches: Mutex<Vec<SearchRequest>>,
        token_requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        async fn search(
            &self,
            _credentials: &TenantCredentials,
            _token: &str,
            request: &SearchRequest,
        ) -> Result<ResultSet, SearchClientError> {
            self.searches.lock().await.push(request.clone());
            self.search_results.lock().await.pop().unwrap_or_else(|| Ok(ResultSet::default()))
        }

        async fn issue_token(
            &self,
            _credentials: &TenantCredentials,
            email: &str,
        ) -> Result<Option<String>, SearchClientError> {
            self.token_requests.lock().await.push(email.to_owned());
            self.token_results.lock().await.pop().unwrap_or(Ok(None))
        }
    }

    #[derive(Default)]
    struct RecordingAnalytics {
        fail: bool,
        search_events: Mutex<Vec<SearchEvent>>,
        open_events: Mutex<Vec<OpenEvent>>,
    }

    #[async_trait]
    impl AnalyticsSink for RecordingAnalytics {
        async fn record_search(
            &self,
            _credentials: &TenantCredentials,
            _token: &str,
            _visitor_id: &str,
            event: &SearchEvent,
        ) -> Result<(), AnalyticsError> {
            if self.fail {
                return Err(AnalyticsError::Status(500));
            }
            self.search_events.lock().await.push(event.clone());
            Ok(())
        }

        async fn record_open(
            &self,
            _credentials: &TenantCredentials,
            _token: &str,
            _visitor_id: &str,
            event: &OpenEvent,
        ) -> Result<(), AnalyticsError> {
            if self.fail {
                return Err(AnalyticsError::Status(500));
            }
            self.open_events.lock().await.push(event.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct InMemoryRepository {
        rows: Mutex<HashMap<String, CachedToken>>,
    }

    #[async_trait]
    impl TokenCacheRepository for InMemoryRepository {
        async fn find(&self, visitor_id: &str) -> Result<Option<CachedToken>, RepositoryError> {
            Ok(self.rows.lock().await.get(visitor_id).cloned())
        }

        async fn upsert(&self, row: &CachedToken) -> Result<(), RepositoryError> {
            self.rows.lock().await.insert(row.visitor_id.clone(), row.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn ensure_token_issues_once_then_serves_from_cache() {
        let backend = ScriptedBackend::default();
        backend.token_results.lock().await.push(Ok(Some("tok-new".to_owned())));
        let orchestrator =
            SearchOrchestrator::new(backend, RecordingAnalytics::default(), InMemoryRepository::default());

        let first = orchestrator.ensure_token(&credentials(), "1U", "jane@example.com").await;
        let second = orchestrator.ensure_token(&credentials(), "1U", "jane@example.com").await;

        assert_eq!(first, "tok-new");
        assert_eq!(second, "tok-new");
        assert_eq!(orchestrator.backend.token_requests.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn ensure_token_degrades_to_empty_when_issue_fails() {
        let backend = ScriptedBackend::default();
        backend
            .token_results
            .lock()
            .await
            .push(Err(SearchClientError::Unreachable("down".to_owned())));
        let orchestrator =
            SearchOrchestrator::new(backend, RecordingAnalytics::default(), InMemoryRepository::default());

        let token = orchestrator.ensure_token(&credentials(), "1U", "jane@example.com").await;
        assert_eq!(token, "");
    }

    #[tokio::test]
    async fn execute_reports_the_query_to_analytics() {
        let backend = ScriptedBackend::default();
        backend.search_results.lock().await.push(Ok(ResultSet {
            total_count: 4,
            duration: 12,
            search_uid: "uid-9".to_owned(),
            ..ResultSet::default()
        }));
        let orchestrator =
            SearchOrchestrator::new(backend, RecordingAnalytics::default(), InMemoryRepository::default());

        let request = SearchRequest { query: "widgets".to_owned(), ..SearchRequest::default() };
        let results = orchestrator
            .execute(&credentials(), "tok", "1U", &request)
            .await
            .expect("search should succeed");

        assert_eq!(results.total_count, 4);
        let events = orchestrator.analytics.search_events.lock().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].search_uid, "uid-9");
        assert_eq!(events[0].query, "widgets");
    }

    #[tokio::test]
    async fn analytics_failure_does_not_fail_the_search() {
        let backend = ScriptedBackend::default();
        backend.search_results.lock().await.push(Ok(ResultSet::default()));
        let orchestrator = SearchOrchestrator::new(
            backend,
            RecordingAnalytics { fail: true, ..Default::default() },
            InMemoryRepository::default(),
        );

        let request = SearchRequest::default();
        let results = orchestrator.execute(&credentials(), "tok", "1U", &request).await;
        assert!(results.is_ok());
    }

    #[tokio::test]
    async fn transport_failure_propagates_as_unreachable() {
        let backend = ScriptedBackend::default();
        backend
            .search_results
            .lock()
            .await
            .push(Err(SearchClientError::Unreachable("refused".to_owned())));
        let orchestrator =
            SearchOrchestrator::new(backend, RecordingAnalytics::default(), InMemoryRepository::default());

        let result = orchestrator.execute(&credentials(), "tok", "1U", &SearchRequest::default()).await;
        assert!(matches!(result, Err(SearchClientError::Unreachable(_))));
    }

    #[tokio::test]
    async fn record_open_swallows_sink_failures() {
        let backend = ScriptedBackend::default();
        let orchestrator = SearchOrchestrator::new(
            backend,
            RecordingAnalytics { fail: true, ..Default::default() },
            InMemoryRepository::default(),
        );

        orchestrator.record_open(&credentials(), "tok", "1U", &OpenEvent::default()).await;
    }
}
