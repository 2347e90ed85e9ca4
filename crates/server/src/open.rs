//! Redirect-and-log: the hop every Open link goes through so the analytics
//! open event is recorded before the browser lands on the real document.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use scout_core::config::SearchConfig;
use scout_core::session::TenantOverrides;
use scout_search::analytics::OpenEvent;
use scout_search::client::TenantCredentials;

use crate::bootstrap::Orchestrator;

#[derive(Clone)]
pub struct OpenState {
    pub orchestrator: Arc<Orchestrator>,
    pub search: SearchConfig,
}

/// Query parameters mirror the tracking bundle carried by Open buttons.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpenParams {
    #[serde(rename = "searchUid")]
    pub search_uid: String,
    pub url: String,
    pub urihash: String,
    pub source: String,
    pub position: String,
    pub title: String,
    pub visitor: String,
    pub token: String,
    #[serde(rename = "ref")]
    pub referrer: String,
    pub ch: String,
}

pub fn router(state: OpenState) -> Router {
    Router::new().route("/open", get(open)).with_state(state)
}

pub async fn open(
    State(state): State<OpenState>,
    Query(params): Query<OpenParams>,
) -> impl IntoResponse {
    let credentials = TenantCredentials::resolve(&state.search, &TenantOverrides::default());
    let event = OpenEvent {
        search_uid: params.search_uid.clone(),
        uri: params.url.clone(),
        uri_hash: params.urihash.clone(),
        source_name: params.source.clone(),
        position: params.position.clone(),
        title: params.title.clone(),
        referrer: params.referrer.clone(),
        channel_context: params.ch.clone(),
    };
    // Best-effort: the redirect must reach the user even when analytics is
    // down.
    state.orchestrator.record_open(&credentials, &params.token, &params.visitor, &event).await;

    if params.url.is_empty() {
        return (StatusCode::BAD_REQUEST, "missing url parameter").into_response();
    }
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, params.url)]).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;

    use scout_core::config::AppConfig;
    use scout_db::repositories::SqlTokenCacheRepository;
    use scout_db::{connect_with_settings, migrations};
    use scout_search::analytics::HttpAnalyticsClient;
    use scout_search::client::HttpSearchClient;
    use scout_search::orchestrator::SearchOrchestrator;

    use super::{open, OpenParams, OpenState};

    async fn state_with_unreachable_analytics() -> OpenState {
        let mut config = AppConfig::default();
        config.search.endpoint = "http://127.0.0.1:9".to_string();
        config.search.analytics_endpoint = "http://127.0.0.1:9".to_string();
        config.search.org_id = "org1".to_string();

        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(1))
            .build()
            .expect("http client");
        let orchestrator = Arc::new(SearchOrchestrator::new(
            HttpSearchClient::from_config(http.clone(), &config.search),
            HttpAnalyticsClient::from_config(http, &config.search),
            SqlTokenCacheRepository::new(pool),
        ));

        OpenState { orchestrator, search: config.search }
    }

    #[tokio::test]
    async fn redirects_even_when_analytics_is_unreachable() {
        let state = state_with_unreachable_analytics().await;
        let params = OpenParams {
            url: "https://docs.example.com/a".to_string(),
            token: "tok".to_string(),
            visitor: "1U".to_string(),
            ..OpenParams::default()
        };

        let response = open(State(state), Query(params)).await.into_response();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|value| value.to_str().ok()),
            Some("https://docs.example.com/a")
        );
    }

    #[tokio::test]
    async fn missing_target_url_is_a_bad_request() {
        let state = state_with_unreachable_analytics().await;
        let response = open(State(state), Query(OpenParams::default())).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
