use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use scout_core::config::SearchConfig;

use crate::client::{SearchRouting, TenantCredentials};
use crate::types::ResultSet;

/// User agent reported on every usage-analytics event.
pub const ANALYTICS_USER_AGENT: &str = "Slack/1.0 (platform; Slack Integration)";

/// Analytics failures never reach the user; callers log them and move on.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics request failed: {0}")]
    Request(String),
    #[error("analytics endpoint returned status {0}")]
    Status(u16),
}

/// A completed query, as reported to the usage-analytics backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchEvent {
    pub search_uid: String,
    pub query: String,
    pub advanced_query: String,
    pub total_count: u64,
    pub duration: u64,
    pub user_name: String,
    pub referrer: String,
    pub channel_context: String,
}

impl SearchEvent {
    pub fn from_results(
        results: &ResultSet,
        query: &str,
        advanced_query: &str,
        user_name: &str,
        referrer: &str,
        channel_context: &str,
    ) -> Self {
        Self {
            search_uid: results.search_uid.clone(),
            query: query.to_owned(),
            advanced_query: advanced_query.to_owned(),
            total_count: results.total_count,
            duration: results.duration,
            user_name: user_name.to_owned(),
            referrer: referrer.to_owned(),
            channel_context: channel_context.to_owned(),
        }
    }
}

/// A document opened from a result list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenEvent {
    pub search_uid: String,
    pub uri: String,
    pub uri_hash: String,
    pub source_name: String,
    pub position: String,
    pub title: String,
    pub referrer: String,
    pub channel_context: String,
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record_search(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        visitor_id: &str,
        event: &SearchEvent,
    ) -> Result<(), AnalyticsError>;

    async fn record_open(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        visitor_id: &str,
        event: &OpenEvent,
    ) -> Result<(), AnalyticsError>;
}

pub struct HttpAnalyticsClient {
    http: reqwest::Client,
    endpoint: String,
    routing: SearchRouting,
}

impl HttpAnalyticsClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, routing: SearchRouting) -> Self {
        Self { http, endpoint: endpoint.into(), routing }
    }

    pub fn from_config(http: reqwest::Client, config: &SearchConfig) -> Self {
        Self::new(http, config.analytics_endpoint.clone(), SearchRouting::from(config))
    }

    async fn post(
        &self,
        url: String,
        token: &str,
        body: serde_json::Value,
    ) -> Result<(), AnalyticsError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|error| AnalyticsError::Request(error.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AnalyticsError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsClient {
    async fn record_search(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        visitor_id: &str,
        event: &SearchEvent,
    ) -> Result<(), AnalyticsError> {
        let url = analytics_url(&self.endpoint, "search", token, &credentials.org_id, visitor_id);
        let body = json!({
            "language": "en",
            "userDisplayName": event.user_name,
            "userAgent": ANALYTICS_USER_AGENT,
            "originLevel1": self.routing.search_hub,
            "originLevel2": self.routing.tab,
            "originLevel3": event.referrer,
            "searchQueryUid": event.search_uid,
            "queryText": event.query,
            "actionCause": "searchboxSubmit",
            "actionType": "search box",
            "advancedQuery": event.advanced_query,
            "numberOfResults": event.total_count,
            "responseTime": event.duration,
            "queryPipeline": self.routing.pipeline,
            "customData": { "context_channel": event.channel_context },
        });

        self.post(url, token, body).await
    }

    async fn record_open(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        visitor_id: &str,
        event: &OpenEvent,
    ) -> Result<(), AnalyticsError> {
        let url = analytics_url(&self.endpoint, "click", token, &credentials.org_id, visitor_id);
        let body = json!({
            "language": "en",
            "userDisplayName": visitor_id,
            "userAgent": ANALYTICS_USER_AGENT,
            "originLevel1": self.routing.search_hub,
            "originLevel2": self.routing.tab,
            "originLevel3": event.referrer,
            "searchQueryUid": event.search_uid,
            "documentUri": event.uri,
            "documentUriHash": event.uri_hash,
            "documentPosition": event.position,
            "sourceName": event.source_name,
            "actionCause": "documentOpen",
            "documentTitle": event.title,
            "documentUrl": event.uri,
            "queryPipeline": self.routing.pipeline,
            "customData": { "context_channel": event.channel_context },
        });

        self.post(url, token, body).await
    }
}

/// The usage-analytics endpoints authenticate twice over: bearer header plus
/// `access_token` on the query string, with the visitor identity pinned by
/// `prioritizeVisitorParameter`.
fn analytics_url(
    endpoint: &str,
    kind: &str,
    token: &str,
    org_id: &str,
    visitor_id: &str,
) -> String {
    format!(
        "{}/rest/ua/v15/analytics/{}?access_token={}&prioritizeVisitorParameter=true&org={}&visitor={}",
        endpoint.trim_end_matches('/'),
        kind,
        urlencoding::encode(token),
        urlencoding::encode(org_id),
        urlencoding::encode(visitor_id),
    )
}
