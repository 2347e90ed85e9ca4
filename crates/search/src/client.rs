use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use scout_core::config::{FacetField, PictureField, SearchConfig};
use scout_core::session::TenantOverrides;

use crate::types::ResultSet;

/// Result fields every query asks for, independent of configuration.
const BASE_FIELDS_TO_INCLUDE: &[&str] =
    &["clickableuri", "title", "date", "excerpt", "filetype", "language"];
const FIELDS_TO_EXCLUDE: &[&str] = &["documenttype", "size"];

const FACET_VALUE_COUNT: u32 = 8;
const FACET_INJECTION_DEPTH: u32 = 1000;

const TOKEN_IDENTITY_PROVIDER: &str = "Email Security Provider";

#[derive(Debug, Error)]
pub enum SearchClientError {
    #[error("search backend unreachable: {0}")]
    Unreachable(String),
}

/// Credentials for one interaction, resolved from configured defaults plus
/// whatever tenant overrides the session string carried. Never stored beyond
/// the call chain that received them.
#[derive(Clone, Debug)]
pub struct TenantCredentials {
    pub org_id: String,
    pub api_key: SecretString,
}

impl TenantCredentials {
    pub fn resolve(config: &SearchConfig, overrides: &TenantOverrides) -> Self {
        Self {
            org_id: overrides.org_id.clone().unwrap_or_else(|| config.org_id.clone()),
            api_key: overrides
                .api_key
                .clone()
                .map(SecretString::from)
                .unwrap_or_else(|| config.api_key.clone()),
        }
    }
}

/// Query routing hints forwarded verbatim to the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRouting {
    pub pipeline: String,
    pub search_hub: String,
    pub tab: String,
}

impl From<&SearchConfig> for SearchRouting {
    fn from(config: &SearchConfig) -> Self {
        Self {
            pipeline: config.pipeline.clone(),
            search_hub: config.search_hub.clone(),
            tab: config.tab.clone(),
        }
    }
}

/// The configured facet, display, and picture fields a deployment exposes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    pub facet_fields: Vec<FacetField>,
    pub display_fields: Vec<FacetField>,
    pub picture_fields: Vec<PictureField>,
}

impl From<&SearchConfig> for FieldCatalog {
    fn from(config: &SearchConfig) -> Self {
        Self {
            facet_fields: config.facet_fields.clone(),
            display_fields: config.display_fields.clone(),
            picture_fields: config.picture_fields.clone(),
        }
    }
}

/// One search invocation as seen by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub advanced_query: String,
    pub first_result: u64,
    pub page_size: u32,
    pub user_name: String,
    pub referrer: String,
    pub channel_context: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a query with the visitor's bearer token. A rejected or
    /// malformed response is an empty result set; only a transport failure
    /// is an error.
    async fn search(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        request: &SearchRequest,
    ) -> Result<ResultSet, SearchClientError>;

    /// Issue an impersonation token for the given email identity. `None`
    /// when the backend answered but produced no token.
    async fn issue_token(
        &self,
        credentials: &TenantCredentials,
        email: &str,
    ) -> Result<Option<String>, SearchClientError>;
}

pub struct HttpSearchClient {
    http: reqwest::Client,
    endpoint: String,
    routing: SearchRouting,
    fields: FieldCatalog,
}

impl HttpSearchClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        routing: SearchRouting,
        fields: FieldCatalog,
    ) -> Self {
        Self { http, endpoint: endpoint.into(), routing, fields }
    }

    pub fn from_config(http: reqwest::Client, config: &SearchConfig) -> Self {
        Self::new(http, config.endpoint.clone(), SearchRouting::from(config), FieldCatalog::from(config))
    }

    fn search_url(&self, org_id: &str) -> String {
        format!(
            "{}/rest/search/v2?organizationId={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(org_id)
        )
    }

    fn token_url(&self) -> String {
        format!("{}/rest/search/v2/token", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl SearchBackend for HttpSearchClient {
    async fn search(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        request: &SearchRequest,
    ) -> Result<ResultSet, SearchClientError> {
        let body = build_search_body(&self.routing, &self.fields, request);
        let response = self
            .http
            .post(self.search_url(&credentials.org_id))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|error| SearchClientError::Unreachable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "search.backend.rejected",
                status = status.as_u16(),
                org_id = %credentials.org_id,
                "search backend returned an error status; treating as zero results"
            );
            return Ok(ResultSet::default());
        }

        match response.json::<ResultSet>().await {
            Ok(results) => Ok(results),
            Err(error) => {
                warn!(
                    event_name = "search.backend.malformed_body",
                    error = %error,
                    "search response body unreadable; treating as zero results"
                );
                Ok(ResultSet::default())
            }
        }
    }

    async fn issue_token(
        &self,
        credentials: &TenantCredentials,
        email: &str,
    ) -> Result<Option<String>, SearchClientError> {
        let body = json!({
            "userIds": [{ "name": email, "provider": TOKEN_IDENTITY_PROVIDER }],
        });
        let response = self
            .http
            .post(self.token_url())
            .bearer_auth(credentials.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| SearchClientError::Unreachable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "search.token.rejected",
                status = status.as_u16(),
                "token endpoint returned an error status"
            );
            return Ok(None);
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            token: Option<String>,
        }

        match response.json::<TokenResponse>().await {
            Ok(parsed) => Ok(parsed.token),
            Err(error) => {
                warn!(
                    event_name = "search.token.malformed_body",
                    error = %error,
                    "token response body unreadable"
                );
                Ok(None)
            }
        }
    }
}

/// The search request body. Facet, display, and picture fields all join the
/// included-field list; each configured facet field contributes one facet
/// request.
fn build_search_body(
    routing: &SearchRouting,
    fields: &FieldCatalog,
    request: &SearchRequest,
) -> Value {
    json!({
        "q": request.query,
        "aq": request.advanced_query,
        "fieldsToInclude": fields_to_include(fields),
        "fieldsToExclude": FIELDS_TO_EXCLUDE,
        "firstResult": request.first_result,
        "numberOfResults": request.page_size,
        "pipeline": routing.pipeline,
        "searchHub": routing.search_hub,
        "tab": routing.tab,
        "referrer": request.referrer,
        "context": {
            "userName": request.user_name,
            "channel": request.channel_context,
        },
        "facets": facet_requests(&fields.facet_fields),
    })
}

fn fields_to_include(fields: &FieldCatalog) -> Vec<String> {
    let mut included: Vec<String> =
        BASE_FIELDS_TO_INCLUDE.iter().map(|field| (*field).to_owned()).collect();
    included.extend(fields.facet_fields.iter().map(|field| field.field.clone()));
    included.extend(fields.display_fields.iter().map(|field| field.field.clone()));
    for picture in &fields.picture_fields {
        included.push(picture.field.clone());
        included.push(picture.srcfield.clone());
    }
    included
}

fn facet_requests(facet_fields: &[FacetField]) -> Vec<Value> {
    facet_fields
        .iter()
        .map(|field| {
            json!({
                "facetId": field.field,
                "field": field.field,
                "type": "specific",
                "injectionDepth": FACET_INJECTION_DEPTH,
                "filterFacetCount": false,
                "numberOfValues": FACET_VALUE_COUNT,
                "freezeCurrentValues": false,
                "preventAutoSelect": true,
                "isFieldExpanded": false,
            })
        })
        .collect()
}
