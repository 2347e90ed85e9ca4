//! Document-index integration: the search backend client, the analytics
//! sink, per-visitor token acquisition, and the orchestrator that ties them
//! together for one interaction.
//!
//! Everything here degrades rather than fails: an unreachable backend is the
//! only distinguishable error, a rejected or malformed response reads as zero
//! results, and analytics/cache failures are logged and swallowed.

pub mod analytics;
pub mod client;
pub mod orchestrator;
pub mod token;
pub mod types;

pub use analytics::{
    AnalyticsError, AnalyticsSink, HttpAnalyticsClient, OpenEvent, SearchEvent,
    ANALYTICS_USER_AGENT,
};
pub use client::{
    FieldCatalog, HttpSearchClient, SearchBackend, SearchClientError, SearchRequest,
    SearchRouting, TenantCredentials,
};
pub use orchestrator::SearchOrchestrator;
pub use scout_db::repositories::{CachedToken, RepositoryError, TokenCacheRepository};
pub use token::{TokenCache, TOKEN_TTL_SECS};
pub use types::{FacetOutput, FacetValue, ResultSet, SearchResult};
