use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use scout_core::config::{AppConfig, ConfigError, LoadOptions};
use scout_db::repositories::SqlTokenCacheRepository;
use scout_db::{connect_with_settings, migrations, DbPool};
use scout_search::analytics::HttpAnalyticsClient;
use scout_search::client::HttpSearchClient;
use scout_search::orchestrator::SearchOrchestrator;
use scout_slack::events::EventDispatcher;
use scout_slack::gateway::HttpSlackGateway;
use scout_slack::router::{
    AppHomeHandler, BlockActionHandler, InteractionRouter, MessageShortcutHandler, RouterConfig,
    SlashCommandHandler,
};
use scout_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};

pub type Orchestrator =
    SearchOrchestrator<HttpSearchClient, HttpAnalyticsClient, SqlTokenCacheRepository>;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<Orchestrator>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.search.timeout_secs.max(1)))
        .build()
        .map_err(BootstrapError::HttpClient)?;

    let backend = HttpSearchClient::from_config(http.clone(), &config.search);
    let analytics = HttpAnalyticsClient::from_config(http.clone(), &config.search);
    let token_repository = SqlTokenCacheRepository::new(db_pool.clone());
    let orchestrator = Arc::new(SearchOrchestrator::new(backend, analytics, token_repository));

    let gateway = HttpSlackGateway::new(http, config.slack.bot_token.clone());
    let router = Arc::new(InteractionRouter::new(
        gateway,
        orchestrator.clone(),
        RouterConfig::from_app(&config),
    ));

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(router.clone()));
    dispatcher.register(AppHomeHandler::new(router.clone()));
    dispatcher.register(BlockActionHandler::new(router.clone()));
    dispatcher.register(MessageShortcutHandler::new(router));
    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        handler_count = dispatcher.handler_count(),
        "event dispatcher wired"
    );

    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, db_pool, orchestrator, slack_runner })
}

#[cfg(test)]
mod tests {
    use scout_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                slack_app_token: Some("xapp-test".to_string()),
                slack_bot_token: Some("xoxb-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_malformed_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                slack_app_token: Some("invalid-token".to_string()),
                slack_bot_token: Some("xoxb-valid".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("bootstrap should fail").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[tokio::test]
    async fn bootstrap_runs_migrations_and_wires_the_runtime() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name = 'search_token_cache'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("token cache table should exist after bootstrap");
        assert_eq!(table_count, 1);

        app.db_pool.close().await;
    }
}
