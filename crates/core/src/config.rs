use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
    pub modal_page_size: u32,
    pub home_page_size: u32,
    pub chat_page_size: u32,
}

/// Connection settings for the document-index backend. The api key must carry
/// impersonation rights: it only ever issues per-user search tokens.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub endpoint: String,
    pub analytics_endpoint: String,
    pub org_id: String,
    pub api_key: SecretString,
    pub pipeline: String,
    pub search_hub: String,
    pub tab: String,
    pub full_search_page_url: String,
    pub open_redirect_url: String,
    pub facet_fields: Vec<FacetField>,
    pub display_fields: Vec<FacetField>,
    pub picture_fields: Vec<PictureField>,
    pub timeout_secs: u64,
}

/// An index field exposed either as a facet control or as a per-result
/// context line, with the caption shown to users.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct FacetField {
    pub field: String,
    pub caption: String,
}

/// An index field pair that yields an inline result image: `field` selects
/// results that have one, `srcfield` holds the image path, `prefix` completes
/// the URL.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PictureField {
    pub field: String,
    pub srcfield: String,
    pub prefix: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub search_endpoint: Option<String>,
    pub search_analytics_endpoint: Option<String>,
    pub search_org_id: Option<String>,
    pub search_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid field list in `{key}`: {source}")]
    InvalidFieldList { key: String, source: serde_json::Error },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://scout.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            slack: SlackConfig {
                app_token: String::new().into(),
                bot_token: String::new().into(),
                modal_page_size: 5,
                home_page_size: 5,
                chat_page_size: 3,
            },
            search: SearchConfig {
                endpoint: String::new(),
                analytics_endpoint: String::new(),
                org_id: String::new(),
                api_key: String::new().into(),
                pipeline: "default".to_string(),
                search_hub: "Slack".to_string(),
                tab: "default".to_string(),
                full_search_page_url: String::new(),
                open_redirect_url: String::new(),
                facet_fields: Vec::new(),
                display_fields: Vec::new(),
                picture_fields: Vec::new(),
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("scout.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(slack) = patch.slack {
            if let Some(app_token_value) = slack.app_token {
                self.slack.app_token = app_token_value.into();
            }
            if let Some(bot_token_value) = slack.bot_token {
                self.slack.bot_token = bot_token_value.into();
            }
            if let Some(modal_page_size) = slack.modal_page_size {
                self.slack.modal_page_size = modal_page_size;
            }
            if let Some(home_page_size) = slack.home_page_size {
                self.slack.home_page_size = home_page_size;
            }
            if let Some(chat_page_size) = slack.chat_page_size {
                self.slack.chat_page_size = chat_page_size;
            }
        }

        if let Some(search) = patch.search {
            if let Some(endpoint) = search.endpoint {
                self.search.endpoint = endpoint;
            }
            if let Some(analytics_endpoint) = search.analytics_endpoint {
                self.search.analytics_endpoint = analytics_endpoint;
            }
            if let Some(org_id) = search.org_id {
                self.search.org_id = org_id;
            }
            if let Some(api_key_value) = search.api_key {
                self.search.api_key = api_key_value.into();
            }
            if let Some(pipeline) = search.pipeline {
                self.search.pipeline = pipeline;
            }
            if let Some(search_hub) = search.search_hub {
                self.search.search_hub = search_hub;
            }
            if let Some(tab) = search.tab {
                self.search.tab = tab;
            }
            if let Some(full_search_page_url) = search.full_search_page_url {
                self.search.full_search_page_url = full_search_page_url;
            }
            if let Some(open_redirect_url) = search.open_redirect_url {
                self.search.open_redirect_url = open_redirect_url;
            }
            if let Some(facet_fields) = search.facet_fields {
                self.search.facet_fields = facet_fields;
            }
            if let Some(display_fields) = search.display_fields {
                self.search.display_fields = display_fields;
            }
            if let Some(picture_fields) = search.picture_fields {
                self.search.picture_fields = picture_fields;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                self.search.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SCOUT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SCOUT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("SCOUT_DATABASE_MAX_CONNECTIONS", &value)?;
        }

        if let Some(value) = read_env("SCOUT_SLACK_APP_TOKEN") {
            self.slack.app_token = value.into();
        }
        if let Some(value) = read_env("SCOUT_SLACK_BOT_TOKEN") {
            self.slack.bot_token = value.into();
        }

        if let Some(value) = read_env("SCOUT_SEARCH_ENDPOINT") {
            self.search.endpoint = value;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_ANALYTICS_ENDPOINT") {
            self.search.analytics_endpoint = value;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_ORG") {
            self.search.org_id = value;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_API_KEY") {
            self.search.api_key = value.into();
        }
        if let Some(value) = read_env("SCOUT_SEARCH_PIPELINE") {
            self.search.pipeline = value;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_HUB") {
            self.search.search_hub = value;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_TAB") {
            self.search.tab = value;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_FULL_SEARCH_URL") {
            self.search.full_search_page_url = value;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_OPEN_REDIRECT_URL") {
            self.search.open_redirect_url = value;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_FACET_FIELDS") {
            self.search.facet_fields = parse_field_list_json("SCOUT_SEARCH_FACET_FIELDS", &value)?;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_DISPLAY_FIELDS") {
            self.search.display_fields =
                parse_field_list_json("SCOUT_SEARCH_DISPLAY_FIELDS", &value)?;
        }
        if let Some(value) = read_env("SCOUT_SEARCH_PICTURE_FIELDS") {
            self.search.picture_fields =
                parse_field_list_json("SCOUT_SEARCH_PICTURE_FIELDS", &value)?;
        }

        if let Some(value) = read_env("SCOUT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SCOUT_SERVER_PORT") {
            self.server.port = parse_u16("SCOUT_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("SCOUT_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("SCOUT_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(app_token_value) = overrides.slack_app_token {
            self.slack.app_token = app_token_value.into();
        }
        if let Some(bot_token_value) = overrides.slack_bot_token {
            self.slack.bot_token = bot_token_value.into();
        }
        if let Some(endpoint) = overrides.search_endpoint {
            self.search.endpoint = endpoint;
        }
        if let Some(analytics_endpoint) = overrides.search_analytics_endpoint {
            self.search.analytics_endpoint = analytics_endpoint;
        }
        if let Some(org_id) = overrides.search_org_id {
            self.search.org_id = org_id;
        }
        if let Some(api_key_value) = overrides.search_api_key {
            self.search.api_key = api_key_value.into();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        let app_token = self.slack.app_token.expose_secret();
        if !app_token.is_empty() && !app_token.starts_with("xapp-") {
            return Err(ConfigError::Validation(
                "slack.app_token must start with `xapp-`".to_string(),
            ));
        }
        let bot_token = self.slack.bot_token.expose_secret();
        if !bot_token.is_empty() && !bot_token.starts_with("xoxb-") {
            return Err(ConfigError::Validation(
                "slack.bot_token must start with `xoxb-`".to_string(),
            ));
        }

        if self.slack.modal_page_size == 0
            || self.slack.home_page_size == 0
            || self.slack.chat_page_size == 0
        {
            return Err(ConfigError::Validation(
                "slack page sizes must be at least 1".to_string(),
            ));
        }

        if self.database.url.is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    slack: Option<SlackPatch>,
    search: Option<SearchPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    app_token: Option<String>,
    bot_token: Option<String>,
    modal_page_size: Option<u32>,
    home_page_size: Option<u32>,
    chat_page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchPatch {
    endpoint: Option<String>,
    analytics_endpoint: Option<String>,
    org_id: Option<String>,
    api_key: Option<String>,
    pipeline: Option<String>,
    search_hub: Option<String>,
    tab: Option<String>,
    full_search_page_url: Option<String>,
    open_redirect_url: Option<String>,
    facet_fields: Option<Vec<FacetField>>,
    display_fields: Option<Vec<FacetField>>,
    picture_fields: Option<Vec<PictureField>>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn resolve_config_path(requested: Option<&Path>) -> Option<PathBuf> {
    match requested {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(_) => None,
        None => {
            let default = PathBuf::from("scout.toml");
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Field lists can arrive as JSON through the environment, matching the shape
/// deployments already keep alongside their other secrets.
fn parse_field_list_json<T: serde::de::DeserializeOwned>(
    key: &str,
    value: &str,
) -> Result<Vec<T>, ConfigError> {
    serde_json::from_str(value)
        .map_err(|source| ConfigError::InvalidFieldList { key: key.to_string(), source })
}
