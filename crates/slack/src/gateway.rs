//! Outbound Slack Web API calls, behind one trait so handlers stay testable.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;

use crate::blocks::{MessageTemplate, ViewPayload};

const SLACK_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("slack api transport failed: {0}")]
    Transport(String),
    #[error("slack api `{method}` rejected: {reason}")]
    Rejected { method: String, reason: String },
}

#[async_trait]
pub trait SlackGateway: Send + Sync {
    /// The email identity behind a user id, for impersonation-token issuance.
    async fn user_email(&self, user_id: &str) -> Result<String, GatewayError>;

    async fn open_view(&self, trigger_id: &str, view: &ViewPayload) -> Result<(), GatewayError>;

    /// Update an existing view in place. Slack checks `view_hash`
    /// optimistically; a stale hash surfaces as a rejected call, not a retry.
    async fn update_view(
        &self,
        view_id: &str,
        view_hash: &str,
        view: &ViewPayload,
    ) -> Result<(), GatewayError>;

    async fn publish_home(&self, user_id: &str, view: &ViewPayload) -> Result<(), GatewayError>;

    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: &MessageTemplate,
    ) -> Result<(), GatewayError>;
}

pub struct HttpSlackGateway {
    http: reqwest::Client,
    bot_token: SecretString,
}

impl HttpSlackGateway {
    pub fn new(http: reqwest::Client, bot_token: SecretString) -> Self {
        Self { http, bot_token }
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, GatewayError> {
        let response = self
            .http
            .post(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        if payload["ok"].as_bool().unwrap_or(false) {
            Ok(payload)
        } else {
            let reason =
                payload["error"].as_str().unwrap_or("unknown error").to_owned();
            Err(GatewayError::Rejected { method: method.to_owned(), reason })
        }
    }
}

#[async_trait]
impl SlackGateway for HttpSlackGateway {
    async fn user_email(&self, user_id: &str) -> Result<String, GatewayError> {
        let payload = self.call("users.info", json!({ "user": user_id })).await?;
        payload["user"]["profile"]["email"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| GatewayError::Rejected {
                method: "users.info".to_owned(),
                reason: "profile has no email".to_owned(),
            })
    }

    async fn open_view(&self, trigger_id: &str, view: &ViewPayload) -> Result<(), GatewayError> {
        self.call("views.open", json!({ "trigger_id": trigger_id, "view": view })).await?;
        Ok(())
    }

    async fn update_view(
        &self,
        view_id: &str,
        view_hash: &str,
        view: &ViewPayload,
    ) -> Result<(), GatewayError> {
        self.call("views.update", json!({ "view_id": view_id, "hash": view_hash, "view": view }))
            .await?;
        Ok(())
    }

    async fn publish_home(&self, user_id: &str, view: &ViewPayload) -> Result<(), GatewayError> {
        self.call("views.publish", json!({ "user_id": user_id, "view": view })).await?;
        Ok(())
    }

    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: Option<&str>,
        message: &MessageTemplate,
    ) -> Result<(), GatewayError> {
        let mut body = json!({
            "channel": channel_id,
            "text": message.fallback_text,
            "blocks": message.blocks,
            "unfurl_links": false,
            "unfurl_media": false,
        });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = json!(thread_ts);
        }
        self.call("chat.postMessage", body).await?;
        Ok(())
    }
}
