use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use crate::gateway::GatewayError;

/// One Socket Mode delivery: the envelope id Slack wants acknowledged plus
/// the decoded event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    AppHomeOpened(AppHomeOpenedEvent),
    BlockAction(BlockActionEvent),
    MessageShortcut(MessageShortcutEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::AppHomeOpened(_) => SlackEventType::AppHomeOpened,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::MessageShortcut(_) => SlackEventType::MessageShortcut,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    AppHomeOpened,
    BlockAction,
    MessageShortcut,
    Unsupported,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppHomeOpenedEvent {
    pub user_id: String,
}

/// A button press, facet change, or search-box submit. Actions raised from a
/// view carry a snapshot of it; actions raised from a plain message do not.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub action_id: String,
    pub value: String,
    pub user_id: String,
    pub user_name: String,
    pub trigger_id: String,
    pub view: Option<ViewSnapshot>,
}

/// What Slack echoes back about the view an action came from: its identity,
/// the optimistic-concurrency hash, the opaque metadata, and the form state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub view_id: String,
    pub view_hash: String,
    pub private_metadata: String,
    pub state: ViewState,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub query: String,
    pub selected_facet_values: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageShortcutEvent {
    pub callback_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub message_ts: String,
    pub message_text: String,
    pub user_id: String,
    pub user_name: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}
