//! Per-interaction behavior: each inbound event decodes its session context,
//! resolves request-scoped tenant credentials, runs the search, and delivers
//! a rendered view back through the gateway.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use scout_core::config::{AppConfig, SearchConfig};
use scout_core::facets::FacetSelection;
use scout_core::session::{
    channel_referrer, is_direct_message, visitor_id, SessionContext, TenantOverrides,
};
use scout_search::analytics::{AnalyticsSink, OpenEvent};
use scout_search::client::{SearchBackend, SearchRequest, TenantCredentials};
use scout_search::orchestrator::SearchOrchestrator;
use scout_search::types::ResultSet;
use scout_search::TokenCacheRepository;

use crate::blocks::{self, Block, MessageTemplate};
use crate::events::{
    AppHomeOpenedEvent, BlockActionEvent, EventContext, EventHandler, EventHandlerError,
    HandlerResult, MessageShortcutEvent, SlackEnvelope, SlackEvent, SlackEventType,
    SlashCommandPayload,
};
use crate::gateway::SlackGateway;
use crate::render::{
    self, RenderConfig, ResultRenderOptions, TrackingParams, ATTACH_ACTION_ID, FACET_ACTION_ID,
    HOME_SEARCH_ACTION_ID, MODAL_SEARCH_ACTION_ID, OPEN_DOCUMENT_ACTION_ID,
};

pub const QUICK_SEARCH_COMMAND: &str = "/scout";
pub const MODAL_SEARCH_COMMAND: &str = "/scout-modal";

/// Message-shortcut callback ids ending in this suffix open the search modal.
pub const SHORTCUT_CALLBACK_SUFFIX: &str = "short-modal";

/// Where a rendered view goes: a fresh modal, an in-place update of an
/// existing view, or the user's home tab.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewDisposition {
    Open { trigger_id: String },
    Update { view_id: String, view_hash: String },
    PublishHome { user_id: String },
}

#[derive(Clone, Debug)]
pub struct RouterConfig {
    pub search: SearchConfig,
    pub modal_page_size: u32,
    pub home_page_size: u32,
    pub chat_page_size: u32,
}

impl RouterConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            search: config.search.clone(),
            modal_page_size: config.slack.modal_page_size,
            home_page_size: config.slack.home_page_size,
            chat_page_size: config.slack.chat_page_size,
        }
    }
}

/// Channel/user coordinates a new search modal starts from, however the
/// request arrived.
#[derive(Clone, Debug, Default)]
pub struct ModalOrigin {
    pub channel_id: String,
    pub channel_name: String,
    pub message_ts: String,
    pub user_id: String,
    pub user_name: String,
    pub trigger_id: String,
    pub query: String,
}

impl From<&MessageShortcutEvent> for ModalOrigin {
    fn from(event: &MessageShortcutEvent) -> Self {
        Self {
            channel_id: event.channel_id.clone(),
            channel_name: event.channel_name.clone(),
            message_ts: event.message_ts.clone(),
            user_id: event.user_id.clone(),
            user_name: event.user_name.clone(),
            trigger_id: event.trigger_id.clone(),
            query: event.message_text.clone(),
        }
    }
}

impl From<&SlashCommandPayload> for ModalOrigin {
    fn from(payload: &SlashCommandPayload) -> Self {
        Self {
            channel_id: payload.channel_id.clone(),
            channel_name: payload.channel_name.clone(),
            message_ts: String::new(),
            user_id: payload.user_id.clone(),
            user_name: payload.user_name.clone(),
            trigger_id: payload.trigger_id.clone(),
            query: payload.text.clone(),
        }
    }
}

pub struct InteractionRouter<G, B, A, R> {
    gateway: G,
    orchestrator: Arc<SearchOrchestrator<B, A, R>>,
    render: RenderConfig,
    config: RouterConfig,
}

impl<G, B, A, R> InteractionRouter<G, B, A, R>
where
    G: SlackGateway,
    B: SearchBackend,
    A: AnalyticsSink,
    R: TokenCacheRepository,
{
    pub fn new(
        gateway: G,
        orchestrator: Arc<SearchOrchestrator<B, A, R>>,
        config: RouterConfig,
    ) -> Self {
        let render = RenderConfig::from(&config.search);
        Self { gateway, orchestrator, render, config }
    }

    /// Quick search: a compact reply in the invoking channel. No channel
    /// context is persisted; the reply is not a view and has no round trip.
    pub async fn handle_quick_search(
        &self,
        command: &SlashCommandPayload,
    ) -> Result<(), EventHandlerError> {
        let query = if command.text.trim().is_empty() {
            "empty query".to_owned()
        } else {
            command.text.clone()
        };
        info!(
            event_name = "router.quick_search",
            user_id = %command.user_id,
            channel = %command.channel_name,
            "running quick search"
        );

        let visitor = visitor_id(&command.user_id);
        let email = self.lookup_email(&command.user_id).await;
        let credentials =
            TenantCredentials::resolve(&self.config.search, &TenantOverrides::default());
        let token = self.orchestrator.ensure_token(&credentials, &visitor, &email).await;

        let referrer = channel_referrer(&command.channel_name);
        let request = SearchRequest {
            query: query.clone(),
            advanced_query: String::new(),
            first_result: 0,
            page_size: self.config.chat_page_size,
            user_name: command.user_name.clone(),
            referrer: referrer.clone(),
            channel_context: command.channel_name.clone(),
        };
        let results = self.run_search(&credentials, &token, &visitor, &request).await;

        let mut blocks = render::chat_header_blocks(
            &command.user_name,
            &query,
            self.config.chat_page_size,
            &self.render.full_search_page_url,
        );
        let options = ResultRenderOptions {
            add_attachment: false,
            direct_message: is_direct_message(&command.channel_name),
            visitor_id: visitor,
            search_token: token,
            referrer,
            channel_context: command.channel_name.clone(),
        };
        if results.total_count > 0 {
            blocks.extend(render::result_blocks(&self.render, &results, &options));
        } else {
            blocks.push(render::no_results_block());
        }

        let message =
            MessageTemplate { fallback_text: format!("Search results for {query}"), blocks };
        self.gateway.post_message(&command.channel_id, None, &message).await?;
        Ok(())
    }

    /// App Home opened: publish an empty search box under a blank session
    /// tagged `App Home`.
    pub async fn handle_home_opened(
        &self,
        event: &AppHomeOpenedEvent,
    ) -> Result<(), EventHandlerError> {
        let blocks = render::starting_blocks(HOME_SEARCH_ACTION_ID, "", &[], &[]);
        self.deliver(
            ViewDisposition::PublishHome { user_id: event.user_id.clone() },
            blocks,
            SessionContext::app_home().encode(),
        )
        .await
    }

    /// Search-box submit or facet change inside an existing view: decode the
    /// session, re-run the search, and re-render the same surface.
    pub async fn handle_view_search(
        &self,
        action: &BlockActionEvent,
    ) -> Result<(), EventHandlerError> {
        let Some(view) = &action.view else {
            warn!(
                event_name = "router.view_search.no_view",
                action_id = %action.action_id,
                "view action arrived without a view snapshot"
            );
            return Ok(());
        };

        let mut session = SessionContext::decode(&view.private_metadata);
        let credentials =
            TenantCredentials::resolve(&self.config.search, &session.tenant_overrides());
        let visitor = visitor_id(&action.user_id);
        if session.search_token.is_empty() {
            let email = self.lookup_email(&action.user_id).await;
            session.search_token =
                self.orchestrator.ensure_token(&credentials, &visitor, &email).await;
        }

        // Search-box submits carry the typed query as the action value; facet
        // changes re-read it from the form state.
        let query = match action.action_id.as_str() {
            FACET_ACTION_ID => view.state.query.clone(),
            _ => action.value.clone(),
        };
        let selection = FacetSelection::from_option_values(&view.state.selected_facet_values);
        let advanced_query = selection.advanced_query(&self.config.search.facet_fields);

        let home_surface = action.action_id == HOME_SEARCH_ACTION_ID;
        let (page_size, action_id) = if home_surface {
            (self.config.home_page_size, HOME_SEARCH_ACTION_ID)
        } else {
            (self.config.modal_page_size, MODAL_SEARCH_ACTION_ID)
        };

        let referrer = channel_referrer(&session.channel_name);
        let request = SearchRequest {
            query: query.clone(),
            advanced_query,
            first_result: 0,
            page_size,
            user_name: action.user_name.clone(),
            referrer: referrer.clone(),
            channel_context: session.channel_name.clone(),
        };
        let results =
            self.run_search(&credentials, &session.search_token, &visitor, &request).await;

        let options = ResultRenderOptions {
            add_attachment: !home_surface && session.allows_attachment(),
            direct_message: is_direct_message(&session.channel_name),
            visitor_id: visitor,
            search_token: session.search_token.clone(),
            referrer,
            channel_context: session.channel_name.clone(),
        };
        let blocks =
            render::search_view_blocks(&self.render, action_id, &query, &results, &options);

        let disposition = if home_surface {
            ViewDisposition::PublishHome { user_id: action.user_id.clone() }
        } else {
            ViewDisposition::Update {
                view_id: view.view_id.clone(),
                view_hash: view.view_hash.clone(),
            }
        };
        self.deliver(disposition, blocks, session.encode()).await
    }

    /// Open a fresh search modal from a message shortcut or the modal slash
    /// command. Direct messages blank the channel so attach-to-message can
    /// never post into them.
    pub async fn open_search_modal(&self, origin: ModalOrigin) -> Result<(), EventHandlerError> {
        let direct = is_direct_message(&origin.channel_name);
        let channel_id = if direct { String::new() } else { origin.channel_id.clone() };

        let visitor = visitor_id(&origin.user_id);
        let email = self.lookup_email(&origin.user_id).await;
        let credentials =
            TenantCredentials::resolve(&self.config.search, &TenantOverrides::default());
        let token = self.orchestrator.ensure_token(&credentials, &visitor, &email).await;

        let session = SessionContext {
            channel_id,
            channel_name: origin.channel_name.clone(),
            message_ts: origin.message_ts.clone(),
            user_id: origin.user_id.clone(),
            search_token: token.clone(),
            api_key_override: String::new(),
            org_id_override: String::new(),
        };

        let query = if origin.query.trim().is_empty() { " ".to_owned() } else { origin.query };
        let referrer = channel_referrer(&origin.channel_name);
        let request = SearchRequest {
            query: query.clone(),
            advanced_query: String::new(),
            first_result: 0,
            page_size: self.config.modal_page_size,
            user_name: origin.user_name.clone(),
            referrer: referrer.clone(),
            channel_context: origin.channel_name.clone(),
        };
        let results = self.run_search(&credentials, &token, &visitor, &request).await;

        let options = ResultRenderOptions {
            add_attachment: session.allows_attachment(),
            direct_message: direct,
            visitor_id: visitor,
            search_token: token,
            referrer,
            channel_context: origin.channel_name.clone(),
        };
        let blocks = render::search_view_blocks(
            &self.render,
            MODAL_SEARCH_ACTION_ID,
            &query,
            &results,
            &options,
        );

        self.deliver(
            ViewDisposition::Open { trigger_id: origin.trigger_id },
            blocks,
            session.encode(),
        )
        .await
    }

    /// An Open button was pressed. Slack follows the button's url natively;
    /// our only job is the analytics open event, reconstructed from the
    /// tracking bundle in the action value.
    pub async fn handle_open_document(
        &self,
        action: &BlockActionEvent,
    ) -> Result<(), EventHandlerError> {
        let params = TrackingParams::decode(&action.value);
        let overrides = action
            .view
            .as_ref()
            .map(|view| SessionContext::decode(&view.private_metadata).tenant_overrides())
            .unwrap_or_default();
        let credentials = TenantCredentials::resolve(&self.config.search, &overrides);

        let event = OpenEvent {
            search_uid: params.search_uid.clone(),
            uri: params.url.clone(),
            uri_hash: params.uri_hash.clone(),
            source_name: params.source.clone(),
            position: params.position.clone(),
            title: params.title.clone(),
            referrer: params.referrer.clone(),
            channel_context: params.channel.clone(),
        };
        self.orchestrator.record_open(&credentials, &params.token, &params.visitor, &event).await;
        Ok(())
    }

    /// Attach-to-message: post the result's title and an Open button back
    /// into the conversation the modal was launched from.
    pub async fn handle_attach(&self, action: &BlockActionEvent) -> Result<(), EventHandlerError> {
        let Some(view) = &action.view else {
            return Ok(());
        };
        let session = SessionContext::decode(&view.private_metadata);
        if session.channel_id.is_empty() {
            warn!(
                event_name = "router.attach.no_channel",
                user_id = %action.user_id,
                "attach requested without a source channel; dropping"
            );
            return Ok(());
        }

        let params = TrackingParams::decode(&action.value);
        let thread_ts =
            if session.message_ts.is_empty() { None } else { Some(session.message_ts.as_str()) };
        let message = render::attachment_message(&params.title, &action.value, &params.url);
        self.gateway.post_message(&session.channel_id, thread_ts, &message).await?;
        Ok(())
    }

    async fn deliver(
        &self,
        disposition: ViewDisposition,
        blocks: Vec<Block>,
        private_metadata: String,
    ) -> Result<(), EventHandlerError> {
        match disposition {
            ViewDisposition::Open { trigger_id } => {
                let view = blocks::modal_view(blocks, private_metadata);
                self.gateway.open_view(&trigger_id, &view).await?;
            }
            ViewDisposition::Update { view_id, view_hash } => {
                let view = blocks::modal_view(blocks, private_metadata);
                self.gateway.update_view(&view_id, &view_hash, &view).await?;
            }
            ViewDisposition::PublishHome { user_id } => {
                let view = blocks::home_view(blocks, private_metadata);
                self.gateway.publish_home(&user_id, &view).await?;
            }
        }
        Ok(())
    }

    async fn run_search(
        &self,
        credentials: &TenantCredentials,
        token: &str,
        visitor: &str,
        request: &SearchRequest,
    ) -> ResultSet {
        match self.orchestrator.execute(credentials, token, visitor, request).await {
            Ok(results) => results,
            Err(error) => {
                warn!(
                    event_name = "router.search.unreachable",
                    error = %error,
                    "search backend unreachable; rendering zero results"
                );
                ResultSet::default()
            }
        }
    }

    async fn lookup_email(&self, user_id: &str) -> String {
        match self.gateway.user_email(user_id).await {
            Ok(email) => email,
            Err(error) => {
                warn!(
                    event_name = "router.email_lookup_failed",
                    user_id,
                    error = %error,
                    "email lookup failed; token issuance will degrade"
                );
                String::new()
            }
        }
    }
}

pub struct SlashCommandHandler<G, B, A, R> {
    router: Arc<InteractionRouter<G, B, A, R>>,
}

impl<G, B, A, R> SlashCommandHandler<G, B, A, R> {
    pub fn new(router: Arc<InteractionRouter<G, B, A, R>>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl<G, B, A, R> EventHandler for SlashCommandHandler<G, B, A, R>
where
    G: SlackGateway + 'static,
    B: SearchBackend + 'static,
    A: AnalyticsSink + 'static,
    R: TokenCacheRepository + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match payload.command.as_str() {
            QUICK_SEARCH_COMMAND => {
                self.router.handle_quick_search(payload).await?;
                Ok(HandlerResult::Processed)
            }
            MODAL_SEARCH_COMMAND => {
                self.router.open_search_modal(ModalOrigin::from(payload)).await?;
                Ok(HandlerResult::Processed)
            }
            other => {
                warn!(
                    event_name = "router.unknown_command",
                    command = other,
                    "unrecognized slash command"
                );
                Ok(HandlerResult::Ignored)
            }
        }
    }
}

pub struct AppHomeHandler<G, B, A, R> {
    router: Arc<InteractionRouter<G, B, A, R>>,
}

impl<G, B, A, R> AppHomeHandler<G, B, A, R> {
    pub fn new(router: Arc<InteractionRouter<G, B, A, R>>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl<G, B, A, R> EventHandler for AppHomeHandler<G, B, A, R>
where
    G: SlackGateway + 'static,
    B: SearchBackend + 'static,
    A: AnalyticsSink + 'static,
    R: TokenCacheRepository + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::AppHomeOpened
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::AppHomeOpened(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        self.router.handle_home_opened(event).await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct BlockActionHandler<G, B, A, R> {
    router: Arc<InteractionRouter<G, B, A, R>>,
}

impl<G, B, A, R> BlockActionHandler<G, B, A, R> {
    pub fn new(router: Arc<InteractionRouter<G, B, A, R>>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl<G, B, A, R> EventHandler for BlockActionHandler<G, B, A, R>
where
    G: SlackGateway + 'static,
    B: SearchBackend + 'static,
    A: AnalyticsSink + 'static,
    R: TokenCacheRepository + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(action) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match action.action_id.as_str() {
            OPEN_DOCUMENT_ACTION_ID => {
                self.router.handle_open_document(action).await?;
                Ok(HandlerResult::Processed)
            }
            ATTACH_ACTION_ID => {
                self.router.handle_attach(action).await?;
                Ok(HandlerResult::Processed)
            }
            HOME_SEARCH_ACTION_ID | MODAL_SEARCH_ACTION_ID | FACET_ACTION_ID => {
                self.router.handle_view_search(action).await?;
                Ok(HandlerResult::Processed)
            }
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

pub struct MessageShortcutHandler<G, B, A, R> {
    router: Arc<InteractionRouter<G, B, A, R>>,
}

impl<G, B, A, R> MessageShortcutHandler<G, B, A, R> {
    pub fn new(router: Arc<InteractionRouter<G, B, A, R>>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl<G, B, A, R> EventHandler for MessageShortcutHandler<G, B, A, R>
where
    G: SlackGateway + 'static,
    B: SearchBackend + 'static,
    A: AnalyticsSink + 'static,
    R: TokenCacheRepository + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::MessageShortcut
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::MessageShortcut(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if !event.callback_id.ends_with(SHORTCUT_CALLBACK_SUFFIX) {
            return Ok(HandlerResult::Ignored);
        }
        self.router.open_search_modal(ModalOrigin::from(event)).await?;
        Ok(HandlerResult::Processed)
    }
}
