//! Slack integration - the bot's interaction surface
//!
//! This crate provides the Slack interface for scout:
//! - **Block Kit** (`blocks`) - typed display blocks and view payloads
//! - **Rendering** (`render`) - result sets to block lists, click tracking
//! - **Events** (`events`) - the inbound event model and dispatcher
//! - **Routing** (`router`) - per-interaction behavior over the gateway
//! - **Gateway** (`gateway`) - outbound Slack Web API calls
//! - **Socket Mode** (`socket`) - envelope loop with ack-before-dispatch
//!
//! # Architecture
//!
//! ```text
//! Slack envelope → SocketModeRunner (ack) → EventDispatcher → handlers
//!                      ↓                                         ↓
//!                 InteractionRouter → SearchOrchestrator → Block Kit view
//! ```
//!
//! Every handler runs after the envelope has been acknowledged; failures in
//! that late work are logged and swallowed so one bad interaction never takes
//! the process down.

pub mod blocks;
pub mod events;
pub mod gateway;
pub mod render;
pub mod router;
pub mod socket;
