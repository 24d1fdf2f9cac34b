//! Slack integration - event routing and Web API access
//!
//! This crate provides the Slack-facing half of wavebot:
//! - **Events** (`events`) - inbound payload model and the request router
//! - **Handlers** (`handlers`) - the greeting service and button responders
//! - **Attachments** (`attachments`) - legacy attachment/button builders
//! - **Web API** (`api`) - `chat.postMessage` and `oauth.access` over HTTP
//! - **OAuth** (`oauth`) - the code-for-token install flow
//!
//! # Architecture
//!
//! ```text
//! HTTP body → EventRouter (verify token, classify) → Handler
//!                  │                                    │
//!                  └── RouterReply ← HTTP response      └→ ChatPoster (optional)
//! ```
//!
//! # Key Types
//!
//! - `EventRouter` - classifies inbound payloads and dispatches handlers
//! - `GreetingService` - answers mention+"hello" messages in channel
//! - `Installer` - exchanges the one-time OAuth code and updates credentials
//! - `SlackApiClient` - reqwest-backed Web API client with bounded timeouts

pub mod api;
pub mod attachments;
pub mod events;
pub mod handlers;
pub mod oauth;
