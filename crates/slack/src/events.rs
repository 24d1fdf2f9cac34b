use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wavebot_core::credentials::CredentialStore;

use crate::handlers::{action_response, HandlerResult, MessageService};

/// Body Slack receives for anything the router cannot classify. The fixed
/// diagnostic line matches the events-adapter this endpoint is a drop-in
/// replacement for, so existing dashboards keep matching.
pub const UNRECOGNIZED_PAYLOAD_BODY: &str = "These are not the droids you're looking for.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundEvent {
    UrlVerification { challenge: String },
    EventCallback { token: String, event: CallbackEvent },
    Interactive(ActionInvocation),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackEvent {
    Message(MessageEvent),
    Unsupported { event_type: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel: String,
    pub user: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionInvocation {
    pub token: String,
    pub action_value: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload matches no known shape")]
    UnrecognizedShape,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Classify the JSON body of the event endpoint.
///
/// A `challenge` field wins over everything else (Slack's liveness probe
/// may carry extra fields); an `event` object makes it an event callback.
pub fn parse_event_body(body: &str) -> Result<InboundEvent, PayloadError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| PayloadError::MalformedPayload(error.to_string()))?;

    if let Some(challenge) = value.get("challenge").and_then(Value::as_str) {
        return Ok(InboundEvent::UrlVerification { challenge: challenge.to_string() });
    }

    let Some(event) = value.get("event") else {
        return Err(PayloadError::UnrecognizedShape);
    };

    // A missing token never matches the stored one, so it fails closed.
    let token = value.get("token").and_then(Value::as_str).unwrap_or_default().to_string();
    let event_type = event.get("type").and_then(Value::as_str).unwrap_or_default();

    let event = match event_type {
        "message" => CallbackEvent::Message(MessageEvent {
            channel: string_field(event, "channel"),
            user: string_field(event, "user"),
            text: string_field(event, "text"),
        }),
        other => CallbackEvent::Unsupported { event_type: other.to_string() },
    };

    Ok(InboundEvent::EventCallback { token, event })
}

/// Classify the form-encoded body of the interactive action endpoint:
/// a `payload` field holding JSON with `token` and `actions[0].value`.
pub fn parse_action_form(body: &str) -> Result<InboundEvent, PayloadError> {
    #[derive(Deserialize)]
    struct ActionForm {
        payload: String,
    }

    let form: ActionForm = serde_urlencoded::from_str(body)
        .map_err(|error| PayloadError::MalformedPayload(error.to_string()))?;
    let payload: Value = serde_json::from_str(&form.payload)
        .map_err(|error| PayloadError::MalformedPayload(error.to_string()))?;

    let token = payload.get("token").and_then(Value::as_str).unwrap_or_default().to_string();
    let action_value = payload
        .get("actions")
        .and_then(Value::as_array)
        .and_then(|actions| actions.first())
        .and_then(|action| action.get("value"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            PayloadError::MalformedPayload("payload carries no actions[0].value".to_string())
        })?
        .to_string();

    Ok(InboundEvent::Interactive(ActionInvocation { token, action_value }))
}

fn string_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Terminal classification of one inbound request. The HTTP layer maps
/// these onto status codes, bodies, and the `X-Slack-No-Retry` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterReply {
    /// 200, `application/json`, body is the challenge value byte-for-byte.
    Challenge(String),
    /// 200, empty ack; a handler ran (or deliberately ignored the event).
    Ack,
    /// 200 with `X-Slack-No-Retry: 1`; understood shape, no handler.
    AckNoRetry(String),
    /// 200, handler body returned verbatim (interactive button protocol).
    ActionBody(String),
    /// 403; request token did not match, nothing was dispatched.
    Forbidden,
    /// 404 with `X-Slack-No-Retry: 1` and the fixed diagnostic body.
    NotFound(String),
}

/// Routes inbound Slack payloads: classify, verify the request token, then
/// dispatch. Verification happens before any handler runs; only the URL
/// verification handshake bypasses it. Handler failures are logged and
/// acked, never surfaced as a 5xx.
pub struct EventRouter {
    store: Arc<CredentialStore>,
    messages: Arc<dyn MessageService>,
}

impl EventRouter {
    pub fn new(store: Arc<CredentialStore>, messages: Arc<dyn MessageService>) -> Self {
        Self { store, messages }
    }

    pub async fn handle_event_body(&self, body: &str) -> RouterReply {
        let correlation_id = Uuid::new_v4().to_string();

        let inbound = match parse_event_body(body) {
            Ok(inbound) => inbound,
            Err(error) => {
                debug!(
                    event_name = "slack.router.unrecognized_payload",
                    correlation_id = %correlation_id,
                    error = %error,
                    "event body matches no known shape"
                );
                return RouterReply::NotFound(UNRECOGNIZED_PAYLOAD_BODY.to_string());
            }
        };

        match inbound {
            InboundEvent::UrlVerification { challenge } => {
                info!(
                    event_name = "slack.router.url_verification",
                    correlation_id = %correlation_id,
                    "answering url verification challenge"
                );
                RouterReply::Challenge(challenge)
            }
            InboundEvent::EventCallback { token, event } => {
                if !self.token_matches(&token) {
                    warn!(
                        event_name = "slack.router.token_mismatch",
                        correlation_id = %correlation_id,
                        "event callback token mismatch; refusing dispatch"
                    );
                    return RouterReply::Forbidden;
                }
                self.dispatch_callback(event, &correlation_id).await
            }
            // Interactive payloads only arrive through the action endpoint.
            InboundEvent::Interactive(_) => {
                RouterReply::NotFound(UNRECOGNIZED_PAYLOAD_BODY.to_string())
            }
        }
    }

    pub async fn handle_action_body(&self, body: &str) -> RouterReply {
        let correlation_id = Uuid::new_v4().to_string();

        let invocation = match parse_action_form(body) {
            Ok(InboundEvent::Interactive(invocation)) => invocation,
            Ok(_) | Err(_) => {
                debug!(
                    event_name = "slack.router.unrecognized_payload",
                    correlation_id = %correlation_id,
                    "action body matches no known shape"
                );
                return RouterReply::NotFound(UNRECOGNIZED_PAYLOAD_BODY.to_string());
            }
        };

        if !self.token_matches(&invocation.token) {
            warn!(
                event_name = "slack.router.token_mismatch",
                correlation_id = %correlation_id,
                "interactive action token mismatch; refusing dispatch"
            );
            return RouterReply::Forbidden;
        }

        debug!(
            event_name = "slack.router.action_dispatched",
            correlation_id = %correlation_id,
            action_value = %invocation.action_value,
            "interactive action dispatched"
        );
        RouterReply::ActionBody(action_response(&invocation.action_value))
    }

    async fn dispatch_callback(&self, event: CallbackEvent, correlation_id: &str) -> RouterReply {
        match event {
            CallbackEvent::Message(message) => {
                match self.messages.handle_message(&message).await {
                    Ok(HandlerResult::Greeted) => {
                        info!(
                            event_name = "slack.router.greeted",
                            correlation_id = %correlation_id,
                            channel = %message.channel,
                            "greeting posted"
                        );
                    }
                    Ok(HandlerResult::Ignored) => {}
                    // Slack wants its ack within seconds regardless of what
                    // the handler did, so failures end here.
                    Err(error) => {
                        warn!(
                            event_name = "slack.router.handler_failed",
                            correlation_id = %correlation_id,
                            error = %error,
                            "message handler failed; acking anyway"
                        );
                    }
                }
                RouterReply::Ack
            }
            CallbackEvent::Unsupported { event_type } => {
                debug!(
                    event_name = "slack.router.unsupported_event",
                    correlation_id = %correlation_id,
                    event_type = %event_type,
                    "no handler registered for event type"
                );
                RouterReply::AckNoRetry(format!("no handler for event type `{event_type}`"))
            }
        }
    }

    fn token_matches(&self, provided: &str) -> bool {
        let snapshot = self.store.snapshot();
        let expected = snapshot.verification_token.expose_secret();
        // An unconfigured verification token can never verify anything;
        // fail closed rather than matching the empty string.
        if expected.is_empty() {
            return false;
        }
        constant_time_eq(expected, provided)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}
