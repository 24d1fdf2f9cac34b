use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};
use wavebot_core::credentials::CredentialStore;

use crate::api::{ChatPoster, SendError};
use crate::attachments::greeting_message;
use crate::events::MessageEvent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// The greeting was posted to the channel.
    Greeted,
    /// No handler matched; the router still acks the event.
    Ignored,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Send(#[from] SendError),
}

#[async_trait]
pub trait MessageService: Send + Sync {
    async fn handle_message(&self, event: &MessageEvent) -> Result<HandlerResult, HandlerError>;
}

/// Capability slot for message understanding. Nothing ships behind it; the
/// default classifier recognizes no intents.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Option<String>;
}

#[derive(Default)]
pub struct NoopIntentClassifier;

impl IntentClassifier for NoopIntentClassifier {
    fn classify(&self, _text: &str) -> Option<String> {
        None
    }
}

/// Answers channel messages that greet the bot by name.
///
/// The trigger is a plain substring test: the text must contain both the
/// bot's `<@...>` mention tag and the literal `hello` (case sensitive, no
/// word-boundary matching). Everything else falls through to the intent
/// classifier, which today classifies nothing.
pub struct GreetingService {
    store: Arc<CredentialStore>,
    poster: Arc<dyn ChatPoster>,
    classifier: Arc<dyn IntentClassifier>,
}

impl GreetingService {
    pub fn new(
        store: Arc<CredentialStore>,
        poster: Arc<dyn ChatPoster>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        Self { store, poster, classifier }
    }
}

#[async_trait]
impl MessageService for GreetingService {
    async fn handle_message(&self, event: &MessageEvent) -> Result<HandlerResult, HandlerError> {
        let snapshot = self.store.snapshot();
        let Some(mention) = snapshot.mention_tag() else {
            warn!(
                event_name = "slack.handler.not_installed",
                channel = %event.channel,
                "message received before install; no bot identity to match against"
            );
            return Ok(HandlerResult::Ignored);
        };

        if event.text.contains(&mention) && event.text.contains("hello") {
            self.poster.post_message(&greeting_message(&event.channel)).await?;
            return Ok(HandlerResult::Greeted);
        }

        if let Some(intent) = self.classifier.classify(&event.text) {
            debug!(
                event_name = "slack.handler.unhandled_intent",
                intent = %intent,
                "classifier produced an intent with no registered handler"
            );
        }

        Ok(HandlerResult::Ignored)
    }
}

const MAC_SETUP_TEXT: &str = "Great choice! Open Terminal, install Homebrew, then run `brew install wavebot-cli` and follow the prompts.";
const WIN_SETUP_TEXT: &str = "Great choice! Open PowerShell as Administrator, run `winget install wavebot-cli`, then restart your shell.";

/// Responds to an interactive button press. Pure function of the action
/// value: the body is returned verbatim as the HTTP response, which is how
/// Slack's button protocol replaces the original message. Unknown values
/// echo back as a debugging aid rather than an error.
pub fn action_response(value: &str) -> String {
    match value {
        "mac" => ephemeral_body(MAC_SETUP_TEXT),
        "win" => ephemeral_body(WIN_SETUP_TEXT),
        other => format!("No handler found for action `{other}`"),
    }
}

fn ephemeral_body(text: &str) -> String {
    json!({
        "response_type": "ephemeral",
        "replace_original": false,
        "text": text,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use wavebot_core::credentials::{CredentialStore, Credentials};

    use super::{
        action_response, GreetingService, HandlerResult, MessageService, NoopIntentClassifier,
    };
    use crate::api::{ChatPoster, SendError};
    use crate::attachments::OutboundMessage;
    use crate::events::MessageEvent;

    #[derive(Default)]
    struct CountingPoster {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatPoster for CountingPoster {
        async fn post_message(&self, _message: &OutboundMessage) -> Result<(), SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn installed_store() -> Arc<CredentialStore> {
        let store = CredentialStore::new(Credentials {
            client_id: "12345.67890".to_string(),
            client_secret: "shh".to_string().into(),
            verification_token: "vtok".to_string().into(),
            bot_token: None,
            bot_user_id: None,
        });
        store.install("xoxb-T1".to_string().into(), "UBOT".to_string());
        Arc::new(store)
    }

    fn service(store: Arc<CredentialStore>, poster: Arc<CountingPoster>) -> GreetingService {
        GreetingService::new(store, poster, Arc::new(NoopIntentClassifier))
    }

    fn message(text: &str) -> MessageEvent {
        MessageEvent {
            channel: "C1".to_string(),
            user: "U2".to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn mention_plus_hello_greets_exactly_once() {
        let poster = Arc::new(CountingPoster::default());
        let service = service(installed_store(), poster.clone());

        let result = service
            .handle_message(&message("<@UBOT> hello there"))
            .await
            .expect("handler should succeed");

        assert_eq!(result, HandlerResult::Greeted);
        assert_eq!(poster.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hello_without_mention_is_ignored() {
        let poster = Arc::new(CountingPoster::default());
        let service = service(installed_store(), poster.clone());

        let result =
            service.handle_message(&message("hello everyone")).await.expect("handler ok");

        assert_eq!(result, HandlerResult::Ignored);
        assert_eq!(poster.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn mention_without_hello_is_ignored() {
        let poster = Arc::new(CountingPoster::default());
        let service = service(installed_store(), poster.clone());

        let result =
            service.handle_message(&message("<@UBOT> good morning")).await.expect("handler ok");

        assert_eq!(result, HandlerResult::Ignored);
        assert_eq!(poster.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn matching_is_case_sensitive_substring_search() {
        let poster = Arc::new(CountingPoster::default());
        let service = service(installed_store(), poster.clone());

        // "Hello" does not match the literal lower-case trigger.
        let result =
            service.handle_message(&message("<@UBOT> Hello!")).await.expect("handler ok");
        assert_eq!(result, HandlerResult::Ignored);

        // Embedded substrings do: "othello" contains "hello".
        let result =
            service.handle_message(&message("<@UBOT> othello")).await.expect("handler ok");
        assert_eq!(result, HandlerResult::Greeted);
        assert_eq!(poster.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn messages_before_install_are_ignored() {
        let store = Arc::new(CredentialStore::new(Credentials {
            client_id: "12345.67890".to_string(),
            client_secret: "shh".to_string().into(),
            verification_token: "vtok".to_string().into(),
            bot_token: None,
            bot_user_id: None,
        }));
        let poster = Arc::new(CountingPoster::default());
        let service = service(store, poster.clone());

        let result = service.handle_message(&message("hello")).await.expect("handler ok");

        assert_eq!(result, HandlerResult::Ignored);
        assert_eq!(poster.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mac_and_win_responses_are_deterministic_and_distinct() {
        let mac_first = action_response("mac");
        let mac_second = action_response("mac");
        let win = action_response("win");

        assert_eq!(mac_first, mac_second);
        assert_ne!(mac_first, win);
        assert!(mac_first.contains("\"response_type\":\"ephemeral\""));
        assert!(win.contains("\"response_type\":\"ephemeral\""));
        assert!(mac_first.contains("\"replace_original\":false"));
    }

    #[test]
    fn unknown_action_value_is_echoed_back() {
        let body = action_response("linux");
        assert!(body.contains("linux"));
        assert!(!body.contains("ephemeral"));
    }
}
