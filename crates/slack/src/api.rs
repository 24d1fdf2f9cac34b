use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use wavebot_core::credentials::CredentialStore;

use crate::attachments::OutboundMessage;
use crate::oauth::{AuthError, BotAuthorization, OAuthExchange};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("slack rpc failure: {0}")]
    RpcFailure(String),
    #[error("slack rpc timed out")]
    Timeout,
    #[error("bot is not installed; no token to post with")]
    NotInstalled,
}

/// Outbound messenger seam. Handlers post replies through this; the
/// production implementation is `SlackApiClient`, tests count calls on
/// in-memory stubs.
#[async_trait]
pub trait ChatPoster: Send + Sync {
    async fn post_message(&self, message: &OutboundMessage) -> Result<(), SendError>;
}

/// Slack Web API client over HTTP with a bounded per-request timeout.
/// No retries: a failed post or exchange is surfaced to the caller.
pub struct SlackApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    bot: Option<BotCredentialsWire>,
}

#[derive(Debug, Deserialize)]
struct BotCredentialsWire {
    bot_user_id: String,
    bot_access_token: String,
}

impl SlackApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        store: Arc<CredentialStore>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into(), store })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatPoster for SlackApiClient {
    async fn post_message(&self, message: &OutboundMessage) -> Result<(), SendError> {
        let snapshot = self.store.snapshot();
        let token = snapshot.bot_token.as_ref().ok_or(SendError::NotInstalled)?;

        let response = self
            .http
            .post(self.endpoint("chat.postMessage"))
            .bearer_auth(token.expose_secret())
            .json(message)
            .send()
            .await
            .map_err(send_transport_error)?;

        let envelope =
            response.json::<ApiEnvelope>().await.map_err(send_transport_error)?;
        if !envelope.ok {
            return Err(SendError::RpcFailure(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        debug!(event_name = "slack.api.message_posted", channel = %message.channel, "message posted");
        Ok(())
    }
}

#[async_trait]
impl OAuthExchange for SlackApiClient {
    async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &SecretString,
        code: &str,
    ) -> Result<BotAuthorization, AuthError> {
        let response = self
            .http
            .post(self.endpoint("oauth.access"))
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret.expose_secret()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(auth_transport_error)?;

        let envelope = response.json::<ApiEnvelope>().await.map_err(auth_transport_error)?;
        if !envelope.ok {
            return Err(AuthError::ExchangeFailed(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let bot = envelope.bot.ok_or_else(|| {
            AuthError::ExchangeFailed("exchange response carried no bot credentials".to_string())
        })?;

        Ok(BotAuthorization {
            bot_user_id: bot.bot_user_id,
            bot_access_token: bot.bot_access_token.into(),
        })
    }
}

fn send_transport_error(error: reqwest::Error) -> SendError {
    if error.is_timeout() {
        SendError::Timeout
    } else {
        SendError::RpcFailure(error.to_string())
    }
}

fn auth_transport_error(error: reqwest::Error) -> AuthError {
    if error.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::ExchangeFailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use wavebot_core::credentials::{CredentialStore, Credentials};

    use super::{ChatPoster, SendError, SlackApiClient};
    use crate::attachments::greeting_message;

    fn uninstalled_store() -> Arc<CredentialStore> {
        Arc::new(CredentialStore::new(Credentials {
            client_id: "12345.67890".to_string(),
            client_secret: "shh".to_string().into(),
            verification_token: "vtok".to_string().into(),
            bot_token: None,
            bot_user_id: None,
        }))
    }

    #[tokio::test]
    async fn post_message_requires_an_installed_bot_token() {
        let client = SlackApiClient::new(
            "https://slack.invalid/api",
            Duration::from_secs(1),
            uninstalled_store(),
        )
        .expect("client builds");

        let result = client.post_message(&greeting_message("C1")).await;
        assert!(matches!(result, Err(SendError::NotInstalled)));
    }

    #[test]
    fn endpoint_joins_base_url_without_duplicate_slash() {
        let client = SlackApiClient::new(
            "https://slack.invalid/api/",
            Duration::from_secs(1),
            uninstalled_store(),
        )
        .expect("client builds");

        assert_eq!(client.endpoint("chat.postMessage"), "https://slack.invalid/api/chat.postMessage");
    }
}
