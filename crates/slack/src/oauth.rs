use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::info;
use wavebot_core::credentials::{CredentialStore, Credentials};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("oauth code exchange failed: {0}")]
    ExchangeFailed(String),
    #[error("oauth code exchange timed out")]
    Timeout,
    #[error("client credentials are not configured; cannot complete install")]
    MissingCredentials,
}

/// What a successful code exchange yields.
#[derive(Clone, Debug)]
pub struct BotAuthorization {
    pub bot_user_id: String,
    pub bot_access_token: SecretString,
}

/// The one-time-code-for-token RPC. `SlackApiClient` implements this against
/// `oauth.access`; tests substitute stubs.
#[async_trait]
pub trait OAuthExchange: Send + Sync {
    async fn exchange_code(
        &self,
        client_id: &str,
        client_secret: &SecretString,
        code: &str,
    ) -> Result<BotAuthorization, AuthError>;
}

/// Completes an app install: trades the authorization code Slack appended to
/// the redirect for a bot token and records it in the credential store.
///
/// A failed exchange leaves the store untouched and is not retried; the user
/// restarts the install from the beginning.
pub struct Installer {
    store: Arc<CredentialStore>,
    exchange: Arc<dyn OAuthExchange>,
}

impl Installer {
    pub fn new(store: Arc<CredentialStore>, exchange: Arc<dyn OAuthExchange>) -> Self {
        Self { store, exchange }
    }

    pub async fn complete_install(&self, code: &str) -> Result<Arc<Credentials>, AuthError> {
        let snapshot = self.store.snapshot();
        if snapshot.client_id.trim().is_empty()
            || snapshot.client_secret.expose_secret().trim().is_empty()
        {
            return Err(AuthError::MissingCredentials);
        }

        let authorization = self
            .exchange
            .exchange_code(&snapshot.client_id, &snapshot.client_secret, code)
            .await?;

        let installed =
            self.store.install(authorization.bot_access_token, authorization.bot_user_id);
        info!(
            event_name = "slack.oauth.installed",
            bot_user_id = installed.bot_user_id.as_deref().unwrap_or("unknown"),
            "bot token installed"
        );
        Ok(installed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use secrecy::SecretString;
    use wavebot_core::credentials::{CredentialStore, Credentials};

    use super::{AuthError, BotAuthorization, Installer, OAuthExchange};

    struct StubExchange {
        outcome: Result<(&'static str, &'static str), &'static str>,
    }

    #[async_trait]
    impl OAuthExchange for StubExchange {
        async fn exchange_code(
            &self,
            _client_id: &str,
            _client_secret: &SecretString,
            _code: &str,
        ) -> Result<BotAuthorization, AuthError> {
            match self.outcome {
                Ok((user_id, token)) => Ok(BotAuthorization {
                    bot_user_id: user_id.to_string(),
                    bot_access_token: token.to_string().into(),
                }),
                Err(message) => Err(AuthError::ExchangeFailed(message.to_string())),
            }
        }
    }

    fn store() -> Arc<CredentialStore> {
        Arc::new(CredentialStore::new(Credentials {
            client_id: "12345.67890".to_string(),
            client_secret: "shh".to_string().into(),
            verification_token: "vtok".to_string().into(),
            bot_token: None,
            bot_user_id: None,
        }))
    }

    #[tokio::test]
    async fn successful_exchange_populates_the_store() {
        let store = store();
        let installer =
            Installer::new(store.clone(), Arc::new(StubExchange { outcome: Ok(("U1", "T1")) }));

        let installed =
            installer.complete_install("code123").await.expect("install should succeed");

        assert_eq!(installed.bot_user_id.as_deref(), Some("U1"));
        assert_eq!(store.snapshot().bot_user_id.as_deref(), Some("U1"));
        assert!(store.is_installed());
    }

    #[tokio::test]
    async fn failed_exchange_leaves_the_store_unchanged() {
        let store = store();
        let installer = Installer::new(
            store.clone(),
            Arc::new(StubExchange { outcome: Err("invalid_code") }),
        );

        let error = installer
            .complete_install("expired")
            .await
            .expect_err("install should fail when the exchange fails");

        assert!(matches!(error, AuthError::ExchangeFailed(_)));
        assert!(!store.is_installed());
        assert_eq!(store.snapshot().bot_user_id, None);
    }

    #[tokio::test]
    async fn install_refuses_without_client_credentials() {
        let store = Arc::new(CredentialStore::new(Credentials {
            client_id: String::new(),
            client_secret: String::new().into(),
            verification_token: "vtok".to_string().into(),
            bot_token: None,
            bot_user_id: None,
        }));
        let installer =
            Installer::new(store.clone(), Arc::new(StubExchange { outcome: Ok(("U1", "T1")) }));

        let error = installer.complete_install("code123").await.expect_err("must refuse");
        assert!(matches!(error, AuthError::MissingCredentials));
        assert!(!store.is_installed());
    }
}
