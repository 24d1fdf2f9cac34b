use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tracing::{info, warn};
use wavebot_core::config::{AppConfig, ConfigError, LoadOptions};
use wavebot_core::credentials::{CredentialStore, Credentials};
use wavebot_slack::api::SlackApiClient;
use wavebot_slack::events::EventRouter;
use wavebot_slack::handlers::{GreetingService, NoopIntentClassifier};
use wavebot_slack::oauth::Installer;

use crate::routes;

pub struct Application {
    pub config: AppConfig,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    // Missing credentials degrade the service instead of failing startup:
    // the install page and URL verification must stay reachable so the app
    // can be wired up through the browser.
    let missing_credentials = config.missing_credentials();
    for name in &missing_credentials {
        warn!(
            event_name = "system.bootstrap.missing_credential",
            credential = name,
            "credential not configured; running in degraded mode"
        );
    }

    let store = Arc::new(CredentialStore::new(Credentials::from_config(&config.slack)));
    if store.is_installed() {
        info!(
            event_name = "system.bootstrap.preinstalled",
            "bot token supplied through configuration; skipping install flow"
        );
    }

    let api = Arc::new(
        SlackApiClient::new(
            config.api.base_url.clone(),
            Duration::from_secs(config.api.timeout_secs),
            store.clone(),
        )
        .map_err(BootstrapError::HttpClient)?,
    );

    let messages = Arc::new(GreetingService::new(
        store.clone(),
        api.clone(),
        Arc::new(NoopIntentClassifier),
    ));
    let events = Arc::new(EventRouter::new(store.clone(), messages));
    let installer = Arc::new(Installer::new(store.clone(), api));

    let router = routes::router(store, events, installer, missing_credentials);
    info!(event_name = "system.bootstrap.ready", "application bootstrap complete");

    Ok(Application { config, router })
}

#[cfg(test)]
mod tests {
    use wavebot_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    #[tokio::test]
    async fn bootstrap_succeeds_without_credentials() {
        let app = bootstrap(LoadOptions::default())
            .await
            .expect("bootstrap should start in degraded mode");

        assert_eq!(app.config.api.base_url, "https://slack.com/api");
    }

    #[tokio::test]
    async fn bootstrap_rejects_malformed_base_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                api_base_url: Some("not-a-url".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("api.base_url"));
    }
}
