use std::sync::{Arc, RwLock};

use secrecy::SecretString;

use crate::config::SlackConfig;

/// One immutable credential snapshot. Secrets live only as long as the
/// process; a restart requires a fresh install unless the bot token was
/// supplied through configuration.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub verification_token: SecretString,
    pub bot_token: Option<SecretString>,
    pub bot_user_id: Option<String>,
}

impl Credentials {
    pub fn from_config(slack: &SlackConfig) -> Self {
        Self {
            client_id: slack.client_id.clone(),
            client_secret: slack.client_secret.clone(),
            verification_token: slack.verification_token.clone(),
            bot_token: slack.bot_token.clone(),
            bot_user_id: slack.bot_user_id.clone(),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.bot_token.is_some() && self.bot_user_id.is_some()
    }

    /// The `<@Uxxxx>` tag Slack substitutes for an at-mention of the bot.
    pub fn mention_tag(&self) -> Option<String> {
        self.bot_user_id.as_deref().map(|id| format!("<@{id}>"))
    }
}

/// Shared owner of the current credential snapshot.
///
/// Reads take a cheap `Arc` clone; an install replaces the snapshot
/// wholesale, so concurrent requests observe either the old or the fully
/// updated credential set, never a torn token/user-id pair. Racing installs
/// are last-writer-wins; acceptable for a single-tenant bot.
pub struct CredentialStore {
    current: RwLock<Arc<Credentials>>,
}

impl CredentialStore {
    pub fn new(initial: Credentials) -> Self {
        Self { current: RwLock::new(Arc::new(initial)) }
    }

    pub fn snapshot(&self) -> Arc<Credentials> {
        self.current.read().expect("credential lock poisoned").clone()
    }

    pub fn is_installed(&self) -> bool {
        self.snapshot().is_installed()
    }

    /// Record a completed install. Called once per successful OAuth
    /// exchange; overwrites any previous bot token.
    pub fn install(&self, bot_token: SecretString, bot_user_id: String) -> Arc<Credentials> {
        let mut guard = self.current.write().expect("credential lock poisoned");
        let mut next = (**guard).clone();
        next.bot_token = Some(bot_token);
        next.bot_user_id = Some(bot_user_id);
        let next = Arc::new(next);
        *guard = next.clone();
        next
    }
}
