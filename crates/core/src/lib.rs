pub mod config;
pub mod credentials;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use credentials::{CredentialStore, Credentials};
