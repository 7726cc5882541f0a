//! Server configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `doctrack.toml` (path overridable with `DOCTRACK_CONFIG`), then
//! `DOCTRACK__SECTION__KEY` environment variables.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use doctrack_auth::AuthConfig;
use doctrack_db::DbConfig;
use doctrack_records::StorageConfig;
use doctrack_sms::SmsConfig;
use serde::Deserialize;

use crate::state::AppSettings;

const DEFAULT_CONFIG_FILE: &str = "doctrack.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Mark the session cookie `Secure`. Enable behind TLS.
    pub cookie_secure: bool,
    /// Seconds between expired-session sweeps.
    pub session_cleanup_interval_secs: u64,
    pub database: DatabaseSection,
    pub auth: AuthSection,
    pub sms: SmsSection,
    pub storage: StorageSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            cookie_secure: false,
            session_cleanup_interval_secs: 3600,
            database: DatabaseSection::default(),
            auth: AuthSection::default(),
            sms: SmsSection::default(),
            storage: StorageSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let db = DbConfig::default();
        Self {
            url: db.url,
            namespace: db.namespace,
            database: db.database,
            username: db.username,
            password: db.password,
        }
    }
}

/// Signing keys are given inline or as paths to PEM files. Inline wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub private_key_pem: Option<String>,
    pub private_key_file: Option<PathBuf>,
    pub public_key_pem: Option<String>,
    pub public_key_file: Option<PathBuf>,
    pub token_lifetime_secs: u64,
    pub issuer: String,
    pub pepper: Option<String>,
    pub min_password_length: usize,
}

impl Default for AuthSection {
    fn default() -> Self {
        let auth = AuthConfig::default();
        Self {
            private_key_pem: None,
            private_key_file: None,
            public_key_pem: None,
            public_key_file: None,
            token_lifetime_secs: auth.token_lifetime_secs,
            issuer: auth.jwt_issuer,
            pepper: None,
            min_password_length: auth.min_password_length,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmsSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SmsSection {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: SmsConfig::default().timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub root: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root: StorageConfig::default().root,
        }
    }
}

impl ServerConfig {
    /// Load from the config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("DOCTRACK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_owned());
        Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(Environment::with_prefix("DOCTRACK").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.database.url.clone(),
            namespace: self.database.namespace.clone(),
            database: self.database.database.clone(),
            username: self.database.username.clone(),
            password: self.database.password.clone(),
        }
    }

    /// Resolve key material and split into per-crate settings.
    pub fn app_settings(&self) -> Result<AppSettings, ConfigError> {
        let auth = &self.auth;
        Ok(AppSettings {
            auth: AuthConfig {
                jwt_private_key_pem: read_pem(
                    "auth.private_key_pem",
                    &auth.private_key_pem,
                    &auth.private_key_file,
                )?,
                jwt_public_key_pem: read_pem(
                    "auth.public_key_pem",
                    &auth.public_key_pem,
                    &auth.public_key_file,
                )?,
                token_lifetime_secs: auth.token_lifetime_secs,
                jwt_issuer: auth.issuer.clone(),
                pepper: auth.pepper.clone().filter(|p| !p.is_empty()),
                min_password_length: auth.min_password_length,
            },
            sms: SmsConfig {
                url: self.sms.url.clone(),
                api_key: self.sms.api_key.clone(),
                timeout_secs: self.sms.timeout_secs,
            },
            storage: StorageConfig {
                root: self.storage.root.clone(),
            },
            cookie_secure: self.cookie_secure,
        })
    }
}

fn read_pem(
    key: &str,
    inline: &Option<String>,
    file: &Option<PathBuf>,
) -> Result<String, ConfigError> {
    if let Some(pem) = inline.as_deref().filter(|p| !p.trim().is_empty()) {
        return Ok(pem.to_owned());
    }
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Message(format!("{key}: cannot read {}: {e}", path.display()))
        }),
        None => Err(ConfigError::NotFound(key.to_owned())),
    }
}
