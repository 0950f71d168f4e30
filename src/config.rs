use crate::common::constants::{
    DEFAULT_BASE_URL, DEFAULT_DELAY_MS, DEFAULT_GEOGRAPHY_LEVEL, DEFAULT_POI_RADIUS,
    DEFAULT_TIMEOUT_SECONDS, DEFAULT_TOKEN_URL, ENV_ACCESS_TOKEN, ENV_BASE_URL, ENV_CLIENT_ID,
    ENV_CLIENT_SECRET,
};
use crate::common::error::{EnrichError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub pacing: PacingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Geography resolution level passed to the geographies lookup
    pub geography_level: String,
    /// POI search radius around each coordinate
    pub poi_radius: u32,
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            geography_level: DEFAULT_GEOGRAPHY_LEVEL.to_string(),
            poi_radius: DEFAULT_POI_RADIUS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Delay applied after every row
    pub delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { delay_ms: DEFAULT_DELAY_MS }
    }
}

impl PacingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            client_id: None,
            client_secret: None,
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

/// How requests are authorized, resolved from [`AuthConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum AuthMethod {
    Token(String),
    ClientCredentials {
        client_id: String,
        client_secret: String,
        token_url: String,
    },
}

impl AuthConfig {
    /// A configured access token wins over client credentials.
    pub fn method(&self) -> Result<AuthMethod> {
        if let Some(token) = non_empty(&self.access_token) {
            return Ok(AuthMethod::Token(token.to_string()));
        }
        match (non_empty(&self.client_id), non_empty(&self.client_secret)) {
            (Some(id), Some(secret)) => Ok(AuthMethod::ClientCredentials {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
                token_url: self.token_url.clone(),
            }),
            _ => Err(EnrichError::Config(format!(
                "no credentials configured: set {ENV_ACCESS_TOKEN}, or {ENV_CLIENT_ID} and {ENV_CLIENT_SECRET}"
            ))),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    EnrichError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.auth.access_token = Some(token);
        }
        if let Some(id) = lookup(ENV_CLIENT_ID) {
            self.auth.client_id = Some(id);
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
            self.auth.client_secret = Some(secret);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.api.base_url = url;
        }
    }
}
