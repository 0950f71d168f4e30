use crate::app::ports::CredentialPort;
use crate::common::error::{EnrichError, Result};
use crate::config::AuthMethod;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| EnrichError::Credentials(format!("token is not a valid header value: {e}")))?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// A fixed bearer token.
pub struct StaticToken(pub String);

#[async_trait]
impl CredentialPort for StaticToken {
    async fn headers(&self) -> Result<HeaderMap> {
        bearer_headers(&self.0)
    }
}

/// Exchanges a client id and secret for an access token on first use and
/// reuses it for the rest of the run.
pub struct ClientCredentials {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    token: Mutex<Option<String>>,
}

impl ClientCredentials {
    pub fn new(client: reqwest::Client, client_id: String, client_secret: String, token_url: String) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            token_url,
            token: Mutex::new(None),
        }
    }

    async fn fetch_token(&self) -> Result<String> {
        info!("🔑 Requesting access token from {}", self.token_url);
        let body: Value = self
            .client
            .get(&self.token_url)
            .query(&[("client_id", &self.client_id), ("client_secret", &self.client_secret)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_token(&body)
    }
}

pub(crate) fn parse_token(body: &Value) -> Result<String> {
    body["access_token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| EnrichError::Credentials("token response has no access_token".into()))
}

#[async_trait]
impl CredentialPort for ClientCredentials {
    async fn headers(&self) -> Result<HeaderMap> {
        let mut cached = self.token.lock().await;
        if cached.is_none() {
            *cached = Some(self.fetch_token().await?);
        } else {
            debug!("Reusing cached access token");
        }
        match cached.as_deref() {
            Some(token) => bearer_headers(token),
            None => Err(EnrichError::Credentials("access token unavailable".into())),
        }
    }
}

/// Build the credential provider for the configured auth method.
pub fn provider_for(method: AuthMethod, client: reqwest::Client) -> Arc<dyn CredentialPort> {
    match method {
        AuthMethod::Token(token) => Arc::new(StaticToken(token)),
        AuthMethod::ClientCredentials {
            client_id,
            client_secret,
            token_url,
        } => Arc::new(ClientCredentials::new(client, client_id, client_secret, token_url)),
    }
}
