//! Locality provider client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::APP_USER_AGENT;

use super::input::AuState;
use super::locality::{Locality, ProviderPayload};

/// Lookup of candidate localities for a postcode/state pair.
#[async_trait]
pub trait LocalityLookup: Send + Sync {
    async fn lookup(&self, postcode: &str, state: AuState) -> Result<Vec<Locality>>;
}

/// HTTP client for the external postcode search API.
#[derive(Debug, Clone)]
pub struct PostalClient {
    client: Client,
    base_url: String,
    token: SecretString,
}

impl PostalClient {
    /// Build the client; the base URL is validated up front so a bad
    /// configuration fails at startup rather than on the first request.
    pub fn new(base_url: String, token: SecretString) -> Result<Self> {
        Url::parse(&base_url)
            .with_context(|| format!("Invalid provider base URL: {base_url}"))?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("Failed to build provider HTTP client")?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }
}

#[async_trait]
impl LocalityLookup for PostalClient {
    async fn lookup(&self, postcode: &str, state: AuState) -> Result<Vec<Locality>> {
        // The provider signals "no results" in the body, not the status
        // line, so the body is parsed regardless of the response code.
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", postcode), ("state", state.as_str())])
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .context("locality provider request failed")?;

        let payload: ProviderPayload = response
            .json()
            .await
            .context("locality provider returned an unreadable body")?;

        Ok(payload.into_localities())
    }
}
