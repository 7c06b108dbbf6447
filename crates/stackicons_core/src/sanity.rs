use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use reqwest::blocking::{Client, Request};
use serde_json::Value;
use tracing::debug;

use crate::config::StoreSettings;
use crate::store::{DocumentStore, MutationRequest, WriteOutcome};

#[derive(Debug, Clone)]
pub struct SanityClientConfig {
    pub query_url: Url,
    pub mutate_url: Url,
    pub token: String,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl SanityClientConfig {
    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        let token = settings
            .token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("SANITY_TOKEN is not set"))?;
        Ok(Self {
            query_url: endpoint_url(settings, "query")?,
            mutate_url: endpoint_url(settings, "mutate")?,
            token,
            user_agent: settings.user_agent.clone(),
            timeout_ms: settings.timeout_ms,
        })
    }
}

/// `https://<project>.api.sanity.io/v<version>/data/<action>/<dataset>`
pub fn endpoint_url(settings: &StoreSettings, action: &str) -> Result<Url> {
    let raw = format!(
        "https://{}.api.sanity.io/v{}/data/{}/{}",
        settings.project_id.trim(),
        settings.api_version.trim().trim_start_matches('v'),
        action,
        settings.dataset.trim()
    );
    let url = Url::parse(&raw).with_context(|| format!("invalid Sanity endpoint: {raw}"))?;
    let expected_host = format!("{}.api.sanity.io", settings.project_id.trim());
    if url.host_str() != Some(expected_host.as_str()) {
        bail!("invalid Sanity project id: {}", settings.project_id);
    }
    Ok(url)
}

pub struct SanityClient {
    client: Client,
    config: SanityClientConfig,
    request_count: usize,
}

impl SanityClient {
    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        Self::new(SanityClientConfig::from_settings(settings)?)
    }

    pub fn new(config: SanityClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build Sanity HTTP client")?;
        Ok(Self {
            client,
            config,
            request_count: 0,
        })
    }

    pub fn query_request(&self, query: &str) -> Result<Request> {
        self.client
            .get(self.config.query_url.clone())
            .header("User-Agent", self.config.user_agent.clone())
            .bearer_auth(&self.config.token)
            .query(&[("query", query)])
            .build()
            .context("failed to build Sanity query request")
    }

    pub fn mutate_request(&self, request: &MutationRequest) -> Result<Request> {
        self.client
            .post(self.config.mutate_url.clone())
            .header("User-Agent", self.config.user_agent.clone())
            .bearer_auth(&self.config.token)
            .json(request)
            .build()
            .context("failed to build Sanity mutate request")
    }
}

impl DocumentStore for SanityClient {
    fn read(&mut self, query: &str) -> Result<Value> {
        self.request_count += 1;
        let request = self.query_request(query)?;
        debug!(url = %self.config.query_url, "GET query");
        let response = self
            .client
            .execute(request)
            .context("failed to call Sanity query API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("Sanity query failed with HTTP {status}: {body}");
        }
        response
            .json()
            .context("failed to decode Sanity query JSON response")
    }

    fn write(&mut self, request: &MutationRequest) -> Result<WriteOutcome> {
        self.request_count += 1;
        let http_request = self.mutate_request(request)?;
        debug!(url = %self.config.mutate_url, mutations = request.mutations.len(), "POST mutate");
        let response = self
            .client
            .execute(http_request)
            .context("failed to call Sanity mutate API")?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .context("failed to read Sanity mutate response body")?;
        Ok(WriteOutcome { status, body })
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}
