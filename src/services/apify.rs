// src/services/apify.rs
//! Apify v2 API client: actor runs with completion webhooks, dataset download

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info};

use crate::core::config_manager::ServiceConfig;

pub const RUN_SUCCEEDED: &str = "ACTOR.RUN.SUCCEEDED";
pub const RUN_FAILED: &str = "ACTOR.RUN.FAILED";

/// A started actor run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActorRun {
    pub id: String,
    #[serde(rename = "defaultDatasetId", default)]
    pub default_dataset_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    data: ActorRun,
}

/// Body Apify posts to a run webhook
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookPayload {
    #[serde(rename = "eventType", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub resource: WebhookResource,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookResource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "defaultDatasetId", default)]
    pub default_dataset_id: Option<String>,
}

impl WebhookPayload {
    /// Parse an arbitrary JSON body; missing or mistyped fields become `None`
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn run_id(&self) -> Option<&str> {
        self.resource.id.as_deref()
    }

    pub fn dataset_id(&self) -> Option<&str> {
        self.resource.default_dataset_id.as_deref()
    }

    /// True for a successful run that produced a dataset
    pub fn should_fetch(&self) -> bool {
        self.event_type.as_deref() == Some(RUN_SUCCEEDED) && self.dataset_id().is_some()
    }
}

pub struct ApifyService {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl ApifyService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            token: config.apify_token.clone(),
            base_url: config.apify_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .context("APIFY_API_TOKEN is not configured")
    }

    /// Start an actor run. When `webhook_url` is given, Apify calls it on success or failure.
    pub async fn run_actor(
        &self,
        actor_id: &str,
        run_input: &Value,
        webhook_url: Option<&str>,
    ) -> Result<ActorRun> {
        let token = self.token()?;
        let url = api_url(&self.base_url, &["v2", "acts", actor_path(actor_id).as_str(), "runs"])?;

        let mut query: Vec<(&str, String)> = vec![("token", token.to_string())];
        if let Some(webhook) = webhook_url {
            query.push(("webhooks", encode_webhooks(webhook)?));
        }

        info!("Starting Apify actor {}", actor_id);

        let response = self
            .client
            .post(url)
            .query(&query)
            .json(run_input)
            .send()
            .await
            .context("Failed to call Apify actor run endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Apify actor {} failed to start: {} {}", actor_id, status, body);
            anyhow::bail!("Apify returned error status {}: {}", status, body);
        }

        let envelope: RunEnvelope = response
            .json()
            .await
            .context("Failed to parse Apify run response")?;

        info!("Apify run {} started for actor {}", envelope.data.id, actor_id);
        Ok(envelope.data)
    }

    /// All items of a dataset as raw JSON
    pub async fn get_dataset_items(&self, dataset_id: &str) -> Result<Vec<Value>> {
        let token = self.token()?;
        let url = api_url(&self.base_url, &["v2", "datasets", dataset_id, "items"])?;

        let response = self
            .client
            .get(url)
            .query(&[("token", token), ("clean", "true"), ("format", "json")])
            .send()
            .await
            .context("Failed to fetch Apify dataset")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Apify dataset {} fetch failed: {} {}", dataset_id, status, body);
            anyhow::bail!("Apify returned error status {}: {}", status, body);
        }

        let items: Vec<Value> = response
            .json()
            .await
            .with_context(|| format!("Dataset {} is not a JSON array", dataset_id))?;

        info!("Fetched {} items from dataset {}", items.len(), dataset_id);
        Ok(items)
    }
}

/// Append path segments to the API base. Each id stays one segment, `/` and `%` included.
pub fn api_url(base_url: &str, segments: &[&str]) -> Result<reqwest::Url> {
    if let Some(bad) = segments.iter().find(|s| s.is_empty() || **s == "." || **s == "..") {
        anyhow::bail!("Invalid Apify path segment '{}'", bad);
    }

    let mut url = reqwest::Url::parse(base_url)
        .with_context(|| format!("APIFY_BASE_URL is not a valid URL: {}", base_url))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("APIFY_BASE_URL cannot carry a path: {}", base_url))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `user/actor` becomes `user~actor` in API paths
pub fn actor_path(actor_id: &str) -> String {
    actor_id.trim().replace('/', "~")
}

/// Base64 JSON list of ad-hoc webhooks for run completion
pub fn encode_webhooks(request_url: &str) -> Result<String> {
    let webhooks = json!([{
        "eventTypes": [RUN_SUCCEEDED, RUN_FAILED],
        "requestUrl": request_url,
    }]);
    let raw = serde_json::to_vec(&webhooks).context("Failed to serialize webhooks")?;
    Ok(STANDARD.encode(raw))
}
