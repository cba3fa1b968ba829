//! Registry client for plugin metadata lookups.
//!
//! Each lookup is a single `GET <base-url>/<slug>.json`. Anything other
//! than a successful response carrying a non-empty JSON payload is
//! reported as a [`RegistryError`] so callers can decide how to recover.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::SkipReason;

/// Errors returned by a registry lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("registry responded with HTTP {0}")]
    Status(u16),

    #[error("registry returned an empty response")]
    EmptyBody,

    #[error("registry returned invalid JSON: {0}")]
    InvalidJson(String),
}

impl RegistryError {
    /// Maps the error onto the reason a plugin is left out of the report.
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            RegistryError::Transport(_) => SkipReason::Transport,
            RegistryError::Status(code) => SkipReason::HttpStatus(*code),
            RegistryError::EmptyBody => SkipReason::EmptyBody,
            RegistryError::InvalidJson(_) => SkipReason::InvalidJson,
        }
    }
}

/// Decoded JSON body of a registry response.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryPayload(Value);

impl RegistryPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Whether the payload carries no information at all.
    ///
    /// `null`, `false`, zero, `""`, `"0"` and `[]` count as empty.
    /// Objects never do, even without fields.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty() || s == "0",
            Value::Array(items) => items.is_empty(),
            Value::Object(_) => false,
        }
    }

    /// The `last_updated` field, if the payload is an object that carries one.
    pub fn last_updated(&self) -> Option<String> {
        match self.0.get("last_updated")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Source of plugin metadata keyed by slug.
#[async_trait]
pub trait PluginRegistry: Send + Sync {
    /// Base URL lookups are issued against, for reporting.
    fn base_url(&self) -> &str;

    /// Look up one plugin by slug.
    async fn plugin_info(&self, slug: &str) -> Result<RegistryPayload, RegistryError>;
}

/// The public WordPress.org plugin information API.
pub struct WpOrgRegistry {
    http_client: reqwest::Client,
    base_url: Url,
    base_url_str: String,
}

impl WpOrgRegistry {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid registry URL: {}", base_url))?;

        if parsed.cannot_be_a_base() {
            anyhow::bail!("Registry URL cannot be used as a base: {}", base_url);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: parsed,
            base_url_str: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the metadata document for `slug`.
    pub fn plugin_url(&self, slug: &str) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("{}.json", slug));
        }
        url
    }
}

#[async_trait]
impl PluginRegistry for WpOrgRegistry {
    fn base_url(&self) -> &str {
        &self.base_url_str
    }

    async fn plugin_info(&self, slug: &str) -> Result<RegistryPayload, RegistryError> {
        let url = self.plugin_url(slug);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        if body.trim().is_empty() {
            return Err(RegistryError::EmptyBody);
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| RegistryError::InvalidJson(e.to_string()))?;

        let payload = RegistryPayload::new(value);
        if payload.is_empty() {
            return Err(RegistryError::EmptyBody);
        }

        Ok(payload)
    }
}
