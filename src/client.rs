// src/client.rs
// HTTP client for the host server's session-prompt API

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::error::{ReflectError, Result};

/// Request timeout for prompt injection. Generous because the host may
/// hold the request until the agent accepts the message.
const PROMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Health probe timeout
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Outbound seam for injecting a prompt into a host session.
///
/// The trigger only ever talks through this trait, so tests can swap in
/// a recording or failing implementation.
#[async_trait]
pub trait SessionPrompter: Send + Sync {
    async fn prompt_session(&self, session_id: &str, agent: &str, text: &str) -> Result<()>;
}

/// JSON body for POST /session/{id}/prompt
#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    agent: &'a str,
    parts: Vec<PromptPart<'a>>,
}

#[derive(Debug, Serialize)]
struct PromptPart<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

/// Client for the OpenCode server's HTTP API
pub struct OpencodeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OpencodeClient {
    /// Build a client against a normalized base URL (trailing slash,
    /// see `config::normalize_base_url`).
    pub fn new(base_url: Url) -> Self {
        let http = reqwest::Client::builder()
            .timeout(PROMPT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check the host server is reachable
    pub async fn health(&self) -> Result<()> {
        let url = self.base_url.join("app")?;
        let resp = self
            .http
            .get(url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ReflectError::Api {
                status: resp.status(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SessionPrompter for OpencodeClient {
    async fn prompt_session(&self, session_id: &str, agent: &str, text: &str) -> Result<()> {
        let url = self.base_url.join(&format!("session/{session_id}/prompt"))?;
        let body = PromptRequest {
            agent,
            parts: vec![PromptPart { kind: "text", text }],
        };

        let resp = self.http.post(url).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ReflectError::Api { status, body });
        }
        Ok(())
    }
}
