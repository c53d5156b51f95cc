use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::json;

const CHAT_COMPLETIONS_URL: &str = "https://api.z.ai/api/coding/paas/v4/chat/completions";

/// Thin client for the GLM chat-completions endpoint.
///
/// The request body carries `thinking: {type: disabled}` on every call; the
/// pipeline wants short deterministic completions, not extended reasoning.
pub struct GlmClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl GlmClient {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self { http, api_key, model }
    }

    /// One system+user exchange; returns the first choice's trimmed content.
    pub async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "max_tokens": max_tokens,
            "temperature": temperature,
            "thinking": { "type": "disabled" },
        });

        let response = self
            .http
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("chat completion returned HTTP {status}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("chat completion response was not valid JSON")?;

        match parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
        {
            Some(content) => {
                debug!("chat completion returned {} chars", content.len());
                Ok(content.trim().to_string())
            }
            None => bail!("chat completion response had no message content"),
        }
    }
}
