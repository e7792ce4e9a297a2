//! Ollama-backed chunk model
//!
//! Runs the semantic splitter prompt against a local model through the
//! non-streaming chat endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use strata_core::ChunkModel;

use crate::{
    config::ChunkingSettings,
    error::{Result, StrataError},
};

pub struct OllamaChunkModel {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaChunkModel {
    pub fn new(settings: &ChunkingSettings) -> Result<Self> {
        if settings.url.is_empty() {
            return Err(StrataError::InvalidUrl(
                "Ollama base URL is required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let request = OllamaChatRequest {
            model: &self.model,
            messages: vec![OllamaMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: OllamaOptions { temperature: 0.0 },
        };
        debug!(model = %self.model, chars = prompt.chars().count(), "sending chunking prompt");

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Ollama API request failed: {}", e);
                StrataError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Ollama API error ({}): {}", status, message);
            return Err(StrataError::HttpStatus { status, message });
        }

        let body: OllamaChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Ollama response: {}", e);
            StrataError::Http(e)
        })?;
        Ok(body.message.content)
    }
}

#[async_trait]
impl ChunkModel for OllamaChunkModel {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.chat(prompt).await?)
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}
