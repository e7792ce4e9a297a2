//! Client for the HTTP embedding service
//!
//! `POST {base}/embed` with `{"text": ...}` answers `{"embedding": [...]}`;
//! `GET {base}/health` answers 200 when the model is loaded.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use strata_core::EmbeddingProvider;

use crate::{
    config::EmbeddingSettings,
    error::{Result, StrataError},
    vector::observability::{VectorError, VectorTelemetry},
};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingProvider {
    client: Client,
    embed_url: Url,
    health_url: Url,
    telemetry: Option<Arc<VectorTelemetry>>,
}

impl HttpEmbeddingProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let base = base_url(&settings.url)?;
        let join = |path: &str| {
            base.join(path)
                .map_err(|err| StrataError::InvalidUrl(format!("{}: {err}", settings.url)))
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            embed_url: join("embed")?,
            health_url: join("health")?,
            telemetry: None,
        })
    }

    pub fn with_telemetry(mut self, telemetry: Arc<VectorTelemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn embed_url(&self) -> &Url {
        &self.embed_url
    }

    pub async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let result = self.send(text).await;
        if let Some(telemetry) = &self.telemetry {
            match &result {
                Ok(_) => telemetry.record_embedding(start.elapsed()),
                Err(err) => telemetry.record_error(&VectorError::embedding(err.to_string())),
            }
        }
        result
    }

    async fn send(&self, text: &str) -> Result<Vec<f32>> {
        debug!(chars = text.chars().count(), "requesting embedding");
        let response = self
            .client
            .post(self.embed_url.clone())
            .json(&EmbedRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Embedding service error ({}): {}", status, message);
            return Err(StrataError::HttpStatus { status, message });
        }
        let body: EmbedResponse = response.json().await?;
        Ok(body.embedding)
    }

    /// Succeeds when the service answers its health endpoint with 2xx
    pub async fn health(&self) -> Result<()> {
        let response = self.client.get(self.health_url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(StrataError::HttpStatus { status, message })
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.request_embedding(text).await?)
    }
}

/// Parse `url` so that relative joins append to its path
fn base_url(url: &str) -> Result<Url> {
    let mut base = Url::parse(url).map_err(|err| StrataError::InvalidUrl(format!("{url}: {err}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}
