//! Embedding client: dimension-checked access to the embedding provider.

use std::sync::Arc;

use tracing::{debug, error};

use crate::application::{
    errors::{AppError, AppResult},
    ports::EmbeddingProvider,
};

#[derive(Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
}

impl EmbeddingClient {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, dimension: usize) -> Self {
        Self {
            provider,
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed `text`, or return the zero vector for blank input without
    /// calling the provider.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.trim().is_empty() {
            debug!("blank text, using zero vector");
            return Ok(vec![0.0; self.dimension]);
        }
        let vector = self.provider.embed_text(text).await.map_err(|err| {
            error!(error = %err, "embedding request failed");
            AppError::EmbeddingUnavailable(format!("{err:#}"))
        })?;
        if vector.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mocks::LookupEmbeddingProvider;

    #[tokio::test]
    async fn test_blank_text_skips_provider() {
        let provider = Arc::new(LookupEmbeddingProvider::new(4));
        let client = EmbeddingClient::new(provider.clone(), 4);
        let vector = client.embed("  \n\t").await.unwrap();
        assert_eq!(vector, vec![0.0; 4]);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let provider = Arc::new(LookupEmbeddingProvider::new(3));
        let client = EmbeddingClient::new(provider, 4);
        let err = client.embed("arrays").await.unwrap_err();
        assert_eq!(
            err,
            AppError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[tokio::test]
    async fn test_provider_failure_maps_to_unavailable() {
        let provider = Arc::new(LookupEmbeddingProvider::new(4).failing());
        let client = EmbeddingClient::new(provider, 4);
        let err = client.embed("arrays").await.unwrap_err();
        assert!(matches!(err, AppError::EmbeddingUnavailable(_)));
    }
}
