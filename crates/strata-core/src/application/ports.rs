//! Application Ports
//!
//! Traits the infrastructure crate implements. Adapters report failures as
//! `anyhow::Error`; use cases translate them into [`AppError`](super::AppError).

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{IndexPoint, Layer, PointPayload};

/// Remote service mapping text to a fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
}

/// Exact-match conjunction over payload fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointFilter {
    pub layer: Option<Layer>,
    pub document_id: Option<i64>,
}

impl PointFilter {
    pub fn layer(layer: Layer) -> Self {
        Self {
            layer: Some(layer),
            document_id: None,
        }
    }

    pub fn with_document(mut self, document_id: i64) -> Self {
        self.document_id = Some(document_id);
        self
    }

    pub fn matches(&self, payload: &PointPayload) -> bool {
        self.layer.map_or(true, |layer| payload.layer == layer)
            && self
                .document_id
                .map_or(true, |id| payload.document_id == id)
    }
}

/// A ranked store hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPayload {
    pub id: u64,
    pub score: f32,
    pub payload: PointPayload,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionInfo {
    pub points_count: u64,
    pub dimension: Option<u64>,
}

/// Backing engine for the three index layers
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Drop the collection if present and create it empty, scored by cosine
    async fn recreate_collection(&self, dimension: usize) -> Result<()>;

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Similarity search, best match first
    async fn query(
        &self,
        vector: &[f32],
        filter: PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPayload>>;

    /// Unranked filtered listing, a single page of at most `limit` points
    async fn scroll(&self, filter: PointFilter, limit: usize) -> Result<Vec<PointPayload>>;

    async fn collection_info(&self) -> Result<CollectionInfo>;

    async fn health_check(&self) -> Result<()> {
        self.collection_info().await.map(|_| ())
    }
}

/// Language model behind the semantic splitter
#[async_trait]
pub trait ChunkModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
