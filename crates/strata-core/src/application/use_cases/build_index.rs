//! Build Index Use Case
//!
//! Turns a corpus into the three point layers. Each run starts from an empty
//! collection; there is no incremental update.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    application::{
        embedding::EmbeddingClient,
        errors::{AppError, AppResult},
        ports::VectorStore,
    },
    domain::{Document, IndexPoint, Layer, PointPayload},
};

pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Counters reported at the end of a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub chunks_skipped: usize,
    pub points: u64,
    pub batches: usize,
}

pub struct IndexBuilder {
    embeddings: EmbeddingClient,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    next_point_id: u64,
    pending: Vec<IndexPoint>,
    summary: BuildSummary,
}

impl IndexBuilder {
    pub fn new(embeddings: EmbeddingClient, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embeddings,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            next_point_id: 1,
            pending: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            summary: BuildSummary::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Drop and recreate the collection, then index `documents` into it.
    pub async fn rebuild(&mut self, documents: &[Document]) -> AppResult<BuildSummary> {
        let dimension = self.embeddings.dimension();
        info!(dimension, "recreating collection");
        self.store
            .recreate_collection(dimension)
            .await
            .map_err(|err| AppError::store("recreate_collection", err))?;
        self.build_index(documents).await
    }

    /// Index `documents` into the current collection. Point ids restart at 1.
    pub async fn build_index(&mut self, documents: &[Document]) -> AppResult<BuildSummary> {
        self.next_point_id = 1;
        self.pending.clear();
        self.summary = BuildSummary::default();

        info!(documents = documents.len(), "building hierarchical index");
        for (position, document) in documents.iter().enumerate() {
            if document.chunks.is_empty() {
                warn!(document_id = document.id, "skipping document without chunks");
                self.summary.documents_skipped += 1;
                continue;
            }
            info!(
                document_id = document.id,
                chunks = document.chunks.len(),
                "[{}/{}] indexing document",
                position + 1,
                documents.len()
            );
            self.index_document(document).await?;
            self.summary.documents_indexed += 1;
        }
        self.flush().await?;

        info!(
            points = self.summary.points,
            batches = self.summary.batches,
            skipped = self.summary.documents_skipped,
            "finished indexing"
        );
        Ok(self.summary)
    }

    async fn index_document(&mut self, document: &Document) -> AppResult<()> {
        let vector = self.embeddings.embed(&document.filename).await?;
        self.emit(vector, PointPayload::for_document(document)).await?;

        for chunk in &document.chunks {
            if !chunk.is_indexable() {
                debug!(
                    document_id = document.id,
                    chunk_id = chunk.chunk_id,
                    "skipping chunk with empty content"
                );
                self.summary.chunks_skipped += 1;
                continue;
            }
            if !chunk.title_text().is_empty() {
                let vector = self.embeddings.embed(chunk.title_text()).await?;
                self.emit(vector, PointPayload::for_chunk(document, chunk, Layer::Title))
                    .await?;
            }
            let vector = self.embeddings.embed(chunk.content_text()).await?;
            self.emit(vector, PointPayload::for_chunk(document, chunk, Layer::Content))
                .await?;
        }
        Ok(())
    }

    async fn emit(&mut self, vector: Vec<f32>, payload: PointPayload) -> AppResult<()> {
        let id = self.next_point_id;
        self.next_point_id += 1;
        debug!(point_id = id, layer = %payload.layer, "emitting point");
        self.pending.push(IndexPoint {
            id,
            vector,
            payload,
        });
        self.summary.points += 1;
        if self.pending.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> AppResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let size = batch.len();
        self.store
            .upsert(batch)
            .await
            .map_err(|err| AppError::store("upsert", err))?;
        self.summary.batches += 1;
        debug!(points = size, "flushed batch");
        Ok(())
    }
}
