//! Search Use Case
//!
//! Probes the three layers with one query vector, picks a retrieval mode and
//! assembles the matching result set.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    application::{
        embedding::EmbeddingClient,
        errors::{AppError, AppResult},
        policy::{select_mode, Thresholds},
        ports::{PointFilter, ScoredPayload, VectorStore},
    },
    domain::{Layer, LayerScores, ResultRecord, RetrievalMode, SearchResponse},
};

/// Largest page pulled when a whole document is returned
pub const DEFAULT_SCROLL_LIMIT: usize = 1000;

pub struct RetrievalEngine {
    embeddings: EmbeddingClient,
    store: Arc<dyn VectorStore>,
    thresholds: Thresholds,
    scroll_limit: usize,
}

struct LayerProbe {
    title: Option<ScoredPayload>,
    filename: Option<ScoredPayload>,
    content: Vec<ScoredPayload>,
}

impl LayerProbe {
    fn scores(&self) -> LayerScores {
        let best = |hit: Option<&ScoredPayload>| hit.map_or(0.0, |hit| hit.score);
        LayerScores::new(
            best(self.title.as_ref()),
            best(self.filename.as_ref()),
            best(self.content.first()),
        )
    }
}

impl RetrievalEngine {
    pub fn new(embeddings: EmbeddingClient, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embeddings,
            store,
            thresholds: Thresholds::default(),
            scroll_limit: DEFAULT_SCROLL_LIMIT,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_scroll_limit(mut self, scroll_limit: usize) -> Self {
        self.scroll_limit = scroll_limit.max(1);
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<SearchResponse> {
        if query.trim().is_empty() {
            return Err(AppError::EmptyQuery);
        }
        if top_k == 0 {
            return Err(AppError::InvalidTopK);
        }

        let vector = self.embeddings.embed(query).await?;
        let probe = self.probe(&vector, top_k).await?;
        let scores = probe.scores();
        let mode = select_mode(&scores, &self.thresholds);
        info!(
            title = scores.title,
            filename = scores.filename,
            content = scores.content,
            %mode,
            "selected retrieval mode"
        );

        let results = match mode {
            RetrievalMode::Title => self
                .query_layer(&vector, PointFilter::layer(Layer::Content), top_k)
                .await?
                .into_iter()
                .map(|hit| ResultRecord::scored(hit.payload, hit.score))
                .collect(),
            RetrievalMode::Filename => match probe.filename {
                Some(best) => self.whole_document(best.payload.document_id).await?,
                None => Vec::new(),
            },
            RetrievalMode::Content => probe
                .content
                .into_iter()
                .take(1)
                .map(|hit| ResultRecord::scored(hit.payload, hit.score))
                .collect(),
            RetrievalMode::NoStrongMatch => probe
                .content
                .into_iter()
                .take(top_k)
                .map(|hit| ResultRecord::scored(hit.payload, hit.score))
                .collect(),
        };

        Ok(SearchResponse {
            query: query.to_string(),
            mode,
            scores: scores.rounded(),
            results,
        })
    }

    async fn probe(&self, vector: &[f32], top_k: usize) -> AppResult<LayerProbe> {
        let (title, filename, content) = futures::try_join!(
            self.query_layer(vector, PointFilter::layer(Layer::Title), 1),
            self.query_layer(vector, PointFilter::layer(Layer::Filename), 1),
            self.query_layer(vector, PointFilter::layer(Layer::Content), top_k),
        )?;
        Ok(LayerProbe {
            title: title.into_iter().next(),
            filename: filename.into_iter().next(),
            content,
        })
    }

    async fn query_layer(
        &self,
        vector: &[f32],
        filter: PointFilter,
        limit: usize,
    ) -> AppResult<Vec<ScoredPayload>> {
        self.store
            .query(vector, filter, limit)
            .await
            .map_err(|err| AppError::store("query", err))
    }

    async fn whole_document(&self, document_id: i64) -> AppResult<Vec<ResultRecord>> {
        let filter = PointFilter::layer(Layer::Content).with_document(document_id);
        let mut chunks = self
            .store
            .scroll(filter, self.scroll_limit)
            .await
            .map_err(|err| AppError::store("scroll", err))?;
        chunks.sort_by_key(|payload| payload.chunk_id);
        debug!(document_id, chunks = chunks.len(), "returning whole document");
        Ok(chunks.into_iter().map(ResultRecord::unscored).collect())
    }
}
