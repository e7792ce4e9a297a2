//! In-process implementations of every port
//!
//! Used by the unit tests in this crate and the workspace integration tests.
//! The vector store is a brute-force cosine scan and only suits small corpora.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::{
    application::ports::{
        ChunkModel, CollectionInfo, EmbeddingProvider, PointFilter, ScoredPayload, VectorStore,
    },
    domain::{IndexPoint, PointPayload},
};

/// Unit vector whose cosine similarity with `axis(0)` is `similarity`
pub fn vector_with_similarity(similarity: f32, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimension];
    vector[0] = similarity;
    if dimension > 1 {
        vector[1] = (1.0 - similarity * similarity).max(0.0).sqrt();
    }
    vector
}

pub fn axis(index: usize, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimension];
    vector[index] = 1.0;
    vector
}

/// Returns registered vectors for exact texts and the last axis otherwise
pub struct LookupEmbeddingProvider {
    dimension: usize,
    table: HashMap<String, Vec<f32>>,
    failing: bool,
    calls: AtomicUsize,
}

impl LookupEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            table: HashMap::new(),
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.table.insert(text.into(), vector);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for LookupEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            bail!("embedding service refused connection");
        }
        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| axis(self.dimension - 1, self.dimension)))
    }
}

#[derive(Default)]
struct StoreState {
    dimension: Option<usize>,
    points: Vec<IndexPoint>,
    upsert_batches: Vec<usize>,
    recreated: usize,
    queries: usize,
    scrolls: usize,
}

/// Brute-force vector store kept in memory
#[derive(Default)]
pub struct InMemoryVectorStore {
    state: Mutex<StoreState>,
    fail_on: Mutex<Option<&'static str>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `operation` fail from now on
    pub fn fail_on(&self, operation: &'static str) {
        *self.fail_on.lock().expect("store lock poisoned") = Some(operation);
    }

    pub fn points(&self) -> Vec<IndexPoint> {
        self.state().points.clone()
    }

    pub fn upsert_batches(&self) -> Vec<usize> {
        self.state().upsert_batches.clone()
    }

    pub fn recreated(&self) -> usize {
        self.state().recreated
    }

    pub fn query_count(&self) -> usize {
        self.state().queries
    }

    pub fn scroll_count(&self) -> usize {
        self.state().scrolls
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("store lock poisoned")
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        match *self.fail_on.lock().expect("store lock poisoned") {
            Some(failing) if failing == operation => {
                Err(anyhow!("vector store unreachable during {operation}"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn recreate_collection(&self, dimension: usize) -> Result<()> {
        self.check("recreate")?;
        let mut state = self.state();
        state.dimension = Some(dimension);
        state.points.clear();
        state.upsert_batches.clear();
        state.recreated += 1;
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        self.check("upsert")?;
        let mut state = self.state();
        let dimension = state
            .dimension
            .ok_or_else(|| anyhow!("collection does not exist"))?;
        if let Some(bad) = points.iter().find(|point| point.vector.len() != dimension) {
            bail!(
                "point {} has {} dimensions, collection expects {}",
                bad.id,
                bad.vector.len(),
                dimension
            );
        }
        state.upsert_batches.push(points.len());
        for point in points {
            match state.points.iter_mut().find(|existing| existing.id == point.id) {
                Some(existing) => *existing = point,
                None => state.points.push(point),
            }
        }
        state.points.sort_by_key(|point| point.id);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPayload>> {
        self.check("query")?;
        let mut state = self.state();
        state.queries += 1;
        let mut hits: Vec<ScoredPayload> = state
            .points
            .iter()
            .filter(|point| filter.matches(&point.payload))
            .map(|point| ScoredPayload {
                id: point.id,
                score: cosine(vector, &point.vector),
                payload: point.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll(&self, filter: PointFilter, limit: usize) -> Result<Vec<PointPayload>> {
        self.check("scroll")?;
        let mut state = self.state();
        state.scrolls += 1;
        Ok(state
            .points
            .iter()
            .filter(|point| filter.matches(&point.payload))
            .take(limit)
            .map(|point| point.payload.clone())
            .collect())
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        self.check("collection_info")?;
        let state = self.state();
        let dimension = state
            .dimension
            .ok_or_else(|| anyhow!("collection does not exist"))?;
        Ok(CollectionInfo {
            points_count: state.points.len() as u64,
            dimension: Some(dimension as u64),
        })
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Replays canned completions in order, then keeps failing
#[derive(Default)]
pub struct ScriptedChunkModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChunkModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn error(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()))
    }

    fn push(self, reply: Result<String, String>) -> Self {
        self.replies
            .lock()
            .expect("model lock poisoned")
            .push_back(reply);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("model lock poisoned").clone()
    }
}

#[async_trait]
impl ChunkModel for ScriptedChunkModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("model lock poisoned")
            .push(prompt.to_string());
        let next = self.replies.lock().expect("model lock poisoned").pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}
