//! Strata Core Library
//!
//! Domain and application layer for Strata, a three-layer semantic index
//! (filename, chunk title, chunk content) with a threshold/priority policy
//! that decides how each query is answered.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Consumers (CLI, integration tests) │
//! ├─────────────────────────────────────┤
//! │  Application Layer (this crate)     │  ← Use cases, policy, ports
//! ├─────────────────────────────────────┤
//! │  Domain Layer (this crate)          │  ← Documents, chunks, payloads
//! ├─────────────────────────────────────┤
//! │  Infrastructure (`strata` crate)    │  ← HTTP embedding, Qdrant, LLM
//! └─────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Corpus records, point payloads and response shapes
//! - [`application`] - Index builder, retrieval engine, semantic splitter
//!   and the ports they run against
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_core::application::{EmbeddingClient, IndexBuilder, RetrievalEngine};
//!
//! let embeddings = EmbeddingClient::new(Arc::new(my_provider), 1024);
//! IndexBuilder::new(embeddings.clone(), store.clone())
//!     .rebuild(&documents)
//!     .await?;
//! let response = RetrievalEngine::new(embeddings, store)
//!     .search("how do arrays work", 5)
//!     .await?;
//! println!("{}", response.mode);
//! ```

pub mod application;
pub mod domain;

pub use domain::{
    Chunk, Document, IndexPoint, Layer, LayerScores, PointPayload, RawDocument, ResultRecord,
    RetrievalMode, SearchResponse,
};

pub use application::{
    AppError, AppResult, BuildSummary, ChunkModel, EmbeddingClient, EmbeddingProvider,
    IndexBuilder, PointFilter, RetrievalEngine, SemanticSplitter, SplitterSettings, Thresholds,
    VectorStore,
};
