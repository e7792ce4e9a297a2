//! Strata infrastructure and CLI
//!
//! Adapters for the ports declared in `strata-core`:
//!
//! - [`embedding::HttpEmbeddingProvider`] talks to the `/embed` service
//! - [`vector::QdrantStore`] keeps the three-layer collection in Qdrant
//! - [`chunking::OllamaChunkModel`] drives the semantic splitter
//!
//! plus configuration loading, corpus files, text normalization and the
//! command handlers used by the `strata` binary.

pub mod args;
pub mod chunking;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod normalize;
pub mod output;
pub mod vector;

pub use config::{ConfigLoader, StrataConfig};
pub use error::{Result, StrataError};
