//! Embedding service adapters.

pub mod http;

pub use http::HttpEmbeddingProvider;
