//! Language model adapters for the semantic splitter.

pub mod ollama;

pub use ollama::OllamaChunkModel;
